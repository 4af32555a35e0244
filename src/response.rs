//! UFI response payloads and sense data.

use crate::medium::{Medium, SECTOR_SIZE};
use crate::storage::{FloppyStorage, StorageError};

/// Length of the INQUIRY response.
pub const INQUIRY_LEN: usize = 36;
/// Length of the REQUEST SENSE response.
pub const REQUEST_SENSE_LEN: usize = 18;
/// Length of the READ CAPACITY response.
pub const READ_CAPACITY_LEN: usize = 8;
/// Length of the READ FORMAT CAPACITIES response.
pub const READ_FORMAT_CAPACITIES_LEN: usize = 12;
/// Length of the MODE SENSE response.
pub const MODE_SENSE_LEN: usize = 8;

/// Size of the buffer holding an immediate response.
pub const RESPONSE_BUFFER_LEN: usize = 64;

const PERIPHERAL_DIRECT_ACCESS: u8 = 0x00;
const REMOVABLE_MEDIUM: u8 = 0x80;
const UFI_RESPONSE_DATA_FORMAT: u8 = 0x01;
const SENSE_ERROR_CODE_CURRENT: u8 = 0x70;
const FORMATTED_MEDIA: u8 = 0x02;
const WRITE_PROTECT: u8 = 0x80;

/// Sense key with its Additional Sense Code and Qualifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt-03", derive(defmt::Format))]
pub struct Sense {
    /// Sense key.
    pub key: u8,
    /// Additional Sense Code.
    pub asc: u8,
    /// Additional Sense Code Qualifier.
    pub ascq: u8,
}

impl Sense {
    /// Medium present, no error.
    pub const NO_SENSE: Sense = Sense::new(0x00, 0x00, 0x00);
    /// NOT READY, medium not present.
    pub const MEDIUM_NOT_PRESENT: Sense = Sense::new(0x02, 0x3A, 0x00);
    /// MEDIUM ERROR, unrecovered read error.
    pub const UNRECOVERED_READ_ERROR: Sense = Sense::new(0x03, 0x11, 0x00);
    /// MEDIUM ERROR, write fault.
    pub const WRITE_FAULT: Sense = Sense::new(0x03, 0x03, 0x00);
    /// ILLEGAL REQUEST, logical block address out of range.
    pub const LBA_OUT_OF_RANGE: Sense = Sense::new(0x05, 0x21, 0x00);
    /// DATA PROTECT, write protected media.
    pub const WRITE_PROTECTED: Sense = Sense::new(0x07, 0x27, 0x00);

    /// Creates a sense triad.
    pub const fn new(key: u8, asc: u8, ascq: u8) -> Self {
        Self { key, asc, ascq }
    }

    /// `true` for anything but [`NO_SENSE`](Sense::NO_SENSE).
    pub const fn is_error(&self) -> bool {
        self.key != 0 || self.asc != 0 || self.ascq != 0
    }

    /// CBI interrupt data block reporting this status: ASC, ASCQ.
    pub const fn notification(&self) -> [u8; 2] {
        [self.asc, self.ascq]
    }
}

impl From<StorageError> for Sense {
    fn from(e: StorageError) -> Self {
        match e {
            StorageError::MediumNotPresent => Sense::MEDIUM_NOT_PRESENT,
            StorageError::LbaOutOfRange => Sense::LBA_OUT_OF_RANGE,
            StorageError::Read => Sense::UNRECOVERED_READ_ERROR,
            StorageError::Write => Sense::WRITE_FAULT,
            StorageError::WriteProtected => Sense::WRITE_PROTECTED,
        }
    }
}

// Copy `src` into `buf[at..at + width]`, padding with spaces.
const fn place<const N: usize>(mut buf: [u8; N], at: usize, src: &[u8], width: usize) -> [u8; N] {
    let mut i = 0;
    while i < width {
        buf[at + i] = if i < src.len() { src[i] } else { b' ' };
        i += 1;
    }
    buf
}

/// INQUIRY response: removable direct-access device with the given identity.
pub const fn inquiry(vendor: &str, product: &str, revision: &str) -> [u8; INQUIRY_LEN] {
    let mut r = [0u8; INQUIRY_LEN];
    r[0] = PERIPHERAL_DIRECT_ACCESS;
    r[1] = REMOVABLE_MEDIUM;
    r[3] = UFI_RESPONSE_DATA_FORMAT;
    // additional length
    r[4] = (INQUIRY_LEN - 5) as u8;
    let r = place(r, 8, vendor.as_bytes(), 8);
    let r = place(r, 16, product.as_bytes(), 16);
    place(r, 32, revision.as_bytes(), 4)
}

/// REQUEST SENSE response reporting `sense`.
pub const fn request_sense(sense: Sense) -> [u8; REQUEST_SENSE_LEN] {
    let mut r = [0u8; REQUEST_SENSE_LEN];
    r[0] = SENSE_ERROR_CODE_CURRENT;
    r[2] = sense.key;
    // additional sense length
    r[7] = (REQUEST_SENSE_LEN - 8) as u8;
    r[12] = sense.asc;
    r[13] = sense.ascq;
    r
}

/// READ CAPACITY response: last logical block address and block length.
pub const fn read_capacity(medium: Medium) -> [u8; READ_CAPACITY_LEN] {
    let last = (medium.total_blocks() - 1).to_be_bytes();
    let len = (SECTOR_SIZE as u32).to_be_bytes();
    [last[0], last[1], last[2], last[3], 0x00, len[1], len[2], len[3]]
}

/// READ FORMAT CAPACITIES response with a single current capacity descriptor.
pub const fn read_format_capacities(medium: Medium) -> [u8; READ_FORMAT_CAPACITIES_LEN] {
    let blocks = medium.total_blocks().to_be_bytes();
    let len = (SECTOR_SIZE as u32).to_be_bytes();
    [
        // reserved
        0x00,
        0x00,
        0x00,
        // capacity list length
        0x08,
        blocks[0],
        blocks[1],
        blocks[2],
        blocks[3],
        FORMATTED_MEDIA,
        len[1],
        len[2],
        len[3],
    ]
}

/// MODE SENSE(10) header: mode data length, medium type and write protect flag.
pub const fn mode_sense(medium: Medium, write_protected: bool) -> [u8; MODE_SENSE_LEN] {
    [
        0x00,
        (MODE_SENSE_LEN - 2) as u8,
        medium.medium_type_code(),
        if write_protected { WRITE_PROTECT } else { 0x00 },
        0x00,
        0x00,
        0x00,
        0x00,
    ]
}

/// Responses for a given storage type, evaluated at compile time.
pub(crate) trait Catalog: FloppyStorage {
    const INQUIRY: [u8; INQUIRY_LEN] = inquiry(Self::VENDOR, Self::PRODUCT, Self::REVISION);
    const READ_CAPACITY: [u8; READ_CAPACITY_LEN] = read_capacity(Self::MEDIUM);
    const READ_FORMAT_CAPACITIES: [u8; READ_FORMAT_CAPACITIES_LEN] =
        read_format_capacities(Self::MEDIUM);
    const MODE_SENSE: [u8; MODE_SENSE_LEN] = mode_sense(Self::MEDIUM, Self::WRITE_PROTECTED);
}

impl<S: FloppyStorage> Catalog for S {}

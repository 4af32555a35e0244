//! Backend storage interface.

use crate::medium::{Medium, SECTOR_SIZE};

/// One logical block.
pub type Sector = [u8; SECTOR_SIZE];

/// Errors a backend may report when accessing a sector. These are
/// translated to UFI sense data and reported to the host by the next
/// REQUEST SENSE command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt-03", derive(defmt::Format))]
pub enum StorageError {
    /// No medium is inserted.
    MediumNotPresent,
    /// Logical block address is outside of the backing store.
    LbaOutOfRange,
    /// Sector could not be read.
    Read,
    /// Sector could not be written.
    Write,
    /// Medium is write protected.
    WriteProtected,
}

/// Trait that describes the medium a [`FloppyClass`](crate::FloppyClass) exposes
/// to a host. The class calls [`read_sector()`](FloppyStorage::read_sector) and
/// [`write_sector()`](FloppyStorage::write_sector) once per sector of a READ(10) or
/// WRITE(10) command, and uses the provided constants to build every
/// response sent to the host.
///
/// Both functions are called from `usb_dev.poll([])` (USB interrupt context)
/// and must complete quickly, otherwise the host sees a stalled transfer.
pub trait FloppyStorage {
    /// Geometry of the emulated medium. Default is a 1.44 MB floppy.
    const MEDIUM: Medium = Medium::Hd1440;

    /// INQUIRY vendor identification, padded with spaces to 8 bytes.
    const VENDOR: &'static str = "Acme";

    /// INQUIRY product identification, padded with spaces to 16 bytes.
    const PRODUCT: &'static str = "USB-FDD";

    /// INQUIRY product revision level, padded with spaces to 4 bytes.
    const REVISION: &'static str = "1.00";

    /// Reported by MODE SENSE. WRITE(10) commands fail when set.
    const WRITE_PROTECTED: bool = false;

    /// Selects between the two variants of the CBI transport.
    ///
    /// If `true` (default), an interrupt endpoint is allocated and a
    /// completion message is sent after every command (Control/Bulk/Interrupt).
    /// If `false`, no interrupt endpoint exists (Control/Bulk).
    const INTERRUPT_NOTIFY: bool = true;

    /// Maximum packet size of the bulk endpoints. Must divide 512.
    const MAX_PACKET_SIZE: u16 = 64;

    /// Polling interval of the interrupt endpoint in milliseconds.
    const NOTIFY_INTERVAL: u8 = 255;

    /// Produce the content of the sector at `lba`.
    fn read_sector(&mut self, lba: u32, data: &mut Sector) -> Result<(), StorageError>;

    /// Persist (or discard) the content of the sector at `lba`.
    fn write_sector(&mut self, lba: u32, data: &Sector) -> Result<(), StorageError>;

    /// Called every time when USB is reset.
    fn usb_reset(&mut self) {}
}

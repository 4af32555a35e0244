//! Floppy medium geometry.

/// Size of one logical block in bytes. UFI floppies always use 512.
pub const SECTOR_SIZE: usize = 512;

/// Number of heads of every supported 3.5" medium.
pub const HEADS: u16 = 2;

/// Supported 3.5" floppy media.
///
/// All responses reported to a host (capacity, format capacities, mode
/// sense) and the address space of a backend are derived from this value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt-03", derive(defmt::Format))]
pub enum Medium {
    /// Double density, 720 KB.
    Dd720,
    /// High density, 1.44 MB.
    Hd1440,
}

impl Medium {
    /// Total number of 512-byte blocks.
    pub const fn total_blocks(self) -> u32 {
        match self {
            Medium::Dd720 => 1440,
            Medium::Hd1440 => 2880,
        }
    }

    /// UFI medium type code reported by MODE SENSE.
    pub const fn medium_type_code(self) -> u8 {
        match self {
            Medium::Dd720 => 0x1E,
            Medium::Hd1440 => 0x94,
        }
    }

    /// FAT media descriptor byte.
    pub const fn media_descriptor(self) -> u8 {
        match self {
            Medium::Dd720 => 0xF9,
            Medium::Hd1440 => 0xF0,
        }
    }

    /// Sectors per track.
    pub const fn sectors_per_track(self) -> u16 {
        match self {
            Medium::Dd720 => 9,
            Medium::Hd1440 => 18,
        }
    }

    /// Returns `true` if `count` blocks starting at `lba` are all on the medium.
    pub const fn contains(self, lba: u32, count: u32) -> bool {
        match lba.checked_add(count) {
            Some(end) => end <= self.total_blocks(),
            None => false,
        }
    }
}

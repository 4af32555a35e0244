//! Empty, freshly formatted FAT12 floppy.

use crate::medium::{Medium, HEADS, SECTOR_SIZE};
use crate::storage::{FloppyStorage, Sector, StorageError};

const RESERVED_SECTORS: u16 = 1;
const NUMBER_OF_FATS: u8 = 2;
const ROOT_ENTRIES: u16 = 224;
const SECTORS_PER_FAT: u16 = 9;
const VOLUME_SERIAL: u32 = 0xA1B2_C3D4;

/// Logical block of the first FAT.
pub const FAT0_LBA: u32 = RESERVED_SECTORS as u32;
/// Logical block of the second (mirror) FAT.
pub const FAT1_LBA: u32 = FAT0_LBA + SECTORS_PER_FAT as u32;

const BOOT_SECTOR_LEN: usize = 62;

#[rustfmt::skip]
const fn boot_sector(medium: Medium) -> [u8; BOOT_SECTOR_LEN] {
    let bps = (SECTOR_SIZE as u16).to_le_bytes();
    let rsv = RESERVED_SECTORS.to_le_bytes();
    let root = ROOT_ENTRIES.to_le_bytes();
    let total = (medium.total_blocks() as u16).to_le_bytes();
    let spf = SECTORS_PER_FAT.to_le_bytes();
    let spt = medium.sectors_per_track().to_le_bytes();
    let heads = HEADS.to_le_bytes();
    let serial = VOLUME_SERIAL.to_le_bytes();

    [
        // jump instruction
        0xEB, 0x3C, 0x90,
        // OEM name
        b'M', b'S', b'D', b'O', b'S', b'5', b'.', b'0',
        // BIOS parameter block
        bps[0], bps[1],
        1, // sectors per cluster
        rsv[0], rsv[1],
        NUMBER_OF_FATS,
        root[0], root[1],
        total[0], total[1],
        medium.media_descriptor(),
        spf[0], spf[1],
        spt[0], spt[1],
        heads[0], heads[1],
        // hidden sectors, large sector count, drive number, reserved
        0, 0, 0, 0, 0, 0, 0, 0, 0, 0,
        // extended boot signature
        0x29,
        serial[0], serial[1], serial[2], serial[3],
        b'N', b'O', b' ', b'N', b'A', b'M', b'E', b' ', b' ', b' ', b' ',
        b'F', b'A', b'T', b'1', b'2', b' ', b' ', b' ',
    ]
}

/// Read only view of an empty FAT12 volume. Everything written is thrown
/// away.
///
/// Only the boot sector and the first bytes of both FATs carry data, all
/// other sectors read as zeros.
#[derive(Debug, Default, Clone, Copy)]
pub struct BlankFloppy;

impl BlankFloppy {
    const BOOT_SECTOR: [u8; BOOT_SECTOR_LEN] = boot_sector(<Self as FloppyStorage>::MEDIUM);
}

impl FloppyStorage for BlankFloppy {
    fn read_sector(&mut self, lba: u32, data: &mut Sector) -> Result<(), StorageError> {
        data.fill(0);

        if lba == 0 {
            data[..BOOT_SECTOR_LEN].copy_from_slice(&Self::BOOT_SECTOR);
            data[510] = 0x55;
            data[511] = 0xAA;
        } else if lba == FAT0_LBA || lba == FAT1_LBA {
            // FAT[0] holds the media descriptor, FAT[1] end of chain
            data[..3].copy_from_slice(&[Self::MEDIUM.media_descriptor(), 0xFF, 0xFF]);
        }

        Ok(())
    }

    fn write_sector(&mut self, _lba: u32, _data: &Sector) -> Result<(), StorageError> {
        Ok(())
    }
}

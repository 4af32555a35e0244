//! Floppy image held in memory.

use crate::blank::BlankFloppy;
use crate::medium::SECTOR_SIZE;
use crate::storage::{FloppyStorage, Sector, StorageError};

/// 1.44 MB floppy backed by a caller provided image.
///
/// The image does not need to cover the whole medium; sectors past its end
/// report [`StorageError::LbaOutOfRange`].
pub struct RamFloppy<'a> {
    image: &'a mut [u8],
}

impl<'a> RamFloppy<'a> {
    /// Use `image` as is.
    pub fn new(image: &'a mut [u8]) -> Self {
        Self { image }
    }

    /// Use `image` after writing an empty FAT12 volume into it.
    pub fn formatted(image: &'a mut [u8]) -> Self {
        let mut floppy = Self::new(image);
        floppy.format();
        floppy
    }

    /// Overwrite the image with an empty FAT12 volume.
    pub fn format(&mut self) {
        let mut blank = BlankFloppy;
        for (lba, chunk) in self.image.chunks_mut(SECTOR_SIZE).enumerate() {
            let mut sector = [0u8; SECTOR_SIZE];
            blank.read_sector(lba as u32, &mut sector).ok();
            chunk.copy_from_slice(&sector[..chunk.len()]);
        }
    }

    /// Give back the image.
    pub fn release(self) -> &'a mut [u8] {
        self.image
    }

    fn block(&mut self, lba: u32) -> Result<&mut [u8], StorageError> {
        if lba >= Self::MEDIUM.total_blocks() {
            return Err(StorageError::LbaOutOfRange);
        }
        let start = lba as usize * SECTOR_SIZE;
        self.image
            .get_mut(start..start + SECTOR_SIZE)
            .ok_or(StorageError::LbaOutOfRange)
    }
}

impl FloppyStorage for RamFloppy<'_> {
    fn read_sector(&mut self, lba: u32, data: &mut Sector) -> Result<(), StorageError> {
        data.copy_from_slice(self.block(lba)?);
        Ok(())
    }

    fn write_sector(&mut self, lba: u32, data: &Sector) -> Result<(), StorageError> {
        self.block(lba)?.copy_from_slice(data);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn write_then_read() {
        let mut image = vec![0u8; 16 * SECTOR_SIZE];
        let mut floppy = RamFloppy::new(&mut image);

        floppy.write_sector(3, &[0x33; SECTOR_SIZE]).unwrap();
        let mut sector = [0u8; SECTOR_SIZE];
        floppy.read_sector(3, &mut sector).unwrap();
        assert_eq!(sector, [0x33; SECTOR_SIZE]);
        floppy.read_sector(4, &mut sector).unwrap();
        assert_eq!(sector, [0; SECTOR_SIZE]);

        let image = floppy.release();
        assert_eq!(image[3 * SECTOR_SIZE], 0x33);
        assert_eq!(image[4 * SECTOR_SIZE - 1], 0);
    }

    #[test]
    fn outside_image() {
        let mut image = vec![0u8; 2 * SECTOR_SIZE];
        let mut floppy = RamFloppy::new(&mut image);
        let mut sector = [0u8; SECTOR_SIZE];

        assert_eq!(floppy.read_sector(2, &mut sector), Err(StorageError::LbaOutOfRange));
        assert_eq!(floppy.write_sector(u32::MAX, &sector), Err(StorageError::LbaOutOfRange));
    }

    #[test]
    fn formatted_matches_blank() {
        let mut image = vec![0xFFu8; 12 * SECTOR_SIZE];
        let mut floppy = RamFloppy::formatted(&mut image);

        let mut expected = [0u8; SECTOR_SIZE];
        let mut sector = [0u8; SECTOR_SIZE];
        for lba in 0..12 {
            BlankFloppy.read_sector(lba, &mut expected).unwrap();
            floppy.read_sector(lba, &mut sector).unwrap();
            assert_eq!(sector, expected);
        }
    }
}

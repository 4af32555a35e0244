//! UFI command blocks.

/// Length of every UFI command block.
pub const COMMAND_BLOCK_LEN: usize = 12;

/// UFI operation codes.
#[allow(missing_docs)]
pub mod opcode {
    pub const TEST_UNIT_READY: u8 = 0x00;
    pub const REZERO_UNIT: u8 = 0x01;
    pub const REQUEST_SENSE: u8 = 0x03;
    pub const FORMAT_UNIT: u8 = 0x04;
    pub const INQUIRY: u8 = 0x12;
    pub const START_STOP_UNIT: u8 = 0x1B;
    pub const SEND_DIAGNOSTIC: u8 = 0x1D;
    pub const PREVENT_ALLOW_MEDIUM_REMOVAL: u8 = 0x1E;
    pub const READ_FORMAT_CAPACITIES: u8 = 0x23;
    pub const READ_CAPACITY: u8 = 0x25;
    pub const READ_10: u8 = 0x28;
    pub const WRITE_10: u8 = 0x2A;
    pub const SEEK_10: u8 = 0x2B;
    pub const WRITE_AND_VERIFY: u8 = 0x2E;
    pub const VERIFY: u8 = 0x2F;
    pub const MODE_SELECT: u8 = 0x55;
    pub const MODE_SENSE: u8 = 0x5A;
    pub const READ_12: u8 = 0xA8;
    pub const WRITE_12: u8 = 0xAA;
}

use opcode::*;

/// A 12-byte UFI command block as received in the ADSC data stage.
///
/// Address and length fields are decoded at fixed offsets regardless of the
/// opcode; they are meaningless for commands that do not carry them.
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct CommandBlock([u8; COMMAND_BLOCK_LEN]);

impl CommandBlock {
    /// Wrap raw command bytes.
    pub const fn new(bytes: [u8; COMMAND_BLOCK_LEN]) -> Self {
        Self(bytes)
    }

    /// Build a command block from a control transfer data stage. Missing
    /// trailing bytes read as zero, extra bytes are ignored.
    pub fn from_slice(data: &[u8]) -> Self {
        let mut bytes = [0u8; COMMAND_BLOCK_LEN];
        let len = data.len().min(COMMAND_BLOCK_LEN);
        bytes[..len].copy_from_slice(&data[..len]);
        Self(bytes)
    }

    /// Operation code.
    pub const fn opcode(&self) -> u8 {
        self.0[0]
    }

    /// Logical block address, bytes 2..6, most significant byte first.
    pub const fn lba(&self) -> u32 {
        u32::from_be_bytes([self.0[2], self.0[3], self.0[4], self.0[5]])
    }

    /// Transfer length in sectors, bytes 7..9, most significant byte first.
    pub const fn transfer_length(&self) -> u32 {
        u16::from_be_bytes([self.0[7], self.0[8]]) as u32
    }

    /// Raw bytes.
    pub const fn as_bytes(&self) -> &[u8; COMMAND_BLOCK_LEN] {
        &self.0
    }
}

impl From<[u8; COMMAND_BLOCK_LEN]> for CommandBlock {
    fn from(bytes: [u8; COMMAND_BLOCK_LEN]) -> Self {
        Self(bytes)
    }
}

/// Command as interpreted by the floppy.
#[allow(missing_docs)]
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
#[cfg_attr(feature = "defmt-03", derive(defmt::Format))]
pub enum UfiCommand {
    Inquiry,
    RequestSense,
    ReadCapacity,
    ReadFormatCapacities,
    ModeSense,
    /// Read `len` sectors starting at `lba`.
    Read10 { lba: u32, len: u32 },
    /// Write `len` sectors starting at `lba`.
    Write10 { lba: u32, len: u32 },
    /// Any other opcode. These are acknowledged without any effect.
    NoOp(u8),
}

impl From<&CommandBlock> for UfiCommand {
    fn from(cb: &CommandBlock) -> Self {
        let lba = cb.lba();
        let len = cb.transfer_length();

        match cb.opcode() {
            INQUIRY => UfiCommand::Inquiry,
            REQUEST_SENSE => UfiCommand::RequestSense,
            READ_CAPACITY => UfiCommand::ReadCapacity,
            READ_FORMAT_CAPACITIES => UfiCommand::ReadFormatCapacities,
            MODE_SENSE => UfiCommand::ModeSense,
            READ_10 => UfiCommand::Read10 { lba, len },
            WRITE_10 => UfiCommand::Write10 { lba, len },
            op => UfiCommand::NoOp(op),
        }
    }
}

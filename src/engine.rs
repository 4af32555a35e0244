//! Sector streaming engine.
//!
//! A READ(10) or WRITE(10) is carried out one sector per endpoint
//! completion. [`step_read()`] and [`step_write()`] advance the armed
//! transfer by exactly one sector and report what the transport has to do
//! next.

use crate::response::Sense;
use crate::storage::{FloppyStorage, Sector, StorageError};

/// Current phase of the transfer state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt-03", derive(defmt::Format))]
pub enum Phase {
    /// No transfer in progress.
    Idle,
    /// Sectors remain to be sent on bulk-IN.
    Reading,
    /// Sectors remain to be received on bulk-OUT.
    Writing,
}

/// Progress of the one in-flight data command.
///
/// At most one of the two counters is non-zero.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TransferState {
    /// Address of the next sector to transfer.
    pub lba: u32,
    /// Sectors still to be sent to the host.
    pub read_remaining: u32,
    /// Sectors still to be received from the host.
    pub write_remaining: u32,
}

impl TransferState {
    /// Idle state.
    pub const fn new() -> Self {
        Self {
            lba: 0,
            read_remaining: 0,
            write_remaining: 0,
        }
    }

    /// Start sending `count` sectors from `lba`.
    pub fn arm_read(&mut self, lba: u32, count: u32) {
        self.lba = lba;
        self.write_remaining = 0;
        self.read_remaining = count;
    }

    /// Start receiving `count` sectors to `lba`.
    pub fn arm_write(&mut self, lba: u32, count: u32) {
        self.lba = lba;
        self.read_remaining = 0;
        self.write_remaining = count;
    }

    /// Drop any transfer in progress.
    pub fn reset(&mut self) {
        *self = Self::new();
    }

    /// Current phase.
    pub fn phase(&self) -> Phase {
        if self.read_remaining > 0 {
            Phase::Reading
        } else if self.write_remaining > 0 {
            Phase::Writing
        } else {
            Phase::Idle
        }
    }
}

/// Result of a bulk-IN completion.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt-03", derive(defmt::Format))]
pub enum ReadStep {
    /// Nothing to send.
    Idle,
    /// The sector buffer holds the next sector and must be sent. If `last`
    /// is set, the command is complete once it is.
    Sector {
        /// This was the final sector of the command.
        last: bool,
    },
    /// The backend failed, the transfer was aborted.
    Failed(Sense),
}

/// Result of a bulk-OUT completion.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt-03", derive(defmt::Format))]
pub enum WriteStep {
    /// No write in progress, the received data was dropped.
    Idle,
    /// The sector was handed to the backend.
    Stored {
        /// This was the final sector of the command.
        last: bool,
    },
    /// The backend failed, the transfer was aborted.
    Failed(Sense),
}

/// Fetch the next sector of an armed READ(10) into `sector`.
pub fn step_read<S: FloppyStorage>(
    state: &mut TransferState,
    storage: &mut S,
    sector: &mut Sector,
) -> ReadStep {
    if state.read_remaining == 0 {
        return ReadStep::Idle;
    }

    trace!("floppy: read lba {}", state.lba);
    if let Err(e) = storage.read_sector(state.lba, sector) {
        warn!("floppy: read of lba {} failed: {}", state.lba, e);
        state.reset();
        return ReadStep::Failed(read_sense(e));
    }

    state.lba = state.lba.wrapping_add(1);
    state.read_remaining -= 1;

    ReadStep::Sector {
        last: state.read_remaining == 0,
    }
}

/// Hand a received sector of an armed WRITE(10) to the backend.
pub fn step_write<S: FloppyStorage>(
    state: &mut TransferState,
    storage: &mut S,
    sector: &Sector,
) -> WriteStep {
    if state.write_remaining == 0 {
        return WriteStep::Idle;
    }

    trace!("floppy: write lba {}", state.lba);
    if let Err(e) = storage.write_sector(state.lba, sector) {
        warn!("floppy: write of lba {} failed: {}", state.lba, e);
        state.reset();
        return WriteStep::Failed(write_sense(e));
    }

    state.lba = state.lba.wrapping_add(1);
    state.write_remaining -= 1;

    WriteStep::Stored {
        last: state.write_remaining == 0,
    }
}

fn read_sense(e: StorageError) -> Sense {
    match e {
        StorageError::Write | StorageError::WriteProtected => Sense::UNRECOVERED_READ_ERROR,
        e => e.into(),
    }
}

fn write_sense(e: StorageError) -> Sense {
    match e {
        StorageError::Read => Sense::WRITE_FAULT,
        e => e.into(),
    }
}

//! UFI command interpreter.

use crate::command::{CommandBlock, UfiCommand};
use crate::engine::{self, ReadStep, TransferState, WriteStep};
use crate::medium::SECTOR_SIZE;
use crate::response::{self, Catalog, Sense, RESPONSE_BUFFER_LEN};
use crate::storage::{FloppyStorage, Sector};

/// Buffer suitable for DMA capable endpoint hardware.
#[repr(C, align(4))]
struct Aligned<const N: usize>([u8; N]);

/// What the transport has to do after a command was dispatched.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt-03", derive(defmt::Format))]
pub enum Outcome {
    /// Send [`Ufi::response()`] on bulk-IN, then report completion.
    Respond,
    /// Send a zero-length packet on bulk-IN, then report completion.
    Acknowledge,
    /// A READ(10) was armed and its first step performed.
    Read(ReadStep),
    /// The command was refused, the sense is pending for REQUEST SENSE.
    Failed(Sense),
}

/// Floppy drive state: backend, transfer progress, sense and buffers.
///
/// This is the part of [`FloppyClass`](crate::FloppyClass) that does not
/// depend on the USB stack. It can be driven directly, which is what the
/// class does from its endpoint callbacks.
pub struct Ufi<S: FloppyStorage> {
    storage: S,
    transfer: TransferState,
    sense: Sense,
    sector: Aligned<SECTOR_SIZE>,
    received: usize,
    response: Aligned<RESPONSE_BUFFER_LEN>,
    response_len: usize,
}

impl<S: FloppyStorage> Ufi<S> {
    /// Creates an idle drive around `storage`.
    pub fn new(storage: S) -> Self {
        Self {
            storage,
            transfer: TransferState::new(),
            sense: Sense::NO_SENSE,
            sector: Aligned([0; SECTOR_SIZE]),
            received: 0,
            response: Aligned([0; RESPONSE_BUFFER_LEN]),
            response_len: 0,
        }
    }

    /// Interpret one command block.
    pub fn dispatch(&mut self, cb: &CommandBlock) -> Outcome {
        let command = UfiCommand::from(cb);
        debug!("floppy: command {}", command);

        match command {
            UfiCommand::Inquiry => self.respond(&<S as Catalog>::INQUIRY),
            UfiCommand::RequestSense => {
                let sense = core::mem::replace(&mut self.sense, Sense::NO_SENSE);
                self.respond(&response::request_sense(sense))
            }
            UfiCommand::ReadCapacity => self.respond(&<S as Catalog>::READ_CAPACITY),
            UfiCommand::ReadFormatCapacities => self.respond(&<S as Catalog>::READ_FORMAT_CAPACITIES),
            UfiCommand::ModeSense => self.respond(&<S as Catalog>::MODE_SENSE),
            UfiCommand::Read10 { lba, len } => {
                if !S::MEDIUM.contains(lba, len) {
                    return Outcome::Read(ReadStep::Failed(self.fail(Sense::LBA_OUT_OF_RANGE)));
                }
                if len == 0 {
                    return Outcome::Acknowledge;
                }
                debug!("floppy: read {} sectors from {}", len, lba);
                self.transfer.arm_read(lba, len);
                Outcome::Read(self.sector_sent())
            }
            UfiCommand::Write10 { lba, len } => {
                if S::WRITE_PROTECTED {
                    return Outcome::Failed(self.fail(Sense::WRITE_PROTECTED));
                }
                if !S::MEDIUM.contains(lba, len) {
                    return Outcome::Failed(self.fail(Sense::LBA_OUT_OF_RANGE));
                }
                debug!("floppy: write {} sectors to {}", len, lba);
                // the receive buffer is primed before the counter is armed
                self.received = 0;
                self.transfer.arm_write(lba, len);
                Outcome::Acknowledge
            }
            UfiCommand::NoOp(_) => Outcome::Acknowledge,
        }
    }

    /// Advance a READ(10) after the previous sector left the device.
    pub fn sector_sent(&mut self) -> ReadStep {
        let step = engine::step_read(&mut self.transfer, &mut self.storage, &mut self.sector.0);
        if let ReadStep::Failed(sense) = step {
            self.sense = sense;
        }
        step
    }

    /// Free part of the sector buffer where the next OUT packet goes.
    pub fn receive_buffer(&mut self) -> &mut [u8] {
        &mut self.sector.0[self.received..]
    }

    /// Account for `len` bytes read into [`receive_buffer()`](Ufi::receive_buffer).
    ///
    /// Returns `None` while the sector is incomplete. A full sector or a short
    /// packet completes the receive, the buffer is handed to the engine and
    /// immediately re-armed for the next sector. The missing tail of a short
    /// sector is stored as zeros.
    pub fn packet_received(&mut self, len: usize) -> Option<WriteStep> {
        self.received = (self.received + len).min(SECTOR_SIZE);
        if self.received < SECTOR_SIZE && len >= S::MAX_PACKET_SIZE as usize {
            return None;
        }
        if self.received < SECTOR_SIZE {
            warn!("floppy: short sector, {} bytes", self.received);
            // nothing of the previous sector may reach the backend
            self.sector.0[self.received..].fill(0);
        }
        self.received = 0;

        let step = engine::step_write(&mut self.transfer, &mut self.storage, &self.sector.0);
        if let WriteStep::Failed(sense) = step {
            self.sense = sense;
        }
        Some(step)
    }

    /// Drop any transfer in progress and the pending sense.
    pub fn reset(&mut self) {
        debug!("floppy: reset");
        self.transfer.reset();
        self.received = 0;
        self.response_len = 0;
        self.sense = Sense::NO_SENSE;
    }

    /// Sector buffer, holds the sector to send after a [`ReadStep::Sector`].
    pub fn sector(&self) -> &Sector {
        &self.sector.0
    }

    /// Response of the last immediate command.
    pub fn response(&self) -> &[u8] {
        &self.response.0[..self.response_len]
    }

    /// Transfer progress.
    pub fn transfer(&self) -> &TransferState {
        &self.transfer
    }

    /// Sense that the next REQUEST SENSE reports.
    pub fn sense(&self) -> Sense {
        self.sense
    }

    /// Shared access to the backend.
    pub fn storage(&self) -> &S {
        &self.storage
    }

    /// Exclusive access to the backend.
    pub fn storage_mut(&mut self) -> &mut S {
        &mut self.storage
    }

    /// Give back the backend.
    pub fn release(self) -> S {
        self.storage
    }

    fn respond(&mut self, data: &[u8]) -> Outcome {
        self.response.0[..data.len()].copy_from_slice(data);
        self.response_len = data.len();
        Outcome::Respond
    }

    fn fail(&mut self, sense: Sense) -> Sense {
        warn!("floppy: command failed: {}", sense);
        self.sense = sense;
        sense
    }
}

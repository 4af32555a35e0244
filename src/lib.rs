#![cfg_attr(not(test), no_std)]
#![warn(missing_docs)]
//!
//! Implements a USB floppy drive for a `usb-device` device: Mass Storage
//! class, UFI (USB Floppy Interface) subclass, CBI (Control/Bulk/Interrupt)
//! transport.
//!
//! ## About
//!
//! Operating systems ship a driver for USB floppy drives, so a device using
//! this class can be mounted, read and written without anything installed
//! on the host. The host sends 12-byte UFI command blocks in a class control
//! request (ADSC), sector data moves over a pair of bulk endpoints, and
//! completion of each command is reported on an interrupt endpoint.
//!
//! This library is a protocol implementation only. Sectors are read and
//! written by a [`FloppyStorage`] implementation provided by the library
//! user. Two are included:
//!
//! * [`BlankFloppy`] - an empty, read only FAT12 volume; written data is discarded.
//! * [`RamFloppy`] - a floppy image in a caller provided buffer.
//!
//! ### Supported commands
//!
//! * INQUIRY, REQUEST SENSE, READ CAPACITY, READ FORMAT CAPACITIES, MODE SENSE
//! * READ(10), WRITE(10)
//!
//! Every other command (TEST UNIT READY, FORMAT UNIT, VERIFY, ...) is
//! acknowledged as successful and has no effect. Host drivers probe these
//! and expect them to succeed.
//!
//! ### Errors
//!
//! Failed sector accesses and out of range requests are reported the UFI
//! way: the interrupt data block carries the ASC/ASCQ of the failure and
//! the next REQUEST SENSE returns the full sense data.
//!
//! ### Limitations
//!
//! * Only 512-byte sectors, 720 KB and 1.44 MB media.
//! * One logical unit.
//! * Sector access happens in `usb_dev.poll([])`, backends must be fast.
//!
//! ## Example
//!
//! The example below tries to focus on [`FloppyClass`], parts related to a target
//! controller initialization and configuration (USB, interrupts, GPIO, etc.)
//! are not in the scope of the example.
//!
//! ```ignore
//! use usb_device::prelude::*;
//! use usbd_floppy::*;
//!
//! struct MyFlash { /* ... */ }
//!
//! impl FloppyStorage for MyFlash {
//!     const VENDOR: &'static str = "MyCorp";
//!     const PRODUCT: &'static str = "Flash Floppy";
//!
//!     fn read_sector(&mut self, lba: u32, data: &mut Sector) -> Result<(), StorageError> {
//!         // TODO: read from flash
//!         Ok(())
//!     }
//!
//!     fn write_sector(&mut self, lba: u32, data: &Sector) -> Result<(), StorageError> {
//!         // TODO: program flash
//!         Ok(())
//!     }
//! }
//!
//! let mut floppy = FloppyClass::new(&usb_bus_alloc, MyFlash { /* ... */ });
//!
//! let mut usb_dev = UsbDeviceBuilder::new(&usb_bus_alloc, UsbVidPid(0x1234, 0x5678))
//!     .build();
//!
//! // usb_dev.poll() must be called periodically, usually from USB interrupt handlers.
//! // Sectors are read and written from inside it.
//! loop {
//!     usb_dev.poll(&mut [&mut floppy]);
//! }
//! ```
//!

#[macro_use]
mod fmt;

pub mod blank;
/// CBI transport for usb-device
pub mod class;
pub mod command;
pub mod dispatch;
pub mod engine;
pub mod medium;
pub mod ram;
pub mod response;
pub mod storage;

#[doc(inline)]
pub use crate::blank::BlankFloppy;
#[doc(inline)]
pub use crate::class::FloppyClass;
#[doc(inline)]
pub use crate::medium::{Medium, SECTOR_SIZE};
#[doc(inline)]
pub use crate::ram::RamFloppy;
#[doc(inline)]
pub use crate::response::Sense;
#[doc(inline)]
pub use crate::storage::{FloppyStorage, Sector, StorageError};

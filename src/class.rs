use core::cmp::min;
use usb_device::{class_prelude::*, control::Request, UsbError};

use crate::command::CommandBlock;
use crate::dispatch::{Outcome, Ufi};
use crate::engine::{ReadStep, WriteStep};
use crate::response::Sense;
use crate::storage::FloppyStorage;

const USB_CLASS_MASS_STORAGE: u8 = 0x08;
const USB_SUBCLASS_UFI: u8 = 0x04;

const USB_PROTOCOL_CBI: u8 = 0x00;
const USB_PROTOCOL_CB: u8 = 0x01;

/// Accept Device-Specific Command, the only CBI class request.
const CBI_ADSC: u8 = 0x00;

/// Interrupt data block: ASC, ASCQ.
const NOTIFY_PACKET_SIZE: u16 = 2;

#[derive(Clone, Copy, PartialEq, Eq)]
enum Source {
    /// Zero-length acknowledgment.
    Empty,
    Response,
    Sector,
}

/// Data being sent on bulk-IN, one packet per completion.
#[derive(Clone, Copy)]
struct InTransfer {
    source: Source,
    len: usize,
    sent: usize,
}

/// Interrupt endpoint holding at most one unread message. A newer status
/// replaces an older one that could not be queued yet.
struct Notifier<'a, B: UsbBus> {
    ep: EndpointIn<'a, B>,
    busy: bool,
    pending: Option<Sense>,
}

impl<B: UsbBus> Notifier<'_, B> {
    fn post(&mut self, sense: Sense) {
        if self.busy {
            trace!("floppy: notify deferred");
            self.pending = Some(sense);
            return;
        }

        match self.ep.write(&sense.notification()) {
            Ok(_) => {
                self.busy = true;
                self.pending = None;
            }
            Err(UsbError::WouldBlock) => self.pending = Some(sense),
            Err(e) => {
                error!("floppy: notify failed: {}", e);
            }
        }
    }

    fn complete(&mut self) {
        self.busy = false;
        if let Some(sense) = self.pending.take() {
            self.post(sense);
        }
    }
}

/// USB floppy drive (Mass Storage class, UFI subclass, CBI or CB transport)
/// for usb-device library.
pub struct FloppyClass<'a, B: UsbBus, S: FloppyStorage> {
    if_num: InterfaceNumber,
    bulk_in: EndpointIn<'a, B>,
    bulk_out: EndpointOut<'a, B>,
    notify: Option<Notifier<'a, B>>,
    ufi: Ufi<S>,
    in_flight: Option<InTransfer>,
    /// A bulk-IN packet was queued and the host has not taken it yet.
    in_busy: bool,
}

impl<B: UsbBus, S: FloppyStorage> UsbClass<B> for FloppyClass<'_, B, S> {
    fn get_configuration_descriptors(
        &self,
        writer: &mut DescriptorWriter,
    ) -> usb_device::Result<()> {
        writer.interface(
            self.if_num,
            USB_CLASS_MASS_STORAGE,
            USB_SUBCLASS_UFI,
            if S::INTERRUPT_NOTIFY {
                USB_PROTOCOL_CBI
            } else {
                USB_PROTOCOL_CB
            },
        )?;

        writer.endpoint(&self.bulk_in)?;
        writer.endpoint(&self.bulk_out)?;
        if let Some(notify) = &self.notify {
            writer.endpoint(&notify.ep)?;
        }

        Ok(())
    }

    // Class requests with data for the host are not defined by CBI.
    fn control_in(&mut self, xfer: ControlIn<B>) {
        let req = *xfer.request();

        if !self.is_class_request(&req) {
            return;
        }

        xfer.reject().ok();
    }

    // Every class request from the host carries a command block (ADSC).
    fn control_out(&mut self, xfer: ControlOut<B>) {
        let req = *xfer.request();

        if req.request_type == control::RequestType::Standard
            && req.recipient == control::Recipient::Device
            && req.request == Request::SET_CONFIGURATION
        {
            // left to UsbDevice, only observed here
            self.configuration_changed(req.value != 0);
            return;
        }

        if !self.is_class_request(&req) {
            return;
        }

        if req.request != CBI_ADSC {
            warn!("floppy: class request {} treated as ADSC", req.request);
        }

        let cb = CommandBlock::from_slice(xfer.data());
        // data phase is started before the status stage completes
        self.command(&cb);
        xfer.accept().ok();
    }

    fn endpoint_in_complete(&mut self, addr: EndpointAddress) {
        if addr == self.bulk_in.address() {
            self.in_complete();
        } else if let Some(notify) = &mut self.notify {
            if addr == notify.ep.address() {
                notify.complete();
            }
        }
    }

    fn endpoint_out(&mut self, addr: EndpointAddress) {
        if addr != self.bulk_out.address() {
            return;
        }

        // always drained, data outside of a WRITE(10) is dropped
        match self.bulk_out.read(self.ufi.receive_buffer()) {
            Ok(len) => {
                if let Some(step) = self.ufi.packet_received(len) {
                    self.write_step(step);
                }
            }
            Err(UsbError::WouldBlock) => {}
            Err(e) => {
                error!("floppy: bulk-out read failed: {}", e);
            }
        }
    }

    fn reset(&mut self) {
        self.ufi.storage_mut().usb_reset();
        self.configuration_changed(false);
        // bus reset empties endpoint buffers
        self.in_busy = false;
        if let Some(notify) = &mut self.notify {
            notify.busy = false;
        }
    }
}

impl<'a, B: UsbBus, S: FloppyStorage> FloppyClass<'a, B, S> {
    /// Creates a new [`FloppyClass`] with the provided UsbBus and
    /// [`FloppyStorage`]
    pub fn new(alloc: &'a UsbBusAllocator<B>, storage: S) -> Self {
        Self {
            if_num: alloc.interface(),
            bulk_in: alloc.bulk(S::MAX_PACKET_SIZE),
            bulk_out: alloc.bulk(S::MAX_PACKET_SIZE),
            notify: if S::INTERRUPT_NOTIFY {
                Some(Notifier {
                    ep: alloc.interrupt(NOTIFY_PACKET_SIZE, S::NOTIFY_INTERVAL),
                    busy: false,
                    pending: None,
                })
            } else {
                None
            },
            ufi: Ufi::new(storage),
            in_flight: None,
            in_busy: false,
        }
    }

    /// This function will consume self and return the owned storage
    /// argument that was moved in the call to [`FloppyClass::new()`]
    pub fn release(self) -> S {
        self.ufi.release()
    }

    /// Drive state, including transfer progress and pending sense.
    pub fn ufi(&self) -> &Ufi<S> {
        &self.ufi
    }

    /// Exclusive access to the storage backend.
    pub fn storage_mut(&mut self) -> &mut S {
        self.ufi.storage_mut()
    }

    /// Abandon any transfer in progress.
    ///
    /// Called internally on USB reset and whenever the host sets a
    /// configuration, so a half-completed transfer never resumes after
    /// re-enumeration. The sector buffer is re-armed to receive from its
    /// start and an undelivered status is dropped.
    pub fn configuration_changed(&mut self, active: bool) {
        debug!("floppy: configuration changed, active: {}", active);
        self.ufi.reset();
        self.in_flight = None;
        if let Some(notify) = &mut self.notify {
            notify.pending = None;
        }
    }

    fn is_class_request(&self, req: &Request) -> bool {
        req.request_type == control::RequestType::Class
            && req.recipient == control::Recipient::Interface
            && req.index == u8::from(self.if_num) as u16
    }

    fn command(&mut self, cb: &CommandBlock) {
        match self.ufi.dispatch(cb) {
            Outcome::Respond => {
                self.start_in(Source::Response);
                self.notify(Sense::NO_SENSE);
            }
            Outcome::Acknowledge => {
                self.start_in(Source::Empty);
                self.notify(Sense::NO_SENSE);
            }
            Outcome::Read(step) => self.read_step(step),
            Outcome::Failed(sense) => self.notify(sense),
        }
    }

    fn read_step(&mut self, step: ReadStep) {
        match step {
            ReadStep::Idle => {}
            ReadStep::Sector { last } => {
                self.start_in(Source::Sector);
                if last {
                    self.notify(Sense::NO_SENSE);
                }
            }
            ReadStep::Failed(sense) => {
                self.in_flight = None;
                self.bulk_in.stall();
                self.notify(sense);
            }
        }
    }

    fn write_step(&mut self, step: WriteStep) {
        match step {
            WriteStep::Idle | WriteStep::Stored { last: false } => {}
            WriteStep::Stored { last: true } => self.notify(Sense::NO_SENSE),
            WriteStep::Failed(sense) => self.notify(sense),
        }
    }

    fn in_complete(&mut self) {
        self.in_busy = false;

        match self.in_flight {
            Some(xfer) if xfer.sent < xfer.len => self.send_packet(),
            Some(xfer) if xfer.source == Source::Sector => {
                self.in_flight = None;
                let step = self.ufi.sector_sent();
                self.read_step(step);
            }
            _ => self.in_flight = None,
        }
    }

    fn in_data(&self, source: Source) -> &[u8] {
        match source {
            Source::Empty => &[],
            Source::Response => self.ufi.response(),
            Source::Sector => self.ufi.sector(),
        }
    }

    fn start_in(&mut self, source: Source) {
        if source == Source::Empty && self.in_busy {
            // the unread packet already ends the host's bulk-IN read
            trace!("floppy: acknowledgment skipped, bulk-in busy");
            return;
        }

        self.in_flight = Some(InTransfer {
            source,
            len: self.in_data(source).len(),
            sent: 0,
        });
        self.send_packet();
    }

    // Queues the next packet unless the endpoint still holds one, in which
    // case the transfer resumes from the next IN completion.
    fn send_packet(&mut self) {
        if self.in_busy {
            return;
        }

        let mut xfer = match self.in_flight {
            Some(xfer) => xfer,
            None => return,
        };

        let end = min(xfer.sent + S::MAX_PACKET_SIZE as usize, xfer.len);
        let packet = &self.in_data(xfer.source)[xfer.sent..end];

        match self.bulk_in.write(packet) {
            Ok(n) => {
                xfer.sent += n;
                self.in_flight = Some(xfer);
                self.in_busy = true;
            }
            Err(UsbError::WouldBlock) => {
                trace!("floppy: bulk-in full, retry on completion");
            }
            Err(e) => {
                error!("floppy: bulk-in write failed: {}", e);
                self.in_flight = None;
            }
        }
    }

    fn notify(&mut self, sense: Sense) {
        if let Some(notify) = &mut self.notify {
            notify.post(sense);
        }
    }
}

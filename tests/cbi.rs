use usb_device::bus::UsbBusAllocator;
use usbd_class_tester::prelude::*;

use usbd_floppy::command::opcode::{INQUIRY, READ_10, REQUEST_SENSE, TEST_UNIT_READY, WRITE_10};
use usbd_floppy::engine::Phase;
use usbd_floppy::{
    BlankFloppy, FloppyClass, FloppyStorage, RamFloppy, Sector, Sense, StorageError, SECTOR_SIZE,
};

const ADSC: u8 = 0x00;

/// Endpoint indexes as allocated by `FloppyClass::new()` on the emulated bus.
const BULK_EP: usize = 1;
const NOTIFY_EP: usize = 2;

/// Sectors backing the RAM image, far less than the medium.
const IMAGE_SECTORS: usize = 8;

macro_rules! adsc {
    ($dev:ident, $cls:ident, $cmd:expr) => {
        $dev.control_write(
            &mut $cls,
            CtrRequestType::to_device().class().interface(),
            ADSC,
            0,
            0,
            12,
            &$cmd,
        )
        .expect("adsc")
    };
}

struct BlankCtx {}

impl UsbDeviceCtx for BlankCtx {
    type C<'c> = FloppyClass<'c, EmulatedUsbBus, BlankFloppy>;

    fn create_class<'a>(
        &mut self,
        alloc: &'a UsbBusAllocator<EmulatedUsbBus>,
    ) -> AnyResult<FloppyClass<'a, EmulatedUsbBus, BlankFloppy>> {
        Ok(FloppyClass::new(alloc, BlankFloppy))
    }
}

struct RamCtx {}

impl UsbDeviceCtx for RamCtx {
    type C<'c> = FloppyClass<'c, EmulatedUsbBus, RamFloppy<'static>>;

    fn create_class<'a>(
        &mut self,
        alloc: &'a UsbBusAllocator<EmulatedUsbBus>,
    ) -> AnyResult<FloppyClass<'a, EmulatedUsbBus, RamFloppy<'static>>> {
        let image = Box::leak(vec![0u8; IMAGE_SECTORS * SECTOR_SIZE].into_boxed_slice());
        Ok(FloppyClass::new(alloc, RamFloppy::formatted(image)))
    }
}

/// Blank volume on the Control/Bulk variant, without interrupt endpoint.
struct CbFloppy(BlankFloppy);

impl FloppyStorage for CbFloppy {
    const INTERRUPT_NOTIFY: bool = false;

    fn read_sector(&mut self, lba: u32, data: &mut Sector) -> Result<(), StorageError> {
        self.0.read_sector(lba, data)
    }

    fn write_sector(&mut self, lba: u32, data: &Sector) -> Result<(), StorageError> {
        self.0.write_sector(lba, data)
    }
}

struct CbCtx {}

impl UsbDeviceCtx for CbCtx {
    type C<'c> = FloppyClass<'c, EmulatedUsbBus, CbFloppy>;

    fn create_class<'a>(
        &mut self,
        alloc: &'a UsbBusAllocator<EmulatedUsbBus>,
    ) -> AnyResult<FloppyClass<'a, EmulatedUsbBus, CbFloppy>> {
        Ok(FloppyClass::new(alloc, CbFloppy(BlankFloppy)))
    }
}

fn cb(op: u8, lba: u32, len: u16) -> [u8; 12] {
    let l = lba.to_be_bytes();
    let n = len.to_be_bytes();
    [op, 0, l[0], l[1], l[2], l[3], 0, n[0], n[1], 0, 0, 0]
}

#[test]
fn adsc_inquiry() {
    BlankCtx {}
        .with_usb(|mut cls, mut dev| {
            adsc!(dev, cls, cb(INQUIRY, 0, 0));

            let r = dev.ep_read(&mut cls, BULK_EP, 64).expect("bulk-in");
            assert_eq!(r.len(), 36);
            assert_eq!(&r[..2], &[0x00, 0x80]);
            assert_eq!(&r[8..16], b"Acme    ");

            let status = dev.ep_read(&mut cls, NOTIFY_EP, 8).expect("interrupt");
            assert_eq!(status, [0x00, 0x00]);
        })
        .expect("with_usb");
}

#[test]
fn class_in_request_rejected() {
    BlankCtx {}
        .with_usb(|mut cls, mut dev| {
            let res = dev.control_read(
                &mut cls,
                CtrRequestType::to_host().class().interface(),
                ADSC,
                0,
                0,
                8,
            );
            assert!(res.is_err());
        })
        .expect("with_usb");
}

#[test]
fn read10_streams_sectors() {
    BlankCtx {}
        .with_usb(|mut cls, mut dev| {
            adsc!(dev, cls, cb(READ_10, 0, 2));

            let data = dev.ep_read(&mut cls, BULK_EP, 1024).expect("bulk-in");
            assert_eq!(data.len(), 2 * SECTOR_SIZE);
            assert_eq!(data[0], 0xEB);
            assert_eq!(&data[510..512], &[0x55, 0xAA]);
            assert_eq!(&data[512..515], &[0xF0, 0xFF, 0xFF]);
            assert_eq!(cls.ufi().transfer().phase(), Phase::Idle);

            // one completion, after the last sector
            let status = dev.ep_read(&mut cls, NOTIFY_EP, 8).expect("interrupt");
            assert_eq!(status, [0x00, 0x00]);
        })
        .expect("with_usb");
}

#[test]
fn read10_after_unread_acknowledgment() {
    BlankCtx {}
        .with_usb(|mut cls, mut dev| {
            // no data phase, the host never reads the acknowledgment
            adsc!(dev, cls, cb(TEST_UNIT_READY, 0, 0));
            let status = dev.ep_read(&mut cls, NOTIFY_EP, 8).expect("interrupt");
            assert_eq!(status, [0x00, 0x00]);

            adsc!(dev, cls, cb(READ_10, 0, 1));

            // the pending zero-length packet comes first, the sector is held back
            let ack = dev.ep_read(&mut cls, BULK_EP, 1024).expect("bulk-in");
            assert!(ack.is_empty());

            let data = dev.ep_read(&mut cls, BULK_EP, 1024).expect("bulk-in");
            assert_eq!(data.len(), SECTOR_SIZE);
            assert_eq!(data[0], 0xEB);
            assert_eq!(&data[510..512], &[0x55, 0xAA]);
        })
        .expect("with_usb");
}

#[test]
fn out_of_range_read_sets_sense() {
    BlankCtx {}
        .with_usb(|mut cls, mut dev| {
            adsc!(dev, cls, cb(READ_10, 2880, 1));

            assert_eq!(cls.ufi().sense(), Sense::LBA_OUT_OF_RANGE);
            assert_eq!(cls.ufi().transfer().phase(), Phase::Idle);
            assert!(dev.ep_read(&mut cls, BULK_EP, 64).is_err());

            let status = dev.ep_read(&mut cls, NOTIFY_EP, 8).expect("interrupt");
            assert_eq!(status, [0x21, 0x00]);

            adsc!(dev, cls, cb(REQUEST_SENSE, 0, 0));

            let r = cls.ufi().response();
            assert_eq!((r[2], r[12], r[13]), (0x05, 0x21, 0x00));
            assert_eq!(cls.ufi().sense(), Sense::NO_SENSE);
        })
        .expect("with_usb");
}

#[test]
fn write10_stores_sectors() {
    RamCtx {}
        .with_usb(|mut cls, mut dev| {
            adsc!(dev, cls, cb(WRITE_10, 5, 2));

            for fill in [0x50u8, 0x51] {
                for _ in 0..SECTOR_SIZE / 64 {
                    let n = dev.ep_write(&mut cls, BULK_EP, &[fill; 64]).expect("bulk-out");
                    assert_eq!(n, 64);
                }
            }
            assert_eq!(cls.ufi().transfer().phase(), Phase::Idle);

            let mut sector = [0u8; SECTOR_SIZE];
            cls.storage_mut().read_sector(5, &mut sector).expect("read");
            assert_eq!(sector, [0x50; SECTOR_SIZE]);
            cls.storage_mut().read_sector(6, &mut sector).expect("read");
            assert_eq!(sector, [0x51; SECTOR_SIZE]);

            // acknowledgment on arming, then completion of the last sector
            let status = dev.ep_read(&mut cls, NOTIFY_EP, 8).expect("interrupt");
            assert_eq!(status, [0x00, 0x00, 0x00, 0x00]);
        })
        .expect("with_usb");
}

#[test]
fn write10_failure_reaches_host() {
    RamCtx {}
        .with_usb(|mut cls, mut dev| {
            // second sector lies past the end of the image
            let last = IMAGE_SECTORS as u32 - 1;
            adsc!(dev, cls, cb(WRITE_10, last, 2));

            for fill in [0x70u8, 0x71] {
                for _ in 0..SECTOR_SIZE / 64 {
                    dev.ep_write(&mut cls, BULK_EP, &[fill; 64]).expect("bulk-out");
                }
            }
            assert_eq!(cls.ufi().transfer().phase(), Phase::Idle);

            // the failure is not lost behind the acknowledgment still queued
            let status = dev.ep_read(&mut cls, NOTIFY_EP, 8).expect("interrupt");
            assert_eq!(status, [0x00, 0x00, 0x21, 0x00]);

            adsc!(dev, cls, cb(REQUEST_SENSE, 0, 0));
            let r = dev.ep_read(&mut cls, BULK_EP, 64).expect("bulk-in");
            assert_eq!(r.len(), 18);
            assert_eq!((r[2], r[12], r[13]), (0x05, 0x21, 0x00));
        })
        .expect("with_usb");
}

#[test]
fn set_configuration_resets_transfer() {
    BlankCtx {}
        .with_usb(|mut cls, mut dev| {
            adsc!(dev, cls, cb(WRITE_10, 100, 3));

            let t = cls.ufi().transfer();
            assert_eq!(t.phase(), Phase::Writing);
            assert_eq!((t.lba, t.write_remaining), (100, 3));

            dev.device_set_configuration(&mut cls, 1).expect("set configuration");
            assert_eq!(cls.ufi().transfer().phase(), Phase::Idle);
        })
        .expect("with_usb");
}

#[test]
fn cbi_descriptor() {
    BlankCtx {}
        .with_usb(|mut cls, mut dev| {
            let desc = dev.device_get_descriptor(&mut cls, 2, 0, 0, 255).expect("descriptor");
            // configuration, interface, bulk-in, bulk-out, interrupt
            assert_eq!(desc.len(), 9 + 9 + 3 * 7);
            assert_eq!(desc[9 + 4], 3);
            assert_eq!(&desc[9 + 5..9 + 8], &[0x08, 0x04, 0x00]);
        })
        .expect("with_usb");
}

#[test]
fn cb_variant_has_no_interrupt_endpoint() {
    CbCtx {}
        .with_usb(|mut cls, mut dev| {
            let desc = dev.device_get_descriptor(&mut cls, 2, 0, 0, 255).expect("descriptor");
            assert_eq!(desc.len(), 9 + 9 + 2 * 7);
            assert_eq!(desc[9 + 4], 2);
            assert_eq!(&desc[9 + 5..9 + 8], &[0x08, 0x04, 0x01]);

            adsc!(dev, cls, cb(INQUIRY, 0, 0));
            let r = dev.ep_read(&mut cls, BULK_EP, 64).expect("bulk-in");
            assert_eq!(r.len(), 36);
        })
        .expect("with_usb");
}

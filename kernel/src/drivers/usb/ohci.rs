//! OHCI (Open Host Controller Interface) detection.
//!
//! OHCI implements USB 1.1 and is common on non-Intel chipsets, but its
//! endpoint-descriptor-linked-list scheduling model doesn't fit the same
//! QH/qTD-style transfer path EHCI and UHCI share — like xHCI, it is
//! identified on the PCI bus (class 0x0C, subclass 0x03, prog_if 0x10) and
//! registered with `usb::usbcore` for presence reporting only; every
//! transfer method returns `NotImplemented`.

#![allow(dead_code)]

extern crate alloc;

use core::ptr::read_volatile;
use core::sync::atomic::{AtomicBool, Ordering};

use alloc::sync::Arc;
use alloc::vec::Vec;
use spin::Mutex;

use crate::drivers::pci::{self, PciDevice};
use crate::util::{KError, KResult};

use super::controller::{Controller, ControllerKind};
use super::SetupPacket;

const HC_REVISION: u64 = 0x00;
const HC_RH_DESCRIPTOR_A: u64 = 0x48;

/// OHCI controller, detection-only.
pub struct OhciController {
    pci_device: PciDevice,
    mmio_base: u64,
    num_ports: u8,
    revision: u8,
}

impl OhciController {
    fn probe(pci_device: PciDevice) -> KResult<Self> {
        let (bar0, is_io) = pci::read_bar(&pci_device, 0);
        if is_io || bar0 == 0 {
            return Err(KError::NotSupported);
        }

        crate::mm::map_mmio(bar0, 0x1000)?;
        let mmio_base = crate::mm::mmio_virt_addr(bar0).as_u64();

        let (revision, num_ports) = unsafe {
            let rev = read_volatile((mmio_base + HC_REVISION) as *const u32);
            let rh_a = read_volatile((mmio_base + HC_RH_DESCRIPTOR_A) as *const u32);
            ((rev & 0xFF) as u8, (rh_a & 0xFF) as u8)
        };

        crate::kprintln!(
            "ohci: detected controller {:02x}:{:02x}.{} revision {}.{}, {} ports — not supported as an active controller",
            pci_device.addr.bus, pci_device.addr.device, pci_device.addr.function,
            (revision >> 4) & 0xF, revision & 0xF, num_ports
        );

        Ok(Self {
            pci_device,
            mmio_base,
            num_ports,
            revision,
        })
    }

    pub fn num_ports(&self) -> u8 {
        self.num_ports
    }
}

impl Controller for OhciController {
    fn kind(&self) -> ControllerKind {
        ControllerKind::Ohci
    }

    fn control_transfer(
        &mut self,
        _address: u8,
        _endpoint: u8,
        _max_packet: u16,
        _setup: &SetupPacket,
        _data: Option<&mut [u8]>,
        _direction_in: bool,
    ) -> KResult<usize> {
        Err(KError::NotImplemented)
    }

    fn queue_interrupt_in(&mut self, _address: u8, _endpoint: u8, _buffer: &mut [u8], _interval_frames: u32) -> KResult<()> {
        Err(KError::NotImplemented)
    }

    fn poll_interrupt_transfer(&mut self) -> Option<(u8, u8, usize)> {
        None
    }

    fn bulk_transfer_out(&mut self, _address: u8, _endpoint: u8, _data: &[u8]) -> KResult<usize> {
        Err(KError::NotImplemented)
    }

    fn bulk_transfer_in(&mut self, _address: u8, _endpoint: u8, _buffer: &mut [u8]) -> KResult<usize> {
        Err(KError::NotImplemented)
    }
}

static OHCI_CONTROLLERS: Mutex<Vec<Arc<Mutex<OhciController>>>> = Mutex::new(Vec::new());
static OHCI_INITIALIZED: AtomicBool = AtomicBool::new(false);

/// Scan the PCI bus for OHCI controllers and register each as a detection-only
/// entry with `usbcore`.
pub fn probe_pci() {
    for dev in pci::scan() {
        if dev.class.class_code != 0x0C || dev.class.subclass != 0x03 || dev.class.prog_if != 0x10 {
            continue;
        }

        pci::enable_bus_mastering(&dev);

        match OhciController::probe(dev) {
            Ok(controller) => {
                let arc = Arc::new(Mutex::new(controller));
                OHCI_CONTROLLERS.lock().push(arc.clone());
                super::usbcore::register_controller(ControllerKind::Ohci, arc);
            }
            Err(e) => {
                crate::kprintln!("ohci: failed to probe controller: {:?}", e);
            }
        }
    }
}

pub fn init() {
    if OHCI_INITIALIZED.swap(true, Ordering::SeqCst) {
        return;
    }
    probe_pci();
}

pub fn controller_count() -> usize {
    OHCI_CONTROLLERS.lock().len()
}

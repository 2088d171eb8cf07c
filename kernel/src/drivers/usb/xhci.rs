//! xHCI (eXtensible Host Controller Interface) detection.
//!
//! USB 3.x SuperSpeed enumeration is out of scope for this host — xHCI
//! controllers are identified on the PCI bus (class 0x0C, subclass 0x03,
//! prog_if 0x30) and registered with `usb::usbcore` purely so
//! `active_controller()` can report their presence and functional
//! controllers (EHCI/UHCI) keep priority. Every transfer method returns
//! `NotImplemented`; devices plugged into an xHCI root port are never
//! enumerated.

#![allow(dead_code)]

extern crate alloc;

use core::ptr::read_volatile;
use core::sync::atomic::{AtomicBool, Ordering};

use alloc::sync::Arc;
use alloc::vec::Vec;
use spin::Mutex;

use crate::drivers::pci::{self, PciDevice};
use crate::mm;
use crate::util::{KError, KResult};

use super::controller::{Controller, ControllerKind};
use super::SetupPacket;

#[repr(C)]
struct CapRegs {
    cap_length: u8,
    _reserved: u8,
    hci_version: u16,
    hcs_params1: u32,
    hcs_params2: u32,
    hcs_params3: u32,
    hcc_params1: u32,
    dboff: u32,
    rtsoff: u32,
}

/// xHCI controller, detection-only: enough register access to log identity
/// and port count, none of the command/event/transfer ring machinery.
pub struct XhciController {
    pci_device: PciDevice,
    mmio_virt: u64,
    max_slots: u8,
    max_ports: u8,
}

impl XhciController {
    fn probe(pci_device: PciDevice) -> KResult<Self> {
        let (bar0, is_io) = pci::read_bar(&pci_device, 0);
        if is_io || bar0 == 0 {
            return Err(KError::NotSupported);
        }

        mm::map_mmio(bar0, 0x2000)?;
        let mmio_virt = mm::mmio_virt_addr(bar0).as_u64();

        let (max_slots, max_ports) = unsafe {
            let cap = mmio_virt as *const CapRegs;
            let hcs_params1 = read_volatile(&(*cap).hcs_params1);
            (
                (hcs_params1 & 0xFF) as u8,
                ((hcs_params1 >> 24) & 0xFF) as u8,
            )
        };

        crate::kprintln!(
            "xhci: detected controller {:02x}:{:02x}.{} ({} slots, {} ports) — SuperSpeed enumeration not supported",
            pci_device.addr.bus, pci_device.addr.device, pci_device.addr.function,
            max_slots, max_ports
        );

        Ok(Self {
            pci_device,
            mmio_virt,
            max_slots,
            max_ports,
        })
    }

    pub fn max_ports(&self) -> u8 {
        self.max_ports
    }

    pub fn max_slots(&self) -> u8 {
        self.max_slots
    }
}

impl Controller for XhciController {
    fn kind(&self) -> ControllerKind {
        ControllerKind::Xhci
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

static XHCI_CONTROLLERS: Mutex<Vec<Arc<Mutex<XhciController>>>> = Mutex::new(Vec::new());
static XHCI_INITIALIZED: AtomicBool = AtomicBool::new(false);

pub fn init() {
    if XHCI_INITIALIZED.swap(true, Ordering::SeqCst) {
        return;
    }

    for dev in pci::scan() {
        if dev.class.class_code != 0x0C || dev.class.subclass != 0x03 || dev.class.prog_if != 0x30 {
            continue;
        }

        pci::enable_bus_mastering(&dev);

        match XhciController::probe(dev) {
            Ok(controller) => {
                let arc = Arc::new(Mutex::new(controller));
                XHCI_CONTROLLERS.lock().push(arc.clone());
                super::usbcore::register_controller(ControllerKind::Xhci, arc);
            }
            Err(e) => {
                crate::kprintln!("xhci: failed to probe controller: {:?}", e);
            }
        }
    }
}

pub fn controller_count() -> usize {
    XHCI_CONTROLLERS.lock().len()
}

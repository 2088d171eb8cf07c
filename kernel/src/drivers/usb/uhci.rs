//! UHCI (Universal Host Controller Interface) driver for USB 1.1.
//!
//! UHCI is Intel's implementation of USB 1.1 controllers (commonly found
//! in Intel chipsets). Implements Low Speed (1.5 Mbps) and Full Speed (12 Mbps).
//!
//! Key features:
//! - I/O port-based register access
//! - Frame list (1024 entries) for scheduling
//! - Queue Heads (QH) for endpoint management
//! - Transfer Descriptors (TD) for transfers
//! - Control, bulk, and interrupt transfers through the `Controller` trait

#![allow(dead_code)]

extern crate alloc;

use alloc::boxed::Box;
use alloc::sync::Arc;
use alloc::vec::Vec;
use core::sync::atomic::{AtomicBool, Ordering};
use spin::Mutex;
use x86_64::instructions::port::Port;

use crate::drivers::pci::{self, PciDevice};
use crate::mm;
use crate::util::{KError, KResult};

use super::controller::{Controller, ControllerKind};
use super::{SetupPacket, UsbSpeed};

// =============================================================================
// UHCI Register Offsets (I/O Ports)
// =============================================================================

const USBCMD: u16 = 0x00;
const USBSTS: u16 = 0x02;
const USBINTR: u16 = 0x04;
const FRNUM: u16 = 0x06;
const FRBASEADD: u16 = 0x08;
const SOFMOD: u16 = 0x0C;
const PORTSC1: u16 = 0x10;
const PORTSC2: u16 = 0x12;

// =============================================================================
// USBCMD bits
// =============================================================================

const CMD_RS: u16 = 1 << 0;
const CMD_HCRESET: u16 = 1 << 1;
const CMD_GRESET: u16 = 1 << 2;
const CMD_EGSM: u16 = 1 << 3;
const CMD_FGR: u16 = 1 << 4;
const CMD_SWDBG: u16 = 1 << 5;
const CMD_CF: u16 = 1 << 6;
const CMD_MAXP: u16 = 1 << 7;

// =============================================================================
// USBSTS bits
// =============================================================================

const STS_USBINT: u16 = 1 << 0;
const STS_USBERRINT: u16 = 1 << 1;
const STS_RD: u16 = 1 << 2;
const STS_HSE: u16 = 1 << 3;
const STS_HCPE: u16 = 1 << 4;
const STS_HCHALTED: u16 = 1 << 5;

// =============================================================================
// USBINTR bits
// =============================================================================

const INTR_TOCRCIE: u16 = 1 << 0;
const INTR_RIE: u16 = 1 << 1;
const INTR_IOCE: u16 = 1 << 2;
const INTR_SPIE: u16 = 1 << 3;

// =============================================================================
// PORTSC bits
// =============================================================================

const PORTSC_CCS: u16 = 1 << 0;
const PORTSC_CSC: u16 = 1 << 1;
const PORTSC_PE: u16 = 1 << 2;
const PORTSC_PEC: u16 = 1 << 3;
const PORTSC_LSDA: u16 = 1 << 8;
const PORTSC_PR: u16 = 1 << 9;
const PORTSC_SUSPEND: u16 = 1 << 12;

// =============================================================================
// Frame List Pointer
// =============================================================================

const FLP_T: u32 = 1 << 0;
const FLP_Q: u32 = 1 << 1;

// =============================================================================
// Transfer Descriptor (TD) - 32 bytes
// =============================================================================

const TD_STATUS_ACTIVE: u32 = 1 << 23;
const TD_STATUS_STALLED: u32 = 1 << 22;
const TD_STATUS_DBE: u32 = 1 << 21;
const TD_STATUS_BABBLE: u32 = 1 << 20;
const TD_STATUS_NAK: u32 = 1 << 19;
const TD_STATUS_CRC: u32 = 1 << 18;
const TD_STATUS_BITSTUFF: u32 = 1 << 17;
const TD_IOC: u32 = 1 << 24;
const TD_IOS: u32 = 1 << 25;
const TD_LS: u32 = 1 << 26;
const TD_CERR_MASK: u32 = 3 << 27;
const TD_SPD: u32 = 1 << 29;

const TD_PID_SETUP: u32 = 0x2D;
const TD_PID_IN: u32 = 0x69;
const TD_PID_OUT: u32 = 0xE1;

/// UHCI Transfer Descriptor
#[repr(C, align(16))]
#[derive(Debug)]
pub struct TransferDescriptor {
    pub link_ptr: u32,
    pub ctrl_status: u32,
    pub token: u32,
    pub buffer_ptr: u32,
    pub sw_reserved: [u32; 4],
}

impl TransferDescriptor {
    pub fn new() -> Self {
        Self {
            link_ptr: FLP_T,
            ctrl_status: 0,
            token: 0,
            buffer_ptr: 0,
            sw_reserved: [0; 4],
        }
    }

    pub fn setup_setup(&mut self, address: u8, endpoint: u8, data_phys: u32, len: u16, low_speed: bool) {
        self.ctrl_status = TD_STATUS_ACTIVE | (3 << 27);
        if low_speed {
            self.ctrl_status |= TD_LS;
        }
        let maxlen = if len == 0 { 0x7FF } else { (len - 1) as u32 };
        self.token = (maxlen << 21) | ((endpoint as u32) << 15) | ((address as u32) << 8) | TD_PID_SETUP;
        self.buffer_ptr = data_phys;
    }

    pub fn setup_in(&mut self, address: u8, endpoint: u8, data_phys: u32, len: u16, toggle: bool, low_speed: bool) {
        self.ctrl_status = TD_STATUS_ACTIVE | TD_SPD | (3 << 27);
        if low_speed {
            self.ctrl_status |= TD_LS;
        }
        let maxlen = if len == 0 { 0x7FF } else { (len - 1) as u32 };
        let d = if toggle { 1 } else { 0 };
        self.token = (maxlen << 21) | (d << 19) | ((endpoint as u32) << 15) | ((address as u32) << 8) | TD_PID_IN;
        self.buffer_ptr = data_phys;
    }

    pub fn setup_out(&mut self, address: u8, endpoint: u8, data_phys: u32, len: u16, toggle: bool, low_speed: bool) {
        self.ctrl_status = TD_STATUS_ACTIVE | (3 << 27);
        if low_speed {
            self.ctrl_status |= TD_LS;
        }
        let maxlen = if len == 0 { 0x7FF } else { (len - 1) as u32 };
        let d = if toggle { 1 } else { 0 };
        self.token = (maxlen << 21) | (d << 19) | ((endpoint as u32) << 15) | ((address as u32) << 8) | TD_PID_OUT;
        self.buffer_ptr = data_phys;
    }

    pub fn is_active(&self) -> bool {
        self.ctrl_status & TD_STATUS_ACTIVE != 0
    }

    pub fn is_success(&self) -> bool {
        (self.ctrl_status & 0x00FF0000) == 0
    }

    pub fn is_stalled(&self) -> bool {
        self.ctrl_status & TD_STATUS_STALLED != 0
    }

    pub fn actual_length(&self) -> u16 {
        ((self.ctrl_status + 1) & 0x7FF) as u16
    }
}

// =============================================================================
// Queue Head (QH) - 16 bytes
// =============================================================================

#[repr(C, align(16))]
#[derive(Debug)]
pub struct QueueHead {
    pub head_link_ptr: u32,
    pub element_link_ptr: u32,
    pub sw_reserved: [u32; 2],
}

impl QueueHead {
    pub fn new() -> Self {
        Self {
            head_link_ptr: FLP_T,
            element_link_ptr: FLP_T,
            sw_reserved: [0; 2],
        }
    }

    pub fn set_next_qh(&mut self, phys: u32) {
        self.head_link_ptr = (phys & !0xF) | FLP_Q;
    }

    pub fn terminate_horizontal(&mut self) {
        self.head_link_ptr = FLP_T;
    }

    pub fn set_first_td(&mut self, phys: u32) {
        self.element_link_ptr = phys & !0xF;
    }

    pub fn terminate_element(&mut self) {
        self.element_link_ptr = FLP_T;
    }
}

/// A control or bulk transfer's TD chain plus backing buffers, kept alive
/// until the last TD is no longer active so the frame list never points at
/// freed memory.
struct PendingTransfer {
    _tds: Vec<Box<TransferDescriptor>>,
    _setup_buf: Vec<u8>,
    _data_buf: Vec<u8>,
    last_td_ptr: *const TransferDescriptor,
}

unsafe impl Send for PendingTransfer {}

/// An interrupt endpoint's single TD, reposted into the frame list on a
/// fixed interval.
struct InterruptEndpoint {
    address: u8,
    endpoint: u8,
    td: Box<TransferDescriptor>,
    toggle: bool,
    low_speed: bool,
    pending: bool,
}

unsafe impl Send for InterruptEndpoint {}

// =============================================================================
// UHCI Controller
// =============================================================================

pub struct UhciController {
    pci_device: PciDevice,
    io_base: u16,
    frame_list: Box<[u32; 1024]>,
    frame_list_phys: u64,
    control_qh: Box<QueueHead>,
    control_qh_phys: u64,
    bulk_qh: Box<QueueHead>,
    bulk_qh_phys: u64,
    running: AtomicBool,
    pending: Vec<PendingTransfer>,
    interrupt_eps: Vec<InterruptEndpoint>,
    completed_interrupts: Vec<(u8, u8, usize)>,
}

fn virt_to_phys32(addr: u64) -> KResult<u32> {
    Ok(mm::virt_to_phys(x86_64::VirtAddr::new(addr)).ok_or(KError::NoMemory)?.as_u64() as u32)
}

impl UhciController {
    pub fn new(pci_device: PciDevice, io_base: u16) -> KResult<Self> {
        let frame_list = Box::new([FLP_T; 1024]);
        let frame_list_phys = virt_to_phys32(frame_list.as_ptr() as u64)? as u64;

        let control_qh = Box::new(QueueHead::new());
        let control_qh_phys = virt_to_phys32(control_qh.as_ref() as *const QueueHead as u64)? as u64;

        let mut bulk_qh = Box::new(QueueHead::new());
        let bulk_qh_phys = virt_to_phys32(bulk_qh.as_ref() as *const QueueHead as u64)? as u64;
        bulk_qh.terminate_horizontal();

        let mut controller = Self {
            pci_device,
            io_base,
            frame_list,
            frame_list_phys,
            control_qh,
            control_qh_phys,
            bulk_qh,
            bulk_qh_phys,
            running: AtomicBool::new(false),
            pending: Vec::new(),
            interrupt_eps: Vec::new(),
            completed_interrupts: Vec::new(),
        };

        controller.control_qh.set_next_qh(controller.bulk_qh_phys as u32);

        let qh_entry = (controller.control_qh_phys as u32 & !0xF) | FLP_Q;
        for i in 0..1024 {
            controller.frame_list[i] = qh_entry;
        }

        unsafe {
            controller.reset()?;
        }
        controller.write32(FRBASEADD, controller.frame_list_phys as u32);
        controller.write16(FRNUM, 0);

        unsafe {
            controller.start()?;
        }

        controller.running.store(true, Ordering::Release);
        crate::kprintln!("uhci: controller initialized");
        Ok(controller)
    }

    unsafe fn read16(&self, offset: u16) -> u16 {
        let mut port = Port::<u16>::new(self.io_base + offset);
        port.read()
    }

    unsafe fn write16_raw(&self, offset: u16, value: u16) {
        let mut port = Port::<u16>::new(self.io_base + offset);
        port.write(value);
    }

    fn write16(&self, offset: u16, value: u16) {
        unsafe { self.write16_raw(offset, value) }
    }

    unsafe fn read32(&self, offset: u16) -> u32 {
        let mut port = Port::<u32>::new(self.io_base + offset);
        port.read()
    }

    fn write32(&self, offset: u16, value: u32) {
        unsafe {
            let mut port = Port::<u32>::new(self.io_base + offset);
            port.write(value);
        }
    }

    unsafe fn reset(&mut self) -> KResult<()> {
        self.write16_raw(USBCMD, 0);
        for _ in 0..100 {
            if self.read16(USBSTS) & STS_HCHALTED != 0 {
                break;
            }
            core::hint::spin_loop();
        }

        self.write16_raw(USBCMD, CMD_GRESET);
        crate::drivers::hpet::sleep_ms(10);
        self.write16_raw(USBCMD, 0);
        crate::drivers::hpet::sleep_ms(1);

        self.write16_raw(USBCMD, CMD_HCRESET);
        for _ in 0..100 {
            if self.read16(USBCMD) & CMD_HCRESET == 0 {
                break;
            }
            core::hint::spin_loop();
        }

        self.write16_raw(USBSTS, 0xFFFF);
        Ok(())
    }

    unsafe fn start(&mut self) -> KResult<()> {
        self.write16_raw(USBINTR, INTR_IOCE | INTR_RIE | INTR_SPIE | INTR_TOCRCIE);
        self.write16_raw(USBCMD, CMD_RS | CMD_CF | CMD_MAXP);

        for _ in 0..100 {
            if self.read16(USBSTS) & STS_HCHALTED == 0 {
                return Ok(());
            }
            core::hint::spin_loop();
        }
        Err(KError::Timeout)
    }

    /// UHCI always exposes exactly two root hub ports.
    pub fn num_ports(&self) -> u8 {
        2
    }

    fn port_reg(port: u8) -> u16 {
        if port == 0 {
            PORTSC1
        } else {
            PORTSC2
        }
    }

    /// Check a root port for a fresh connect-status-change and, if
    /// connected, reset it and report its speed.
    pub fn poll_port(&mut self, port: u8) -> Option<UsbSpeed> {
        let reg = Self::port_reg(port);
        let status = unsafe { self.read16(reg) };
        if status & PORTSC_CSC == 0 {
            return None;
        }
        self.write16(reg, status | PORTSC_CSC);

        if status & PORTSC_CCS == 0 {
            return None;
        }

        let speed = if status & PORTSC_LSDA != 0 {
            UsbSpeed::Low
        } else {
            UsbSpeed::Full
        };

        if self.reset_port(port).is_err() {
            return None;
        }

        Some(speed)
    }

    fn reset_port(&mut self, port: u8) -> KResult<()> {
        let reg = Self::port_reg(port);
        self.write16(reg, PORTSC_PR);
        crate::drivers::hpet::sleep_ms(50);

        let status = unsafe { self.read16(reg) };
        self.write16(reg, status & !PORTSC_PR);
        crate::drivers::hpet::sleep_ms(10);

        let status = unsafe { self.read16(reg) };
        self.write16(reg, status | PORTSC_PE);

        let status = unsafe { self.read16(reg) };
        self.write16(reg, status | PORTSC_CSC | PORTSC_PEC);

        Ok(())
    }

    pub fn check_host_system_error(&mut self) -> bool {
        let status = unsafe { self.read16(USBSTS) };
        if status & STS_HSE == 0 && status & STS_HCPE == 0 {
            return false;
        }
        crate::kprintln!("uhci: host system/process error, reinitializing controller");
        self.write16(USBSTS, STS_HSE | STS_HCPE);
        self.pending.clear();
        self.interrupt_eps.clear();
        self.completed_interrupts.clear();
        unsafe {
            if let Err(e) = self.reset() {
                crate::kprintln!("uhci: recovery reset failed: {:?}", e);
                return true;
            }
        }
        self.write32(FRBASEADD, self.frame_list_phys as u32);
        self.write16(FRNUM, 0);
        unsafe {
            if let Err(e) = self.start() {
                crate::kprintln!("uhci: recovery start failed: {:?}", e);
            }
        }
        true
    }

    fn reap_pending(&mut self) {
        self.pending.retain(|p| unsafe { (*p.last_td_ptr).is_active() });
    }

    fn do_control_transfer(
        &mut self,
        address: u8,
        endpoint: u8,
        setup: &SetupPacket,
        mut data: Option<&mut [u8]>,
        direction_in: bool,
        low_speed: bool,
    ) -> KResult<usize> {
        self.reap_pending();

        let setup_buf = alloc::vec![0u8; 8];
        let mut setup_buf = setup_buf;
        unsafe {
            core::ptr::copy_nonoverlapping(
                setup as *const SetupPacket as *const u8,
                setup_buf.as_mut_ptr(),
                8,
            );
        }
        let setup_phys = virt_to_phys32(setup_buf.as_ptr() as u64)?;

        let data_len = data.as_ref().map(|d| d.len()).unwrap_or(0);
        let mut data_buf: Vec<u8> = Vec::new();
        if data_len > 0 {
            data_buf = alloc::vec![0u8; data_len];
            if !direction_in {
                data_buf.copy_from_slice(data.as_deref().unwrap());
            }
        }
        let data_phys = if data_len > 0 { virt_to_phys32(data_buf.as_ptr() as u64)? } else { 0 };

        let mut tds: Vec<Box<TransferDescriptor>> = Vec::new();

        let mut setup_td = Box::new(TransferDescriptor::new());
        setup_td.setup_setup(address, endpoint, setup_phys, 8, low_speed);

        let mut data_td = if data_len > 0 {
            let mut td = Box::new(TransferDescriptor::new());
            if direction_in {
                td.setup_in(address, endpoint, data_phys, data_len as u16, true, low_speed);
            } else {
                td.setup_out(address, endpoint, data_phys, data_len as u16, true, low_speed);
            }
            Some(td)
        } else {
            None
        };

        let mut status_td = Box::new(TransferDescriptor::new());
        let status_is_in = !direction_in || data_len == 0;
        if status_is_in {
            status_td.setup_in(address, endpoint, 0, 0, true, low_speed);
        } else {
            status_td.setup_out(address, endpoint, 0, 0, true, low_speed);
        }

        let status_phys = virt_to_phys32(status_td.as_ref() as *const TransferDescriptor as u64)?;
        if let Some(ref mut dtd) = data_td {
            dtd.link_ptr = status_phys;
        } else {
            setup_td.link_ptr = status_phys;
        }
        if let Some(ref dtd) = data_td {
            let data_phys_td = virt_to_phys32(dtd.as_ref() as *const TransferDescriptor as u64)?;
            setup_td.link_ptr = data_phys_td;
        }

        let status_ptr = status_td.as_ref() as *const TransferDescriptor;

        self.control_qh.set_first_td(virt_to_phys32(setup_td.as_ref() as *const TransferDescriptor as u64)?);

        tds.push(setup_td);
        if let Some(dtd) = data_td {
            tds.push(dtd);
        }
        tds.push(status_td);

        for _ in 0..2000 {
            if unsafe { !(*status_ptr).is_active() } {
                break;
            }
            crate::drivers::hpet::sleep_ms(1);
        }

        self.control_qh.terminate_element();

        let had_error = tds.iter().any(|t| !t.is_active() && !t.is_success());
        // The data TD, when present, is always tds[1] (setup, data, status).
        let transferred = if data_len > 0 { tds[1].actual_length() as usize } else { 0 };

        if direction_in && data_len > 0 {
            if let Some(ref mut out) = data {
                let n = transferred.min(out.len());
                out[..n].copy_from_slice(&data_buf[..n]);
            }
        }

        self.pending.push(PendingTransfer {
            _tds: tds,
            _setup_buf: setup_buf,
            _data_buf: data_buf,
            last_td_ptr: status_ptr,
        });

        if had_error {
            return Err(KError::IO);
        }
        Ok(transferred)
    }

    fn do_bulk_transfer(&mut self, address: u8, endpoint: u8, mut buf: Vec<u8>, direction_in: bool, low_speed: bool) -> KResult<(usize, Vec<u8>)> {
        self.reap_pending();
        let phys = virt_to_phys32(buf.as_mut_ptr() as u64)?;
        let mut td = Box::new(TransferDescriptor::new());
        if direction_in {
            td.setup_in(address, endpoint, phys, buf.len() as u16, true, low_speed);
        } else {
            td.setup_out(address, endpoint, phys, buf.len() as u16, true, low_speed);
        }

        let td_phys = virt_to_phys32(td.as_ref() as *const TransferDescriptor as u64)?;
        self.bulk_qh.set_first_td(td_phys);

        let td_ptr = td.as_ref() as *const TransferDescriptor;
        for _ in 0..2000 {
            if unsafe { !(*td_ptr).is_active() } {
                break;
            }
            crate::drivers::hpet::sleep_ms(1);
        }
        self.bulk_qh.terminate_element();

        let had_error = unsafe { !(*td_ptr).is_success() && !(*td_ptr).is_active() };
        let transferred = unsafe { (*td_ptr).actual_length() as usize };

        self.pending.push(PendingTransfer {
            _tds: alloc::vec![td],
            _setup_buf: Vec::new(),
            _data_buf: Vec::new(),
            last_td_ptr: td_ptr,
        });

        if had_error {
            return Err(KError::IO);
        }
        Ok((transferred, buf))
    }
}

impl Controller for UhciController {
    fn kind(&self) -> ControllerKind {
        ControllerKind::Uhci
    }

    fn control_transfer(
        &mut self,
        address: u8,
        endpoint: u8,
        _max_packet: u16,
        setup: &SetupPacket,
        data: Option<&mut [u8]>,
        direction_in: bool,
    ) -> KResult<usize> {
        self.do_control_transfer(address, endpoint, setup, data, direction_in, false)
    }

    fn queue_interrupt_in(&mut self, address: u8, endpoint: u8, buffer: &mut [u8], interval_frames: u32) -> KResult<()> {
        let len = buffer.len().max(1);
        let phys = virt_to_phys32(buffer.as_mut_ptr() as u64)?;

        if let Some(existing) = self.interrupt_eps.iter_mut().find(|e| e.address == address && e.endpoint == endpoint) {
            if !existing.pending {
                existing.toggle = !existing.toggle;
                existing.td.setup_in(address, endpoint, phys, len as u16, existing.toggle, existing.low_speed);
                existing.pending = true;
            }
            return Ok(());
        }

        let mut td = Box::new(TransferDescriptor::new());
        td.setup_in(address, endpoint, phys, len as u16, false, false);
        let td_phys = virt_to_phys32(td.as_ref() as *const TransferDescriptor as u64)?;

        // Post into every Nth frame-list slot per the device's bInterval
        // (in full-speed frames; UHCI has no microframe schedule).
        let interval = (interval_frames.max(1) as usize).min(1024);
        let mut frame = 0usize;
        while frame < 1024 {
            self.frame_list[frame] = td_phys | 0;
            frame += interval;
        }

        self.interrupt_eps.push(InterruptEndpoint {
            address,
            endpoint,
            td,
            toggle: false,
            low_speed: false,
            pending: true,
        });

        Ok(())
    }

    fn poll_interrupt_transfer(&mut self) -> Option<(u8, u8, usize)> {
        for ep in self.interrupt_eps.iter_mut() {
            if ep.pending && !ep.td.is_active() {
                ep.pending = false;
                if ep.td.is_success() {
                    let n = ep.td.actual_length() as usize;
                    self.completed_interrupts.push((ep.address, ep.endpoint, n));
                }
            }
        }
        if self.completed_interrupts.is_empty() {
            None
        } else {
            Some(self.completed_interrupts.remove(0))
        }
    }

    fn bulk_transfer_out(&mut self, address: u8, endpoint: u8, data: &[u8]) -> KResult<usize> {
        let (n, _) = self.do_bulk_transfer(address, endpoint, data.to_vec(), false, false)?;
        Ok(n)
    }

    fn bulk_transfer_in(&mut self, address: u8, endpoint: u8, buffer: &mut [u8]) -> KResult<usize> {
        let (n, buf) = self.do_bulk_transfer(address, endpoint, alloc::vec![0u8; buffer.len()], true, false)?;
        buffer[..n.min(buffer.len())].copy_from_slice(&buf[..n.min(buffer.len())]);
        Ok(n)
    }
}

// =============================================================================
// Module Functions
// =============================================================================

static UHCI_CONTROLLERS: Mutex<Vec<Arc<Mutex<UhciController>>>> = Mutex::new(Vec::new());
static UHCI_INITIALIZED: AtomicBool = AtomicBool::new(false);

fn scan_root_ports(controller: &Arc<Mutex<UhciController>>, num_ports: u8) {
    for port in 0..num_ports {
        let speed = controller.lock().poll_port(port);
        if let Some(speed) = speed {
            crate::kprintln!("uhci: enumerating device on root port {}", port + 1);
            if let Err(e) = super::usbcore::enumerate_device(speed, None, port) {
                crate::kprintln!("uhci: enumeration failed on port {}: {:?}", port + 1, e);
            }
        }
    }
}

/// Probe PCI for UHCI controllers.
pub fn probe_pci() {
    let devices = pci::scan();

    for dev in devices {
        if dev.class.class_code == 0x0C && dev.class.subclass == 0x03 && dev.class.prog_if == 0x00 {
            crate::kprintln!(
                "uhci: found controller at {:02X}:{:02X}.{:X}",
                dev.addr.bus, dev.addr.device, dev.addr.function
            );

            let (bar4_addr, is_io) = pci::read_bar(&dev, 4);
            if !is_io || bar4_addr == 0 {
                continue;
            }
            let io_base = (bar4_addr & 0xFFFF) as u16;

            pci::enable_bus_mastering(&dev);

            match UhciController::new(dev, io_base) {
                Ok(controller) => {
                    let num_ports = controller.num_ports();
                    let arc = Arc::new(Mutex::new(controller));
                    UHCI_CONTROLLERS.lock().push(arc.clone());
                    super::usbcore::register_controller(ControllerKind::Uhci, arc.clone());
                    scan_root_ports(&arc, num_ports);
                }
                Err(e) => {
                    crate::kprintln!("uhci: init failed: {:?}", e);
                }
            }
        }
    }
}

/// Initialize UHCI subsystem.
pub fn init() {
    if UHCI_INITIALIZED.swap(true, Ordering::SeqCst) {
        return;
    }
    crate::kprintln!("uhci: scanning for USB 1.1 UHCI controllers");
    probe_pci();

    let count = UHCI_CONTROLLERS.lock().len();
    if count > 0 {
        crate::kprintln!("uhci: {} controller(s) initialized", count);
    }
}

/// Poll every controller's root ports for connect/disconnect and check for
/// a host system error.
pub fn poll_all() {
    let controllers: Vec<Arc<Mutex<UhciController>>> = UHCI_CONTROLLERS.lock().clone();
    for ctrl in controllers {
        let mut guard = ctrl.lock();
        if guard.check_host_system_error() {
            continue;
        }
        let num_ports = guard.num_ports();
        drop(guard);
        scan_root_ports(&ctrl, num_ports);
    }
}

/// Get number of UHCI controllers.
pub fn controller_count() -> usize {
    UHCI_CONTROLLERS.lock().len()
}

//! EHCI (Enhanced Host Controller Interface) driver for USB 2.0.
//!
//! Implements:
//! - Capability and operational register access
//! - BIOS-to-OS handoff via the USB Legacy Support extended capability
//! - Async schedule (self-linked reclamation QH) and a populated periodic
//!   schedule for interrupt endpoints
//! - Queue Heads (QH) and Transfer Descriptors (qTD), allocated from
//!   page-backed pools instead of one heap box per transfer
//! - Control, bulk, and interrupt transfers through the `Controller` trait,
//!   with qTD chains for transfers over the 20KiB-per-qTD limit and a
//!   persisted data-toggle bit per (address, endpoint)
//! - Host system error recovery
//! - Port status/control and handoff of non-high-speed ports to companion
//!   controllers

#![allow(dead_code)]

extern crate alloc;

use alloc::boxed::Box;
use alloc::collections::BTreeMap;
use alloc::sync::Arc;
use alloc::vec::Vec;
use core::ptr::{read_volatile, write_volatile};
use core::sync::atomic::{AtomicBool, Ordering};

use spin::Mutex;

use crate::drivers::pci::{self, PciDevice};
use crate::mm;
use crate::util::{KError, KResult};

use super::controller::{Controller, ControllerKind};
use super::{SetupPacket, UsbSpeed};

/// A control- or bulk-transfer qTD chain plus its backing buffer, kept
/// alive until the status (or final data) qTD completes. Reclaiming these
/// lazily, instead of `mem::forget`-ing them, is what makes repeated
/// transfers not leak memory; the qTDs and QH themselves go back to their
/// pools rather than being dropped.
struct PendingControl {
    _setup: Box<SetupPacket>,
    qtd_ptrs: Vec<*mut TransferDescriptor>,
    _data_buf: Vec<u8>,
    qh_ptr: *mut QueueHead,
    status_qtd_ptr: *const TransferDescriptor,
}

// SAFETY: the controller is only ever driven from one polling thread at a
// time under its own lock; raw pointers here just avoid re-borrowing
// through the pools while a transfer is in flight.
unsafe impl Send for PendingControl {}

/// A periodic (interrupt) endpoint's QH plus the qTD chain posted for its
/// next report. The QH and qTDs are allocated once, at registration, and
/// rearmed in place on every subsequent poll rather than reallocated.
struct InterruptEndpoint {
    address: u8,
    endpoint: u8,
    interval_frames: u32,
    qh_ptr: *mut QueueHead,
    qtd_ptrs: Vec<*mut TransferDescriptor>,
    chunk_lens: Vec<usize>,
    /// Physical address of the caller-owned buffer the qTD chain DMAs
    /// into. The caller (`hid`, `InterruptRegistration`) keeps that buffer
    /// at a fixed address across calls and reads the completed report
    /// straight out of it, the same way `bulk_transfer_in` would if it
    /// were posted once and polled repeatedly instead of awaited.
    buffer_phys: u64,
    buffer_len: usize,
    pending: bool,
}

unsafe impl Send for InterruptEndpoint {}

/// EHCI controller
pub struct EhciController {
    pci_device: PciDevice,
    cap_base: u64,
    op_base: u64,
    num_ports: u8,
    addr64_capable: bool,
    periodic_list: Box<[u32; 1024]>,
    periodic_list_phys: u64,
    async_head: Box<QueueHead>,
    async_head_phys: u64,
    running: AtomicBool,
    qtd_pool: QtdPool,
    qh_pool: QueueHeadPool,
    /// Persisted data-toggle bit per (address, endpoint), for endpoints
    /// whose toggle must survive across separate `Controller` calls (bulk,
    /// interrupt). Control endpoint 0 isn't tracked here — its data and
    /// status stages follow a fixed per-transfer sequence instead (USB 2.0
    /// 8.5.3), reset at the start of every control transfer.
    toggles: BTreeMap<(u8, u8), bool>,
    pending_controls: Vec<PendingControl>,
    interrupt_eps: Vec<InterruptEndpoint>,
    completed_interrupts: Vec<(u8, u8, usize)>,
}

// =============================================================================
// EHCI Capability Registers (offset from cap_base)
// =============================================================================

const CAPLENGTH: u32 = 0x00;
const HCIVERSION: u32 = 0x02;
const HCSPARAMS: u32 = 0x04;
const HCCPARAMS: u32 = 0x08;
const HCSP_PORTROUTE: u32 = 0x0C;

// =============================================================================
// EHCI Operational Registers (offset from op_base)
// =============================================================================

const USBCMD: u32 = 0x00;
const USBSTS: u32 = 0x04;
const USBINTR: u32 = 0x08;
const FRINDEX: u32 = 0x0C;
const CTRLDSSEGMENT: u32 = 0x10;
const PERIODICLISTBASE: u32 = 0x14;
const ASYNCLISTADDR: u32 = 0x18;
const CONFIGFLAG: u32 = 0x40;
const PORTSC: u32 = 0x44;

// =============================================================================
// USBCMD bits
// =============================================================================

const CMD_RUN: u32 = 1 << 0;
const CMD_HCRESET: u32 = 1 << 1;
const CMD_FLS_1024: u32 = 0 << 2;
const CMD_PSE: u32 = 1 << 4;
const CMD_ASE: u32 = 1 << 5;
const CMD_IAAD: u32 = 1 << 6;

// =============================================================================
// USBSTS bits
// =============================================================================

const STS_USBINT: u32 = 1 << 0;
const STS_USBERRINT: u32 = 1 << 1;
const STS_PCD: u32 = 1 << 2;
const STS_FLR: u32 = 1 << 3;
const STS_HSE: u32 = 1 << 4;
const STS_IAA: u32 = 1 << 5;
const STS_HALT: u32 = 1 << 12;

// =============================================================================
// PORTSC bits
// =============================================================================

const PORTSC_CCS: u32 = 1 << 0;
const PORTSC_CSC: u32 = 1 << 1;
const PORTSC_PE: u32 = 1 << 2;
const PORTSC_PEC: u32 = 1 << 3;
const PORTSC_FPR: u32 = 1 << 6;
const PORTSC_SUSPEND: u32 = 1 << 7;
const PORTSC_PR: u32 = 1 << 8;
const PORTSC_LS_MASK: u32 = 3 << 10;
const PORTSC_PP: u32 = 1 << 12;
const PORTSC_PO: u32 = 1 << 13;

// =============================================================================
// USB Legacy Support extended capability (BIOS handoff)
// =============================================================================

const EECP_CAP_ID_LEGACY: u8 = 0x01;
const LEGSUP_HC_OS_OWNED: u32 = 1 << 24;
const LEGSUP_HC_BIOS_OWNED: u32 = 1 << 16;

// =============================================================================
// Queue Head (QH) - 48 bytes, 32-byte aligned
// =============================================================================

#[repr(C, align(32))]
pub struct QueueHead {
    pub hlp: u32,
    pub ep_char: u32,
    pub ep_caps: u32,
    pub current_qtd: u32,
    pub next_qtd: u32,
    pub alt_qtd: u32,
    pub token: u32,
    pub buffer0: u32,
    pub buffer1: u32,
    pub buffer2: u32,
    pub buffer3: u32,
    pub buffer4: u32,
}

impl QueueHead {
    pub fn new_async(address: u8, endpoint: u8, max_packet: u16, speed: UsbSpeed) -> Self {
        let nak_cnt = 15u32;
        let ep_char = (address as u32)
            | ((endpoint as u32) << 8)
            | (Self::speed_to_eps(speed) << 12)
            | (1 << 14) // DTC
            | ((max_packet as u32) << 16)
            | (nak_cnt << 28);
        let ep_caps = 1 << 30; // Mult = 1

        Self {
            hlp: 1,
            ep_char,
            ep_caps,
            current_qtd: 0,
            next_qtd: 1,
            alt_qtd: 1,
            token: 0,
            buffer0: 0,
            buffer1: 0,
            buffer2: 0,
            buffer3: 0,
            buffer4: 0,
        }
    }

    /// Create a QH for an interrupt endpoint in the periodic schedule.
    pub fn new_interrupt(address: u8, endpoint: u8, max_packet: u16, speed: UsbSpeed) -> Self {
        let mut qh = Self::new_async(address, endpoint, max_packet, speed);
        qh.ep_caps |= 1; // S-mask: poll every frame (uF 0) for simplicity
        qh
    }

    /// A blank QH suitable for sitting unused on a pool's free list. Not
    /// linked into any schedule until a caller fills in `ep_char`/etc. and
    /// calls `link_qtd`.
    fn blank() -> Self {
        Self {
            hlp: 1,
            ep_char: 0,
            ep_caps: 0,
            current_qtd: 0,
            next_qtd: 1,
            alt_qtd: 1,
            token: 0,
            buffer0: 0,
            buffer1: 0,
            buffer2: 0,
            buffer3: 0,
            buffer4: 0,
        }
    }

    fn speed_to_eps(speed: UsbSpeed) -> u32 {
        match speed {
            UsbSpeed::Low => 1,
            UsbSpeed::Full => 0,
            UsbSpeed::High => 2,
            _ => 2,
        }
    }

    pub fn link_to(&mut self, phys_addr: u64) {
        self.hlp = ((phys_addr as u32) & !0x1F) | 0x02;
    }

    pub fn link_to_self(&mut self, self_phys: u64) {
        self.hlp = ((self_phys as u32) & !0x1F) | 0x02;
    }

    pub fn link_qtd(&mut self, qtd_phys: u64) {
        self.next_qtd = (qtd_phys as u32) & !0x1F;
        self.alt_qtd = 1;
    }
}

// =============================================================================
// Queue Element Transfer Descriptor (qTD) - 32 bytes, 32-byte aligned
// =============================================================================

#[repr(C, align(32))]
pub struct TransferDescriptor {
    pub next_qtd: u32,
    pub alt_qtd: u32,
    pub token: u32,
    pub buffer0: u32,
    pub buffer1: u32,
    pub buffer2: u32,
    pub buffer3: u32,
    pub buffer4: u32,
}

const QTD_STATUS_ACTIVE: u32 = 1 << 7;
const QTD_STATUS_HALTED: u32 = 1 << 6;
const QTD_STATUS_BUFERR: u32 = 1 << 5;
const QTD_STATUS_BABBLE: u32 = 1 << 4;
const QTD_STATUS_XACTERR: u32 = 1 << 3;

const QTD_PID_OUT: u32 = 0 << 8;
const QTD_PID_IN: u32 = 1 << 8;
const QTD_PID_SETUP: u32 = 2 << 8;

const QTD_IOC: u32 = 1 << 15;
const QTD_TOTAL_BYTES_SHIFT: u32 = 16;
const QTD_TOGGLE: u32 = 1 << 31;

/// A single qTD's 5 buffer-page pointers cover one page each, so one qTD
/// moves at most this many bytes; longer transfers chain multiple qTDs.
const QTD_MAX_BUFFER: usize = 5 * 4096;

impl TransferDescriptor {
    pub fn new_setup(setup_packet_phys: u64, data_toggle: bool) -> Self {
        let token = QTD_STATUS_ACTIVE
            | QTD_PID_SETUP
            | (3 << 10)
            | (8 << QTD_TOTAL_BYTES_SHIFT)
            | if data_toggle { QTD_TOGGLE } else { 0 };

        Self {
            next_qtd: 1,
            alt_qtd: 1,
            token,
            buffer0: setup_packet_phys as u32,
            buffer1: 0,
            buffer2: 0,
            buffer3: 0,
            buffer4: 0,
        }
    }

    pub fn new_data(buffer_phys: u64, length: u16, is_in: bool, data_toggle: bool) -> Self {
        let pid = if is_in { QTD_PID_IN } else { QTD_PID_OUT };
        let token = QTD_STATUS_ACTIVE
            | pid
            | (3 << 10)
            | QTD_IOC
            | ((length as u32) << QTD_TOTAL_BYTES_SHIFT)
            | if data_toggle { QTD_TOGGLE } else { 0 };

        Self {
            next_qtd: 1,
            alt_qtd: 1,
            token,
            buffer0: buffer_phys as u32,
            buffer1: ((buffer_phys + 0x1000) & !0xFFF) as u32,
            buffer2: ((buffer_phys + 0x2000) & !0xFFF) as u32,
            buffer3: ((buffer_phys + 0x3000) & !0xFFF) as u32,
            buffer4: ((buffer_phys + 0x4000) & !0xFFF) as u32,
        }
    }

    pub fn new_status(is_in: bool, data_toggle: bool) -> Self {
        let pid = if is_in { QTD_PID_IN } else { QTD_PID_OUT };
        let token = QTD_STATUS_ACTIVE | pid | (3 << 10) | QTD_IOC | if data_toggle { QTD_TOGGLE } else { 0 };

        Self {
            next_qtd: 1,
            alt_qtd: 1,
            token,
            buffer0: 0,
            buffer1: 0,
            buffer2: 0,
            buffer3: 0,
            buffer4: 0,
        }
    }

    /// A blank, inactive qTD suitable for sitting unused on a pool's free
    /// list.
    fn blank() -> Self {
        Self {
            next_qtd: 1,
            alt_qtd: 1,
            token: 0,
            buffer0: 0,
            buffer1: 0,
            buffer2: 0,
            buffer3: 0,
            buffer4: 0,
        }
    }

    pub fn link_to(&mut self, next_phys: u64) {
        self.next_qtd = (next_phys as u32) & !0x1F;
    }

    pub fn is_complete(&self) -> bool {
        (self.token & QTD_STATUS_ACTIVE) == 0
    }

    pub fn has_error(&self) -> bool {
        (self.token & (QTD_STATUS_HALTED | QTD_STATUS_BUFERR | QTD_STATUS_BABBLE | QTD_STATUS_XACTERR)) != 0
    }

    pub fn bytes_transferred(&self, original_length: u16) -> u16 {
        let remaining = ((self.token >> QTD_TOTAL_BYTES_SHIFT) & 0x7FFF) as u16;
        original_length.saturating_sub(remaining)
    }

    pub fn rearm(&mut self, length: u16, is_in: bool, data_toggle: bool) {
        let pid = if is_in { QTD_PID_IN } else { QTD_PID_OUT };
        self.token = QTD_STATUS_ACTIVE
            | pid
            | (3 << 10)
            | QTD_IOC
            | ((length as u32) << QTD_TOTAL_BYTES_SHIFT)
            | if data_toggle { QTD_TOGGLE } else { 0 };
    }
}

fn virt_to_phys_u64(addr: u64) -> KResult<u64> {
    mm::virt_to_phys(x86_64::VirtAddr::new(addr))
        .ok_or(KError::NoMemory)
        .map(|p| p.as_u64())
}

// =============================================================================
// qTD / QH pools
// =============================================================================

const QTD_PAGE_CAPACITY: usize = 4096 / core::mem::size_of::<TransferDescriptor>();
const QH_PAGE_CAPACITY: usize = 4096 / core::mem::size_of::<QueueHead>();

/// Page-backed qTD pool with a free list. A 4KiB page holds
/// `QTD_PAGE_CAPACITY` 32-byte-aligned descriptors; transfers pop one off
/// the free list instead of boxing a fresh page-sized allocation per qTD,
/// and return it to the list once its transfer is reaped.
struct QtdPool {
    pages: Vec<Box<[TransferDescriptor; QTD_PAGE_CAPACITY]>>,
    free: Vec<*mut TransferDescriptor>,
}

unsafe impl Send for QtdPool {}

impl QtdPool {
    fn new() -> Self {
        Self { pages: Vec::new(), free: Vec::new() }
    }

    fn grow(&mut self) {
        let mut page: Box<[TransferDescriptor; QTD_PAGE_CAPACITY]> =
            Box::new([(); QTD_PAGE_CAPACITY].map(|_| TransferDescriptor::blank()));
        for qtd in page.iter_mut() {
            self.free.push(qtd as *mut TransferDescriptor);
        }
        self.pages.push(page);
    }

    fn alloc(&mut self) -> *mut TransferDescriptor {
        if self.free.is_empty() {
            self.grow();
        }
        self.free.pop().expect("qtd pool just grown")
    }

    fn free_one(&mut self, ptr: *mut TransferDescriptor) {
        self.free.push(ptr);
    }
}

/// Page-backed QH pool, same shape as `QtdPool`.
struct QueueHeadPool {
    pages: Vec<Box<[QueueHead; QH_PAGE_CAPACITY]>>,
    free: Vec<*mut QueueHead>,
}

unsafe impl Send for QueueHeadPool {}

impl QueueHeadPool {
    fn new() -> Self {
        Self { pages: Vec::new(), free: Vec::new() }
    }

    fn grow(&mut self) {
        let mut page: Box<[QueueHead; QH_PAGE_CAPACITY]> =
            Box::new([(); QH_PAGE_CAPACITY].map(|_| QueueHead::blank()));
        for qh in page.iter_mut() {
            self.free.push(qh as *mut QueueHead);
        }
        self.pages.push(page);
    }

    fn alloc(&mut self) -> *mut QueueHead {
        if self.free.is_empty() {
            self.grow();
        }
        self.free.pop().expect("qh pool just grown")
    }

    fn free_one(&mut self, ptr: *mut QueueHead) {
        self.free.push(ptr);
    }
}

/// Split a `len`-byte transfer into qTD-sized chunks, each at most
/// `QTD_MAX_BUFFER`. A chunk that would otherwise end mid-packet is pulled
/// back to the nearest `max_packet` boundary so a short final packet
/// doesn't silently merge into the next qTD's first packet.
fn qtd_chunk_lengths(len: usize, max_packet: u16) -> Vec<usize> {
    let mut out = Vec::new();
    let mut remaining = len;
    while remaining > 0 {
        let mut chunk = remaining.min(QTD_MAX_BUFFER);
        if chunk < remaining && max_packet > 0 {
            let aligned = chunk - (chunk % max_packet as usize);
            chunk = if aligned == 0 { (max_packet as usize).min(remaining) } else { aligned };
        }
        out.push(chunk);
        remaining -= chunk;
    }
    if out.is_empty() {
        out.push(0);
    }
    out
}

fn packets_in(len: usize, max_packet: u16) -> usize {
    if max_packet == 0 {
        return 1;
    }
    ((len + max_packet as usize - 1) / max_packet as usize).max(1)
}

/// Data toggle after `num_packets` packets starting from `start` — each
/// packet flips it, so an even count leaves it unchanged.
fn toggle_after(start: bool, num_packets: usize) -> bool {
    if num_packets % 2 == 0 { start } else { !start }
}

// =============================================================================
// EHCI Controller Implementation
// =============================================================================

impl EhciController {
    pub fn new(pci_device: PciDevice) -> KResult<Self> {
        let (bar0, is_io) = pci::read_bar(&pci_device, 0);
        if bar0 == 0 || is_io {
            crate::kprintln!("ehci: invalid BAR0");
            return Err(KError::NotSupported);
        }

        let cap_base = bar0 & !0xF;
        let cap_base_virt = mm::phys_to_virt(x86_64::PhysAddr::new(cap_base)).as_u64();

        let caplength = unsafe { read_volatile(cap_base_virt as *const u8) } as u32;
        let hciversion = unsafe { read_volatile((cap_base_virt + 2) as *const u16) };
        let hcsparams = unsafe { read_volatile((cap_base_virt + 4) as *const u32) };
        let hccparams = unsafe { read_volatile((cap_base_virt + 8) as *const u32) };

        let num_ports = (hcsparams & 0x0F) as u8;
        let addr64_capable = (hccparams & 1) != 0;
        let eecp = ((hccparams >> 8) & 0xFF) as u8;

        crate::kprintln!(
            "ehci: version={:#x}, ports={}, 64-bit={}",
            hciversion, num_ports, addr64_capable
        );

        if eecp >= 0x40 {
            handoff_from_bios(&pci_device, eecp);
        }

        let op_base = cap_base_virt + caplength as u64;

        let periodic_list = Box::new([1u32; 1024]);
        let periodic_list_phys = virt_to_phys_u64(periodic_list.as_ptr() as u64)?;

        let mut async_head = Box::new(QueueHead::new_async(0, 0, 64, UsbSpeed::High));
        let async_head_phys = virt_to_phys_u64(async_head.as_ref() as *const QueueHead as u64)?;
        async_head.link_to_self(async_head_phys);
        async_head.ep_char |= 1 << 15; // H bit

        let mut controller = Self {
            pci_device,
            cap_base: cap_base_virt,
            op_base,
            num_ports,
            addr64_capable,
            periodic_list,
            periodic_list_phys,
            async_head,
            async_head_phys,
            running: AtomicBool::new(false),
            qtd_pool: QtdPool::new(),
            qh_pool: QueueHeadPool::new(),
            toggles: BTreeMap::new(),
            pending_controls: Vec::new(),
            interrupt_eps: Vec::new(),
            completed_interrupts: Vec::new(),
        };

        controller.start()?;
        Ok(controller)
    }

    fn start(&mut self) -> KResult<()> {
        self.write_op(USBCMD, self.read_op(USBCMD) & !CMD_RUN);
        self.wait_halt()?;

        self.write_op(USBCMD, CMD_HCRESET);
        self.wait_reset()?;

        if self.addr64_capable {
            self.write_op(CTRLDSSEGMENT, 0);
        }

        self.write_op(PERIODICLISTBASE, self.periodic_list_phys as u32);
        self.write_op(ASYNCLISTADDR, self.async_head_phys as u32);

        let intr = STS_USBINT | STS_USBERRINT | STS_PCD | STS_HSE | STS_IAA;
        self.write_op(USBINTR, intr);

        let cmd = CMD_FLS_1024 | (8 << 16) | CMD_PSE | CMD_ASE | CMD_RUN;
        self.write_op(USBCMD, cmd);

        for _ in 0..100 {
            if (self.read_op(USBSTS) & STS_HALT) == 0 {
                break;
            }
            crate::drivers::hpet::sleep_ms(1);
        }

        if (self.read_op(USBSTS) & STS_HALT) != 0 {
            crate::kprintln!("ehci: controller failed to start");
            return Err(KError::NotSupported);
        }

        self.write_op(CONFIGFLAG, 1);
        self.running.store(true, Ordering::Release);
        crate::kprintln!("ehci: controller started");

        crate::drivers::hpet::sleep_ms(50);
        Ok(())
    }

    fn read_op(&self, offset: u32) -> u32 {
        unsafe { read_volatile((self.op_base + offset as u64) as *const u32) }
    }

    fn write_op(&self, offset: u32, value: u32) {
        unsafe { write_volatile((self.op_base + offset as u64) as *mut u32, value) }
    }

    fn read_portsc(&self, port: u8) -> u32 {
        self.read_op(PORTSC + (port as u32) * 4)
    }

    fn write_portsc(&self, port: u8, value: u32) {
        self.write_op(PORTSC + (port as u32) * 4, value)
    }

    fn wait_halt(&self) -> KResult<()> {
        for _ in 0..100 {
            if (self.read_op(USBSTS) & STS_HALT) != 0 {
                return Ok(());
            }
            crate::drivers::hpet::sleep_ms(1);
        }
        Err(KError::Timeout)
    }

    fn wait_reset(&self) -> KResult<()> {
        for _ in 0..100 {
            if (self.read_op(USBCMD) & CMD_HCRESET) == 0 {
                return Ok(());
            }
            crate::drivers::hpet::sleep_ms(1);
        }
        Err(KError::Timeout)
    }

    /// Check for and recover from a host system error (a fatal bus error
    /// signaled by hardware, e.g. a PCI parity/target abort during a DMA
    /// access). Recovery is a full stop/reset/restart — there is no way to
    /// resume the schedules that were in flight, and every endpoint's
    /// toggle state is meaningless once the schedules are torn down.
    pub fn check_host_system_error(&mut self) -> bool {
        if (self.read_op(USBSTS) & STS_HSE) == 0 {
            return false;
        }
        crate::kprintln!("ehci: host system error, reinitializing controller");
        self.write_op(USBSTS, STS_HSE);
        self.pending_controls.clear();
        self.interrupt_eps.clear();
        self.completed_interrupts.clear();
        self.toggles.clear();
        if let Err(e) = self.start() {
            crate::kprintln!("ehci: failed to recover from host system error: {:?}", e);
        }
        true
    }

    /// Number of root ports (used by port polling).
    pub fn num_ports(&self) -> u8 {
        self.num_ports
    }

    /// Read this port's status, releasing it to a companion controller
    /// (UHCI/OHCI) if it isn't a high-speed device.
    pub fn poll_port(&mut self, port: u8) -> Option<UsbSpeed> {
        let portsc = self.read_portsc(port);
        if (portsc & PORTSC_CSC) == 0 {
            return None;
        }
        // Clear change bit (write-1-to-clear).
        self.write_portsc(port, portsc | PORTSC_CSC);

        if (portsc & PORTSC_CCS) == 0 {
            return None;
        }

        let line_status = (portsc & PORTSC_LS_MASK) >> 10;
        if line_status == 0x01 {
            crate::kprintln!("ehci: port {} low-speed, releasing to companion", port);
            self.write_portsc(port, portsc | PORTSC_PO);
            return None;
        }

        if self.reset_port(port).is_err() {
            return None;
        }

        let portsc = self.read_portsc(port);
        if (portsc & PORTSC_PE) == 0 {
            crate::kprintln!("ehci: port {} full-speed, releasing to companion", port);
            self.write_portsc(port, portsc | PORTSC_PO);
            return None;
        }

        Some(UsbSpeed::High)
    }

    fn reset_port(&mut self, port: u8) -> KResult<()> {
        let mut portsc = self.read_portsc(port);
        portsc |= PORTSC_PR;
        portsc &= !PORTSC_PE;
        self.write_portsc(port, portsc);

        crate::drivers::hpet::sleep_ms(50);

        portsc = self.read_portsc(port);
        portsc &= !PORTSC_PR;
        self.write_portsc(port, portsc);

        for _ in 0..100 {
            portsc = self.read_portsc(port);
            if (portsc & PORTSC_PR) == 0 {
                break;
            }
            crate::drivers::hpet::sleep_ms(1);
        }

        crate::drivers::hpet::sleep_ms(10);
        Ok(())
    }

    fn insert_async_qh(&mut self, qh_phys: u64, qh: &mut QueueHead) {
        qh.hlp = self.async_head.hlp;
        self.async_head.hlp = ((qh_phys as u32) & !0x1F) | 0x02;
    }

    /// Splice `qh_phys` out of the async ring by finding its true
    /// predecessor (walking `hlp` links from the reclaim head) and
    /// pointing it at whatever followed the removed QH, instead of
    /// collapsing the whole ring back to a self-loop. With only one
    /// non-reclaim QH ever in the ring at a time (every transfer is
    /// fully awaited before the next is queued) this degenerates to the
    /// same self-loop restore as before, but the walk is correct even if
    /// that assumption ever stops holding.
    fn unlink_async_qh(&mut self, qh_phys: u64, qh_hlp_after: u32) {
        let target = (qh_phys as u32) & !0x1F;
        let mut pred_hlp_ptr: *mut u32 = &mut self.async_head.hlp as *mut u32;
        let reclaim_target = (self.async_head_phys as u32) & !0x1F;
        let mut guard = 0;
        loop {
            let pred_hlp = unsafe { read_volatile(pred_hlp_ptr) };
            let next = pred_hlp & !0x1F;
            if next == target {
                unsafe { write_volatile(pred_hlp_ptr, qh_hlp_after) };
                break;
            }
            if next == reclaim_target || guard > 256 {
                // Walked the whole ring without finding the target — it
                // was already unlinked, or never inserted.
                break;
            }
            let next_virt = mm::phys_to_virt(x86_64::PhysAddr::new(next as u64)).as_u64();
            pred_hlp_ptr = next_virt as *mut u32;
            guard += 1;
        }

        // Ring the async-advance doorbell and wait for it so the hardware
        // guarantees it is no longer caching the unlinked QH before the
        // caller frees it back to the pool.
        self.write_op(USBCMD, self.read_op(USBCMD) | CMD_IAAD);
        for _ in 0..1000 {
            if (self.read_op(USBSTS) & STS_IAA) != 0 {
                self.write_op(USBSTS, STS_IAA);
                break;
            }
            crate::drivers::hpet::sleep_ms(1);
        }
    }

    /// Current persisted toggle for (address, endpoint), DATA0 if this is
    /// the first transfer seen for the pair.
    fn take_toggle(&mut self, address: u8, endpoint: u8) -> bool {
        *self.toggles.get(&(address, endpoint)).unwrap_or(&false)
    }

    fn set_toggle(&mut self, address: u8, endpoint: u8, value: bool) {
        self.toggles.insert((address, endpoint), value);
    }

    /// Allocate and link a chain of data qTDs covering `total_len` bytes
    /// starting at `data_phys`, split at the 20KiB-per-qTD ceiling and
    /// packet boundaries (`qtd_chunk_lengths`). Returns the chain and the
    /// toggle that should persist after this transfer completes.
    fn build_data_chain(
        &mut self,
        data_phys: u64,
        total_len: usize,
        max_packet: u16,
        is_in: bool,
        starting_toggle: bool,
    ) -> KResult<(Vec<*mut TransferDescriptor>, bool)> {
        let chunks = qtd_chunk_lengths(total_len, max_packet);
        let mut ptrs = Vec::with_capacity(chunks.len());
        let mut toggle = starting_toggle;
        let mut offset = 0u64;
        for &chunk in &chunks {
            let ptr = self.qtd_pool.alloc();
            unsafe {
                *ptr = TransferDescriptor::new_data(data_phys + offset, chunk as u16, is_in, toggle);
            }
            ptrs.push(ptr);
            toggle = toggle_after(toggle, packets_in(chunk, max_packet));
            offset += chunk as u64;
        }
        for i in 0..ptrs.len().saturating_sub(1) {
            let next_phys = virt_to_phys_u64(ptrs[i + 1] as u64)?;
            unsafe { (*ptrs[i]).link_to(next_phys) };
        }
        Ok((ptrs, toggle))
    }

    /// Drop any pending control/bulk transfers whose final qTD has
    /// completed, returning their qTDs and QH to the pools. Called at the
    /// start of every new transfer so neither the `Vec` nor the pools grow
    /// without bound.
    fn reap_pending_controls(&mut self) {
        let mut i = 0;
        while i < self.pending_controls.len() {
            let done = unsafe { (*self.pending_controls[i].status_qtd_ptr).is_complete() };
            if done {
                let pc = self.pending_controls.remove(i);
                for ptr in pc.qtd_ptrs {
                    self.qtd_pool.free_one(ptr);
                }
                self.qh_pool.free_one(pc.qh_ptr);
            } else {
                i += 1;
            }
        }
    }

    fn do_control_transfer(
        &mut self,
        address: u8,
        endpoint: u8,
        max_packet: u16,
        setup: &SetupPacket,
        mut data: Option<&mut [u8]>,
        direction_in: bool,
    ) -> KResult<usize> {
        self.reap_pending_controls();

        let setup_buf = Box::new(*setup);
        let setup_phys = virt_to_phys_u64(setup_buf.as_ref() as *const SetupPacket as u64)?;

        let data_len = data.as_ref().map(|d| d.len()).unwrap_or(0);
        let mut data_buf: Vec<u8> = Vec::new();
        let mut data_qtd_ptrs: Vec<*mut TransferDescriptor> = Vec::new();
        let mut chunk_lens: Vec<usize> = Vec::new();

        // The data stage always starts DATA1 and the status stage is
        // always DATA1 too, regardless of how many packets the data stage
        // took — this is the fixed control-transfer sequence, not the
        // persisted per-endpoint toggle used for bulk/interrupt.
        if data_len > 0 {
            data_buf = alloc::vec![0u8; data_len];
            if !direction_in {
                data_buf.copy_from_slice(data.as_deref().unwrap());
            }
            let data_phys = virt_to_phys_u64(data_buf.as_ptr() as u64)?;
            let (ptrs, _ending_toggle) = self.build_data_chain(data_phys, data_len, max_packet, direction_in, true)?;
            chunk_lens = qtd_chunk_lengths(data_len, max_packet);
            data_qtd_ptrs = ptrs;
        }

        let status_ptr = self.qtd_pool.alloc();
        let status_is_in = !direction_in || data_len == 0;
        unsafe { *status_ptr = TransferDescriptor::new_status(status_is_in, true) };
        let status_phys = virt_to_phys_u64(status_ptr as u64)?;

        if let Some(&last_data_ptr) = data_qtd_ptrs.last() {
            unsafe { (*last_data_ptr).link_to(status_phys) };
        }

        let setup_ptr = self.qtd_pool.alloc();
        unsafe { *setup_ptr = TransferDescriptor::new_setup(setup_phys, false) };
        let first_next_phys = if let Some(&first_data_ptr) = data_qtd_ptrs.first() {
            virt_to_phys_u64(first_data_ptr as u64)?
        } else {
            status_phys
        };
        unsafe { (*setup_ptr).link_to(first_next_phys) };
        let setup_qtd_phys = virt_to_phys_u64(setup_ptr as u64)?;

        let qh_ptr = self.qh_pool.alloc();
        unsafe {
            *qh_ptr = QueueHead::new_async(address, endpoint, max_packet, UsbSpeed::High);
            (*qh_ptr).link_qtd(setup_qtd_phys);
        }

        let mut all_qtd_ptrs = Vec::with_capacity(data_qtd_ptrs.len() + 2);
        all_qtd_ptrs.push(setup_ptr);
        all_qtd_ptrs.extend_from_slice(&data_qtd_ptrs);
        all_qtd_ptrs.push(status_ptr);

        let qh_phys = virt_to_phys_u64(qh_ptr as u64)?;
        unsafe { self.insert_async_qh(qh_phys, &mut *qh_ptr) };

        for _ in 0..2000 {
            if unsafe { (*status_ptr).is_complete() } {
                break;
            }
            crate::drivers::hpet::sleep_ms(1);
        }

        let qh_hlp_after = unsafe { (*qh_ptr).hlp };
        self.unlink_async_qh(qh_phys, qh_hlp_after);

        let any_error = all_qtd_ptrs.iter().any(|&p| unsafe { (*p).has_error() });
        let complete = unsafe { (*status_ptr).is_complete() };

        let transferred: usize = data_qtd_ptrs
            .iter()
            .enumerate()
            .map(|(i, &p)| unsafe { (*p).bytes_transferred(chunk_lens[i] as u16) as usize })
            .sum();

        if direction_in {
            if let Some(ref mut out) = data {
                let n = transferred.min(out.len());
                out[..n].copy_from_slice(&data_buf[..n]);
            }
        }

        self.pending_controls.push(PendingControl {
            _setup: setup_buf,
            qtd_ptrs: all_qtd_ptrs,
            _data_buf: data_buf,
            qh_ptr,
            status_qtd_ptr: status_ptr,
        });

        if any_error {
            crate::kprintln!("ehci: control transfer error addr={} ep={}", address, endpoint);
            return Err(KError::IO);
        }
        if !complete {
            crate::kprintln!("ehci: control transfer timeout addr={} ep={}", address, endpoint);
            return Err(KError::Timeout);
        }

        Ok(transferred)
    }

    fn do_bulk_transfer(
        &mut self,
        address: u8,
        endpoint: u8,
        mut buf: Vec<u8>,
        direction_in: bool,
    ) -> KResult<(usize, Vec<u8>)> {
        self.reap_pending_controls();
        let max_packet = 512u16;
        let phys = if buf.is_empty() { 0 } else { virt_to_phys_u64(buf.as_mut_ptr() as u64)? };

        let starting_toggle = self.take_toggle(address, endpoint);
        let (qtd_ptrs, ending_toggle) = self.build_data_chain(phys, buf.len(), max_packet, direction_in, starting_toggle)?;
        self.set_toggle(address, endpoint, ending_toggle);
        let chunk_lens = qtd_chunk_lengths(buf.len(), max_packet);

        let first_qtd_phys = virt_to_phys_u64(qtd_ptrs[0] as u64)?;
        let qh_ptr = self.qh_pool.alloc();
        unsafe {
            *qh_ptr = QueueHead::new_async(address, endpoint, max_packet, UsbSpeed::High);
            (*qh_ptr).link_qtd(first_qtd_phys);
        }
        let qh_phys = virt_to_phys_u64(qh_ptr as u64)?;
        unsafe { self.insert_async_qh(qh_phys, &mut *qh_ptr) };

        let last_ptr = *qtd_ptrs.last().expect("qtd chain always has at least one entry");
        for _ in 0..2000 {
            if unsafe { (*last_ptr).is_complete() } {
                break;
            }
            crate::drivers::hpet::sleep_ms(1);
        }
        let qh_hlp_after = unsafe { (*qh_ptr).hlp };
        self.unlink_async_qh(qh_phys, qh_hlp_after);

        let mut transferred = 0usize;
        let mut had_error = false;
        for (i, &ptr) in qtd_ptrs.iter().enumerate() {
            unsafe {
                transferred += (*ptr).bytes_transferred(chunk_lens[i] as u16) as usize;
                had_error |= (*ptr).has_error();
            }
        }

        self.pending_controls.push(PendingControl {
            _setup: Box::new(SetupPacket { request_type: 0, request: 0, value: 0, index: 0, length: 0 }),
            qtd_ptrs,
            _data_buf: Vec::new(),
            qh_ptr,
            status_qtd_ptr: last_ptr,
        });

        if had_error {
            return Err(KError::IO);
        }
        Ok((transferred, buf))
    }

    fn link_interrupt_qh(&mut self, qh_phys: u64, interval_frames: u32) {
        let interval = interval_frames.max(1) as usize;
        let mut frame = 0usize;
        while frame < 1024 {
            self.periodic_list[frame] = ((qh_phys as u32) & !0x1F) | 0x02;
            frame += interval;
        }
    }

    fn unlink_interrupt_qh(&mut self, interval_frames: u32) {
        let interval = interval_frames.max(1) as usize;
        let mut frame = 0usize;
        while frame < 1024 {
            self.periodic_list[frame] = 1;
            frame += interval;
        }
    }
}

/// Locate the USB Legacy Support capability in PCI extended capability
/// space and request ownership from the BIOS/SMM, per the EHCI spec
/// appendix C.
fn handoff_from_bios(dev: &PciDevice, mut eecp: u8) {
    loop {
        let cap_id = pci::read_u8(dev.addr.bus, dev.addr.device, dev.addr.function, eecp);
        let next = pci::read_u8(dev.addr.bus, dev.addr.device, dev.addr.function, eecp + 1);

        if cap_id == EECP_CAP_ID_LEGACY {
            let legsup = pci::read_u32(dev.addr.bus, dev.addr.device, dev.addr.function, eecp as u8 & 0xFC)
                | (pci::read_u8(dev.addr.bus, dev.addr.device, dev.addr.function, eecp) as u32);
            let _ = legsup;

            pci::write_u8(dev.addr.bus, dev.addr.device, dev.addr.function, eecp + 3, 1);

            for _ in 0..100 {
                let hi = pci::read_u8(dev.addr.bus, dev.addr.device, dev.addr.function, eecp + 2);
                if hi == 0 {
                    crate::kprintln!("ehci: BIOS handoff complete");
                    return;
                }
                crate::drivers::hpet::sleep_ms(1);
            }
            crate::kprintln!("ehci: BIOS handoff timed out, forcing ownership");
            pci::write_u8(dev.addr.bus, dev.addr.device, dev.addr.function, eecp + 2, 0);
            return;
        }

        if next == 0 {
            return;
        }
        eecp = next;
    }
}

impl Controller for EhciController {
    fn kind(&self) -> ControllerKind {
        ControllerKind::Ehci
    }

    fn control_transfer(
        &mut self,
        address: u8,
        endpoint: u8,
        max_packet: u16,
        setup: &SetupPacket,
        data: Option<&mut [u8]>,
        direction_in: bool,
    ) -> KResult<usize> {
        self.do_control_transfer(address, endpoint, max_packet, setup, data, direction_in)
    }

    fn queue_interrupt_in(&mut self, address: u8, endpoint: u8, buffer: &mut [u8], interval_frames: u32) -> KResult<()> {
        let buf_len = buffer.len().max(1);
        let buf_phys = virt_to_phys_u64(buffer.as_mut_ptr() as u64)?;
        let max_packet = buf_len as u16;

        if let Some(idx) = self.interrupt_eps.iter().position(|e| e.address == address && e.endpoint == endpoint) {
            if !self.interrupt_eps[idx].pending {
                let mut toggle = self.take_toggle(address, endpoint);
                let chunk_lens = qtd_chunk_lengths(buf_len, max_packet);
                let qtd_ptrs = self.interrupt_eps[idx].qtd_ptrs.clone();
                let mut offset = 0u64;
                for (i, &len) in chunk_lens.iter().enumerate() {
                    unsafe {
                        (*qtd_ptrs[i]).buffer0 = (buf_phys + offset) as u32;
                        (*qtd_ptrs[i]).buffer1 = ((buf_phys + offset + 0x1000) & !0xFFF) as u32;
                        (*qtd_ptrs[i]).buffer2 = ((buf_phys + offset + 0x2000) & !0xFFF) as u32;
                        (*qtd_ptrs[i]).buffer3 = ((buf_phys + offset + 0x3000) & !0xFFF) as u32;
                        (*qtd_ptrs[i]).buffer4 = ((buf_phys + offset + 0x4000) & !0xFFF) as u32;
                        (*qtd_ptrs[i]).rearm(len as u16, true, toggle);
                    }
                    toggle = toggle_after(toggle, packets_in(len, max_packet));
                    offset += len as u64;
                }
                self.set_toggle(address, endpoint, toggle);
                self.interrupt_eps[idx].chunk_lens = chunk_lens;
                self.interrupt_eps[idx].buffer_phys = buf_phys;
                self.interrupt_eps[idx].buffer_len = buf_len;
                self.interrupt_eps[idx].pending = true;
            }
            return Ok(());
        }

        let starting_toggle = self.take_toggle(address, endpoint);
        let (qtd_ptrs, ending_toggle) = self.build_data_chain(buf_phys, buf_len, max_packet, true, starting_toggle)?;
        self.set_toggle(address, endpoint, ending_toggle);
        let chunk_lens = qtd_chunk_lengths(buf_len, max_packet);

        let first_qtd_phys = virt_to_phys_u64(qtd_ptrs[0] as u64)?;
        let qh_ptr = self.qh_pool.alloc();
        unsafe {
            *qh_ptr = QueueHead::new_interrupt(address, endpoint, max_packet, UsbSpeed::High);
            (*qh_ptr).link_qtd(first_qtd_phys);
        }
        let qh_phys = virt_to_phys_u64(qh_ptr as u64)?;

        self.link_interrupt_qh(qh_phys, interval_frames);

        self.interrupt_eps.push(InterruptEndpoint {
            address,
            endpoint,
            interval_frames,
            qh_ptr,
            qtd_ptrs,
            chunk_lens,
            buffer_phys: buf_phys,
            buffer_len: buf_len,
            pending: true,
        });

        Ok(())
    }

    fn poll_interrupt_transfer(&mut self) -> Option<(u8, u8, usize)> {
        for ep in self.interrupt_eps.iter_mut() {
            if !ep.pending {
                continue;
            }
            let last = *ep.qtd_ptrs.last().expect("interrupt endpoint always has a qtd chain");
            if unsafe { (*last).is_complete() } {
                ep.pending = false;
                let mut n = 0usize;
                for (i, &ptr) in ep.qtd_ptrs.iter().enumerate() {
                    n += unsafe { (*ptr).bytes_transferred(ep.chunk_lens[i] as u16) as usize };
                }
                self.completed_interrupts.push((ep.address, ep.endpoint, n));
            }
        }
        if self.completed_interrupts.is_empty() {
            None
        } else {
            Some(self.completed_interrupts.remove(0))
        }
    }

    fn bulk_transfer_out(&mut self, address: u8, endpoint: u8, data: &[u8]) -> KResult<usize> {
        let (n, _buf) = self.do_bulk_transfer(address, endpoint, data.to_vec(), false)?;
        Ok(n)
    }

    fn bulk_transfer_in(&mut self, address: u8, endpoint: u8, buffer: &mut [u8]) -> KResult<usize> {
        let (n, buf) = self.do_bulk_transfer(address, endpoint, alloc::vec![0u8; buffer.len()], true)?;
        let copy_len = n.min(buffer.len());
        buffer[..copy_len].copy_from_slice(&buf[..copy_len]);
        Ok(n)
    }

    fn configure_bulk_endpoint(&mut self, address: u8, endpoint: u8, _direction_in: bool, _max_packet: u16) -> KResult<()> {
        // SET_CONFIGURATION/SET_INTERFACE resets an endpoint's toggle to
        // DATA0; configuring it here (before the first transfer) keeps the
        // persisted toggle from carrying over from a previous device at
        // the same address.
        self.toggles.insert((address, endpoint), false);
        Ok(())
    }
}

// =============================================================================
// Global EHCI state
// =============================================================================

static EHCI_CONTROLLERS: Mutex<Vec<Arc<Mutex<EhciController>>>> = Mutex::new(Vec::new());
static EHCI_INITIALIZED: AtomicBool = AtomicBool::new(false);

/// Initialize EHCI controllers: probe PCI, take BIOS handoff, start
/// schedules, register with `usbcore`, then scan root ports.
pub fn init() {
    if EHCI_INITIALIZED.swap(true, Ordering::SeqCst) {
        return;
    }

    crate::kprintln!("ehci: scanning for controllers...");
    let devices = pci::scan();

    for dev in devices {
        if dev.class.class_code != 0x0C || dev.class.subclass != 0x03 {
            continue;
        }
        if dev.class.prog_if != 0x20 {
            continue;
        }

        crate::kprintln!(
            "ehci: found controller at {:02x}:{:02x}.{:x}",
            dev.addr.bus, dev.addr.device, dev.addr.function
        );

        pci::enable_bus_mastering(&dev);

        match EhciController::new(dev) {
            Ok(controller) => {
                let num_ports = controller.num_ports();
                let arc = Arc::new(Mutex::new(controller));
                EHCI_CONTROLLERS.lock().push(arc.clone());
                super::usbcore::register_controller(ControllerKind::Ehci, arc.clone());
                scan_root_ports(&arc, num_ports);
            }
            Err(e) => {
                crate::kprintln!("ehci: failed to initialize controller: {:?}", e);
            }
        }
    }

    let count = EHCI_CONTROLLERS.lock().len();
    crate::kprintln!("ehci: initialized {} controller(s)", count);
}

fn scan_root_ports(controller: &Arc<Mutex<EhciController>>, num_ports: u8) {
    for port in 0..num_ports {
        let speed = controller.lock().poll_port(port);
        if let Some(speed) = speed {
            crate::kprintln!("ehci: enumerating device on root port {}", port);
            if let Err(e) = super::usbcore::enumerate_device(speed, None, port) {
                crate::kprintln!("ehci: enumeration failed on port {}: {:?}", port, e);
            }
        }
    }
}

/// Poll every controller's ports for connect/disconnect and check for a
/// host system error. Meant to be driven the same way `hub::poll_all` is.
pub fn poll_all() {
    let controllers: Vec<Arc<Mutex<EhciController>>> = EHCI_CONTROLLERS.lock().clone();
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

pub fn controller_count() -> usize {
    EHCI_CONTROLLERS.lock().len()
}

//! Host-controller abstraction.
//!
//! `usb::usbcore`, `usb::hub`, `usb::hid`, and `usb::storage` drive whichever
//! controller owns a device through this trait instead of calling into
//! `ehci`/`uhci`/`xhci` directly — the same shape as `storage::BlockDevice`
//! decoupling filesystem code from AHCI/NVMe/virtio-blk specifics.
//!
//! Addressing is controller-native: EHCI/UHCI pass the USB device address
//! assigned by `SET_ADDRESS`; xHCI (stubbed) would pass its slot ID. Either
//! way it's an opaque `u8` handle as far as callers above this trait are
//! concerned.

#![allow(dead_code)]

extern crate alloc;

use alloc::vec::Vec;

use crate::util::KResult;

use super::SetupPacket;

/// Host-controller family, for logging and for `usb::usbcore`'s preference
/// order (EHCI/UHCI first — they do real transfers; xHCI/OHCI are
/// detection-only).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControllerKind {
    Ehci,
    Uhci,
    Xhci,
    Ohci,
}

impl ControllerKind {
    pub fn name(&self) -> &'static str {
        match self {
            ControllerKind::Ehci => "ehci",
            ControllerKind::Uhci => "uhci",
            ControllerKind::Xhci => "xhci",
            ControllerKind::Ohci => "ohci",
        }
    }

    /// Whether this controller type actually moves data, vs. being
    /// detection-only per the host's current scope.
    pub fn is_functional(&self) -> bool {
        matches!(self, ControllerKind::Ehci | ControllerKind::Uhci)
    }
}

/// Operations a host controller must provide to participate in generic USB
/// enumeration and class-driver transfers.
pub trait Controller: Send {
    fn kind(&self) -> ControllerKind;

    /// Setup/Data/Status control transfer. `data` carries the direction:
    /// `Some` + `direction_in` selects IN vs OUT data stage, `None` means a
    /// no-data-stage control transfer.
    fn control_transfer(
        &mut self,
        address: u8,
        endpoint: u8,
        max_packet: u16,
        setup: &SetupPacket,
        data: Option<&mut [u8]>,
        direction_in: bool,
    ) -> KResult<usize>;

    /// Reserve an interrupt endpoint in the periodic schedule and post one
    /// buffer to receive the next report into. `interval_frames` is the
    /// device's endpoint descriptor `bInterval`, in (micro)frames as the
    /// controller counts them — callers are expected to have already
    /// converted it for the controller's own schedule granularity.
    /// Non-blocking; the caller polls `poll_interrupt_transfer` for
    /// completion.
    fn queue_interrupt_in(&mut self, address: u8, endpoint: u8, buffer: &mut [u8], interval_frames: u32) -> KResult<()>;

    /// Non-blocking check for a completed interrupt transfer. Returns
    /// (address, endpoint, bytes transferred) for the oldest completion.
    fn poll_interrupt_transfer(&mut self) -> Option<(u8, u8, usize)>;

    fn bulk_transfer_out(&mut self, address: u8, endpoint: u8, data: &[u8]) -> KResult<usize>;
    fn bulk_transfer_in(&mut self, address: u8, endpoint: u8, buffer: &mut [u8]) -> KResult<usize>;

    /// Reserve a bulk endpoint's transfer-ring/queue-head state before the
    /// first bulk transfer. A no-op for controllers (EHCI/UHCI) whose bulk
    /// QHs are stateless per-transfer.
    fn configure_bulk_endpoint(
        &mut self,
        _address: u8,
        _endpoint: u8,
        _direction_in: bool,
        _max_packet: u16,
    ) -> KResult<()> {
        Ok(())
    }
}

/// A standing interrupt-IN endpoint registration, for callers (`hub`) that
/// want a single handle to re-arm and poll rather than calling
/// `queue_interrupt_in`/`poll_interrupt_transfer` against the active
/// controller directly. Mirrors the pattern `hid`'s keyboard/mouse polling
/// uses inline: drain every completion looking for one matching this
/// endpoint, discard the rest, re-arm on a match.
pub struct InterruptRegistration {
    address: u8,
    endpoint: u8,
    interval_frames: u32,
    /// Backing report buffer. The controller DMAs reports directly into
    /// this memory, so it must stay at a fixed address for the life of the
    /// registration — re-armed in place, never reallocated.
    buffer: Vec<u8>,
}

impl InterruptRegistration {
    pub fn new(address: u8, endpoint: u8, max_packet: u16, interval_frames: u32) -> KResult<Self> {
        let controller = super::usbcore::active_controller().ok_or(crate::util::KError::NotFound)?;
        let mut buffer = alloc::vec![0u8; max_packet.max(1) as usize];
        controller.lock().queue_interrupt_in(address, endpoint, &mut buffer, interval_frames)?;
        Ok(Self { address, endpoint, interval_frames, buffer })
    }

    /// Drain the active controller's completed interrupt transfers looking
    /// for one matching this registration. Returns the report bytes and
    /// re-arms the endpoint on a match; non-matching completions (another
    /// device's report queued in the same controller tick) are discarded,
    /// same as `hid`'s polling.
    pub fn poll(&mut self) -> Option<Vec<u8>> {
        let controller = super::usbcore::active_controller()?;
        let mut ctrl = controller.lock();
        let mut matched = false;
        while let Some((addr, ep, _len)) = ctrl.poll_interrupt_transfer() {
            if addr == self.address && ep == self.endpoint {
                matched = true;
                break;
            }
        }
        if !matched {
            return None;
        }
        let report = self.buffer.clone();
        let _ = ctrl.queue_interrupt_in(self.address, self.endpoint, &mut self.buffer, self.interval_frames);
        Some(report)
    }
}

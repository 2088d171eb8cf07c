//! Generic bus registry.
//!
//! Generalizes the per-subsystem device tables (`pci::scan`,
//! `usb::device::UsbDeviceManager`) behind one lookup surface: a `BusKind`
//! names which physical bus a target sits on, and a `BusDriver` answers
//! enumeration/control questions for that bus without callers needing to
//! know the concrete driver type.
//!
//! Register buses lazily — each is constructed from a live hardware scan,
//! so there's nothing to initialize eagerly at boot beyond what `pci`/`usb`
//! already do on their own.

#![allow(dead_code)]

use alloc::string::String;
use alloc::sync::Arc;
use alloc::vec::Vec;
use spin::Mutex;

use crate::util::{KError, KResult};

/// Which physical bus a `BusTarget` lives on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BusKind {
    Pci,
    Usb,
}

/// A single addressable target on a bus (a PCI function, a USB device).
/// `id` is bus-specific: PCI packs bus/device/function into it, USB packs
/// controller/bus/address.
#[derive(Debug, Clone, Copy)]
pub struct BusTarget {
    pub bus: BusKind,
    pub id: u32,
    pub class_name: &'static str,
    /// Finer-grained classification than `class_name`, e.g. a PCI
    /// controller's programming interface (UHCI/OHCI/EHCI/XHCI) or a USB
    /// interface's subclass/protocol. `None` when the bus has nothing finer
    /// to say than the class.
    pub subclass_name: Option<&'static str>,
    /// The driver that currently owns this target, if any. Set by a
    /// successful `device_claim` and cleared on release; `None` means the
    /// target is unclaimed and free for a class driver to probe.
    pub claim_owner: Option<&'static str>,
}

/// Operations every bus driver exposes to the registry. Any operation a
/// given bus has no concept of (e.g. `set_master` on USB) returns
/// `KError::NotSupported` rather than panicking.
pub trait BusDriver: Send + Sync {
    fn kind(&self) -> BusKind;
    fn get_targets(&self) -> Vec<BusTarget>;
    fn get_target_info(&self, id: u32) -> KResult<String>;

    fn device_enable(&self, _id: u32, _on: bool) -> KResult<()> {
        Err(KError::NotSupported)
    }

    fn set_master(&self, _id: u32, _on: bool) -> KResult<()> {
        Err(KError::NotSupported)
    }

    fn device_claim(&self, _id: u32, _owner: &'static str) -> KResult<()> {
        Err(KError::NotSupported)
    }

    /// Read a `width`-byte (1/2/4) register at `reg` on `id`. Widths other
    /// than 1/2/4 are a caller error (`KError::Invalid`), not
    /// `NotSupported` — it's the bus, not the width, that a driver may lack.
    fn read_register(&self, _id: u32, _reg: u32, _width: u8) -> KResult<u32> {
        Err(KError::NotSupported)
    }

    fn write_register(&self, _id: u32, _reg: u32, _width: u8, _value: u32) -> KResult<()> {
        Err(KError::NotSupported)
    }

    /// Byte-stream read/write for targets that expose one (e.g. a USB
    /// control/bulk endpoint); PCI functions have no such concept and
    /// inherit the default.
    fn read(&self, _id: u32, _buf: &mut [u8]) -> KResult<usize> {
        Err(KError::NotSupported)
    }

    fn write(&self, _id: u32, _buf: &[u8]) -> KResult<usize> {
        Err(KError::NotSupported)
    }
}

static REGISTRY: Mutex<Vec<Arc<dyn BusDriver>>> = Mutex::new(Vec::new());

/// Register a bus driver instance. Called once per discovered bus (one PCI
/// scan, one entry per USB host controller).
pub fn register(driver: Arc<dyn BusDriver>) {
    REGISTRY.lock().push(driver);
}

/// List every target across every registered bus.
pub fn all_targets() -> Vec<BusTarget> {
    REGISTRY
        .lock()
        .iter()
        .flat_map(|d| d.get_targets())
        .collect()
}

/// List targets on buses of a given kind.
pub fn targets_of_kind(kind: BusKind) -> Vec<BusTarget> {
    REGISTRY
        .lock()
        .iter()
        .filter(|d| d.kind() == kind)
        .flat_map(|d| d.get_targets())
        .collect()
}

/// Run `f` against the first registered driver of the given kind that
/// knows about `id`. Returns `KError::NotFound` if no such driver/id pair
/// is registered.
pub fn with_target_info(kind: BusKind, id: u32) -> KResult<String> {
    for driver in REGISTRY.lock().iter().filter(|d| d.kind() == kind) {
        match driver.get_target_info(id) {
            Ok(info) => return Ok(info),
            Err(KError::NotFound) => continue,
            Err(e) => return Err(e),
        }
    }
    Err(KError::NotFound)
}

pub fn driver_count() -> usize {
    REGISTRY.lock().len()
}

/// Claim a target on behalf of `owner`. Dispatches to whichever registered
/// driver of `kind` knows about `id`; `KError::NotFound` if none does.
pub fn device_claim(kind: BusKind, id: u32, owner: &'static str) -> KResult<()> {
    for driver in REGISTRY.lock().iter().filter(|d| d.kind() == kind) {
        if driver.get_targets().iter().any(|t| t.id == id) {
            return driver.device_claim(id, owner);
        }
    }
    Err(KError::NotFound)
}

pub fn read_register(kind: BusKind, id: u32, reg: u32, width: u8) -> KResult<u32> {
    for driver in REGISTRY.lock().iter().filter(|d| d.kind() == kind) {
        if driver.get_targets().iter().any(|t| t.id == id) {
            return driver.read_register(id, reg, width);
        }
    }
    Err(KError::NotFound)
}

pub fn write_register(kind: BusKind, id: u32, reg: u32, width: u8, value: u32) -> KResult<()> {
    for driver in REGISTRY.lock().iter().filter(|d| d.kind() == kind) {
        if driver.get_targets().iter().any(|t| t.id == id) {
            return driver.write_register(id, reg, width, value);
        }
    }
    Err(KError::NotFound)
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::format;

    struct FakeBus;
    impl BusDriver for FakeBus {
        fn kind(&self) -> BusKind {
            BusKind::Pci
        }
        fn get_targets(&self) -> Vec<BusTarget> {
            alloc::vec![BusTarget {
                bus: BusKind::Pci,
                id: 7,
                class_name: "fake",
                subclass_name: None,
                claim_owner: None,
            }]
        }
        fn get_target_info(&self, id: u32) -> KResult<String> {
            if id == 7 {
                Ok(format!("fake target {}", id))
            } else {
                Err(KError::NotFound)
            }
        }
    }

    #[test]
    fn lookup_through_registry() {
        register(Arc::new(FakeBus));
        assert!(targets_of_kind(BusKind::Pci).iter().any(|t| t.id == 7));
        assert_eq!(with_target_info(BusKind::Pci, 7).unwrap(), "fake target 7");
        assert_eq!(with_target_info(BusKind::Pci, 99), Err(KError::NotFound));
    }
}

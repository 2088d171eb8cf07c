//! Controller-agnostic enumeration core for the USB subsystem.
//!
//! Owns the registry of live host controllers and the connect/disconnect
//! state machine driven by `hub`'s port polling. Class drivers
//! (`hid`, `storage`) and `hub` itself go through `active_controller()`
//! instead of naming a concrete controller module, so the host works the
//! same whether the only functional controller present is EHCI or UHCI.

#![allow(dead_code)]

use alloc::sync::Arc;
use alloc::vec::Vec;
use spin::Mutex;

use crate::util::{KError, KResult};

use super::controller::{Controller, ControllerKind};
use super::device::{self, UsbDeviceState};
use super::{DescriptorType, SetupPacket, UsbSpeed};

struct Registered {
    kind: ControllerKind,
    controller: Arc<Mutex<dyn Controller>>,
}

static CONTROLLERS: Mutex<Vec<Registered>> = Mutex::new(Vec::new());

/// Register a live controller. Called once from each controller's
/// `probe_pci`/`init` after it has successfully taken ownership of a
/// device from the BIOS and started its schedules.
pub fn register_controller(kind: ControllerKind, controller: Arc<Mutex<dyn Controller>>) {
    crate::kprintln!("usb_core: registered {} controller", kind.name());
    CONTROLLERS.lock().push(Registered { kind, controller });
}

/// The controller class drivers and the hub poller should submit transfers
/// through. Prefers the first functional (EHCI, then UHCI) controller
/// registered; falls back to any registered controller (xHCI/OHCI stubs)
/// only so callers get a real `NotImplemented` instead of `NotFound`.
pub fn active_controller() -> Option<Arc<Mutex<dyn Controller>>> {
    let controllers = CONTROLLERS.lock();
    controllers
        .iter()
        .find(|r| r.kind.is_functional())
        .or_else(|| controllers.iter().next())
        .map(|r| r.controller.clone())
}

pub fn controller_count() -> usize {
    CONTROLLERS.lock().len()
}

/// Run a standard control transfer against `address`/endpoint 0 on the
/// active controller. Used by enumeration and by `hub`'s class requests.
pub fn control_transfer(
    address: u8,
    max_packet: u16,
    setup: &SetupPacket,
    data: Option<&mut [u8]>,
    direction_in: bool,
) -> KResult<usize> {
    let ctrl = active_controller().ok_or(KError::NotFound)?;
    let mut ctrl = ctrl.lock();
    ctrl.control_transfer(address, 0, max_packet, setup, data, direction_in)
}

/// Address pool: USB allows 1..=127, address 0 is reserved for the
/// not-yet-addressed default state during enumeration.
static NEXT_ADDRESS: Mutex<u8> = Mutex::new(1);

fn allocate_address() -> KResult<u8> {
    let mut next = NEXT_ADDRESS.lock();
    if *next > 127 {
        return Err(KError::NoMemory);
    }
    let addr = *next;
    *next += 1;
    Ok(addr)
}

/// Full default-state enumeration sequence: assign an address, read the
/// device descriptor, register the device, and — if it is a hub — hand it
/// to `hub::setup_hub`.
///
/// `parent` and `parent_port` record the topology for `route_string`;
/// pass `(None, 0)` for devices on the host's own root ports.
pub fn enumerate_device(
    speed: UsbSpeed,
    parent: Option<device::UsbDeviceId>,
    parent_port: u8,
) -> KResult<device::UsbDeviceId> {
    let max_packet0: u16 = match speed {
        UsbSpeed::Low => 8,
        _ => 64,
    };

    // Read the first 8 bytes of the device descriptor at address 0 to
    // learn the real max packet size before assigning an address. Issued
    // twice: a subset of real devices fails the very first request after
    // reset (the host hasn't finished settling the port yet) but succeeds
    // on an immediate retry, so a single probe would misclassify a working
    // device as unresponsive.
    let mut probe = [0u8; 8];
    let get_desc = SetupPacket::get_descriptor(DescriptorType::Device, 0, 8);
    let _ = control_transfer(0, max_packet0, &get_desc, Some(&mut probe), true);
    control_transfer(0, max_packet0, &get_desc, Some(&mut probe), true)?;
    let max_packet0 = if probe[7] != 0 { probe[7] as u16 } else { max_packet0 };

    let address = allocate_address()?;
    let set_addr = SetupPacket::set_address(address);
    control_transfer(0, max_packet0, &set_addr, None, false)?;
    // Bus needs a few ms to let the device latch its new address.
    crate::drivers::hpet::sleep_ms(2);

    let mut desc_bytes = [0u8; core::mem::size_of::<super::DeviceDescriptor>()];
    let get_full = SetupPacket::get_descriptor(DescriptorType::Device, 0, desc_bytes.len() as u16);
    control_transfer(address, max_packet0, &get_full, Some(&mut desc_bytes), true)?;
    let desc: super::DeviceDescriptor = unsafe { core::ptr::read_unaligned(desc_bytes.as_ptr() as *const _) };

    let route_string = match parent {
        Some(p) => {
            let parent_route = device::get_device(&p).map(|d| d.route_string).unwrap_or(0);
            super::hub::calculate_route_string(parent_route, parent_port)
        }
        None => 0,
    };

    let id = device::register_device(device::new_enumerated_device(
        address,
        speed,
        desc.vendor_id,
        desc.product_id,
        desc.device_class,
        desc.device_subclass,
        desc.device_protocol,
        parent,
        route_string,
    ))?;
    let _ = device::set_device_state(id, UsbDeviceState::Addressed);

    crate::kprintln!(
        "usb_core: enumerated address {} vid={:04x} pid={:04x} class={:02x} route=0x{:x}",
        address,
        desc.vendor_id,
        desc.product_id,
        desc.device_class,
        route_string
    );

    if super::hub::is_hub_class(desc.device_class) {
        setup_hub_device(id, address, max_packet0);
    } else {
        configure_interfaces(address, max_packet0);
    }

    Ok(id)
}

/// After a non-hub device has an address, read its first configuration,
/// select it, and hand each interface to the class driver that claims it
/// (`hub`'s own interfaces are handled by `setup_hub_device` instead).
fn configure_interfaces(address: u8, max_packet0: u16) {
    let mut header = [0u8; 9];
    let get_header = SetupPacket::get_descriptor(DescriptorType::Configuration, 0, 9);
    if control_transfer(address, max_packet0, &get_header, Some(&mut header), true).is_err() {
        crate::kprintln!("usb_core: failed to read configuration header for address {}", address);
        return;
    }
    let total_length = u16::from_le_bytes([header[2], header[3]]) as usize;
    let config_value = header[5];

    let mut config = alloc::vec![0u8; total_length];
    let get_config = SetupPacket::get_descriptor(DescriptorType::Configuration, 0, total_length as u16);
    if control_transfer(address, max_packet0, &get_config, Some(&mut config), true).is_err() {
        crate::kprintln!("usb_core: failed to read full configuration for address {}", address);
        return;
    }

    let set_config = SetupPacket::set_configuration(config_value);
    if control_transfer(address, max_packet0, &set_config, None, false).is_err() {
        crate::kprintln!("usb_core: failed to set configuration {} for address {}", config_value, address);
        return;
    }

    let mut offset = 9;
    let mut current_interface: Option<super::InterfaceDescriptor> = None;
    let mut interface_endpoints: alloc::vec::Vec<super::EndpointDescriptor> = alloc::vec::Vec::new();

    while offset + 2 <= config.len() {
        let len = config[offset] as usize;
        let desc_type = config[offset + 1];
        if len == 0 || offset + len > config.len() {
            break;
        }

        match desc_type {
            // Interface descriptor: dispatch the one we just finished
            // collecting endpoints for, then start tracking the new one.
            4 if len >= 9 => {
    if let Some(iface) = current_interface.take() {
                    dispatch_interface(address, max_packet0, &iface, &config, &interface_endpoints);
                }
                interface_endpoints.clear();
                current_interface = Some(unsafe {
                    core::ptr::read_unaligned(config[offset..].as_ptr() as *const super::InterfaceDescriptor)
                });
            }
            5 if len >= 7 && current_interface.is_some() => {
                interface_endpoints.push(unsafe {
                    core::ptr::read_unaligned(config[offset..].as_ptr() as *const super::EndpointDescriptor)
                });
            }
            _ => {}
        }

        offset += len;
    }
    if let Some(iface) = current_interface {
        dispatch_interface(address, max_packet0, &iface, &config, &interface_endpoints);
    }
}

fn dispatch_interface(
    address: u8,
    max_packet0: u16,
    iface: &super::InterfaceDescriptor,
    config: &[u8],
    endpoints: &[super::EndpointDescriptor],
) {
    if super::hid::is_hid_interface(iface) {
        if let Some(ep) = endpoints
            .iter()
            .find(|e| e.transfer_type() == super::EndpointType::Interrupt && e.direction() == super::EndpointDirection::In)
        {
            if let Err(e) = super::hid::configure_device(address, config, iface, ep) {
                crate::kprintln!("usb_core: failed to configure HID interface on address {}: {:?}", address, e);
                return;
            }
            let set_boot_protocol = super::hid::set_protocol_packet(iface.interface_number, 0);
            let _ = control_transfer(address, max_packet0, &set_boot_protocol, None, false);
            let set_idle = super::hid::set_idle_packet(iface.interface_number, 0, 0);
            let _ = control_transfer(address, max_packet0, &set_idle, None, false);
        }
    } else if super::storage::is_mass_storage_interface(iface) {
        if let Err(e) = super::storage::configure_device(address, iface, endpoints) {
            crate::kprintln!("usb_core: failed to configure mass-storage interface on address {}: {:?}", address, e);
        }
    }
}

fn setup_hub_device(id: device::UsbDeviceId, address: u8, max_packet0: u16) {
    let mut hub_desc = [0u8; 9];
    let setup = super::hub::UsbHub::get_hub_descriptor_setup(hub_desc.len() as u16, false);
    if control_transfer(address, max_packet0, &setup, Some(&mut hub_desc), true).is_err() {
        crate::kprintln!("usb_core: failed to read hub descriptor for address {}", address);
        return;
    }
    let num_ports = hub_desc[2];
    let power_on_delay = hub_desc[4];
    let route_string = device::get_device(&id).map(|d| d.route_string).unwrap_or(0);

    // A hub is itself a device with one configuration and one interface
    // carrying the status-change interrupt-IN endpoint; read and select
    // that configuration the same way `configure_interfaces` does for
    // ordinary devices, but look for the endpoint instead of dispatching
    // to a class driver.
    let mut header = [0u8; 9];
    let get_header = SetupPacket::get_descriptor(DescriptorType::Configuration, 0, 9);
    let mut endpoint_info = None;
    if control_transfer(address, max_packet0, &get_header, Some(&mut header), true).is_ok() {
        let total_length = u16::from_le_bytes([header[2], header[3]]) as usize;
        let config_value = header[5];

        let mut config = alloc::vec![0u8; total_length];
        let get_config = SetupPacket::get_descriptor(DescriptorType::Configuration, 0, total_length as u16);
        if control_transfer(address, max_packet0, &get_config, Some(&mut config), true).is_ok() {
            let set_config = SetupPacket::set_configuration(config_value);
            if control_transfer(address, max_packet0, &set_config, None, false).is_err() {
                crate::kprintln!("usb_core: failed to set configuration for hub address {}", address);
            }
            endpoint_info = find_interrupt_in_endpoint(&config);
        } else {
            crate::kprintln!("usb_core: failed to read full configuration for hub address {}", address);
        }
    } else {
        crate::kprintln!("usb_core: failed to read configuration header for hub address {}", address);
    }

    super::hub::setup_hub(address, max_packet0, false, num_ports, power_on_delay, route_string, endpoint_info);
}

/// Walk a configuration descriptor's endpoint entries looking for the
/// first interrupt-IN one, returning its (endpoint number, bInterval,
/// max packet size). Used for a hub's status-change endpoint; ordinary
/// interfaces go through `dispatch_interface`'s per-class lookup instead.
fn find_interrupt_in_endpoint(config: &[u8]) -> Option<(u8, u8, u16)> {
    let mut offset = 9;
    while offset + 2 <= config.len() {
        let len = config[offset] as usize;
        let desc_type = config[offset + 1];
        if len == 0 || offset + len > config.len() {
            break;
        }
        if desc_type == 5 && len >= 7 {
            let ep: super::EndpointDescriptor =
                unsafe { core::ptr::read_unaligned(config[offset..].as_ptr() as *const super::EndpointDescriptor) };
            if ep.transfer_type() == super::EndpointType::Interrupt && ep.direction() == super::EndpointDirection::In {
                return Some((ep.endpoint_number(), ep.interval, ep.max_packet_size));
            }
        }
        offset += len;
    }
    None
}

/// Called by `hub` when a port-change interrupt report indicates a device
/// left the bus. Tears down its registration so stale addresses don't
/// linger in the device table.
pub fn disconnect_device(id: device::UsbDeviceId) {
    let _ = device::unregister_device(&id);
}

/// Exposes enumerated USB devices through the generic `drivers::bus`
/// registry, the same way `pci::PciBus` exposes PCI functions. `id` here is
/// just the device address — USB only has one active bus from the
/// registry's point of view since topology is carried in `route_string`.
pub struct UsbBus;

impl super::super::bus::BusDriver for UsbBus {
    fn kind(&self) -> super::super::bus::BusKind {
        super::super::bus::BusKind::Usb
    }

    fn get_targets(&self) -> Vec<super::super::bus::BusTarget> {
        device::list_devices()
            .into_iter()
            .map(|d| super::super::bus::BusTarget {
                bus: super::super::bus::BusKind::Usb,
                id: d.id.address as u32,
                class_name: d.class_name(),
                subclass_name: d.subclass_name(),
                claim_owner: d.claimed_by,
            })
            .collect()
    }

    fn get_target_info(&self, id: u32) -> KResult<alloc::string::String> {
        let target = device::list_devices()
            .into_iter()
            .find(|d| d.id.address as u32 == id)
            .ok_or(KError::NotFound)?;
        Ok(alloc::format!(
            "addr={} vid={:04x} pid={:04x} class={:02x} route=0x{:x} claimed_by={}",
            target.id.address, target.vendor_id, target.product_id, target.device_class, target.route_string,
            target.claimed_by.unwrap_or("-"),
        ))
    }

    fn device_claim(&self, id: u32, owner: &'static str) -> KResult<()> {
        let target = device::list_devices()
            .into_iter()
            .find(|d| d.id.address as u32 == id)
            .ok_or(KError::NotFound)?;
        device::claim_device(target.id, owner)
    }
}

/// Registers the `usb::usbcore` device table with the generic bus registry.
/// Called once from `usb::init()` after the device manager exists.
pub fn register_bus() {
    super::super::bus::register(Arc::new(UsbBus));
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn address_pool_increments_and_exhausts() {
        *NEXT_ADDRESS.lock() = 126;
        assert_eq!(allocate_address().unwrap(), 126);
        assert_eq!(allocate_address().unwrap(), 127);
        assert_eq!(allocate_address(), Err(KError::NoMemory));
        *NEXT_ADDRESS.lock() = 1;
    }
}

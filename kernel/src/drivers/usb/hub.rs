//! USB Hub driver
//!
//! Handles USB hub enumeration, port power, and downstream device detection.

use alloc::vec::Vec;
use spin::Mutex;

use super::controller::InterruptRegistration;
use super::{class, SetupPacket, UsbSpeed};
use crate::util::{KError, KResult};

/// Hub descriptor (USB 2.0)
#[repr(C, packed)]
#[derive(Debug, Clone, Copy)]
pub struct HubDescriptor {
    pub length: u8,
    pub descriptor_type: u8,
    pub num_ports: u8,
    pub characteristics: u16,
    pub power_on_time: u8,  // in 2ms units
    pub current: u8,
}

/// SuperSpeed Hub descriptor (USB 3.0)
#[repr(C, packed)]
#[derive(Debug, Clone, Copy)]
pub struct SsHubDescriptor {
    pub length: u8,
    pub descriptor_type: u8,
    pub num_ports: u8,
    pub characteristics: u16,
    pub power_on_time: u8,
    pub current: u8,
    pub header_decode_latency: u8,
    pub hub_delay: u16,
    pub removable_ports: u16,
}

/// Hub port status bits
pub mod port_status {
    pub const CONNECTION: u16 = 1 << 0;
    pub const ENABLE: u16 = 1 << 1;
    pub const SUSPEND: u16 = 1 << 2;
    pub const OVER_CURRENT: u16 = 1 << 3;
    pub const RESET: u16 = 1 << 4;
    pub const POWER: u16 = 1 << 8;
    pub const LOW_SPEED: u16 = 1 << 9;
    pub const HIGH_SPEED: u16 = 1 << 10;
    pub const TEST_MODE: u16 = 1 << 11;
    pub const INDICATOR: u16 = 1 << 12;
}

/// Hub port change bits
pub mod port_change {
    pub const C_CONNECTION: u16 = 1 << 0;
    pub const C_ENABLE: u16 = 1 << 1;
    pub const C_SUSPEND: u16 = 1 << 2;
    pub const C_OVER_CURRENT: u16 = 1 << 3;
    pub const C_RESET: u16 = 1 << 4;
}

/// Hub class-specific requests
pub mod hub_request {
    pub const GET_STATUS: u8 = 0;
    pub const CLEAR_FEATURE: u8 = 1;
    pub const SET_FEATURE: u8 = 3;
    pub const GET_DESCRIPTOR: u8 = 6;
    pub const SET_DESCRIPTOR: u8 = 7;
    pub const CLEAR_TT_BUFFER: u8 = 8;
    pub const RESET_TT: u8 = 9;
    pub const GET_TT_STATE: u8 = 10;
    pub const STOP_TT: u8 = 11;
    /// USB 3.0 hub class request, sets a SuperSpeed hub's distance (in
    /// tiers) from the root hub so it knows how to route hub-depth-aware
    /// link commands.
    pub const SET_HUB_DEPTH: u8 = 12;
}

/// Hub feature selectors
pub mod hub_feature {
    // Hub features
    pub const C_HUB_LOCAL_POWER: u16 = 0;
    pub const C_HUB_OVER_CURRENT: u16 = 1;

    // Port features
    pub const PORT_CONNECTION: u16 = 0;
    pub const PORT_ENABLE: u16 = 1;
    pub const PORT_SUSPEND: u16 = 2;
    pub const PORT_OVER_CURRENT: u16 = 3;
    pub const PORT_RESET: u16 = 4;
    pub const PORT_POWER: u16 = 8;
    pub const PORT_LOW_SPEED: u16 = 9;
    pub const C_PORT_CONNECTION: u16 = 16;
    pub const C_PORT_ENABLE: u16 = 17;
    pub const C_PORT_SUSPEND: u16 = 18;
    pub const C_PORT_OVER_CURRENT: u16 = 19;
    pub const C_PORT_RESET: u16 = 20;
    pub const PORT_TEST: u16 = 21;
    pub const PORT_INDICATOR: u16 = 22;
}

/// Port status and change (4 bytes returned by GET_PORT_STATUS)
#[repr(C)]
#[derive(Debug, Clone, Copy, Default)]
pub struct PortStatus {
    pub status: u16,
    pub change: u16,
}

impl PortStatus {
    /// Check if device is connected
    pub fn connected(&self) -> bool {
        self.status & port_status::CONNECTION != 0
    }

    /// Check if port is enabled
    pub fn enabled(&self) -> bool {
        self.status & port_status::ENABLE != 0
    }

    /// Check if port is powered
    pub fn powered(&self) -> bool {
        self.status & port_status::POWER != 0
    }

    /// Get device speed
    pub fn speed(&self) -> UsbSpeed {
        if self.status & port_status::LOW_SPEED != 0 {
            UsbSpeed::Low
        } else if self.status & port_status::HIGH_SPEED != 0 {
            UsbSpeed::High
        } else {
            UsbSpeed::Full
        }
    }

    /// Check if connection status changed
    pub fn connection_changed(&self) -> bool {
        self.change & port_change::C_CONNECTION != 0
    }

    /// Check if reset completed
    pub fn reset_changed(&self) -> bool {
        self.change & port_change::C_RESET != 0
    }
}

/// USB Hub instance
pub struct UsbHub {
    pub slot_id: u8,
    pub num_ports: u8,
    pub power_on_delay_ms: u16,
    pub is_superspeed: bool,
    pub route_string: u32,
    pub port_statuses: Vec<PortStatus>,
    /// Standing registration against the hub's status-change interrupt-IN
    /// endpoint, if one was found during `setup_hub`. `None` means the hub
    /// has no such endpoint (or registration failed), and `poll_hub` falls
    /// back to checking every port directly every tick.
    int_reg: Option<InterruptRegistration>,
}

impl UsbHub {
    /// Create setup packet for getting hub descriptor
    pub fn get_hub_descriptor_setup(length: u16, is_superspeed: bool) -> SetupPacket {
        let desc_type = if is_superspeed { 0x2A } else { 0x29 };
        SetupPacket {
            request_type: 0xA0, // Device to Host, Class, Device
            request: hub_request::GET_DESCRIPTOR,
            value: (desc_type as u16) << 8,
            index: 0,
            length,
        }
    }

    /// Create setup packet for getting port status
    pub fn get_port_status_setup(port: u8) -> SetupPacket {
        SetupPacket {
            request_type: 0xA3, // Device to Host, Class, Other
            request: hub_request::GET_STATUS,
            value: 0,
            index: port as u16,
            length: 4,
        }
    }

    /// Create setup packet for setting port feature
    pub fn set_port_feature_setup(port: u8, feature: u16) -> SetupPacket {
        SetupPacket {
            request_type: 0x23, // Host to Device, Class, Other
            request: hub_request::SET_FEATURE,
            value: feature,
            index: port as u16,
            length: 0,
        }
    }

    /// Create setup packet for clearing port feature
    pub fn clear_port_feature_setup(port: u8, feature: u16) -> SetupPacket {
        SetupPacket {
            request_type: 0x23, // Host to Device, Class, Other
            request: hub_request::CLEAR_FEATURE,
            value: feature,
            index: port as u16,
            length: 0,
        }
    }
}

/// List of known hubs
static HUBS: Mutex<Vec<UsbHub>> = Mutex::new(Vec::new());

/// Per-port device tracking, keyed by (hub slot, port). Lets polling tell
/// a fresh connect from one already enumerated last round.
struct PortState {
    hub_slot: u8,
    port: u8,
    device: Option<super::device::UsbDeviceId>,
}

static PORT_STATES: Mutex<Vec<PortState>> = Mutex::new(Vec::new());

/// Maximum reset attempts before giving up on a port (mirrors the retry
/// budget most host controllers use for electrically noisy connects).
const MAX_RESET_ATTEMPTS: u32 = 3;

/// Initialize hub subsystem
pub fn init() {
    crate::kprintln!("usb_hub: initialized");
}

/// Poll every registered hub's ports for connect/disconnect changes and
/// drive new devices through enumeration. Intended to be called
/// periodically from the kernel's polling thread (root-hub ports are
/// polled the same way, registered as a hub with route_string 0).
pub fn poll_all() {
    let slots: Vec<u8> = HUBS.lock().iter().map(|h| h.slot_id).collect();
    for slot in slots {
        poll_hub(slot);
    }
}

/// Poll one hub. When it has a status-change interrupt-IN endpoint
/// registered, only the ports the report flags as changed are checked via
/// `GET_STATUS`; the report itself is just a bitmap (bit 0 the hub's own
/// change, bit N port N's) and carries no detail, so a set bit is purely a
/// signal to go ask that port what changed. Hubs without such an endpoint
/// (or one that failed to register) fall back to checking every port
/// directly every tick.
fn poll_hub(hub_slot: u8) {
    let (num_ports, has_int_reg, report) = {
        let mut hubs = HUBS.lock();
        match hubs.iter_mut().find(|h| h.slot_id == hub_slot) {
            Some(h) => {
                let has_int_reg = h.int_reg.is_some();
                let report = h.int_reg.as_mut().and_then(|r| r.poll());
                (h.num_ports, has_int_reg, report)
            }
            None => return,
        }
    };

    match report {
        Some(bitmap) => {
            for port in 1..=num_ports {
                let bit_index = port as usize;
                let byte = bit_index / 8;
                let bit = bit_index % 8;
                if byte < bitmap.len() && (bitmap[byte] & (1 << bit)) != 0 {
                    check_port(hub_slot, port);
                }
            }
        }
        None if !has_int_reg => {
            for port in 1..=num_ports {
                check_port(hub_slot, port);
            }
        }
        None => {}
    }
}

fn check_port(hub_slot: u8, port: u8) {
    let status = match read_port_status(hub_slot, port) {
        Ok(s) => s,
        Err(_) => return,
    };

    let had_device = PORT_STATES
        .lock()
        .iter()
        .any(|p| p.hub_slot == hub_slot && p.port == port && p.device.is_some());

    if status.connection_changed() {
        clear_port_feature(hub_slot, port, hub_feature::C_PORT_CONNECTION);

        if status.connected() && !had_device {
            handle_connect(hub_slot, port);
        } else if !status.connected() && had_device {
            handle_disconnect(hub_slot, port);
        }
    }
}

fn handle_connect(hub_slot: u8, port: u8) {
    // Settle delay: lets contact bounce on a freshly seated connector
    // die down before we reset (standard USB debounce interval).
    crate::drivers::hpet::sleep_ms(100);

    let mut speed = UsbSpeed::Full;
    let mut reset_ok = false;
    for attempt in 0..MAX_RESET_ATTEMPTS {
        set_port_feature(hub_slot, port, hub_feature::PORT_RESET);
        crate::drivers::hpet::sleep_ms(50);
        match read_port_status(hub_slot, port) {
            Ok(status) if status.enabled() => {
                speed = status.speed();
                reset_ok = true;
                clear_port_feature(hub_slot, port, hub_feature::C_PORT_RESET);
                break;
            }
            _ => {
                crate::kprintln!(
                    "usb_hub: reset attempt {} failed on hub {} port {}",
                    attempt + 1,
                    hub_slot,
                    port
                );
            }
        }
    }

    if !reset_ok {
        crate::kprintln!("usb_hub: giving up on hub {} port {} after {} resets", hub_slot, port, MAX_RESET_ATTEMPTS);
        return;
    }

    let parent = find_device_by_address(hub_slot);

    match super::usbcore::enumerate_device(speed, parent, port) {
        Ok(id) => {
            let mut states = PORT_STATES.lock();
            if let Some(p) = states.iter_mut().find(|p| p.hub_slot == hub_slot && p.port == port) {
                p.device = Some(id);
            } else {
                states.push(PortState { hub_slot, port, device: Some(id) });
            }
        }
        Err(e) => {
            crate::kprintln!("usb_hub: enumeration failed on hub {} port {}: {:?}", hub_slot, port, e);
        }
    }
}

fn handle_disconnect(hub_slot: u8, port: u8) {
    let mut states = PORT_STATES.lock();
    if let Some(p) = states.iter_mut().find(|p| p.hub_slot == hub_slot && p.port == port) {
        if let Some(id) = p.device.take() {
            crate::kprintln!("usb_hub: device on hub {} port {} disconnected", hub_slot, port);
            super::usbcore::disconnect_device(id);
        }
    }
}

fn find_device_by_address(address: u8) -> Option<super::device::UsbDeviceId> {
    super::device::list_devices()
        .into_iter()
        .find(|d| d.id.address == address)
        .map(|d| d.id)
}

fn read_port_status(hub_slot: u8, port: u8) -> KResult<PortStatus> {
    let mut raw = [0u8; 4];
    let setup = UsbHub::get_port_status_setup(port);
    super::usbcore::control_transfer(hub_slot, 64, &setup, Some(&mut raw), true)?;
    Ok(PortStatus {
        status: u16::from_le_bytes([raw[0], raw[1]]),
        change: u16::from_le_bytes([raw[2], raw[3]]),
    })
}

fn set_port_feature(hub_slot: u8, port: u8, feature: u16) {
    let setup = UsbHub::set_port_feature_setup(port, feature);
    let _ = super::usbcore::control_transfer(hub_slot, 64, &setup, None, false);
}

fn clear_port_feature(hub_slot: u8, port: u8, feature: u16) {
    let setup = UsbHub::clear_port_feature_setup(port, feature);
    let _ = super::usbcore::control_transfer(hub_slot, 64, &setup, None, false);
}

/// Register a new hub
pub fn register_hub(hub: UsbHub) {
    let num_ports = hub.num_ports;
    let slot = hub.slot_id;
    HUBS.lock().push(hub);
    crate::kprintln!("usb_hub: registered hub slot {} with {} ports", slot, num_ports);
}

/// Check if a device class indicates it's a hub
pub fn is_hub_class(device_class: u8) -> bool {
    device_class == class::HUB
}

/// Get number of registered hubs
pub fn hub_count() -> usize {
    HUBS.lock().len()
}

/// Finish bringing up a hub device after its descriptor has been read:
/// depth-configure SuperSpeed hubs, power every downstream port and wait
/// out its power-on-to-power-good settle time, register a status-change
/// interrupt-IN endpoint if the hub offers one, then register the hub for
/// polling.
///
/// `endpoint_info` is `(endpoint_number, interval, max_packet)` for the
/// hub's interrupt-IN endpoint, found by `usbcore::setup_hub_device`
/// walking the hub's configuration descriptor; `None` if the hub's
/// configuration couldn't be read or had no such endpoint.
pub fn setup_hub(
    slot_id: u8,
    max_packet0: u16,
    is_superspeed: bool,
    num_ports: u8,
    power_on_delay_2ms: u8,
    route_string: u32,
    endpoint_info: Option<(u8, u8, u16)>,
) {
    if is_superspeed {
        let set_depth = SetupPacket {
            request_type: 0x20, // Host to Device, Class, Device
            request: hub_request::SET_HUB_DEPTH,
            value: 0,
            index: 0,
            length: 0,
        };
        let _ = super::usbcore::control_transfer(slot_id, max_packet0, &set_depth, None, false);
    }

    for port in 1..=num_ports {
        set_port_feature(slot_id, port, hub_feature::PORT_POWER);
    }

    let power_on_delay_ms = (power_on_delay_2ms as u16) * 2;
    // pwrOn2PwrGood: ports aren't safe to probe until this settles.
    crate::drivers::hpet::sleep_ms(power_on_delay_ms as u64);

    let int_reg = endpoint_info.and_then(|(endpoint_num, interval, max_packet)| {
        match InterruptRegistration::new(slot_id, endpoint_num, max_packet, interval.max(1) as u32) {
            Ok(reg) => Some(reg),
            Err(e) => {
                crate::kprintln!("usb_hub: failed to register status endpoint for hub {}: {:?}", slot_id, e);
                None
            }
        }
    });
    if int_reg.is_none() && endpoint_info.is_some() {
        crate::kprintln!("usb_hub: hub {} will be polled by direct port status reads", slot_id);
    }

    let hub = UsbHub {
        slot_id,
        num_ports,
        power_on_delay_ms,
        is_superspeed,
        route_string,
        port_statuses: alloc::vec![PortStatus::default(); num_ports as usize],
        int_reg,
    };

    crate::kprintln!(
        "usb_hub: setup hub slot {} ({} ports, {}ms power delay, route=0x{:x})",
        slot_id,
        num_ports,
        hub.power_on_delay_ms,
        route_string
    );

    register_hub(hub);
}

/// Calculate route string for a device behind a hub
/// Route string encodes the path through hub ports (4 bits per tier)
pub fn calculate_route_string(parent_route: u32, hub_port: u8) -> u32 {
    // Find the first empty nibble in the route string
    // Each nibble holds a port number (1-15, 0 means unused)
    let port = (hub_port.min(15)) as u32;

    if parent_route == 0 {
        // First hub tier - just the port number
        port
    } else {
        // Find position to insert
        let mut route = parent_route;
        let mut shift = 0u32;

        while shift < 20 && ((route >> shift) & 0xF) != 0 {
            shift += 4;
        }

        if shift >= 20 {
            // Too many tiers (max 5)
            parent_route
        } else {
            route | (port << shift)
        }
    }
}

//! PCI (legacy config space via 0xCF8/0xCFC).
//!
//! Este módulo faz varredura do barramento PCI e leitura/escrita do config space.
//! É suficiente para inicializar virtio-blk no QEMU e também serve como base para
//! AHCI/NVMe em máquinas reais.

#![allow(dead_code)]

use alloc::collections::BTreeMap;
use alloc::vec::Vec;
use spin::Mutex;
use x86_64::instructions::port::Port;

#[derive(Debug, Clone, Copy)]
pub struct PciAddress {
    pub bus: u8,
    pub device: u8,
    pub function: u8,
}

#[derive(Debug, Clone, Copy)]
pub struct PciId {
    pub vendor_id: u16,
    pub device_id: u16,
}

#[derive(Debug, Clone, Copy)]
pub struct PciClass {
    pub class_code: u8,
    pub subclass: u8,
    pub prog_if: u8,
    pub revision: u8,
}

#[derive(Debug, Clone, Copy)]
pub struct PciDevice {
    pub addr: PciAddress,
    pub id: PciId,
    pub class: PciClass,
    pub header_type: u8,
}

const CONFIG_ADDRESS: u16 = 0xCF8;
const CONFIG_DATA: u16 = 0xCFC;

#[inline]
fn config_addr(bus: u8, device: u8, function: u8, offset: u8) -> u32 {
    let bus = bus as u32;
    let device = device as u32;
    let function = function as u32;
    let offset = (offset as u32) & 0xFC;
    (1u32 << 31) | (bus << 16) | (device << 11) | (function << 8) | offset
}

pub fn read_u32(bus: u8, device: u8, function: u8, offset: u8) -> u32 {
    unsafe {
        let mut addr = Port::<u32>::new(CONFIG_ADDRESS);
        let mut data = Port::<u32>::new(CONFIG_DATA);
        addr.write(config_addr(bus, device, function, offset));
        data.read()
    }
}

pub fn write_u32(bus: u8, device: u8, function: u8, offset: u8, value: u32) {
    unsafe {
        let mut addr = Port::<u32>::new(CONFIG_ADDRESS);
        let mut data = Port::<u32>::new(CONFIG_DATA);
        addr.write(config_addr(bus, device, function, offset));
        data.write(value);
    }
}

pub fn read_u16(bus: u8, device: u8, function: u8, offset: u8) -> u16 {
    let v = read_u32(bus, device, function, offset & 0xFC);
    let shift = ((offset & 2) * 8) as u32;
    ((v >> shift) & 0xFFFF) as u16
}

pub fn write_u16(bus: u8, device: u8, function: u8, offset: u8, value: u16) {
    let aligned = offset & 0xFC;
    let mut v = read_u32(bus, device, function, aligned);
    let shift = ((offset & 2) * 8) as u32;
    v &= !(0xFFFFu32 << shift);
    v |= (value as u32) << shift;
    write_u32(bus, device, function, aligned, v);
}

pub fn read_u8(bus: u8, device: u8, function: u8, offset: u8) -> u8 {
    let v = read_u32(bus, device, function, offset & 0xFC);
    let shift = ((offset & 3) * 8) as u32;
    ((v >> shift) & 0xFF) as u8
}

pub fn write_u8(bus: u8, device: u8, function: u8, offset: u8, value: u8) {
    let aligned = offset & 0xFC;
    let mut v = read_u32(bus, device, function, aligned);
    let shift = ((offset & 3) * 8) as u32;
    v &= !(0xFFu32 << shift);
    v |= (value as u32) << shift;
    write_u32(bus, device, function, aligned, v);
}

pub fn scan() -> Vec<PciDevice> {
    let mut out = Vec::new();
    for bus in 0u16..=255 {
        let bus = bus as u8;
        for device in 0u8..32 {
            let vendor = read_u16(bus, device, 0, 0x00);
            if vendor == 0xFFFF {
                continue;
            }
            let header_type = read_u8(bus, device, 0, 0x0E);
            let multi = (header_type & 0x80) != 0;
            let functions = if multi { 8 } else { 1 };

            for function in 0u8..functions {
                let vendor = read_u16(bus, device, function, 0x00);
                if vendor == 0xFFFF {
                    continue;
                }
                let device_id = read_u16(bus, device, function, 0x02);

                let revision = read_u8(bus, device, function, 0x08);
                let prog_if = read_u8(bus, device, function, 0x09);
                let subclass = read_u8(bus, device, function, 0x0A);
                let class_code = read_u8(bus, device, function, 0x0B);

                let header_type = read_u8(bus, device, function, 0x0E);

                out.push(PciDevice {
                    addr: PciAddress {
                        bus,
                        device,
                        function,
                    },
                    id: PciId {
                        vendor_id: vendor,
                        device_id,
                    },
                    class: PciClass {
                        class_code,
                        subclass,
                        prog_if,
                        revision,
                    },
                    header_type,
                });
            }
        }
    }
    out
}

/// Lê BAR n (0..5). Retorna (base, is_io).
pub fn read_bar(dev: &PciDevice, bar_index: u8) -> (u64, bool) {
    let offset = 0x10 + bar_index * 4;
    let raw = read_u32(dev.addr.bus, dev.addr.device, dev.addr.function, offset);
    if raw & 0x1 == 0x1 {
        // I/O
        ((raw & 0xFFFF_FFFC) as u64, true)
    } else {
        // MMIO (32-bit); para 64-bit, BAR ocupa dois regs
        ((raw & 0xFFFF_FFF0) as u64, false)
    }
}

/// Command register bit for I/O space decode.
const CMD_IO: u16 = 1 << 0;
/// Command register bit for memory space decode.
const CMD_MEM: u16 = 1 << 1;
/// Command register bit for bus mastering.
const CMD_MASTER: u16 = 1 << 2;

/// Enable or disable I/O + memory space decode for a function.
pub fn device_enable(dev: &PciDevice, on: bool) {
    let cmd = read_u16(dev.addr.bus, dev.addr.device, dev.addr.function, 0x04);
    let new = if on {
        cmd | CMD_IO | CMD_MEM
    } else {
        cmd & !(CMD_IO | CMD_MEM)
    };
    write_u16(dev.addr.bus, dev.addr.device, dev.addr.function, 0x04, new);
}

/// Enable or disable bus mastering. Also bumps the latency timer to a
/// sane minimum so a master-capable device isn't starved on a shared bus.
pub fn set_master(dev: &PciDevice, on: bool) {
    let cmd = read_u16(dev.addr.bus, dev.addr.device, dev.addr.function, 0x04);
    let new = if on { cmd | CMD_MASTER } else { cmd & !CMD_MASTER };
    write_u16(dev.addr.bus, dev.addr.device, dev.addr.function, 0x04, new);

    if on {
        let latency = read_u8(dev.addr.bus, dev.addr.device, dev.addr.function, 0x0D);
        if latency < 0x10 {
            write_u8(dev.addr.bus, dev.addr.device, dev.addr.function, 0x0D, 0x40);
        }
    }
}

pub fn enable_bus_mastering(dev: &PciDevice) {
    device_enable(dev, true);
    set_master(dev, true);
}

/// Coarse (class, subclass) -> human-readable device class, matching the
/// PCI class code table. Used for bus-registry listings, not for driver
/// dispatch (drivers still match on exact class/subclass/prog_if).
pub fn classify(class: &PciClass) -> &'static str {
    match (class.class_code, class.subclass) {
        (0x01, 0x01) => "ide-controller",
        (0x01, 0x06) => "sata-controller",
        (0x01, 0x08) => "nvme-controller",
        (0x02, 0x00) => "ethernet-controller",
        (0x03, _) => "display-controller",
        (0x04, 0x01) => "audio-controller",
        (0x06, 0x04) => "pci-bridge",
        (0x0C, 0x03) => "usb-controller",
        (0x0C, 0x05) => "smbus-controller",
        _ => "unknown",
    }
}

/// Finer-grained than `classify`: for a USB host controller, the
/// programming interface byte names the actual interface (UHCI/OHCI/EHCI/
/// XHCI); other classes have nothing finer to report here.
pub fn classify_subclass(class: &PciClass) -> Option<&'static str> {
    match (class.class_code, class.subclass, class.prog_if) {
        (0x0C, 0x03, 0x00) => Some("uhci"),
        (0x0C, 0x03, 0x10) => Some("ohci"),
        (0x0C, 0x03, 0x20) => Some("ehci"),
        (0x0C, 0x03, 0x30) => Some("xhci"),
        _ => None,
    }
}

/// Exposes the scanned PCI bus through the generic `BusDriver` registry.
pub struct PciBus {
    devices: Vec<PciDevice>,
    claims: Mutex<BTreeMap<u32, &'static str>>,
}

impl PciBus {
    pub fn scan_new() -> Self {
        Self { devices: scan(), claims: Mutex::new(BTreeMap::new()) }
    }

    pub fn devices(&self) -> &[PciDevice] {
        &self.devices
    }

    pub fn find(&self, addr: PciAddress) -> Option<&PciDevice> {
        self.devices.iter().find(|d| {
            d.addr.bus == addr.bus && d.addr.device == addr.device && d.addr.function == addr.function
        })
    }
}

impl super::bus::BusDriver for PciBus {
    fn kind(&self) -> super::bus::BusKind {
        super::bus::BusKind::Pci
    }

    fn get_targets(&self) -> Vec<super::bus::BusTarget> {
        let claims = self.claims.lock();
        self.devices
            .iter()
            .map(|d| {
                let id = ((d.addr.bus as u32) << 16) | ((d.addr.device as u32) << 8) | d.addr.function as u32;
                super::bus::BusTarget {
                    bus: super::bus::BusKind::Pci,
                    id,
                    class_name: classify(&d.class),
                    subclass_name: classify_subclass(&d.class),
                    claim_owner: claims.get(&id).copied(),
                }
            })
            .collect()
    }

    fn get_target_info(&self, id: u32) -> crate::util::KResult<alloc::string::String> {
        use alloc::format;
        let addr = decode_target_id(id);
        let dev = self.find(addr).ok_or(crate::util::KError::NotFound)?;
        let owner = self.claims.lock().get(&id).copied();
        Ok(format!(
            "{:02x}:{:02x}.{:x} [{:04x}:{:04x}] class={:02x}:{:02x} prog_if={:02x} claimed_by={}",
            dev.addr.bus, dev.addr.device, dev.addr.function,
            dev.id.vendor_id, dev.id.device_id,
            dev.class.class_code, dev.class.subclass, dev.class.prog_if,
            owner.unwrap_or("-"),
        ))
    }

    fn device_enable(&self, id: u32, on: bool) -> crate::util::KResult<()> {
        let addr = decode_target_id(id);
        let dev = self.find(addr).ok_or(crate::util::KError::NotFound)?;
        device_enable(dev, on);
        Ok(())
    }

    fn set_master(&self, id: u32, on: bool) -> crate::util::KResult<()> {
        let addr = decode_target_id(id);
        let dev = self.find(addr).ok_or(crate::util::KError::NotFound)?;
        set_master(dev, on);
        Ok(())
    }

    fn device_claim(&self, id: u32, owner: &'static str) -> crate::util::KResult<()> {
        let addr = decode_target_id(id);
        self.find(addr).ok_or(crate::util::KError::NotFound)?;
        let mut claims = self.claims.lock();
        match claims.get(&id) {
            Some(existing) if *existing != owner => Err(crate::util::KError::AlreadyPresent),
            _ => {
                claims.insert(id, owner);
                Ok(())
            }
        }
    }

    fn read_register(&self, id: u32, reg: u32, width: u8) -> crate::util::KResult<u32> {
        let addr = decode_target_id(id);
        let dev = self.find(addr).ok_or(crate::util::KError::NotFound)?;
        let offset = reg as u8;
        match width {
            1 => Ok(read_u8(dev.addr.bus, dev.addr.device, dev.addr.function, offset) as u32),
            2 => Ok(read_u16(dev.addr.bus, dev.addr.device, dev.addr.function, offset) as u32),
            4 => Ok(read_u32(dev.addr.bus, dev.addr.device, dev.addr.function, offset)),
            _ => Err(crate::util::KError::Invalid),
        }
    }

    fn write_register(&self, id: u32, reg: u32, width: u8, value: u32) -> crate::util::KResult<()> {
        let addr = decode_target_id(id);
        let dev = self.find(addr).ok_or(crate::util::KError::NotFound)?;
        let offset = reg as u8;
        match width {
            1 => write_u8(dev.addr.bus, dev.addr.device, dev.addr.function, offset, value as u8),
            2 => write_u16(dev.addr.bus, dev.addr.device, dev.addr.function, offset, value as u16),
            4 => write_u32(dev.addr.bus, dev.addr.device, dev.addr.function, offset, value),
            _ => return Err(crate::util::KError::Invalid),
        }
        Ok(())
    }
}

fn decode_target_id(id: u32) -> PciAddress {
    PciAddress {
        bus: (id >> 16) as u8,
        device: (id >> 8) as u8,
        function: id as u8,
    }
}

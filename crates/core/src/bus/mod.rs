// LabWired - Firmware Simulation Platform
// Copyright (C) 2026 Andrii Shylenko
//
// This software is released under the MIT License.
// See the LICENSE file in the project root for full license information.

use crate::peripherals::{gpio::GpioPort, rcc::Rcc, timer::Timer};
use crate::{
    AccessKind, BusAccess, BusObserver, Peripheral, PeripheralTickResult, SimResult,
    SimulationError,
};
use labwired_config::ChipDescriptor;
use std::sync::{Arc, Mutex};

pub struct PeripheralEntry {
    pub name: String,
    pub base: u64,
    pub size: u64,
    pub irq: Option<u32>,
    pub dev: Box<dyn Peripheral>,
}

impl PeripheralEntry {
    fn contains(&self, addr: u64) -> bool {
        addr >= self.base && addr - self.base < self.size
    }
}

/// Peripheral address space of the simulated chip.
///
/// Only word accesses are modeled. Anything outside a mapped window is a
/// [`SimulationError::MemoryViolation`].
pub struct SystemBus {
    pub peripherals: Vec<PeripheralEntry>,
    pub observers: Vec<Arc<dyn BusObserver>>,
    fault_count: u64,
}

impl Default for SystemBus {
    fn default() -> Self {
        Self::new()
    }
}

impl SystemBus {
    /// STM32F103 blocks used by the blinker, at their datasheet addresses.
    pub fn new() -> Self {
        let mut bus = Self::empty();
        bus.add_peripheral("tim2", 0x4000_0000, 0x400, Some(28), Box::new(Timer::new()));
        bus.add_peripheral("tim3", 0x4000_0400, 0x400, Some(29), Box::new(Timer::new()));
        bus.add_peripheral("gpioa", 0x4001_0800, 0x400, None, Box::new(GpioPort::new()));
        bus.add_peripheral("gpiob", 0x4001_0C00, 0x400, None, Box::new(GpioPort::new()));
        bus.add_peripheral("gpioc", 0x4001_1000, 0x400, None, Box::new(GpioPort::new()));
        bus.add_peripheral("rcc", 0x4002_1000, 0x400, None, Box::new(Rcc::new()));
        bus
    }

    pub fn empty() -> Self {
        Self {
            peripherals: Vec::new(),
            observers: Vec::new(),
            fault_count: 0,
        }
    }

    pub fn from_config(chip: &ChipDescriptor) -> anyhow::Result<Self> {
        let mut bus = Self::empty();

        for p_cfg in &chip.peripherals {
            let dev: Box<dyn Peripheral> = match p_cfg.r#type.as_str() {
                "gpio" => Box::new(GpioPort::new()),
                "rcc" => Box::new(Rcc::new()),
                "timer" => Box::new(Timer::new()),
                other => {
                    tracing::warn!(
                        "Unsupported peripheral type '{}' for id '{}'; skipping",
                        other,
                        p_cfg.id
                    );
                    continue;
                }
            };

            let size = ChipDescriptor::peripheral_size(p_cfg)?;
            bus.add_peripheral(&p_cfg.id, p_cfg.base_address, size, p_cfg.irq, dev);
        }

        tracing::debug!(
            "Bus for {} built with {} peripherals",
            chip.name,
            bus.peripherals.len()
        );
        Ok(bus)
    }

    pub fn add_peripheral(
        &mut self,
        name: &str,
        base: u64,
        size: u64,
        irq: Option<u32>,
        dev: Box<dyn Peripheral>,
    ) {
        self.peripherals.push(PeripheralEntry {
            name: name.to_string(),
            base,
            size,
            irq,
            dev,
        });
    }

    pub fn add_observer(&mut self, observer: Arc<dyn BusObserver>) {
        self.observers.push(observer);
    }

    /// Faulted accesses that came in through [`blinker::RegisterAccess`].
    pub fn fault_count(&self) -> u64 {
        self.fault_count
    }

    fn resolve(&self, addr: u64) -> SimResult<(usize, u64)> {
        if addr % 4 != 0 {
            return Err(SimulationError::MisalignedAccess(addr));
        }
        self.peripherals
            .iter()
            .position(|p| p.contains(addr))
            .map(|idx| (idx, addr - self.peripherals[idx].base))
            .ok_or(SimulationError::MemoryViolation(addr))
    }

    pub fn read_u32(&self, addr: u64) -> SimResult<u32> {
        let (idx, offset) = self.resolve(addr)?;
        self.peripherals[idx].dev.read(offset)
    }

    pub fn write_u32(&mut self, addr: u64, value: u32) -> SimResult<()> {
        let (idx, offset) = self.resolve(addr)?;
        self.peripherals[idx].dev.write(offset, value)
    }

    /// Advance every peripheral by `cycles`; returns the IRQ lines that are
    /// asserted afterwards.
    pub fn tick_peripherals(&mut self, cycles: u64) -> Vec<u32> {
        let mut irqs = Vec::new();
        for p in &mut self.peripherals {
            let res = p.dev.tick(cycles);
            if res.irq {
                if let Some(irq) = p.irq {
                    irqs.push(irq);
                }
            }
            if res != PeripheralTickResult::default() {
                for observer in &self.observers {
                    observer.on_peripheral_tick(&p.name, cycles, &res);
                }
            }
        }
        irqs
    }

    pub fn peripheral_entry(&self, name: &str) -> Option<&PeripheralEntry> {
        self.peripherals.iter().find(|p| p.name == name)
    }

    /// Typed view of a named peripheral.
    pub fn peripheral<T: 'static>(&self, name: &str) -> Option<&T> {
        self.peripheral_entry(name)?
            .dev
            .as_any()?
            .downcast_ref::<T>()
    }

    /// Typed view of whichever peripheral is mapped at `addr`.
    pub fn peripheral_at<T: 'static>(&self, addr: u64) -> Option<&T> {
        self.peripherals
            .iter()
            .find(|p| p.contains(addr))?
            .dev
            .as_any()?
            .downcast_ref::<T>()
    }

    pub fn peripheral_mut<T: 'static>(&mut self, name: &str) -> Option<&mut T> {
        self.peripherals
            .iter_mut()
            .find(|p| p.name == name)?
            .dev
            .as_any_mut()?
            .downcast_mut::<T>()
    }

    pub fn peek_peripheral(&self, name: &str) -> Option<serde_json::Value> {
        self.peripheral_entry(name).map(|p| p.dev.snapshot())
    }
}

impl blinker::RegisterAccess for SystemBus {
    fn read(&mut self, addr: u32) -> u32 {
        let addr = u64::from(addr);
        match self.read_u32(addr) {
            Ok(value) => {
                for observer in &self.observers {
                    observer.on_read(addr, value);
                }
                value
            }
            Err(e) => {
                // A faulting load reads as zero; the firmware has no way to notice.
                self.fault_count += 1;
                tracing::warn!("Bus fault on read: {}", e);
                for observer in &self.observers {
                    observer.on_fault(&e);
                }
                0
            }
        }
    }

    fn write(&mut self, addr: u32, value: u32) {
        let addr = u64::from(addr);
        match self.write_u32(addr, value) {
            Ok(()) => {
                for observer in &self.observers {
                    observer.on_write(addr, value);
                }
            }
            Err(e) => {
                self.fault_count += 1;
                tracing::warn!("Bus fault on write of {:#010x}: {}", value, e);
                for observer in &self.observers {
                    observer.on_fault(&e);
                }
            }
        }
    }
}

/// Observer that keeps every access in order.
#[derive(Debug, Default)]
pub struct AccessRecorder {
    accesses: Mutex<Vec<BusAccess>>,
}

impl AccessRecorder {
    pub fn new() -> Self {
        Self::default()
    }

    fn push(&self, access: BusAccess) {
        self.accesses
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push(access);
    }

    pub fn accesses(&self) -> Vec<BusAccess> {
        self.accesses
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    pub fn take(&self) -> Vec<BusAccess> {
        std::mem::take(
            &mut *self
                .accesses
                .lock()
                .unwrap_or_else(|poisoned| poisoned.into_inner()),
        )
    }

    pub fn writes_to(&self, addr: u64) -> Vec<u32> {
        self.accesses()
            .into_iter()
            .filter(|a| a.kind == AccessKind::Write && a.addr == addr)
            .map(|a| a.value)
            .collect()
    }
}

impl BusObserver for AccessRecorder {
    fn on_read(&self, addr: u64, value: u32) {
        self.push(BusAccess {
            kind: AccessKind::Read,
            addr,
            value,
        });
    }

    fn on_write(&self, addr: u64, value: u32) {
        self.push(BusAccess {
            kind: AccessKind::Write,
            addr,
            value,
        });
    }
}

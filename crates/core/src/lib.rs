// LabWired - Firmware Simulation Platform
// Copyright (C) 2026 Andrii Shylenko
//
// This software is released under the MIT License.
// See the LICENSE file in the project root for full license information.

pub mod bus;
pub mod peripherals;
pub mod sim;

use std::any::Any;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SimulationError {
    #[error("Memory access violation at {0:#x}")]
    MemoryViolation(u64),
    #[error("Misaligned word access at {0:#x}")]
    MisalignedAccess(u64),
    #[error("No peripheral named '{0}'")]
    UnknownPeripheral(String),
}

pub type SimResult<T> = Result<T, SimulationError>;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PeripheralTickResult {
    /// Interrupt line level after the tick.
    pub irq: bool,
    /// Update events (timer overflows) that happened during the tick.
    pub events: u64,
}

/// Trait representing a memory-mapped peripheral.
///
/// Offsets are relative to the peripheral base and word aligned; the bus
/// rejects anything else before it gets here.
pub trait Peripheral: std::fmt::Debug + Send {
    fn read(&self, offset: u64) -> SimResult<u32>;
    fn write(&mut self, offset: u64, value: u32) -> SimResult<()>;

    /// Advance the peripheral by `cycles` input clock cycles.
    fn tick(&mut self, _cycles: u64) -> PeripheralTickResult {
        PeripheralTickResult::default()
    }

    fn as_any(&self) -> Option<&dyn Any> {
        None
    }

    fn as_any_mut(&mut self) -> Option<&mut dyn Any> {
        None
    }

    fn snapshot(&self) -> serde_json::Value {
        serde_json::Value::Null
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AccessKind {
    Read,
    Write,
}

/// One word access issued through the bus.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
pub struct BusAccess {
    pub kind: AccessKind,
    pub addr: u64,
    pub value: u32,
}

/// Trait for observing bus events in a modular way.
pub trait BusObserver: std::fmt::Debug + Send + Sync {
    fn on_read(&self, _addr: u64, _value: u32) {}
    fn on_write(&self, _addr: u64, _value: u32) {}
    fn on_fault(&self, _error: &SimulationError) {}
    fn on_peripheral_tick(&self, _name: &str, _cycles: u64, _result: &PeripheralTickResult) {}
}

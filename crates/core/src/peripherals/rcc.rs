// LabWired - Firmware Simulation Platform
// Copyright (C) 2026 Andrii Shylenko
//
// This software is released under the MIT License.
// See the LICENSE file in the project root for full license information.

use crate::SimResult;

const AHBENR: u64 = 0x14;
const APB2ENR: u64 = 0x18;
const APB1ENR: u64 = 0x1C;

/// Minimal STM32F1 RCC: just the clock-enable registers.
#[derive(Debug, serde::Serialize)]
pub struct Rcc {
    ahbenr: u32,
    apb2enr: u32,
    apb1enr: u32,
}

impl Default for Rcc {
    fn default() -> Self {
        Self::new()
    }
}

impl Rcc {
    pub fn new() -> Self {
        Self {
            ahbenr: 0x0000_0014, // SRAM and FLITF clocks on after reset
            apb2enr: 0,
            apb1enr: 0,
        }
    }

    pub fn apb2enr(&self) -> u32 {
        self.apb2enr
    }

    pub fn apb1enr(&self) -> u32 {
        self.apb1enr
    }

    pub fn is_apb2_enabled(&self, bit: u32) -> bool {
        self.apb2enr & (1 << bit) != 0
    }

    pub fn is_apb1_enabled(&self, bit: u32) -> bool {
        self.apb1enr & (1 << bit) != 0
    }
}

impl crate::Peripheral for Rcc {
    fn read(&self, offset: u64) -> SimResult<u32> {
        Ok(match offset {
            AHBENR => self.ahbenr,
            APB2ENR => self.apb2enr,
            APB1ENR => self.apb1enr,
            _ => 0,
        })
    }

    fn write(&mut self, offset: u64, value: u32) -> SimResult<()> {
        match offset {
            AHBENR => self.ahbenr = value,
            APB2ENR => self.apb2enr = value,
            APB1ENR => self.apb1enr = value,
            _ => {}
        }
        Ok(())
    }

    fn as_any(&self) -> Option<&dyn std::any::Any> {
        Some(self)
    }

    fn as_any_mut(&mut self) -> Option<&mut dyn std::any::Any> {
        Some(self)
    }

    fn snapshot(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or(serde_json::Value::Null)
    }
}

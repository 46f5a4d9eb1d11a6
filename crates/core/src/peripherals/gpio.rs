// LabWired - Firmware Simulation Platform
// Copyright (C) 2026 Andrii Shylenko
//
// This software is released under the MIT License.
// See the LICENSE file in the project root for full license information.

use crate::SimResult;

/// STM32F1 GPIO port.
#[derive(Debug, serde::Serialize)]
pub struct GpioPort {
    crl: u32,  // 0x00: configuration register low
    crh: u32,  // 0x04: configuration register high
    idr: u32,  // 0x08: input data register
    odr: u32,  // 0x0C: output data register
    lckr: u32, // 0x18: configuration lock register
}

impl Default for GpioPort {
    fn default() -> Self {
        Self::new()
    }
}

impl GpioPort {
    pub fn new() -> Self {
        Self {
            // Reset value: floating input
            crl: 0x4444_4444,
            crh: 0x4444_4444,
            idr: 0,
            odr: 0,
            lckr: 0,
        }
    }

    /// The 4-bit CNF/MODE field of `pin`.
    pub fn pin_config(&self, pin: u8) -> u8 {
        let pin = u32::from(pin & 0xF);
        let reg = if pin < 8 { self.crl } else { self.crh };
        ((reg >> ((pin % 8) * 4)) & 0xF) as u8
    }

    /// MODE bits non-zero means the pin drives its output latch.
    pub fn is_output(&self, pin: u8) -> bool {
        self.pin_config(pin) & 0b11 != 0
    }

    pub fn pin_output(&self, pin: u8) -> bool {
        self.odr & (1 << (pin & 0xF)) != 0
    }

    pub fn odr(&self) -> u32 {
        self.odr
    }

    /// Drive an external level onto an input pin.
    pub fn set_input(&mut self, pin: u8, high: bool) {
        let bit = 1 << (pin & 0xF);
        if high {
            self.idr |= bit;
        } else {
            self.idr &= !bit;
        }
    }

    fn idr_value(&self) -> u32 {
        // Output pins read back their driven level.
        let mut outputs = 0;
        for pin in 0..16 {
            if self.is_output(pin) {
                outputs |= 1 << pin;
            }
        }
        (self.idr & !outputs) | (self.odr & outputs)
    }
}

impl crate::Peripheral for GpioPort {
    fn read(&self, offset: u64) -> SimResult<u32> {
        Ok(match offset {
            0x00 => self.crl,
            0x04 => self.crh,
            0x08 => self.idr_value(),
            0x0C => self.odr,
            0x18 => self.lckr,
            _ => 0, // BSRR and BRR are write-only
        })
    }

    fn write(&mut self, offset: u64, value: u32) -> SimResult<()> {
        match offset {
            0x00 => self.crl = value,
            0x04 => self.crh = value,
            0x0C => self.odr = value & 0xFFFF,
            0x10 => {
                // BSRR: reset wins over set when both are written
                let set = value & 0xFFFF;
                let reset = (value >> 16) & 0xFFFF;
                self.odr |= set;
                self.odr &= !reset;
            }
            0x14 => {
                // BRR: Bit Reset Register
                self.odr &= !(value & 0xFFFF);
            }
            0x18 => self.lckr = value & 0x1_FFFF,
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

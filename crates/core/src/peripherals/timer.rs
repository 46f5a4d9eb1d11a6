// LabWired - Firmware Simulation Platform
// Copyright (C) 2026 Andrii Shylenko
//
// This software is released under the MIT License.
// See the LICENSE file in the project root for full license information.

use crate::{PeripheralTickResult, SimResult};

const CR1: u64 = 0x00;
const DIER: u64 = 0x0C;
const SR: u64 = 0x10;
const EGR: u64 = 0x14;
const CNT: u64 = 0x24;
const PSC: u64 = 0x28;
const ARR: u64 = 0x2C;

const CR1_CEN: u32 = 1 << 0;
const DIER_UIE: u32 = 1 << 0;
const SR_UIF: u32 = 1 << 0;
const EGR_UG: u32 = 1 << 0;

/// Basic STM32 General Purpose Timer (TIM2-TIM5 compatible), up-counting.
///
/// PSC is preloaded: a written divider only takes effect at the next update
/// event (overflow or EGR.UG), exactly as on silicon. ARR is modeled
/// without preload (ARPE = 0, the reset state).
#[derive(Debug, Default, serde::Serialize)]
pub struct Timer {
    cr1: u32,
    dier: u32,
    sr: u32,
    cnt: u32,
    psc: u32,
    arr: u32,

    // Internal state
    psc_active: u32,
    psc_cnt: u32,
    overflows: u64,
}

impl Timer {
    pub fn new() -> Self {
        Self {
            arr: 0xFFFF, // Default reset value
            ..Default::default()
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.cr1 & CR1_CEN != 0
    }

    pub fn update_pending(&self) -> bool {
        self.sr & SR_UIF != 0
    }

    pub fn counter(&self) -> u32 {
        self.cnt
    }

    /// Update events since reset.
    pub fn overflows(&self) -> u64 {
        self.overflows
    }

    /// Latch status flags the way hardware does (capture/compare, trigger),
    /// for benches that need more than UIF set.
    pub fn latch_status(&mut self, flags: u32) {
        self.sr |= flags & 0x1E5F;
    }

    /// Input cycles between two update events with the registers as they
    /// are now programmed.
    pub fn period_cycles(&self) -> u64 {
        (u64::from(self.psc) + 1) * (u64::from(self.arr) + 1)
    }

    fn update_event(&mut self) {
        self.cnt = 0;
        self.psc_cnt = 0;
        self.psc_active = self.psc;
        self.sr |= SR_UIF;
    }

    /// Count `cycles` input clocks; returns how many update events fired.
    fn advance(&mut self, mut cycles: u64) -> u64 {
        let mut events = 0;
        while cycles > 0 {
            let div = u64::from(self.psc_active) + 1;
            // A counter already past ARR overflows on its next increment.
            let counts_left = (u64::from(self.arr) + 1)
                .saturating_sub(u64::from(self.cnt))
                .max(1);
            let to_update = counts_left * div - u64::from(self.psc_cnt);

            if cycles < to_update {
                let ticks = u64::from(self.psc_cnt) + cycles;
                self.cnt += (ticks / div) as u32;
                self.psc_cnt = (ticks % div) as u32;
                break;
            }

            cycles -= to_update;
            self.update_event();
            events += 1;

            // Divider is stable from here on, skip whole periods at once.
            let full = self.period_cycles();
            let skipped = cycles / full;
            events += skipped;
            cycles -= skipped * full;
        }
        self.overflows += events;
        events
    }
}

impl crate::Peripheral for Timer {
    fn read(&self, offset: u64) -> SimResult<u32> {
        Ok(match offset {
            CR1 => self.cr1,
            DIER => self.dier,
            SR => self.sr,
            CNT => self.cnt,
            PSC => self.psc,
            ARR => self.arr,
            _ => 0, // EGR reads as zero
        })
    }

    fn write(&mut self, offset: u64, value: u32) -> SimResult<()> {
        match offset {
            CR1 => self.cr1 = value & 0x3FF,
            DIER => self.dier = value & 0x5F5F,
            // TIMx_SR is rc_w0: writing 0 clears, writing 1 keeps current.
            SR => self.sr &= value,
            EGR => {
                if value & EGR_UG != 0 {
                    self.update_event();
                }
            }
            CNT => self.cnt = value & 0xFFFF,
            PSC => self.psc = value & 0xFFFF,
            ARR => self.arr = value & 0xFFFF,
            _ => {}
        }
        Ok(())
    }

    fn tick(&mut self, cycles: u64) -> PeripheralTickResult {
        let events = if self.is_enabled() {
            self.advance(cycles)
        } else {
            0
        };

        PeripheralTickResult {
            // IRQ level stays high while UIF is latched and UIE is set.
            irq: self.update_pending() && self.dier & DIER_UIE != 0,
            events,
        }
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

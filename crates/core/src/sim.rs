// LabWired - Firmware Simulation Platform
// Copyright (C) 2026 Andrii Shylenko
//
// This software is released under the MIT License.
// See the LICENSE file in the project root for full license information.

//! Runs the blinker main loop against a [`SystemBus`] in simulated time.

use crate::bus::SystemBus;
use crate::peripherals::gpio::GpioPort;
use crate::peripherals::timer::Timer;
use crate::{SimResult, SimulationError};
use blinker::Blinker;
use labwired_config::{BoardIoBinding, DEFAULT_TIMER_CLOCK_HZ};
use serde::Serialize;
use std::collections::BTreeSet;

/// Which GPIO pin drives the LED and how.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LedProbe {
    pub id: String,
    pub peripheral: String,
    pub pin: u8,
    pub active_high: bool,
}

impl LedProbe {
    /// The Blue Pill LED: PC13, lit when the pin is low.
    pub fn bluepill() -> Self {
        Self {
            id: "led_pc13".to_string(),
            peripheral: "gpioc".to_string(),
            pin: blinker::map::LED_PIN as u8,
            active_high: false,
        }
    }

    fn sample(&self, bus: &SystemBus) -> SimResult<bool> {
        let gpio = bus
            .peripheral::<GpioPort>(&self.peripheral)
            .ok_or_else(|| SimulationError::UnknownPeripheral(self.peripheral.clone()))?;
        Ok(gpio.pin_output(self.pin) == self.active_high)
    }
}

impl From<&BoardIoBinding> for LedProbe {
    fn from(io: &BoardIoBinding) -> Self {
        Self {
            id: io.id.clone(),
            peripheral: io.peripheral.clone(),
            pin: io.pin,
            active_high: io.active_high,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct LedEdge {
    pub cycle: u64,
    pub time_ms: f64,
    pub lit: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct BlinkReport {
    pub status: String,
    pub led: String,
    pub timer_clock_hz: u32,
    pub simulated_cycles: u64,
    pub simulated_ms: f64,
    pub polls: u64,
    pub updates_consumed: u64,
    pub timer_overflows: u64,
    pub toggles: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub half_period_ms: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duty_cycle: Option<f64>,
    pub bus_faults: u64,
    /// Interrupt lines seen asserted during the run. The blinker polls with
    /// UIE clear, so this stays empty unless something else arms an IRQ.
    pub irq_lines: Vec<u32>,
    pub edges: Vec<LedEdge>,
}

/// The blinker bound to a simulated bus, advanced poll by poll.
///
/// Each [`step`](Self::step) runs one main-loop iteration and then lets the
/// peripherals count for the given number of timer input cycles. Real
/// firmware polls far more often than that; the UIF latch makes the
/// coarser polling observationally the same as long as a step is shorter
/// than one timer period.
pub struct BlinkSession {
    blinker: Blinker<SystemBus>,
    probe: LedProbe,
    timer_clock_hz: u32,
    cycle: u64,
    polls: u64,
    updates: u64,
    level: bool,
    edges: Vec<LedEdge>,
    irq_lines: BTreeSet<u32>,
}

impl BlinkSession {
    /// Bind the blinker to `bus` and run its initialization sequence.
    pub fn new(bus: SystemBus, probe: LedProbe, timer_clock_hz: u32) -> SimResult<Self> {
        let mut blinker = Blinker::new(bus);
        blinker.init();
        let level = probe.sample(blinker.regs())?;
        tracing::debug!(
            "Blinker initialized; {} starts {}",
            probe.id,
            if level { "lit" } else { "dark" }
        );

        Ok(Self {
            blinker,
            probe,
            timer_clock_hz: if timer_clock_hz == 0 {
                DEFAULT_TIMER_CLOCK_HZ
            } else {
                timer_clock_hz
            },
            cycle: 0,
            polls: 0,
            updates: 0,
            level,
            edges: Vec::new(),
            irq_lines: BTreeSet::new(),
        })
    }

    pub fn bus(&self) -> &SystemBus {
        self.blinker.regs()
    }

    pub fn bus_mut(&mut self) -> &mut SystemBus {
        self.blinker.regs_mut()
    }

    pub fn cycle(&self) -> u64 {
        self.cycle
    }

    pub fn edges(&self) -> &[LedEdge] {
        &self.edges
    }

    pub fn led_lit(&self) -> bool {
        self.level
    }

    fn cycles_to_ms(&self, cycles: u64) -> f64 {
        cycles as f64 * 1000.0 / f64::from(self.timer_clock_hz)
    }

    /// One main-loop pass followed by `cycles` of peripheral time.
    pub fn step(&mut self, cycles: u64) -> SimResult<()> {
        self.polls += 1;
        if self.blinker.poll() {
            self.updates += 1;
        }

        let level = self.probe.sample(self.blinker.regs())?;
        if level != self.level {
            let edge = LedEdge {
                cycle: self.cycle,
                time_ms: self.cycles_to_ms(self.cycle),
                lit: level,
            };
            tracing::debug!(
                "{} -> {} at {:.3} ms",
                self.probe.id,
                if level { "lit" } else { "dark" },
                edge.time_ms
            );
            self.edges.push(edge);
            self.level = level;
        }

        let irqs = self.blinker.regs_mut().tick_peripherals(cycles);
        for irq in irqs {
            if self.irq_lines.insert(irq) {
                tracing::debug!("IRQ {} asserted at cycle {}", irq, self.cycle + cycles);
            }
        }
        self.cycle += cycles;
        Ok(())
    }

    /// Step until at least `total_cycles` have elapsed.
    pub fn run_for(&mut self, total_cycles: u64, step_cycles: u64) -> SimResult<()> {
        let step_cycles = step_cycles.max(1);
        let end = self.cycle.saturating_add(total_cycles);
        while self.cycle < end {
            self.step(step_cycles.min(end - self.cycle))?;
        }
        Ok(())
    }

    pub fn run_for_ms(&mut self, ms: u64, step_cycles: u64) -> SimResult<()> {
        let cycles = ms * u64::from(self.timer_clock_hz) / 1000;
        self.run_for(cycles, step_cycles)
    }

    /// Mean time between consecutive edges.
    pub fn half_period_ms(&self) -> Option<f64> {
        if self.edges.len() < 2 {
            return None;
        }
        let first = self.edges.first()?.cycle;
        let last = self.edges.last()?.cycle;
        Some(self.cycles_to_ms(last - first) / (self.edges.len() - 1) as f64)
    }

    /// Fraction of time lit, over whole blink periods only.
    pub fn duty_cycle(&self) -> Option<f64> {
        if self.edges.len() < 3 {
            return None;
        }
        // An even number of intervals covers whole periods.
        let usable = if self.edges.len() % 2 == 0 {
            self.edges.len() - 1
        } else {
            self.edges.len()
        };
        let edges = &self.edges[..usable];

        let mut lit = 0;
        for pair in edges.windows(2) {
            if pair[0].lit {
                lit += pair[1].cycle - pair[0].cycle;
            }
        }
        let span = edges.last()?.cycle - edges.first()?.cycle;
        Some(lit as f64 / span as f64)
    }

    pub fn report(&self) -> BlinkReport {
        let timer_overflows = self
            .bus()
            .peripheral_at::<Timer>(u64::from(blinker::map::TIM2_BASE))
            .map(|t| t.overflows())
            .unwrap_or(0);

        BlinkReport {
            status: if self.edges.is_empty() {
                "idle".to_string()
            } else {
                "blinking".to_string()
            },
            led: self.probe.id.clone(),
            timer_clock_hz: self.timer_clock_hz,
            simulated_cycles: self.cycle,
            simulated_ms: self.cycles_to_ms(self.cycle),
            polls: self.polls,
            updates_consumed: self.updates,
            timer_overflows,
            toggles: self.edges.len(),
            half_period_ms: self.half_period_ms(),
            duty_cycle: self.duty_cycle(),
            bus_faults: self.bus().fault_count(),
            irq_lines: self.irq_lines.iter().copied().collect(),
            edges: self.edges.clone(),
        }
    }
}

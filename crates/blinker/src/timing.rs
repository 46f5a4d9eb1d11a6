// LabWired - Firmware Simulation Platform
// Copyright (C) 2026 Andrii Shylenko
//
// This software is released under the MIT License.
// See the LICENSE file in the project root for full license information.

//! Timer clock assumptions and the derived blink rate.
//!
//! TIM2 sits on APB1. Out of reset the STM32F103 runs from HSI with no
//! PLL, so the timer input clock is 8 MHz. Nothing in the firmware changes
//! the clock tree; if that ever changes, [`TIMER_CLOCK_HZ`] must follow and
//! the checks below will reject a prescaler/reload pair that no longer
//! gives a one second overflow.

/// Timer input clock.
pub const TIMER_CLOCK_HZ: u32 = 8_000_000;

/// Divisor minus one: 8 MHz / 8000 = 1 kHz count rate.
pub const PRESCALER: u32 = 7999;

/// Reload value: 1000 counts per overflow.
pub const AUTO_RELOAD: u32 = 999;

/// Counter increments per second.
pub const COUNT_HZ: u32 = TIMER_CLOCK_HZ / (PRESCALER + 1);

/// Timer input cycles between two update events.
pub const OVERFLOW_PERIOD_CYCLES: u64 = (PRESCALER as u64 + 1) * (AUTO_RELOAD as u64 + 1);

pub const OVERFLOW_PERIOD_MS: u64 = OVERFLOW_PERIOD_CYCLES * 1000 / TIMER_CLOCK_HZ as u64;

/// The pin flips once per overflow, so a full blink spans two periods.
pub const BLINK_PERIOD_MS: u64 = 2 * OVERFLOW_PERIOD_MS;

const _: () = assert!(PRESCALER <= 0xFFFF && AUTO_RELOAD <= 0xFFFF);
const _: () = assert!(TIMER_CLOCK_HZ % (PRESCALER + 1) == 0);
const _: () = assert!(OVERFLOW_PERIOD_MS == 1000);

/// Overflow period in microseconds for an arbitrary clock, for host tooling
/// that simulates a different timer clock.
pub const fn overflow_period_us(clock_hz: u32, prescaler: u32, reload: u32) -> u64 {
    if clock_hz == 0 {
        return 0;
    }
    (prescaler as u64 + 1) * (reload as u64 + 1) * 1_000_000 / clock_hz as u64
}

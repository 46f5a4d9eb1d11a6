// LabWired - Firmware Simulation Platform
// Copyright (C) 2026 Andrii Shylenko
//
// This software is released under the MIT License.
// See the LICENSE file in the project root for full license information.

#![no_std]
#![no_main]

use blinker::Mmio;
use cortex_m_rt::entry;
use panic_halt as _;

#[entry]
fn main() -> ! {
    // SAFETY: single-threaded bare-metal entry; the blinker is the only
    // code touching RCC, GPIOC and TIM2.
    let regs = unsafe { Mmio::new() };
    blinker::run_blinker(regs)
}

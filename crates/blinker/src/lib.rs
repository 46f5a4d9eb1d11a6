// LabWired - Firmware Simulation Platform
// Copyright (C) 2026 Andrii Shylenko
//
// This software is released under the MIT License.
// See the LICENSE file in the project root for full license information.

//! Blinks PC13 on an STM32F103 once per TIM2 overflow.
//!
//! The timer counts at 1 kHz and overflows every 1000 counts. The main loop
//! polls the update flag and flips the pin in hardware, so the LED toggles at
//! 1 Hz with a 50% duty cycle. Register traffic goes through
//! [`RegisterAccess`] so the same sequence runs on silicon via [`Mmio`] and on
//! the host against a simulated bus.

#![cfg_attr(not(test), no_std)]

pub mod map;
pub mod regs;
pub mod timing;

pub use regs::{Mmio, RegisterAccess};

use map::*;

pub struct Blinker<R: RegisterAccess> {
    regs: R,
}

impl<R: RegisterAccess> Blinker<R> {
    pub fn new(regs: R) -> Self {
        Self { regs }
    }

    /// Clock gates, pin mode, timer period, then start counting.
    pub fn init(&mut self) {
        // Enable GPIOC and TIM2 clocks
        self.regs.set_bits(RCC_APB2ENR, RCC_APB2ENR_IOPCEN);
        self.regs.set_bits(RCC_APB1ENR, RCC_APB1ENR_TIM2EN);

        // Configure PC13 as general purpose push-pull output, 2 MHz
        self.regs.clear_bits(GPIOC_CRH, GPIO_CRH_PC13_MASK);
        self.regs
            .set_bits(GPIOC_CRH, GPIO_MODE_OUTPUT_PP_2MHZ << GPIO_CRH_PC13_SHIFT);

        self.regs.write(TIM2_PSC, timing::PRESCALER);
        self.regs.write(TIM2_ARR, timing::AUTO_RELOAD);

        self.regs.set_bits(TIM2_CR1, TIM_CR1_CEN);
    }

    /// One pass of the main loop. Returns `true` if an update event was
    /// consumed and the pin flipped.
    pub fn poll(&mut self) -> bool {
        if self.regs.read(TIM2_SR) & TIM_SR_UIF == 0 {
            return false;
        }

        self.regs.toggle_bits(GPIOC_ODR, GPIO_ODR_ODR13);
        // rc_w0: keep every other latched flag as read
        self.regs.clear_bits(TIM2_SR, TIM_SR_UIF);
        true
    }

    pub fn run(mut self) -> ! {
        self.init();
        loop {
            self.poll();
        }
    }

    pub fn regs(&self) -> &R {
        &self.regs
    }

    pub fn regs_mut(&mut self) -> &mut R {
        &mut self.regs
    }

    pub fn into_inner(self) -> R {
        self.regs
    }
}

/// Firmware entry helper: bring up the hardware and blink forever.
pub fn run_blinker<R: RegisterAccess>(regs: R) -> ! {
    Blinker::new(regs).run()
}

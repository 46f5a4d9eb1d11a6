// LabWired - Firmware Simulation Platform
// Copyright (C) 2026 Andrii Shylenko
//
// This software is released under the MIT License.
// See the LICENSE file in the project root for full license information.

//! STM32F103 register addresses and bit definitions used by the blinker.

// Peripheral Base Addresses
pub const RCC_BASE: u32 = 0x4002_1000;
pub const GPIOC_BASE: u32 = 0x4001_1000;
pub const TIM2_BASE: u32 = 0x4000_0000;

// RCC Registers
pub const RCC_APB2ENR: u32 = RCC_BASE + 0x18;
pub const RCC_APB1ENR: u32 = RCC_BASE + 0x1C;

// GPIO Registers
pub const GPIOC_CRH: u32 = GPIOC_BASE + 0x04;
pub const GPIOC_ODR: u32 = GPIOC_BASE + 0x0C;

// TIM2 Registers
pub const TIM2_CR1: u32 = TIM2_BASE + 0x00;
pub const TIM2_SR: u32 = TIM2_BASE + 0x10;
pub const TIM2_PSC: u32 = TIM2_BASE + 0x28;
pub const TIM2_ARR: u32 = TIM2_BASE + 0x2C;

// Bit definitions
pub const RCC_APB2ENR_IOPCEN: u32 = 1 << 4;
pub const RCC_APB1ENR_TIM2EN: u32 = 1 << 0;
pub const TIM_CR1_CEN: u32 = 1 << 0;
pub const TIM_SR_UIF: u32 = 1 << 0;

/// LED pin on port C (Blue Pill on-board LED).
pub const LED_PIN: u32 = 13;
pub const GPIO_ODR_ODR13: u32 = 1 << LED_PIN;

// CRH holds PC8..PC15, four bits per pin.
pub const GPIO_CRH_PC13_SHIFT: u32 = (LED_PIN - 8) * 4;
pub const GPIO_CRH_PC13_MASK: u32 = 0xF << GPIO_CRH_PC13_SHIFT;

/// MODE = 0b10 (output, 2 MHz), CNF = 0b00 (general purpose push-pull).
pub const GPIO_MODE_OUTPUT_PP_2MHZ: u32 = 0b0010;

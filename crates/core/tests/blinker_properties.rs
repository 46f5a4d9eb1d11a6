// LabWired - Firmware Simulation Platform
// Copyright (C) 2026 Andrii Shylenko
//
// This software is released under the MIT License.
// See the LICENSE file in the project root for full license information.

use blinker::map::*;
use blinker::Blinker;
use labwired_core::bus::{AccessRecorder, SystemBus};
use labwired_core::peripherals::gpio::GpioPort;
use labwired_core::peripherals::timer::Timer;
use labwired_core::{AccessKind, BusAccess};
use std::sync::Arc;

fn word(bus: &SystemBus, addr: u32) -> u32 {
    bus.read_u32(u64::from(addr)).unwrap()
}

/// Blinker over a fresh bus with a recorder attached after `init`.
fn initialized(prepare: impl FnOnce(&mut SystemBus)) -> (Blinker<SystemBus>, Arc<AccessRecorder>) {
    let mut bus = SystemBus::new();
    prepare(&mut bus);
    let mut blinker = Blinker::new(bus);
    blinker.init();

    let recorder = Arc::new(AccessRecorder::new());
    blinker.regs_mut().add_observer(recorder.clone());
    (blinker, recorder)
}

fn raise_update(bus: &mut SystemBus) {
    bus.write_u32(0x4000_0014, 1).unwrap(); // TIM2 EGR.UG
}

#[test]
fn test_clock_gates_enabled_without_disturbing_other_bits() {
    let (blinker, _) = initialized(|bus| {
        bus.write_u32(u64::from(RCC_APB2ENR), 0x0000_0005).unwrap(); // AFIO + IOPA
        bus.write_u32(u64::from(RCC_APB1ENR), 0x0002_0000).unwrap(); // USART2
    });
    let bus = blinker.regs();
    assert_eq!(word(bus, RCC_APB2ENR), 0x0000_0015);
    assert_eq!(word(bus, RCC_APB1ENR), 0x0002_0001);
}

#[test]
fn test_pc13_configured_push_pull_others_untouched() {
    let (blinker, _) = initialized(|_| {});
    let bus = blinker.regs();
    let gpioc = bus.peripheral::<GpioPort>("gpioc").unwrap();
    assert_eq!(gpioc.pin_config(13), 0b0010);
    assert!(gpioc.is_output(13));
    assert_eq!(word(bus, GPIOC_CRH), 0x4424_4444);
    // Port A/B and the low half of port C stay at reset.
    assert_eq!(bus.read_u32(0x4001_1000).unwrap(), 0x4444_4444);
    assert_eq!(bus.read_u32(0x4001_0804).unwrap(), 0x4444_4444);
}

#[test]
fn test_timer_period_regardless_of_prior_contents() {
    for prior in [0u32, 0xFFFF, 0x1234] {
        let (blinker, _) = initialized(|bus| {
            bus.write_u32(u64::from(TIM2_PSC), prior).unwrap();
            bus.write_u32(u64::from(TIM2_ARR), prior).unwrap();
        });
        let bus = blinker.regs();
        assert_eq!(word(bus, TIM2_PSC), 7999);
        assert_eq!(word(bus, TIM2_ARR), 999);
        assert_eq!(word(bus, TIM2_CR1) & TIM_CR1_CEN, TIM_CR1_CEN);
    }
}

#[test]
fn test_idle_poll_only_reads_status() {
    let (mut blinker, recorder) = initialized(|_| {});
    let odr_before = word(blinker.regs(), GPIOC_ODR);

    assert!(!blinker.poll());

    assert_eq!(
        recorder.take(),
        vec![BusAccess {
            kind: AccessKind::Read,
            addr: u64::from(TIM2_SR),
            value: 0
        }]
    );
    assert_eq!(word(blinker.regs(), GPIOC_ODR), odr_before);
}

#[test]
fn test_update_toggles_pc13_both_ways() {
    let (mut blinker, recorder) = initialized(|bus| {
        bus.write_u32(u64::from(GPIOC_ODR), 0x0000_0101).unwrap();
    });

    raise_update(blinker.regs_mut());
    assert!(blinker.poll());
    assert_eq!(word(blinker.regs(), GPIOC_ODR), 0x0000_2101);

    raise_update(blinker.regs_mut());
    assert!(blinker.poll());
    assert_eq!(word(blinker.regs(), GPIOC_ODR), 0x0000_0101);

    // Each event: SR read, ODR read+write, SR read+write.
    assert_eq!(recorder.writes_to(u64::from(GPIOC_ODR)), vec![0x2101, 0x0101]);
    assert_eq!(recorder.writes_to(u64::from(TIM2_SR)), vec![0, 0]);
    assert_eq!(recorder.accesses().len(), 10);
}

#[test]
fn test_update_clears_only_uif() {
    let (mut blinker, recorder) = initialized(|_| {});
    {
        let tim2 = blinker.regs_mut().peripheral_mut::<Timer>("tim2").unwrap();
        tim2.latch_status(0x0000_0006); // CC1IF | CC2IF
    }
    raise_update(blinker.regs_mut());
    assert_eq!(word(blinker.regs(), TIM2_SR), 0x0000_0007);

    assert!(blinker.poll());

    assert_eq!(word(blinker.regs(), TIM2_SR), 0x0000_0006);
    assert_eq!(recorder.writes_to(u64::from(TIM2_SR)), vec![0x0000_0006]);
}

#[test]
fn test_even_number_of_updates_restores_pin() {
    let (mut blinker, _) = initialized(|_| {});
    let start = blinker.regs().peripheral::<GpioPort>("gpioc").unwrap().pin_output(13);

    for round in 1..=6 {
        raise_update(blinker.regs_mut());
        assert!(blinker.poll());
        let level = blinker.regs().peripheral::<GpioPort>("gpioc").unwrap().pin_output(13);
        assert_eq!(level, if round % 2 == 0 { start } else { !start });
    }
}

#[test]
fn test_config_built_bus_runs_blinker() {
    let root = std::path::PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("../../configs/chips/stm32f103.yaml");
    let chip = labwired_config::ChipDescriptor::from_file(root).unwrap();
    let bus = SystemBus::from_config(&chip).unwrap();

    let mut blinker = Blinker::new(bus);
    blinker.init();
    raise_update(blinker.regs_mut());
    assert!(blinker.poll());

    let bus = blinker.into_inner();
    assert_eq!(word(&bus, GPIOC_ODR), GPIO_ODR_ODR13);
    assert_eq!(bus.fault_count(), 0);
}

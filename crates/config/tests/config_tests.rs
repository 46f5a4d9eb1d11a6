// LabWired - Firmware Simulation Platform
// Copyright (C) 2026 Andrii Shylenko
//
// This software is released under the MIT License.
// See the LICENSE file in the project root for full license information.

use labwired_config::{
    Arch, BoardIoKind, ChipDescriptor, ConfigError, SystemManifest, DEFAULT_TIMER_CLOCK_HZ,
};
use std::path::PathBuf;

fn workspace_root() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .parent()
        .unwrap()
        .parent()
        .unwrap()
        .to_path_buf()
}

#[test]
fn test_minimal_chip_parses() {
    let yaml = r#"
name: "test-chip"
arch: "cortex-m3"
flash:
  base: 0x08000000
  size: "64KB"
ram:
  base: 0x20000000
  size: "20KB"
peripherals:
  - id: "tim2"
    type: "timer"
    base_address: 0x40000000
"#;
    let desc = ChipDescriptor::from_yaml(yaml).unwrap();
    assert_eq!(desc.schema_version, "1.0");
    assert_eq!(desc.arch, Arch::Arm);
    assert_eq!(desc.peripherals.len(), 1);
    assert_eq!(desc.peripherals[0].size, None);
    assert_eq!(desc.peripherals[0].irq, None);
    assert_eq!(
        ChipDescriptor::peripheral_size(&desc.peripherals[0]).unwrap(),
        0x1000
    );
}

#[test]
fn test_duplicate_peripheral_rejected() {
    let yaml = r#"
name: "dup"
arch: "arm"
flash: { base: 0x0, size: "1KB" }
ram: { base: 0x20000000, size: "1KB" }
peripherals:
  - { id: "gpioc", type: "gpio", base_address: 0x40011000, size: "1KB" }
  - { id: "gpioc", type: "gpio", base_address: 0x40012000, size: "1KB" }
"#;
    let err = ChipDescriptor::from_yaml(yaml).unwrap_err();
    assert_eq!(
        err.downcast_ref::<ConfigError>(),
        Some(&ConfigError::DuplicatePeripheral("gpioc".to_string()))
    );
}

#[test]
fn test_overlapping_windows_rejected() {
    let yaml = r#"
name: "overlap"
arch: "arm"
flash: { base: 0x0, size: "1KB" }
ram: { base: 0x20000000, size: "1KB" }
peripherals:
  - { id: "tim2", type: "timer", base_address: 0x40000000 }
  - { id: "tim3", type: "timer", base_address: 0x40000400 }
"#;
    let err = ChipDescriptor::from_yaml(yaml).unwrap_err();
    assert!(matches!(
        err.downcast_ref::<ConfigError>(),
        Some(ConfigError::OverlappingPeripheral { id, .. }) if id == "tim3"
    ));
}

#[test]
fn test_shipped_system_manifest_loads() {
    let (manifest, chip) = SystemManifest::load_with_chip(workspace_root().join("system.yaml")).unwrap();
    assert_eq!(manifest.clock.timer_clock_hz, DEFAULT_TIMER_CLOCK_HZ);
    assert_eq!(chip.name, "stm32f103c8");

    let leds: Vec<_> = manifest.leds().collect();
    assert_eq!(leds.len(), 1);
    assert_eq!(leds[0].kind, BoardIoKind::Led);
    assert_eq!(leds[0].peripheral, "gpioc");
    assert_eq!(leds[0].pin, 13);
    assert!(!leds[0].active_high);

    let gpioc = chip.peripheral("gpioc").unwrap();
    assert_eq!(gpioc.base_address, 0x4001_1000);
    assert_eq!(chip.peripheral("rcc").unwrap().base_address, 0x4002_1000);
    assert_eq!(chip.peripheral("tim2").unwrap().irq, Some(28));
}

#[test]
fn test_board_io_must_target_gpio() {
    let chip = ChipDescriptor::from_file(workspace_root().join("configs/chips/stm32f103.yaml")).unwrap();
    let manifest: SystemManifest = serde_yaml::from_str(
        r#"
name: "bad-led"
chip: "configs/chips/stm32f103.yaml"
board_io:
  - { id: "led", kind: "led", peripheral: "tim2", pin: 1 }
"#,
    )
    .unwrap();
    assert_eq!(
        manifest.validate_against(&chip),
        Err(ConfigError::UnknownPeripheral {
            id: "led".to_string(),
            peripheral: "tim2".to_string()
        })
    );

    let manifest: SystemManifest = serde_yaml::from_str(
        r#"
name: "bad-pin"
chip: "configs/chips/stm32f103.yaml"
board_io:
  - { id: "led", kind: "led", peripheral: "gpioc", pin: 16 }
"#,
    )
    .unwrap();
    assert_eq!(
        manifest.validate_against(&chip),
        Err(ConfigError::InvalidPin {
            id: "led".to_string(),
            pin: 16
        })
    );
}

#[test]
fn test_clock_defaults_when_omitted() {
    let manifest: SystemManifest = serde_yaml::from_str(
        r#"
name: "no-clock"
chip: "chip.yaml"
"#,
    )
    .unwrap();
    assert_eq!(manifest.clock.timer_clock_hz, 8_000_000);
    assert!(manifest.board_io.is_empty());
}

#[test]
fn test_window_past_address_space_rejected() {
    let yaml = r#"
name: "top"
arch: "arm"
flash: { base: 0x0, size: "1KiB" }
ram: { base: 0x20000000, size: "1KiB" }
peripherals:
  - { id: "top", type: "gpio", base_address: 0xFFFFFFFFFFFFFF00, size: "1KiB" }
"#;
    let err = ChipDescriptor::from_yaml(yaml).unwrap_err();
    assert_eq!(
        err.downcast_ref::<ConfigError>(),
        Some(&ConfigError::WindowOutOfRange {
            id: "top".to_string(),
            base: 0xFFFF_FFFF_FFFF_FF00
        })
    );
}

#[test]
fn test_shipped_chip_windows_are_one_kib() {
    let chip = ChipDescriptor::from_file(workspace_root().join("configs/chips/stm32f103.yaml")).unwrap();
    for p in &chip.peripherals {
        assert_eq!(ChipDescriptor::peripheral_size(p).unwrap(), 0x400, "{}", p.id);
    }
}

#[test]
fn test_only_led_bindings_are_accepted() {
    let parsed: Result<SystemManifest, _> = serde_yaml::from_str(
        r#"
name: "with-button"
chip: "configs/chips/stm32f103.yaml"
board_io:
  - { id: "user", kind: "button", peripheral: "gpioa", pin: 0 }
"#,
    );
    assert!(parsed.is_err());
}

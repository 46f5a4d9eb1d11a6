// LabWired - Firmware Simulation Platform
// Copyright (C) 2026 Andrii Shylenko
//
// This software is released under the MIT License.
// See the LICENSE file in the project root for full license information.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};

/// Default schema version for YAML configs
fn default_schema_version() -> String {
    "1.0".to_string()
}

/// HSI with no PLL, which is what an STM32F1 runs from out of reset.
pub const DEFAULT_TIMER_CLOCK_HZ: u32 = 8_000_000;

fn default_timer_clock_hz() -> u32 {
    DEFAULT_TIMER_CLOCK_HZ
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Arch {
    #[serde(alias = "cortex-m3", alias = "cortex-m4", alias = "cortex-m7")]
    Arm,
    Unknown,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct MemoryRange {
    pub base: u64,
    pub size: String, // e.g. "64KiB"
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct PeripheralConfig {
    pub id: String,
    pub r#type: String, // "rcc", "gpio", "timer"
    pub base_address: u64,
    #[serde(default)]
    pub size: Option<String>,
    #[serde(default)]
    pub irq: Option<u32>,
    #[serde(default)]
    pub config: HashMap<String, serde_yaml::Value>,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct ChipDescriptor {
    #[serde(default = "default_schema_version")]
    pub schema_version: String,
    pub name: String,
    pub arch: Arch,
    pub flash: MemoryRange,
    pub ram: MemoryRange,
    pub peripherals: Vec<PeripheralConfig>,
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum BoardIoKind {
    Led,
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct BoardIoBinding {
    pub id: String,
    pub kind: BoardIoKind,
    pub peripheral: String,
    pub pin: u8,
    #[serde(default = "default_true")]
    pub active_high: bool,
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
pub struct ClockConfig {
    /// Input clock of the general purpose timers.
    #[serde(default = "default_timer_clock_hz")]
    pub timer_clock_hz: u32,
}

impl Default for ClockConfig {
    fn default() -> Self {
        Self {
            timer_clock_hz: DEFAULT_TIMER_CLOCK_HZ,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct SystemManifest {
    #[serde(default = "default_schema_version")]
    pub schema_version: String,
    pub name: String,
    pub chip: String, // Path to the chip descriptor, relative to the manifest
    #[serde(default)]
    pub clock: ClockConfig,
    #[serde(default)]
    pub board_io: Vec<BoardIoBinding>,
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("duplicate peripheral id '{0}'")]
    DuplicatePeripheral(String),
    #[error("peripheral '{id}' at {base:#x} overlaps '{other}'")]
    OverlappingPeripheral { id: String, other: String, base: u64 },
    #[error("board io '{id}' references unknown peripheral '{peripheral}'")]
    UnknownPeripheral { id: String, peripheral: String },
    #[error("board io '{id}' uses pin {pin}; GPIO ports have 16 pins")]
    InvalidPin { id: String, pin: u8 },
    #[error("timer clock must be non-zero")]
    ZeroTimerClock,
    #[error("peripheral '{id}' at {base:#x} runs past the end of the address space")]
    WindowOutOfRange { id: String, base: u64 },
}

impl ChipDescriptor {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read chip descriptor {:?}", path))?;
        Self::from_yaml(&content)
            .with_context(|| format!("Failed to parse Chip Descriptor YAML {:?}", path))
    }

    pub fn from_yaml(yaml: &str) -> Result<Self> {
        let chip: Self = serde_yaml::from_str(yaml)?;
        chip.validate()?;
        Ok(chip)
    }

    pub fn peripheral(&self, id: &str) -> Option<&PeripheralConfig> {
        self.peripherals.iter().find(|p| p.id == id)
    }

    /// Window size of a peripheral, 4KB when the descriptor leaves it out.
    pub fn peripheral_size(p: &PeripheralConfig) -> Result<u64> {
        match &p.size {
            Some(size) => parse_size(size),
            None => Ok(0x1000),
        }
    }

    pub fn validate(&self) -> Result<()> {
        let mut seen = HashSet::new();
        for p in &self.peripherals {
            if !seen.insert(p.id.as_str()) {
                return Err(ConfigError::DuplicatePeripheral(p.id.clone()).into());
            }
        }

        let mut windows = Vec::with_capacity(self.peripherals.len());
        for p in &self.peripherals {
            let size = Self::peripheral_size(p)?;
            let end = p.base_address.checked_add(size).ok_or_else(|| {
                ConfigError::WindowOutOfRange {
                    id: p.id.clone(),
                    base: p.base_address,
                }
            })?;
            windows.push((p, p.base_address, end));
        }
        for (i, (p, start, end)) in windows.iter().enumerate() {
            for (other, o_start, o_end) in &windows[i + 1..] {
                if start < o_end && o_start < end {
                    return Err(ConfigError::OverlappingPeripheral {
                        id: other.id.clone(),
                        other: p.id.clone(),
                        base: *o_start,
                    }
                    .into());
                }
            }
        }
        Ok(())
    }
}

impl SystemManifest {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let f = std::fs::File::open(path)
            .with_context(|| format!("Failed to open system manifest {:?}", path))?;
        let manifest: Self =
            serde_yaml::from_reader(f).context("Failed to parse System Manifest")?;
        if manifest.clock.timer_clock_hz == 0 {
            return Err(ConfigError::ZeroTimerClock.into());
        }
        Ok(manifest)
    }

    /// Chip path as written, or joined onto the manifest's directory when
    /// relative.
    pub fn resolve_chip_path<P: AsRef<Path>>(&self, manifest_path: P) -> PathBuf {
        let chip = Path::new(&self.chip);
        if chip.is_absolute() {
            return chip.to_path_buf();
        }
        manifest_path
            .as_ref()
            .parent()
            .map(|dir| dir.join(chip))
            .unwrap_or_else(|| chip.to_path_buf())
    }

    /// Load the manifest and the chip descriptor it points at.
    pub fn load_with_chip<P: AsRef<Path>>(path: P) -> Result<(Self, ChipDescriptor)> {
        let path = path.as_ref();
        let manifest = Self::from_file(path)?;
        let chip_path = manifest.resolve_chip_path(path);
        let chip = ChipDescriptor::from_file(&chip_path)?;
        manifest.validate_against(&chip)?;
        Ok((manifest, chip))
    }

    pub fn validate_against(&self, chip: &ChipDescriptor) -> Result<(), ConfigError> {
        for io in &self.board_io {
            let is_gpio = chip
                .peripheral(&io.peripheral)
                .is_some_and(|p| p.r#type == "gpio");
            if !is_gpio {
                return Err(ConfigError::UnknownPeripheral {
                    id: io.id.clone(),
                    peripheral: io.peripheral.clone(),
                });
            }
            if io.pin > 15 {
                return Err(ConfigError::InvalidPin {
                    id: io.id.clone(),
                    pin: io.pin,
                });
            }
        }
        Ok(())
    }

    pub fn leds(&self) -> impl Iterator<Item = &BoardIoBinding> {
        self.board_io
            .iter()
            .filter(|io| io.kind == BoardIoKind::Led)
    }
}

pub fn parse_size(size_str: &str) -> Result<u64> {
    use human_size::{Byte, Size, SpecificSize};
    let s: Size = size_str
        .parse()
        .map_err(|e| anyhow::anyhow!("Invalid size format '{}': {}", size_str, e))?;
    let bytes: SpecificSize<Byte> = s.into();
    Ok(bytes.value() as u64)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_size() {
        assert_eq!(parse_size("1KiB").unwrap(), 0x400);
        assert_eq!(parse_size("20KiB").unwrap(), 20 * 1024);
        // Decimal units stay decimal.
        assert_eq!(parse_size("1KB").unwrap(), 1000);
        assert!(parse_size("lots").is_err());
    }

    #[test]
    fn test_resolve_relative_chip_path() {
        let manifest = SystemManifest {
            schema_version: "1.0".to_string(),
            name: "bluepill".to_string(),
            chip: "configs/chips/stm32f103.yaml".to_string(),
            clock: ClockConfig::default(),
            board_io: vec![],
        };
        let resolved = manifest.resolve_chip_path("/work/system.yaml");
        assert_eq!(
            resolved,
            PathBuf::from("/work/configs/chips/stm32f103.yaml")
        );
    }
}

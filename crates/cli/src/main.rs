// LabWired - Firmware Simulation Platform
// Copyright (C) 2026 Andrii Shylenko
//
// This software is released under the MIT License.
// See the LICENSE file in the project root for full license information.

use anyhow::{bail, Context, Result};
use clap::Parser;
use labwired_config::{SystemManifest, DEFAULT_TIMER_CLOCK_HZ};
use labwired_core::bus::SystemBus;
use labwired_core::sim::{BlinkReport, BlinkSession, LedProbe};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing::{error, info, warn};

const EXIT_PASS: u8 = 0;
const EXIT_CONFIG_ERROR: u8 = 2;
const EXIT_RUNTIME_ERROR: u8 = 3;

#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about = "Run the PC13 timer blinker against the LabWired register simulator",
    long_about = None
)]
struct Cli {
    /// Path to the system manifest (YAML). Defaults to the built-in STM32F103 map.
    #[arg(short, long)]
    system: Option<PathBuf>,

    /// Simulated time to run, in seconds
    #[arg(long, default_value = "5")]
    seconds: f64,

    /// Timer input cycles between two polls of the main loop
    #[arg(long, default_value = "1000")]
    step_cycles: u64,

    /// Board IO id of the LED to watch (default: first LED in the manifest)
    #[arg(long)]
    led: Option<String>,

    /// Print the run report as a single JSON line
    #[arg(long)]
    json: bool,

    /// Write a JSON snapshot of the peripherals after the run
    #[arg(long)]
    snapshot: Option<PathBuf>,

    /// Enable debug-level tracing (register traffic, LED edges)
    #[arg(short, long)]
    trace: bool,
}

struct Setup {
    bus: SystemBus,
    probe: LedProbe,
    timer_clock_hz: u32,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let level = if cli.trace {
        tracing::Level::DEBUG
    } else {
        tracing::Level::INFO
    };
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .init();

    let setup = match build_setup(&cli) {
        Ok(setup) => setup,
        Err(e) => {
            error!("{:#}", e);
            return ExitCode::from(EXIT_CONFIG_ERROR);
        }
    };

    match run(&cli, setup) {
        Ok(report) if report.toggles > 0 => ExitCode::from(EXIT_PASS),
        Ok(_) => {
            error!("LED never toggled in {} s of simulated time", cli.seconds);
            ExitCode::from(EXIT_RUNTIME_ERROR)
        }
        Err(e) => {
            error!("{:#}", e);
            ExitCode::from(EXIT_RUNTIME_ERROR)
        }
    }
}

fn build_setup(cli: &Cli) -> Result<Setup> {
    if !cli.seconds.is_finite() || cli.seconds < 0.0 {
        bail!("--seconds must be a non-negative number, got {}", cli.seconds);
    }
    if cli.step_cycles == 0 {
        bail!("--step-cycles must be at least 1");
    }

    let Some(system_path) = &cli.system else {
        info!("No system manifest given; using built-in STM32F103 map");
        if let Some(led) = &cli.led {
            let default = LedProbe::bluepill();
            if *led != default.id {
                bail!("Unknown LED '{}'; the built-in map only has '{}'", led, default.id);
            }
        }
        return Ok(Setup {
            bus: SystemBus::new(),
            probe: LedProbe::bluepill(),
            timer_clock_hz: DEFAULT_TIMER_CLOCK_HZ,
        });
    };

    let (manifest, chip) = SystemManifest::load_with_chip(system_path)
        .with_context(|| format!("Failed to load system {:?}", system_path))?;
    info!("System '{}' on chip '{}'", manifest.name, chip.name);

    let binding = match &cli.led {
        Some(id) => manifest
            .leds()
            .find(|io| io.id == *id)
            .with_context(|| format!("No LED named '{}' in {:?}", id, system_path))?,
        None => manifest
            .leds()
            .next()
            .with_context(|| format!("No LED in board_io of {:?}", system_path))?,
    };

    if manifest.clock.timer_clock_hz != blinker::timing::TIMER_CLOCK_HZ {
        warn!(
            "Timer clock is {} Hz but the firmware assumes {} Hz; expect a {:.3} s half period",
            manifest.clock.timer_clock_hz,
            blinker::timing::TIMER_CLOCK_HZ,
            blinker::timing::overflow_period_us(
                manifest.clock.timer_clock_hz,
                blinker::timing::PRESCALER,
                blinker::timing::AUTO_RELOAD
            ) as f64
                / 1e6
        );
    }

    Ok(Setup {
        bus: SystemBus::from_config(&chip)?,
        probe: LedProbe::from(binding),
        timer_clock_hz: manifest.clock.timer_clock_hz,
    })
}

fn run(cli: &Cli, setup: Setup) -> Result<BlinkReport> {
    let total_cycles = (cli.seconds * f64::from(setup.timer_clock_hz)).round() as u64;
    info!(
        "Simulating {} s ({} timer cycles, poll every {} cycles), watching {}",
        cli.seconds, total_cycles, cli.step_cycles, setup.probe.id
    );

    let mut session = BlinkSession::new(setup.bus, setup.probe, setup.timer_clock_hz)?;
    session.run_for(total_cycles, cli.step_cycles)?;
    let report = session.report();

    if let Some(path) = &cli.snapshot {
        write_snapshot(&session, path)?;
    }

    if cli.json {
        println!("{}", serde_json::to_string(&report)?);
    } else {
        print_summary(&report);
    }

    info!(
        "Run finished: {} toggles, {} polls, {} bus faults",
        report.toggles, report.polls, report.bus_faults
    );
    Ok(report)
}

fn write_snapshot(session: &BlinkSession, path: &Path) -> Result<()> {
    let bus = session.bus();
    let peripherals: serde_json::Map<String, serde_json::Value> = bus
        .peripherals
        .iter()
        .filter_map(|p| bus.peek_peripheral(&p.name).map(|v| (p.name.clone(), v)))
        .collect();
    let snapshot = serde_json::json!({
        "cycle": session.cycle(),
        "peripherals": peripherals,
    });
    let f = std::fs::File::create(path)
        .with_context(|| format!("Failed to create snapshot {:?}", path))?;
    serde_json::to_writer_pretty(f, &snapshot)?;
    info!("Snapshot written to {:?}", path);
    Ok(())
}

fn print_summary(report: &BlinkReport) {
    println!(
        "{}: {} toggles in {:.3} s ({} timer overflows)",
        report.led,
        report.toggles,
        report.simulated_ms / 1000.0,
        report.timer_overflows
    );
    for edge in &report.edges {
        println!(
            "  {:>12.3} ms  {}",
            edge.time_ms,
            if edge.lit { "ON" } else { "OFF" }
        );
    }
    if let Some(half) = report.half_period_ms {
        println!("  half period: {:.3} ms", half);
    }
    if let Some(duty) = report.duty_cycle {
        println!("  duty cycle:  {:.1}%", duty * 100.0);
    }
}

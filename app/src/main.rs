//! Pulsar - real-time audio passthrough with a terminal spectrum visualizer
//!
//! Captures from an input device, plays the same frames back out, and draws
//! a bar spectrum with a bass-reactive particle field in the terminal.
//!
//! Keys: Up/Down adjust the max-intensity ceiling, Enter resets it, `q`,
//! Esc or Ctrl+C quit.

mod app;
mod limiter;
mod logging;
mod terminal;

use std::path::PathBuf;

use anyhow::{anyhow, Result};
use clap::Parser;
use tracing::{error, info};

use pulsar_core::{AudioDevice, PulsarSettings};

#[derive(Parser, Debug)]
#[command(name = "pulsar")]
#[command(version)]
#[command(
    about = "Real-time audio passthrough with a terminal spectrum visualizer",
    long_about = None
)]
struct Cli {
    /// Capture device name (host default when omitted)
    #[arg(short, long)]
    capture: Option<String>,

    /// Playback device name (host default when omitted)
    #[arg(short, long)]
    playback: Option<String>,

    /// Number of frequency bars
    #[arg(short, long)]
    bars: Option<usize>,

    /// Target frame rate
    #[arg(long)]
    fps: Option<u32>,

    /// Audio period length in milliseconds
    #[arg(long)]
    period_ms: Option<u32>,

    /// Log file (defaults to the platform data directory)
    #[arg(long)]
    log_file: Option<PathBuf>,

    /// Log filter directives, e.g. "pulsar=debug" (overrides RUST_LOG)
    #[arg(long)]
    log_level: Option<String>,

    /// List audio devices and exit
    #[arg(long)]
    list_devices: bool,

    /// Use a synthetic tone instead of audio hardware
    #[arg(long)]
    demo: bool,

    /// Persist the effective settings
    #[arg(long)]
    save_settings: bool,
}

impl Cli {
    /// Command-line flags take precedence over saved settings
    fn apply(&self, settings: &mut PulsarSettings) {
        if let Some(name) = &self.capture {
            settings.audio.capture_device = Some(name.clone());
        }
        if let Some(name) = &self.playback {
            settings.audio.playback_device = Some(name.clone());
        }
        if let Some(bars) = self.bars {
            settings.analysis.bar_count = bars;
        }
        if let Some(fps) = self.fps {
            settings.display.target_fps = fps;
        }
        if let Some(period_ms) = self.period_ms {
            settings.audio.period_ms = period_ms;
        }
    }
}

fn list_devices() -> Result<()> {
    let devices = AudioDevice::enumerate_all()?;
    if devices.is_empty() {
        println!("No audio devices found");
    }
    for device in devices {
        println!("{}", device);
    }
    Ok(())
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    if cli.list_devices {
        return list_devices();
    }

    let log_path = cli
        .log_file
        .clone()
        .or_else(PulsarSettings::default_log_path)
        .unwrap_or_else(|| PathBuf::from("pulsar.log"));
    logging::init(&log_path, cli.log_level.as_deref())?;

    info!("Starting Pulsar v{}", env!("CARGO_PKG_VERSION"));

    let mut settings = PulsarSettings::load();
    cli.apply(&mut settings);

    settings
        .engine_config()
        .stream
        .validate()
        .map_err(|e| anyhow!("Invalid audio settings: {}", e))?;

    if cli.save_settings {
        let path = settings.save().map_err(|e| anyhow!("Failed to save settings: {}", e))?;
        println!("Settings saved to {}", path.display());
    }

    let result = app::run(&settings, cli.demo);
    match &result {
        Ok(()) => info!("Shutdown complete"),
        Err(e) => error!("Pulsar stopped: {:#}", e),
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_overrides_settings() {
        let cli = Cli::parse_from([
            "pulsar",
            "--capture",
            "hw:Loopback,1",
            "--bars",
            "32",
            "--fps",
            "30",
            "--period-ms",
            "25",
        ]);
        let mut settings = PulsarSettings::default();
        cli.apply(&mut settings);

        assert_eq!(settings.audio.capture_device.as_deref(), Some("hw:Loopback,1"));
        assert!(settings.audio.playback_device.is_none());
        assert_eq!(settings.analysis.bar_count, 32);
        assert_eq!(settings.display.target_fps, 30);
        assert_eq!(settings.engine_config().stream.frames_per_period, 1102);
    }

    #[test]
    fn test_cli_defaults_leave_settings() {
        let cli = Cli::parse_from(["pulsar"]);
        let mut settings = PulsarSettings::default();
        cli.apply(&mut settings);
        assert_eq!(settings, PulsarSettings::default());
        assert!(!cli.demo && !cli.list_devices && !cli.save_settings);
    }

    #[test]
    fn test_cli_definition_is_valid() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }
}

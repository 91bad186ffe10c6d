//! Gate configuration
//!
//! Settings come from, in priority order:
//! 1. Command-line arguments (`--backend-url`, `--port`, `--mode`, `--no-audio`)
//! 2. Environment variables (`FERIA_BACKEND_URL`, `FERIA_GATE_PORT`, ...)
//! 3. TOML file (`--config`, or `<config_dir>/feria/gate.toml`)
//! 4. Built-in defaults
//!
//! Levels 1 and 2 are resolved by clap; [`GateConfig::apply_args`] lays the
//! result over the TOML/default layer.
//!
//! Example `gate.toml`:
//!
//! ```toml
//! backend_url = "https://feria.example.org/api"
//! port = 5790
//! default_mode = "entrada"
//! preferred_facing = "environment"
//!
//! [logging]
//! level = "info"
//!
//! [scan]
//! fps = 10
//! region_width = 250
//! region_height = 250
//!
//! [validation]
//! timeout_ms = 8000
//!
//! [feedback]
//! enabled = true
//! volume = 1.0
//!
//! [[camera.devices]]
//! id = "rear"
//! label = "Rear camera"
//! facing = "environment"
//! frames = "/var/lib/feria/frames/rear"
//! ```

use clap::Parser;
use feria_common::config::{load_toml_or_default, LoggingConfig};
use feria_common::ScanMode;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::camera::{Facing, FrameDirectoryDevice};
use crate::error::{Error, Result};
use crate::scan::{ScanLoopConfig, ScanRegion};

/// Config file name under `<config_dir>/feria/`
pub const CONFIG_FILE_NAME: &str = "gate.toml";

pub const DEFAULT_BACKEND_URL: &str = "http://localhost:8000/api";
pub const DEFAULT_PORT: u16 = 5790;

/// Command-line arguments for feria-gate
#[derive(Parser, Debug, Clone, Default)]
#[command(name = "feria-gate")]
#[command(about = "Entry and accreditation QR validation station")]
#[command(version)]
pub struct GateArgs {
    /// Path to the TOML config file
    #[arg(short, long, env = "FERIA_GATE_CONFIG")]
    pub config: Option<PathBuf>,

    /// Ticketing backend base URL
    #[arg(short, long, env = "FERIA_BACKEND_URL")]
    pub backend_url: Option<String>,

    /// Port for the control surface
    #[arg(short, long, env = "FERIA_GATE_PORT")]
    pub port: Option<u16>,

    /// Initial scan mode (entrada, acreditacion)
    #[arg(short, long, env = "FERIA_GATE_MODE")]
    pub mode: Option<ScanMode>,

    /// Disable audible feedback
    #[arg(long, env = "FERIA_GATE_NO_AUDIO")]
    pub no_audio: bool,
}

/// Scan loop settings (`[scan]`)
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct ScanSettings {
    pub fps: u32,
    pub region_width: u32,
    pub region_height: u32,
}

impl Default for ScanSettings {
    fn default() -> Self {
        let loop_config = ScanLoopConfig::default();
        Self {
            fps: loop_config.fps,
            region_width: loop_config.region.width,
            region_height: loop_config.region.height,
        }
    }
}

impl ScanSettings {
    pub fn loop_config(&self) -> ScanLoopConfig {
        ScanLoopConfig {
            fps: self.fps,
            region: ScanRegion {
                width: self.region_width,
                height: self.region_height,
            },
        }
    }
}

/// Validation client settings (`[validation]`)
#[derive(Debug, Clone, PartialEq, Deserialize, Default)]
#[serde(default)]
pub struct ValidationSettings {
    /// Round-trip timeout; 0 waits indefinitely
    pub timeout_ms: u64,
}

impl ValidationSettings {
    pub fn timeout(&self) -> Option<Duration> {
        (self.timeout_ms > 0).then(|| Duration::from_millis(self.timeout_ms))
    }
}

/// Audible feedback settings (`[feedback]`)
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct FeedbackSettings {
    pub enabled: bool,
    /// Master volume, 0.0 - 1.0
    pub volume: f32,
}

impl Default for FeedbackSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            volume: 1.0,
        }
    }
}

/// Camera devices (`[[camera.devices]]`)
#[derive(Debug, Clone, PartialEq, Deserialize, Default)]
#[serde(default)]
pub struct CameraSettings {
    pub devices: Vec<FrameDirectoryDevice>,
}

/// Complete gate configuration
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct GateConfig {
    pub backend_url: String,
    pub port: u16,
    pub default_mode: ScanMode,
    pub preferred_facing: Facing,
    pub logging: LoggingConfig,
    pub scan: ScanSettings,
    pub validation: ValidationSettings,
    pub feedback: FeedbackSettings,
    pub camera: CameraSettings,
}

impl Default for GateConfig {
    fn default() -> Self {
        Self {
            backend_url: DEFAULT_BACKEND_URL.to_string(),
            port: DEFAULT_PORT,
            default_mode: ScanMode::default(),
            preferred_facing: Facing::Environment,
            logging: LoggingConfig::default(),
            scan: ScanSettings::default(),
            validation: ValidationSettings::default(),
            feedback: FeedbackSettings::default(),
            camera: CameraSettings::default(),
        }
    }
}

impl GateConfig {
    /// Load the TOML layer
    ///
    /// Returns the config and the file it came from, if any.
    pub fn load(explicit: Option<&Path>) -> Result<(Self, Option<PathBuf>)> {
        Ok(load_toml_or_default(explicit, CONFIG_FILE_NAME)?)
    }

    /// Full resolution: TOML/defaults, then environment and CLI via `args`
    pub fn resolve(args: &GateArgs) -> Result<(Self, Option<PathBuf>)> {
        let (mut config, source) = Self::load(args.config.as_deref())?;
        config.apply_args(args);
        config.validate()?;
        Ok((config, source))
    }

    /// Lay command-line and environment values over this config
    pub fn apply_args(&mut self, args: &GateArgs) {
        if let Some(url) = &args.backend_url {
            self.backend_url = url.clone();
        }
        if let Some(port) = args.port {
            self.port = port;
        }
        if let Some(mode) = args.mode {
            self.default_mode = mode;
        }
        if args.no_audio {
            self.feedback.enabled = false;
        }
    }

    pub fn validate(&self) -> Result<()> {
        let url = self.backend_url.trim();
        if !(url.starts_with("http://") || url.starts_with("https://")) {
            return Err(Error::Config(format!(
                "backend_url must be an http(s) URL, got '{}'",
                self.backend_url
            )));
        }
        if self.scan.fps == 0 {
            return Err(Error::Config("scan.fps must be at least 1".to_string()));
        }
        if !(0.0..=1.0).contains(&self.feedback.volume) {
            return Err(Error::Config(format!(
                "feedback.volume must be between 0.0 and 1.0, got {}",
                self.feedback.volume
            )));
        }
        Ok(())
    }
}

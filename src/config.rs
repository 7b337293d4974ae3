use crate::error::CaptureError;
use anyhow::{Context, Result};
use clap::Parser;
use serde::Deserialize;
use std::fs;
use std::path::PathBuf;
use std::time::Duration;

#[derive(Parser, Debug, Default)]
#[clap(name = "serial-logtap", version, about)]
pub struct Cli {
    /// Path to an optional TOML configuration file
    #[clap(long)]
    pub config: Option<PathBuf>,

    /// Override serial port path
    #[clap(long)]
    pub port: Option<String>,

    /// Override baud rate
    #[clap(long)]
    pub baud_rate: Option<u32>,

    /// Override log file path
    #[clap(long)]
    pub log_file: Option<PathBuf>,

    /// Override read timeout in milliseconds
    #[clap(long)]
    pub read_timeout_ms: Option<u64>,

    /// Enable debug diagnostics on stderr
    #[clap(short, long)]
    pub verbose: bool,
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default)]
pub struct Config {
    pub port: String,
    pub baud_rate: u32,
    pub log_file: PathBuf,
    pub read_timeout_ms: u64,
    pub max_line_len: usize,
}

impl Default for Config {
    fn default() -> Self {
        let port = if cfg!(windows) { "COM7" } else { "/dev/ttyACM0" };
        Self {
            port: port.to_string(),
            baud_rate: 115_200,
            log_file: PathBuf::from("logs_matriz_leds_rgb.txt"),
            read_timeout_ms: 1000,
            max_line_len: 64 * 1024,
        }
    }
}

impl Config {
    pub fn read_timeout(&self) -> Duration {
        Duration::from_millis(self.read_timeout_ms)
    }

    pub fn validate(&self) -> Result<(), CaptureError> {
        if self.port.trim().is_empty() {
            return Err(CaptureError::Config("port must not be empty".into()));
        }
        if self.baud_rate == 0 {
            return Err(CaptureError::Config("baud_rate must be positive".into()));
        }
        if self.read_timeout_ms == 0 {
            return Err(CaptureError::Config("read_timeout_ms must be positive".into()));
        }
        if self.max_line_len == 0 {
            return Err(CaptureError::Config("max_line_len must be positive".into()));
        }
        Ok(())
    }
}

pub fn load_config(cli: &Cli) -> Result<Config> {
    let mut config = match cli.config {
        Some(ref path) => {
            let config_content = fs::read_to_string(path)
                .with_context(|| format!("Failed to read config file: {:?}", path))?;
            toml::from_str(&config_content).context("Failed to parse config file")?
        }
        None => Config::default(),
    };

    // Apply CLI overrides
    if let Some(ref port) = cli.port {
        config.port = port.clone();
    }

    if let Some(baud_rate) = cli.baud_rate {
        config.baud_rate = baud_rate;
    }

    if let Some(ref log_file) = cli.log_file {
        config.log_file = log_file.clone();
    }

    if let Some(read_timeout_ms) = cli.read_timeout_ms {
        config.read_timeout_ms = read_timeout_ms;
    }

    config.validate()?;
    Ok(config)
}

/// Folds any config loading failure into [`CaptureError::Config`], keeping
/// validation errors as they are.
pub fn into_capture_error(err: anyhow::Error) -> CaptureError {
    err.downcast::<CaptureError>()
        .unwrap_or_else(|err| CaptureError::Config(format!("{:#}", err)))
}

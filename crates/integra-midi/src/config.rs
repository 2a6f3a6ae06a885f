//! Driver configuration schema and loader
//!
//! Configuration is stored as YAML.
//! Default location: ~/.config/integra/integra.yaml

use crate::discovery::{NamePairing, PairingStrategy, ProbePairing};
use crate::midi::MidirTransport;
use anyhow::Context;
use integra_core::protocol::DeviceId;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// How discovery groups endpoints into devices
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PairingMode {
    /// Send Identity Requests and pair by who answers
    #[default]
    Probe,
    /// Pair endpoints with identical names, sending nothing
    Name,
}

/// Root configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct IntegraConfig {
    /// Client name shown to other MIDI applications
    pub client_name: String,

    /// SysEx device ID (0x10..=0x1F, or 0x7F for broadcast)
    pub device_id: u8,

    pub pairing: PairingMode,

    /// Pause after opening inputs before the first probe
    pub settle_ms: u64,

    /// Per-output probe window
    pub probe_timeout_ms: u64,

    /// How long a read or identify waits for the device
    pub reply_timeout_ms: u64,

    /// Only consider ports whose name contains this (case-insensitive)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub port_filter: Option<String>,
}

impl Default for IntegraConfig {
    fn default() -> Self {
        Self {
            client_name: "integra".to_string(),
            device_id: 0x10,
            pairing: PairingMode::Probe,
            settle_ms: 1000,
            probe_timeout_ms: 1000,
            reply_timeout_ms: 2000,
            port_filter: None,
        }
    }
}

impl IntegraConfig {
    pub fn device_id(&self) -> anyhow::Result<DeviceId> {
        DeviceId::new(self.device_id).with_context(|| {
            format!(
                "Invalid device ID {:#04x} (expected 0x10..=0x1f or 0x7f)",
                self.device_id
            )
        })
    }

    pub fn pairing_strategy(&self) -> Box<dyn PairingStrategy> {
        match self.pairing {
            PairingMode::Probe => Box::new(ProbePairing::new(
                Duration::from_millis(self.settle_ms),
                Duration::from_millis(self.probe_timeout_ms),
            )),
            PairingMode::Name => Box::new(NamePairing),
        }
    }

    pub fn transport(&self) -> MidirTransport {
        MidirTransport::new(&self.client_name).with_port_filter(self.port_filter.clone())
    }

    pub fn reply_timeout(&self) -> Duration {
        Duration::from_millis(self.reply_timeout_ms)
    }
}

/// Default config file path
pub fn default_config_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("integra")
        .join("integra.yaml")
}

/// Load configuration from a YAML file
///
/// If the file doesn't exist, returns the defaults.
/// If the file exists but is invalid, logs a warning and returns the defaults.
pub fn load_config(path: &Path) -> IntegraConfig {
    log::info!("load_config: Loading from {:?}", path);

    if !path.exists() {
        log::info!("load_config: Config file doesn't exist, using defaults");
        return IntegraConfig::default();
    }

    match std::fs::read_to_string(path) {
        Ok(contents) => match serde_yaml::from_str::<IntegraConfig>(&contents) {
            Ok(config) => {
                log::info!(
                    "load_config: client '{}', device ID {:#04x}, {:?} pairing",
                    config.client_name,
                    config.device_id,
                    config.pairing
                );
                config
            }
            Err(e) => {
                log::warn!("load_config: Failed to parse config: {}", e);
                IntegraConfig::default()
            }
        },
        Err(e) => {
            log::warn!("load_config: Failed to read config file: {}", e);
            IntegraConfig::default()
        }
    }
}

/// Save configuration to a YAML file
///
/// Creates parent directories if they don't exist.
pub fn save_config(config: &IntegraConfig, path: &Path) -> anyhow::Result<()> {
    log::info!("save_config: Saving to {:?}", path);

    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create config directory: {:?}", parent))?;
    }

    let yaml = serde_yaml::to_string(config).context("Failed to serialize config to YAML")?;

    std::fs::write(path, yaml)
        .with_context(|| format!("Failed to write config file: {:?}", path))?;

    log::info!("save_config: Config saved successfully");
    Ok(())
}

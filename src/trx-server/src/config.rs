// SPDX-FileCopyrightText: 2025 Stanislaw Grams <stanislawgrams@gmail.com>
//
// SPDX-License-Identifier: BSD-2-Clause

//! Configuration file support for trx-server.
//!
//! Config is loaded from the `[trx-server]` section of `trx-rs.toml`, or
//! from a flat file holding the same tables at the top level.
//! Default search order:
//! 1. Path specified via `--config` CLI argument
//! 2. `./trx-rs.toml`
//! 3. `~/.config/trx-rs/trx-rs.toml`
//! 4. `/etc/trx-rs/trx-rs.toml`

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use trx_app::{ConfigError, ConfigFile};
use trx_channel::{PipelineConfig, SampleFormat};
use trx_core::{ChannelSettings, DemodMode, LoopSettings};
use trx_decode_log::DecodeLogsConfig;

/// Top-level server configuration structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// General settings
    pub general: GeneralConfig,
    /// IQ input
    pub input: InputConfig,
    /// Receiver channels carved out of the input passband
    pub channels: Vec<ChannelConfig>,
    /// Decoder file logging configuration
    pub decode_logs: DecodeLogsConfig,
}

/// General application settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// Log level (trace, debug, info, warn, error)
    pub log_level: Option<String>,
}

/// Where the IQ samples come from.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct InputConfig {
    /// File path, or "-" for stdin.
    pub path: String,
    /// Sample layout: "cs16", "cu8" or "cf32".
    pub format: SampleFormat,
    /// IQ sample rate (Hz).
    pub sample_rate: u32,
    /// Samples handed to the channels per burst.
    pub block_size: usize,
    /// Throttle reads to the sample rate.
    pub realtime: bool,
    /// Start over at end of file.
    pub repeat: bool,
}

impl Default for InputConfig {
    fn default() -> Self {
        Self {
            path: "-".to_string(),
            format: SampleFormat::Cs16,
            sample_rate: 2_048_000,
            block_size: 16_384,
            realtime: false,
            repeat: false,
        }
    }
}

impl InputConfig {
    pub fn pipeline(&self) -> PipelineConfig {
        PipelineConfig {
            sample_rate: self.sample_rate,
            block_size: self.block_size,
            realtime: self.realtime,
        }
    }
}

/// One `[[channels]]` entry. Unset fields take the mode's defaults.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ChannelConfig {
    /// Identifier used in logs and decode events.
    pub id: String,
    pub mode: DemodMode,
    /// Offset from the input centre frequency (Hz, signed).
    pub offset_hz: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rf_bandwidth_hz: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fm_deviation_hz: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub baud: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub squelch_db: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub squelch_gate: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pll: Option<LoopSettings>,
    pub am_sync: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub audio_rate: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub audio_frame: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub correlation_threshold: Option<f32>,
    pub pocsag_reverse: bool,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub pocsag_charset: Vec<(u8, char)>,
}

impl ChannelConfig {
    /// Channel settings: the mode's defaults overridden by what is set here.
    pub fn settings(&self, index: usize) -> ChannelSettings {
        let id = if self.id.trim().is_empty() {
            format!("{}_{}", self.mode, index)
        } else {
            self.id.clone()
        };
        let mut s = ChannelSettings::for_mode(&id, self.mode);
        s.offset_hz = self.offset_hz;
        if let Some(v) = self.rf_bandwidth_hz {
            s.rf_bandwidth_hz = v;
        }
        if let Some(v) = self.fm_deviation_hz {
            s.fm_deviation_hz = v;
        }
        if let Some(v) = self.baud {
            s.baud = v;
        }
        if let Some(v) = self.squelch_db {
            s.squelch_db = v;
        }
        if let Some(v) = self.squelch_gate {
            s.squelch_gate = v;
        }
        if let Some(v) = self.pll {
            s.pll = v;
        }
        s.am_sync = self.am_sync;
        if let Some(v) = self.audio_rate {
            s.audio_rate = v;
        }
        if let Some(v) = self.audio_frame {
            s.audio_frame = v;
        }
        if let Some(v) = self.correlation_threshold {
            s.correlation_threshold = v;
        }
        s.pocsag_reverse = self.pocsag_reverse;
        s.pocsag_charset = self.pocsag_charset.clone();
        s
    }
}

impl ServerConfig {
    pub fn validate(&self) -> Result<(), String> {
        validate_log_level(self.general.log_level.as_deref())?;

        if self.input.sample_rate == 0 {
            return Err("[input].sample_rate must be > 0".to_string());
        }
        if self.input.block_size == 0 {
            return Err("[input].block_size must be > 0".to_string());
        }
        if self.input.path.trim().is_empty() {
            return Err("[input].path must not be empty (use \"-\" for stdin)".to_string());
        }

        if self.channels.is_empty() {
            return Err("at least one [[channels]] entry is required".to_string());
        }
        let mut seen = HashSet::new();
        for settings in self.channel_settings() {
            if !seen.insert(settings.id.clone()) {
                return Err(format!("[[channels]] id \"{}\" is used twice", settings.id));
            }
        }
        Ok(())
    }

    /// Resolved settings for every configured channel, in file order.
    pub fn channel_settings(&self) -> Vec<ChannelSettings> {
        self.channels
            .iter()
            .enumerate()
            .map(|(idx, ch)| ch.settings(idx))
            .collect()
    }

    /// Load configuration from a specific file path.
    pub fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        <Self as ConfigFile>::load_from_file(path)
    }

    /// Load configuration from the default search paths.
    /// Returns default config if no config file is found.
    pub fn load_from_default_paths() -> Result<(Self, Option<PathBuf>), ConfigError> {
        <Self as ConfigFile>::load_from_default_paths()
    }

    /// Generate an example configuration wrapped under the `[trx-server]`
    /// section header, suitable for use in a combined `trx-rs.toml` file.
    pub fn example_combined_toml() -> String {
        #[derive(serde::Serialize)]
        struct Wrapper {
            #[serde(rename = "trx-server")]
            inner: ServerConfig,
        }
        let example = ServerConfig {
            general: GeneralConfig {
                log_level: Some("info".to_string()),
            },
            input: InputConfig {
                path: "capture-433M-2048k.cu8".to_string(),
                format: SampleFormat::Cu8,
                ..InputConfig::default()
            },
            channels: vec![
                ChannelConfig {
                    id: "pager".to_string(),
                    mode: DemodMode::Pocsag,
                    offset_hz: -250_000.0,
                    baud: Some(1_200),
                    ..ChannelConfig::default()
                },
                ChannelConfig {
                    id: "sonde".to_string(),
                    mode: DemodMode::Radiosonde,
                    offset_hz: 400_000.0,
                    correlation_threshold: Some(450.0),
                    ..ChannelConfig::default()
                },
                ChannelConfig {
                    id: "voice".to_string(),
                    mode: DemodMode::Nfm,
                    offset_hz: 25_000.0,
                    squelch_db: Some(-40.0),
                    ..ChannelConfig::default()
                },
            ],
            decode_logs: DecodeLogsConfig::default(),
        };
        toml::to_string_pretty(&Wrapper { inner: example }).unwrap_or_default()
    }
}

fn validate_log_level(level: Option<&str>) -> Result<(), String> {
    if let Some(level) = level {
        match level {
            "trace" | "debug" | "info" | "warn" | "error" => {}
            _ => {
                return Err(format!(
                    "[general].log_level '{}' is invalid (expected one of: trace, debug, info, warn, error)",
                    level
                ))
            }
        }
    }
    Ok(())
}

impl ConfigFile for ServerConfig {
    fn section_key() -> &'static str {
        "trx-server"
    }
}

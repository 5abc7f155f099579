// SPDX-FileCopyrightText: 2026 Stanislaw Grams <stanislawgrams@gmail.com>
//
// SPDX-License-Identifier: BSD-2-Clause

//! Channel configuration values.
//!
//! A [`ChannelSettings`] is an immutable snapshot: the pipeline never mutates
//! one in place, it receives a whole new value and rebuilds derived state.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Demodulator selected for a channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DemodMode {
    #[default]
    Nfm,
    Am,
    Usb,
    Lsb,
    Pocsag,
    Rds,
    Radiosonde,
    Ais,
    Aprs,
}

impl DemodMode {
    /// Fixed rate the channel is resampled to before demodulation.
    pub fn processing_rate(self) -> u32 {
        match self {
            Self::Nfm | Self::Am | Self::Usb | Self::Lsb => 48_000,
            Self::Pocsag | Self::Aprs => 38_400,
            Self::Rds => 228_000,
            Self::Radiosonde | Self::Ais => 57_600,
        }
    }

    pub fn default_rf_bandwidth_hz(self) -> f32 {
        match self {
            Self::Nfm => 12_500.0,
            Self::Am => 10_000.0,
            Self::Usb | Self::Lsb => 3_000.0,
            Self::Pocsag => 20_000.0,
            Self::Rds => 200_000.0,
            Self::Radiosonde => 9_600.0,
            Self::Ais => 16_000.0,
            Self::Aprs => 12_500.0,
        }
    }

    pub fn default_deviation_hz(self) -> f32 {
        match self {
            Self::Nfm | Self::Aprs => 5_000.0,
            Self::Pocsag => 4_500.0,
            Self::Rds => 75_000.0,
            Self::Radiosonde => 2_400.0,
            Self::Ais => 4_800.0,
            Self::Am | Self::Usb | Self::Lsb => 0.0,
        }
    }

    pub fn default_baud(self) -> u32 {
        match self {
            Self::Pocsag | Self::Aprs => 1_200,
            Self::Radiosonde => 4_800,
            Self::Ais => 9_600,
            Self::Nfm | Self::Am | Self::Usb | Self::Lsb | Self::Rds => 0,
        }
    }

    /// Baud rates accepted by the mode, or an empty slice when not applicable.
    pub fn allowed_bauds(self) -> &'static [u32] {
        match self {
            Self::Pocsag => &[512, 1_200, 2_400],
            Self::Aprs => &[1_200],
            Self::Radiosonde => &[4_800],
            Self::Ais => &[9_600],
            Self::Nfm | Self::Am | Self::Usb | Self::Lsb | Self::Rds => &[],
        }
    }

    pub fn is_digital(self) -> bool {
        !matches!(self, Self::Nfm | Self::Am | Self::Usb | Self::Lsb)
    }
}

impl fmt::Display for DemodMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Nfm => "nfm",
            Self::Am => "am",
            Self::Usb => "usb",
            Self::Lsb => "lsb",
            Self::Pocsag => "pocsag",
            Self::Rds => "rds",
            Self::Radiosonde => "radiosonde",
            Self::Ais => "ais",
            Self::Aprs => "aprs",
        };
        f.write_str(name)
    }
}

/// Carrier loop tuning: natural frequency (normalised to the processing
/// rate), damping factor and loop gain.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoopSettings {
    pub bandwidth: f32,
    pub damping: f32,
    pub gain: f32,
}

impl Default for LoopSettings {
    fn default() -> Self {
        Self {
            bandwidth: 0.002,
            damping: 0.707,
            gain: 1.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChannelSettings {
    /// Channel identifier used in logs and decode events.
    pub id: String,
    pub mode: DemodMode,
    /// Offset of the channel centre from the input centre (Hz, signed).
    pub offset_hz: f64,
    pub rf_bandwidth_hz: f32,
    /// Peak FM deviation; 0 selects the mode default.
    pub fm_deviation_hz: f32,
    /// Symbol rate; 0 selects the mode default.
    pub baud: u32,
    /// Squelch threshold in dB relative to full scale.
    pub squelch_db: f32,
    /// Consecutive samples above/below threshold needed to open/close.
    pub squelch_gate: u32,
    /// Carrier loop used by AM synchronous detection and the RDS pilot.
    pub pll: LoopSettings,
    /// Use a PLL for AM synchronous detection instead of the envelope.
    pub am_sync: bool,
    /// Output audio rate.
    pub audio_rate: u32,
    /// Samples per emitted audio frame.
    pub audio_frame: usize,
    /// Correlator threshold for radiosonde/AIS preamble detection.
    pub correlation_threshold: f32,
    /// Reverse the reading order of POCSAG alpha messages.
    pub pocsag_reverse: bool,
    /// Pairs of (7-bit code, replacement char) applied to POCSAG alpha text.
    pub pocsag_charset: Vec<(u8, char)>,
}

impl Default for ChannelSettings {
    fn default() -> Self {
        Self::for_mode("ch0", DemodMode::Nfm)
    }
}

/// Bounds applied by [`ChannelSettings::sanitized`].
const MIN_AUDIO_RATE: u32 = 8_000;
const MAX_AUDIO_RATE: u32 = 192_000;
const MIN_SQUELCH_GATE: u32 = 1;
const MAX_SQUELCH_GATE: u32 = 10_000;

impl ChannelSettings {
    pub fn for_mode(id: &str, mode: DemodMode) -> Self {
        let correlation_threshold = match mode {
            DemodMode::Radiosonde => 450.0,
            DemodMode::Ais => 30.0,
            _ => 0.0,
        };
        Self {
            id: id.to_string(),
            mode,
            offset_hz: 0.0,
            rf_bandwidth_hz: mode.default_rf_bandwidth_hz(),
            fm_deviation_hz: mode.default_deviation_hz(),
            baud: mode.default_baud(),
            squelch_db: -120.0,
            squelch_gate: 48,
            pll: LoopSettings::default(),
            am_sync: false,
            audio_rate: 48_000,
            audio_frame: 960,
            correlation_threshold,
            pocsag_reverse: false,
            pocsag_charset: Vec::new(),
        }
    }

    pub fn deviation_hz(&self) -> f32 {
        if self.fm_deviation_hz > 0.0 {
            self.fm_deviation_hz
        } else {
            self.mode.default_deviation_hz()
        }
    }

    pub fn baud_rate(&self) -> u32 {
        if self.baud > 0 {
            self.baud
        } else {
            self.mode.default_baud()
        }
    }

    /// Squelch threshold as linear power.
    pub fn squelch_power(&self) -> f64 {
        10f64.powf(f64::from(self.squelch_db) / 10.0)
    }

    /// Clamp invalid values against the input `sample_rate`.
    ///
    /// Returns the corrected copy and a description of each correction so the
    /// caller can log them; processing always continues with the copy.
    pub fn sanitized(&self, sample_rate: u32) -> (Self, Vec<String>) {
        let mut out = self.clone();
        let mut notes = Vec::new();
        let nyquist = f64::from(sample_rate.max(1)) / 2.0;
        let proc_rate = self.mode.processing_rate() as f32;

        if out.offset_hz.abs() >= nyquist {
            let clamped = out.offset_hz.clamp(-nyquist + 1.0, nyquist - 1.0);
            notes.push(format!(
                "offset {} Hz outside input passband, clamped to {} Hz",
                out.offset_hz, clamped
            ));
            out.offset_hz = clamped;
        }

        let max_bw = (proc_rate * 0.98).min(sample_rate.max(1) as f32);
        if !(out.rf_bandwidth_hz > 0.0 && out.rf_bandwidth_hz <= max_bw) {
            let fixed = self.mode.default_rf_bandwidth_hz().min(max_bw);
            notes.push(format!(
                "rf bandwidth {} Hz invalid, using {} Hz",
                out.rf_bandwidth_hz, fixed
            ));
            out.rf_bandwidth_hz = fixed;
        }

        if !out.fm_deviation_hz.is_finite() || out.fm_deviation_hz < 0.0 {
            notes.push(format!(
                "fm deviation {} Hz invalid, using mode default",
                out.fm_deviation_hz
            ));
            out.fm_deviation_hz = 0.0;
        }

        let allowed = self.mode.allowed_bauds();
        if !allowed.is_empty() && !allowed.contains(&out.baud_rate()) {
            let fixed = self.mode.default_baud();
            notes.push(format!(
                "baud {} not supported by {}, using {}",
                out.baud, self.mode, fixed
            ));
            out.baud = fixed;
        }

        if !(MIN_AUDIO_RATE..=MAX_AUDIO_RATE).contains(&out.audio_rate) {
            let fixed = out.audio_rate.clamp(MIN_AUDIO_RATE, MAX_AUDIO_RATE);
            notes.push(format!(
                "audio rate {} out of range, clamped to {}",
                out.audio_rate, fixed
            ));
            out.audio_rate = fixed;
        }
        if out.audio_frame == 0 {
            out.audio_frame = (out.audio_rate / 50) as usize;
            notes.push(format!("audio frame size 0, using {}", out.audio_frame));
        }

        let gate = out.squelch_gate.clamp(MIN_SQUELCH_GATE, MAX_SQUELCH_GATE);
        if gate != out.squelch_gate {
            notes.push(format!(
                "squelch gate {} clamped to {}",
                out.squelch_gate, gate
            ));
            out.squelch_gate = gate;
        }

        let pll = &mut out.pll;
        if !(pll.bandwidth > 0.0 && pll.bandwidth < 0.25) {
            notes.push(format!("loop bandwidth {} invalid, using default", pll.bandwidth));
            pll.bandwidth = LoopSettings::default().bandwidth;
        }
        if !(pll.damping > 0.0 && pll.damping.is_finite()) {
            notes.push(format!("loop damping {} invalid, using default", pll.damping));
            pll.damping = LoopSettings::default().damping;
        }
        if !(pll.gain > 0.0 && pll.gain.is_finite()) {
            notes.push(format!("loop gain {} invalid, using default", pll.gain));
            pll.gain = LoopSettings::default().gain;
        }

        (out, notes)
    }
}

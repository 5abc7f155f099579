// SPDX-FileCopyrightText: 2025 Stanislaw Grams <stanislawgrams@gmail.com>
//
// SPDX-License-Identifier: BSD-2-Clause

//! Channel sinks: one variant per demodulator mode.
//!
//! Every sink consumes baseband IQ at its mode's processing rate and
//! produces audio, decoded messages, or both.

use num_complex::Complex;
use trx_core::decode::DecodedMessage;
use trx_core::{ChannelSettings, DemodMode};
use trx_dsp::FirFilter;

mod ais;
mod analog;
mod packet;
mod pager;
mod radiosonde;
mod rds;

pub use ais::AisSink;
pub use analog::AnalogSink;
pub use packet::PacketSink;
pub use pager::PagerSink;
pub use radiosonde::RadiosondeSink;
pub use rds::RdsSink;

/// What a sink produced from one burst.
#[derive(Debug, Default)]
pub struct SinkOutput {
    /// Audio at the channel's output rate.
    pub audio: Vec<f32>,
    pub messages: Vec<DecodedMessage>,
}

impl SinkOutput {
    pub fn clear(&mut self) {
        self.audio.clear();
        self.messages.clear();
    }
}

/// First-order DC blocker: `y[n] = x[n] - x[n-1] + r * y[n-1]`.
#[derive(Debug, Clone)]
pub(crate) struct DcBlocker {
    r: f32,
    x1: f32,
    y1: f32,
}

impl DcBlocker {
    pub(crate) fn new(r: f32) -> Self {
        Self {
            r: r.clamp(0.9, 0.9999),
            x1: 0.0,
            y1: 0.0,
        }
    }

    pub(crate) fn process(&mut self, x: f32) -> f32 {
        let y = x - self.x1 + self.r * self.y1;
        self.x1 = x;
        self.y1 = y;
        y
    }

    pub(crate) fn reset(&mut self) {
        self.x1 = 0.0;
        self.y1 = 0.0;
    }
}

/// FM discriminator scaling that maps `deviation_hz` to ±1 at `rate`.
pub(crate) fn fm_scaling(rate: u32, deviation_hz: f32) -> f32 {
    rate as f32 / (2.0 * deviation_hz.max(1.0))
}

/// Complex lowpass passing `rf_bandwidth_hz` centred on zero.
pub(crate) fn channel_filter(rate: u32, rf_bandwidth_hz: f32) -> FirFilter<Complex<f32>> {
    let bw = rf_bandwidth_hz.clamp(1_000.0, rate as f32 * 0.9);
    let taps = ((8.0 * rate as f32 / bw) as usize).clamp(31, 301) | 1;
    FirFilter::lowpass(taps, rate as f32, bw / 2.0)
}

pub enum ChannelSink {
    Analog(AnalogSink),
    Pager(PagerSink),
    Rds(RdsSink),
    Radiosonde(RadiosondeSink),
    Ais(AisSink),
    Packet(PacketSink),
}

impl ChannelSink {
    /// Build the sink for `settings.mode`. Settings are expected to be
    /// sanitized already.
    pub fn for_settings(settings: &ChannelSettings) -> Self {
        match settings.mode {
            DemodMode::Nfm | DemodMode::Am | DemodMode::Usb | DemodMode::Lsb => {
                Self::Analog(AnalogSink::new(settings))
            }
            DemodMode::Pocsag => Self::Pager(PagerSink::new(settings)),
            DemodMode::Rds => Self::Rds(RdsSink::new(settings)),
            DemodMode::Radiosonde => Self::Radiosonde(RadiosondeSink::new(settings)),
            DemodMode::Ais => Self::Ais(AisSink::new(settings)),
            DemodMode::Aprs => Self::Packet(PacketSink::new(settings)),
        }
    }

    pub fn mode(&self) -> DemodMode {
        match self {
            Self::Analog(sink) => sink.mode(),
            Self::Pager(_) => DemodMode::Pocsag,
            Self::Rds(_) => DemodMode::Rds,
            Self::Radiosonde(_) => DemodMode::Radiosonde,
            Self::Ais(_) => DemodMode::Ais,
            Self::Packet(_) => DemodMode::Aprs,
        }
    }

    /// Whether moving from `old` to `new` needs a fresh sink rather than
    /// an in-place update.
    pub fn needs_rebuild(old: &ChannelSettings, new: &ChannelSettings) -> bool {
        old.mode != new.mode
            || old.baud_rate() != new.baud_rate()
            || old.rf_bandwidth_hz != new.rf_bandwidth_hz
            || old.audio_rate != new.audio_rate
            || old.am_sync != new.am_sync
            || old.pocsag_reverse != new.pocsag_reverse
            || old.pocsag_charset != new.pocsag_charset
    }

    /// Apply the settings that can change without losing decoder state.
    pub fn update(&mut self, settings: &ChannelSettings) {
        match self {
            Self::Analog(sink) => sink.update(settings),
            Self::Pager(sink) => sink.update(settings),
            Self::Rds(sink) => sink.update(settings),
            Self::Radiosonde(sink) => sink.update(settings),
            Self::Ais(sink) => sink.update(settings),
            Self::Packet(sink) => sink.update(settings),
        }
    }

    /// Feed a burst of baseband samples at the mode's processing rate.
    pub fn feed(&mut self, samples: &[Complex<f32>], out: &mut SinkOutput) {
        match self {
            Self::Analog(sink) => sink.feed(samples, out),
            Self::Pager(sink) => sink.feed(samples, out),
            Self::Rds(sink) => sink.feed(samples, out),
            Self::Radiosonde(sink) => sink.feed(samples, out),
            Self::Ais(sink) => sink.feed(samples, out),
            Self::Packet(sink) => sink.feed(samples, out),
        }
    }

    /// Drop carrier, clock and frame state and search again.
    pub fn resync(&mut self, out: &mut SinkOutput) {
        match self {
            Self::Analog(sink) => sink.reset(),
            Self::Pager(sink) => sink.reset(out),
            Self::Rds(sink) => sink.reset(),
            Self::Radiosonde(sink) => sink.reset(),
            Self::Ais(sink) => sink.reset(),
            Self::Packet(sink) => sink.reset(),
        }
    }
}

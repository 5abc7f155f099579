// SPDX-FileCopyrightText: 2026 Stanislaw Grams <stanislawgrams@gmail.com>
//
// SPDX-License-Identifier: BSD-2-Clause

use num_complex::Complex;
use trx_core::decode::DecodedMessage;
use trx_core::ChannelSettings;
use trx_dsp::{PhaseDiscriminator, Resampler};
use trx_rds::RdsDecoder;

use super::{fm_scaling, SinkOutput};

/// Broadcast de-emphasis time constant (Europe).
const DEEMPHASIS_TAU_S: f32 = 50e-6;
/// Top of the mono audio band in the multiplex.
const MONO_CUTOFF_HZ: f32 = 15_000.0;

/// Wideband FM: mono audio plus the RDS decoder on the 57 kHz subcarrier.
pub struct RdsSink {
    rate: u32,
    discri: PhaseDiscriminator,
    decoder: RdsDecoder,
    deemph_alpha: f32,
    deemph: f32,
    audio: Resampler<f32>,
    audio_rate: u32,
    audio_cutoff_hz: f32,
    mono: Vec<f32>,
}

impl RdsSink {
    pub fn new(settings: &ChannelSettings) -> Self {
        let rate = settings.mode.processing_rate();
        let audio_cutoff_hz = MONO_CUTOFF_HZ.min(settings.audio_rate as f32 * 0.45);
        Self {
            rate,
            discri: PhaseDiscriminator::new(fm_scaling(rate, settings.deviation_hz())),
            decoder: RdsDecoder::new(rate),
            deemph_alpha: 1.0 - (-1.0 / (rate as f32 * DEEMPHASIS_TAU_S)).exp(),
            deemph: 0.0,
            audio: Resampler::new(
                f64::from(rate),
                f64::from(settings.audio_rate),
                f64::from(audio_cutoff_hz),
            ),
            audio_rate: settings.audio_rate,
            audio_cutoff_hz,
            mono: Vec::new(),
        }
    }

    pub fn update(&mut self, settings: &ChannelSettings) {
        self.discri
            .set_fm_scaling(fm_scaling(self.rate, settings.deviation_hz()));
    }

    pub fn reset(&mut self) {
        self.discri.reset();
        self.decoder.reset();
        self.deemph = 0.0;
        self.audio.configure(
            f64::from(self.rate),
            f64::from(self.audio_rate),
            f64::from(self.audio_cutoff_hz),
            true,
        );
    }

    pub fn feed(&mut self, samples: &[Complex<f32>], out: &mut SinkOutput) {
        self.mono.clear();
        for &s in samples {
            let mpx = self.discri.discriminate(s);
            if let Some(data) = self.decoder.process_sample(mpx) {
                out.messages.push(DecodedMessage::Rds(data));
            }
            self.deemph += self.deemph_alpha * (mpx - self.deemph);
            self.mono.push(self.deemph);
        }
        self.audio.process_block(&self.mono, &mut out.audio);
    }
}

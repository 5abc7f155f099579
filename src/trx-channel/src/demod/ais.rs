// SPDX-FileCopyrightText: 2026 Stanislaw Grams <stanislawgrams@gmail.com>
//
// SPDX-License-Identifier: BSD-2-Clause

use num_complex::Complex;
use trx_ais::AisDecoder;
use trx_core::decode::DecodedMessage;
use trx_core::ChannelSettings;
use trx_dsp::{FirFilter, PhaseDiscriminator};

use super::{channel_filter, fm_scaling, SinkOutput};

/// AIS: channel filter, discriminator and the GMSK/HDLC decoder.
pub struct AisSink {
    rate: u32,
    filter: FirFilter<Complex<f32>>,
    discri: PhaseDiscriminator,
    decoder: AisDecoder,
}

impl AisSink {
    pub fn new(settings: &ChannelSettings) -> Self {
        let rate = settings.mode.processing_rate();
        Self {
            rate,
            filter: channel_filter(rate, settings.rf_bandwidth_hz),
            discri: PhaseDiscriminator::new(fm_scaling(rate, settings.deviation_hz())),
            decoder: AisDecoder::new(settings.baud_rate(), settings.correlation_threshold),
        }
    }

    pub fn update(&mut self, settings: &ChannelSettings) {
        self.discri
            .set_fm_scaling(fm_scaling(self.rate, settings.deviation_hz()));
        self.decoder.set_threshold(settings.correlation_threshold);
    }

    pub fn reset(&mut self) {
        self.filter.reset();
        self.discri.reset();
        self.decoder.reset();
    }

    pub fn feed(&mut self, samples: &[Complex<f32>], out: &mut SinkOutput) {
        for &s in samples {
            let level = self.discri.discriminate(self.filter.filter(s));
            if let Some(msg) = self.decoder.process_sample(level) {
                out.messages.push(DecodedMessage::Ais(msg));
            }
        }
    }
}

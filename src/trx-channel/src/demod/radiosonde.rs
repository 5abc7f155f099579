// SPDX-FileCopyrightText: 2026 Stanislaw Grams <stanislawgrams@gmail.com>
//
// SPDX-License-Identifier: BSD-2-Clause

use num_complex::Complex;
use trx_core::decode::DecodedMessage;
use trx_core::ChannelSettings;
use trx_dsp::{FirFilter, PhaseDiscriminator};
use trx_radiosonde::Rs41Decoder;

use super::{channel_filter, fm_scaling, SinkOutput};

/// RS41 radiosonde: channel filter, discriminator and frame decoder.
pub struct RadiosondeSink {
    rate: u32,
    filter: FirFilter<Complex<f32>>,
    discri: PhaseDiscriminator,
    decoder: Rs41Decoder,
}

impl RadiosondeSink {
    pub fn new(settings: &ChannelSettings) -> Self {
        let rate = settings.mode.processing_rate();
        Self {
            rate,
            filter: channel_filter(rate, settings.rf_bandwidth_hz),
            discri: PhaseDiscriminator::new(fm_scaling(rate, settings.deviation_hz())),
            decoder: Rs41Decoder::new(settings.baud_rate(), settings.correlation_threshold),
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
            if let Some(frame) = self.decoder.process_sample(level) {
                out.messages.push(DecodedMessage::Radiosonde(frame));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::demod::tests::fm_modulate;
    use trx_core::DemodMode;

    #[test]
    fn alternating_preamble_alone_is_not_a_frame() {
        let settings = ChannelSettings::for_mode("sonde", DemodMode::Radiosonde);
        let levels: Vec<f32> = (0..2_000)
            .flat_map(|i| std::iter::repeat(if i & 1 == 0 { 1.0 } else { -1.0 }).take(12))
            .collect();
        let mut sink = RadiosondeSink::new(&settings);
        let mut out = SinkOutput::default();
        sink.feed(&fm_modulate(&levels, 57_600.0, 2_400.0), &mut out);
        assert!(out.messages.is_empty());
        assert!(out.audio.is_empty());
    }

    #[test]
    fn threshold_updates_in_place() {
        let mut settings = ChannelSettings::for_mode("sonde", DemodMode::Radiosonde);
        let mut sink = RadiosondeSink::new(&settings);
        settings.correlation_threshold = 600.0;
        settings.fm_deviation_hz = 3_000.0;
        sink.update(&settings);
        let mut out = SinkOutput::default();
        sink.feed(&vec![Complex::new(0.5, 0.0); 57_600], &mut out);
        assert!(out.messages.is_empty());
    }
}

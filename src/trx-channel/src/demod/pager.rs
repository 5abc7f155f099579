// SPDX-FileCopyrightText: 2026 Stanislaw Grams <stanislawgrams@gmail.com>
//
// SPDX-License-Identifier: BSD-2-Clause

use num_complex::Complex;
use trx_core::decode::{DecodedMessage, PagerMessage};
use trx_core::ChannelSettings;
use trx_dsp::{FirFilter, FixedRateBitSync, MovingAverage, PhaseDiscriminator};
use trx_pocsag::PocsagDecoder;

use super::{fm_scaling, SinkOutput};

/// Preamble length, in symbols, the DC estimate averages over.
const DC_WINDOW_SYMBOLS: usize = 16;

/// POCSAG: FSK discriminator, DC removal learned while searching, fixed-rate
/// bit sync and the batch decoder.
pub struct PagerSink {
    rate: u32,
    discri: PhaseDiscriminator,
    lowpass: FirFilter<f32>,
    dc: MovingAverage,
    /// Offset subtracted before slicing; frozen while synced.
    dc_level: f32,
    clock: FixedRateBitSync,
    decoder: PocsagDecoder,
    messages: Vec<PagerMessage>,
}

impl PagerSink {
    pub fn new(settings: &ChannelSettings) -> Self {
        let rate = settings.mode.processing_rate();
        let baud = settings.baud_rate().max(1);
        let sps = rate as f32 / baud as f32;
        Self {
            rate,
            discri: PhaseDiscriminator::new(fm_scaling(rate, settings.deviation_hz())),
            lowpass: FirFilter::lowpass((sps as usize) | 1, rate as f32, baud as f32),
            dc: MovingAverage::new((DC_WINDOW_SYMBOLS as f32 * sps) as usize),
            dc_level: 0.0,
            clock: FixedRateBitSync::new(sps),
            decoder: PocsagDecoder::new(
                settings.pocsag_charset.clone(),
                settings.pocsag_reverse,
            ),
            messages: Vec::new(),
        }
    }

    pub fn update(&mut self, settings: &ChannelSettings) {
        self.discri
            .set_fm_scaling(fm_scaling(self.rate, settings.deviation_hz()));
    }

    /// Drop sync, emitting the message that was being assembled.
    pub fn reset(&mut self, out: &mut SinkOutput) {
        if let Some(pending) = self.decoder.flush() {
            out.messages.push(DecodedMessage::Pocsag(pending));
        }
        self.discri.reset();
        self.lowpass.reset();
        self.dc.reset();
        self.dc_level = 0.0;
        self.clock.reset();
    }

    pub fn feed(&mut self, samples: &[Complex<f32>], out: &mut SinkOutput) {
        for &s in samples {
            let level = self.lowpass.filter(self.discri.discriminate(s));
            if !self.decoder.is_synced() {
                self.dc_level = self.dc.push(f64::from(level)) as f32;
            }
            // Logic 1 is the lower tone.
            if let Some(bit) = self.clock.feed(level < self.dc_level) {
                self.decoder.push_bit(bit, &mut self.messages);
            }
        }
        out.messages
            .extend(self.messages.drain(..).map(DecodedMessage::Pocsag));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::demod::tests::fm_modulate;
    use trx_core::DemodMode;

    use crate::dsp::tests::pocsag_bits;

    /// NRZ levels for `bits` at 38.4 kS/s: logic 1 is negative deviation.
    fn levels(bits: &[bool], baud: u32, offset: f32) -> Vec<f32> {
        let sps = 38_400 / baud as usize;
        bits.iter()
            .flat_map(|&b| std::iter::repeat(if b { -1.0 } else { 1.0 } + offset).take(sps))
            .collect()
    }

    fn decode(settings: &ChannelSettings, input: &[Complex<f32>]) -> Vec<DecodedMessage> {
        let mut sink = PagerSink::new(settings);
        let mut out = SinkOutput::default();
        for chunk in input.chunks(4_096) {
            sink.feed(chunk, &mut out);
        }
        out.messages
    }

    #[test]
    fn decodes_fsk_with_carrier_offset() {
        let settings = ChannelSettings::for_mode("pager", DemodMode::Pocsag);
        // 900 Hz of carrier error shows up as a 0.2 offset in the levels.
        let input = fm_modulate(&levels(&pocsag_bits(), 1_200, 0.2), 38_400.0, 4_500.0);
        let messages = decode(&settings, &input);
        assert_eq!(messages.len(), 1);
        let DecodedMessage::Pocsag(msg) = &messages[0] else {
            panic!("expected a pager message");
        };
        assert_eq!(msg.address, 1_234_560);
        assert_eq!(msg.alpha, "TRX");
        assert_eq!(msg.bch_errors, 0);
    }

    #[test]
    fn slow_rate_follows_settings() {
        let mut settings = ChannelSettings::for_mode("pager", DemodMode::Pocsag);
        settings.baud = 512;
        let input = fm_modulate(&levels(&pocsag_bits(), 512, 0.0), 38_400.0, 4_500.0);
        assert_eq!(decode(&settings, &input).len(), 1);
    }

    #[test]
    fn noise_free_carrier_yields_nothing() {
        let settings = ChannelSettings::for_mode("pager", DemodMode::Pocsag);
        let input = vec![Complex::new(0.5, 0.0); 38_400];
        assert!(decode(&settings, &input).is_empty());
    }
}

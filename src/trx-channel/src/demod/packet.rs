// SPDX-FileCopyrightText: 2026 Stanislaw Grams <stanislawgrams@gmail.com>
//
// SPDX-License-Identifier: BSD-2-Clause

use num_complex::Complex;
use trx_aprs::AprsDecoder;
use trx_core::decode::DecodedMessage;
use trx_core::ChannelSettings;
use trx_dsp::PhaseDiscriminator;

use super::{fm_scaling, DcBlocker, SinkOutput};

const DC_POLE: f32 = 0.999;

/// APRS: FM discriminator feeding the AFSK demodulators.
pub struct PacketSink {
    rate: u32,
    discri: PhaseDiscriminator,
    dc: DcBlocker,
    decoder: AprsDecoder,
    afsk: Vec<f32>,
}

impl PacketSink {
    pub fn new(settings: &ChannelSettings) -> Self {
        let rate = settings.mode.processing_rate();
        Self {
            rate,
            discri: PhaseDiscriminator::new(fm_scaling(rate, settings.deviation_hz())),
            dc: DcBlocker::new(DC_POLE),
            decoder: AprsDecoder::new(rate),
            afsk: Vec::new(),
        }
    }

    pub fn update(&mut self, settings: &ChannelSettings) {
        self.discri
            .set_fm_scaling(fm_scaling(self.rate, settings.deviation_hz()));
    }

    pub fn reset(&mut self) {
        self.discri.reset();
        self.dc.reset();
        self.decoder.reset();
    }

    pub fn feed(&mut self, samples: &[Complex<f32>], out: &mut SinkOutput) {
        self.afsk.clear();
        for &s in samples {
            let v = self.discri.discriminate(s);
            self.afsk.push(self.dc.process(v));
        }
        out.messages.extend(
            self.decoder
                .process_samples(&self.afsk)
                .into_iter()
                .map(DecodedMessage::Ax25),
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::demod::tests::fm_modulate;
    use std::f64::consts::TAU;
    use trx_core::hdlc::frame_bits;
    use trx_core::DemodMode;

    fn address(call: &str, ssid: u8, last: bool) -> Vec<u8> {
        let mut out: Vec<u8> = format!("{call:<6}").bytes().map(|b| b << 1).collect();
        out.push(0x60 | (ssid << 1) | u8::from(last));
        out
    }

    /// Bell 202 tones for `bits` at 38.4 kS/s; a zero toggles the tone.
    fn afsk(bits: &[bool]) -> Vec<f32> {
        let mut out = vec![0.0f32; 2_000];
        let (mut mark, mut phase) = (true, 0.0f64);
        for &bit in bits {
            if !bit {
                mark = !mark;
            }
            let freq = if mark { 1_200.0 } else { 2_200.0 };
            for _ in 0..32 {
                phase += TAU * freq / 38_400.0;
                out.push(0.6 * phase.sin() as f32);
            }
        }
        out.extend(std::iter::repeat(0.0).take(2_000));
        out
    }

    #[test]
    fn decodes_packet_off_the_air() {
        let mut frame = address("APRS", 0, false);
        frame.extend(address("SQ5XYZ", 7, true));
        frame.extend_from_slice(&[0x03, 0xF0]);
        frame.extend_from_slice(b">channel sink test");
        let mut bits = frame_bits(&frame, 20);
        bits.extend((0..24).map(|i| (0x7Eu8 >> (i % 8)) & 1 == 1));

        let settings = ChannelSettings::for_mode("aprs", DemodMode::Aprs);
        let mut sink = PacketSink::new(&settings);
        let mut out = SinkOutput::default();
        let input = fm_modulate(&afsk(&bits), 38_400.0, 5_000.0);
        for chunk in input.chunks(1_024) {
            sink.feed(chunk, &mut out);
        }
        assert_eq!(out.messages.len(), 1);
        let DecodedMessage::Ax25(pkt) = &out.messages[0] else {
            panic!("expected an AX.25 packet");
        };
        assert_eq!(pkt.src_call, "SQ5XYZ-7");
        assert_eq!(pkt.info, ">channel sink test");
    }
}

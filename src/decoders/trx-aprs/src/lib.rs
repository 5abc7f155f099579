// SPDX-FileCopyrightText: 2025 Stanislaw Grams <stanislawgrams@gmail.com>
//
// SPDX-License-Identifier: BSD-2-Clause

//! Bell 202 AFSK demodulator + AX.25/APRS decoder.
//!
//! Each demodulator mixes the audio with mark and space oscillators and
//! compares the energy of sliding-window integrals. Bits are sampled at a
//! fixed rate resynchronised on every tone change, NRZI decoded and passed
//! through the HDLC deframer. Two window lengths run in parallel and
//! duplicate frames are dropped.

use std::collections::VecDeque;

use num_complex::Complex;
use tracing::debug;
use trx_core::decode::Ax25Packet;
use trx_core::hdlc::{HdlcDeframer, NrziDecoder};
use trx_dsp::{FixedRateBitSync, Nco};

pub mod ax25;

pub use ax25::{parse_ax25, to_packet, Ax25Address, Ax25Frame};

pub const SAMPLE_RATE: u32 = 38_400;
pub const BAUD: f64 = 1_200.0;
pub const MARK_HZ: f64 = 1_200.0;
pub const SPACE_HZ: f64 = 2_200.0;

/// Frame bounds including the FCS.
const MIN_FRAME_BYTES: usize = 17;
const MAX_FRAME_BYTES: usize = 340;
/// Below this RMS over one gate window the demodulator state is cleared.
const ENERGY_GATE_RMS: f32 = 0.001;
const ENERGY_GATE_SECONDS: f64 = 0.05;
/// Window lengths, in bit periods, of the parallel demodulators.
const WINDOW_FACTORS: [f64; 2] = [1.0, 0.5];
/// The same frame from another demodulator within this many seconds is a
/// duplicate.
const DEDUP_SECONDS: f64 = 1.0;

#[derive(Debug, Clone)]
struct Demodulator {
    // Energy gate
    energy_acc: f32,
    energy_count: usize,
    energy_window: usize,

    mark: Nco,
    space: Nco,

    // Sliding-window correlation filter
    mark_buf: Vec<Complex<f32>>,
    space_buf: Vec<Complex<f32>>,
    corr_idx: usize,
    mark_sum: Complex<f32>,
    space_sum: Complex<f32>,

    clock: FixedRateBitSync,
    nrzi: NrziDecoder,
    hdlc: HdlcDeframer,
}

impl Demodulator {
    fn new(sample_rate: u32, window_factor: f64) -> Self {
        let sr = f64::from(sample_rate);
        let samples_per_bit = sr / BAUD;
        let corr_len = (samples_per_bit * window_factor).round().max(2.0) as usize;
        let mut mark = Nco::new();
        mark.set_freq(MARK_HZ, sr);
        let mut space = Nco::new();
        space.set_freq(SPACE_HZ, sr);

        Self {
            energy_acc: 0.0,
            energy_count: 0,
            energy_window: (sr * ENERGY_GATE_SECONDS).round().max(1.0) as usize,
            mark,
            space,
            mark_buf: vec![Complex::default(); corr_len],
            space_buf: vec![Complex::default(); corr_len],
            corr_idx: 0,
            mark_sum: Complex::default(),
            space_sum: Complex::default(),
            clock: FixedRateBitSync::new(samples_per_bit as f32),
            nrzi: NrziDecoder::default(),
            hdlc: HdlcDeframer::new(MIN_FRAME_BYTES, MAX_FRAME_BYTES),
        }
    }

    fn reset_state(&mut self) {
        self.mark.reset();
        self.space.reset();
        self.mark_buf.fill(Complex::default());
        self.space_buf.fill(Complex::default());
        self.corr_idx = 0;
        self.mark_sum = Complex::default();
        self.space_sum = Complex::default();
        self.clock.reset();
        self.nrzi.reset();
        self.hdlc.reset();
    }

    fn process_sample(&mut self, s: f32) -> Option<Vec<u8>> {
        self.energy_acc += s * s;
        self.energy_count += 1;
        if self.energy_count >= self.energy_window {
            let rms = (self.energy_acc / self.energy_count as f32).sqrt();
            if rms < ENERGY_GATE_RMS {
                self.reset_state();
            }
            self.energy_acc = 0.0;
            self.energy_count = 0;
        }

        let m = self.mark.next_iq() * s;
        let sp = self.space.next_iq() * s;

        let idx = self.corr_idx;
        self.mark_sum += m - self.mark_buf[idx];
        self.space_sum += sp - self.space_buf[idx];
        self.mark_buf[idx] = m;
        self.space_buf[idx] = sp;
        self.corr_idx = (idx + 1) % self.mark_buf.len();

        let level = self.mark_sum.norm_sqr() > self.space_sum.norm_sqr();
        let bit = self.clock.feed(level)?;
        self.hdlc.push_bit(self.nrzi.decode(bit))
    }
}

#[derive(Debug, Clone)]
pub struct AprsDecoder {
    sample_rate: u32,
    demodulators: Vec<Demodulator>,
    /// Recently emitted frames with the sample count they were seen at.
    recent: VecDeque<(u64, Vec<u8>)>,
    samples: u64,
    dedup_window: u64,
}

impl AprsDecoder {
    pub fn new(sample_rate: u32) -> Self {
        let sample_rate = sample_rate.max(SAMPLE_RATE / 4);
        Self {
            sample_rate,
            demodulators: WINDOW_FACTORS
                .iter()
                .map(|&w| Demodulator::new(sample_rate, w))
                .collect(),
            recent: VecDeque::new(),
            samples: 0,
            dedup_window: (f64::from(sample_rate) * DEDUP_SECONDS) as u64,
        }
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Frames rejected by the FCS check, summed over the demodulators.
    pub fn crc_failures(&self) -> u64 {
        self.demodulators.iter().map(|d| d.hdlc.crc_failures()).sum()
    }

    fn is_duplicate(&mut self, frame: &[u8]) -> bool {
        let horizon = self.samples.saturating_sub(self.dedup_window);
        while self.recent.front().is_some_and(|(at, _)| *at < horizon) {
            self.recent.pop_front();
        }
        if self.recent.iter().any(|(_, f)| f == frame) {
            return true;
        }
        self.recent.push_back((self.samples, frame.to_vec()));
        false
    }

    pub fn process_samples(&mut self, samples: &[f32]) -> Vec<Ax25Packet> {
        let mut results = Vec::new();
        for &s in samples {
            self.samples += 1;
            for i in 0..self.demodulators.len() {
                let Some(frame) = self.demodulators[i].process_sample(s) else {
                    continue;
                };
                if self.is_duplicate(&frame) {
                    continue;
                }
                match parse_ax25(&frame) {
                    Some(ax25) => {
                        let pkt = to_packet(&ax25);
                        debug!("AX.25 {} > {} ({} bytes)", pkt.src_call, pkt.dest_call, frame.len());
                        results.push(pkt);
                    }
                    None => debug!("AX.25 frame with malformed address field dropped"),
                }
            }
        }
        results
    }

    pub fn reset(&mut self) {
        for demod in &mut self.demodulators {
            demod.reset_state();
            demod.energy_acc = 0.0;
            demod.energy_count = 0;
        }
        self.recent.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ax25::tests::ui_frame;
    use trx_core::hdlc::frame_bits;

    /// Phase-continuous AFSK: a zero toggles the tone, a one keeps it.
    fn afsk(bits: &[bool], amplitude: f32) -> Vec<f32> {
        let rate = f64::from(SAMPLE_RATE);
        let spb = rate / BAUD;
        let mut out = vec![0.0f32; 2_000];
        let mut mark = true;
        let mut phase = 0.0f64;
        let mut t = 0.0f64;
        for &bit in bits {
            if !bit {
                mark = !mark;
            }
            let freq = if mark { MARK_HZ } else { SPACE_HZ };
            t += spb;
            while ((out.len() - 2_000) as f64) < t.floor() {
                phase += std::f64::consts::TAU * freq / rate;
                out.push(amplitude * phase.sin() as f32);
            }
        }
        out.extend(std::iter::repeat(0.0).take(2_000));
        out
    }

    fn transmission(payload: &[u8]) -> Vec<f32> {
        let mut bits = frame_bits(payload, 20);
        bits.extend((0..24).map(|i| (0x7Eu8 >> (i % 8)) & 1 == 1));
        afsk(&bits, 0.5)
    }

    #[test]
    fn decodes_position_packet_once() {
        let mut decoder = AprsDecoder::new(SAMPLE_RATE);
        let pkts = decoder.process_samples(&transmission(&ui_frame(b"!5213.78N/02100.73E-PHG2360")));
        assert_eq!(pkts.len(), 1);
        assert_eq!(pkts[0].src_call, "SP5ABC-9");
        assert_eq!(pkts[0].path, "WIDE1-1*,WIDE2-1");
        assert_eq!(pkts[0].packet_type, "Position");
        assert!(pkts[0].lat.is_some());
    }

    #[test]
    fn decodes_across_buffer_boundaries() {
        let mut decoder = AprsDecoder::new(SAMPLE_RATE);
        let samples = transmission(&ui_frame(b">split buffers"));
        let pkts: Vec<Ax25Packet> = samples
            .chunks(333)
            .flat_map(|c| decoder.process_samples(c))
            .collect();
        assert_eq!(pkts.len(), 1);
        assert_eq!(pkts[0].info, ">split buffers");
    }

    #[test]
    fn repeated_transmission_after_window_is_reported_again() {
        let mut decoder = AprsDecoder::new(SAMPLE_RATE);
        let tx = transmission(&ui_frame(b">beacon"));
        let mut samples = tx.clone();
        samples.extend(std::iter::repeat(0.0).take(SAMPLE_RATE as usize * 2));
        samples.extend(tx);
        assert_eq!(decoder.process_samples(&samples).len(), 2);
    }

    #[test]
    fn silence_yields_nothing() {
        let mut decoder = AprsDecoder::new(SAMPLE_RATE);
        assert!(decoder.process_samples(&vec![0.0; 40_000]).is_empty());
        assert_eq!(decoder.crc_failures(), 0);
    }
}

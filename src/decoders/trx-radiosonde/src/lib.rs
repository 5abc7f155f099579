// SPDX-FileCopyrightText: 2026 Stanislaw Grams <stanislawgrams@gmail.com>
//
// SPDX-License-Identifier: BSD-2-Clause

//! Vaisala RS41 radiosonde decoder.
//!
//! Input is the FM discriminator output at 57.6 kS/s, scaled so full
//! deviation is ±1. Samples are Gaussian filtered and buffered until a
//! whole frame fits behind the oldest one; the alternating preamble is
//! found by correlation, symbols are sliced from there and the scrambled
//! header is searched bit by bit before the frame is collected.

use tracing::{debug, warn};
use trx_core::decode::RadiosondeFrame;
use trx_core::math::reed_solomon::ReedSolomon;
use trx_dsp::filter::gaussian_taps;
use trx_dsp::{gaussian_training, CorrelatorConfig, CorrelatorSync, FirFilter};

pub mod frame;
pub mod geo;

pub use frame::{
    blocks, correct, crcs_ok, descramble, frame_len, parse, Block, FRAME_LEN_EXT, FRAME_LEN_STD,
};

use frame::{DESCRAMBLE, HEADER, HEADER_BITS, OFFSET_FRAME_TYPE};

pub const SAMPLE_RATE: u32 = 57_600;
pub const DEFAULT_BAUD: u32 = 4_800;
pub const DEFAULT_CORRELATION_THRESHOLD: f32 = 450.0;

const PULSE_BT: f32 = 0.5;
const PULSE_SPAN: usize = 3;
/// Part of the 320-bit preamble used for correlation; the rest settles AGC.
const TRAINING_BITS: usize = 200;
/// Ring length in bytes: preamble plus the extended frame.
const MAX_BYTES: usize = 600;
/// Give up on an alignment when no header appears within this many bytes.
const HEADER_SEARCH_BYTES: usize = 16;

#[derive(Debug, Clone)]
pub struct Rs41Decoder {
    baud: u32,
    sps: usize,
    pulse: FirFilter<f32>,
    sync: CorrelatorSync,
    rs: ReedSolomon,
    bytes: Vec<u8>,
    frames: u64,
    failures: u64,
}

impl Rs41Decoder {
    pub fn new(baud: u32, correlation_threshold: f32) -> Self {
        let baud = if (1..=SAMPLE_RATE / 2).contains(&baud) {
            baud
        } else {
            warn!("RS41 baud {} out of range, using {}", baud, DEFAULT_BAUD);
            DEFAULT_BAUD
        };
        let sps = (SAMPLE_RATE / baud) as usize;
        let preamble: Vec<f32> = (0..TRAINING_BITS)
            .map(|i| if i & 1 == 1 { 1.0 } else { -1.0 })
            .collect();
        let sync = CorrelatorSync::new(CorrelatorConfig {
            samples_per_symbol: sps,
            training: gaussian_training(PULSE_BT, PULSE_SPAN, sps, &preamble, true),
            threshold: correlation_threshold,
            buffer_len: MAX_BYTES * 8 * sps,
            refine: true,
            start_adjust: 0,
        });
        Self {
            baud,
            sps,
            pulse: FirFilter::new(gaussian_taps(PULSE_BT, PULSE_SPAN, sps)),
            sync,
            rs: ReedSolomon::new(24, 0),
            bytes: Vec::with_capacity(FRAME_LEN_EXT),
            frames: 0,
            failures: 0,
        }
    }

    pub fn baud(&self) -> u32 {
        self.baud
    }

    pub fn set_threshold(&mut self, threshold: f32) {
        self.sync.set_threshold(threshold);
    }

    /// Frames that passed Reed-Solomon and every block CRC.
    pub fn frames_decoded(&self) -> u64 {
        self.frames
    }

    /// Complete frames rejected by Reed-Solomon or a block CRC.
    pub fn frames_failed(&self) -> u64 {
        self.failures
    }

    pub fn reset(&mut self) {
        self.pulse.reset();
        self.sync.reset();
        self.bytes.clear();
    }

    /// Feed one discriminator sample.
    pub fn process_sample(&mut self, level: f32) -> Option<RadiosondeFrame> {
        let filtered = self.pulse.filter(level);
        let alignment = self.sync.push(filtered)?;

        let header_limit = HEADER_SEARCH_BYTES * 8 * self.sps;
        let mut bits = 0u64;
        let mut bit_count = 0u32;
        let mut in_frame = false;
        let mut complete = None;
        self.bytes.clear();

        for (sample_idx, bit) in self.sync.symbols(&alignment) {
            bits |= u64::from(bit) << bit_count;
            bit_count += 1;

            if in_frame {
                if bit_count < 8 {
                    continue;
                }
                self.bytes.push(bits as u8);
                bits = 0;
                bit_count = 0;
                if self.bytes.len() >= FRAME_LEN_STD {
                    let frame_type = self.bytes[OFFSET_FRAME_TYPE] ^ DESCRAMBLE[OFFSET_FRAME_TYPE];
                    if self.bytes.len() == frame_len(frame_type) {
                        complete = Some(sample_idx);
                        break;
                    }
                }
            } else if bits == HEADER_BITS {
                in_frame = true;
                self.bytes.extend_from_slice(&HEADER);
                bits = 0;
                bit_count = 0;
            } else {
                if bit_count == 64 {
                    bits >>= 1;
                    bit_count -= 1;
                }
                if sample_idx >= header_limit {
                    break;
                }
            }
        }

        let consumed = complete?;
        self.process_frame(alignment.correlation, consumed)
    }

    fn process_frame(&mut self, correlation: f32, consumed: usize) -> Option<RadiosondeFrame> {
        // Skip the frame whether or not it decodes so it is not matched again.
        self.sync.consume(consumed);
        descramble(&mut self.bytes);
        let corrected = match correct(&self.rs, &mut self.bytes) {
            Ok(n) => n,
            Err(e) => {
                debug!("RS41 frame rejected: {}", e);
                self.failures += 1;
                return None;
            }
        };
        if !crcs_ok(&self.bytes) {
            debug!("RS41 frame rejected: block CRC");
            self.failures += 1;
            return None;
        }

        self.frames += 1;
        let parsed = parse(&self.bytes, corrected);
        debug!(
            "RS41 frame {:?} from {:?}, {} bytes, {} corrected, correlation {:.0}",
            parsed.frame_number,
            parsed.serial,
            parsed.frame_len,
            corrected,
            correlation
        );
        Some(parsed)
    }
}

impl Default for Rs41Decoder {
    fn default() -> Self {
        Self::new(DEFAULT_BAUD, DEFAULT_CORRELATION_THRESHOLD)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frame::tests::{check_sample_fields, sample_frame};

    const SPS: usize = (SAMPLE_RATE / DEFAULT_BAUD) as usize;

    /// Discriminator output for a scrambled frame behind a 320-bit
    /// alternating preamble, with rectangular symbols at full deviation.
    fn waveform(on_air: &[u8], dc: f32) -> Vec<f32> {
        let mut bits: Vec<bool> = (0..320).map(|i| i & 1 == 0).collect();
        for &b in on_air {
            bits.extend((0..8).map(|k| (b >> k) & 1 == 1));
        }
        let mut levels = vec![dc; 500];
        levels.extend(
            bits.iter()
                .flat_map(|&b| std::iter::repeat(if b { 1.0 } else { -1.0 }).take(SPS))
                .map(|l| l + dc),
        );
        levels.extend(std::iter::repeat(dc).take(MAX_BYTES * 8 * SPS));
        levels
    }

    fn on_air(frame: &[u8]) -> Vec<u8> {
        let mut bytes = frame.to_vec();
        descramble(&mut bytes);
        bytes
    }

    fn run(decoder: &mut Rs41Decoder, samples: &[f32]) -> Vec<RadiosondeFrame> {
        samples
            .iter()
            .filter_map(|&s| decoder.process_sample(s))
            .collect()
    }

    #[test]
    fn decodes_frame_with_dc_offset() {
        let mut decoder = Rs41Decoder::default();
        let frames = run(&mut decoder, &waveform(&on_air(&sample_frame()), 0.1));
        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0].rs_corrected, 0);
        check_sample_fields(&frames[0]);
        assert_eq!(decoder.frames_decoded(), 1);
    }

    #[test]
    fn corrects_byte_errors_on_air() {
        let mut bytes = on_air(&sample_frame());
        for at in [0x40, 0x41, 0x77, 0x100] {
            bytes[at] ^= 0xA5;
        }
        let mut decoder = Rs41Decoder::default();
        let frames = run(&mut decoder, &waveform(&bytes, 0.0));
        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0].rs_corrected, 4);
        check_sample_fields(&frames[0]);
    }

    #[test]
    fn uncorrectable_frame_counts_one_failure() {
        let mut bytes = on_air(&sample_frame());
        // 13 errors in the first interleaved codeword, one past what it can
        // fix. The frame type byte stays intact so the length is known.
        for j in 1..14 {
            bytes[OFFSET_FRAME_TYPE + 2 * j] ^= 0x5A;
        }
        let mut decoder = Rs41Decoder::default();
        assert!(run(&mut decoder, &waveform(&bytes, 0.0)).is_empty());
        assert_eq!(decoder.frames_failed(), 1);
        assert_eq!(decoder.frames_decoded(), 0);
    }

    #[test]
    fn clean_frame_decodes_once() {
        let mut decoder = Rs41Decoder::default();
        let samples = waveform(&on_air(&sample_frame()), 0.0);
        assert_eq!(run(&mut decoder, &samples).len(), 1);
        assert_eq!(decoder.frames_decoded(), 1);
        assert_eq!(decoder.frames_failed(), 0);
    }

    #[test]
    fn silence_yields_nothing() {
        let mut decoder = Rs41Decoder::default();
        assert!(run(&mut decoder, &vec![0.0; 2 * MAX_BYTES * 8 * SPS]).is_empty());
        assert_eq!(decoder.frames_failed(), 0);
    }

    #[test]
    fn bad_baud_falls_back() {
        assert_eq!(Rs41Decoder::new(0, 450.0).baud(), DEFAULT_BAUD);
        assert_eq!(Rs41Decoder::new(2_400, 450.0).baud(), 2_400);
    }
}

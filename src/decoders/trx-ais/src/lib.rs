// SPDX-FileCopyrightText: 2026 Stanislaw Grams <stanislawgrams@gmail.com>
//
// SPDX-License-Identifier: BSD-2-Clause

//! AIS GMSK decoder.
//!
//! Takes FM discriminator output at 57.6 kS/s. The 24-bit preamble is
//! located by correlating against its Gaussian-filtered NRZI waveform; the
//! symbols after it are NRZI decoded and HDLC deframed, and a frame with a
//! valid CRC is parsed into an [`AisMessage`].

use tracing::{debug, warn};
use trx_core::decode::AisMessage;
use trx_core::hdlc::{HdlcDeframer, NrziDecoder};
use trx_dsp::filter::gaussian_taps;
use trx_dsp::{gaussian_training, CorrelatorConfig, CorrelatorSync, FirFilter};

pub mod message;

pub use message::{parse_message, payload_hex};

pub const SAMPLE_RATE: u32 = 57_600;
pub const DEFAULT_BAUD: u32 = 9_600;
pub const DEFAULT_CORRELATION_THRESHOLD: f32 = 30.0;

const PULSE_BT: f32 = 0.5;
const PULSE_SPAN: usize = 3;
/// Line levels of the alternating preamble after NRZI coding.
const TRAINING_NRZ: [u8; 24] = [1, 0, 0, 1, 1, 0, 0, 1, 1, 0, 0, 1, 1, 0, 0, 1, 1, 0, 0, 1, 1, 0, 0, 1];
/// Longest frame including the CRC.
const MAX_BYTES: usize = 134;
const MIN_BYTES: usize = 6;
/// Symbols to wait for the start flag after the preamble match.
const START_SEARCH_SYMBOLS: usize = 16;
/// Slice a little past three quarters of the training window.
const START_ADJUST: isize = 4;

#[derive(Debug, Clone)]
pub struct AisDecoder {
    baud: u32,
    sps: usize,
    pulse: FirFilter<f32>,
    sync: CorrelatorSync,
    hdlc: HdlcDeframer,
    messages: u64,
}

impl AisDecoder {
    pub fn new(baud: u32, correlation_threshold: f32) -> Self {
        let baud = if (1..=SAMPLE_RATE / 2).contains(&baud) {
            baud
        } else {
            warn!("AIS baud {} out of range, using {}", baud, DEFAULT_BAUD);
            DEFAULT_BAUD
        };
        let sps = (SAMPLE_RATE / baud) as usize;
        let levels: Vec<f32> = TRAINING_NRZ
            .iter()
            .map(|&l| f32::from(l) * 2.0 - 1.0)
            .collect();
        Self {
            baud,
            sps,
            pulse: FirFilter::new(gaussian_taps(PULSE_BT, PULSE_SPAN, sps)),
            sync: CorrelatorSync::new(CorrelatorConfig {
                samples_per_symbol: sps,
                training: gaussian_training(PULSE_BT, PULSE_SPAN, sps, &levels, false),
                threshold: correlation_threshold,
                buffer_len: MAX_BYTES * 8 * sps,
                refine: false,
                start_adjust: START_ADJUST,
            }),
            hdlc: HdlcDeframer::new(MIN_BYTES, MAX_BYTES),
            messages: 0,
        }
    }

    pub fn baud(&self) -> u32 {
        self.baud
    }

    pub fn set_threshold(&mut self, threshold: f32) {
        self.sync.set_threshold(threshold);
    }

    pub fn messages_decoded(&self) -> u64 {
        self.messages
    }

    /// Frames whose CRC did not match.
    pub fn crc_failures(&self) -> u64 {
        self.hdlc.crc_failures()
    }

    pub fn reset(&mut self) {
        self.pulse.reset();
        self.sync.reset();
        self.hdlc.reset();
    }

    /// Feed one discriminator sample.
    pub fn process_sample(&mut self, level: f32) -> Option<AisMessage> {
        let filtered = self.pulse.filter(level);
        let alignment = self.sync.push(filtered)?;

        let start_limit = START_SEARCH_SYMBOLS * self.sps;
        let failures = self.hdlc.crc_failures();
        let mut nrzi = NrziDecoder::default();
        let mut started = false;
        let mut found = None;
        let mut rejected_at = None;
        self.hdlc.reset();

        for (sample_idx, symbol) in self.sync.symbols(&alignment) {
            if let Some(frame) = self.hdlc.push_bit(nrzi.decode(symbol)) {
                found = Some((sample_idx, frame));
                break;
            }
            if self.hdlc.crc_failures() != failures {
                rejected_at = Some(sample_idx);
                break;
            }
            if self.hdlc.in_frame() {
                started = true;
            } else if started || sample_idx >= start_limit {
                break;
            }
        }

        if let Some(consumed) = rejected_at {
            debug!(
                "AIS frame rejected: CRC (correlation {:.1})",
                alignment.correlation
            );
            self.sync.consume(consumed);
            return None;
        }
        let (consumed, frame) = found?;
        // Skip the decoded frame so it is not matched again.
        self.sync.consume(consumed);
        let msg = parse_message(&frame)?;
        self.messages += 1;
        debug!(
            "AIS type {} from {} ({} bytes, correlation {:.1})",
            msg.message_type,
            msg.mmsi,
            frame.len(),
            alignment.correlation
        );
        Some(msg)
    }
}

impl Default for AisDecoder {
    fn default() -> Self {
        Self::new(DEFAULT_BAUD, DEFAULT_CORRELATION_THRESHOLD)
    }
}

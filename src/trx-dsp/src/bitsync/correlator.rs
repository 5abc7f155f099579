// SPDX-FileCopyrightText: 2026 Stanislaw Grams <stanislawgrams@gmail.com>
//
// SPDX-License-Identifier: BSD-2-Clause

use crate::filter::{gaussian_taps, FirFilter};

/// Filtered samples are clipped before buffering so that noise bursts
/// cannot dominate the correlation. The bound leaves room for DC offset.
const CLIP: f32 = 1.4;

#[derive(Debug, Clone)]
pub struct CorrelatorConfig {
    pub samples_per_symbol: usize,
    /// Expected filtered waveform of the preamble.
    pub training: Vec<f32>,
    /// Minimum `|correlation|` to attempt a decode.
    pub threshold: f32,
    /// Ring length in samples, at least one maximum-length frame.
    pub buffer_len: usize,
    /// Step forward from the first hit while the correlation keeps rising.
    pub refine: bool,
    /// Samples added to the first symbol centre after three quarters of
    /// the training window.
    pub start_adjust: isize,
}

/// Where a frame candidate starts in the ring.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Alignment {
    pub correlation: f32,
    /// Refinement steps taken past the oldest buffered sample.
    pub offset: usize,
    /// Ring index of the first symbol centre.
    pub start: usize,
    /// Mean level over the matched training window.
    pub dc_offset: f32,
}

/// Training-sequence correlator over a ring of filtered samples.
///
/// Nothing is evaluated until the ring holds `buffer_len` samples, so a
/// candidate always has a whole frame behind it. Each new sample tests the
/// training window starting at the oldest buffered sample.
#[derive(Debug, Clone)]
pub struct CorrelatorSync {
    sps: usize,
    training: Vec<f32>,
    threshold: f32,
    refine: bool,
    start_adjust: isize,
    buf: Vec<f32>,
    idx: usize,
    count: usize,
}

impl CorrelatorSync {
    pub fn new(config: CorrelatorConfig) -> Self {
        let sps = config.samples_per_symbol.max(1);
        let training = if config.training.is_empty() {
            vec![1.0]
        } else {
            config.training
        };
        let buffer_len = config.buffer_len.max(training.len() + 2 * sps);
        Self {
            sps,
            training,
            threshold: config.threshold,
            refine: config.refine,
            start_adjust: config.start_adjust,
            buf: vec![0.0; buffer_len],
            idx: 0,
            count: 0,
        }
    }

    pub fn samples_per_symbol(&self) -> usize {
        self.sps
    }

    pub fn buffer_len(&self) -> usize {
        self.buf.len()
    }

    pub fn set_threshold(&mut self, threshold: f32) {
        self.threshold = threshold;
    }

    pub fn reset(&mut self) {
        self.buf.fill(0.0);
        self.idx = 0;
        self.count = 0;
    }

    fn correlate(&self, start: usize) -> f32 {
        let len = self.buf.len();
        self.training
            .iter()
            .enumerate()
            .map(|(i, &t)| t * self.buf[(start + i) % len])
            .sum()
    }

    /// Buffer one filtered sample and test for a training match.
    pub fn push(&mut self, sample: f32) -> Option<Alignment> {
        let len = self.buf.len();
        self.buf[self.idx] = sample.clamp(-CLIP, CLIP);
        self.idx = (self.idx + 1) % len;
        self.count = (self.count + 1).min(len);
        if self.count < len {
            return None;
        }

        let mut correlation = self.correlate(self.idx);
        if correlation.abs() < self.threshold {
            return None;
        }

        let mut offset = 0;
        if self.refine {
            let limit = len - self.training.len();
            while offset < limit {
                let next = self.correlate(self.idx + offset + 1);
                if next.abs() <= correlation.abs() {
                    break;
                }
                correlation = next;
                offset += 1;
            }
        }

        let window = self.training.len();
        let sum: f32 = (0..window)
            .map(|i| self.buf[(self.idx + offset + i) % len])
            .sum();
        let dc_offset = sum / window as f32;
        let start = (self.idx + offset + window * 3 / 4) as isize + self.start_adjust;

        Some(Alignment {
            correlation,
            offset,
            start: start.rem_euclid(len as isize) as usize,
            dc_offset,
        })
    }

    /// Slice symbols from `alignment` onwards. Each item is the sample
    /// distance from the first symbol and the decided bit; three samples
    /// around every centre are summed after DC removal.
    pub fn symbols(&self, alignment: &Alignment) -> impl Iterator<Item = (usize, bool)> + '_ {
        let len = self.buf.len();
        let dc = alignment.dc_offset;
        let start = alignment.start;
        (0..len).step_by(self.sps).map(move |sample_idx| {
            let x = start + sample_idx + len;
            let sum: f32 = (0..3).map(|i| self.buf[(x - 1 + i) % len] - dc).sum();
            (sample_idx, sum >= 0.0)
        })
    }

    /// Drop `samples` from the evaluation count so a decoded frame is not
    /// matched again; correlation resumes once they are replaced.
    pub fn consume(&mut self, samples: usize) {
        self.count = self.count.saturating_sub(samples);
    }
}

/// Expected filter output for a known symbol sequence, as seen through the
/// same Gaussian pulse shaping as the received signal. The filter is primed
/// with one symbol of each polarity first.
pub fn gaussian_training(
    bt: f32,
    span: usize,
    samples_per_symbol: usize,
    symbols: &[f32],
    negate: bool,
) -> Vec<f32> {
    let sps = samples_per_symbol.max(1);
    let mut shape = FirFilter::<f32>::new(gaussian_taps(bt, span, sps));
    for _ in 0..sps {
        shape.filter(-1.0);
    }
    for _ in 0..sps {
        shape.filter(1.0);
    }
    let sign = if negate { -1.0 } else { 1.0 };
    symbols
        .iter()
        .flat_map(|&s| std::iter::repeat(s).take(sps))
        .map(|s| sign * shape.filter(s))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    const SPS: usize = 12;

    fn alternating(n: usize) -> Vec<f32> {
        (0..n).map(|i| if i & 1 == 1 { 1.0 } else { -1.0 }).collect()
    }

    fn payload() -> Vec<bool> {
        (0..64u32).map(|i| (0x9E37_79B9u32.rotate_left(i) & 1) == 1).collect()
    }

    /// Silence, a 48 symbol alternating preamble, the payload, silence.
    fn waveform(dc: f32) -> Vec<f32> {
        let mut levels = vec![0.0f32; 100];
        levels.extend(alternating(48));
        levels.extend(payload().iter().map(|&b| if b { 1.0 } else { -1.0 }));
        levels.extend(std::iter::repeat(0.0).take(400));
        let mut shape = FirFilter::<f32>::new(gaussian_taps(0.5, 3, SPS));
        levels
            .iter()
            .flat_map(|&l| std::iter::repeat(l).take(SPS))
            .map(|l| shape.filter(l) + dc)
            .collect()
    }

    fn sync(training: Vec<f32>) -> CorrelatorSync {
        let peak: f32 = training.iter().map(|t| t * t).sum();
        CorrelatorSync::new(CorrelatorConfig {
            samples_per_symbol: SPS,
            training,
            threshold: 0.7 * peak,
            buffer_len: 300 * SPS,
            refine: true,
            start_adjust: 0,
        })
    }

    fn contains(haystack: &[bool], needle: &[bool]) -> bool {
        haystack.windows(needle.len()).any(|w| w == needle)
    }

    #[test]
    fn training_has_symbol_length() {
        let training = gaussian_training(0.5, 3, SPS, &alternating(40), true);
        assert_eq!(training.len(), 40 * SPS);
        assert!(training.iter().all(|t| t.abs() <= 1.0 + 1e-6));
    }

    #[test]
    fn aligns_on_preamble_and_slices_payload() {
        let mut sync = sync(gaussian_training(0.5, 3, SPS, &alternating(40), false));
        let mut found = None;
        for s in waveform(0.1) {
            if let Some(a) = sync.push(s) {
                found = Some(a);
                break;
            }
        }
        let alignment = found.expect("preamble not found");
        assert!((alignment.dc_offset - 0.1).abs() < 0.05, "dc {}", alignment.dc_offset);

        let bits: Vec<bool> = sync.symbols(&alignment).map(|(_, b)| b).collect();
        assert!(contains(&bits, &payload()));
    }

    #[test]
    fn consume_holds_off_reevaluation() {
        let mut sync = sync(gaussian_training(0.5, 3, SPS, &alternating(40), false));
        let mut samples = waveform(0.0).into_iter();
        for s in samples.by_ref() {
            if sync.push(s).is_some() {
                break;
            }
        }
        sync.consume(100 * SPS);
        for s in samples.by_ref().take(100 * SPS - 1) {
            assert!(sync.push(s).is_none());
        }
    }

    #[test]
    fn silence_never_aligns() {
        let mut sync = sync(gaussian_training(0.5, 3, SPS, &alternating(40), false));
        for _ in 0..2 * sync.buffer_len() {
            assert!(sync.push(0.0).is_none());
        }
    }
}

// SPDX-FileCopyrightText: 2026 Stanislaw Grams <stanislawgrams@gmail.com>
//
// SPDX-License-Identifier: BSD-2-Clause

//! Polyphase rational resampler.
//!
//! [`Interpolator`] holds the polyphase low-pass and its delay line; the
//! caller owns the fractional distance accumulator. [`Resampler`] bundles
//! both for the common case of a fixed input/output rate pair.

use std::f64::consts::PI;

use tracing::debug;

use crate::filter::Window;
use crate::Sample;

const MIN_TAPS_PER_PHASE: usize = 8;
const MAX_TAPS_PER_PHASE: usize = 512;

#[derive(Debug, Clone, PartialEq)]
struct InterpolatorParams {
    phases: usize,
    input_rate: f64,
    cutoff_hz: f64,
}

#[derive(Debug, Clone)]
pub struct Interpolator<T: Sample> {
    params: Option<InterpolatorParams>,
    phases: usize,
    taps_per_phase: usize,
    /// `phases` rows of `taps_per_phase` taps; row `p` applies to output
    /// position `p / phases` past the newest input.
    taps: Vec<f32>,
    /// Delay line written twice so every window is contiguous.
    samples: Vec<T>,
    ptr: usize,
}

impl<T: Sample> Default for Interpolator<T> {
    fn default() -> Self {
        Self {
            params: None,
            phases: 1,
            taps_per_phase: 1,
            taps: vec![1.0],
            samples: vec![T::default(); 2],
            ptr: 0,
        }
    }
}

impl<T: Sample> Interpolator<T> {
    pub fn new(phases: usize, input_rate: f64, cutoff_hz: f64) -> Self {
        let mut interpolator = Self::default();
        interpolator.create(phases, input_rate, cutoff_hz, true);
        interpolator
    }

    /// Build the polyphase filter for `cutoff_hz` at `input_rate`.
    ///
    /// A call with unchanged parameters is a no-op unless `force` is set;
    /// any rebuild clears the delay line.
    pub fn create(&mut self, phases: usize, input_rate: f64, cutoff_hz: f64, force: bool) {
        let params = InterpolatorParams {
            phases: phases.max(1),
            input_rate: input_rate.max(1.0),
            cutoff_hz: cutoff_hz.clamp(1.0, input_rate.max(2.0) / 2.0),
        };
        if !force && self.params.as_ref() == Some(&params) {
            return;
        }

        let phases = params.phases;
        // Four input periods of the cutoff per phase.
        let tpp = ((4.0 * params.input_rate / params.cutoff_hz).ceil() as usize)
            .clamp(MIN_TAPS_PER_PHASE, MAX_TAPS_PER_PHASE);
        let total = phases * tpp;
        let fc = params.cutoff_hz / (params.input_rate * phases as f64);
        let mid = (total - 1) as f64 / 2.0;
        let prototype: Vec<f64> = (0..total)
            .map(|i| {
                let x = i as f64 - mid;
                let sinc = if x == 0.0 {
                    2.0 * fc
                } else {
                    (2.0 * PI * fc * x).sin() / (PI * x)
                };
                sinc * f64::from(Window::Blackman.coefficient(i, total))
            })
            .collect();

        let mut taps = vec![0.0f32; total];
        for p in 0..phases {
            let row = &mut taps[p * tpp..(p + 1) * tpp];
            for (j, tap) in row.iter_mut().enumerate() {
                *tap = prototype[p + j * phases] as f32;
            }
            let sum: f32 = row.iter().sum();
            if sum.abs() > 1e-12 {
                for tap in row.iter_mut() {
                    *tap /= sum;
                }
            }
        }

        self.phases = phases;
        self.taps_per_phase = tpp;
        self.taps = taps;
        self.samples = vec![T::default(); 2 * tpp];
        self.ptr = 0;
        self.params = Some(params);
    }

    #[inline]
    fn advance_filter(&mut self, next: T) {
        let n = self.taps_per_phase;
        self.ptr = (self.ptr + 1) % n;
        self.samples[self.ptr] = next;
        self.samples[self.ptr + n] = next;
    }

    #[inline]
    fn filter_at(&self, distance: f32) -> T {
        let phase = ((distance.max(0.0) * self.phases as f32) as usize).min(self.phases - 1);
        let n = self.taps_per_phase;
        let row = &self.taps[phase * n..(phase + 1) * n];
        // Newest sample at ptr + n, oldest at ptr + 1.
        let window = &self.samples[self.ptr + 1..self.ptr + n + 1];
        let mut acc = T::default();
        for (tap, &sample) in row.iter().zip(window.iter().rev()) {
            acc = acc + sample * *tap;
        }
        acc
    }

    /// Up-sampling step. While this returns `false` the input has not been
    /// consumed yet and `result` holds a fresh output; the caller adds the
    /// step distance and calls again with the same sample.
    pub fn interpolate(&mut self, distance: &mut f32, next: T, result: &mut T) -> bool {
        let mut consumed = false;
        if *distance >= 1.0 {
            self.advance_filter(next);
            *distance -= 1.0;
            consumed = true;
        }
        *result = self.filter_at(*distance);
        consumed
    }

    /// Down-sampling step: consumes `next` and returns `true` when an
    /// output falls before the following input.
    pub fn decimate(&mut self, distance: &mut f32, next: T, result: &mut T) -> bool {
        self.advance_filter(next);
        *distance -= 1.0;
        if *distance >= 1.0 {
            return false;
        }
        *result = self.filter_at(*distance);
        true
    }
}

#[derive(Debug, Clone, PartialEq)]
struct RateParams {
    input_rate: f64,
    output_rate: f64,
    cutoff_hz: f64,
}

/// Interpolator plus its fractional distance for a fixed rate pair.
#[derive(Debug, Clone)]
pub struct Resampler<T: Sample> {
    interpolator: Interpolator<T>,
    params: Option<RateParams>,
    distance: f32,
    remain: f32,
}

impl<T: Sample> Default for Resampler<T> {
    fn default() -> Self {
        Self {
            interpolator: Interpolator::default(),
            params: None,
            distance: 1.0,
            remain: 0.0,
        }
    }
}

impl<T: Sample> Resampler<T> {
    pub const PHASES: usize = 16;

    pub fn new(input_rate: f64, output_rate: f64, cutoff_hz: f64) -> Self {
        let mut resampler = Self::default();
        resampler.configure(input_rate, output_rate, cutoff_hz, true);
        resampler
    }

    /// Rebuild for a new rate pair or cutoff. Unchanged parameters leave all
    /// state alone unless `force` is set; a rebuild zeroes the accumulator.
    pub fn configure(&mut self, input_rate: f64, output_rate: f64, cutoff_hz: f64, force: bool) {
        let params = RateParams {
            input_rate: input_rate.max(1.0),
            output_rate: output_rate.max(1.0),
            cutoff_hz,
        };
        if !force && self.params.as_ref() == Some(&params) {
            return;
        }
        self.interpolator
            .create(Self::PHASES, params.input_rate, cutoff_hz, true);
        self.distance = (params.input_rate / params.output_rate) as f32;
        self.remain = 0.0;
        debug!(
            "resampler {:.0} -> {:.0} Hz, cutoff {:.0} Hz",
            params.input_rate, params.output_rate, cutoff_hz
        );
        self.params = Some(params);
    }

    /// Input samples per output sample.
    pub fn ratio(&self) -> f32 {
        self.distance
    }

    /// Fractional distance to the next output.
    pub fn remain(&self) -> f32 {
        self.remain
    }

    /// Push one input sample, calling `emit` for every output it yields.
    #[inline]
    pub fn process(&mut self, sample: T, mut emit: impl FnMut(T)) {
        let mut out = T::default();
        if self.distance < 1.0 {
            while !self
                .interpolator
                .interpolate(&mut self.remain, sample, &mut out)
            {
                emit(out);
                self.remain += self.distance;
            }
        } else if self
            .interpolator
            .decimate(&mut self.remain, sample, &mut out)
        {
            emit(out);
            self.remain += self.distance;
        }
    }

    pub fn process_block(&mut self, input: &[T], output: &mut Vec<T>) {
        for &sample in input {
            self.process(sample, |out| output.push(out));
        }
    }
}

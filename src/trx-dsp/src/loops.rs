// SPDX-FileCopyrightText: 2026 Stanislaw Grams <stanislawgrams@gmail.com>
//
// SPDX-License-Identifier: BSD-2-Clause

//! Carrier recovery loops.
//!
//! Every loop runs a second-order proportional-integral filter over a phase
//! error; the loops differ only in how that error is detected.

use num_complex::Complex;

use crate::math::wrap_phase;

mod costas;
mod fll;
mod pll;

pub use costas::Costas;
pub use fll::Fll;
pub use pll::Pll;

/// Common surface of the carrier loops.
pub trait CarrierLoop {
    /// Advance the loop by one input sample.
    fn feed(&mut self, sample: Complex<f32>);

    /// Local oscillator phasor the last sample was compared against.
    fn complex(&self) -> Complex<f32>;

    fn real(&self) -> f32 {
        self.complex().re
    }

    fn imag(&self) -> f32 {
        self.complex().im
    }

    /// Tracked frequency in radians per sample, relative to the loop centre.
    fn frequency(&self) -> f32;

    /// Oscillator phase in radians.
    fn phase(&self) -> f32;

    fn locked(&self) -> bool;

    fn reset(&mut self);
}

/// Proportional-integral loop filter with the usual second-order tuning:
/// natural frequency `bandwidth` (rad/sample) and damping factor `damping`.
#[derive(Debug, Clone)]
pub struct LoopFilter {
    alpha: f32,
    beta: f32,
    gain: f32,
    center: f32,
    max_freq: f32,
    freq: f32,
    phase: f32,
}

impl LoopFilter {
    pub fn new(bandwidth: f32, damping: f32, gain: f32) -> Self {
        let mut filter = Self {
            alpha: 0.0,
            beta: 0.0,
            gain,
            center: 0.0,
            max_freq: std::f32::consts::PI,
            freq: 0.0,
            phase: 0.0,
        };
        filter.set_params(bandwidth, damping, gain);
        filter
    }

    pub fn set_params(&mut self, bandwidth: f32, damping: f32, gain: f32) {
        let denom = 1.0 + 2.0 * damping * bandwidth + bandwidth * bandwidth;
        self.alpha = 4.0 * damping * bandwidth / denom;
        self.beta = 4.0 * bandwidth * bandwidth / denom;
        self.gain = gain;
    }

    pub fn set_center(&mut self, center: f32) {
        self.center = center;
    }

    pub fn center(&self) -> f32 {
        self.center
    }

    /// Bound the tracked offset to `±max_freq` rad/sample.
    pub fn set_max_freq(&mut self, max_freq: f32) {
        self.max_freq = max_freq.abs();
    }

    pub fn freq(&self) -> f32 {
        self.freq
    }

    pub fn phase(&self) -> f32 {
        self.phase
    }

    pub fn reset(&mut self) {
        self.freq = 0.0;
        self.phase = 0.0;
    }

    /// Apply one phase error and step the oscillator to the next sample.
    #[inline]
    pub fn advance(&mut self, error: f32) {
        let error = error * self.gain;
        self.freq = (self.freq + self.beta * error).clamp(-self.max_freq, self.max_freq);
        self.phase = wrap_phase(self.phase + self.center + self.freq + self.alpha * error);
    }
}

const LOCK_WINDOW: usize = 32;

/// Declares lock once the window-averaged frequency has held steady within
/// `lock_freq` for `lock_time` consecutive windows.
#[derive(Debug, Clone)]
pub struct LockDetector {
    lock_freq: f32,
    lock_time: u32,
    acc: f32,
    samples: usize,
    prev_mean: Option<f32>,
    count: u32,
}

impl LockDetector {
    pub fn new(lock_freq: f32, lock_time: u32) -> Self {
        Self {
            lock_freq,
            lock_time: lock_time.max(1),
            acc: 0.0,
            samples: 0,
            prev_mean: None,
            count: 0,
        }
    }

    pub fn update(&mut self, freq: f32) {
        self.acc += freq;
        self.samples += 1;
        if self.samples < LOCK_WINDOW {
            return;
        }
        let mean = self.acc / LOCK_WINDOW as f32;
        match self.prev_mean {
            Some(prev) if (mean - prev).abs() < self.lock_freq => {
                self.count = (self.count + 1).min(self.lock_time);
            }
            _ => self.count = 0,
        }
        self.prev_mean = Some(mean);
        self.acc = 0.0;
        self.samples = 0;
    }

    pub fn locked(&self) -> bool {
        self.count >= self.lock_time
    }

    pub fn reset(&mut self) {
        self.acc = 0.0;
        self.samples = 0;
        self.prev_mean = None;
        self.count = 0;
    }
}

// SPDX-FileCopyrightText: 2026 Stanislaw Grams <stanislawgrams@gmail.com>
//
// SPDX-License-Identifier: BSD-2-Clause

use num_complex::Complex;

use super::{CarrierLoop, LockDetector};
use crate::math::wrap_phase;

/// Frequency-locked loop: a single-pole average of the phase step between
/// consecutive samples drives a free-running oscillator.
#[derive(Debug, Clone)]
pub struct Fll {
    gain: f32,
    freq: f32,
    phase: f32,
    prev: Complex<f32>,
    lo: Complex<f32>,
    lock: LockDetector,
}

impl Fll {
    pub fn new(gain: f32) -> Self {
        Self {
            gain: gain.clamp(1e-6, 1.0),
            freq: 0.0,
            phase: 0.0,
            prev: Complex::new(0.0, 0.0),
            lo: Complex::new(1.0, 0.0),
            lock: LockDetector::new(1e-4, 20),
        }
    }

    pub fn set_gain(&mut self, gain: f32) {
        self.gain = gain.clamp(1e-6, 1.0);
    }

    pub fn set_lock_params(&mut self, lock_freq: f32, lock_time: u32) {
        self.lock = LockDetector::new(lock_freq, lock_time);
    }
}

impl CarrierLoop for Fll {
    fn feed(&mut self, sample: Complex<f32>) {
        self.lo = Complex::from_polar(1.0, self.phase);
        let d = sample * self.prev.conj();
        self.prev = sample;
        if d.norm_sqr() > f32::MIN_POSITIVE {
            let step = d.im.atan2(d.re);
            self.freq += self.gain * (step - self.freq);
        }
        self.phase = wrap_phase(self.phase + self.freq);
        self.lock.update(self.freq);
    }

    fn complex(&self) -> Complex<f32> {
        self.lo
    }

    fn frequency(&self) -> f32 {
        self.freq
    }

    fn phase(&self) -> f32 {
        self.phase
    }

    fn locked(&self) -> bool {
        self.lock.locked()
    }

    fn reset(&mut self) {
        self.freq = 0.0;
        self.phase = 0.0;
        self.prev = Complex::new(0.0, 0.0);
        self.lo = Complex::new(1.0, 0.0);
        self.lock.reset();
    }
}

// SPDX-FileCopyrightText: 2026 Stanislaw Grams <stanislawgrams@gmail.com>
//
// SPDX-License-Identifier: BSD-2-Clause

use num_complex::Complex;

use super::{CarrierLoop, LockDetector, LoopFilter};
use crate::math::hard_sign;

/// Costas loop for BPSK (order 2) or QPSK (order 4) carriers.
#[derive(Debug, Clone)]
pub struct Costas {
    order: u32,
    filter: LoopFilter,
    lock: LockDetector,
    lo: Complex<f32>,
    derotated: Complex<f32>,
}

impl Costas {
    /// `order` other than 4 selects the BPSK detector.
    pub fn new(bandwidth: f32, damping: f32, gain: f32, order: u32) -> Self {
        Self {
            order: if order == 4 { 4 } else { 2 },
            filter: LoopFilter::new(bandwidth, damping, gain),
            lock: LockDetector::new(bandwidth * bandwidth, 20),
            lo: Complex::new(1.0, 0.0),
            derotated: Complex::new(0.0, 0.0),
        }
    }

    pub fn set_params(&mut self, bandwidth: f32, damping: f32, gain: f32) {
        self.filter.set_params(bandwidth, damping, gain);
    }

    pub fn set_lock_params(&mut self, lock_freq: f32, lock_time: u32) {
        self.lock = LockDetector::new(lock_freq, lock_time);
    }

    pub fn set_max_freq(&mut self, max_freq: f32) {
        self.filter.set_max_freq(max_freq);
    }

    /// Last input sample rotated onto the real axis.
    pub fn derotated(&self) -> Complex<f32> {
        self.derotated
    }

    /// Rotate an arbitrary sample by the current oscillator.
    pub fn derotate(&self, sample: Complex<f32>) -> Complex<f32> {
        sample * self.lo.conj()
    }

    fn phase_error(&self, d: Complex<f32>) -> f32 {
        let mag = d.norm();
        if mag <= f32::MIN_POSITIVE {
            return 0.0;
        }
        let raw = if self.order == 4 {
            hard_sign(d.re) * d.im - hard_sign(d.im) * d.re
        } else {
            hard_sign(d.re) * d.im
        };
        raw / mag
    }
}

impl CarrierLoop for Costas {
    fn feed(&mut self, sample: Complex<f32>) {
        self.lo = Complex::from_polar(1.0, self.filter.phase());
        self.derotated = sample * self.lo.conj();
        let error = self.phase_error(self.derotated);
        self.filter.advance(error);
        self.lock.update(self.filter.freq());
    }

    fn complex(&self) -> Complex<f32> {
        self.lo
    }

    fn frequency(&self) -> f32 {
        self.filter.freq()
    }

    fn phase(&self) -> f32 {
        self.filter.phase()
    }

    fn locked(&self) -> bool {
        self.lock.locked()
    }

    fn reset(&mut self) {
        self.filter.reset();
        self.lock.reset();
        self.lo = Complex::new(1.0, 0.0);
        self.derotated = Complex::new(0.0, 0.0);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Deterministic symbol source, a 16-bit maximal-length LFSR.
    fn lfsr(state: &mut u16) -> u16 {
        let bit = (*state ^ (*state >> 2) ^ (*state >> 3) ^ (*state >> 5)) & 1;
        *state = (*state >> 1) | (bit << 15);
        *state & 3
    }

    #[test]
    fn bpsk_lock_strips_carrier() {
        let mut costas = Costas::new(0.01, 0.707, 1.0, 2);
        costas.set_lock_params(1e-4, 20);
        let mut state = 0xACE1u16;
        let mut symbol = 1.0f32;
        let mut bad = 0;
        for i in 0..6_000u32 {
            if i % 20 == 0 {
                symbol = if lfsr(&mut state) & 1 == 0 { 1.0 } else { -1.0 };
            }
            let phase = ((0.02 * f64::from(i) + 0.5) % std::f64::consts::TAU) as f32;
            costas.feed(Complex::from_polar(symbol, phase));
            let d = costas.derotated();
            if i >= 5_000 && d.im.abs() > 0.1 * d.re.abs() {
                bad += 1;
            }
        }
        assert!(costas.locked());
        assert!((costas.frequency() - 0.02).abs() < 1e-4);
        assert_eq!(bad, 0);
    }

    #[test]
    fn qpsk_lock_tracks_offset() {
        let mut costas = Costas::new(0.01, 0.707, 1.0, 4);
        costas.set_lock_params(1e-4, 20);
        let mut state = 0x1234u16;
        let mut symbol = Complex::new(1.0f32, 0.0);
        for i in 0..6_000u32 {
            if i % 20 == 0 {
                let quadrant = f32::from(lfsr(&mut state));
                symbol = Complex::from_polar(
                    1.0,
                    std::f32::consts::FRAC_PI_4 + std::f32::consts::FRAC_PI_2 * quadrant,
                );
            }
            let phase = ((0.01 * f64::from(i) + 0.3) % std::f64::consts::TAU) as f32;
            costas.feed(symbol * Complex::from_polar(1.0, phase));
        }
        assert!(costas.locked());
        assert!((costas.frequency() - 0.01).abs() < 1e-4);
        let d = costas.derotated();
        assert!((d.re.abs() - d.im.abs()).abs() < 0.05);
    }

    #[test]
    fn silent_input_produces_no_error() {
        let mut costas = Costas::new(0.01, 0.707, 1.0, 2);
        for _ in 0..100 {
            costas.feed(Complex::new(0.0, 0.0));
        }
        assert_eq!(costas.frequency(), 0.0);
    }
}

// SPDX-FileCopyrightText: 2026 Stanislaw Grams <stanislawgrams@gmail.com>
//
// SPDX-License-Identifier: BSD-2-Clause

use num_complex::Complex;

use super::{CarrierLoop, LockDetector, LoopFilter};

/// Phase-locked loop with an M-th power phase detector.
///
/// Order 1 tracks a plain carrier; order M removes M-ary phase modulation
/// before detection, at the cost of an M-fold phase ambiguity.
#[derive(Debug, Clone)]
pub struct Pll {
    order: u32,
    filter: LoopFilter,
    lock: LockDetector,
    lo: Complex<f32>,
}

impl Pll {
    pub fn new(bandwidth: f32, damping: f32, gain: f32, order: u32) -> Self {
        Self {
            order: order.max(1),
            filter: LoopFilter::new(bandwidth, damping, gain),
            lock: LockDetector::new(bandwidth * bandwidth, 20),
            lo: Complex::new(1.0, 0.0),
        }
    }

    /// Nominal frequency in rad/sample the loop starts from.
    pub fn set_center(&mut self, center: f32) {
        self.filter.set_center(center);
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

    pub fn order(&self) -> u32 {
        self.order
    }

    fn phase_error(&self, sample: Complex<f32>) -> f32 {
        let d = sample * self.lo.conj();
        if self.order == 1 {
            d.im.atan2(d.re)
        } else {
            let p = d.powu(self.order);
            p.im.atan2(p.re) / self.order as f32
        }
    }
}

impl CarrierLoop for Pll {
    fn feed(&mut self, sample: Complex<f32>) {
        self.lo = Complex::from_polar(1.0, self.filter.phase());
        let error = self.phase_error(sample);
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
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_approx_eq(a: f32, b: f32, tol: f32, label: &str) {
        assert!(
            (a - b).abs() <= tol,
            "{}: expected {} ≈ {} (tol {})",
            label,
            a,
            b,
            tol
        );
    }

    fn run(pll: &mut Pll, freq: f32, phase: f32, n: usize) {
        for i in 0..n {
            pll.feed(Complex::from_polar(1.0, freq * i as f32 + phase));
        }
    }

    fn run_f64(pll: &mut Pll, freq: f64, phase: f64, n: usize) {
        for i in 0..n {
            let t = (freq * i as f64 + phase).rem_euclid(std::f64::consts::TAU);
            pll.feed(Complex::from_polar(1.0, t as f32));
        }
    }

    #[test]
    fn locks_to_phase_offset_at_centre() {
        let mut pll = Pll::new(0.01, 0.707, 1.0, 1);
        pll.set_center(0.1);
        pll.set_lock_params(1e-4, 20);
        run_f64(&mut pll, 0.1, 1.0, 5_000);
        assert!(pll.locked());
        assert!(pll.frequency().abs() < 1e-4);
        let last = (0.1 * 4_999.0 + 1.0) % std::f64::consts::TAU;
        let expected = Complex::from_polar(1.0, last as f32);
        assert!((pll.complex() - expected).norm() < 0.01);
    }

    #[test]
    fn tracks_frequency_offset() {
        let mut pll = Pll::new(0.01, 0.707, 1.0, 1);
        pll.set_center(0.1);
        pll.set_lock_params(1e-4, 20);
        run_f64(&mut pll, 0.11, 0.0, 5_000);
        assert!(pll.locked());
        assert_approx_eq(pll.frequency(), 0.01, 1e-4, "offset");
    }

    #[test]
    fn starts_unlocked_and_reset_clears_lock() {
        let mut pll = Pll::new(0.01, 0.707, 1.0, 1);
        pll.set_lock_params(1e-4, 20);
        assert!(!pll.locked());
        run(&mut pll, -0.02, 2.0, 8_000);
        assert!(pll.locked());
        pll.reset();
        assert!(!pll.locked());
        assert_eq!(pll.frequency(), 0.0);
    }
}

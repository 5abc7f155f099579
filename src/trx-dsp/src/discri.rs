// SPDX-FileCopyrightText: 2026 Stanislaw Grams <stanislawgrams@gmail.com>
//
// SPDX-License-Identifier: BSD-2-Clause

//! FM phase discriminators.

use std::f32::consts::FRAC_1_PI;

use num_complex::Complex;

use crate::math::fast_atan2;

/// Instantaneous-frequency detector over consecutive complex samples.
///
/// Output is radians per sample divided by π, multiplied by the configured
/// scaling. Setting the scaling to `rate / (2 * deviation)` maps the peak
/// deviation to ±1.
#[derive(Debug, Clone)]
pub struct PhaseDiscriminator {
    prev: Complex<f32>,
    scaling: f32,
}

impl Default for PhaseDiscriminator {
    fn default() -> Self {
        Self {
            prev: Complex::new(0.0, 0.0),
            scaling: 1.0,
        }
    }
}

impl PhaseDiscriminator {
    pub fn new(scaling: f32) -> Self {
        Self {
            scaling,
            ..Self::default()
        }
    }

    pub fn set_fm_scaling(&mut self, scaling: f32) {
        self.scaling = scaling;
    }

    pub fn scaling(&self) -> f32 {
        self.scaling
    }

    pub fn reset(&mut self) {
        self.prev = Complex::new(0.0, 0.0);
    }

    /// Angle of `s · conj(prev)`.
    #[inline]
    pub fn discriminate(&mut self, sample: Complex<f32>) -> f32 {
        let product = sample * self.prev.conj();
        self.prev = sample;
        fast_atan2(product.im, product.re) * FRAC_1_PI * self.scaling
    }

    /// Derivative form `(I·dQ − Q·dI) / |s|²`, cheaper than the arctangent
    /// and linear for small steps. Also returns `|s|²`.
    #[inline]
    pub fn discriminate_delta(&mut self, sample: Complex<f32>) -> (f32, f32) {
        let magsq = sample.norm_sqr();
        let d = sample - self.prev;
        self.prev = sample;
        if magsq <= f32::MIN_POSITIVE {
            return (0.0, magsq);
        }
        let value = (sample.re * d.im - sample.im * d.re) / magsq;
        (value * FRAC_1_PI * self.scaling, magsq)
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

    fn tone(freq: f32, rate: f32, n: usize) -> impl Iterator<Item = Complex<f32>> {
        (0..n).map(move |i| {
            let t = std::f32::consts::TAU * freq * i as f32 / rate;
            Complex::new(t.cos(), t.sin())
        })
    }

    #[test]
    fn full_deviation_maps_to_unity() {
        let rate = 48_000.0;
        let deviation = 5_000.0;
        let mut discri = PhaseDiscriminator::new(rate / (2.0 * deviation));
        let out: Vec<f32> = tone(deviation, rate, 200)
            .map(|s| discri.discriminate(s))
            .collect();
        for (i, &v) in out.iter().enumerate().skip(1) {
            assert_approx_eq(v, 1.0, 0.01, &format!("sample {i}"));
        }

        discri.reset();
        let neg: Vec<f32> = tone(-deviation / 2.0, rate, 50)
            .map(|s| discri.discriminate(s))
            .collect();
        assert_approx_eq(neg[10], -0.5, 0.01, "half negative deviation");
    }

    #[test]
    fn delta_form_matches_for_small_steps() {
        let rate = 57_600.0;
        let mut a = PhaseDiscriminator::new(rate / (2.0 * 2_400.0));
        let mut b = a.clone();
        for (i, s) in tone(1_200.0, rate, 100).enumerate() {
            let exact = a.discriminate(s);
            let (approx, magsq) = b.discriminate_delta(s);
            assert_approx_eq(magsq, 1.0, 1e-5, "magsq");
            if i > 0 {
                assert_approx_eq(approx, exact, 0.025, &format!("sample {i}"));
            }
        }
    }

    #[test]
    fn delta_form_is_silent_on_zero_input() {
        let mut discri = PhaseDiscriminator::new(4.0);
        assert_eq!(discri.discriminate_delta(Complex::new(0.0, 0.0)), (0.0, 0.0));
    }
}

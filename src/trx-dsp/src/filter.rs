// SPDX-FileCopyrightText: 2025 Stanislaw Grams <stanislawgrams@gmail.com>
//
// SPDX-License-Identifier: BSD-2-Clause

//! Windowed-sinc FIR design and a circular-buffer FIR filter.

use std::f64::consts::PI;

use crate::Sample;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Window {
    #[default]
    Blackman,
    Hamming,
    Hann,
    Rectangular,
}

impl Window {
    /// Window value for tap `i` of `taps`.
    pub fn coefficient(self, i: usize, taps: usize) -> f32 {
        if taps <= 1 {
            return 1.0;
        }
        let x = 2.0 * PI * i as f64 / (taps - 1) as f64;
        let w = match self {
            Self::Blackman => 0.42 - 0.5 * x.cos() + 0.08 * (2.0 * x).cos(),
            Self::Hamming => 0.54 - 0.46 * x.cos(),
            Self::Hann => 0.5 - 0.5 * x.cos(),
            Self::Rectangular => 1.0,
        };
        w as f32
    }
}

fn sinc_lowpass(taps: usize, cutoff_norm: f64, window: Window) -> Vec<f64> {
    let mid = (taps - 1) as f64 / 2.0;
    (0..taps)
        .map(|i| {
            let x = i as f64 - mid;
            let sinc = if x == 0.0 {
                2.0 * cutoff_norm
            } else {
                (2.0 * PI * cutoff_norm * x).sin() / (PI * x)
            };
            sinc * f64::from(window.coefficient(i, taps))
        })
        .collect()
}

/// Response magnitude of real `taps` at normalised frequency `f`.
fn gain_at(taps: &[f64], f: f64) -> f64 {
    let (mut re, mut im) = (0.0, 0.0);
    for (n, &t) in taps.iter().enumerate() {
        let w = 2.0 * PI * f * n as f64;
        re += t * w.cos();
        im -= t * w.sin();
    }
    (re * re + im * im).sqrt()
}

fn odd(taps: usize) -> usize {
    taps.max(1) | 1
}

/// Low-pass taps with unity DC gain.
pub fn lowpass_taps(taps: usize, sample_rate: f32, cutoff_hz: f32, window: Window) -> Vec<f32> {
    let taps = odd(taps);
    let cutoff = (f64::from(cutoff_hz) / f64::from(sample_rate.max(1.0))).clamp(0.0, 0.5);
    let mut h = sinc_lowpass(taps, cutoff, window);
    let sum: f64 = h.iter().sum();
    if sum.abs() > 1e-12 {
        h.iter_mut().for_each(|t| *t /= sum);
    }
    h.into_iter().map(|t| t as f32).collect()
}

/// High-pass taps by spectral inversion of the matching low-pass.
pub fn highpass_taps(taps: usize, sample_rate: f32, cutoff_hz: f32, window: Window) -> Vec<f32> {
    let mut h = lowpass_taps(taps, sample_rate, cutoff_hz, window);
    let mid = h.len() / 2;
    h.iter_mut().for_each(|t| *t = -*t);
    h[mid] += 1.0;
    h
}

/// Band-pass taps with unity gain at the band centre.
pub fn bandpass_taps(
    taps: usize,
    sample_rate: f32,
    low_hz: f32,
    high_hz: f32,
    window: Window,
) -> Vec<f32> {
    let taps = odd(taps);
    let rate = f64::from(sample_rate.max(1.0));
    let (low, high) = if low_hz <= high_hz {
        (low_hz, high_hz)
    } else {
        (high_hz, low_hz)
    };
    let fl = (f64::from(low) / rate).clamp(0.0, 0.5);
    let fh = (f64::from(high) / rate).clamp(0.0, 0.5);
    let upper = sinc_lowpass(taps, fh, window);
    let lower = sinc_lowpass(taps, fl, window);
    let mut h: Vec<f64> = upper.iter().zip(&lower).map(|(u, l)| u - l).collect();
    let g = gain_at(&h, (fl + fh) / 2.0);
    if g > 1e-12 {
        h.iter_mut().for_each(|t| *t /= g);
    }
    h.into_iter().map(|t| t as f32).collect()
}

/// Gaussian pulse-shaping taps spanning `symbol_span` symbols, unity DC gain.
pub fn gaussian_taps(bt: f32, symbol_span: usize, samples_per_symbol: usize) -> Vec<f32> {
    let sps = samples_per_symbol.max(1);
    let n = symbol_span.max(1) * sps + 1;
    let a = (2f64.ln() / 2.0).sqrt() / f64::from(bt.max(1e-3));
    let h: Vec<f64> = (0..n)
        .map(|i| {
            let t = (i as f64 - (n / 2) as f64) / sps as f64;
            PI.sqrt() / a * (-(PI * t / a).powi(2)).exp()
        })
        .collect();
    let sum: f64 = h.iter().sum();
    h.into_iter().map(|t| (t / sum) as f32).collect()
}

/// FIR filter over a circular delay line.
#[derive(Debug, Clone)]
pub struct FirFilter<T: Sample> {
    taps: Vec<f32>,
    /// Delay line written twice so the convolution window is contiguous.
    history: Vec<T>,
    pos: usize,
}

impl<T: Sample> FirFilter<T> {
    pub fn new(taps: Vec<f32>) -> Self {
        let taps = if taps.is_empty() { vec![1.0] } else { taps };
        let n = taps.len();
        Self {
            taps,
            history: vec![T::default(); 2 * n],
            pos: 0,
        }
    }

    pub fn lowpass(taps: usize, sample_rate: f32, cutoff_hz: f32) -> Self {
        Self::new(lowpass_taps(taps, sample_rate, cutoff_hz, Window::Blackman))
    }

    pub fn len(&self) -> usize {
        self.taps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.taps.is_empty()
    }

    pub fn taps(&self) -> &[f32] {
        &self.taps
    }

    /// Swap in new taps. With `preserve` the most recent samples stay in
    /// the delay line; otherwise it is cleared.
    pub fn set_taps(&mut self, taps: Vec<f32>, preserve: bool) {
        let taps = if taps.is_empty() { vec![1.0] } else { taps };
        let n = taps.len();
        let mut history = vec![T::default(); 2 * n];
        let mut pos = 0;
        if preserve {
            let old_n = self.taps.len();
            let keep = old_n.min(n);
            // Oldest kept sample first, newest ends at pos.
            for k in 0..keep {
                let sample = self.history[self.pos + old_n - (keep - 1 - k)];
                history[k] = sample;
                history[k + n] = sample;
            }
            pos = keep.saturating_sub(1);
        }
        self.taps = taps;
        self.history = history;
        self.pos = pos;
    }

    pub fn reset(&mut self) {
        self.history.fill(T::default());
        self.pos = 0;
    }

    #[inline]
    pub fn filter(&mut self, sample: T) -> T {
        let n = self.taps.len();
        self.pos = (self.pos + 1) % n;
        self.history[self.pos] = sample;
        self.history[self.pos + n] = sample;
        let window = &self.history[self.pos + 1..self.pos + n + 1];
        let mut acc = T::default();
        for (&tap, &x) in self.taps.iter().zip(window.iter().rev()) {
            acc = acc + x * tap;
        }
        acc
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

    fn steady_gain(taps: Vec<f32>, freq: f32, rate: f32) -> f32 {
        let mut fir = FirFilter::<f32>::new(taps);
        let mut peak = 0.0f32;
        for n in 0..4_000 {
            let x = (std::f32::consts::TAU * freq * n as f32 / rate).sin();
            let y = fir.filter(x);
            if n > 2_000 {
                peak = peak.max(y.abs());
            }
        }
        peak
    }

    #[test]
    fn lowpass_passes_dc_and_rejects_stopband() {
        let taps = lowpass_taps(101, 48_000.0, 3_000.0, Window::Blackman);
        assert_approx_eq(taps.iter().sum::<f32>(), 1.0, 1e-5, "dc gain");
        assert!(steady_gain(taps.clone(), 500.0, 48_000.0) > 0.98);
        assert!(steady_gain(taps, 9_000.0, 48_000.0) < 0.01);
    }

    #[test]
    fn highpass_rejects_dc() {
        let taps = highpass_taps(101, 48_000.0, 3_000.0, Window::Hamming);
        assert_approx_eq(taps.iter().sum::<f32>(), 0.0, 1e-5, "dc gain");
        assert!(steady_gain(taps, 12_000.0, 48_000.0) > 0.98);
    }

    #[test]
    fn bandpass_centre_is_unity() {
        let taps = bandpass_taps(201, 48_000.0, 2_000.0, 4_000.0, Window::Blackman);
        assert_approx_eq(steady_gain(taps.clone(), 3_000.0, 48_000.0), 1.0, 0.02, "centre");
        assert!(steady_gain(taps, 12_000.0, 48_000.0) < 0.01);
    }

    #[test]
    fn gaussian_is_symmetric_and_normalised() {
        let taps = gaussian_taps(0.5, 3, 12);
        assert_eq!(taps.len(), 37);
        assert_approx_eq(taps.iter().sum::<f32>(), 1.0, 1e-5, "sum");
        for i in 0..taps.len() / 2 {
            assert_approx_eq(taps[i], taps[taps.len() - 1 - i], 1e-7, "symmetry");
        }
        assert!(taps[18] > taps[17]);
    }

    #[test]
    fn set_taps_preserve_keeps_recent_history() {
        let mut fir = FirFilter::<f32>::new(vec![1.0, 0.0, 0.0]);
        for x in [1.0, 2.0, 3.0] {
            fir.filter(x);
        }
        // Pure delay of two samples: the next outputs replay kept history.
        fir.set_taps(vec![0.0, 0.0, 1.0], true);
        assert_eq!(fir.filter(4.0), 2.0);
        assert_eq!(fir.filter(5.0), 3.0);

        fir.set_taps(vec![0.0, 0.0, 1.0], false);
        assert_eq!(fir.filter(6.0), 0.0);
    }
}

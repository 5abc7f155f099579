// SPDX-FileCopyrightText: 2025 Stanislaw Grams <stanislawgrams@gmail.com>
//
// SPDX-License-Identifier: BSD-2-Clause

//! Overlap-add FFT filter for sideband selection.
//!
//! Input is gathered in half-length blocks; each block is zero padded to the
//! FFT length, multiplied by the kernel spectrum and the tail of the
//! previous block is added to the head of the new one.

use std::f64::consts::PI;
use std::sync::Arc;

use num_complex::Complex;
use rustfft::{Fft, FftPlanner};

use crate::filter::Window;

fn mul_spectrum(buf: &mut [Complex<f32>], kernel: &[Complex<f32>], scale: f32) {
    for (x, &h) in buf.iter_mut().zip(kernel.iter()) {
        *x = Complex::new(
            (x.re * h.re - x.im * h.im) * scale,
            (x.re * h.im + x.im * h.re) * scale,
        );
    }
}

pub struct FftFilter {
    fft_len: usize,
    half: usize,
    fft: Arc<dyn Fft<f32>>,
    ifft: Arc<dyn Fft<f32>>,
    kernel: Vec<Complex<f32>>,
    input: Vec<Complex<f32>>,
    input_pos: usize,
    overlap: Vec<Complex<f32>>,
    output: Vec<Complex<f32>>,
    scratch: Vec<Complex<f32>>,
}

impl std::fmt::Debug for FftFilter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FftFilter")
            .field("fft_len", &self.fft_len)
            .finish_non_exhaustive()
    }
}

impl FftFilter {
    /// `fft_len` is rounded up to a power of two (minimum 64). The filter
    /// starts as a pass-through until a passband is set.
    pub fn new(fft_len: usize) -> Self {
        let fft_len = fft_len.max(64).next_power_of_two();
        let half = fft_len / 2;
        let mut planner = FftPlanner::<f32>::new();
        let mut filter = Self {
            fft_len,
            half,
            fft: planner.plan_fft_forward(fft_len),
            ifft: planner.plan_fft_inverse(fft_len),
            kernel: vec![Complex::new(0.0, 0.0); fft_len],
            input: vec![Complex::new(0.0, 0.0); half],
            input_pos: 0,
            overlap: vec![Complex::new(0.0, 0.0); half],
            output: vec![Complex::new(0.0, 0.0); half],
            scratch: vec![Complex::new(0.0, 0.0); fft_len],
        };
        let mut impulse = vec![Complex::new(0.0, 0.0); half];
        impulse[0] = Complex::new(1.0, 0.0);
        filter.load_kernel(&impulse);
        filter
    }

    pub fn fft_len(&self) -> usize {
        self.fft_len
    }

    /// Number of samples returned per completed block.
    pub fn block_len(&self) -> usize {
        self.half
    }

    fn load_kernel(&mut self, taps: &[Complex<f32>]) {
        self.kernel.fill(Complex::new(0.0, 0.0));
        self.kernel[..taps.len()].copy_from_slice(taps);
        self.fft.process(&mut self.kernel);
    }

    /// Complex band-pass between `low` and `high`, normalised to the sample
    /// rate (-0.5..0.5). Negative frequencies select the lower sideband.
    pub fn create_filter(&mut self, low: f32, high: f32) {
        let (low, high) = if low <= high { (low, high) } else { (high, low) };
        let low = f64::from(low.clamp(-0.5, 0.5));
        let high = f64::from(high.clamp(-0.5, 0.5));
        let half_width = (high - low) / 2.0;
        let centre = (high + low) / 2.0;
        let n = self.half;
        let mid = (n - 1) as f64 / 2.0;
        let taps: Vec<Complex<f32>> = (0..n)
            .map(|i| {
                let x = i as f64 - mid;
                let sinc = if x == 0.0 {
                    2.0 * half_width
                } else {
                    (2.0 * PI * half_width * x).sin() / (PI * x)
                };
                let w = f64::from(Window::Blackman.coefficient(i, n));
                let phase = 2.0 * PI * centre * x;
                Complex::new(
                    (sinc * w * phase.cos()) as f32,
                    (sinc * w * phase.sin()) as f32,
                )
            })
            .collect();
        self.load_kernel(&taps);
    }

    /// Symmetric low-pass of one-sided width `half_bw` (normalised).
    pub fn create_dsb_filter(&mut self, half_bw: f32) {
        let half_bw = half_bw.abs();
        self.create_filter(-half_bw, half_bw);
    }

    pub fn reset(&mut self) {
        self.input.fill(Complex::new(0.0, 0.0));
        self.overlap.fill(Complex::new(0.0, 0.0));
        self.input_pos = 0;
    }

    /// Push one sample. Every `block_len()` samples a block of filtered
    /// output is returned.
    pub fn feed(&mut self, sample: Complex<f32>) -> Option<&[Complex<f32>]> {
        self.input[self.input_pos] = sample;
        self.input_pos += 1;
        if self.input_pos < self.half {
            return None;
        }
        self.input_pos = 0;

        self.scratch[..self.half].copy_from_slice(&self.input[..self.half]);
        self.scratch[self.half..].fill(Complex::new(0.0, 0.0));
        self.fft.process(&mut self.scratch);
        mul_spectrum(&mut self.scratch, &self.kernel, 1.0 / self.fft_len as f32);
        self.ifft.process(&mut self.scratch);

        for i in 0..self.half {
            self.output[i] = self.scratch[i] + self.overlap[i];
        }
        self.overlap.copy_from_slice(&self.scratch[self.half..]);
        Some(&self.output)
    }
}

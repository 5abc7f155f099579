// SPDX-FileCopyrightText: 2026 Stanislaw Grams <stanislawgrams@gmail.com>
//
// SPDX-License-Identifier: BSD-2-Clause

//! Receive-side DSP primitives shared by every channel demodulator.

use std::ops::{Add, Mul};

use num_complex::Complex;

pub mod bitsync;
pub mod discri;
pub mod fft_filter;
pub mod filter;
pub mod loops;
pub mod math;
pub mod nco;
pub mod resampler;
pub mod squelch;

pub use bitsync::{
    gaussian_training, Alignment, CorrelatorConfig, CorrelatorSync, FixedRateBitSync,
    ZeroCrossingClock,
};
pub use discri::PhaseDiscriminator;
pub use fft_filter::FftFilter;
pub use filter::{FirFilter, Window};
pub use loops::{CarrierLoop, Costas, Fll, LockDetector, LoopFilter, Pll};
pub use nco::Nco;
pub use resampler::{Interpolator, Resampler};
pub use squelch::{MovingAverage, Squelch};

/// Sample value a filter or resampler can run over: real audio or complex IQ.
pub trait Sample: Copy + Default + Send + Add<Output = Self> + Mul<f32, Output = Self> + 'static {}

impl Sample for f32 {}
impl Sample for Complex<f32> {}

/// Build the shared lookup tables up front so no channel pays for them on
/// its first sample.
pub fn init() {
    nco::init_table();
}

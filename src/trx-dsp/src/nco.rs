// SPDX-FileCopyrightText: 2026 Stanislaw Grams <stanislawgrams@gmail.com>
//
// SPDX-License-Identifier: BSD-2-Clause

//! Table-driven numerically controlled oscillator.
//!
//! The phase is a 32-bit fixed-point accumulator that wraps naturally, so
//! long runs never drift. The top bits index a shared cosine table.

use std::f64::consts::TAU;
use std::sync::OnceLock;

use num_complex::Complex;

const TABLE_BITS: u32 = 12;
const TABLE_SIZE: usize = 1 << TABLE_BITS;
const TABLE_MASK: usize = TABLE_SIZE - 1;
const INDEX_SHIFT: u32 = 32 - TABLE_BITS;
const QUARTER: usize = TABLE_SIZE / 4;

static COS_TABLE: OnceLock<Box<[f32]>> = OnceLock::new();

fn table() -> &'static [f32] {
    COS_TABLE.get_or_init(|| {
        (0..TABLE_SIZE)
            .map(|i| (TAU * i as f64 / TABLE_SIZE as f64).cos() as f32)
            .collect()
    })
}

pub(crate) fn init_table() {
    let _ = table();
}

#[derive(Debug, Clone)]
pub struct Nco {
    phase: u32,
    increment: u32,
    table: &'static [f32],
}

impl Default for Nco {
    fn default() -> Self {
        Self::new()
    }
}

impl Nco {
    pub fn new() -> Self {
        Self {
            phase: 0,
            increment: 0,
            table: table(),
        }
    }

    /// Set the oscillator to `freq_hz` at `sample_rate`. Negative values
    /// rotate the other way; a zero rate stops the oscillator.
    pub fn set_freq(&mut self, freq_hz: f64, sample_rate: f64) {
        if sample_rate <= 0.0 {
            self.increment = 0;
            return;
        }
        let cycles = (freq_hz / sample_rate).rem_euclid(1.0);
        self.increment = (cycles * 4_294_967_296.0).round() as u64 as u32;
    }

    pub fn reset(&mut self) {
        self.phase = 0;
    }

    /// Current phase in radians, in `[0, 2π)`.
    pub fn phase(&self) -> f32 {
        (self.phase as f64 / 4_294_967_296.0 * TAU) as f32
    }

    #[inline]
    fn advance(&mut self) -> usize {
        self.phase = self.phase.wrapping_add(self.increment);
        (self.phase >> INDEX_SHIFT) as usize
    }

    /// Advance and return `(cos θ, -sin θ)`. Multiplying a sample by this
    /// translates its spectrum down by the configured frequency.
    #[inline]
    pub fn next_iq(&mut self) -> Complex<f32> {
        let idx = self.advance();
        let cos = self.table[idx];
        let sin = self.table[(idx + TABLE_SIZE - QUARTER) & TABLE_MASK];
        Complex::new(cos, -sin)
    }

    /// Like [`Nco::next_iq`], with the Q branch offset by `imbalance`
    /// radians to cancel quadrature phase error in the source.
    #[inline]
    pub fn next_iq_imbalance(&mut self, imbalance: f32) -> Complex<f32> {
        let idx = self.advance();
        let shift = (f64::from(imbalance) / TAU * TABLE_SIZE as f64).round() as isize;
        let q_idx = (idx as isize - QUARTER as isize + shift).rem_euclid(TABLE_SIZE as isize);
        Complex::new(self.table[idx], -self.table[q_idx as usize])
    }

    /// Advance and return the real oscillator output `cos θ`.
    #[inline]
    pub fn next(&mut self) -> f32 {
        let idx = self.advance();
        self.table[idx]
    }
}

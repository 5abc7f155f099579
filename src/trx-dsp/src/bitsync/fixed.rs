// SPDX-FileCopyrightText: 2026 Stanislaw Grams <stanislawgrams@gmail.com>
//
// SPDX-License-Identifier: BSD-2-Clause

/// Edge-resynchronised fixed-rate sampler.
///
/// Every level change restarts a half-symbol countdown; when the countdown
/// expires the current level is taken as a bit and the counter is reloaded
/// with a full symbol period.
#[derive(Debug, Clone)]
pub struct FixedRateBitSync {
    samples_per_symbol: f32,
    counter: f32,
    prev: bool,
}

impl FixedRateBitSync {
    pub fn new(samples_per_symbol: f32) -> Self {
        let sps = samples_per_symbol.max(1.0);
        Self {
            samples_per_symbol: sps,
            counter: sps / 2.0,
            prev: false,
        }
    }

    pub fn samples_per_symbol(&self) -> f32 {
        self.samples_per_symbol
    }

    /// Change the symbol period; the running countdown is kept.
    pub fn set_samples_per_symbol(&mut self, samples_per_symbol: f32) {
        self.samples_per_symbol = samples_per_symbol.max(1.0);
        self.counter = self.counter.min(self.samples_per_symbol);
    }

    pub fn reset(&mut self) {
        self.counter = self.samples_per_symbol / 2.0;
        self.prev = false;
    }

    /// Feed one sliced sample; returns the sampled bit at symbol centres.
    #[inline]
    pub fn feed(&mut self, level: bool) -> Option<bool> {
        if level != self.prev {
            self.prev = level;
            self.counter = self.samples_per_symbol / 2.0;
        }
        self.counter -= 1.0;
        if self.counter <= 0.0 {
            self.counter += self.samples_per_symbol;
            Some(level)
        } else {
            None
        }
    }
}

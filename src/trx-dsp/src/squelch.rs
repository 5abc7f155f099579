// SPDX-FileCopyrightText: 2026 Stanislaw Grams <stanislawgrams@gmail.com>
//
// SPDX-License-Identifier: BSD-2-Clause

//! Power averaging and gated squelch.

/// Running mean over the last `len` values.
#[derive(Debug, Clone)]
pub struct MovingAverage {
    buf: Vec<f64>,
    pos: usize,
    filled: usize,
    sum: f64,
}

impl MovingAverage {
    pub fn new(len: usize) -> Self {
        Self {
            buf: vec![0.0; len.max(1)],
            pos: 0,
            filled: 0,
            sum: 0.0,
        }
    }

    pub fn len(&self) -> usize {
        self.buf.len()
    }

    pub fn is_empty(&self) -> bool {
        self.filled == 0
    }

    /// Resize the window, dropping history.
    pub fn resize(&mut self, len: usize) {
        *self = Self::new(len);
    }

    pub fn reset(&mut self) {
        self.buf.fill(0.0);
        self.pos = 0;
        self.filled = 0;
        self.sum = 0.0;
    }

    /// Add `value` and return the mean of the values seen so far, at most
    /// `len` of them.
    pub fn push(&mut self, value: f64) -> f64 {
        self.sum += value - self.buf[self.pos];
        self.buf[self.pos] = value;
        self.pos = (self.pos + 1) % self.buf.len();
        self.filled = (self.filled + 1).min(self.buf.len());
        self.average()
    }

    pub fn average(&self) -> f64 {
        if self.filled == 0 {
            0.0
        } else {
            self.sum / self.filled as f64
        }
    }
}

/// Power squelch with a symmetric gate counter.
///
/// Each sample whose averaged power is at or above the threshold moves the
/// counter towards `gate`; each sample below moves it towards zero. The
/// squelch opens when the counter reaches `gate` and closes when it reaches
/// zero, so short dips and bursts do not toggle it.
#[derive(Debug, Clone)]
pub struct Squelch {
    threshold: f64,
    gate: u32,
    count: u32,
    open: bool,
    average: MovingAverage,
}

impl Squelch {
    pub fn new(threshold: f64, gate: u32, average_len: usize) -> Self {
        Self {
            threshold,
            gate: gate.max(1),
            count: 0,
            open: false,
            average: MovingAverage::new(average_len),
        }
    }

    pub fn set_threshold(&mut self, threshold: f64) {
        self.threshold = threshold;
    }

    pub fn set_gate(&mut self, gate: u32) {
        self.gate = gate.max(1);
        self.count = self.count.min(self.gate);
    }

    pub fn is_open(&self) -> bool {
        self.open
    }

    /// Mean power over the averaging window.
    pub fn power(&self) -> f64 {
        self.average.average()
    }

    pub fn reset(&mut self) {
        self.count = 0;
        self.open = false;
        self.average.reset();
    }

    /// Feed one `|s|²` value and return whether the squelch is open.
    pub fn feed(&mut self, magsq: f64) -> bool {
        let avg = self.average.push(magsq);
        if avg >= self.threshold {
            self.count = (self.count + 1).min(self.gate);
        } else {
            self.count = self.count.saturating_sub(1);
        }
        if self.count == self.gate {
            self.open = true;
        } else if self.count == 0 {
            self.open = false;
        }
        self.open
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn moving_average_drops_oldest() {
        let mut avg = MovingAverage::new(3);
        assert_eq!(avg.push(3.0), 3.0);
        assert_eq!(avg.push(6.0), 4.5);
        assert_eq!(avg.push(9.0), 6.0);
        assert_eq!(avg.push(0.0), 5.0);
        avg.reset();
        assert!(avg.is_empty());
        assert_eq!(avg.average(), 0.0);
    }

    #[test]
    fn opens_after_gate_and_closes_after_gate() {
        let mut sq = Squelch::new(0.5, 4, 1);
        for _ in 0..3 {
            assert!(!sq.feed(1.0));
        }
        assert!(sq.feed(1.0));
        // Counter is saturated at the gate; four quiet samples close it.
        for _ in 0..3 {
            assert!(sq.feed(0.0));
        }
        assert!(!sq.feed(0.0));
    }

    #[test]
    fn short_dropout_keeps_squelch_open() {
        let mut sq = Squelch::new(0.5, 4, 1);
        for _ in 0..10 {
            sq.feed(1.0);
        }
        sq.feed(0.0);
        sq.feed(0.0);
        assert!(sq.feed(1.0));
        assert!(sq.is_open());
    }

    #[test]
    fn averaging_suppresses_single_spikes() {
        let mut sq = Squelch::new(0.5, 1, 8);
        for _ in 0..7 {
            assert!(!sq.feed(0.1));
        }
        // (7 * 0.1 + 3.0) / 8 stays under the threshold.
        assert!(!sq.feed(3.0));
        assert!(sq.feed(3.0));
    }
}

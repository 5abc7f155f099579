// SPDX-FileCopyrightText: 2026 Stanislaw Grams <stanislawgrams@gmail.com>
//
// SPDX-License-Identifier: BSD-2-Clause

use std::f64::consts::{FRAC_PI_2, PI, TAU};

/// Biphase symbol clock slaved to a carrier phase.
///
/// The symbol clock runs at the carrier frequency divided by `divisor`
/// (57 kHz / 48 = 1187.5 Hz for RDS). Every sign change of the baseband
/// nudges the clock offset towards the nearest half period. The baseband
/// is integrated against the clock square wave and dumped on every clock
/// edge; pairs of half-symbol sums with equal sign form a symbol, and the
/// pairing ("reading frame") with fewer disagreements over `window` halves
/// is kept. Bits are differentially decoded.
#[derive(Debug, Clone)]
pub struct ZeroCrossingClock {
    divisor: f64,
    gain: f64,
    window: u32,
    carrier_phase: f64,
    offset: f64,
    prev_bb: f32,
    prev_lo: f32,
    acc: f32,
    prev_acc: f32,
    counter: u32,
    errors: [u32; 2],
    reading_frame: u32,
    prev_dbit: bool,
    last_errors: u32,
}

impl Default for ZeroCrossingClock {
    fn default() -> Self {
        Self::new(48.0, 0.005, 800)
    }
}

impl ZeroCrossingClock {
    pub fn new(divisor: f64, gain: f64, window: u32) -> Self {
        Self {
            divisor: divisor.max(1.0),
            gain,
            window: window.max(2) & !1,
            carrier_phase: 0.0,
            offset: 0.0,
            prev_bb: 0.0,
            prev_lo: 1.0,
            acc: 0.0,
            prev_acc: 0.0,
            counter: 0,
            errors: [0; 2],
            reading_frame: 0,
            prev_dbit: false,
            last_errors: 0,
        }
    }

    pub fn reset(&mut self) {
        *self = Self::new(self.divisor, self.gain, self.window);
    }

    /// Clock phase in radians, not wrapped.
    pub fn clock_phase(&self) -> f64 {
        self.carrier_phase / self.divisor + self.offset
    }

    /// Share of symbols without a half-symbol sign disagreement over the
    /// last completed window.
    pub fn quality(&self) -> f32 {
        1.0 - self.last_errors as f32 / (self.window / 2) as f32
    }

    /// Advance by one sample. `phase_step` is the carrier phase advance in
    /// radians for this sample, `baseband` the demodulated sub-carrier.
    pub fn feed(&mut self, phase_step: f32, baseband: f32) -> Option<bool> {
        self.carrier_phase =
            (self.carrier_phase + f64::from(phase_step)).rem_euclid(TAU * self.divisor);
        let clock = self.clock_phase();
        let lo = if clock.rem_euclid(TAU) < PI { 1.0 } else { -1.0 };

        if (baseband >= 0.0) != (self.prev_bb >= 0.0) {
            let mut err = clock.rem_euclid(PI);
            if err >= FRAC_PI_2 {
                err -= PI;
            }
            self.offset -= self.gain * err;
        }
        self.prev_bb = baseband;

        self.acc += baseband * lo;
        let mut bit = None;
        if lo != self.prev_lo {
            bit = self.dump(self.acc);
            self.acc = 0.0;
        }
        self.prev_lo = lo;
        bit
    }

    fn dump(&mut self, acc: f32) -> Option<bool> {
        let slot = (self.counter % 2) as usize;
        if (acc >= 0.0) != (self.prev_acc >= 0.0) {
            self.errors[slot] += 1;
        }
        let mut bit = None;
        if self.counter % 2 == self.reading_frame {
            let dbit = self.prev_acc > 0.0;
            bit = Some(dbit != self.prev_dbit);
            self.prev_dbit = dbit;
        }
        self.prev_acc = acc;
        self.counter += 1;
        if self.counter >= self.window {
            let current = self.reading_frame as usize;
            if self.errors[current] > self.errors[1 - current] {
                self.reading_frame ^= 1;
            }
            self.last_errors = self.errors[self.reading_frame as usize];
            self.errors = [0; 2];
            self.counter = 0;
        }
        bit
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Differential biphase baseband at 96 samples per half symbol.
    fn biphase(bits: &[bool], delay: usize) -> Vec<f32> {
        let mut out = vec![0.0; delay];
        let mut level = false;
        for &bit in bits {
            level ^= bit;
            let a = if level { 1.0 } else { -1.0 };
            out.extend(std::iter::repeat(a).take(96));
            out.extend(std::iter::repeat(-a).take(96));
        }
        out
    }

    fn data(n: usize) -> Vec<bool> {
        let mut state = 0xB5u8;
        (0..n)
            .map(|_| {
                let fb = (state ^ (state >> 2) ^ (state >> 3) ^ (state >> 4)) & 1;
                state = (state >> 1) | (fb << 7);
                state & 1 == 1
            })
            .collect()
    }

    #[test]
    fn recovers_bits_for_any_start_phase() {
        let bits = data(1_200);
        for delay in [0, 37, 96, 150] {
            let mut clock = ZeroCrossingClock::default();
            let recovered: Vec<bool> = biphase(&bits, delay)
                .into_iter()
                .filter_map(|bb| clock.feed(std::f32::consts::FRAC_PI_2, bb))
                .collect();
            let tail = &recovered[recovered.len() - 200..];
            assert!(
                bits.windows(200).any(|w| w == tail),
                "delay {delay}: tail not found"
            );
            assert!(clock.quality() > 0.95, "delay {delay}: quality {}", clock.quality());
        }
    }
}

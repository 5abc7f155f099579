// SPDX-FileCopyrightText: 2026 Stanislaw Grams <stanislawgrams@gmail.com>
//
// SPDX-License-Identifier: BSD-2-Clause

//! RDS decoder for the FM multiplex signal.
//!
//! The 19 kHz pilot is mixed to DC, decimated and tracked by a PLL; its
//! cube gives the 57 kHz sub-carrier reference. The sub-carrier is mixed
//! down with the same oscillator, decimated to 16 samples per symbol,
//! derotated by the pilot and a Costas loop, and the biphase symbols are
//! recovered by a zero-crossing clock slaved to the carrier phase. Without
//! a pilot the Costas loop alone pulls in the residual carrier.

use std::f64::consts::TAU;

use num_complex::Complex;
use tracing::{debug, warn};
use trx_core::decode::RdsData;
use trx_core::sync::SyncState;
use trx_dsp::{CarrierLoop, Costas, Nco, Pll, Resampler, ZeroCrossingClock};

pub mod block;
pub mod group;

pub use block::{correct_block, encode_block, syndrome, BlockKind, BlockSync, Group};
pub use group::{pty_name, GroupParser};

pub const PILOT_HZ: f64 = 19_000.0;
pub const RDS_SUBCARRIER_HZ: f64 = 57_000.0;
pub const RDS_SYMBOL_RATE: f64 = 1_187.5;
/// Rate pilot and sub-carrier are decimated to: 16 samples per symbol.
pub const BASEBAND_RATE: f64 = 19_000.0;
/// Lowest multiplex rate that still carries the sub-carrier sidebands.
pub const MIN_SAMPLE_RATE: u32 = 128_000;

const PILOT_CUTOFF_HZ: f64 = 1_000.0;
const RDS_CUTOFF_HZ: f64 = 2_400.0;
const PILOT_LOOP_BW: f32 = 0.005;
const COSTAS_LOOP_BW: f32 = 0.01;
const LOOP_DAMPING: f32 = 0.707;
const CLOCK_DIVISOR: f64 = RDS_SUBCARRIER_HZ / RDS_SYMBOL_RATE;
const CLOCK_GAIN: f64 = 0.005;
const CLOCK_WINDOW: u32 = 800;
/// Smoothed pilot magnitude below which the PLL lock is ignored.
const PILOT_MIN_LEVEL: f32 = 1e-3;
const PILOT_LEVEL_ALPHA: f32 = 0.01;

#[derive(Debug, Clone)]
pub struct RdsDecoder {
    sample_rate: u32,
    nco: Nco,
    pilot_resampler: Resampler<Complex<f32>>,
    rds_resampler: Resampler<Complex<f32>>,
    pilot: Pll,
    costas: Costas,
    clock: ZeroCrossingClock,
    blocks: BlockSync,
    groups: GroupParser,
    pilot_level: f32,
    pilot_locked: bool,
}

impl RdsDecoder {
    pub fn new(sample_rate: u32) -> Self {
        if sample_rate < MIN_SAMPLE_RATE {
            warn!(
                "RDS needs at least {} S/s, got {}; clamping",
                MIN_SAMPLE_RATE, sample_rate
            );
        }
        let sample_rate = sample_rate.max(MIN_SAMPLE_RATE);
        let rate = f64::from(sample_rate);
        let mut nco = Nco::new();
        nco.set_freq(PILOT_HZ, rate);
        Self {
            sample_rate,
            nco,
            pilot_resampler: Resampler::new(rate, BASEBAND_RATE, PILOT_CUTOFF_HZ),
            rds_resampler: Resampler::new(rate, BASEBAND_RATE, RDS_CUTOFF_HZ),
            pilot: Pll::new(PILOT_LOOP_BW, LOOP_DAMPING, 1.0, 1),
            costas: Costas::new(COSTAS_LOOP_BW, LOOP_DAMPING, 1.0, 2),
            clock: ZeroCrossingClock::new(CLOCK_DIVISOR, CLOCK_GAIN, CLOCK_WINDOW),
            blocks: BlockSync::new(),
            groups: GroupParser::new(),
            pilot_level: 0.0,
            pilot_locked: false,
        }
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Feed one multiplex sample. Returns the station data whenever a
    /// group changed it.
    pub fn process_sample(&mut self, sample: f32) -> Option<RdsData> {
        let lo = self.nco.next_iq();
        let carrier = lo * lo * lo;

        let mut pilot = None;
        self.pilot_resampler.process(lo * sample, |y| pilot = Some(y));
        let mut rds = None;
        self.rds_resampler.process(carrier * sample, |y| rds = Some(y));

        // Both resamplers share one ratio, so their outputs coincide.
        let (Some(pilot), Some(rds)) = (pilot, rds) else {
            return None;
        };
        self.process_baseband(pilot, rds)
    }

    /// Feed a block of multiplex samples; returns the last update, if any.
    pub fn process_samples(&mut self, samples: &[f32]) -> Option<RdsData> {
        let mut last = None;
        for &sample in samples {
            if let Some(update) = self.process_sample(sample) {
                last = Some(update);
            }
        }
        last
    }

    fn process_baseband(&mut self, pilot: Complex<f32>, rds: Complex<f32>) -> Option<RdsData> {
        self.pilot.feed(pilot);
        self.pilot_level += PILOT_LEVEL_ALPHA * (pilot.norm() - self.pilot_level);
        let locked = self.pilot.locked() && self.pilot_level > PILOT_MIN_LEVEL;
        if locked != self.pilot_locked {
            debug!("RDS pilot {}", if locked { "locked" } else { "lost" });
            self.pilot_locked = locked;
        }

        let nominal_step = TAU * RDS_SUBCARRIER_HZ / BASEBAND_RATE;
        let (rds, step) = if locked {
            let lo = self.pilot.complex().conj();
            let step = nominal_step + 3.0 * f64::from(self.pilot.frequency());
            (rds * lo * lo * lo, step)
        } else {
            (rds, nominal_step)
        };

        self.costas.feed(rds);
        let baseband = self.costas.derotated().re;
        let bit = self.clock.feed(step as f32, baseband)?;
        let group = self.blocks.push_bit(bit)?;
        self.groups
            .apply(&group)
            .then(|| self.groups.data().clone())
    }

    /// Latest station data, once any group has been decoded.
    pub fn snapshot(&self) -> Option<RdsData> {
        self.groups.has_data().then(|| self.groups.data().clone())
    }

    pub fn sync_state(&self) -> SyncState {
        self.blocks.state()
    }

    pub fn pilot_locked(&self) -> bool {
        self.pilot_locked
    }

    /// Biphase symbol quality from the clock, 0..1.
    pub fn quality(&self) -> f32 {
        self.clock.quality()
    }

    pub fn reset(&mut self) {
        *self = Self::new(self.sample_rate);
    }
}

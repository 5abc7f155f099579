// SPDX-FileCopyrightText: 2026 Stanislaw Grams <stanislawgrams@gmail.com>
//
// SPDX-License-Identifier: BSD-2-Clause

//! Symbol timing recovery.
//!
//! - [`FixedRateBitSync`] samples a sliced level stream at a known
//!   samples-per-symbol, re-centring on every edge.
//! - [`CorrelatorSync`] buffers a whole frame of filtered samples and aligns
//!   on a known training sequence.
//! - [`ZeroCrossingClock`] tracks a biphase symbol clock derived from a
//!   carrier phase and integrates half-symbols.

mod correlator;
mod fixed;
mod zero_crossing;

pub use correlator::{gaussian_training, Alignment, CorrelatorConfig, CorrelatorSync};
pub use fixed::FixedRateBitSync;
pub use zero_crossing::ZeroCrossingClock;

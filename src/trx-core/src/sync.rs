// SPDX-FileCopyrightText: 2026 Stanislaw Grams <stanislawgrams@gmail.com>
//
// SPDX-License-Identifier: BSD-2-Clause

//! Frame synchronizer bookkeeping shared by the block decoders.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SyncState {
    #[default]
    Searching,
    Presync,
    Synced,
}

/// Tumbling-window integrity counter. Counts restart after every `window`
/// blocks; sync is declared lost once more than `max_failures` blocks of
/// the current window failed their check.
#[derive(Debug, Clone)]
pub struct SyncMonitor {
    window: u32,
    max_failures: u32,
    total: u32,
    failed: u32,
}

impl SyncMonitor {
    pub fn new(window: u32, max_failures: u32) -> Self {
        let window = window.max(1);
        Self {
            window,
            max_failures: max_failures.min(window),
            total: 0,
            failed: 0,
        }
    }

    /// Record one block outcome. Returns `true` when sync should be dropped.
    pub fn record(&mut self, ok: bool) -> bool {
        self.total += 1;
        if !ok {
            self.failed += 1;
        }
        if self.failed > self.max_failures {
            self.reset();
            return true;
        }
        if self.total >= self.window {
            self.reset();
        }
        false
    }

    pub fn reset(&mut self) {
        self.total = 0;
        self.failed = 0;
    }

    pub fn failed(&self) -> u32 {
        self.failed
    }

    pub fn total(&self) -> u32 {
        self.total
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn drops_after_too_many_failures_in_window() {
        let mut monitor = SyncMonitor::new(50, 35);
        for _ in 0..35 {
            assert!(!monitor.record(false));
        }
        assert!(monitor.record(false));
        assert_eq!(monitor.failed(), 0);
    }

    #[test]
    fn failures_straddling_windows_do_not_add_up() {
        let mut monitor = SyncMonitor::new(10, 3);
        for _ in 0..7 {
            assert!(!monitor.record(true));
        }
        for _ in 0..3 {
            assert!(!monitor.record(false));
        }
        // Six failures in a row, but split 3 + 3 across the boundary.
        for _ in 0..3 {
            assert!(!monitor.record(false));
        }
        assert_eq!(monitor.failed(), 3);
    }

    #[test]
    fn window_rollover_forgets_old_failures() {
        let mut monitor = SyncMonitor::new(10, 3);
        for _ in 0..3 {
            assert!(!monitor.record(false));
        }
        for _ in 0..7 {
            assert!(!monitor.record(true));
        }
        assert_eq!(monitor.total(), 0);
        for _ in 0..3 {
            assert!(!monitor.record(false));
        }
        assert!(monitor.record(false));
    }
}

// SPDX-FileCopyrightText: 2026 Stanislaw Grams <stanislawgrams@gmail.com>
//
// SPDX-License-Identifier: BSD-2-Clause

//! RDS block layer: offset words, syndrome correction and group framing.

use std::sync::OnceLock;

use tracing::debug;
use trx_core::sync::{SyncMonitor, SyncState};

pub const BLOCK_BITS: u32 = 26;
const BLOCK_MASK: u32 = (1 << BLOCK_BITS) - 1;

const OFFSET_A: u16 = 0x0FC;
const OFFSET_B: u16 = 0x198;
const OFFSET_C: u16 = 0x168;
const OFFSET_CP: u16 = 0x350;
const OFFSET_D: u16 = 0x1B4;
/// Generator x^10 + x^8 + x^7 + x^5 + x^4 + x^3 + 1 without the leading term.
const RDS_POLY: u16 = 0x1B9;

/// Longest burst of adjacent bit errors repaired per block.
pub const MAX_BURST: u32 = 2;
pub const SYNC_WINDOW: u32 = 50;
pub const SYNC_MAX_FAILURES: u32 = 35;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockKind {
    A,
    B,
    C,
    CPrime,
    D,
}

impl BlockKind {
    const ALL: [BlockKind; 5] = [Self::A, Self::B, Self::C, Self::CPrime, Self::D];

    pub fn offset(self) -> u16 {
        match self {
            Self::A => OFFSET_A,
            Self::B => OFFSET_B,
            Self::C => OFFSET_C,
            Self::CPrime => OFFSET_CP,
            Self::D => OFFSET_D,
        }
    }

    /// Position of the block within a group.
    pub fn index(self) -> usize {
        match self {
            Self::A => 0,
            Self::B => 1,
            Self::C | Self::CPrime => 2,
            Self::D => 3,
        }
    }
}

fn crc10(data: u16) -> u16 {
    let mut reg = u32::from(data) << 10;
    let poly = u32::from(RDS_POLY);
    for shift in (10..=25).rev() {
        if (reg & (1 << shift)) != 0 {
            reg ^= poly << (shift - 10);
        }
    }
    (reg & 0x03ff) as u16
}

/// Syndrome of a 26-bit block; equals the offset word of an intact block.
pub fn syndrome(word: u32) -> u16 {
    let data = ((word >> 10) & 0xffff) as u16;
    crc10(data) ^ (word & 0x03ff) as u16
}

pub fn encode_block(data: u16, kind: BlockKind) -> u32 {
    (u32::from(data) << 10) | u32::from(crc10(data) ^ kind.offset())
}

/// Syndromes of every error burst up to [`MAX_BURST`] bits long.
fn burst_table() -> &'static [(u16, u32)] {
    static TABLE: OnceLock<Vec<(u16, u32)>> = OnceLock::new();
    TABLE.get_or_init(|| {
        let mut table = Vec::new();
        for len in 1..=MAX_BURST {
            let pattern = (1u32 << len) - 1;
            for shift in 0..=(BLOCK_BITS - len) {
                let error = pattern << shift;
                table.push((syndrome(error), error));
            }
        }
        table
    })
}

/// Check `word` against the offset of `kind`, repairing a short burst if
/// needed. Returns the data word and whether bits were flipped.
pub fn correct_block(word: u32, kind: BlockKind) -> Option<(u16, bool)> {
    let word = word & BLOCK_MASK;
    let residue = syndrome(word) ^ kind.offset();
    if residue == 0 {
        return Some(((word >> 10) as u16, false));
    }
    burst_table()
        .iter()
        .find(|(s, _)| *s == residue)
        .map(|(_, error)| (((word ^ error) >> 10) as u16, true))
}

/// Four data words of one group.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Group {
    pub blocks: [u16; 4],
    /// Third block carried offset C' (version B groups).
    pub c_prime: bool,
    /// Blocks that needed burst correction.
    pub corrected: u32,
}

impl Group {
    pub fn group_type(&self) -> u8 {
        (self.blocks[1] >> 12) as u8
    }

    pub fn version_b(&self) -> bool {
        self.blocks[1] & 0x0800 != 0
    }
}

/// Bit-level block synchroniser.
///
/// Searching slides a 26-bit window one bit at a time looking for an exact
/// offset word. A second hit spaced consistently with the first (same
/// distance in bits as in block positions) acquires sync; from then on
/// blocks are taken every 26 bits and checked against the expected offset.
#[derive(Debug, Clone)]
pub struct BlockSync {
    state: SyncState,
    reg: u32,
    bit_count: u64,
    /// First offset hit while searching: kind, bit position and data.
    presync: Option<(BlockKind, u64, u16)>,
    block_bits: u32,
    expected: usize,
    blocks: [u16; 4],
    good: [bool; 4],
    c_prime: bool,
    corrected: u32,
    monitor: SyncMonitor,
}

impl Default for BlockSync {
    fn default() -> Self {
        Self::new()
    }
}

impl BlockSync {
    pub fn new() -> Self {
        Self {
            state: SyncState::Searching,
            reg: 0,
            bit_count: 0,
            presync: None,
            block_bits: 0,
            expected: 0,
            blocks: [0; 4],
            good: [false; 4],
            c_prime: false,
            corrected: 0,
            monitor: SyncMonitor::new(SYNC_WINDOW, SYNC_MAX_FAILURES),
        }
    }

    pub fn state(&self) -> SyncState {
        self.state
    }

    pub fn is_synced(&self) -> bool {
        self.state == SyncState::Synced
    }

    pub fn reset(&mut self) {
        *self = Self::new();
    }

    pub fn push_bit(&mut self, bit: bool) -> Option<Group> {
        self.reg = ((self.reg << 1) | u32::from(bit)) & BLOCK_MASK;
        self.bit_count += 1;
        if self.state == SyncState::Synced {
            self.block_bits += 1;
            if self.block_bits < BLOCK_BITS {
                return None;
            }
            self.block_bits = 0;
            return self.take_block();
        }
        if self.bit_count >= u64::from(BLOCK_BITS) {
            self.search();
        }
        None
    }

    fn search(&mut self) {
        let s = syndrome(self.reg);
        let Some(kind) = BlockKind::ALL.into_iter().find(|k| k.offset() == s) else {
            return;
        };
        if let Some((prev, at, data)) = self.presync {
            let blocks = match (kind.index() + 4 - prev.index()) % 4 {
                0 => 4,
                n => n,
            };
            if self.bit_count - at == u64::from(BLOCK_BITS) * blocks as u64 {
                self.acquire(kind);
                if prev.index() < kind.index() {
                    self.blocks[prev.index()] = data;
                    self.good[prev.index()] = true;
                    if prev == BlockKind::CPrime {
                        self.c_prime = true;
                    }
                }
                return;
            }
        }
        self.presync = Some((kind, self.bit_count, (self.reg >> 10) as u16));
        self.state = SyncState::Presync;
    }

    fn acquire(&mut self, kind: BlockKind) {
        debug!("RDS block sync acquired on {:?}", kind);
        self.state = SyncState::Synced;
        self.presync = None;
        self.block_bits = 0;
        self.monitor.reset();
        self.good = [false; 4];
        self.corrected = 0;
        let idx = kind.index();
        self.blocks[idx] = (self.reg >> 10) as u16;
        self.good[idx] = true;
        self.c_prime = kind == BlockKind::CPrime;
        self.expected = (idx + 1) % 4;
    }

    fn take_block(&mut self) -> Option<Group> {
        let idx = self.expected;
        let decoded = match idx {
            0 => correct_block(self.reg, BlockKind::A).map(|d| (d, false)),
            1 => correct_block(self.reg, BlockKind::B).map(|d| (d, false)),
            2 => correct_block(self.reg, BlockKind::C)
                .map(|d| (d, false))
                .or_else(|| correct_block(self.reg, BlockKind::CPrime).map(|d| (d, true))),
            _ => correct_block(self.reg, BlockKind::D).map(|d| (d, false)),
        };

        match decoded {
            Some(((data, fixed), c_prime)) => {
                self.blocks[idx] = data;
                self.good[idx] = true;
                if idx == 2 {
                    self.c_prime = c_prime;
                }
                if fixed {
                    self.corrected += 1;
                }
            }
            None => self.good[idx] = false,
        }
        let lost = self.monitor.record(decoded.is_some());
        self.expected = (idx + 1) % 4;

        let mut group = None;
        if idx == 3 {
            if self.good.iter().all(|g| *g) {
                group = Some(Group {
                    blocks: self.blocks,
                    c_prime: self.c_prime,
                    corrected: self.corrected,
                });
            }
            self.good = [false; 4];
            self.corrected = 0;
        }
        if lost {
            debug!("RDS block sync lost");
            self.state = SyncState::Searching;
            self.presync = None;
            self.good = [false; 4];
        }
        group
    }
}

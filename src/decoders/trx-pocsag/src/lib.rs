// SPDX-FileCopyrightText: 2026 Stanislaw Grams <stanislawgrams@gmail.com>
//
// SPDX-License-Identifier: BSD-2-Clause

//! POCSAG paging decoder.
//!
//! Works on the recovered bit stream: finds the batch sync codeword (either
//! polarity, up to three bit errors), BCH-corrects the sixteen codewords of
//! each batch and assembles address and message codewords into
//! [`PagerMessage`]s. A batch not followed by another sync codeword drops
//! sync and flushes whatever message was being assembled, as does a batch
//! where more than half of the codewords are uncorrectable.

use tracing::debug;
use trx_core::decode::PagerMessage;
use trx_core::math::bch::{bch_decode, within_distance};
use trx_core::sync::{SyncMonitor, SyncState};

mod batch;

pub use batch::{MessageAssembler, NUMERIC_CHARS};

pub const SYNC_CODEWORD: u32 = 0x7CD2_15D8;
pub const IDLE_CODEWORD: u32 = 0x7A89_C197;
pub const FRAMES_PER_BATCH: usize = 8;
pub const CODEWORDS_PER_FRAME: usize = 2;
pub const BATCH_CODEWORDS: usize = FRAMES_PER_BATCH * CODEWORDS_PER_FRAME;

/// Largest Hamming distance from the sync codeword still accepted.
pub const SYNC_MAX_ERRORS: u32 = 3;

/// Codewords per integrity window; windows line up with batches.
const SYNC_WINDOW: u32 = BATCH_CODEWORDS as u32;
/// Uncorrectable codewords tolerated per window.
const SYNC_MAX_FAILURES: u32 = 8;

/// Sync test on a 32-bit window. Returns the stream polarity on a match.
fn match_sync(word: u32) -> Option<bool> {
    if within_distance(word, SYNC_CODEWORD, SYNC_MAX_ERRORS) {
        Some(false)
    } else if within_distance(!word, SYNC_CODEWORD, SYNC_MAX_ERRORS) {
        Some(true)
    } else {
        None
    }
}

#[derive(Debug, Clone)]
pub struct PocsagDecoder {
    state: SyncState,
    inverted: bool,
    shift: u32,
    bit_count: u32,
    words: [u32; BATCH_CODEWORDS],
    bch_failed: [bool; BATCH_CODEWORDS],
    /// Codewords received since the last sync codeword; `None` while the
    /// next word must be a sync codeword.
    word_index: Option<usize>,
    assembler: MessageAssembler,
    monitor: SyncMonitor,
    batches: u64,
}

impl Default for PocsagDecoder {
    fn default() -> Self {
        Self::new(Vec::new(), false)
    }
}

impl PocsagDecoder {
    pub fn new(charset: Vec<(u8, char)>, reverse: bool) -> Self {
        Self {
            state: SyncState::Searching,
            inverted: false,
            shift: 0,
            bit_count: 0,
            words: [0; BATCH_CODEWORDS],
            bch_failed: [false; BATCH_CODEWORDS],
            word_index: None,
            assembler: MessageAssembler::new(charset, reverse),
            monitor: SyncMonitor::new(SYNC_WINDOW, SYNC_MAX_FAILURES),
            batches: 0,
        }
    }

    pub fn state(&self) -> SyncState {
        self.state
    }

    pub fn is_synced(&self) -> bool {
        self.state == SyncState::Synced
    }

    /// Whether the incoming bit stream was found to be inverted.
    pub fn inverted(&self) -> bool {
        self.inverted
    }

    /// Complete batches decoded since construction.
    pub fn batches(&self) -> u64 {
        self.batches
    }

    /// Drop sync and any partial message.
    pub fn reset(&mut self) {
        self.state = SyncState::Searching;
        self.inverted = false;
        self.shift = 0;
        self.bit_count = 0;
        self.word_index = None;
        self.assembler.reset();
        self.monitor.reset();
    }

    /// Drop sync, returning the message that was being assembled.
    pub fn flush(&mut self) -> Option<PagerMessage> {
        let pending = self.assembler.flush();
        self.reset();
        pending
    }

    /// Feed one bit as sliced from the channel. Completed messages are
    /// appended to `out`.
    pub fn push_bit(&mut self, bit: bool, out: &mut Vec<PagerMessage>) {
        match self.state {
            SyncState::Searching | SyncState::Presync => self.search(bit),
            SyncState::Synced => self.receive(bit ^ self.inverted, out),
        }
    }

    fn search(&mut self, bit: bool) {
        self.shift = (self.shift << 1) | u32::from(bit);
        self.bit_count = (self.bit_count + 1).min(32);
        if self.bit_count < 32 {
            return;
        }
        if let Some(inverted) = match_sync(self.shift) {
            debug!(
                "POCSAG sync acquired (inverted: {}, errors: {})",
                inverted,
                (self.shift ^ if inverted { !SYNC_CODEWORD } else { SYNC_CODEWORD }).count_ones()
            );
            self.state = SyncState::Synced;
            self.inverted = inverted;
            self.shift = 0;
            self.bit_count = 0;
            self.word_index = Some(0);
            self.monitor.reset();
        }
    }

    fn receive(&mut self, bit: bool, out: &mut Vec<PagerMessage>) {
        self.shift = (self.shift << 1) | u32::from(bit);
        self.bit_count += 1;
        if self.bit_count < 32 {
            return;
        }
        let word = self.shift;
        self.shift = 0;
        self.bit_count = 0;

        let Some(index) = self.word_index else {
            if match_sync(word) == Some(false) {
                self.word_index = Some(0);
            } else {
                debug!("POCSAG sync lost after {} batches", self.batches);
                out.extend(self.flush());
            }
            return;
        };

        let (corrected, failed) = match bch_decode(word) {
            Some(cw) => (cw, false),
            None => (word, true),
        };
        if self.monitor.record(!failed) {
            debug!(
                "POCSAG sync lost: over {} of {} codewords uncorrectable",
                SYNC_MAX_FAILURES, SYNC_WINDOW
            );
            out.extend(self.flush());
            return;
        }
        self.words[index] = corrected;
        self.bch_failed[index] = failed;

        if index + 1 < BATCH_CODEWORDS {
            self.word_index = Some(index + 1);
            return;
        }
        self.word_index = None;
        self.batches += 1;
        for (i, (&word, &failed)) in self.words.iter().zip(&self.bch_failed).enumerate() {
            let frame = i / CODEWORDS_PER_FRAME;
            out.extend(self.assembler.codeword(frame, word, failed));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use trx_core::math::bch::bch_encode_with_parity;

    fn reverse_bits(value: u32, width: u32) -> u32 {
        value.reverse_bits() >> (32 - width)
    }

    fn address_word(address: u32, function: u32) -> u32 {
        bch_encode_with_parity(((address >> 3) << 13) | (function << 11))
    }

    fn message_words_alpha(text: &str) -> Vec<u32> {
        let mut bits: Vec<bool> = Vec::new();
        for &c in text.as_bytes() {
            let code = reverse_bits(u32::from(c), 7);
            bits.extend((0..7).rev().map(|i| (code >> i) & 1 == 1));
        }
        // ETX terminator, then zero padding to whole codewords.
        let etx = reverse_bits(0x03, 7);
        bits.extend((0..7).rev().map(|i| (etx >> i) & 1 == 1));
        while bits.len() % 20 != 0 {
            bits.push(false);
        }
        bits.chunks(20)
            .map(|chunk| {
                let data = chunk.iter().fold(0u32, |acc, &b| (acc << 1) | u32::from(b));
                bch_encode_with_parity(0x8000_0000 | (data << 11))
            })
            .collect()
    }

    fn message_words_numeric(digits: &str) -> Vec<u32> {
        let mut nibbles: Vec<u32> = digits
            .chars()
            .map(|c| {
                let idx = NUMERIC_CHARS.iter().position(|&n| n == c).unwrap_or(12);
                reverse_bits(idx as u32, 4)
            })
            .collect();
        while nibbles.len() % 5 != 0 {
            nibbles.push(reverse_bits(12, 4));
        }
        nibbles
            .chunks(5)
            .map(|chunk| {
                let data = chunk.iter().fold(0u32, |acc, &n| (acc << 4) | n);
                bch_encode_with_parity(0x8000_0000 | (data << 11))
            })
            .collect()
    }

    /// One batch with the message starting in the address's frame slot,
    /// idle everywhere else.
    fn batch(address: u32, function: u32, payload: &[u32]) -> Vec<u32> {
        let mut words = vec![IDLE_CODEWORD; BATCH_CODEWORDS];
        let start = (address & 7) as usize * CODEWORDS_PER_FRAME;
        words[start] = address_word(address, function);
        for (i, &w) in payload.iter().enumerate() {
            words[start + 1 + i] = w;
        }
        words
    }

    fn transmission(batches: &[Vec<u32>]) -> Vec<bool> {
        let mut bits: Vec<bool> = (0..576).map(|i| i % 2 == 0).collect();
        for batch in batches {
            for &word in std::iter::once(&SYNC_CODEWORD).chain(batch.iter()) {
                bits.extend((0..32).rev().map(|i| (word >> i) & 1 == 1));
            }
        }
        bits
    }

    fn decode(bits: &[bool]) -> (PocsagDecoder, Vec<PagerMessage>) {
        let mut decoder = PocsagDecoder::default();
        let mut out = Vec::new();
        for &bit in bits {
            decoder.push_bit(bit, &mut out);
        }
        (decoder, out)
    }

    #[test]
    fn decodes_alphanumeric_batch() {
        let bits = transmission(&[batch(1_234_560, 3, &message_words_alpha("Hello"))]);
        let (decoder, messages) = decode(&bits);
        assert_eq!(decoder.batches(), 1);
        assert_eq!(messages.len(), 1);
        let msg = &messages[0];
        assert_eq!(msg.address, 1_234_560);
        assert_eq!(msg.function_bits, 3);
        assert_eq!(msg.alpha, "Hello");
        assert_eq!(msg.parity_errors, 0);
        assert_eq!(msg.bch_errors, 0);
    }

    #[test]
    fn decodes_numeric_batch() {
        let bits = transmission(&[batch(200_005, 0, &message_words_numeric("0123-456(789)"))]);
        let (_, messages) = decode(&bits);
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].address, 200_005);
        assert_eq!(messages[0].numeric, "0123-456(789)");
    }

    #[test]
    fn inverted_stream_is_detected() {
        let bits: Vec<bool> = transmission(&[batch(42, 1, &message_words_alpha("INV"))])
            .into_iter()
            .map(|b| !b)
            .collect();
        let (decoder, messages) = decode(&bits);
        assert!(decoder.inverted());
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].alpha, "INV");
    }

    #[test]
    fn corrects_bit_errors_in_sync_and_codewords() {
        let mut bits = transmission(&[batch(77, 2, &message_words_alpha("Fix me"))]);
        // Three errors in the sync word, one in each of two codewords.
        for i in [576 + 2, 576 + 9, 576 + 30, 576 + 32 + 32 * 10 + 4, 576 + 32 + 32 * 12 + 17] {
            bits[i] = !bits[i];
        }
        let (_, messages) = decode(&bits);
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].alpha, "Fix me");
        assert_eq!(messages[0].bch_errors, 0);
        assert_eq!(messages[0].parity_errors, 0);
    }

    #[test]
    fn four_errors_in_sync_are_rejected() {
        let mut bits = transmission(&[batch(77, 2, &message_words_alpha("x"))]);
        for i in [576, 576 + 8, 576 + 16, 576 + 24] {
            bits[i] = !bits[i];
        }
        let (decoder, messages) = decode(&bits);
        assert!(messages.is_empty());
        assert_eq!(decoder.batches(), 0);
    }

    #[test]
    fn sync_loss_flushes_pending_message() {
        // A message running to the end of the batch with no terminator.
        let mut words = vec![IDLE_CODEWORD; BATCH_CODEWORDS];
        words[14] = address_word(7, 0);
        words[15] = message_words_numeric("12345")[0];
        let mut bits = transmission(&[words]);
        bits.extend((0..32).map(|i| i % 3 == 0));
        let (decoder, messages) = decode(&bits);
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].numeric, "12345");
        assert!(!decoder.is_synced());
    }

    #[test]
    fn uncorrectable_batch_drops_sync() {
        // Message left open at the end of the first batch.
        let mut first = vec![IDLE_CODEWORD; BATCH_CODEWORDS];
        first[14] = address_word(7, 0);
        first[15] = message_words_numeric("12345")[0];
        // Valid sync codeword, but every codeword carries a 3-bit burst.
        let garbage: Vec<u32> = (0..BATCH_CODEWORDS)
            .map(|i| IDLE_CODEWORD ^ (0b111 << (i + 1)))
            .collect();
        let third = batch(42, 1, &message_words_alpha("OK"));

        let mut bits = transmission(&[first, garbage.clone()]);
        let mut decoder = PocsagDecoder::default();
        let mut messages = Vec::new();
        // Sync words plus the first eight bad codewords of the second batch.
        let tolerated = 576 + 2 * 32 + BATCH_CODEWORDS * 32 + 8 * 32;
        for &bit in &bits[..tolerated] {
            decoder.push_bit(bit, &mut messages);
        }
        assert!(decoder.is_synced());
        assert!(messages.is_empty());
        for &bit in &bits[tolerated..tolerated + 32] {
            decoder.push_bit(bit, &mut messages);
        }
        assert!(!decoder.is_synced());
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].numeric, "12345");

        // The rest of the bad batch is ignored and the next sync is found.
        bits.clear();
        for &word in &garbage[9..] {
            bits.extend((0..32).rev().map(|i| (word >> i) & 1 == 1));
        }
        for &word in std::iter::once(&SYNC_CODEWORD).chain(third.iter()) {
            bits.extend((0..32).rev().map(|i| (word >> i) & 1 == 1));
        }
        for &bit in &bits {
            decoder.push_bit(bit, &mut messages);
        }
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[1].address, 42);
        assert_eq!(messages[1].alpha, "OK");
        assert_eq!(decoder.batches(), 2);
    }

    #[test]
    fn idle_codeword_ends_message() {
        let mut words = vec![IDLE_CODEWORD; BATCH_CODEWORDS];
        words[0] = address_word(8, 0);
        words[1] = message_words_numeric("911")[0];
        // Idle at 2, then a stray message codeword with no address.
        words[3] = message_words_numeric("999")[0];
        let (_, messages) = decode(&transmission(&[words]));
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].numeric, "911");
    }

    #[test]
    fn message_continues_across_batches() {
        let long = message_words_alpha("A fairly long alphanumeric page spanning batches");
        assert!(long.len() > 8);
        let mut first = vec![IDLE_CODEWORD; BATCH_CODEWORDS];
        first[12] = address_word(6, 3);
        first[13..].copy_from_slice(&long[..3]);
        let mut second = vec![IDLE_CODEWORD; BATCH_CODEWORDS];
        second[..long.len() - 3].copy_from_slice(&long[3..]);
        let (_, messages) = decode(&transmission(&[first, second]));
        assert_eq!(messages.len(), 1);
        assert_eq!(
            messages[0].alpha,
            "A fairly long alphanumeric page spanning batches"
        );
    }
}

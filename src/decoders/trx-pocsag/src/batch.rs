// SPDX-FileCopyrightText: 2026 Stanislaw Grams <stanislawgrams@gmail.com>
//
// SPDX-License-Identifier: BSD-2-Clause

//! Codeword to message assembly.

use trx_core::decode::PagerMessage;
use trx_core::math::bch::even_parity_ok;

use crate::IDLE_CODEWORD;

/// Numeric paging characters, indexed by the bit-reversed BCD nibble.
pub const NUMERIC_CHARS: [char; 16] = [
    '0', '1', '2', '3', '4', '5', '6', '7', '8', '9', '.', 'U', ' ', '-', ')', '(',
];

const NUL: u8 = 0x00;
const ETX: u8 = 0x03;
const EOT: u8 = 0x04;

fn reverse_bits(value: u32, width: u32) -> u32 {
    value.reverse_bits() >> (32 - width)
}

/// Accumulates the message codewords following an address codeword.
///
/// Every message is decoded both as numeric (4-bit BCD) and as 7-bit
/// alphanumeric text; the consumer picks whichever makes sense for the
/// function bits in use.
#[derive(Debug, Clone, Default)]
pub struct MessageAssembler {
    pending: Option<PagerMessage>,
    alpha_buf: u32,
    alpha_bits: u32,
    alpha: Vec<u8>,
    charset: Vec<(u8, char)>,
    reverse: bool,
}

impl MessageAssembler {
    /// `charset` remaps 7-bit codes to other characters; `reverse` flips
    /// the alphanumeric text for right-to-left scripts.
    pub fn new(charset: Vec<(u8, char)>, reverse: bool) -> Self {
        Self {
            charset,
            reverse,
            ..Self::default()
        }
    }

    pub fn has_pending(&self) -> bool {
        self.pending.is_some()
    }

    /// Feed one received (possibly corrected) codeword. Returns a message
    /// when this codeword terminates one: a new address or an idle word.
    pub fn codeword(&mut self, frame: usize, word: u32, bch_failed: bool) -> Option<PagerMessage> {
        // Idle ends the message as well; later message codewords without a
        // new address are dropped.
        if word == IDLE_CODEWORD {
            return self.flush();
        }
        let parity_error = !even_parity_ok(word);

        if word & 0x8000_0000 == 0 {
            let finished = self.flush();
            let address_bits = (word >> 13) & 0x3_FFFF;
            self.pending = Some(PagerMessage {
                address: (address_bits << 3) | (frame as u32 & 0x7),
                function_bits: ((word >> 11) & 0x3) as u8,
                parity_errors: u32::from(parity_error),
                bch_errors: u32::from(bch_failed),
                ..PagerMessage::default()
            });
            return finished;
        }

        let message = self.pending.as_mut()?;
        message.parity_errors += u32::from(parity_error);
        message.bch_errors += u32::from(bch_failed);

        let bits = (word >> 11) & 0xF_FFFF;
        for shift in (0..=16).rev().step_by(4) {
            let nibble = reverse_bits((bits >> shift) & 0xF, 4);
            message.numeric.push(NUMERIC_CHARS[nibble as usize]);
        }

        self.alpha_buf = (self.alpha_buf << 20) | bits;
        self.alpha_bits += 20;
        while self.alpha_bits >= 7 {
            let code = reverse_bits((self.alpha_buf >> (self.alpha_bits - 7)) & 0x7F, 7) as u8;
            if !matches!(code, NUL | ETX | EOT) {
                self.alpha.push(code);
            }
            self.alpha_bits -= 7;
            self.alpha_buf &= (1 << self.alpha_bits) - 1;
        }
        None
    }

    /// Complete the pending message, if any.
    pub fn flush(&mut self) -> Option<PagerMessage> {
        let mut message = self.pending.take()?;
        message.numeric = message.numeric.trim().to_string();
        let mut alpha: Vec<char> = self
            .alpha
            .iter()
            .map(|&code| {
                self.charset
                    .iter()
                    .find(|(from, _)| *from == code)
                    .map(|&(_, to)| to)
                    .unwrap_or(char::from(code))
            })
            .collect();
        if self.reverse {
            alpha.reverse();
        }
        message.alpha = alpha.into_iter().collect();
        self.alpha.clear();
        self.alpha_buf = 0;
        self.alpha_bits = 0;
        Some(message)
    }

    pub fn reset(&mut self) {
        self.pending = None;
        self.alpha.clear();
        self.alpha_buf = 0;
        self.alpha_bits = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use trx_core::math::bch::bch_encode_with_parity;

    fn address_word(address: u32, function: u32) -> u32 {
        bch_encode_with_parity(((address >> 3) << 13) | (function << 11))
    }

    fn message_word(bits: u32) -> u32 {
        bch_encode_with_parity(0x8000_0000 | (bits << 11))
    }

    #[test]
    fn numeric_nibbles_are_bit_reversed() {
        let mut asm = MessageAssembler::default();
        assert!(asm.codeword(5, address_word(0x1235, 0), false).is_none());
        // "1", "2", "3", then spaces.
        let digits = [1u32, 2, 3, 12, 12];
        let bits = digits
            .iter()
            .fold(0u32, |acc, &d| (acc << 4) | reverse_bits(d, 4));
        asm.codeword(5, message_word(bits), false);
        let msg = asm.flush().expect("pending message");
        assert_eq!(msg.address, 0x1235);
        assert_eq!(msg.numeric, "123");
        assert_eq!(msg.parity_errors, 0);
    }

    #[test]
    fn charset_remap_and_reverse() {
        let mut asm = MessageAssembler::new(vec![(b'[', 'Ä')], true);
        asm.codeword(0, address_word(8, 3), false);
        let mut stream = 0u64;
        for &c in b"[b" {
            stream = (stream << 7) | u64::from(reverse_bits(u32::from(c), 7));
        }
        // 14 bits of text, padded to 20 with NUL bits.
        asm.codeword(0, message_word((stream << 6) as u32), false);
        let msg = asm.flush().expect("pending message");
        assert_eq!(msg.alpha, "bÄ");
        assert_eq!(msg.function_bits, 3);
    }

    #[test]
    fn message_words_without_address_are_dropped() {
        let mut asm = MessageAssembler::default();
        assert!(asm.codeword(0, message_word(0x12345), false).is_none());
        assert!(asm.flush().is_none());
    }

    #[test]
    fn idle_flushes_and_closes_message() {
        let mut asm = MessageAssembler::default();
        asm.codeword(2, address_word(0x42, 1), false);
        asm.codeword(2, message_word(0x12345), false);
        let msg = asm.codeword(2, IDLE_CODEWORD, false).expect("idle ends message");
        assert_eq!(msg.address, 0x42);
        assert!(!asm.has_pending());
        assert!(asm.codeword(2, message_word(0x54321), false).is_none());
        assert!(asm.flush().is_none());
    }

    #[test]
    fn error_flags_accumulate() {
        let mut asm = MessageAssembler::default();
        asm.codeword(1, address_word(9, 0) ^ 1, false);
        asm.codeword(1, message_word(0), true);
        let msg = asm.codeword(1, IDLE_CODEWORD, false).expect("idle ends message");
        assert_eq!(msg.parity_errors, 1);
        assert_eq!(msg.bch_errors, 1);
    }
}

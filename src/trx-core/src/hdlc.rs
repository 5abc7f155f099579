// SPDX-FileCopyrightText: 2026 Stanislaw Grams <stanislawgrams@gmail.com>
//
// SPDX-License-Identifier: BSD-2-Clause

//! HDLC bit-level framing shared by AX.25 and AIS.
//!
//! Input bits are already NRZI-decoded. Frames are delimited by `0x7E`
//! flags, five consecutive ones are followed by a stuffed zero, and seven or
//! more ones abort the frame in progress. Bytes are packed LSB first and the
//! trailing two bytes carry a little-endian CRC-16/X-25.

use crate::math::crc::x25_frame_ok;

/// NRZI line decoder: no transition is a one, a transition is a zero.
#[derive(Debug, Clone, Default)]
pub struct NrziDecoder {
    prev: bool,
}

impl NrziDecoder {
    pub fn decode(&mut self, level: bool) -> bool {
        let bit = level == self.prev;
        self.prev = level;
        bit
    }

    pub fn reset(&mut self) {
        self.prev = false;
    }
}

#[derive(Debug, Clone)]
pub struct HdlcDeframer {
    min_len: usize,
    max_len: usize,
    ones: u32,
    in_frame: bool,
    shift: u8,
    shift_bits: u8,
    bytes: Vec<u8>,
    crc_failures: u64,
}

impl HdlcDeframer {
    /// `min_len`/`max_len` bound the frame length including the two FCS bytes.
    pub fn new(min_len: usize, max_len: usize) -> Self {
        let min_len = min_len.max(3);
        Self {
            min_len,
            max_len: max_len.max(min_len),
            ones: 0,
            in_frame: false,
            shift: 0,
            shift_bits: 0,
            bytes: Vec::with_capacity(max_len),
            crc_failures: 0,
        }
    }

    pub fn in_frame(&self) -> bool {
        self.in_frame
    }

    /// Frames rejected by the FCS check since construction.
    pub fn crc_failures(&self) -> u64 {
        self.crc_failures
    }

    pub fn reset(&mut self) {
        self.ones = 0;
        self.abort();
    }

    fn abort(&mut self) {
        self.in_frame = false;
        self.bytes.clear();
        self.shift = 0;
        self.shift_bits = 0;
    }

    fn start_frame(&mut self) {
        self.abort();
        self.in_frame = true;
    }

    fn push_data_bit(&mut self, bit: bool) {
        if !self.in_frame {
            return;
        }
        self.shift >>= 1;
        if bit {
            self.shift |= 0x80;
        }
        self.shift_bits += 1;
        if self.shift_bits == 8 {
            self.bytes.push(self.shift);
            self.shift = 0;
            self.shift_bits = 0;
            if self.bytes.len() > self.max_len {
                self.abort();
            }
        }
    }

    /// Feed one decoded bit. Returns the frame payload (FCS stripped) when a
    /// closing flag completes a frame with a valid checksum.
    pub fn push_bit(&mut self, bit: bool) -> Option<Vec<u8>> {
        if bit {
            self.ones += 1;
            if self.ones >= 7 {
                self.abort();
            }
            return None;
        }

        let ones = std::mem::take(&mut self.ones);
        match ones {
            6 => {
                // The flag's leading zero was pushed as data; partial bits are dropped.
                let frame = if self.in_frame && self.bytes.len() >= self.min_len {
                    Some(std::mem::take(&mut self.bytes))
                } else {
                    None
                };
                self.start_frame();
                let mut frame = frame?;
                if !x25_frame_ok(&frame) {
                    self.crc_failures += 1;
                    return None;
                }
                frame.truncate(frame.len() - 2);
                Some(frame)
            }
            5 => {
                for _ in 0..5 {
                    self.push_data_bit(true);
                }
                None
            }
            n if n >= 7 => None,
            n => {
                for _ in 0..n {
                    self.push_data_bit(true);
                }
                self.push_data_bit(false);
                None
            }
        }
    }
}

/// Build the on-air bit sequence for `payload`: FCS appended, bit-stuffed,
/// wrapped in flags. Used by tests and signal generators.
pub fn frame_bits(payload: &[u8], leading_flags: usize) -> Vec<bool> {
    let mut frame = payload.to_vec();
    frame.extend_from_slice(&crate::math::crc::crc16_x25(payload).to_le_bytes());

    let flag = |bits: &mut Vec<bool>| {
        for i in 0..8 {
            bits.push((0x7Eu8 >> i) & 1 == 1);
        }
    };

    let mut bits = Vec::with_capacity(frame.len() * 10 + 8 * (leading_flags + 1));
    for _ in 0..leading_flags.max(1) {
        flag(&mut bits);
    }
    let mut ones = 0;
    for byte in frame {
        for i in 0..8 {
            let bit = (byte >> i) & 1 == 1;
            bits.push(bit);
            if bit {
                ones += 1;
                if ones == 5 {
                    bits.push(false);
                    ones = 0;
                }
            } else {
                ones = 0;
            }
        }
    }
    flag(&mut bits);
    bits
}

/// NRZI-encode a bit sequence starting from `level`.
pub fn nrzi_encode(bits: &[bool], mut level: bool) -> Vec<bool> {
    bits.iter()
        .map(|&bit| {
            if !bit {
                level = !level;
            }
            level
        })
        .collect()
}

// SPDX-FileCopyrightText: 2026 Stanislaw Grams <stanislawgrams@gmail.com>
//
// SPDX-License-Identifier: BSD-2-Clause

//! BCH(31,21) codeword algebra with an even parity bit, as used by POCSAG.
//!
//! A codeword is laid out MSB first as 21 data bits, 10 BCH check bits and a
//! trailing even parity bit.

/// Generator polynomial x^10 + x^9 + x^8 + x^6 + x^5 + x^3 + 1.
pub const BCH_POLY: u32 = 0x769;

/// Generator aligned to the top of a 32-bit register.
const BCH_POLY_MSB: u32 = BCH_POLY << 21;

const DATA_MASK: u32 = 0xFFFF_F800;

/// Syndromes that indicate an error in the current MSB of the shift register.
/// The first entry is the single-error pattern; the rest cover a second error
/// 1..=30 bits further along.
const MSB_ERROR_SYNDROMES: [u16; 31] = [
    0x3B4, 0x26E, 0x359, 0x076, 0x255, 0x0F0, 0x216, 0x365, 0x068, 0x25A, 0x343, 0x07B, 0x1E7,
    0x129, 0x14E, 0x2C9, 0x0BE, 0x231, 0x0C2, 0x20F, 0x0DD, 0x1B4, 0x2B4, 0x334, 0x3F4, 0x394,
    0x3A4, 0x3BC, 0x3B0, 0x3B6, 0x3B5,
];

/// Recompute the 10 BCH check bits for the 21 data bits of `word`.
///
/// The parity bit (bit 0) of the result is always clear.
pub fn bch_encode(word: u32) -> u32 {
    let data = word & DATA_MASK;
    let mut reg = data;
    for _ in 0..21 {
        if reg & 0x8000_0000 != 0 {
            reg ^= BCH_POLY_MSB;
        }
        reg <<= 1;
    }
    data | (reg >> 21)
}

/// Encode the data bits of `word` and append the even parity bit.
pub fn bch_encode_with_parity(word: u32) -> u32 {
    let encoded = bch_encode(word);
    encoded | (encoded.count_ones() & 1)
}

/// 10-bit syndrome of a received codeword. Zero means no detectable error.
pub fn bch_syndrome(word: u32) -> u16 {
    (((bch_encode(word) ^ word) >> 1) & 0x3FF) as u16
}

/// Meggitt decoder: correct up to two bit errors in bits 31..1.
///
/// Returns the corrected codeword (the received parity bit is carried over
/// unchanged) or `None` when the syndrome does not clear after 31 shifts.
pub fn bch_decode(word: u32) -> Option<u32> {
    let mut syndrome = bch_syndrome(word);
    if syndrome == 0 {
        return Some(word);
    }

    let mut result = 0u32;
    let mut damaged = word;
    for _ in 0..31 {
        result <<= 1;
        if MSB_ERROR_SYNDROMES.contains(&syndrome) {
            syndrome ^= MSB_ERROR_SYNDROMES[0];
            result |= (!damaged & 0x8000_0000) >> 30;
        } else {
            result |= (damaged & 0x8000_0000) >> 30;
        }
        damaged <<= 1;

        syndrome = if syndrome & 0x200 != 0 {
            (syndrome << 1) ^ BCH_POLY as u16
        } else {
            syndrome << 1
        };
        syndrome &= 0x3FF;
    }

    if syndrome != 0 {
        return None;
    }
    Some(result | (word & 1))
}

/// Whether bits 31..1 of `word` have even parity with bit 0.
pub fn even_parity_ok(word: u32) -> bool {
    let ones = (word >> 1).count_ones();
    (ones & 1) == (word & 1)
}

/// Number of differing bits between `word` and `pattern`.
#[inline]
pub fn hamming_distance(word: u32, pattern: u32) -> u32 {
    (word ^ pattern).count_ones()
}

/// Bounded-distance sync test: accept when at most `max_errors` bits differ.
#[inline]
pub fn within_distance(word: u32, pattern: u32, max_errors: u32) -> bool {
    hamming_distance(word, pattern) <= max_errors
}

#[cfg(test)]
mod tests {
    use super::*;

    const SYNC: u32 = 0x7CD2_15D8;
    const IDLE: u32 = 0x7A89_C197;

    fn sample_codewords() -> Vec<u32> {
        let mut seed = 0x1234_5678u32;
        (0..64)
            .map(|_| {
                seed = seed.wrapping_mul(1_664_525).wrapping_add(1_013_904_223);
                bch_encode_with_parity(seed)
            })
            .collect()
    }

    #[test]
    fn sync_codeword_check_bits() {
        assert_eq!(bch_encode(0x7CD2_1000), SYNC);
        assert_eq!(bch_syndrome(SYNC), 0);
        assert_eq!(bch_syndrome(IDLE), 0);
        assert!(even_parity_ok(SYNC));
        assert!(even_parity_ok(IDLE));
    }

    #[test]
    fn valid_codewords_have_zero_syndrome() {
        for cw in sample_codewords() {
            assert_eq!(bch_syndrome(cw), 0, "codeword {cw:#010x}");
            assert!(even_parity_ok(cw));
            assert_eq!(bch_decode(cw), Some(cw));
        }
    }

    #[test]
    fn single_bit_errors_are_corrected() {
        for cw in sample_codewords() {
            for bit in 1..32 {
                let damaged = cw ^ (1 << bit);
                assert_eq!(bch_decode(damaged), Some(cw), "bit {bit} of {cw:#010x}");
            }
        }
    }

    #[test]
    fn double_bit_errors_are_corrected() {
        let cw = bch_encode_with_parity(0xDEAD_B000);
        for a in 1..32 {
            for b in (a + 1)..32 {
                let damaged = cw ^ (1 << a) ^ (1 << b);
                assert_eq!(bch_decode(damaged), Some(cw), "bits {a},{b}");
            }
        }
    }

    #[test]
    fn parity_bit_error_is_reported_by_parity_check() {
        let cw = bch_encode_with_parity(0x1357_9000);
        let damaged = cw ^ 1;
        assert_eq!(bch_decode(damaged), Some(damaged));
        assert!(!even_parity_ok(damaged));
    }

    #[test]
    fn bounded_distance_accepts_up_to_three_errors() {
        assert!(within_distance(SYNC, SYNC, 3));
        assert!(within_distance(SYNC ^ 0x8000_0001, SYNC, 3));
        assert!(within_distance(SYNC ^ 0x0001_0101, SYNC, 3));
        assert!(!within_distance(SYNC ^ 0x0101_0101, SYNC, 3));
        assert!(within_distance(!SYNC ^ 0x4, !SYNC, 3));
    }
}

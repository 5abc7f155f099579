// SPDX-FileCopyrightText: 2026 Stanislaw Grams <stanislawgrams@gmail.com>
//
// SPDX-License-Identifier: BSD-2-Clause

//! Systematic Reed-Solomon codec over GF(2^8).
//!
//! Field polynomial x^8 + x^4 + x^3 + x^2 + 1 (0x11d), primitive element 2.
//! Codewords are stored data first, parity last, with byte 0 as the
//! highest-degree coefficient. Shortened codes are handled by passing a
//! block shorter than 255 bytes.

use thiserror::Error;

const GF_POLY: u16 = 0x11d;
const NN: usize = 255;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RsError {
    #[error("block length {0} must exceed the parity length and fit in 255 bytes")]
    BadLength(usize),
    #[error("codeword is uncorrectable")]
    Uncorrectable,
}

struct GaloisField {
    exp: [u8; 2 * NN],
    log: [u8; 256],
}

const fn build_field(poly: u16) -> GaloisField {
    let mut exp = [0u8; 2 * NN];
    let mut log = [0u8; 256];
    let mut x: u16 = 1;
    let mut i = 0usize;
    while i < NN {
        exp[i] = x as u8;
        log[x as usize] = i as u8;
        x <<= 1;
        if x & 0x100 != 0 {
            x ^= poly;
        }
        i += 1;
    }
    while i < 2 * NN {
        exp[i] = exp[i - NN];
        i += 1;
    }
    GaloisField { exp, log }
}

static GF: GaloisField = build_field(GF_POLY);

#[inline]
fn gf_mul(a: u8, b: u8) -> u8 {
    if a == 0 || b == 0 {
        return 0;
    }
    GF.exp[GF.log[a as usize] as usize + GF.log[b as usize] as usize]
}

#[inline]
fn gf_inv(a: u8) -> u8 {
    GF.exp[NN - GF.log[a as usize] as usize]
}

#[inline]
fn gf_pow_alpha(power: isize) -> u8 {
    GF.exp[power.rem_euclid(NN as isize) as usize]
}

/// Evaluate a lowest-degree-first polynomial at `x`.
fn eval_ascending(poly: &[u8], x: u8) -> u8 {
    let mut acc = 0u8;
    for &c in poly.iter().rev() {
        acc = gf_mul(acc, x) ^ c;
    }
    acc
}

/// An RS code with `nroots` parity bytes and first consecutive root `fcr`.
#[derive(Debug, Clone)]
pub struct ReedSolomon {
    nroots: usize,
    fcr: usize,
    /// Generator polynomial, highest degree first, monic.
    generator: Vec<u8>,
}

impl ReedSolomon {
    pub fn new(nroots: usize, fcr: usize) -> Self {
        let nroots = nroots.clamp(1, NN - 1);
        let mut generator = vec![1u8];
        for i in 0..nroots {
            let root = gf_pow_alpha((fcr + i) as isize);
            let mut next = generator.clone();
            next.push(0);
            for (j, &g) in generator.iter().enumerate() {
                next[j + 1] ^= gf_mul(g, root);
            }
            generator = next;
        }
        Self {
            nroots,
            fcr,
            generator,
        }
    }

    pub fn nroots(&self) -> usize {
        self.nroots
    }

    /// Maximum number of byte errors a codeword can carry and still decode.
    pub fn correction_capacity(&self) -> usize {
        self.nroots / 2
    }

    /// Compute parity for `data`, returning `nroots` bytes.
    pub fn encode(&self, data: &[u8]) -> Vec<u8> {
        let mut rem = vec![0u8; self.nroots];
        for &d in data {
            let feedback = d ^ rem[0];
            rem.rotate_left(1);
            rem[self.nroots - 1] = 0;
            if feedback != 0 {
                for (r, &g) in rem.iter_mut().zip(&self.generator[1..]) {
                    *r ^= gf_mul(feedback, g);
                }
            }
        }
        rem
    }

    fn syndromes(&self, block: &[u8]) -> Vec<u8> {
        (0..self.nroots)
            .map(|j| {
                let root = gf_pow_alpha((self.fcr + j) as isize);
                block.iter().fold(0u8, |acc, &b| gf_mul(acc, root) ^ b)
            })
            .collect()
    }

    /// Berlekamp-Massey: error locator polynomial, lowest degree first.
    fn error_locator(&self, syndromes: &[u8]) -> (Vec<u8>, usize) {
        let n = self.nroots;
        let mut lambda = vec![0u8; n + 1];
        lambda[0] = 1;
        let mut prev = lambda.clone();
        let mut order = 0usize;
        let mut shift = 1usize;
        let mut prev_discrepancy = 1u8;

        for k in 0..n {
            let mut discrepancy = syndromes[k];
            for i in 1..=order {
                discrepancy ^= gf_mul(lambda[i], syndromes[k - i]);
            }
            if discrepancy == 0 {
                shift += 1;
                continue;
            }
            let saved = lambda.clone();
            let coef = gf_mul(discrepancy, gf_inv(prev_discrepancy));
            if shift <= n {
                for i in 0..=(n - shift) {
                    lambda[i + shift] ^= gf_mul(coef, prev[i]);
                }
            }
            if 2 * order <= k {
                order = k + 1 - order;
                prev = saved;
                prev_discrepancy = discrepancy;
                shift = 1;
            } else {
                shift += 1;
            }
        }
        (lambda, order)
    }

    /// Correct `block` (data followed by parity) in place.
    ///
    /// Returns the number of corrected byte errors.
    pub fn decode(&self, block: &mut [u8]) -> Result<usize, RsError> {
        let len = block.len();
        if len > NN || len <= self.nroots {
            return Err(RsError::BadLength(len));
        }

        let syndromes = self.syndromes(block);
        if syndromes.iter().all(|&s| s == 0) {
            return Ok(0);
        }

        let (lambda, order) = self.error_locator(&syndromes);
        let degree = lambda.iter().rposition(|&c| c != 0).unwrap_or(0);
        if degree != order || order > self.correction_capacity() {
            return Err(RsError::Uncorrectable);
        }

        let mut omega = vec![0u8; self.nroots];
        for (i, o) in omega.iter_mut().enumerate() {
            for j in 0..=i {
                *o ^= gf_mul(syndromes[j], lambda[i - j]);
            }
        }

        // Chien search over the (possibly shortened) block.
        let mut locations = Vec::with_capacity(order);
        for pos in 0..len {
            let power = (len - 1 - pos) as isize;
            let x_inv = gf_pow_alpha(-power);
            if eval_ascending(&lambda, x_inv) == 0 {
                locations.push((pos, power, x_inv));
            }
        }
        if locations.len() != order {
            return Err(RsError::Uncorrectable);
        }

        // Forney.
        let mut corrections = Vec::with_capacity(order);
        for &(pos, power, x_inv) in &locations {
            let numerator = eval_ascending(&omega, x_inv);
            let x_inv_sq = gf_mul(x_inv, x_inv);
            let mut derivative = 0u8;
            let mut term = 1u8;
            for i in (1..lambda.len()).step_by(2) {
                derivative ^= gf_mul(lambda[i], term);
                term = gf_mul(term, x_inv_sq);
            }
            if derivative == 0 {
                return Err(RsError::Uncorrectable);
            }
            let scale = gf_pow_alpha(power * (1 - self.fcr as isize));
            let magnitude = gf_mul(gf_mul(numerator, gf_inv(derivative)), scale);
            corrections.push((pos, magnitude));
        }

        for (pos, magnitude) in corrections {
            block[pos] ^= magnitude;
        }
        Ok(order)
    }
}

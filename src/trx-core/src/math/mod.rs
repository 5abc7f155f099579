// SPDX-FileCopyrightText: 2025 Stanislaw Grams <stanislawgrams@gmail.com>
//
// SPDX-License-Identifier: BSD-2-Clause

pub mod bch;
pub mod crc;
pub mod reed_solomon;

pub use bch::{bch_decode, bch_encode, bch_syndrome, even_parity_ok, within_distance};
pub use crc::{crc16_ccitt_false, crc16_x25, x25_frame_ok};
pub use reed_solomon::{ReedSolomon, RsError};

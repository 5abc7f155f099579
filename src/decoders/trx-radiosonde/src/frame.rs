// SPDX-FileCopyrightText: 2026 Stanislaw Grams <stanislawgrams@gmail.com>
//
// SPDX-License-Identifier: BSD-2-Clause

//! RS41 frame layout: descrambling, interleaved Reed-Solomon, sub-block
//! CRCs and field extraction.
//!
//! A frame starts with the 8-byte header and 48 parity bytes, then the
//! frame type byte at 0x38 and a chain of `id, len, payload, crc16` blocks.

use trx_core::decode::RadiosondeFrame;
use trx_core::math::crc::crc16_ccitt_false;
use trx_core::math::reed_solomon::{ReedSolomon, RsError};

use crate::geo::{ecef_to_geodetic, ecef_velocity_to_ground};

/// Header as it appears on air, before descrambling.
pub const HEADER: [u8; 8] = [0x10, 0xB6, 0xCA, 0x11, 0x22, 0x96, 0x12, 0xF8];
/// `HEADER` as a shift register filled LSB first.
pub const HEADER_BITS: u64 = 0xF812_9622_11CA_B610;

pub const FRAME_LEN_STD: usize = 320;
pub const FRAME_LEN_EXT: usize = 518;
pub const FRAME_TYPE_STD: u8 = 0x0F;
pub const OFFSET_FRAME_TYPE: usize = 0x38;
const OFFSET_RS: usize = 0x08;
const OFFSET_BLOCK_0: usize = 0x39;

const RS_PARITY: usize = 24;
const RS_INTERLEAVE: usize = 2;

pub const BLOCK_STATUS: u8 = 0x79;
pub const BLOCK_MEAS: u8 = 0x7A;
pub const BLOCK_GPS_POS: u8 = 0x7B;
pub const BLOCK_GPS_INFO: u8 = 0x7C;
pub const BLOCK_GPS_RAW: u8 = 0x7D;
pub const BLOCK_EMPTY: u8 = 0x76;

pub const DESCRAMBLE: [u8; 64] = [
    0x96, 0x83, 0x3E, 0x51, 0xB1, 0x49, 0x08, 0x98, 0x32, 0x05, 0x59, 0x0E, 0xF9, 0x44, 0xC6,
    0x26, 0x21, 0x60, 0xC2, 0xEA, 0x79, 0x5D, 0x6D, 0xA1, 0x54, 0x69, 0x47, 0x0C, 0xDC, 0xE8,
    0x5C, 0xF1, 0xF7, 0x76, 0x82, 0x7F, 0x07, 0x99, 0xA2, 0x2C, 0x93, 0x7C, 0x30, 0x63, 0xF5,
    0x10, 0x2E, 0x61, 0xD0, 0xBC, 0xB4, 0xB6, 0x06, 0xAA, 0xF4, 0x23, 0x78, 0x6E, 0x3B, 0xAE,
    0xBF, 0x7B, 0x4C, 0xC1,
];

const FLIGHT_PHASES: [&str; 4] = ["Ground", "Ascent", "0x2", "Descent"];

pub fn frame_len(frame_type: u8) -> usize {
    if frame_type == FRAME_TYPE_STD {
        FRAME_LEN_STD
    } else {
        FRAME_LEN_EXT
    }
}

/// XOR with the repeating 64-byte mask; applying it twice is a no-op.
pub fn descramble(bytes: &mut [u8]) {
    for (i, b) in bytes.iter_mut().enumerate() {
        *b ^= DESCRAMBLE[i & 0x3f];
    }
}

/// Data bytes per interleaved codeword for a frame of `len` bytes.
fn rs_data_len(len: usize) -> usize {
    len.saturating_sub(OFFSET_FRAME_TYPE) / RS_INTERLEAVE
}

/// Gather one interleaved codeword. The code is defined lowest degree
/// first, so both data and parity are reversed into the codec's layout.
fn gather(frame: &[u8], lane: usize, data_len: usize) -> Vec<u8> {
    let mut block = vec![0u8; data_len + RS_PARITY];
    for j in 0..data_len {
        block[data_len - 1 - j] = frame[OFFSET_FRAME_TYPE + j * RS_INTERLEAVE + lane];
    }
    for j in 0..RS_PARITY {
        block[data_len + RS_PARITY - 1 - j] = frame[OFFSET_RS + lane * RS_PARITY + j];
    }
    block
}

/// Reed-Solomon (255,231) correction of both codewords of a descrambled
/// frame, in place. Returns the number of corrected bytes.
pub fn correct(rs: &ReedSolomon, frame: &mut [u8]) -> Result<usize, RsError> {
    if !matches!(frame.len(), FRAME_LEN_STD | FRAME_LEN_EXT) {
        return Err(RsError::BadLength(frame.len()));
    }
    let data_len = rs_data_len(frame.len());
    let mut corrected = 0;
    for lane in 0..RS_INTERLEAVE {
        let mut block = gather(frame, lane, data_len);
        corrected += rs.decode(&mut block)?;
        for j in 0..data_len {
            frame[OFFSET_FRAME_TYPE + j * RS_INTERLEAVE + lane] = block[data_len - 1 - j];
        }
        for j in 0..RS_PARITY {
            frame[OFFSET_RS + lane * RS_PARITY + j] = block[data_len + RS_PARITY - 1 - j];
        }
    }
    Ok(corrected)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Block<'a> {
    pub id: u8,
    pub payload: &'a [u8],
    pub crc_ok: bool,
}

/// Walk the sub-block chain. `None` when a block runs past the frame end.
pub fn blocks(frame: &[u8]) -> Option<Vec<Block<'_>>> {
    let mut out = Vec::new();
    let mut i = OFFSET_BLOCK_0;
    while i < frame.len() {
        let id = frame[i];
        let len = usize::from(*frame.get(i + 1)?);
        let payload = frame.get(i + 2..i + 2 + len)?;
        let crc = frame.get(i + 2 + len..i + 4 + len)?;
        out.push(Block {
            id,
            payload,
            crc_ok: crc16_ccitt_false(payload) == u16::from_le_bytes([crc[0], crc[1]]),
        });
        i += len + 4;
    }
    Some(out)
}

/// Every block present, in bounds and passing its CRC.
pub fn crcs_ok(frame: &[u8]) -> bool {
    blocks(frame).is_some_and(|b| b.iter().all(|b| b.crc_ok))
}

fn u16_at(b: &[u8], at: usize) -> Option<u16> {
    Some(u16::from_le_bytes(b.get(at..at + 2)?.try_into().ok()?))
}

fn u32_at(b: &[u8], at: usize) -> Option<u32> {
    Some(u32::from_le_bytes(b.get(at..at + 4)?.try_into().ok()?))
}

fn i32_at(b: &[u8], at: usize) -> Option<i32> {
    u32_at(b, at).map(|v| v as i32)
}

fn i16_at(b: &[u8], at: usize) -> Option<i16> {
    u16_at(b, at).map(|v| v as i16)
}

fn decode_status(p: &[u8], out: &mut RadiosondeFrame) {
    out.frame_number = u16_at(p, 0);
    out.serial = p.get(2..10).map(|s| {
        s.iter()
            .filter(|&&c| c != 0)
            .map(|&c| char::from(c))
            .collect::<String>()
            .trim()
            .to_string()
    });
    out.battery_voltage = p.get(0x0a).map(|&v| f32::from(v) / 10.0);
    out.flight_phase = p
        .get(0x0d)
        .map(|&v| FLIGHT_PHASES[usize::from(v & 3)].to_string());
    out.battery_low = p.get(0x0e).map(|&v| v & 0x10 != 0);
    out.pcb_temperature_c = p.get(0x10).copied();
    out.humidity_sensor_heating = u16_at(p, 0x13);
    out.transmit_power = p.get(0x15).copied();
    out.max_subframe_number = p.get(0x16).copied();
    out.subframe_number = p.get(0x17).copied();
}

fn decode_gps_info(p: &[u8], out: &mut RadiosondeFrame) {
    out.gps_week = u16_at(p, 0);
    out.gps_time_of_week_ms = u32_at(p, 2);
}

fn decode_gps_pos(p: &[u8], out: &mut RadiosondeFrame) {
    let Some(&sats) = p.get(0x12) else {
        return;
    };
    out.satellites = Some(sats);
    if sats == 0 {
        return;
    }
    let (Some(x), Some(y), Some(z)) = (i32_at(p, 0), i32_at(p, 4), i32_at(p, 8)) else {
        return;
    };
    let pos = ecef_to_geodetic(
        f64::from(x) / 100.0,
        f64::from(y) / 100.0,
        f64::from(z) / 100.0,
    );
    out.latitude = Some(pos.latitude_deg);
    out.longitude = Some(pos.longitude_deg);
    out.altitude_m = Some(pos.altitude_m);

    if let (Some(vx), Some(vy), Some(vz)) = (i16_at(p, 0x0c), i16_at(p, 0x0e), i16_at(p, 0x10)) {
        let v = ecef_velocity_to_ground(
            pos.latitude_deg,
            pos.longitude_deg,
            f64::from(vx) / 100.0,
            f64::from(vy) / 100.0,
            f64::from(vz) / 100.0,
        );
        out.speed_mps = Some(v.speed_mps);
        out.vertical_rate_mps = Some(v.vertical_rate_mps);
        out.heading_deg = Some(v.heading_deg);
    }
}

/// Extract the fields of a corrected, CRC-checked frame.
pub fn parse(frame: &[u8], rs_corrected: usize) -> RadiosondeFrame {
    let mut out = RadiosondeFrame {
        rs_corrected,
        frame_len: frame.len(),
        ..Default::default()
    };
    for block in blocks(frame).unwrap_or_default() {
        match block.id {
            BLOCK_STATUS => decode_status(block.payload, &mut out),
            BLOCK_GPS_INFO => decode_gps_info(block.payload, &mut out),
            BLOCK_GPS_POS => decode_gps_pos(block.payload, &mut out),
            // Measurement counts need the calibration subframes; raw GPS
            // and padding carry nothing to report.
            _ => {}
        }
    }
    out
}

// SPDX-FileCopyrightText: 2026 Stanislaw Grams <stanislawgrams@gmail.com>
//
// SPDX-License-Identifier: BSD-2-Clause

//! AIS message fields. After HDLC deframing the message is a bit string
//! read MSB first within each byte.

use trx_core::decode::AisMessage;

const LON_NOT_AVAILABLE: i32 = 181 * 600_000;
const LAT_NOT_AVAILABLE: i32 = 91 * 600_000;
const SOG_NOT_AVAILABLE: u32 = 1023;
const COG_NOT_AVAILABLE: u32 = 3600;
const HEADING_NOT_AVAILABLE: u32 = 511;

/// Field offsets shared by the position reports.
struct PositionLayout {
    nav_status: Option<usize>,
    sog: usize,
    lon: usize,
    lat: usize,
    cog: usize,
    heading: usize,
}

const CLASS_A: PositionLayout = PositionLayout {
    nav_status: Some(38),
    sog: 50,
    lon: 61,
    lat: 89,
    cog: 116,
    heading: 128,
};

const CLASS_B: PositionLayout = PositionLayout {
    nav_status: None,
    sog: 46,
    lon: 57,
    lat: 85,
    cog: 112,
    heading: 124,
};

pub(crate) fn bits(data: &[u8], start: usize, len: usize) -> Option<u32> {
    if len == 0 || len > 32 || start + len > data.len() * 8 {
        return None;
    }
    let mut value = 0u32;
    for i in start..start + len {
        let bit = (data[i / 8] >> (7 - i % 8)) & 1;
        value = (value << 1) | u32::from(bit);
    }
    Some(value)
}

fn signed_bits(data: &[u8], start: usize, len: usize) -> Option<i32> {
    let raw = bits(data, start, len)?;
    let shift = 32 - len as u32;
    Some(((raw << shift) as i32) >> shift)
}

fn apply_position(data: &[u8], layout: &PositionLayout, msg: &mut AisMessage) {
    msg.nav_status = layout
        .nav_status
        .and_then(|at| bits(data, at, 4))
        .map(|v| v as u8);
    msg.sog = bits(data, layout.sog, 10)
        .filter(|&v| v != SOG_NOT_AVAILABLE)
        .map(|v| v as f32 / 10.0);
    msg.lon = signed_bits(data, layout.lon, 28)
        .filter(|&v| v != LON_NOT_AVAILABLE)
        .map(|v| f64::from(v) / 600_000.0);
    msg.lat = signed_bits(data, layout.lat, 27)
        .filter(|&v| v != LAT_NOT_AVAILABLE)
        .map(|v| f64::from(v) / 600_000.0);
    msg.cog = bits(data, layout.cog, 12)
        .filter(|&v| v < COG_NOT_AVAILABLE)
        .map(|v| v as f32 / 10.0);
    msg.heading = bits(data, layout.heading, 9)
        .filter(|&v| v != HEADING_NOT_AVAILABLE)
        .map(|v| v as u16);
}

pub fn payload_hex(data: &[u8]) -> String {
    data.iter().map(|b| format!("{b:02x}")).collect()
}

/// Decode the common header and, for position reports, the kinematics.
/// Returns `None` when the payload is too short to hold the header.
pub fn parse_message(data: &[u8]) -> Option<AisMessage> {
    let message_type = bits(data, 0, 6)? as u8;
    let mut msg = AisMessage {
        message_type,
        repeat: bits(data, 6, 2)? as u8,
        mmsi: bits(data, 8, 30)?,
        payload_hex: payload_hex(data),
        ..Default::default()
    };
    match message_type {
        1..=3 => apply_position(data, &CLASS_A, &mut msg),
        18 | 19 => apply_position(data, &CLASS_B, &mut msg),
        _ => {}
    }
    Some(msg)
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    /// MSB-first bit string builder.
    #[derive(Default)]
    pub(crate) struct BitWriter {
        bits: Vec<bool>,
    }

    impl BitWriter {
        pub(crate) fn put(&mut self, value: i64, len: usize) -> &mut Self {
            for i in (0..len).rev() {
                self.bits.push((value >> i) & 1 == 1);
            }
            self
        }

        pub(crate) fn bytes(&self) -> Vec<u8> {
            self.bits
                .chunks(8)
                .map(|c| {
                    c.iter()
                        .enumerate()
                        .fold(0u8, |acc, (i, &b)| acc | (u8::from(b) << (7 - i)))
                })
                .collect()
        }
    }

    fn assert_approx_eq(a: f64, b: f64, tol: f64, label: &str) {
        assert!(
            (a - b).abs() <= tol,
            "{}: expected {} ≈ {} (tol {})",
            label,
            a,
            b,
            tol
        );
    }

    /// Class A position report from MMSI 261234560 off Gdynia.
    pub(crate) fn class_a_report() -> Vec<u8> {
        let mut w = BitWriter::default();
        w.put(1, 6)
            .put(0, 2)
            .put(261_234_560, 30)
            .put(5, 4)
            .put(-128, 8)
            .put(123, 10)
            .put(1, 1)
            .put((18.55 * 600_000.0f64).round() as i64, 28)
            .put((54.52 * 600_000.0f64).round() as i64, 27)
            .put(2_715, 12)
            .put(270, 9)
            .put(0, 6)
            .put(0, 2)
            .put(0, 3)
            .put(0, 1)
            .put(0, 19);
        w.bytes()
    }

    #[test]
    fn reads_bit_fields() {
        let data = [0b1010_1100, 0b0101_0011];
        assert_eq!(bits(&data, 0, 4), Some(0b1010));
        assert_eq!(bits(&data, 4, 8), Some(0b1100_0101));
        assert_eq!(signed_bits(&data, 0, 4), Some(-6));
        assert_eq!(bits(&data, 10, 8), None);
    }

    #[test]
    fn class_a_position() {
        let data = class_a_report();
        assert_eq!(data.len(), 21);
        let msg = parse_message(&data).unwrap_or_default();
        assert_eq!(msg.message_type, 1);
        assert_eq!(msg.repeat, 0);
        assert_eq!(msg.mmsi, 261_234_560);
        assert_eq!(msg.nav_status, Some(5));
        assert_eq!(msg.sog, Some(12.3));
        assert_eq!(msg.cog, Some(271.5));
        assert_eq!(msg.heading, Some(270));
        assert_approx_eq(msg.lat.unwrap_or_default(), 54.52, 1e-6, "lat");
        assert_approx_eq(msg.lon.unwrap_or_default(), 18.55, 1e-6, "lon");
        assert_eq!(msg.payload_hex.len(), 42);
    }

    #[test]
    fn class_b_with_unavailable_fields() {
        let mut w = BitWriter::default();
        w.put(18, 6)
            .put(3, 2)
            .put(244_660_000, 30)
            .put(0, 8)
            .put(1023, 10)
            .put(0, 1)
            .put(i64::from(LON_NOT_AVAILABLE), 28)
            .put((-33.5 * 600_000.0f64).round() as i64, 27)
            .put(3600, 12)
            .put(511, 9)
            .put(0, 31);
        let msg = parse_message(&w.bytes()).unwrap_or_default();
        assert_eq!(msg.message_type, 18);
        assert_eq!(msg.repeat, 3);
        assert_eq!(msg.mmsi, 244_660_000);
        assert!(msg.nav_status.is_none());
        assert!(msg.sog.is_none());
        assert!(msg.lon.is_none());
        assert_approx_eq(msg.lat.unwrap_or_default(), -33.5, 1e-6, "lat");
        assert!(msg.cog.is_none());
        assert!(msg.heading.is_none());
    }

    #[test]
    fn other_types_keep_header_only() {
        let mut w = BitWriter::default();
        w.put(5, 6).put(1, 2).put(211_000_111, 30).put(0, 2);
        let msg = parse_message(&w.bytes()).unwrap_or_default();
        assert_eq!(msg.message_type, 5);
        assert_eq!(msg.mmsi, 211_000_111);
        assert!(msg.lat.is_none());
        assert_eq!(msg.payload_hex, payload_hex(&w.bytes()));
    }

    #[test]
    fn short_payload_is_rejected() {
        assert!(parse_message(&[0x04, 0x00]).is_none());
    }
}

// SPDX-FileCopyrightText: 2026 Stanislaw Grams <stanislawgrams@gmail.com>
//
// SPDX-License-Identifier: BSD-2-Clause

//! CRC-16 variants used by the frame decoders.
//!
//! * CRC-16/X-25: reflected 0x1021, init 0xFFFF, final xor 0xFFFF. HDLC FCS
//!   for AX.25 and AIS, transmitted little-endian.
//! * CRC-16/CCITT-FALSE: MSB-first 0x1021, init 0xFFFF, no final xor. Used
//!   per sub-block in RS41 radiosonde frames.

const fn build_reflected_table(poly: u16) -> [u16; 256] {
    let mut table = [0u16; 256];
    let mut i = 0usize;
    while i < 256 {
        let mut crc = i as u16;
        let mut j = 0;
        while j < 8 {
            if crc & 1 != 0 {
                crc = (crc >> 1) ^ poly;
            } else {
                crc >>= 1;
            }
            j += 1;
        }
        table[i] = crc;
        i += 1;
    }
    table
}

const fn build_msb_table(poly: u16) -> [u16; 256] {
    let mut table = [0u16; 256];
    let mut i = 0usize;
    while i < 256 {
        let mut crc = (i as u16) << 8;
        let mut j = 0;
        while j < 8 {
            if crc & 0x8000 != 0 {
                crc = (crc << 1) ^ poly;
            } else {
                crc <<= 1;
            }
            j += 1;
        }
        table[i] = crc;
        i += 1;
    }
    table
}

const X25_TABLE: [u16; 256] = build_reflected_table(0x8408);
const CCITT_TABLE: [u16; 256] = build_msb_table(0x1021);

/// CRC-16/X-25 over `bytes`.
pub fn crc16_x25(bytes: &[u8]) -> u16 {
    let mut crc: u16 = 0xFFFF;
    for &b in bytes {
        crc = (crc >> 8) ^ X25_TABLE[((crc ^ u16::from(b)) & 0xFF) as usize];
    }
    crc ^ 0xFFFF
}

/// Check a frame whose last two bytes are a little-endian X-25 FCS.
pub fn x25_frame_ok(frame: &[u8]) -> bool {
    if frame.len() < 3 {
        return false;
    }
    let (payload, fcs) = frame.split_at(frame.len() - 2);
    crc16_x25(payload) == u16::from_le_bytes([fcs[0], fcs[1]])
}

/// CRC-16/CCITT-FALSE over `bytes`.
pub fn crc16_ccitt_false(bytes: &[u8]) -> u16 {
    let mut crc: u16 = 0xFFFF;
    for &b in bytes {
        crc = (crc << 8) ^ CCITT_TABLE[(((crc >> 8) ^ u16::from(b)) & 0xFF) as usize];
    }
    crc
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn x25_check_value() {
        assert_eq!(crc16_x25(b"123456789"), 0x906E);
    }

    #[test]
    fn ccitt_false_check_value() {
        assert_eq!(crc16_ccitt_false(b"123456789"), 0x29B1);
    }

    #[test]
    fn x25_frame_with_trailer_validates() {
        let mut frame = b"hello ax25".to_vec();
        let fcs = crc16_x25(&frame);
        frame.extend_from_slice(&fcs.to_le_bytes());
        assert!(x25_frame_ok(&frame));
        frame[3] ^= 0x10;
        assert!(!x25_frame_ok(&frame));
        assert!(!x25_frame_ok(&[0x01, 0x02]));
    }
}

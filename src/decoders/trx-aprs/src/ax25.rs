// SPDX-FileCopyrightText: 2025 Stanislaw Grams <stanislawgrams@gmail.com>
//
// SPDX-License-Identifier: BSD-2-Clause

//! AX.25 frame fields and the APRS information field.

use trx_core::decode::Ax25Packet;

const ADDRESS_LEN: usize = 7;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ax25Address {
    pub call: String,
    pub ssid: u8,
    /// H bit: a digipeater has already repeated the frame.
    pub repeated: bool,
    /// Extension bit closing the address field.
    pub last: bool,
}

impl Ax25Address {
    fn decode(bytes: &[u8]) -> Self {
        let call: String = bytes[..6]
            .iter()
            .map(|&b| b >> 1)
            .filter(|&ch| ch > b' ')
            .map(char::from)
            .collect();
        Self {
            call,
            ssid: (bytes[6] >> 1) & 0x0F,
            repeated: bytes[6] & 0x80 != 0,
            last: bytes[6] & 0x01 == 1,
        }
    }

    fn format(&self) -> String {
        if self.ssid != 0 {
            format!("{}-{}", self.call, self.ssid)
        } else {
            self.call.clone()
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ax25Frame {
    pub dest: Ax25Address,
    pub src: Ax25Address,
    pub digis: Vec<Ax25Address>,
    pub control: u8,
    pub pid: Option<u8>,
    pub info: Vec<u8>,
}

/// Split a CRC-checked frame into addresses, control, PID and info.
pub fn parse_ax25(frame: &[u8]) -> Option<Ax25Frame> {
    if frame.len() < 2 * ADDRESS_LEN + 1 {
        return None;
    }
    let dest = Ax25Address::decode(&frame[..ADDRESS_LEN]);
    let src = Ax25Address::decode(&frame[ADDRESS_LEN..2 * ADDRESS_LEN]);

    let mut offset = 2 * ADDRESS_LEN;
    let mut digis = Vec::new();
    let mut last = src.last;
    while !last {
        let digi = Ax25Address::decode(frame.get(offset..offset + ADDRESS_LEN)?);
        last = digi.last;
        digis.push(digi);
        offset += ADDRESS_LEN;
    }

    let control = *frame.get(offset)?;
    offset += 1;
    // I frames and UI frames carry a protocol id.
    let pid = if control & 0x01 == 0 || control & 0xEF == 0x03 {
        let pid = *frame.get(offset)?;
        offset += 1;
        Some(pid)
    } else {
        None
    };

    Some(Ax25Frame {
        dest,
        src,
        digis,
        control,
        pid,
        info: frame[offset..].to_vec(),
    })
}

fn packet_type(info: &[u8]) -> &'static str {
    match info.first() {
        Some(b'!' | b'=' | b'/' | b'@') => "Position",
        Some(b':') => "Message",
        Some(b'>') => "Status",
        Some(b'T') => "Telemetry",
        Some(b';') => "Object",
        Some(b')') => "Item",
        Some(b'`' | b'\'') => "Mic-E",
        _ => "Unknown",
    }
}

/// Build the published packet, reading an APRS position when present.
pub fn to_packet(ax25: &Ax25Frame) -> Ax25Packet {
    let path = ax25
        .digis
        .iter()
        .map(|d| {
            if d.repeated {
                format!("{}*", d.format())
            } else {
                d.format()
            }
        })
        .collect::<Vec<_>>()
        .join(",");
    let packet_type = packet_type(&ax25.info);
    let position = if packet_type == "Position" {
        parse_aprs_position(&ax25.info)
    } else {
        None
    };

    Ax25Packet {
        src_call: ax25.src.format(),
        dest_call: ax25.dest.format(),
        path,
        control: ax25.control,
        pid: ax25.pid,
        info: String::from_utf8_lossy(&ax25.info).into_owned(),
        packet_type: packet_type.to_string(),
        lat: position.map(|p| p.0),
        lon: position.map(|p| p.1),
        symbol_table: position.map(|p| p.2.to_string()),
        symbol_code: position.map(|p| p.3.to_string()),
    }
}

fn parse_aprs_position(info: &[u8]) -> Option<(f64, f64, char, char)> {
    let pos = match info.first()? {
        b'!' | b'=' => &info[1..],
        // Timestamped: seven characters of time after the type.
        b'/' | b'@' => info.get(8..)?,
        _ => return None,
    };

    if !pos.first()?.is_ascii_digit() {
        return parse_aprs_compressed(pos);
    }

    // Uncompressed: DDMM.MMN/DDDMM.MMEs
    if pos.len() < 19 {
        return None;
    }
    let lat = parse_coordinate(&pos[..8], 2, b'N', b'S')?;
    let lon = parse_coordinate(&pos[9..18], 3, b'E', b'W')?;
    Some((lat, lon, char::from(pos[8]), char::from(pos[18])))
}

fn parse_aprs_compressed(pos: &[u8]) -> Option<(f64, f64, char, char)> {
    if pos.len() < 10 {
        return None;
    }
    let mut lat_val: u32 = 0;
    let mut lon_val: u32 = 0;
    for i in 0..4 {
        let lc = pos[1 + i].checked_sub(33).filter(|&c| c <= 90)?;
        let xc = pos[5 + i].checked_sub(33).filter(|&c| c <= 90)?;
        lat_val = lat_val * 91 + u32::from(lc);
        lon_val = lon_val * 91 + u32::from(xc);
    }

    let lat = 90.0 - f64::from(lat_val) / 380_926.0;
    let lon = -180.0 + f64::from(lon_val) / 190_463.0;
    if !(-90.0..=90.0).contains(&lat) || !(-180.0..=180.0).contains(&lon) {
        return None;
    }
    Some((
        round6(lat),
        round6(lon),
        char::from(pos[0]),
        char::from(pos[9]),
    ))
}

fn round6(v: f64) -> f64 {
    (v * 1e6).round() / 1e6
}

/// `DDMM.MMH` / `DDDMM.MMH`, with `deg_digits` degree digits.
fn parse_coordinate(s: &[u8], deg_digits: usize, pos: u8, neg: u8) -> Option<f64> {
    let text = std::str::from_utf8(s).ok()?;
    let deg: f64 = text.get(..deg_digits)?.parse().ok()?;
    let min: f64 = text.get(deg_digits..deg_digits + 5)?.parse().ok()?;
    let value = deg + min / 60.0;
    match s[deg_digits + 5].to_ascii_uppercase() {
        h if h == pos => Some(round6(value)),
        h if h == neg => Some(round6(-value)),
        _ => None,
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    pub(crate) fn encode_address(call: &str, ssid: u8, last: bool, repeated: bool) -> Vec<u8> {
        let mut out: Vec<u8> = format!("{call:<6}").bytes().take(6).map(|b| b << 1).collect();
        let mut tail = 0x60 | (ssid << 1);
        if last {
            tail |= 0x01;
        }
        if repeated {
            tail |= 0x80;
        }
        out.push(tail);
        out
    }

    pub(crate) fn ui_frame(info: &[u8]) -> Vec<u8> {
        let mut frame = encode_address("APRS", 0, false, false);
        frame.extend(encode_address("SP5ABC", 9, false, false));
        frame.extend(encode_address("WIDE1", 1, false, true));
        frame.extend(encode_address("WIDE2", 1, true, false));
        frame.extend_from_slice(&[0x03, 0xF0]);
        frame.extend_from_slice(info);
        frame
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

    #[test]
    fn ui_frame_addresses_and_path() {
        let frame = parse_ax25(&ui_frame(b">on the air")).unwrap_or_else(|| panic!("frame"));
        assert_eq!(frame.control, 0x03);
        assert_eq!(frame.pid, Some(0xF0));
        let pkt = to_packet(&frame);
        assert_eq!(pkt.dest_call, "APRS");
        assert_eq!(pkt.src_call, "SP5ABC-9");
        assert_eq!(pkt.path, "WIDE1-1*,WIDE2-1");
        assert_eq!(pkt.packet_type, "Status");
        assert_eq!(pkt.info, ">on the air");
        assert!(pkt.lat.is_none());
    }

    #[test]
    fn uncompressed_position() {
        let frame = parse_ax25(&ui_frame(b"!5213.78N/02100.73E-PHG2360"))
            .unwrap_or_else(|| panic!("frame"));
        let pkt = to_packet(&frame);
        assert_eq!(pkt.packet_type, "Position");
        assert_approx_eq(pkt.lat.unwrap_or_default(), 52.0 + 13.78 / 60.0, 1e-6, "lat");
        assert_approx_eq(pkt.lon.unwrap_or_default(), 21.0 + 0.73 / 60.0, 1e-6, "lon");
        assert_eq!(pkt.symbol_table.as_deref(), Some("/"));
        assert_eq!(pkt.symbol_code.as_deref(), Some("-"));
    }

    #[test]
    fn timestamped_southern_western_position() {
        let frame = parse_ax25(&ui_frame(b"@092345z3351.00S/15112.50W>"))
            .unwrap_or_else(|| panic!("frame"));
        let pkt = to_packet(&frame);
        assert_approx_eq(pkt.lat.unwrap_or_default(), -(33.0 + 51.0 / 60.0), 1e-6, "lat");
        assert_approx_eq(pkt.lon.unwrap_or_default(), -(151.0 + 12.5 / 60.0), 1e-6, "lon");
    }

    #[test]
    fn compressed_position() {
        // Example from the APRS 1.01 reference: 49.5 N, 72.75 W.
        let frame = parse_ax25(&ui_frame(b"=/5L!!<*e7>7P[")).unwrap_or_else(|| panic!("frame"));
        let pkt = to_packet(&frame);
        assert_approx_eq(pkt.lat.unwrap_or_default(), 49.5, 1e-4, "lat");
        assert_approx_eq(pkt.lon.unwrap_or_default(), -72.75, 1e-4, "lon");
        assert_eq!(pkt.symbol_code.as_deref(), Some(">"));
    }

    #[test]
    fn unnumbered_frame_has_no_pid() {
        let mut frame = encode_address("CQ", 0, false, false);
        frame.extend(encode_address("N0CALL", 0, true, false));
        frame.push(0x2F);
        let parsed = parse_ax25(&frame).unwrap_or_else(|| panic!("frame"));
        assert_eq!(parsed.pid, None);
        assert!(parsed.info.is_empty());
    }

    #[test]
    fn truncated_address_field_is_rejected() {
        let mut frame = encode_address("APRS", 0, false, false);
        frame.extend(encode_address("SP5ABC", 0, false, false));
        frame.extend_from_slice(&[0x03, 0xF0]);
        assert!(parse_ax25(&frame).is_none());
    }
}

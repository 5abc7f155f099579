// SPDX-FileCopyrightText: 2025 Stanislaw Grams <stanislawgrams@gmail.com>
//
// SPDX-License-Identifier: BSD-2-Clause

//! Shared types for decoded messages emitted by the channel decoders.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// A decoded message from one of the digital channel sinks.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum DecodedMessage {
    #[serde(rename = "pocsag")]
    Pocsag(PagerMessage),
    #[serde(rename = "rds")]
    Rds(RdsData),
    #[serde(rename = "ax25")]
    Ax25(Ax25Packet),
    #[serde(rename = "ais")]
    Ais(AisMessage),
    #[serde(rename = "radiosonde")]
    Radiosonde(RadiosondeFrame),
}

impl DecodedMessage {
    /// Short decoder name used for log routing.
    pub fn decoder_name(&self) -> &'static str {
        match self {
            Self::Pocsag(_) => "pocsag",
            Self::Rds(_) => "rds",
            Self::Ax25(_) => "ax25",
            Self::Ais(_) => "ais",
            Self::Radiosonde(_) => "radiosonde",
        }
    }
}

/// A message tagged with the channel that produced it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecodeEvent {
    pub channel_id: String,
    pub message: DecodedMessage,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct PagerMessage {
    /// 21-bit capcode: address bits from the codeword, frame number in the low 3 bits.
    pub address: u32,
    pub function_bits: u8,
    pub numeric: String,
    pub alpha: String,
    /// Codewords in the message that failed even parity.
    pub parity_errors: u32,
    /// Codewords the BCH decoder could not correct.
    pub bch_errors: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RdsClock {
    pub year: i32,
    pub month: u8,
    pub day: u8,
    pub hour: u8,
    pub minute: u8,
    /// Local time offset in half hours.
    pub local_offset_half_hours: i8,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProgramItem {
    pub day: u8,
    pub hour: u8,
    pub minute: u8,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TmcMessage {
    pub event: u16,
    pub location: u16,
    pub extent: u8,
    pub direction_negative: bool,
    pub duration: u8,
    pub diversion: bool,
    pub multi_group: bool,
}

/// Enhanced Other Networks entry keyed by the other station's PI.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct EonStation {
    pub pi: u16,
    pub program_service: Option<String>,
    pub traffic_program: bool,
    pub traffic_announcement: bool,
    pub pty: Option<u8>,
    pub pin: Option<ProgramItem>,
    pub alternative_frequencies_hz: Vec<u32>,
    /// Tuned-network frequency to other-network frequency pairs.
    pub mapped_frequencies_hz: Vec<(u32, u32)>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct RdsData {
    pub pi: u16,
    pub pty: u8,
    pub pty_name: String,
    pub traffic_program: bool,
    pub traffic_announcement: bool,
    pub music: bool,
    pub stereo: bool,
    pub artificial_head: bool,
    pub compressed: bool,
    pub dynamic_pty: bool,
    pub program_service: Option<String>,
    pub radio_text: Option<String>,
    pub program_type_name_long: Option<String>,
    pub alternative_frequencies_hz: Vec<u32>,
    pub pin: Option<ProgramItem>,
    pub extended_country_code: Option<u8>,
    pub language_code: Option<u8>,
    pub clock: Option<RdsClock>,
    /// Open data applications: group type name to application id.
    pub oda: BTreeMap<String, u16>,
    pub tmc: Vec<TmcMessage>,
    /// Raw emergency warning payload (block B low bits, C, D).
    pub ews: Option<[u16; 3]>,
    pub eon: Vec<EonStation>,
    /// Count of received groups per type name ("0A", "2B", ...).
    pub group_counts: BTreeMap<String, u64>,
    pub corrected_blocks: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Ax25Packet {
    pub src_call: String,
    pub dest_call: String,
    pub path: String,
    pub control: u8,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pid: Option<u8>,
    pub info: String,
    pub packet_type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lat: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lon: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub symbol_table: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub symbol_code: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct AisMessage {
    pub message_type: u8,
    pub repeat: u8,
    pub mmsi: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub nav_status: Option<u8>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lat: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lon: Option<f64>,
    /// Speed over ground, knots.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sog: Option<f32>,
    /// Course over ground, degrees.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cog: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub heading: Option<u16>,
    pub payload_hex: String,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct RadiosondeFrame {
    pub serial: Option<String>,
    pub frame_number: Option<u16>,
    pub battery_voltage: Option<f32>,
    pub flight_phase: Option<String>,
    pub battery_low: Option<bool>,
    pub pcb_temperature_c: Option<u8>,
    pub humidity_sensor_heating: Option<u16>,
    pub transmit_power: Option<u8>,
    pub subframe_number: Option<u8>,
    pub max_subframe_number: Option<u8>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub latitude: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub longitude: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub altitude_m: Option<f64>,
    /// Horizontal speed, m/s.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub speed_mps: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vertical_rate_mps: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub heading_deg: Option<f64>,
    pub satellites: Option<u8>,
    pub gps_week: Option<u16>,
    pub gps_time_of_week_ms: Option<u32>,
    /// Bytes repaired by Reed-Solomon across both codewords.
    pub rs_corrected: usize,
    pub frame_len: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serializes_with_type_tag() {
        let event = DecodeEvent {
            channel_id: "pager".into(),
            message: DecodedMessage::Pocsag(PagerMessage {
                address: 1234567,
                function_bits: 3,
                alpha: "HELLO".into(),
                ..Default::default()
            }),
        };
        let json = serde_json::to_value(&event).expect("serialize");
        assert_eq!(json["message"]["type"], "pocsag");
        assert_eq!(json["message"]["address"], 1234567);
        let back: DecodeEvent = serde_json::from_value(json).expect("deserialize");
        assert_eq!(back, event);
        assert_eq!(back.message.decoder_name(), "pocsag");
    }
}

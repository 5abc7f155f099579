// SPDX-FileCopyrightText: 2026 Stanislaw Grams <stanislawgrams@gmail.com>
//
// SPDX-License-Identifier: BSD-2-Clause

//! Group type parsers feeding the station state.

use std::collections::BTreeMap;

use chrono::{Datelike, Days, NaiveDate};
use tracing::debug;
use trx_core::decode::{EonStation, ProgramItem, RdsClock, RdsData, TmcMessage};

use crate::block::Group;

const TMC_HISTORY: usize = 32;
const MAX_EON_STATIONS: usize = 16;

/// Text assembled from fixed-size segments, e.g. PS from four pairs.
#[derive(Debug, Clone)]
struct SegmentText {
    bytes: Vec<u8>,
    seen: Vec<bool>,
    segment_len: usize,
}

impl SegmentText {
    fn new(segments: usize, segment_len: usize) -> Self {
        Self {
            bytes: vec![b' '; segments * segment_len],
            seen: vec![false; segments],
            segment_len,
        }
    }

    fn clear(&mut self) {
        self.bytes.fill(b' ');
        self.seen.fill(false);
    }

    fn set(&mut self, segment: usize, chars: &[u8]) {
        let base = segment * self.segment_len;
        if segment >= self.seen.len() {
            return;
        }
        for (slot, &byte) in self.bytes[base..base + self.segment_len].iter_mut().zip(chars) {
            *slot = byte;
        }
        self.seen[segment] = true;
    }

    fn complete(&self) -> bool {
        self.seen.iter().all(|s| *s)
    }

    /// Text up to the last received segment, cut at a carriage return.
    fn partial(&self) -> Option<String> {
        let last = self.seen.iter().rposition(|s| *s)?;
        let end = (last + 1) * self.segment_len;
        let bytes = &self.bytes[..end];
        let bytes = match bytes.iter().position(|&b| b == 0x0d) {
            Some(cr) => &bytes[..cr],
            None => bytes,
        };
        Some(text(bytes))
    }

    fn full(&self) -> Option<String> {
        self.complete().then(|| text(&self.bytes))
    }
}

fn sanitize_text_byte(byte: u8) -> u8 {
    if (0x20..=0x7e).contains(&byte) {
        byte
    } else {
        b' '
    }
}

fn text(bytes: &[u8]) -> String {
    let cleaned: Vec<u8> = bytes.iter().map(|&b| sanitize_text_byte(b)).collect();
    String::from_utf8_lossy(&cleaned).trim_end().to_string()
}

fn update<T: PartialEq>(slot: &mut T, value: T) -> bool {
    if *slot == value {
        false
    } else {
        *slot = value;
        true
    }
}

/// Group type name as printed by receivers, e.g. "0A" or "14B".
pub fn group_name(group_type: u8, version_b: bool) -> String {
    format!("{}{}", group_type, if version_b { 'B' } else { 'A' })
}

fn is_af_count_code(code: u8) -> bool {
    (224..=249).contains(&code)
}

/// Method A alternative frequency code to Hz (VHF band only).
pub fn af_code_to_hz(code: u8) -> Option<u32> {
    if (1..=204).contains(&code) {
        Some(87_500_000 + u32::from(code) * 100_000)
    } else {
        None
    }
}

fn program_item(word: u16) -> Option<ProgramItem> {
    let day = (word >> 11) as u8;
    let hour = ((word >> 6) & 0x1f) as u8;
    let minute = (word & 0x3f) as u8;
    (day != 0 && hour < 24 && minute < 60).then_some(ProgramItem { day, hour, minute })
}

/// Modified Julian Day to a calendar date.
pub fn mjd_to_date(mjd: u32) -> Option<NaiveDate> {
    NaiveDate::from_ymd_opt(1858, 11, 17)?.checked_add_days(Days::new(u64::from(mjd)))
}

pub fn pty_name(pty: u8) -> &'static str {
    match pty {
        0 => "None",
        1 => "News",
        2 => "Current Affairs",
        3 => "Information",
        4 => "Sport",
        5 => "Education",
        6 => "Drama",
        7 => "Culture",
        8 => "Science",
        9 => "Varied",
        10 => "Pop Music",
        11 => "Rock Music",
        12 => "Easy Listening",
        13 => "Light Classical",
        14 => "Serious Classical",
        15 => "Other Music",
        16 => "Weather",
        17 => "Finance",
        18 => "Children's",
        19 => "Social Affairs",
        20 => "Religion",
        21 => "Phone In",
        22 => "Travel",
        23 => "Leisure",
        24 => "Jazz Music",
        25 => "Country Music",
        26 => "National Music",
        27 => "Oldies Music",
        28 => "Folk Music",
        29 => "Documentary",
        30 => "Alarm Test",
        _ => "Alarm",
    }
}

/// Station state built up from decoded groups.
#[derive(Debug, Clone)]
pub struct GroupParser {
    data: RdsData,
    seen: bool,
    ps: SegmentText,
    rt: SegmentText,
    rt_ab: bool,
    rt_version_b: bool,
    ptyn: SegmentText,
    ptyn_ab: bool,
    eon_ps: BTreeMap<u16, SegmentText>,
}

impl Default for GroupParser {
    fn default() -> Self {
        Self::new()
    }
}

impl GroupParser {
    pub fn new() -> Self {
        Self {
            data: RdsData::default(),
            seen: false,
            ps: SegmentText::new(4, 2),
            rt: SegmentText::new(16, 4),
            rt_ab: false,
            rt_version_b: false,
            ptyn: SegmentText::new(2, 4),
            ptyn_ab: false,
            eon_ps: BTreeMap::new(),
        }
    }

    pub fn data(&self) -> &RdsData {
        &self.data
    }

    /// `true` once at least one group has been applied.
    pub fn has_data(&self) -> bool {
        self.seen
    }

    pub fn reset(&mut self) {
        *self = Self::new();
    }

    /// Apply one group. Returns `true` when station data changed; group
    /// counters alone do not count as a change.
    pub fn apply(&mut self, group: &Group) -> bool {
        let [pi, b, c, d] = group.blocks;
        let mut changed = false;
        if !self.seen || self.data.pi != pi {
            if self.seen {
                debug!("RDS PI changed {:04X} -> {:04X}", self.data.pi, pi);
            }
            self.reset();
            self.seen = true;
            self.data.pi = pi;
            changed = true;
        }

        let group_type = group.group_type();
        let version_b = group.version_b();
        *self
            .data
            .group_counts
            .entry(group_name(group_type, version_b))
            .or_insert(0) += 1;
        self.data.corrected_blocks += u64::from(group.corrected);

        changed |= update(&mut self.data.traffic_program, b & 0x0400 != 0);
        let pty = ((b >> 5) & 0x1f) as u8;
        changed |= update(&mut self.data.pty, pty);
        if self.data.pty_name != pty_name(pty) {
            self.data.pty_name = pty_name(pty).to_string();
            changed = true;
        }

        changed |= match (group_type, version_b) {
            (0, _) => self.group_0(b, c, d, version_b),
            (1, _) => self.group_1(c, d, version_b),
            (2, _) => self.group_2(b, c, d, version_b),
            (3, false) => self.group_3a(b, d),
            (4, false) => self.group_4a(b, c, d),
            (8, false) => self.group_8a(b, c, d),
            (9, false) => update(&mut self.data.ews, Some([b & 0x1f, c, d])),
            (10, false) => self.group_10a(b, c, d),
            (14, _) => self.group_14(b, c, d, version_b),
            _ => false,
        };
        changed
    }

    fn group_0(&mut self, b: u16, c: u16, d: u16, version_b: bool) -> bool {
        let mut changed = false;
        changed |= update(&mut self.data.traffic_announcement, b & 0x0010 != 0);
        changed |= update(&mut self.data.music, b & 0x0008 != 0);

        let segment = usize::from(b & 0x0003);
        let di = b & 0x0004 != 0;
        let flag = match segment {
            0 => &mut self.data.dynamic_pty,
            1 => &mut self.data.compressed,
            2 => &mut self.data.artificial_head,
            _ => &mut self.data.stereo,
        };
        changed |= update(flag, di);

        if !version_b {
            let [af0, af1] = c.to_be_bytes();
            changed |= record_af_pair(&mut self.data.alternative_frequencies_hz, af0, af1);
        }

        self.ps.set(segment, &d.to_be_bytes());
        if let Some(ps) = self.ps.full() {
            if !ps.is_empty() {
                changed |= update(&mut self.data.program_service, Some(ps));
            }
        }
        changed
    }

    fn group_1(&mut self, c: u16, d: u16, version_b: bool) -> bool {
        let mut changed = false;
        if !version_b {
            match (c >> 12) & 0x7 {
                0 => changed |= update(&mut self.data.extended_country_code, Some((c & 0xff) as u8)),
                3 => changed |= update(&mut self.data.language_code, Some((c & 0xff) as u8)),
                _ => {}
            }
        }
        if let Some(pin) = program_item(d) {
            changed |= update(&mut self.data.pin, Some(pin));
        }
        changed
    }

    fn group_2(&mut self, b: u16, c: u16, d: u16, version_b: bool) -> bool {
        let ab = b & 0x0010 != 0;
        if ab != self.rt_ab || version_b != self.rt_version_b {
            self.rt_ab = ab;
            self.rt_version_b = version_b;
            self.rt = if version_b {
                SegmentText::new(16, 2)
            } else {
                SegmentText::new(16, 4)
            };
        }
        let segment = usize::from(b & 0x000f);
        if version_b {
            self.rt.set(segment, &d.to_be_bytes());
        } else {
            let [c0, c1] = c.to_be_bytes();
            let [d0, d1] = d.to_be_bytes();
            self.rt.set(segment, &[c0, c1, d0, d1]);
        }
        match self.rt.partial() {
            Some(rt) if !rt.is_empty() => update(&mut self.data.radio_text, Some(rt)),
            _ => false,
        }
    }

    fn group_3a(&mut self, b: u16, d: u16) -> bool {
        let code = (b & 0x1f) as u8;
        if d == 0 {
            return false;
        }
        let name = group_name(code >> 1, code & 1 != 0);
        self.data.oda.insert(name, d) != Some(d)
    }

    fn group_4a(&mut self, b: u16, c: u16, d: u16) -> bool {
        let mjd = (u32::from(b & 0x3) << 15) | u32::from(c >> 1);
        let hour = (((c & 1) << 4) | (d >> 12)) as u8;
        let minute = ((d >> 6) & 0x3f) as u8;
        let magnitude = (d & 0x1f) as i8;
        let offset = if d & 0x20 != 0 { -magnitude } else { magnitude };
        if mjd == 0 || hour > 23 || minute > 59 {
            return false;
        }
        let Some(date) = mjd_to_date(mjd) else {
            return false;
        };
        let clock = RdsClock {
            year: date.year(),
            month: date.month() as u8,
            day: date.day() as u8,
            hour,
            minute,
            local_offset_half_hours: offset,
        };
        update(&mut self.data.clock, Some(clock))
    }

    fn group_8a(&mut self, b: u16, c: u16, d: u16) -> bool {
        // Tuning and system information.
        if b & 0x0010 != 0 {
            return false;
        }
        let single = b & 0x0008 != 0;
        if !single && c & 0x8000 == 0 {
            // Continuation of a multi-group message.
            return false;
        }
        let message = TmcMessage {
            event: c & 0x07ff,
            location: d,
            extent: ((c >> 11) & 0x7) as u8,
            direction_negative: c & 0x4000 != 0,
            duration: if single { (b & 0x7) as u8 } else { 0 },
            diversion: single && c & 0x8000 != 0,
            multi_group: !single,
        };
        let tmc = &mut self.data.tmc;
        if tmc.contains(&message) {
            return false;
        }
        tmc.push(message);
        if tmc.len() > TMC_HISTORY {
            tmc.remove(0);
        }
        true
    }

    fn group_10a(&mut self, b: u16, c: u16, d: u16) -> bool {
        let ab = b & 0x0010 != 0;
        if ab != self.ptyn_ab {
            self.ptyn_ab = ab;
            self.ptyn.clear();
        }
        let [c0, c1] = c.to_be_bytes();
        let [d0, d1] = d.to_be_bytes();
        self.ptyn.set(usize::from(b & 0x1), &[c0, c1, d0, d1]);
        match self.ptyn.full() {
            Some(ptyn) if !ptyn.is_empty() => {
                update(&mut self.data.program_type_name_long, Some(ptyn))
            }
            _ => false,
        }
    }

    fn group_14(&mut self, b: u16, c: u16, d: u16, version_b: bool) -> bool {
        let on_pi = d;
        let idx = match self.data.eon.iter().position(|s| s.pi == on_pi) {
            Some(idx) => idx,
            None if self.data.eon.len() < MAX_EON_STATIONS => {
                self.data.eon.push(EonStation {
                    pi: on_pi,
                    ..Default::default()
                });
                self.data.eon.len() - 1
            }
            None => return false,
        };
        let station = &mut self.data.eon[idx];
        let mut changed = update(&mut station.traffic_program, b & 0x0010 != 0);

        if version_b {
            changed |= update(&mut station.traffic_announcement, b & 0x0008 != 0);
            return changed;
        }

        let variant = b & 0x000f;
        match variant {
            0..=3 => {
                let ps = self
                    .eon_ps
                    .entry(on_pi)
                    .or_insert_with(|| SegmentText::new(4, 2));
                ps.set(usize::from(variant), &c.to_be_bytes());
                if let Some(name) = ps.full() {
                    changed |= update(&mut station.program_service, Some(name));
                }
            }
            4 => {
                let [af0, af1] = c.to_be_bytes();
                changed |= record_af_pair(&mut station.alternative_frequencies_hz, af0, af1);
            }
            5..=8 => {
                let [tn, on] = c.to_be_bytes();
                if let (Some(tn), Some(on)) = (af_code_to_hz(tn), af_code_to_hz(on)) {
                    if !station.mapped_frequencies_hz.contains(&(tn, on)) {
                        station.mapped_frequencies_hz.push((tn, on));
                        changed = true;
                    }
                }
            }
            13 => {
                changed |= update(&mut station.pty, Some((c >> 11) as u8));
                changed |= update(&mut station.traffic_announcement, c & 0x0001 != 0);
            }
            14 => {
                if let Some(pin) = program_item(c) {
                    changed |= update(&mut station.pin, Some(pin));
                }
            }
            _ => {}
        }
        changed
    }
}

/// Record a method A code pair. Count codes and filler carry no frequency;
/// code 250 announces an LF/MF frequency in the other half.
fn record_af_pair(afs: &mut Vec<u32>, af0: u8, af1: u8) -> bool {
    if af0 == 250 {
        return false;
    }
    let mut changed = false;
    for code in [af0, af1] {
        if is_af_count_code(code) {
            continue;
        }
        let Some(hz) = af_code_to_hz(code) else {
            continue;
        };
        if !afs.contains(&hz) {
            afs.push(hz);
            afs.sort_unstable();
            changed = true;
        }
    }
    changed
}

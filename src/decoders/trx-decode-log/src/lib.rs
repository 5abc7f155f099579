// SPDX-FileCopyrightText: 2026 Stanislaw Grams <stanislawgrams@gmail.com>
//
// SPDX-License-Identifier: BSD-2-Clause

//! JSON-Lines logging of [`DecodeEvent`]s.
//!
//! Every event is written as one line holding a millisecond timestamp next
//! to the serialized event. The target file comes from a single name
//! template, so decoders and channels can share a file or get their own.
//! Files roll over when the UTC date in the resolved name changes.

use std::collections::HashMap;
use std::fs::{create_dir_all, File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Datelike, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use trx_core::decode::DecodeEvent;

pub const DEFAULT_FILE_TEMPLATE: &str = "TRXRS-%DECODER%-%YYYY%-%MM%-%DD%.log";

fn default_decode_logs_dir() -> String {
    dirs::data_dir()
        .map(|dir| dir.join("trx-rs").join("decoders"))
        .unwrap_or_else(|| PathBuf::from("logs/decoders"))
        .to_string_lossy()
        .into_owned()
}

/// `[decode_logs]` section.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DecodeLogsConfig {
    pub enabled: bool,
    /// Directory the log files are created in.
    pub dir: String,
    /// File name with `%DECODER%`, `%CHANNEL%`, `%YYYY%`, `%MM%` and `%DD%`
    /// placeholders.
    pub file_template: String,
}

impl Default for DecodeLogsConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            dir: default_decode_logs_dir(),
            file_template: DEFAULT_FILE_TEMPLATE.to_string(),
        }
    }
}

/// Channel ids come from the config file; keep them inside `dir`.
fn sanitize(name: &str) -> String {
    name.chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect()
}

fn file_name(template: &str, event: &DecodeEvent, now: DateTime<Utc>) -> String {
    template
        .replace(
            "%DECODER%",
            &event.message.decoder_name().to_ascii_uppercase(),
        )
        .replace("%CHANNEL%", &sanitize(&event.channel_id))
        .replace("%YYYY%", &format!("{:04}", now.year()))
        .replace("%MM%", &format!("{:02}", now.month()))
        .replace("%DD%", &format!("{:02}", now.day()))
}

#[derive(Serialize)]
struct LogLine<'a> {
    ts_ms: i64,
    #[serde(flatten)]
    event: &'a DecodeEvent,
}

#[derive(Default)]
struct Writers {
    /// Date the open writers belong to.
    day: Option<(i32, u32, u32)>,
    open: HashMap<String, BufWriter<File>>,
}

/// Appends decode events to files under one directory.
pub struct DecoderLoggers {
    dir: PathBuf,
    template: String,
    writers: Mutex<Writers>,
}

impl DecoderLoggers {
    /// `None` when logging is disabled. Fails when the directory cannot be
    /// created or the template is empty.
    pub fn from_config(cfg: &DecodeLogsConfig) -> Result<Option<Arc<Self>>, String> {
        if !cfg.enabled {
            return Ok(None);
        }
        let template = cfg.file_template.trim();
        if template.is_empty() {
            return Err("decode_logs.file_template is empty".to_string());
        }
        let dir = PathBuf::from(cfg.dir.trim());
        create_dir_all(&dir)
            .map_err(|e| format!("create decode log dir '{}': {}", dir.display(), e))?;
        debug!("decode logs in {} as {}", dir.display(), template);
        Ok(Some(Arc::new(Self {
            dir,
            template: template.to_string(),
            writers: Mutex::new(Writers::default()),
        })))
    }

    /// Append one event. Failures are logged and otherwise ignored.
    pub fn log(&self, event: &DecodeEvent) {
        if let Err(e) = self.write_event(event, Utc::now()) {
            warn!(
                "decode log write failed for {} on {}: {}",
                event.message.decoder_name(),
                event.channel_id,
                e
            );
        }
    }

    fn write_event(&self, event: &DecodeEvent, now: DateTime<Utc>) -> Result<(), String> {
        let name = file_name(&self.template, event, now);
        let mut writers = self
            .writers
            .lock()
            .map_err(|_| "writer lock poisoned".to_string())?;

        let day = (now.year(), now.month(), now.day());
        if writers.day != Some(day) {
            // Yesterday's files are done.
            writers.open.clear();
            writers.day = Some(day);
        }
        if !writers.open.contains_key(&name) {
            let writer = open_append(&self.dir.join(&name))?;
            writers.open.insert(name.clone(), writer);
        }
        let Some(writer) = writers.open.get_mut(&name) else {
            return Err(format!("no writer for {}", name));
        };

        let line = LogLine {
            ts_ms: now.timestamp_millis(),
            event,
        };
        serde_json::to_writer(&mut *writer, &line).map_err(|e| e.to_string())?;
        writer.write_all(b"\n").map_err(|e| e.to_string())?;
        writer.flush().map_err(|e| e.to_string())
    }
}

fn open_append(path: &Path) -> Result<BufWriter<File>, String> {
    if let Some(parent) = path.parent() {
        create_dir_all(parent).map_err(|e| format!("create '{}': {}", parent.display(), e))?;
    }
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .map_err(|e| format!("open '{}': {}", path.display(), e))?;
    Ok(BufWriter::new(file))
}

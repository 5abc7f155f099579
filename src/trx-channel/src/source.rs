// SPDX-FileCopyrightText: 2025 Stanislaw Grams <stanislawgrams@gmail.com>
//
// SPDX-License-Identifier: BSD-2-Clause

//! IQ sample sources: a silent mock and interleaved sample files/streams.

use std::fmt;
use std::fs::File;
use std::io::{self, BufReader, Read};
use std::path::PathBuf;
use std::str::FromStr;

use num_complex::Complex;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum IqSourceError {
    #[error("IQ read failed: {0}")]
    Io(#[from] io::Error),
    #[error("end of IQ stream")]
    EndOfStream,
}

/// Abstraction over any IQ sample source.
pub trait IqSource: Send + 'static {
    /// Read the next block of IQ samples into `buf`.
    /// Returns the number of samples written.
    fn read_into(&mut self, buf: &mut [Complex<f32>]) -> Result<usize, IqSourceError>;
}

/// IQ source that produces silence (all zeros).
pub struct MockIqSource;

impl IqSource for MockIqSource {
    fn read_into(&mut self, buf: &mut [Complex<f32>]) -> Result<usize, IqSourceError> {
        buf.fill(Complex::new(0.0, 0.0));
        Ok(buf.len())
    }
}

/// On-disk layout of interleaved I/Q pairs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SampleFormat {
    /// Signed 16-bit little endian.
    #[default]
    Cs16,
    /// Unsigned 8-bit, offset binary (RTL-SDR).
    Cu8,
    /// 32-bit float little endian.
    Cf32,
}

impl SampleFormat {
    /// Bytes per complex sample.
    pub fn sample_size(self) -> usize {
        match self {
            Self::Cs16 => 4,
            Self::Cu8 => 2,
            Self::Cf32 => 8,
        }
    }

    fn decode(self, raw: &[u8]) -> Complex<f32> {
        match self {
            Self::Cs16 => Complex::new(
                f32::from(i16::from_le_bytes([raw[0], raw[1]])) / 32_768.0,
                f32::from(i16::from_le_bytes([raw[2], raw[3]])) / 32_768.0,
            ),
            Self::Cu8 => Complex::new(
                (f32::from(raw[0]) - 127.5) / 127.5,
                (f32::from(raw[1]) - 127.5) / 127.5,
            ),
            Self::Cf32 => Complex::new(
                f32::from_le_bytes([raw[0], raw[1], raw[2], raw[3]]),
                f32::from_le_bytes([raw[4], raw[5], raw[6], raw[7]]),
            ),
        }
    }
}

impl fmt::Display for SampleFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Cs16 => "cs16",
            Self::Cu8 => "cu8",
            Self::Cf32 => "cf32",
        })
    }
}

impl FromStr for SampleFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "cs16" | "s16" => Ok(Self::Cs16),
            "cu8" | "u8" => Ok(Self::Cu8),
            "cf32" | "f32" => Ok(Self::Cf32),
            other => Err(format!("unknown sample format '{}' (cs16, cu8, cf32)", other)),
        }
    }
}

/// IQ source reading interleaved samples from a file, stdin or any reader.
pub struct FileIqSource {
    reader: Box<dyn Read + Send>,
    format: SampleFormat,
    /// Reopened at end of file when repeating.
    path: Option<PathBuf>,
    repeat: bool,
    bytes: Vec<u8>,
    /// Bytes of an incomplete sample carried into the next read.
    carry: usize,
}

impl FileIqSource {
    /// Open `path`, or stdin for `-`. Repeating is ignored for stdin.
    pub fn open(path: &str, format: SampleFormat, repeat: bool) -> Result<Self, IqSourceError> {
        if path == "-" {
            return Ok(Self::from_reader(io::stdin(), format));
        }
        let path = PathBuf::from(path);
        let file = File::open(&path)?;
        Ok(Self {
            reader: Box::new(BufReader::new(file)),
            format,
            path: Some(path),
            repeat,
            bytes: Vec::new(),
            carry: 0,
        })
    }

    pub fn from_reader(reader: impl Read + Send + 'static, format: SampleFormat) -> Self {
        Self {
            reader: Box::new(reader),
            format,
            path: None,
            repeat: false,
            bytes: Vec::new(),
            carry: 0,
        }
    }

    pub fn format(&self) -> SampleFormat {
        self.format
    }

    fn rewind(&mut self) -> Result<bool, IqSourceError> {
        let Some(path) = self.path.as_ref().filter(|_| self.repeat) else {
            return Ok(false);
        };
        self.reader = Box::new(BufReader::new(File::open(path)?));
        Ok(true)
    }
}

impl IqSource for FileIqSource {
    fn read_into(&mut self, buf: &mut [Complex<f32>]) -> Result<usize, IqSourceError> {
        let size = self.format.sample_size();
        let want = buf.len() * size;
        self.bytes.resize(want.max(size), 0);

        let mut filled = self.carry;
        let mut rewound = false;
        let mut since_rewind = 0usize;
        while filled < want {
            match self.reader.read(&mut self.bytes[filled..want]) {
                Ok(0) => {
                    // An empty file must not loop forever.
                    if (rewound && since_rewind == 0) || !self.rewind()? {
                        break;
                    }
                    filled -= filled % size;
                    rewound = true;
                    since_rewind = 0;
                }
                Ok(n) => {
                    filled += n;
                    since_rewind += n;
                }
                Err(e) if e.kind() == io::ErrorKind::Interrupted => {}
                Err(e) => return Err(e.into()),
            }
        }

        let count = filled / size;
        if count == 0 {
            return Err(IqSourceError::EndOfStream);
        }
        for (out, raw) in buf.iter_mut().zip(self.bytes.chunks_exact(size).take(count)) {
            *out = self.format.decode(raw);
        }
        self.carry = filled - count * size;
        self.bytes.copy_within(count * size..filled, 0);
        Ok(count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{Cursor, Write};

    fn assert_approx_eq(a: f32, b: f32, tol: f32, label: &str) {
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
    fn mock_iq_source_fills_zeros() {
        let mut src = MockIqSource;
        let mut buf = vec![Complex::new(1.0_f32, 1.0_f32); 64];
        assert_eq!(src.read_into(&mut buf).ok(), Some(64));
        assert!(buf.iter().all(|s| s.re == 0.0 && s.im == 0.0));
    }

    #[test]
    fn decodes_each_format() {
        let mut cs16 = Vec::new();
        for v in [16_384i16, -32_768, 0, 8_192] {
            cs16.extend_from_slice(&v.to_le_bytes());
        }
        let mut src = FileIqSource::from_reader(Cursor::new(cs16), SampleFormat::Cs16);
        let mut buf = vec![Complex::default(); 4];
        assert_eq!(src.read_into(&mut buf).ok(), Some(2));
        assert_approx_eq(buf[0].re, 0.5, 1e-6, "cs16 i");
        assert_approx_eq(buf[0].im, -1.0, 1e-6, "cs16 q");
        assert_approx_eq(buf[1].im, 0.25, 1e-6, "cs16 q1");

        let mut src = FileIqSource::from_reader(Cursor::new(vec![255u8, 0]), SampleFormat::Cu8);
        assert_eq!(src.read_into(&mut buf).ok(), Some(1));
        assert_approx_eq(buf[0].re, 1.0, 1e-6, "cu8 i");
        assert_approx_eq(buf[0].im, -1.0, 1e-6, "cu8 q");

        let mut cf32 = Vec::new();
        for v in [0.125f32, -0.75] {
            cf32.extend_from_slice(&v.to_le_bytes());
        }
        let mut src = FileIqSource::from_reader(Cursor::new(cf32), SampleFormat::Cf32);
        assert_eq!(src.read_into(&mut buf).ok(), Some(1));
        assert_eq!(buf[0], Complex::new(0.125, -0.75));
    }

    #[test]
    fn partial_sample_is_carried_then_stream_ends() {
        // Two and a half cu8 samples, read one sample at a time.
        let mut src = FileIqSource::from_reader(Cursor::new(vec![0u8, 255, 255, 0, 10]), SampleFormat::Cu8);
        let mut buf = vec![Complex::default(); 1];
        assert_eq!(src.read_into(&mut buf).ok(), Some(1));
        assert_eq!(src.read_into(&mut buf).ok(), Some(1));
        assert_approx_eq(buf[0].re, 1.0, 1e-6, "second sample");
        assert!(matches!(src.read_into(&mut buf), Err(IqSourceError::EndOfStream)));
    }

    #[test]
    fn repeat_reopens_the_file() {
        let mut file = tempfile::NamedTempFile::new().expect("tempfile");
        file.write_all(&[200u8, 50, 100, 150]).expect("write");
        let path = file.path().to_string_lossy().to_string();

        let mut src = FileIqSource::open(&path, SampleFormat::Cu8, true).expect("open");
        let mut buf = vec![Complex::default(); 3];
        assert_eq!(src.read_into(&mut buf).ok(), Some(3));
        assert_eq!(buf[2], buf[0]);

        let mut once = FileIqSource::open(&path, SampleFormat::Cu8, false).expect("open");
        assert_eq!(once.read_into(&mut buf).ok(), Some(2));
        assert!(matches!(once.read_into(&mut buf), Err(IqSourceError::EndOfStream)));
    }

    #[test]
    fn format_names_parse() {
        assert_eq!("CU8".parse::<SampleFormat>(), Ok(SampleFormat::Cu8));
        assert_eq!(SampleFormat::Cf32.to_string(), "cf32");
        assert!("wav".parse::<SampleFormat>().is_err());
    }
}

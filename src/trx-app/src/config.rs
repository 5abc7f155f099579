// SPDX-FileCopyrightText: 2025 Stanislaw Grams <stanislawgrams@gmail.com>
//
// SPDX-License-Identifier: BSD-2-Clause

//! `trx-rs.toml` discovery and loading.
//!
//! A file either holds one table per binary (`[trx-server]`, ...) or is a
//! flat file holding a single binary's settings at the top level.

use serde::de::DeserializeOwned;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

pub const CONFIG_FILE_NAME: &str = "trx-rs.toml";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to parse config file {path}: {message}")]
    Parse { path: PathBuf, message: String },
}

impl ConfigError {
    fn parse(path: &Path, message: impl ToString) -> Self {
        Self::Parse {
            path: path.to_path_buf(),
            message: message.to_string(),
        }
    }
}

/// Returns the default search paths for `trx-rs.toml`
/// (current directory → XDG config → /etc).
pub fn config_search_paths() -> Vec<PathBuf> {
    let mut paths = vec![PathBuf::from(CONFIG_FILE_NAME)];
    if let Some(config_dir) = dirs::config_dir() {
        paths.push(config_dir.join("trx-rs").join(CONFIG_FILE_NAME));
    }
    paths.push(PathBuf::from("/etc/trx-rs").join(CONFIG_FILE_NAME));
    paths
}

/// Parse `content` read from `path` as `T`, taking the `key` table when
/// present and the whole document otherwise.
fn parse_section<T: DeserializeOwned>(
    content: &str,
    path: &Path,
    key: &str,
) -> Result<T, ConfigError> {
    let mut table: toml::Table =
        toml::from_str(content).map_err(|e| ConfigError::parse(path, e))?;

    let section = match table.remove(key) {
        Some(toml::Value::Table(section)) => section,
        Some(_) => return Err(ConfigError::parse(path, format!("[{}] is not a table", key))),
        None => table,
    };
    toml::Value::Table(section)
        .try_into()
        .map_err(|e| ConfigError::parse(path, e))
}

/// Trait for loading configuration from a `trx-rs.toml` section.
pub trait ConfigFile: Sized + Default + DeserializeOwned {
    /// Section key in `trx-rs.toml` (e.g. `"trx-server"`).
    fn section_key() -> &'static str;

    /// Load from a specific file path.
    fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        parse_section(&content, path, Self::section_key())
    }

    /// Load the first file found on the default search paths.
    ///
    /// Returns `(config, path_where_found)` or `(Default::default(), None)`
    /// when no config file exists.
    fn load_from_default_paths() -> Result<(Self, Option<PathBuf>), ConfigError> {
        for path in config_search_paths() {
            if path.is_file() {
                let cfg = Self::load_from_file(&path)?;
                return Ok((cfg, Some(path)));
            }
        }
        Ok((Self::default(), None))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;
    use std::io::Write;

    #[derive(Debug, Default, PartialEq, Deserialize)]
    #[serde(default)]
    struct Sample {
        name: String,
        rate: u32,
    }

    impl ConfigFile for Sample {
        fn section_key() -> &'static str {
            "sample"
        }
    }

    fn write(content: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().expect("tempfile");
        file.write_all(content.as_bytes()).expect("write");
        file
    }

    #[test]
    fn reads_own_section_of_combined_file() {
        let file = write("[other]\nrate = 1\n\n[sample]\nname = \"rx\"\nrate = 48000\n");
        let cfg = Sample::load_from_file(file.path()).expect("load");
        assert_eq!(
            cfg,
            Sample {
                name: "rx".into(),
                rate: 48_000
            }
        );
    }

    #[test]
    fn reads_flat_file_with_defaults() {
        let file = write("rate = 8000\n");
        let cfg = Sample::load_from_file(file.path()).expect("load");
        assert_eq!(cfg.rate, 8_000);
        assert!(cfg.name.is_empty());
    }

    #[test]
    fn reports_path_on_errors() {
        let file = write("[sample]\nrate = \"fast\"\n");
        let err = Sample::load_from_file(file.path()).expect_err("bad type");
        assert!(matches!(err, ConfigError::Parse { .. }));
        assert!(err.to_string().contains(&file.path().display().to_string()));

        let missing = Sample::load_from_file(Path::new("/nonexistent/trx-rs.toml"));
        assert!(matches!(missing, Err(ConfigError::Read { .. })));

        let file = write("sample = 3\n");
        assert!(Sample::load_from_file(file.path()).is_err());
    }

    #[test]
    fn search_order_starts_in_working_directory() {
        let paths = config_search_paths();
        assert_eq!(paths[0], PathBuf::from(CONFIG_FILE_NAME));
        assert_eq!(
            paths.last(),
            Some(&PathBuf::from("/etc/trx-rs/trx-rs.toml"))
        );
    }
}

// SPDX-FileCopyrightText: 2025 Stanislaw Grams <stanislawgrams@gmail.com>
//
// SPDX-License-Identifier: BSD-2-Clause

use tracing::Level;
use tracing_subscriber::FmtSubscriber;

/// Parse a configured level name, accepting `warning` for `warn`.
/// Falls back to INFO if level is None or invalid.
pub fn parse_level(log_level: Option<&str>) -> Level {
    log_level
        .map(str::trim)
        .map(|s| if s.eq_ignore_ascii_case("warning") { "warn" } else { s })
        .and_then(|s| s.parse::<Level>().ok())
        .unwrap_or(Level::INFO)
}

/// Initialize logging with optional level from config.
///
/// A second call keeps the subscriber already installed.
pub fn init_logging(log_level: Option<&str>) {
    let subscriber = FmtSubscriber::builder()
        .with_target(false)
        .with_max_level(parse_level(log_level))
        .finish();
    let _ = tracing::subscriber::set_global_default(subscriber);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn level_names() {
        assert_eq!(parse_level(Some("debug")), Level::DEBUG);
        assert_eq!(parse_level(Some(" Warning ")), Level::WARN);
        assert_eq!(parse_level(Some("loud")), Level::INFO);
        assert_eq!(parse_level(None), Level::INFO);
    }

    #[test]
    fn init_twice_is_harmless() {
        init_logging(Some("trace"));
        init_logging(None);
    }
}

//! Diagnostic logging through the `log` facade with an `env_logger` backend.
//!
//! The level comes from `RUST_LOG` when it is set, otherwise from the
//! `--log-level` flag.

use clap::ValueEnum;
use env_logger::Builder;
use log::LevelFilter;
use std::env;
use std::io::Write;

#[derive(Copy, Clone, Debug, ValueEnum, PartialEq, Eq)]
pub enum LogLevel {
    Info,
    Warn,
    Error,
    None,
}

impl LogLevel {
    pub fn filter(self) -> LevelFilter {
        match self {
            LogLevel::Info => LevelFilter::Info,
            LogLevel::Warn => LevelFilter::Warn,
            LogLevel::Error => LevelFilter::Error,
            LogLevel::None => LevelFilter::Off,
        }
    }

    pub fn shows_info(self) -> bool {
        matches!(self, LogLevel::Info)
    }

    pub fn shows_warnings(self) -> bool {
        matches!(self, LogLevel::Info | LogLevel::Warn)
    }
}

/// Installs the global logger. Safe to call more than once; later calls are
/// ignored.
pub fn init_logging(level: LogLevel) {
    let mut builder = Builder::new();
    if env::var("RUST_LOG").is_ok() {
        builder.parse_default_env();
    } else {
        builder.filter_level(level.filter());
    }
    builder.format(|buf, record| {
        let level = record.level();
        let style = buf.default_level_style(level);
        writeln!(buf, "{style}{:<5}{style:#} {}", level, record.args())
    });
    builder.target(env_logger::Target::Stderr);
    if builder.try_init().is_err() {
        log::debug!("Logger already initialised");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_level_filters() {
        assert_eq!(LogLevel::Info.filter(), LevelFilter::Info);
        assert_eq!(LogLevel::Warn.filter(), LevelFilter::Warn);
        assert_eq!(LogLevel::Error.filter(), LevelFilter::Error);
        assert_eq!(LogLevel::None.filter(), LevelFilter::Off);
    }

    #[test]
    fn test_visibility_helpers() {
        assert!(LogLevel::Info.shows_info());
        assert!(!LogLevel::Warn.shows_info());
        assert!(LogLevel::Warn.shows_warnings());
        assert!(!LogLevel::Error.shows_warnings());
        assert!(!LogLevel::None.shows_warnings());
    }

    #[test]
    fn test_init_logging_twice_does_not_panic() {
        init_logging(LogLevel::None);
        init_logging(LogLevel::Info);
    }
}

//! Configuration types for the call-session engine.

use crate::error::{CallError, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Top-level configuration for the engine.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CoreConfig {
    /// Timer periods and offsets.
    pub timing: TimingConfig,
    /// Journal read-view settings.
    pub journal: JournalConfig,
}

/// Timer periods and offsets, in milliseconds.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TimingConfig {
    /// One-shot delay between dialing and the call going live.
    pub dial_settle_ms: u64,
    /// Period of the elapsed-seconds ticker while a call is live.
    pub elapsed_tick_ms: u64,
    /// Period of the auto-advance ticker while a call is live.
    pub auto_advance_ms: u64,
    /// Offset applied to the synthesized lead reply's timestamp so it
    /// always sorts after the agent prompt, even with a coarse clock.
    pub reply_offset_ms: u64,
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            dial_settle_ms: 1_400,
            elapsed_tick_ms: 1_000,
            auto_advance_ms: 6_000,
            reply_offset_ms: 250,
        }
    }
}

/// Journal read-view settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct JournalConfig {
    /// Number of most-recent conversation entries shown by the read view.
    pub window: usize,
}

impl Default for JournalConfig {
    fn default() -> Self {
        Self { window: 14 }
    }
}

impl CoreConfig {
    /// Parse a config from TOML text. Missing fields fall back to defaults.
    pub fn from_toml_str(text: &str) -> Result<Self> {
        toml::from_str(text).map_err(|e| CallError::Config(e.to_string()))
    }

    /// Load a config file from disk, or defaults if the path does not exist.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            tracing::debug!(path = %path.display(), "no config file, using defaults");
            return Ok(Self::default());
        }
        let text = std::fs::read_to_string(path)?;
        Self::from_toml_str(&text)
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used)]

    use super::*;
    use std::io::Write;

    #[test]
    fn defaults_match_documented_timings() {
        let cfg = CoreConfig::default();
        assert_eq!(cfg.timing.dial_settle_ms, 1_400);
        assert_eq!(cfg.timing.elapsed_tick_ms, 1_000);
        assert_eq!(cfg.timing.auto_advance_ms, 6_000);
        assert_eq!(cfg.timing.reply_offset_ms, 250);
        assert_eq!(cfg.journal.window, 14);
    }

    #[test]
    fn partial_toml_overrides_only_named_fields() {
        let cfg = CoreConfig::from_toml_str(
            r#"
            [timing]
            auto_advance_ms = 2000
            "#,
        )
        .unwrap();
        assert_eq!(cfg.timing.auto_advance_ms, 2_000);
        assert_eq!(cfg.timing.dial_settle_ms, 1_400);
        assert_eq!(cfg.journal.window, 14);
    }

    #[test]
    fn invalid_toml_is_a_config_error() {
        let err = CoreConfig::from_toml_str("timing = 3").unwrap_err();
        assert!(matches!(err, CallError::Config(_)));
    }

    #[test]
    fn load_missing_file_returns_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = CoreConfig::load(&dir.path().join("absent.toml")).unwrap();
        assert_eq!(cfg.journal.window, 14);
    }

    #[test]
    fn load_reads_file_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("calldeck.toml");
        let mut f = std::fs::File::create(&path).unwrap();
        writeln!(f, "[journal]\nwindow = 5").unwrap();
        let cfg = CoreConfig::load(&path).unwrap();
        assert_eq!(cfg.journal.window, 5);
    }
}

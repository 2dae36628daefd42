use super::models::AppConfig;
use super::tables::ConfigTables;
use anyhow::{Context, Result};
use std::fs;
use std::path::Path;
use tracing::{debug, info, warn};

/// Load configuration from the given path, falling back to defaults on error.
pub fn load_config(path: &Path) -> AppConfig {
    let contents = match fs::read_to_string(path) {
        Ok(data) => {
            info!(path = %path.display(), "Loaded base config");
            data
        }
        Err(err) => {
            warn!(
                path = %path.display(),
                "Falling back to default config: {err}"
            );
            return AppConfig::default();
        }
    };

    match parse_config(&contents) {
        Ok(cfg) => {
            debug!("Parsed configuration from disk");
            cfg
        }
        Err(err) => {
            warn!(path = %path.display(), "Invalid config TOML: {err:#}");
            AppConfig::default()
        }
    }
}

/// Parse the tabled TOML format and clamp knobs into range.
pub fn parse_config(contents: &str) -> Result<AppConfig> {
    let tables: ConfigTables = toml::from_str(contents).context("Parsing config tables")?;
    Ok(AppConfig::from(tables).clamped())
}

pub fn serialize_config(config: &AppConfig) -> Result<String> {
    toml::to_string_pretty(&ConfigTables::from(config)).context("Serializing config")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{EngineKind, LogLevel};

    #[test]
    fn empty_file_gives_defaults() {
        assert_eq!(parse_config("").unwrap(), AppConfig::default());
    }

    #[test]
    fn reads_tables() {
        let cfg = parse_config(
            r#"
            [playback]
            chunk_size = 800

            [voice]
            engine = "piper"
            voice = "en-US"
            rate = 1.25

            [library]
            history_limit = 5

            [logging]
            log_level = "debug"
            "#,
        )
        .unwrap();
        assert_eq!(cfg.chunk_size, 800);
        assert_eq!(cfg.engine, EngineKind::Piper);
        assert_eq!(cfg.voice.as_deref(), Some("en-US"));
        assert_eq!(cfg.rate, 1.25);
        assert_eq!(cfg.pitch, 1.0);
        assert_eq!(cfg.history_limit, 5);
        assert_eq!(cfg.log_level, LogLevel::Debug);
        assert_eq!(cfg.page_separator, "\n\n");
    }

    #[test]
    fn clamps_out_of_range_values() {
        let cfg = parse_config(
            r#"
            [playback]
            chunk_size = 0

            [voice]
            rate = 40.0
            volume = -3.0

            [library]
            history_limit = 0
            "#,
        )
        .unwrap();
        assert_eq!(cfg.chunk_size, crate::segmenter::MIN_CHUNK_SIZE);
        assert_eq!(cfg.rate, crate::engine::MAX_RATE);
        assert_eq!(cfg.volume, 0.0);
        assert_eq!(cfg.history_limit, 1);
    }

    #[test]
    fn serialized_config_parses_back() {
        let cfg = AppConfig {
            chunk_size: 640,
            voice: Some("bf_emma".to_string()),
            engine: EngineKind::Piper,
            ..AppConfig::default()
        };
        let text = serialize_config(&cfg).unwrap();
        assert!(text.contains("[playback]"));
        assert_eq!(parse_config(&text).unwrap(), cfg);
    }

    #[test]
    fn invalid_or_missing_file_falls_back() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        assert_eq!(load_config(&path), AppConfig::default());

        fs::write(&path, "[playback\nchunk_size = ").unwrap();
        assert_eq!(load_config(&path), AppConfig::default());
    }
}

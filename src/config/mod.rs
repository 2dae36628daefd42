//! Configuration loading for the narrator.
//!
//! All user-tunable settings are centralized here and loaded from
//! `conf/config.toml` if present. The file is split into tables
//! (`[playback]`, `[voice]`, `[library]`, `[logging]`, `[remote]`) that are
//! flattened into [`AppConfig`]. Missing entries fall back to defaults and
//! numeric knobs are clamped into range.

mod defaults;
mod io;
mod models;
mod tables;

pub use io::{load_config, parse_config, serialize_config};
pub use models::{AppConfig, EngineKind, LogLevel};

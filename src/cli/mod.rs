//! CLI module for schedulai.
//!
//! Helpers shared by the `schedulai` binary: config path handling and
//! plain-text output for the offline commands.

use std::path::{Path, PathBuf};

use crate::error::ConfigError;
use crate::gateway::AssistantConfig;
use crate::types::{ExtractedDateTime, OpenSlot};

/// Default config location.
pub const DEFAULT_CONFIG_PATH: &str = "~/.schedulai/config.json";

/// Expand tilde (~) in paths.
pub fn expand_path(path: &Path) -> PathBuf {
    let path_str = path.to_string_lossy();
    if let Some(rest) = path_str.strip_prefix("~/") {
        if let Ok(home) = std::env::var("HOME") {
            return PathBuf::from(home).join(rest);
        }
    }
    path.to_path_buf()
}

/// Load the config at `path`, or defaults when the file does not exist.
pub fn load_or_default(path: &Path) -> Result<(AssistantConfig, bool), ConfigError> {
    let expanded = expand_path(path);
    match AssistantConfig::load(&expanded) {
        Ok(config) => Ok((config, true)),
        Err(ConfigError::FileNotFound(_)) => Ok((AssistantConfig::default(), false)),
        Err(e) => Err(e),
    }
}

/// Write a default config to `path`, creating parent directories.
///
/// An existing file is only replaced when `force` is set.
pub fn init_config(path: &Path, force: bool) -> Result<PathBuf, ConfigError> {
    let expanded = expand_path(path);
    if expanded.exists() && !force {
        return Err(ConfigError::InvalidValue {
            key: "path".to_string(),
            reason: format!("{} already exists (use --force to overwrite)", expanded.display()),
        });
    }
    if let Some(parent) = expanded.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(|e| ConfigError::ParseError(e.to_string()))?;
    }
    AssistantConfig::default().save(&expanded)?;
    Ok(expanded)
}

/// One line per recognized piece of a parsed phrase.
pub fn describe_extracted(found: &ExtractedDateTime) -> String {
    let date = found
        .date
        .map(|d| d.format("%Y-%m-%d (%A)").to_string())
        .unwrap_or_else(|| "-".to_string());
    let time = found
        .time
        .map(|t| t.format("%H:%M").to_string())
        .unwrap_or_else(|| "-".to_string());
    format!("date: {}\ntime: {}", date, time)
}

/// Numbered slot listing.
pub fn describe_slots(slots: &[OpenSlot]) -> String {
    if slots.is_empty() {
        return "no open slots".to_string();
    }
    slots
        .iter()
        .enumerate()
        .map(|(i, slot)| {
            format!(
                "{:>2}. {} - {}",
                i + 1,
                slot.start().format("%H:%M"),
                slot.end().format("%H:%M")
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, NaiveTime};

    #[test]
    fn test_expand_path_leaves_plain_paths() {
        assert_eq!(expand_path(Path::new("/etc/schedulai.json")), PathBuf::from("/etc/schedulai.json"));
        assert_eq!(expand_path(Path::new("config.json")), PathBuf::from("config.json"));
    }

    #[test]
    fn test_init_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.json");

        let written = init_config(&path, false).unwrap();
        assert_eq!(written, path);
        assert!(init_config(&path, false).is_err());
        assert!(init_config(&path, true).is_ok());

        let (config, existed) = load_or_default(&path).unwrap();
        assert!(existed);
        assert_eq!(config.server.port, 8080);
    }

    #[test]
    fn test_missing_config_falls_back() {
        let dir = tempfile::tempdir().unwrap();
        let (config, existed) = load_or_default(&dir.path().join("absent.json")).unwrap();
        assert!(!existed);
        assert_eq!(config.schedule.timezone, "Asia/Kolkata");
    }

    #[test]
    fn test_describe_extracted() {
        let found = ExtractedDateTime::new(
            NaiveDate::from_ymd_opt(2026, 6, 16),
            NaiveTime::from_hms_opt(15, 0, 0),
        );
        assert_eq!(describe_extracted(&found), "date: 2026-06-16 (Tuesday)\ntime: 15:00");
        assert_eq!(describe_extracted(&ExtractedDateTime::none()), "date: -\ntime: -");
    }
}

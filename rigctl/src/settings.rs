//! Persistent defaults for rigctl
//!
//! Settings live in `settings.json` under the user's config directory.
//! Command line flags override anything read from the file.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use rig_sim::VirtualRigConfig;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Model used when neither the file nor the command line names one
pub const DEFAULT_MODEL: u32 = 1;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Rig model number
    pub model: Option<u32>,
    /// Serial device, `host:port`, or `sim`
    pub rig_file: Option<String>,
    pub serial_speed: Option<u32>,
    /// Configuration tokens applied before opening
    pub conf: BTreeMap<String, String>,
    /// Address for `--listen`
    pub listen: Option<String>,
    /// Starting state for `-r sim`
    pub sim: VirtualRigConfig,
}

impl Settings {
    fn config_dir() -> Option<PathBuf> {
        if let Ok(xdg_config) = std::env::var("XDG_CONFIG_HOME") {
            let path = PathBuf::from(xdg_config);
            if path.is_absolute() {
                return Some(path.join("rigctl"));
            }
        }
        dirs::config_dir().map(|p| p.join("rigctl"))
    }

    /// Default settings file path
    pub fn settings_path() -> Option<PathBuf> {
        Self::config_dir().map(|p| p.join("settings.json"))
    }

    /// Load the default settings file, falling back to defaults
    pub fn load() -> Self {
        match Self::settings_path() {
            Some(path) if path.exists() => Self::load_from(&path).unwrap_or_else(|e| {
                tracing::warn!("Ignoring settings: {:#}", e);
                Self::default()
            }),
            _ => Self::default(),
        }
    }

    /// Load an explicitly named settings file
    pub fn load_from(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        let settings = serde_json::from_str(&text)
            .with_context(|| format!("Failed to parse {}", path.display()))?;
        debug!("Loaded settings from {}", path.display());
        Ok(settings)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }
        let json = serde_json::to_string_pretty(self).context("Failed to serialize settings")?;
        std::fs::write(path, json).with_context(|| format!("Failed to write {}", path.display()))
    }

    /// Model to open
    pub fn model(&self) -> u32 {
        self.model.unwrap_or(DEFAULT_MODEL)
    }

    /// Parse `token=value` pairs from `-C` and layer them over the file's
    pub fn apply_conf<'a>(&mut self, pairs: impl IntoIterator<Item = &'a str>) -> Result<()> {
        for pair in pairs {
            let (token, value) = pair
                .split_once('=')
                .with_context(|| format!("expected token=value, got '{}'", pair))?;
            self.conf
                .insert(token.trim().to_string(), value.trim().to_string());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rig_protocol::Mode;

    #[test]
    fn test_partial_file_uses_defaults() {
        let s: Settings = serde_json::from_str(r#"{"model": 228, "rig_file": "sim"}"#).unwrap();
        assert_eq!(s.model(), 228);
        assert_eq!(s.rig_file.as_deref(), Some("sim"));
        assert!(s.conf.is_empty());
        assert_eq!(s.sim, VirtualRigConfig::default());
        assert_eq!(Settings::default().model(), DEFAULT_MODEL);
    }

    #[test]
    fn test_conf_overrides() {
        let mut s = Settings::default();
        s.conf.insert("retry".into(), "1".into());
        s.apply_conf(["retry=5", " timeout = 300 "]).unwrap();
        assert_eq!(s.conf["retry"], "5");
        assert_eq!(s.conf["timeout"], "300");
        assert!(s.apply_conf(["retry"]).is_err());
    }

    #[test]
    fn test_save_and_load() {
        let dir = std::env::temp_dir().join(format!("rigctl-settings-{}", std::process::id()));
        let path = dir.join("settings.json");
        let mut s = Settings {
            model: Some(1611),
            serial_speed: Some(57600),
            ..Default::default()
        };
        s.sim.mode = Mode::Cw;
        s.save_to(&path).unwrap();
        assert_eq!(Settings::load_from(&path).unwrap(), s);
        std::fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn test_bad_file_is_an_error() {
        let path = std::env::temp_dir().join(format!("rigctl-bad-{}.json", std::process::id()));
        std::fs::write(&path, "{ not json").unwrap();
        assert!(Settings::load_from(&path).is_err());
        std::fs::remove_file(&path).unwrap();
    }
}

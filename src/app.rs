use directories::BaseDirs;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub server_url: String,
    pub socket_path: String,
    pub home_path: String,
    pub poll_interval_secs: Option<u64>,
    /// Reject registrations whose two passwords differ. Off by default to match the server.
    pub compare_passwords: bool,
    pub username: Option<String>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            server_url: "http://localhost:8088".into(),
            socket_path: "/ws".into(),
            home_path: "/home".into(),
            poll_interval_secs: None,
            compare_passwords: false,
            username: None,
        }
    }
}

impl Settings {
    pub fn path() -> Option<PathBuf> {
        let base = BaseDirs::new()?;
        Some(base.config_dir().join("tinychat.toml"))
    }

    /// Loads the settings file, falling back to defaults when it is missing or broken.
    pub fn load() -> Self {
        let Some(path) = Self::path() else {
            return Self::default();
        };
        match Self::load_from(&path) {
            Ok(settings) => settings,
            Err(Error::Io(e)) if e.kind() == std::io::ErrorKind::NotFound => Self::default(),
            Err(e) => {
                log::warn!("ignoring settings at {}: {e}", path.display());
                Self::default()
            }
        }
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path)?;
        let mut settings: Settings = toml::from_str(&text)?;
        settings.server_url = crate::utils::normalize_url(&settings.server_url);
        Ok(settings)
    }

    pub fn save(&self) -> Result<()> {
        let path = Self::path().ok_or(Error::NoConfigDir)?;
        self.save_to(&path)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, toml::to_string_pretty(self)?)?;
        Ok(())
    }
}

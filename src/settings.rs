use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, anyhow};
use serde::Deserialize;

const DEFAULT_SETTINGS_TOML: &str = include_str!("../settings.toml");

#[derive(Debug, Clone)]
pub struct Settings {
    pub text_color: String,
    pub font_family: String,
    pub urdu_font_family: String,
    pub font_path: Option<String>,
    pub jpeg_quality: u8,
    pub server_addr: String,
    pub data_dir: Option<String>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            text_color: "#ffffff".to_string(),
            font_family: "sans-serif".to_string(),
            urdu_font_family: "Noto Nastaliq Urdu".to_string(),
            font_path: None,
            jpeg_quality: 80,
            server_addr: "127.0.0.1:5000".to_string(),
            data_dir: None,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
struct SettingsFile {
    compose: Option<ComposeSettings>,
    server: Option<ServerSettings>,
    store: Option<StoreSettings>,
}

#[derive(Debug, Default, Deserialize)]
struct ComposeSettings {
    text_color: Option<String>,
    font_family: Option<String>,
    urdu_font_family: Option<String>,
    font_path: Option<String>,
    jpeg_quality: Option<u8>,
}

#[derive(Debug, Default, Deserialize)]
struct ServerSettings {
    addr: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct StoreSettings {
    data_dir: Option<String>,
}

/// Load settings in layers: built-in defaults, ./settings.toml,
/// ./settings.local.toml, ~/.capshala/settings{,.local}.toml, then an
/// optional explicit file. Later layers win per key.
pub fn load_settings(extra_path: Option<&Path>) -> Result<Settings> {
    let mut settings = Settings::default();
    ensure_home_settings_file()?;

    let mut ordered_paths = Vec::new();
    ordered_paths.push(PathBuf::from("settings.toml"));
    ordered_paths.push(PathBuf::from("settings.local.toml"));

    if let Some(home) = home_dir() {
        ordered_paths.push(home.join("settings.toml"));
        ordered_paths.push(home.join("settings.local.toml"));
    }

    if let Some(extra) = extra_path {
        if !extra.exists() {
            return Err(anyhow!("settings file not found: {}", extra.display()));
        }
        ordered_paths.push(extra.to_path_buf());
    }

    for path in ordered_paths {
        if path.exists() {
            let content = fs::read_to_string(&path)
                .with_context(|| format!("failed to read settings: {}", path.display()))?;
            let parsed: SettingsFile = toml::from_str(&content)
                .with_context(|| format!("failed to parse settings: {}", path.display()))?;
            settings.merge(parsed);
        }
    }

    Ok(settings)
}

impl Settings {
    /// Font family matching the caption language.
    pub fn family_for(&self, language: crate::language::Language) -> &str {
        match language {
            crate::language::Language::Urdu => &self.urdu_font_family,
            _ => &self.font_family,
        }
    }

    /// Directory holding the store's JSON collections.
    pub fn store_dir(&self) -> PathBuf {
        if let Some(dir) = self.data_dir.as_deref() {
            return PathBuf::from(dir);
        }
        home_dir()
            .map(|home| home.join("store"))
            .unwrap_or_else(|| PathBuf::from(".capshala-store"))
    }

    fn merge(&mut self, incoming: SettingsFile) {
        if let Some(compose) = incoming.compose {
            if let Some(color) = compose.text_color {
                if !color.trim().is_empty() {
                    self.text_color = color;
                }
            }
            if let Some(family) = compose.font_family {
                if !family.trim().is_empty() {
                    self.font_family = family;
                }
            }
            if let Some(family) = compose.urdu_font_family {
                if !family.trim().is_empty() {
                    self.urdu_font_family = family;
                }
            }
            if let Some(path) = compose.font_path {
                if !path.trim().is_empty() {
                    self.font_path = Some(path);
                }
            }
            if let Some(quality) = compose.jpeg_quality {
                if (1..=100).contains(&quality) {
                    self.jpeg_quality = quality;
                }
            }
        }
        if let Some(server) = incoming.server {
            if let Some(addr) = server.addr {
                if !addr.trim().is_empty() {
                    self.server_addr = addr;
                }
            }
        }
        if let Some(store) = incoming.store {
            if let Some(dir) = store.data_dir {
                if !dir.trim().is_empty() {
                    self.data_dir = Some(dir);
                }
            }
        }
    }
}

fn ensure_home_settings_file() -> Result<()> {
    let Some(home) = home_dir() else {
        return Ok(());
    };
    fs::create_dir_all(&home)
        .with_context(|| format!("failed to create settings directory: {}", home.display()))?;
    let path = home.join("settings.toml");
    if !path.exists() {
        fs::write(&path, DEFAULT_SETTINGS_TOML)
            .with_context(|| format!("failed to write settings: {}", path.display()))?;
    }
    Ok(())
}

fn home_dir() -> Option<PathBuf> {
    std::env::var("HOME").ok().and_then(|home| {
        let home = home.trim();
        if home.is_empty() {
            None
        } else {
            Some(Path::new(home).join(".capshala"))
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::language::Language;

    #[test]
    fn merge_overrides_only_present_keys() {
        let mut settings = Settings::default();
        let parsed: SettingsFile = toml::from_str(
            r##"
            [compose]
            text_color = "#ff00ff"
            jpeg_quality = 90

            [server]
            addr = "0.0.0.0:8080"
            "##,
        )
        .unwrap();
        settings.merge(parsed);
        assert_eq!(settings.text_color, "#ff00ff");
        assert_eq!(settings.jpeg_quality, 90);
        assert_eq!(settings.server_addr, "0.0.0.0:8080");
        assert_eq!(settings.font_family, "sans-serif");
    }

    #[test]
    fn merge_ignores_blank_and_out_of_range_values() {
        let mut settings = Settings::default();
        let parsed: SettingsFile = toml::from_str(
            r#"
            [compose]
            text_color = "  "
            jpeg_quality = 0
            "#,
        )
        .unwrap();
        settings.merge(parsed);
        assert_eq!(settings.text_color, "#ffffff");
        assert_eq!(settings.jpeg_quality, 80);
    }

    #[test]
    fn family_follows_language() {
        let settings = Settings::default();
        assert_eq!(settings.family_for(Language::Urdu), "Noto Nastaliq Urdu");
        assert_eq!(settings.family_for(Language::English), "sans-serif");
        assert_eq!(settings.family_for(Language::Roman), "sans-serif");
    }
}

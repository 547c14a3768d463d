use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::core::error::ConfigError;

const APP_DIR_NAME: &str = "Soreon";
const SETTINGS_FILE: &str = "launcher_settings.json";

/// Upstream endpoints. Overridable so a local mock can stand in for them.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct Endpoints {
    pub version_manifest: String,
    pub assets_base: String,
    pub fabric_meta: String,
    pub fabric_maven: String,
    /// Base of the per-version `index_<version>.html` pages.
    pub forge_files: String,
    pub forge_promotions: String,
}

impl Default for Endpoints {
    fn default() -> Self {
        Self {
            version_manifest: "https://piston-meta.mojang.com/mc/game/version_manifest_v2.json"
                .into(),
            assets_base: "https://resources.download.minecraft.net".into(),
            fabric_meta: "https://meta.fabricmc.net/v2".into(),
            fabric_maven: "https://maven.fabricmc.net".into(),
            forge_files: "https://files.minecraftforge.net/net/minecraftforge/forge".into(),
            forge_promotions:
                "https://files.minecraftforge.net/net/minecraftforge/forge/promotions_slim.json"
                    .into(),
        }
    }
}

/// Persisted launcher settings (`launcher_settings.json` in the data dir).
///
/// Unset paths resolve relative to the data directory, see
/// [`LauncherPaths`](super::LauncherPaths).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct LauncherSettings {
    pub minecraft_dir: Option<PathBuf>,
    pub database_path: Option<PathBuf>,
    pub mods_dir: Option<PathBuf>,
    pub auth_file: Option<PathBuf>,
    /// Java executable used for loader installers and the game.
    pub java_path: PathBuf,
    pub launcher_name: String,
    pub launcher_version: String,
    pub http_timeout_secs: u64,
    pub installer_timeout_secs: u64,
    pub download_chunk_size: usize,
    pub download_concurrency: usize,
    pub endpoints: Endpoints,
}

impl Default for LauncherSettings {
    fn default() -> Self {
        Self {
            minecraft_dir: None,
            database_path: None,
            mods_dir: None,
            auth_file: None,
            java_path: PathBuf::from("java"),
            launcher_name: "Soreon Launcher".into(),
            launcher_version: "1.0.0".into(),
            http_timeout_secs: 30,
            installer_timeout_secs: 600,
            download_chunk_size: 8192,
            download_concurrency: 8,
            endpoints: Endpoints::default(),
        }
    }
}

impl LauncherSettings {
    pub fn http_timeout(&self) -> Duration {
        Duration::from_secs(self.http_timeout_secs.max(1))
    }

    pub fn installer_timeout(&self) -> Duration {
        Duration::from_secs(self.installer_timeout_secs.max(1))
    }

    pub fn settings_path(data_dir: &Path) -> PathBuf {
        data_dir.join(SETTINGS_FILE)
    }

    /// Load settings, falling back to defaults when the file is missing or
    /// unreadable.
    pub fn load_or_default(data_dir: &Path) -> Self {
        match Self::load(data_dir) {
            Ok(Some(settings)) => settings,
            Ok(None) => Self::default(),
            Err(e) => {
                warn!("Ignoring unreadable settings in {:?}: {}", data_dir, e);
                Self::default()
            }
        }
    }

    pub fn load(data_dir: &Path) -> Result<Option<Self>, ConfigError> {
        let path = Self::settings_path(data_dir);
        let raw = match std::fs::read_to_string(&path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(source) => return Err(ConfigError::Io { path, source }),
        };
        Ok(Some(serde_json::from_str(&raw)?))
    }

    /// Write through a temp file and rename so readers never see half a file.
    pub fn save(&self, data_dir: &Path) -> Result<(), ConfigError> {
        std::fs::create_dir_all(data_dir).map_err(|source| ConfigError::Io {
            path: data_dir.to_path_buf(),
            source,
        })?;

        let path = Self::settings_path(data_dir);
        let tmp = path.with_extension("json.tmp");
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(&tmp, json).map_err(|source| ConfigError::Io {
            path: tmp.clone(),
            source,
        })?;
        std::fs::rename(&tmp, &path).map_err(|source| ConfigError::Io { path, source })
    }
}

/// `<platform data dir>/Soreon`, or `./Soreon` when the platform has none.
pub fn default_data_dir() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(APP_DIR_NAME)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_yields_defaults() {
        let dir = tempfile::tempdir().unwrap();
        assert_eq!(
            LauncherSettings::load_or_default(dir.path()),
            LauncherSettings::default()
        );
    }

    #[test]
    fn partial_file_keeps_defaults_for_absent_fields() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            LauncherSettings::settings_path(dir.path()),
            r#"{"java_path": "/opt/jdk/bin/java", "endpoints": {"fabric_meta": "http://localhost:9/v2"}}"#,
        )
        .unwrap();

        let settings = LauncherSettings::load_or_default(dir.path());
        assert_eq!(settings.java_path, PathBuf::from("/opt/jdk/bin/java"));
        assert_eq!(settings.launcher_name, "Soreon Launcher");
        assert_eq!(settings.endpoints.fabric_meta, "http://localhost:9/v2");
        assert_eq!(settings.endpoints.fabric_maven, Endpoints::default().fabric_maven);
    }

    #[test]
    fn corrupt_file_falls_back_to_defaults() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(LauncherSettings::settings_path(dir.path()), "{not json").unwrap();
        assert_eq!(
            LauncherSettings::load_or_default(dir.path()),
            LauncherSettings::default()
        );
    }

    #[test]
    fn save_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let settings = LauncherSettings {
            installer_timeout_secs: 42,
            ..LauncherSettings::default()
        };
        settings.save(dir.path()).unwrap();

        assert_eq!(LauncherSettings::load(dir.path()).unwrap(), Some(settings));
        assert!(!dir.path().join("launcher_settings.json.tmp").exists());
    }
}

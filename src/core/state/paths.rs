use std::path::{Path, PathBuf};

use super::settings::LauncherSettings;
use crate::core::error::ConfigError;

/// Subdirectories of the game root created on startup.
pub const GAME_SUBDIRS: [&str; 5] = ["versions", "mods", "libraries", "assets", "natives"];

/// Concrete on-disk locations, resolved from the data dir plus settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LauncherPaths {
    pub data_dir: PathBuf,
    /// Game root (`.minecraft` equivalent).
    pub minecraft_dir: PathBuf,
    pub database_path: PathBuf,
    pub mods_dir: PathBuf,
    pub auth_file: PathBuf,
}

impl LauncherPaths {
    pub fn resolve(data_dir: &Path, settings: &LauncherSettings) -> Self {
        let minecraft_dir = settings
            .minecraft_dir
            .clone()
            .unwrap_or_else(|| data_dir.join("minecraft"));
        let mods_dir = settings
            .mods_dir
            .clone()
            .unwrap_or_else(|| minecraft_dir.join("mods"));

        Self {
            data_dir: data_dir.to_path_buf(),
            database_path: settings
                .database_path
                .clone()
                .unwrap_or_else(|| data_dir.join("soreon.db")),
            auth_file: settings
                .auth_file
                .clone()
                .unwrap_or_else(|| data_dir.join("auth.json")),
            minecraft_dir,
            mods_dir,
        }
    }

    /// Create the game root layout. Safe to call repeatedly.
    pub fn ensure_directories(&self) -> Result<(), ConfigError> {
        let dirs = GAME_SUBDIRS
            .iter()
            .map(|sub| self.minecraft_dir.join(sub))
            .chain([self.data_dir.clone(), self.mods_dir.clone()]);

        for dir in dirs {
            std::fs::create_dir_all(&dir).map_err(|source| ConfigError::Io { path: dir, source })?;
        }
        Ok(())
    }

    pub fn versions_dir(&self) -> PathBuf {
        self.minecraft_dir.join("versions")
    }

    pub fn libraries_dir(&self) -> PathBuf {
        self.minecraft_dir.join("libraries")
    }

    pub fn assets_dir(&self) -> PathBuf {
        self.minecraft_dir.join("assets")
    }

    pub fn natives_dir(&self) -> PathBuf {
        self.minecraft_dir.join("natives")
    }

    /// Downloaded loader installers, outside the game root.
    pub fn installers_dir(&self) -> PathBuf {
        self.data_dir.join("installers")
    }
}

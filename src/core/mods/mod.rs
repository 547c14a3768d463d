use std::path::PathBuf;
use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::core::downloader::Downloader;
use crate::core::error::{InstallError, InstallResult};
use crate::core::registry::{ModRecord, VersionRegistry};

/// Downloads mod jars into the mods directory and keeps the `mods` table
/// in step with them.
pub struct ModInstaller {
    downloader: Downloader,
    registry: Arc<VersionRegistry>,
    mods_dir: PathBuf,
}

impl ModInstaller {
    pub fn new(downloader: Downloader, registry: Arc<VersionRegistry>, mods_dir: PathBuf) -> Self {
        Self {
            downloader,
            registry,
            mods_dir,
        }
    }

    pub fn mods_dir(&self) -> &PathBuf {
        &self.mods_dir
    }

    /// Save `file_url` as `<mods_dir>/<mod_id>.jar`.
    pub async fn download_mod(
        &self,
        mod_id: &str,
        file_url: &str,
        cancel: &CancellationToken,
    ) -> InstallResult<PathBuf> {
        let dest = self.mods_dir.join(jar_name(mod_id)?);
        info!("Downloading mod {} from {}", mod_id, file_url);

        let bytes = self.downloader.download_to_file(file_url, &dest, cancel).await?;
        info!("Mod {} saved to {:?} ({} bytes)", mod_id, dest, bytes);
        Ok(dest)
    }

    /// Download and register a mod for `game_version`.
    pub async fn install_mod(
        &self,
        mod_id: &str,
        name: &str,
        file_url: &str,
        game_version: &str,
        cancel: &CancellationToken,
    ) -> InstallResult<ModRecord> {
        let file_path = self.download_mod(mod_id, file_url, cancel).await?;
        let record = ModRecord {
            name: name.to_string(),
            version: game_version.to_string(),
            file_path,
            mod_id: Some(mod_id.to_string()),
        };
        self.registry.save_mod(&record)?;
        Ok(record)
    }

    pub fn installed(&self) -> InstallResult<Vec<ModRecord>> {
        Ok(self.registry.list_mods()?)
    }
}

/// Mod ids end up as file names, so anything that could escape the mods
/// directory is rejected.
fn jar_name(mod_id: &str) -> InstallResult<String> {
    let valid = !mod_id.is_empty()
        && mod_id != "."
        && mod_id != ".."
        && mod_id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'));

    if !valid {
        return Err(InstallError::io(
            mod_id,
            std::io::Error::new(std::io::ErrorKind::InvalidInput, "invalid mod id"),
        ));
    }
    Ok(format!("{mod_id}.jar"))
}

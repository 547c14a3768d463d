use std::path::Path;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::info;

use super::stage::InstallStage;
use crate::core::downloader::Downloader;
use crate::core::error::{InstallError, InstallResult};
use crate::core::progress::ProgressSender;
use crate::core::state::{Endpoints, LauncherPaths};
use crate::core::variant::VariantKey;

/// Everything one installation run needs, borrowed from the driver.
pub struct InstallContext<'a> {
    pub key: &'a VariantKey,
    pub paths: &'a LauncherPaths,
    pub endpoints: &'a Endpoints,
    pub http_client: &'a reqwest::Client,
    pub downloader: &'a Downloader,
    pub java_path: &'a Path,
    /// Per-request bound on metadata fetches.
    pub http_timeout: Duration,
    pub installer_timeout: Duration,
    pub progress: &'a ProgressSender,
    pub cancel: &'a CancellationToken,
}

impl InstallContext<'_> {
    /// Game version the key refers to.
    pub fn game_version(&self) -> &str {
        &self.key.version
    }

    pub fn check_cancelled(&self) -> InstallResult<()> {
        if self.cancel.is_cancelled() {
            return Err(InstallError::Cancelled);
        }
        Ok(())
    }

    /// Move to `stage`: bail out if cancelled, otherwise report it.
    pub fn enter(&self, stage: InstallStage) -> InstallResult<()> {
        self.check_cancelled()?;
        info!("[{}] {}", self.key, stage);
        self.progress.emit(stage.baseline(), stage.label());
        Ok(())
    }
}

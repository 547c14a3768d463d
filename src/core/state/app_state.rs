use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use super::paths::LauncherPaths;
use super::settings::LauncherSettings;
use crate::core::auth::{AuthFile, CredentialSource};
use crate::core::catalog::{Listing, SourceCatalog};
use crate::core::error::{ConfigError, InstallError, InstallResult, LaunchError, StorageResult};
use crate::core::http::build_http_client;
use crate::core::launch::{LaunchComposer, ProcessInvocation, VersionJsonComposer};
use crate::core::loaders::InstallationDriver;
use crate::core::mods::ModInstaller;
use crate::core::progress::{progress_channel, ProgressReceiver};
use crate::core::registry::VersionRegistry;
use crate::core::variant::{Ecosystem, VariantKey, VariantRecord};

/// A running installation, as seen by the caller.
pub struct InstallHandle {
    pub key: VariantKey,
    pub progress: ProgressReceiver,
    pub cancel: CancellationToken,
    pub completion: JoinHandle<InstallResult<VariantRecord>>,
}

/// Everything the front end talks to, wired from one data directory.
pub struct Launcher {
    settings: LauncherSettings,
    paths: LauncherPaths,
    registry: Arc<VersionRegistry>,
    catalog: SourceCatalog,
    driver: Arc<InstallationDriver>,
    composer: LaunchComposer,
    auth: AuthFile,
    mods: ModInstaller,
    installing: Arc<AtomicBool>,
}

impl Launcher {
    /// Open the launcher rooted at `data_dir`, writing default settings on
    /// first run.
    pub fn open(data_dir: &Path) -> Result<Self, ConfigError> {
        let settings = LauncherSettings::load_or_default(data_dir);
        if !LauncherSettings::settings_path(data_dir).exists() {
            settings.save(data_dir)?;
        }
        Self::with_settings(data_dir, settings)
    }

    pub fn with_settings(data_dir: &Path, settings: LauncherSettings) -> Result<Self, ConfigError> {
        let paths = LauncherPaths::resolve(data_dir, &settings);
        paths.ensure_directories()?;

        let registry = Arc::new(VersionRegistry::open(&paths.database_path)?);
        let client = build_http_client(settings.http_timeout())?;

        let catalog = SourceCatalog::new(
            client.clone(),
            settings.endpoints.clone(),
            settings.http_timeout(),
        );
        let driver = InstallationDriver::new(
            &settings,
            paths.clone(),
            Arc::clone(&registry),
            client,
        );
        let composer = LaunchComposer::new(
            Arc::clone(&registry),
            Arc::new(VersionJsonComposer::new(settings.java_path.clone(), &paths)),
            paths.minecraft_dir.clone(),
            settings.launcher_name.clone(),
            settings.launcher_version.clone(),
        );
        let mods = ModInstaller::new(
            driver.downloader().clone(),
            Arc::clone(&registry),
            paths.mods_dir.clone(),
        );
        let auth = AuthFile::load(&paths.auth_file);

        info!("Launcher ready at {:?}", paths.data_dir);
        Ok(Self {
            settings,
            paths,
            registry,
            catalog,
            driver: Arc::new(driver),
            composer,
            auth,
            mods,
            installing: Arc::new(AtomicBool::new(false)),
        })
    }

    pub fn settings(&self) -> &LauncherSettings {
        &self.settings
    }

    pub fn paths(&self) -> &LauncherPaths {
        &self.paths
    }

    pub fn registry(&self) -> &Arc<VersionRegistry> {
        &self.registry
    }

    pub fn mods(&self) -> &ModInstaller {
        &self.mods
    }

    pub fn auth(&self) -> &AuthFile {
        &self.auth
    }

    pub fn auth_mut(&mut self) -> &mut AuthFile {
        &mut self.auth
    }

    pub async fn list_variants(&self, ecosystem: Ecosystem) -> Listing {
        self.catalog.list_variants(ecosystem).await
    }

    pub fn installed(&self) -> StorageResult<Vec<VariantRecord>> {
        self.registry.list_versions()
    }

    pub fn is_installing(&self) -> bool {
        self.installing.load(Ordering::Acquire)
    }

    /// Start installing `key` on the tokio runtime.
    ///
    /// Only one installation runs at a time; a second call while one is in
    /// flight fails with [`InstallError::Busy`].
    pub fn spawn_install(&self, key: VariantKey) -> InstallResult<InstallHandle> {
        if self
            .installing
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            warn!("Rejected install of {}: another installation is running", key);
            return Err(InstallError::Busy);
        }

        let guard = BusyGuard(Arc::clone(&self.installing));
        let (sender, progress) = progress_channel();
        let cancel = CancellationToken::new();
        let driver = Arc::clone(&self.driver);
        let task_key = key.clone();
        let task_cancel = cancel.clone();

        let completion = tokio::spawn(async move {
            let _guard = guard;
            driver.install(&task_key, &sender, &task_cancel).await
        });

        Ok(InstallHandle {
            key,
            progress,
            cancel,
            completion,
        })
    }

    /// Launch command for the most recent install of `version`, using the
    /// stored credentials.
    pub fn compose(&self, version: &str) -> Result<ProcessInvocation, LaunchError> {
        self.composer.compose(version, &self.auth.credentials())
    }

    pub fn compose_variant(&self, key: &VariantKey) -> Result<ProcessInvocation, LaunchError> {
        self.composer.compose_variant(key, &self.auth.credentials())
    }
}

/// Clears the in-flight flag when the install task ends, however it ends.
struct BusyGuard(Arc<AtomicBool>);

impl Drop for BusyGuard {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

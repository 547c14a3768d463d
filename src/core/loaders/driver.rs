use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use super::bulk::{BulkInstaller, MojangBulkInstaller};
use super::context::InstallContext;
use super::installer::Installer;
use super::stage::InstallStage;
use crate::core::downloader::Downloader;
use crate::core::error::InstallResult;
use crate::core::progress::ProgressSender;
use crate::core::registry::VersionRegistry;
use crate::core::state::{Endpoints, LauncherPaths, LauncherSettings};
use crate::core::variant::{VariantKey, VariantRecord};

/// Runs one ecosystem installer and persists its record.
///
/// The record is written only after the installer fully succeeded, so a
/// failed or cancelled run never leaves one behind. Files already written
/// to disk stay where they are.
pub struct InstallationDriver {
    registry: Arc<VersionRegistry>,
    paths: LauncherPaths,
    endpoints: Endpoints,
    client: reqwest::Client,
    downloader: Downloader,
    bulk: Arc<dyn BulkInstaller>,
    java_path: PathBuf,
    http_timeout: Duration,
    installer_timeout: Duration,
}

impl InstallationDriver {
    pub fn new(
        settings: &LauncherSettings,
        paths: LauncherPaths,
        registry: Arc<VersionRegistry>,
        client: reqwest::Client,
    ) -> Self {
        let downloader = Downloader::new(client.clone())
            .with_concurrency(settings.download_concurrency)
            .with_chunk_size(settings.download_chunk_size);
        let bulk = Arc::new(MojangBulkInstaller::new(
            client.clone(),
            downloader.clone(),
            settings.endpoints.clone(),
            settings.http_timeout(),
        ));

        Self {
            registry,
            paths,
            endpoints: settings.endpoints.clone(),
            client,
            downloader,
            bulk,
            java_path: settings.java_path.clone(),
            http_timeout: settings.http_timeout(),
            installer_timeout: settings.installer_timeout(),
        }
    }

    /// Replace the base-game installer used by the vanilla path.
    pub fn with_bulk_installer(mut self, bulk: Arc<dyn BulkInstaller>) -> Self {
        self.bulk = bulk;
        self
    }

    pub fn registry(&self) -> &Arc<VersionRegistry> {
        &self.registry
    }

    pub fn downloader(&self) -> &Downloader {
        &self.downloader
    }

    /// Install `key`, streaming progress into `progress`.
    ///
    /// Whatever the outcome, the last event sent is either completion at
    /// 100% or a readable failure message.
    pub async fn install(
        &self,
        key: &VariantKey,
        progress: &ProgressSender,
        cancel: &CancellationToken,
    ) -> InstallResult<VariantRecord> {
        info!("Installing {}", key);
        let result = self.run(key, progress, cancel).await;

        match &result {
            Ok(record) => {
                info!("{} installed at {:?}", key, record.install_path);
                progress.emit(
                    InstallStage::Complete.baseline(),
                    format!("{} {}", key, InstallStage::Complete.label().to_lowercase()),
                );
            }
            Err(e) => {
                warn!("Installation of {} failed: {}", key, e);
                progress.status(format!("Installation of {key} failed: {e}"));
            }
        }
        result
    }

    async fn run(
        &self,
        key: &VariantKey,
        progress: &ProgressSender,
        cancel: &CancellationToken,
    ) -> InstallResult<VariantRecord> {
        let ctx = InstallContext {
            key,
            paths: &self.paths,
            endpoints: &self.endpoints,
            http_client: &self.client,
            downloader: &self.downloader,
            java_path: &self.java_path,
            http_timeout: self.http_timeout,
            installer_timeout: self.installer_timeout,
            progress,
            cancel,
        };

        let record = Installer::for_ecosystem(key.ecosystem, Arc::clone(&self.bulk))
            .install(&ctx)
            .await?;

        // Last chance to back out before the record becomes visible.
        ctx.check_cancelled()?;
        self.registry.put(&record)?;
        Ok(record)
    }
}

#[cfg(test)]
mod tests {
    use std::path::Path;
    use std::sync::atomic::{AtomicBool, Ordering};

    use async_trait::async_trait;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;
    use crate::core::error::InstallError;
    use crate::core::loaders::bulk::BulkCallbacks;
    use crate::core::progress::progress_channel;
    use crate::core::variant::Ecosystem;

    struct Fixture {
        _dir: tempfile::TempDir,
        driver: InstallationDriver,
        registry: Arc<VersionRegistry>,
        paths: LauncherPaths,
    }

    fn fixture(server: &MockServer, java: PathBuf) -> Fixture {
        let dir = tempfile::tempdir().unwrap();
        let settings = LauncherSettings {
            java_path: java,
            installer_timeout_secs: 30,
            endpoints: Endpoints {
                fabric_meta: format!("{}/v2", server.uri()),
                fabric_maven: format!("{}/maven", server.uri()),
                forge_files: format!("{}/forge", server.uri()),
                ..Endpoints::default()
            },
            ..LauncherSettings::default()
        };
        let paths = LauncherPaths::resolve(dir.path(), &settings);
        paths.ensure_directories().unwrap();
        let registry = Arc::new(VersionRegistry::in_memory().unwrap());
        let driver = InstallationDriver::new(
            &settings,
            paths.clone(),
            Arc::clone(&registry),
            reqwest::Client::new(),
        );
        Fixture {
            _dir: dir,
            driver,
            registry,
            paths,
        }
    }

    async fn mount_json(server: &MockServer, at: &str, body: serde_json::Value) {
        Mock::given(method("GET"))
            .and(path(at))
            .respond_with(ResponseTemplate::new(200).set_body_json(body))
            .mount(server)
            .await;
    }

    async fn mount_fabric_meta(server: &MockServer, game: &str) {
        mount_json(
            server,
            &format!("/v2/versions/loader/{game}"),
            serde_json::json!([{"loader": {"version": "0.15.7", "stable": true}}]),
        )
        .await;
        mount_json(
            server,
            "/v2/versions/installer",
            serde_json::json!([
                {"maven": "net.fabricmc:fabric-installer:1.0.1-beta", "stable": false},
                {"maven": "net.fabricmc:fabric-installer:1.0.0", "stable": true}
            ]),
        )
        .await;
    }

    async fn mount_installer_jar(server: &MockServer, at: &str) {
        Mock::given(method("GET"))
            .and(path(at))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(b"jar".to_vec()))
            .mount(server)
            .await;
    }

    const FABRIC_JAR: &str = "/maven/net/fabricmc/fabric-installer/1.0.0/fabric-installer-1.0.0.jar";

    fn key(ecosystem: Ecosystem, version: &str) -> VariantKey {
        VariantKey::new(ecosystem, version).unwrap()
    }

    fn assert_not_recorded(fx: &Fixture, key: &VariantKey) {
        assert_eq!(fx.registry.get(key).unwrap(), None);
        assert!(fx.registry.list_versions().unwrap().is_empty());
    }

    #[tokio::test]
    async fn fabric_metadata_500_is_network_error_without_record() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;
        let fx = fixture(&server, PathBuf::from("java"));
        let key = key(Ecosystem::Fabric, "0.15.7");
        let (tx, mut rx) = progress_channel();

        let err = fx
            .driver
            .install(&key, &tx, &CancellationToken::new())
            .await
            .unwrap_err();

        assert!(matches!(err, InstallError::Network(_)));
        assert_not_recorded(&fx, &key);
        let last = rx.drain().pop().unwrap();
        assert!(last.message.contains("failed"), "{}", last.message);
    }

    #[tokio::test]
    async fn fabric_without_loaders_is_format_change() {
        let server = MockServer::start().await;
        mount_json(&server, "/v2/versions/loader/1.20.1", serde_json::json!([])).await;
        let fx = fixture(&server, PathBuf::from("java"));
        let key = key(Ecosystem::Fabric, "1.20.1");

        let err = fx
            .driver
            .install(&key, &ProgressSender::detached(), &CancellationToken::new())
            .await
            .unwrap_err();
        assert!(matches!(err, InstallError::UpstreamFormatChanged(_)));
        assert_not_recorded(&fx, &key);
    }

    #[tokio::test]
    async fn fabric_installer_download_failure_leaves_no_record() {
        let server = MockServer::start().await;
        mount_fabric_meta(&server, "1.20.1").await;
        let fx = fixture(&server, PathBuf::from("java"));
        let key = key(Ecosystem::Fabric, "1.20.1");

        let err = fx
            .driver
            .install(&key, &ProgressSender::detached(), &CancellationToken::new())
            .await
            .unwrap_err();
        assert!(matches!(err, InstallError::Network(msg) if msg.contains("404")));
        assert_not_recorded(&fx, &key);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn fabric_installer_failure_leaves_no_record() {
        let server = MockServer::start().await;
        mount_fabric_meta(&server, "1.20.1").await;
        mount_installer_jar(&server, FABRIC_JAR).await;
        // `sh -jar ...` rejects the option and exits non-zero.
        let fx = fixture(&server, PathBuf::from("/bin/sh"));
        let key = key(Ecosystem::Fabric, "1.20.1");

        let err = fx
            .driver
            .install(&key, &ProgressSender::detached(), &CancellationToken::new())
            .await
            .unwrap_err();
        assert!(matches!(err, InstallError::ExternalProcessFailed { .. }));
        assert_not_recorded(&fx, &key);
    }

    #[cfg(unix)]
    fn fake_java(dir: &Path) -> PathBuf {
        use std::os::unix::fs::PermissionsExt;

        let script = dir.join("fake-java");
        let log = dir.join("java-args.txt");
        std::fs::write(
            &script,
            format!("#!/bin/sh\nprintf '%s\\n' \"$@\" > '{}'\nexit 0\n", log.display()),
        )
        .unwrap();
        std::fs::set_permissions(&script, std::fs::Permissions::from_mode(0o755)).unwrap();
        script
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn fabric_success_records_loader_profile() {
        let server = MockServer::start().await;
        mount_fabric_meta(&server, "1.20.1").await;
        mount_installer_jar(&server, FABRIC_JAR).await;
        let bin = tempfile::tempdir().unwrap();
        let fx = fixture(&server, fake_java(bin.path()));
        let key = key(Ecosystem::Fabric, "1.20.1");
        let (tx, mut rx) = progress_channel();

        let record = fx
            .driver
            .install(&key, &tx, &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(
            record.install_path,
            fx.paths.versions_dir().join("fabric-loader-0.15.7-1.20.1")
        );
        assert_eq!(record.entry_point, super::super::fabric::FABRIC_MAIN_CLASS);
        assert_eq!(fx.registry.get(&key).unwrap(), Some(record));

        let args = std::fs::read_to_string(bin.path().join("java-args.txt")).unwrap();
        let args: Vec<&str> = args.lines().collect();
        assert_eq!(args[0], "-jar");
        assert!(args[1].ends_with("fabric-installer-1.0.0.jar"));
        assert_eq!(
            &args[2..],
            &[
                "client",
                "-dir",
                fx.paths.minecraft_dir.to_str().unwrap(),
                "-mcversion",
                "1.20.1",
                "-loader",
                "0.15.7",
                "-noprofile"
            ]
        );

        let percentages: Vec<u8> = rx.drain().into_iter().map(|p| p.percentage).collect();
        assert_eq!(percentages, vec![5, 25, 60, 100]);
    }

    #[tokio::test]
    async fn forge_missing_markup_is_format_change_without_record() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/forge/index_1.20.1.html"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html><body>new layout</body></html>"))
            .mount(&server)
            .await;
        let fx = fixture(&server, PathBuf::from("java"));
        let key = key(Ecosystem::Forge, "1.20.1");

        let err = fx
            .driver
            .install(&key, &ProgressSender::detached(), &CancellationToken::new())
            .await
            .unwrap_err();
        assert!(matches!(err, InstallError::UpstreamFormatChanged(_)));
        assert_not_recorded(&fx, &key);
    }

    async fn mount_forge_page(server: &MockServer, game: &str) {
        Mock::given(method("GET"))
            .and(path(format!("/forge/index_{game}.html")))
            .respond_with(ResponseTemplate::new(200).set_body_string(format!(
                r#"<a class="btn btn-large btn-download" href="/files/forge-{game}-installer.jar">Installer</a>"#
            )))
            .mount(server)
            .await;
    }

    #[tokio::test]
    async fn forge_page_500_is_network_error_without_record() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/forge/index_1.20.1.html"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;
        let fx = fixture(&server, PathBuf::from("java"));
        let key = key(Ecosystem::Forge, "1.20.1");

        let err = fx
            .driver
            .install(&key, &ProgressSender::detached(), &CancellationToken::new())
            .await
            .unwrap_err();
        assert!(matches!(err, InstallError::Network(msg) if msg.contains("500")));
        assert_not_recorded(&fx, &key);
    }

    #[tokio::test]
    async fn forge_installer_download_failure_leaves_no_record() {
        let server = MockServer::start().await;
        mount_forge_page(&server, "1.20.1").await;
        let fx = fixture(&server, PathBuf::from("java"));
        let key = key(Ecosystem::Forge, "1.20.1");

        let err = fx
            .driver
            .install(&key, &ProgressSender::detached(), &CancellationToken::new())
            .await
            .unwrap_err();
        assert!(matches!(err, InstallError::Network(msg) if msg.contains("404")));
        assert_not_recorded(&fx, &key);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn forge_installer_failure_leaves_no_record() {
        let server = MockServer::start().await;
        mount_forge_page(&server, "1.20.1").await;
        mount_installer_jar(&server, "/files/forge-1.20.1-installer.jar").await;
        let fx = fixture(&server, PathBuf::from("/bin/sh"));
        let key = key(Ecosystem::Forge, "1.20.1");

        let err = fx
            .driver
            .install(&key, &ProgressSender::detached(), &CancellationToken::new())
            .await
            .unwrap_err();
        assert!(matches!(err, InstallError::ExternalProcessFailed { .. }));
        assert_not_recorded(&fx, &key);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn forge_success_runs_installer_in_client_mode() {
        let server = MockServer::start().await;
        mount_forge_page(&server, "1.20.1").await;
        mount_installer_jar(&server, "/files/forge-1.20.1-installer.jar").await;
        let bin = tempfile::tempdir().unwrap();
        let fx = fixture(&server, fake_java(bin.path()));
        let key = key(Ecosystem::Forge, "1.20.1");

        let record = fx
            .driver
            .install(&key, &ProgressSender::detached(), &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(record.install_path, fx.paths.versions_dir().join("forge-1.20.1"));
        assert_eq!(
            record.entry_point,
            super::super::forge::FORGE_FALLBACK_MAIN_CLASS
        );
        assert!(fx.paths.minecraft_dir.join("launcher_profiles.json").is_file());
        let args = std::fs::read_to_string(bin.path().join("java-args.txt")).unwrap();
        assert!(args.contains("--installClient"));
        assert_eq!(fx.registry.get(&key).unwrap(), Some(record));
    }

    struct StubBulk {
        fail: bool,
        ran: AtomicBool,
    }

    #[async_trait]
    impl BulkInstaller for StubBulk {
        async fn install(
            &self,
            _version: &str,
            _target: &Path,
            callbacks: &dyn BulkCallbacks,
            _cancel: &CancellationToken,
        ) -> InstallResult<()> {
            self.ran.store(true, Ordering::SeqCst);
            callbacks.set_max(2);
            callbacks.set_status("client jar");
            callbacks.set_progress(1);
            if self.fail {
                return Err(InstallError::Network("connection reset".into()));
            }
            callbacks.set_progress(2);
            Ok(())
        }
    }

    #[tokio::test]
    async fn vanilla_adapts_bulk_progress_and_records() {
        let server = MockServer::start().await;
        let fx = fixture(&server, PathBuf::from("java"));
        let bulk = Arc::new(StubBulk {
            fail: false,
            ran: AtomicBool::new(false),
        });
        let driver = fx.driver.with_bulk_installer(bulk.clone());
        let key = key(Ecosystem::Vanilla, "1.20.1");
        let (tx, mut rx) = progress_channel();

        let record = driver
            .install(&key, &tx, &CancellationToken::new())
            .await
            .unwrap();

        assert!(bulk.ran.load(Ordering::SeqCst));
        assert_eq!(record.entry_point, super::super::vanilla::VANILLA_MAIN_CLASS);
        assert!(record.install_path.ends_with("versions/1.20.1/1.20.1.jar"));
        assert_eq!(driver.registry().get(&key).unwrap(), Some(record));

        let events = rx.drain();
        let percentages: Vec<u8> = events.iter().map(|p| p.percentage).collect();
        assert!(percentages.windows(2).all(|w| w[0] <= w[1]), "{percentages:?}");
        assert!(events.iter().any(|p| p.message == "client jar"));
        assert_eq!(percentages.last(), Some(&100));
    }

    #[tokio::test]
    async fn vanilla_bulk_failure_leaves_no_record() {
        let server = MockServer::start().await;
        let fx = fixture(&server, PathBuf::from("java"));
        let driver = fx.driver.with_bulk_installer(Arc::new(StubBulk {
            fail: true,
            ran: AtomicBool::new(false),
        }));
        let key = key(Ecosystem::Vanilla, "1.20.1");

        let err = driver
            .install(&key, &ProgressSender::detached(), &CancellationToken::new())
            .await
            .unwrap_err();
        assert!(matches!(err, InstallError::Network(_)));
        assert_eq!(driver.registry().get(&key).unwrap(), None);
    }

    #[tokio::test]
    async fn cancelled_run_never_starts() {
        let server = MockServer::start().await;
        let fx = fixture(&server, PathBuf::from("java"));
        let bulk = Arc::new(StubBulk {
            fail: false,
            ran: AtomicBool::new(false),
        });
        let driver = fx.driver.with_bulk_installer(bulk.clone());
        let key = key(Ecosystem::Vanilla, "1.20.1");
        let cancel = CancellationToken::new();
        cancel.cancel();

        let err = driver
            .install(&key, &ProgressSender::detached(), &cancel)
            .await
            .unwrap_err();
        assert!(matches!(err, InstallError::Cancelled));
        assert!(!bulk.ran.load(Ordering::SeqCst));
        assert_eq!(driver.registry().get(&key).unwrap(), None);
    }
}

use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::core::assets::AssetIndex;
use crate::core::downloader::{DownloadEntry, Downloader};
use crate::core::error::{InstallError, InstallResult};
use crate::core::http::fetch_text;
use crate::core::loaders::natives::extract_natives;
use crate::core::progress::ProgressSender;
use crate::core::state::Endpoints;
use crate::core::version::{VersionJson, VersionManifest};

/// Callback surface a bulk installer reports through.
pub trait BulkCallbacks: Send + Sync {
    fn set_status(&self, text: &str);
    fn set_max(&self, total: u64);
    fn set_progress(&self, done: u64);
}

/// Materializes a base game version (json, client jar, libraries, assets)
/// under a game root.
#[async_trait]
pub trait BulkInstaller: Send + Sync {
    async fn install(
        &self,
        version: &str,
        target: &Path,
        callbacks: &dyn BulkCallbacks,
        cancel: &CancellationToken,
    ) -> InstallResult<()>;
}

/// Turns `set_max`/`set_progress` counts into percentages between `floor`
/// and `ceiling`. Percentages only move forward.
pub struct ProgressAdapter<'a> {
    sender: &'a ProgressSender,
    floor: u8,
    ceiling: u8,
    max: AtomicU64,
}

impl<'a> ProgressAdapter<'a> {
    pub fn new(sender: &'a ProgressSender, floor: u8, ceiling: u8) -> Self {
        Self {
            sender,
            floor,
            ceiling: ceiling.max(floor),
            max: AtomicU64::new(0),
        }
    }

    fn scaled(&self, done: u64) -> u8 {
        let max = self.max.load(Ordering::Relaxed);
        if max == 0 {
            return self.floor;
        }
        let span = u64::from(self.ceiling - self.floor);
        let offset = span * done.min(max) / max;
        // offset <= span <= 255
        self.floor + offset as u8
    }
}

impl BulkCallbacks for ProgressAdapter<'_> {
    fn set_status(&self, text: &str) {
        self.sender.status(text);
    }

    fn set_max(&self, total: u64) {
        self.max.store(total, Ordering::Relaxed);
    }

    fn set_progress(&self, done: u64) {
        let pct = self.scaled(done);
        if pct > self.sender.last().percentage {
            self.sender.percent(pct);
        }
    }
}

/// Default bulk installer talking to Mojang's piston-meta and resources CDN.
pub struct MojangBulkInstaller {
    client: reqwest::Client,
    downloader: Downloader,
    endpoints: Endpoints,
    timeout: Duration,
}

impl MojangBulkInstaller {
    pub fn new(
        client: reqwest::Client,
        downloader: Downloader,
        endpoints: Endpoints,
        timeout: Duration,
    ) -> Self {
        Self {
            client,
            downloader,
            endpoints,
            timeout,
        }
    }

    async fn version_json(&self, version: &str, version_dir: &Path) -> InstallResult<VersionJson> {
        let manifest =
            VersionManifest::fetch(&self.client, &self.endpoints.version_manifest, self.timeout)
                .await?;
        let entry = manifest.find(version).ok_or_else(|| {
            InstallError::UpstreamFormatChanged(format!(
                "version {version} is not listed in the version manifest"
            ))
        })?;

        let raw = fetch_text(&self.client, &entry.url, self.timeout).await?;
        let parsed: VersionJson = serde_json::from_str(&raw).map_err(|e| {
            InstallError::UpstreamFormatChanged(format!("version json {}: {e}", entry.url))
        })?;

        tokio::fs::create_dir_all(version_dir)
            .await
            .map_err(|e| InstallError::io(version_dir, e))?;
        let json_path = version_dir.join(format!("{version}.json"));
        tokio::fs::write(&json_path, &raw)
            .await
            .map_err(|e| InstallError::io(&json_path, e))?;

        Ok(parsed)
    }

    async fn asset_objects(
        &self,
        version_json: &VersionJson,
        assets_dir: &Path,
        cancel: &CancellationToken,
    ) -> InstallResult<Vec<DownloadEntry>> {
        let Some(index_ref) = &version_json.asset_index else {
            warn!("{} has no asset index", version_json.id);
            return Ok(Vec::new());
        };

        let index_path = assets_dir
            .join("indexes")
            .join(format!("{}.json", index_ref.id));
        self.downloader
            .download_verified(&index_ref.url, &index_path, index_ref.sha1.as_deref(), cancel)
            .await?;
        let raw = tokio::fs::read_to_string(&index_path)
            .await
            .map_err(|e| InstallError::io(&index_path, e))?;

        Ok(AssetIndex::parse(&raw)?
            .missing_objects(&self.endpoints.assets_base, &assets_dir.join("objects")))
    }
}

#[async_trait]
impl BulkInstaller for MojangBulkInstaller {
    async fn install(
        &self,
        version: &str,
        target: &Path,
        callbacks: &dyn BulkCallbacks,
        cancel: &CancellationToken,
    ) -> InstallResult<()> {
        info!("Installing base game {} into {:?}", version, target);
        let version_dir = target.join("versions").join(version);
        let libraries_dir = target.join("libraries");

        callbacks.set_status("Fetching version metadata");
        let version_json = self.version_json(version, &version_dir).await?;

        let client = version_json
            .downloads
            .as_ref()
            .and_then(|d| d.client.clone())
            .ok_or_else(|| {
                InstallError::UpstreamFormatChanged(format!("{version} has no client download"))
            })?;

        let mut entries = vec![DownloadEntry {
            url: client.url,
            dest: version_dir.join(format!("{version}.jar")),
            sha1: client.sha1,
            size: client.size,
        }];

        let mut native_jars = Vec::new();
        for lib in version_json.libraries.iter().filter(|l| l.applies_here()) {
            let files = [lib.artifact_file()?, lib.native_file()?];
            let [artifact, native] = files.map(|f| f.map(|f| (libraries_dir.join(&f.path), f)));
            if let Some((dest, _)) = &native {
                native_jars.push(dest.clone());
            }
            for (dest, file) in artifact.into_iter().chain(native) {
                if dest.exists() {
                    continue;
                }
                entries.push(DownloadEntry {
                    url: file.url,
                    dest,
                    sha1: file.sha1,
                    size: None,
                });
            }
        }

        callbacks.set_status("Fetching asset index");
        entries.extend(
            self.asset_objects(&version_json, &target.join("assets"), cancel)
                .await?,
        );

        let total = entries.len() as u64;
        callbacks.set_max(total);
        callbacks.set_status(&format!("Downloading {total} files"));

        let done = AtomicU64::new(0);
        let failures = self
            .downloader
            .download_batch(entries, cancel, |_| {
                let n = done.fetch_add(1, Ordering::Relaxed) + 1;
                callbacks.set_progress(n);
            })
            .await;

        if cancel.is_cancelled() {
            return Err(InstallError::Cancelled);
        }
        if let Some((entry, err)) = failures.into_iter().next() {
            warn!("Download of {} failed: {}", entry.url, err);
            return Err(err);
        }

        if !native_jars.is_empty() {
            callbacks.set_status("Extracting native libraries");
            let natives_dir = target.join("natives");
            for jar in &native_jars {
                let count = extract_natives(jar, &natives_dir).await?;
                debug!("{} native files from {:?}", count, jar);
            }
        }

        callbacks.set_status("Game files ready");
        info!("Base game {} installed", version);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use sha1::{Digest, Sha1};
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;
    use crate::core::progress::progress_channel;

    fn sha1_hex(bytes: &[u8]) -> String {
        hex::encode(Sha1::digest(bytes))
    }

    #[derive(Default)]
    struct Recorder {
        statuses: Mutex<Vec<String>>,
        max: AtomicU64,
        last: AtomicU64,
    }

    impl BulkCallbacks for Recorder {
        fn set_status(&self, text: &str) {
            self.statuses.lock().unwrap().push(text.to_string());
        }
        fn set_max(&self, total: u64) {
            self.max.store(total, Ordering::SeqCst);
        }
        fn set_progress(&self, done: u64) {
            self.last.fetch_max(done, Ordering::SeqCst);
        }
    }

    async fn mount(server: &MockServer, at: &str, body: ResponseTemplate) {
        Mock::given(method("GET"))
            .and(path(at))
            .respond_with(body)
            .mount(server)
            .await;
    }

    fn installer(server: &MockServer) -> MojangBulkInstaller {
        let endpoints = Endpoints {
            version_manifest: format!("{}/manifest.json", server.uri()),
            assets_base: format!("{}/objects", server.uri()),
            ..Endpoints::default()
        };
        let client = reqwest::Client::new();
        MojangBulkInstaller::new(
            client.clone(),
            Downloader::new(client),
            endpoints,
            Duration::from_secs(5),
        )
    }

    #[tokio::test]
    async fn installs_json_jar_libraries_and_assets() {
        let server = MockServer::start().await;
        let uri = server.uri();
        let jar = b"client-jar".to_vec();
        let lib = b"library".to_vec();
        let object = b"sound".to_vec();
        let object_hash = sha1_hex(&object);
        let index = serde_json::json!({"objects": {"a.ogg": {"hash": object_hash, "size": 5}}});
        let index_raw = index.to_string();

        mount(&server, "/manifest.json", ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "versions": [{"id": "1.20.1", "type": "release", "url": format!("{uri}/1.20.1.json")}]
        })))
        .await;
        mount(&server, "/1.20.1.json", ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "id": "1.20.1",
            "mainClass": "net.minecraft.client.main.Main",
            "downloads": {"client": {"url": format!("{uri}/client.jar"), "sha1": sha1_hex(&jar), "size": jar.len()}},
            "assetIndex": {"id": "5", "url": format!("{uri}/index/5.json"), "sha1": sha1_hex(index_raw.as_bytes())},
            "libraries": [
                {"name": "com.example:lib:1.0", "downloads": {"artifact": {
                    "path": "com/example/lib/1.0/lib-1.0.jar", "url": format!("{uri}/lib.jar"), "sha1": sha1_hex(&lib), "size": 7}}},
                {"name": "com.example:elsewhere:1.0", "rules": [{"action": "allow", "os": {"name": "no-such-os"}}]}
            ]
        })))
        .await;
        mount(&server, "/client.jar", ResponseTemplate::new(200).set_body_bytes(jar.clone())).await;
        mount(&server, "/lib.jar", ResponseTemplate::new(200).set_body_bytes(lib)).await;
        mount(&server, "/index/5.json", ResponseTemplate::new(200).set_body_string(index_raw)).await;
        mount(
            &server,
            &format!("/objects/{}/{}", &object_hash[..2], object_hash),
            ResponseTemplate::new(200).set_body_bytes(object),
        )
        .await;

        let root = tempfile::tempdir().unwrap();
        let recorder = Recorder::default();
        installer(&server)
            .install("1.20.1", root.path(), &recorder, &CancellationToken::new())
            .await
            .unwrap();

        let version_dir = root.path().join("versions/1.20.1");
        assert!(version_dir.join("1.20.1.json").is_file());
        assert_eq!(std::fs::read(version_dir.join("1.20.1.jar")).unwrap(), jar);
        assert!(root.path().join("libraries/com/example/lib/1.0/lib-1.0.jar").is_file());
        assert!(root
            .path()
            .join("assets/objects")
            .join(&object_hash[..2])
            .join(&object_hash)
            .is_file());
        assert_eq!(recorder.max.load(Ordering::SeqCst), 3);
        assert_eq!(recorder.last.load(Ordering::SeqCst), 3);
    }

    fn natives_jar() -> Vec<u8> {
        use std::io::Write;

        let mut buf = std::io::Cursor::new(Vec::new());
        {
            let mut zip = zip::ZipWriter::new(&mut buf);
            for name in ["liblwjgl.so", "lwjgl64.dll", "liblwjgl.dylib", "META-INF/MANIFEST.MF"] {
                zip.start_file(name, zip::write::SimpleFileOptions::default())
                    .unwrap();
                zip.write_all(b"native").unwrap();
            }
            zip.finish().unwrap();
        }
        buf.into_inner()
    }

    #[tokio::test]
    async fn classifier_only_library_is_downloaded_and_unpacked() {
        let server = MockServer::start().await;
        let uri = server.uri();
        let jar = b"client-jar".to_vec();
        let natives = natives_jar();
        let native_path = "org/lwjgl/lwjgl/lwjgl-platform/2.9.4/lwjgl-platform-2.9.4-natives.jar";
        let classifier = serde_json::json!({
            "path": native_path,
            "url": format!("{uri}/natives.jar"),
            "sha1": sha1_hex(&natives)
        });

        mount(&server, "/manifest.json", ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "versions": [{"id": "1.8.9", "type": "release", "url": format!("{uri}/1.8.9.json")}]
        })))
        .await;
        mount(&server, "/1.8.9.json", ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "id": "1.8.9",
            "mainClass": "net.minecraft.client.main.Main",
            "downloads": {"client": {"url": format!("{uri}/client.jar"), "sha1": sha1_hex(&jar)}},
            "libraries": [{
                "name": "org.lwjgl.lwjgl:lwjgl-platform:2.9.4",
                "natives": {"linux": "natives-linux", "osx": "natives-osx", "windows": "natives-windows-${arch}"},
                "downloads": {"classifiers": {
                    "natives-linux": classifier,
                    "natives-osx": classifier,
                    "natives-windows-32": classifier,
                    "natives-windows-64": classifier
                }}
            }]
        })))
        .await;
        mount(&server, "/client.jar", ResponseTemplate::new(200).set_body_bytes(jar)).await;
        mount(&server, "/natives.jar", ResponseTemplate::new(200).set_body_bytes(natives)).await;

        let root = tempfile::tempdir().unwrap();
        let recorder = Recorder::default();
        installer(&server)
            .install("1.8.9", root.path(), &recorder, &CancellationToken::new())
            .await
            .unwrap();

        assert!(root.path().join("libraries").join(native_path).is_file());
        assert!(!root
            .path()
            .join("libraries/org/lwjgl/lwjgl/lwjgl-platform/2.9.4/lwjgl-platform-2.9.4.jar")
            .exists());
        let natives_dir = root.path().join("natives");
        for name in ["liblwjgl.so", "lwjgl64.dll", "liblwjgl.dylib"] {
            assert!(natives_dir.join(name).is_file(), "{name}");
        }
        assert!(!natives_dir.join("MANIFEST.MF").exists());
        assert_eq!(recorder.max.load(Ordering::SeqCst), 2);
        assert!(recorder
            .statuses
            .lock()
            .unwrap()
            .iter()
            .any(|s| s == "Extracting native libraries"));
    }

    #[tokio::test]
    async fn unknown_version_is_format_change() {
        let server = MockServer::start().await;
        mount(
            &server,
            "/manifest.json",
            ResponseTemplate::new(200).set_body_json(serde_json::json!({"versions": []})),
        )
        .await;

        let root = tempfile::tempdir().unwrap();
        let err = installer(&server)
            .install("1.99", root.path(), &Recorder::default(), &CancellationToken::new())
            .await
            .unwrap_err();
        assert!(matches!(err, InstallError::UpstreamFormatChanged(_)));
    }

    #[test]
    fn adapter_scales_and_never_goes_backwards() {
        let (tx, mut rx) = progress_channel();
        let adapter = ProgressAdapter::new(&tx, 0, 100);

        adapter.set_max(4);
        adapter.set_progress(1);
        adapter.set_progress(2);
        adapter.set_progress(1);
        adapter.set_status("almost");
        adapter.set_progress(4);

        let seen: Vec<u8> = rx.drain().into_iter().map(|p| p.percentage).collect();
        assert_eq!(seen, vec![25, 50, 50, 100]);
    }
}

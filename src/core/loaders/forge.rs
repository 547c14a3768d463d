use std::ffi::OsString;
use std::io::Cursor;
use std::path::Path;

use async_trait::async_trait;
use scraper::{Html, Selector};
use serde::Deserialize;
use tracing::{info, warn};
use url::Url;

use super::context::InstallContext;
use super::installer::LoaderInstaller;
use super::process::run_installer;
use super::stage::InstallStage;
use crate::core::error::{InstallError, InstallResult};
use crate::core::http::fetch_text;
use crate::core::variant::VariantRecord;

pub const FORGE_FALLBACK_MAIN_CLASS: &str = "net.minecraftforge.client.ForgeClient";

/// Download button on `index_<game>.html`.
const DOWNLOAD_ANCHOR: &str = "a.btn.btn-large.btn-download";

const EMPTY_LAUNCHER_PROFILES: &[u8] = br#"{"profiles":{},"selectedProfile":null}"#;

/// `version.json` bundled inside the installer jar.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct BundledProfile {
    id: String,
    main_class: String,
}

/// Forge: scrape the per-version files page for the installer link and run
/// the installer in client mode.
pub struct ForgeInstaller;

/// Pull the installer URL out of a Forge files page.
///
/// Relative links resolve against `page_url`; ad-gateway links are unwrapped
/// through their `url=` query parameter.
pub fn extract_installer_url(page_url: &str, html: &str) -> InstallResult<String> {
    let document = Html::parse_document(html);
    let selector = Selector::parse(DOWNLOAD_ANCHOR).map_err(|e| {
        InstallError::UpstreamFormatChanged(format!("selector {DOWNLOAD_ANCHOR}: {e:?}"))
    })?;

    let href = document
        .select(&selector)
        .find_map(|a| a.value().attr("href"))
        .map(str::trim)
        .filter(|h| !h.is_empty())
        .ok_or_else(|| {
            InstallError::UpstreamFormatChanged(format!(
                "no installer download link on {page_url}"
            ))
        })?;

    let base = Url::parse(page_url)
        .map_err(|e| InstallError::UpstreamFormatChanged(format!("page url {page_url}: {e}")))?;
    let link = base
        .join(href)
        .map_err(|e| InstallError::UpstreamFormatChanged(format!("installer link {href}: {e}")))?;

    if let Some((_, target)) = link.query_pairs().find(|(k, _)| k == "url") {
        return Ok(target.into_owned());
    }
    Ok(link.to_string())
}

/// Profile id and main class recorded by the installer, falling back to the
/// conventional values when the jar carries no readable `version.json`.
fn bundled_profile(installer: &[u8], game: &str) -> (String, String) {
    let parsed = zip::ZipArchive::new(Cursor::new(installer))
        .map_err(|e| e.to_string())
        .and_then(|mut archive| {
            let file = archive.by_name("version.json").map_err(|e| e.to_string())?;
            serde_json::from_reader::<_, BundledProfile>(file).map_err(|e| e.to_string())
        });

    match parsed {
        Ok(profile) => (profile.id, profile.main_class),
        Err(reason) => {
            warn!("Installer version.json unreadable ({}), using defaults", reason);
            (format!("forge-{game}"), FORGE_FALLBACK_MAIN_CLASS.to_string())
        }
    }
}

/// The installer refuses to run without a launcher profile file.
async fn ensure_launcher_profiles(root: &Path) -> InstallResult<()> {
    let path = root.join("launcher_profiles.json");
    if tokio::fs::try_exists(&path)
        .await
        .map_err(|e| InstallError::io(&path, e))?
    {
        return Ok(());
    }
    tokio::fs::create_dir_all(root)
        .await
        .map_err(|e| InstallError::io(root, e))?;
    tokio::fs::write(&path, EMPTY_LAUNCHER_PROFILES)
        .await
        .map_err(|e| InstallError::io(&path, e))
}

#[async_trait]
impl LoaderInstaller for ForgeInstaller {
    async fn install(&self, ctx: &InstallContext<'_>) -> InstallResult<VariantRecord> {
        let game = ctx.game_version();

        ctx.enter(InstallStage::LocatingInstallerPage)?;
        let page_url = format!(
            "{}/index_{}.html",
            ctx.endpoints.forge_files.trim_end_matches('/'),
            game
        );
        let html = fetch_text(ctx.http_client, &page_url, ctx.http_timeout).await?;

        ctx.enter(InstallStage::ExtractingDownloadLink)?;
        let installer_url = extract_installer_url(&page_url, &html)?;
        info!("Forge installer for {}: {}", game, installer_url);

        ctx.enter(InstallStage::DownloadingInstaller)?;
        let installer_path = ctx
            .paths
            .installers_dir()
            .join(format!("forge-{game}-installer.jar"));
        ctx.downloader
            .download_to_file(&installer_url, &installer_path, ctx.cancel)
            .await?;

        ctx.enter(InstallStage::RunningInstaller)?;
        let root = &ctx.paths.minecraft_dir;
        ensure_launcher_profiles(root).await?;
        let args: Vec<OsString> = vec![
            "-jar".into(),
            installer_path.clone().into_os_string(),
            "--installClient".into(),
            root.clone().into_os_string(),
        ];
        run_installer(ctx.java_path, &args, root, ctx.installer_timeout, ctx.cancel).await?;

        let bytes = tokio::fs::read(&installer_path)
            .await
            .map_err(|e| InstallError::io(&installer_path, e))?;
        let (profile_id, main_class) = bundled_profile(&bytes, game);

        Ok(VariantRecord {
            key: ctx.key.clone(),
            install_path: ctx.paths.versions_dir().join(profile_id),
            entry_point: main_class,
            auxiliary_libraries: Vec::new(),
        })
    }
}

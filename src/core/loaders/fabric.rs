use std::ffi::OsString;

use async_trait::async_trait;
use serde::Deserialize;
use tracing::info;

use super::context::InstallContext;
use super::installer::LoaderInstaller;
use super::process::run_installer;
use super::stage::InstallStage;
use crate::core::error::{InstallError, InstallResult};
use crate::core::http::fetch_json;
use crate::core::maven::MavenArtifact;
use crate::core::variant::VariantRecord;

pub const FABRIC_MAIN_CLASS: &str = "net.fabricmc.loader.impl.launch.knot.KnotClient";

/// One row of `/v2/versions/loader/<game>`.
#[derive(Debug, Deserialize)]
struct LoaderRow {
    loader: LoaderVersion,
}

#[derive(Debug, Deserialize)]
struct LoaderVersion {
    version: String,
}

/// One row of `/v2/versions/installer`.
#[derive(Debug, Deserialize)]
struct InstallerRow {
    maven: String,
    #[serde(default)]
    stable: bool,
}

/// Fabric: resolve loader + installer from Fabric Meta, run the official
/// installer jar against the game root.
pub struct FabricInstaller;

impl FabricInstaller {
    fn meta_url(ctx: &InstallContext<'_>, path: &str) -> String {
        format!("{}/{}", ctx.endpoints.fabric_meta.trim_end_matches('/'), path)
    }

    async fn latest_loader(&self, ctx: &InstallContext<'_>) -> InstallResult<String> {
        let url = Self::meta_url(ctx, &format!("versions/loader/{}", ctx.game_version()));
        let rows: Vec<LoaderRow> = fetch_json(ctx.http_client, &url, ctx.http_timeout).await?;
        rows.into_iter()
            .next()
            .map(|row| row.loader.version)
            .ok_or_else(|| {
                InstallError::UpstreamFormatChanged(format!(
                    "no Fabric loader published for {}",
                    ctx.game_version()
                ))
            })
    }

    async fn installer_artifact(&self, ctx: &InstallContext<'_>) -> InstallResult<MavenArtifact> {
        let url = Self::meta_url(ctx, "versions/installer");
        let rows: Vec<InstallerRow> = fetch_json(ctx.http_client, &url, ctx.http_timeout).await?;
        let row = rows
            .iter()
            .find(|r| r.stable)
            .or_else(|| rows.first())
            .ok_or_else(|| {
                InstallError::UpstreamFormatChanged("Fabric installer list is empty".into())
            })?;
        MavenArtifact::parse(&row.maven)
    }

    pub fn profile_id(loader: &str, game: &str) -> String {
        format!("fabric-loader-{loader}-{game}")
    }
}

#[async_trait]
impl LoaderInstaller for FabricInstaller {
    async fn install(&self, ctx: &InstallContext<'_>) -> InstallResult<VariantRecord> {
        ctx.enter(InstallStage::ResolvingLoaderMetadata)?;
        let game = ctx.game_version();
        let loader = self.latest_loader(ctx).await?;
        let artifact = self.installer_artifact(ctx).await?;
        info!("Fabric loader {} via installer {}", loader, artifact);

        ctx.enter(InstallStage::DownloadingInstaller)?;
        let installer_path = ctx.paths.installers_dir().join(artifact.file_name());
        ctx.downloader
            .download_to_file(
                &artifact.url(&ctx.endpoints.fabric_maven),
                &installer_path,
                ctx.cancel,
            )
            .await?;

        ctx.enter(InstallStage::RunningInstaller)?;
        let root = &ctx.paths.minecraft_dir;
        let args: Vec<OsString> = vec![
            "-jar".into(),
            installer_path.clone().into_os_string(),
            "client".into(),
            "-dir".into(),
            root.clone().into_os_string(),
            "-mcversion".into(),
            game.into(),
            "-loader".into(),
            loader.as_str().into(),
            "-noprofile".into(),
        ];
        run_installer(ctx.java_path, &args, root, ctx.installer_timeout, ctx.cancel).await?;

        Ok(VariantRecord {
            key: ctx.key.clone(),
            install_path: ctx.paths.versions_dir().join(Self::profile_id(&loader, game)),
            entry_point: FABRIC_MAIN_CLASS.to_string(),
            auxiliary_libraries: Vec::new(),
        })
    }
}

use std::sync::Arc;

use async_trait::async_trait;
use tracing::info;

use super::bulk::{BulkInstaller, ProgressAdapter};
use super::context::InstallContext;
use super::installer::LoaderInstaller;
use super::stage::InstallStage;
use crate::core::error::InstallResult;
use crate::core::variant::VariantRecord;

pub const VANILLA_MAIN_CLASS: &str = "net.minecraft.client.main.Main";

/// Base game: everything is delegated to a [`BulkInstaller`].
pub struct VanillaInstaller {
    bulk: Arc<dyn BulkInstaller>,
}

impl VanillaInstaller {
    pub fn new(bulk: Arc<dyn BulkInstaller>) -> Self {
        Self { bulk }
    }
}

#[async_trait]
impl LoaderInstaller for VanillaInstaller {
    async fn install(&self, ctx: &InstallContext<'_>) -> InstallResult<VariantRecord> {
        ctx.enter(InstallStage::FetchingAssets)?;

        let game = ctx.game_version();
        let adapter = ProgressAdapter::new(ctx.progress, InstallStage::FetchingAssets.baseline(), 99);
        self.bulk
            .install(game, &ctx.paths.minecraft_dir, &adapter, ctx.cancel)
            .await?;
        ctx.check_cancelled()?;

        info!("Vanilla {} files in place", game);
        Ok(VariantRecord {
            key: ctx.key.clone(),
            install_path: ctx
                .paths
                .versions_dir()
                .join(game)
                .join(format!("{game}.jar")),
            entry_point: VANILLA_MAIN_CLASS.to_string(),
            auxiliary_libraries: Vec::new(),
        })
    }
}

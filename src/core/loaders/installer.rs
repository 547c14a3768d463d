use std::sync::Arc;

use async_trait::async_trait;

use super::bulk::BulkInstaller;
use super::context::InstallContext;
use super::fabric::FabricInstaller;
use super::forge::ForgeInstaller;
use super::vanilla::VanillaInstaller;
use crate::core::error::InstallResult;
use crate::core::variant::{Ecosystem, VariantRecord};

/// One ecosystem's installation procedure. Returns the record to persist;
/// persisting it is the driver's job.
#[async_trait]
pub trait LoaderInstaller: Send + Sync {
    async fn install(&self, ctx: &InstallContext<'_>) -> InstallResult<VariantRecord>;
}

/// Static dispatch over the closed set of ecosystems.
pub enum Installer {
    Vanilla(VanillaInstaller),
    Fabric(FabricInstaller),
    Forge(ForgeInstaller),
}

impl Installer {
    pub fn for_ecosystem(ecosystem: Ecosystem, bulk: Arc<dyn BulkInstaller>) -> Self {
        match ecosystem {
            Ecosystem::Vanilla => Self::Vanilla(VanillaInstaller::new(bulk)),
            Ecosystem::Fabric => Self::Fabric(FabricInstaller),
            Ecosystem::Forge => Self::Forge(ForgeInstaller),
        }
    }

    pub async fn install(&self, ctx: &InstallContext<'_>) -> InstallResult<VariantRecord> {
        match self {
            Installer::Vanilla(i) => i.install(ctx).await,
            Installer::Fabric(i) => i.install(ctx).await,
            Installer::Forge(i) => i.install(ctx).await,
        }
    }
}

//! Installable variant listings per ecosystem.

use std::time::Duration;

use indexmap::IndexMap;
use serde::Deserialize;
use tracing::{info, warn};

use crate::core::error::FetchError;
use crate::core::http::fetch_json;
use crate::core::state::Endpoints;
use crate::core::variant::Ecosystem;
use crate::core::version::VersionManifest;

/// Result of [`SourceCatalog::list_variants`]. An empty list with a `cause`
/// means the upstream could not be read, not that it has no versions.
#[derive(Debug, Default)]
pub struct Listing {
    pub variants: Vec<String>,
    pub cause: Option<FetchError>,
}

#[derive(Debug, Deserialize)]
struct FabricGameVersion {
    version: String,
}

#[derive(Debug, Deserialize)]
struct ForgePromotions {
    promos: IndexMap<String, String>,
}

#[derive(Clone)]
pub struct SourceCatalog {
    client: reqwest::Client,
    endpoints: Endpoints,
    timeout: Duration,
}

impl SourceCatalog {
    pub fn new(client: reqwest::Client, endpoints: Endpoints, timeout: Duration) -> Self {
        Self {
            client,
            endpoints,
            timeout,
        }
    }

    /// Variant identifiers for `ecosystem`, in upstream order.
    ///
    /// Forge returns promotion keys, a mix of `<game>-latest` /
    /// `<game>-recommended` aliases, not bare versions.
    pub async fn fetch(&self, ecosystem: Ecosystem) -> Result<Vec<String>, FetchError> {
        let variants = match ecosystem {
            Ecosystem::Vanilla => {
                VersionManifest::fetch(&self.client, &self.endpoints.version_manifest, self.timeout)
                    .await?
                    .release_ids()
            }
            Ecosystem::Fabric => {
                let url = format!(
                    "{}/versions/game",
                    self.endpoints.fabric_meta.trim_end_matches('/')
                );
                let games: Vec<FabricGameVersion> =
                    fetch_json(&self.client, &url, self.timeout).await?;
                games.into_iter().map(|g| g.version).collect()
            }
            Ecosystem::Forge => {
                let promotions: ForgePromotions =
                    fetch_json(&self.client, &self.endpoints.forge_promotions, self.timeout)
                        .await?;
                promotions.promos.into_keys().collect()
            }
        };

        info!("{} variants listed for {}", variants.len(), ecosystem);
        Ok(variants)
    }

    /// Never fails: any fetch or decode error becomes an empty listing
    /// carrying the cause.
    pub async fn list_variants(&self, ecosystem: Ecosystem) -> Listing {
        match self.fetch(ecosystem).await {
            Ok(variants) => Listing {
                variants,
                cause: None,
            },
            Err(e) => {
                warn!("Could not list {} variants: {}", ecosystem, e);
                Listing {
                    variants: Vec::new(),
                    cause: Some(e),
                }
            }
        }
    }
}

// ─── Version Manifest ───
// Mojang's version_manifest_v2.json: the list every vanilla lookup starts from.

use std::time::Duration;

use serde::Deserialize;
use tracing::info;

use crate::core::error::FetchError;
use crate::core::http::fetch_json;

#[derive(Debug, Deserialize)]
pub struct VersionManifest {
    pub versions: Vec<ManifestEntry>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ManifestEntry {
    pub id: String,
    /// `release`, `snapshot`, `old_beta`, `old_alpha`.
    #[serde(rename = "type")]
    pub kind: String,
    pub url: String,
    #[serde(default)]
    pub release_time: Option<String>,
    #[serde(default)]
    pub sha1: Option<String>,
}

impl ManifestEntry {
    pub fn is_release(&self) -> bool {
        self.kind == "release"
    }
}

impl VersionManifest {
    pub async fn fetch(
        client: &reqwest::Client,
        url: &str,
        timeout: Duration,
    ) -> Result<Self, FetchError> {
        info!("Fetching version manifest from {}", url);
        let manifest: VersionManifest = fetch_json(client, url, timeout).await?;
        info!("Manifest lists {} versions", manifest.versions.len());
        Ok(manifest)
    }

    pub fn find(&self, id: &str) -> Option<&ManifestEntry> {
        self.versions.iter().find(|v| v.id == id)
    }

    /// Release ids in upstream order (newest first).
    pub fn release_ids(&self) -> Vec<String> {
        self.versions
            .iter()
            .filter(|v| v.is_release())
            .map(|v| v.id.clone())
            .collect()
    }
}

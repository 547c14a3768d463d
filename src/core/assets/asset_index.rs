use std::collections::{BTreeMap, HashSet};
use std::path::Path;

use serde::Deserialize;

use crate::core::downloader::DownloadEntry;
use crate::core::error::InstallError;

/// `assets/indexes/<id>.json`: logical asset name → content-addressed object.
#[derive(Debug, Deserialize)]
pub struct AssetIndex {
    pub objects: BTreeMap<String, AssetObject>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AssetObject {
    pub hash: String,
    pub size: u64,
}

impl AssetIndex {
    pub fn parse(raw: &str) -> Result<Self, InstallError> {
        serde_json::from_str(raw)
            .map_err(|e| InstallError::UpstreamFormatChanged(format!("asset index: {e}")))
    }

    /// Objects still missing under `objects_dir`, one entry per distinct hash.
    ///
    /// Objects live at `objects/<first two hex chars>/<hash>`.
    pub fn missing_objects(&self, assets_base: &str, objects_dir: &Path) -> Vec<DownloadEntry> {
        let base = assets_base.trim_end_matches('/');
        let mut seen = HashSet::new();

        self.objects
            .values()
            .filter(|obj| obj.hash.len() > 2 && seen.insert(obj.hash.as_str()))
            .filter_map(|obj| {
                let prefix = &obj.hash[..2];
                let dest = objects_dir.join(prefix).join(&obj.hash);
                if dest.exists() {
                    return None;
                }
                Some(DownloadEntry {
                    url: format!("{}/{}/{}", base, prefix, obj.hash),
                    dest,
                    sha1: Some(obj.hash.clone()),
                    size: Some(obj.size),
                })
            })
            .collect()
    }
}

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::core::error::InstallError;

/// Upstream ecosystems a runtime variant can come from. Closed on purpose:
/// every dispatch over it is an exhaustive `match`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Ecosystem {
    Vanilla,
    Fabric,
    Forge,
}

impl Ecosystem {
    pub fn as_str(&self) -> &'static str {
        match self {
            Ecosystem::Vanilla => "vanilla",
            Ecosystem::Fabric => "fabric",
            Ecosystem::Forge => "forge",
        }
    }
}

impl fmt::Display for Ecosystem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Ecosystem {
    type Err = InstallError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "vanilla" => Ok(Ecosystem::Vanilla),
            "fabric" => Ok(Ecosystem::Fabric),
            "forge" => Ok(Ecosystem::Forge),
            _ => Err(InstallError::UnsupportedEcosystem(raw.to_string())),
        }
    }
}

/// (ecosystem, version) pair identifying one installable variant.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct VariantKey {
    pub ecosystem: Ecosystem,
    pub version: String,
}

impl VariantKey {
    /// Version strings are upstream-defined; only emptiness is rejected.
    pub fn new(ecosystem: Ecosystem, version: impl Into<String>) -> Result<Self, InstallError> {
        let version = version.into();
        if version.trim().is_empty() {
            return Err(InstallError::UpstreamFormatChanged(
                "empty version string".into(),
            ));
        }
        Ok(Self { ecosystem, version })
    }

    /// Key from a textual ecosystem tag, as typed by a user.
    pub fn parse(tag: &str, version: impl Into<String>) -> Result<Self, InstallError> {
        Self::new(tag.parse()?, version)
    }
}

impl fmt::Display for VariantKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.ecosystem, self.version)
    }
}

/// Metadata persisted once a variant installed successfully.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct VariantRecord {
    pub key: VariantKey,
    pub install_path: PathBuf,
    /// Fully qualified main class used to start this variant.
    pub entry_point: String,
    /// Extra library references required at launch, in order.
    #[serde(default)]
    pub auxiliary_libraries: Vec<String>,
}

impl VariantRecord {
    /// Name of the `versions/<id>/<id>.json` profile this record launches.
    ///
    /// Vanilla records point at the client jar, loader records at the
    /// profile directory.
    pub fn profile_id(&self) -> String {
        match self.key.ecosystem {
            Ecosystem::Vanilla => self.key.version.clone(),
            Ecosystem::Fabric | Ecosystem::Forge => self
                .install_path
                .file_name()
                .map(|n| n.to_string_lossy().to_string())
                .unwrap_or_else(|| self.key.version.clone()),
        }
    }
}

/// One progress notification from a running installation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct InstallProgress {
    /// 0..=100
    pub percentage: u8,
    pub message: String,
}

/// Identity supplied by the auth collaborator. Never persisted here.
#[derive(Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Credentials {
    pub username: String,
    pub identity_id: String,
    pub access_token: String,
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("identity_id", &self.identity_id)
            .field("access_token", &"<redacted>")
            .finish()
    }
}

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use uuid::Uuid;

use crate::core::error::ConfigError;
use crate::core::variant::Credentials;

pub const GUEST_USERNAME: &str = "Player";
pub const OFFLINE_ACCESS_TOKEN: &str = "offline-token";

/// Supplier of the identity the game is launched with.
pub trait CredentialSource: Send + Sync {
    fn is_authenticated(&self) -> bool;
    fn username(&self) -> String;
    fn identity(&self) -> String;
    fn access_token(&self) -> String;

    fn credentials(&self) -> Credentials {
        Credentials {
            username: self.username(),
            identity_id: self.identity(),
            access_token: self.access_token(),
        }
    }
}

/// On-disk shape of `auth.json`.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
struct AuthData {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    username: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    uuid: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    access_token: Option<String>,
}

/// JSON-file backed credentials with offline fallbacks for missing fields.
///
/// The fallback identity is generated once per load so every launch in a
/// session sees the same uuid.
#[derive(Debug)]
pub struct AuthFile {
    path: PathBuf,
    data: AuthData,
    fallback_uuid: String,
}

impl AuthFile {
    /// Missing file means a guest session; an unreadable one is logged and
    /// treated the same way.
    pub fn load(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let data = match std::fs::read_to_string(&path) {
            Ok(raw) => serde_json::from_str(&raw).unwrap_or_else(|e| {
                warn!("Ignoring malformed auth file {:?}: {}", path, e);
                AuthData::default()
            }),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => AuthData::default(),
            Err(e) => {
                warn!("Cannot read auth file {:?}: {}", path, e);
                AuthData::default()
            }
        };

        Self {
            path,
            data,
            fallback_uuid: Uuid::new_v4().to_string(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Store an offline profile for `username`.
    pub fn login_offline(&mut self, username: &str) -> Result<(), ConfigError> {
        self.data = AuthData {
            username: Some(username.trim().to_string()),
            uuid: Some(self.fallback_uuid.clone()),
            access_token: None,
        };
        self.save()
    }

    pub fn logout(&mut self) -> Result<(), ConfigError> {
        self.data = AuthData::default();
        info!("Logged out");
        self.save()
    }

    fn save(&self) -> Result<(), ConfigError> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent).map_err(|source| ConfigError::Io {
                path: parent.to_path_buf(),
                source,
            })?;
        }
        let raw = serde_json::to_string_pretty(&self.data)?;
        std::fs::write(&self.path, raw).map_err(|source| ConfigError::Io {
            path: self.path.clone(),
            source,
        })
    }
}

fn non_blank(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

impl CredentialSource for AuthFile {
    fn is_authenticated(&self) -> bool {
        non_blank(&self.data.username).is_some()
    }

    fn username(&self) -> String {
        non_blank(&self.data.username)
            .unwrap_or(GUEST_USERNAME)
            .to_string()
    }

    fn identity(&self) -> String {
        non_blank(&self.data.uuid)
            .unwrap_or(&self.fallback_uuid)
            .to_string()
    }

    fn access_token(&self) -> String {
        non_blank(&self.data.access_token)
            .unwrap_or(OFFLINE_ACCESS_TOKEN)
            .to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_is_guest_with_offline_values() {
        let dir = tempfile::tempdir().unwrap();
        let auth = AuthFile::load(dir.path().join("auth.json"));

        assert!(!auth.is_authenticated());
        assert_eq!(auth.username(), GUEST_USERNAME);
        assert_eq!(auth.access_token(), OFFLINE_ACCESS_TOKEN);
        assert!(Uuid::parse_str(&auth.identity()).is_ok());
        assert_eq!(auth.identity(), auth.identity());
    }

    #[test]
    fn stored_fields_are_used() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("auth.json");
        std::fs::write(
            &path,
            r#"{"username":"Steve","uuid":"069a79f4-44e9-4726-a5be-fca90e38aaf5","accessToken":"abc"}"#,
        )
        .unwrap();

        let creds = AuthFile::load(&path).credentials();
        assert_eq!(creds.username, "Steve");
        assert_eq!(creds.identity_id, "069a79f4-44e9-4726-a5be-fca90e38aaf5");
        assert_eq!(creds.access_token, "abc");
    }

    #[test]
    fn malformed_file_falls_back_to_guest() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("auth.json");
        std::fs::write(&path, "{not json").unwrap();
        assert!(!AuthFile::load(&path).is_authenticated());
    }

    #[test]
    fn offline_login_and_logout_persist() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("auth.json");

        let mut auth = AuthFile::load(&path);
        auth.login_offline(" Alex ").unwrap();
        let reloaded = AuthFile::load(&path);
        assert!(reloaded.is_authenticated());
        assert_eq!(reloaded.username(), "Alex");
        assert_eq!(reloaded.identity(), auth.identity());

        auth.logout().unwrap();
        assert!(!AuthFile::load(&path).is_authenticated());
    }
}

use std::fmt;
use std::path::PathBuf;

use crate::core::error::InstallError;

/// A Maven coordinate as published by loader metadata and version JSONs.
///
/// Accepted shapes:
///   `group:name:version`
///   `group:name:version:classifier`
///   either of the above with an `@extension` suffix
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MavenArtifact {
    pub group: String,
    pub name: String,
    pub version: String,
    pub classifier: Option<String>,
    /// Defaults to `jar`.
    pub extension: String,
}

impl MavenArtifact {
    pub fn parse(coord: &str) -> Result<Self, InstallError> {
        let (body, extension) = match coord.split_once('@') {
            Some((body, ext)) if !ext.is_empty() => (body, ext),
            Some(_) => return Err(invalid(coord)),
            None => (coord, "jar"),
        };

        let mut parts = body.split(':');
        let (Some(group), Some(name), Some(version)) = (parts.next(), parts.next(), parts.next())
        else {
            return Err(invalid(coord));
        };
        let classifier = parts.next().map(str::to_string);
        if parts.next().is_some() || [group, name, version].iter().any(|p| p.is_empty()) {
            return Err(invalid(coord));
        }

        Ok(Self {
            group: group.to_string(),
            name: name.to_string(),
            version: version.to_string(),
            classifier,
            extension: extension.to_string(),
        })
    }

    /// `name-version[-classifier].extension`
    pub fn file_name(&self) -> String {
        match &self.classifier {
            Some(c) => format!("{}-{}-{}.{}", self.name, self.version, c, self.extension),
            None => format!("{}-{}.{}", self.name, self.version, self.extension),
        }
    }

    fn segments(&self) -> Vec<String> {
        let mut segments: Vec<String> = self.group.split('.').map(str::to_string).collect();
        segments.push(self.name.clone());
        segments.push(self.version.clone());
        segments.push(self.file_name());
        segments
    }

    /// Download URL under `repository`.
    pub fn url(&self, repository: &str) -> String {
        format!(
            "{}/{}",
            repository.trim_end_matches('/'),
            self.segments().join("/")
        )
    }

    /// Path relative to the libraries directory.
    pub fn local_path(&self) -> PathBuf {
        self.segments().into_iter().collect()
    }
}

fn invalid(coord: &str) -> InstallError {
    InstallError::UpstreamFormatChanged(format!("invalid maven coordinate `{coord}`"))
}

impl fmt::Display for MavenArtifact {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}", self.group, self.name, self.version)?;
        if let Some(c) = &self.classifier {
            write!(f, ":{c}")?;
        }
        if self.extension != "jar" {
            write!(f, "@{}", self.extension)?;
        }
        Ok(())
    }
}

use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};

use tracing::debug;

use super::composer::LaunchOptions;
use crate::core::error::LaunchError;
use crate::core::maven::MavenArtifact;
use crate::core::state::LauncherPaths;
use crate::core::variant::VariantRecord;
use crate::core::version::{merge_inherited, VersionJson};

/// `inheritsFrom` chains deeper than this are treated as cycles.
const MAX_INHERITANCE_DEPTH: usize = 8;

/// Turns an installed variant plus launch options into an argument vector.
/// The first element is the program to run.
pub trait CommandComposer: Send + Sync {
    fn compose(
        &self,
        record: &VariantRecord,
        options: &LaunchOptions,
    ) -> Result<Vec<String>, LaunchError>;
}

/// Builds the command from `versions/<profile>/<profile>.json` files.
pub struct VersionJsonComposer {
    java_path: PathBuf,
    versions_dir: PathBuf,
    libraries_dir: PathBuf,
    assets_dir: PathBuf,
    natives_dir: PathBuf,
}

impl VersionJsonComposer {
    pub fn new(java_path: impl Into<PathBuf>, paths: &LauncherPaths) -> Self {
        Self {
            java_path: java_path.into(),
            versions_dir: paths.versions_dir(),
            libraries_dir: paths.libraries_dir(),
            assets_dir: paths.assets_dir(),
            natives_dir: paths.natives_dir(),
        }
    }

    fn read_profile(&self, id: &str) -> Result<serde_json::Value, LaunchError> {
        let path = self.versions_dir.join(id).join(format!("{id}.json"));
        let raw = std::fs::read_to_string(&path).map_err(|source| LaunchError::Io {
            path: path.clone(),
            source,
        })?;
        serde_json::from_str(&raw)
            .map_err(|e| LaunchError::Compose(format!("{}: {e}", path.display())))
    }

    /// Load `id` with its whole `inheritsFrom` chain merged in. Also returns
    /// the id of the profile providing the client jar.
    fn resolve(&self, id: &str) -> Result<(VersionJson, String), LaunchError> {
        let mut merged = self.read_profile(id)?;
        let jar_id = parse_profile(&merged)?.jar_id().to_string();

        for _ in 0..MAX_INHERITANCE_DEPTH {
            let Some(parent_id) = merged
                .get("inheritsFrom")
                .and_then(|v| v.as_str())
                .map(str::trim)
                .filter(|v| !v.is_empty())
                .map(str::to_string)
            else {
                return Ok((parse_profile(&merged)?, jar_id));
            };
            debug!("{} inherits from {}", id, parent_id);
            let parent = self.read_profile(&parent_id)?;
            merged = merge_inherited(&merged, &parent);
        }

        Err(LaunchError::Compose(format!(
            "inheritance chain of {id} is deeper than {MAX_INHERITANCE_DEPTH}"
        )))
    }

    fn classpath(
        &self,
        profile: &VersionJson,
        record: &VariantRecord,
        jar_id: &str,
    ) -> Result<String, LaunchError> {
        let mut entries = Vec::new();
        for lib in profile.libraries.iter().filter(|l| l.applies_here()) {
            let artifact = lib
                .artifact_file()
                .map_err(|e| LaunchError::Compose(e.to_string()))?;
            if let Some(file) = artifact {
                entries.push(self.libraries_dir.join(file.path));
            }
        }
        for aux in &record.auxiliary_libraries {
            entries.push(self.auxiliary_path(aux));
        }
        entries.push(self.versions_dir.join(jar_id).join(format!("{jar_id}.jar")));

        let mut seen = HashSet::new();
        let entries: Vec<String> = entries
            .into_iter()
            .map(|p| p.to_string_lossy().to_string())
            .filter(|p| seen.insert(p.clone()))
            .collect();
        Ok(entries.join(classpath_separator()))
    }

    /// Auxiliary libraries are either maven coordinates or plain paths.
    fn auxiliary_path(&self, reference: &str) -> PathBuf {
        match MavenArtifact::parse(reference) {
            Ok(artifact) if !Path::new(reference).is_absolute() => {
                self.libraries_dir.join(artifact.local_path())
            }
            _ => PathBuf::from(reference),
        }
    }
}

fn parse_profile(value: &serde_json::Value) -> Result<VersionJson, LaunchError> {
    serde_json::from_value(value.clone())
        .map_err(|e| LaunchError::Compose(format!("version json: {e}")))
}

pub fn classpath_separator() -> &'static str {
    if cfg!(target_os = "windows") {
        ";"
    } else {
        ":"
    }
}

/// Replace every `${name}` in `arg`. `None` if any name is unknown.
fn substitute(arg: &str, values: &HashMap<&str, String>) -> Option<String> {
    let mut out = String::with_capacity(arg.len());
    let mut rest = arg;
    while let Some(start) = rest.find("${") {
        out.push_str(&rest[..start]);
        let after = &rest[start + 2..];
        let end = after.find('}')?;
        out.push_str(values.get(&after[..end])?);
        rest = &after[end + 1..];
    }
    out.push_str(rest);
    Some(out)
}

/// Resolve placeholders, dropping unresolvable arguments together with the
/// option flag right before them.
fn resolve_args(raw: &[String], values: &HashMap<&str, String>) -> Vec<String> {
    let mut out: Vec<String> = Vec::with_capacity(raw.len());
    for arg in raw {
        match substitute(arg, values) {
            Some(resolved) => out.push(resolved),
            None => {
                debug!("Dropping unresolved argument {}", arg);
                if out.last().is_some_and(|last| last.starts_with('-')) {
                    out.pop();
                }
            }
        }
    }
    out
}

/// Remove `-cp <value>` pairs; the classpath is always added explicitly.
fn strip_classpath_flags(args: Vec<String>) -> Vec<String> {
    let mut out = Vec::with_capacity(args.len());
    let mut iter = args.into_iter();
    while let Some(arg) = iter.next() {
        if matches!(arg.as_str(), "-cp" | "-classpath" | "--class-path") {
            iter.next();
            continue;
        }
        out.push(arg);
    }
    out
}

fn path_str(path: &Path) -> String {
    path.to_string_lossy().to_string()
}

impl CommandComposer for VersionJsonComposer {
    fn compose(
        &self,
        record: &VariantRecord,
        options: &LaunchOptions,
    ) -> Result<Vec<String>, LaunchError> {
        let profile_id = record.profile_id();
        let (profile, jar_id) = self.resolve(&profile_id)?;
        let classpath = self.classpath(&profile, record, &jar_id)?;

        let asset_index = profile
            .asset_index
            .as_ref()
            .map(|a| a.id.clone())
            .or_else(|| profile.assets.clone())
            .unwrap_or_else(|| "legacy".to_string());

        let values: HashMap<&str, String> = HashMap::from([
            ("auth_player_name", options.username.clone()),
            ("auth_uuid", options.uuid.clone()),
            ("auth_access_token", options.token.clone()),
            ("auth_session", options.token.clone()),
            ("user_type", "msa".to_string()),
            ("user_properties", "{}".to_string()),
            ("version_name", profile_id.clone()),
            ("version_type", "release".to_string()),
            ("game_directory", path_str(&options.game_directory)),
            ("assets_root", path_str(&self.assets_dir)),
            ("game_assets", path_str(&self.assets_dir)),
            ("assets_index_name", asset_index),
            ("natives_directory", path_str(&self.natives_dir)),
            ("library_directory", path_str(&self.libraries_dir)),
            ("classpath_separator", classpath_separator().to_string()),
            ("classpath", classpath.clone()),
            ("launcher_name", options.launcher_name.clone()),
            ("launcher_version", options.launcher_version.clone()),
        ]);

        let jvm = strip_classpath_flags(resolve_args(&profile.jvm_args(), &values));
        let game = resolve_args(&profile.game_args(), &values);

        let mut argv = Vec::with_capacity(jvm.len() + game.len() + 4);
        argv.push(path_str(&self.java_path));
        argv.extend(jvm);
        argv.push("-cp".to_string());
        argv.push(classpath);
        argv.push(record.entry_point.clone());
        argv.extend(game);
        Ok(argv)
    }
}

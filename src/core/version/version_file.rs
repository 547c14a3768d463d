// ─── Version File ───
// `versions/<id>/<id>.json`: typed view, OS rule evaluation and the
// `inheritsFrom` merge used by loader profiles.

use std::collections::BTreeMap;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::core::error::InstallError;
use crate::core::maven::{MavenArtifact, MOJANG_LIBRARIES};

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VersionJson {
    pub id: String,
    #[serde(default)]
    pub main_class: Option<String>,
    #[serde(default)]
    pub inherits_from: Option<String>,
    /// Profile whose client jar this one runs on (loader profiles).
    #[serde(default)]
    pub jar: Option<String>,
    #[serde(default)]
    pub libraries: Vec<Library>,
    #[serde(default)]
    pub downloads: Option<VersionDownloads>,
    #[serde(default)]
    pub asset_index: Option<AssetIndexRef>,
    #[serde(default)]
    pub assets: Option<String>,
    #[serde(default)]
    pub arguments: Option<Arguments>,
    /// Pre-1.13 space separated game arguments.
    #[serde(default)]
    pub minecraft_arguments: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct VersionDownloads {
    #[serde(default)]
    pub client: Option<FileDownload>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct FileDownload {
    pub url: String,
    #[serde(default)]
    pub sha1: Option<String>,
    #[serde(default)]
    pub size: Option<u64>,
    /// Only present on library artifacts.
    #[serde(default)]
    pub path: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AssetIndexRef {
    pub id: String,
    pub url: String,
    #[serde(default)]
    pub sha1: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Arguments {
    #[serde(default)]
    pub game: Vec<Argument>,
    #[serde(default)]
    pub jvm: Vec<Argument>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(untagged)]
pub enum Argument {
    Plain(String),
    Conditional {
        #[serde(default)]
        rules: Vec<Rule>,
        value: ArgumentValue,
    },
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(untagged)]
pub enum ArgumentValue {
    One(String),
    Many(Vec<String>),
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Library {
    pub name: String,
    #[serde(default)]
    pub downloads: Option<LibraryDownloads>,
    /// Maven repository for libraries published without `downloads`.
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub rules: Vec<Rule>,
    /// OS name to classifier, e.g. `"windows": "natives-windows-${arch}"`.
    #[serde(default)]
    pub natives: Option<BTreeMap<String, String>>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LibraryDownloads {
    #[serde(default)]
    pub artifact: Option<FileDownload>,
    #[serde(default)]
    pub classifiers: BTreeMap<String, FileDownload>,
}

/// A library file resolved for this machine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LibraryFile {
    /// Relative to the libraries directory.
    pub path: PathBuf,
    pub url: String,
    pub sha1: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Rule {
    pub action: RuleAction,
    #[serde(default)]
    pub os: Option<OsRule>,
    /// Feature-gated rules (demo mode, custom resolution...) never match;
    /// no feature is enabled by this launcher.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub features: Option<serde_json::Value>,
}

#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum RuleAction {
    Allow,
    Disallow,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct OsRule {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub arch: Option<String>,
}

/// Mojang's name for the running OS.
pub fn current_os_name() -> &'static str {
    if cfg!(target_os = "windows") {
        "windows"
    } else if cfg!(target_os = "macos") {
        "osx"
    } else {
        "linux"
    }
}

impl Rule {
    fn matches(&self) -> bool {
        if self.features.is_some() {
            return false;
        }
        let Some(os) = &self.os else {
            return true;
        };
        let name_ok = os.name.as_deref().map_or(true, |n| n == current_os_name());
        let arch_ok = os.arch.as_deref().map_or(true, |a| match a {
            "x86" => cfg!(target_arch = "x86"),
            "x86_64" => cfg!(target_arch = "x86_64"),
            "arm64" | "aarch64" => cfg!(target_arch = "aarch64"),
            _ => false,
        });
        name_ok && arch_ok
    }
}

/// Empty rule list allows; otherwise the last matching rule decides and
/// nothing matching means disallowed.
pub fn rules_allow(rules: &[Rule]) -> bool {
    if rules.is_empty() {
        return true;
    }
    rules
        .iter()
        .filter(|r| r.matches())
        .last()
        .is_some_and(|r| r.action == RuleAction::Allow)
}

impl Library {
    pub fn applies_here(&self) -> bool {
        rules_allow(&self.rules)
    }

    /// Classifier of the native jar for this OS, if the library ships one.
    pub fn native_classifier(&self) -> Option<String> {
        let classifier = self.natives.as_ref()?.get(current_os_name())?;
        let arch = if cfg!(target_pointer_width = "64") { "64" } else { "32" };
        Some(classifier.replace("${arch}", arch))
    }

    /// The jar that goes on the classpath. Natives-only entries (a
    /// `downloads` block without `artifact`, or a bare `natives` map) have
    /// none.
    pub fn artifact_file(&self) -> Result<Option<LibraryFile>, InstallError> {
        match &self.downloads {
            Some(downloads) => downloads
                .artifact
                .as_ref()
                .map(|artifact| self.described(artifact, None))
                .transpose(),
            None if self.natives.is_some() => Ok(None),
            None => self.from_repository(None).map(Some),
        }
    }

    /// The native jar for this OS, to be unpacked into the natives directory.
    pub fn native_file(&self) -> Result<Option<LibraryFile>, InstallError> {
        let Some(classifier) = self.native_classifier() else {
            return Ok(None);
        };
        match &self.downloads {
            Some(downloads) => downloads
                .classifiers
                .get(&classifier)
                .map(|file| self.described(file, Some(classifier.as_str())))
                .transpose(),
            None => self.from_repository(Some(classifier.as_str())).map(Some),
        }
    }

    fn coordinate(&self, classifier: Option<&str>) -> Result<MavenArtifact, InstallError> {
        let mut artifact = MavenArtifact::parse(&self.name)?;
        if let Some(classifier) = classifier {
            artifact.classifier = Some(classifier.to_string());
        }
        Ok(artifact)
    }

    fn described(
        &self,
        file: &FileDownload,
        classifier: Option<&str>,
    ) -> Result<LibraryFile, InstallError> {
        let path = match file.path.as_deref() {
            Some(path) => PathBuf::from(path),
            None => self.coordinate(classifier)?.local_path(),
        };
        Ok(LibraryFile {
            path,
            url: file.url.clone(),
            sha1: file.sha1.clone(),
        })
    }

    fn from_repository(&self, classifier: Option<&str>) -> Result<LibraryFile, InstallError> {
        let artifact = self.coordinate(classifier)?;
        let repo = self.url.as_deref().unwrap_or(MOJANG_LIBRARIES);
        Ok(LibraryFile {
            path: artifact.local_path(),
            url: artifact.url(repo),
            sha1: None,
        })
    }
}

impl Argument {
    fn push_into(&self, out: &mut Vec<String>) {
        match self {
            Argument::Plain(s) => out.push(s.clone()),
            Argument::Conditional { rules, value } => {
                if !rules_allow(rules) {
                    return;
                }
                match value {
                    ArgumentValue::One(s) => out.push(s.clone()),
                    ArgumentValue::Many(v) => out.extend(v.iter().cloned()),
                }
            }
        }
    }
}

impl VersionJson {
    pub fn game_args(&self) -> Vec<String> {
        match (&self.arguments, &self.minecraft_arguments) {
            (Some(args), _) if !args.game.is_empty() => {
                let mut out = Vec::new();
                args.game.iter().for_each(|a| a.push_into(&mut out));
                out
            }
            (_, Some(legacy)) => legacy.split_whitespace().map(str::to_string).collect(),
            _ => Vec::new(),
        }
    }

    /// JVM arguments. Legacy profiles carry none, so the usual natives path
    /// and classpath placeholders are supplied for them.
    pub fn jvm_args(&self) -> Vec<String> {
        match &self.arguments {
            Some(args) if !args.jvm.is_empty() => {
                let mut out = Vec::new();
                args.jvm.iter().for_each(|a| a.push_into(&mut out));
                out
            }
            _ => vec!["-Djava.library.path=${natives_directory}".to_string()],
        }
    }

    /// Profile id owning the client jar.
    pub fn jar_id(&self) -> &str {
        self.jar
            .as_deref()
            .or(self.inherits_from.as_deref())
            .unwrap_or(&self.id)
    }
}

/// Merge `child` onto `parent`: scalars from the child win, `libraries` and
/// `arguments.{game,jvm}` are concatenated with the child's entries first for
/// libraries and last for arguments. The result inherits whatever the parent
/// inherited from.
pub fn merge_inherited(child: &serde_json::Value, parent: &serde_json::Value) -> serde_json::Value {
    use serde_json::Value;

    let mut merged = parent.clone();
    let (Some(target), Some(source)) = (merged.as_object_mut(), child.as_object()) else {
        return child.clone();
    };

    for (key, value) in source {
        match key.as_str() {
            "inheritsFrom" => {}
            "libraries" => {
                let mut libs = value.as_array().cloned().unwrap_or_default();
                if let Some(Value::Array(parent_libs)) = target.get("libraries") {
                    libs.extend(parent_libs.iter().cloned());
                }
                target.insert(key.clone(), Value::Array(libs));
            }
            "arguments" => {
                let mut args = target
                    .get("arguments")
                    .and_then(Value::as_object)
                    .cloned()
                    .unwrap_or_default();
                if let Some(child_args) = value.as_object() {
                    for (side, list) in child_args {
                        let mut combined = args
                            .get(side)
                            .and_then(Value::as_array)
                            .cloned()
                            .unwrap_or_default();
                        combined.extend(list.as_array().cloned().unwrap_or_default());
                        args.insert(side.clone(), Value::Array(combined));
                    }
                }
                target.insert(key.clone(), Value::Object(args));
            }
            _ => {
                target.insert(key.clone(), value.clone());
            }
        }
    }

    // Child id wins; the parent's own parent is what remains to resolve.
    merged
}

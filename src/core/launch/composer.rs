use std::path::PathBuf;
use std::process::Command;
use std::sync::Arc;

use tracing::info;

use super::command::CommandComposer;
use crate::core::error::LaunchError;
use crate::core::registry::VersionRegistry;
use crate::core::variant::{Credentials, VariantKey, VariantRecord};

/// Values handed to the command composer for one launch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LaunchOptions {
    pub username: String,
    pub uuid: String,
    pub token: String,
    pub game_directory: PathBuf,
    /// Reported to the game for diagnostics.
    pub launcher_name: String,
    pub launcher_version: String,
}

/// A program plus arguments, ready to spawn. Never passes through a shell.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessInvocation {
    pub program: PathBuf,
    pub args: Vec<String>,
    pub working_dir: PathBuf,
}

impl ProcessInvocation {
    pub fn to_command(&self) -> Command {
        let mut command = Command::new(&self.program);
        command.args(&self.args).current_dir(&self.working_dir);
        command
    }
}

/// Builds launch commands for installed variants. Does not start anything.
pub struct LaunchComposer {
    registry: Arc<VersionRegistry>,
    composer: Arc<dyn CommandComposer>,
    game_directory: PathBuf,
    launcher_name: String,
    launcher_version: String,
}

impl LaunchComposer {
    pub fn new(
        registry: Arc<VersionRegistry>,
        composer: Arc<dyn CommandComposer>,
        game_directory: PathBuf,
        launcher_name: impl Into<String>,
        launcher_version: impl Into<String>,
    ) -> Self {
        Self {
            registry,
            composer,
            game_directory,
            launcher_name: launcher_name.into(),
            launcher_version: launcher_version.into(),
        }
    }

    /// Compose for the most recently installed variant with this version
    /// string, whatever its ecosystem.
    pub fn compose(
        &self,
        version: &str,
        credentials: &Credentials,
    ) -> Result<ProcessInvocation, LaunchError> {
        let record = self
            .registry
            .find_version(version)?
            .ok_or_else(|| LaunchError::NotInstalled(version.to_string()))?;
        self.build(&record, credentials)
    }

    /// Compose for exactly `key`.
    pub fn compose_variant(
        &self,
        key: &VariantKey,
        credentials: &Credentials,
    ) -> Result<ProcessInvocation, LaunchError> {
        let record = self
            .registry
            .get(key)?
            .ok_or_else(|| LaunchError::NotInstalled(key.to_string()))?;
        self.build(&record, credentials)
    }

    fn build(
        &self,
        record: &VariantRecord,
        credentials: &Credentials,
    ) -> Result<ProcessInvocation, LaunchError> {
        let options = LaunchOptions {
            username: credentials.username.clone(),
            uuid: credentials.identity_id.clone(),
            token: credentials.access_token.clone(),
            game_directory: self.game_directory.clone(),
            launcher_name: self.launcher_name.clone(),
            launcher_version: self.launcher_version.clone(),
        };

        let mut argv = self.composer.compose(record, &options)?.into_iter();
        let program = argv
            .next()
            .ok_or_else(|| LaunchError::Compose("empty command line".into()))?;

        info!("Launch command ready for {}", record.key);
        Ok(ProcessInvocation {
            program: PathBuf::from(program),
            args: argv.collect(),
            working_dir: self.game_directory.clone(),
        })
    }
}

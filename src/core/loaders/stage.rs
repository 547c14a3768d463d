use std::fmt;

/// Every state an installation can be in, across the three ecosystems.
///
/// Vanilla: `FetchingAssets → Complete`.
/// Fabric: `ResolvingLoaderMetadata → DownloadingInstaller → RunningInstaller → Complete`.
/// Forge: `LocatingInstallerPage → ExtractingDownloadLink → DownloadingInstaller
/// → RunningInstaller → Complete`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum InstallStage {
    FetchingAssets,
    ResolvingLoaderMetadata,
    LocatingInstallerPage,
    ExtractingDownloadLink,
    DownloadingInstaller,
    RunningInstaller,
    Complete,
}

impl InstallStage {
    /// Percentage reported when the stage is entered.
    pub fn baseline(self) -> u8 {
        match self {
            InstallStage::FetchingAssets => 0,
            InstallStage::ResolvingLoaderMetadata | InstallStage::LocatingInstallerPage => 5,
            InstallStage::ExtractingDownloadLink => 15,
            InstallStage::DownloadingInstaller => 25,
            InstallStage::RunningInstaller => 60,
            InstallStage::Complete => 100,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            InstallStage::FetchingAssets => "Downloading game files",
            InstallStage::ResolvingLoaderMetadata => "Resolving loader metadata",
            InstallStage::LocatingInstallerPage => "Locating installer page",
            InstallStage::ExtractingDownloadLink => "Extracting installer link",
            InstallStage::DownloadingInstaller => "Downloading installer",
            InstallStage::RunningInstaller => "Running installer",
            InstallStage::Complete => "Installation complete",
        }
    }
}

impl fmt::Display for InstallStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

pub mod bulk;
pub mod context;
pub mod driver;
pub mod fabric;
pub mod forge;
pub mod installer;
pub mod natives;
pub mod process;
pub mod stage;
pub mod vanilla;

pub use bulk::{BulkCallbacks, BulkInstaller, MojangBulkInstaller, ProgressAdapter};
pub use context::InstallContext;
pub use driver::InstallationDriver;
pub use installer::{Installer, LoaderInstaller};
pub use stage::InstallStage;

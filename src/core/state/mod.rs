pub mod app_state;
pub mod paths;
pub mod settings;

pub use app_state::{InstallHandle, Launcher};
pub use paths::{LauncherPaths, GAME_SUBDIRS};
pub use settings::{default_data_dir, Endpoints, LauncherSettings};

pub mod manifest;
pub mod version_file;

pub use manifest::{ManifestEntry, VersionManifest};
pub use version_file::{merge_inherited, Library, VersionJson};

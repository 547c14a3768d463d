// Soreon core: version provisioning and launch composition.
//
//   variant/    ecosystem, variant key and record types
//   registry/   SQLite-backed installed versions and mods
//   catalog/    installable variant listings per ecosystem
//   loaders/    installation driver plus vanilla, Fabric and Forge paths
//   launch/     command composition from installed records
//   progress/   install progress channel
//   state/      settings, paths and the wired-up Launcher

pub mod assets;
pub mod auth;
pub mod catalog;
pub mod downloader;
pub mod error;
pub mod http;
pub mod launch;
pub mod loaders;
pub mod maven;
pub mod mods;
pub mod progress;
pub mod registry;
pub mod state;
pub mod variant;
pub mod version;

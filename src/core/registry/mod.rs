mod mods;
mod schema;
mod store;

pub use mods::ModRecord;
pub use store::VersionRegistry;

pub mod model;

pub use model::{Credentials, Ecosystem, InstallProgress, VariantKey, VariantRecord};

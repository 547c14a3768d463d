mod artifact;

pub use artifact::MavenArtifact;

/// Repository used for version-JSON libraries that carry only a `name`.
pub const MOJANG_LIBRARIES: &str = "https://libraries.minecraft.net";

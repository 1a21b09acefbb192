pub mod artifact;
pub mod run;

pub use artifact::{ArtifactKind, ArtifactRecord};
pub use run::{Run, RunStatus};

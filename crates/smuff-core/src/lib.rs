mod catalog;
mod error;
mod instance;
mod registration;

pub use catalog::{Artifact, ArtifactKind, Catalog, ConflictPolicy, HostDirs};
pub use error::DeployError;
pub use instance::{Instance, REGISTRATION_FILE_NAME};
pub use registration::RegistrationBlock;

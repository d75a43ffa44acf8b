use std::path::PathBuf;

use thiserror::Error;

/// Failures the driver must tell apart from ordinary I/O errors.
///
/// Everything here is raised before the first mutation of the target
/// instance, so the process can exit without leaving partial state.
#[derive(Error, Debug)]
pub enum DeployError {
    #[error("required directory is missing: {}", .0.display())]
    MissingDirectory(PathBuf),

    #[error("no host instances (*_data directories) found in {}", .0.display())]
    NoInstances(PathBuf),

    #[error(
        "registration file not found: {} (is the host's base configuration installed?)",
        .0.display()
    )]
    RegistrationFileMissing(PathBuf),

    #[error("input closed while waiting for an answer")]
    InputClosed,
}

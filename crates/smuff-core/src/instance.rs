use std::path::{Path, PathBuf};

pub const REGISTRATION_FILE_NAME: &str = "moonraker.conf";

/// One runtime directory tree of the host application.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Instance {
    pub name: String,
    pub config_path: PathBuf,
    pub logs_path: PathBuf,
    pub registration_file_path: PathBuf,
}

impl Instance {
    /// Derives the instance paths from a `<name>_data` directory.
    pub fn from_data_dir(name: impl Into<String>, data_dir: &Path) -> Self {
        let config_path = data_dir.join("config");
        Self {
            name: name.into(),
            registration_file_path: config_path.join(REGISTRATION_FILE_NAME),
            logs_path: data_dir.join("logs"),
            config_path,
        }
    }

    /// Single-instance machines that predate the `*_data` layout keep config
    /// and logs in two directories next to each other.
    pub fn legacy(config_dir: &Path, logs_dir: &Path) -> Self {
        Self {
            name: "legacy".to_string(),
            config_path: config_dir.to_path_buf(),
            logs_path: logs_dir.to_path_buf(),
            registration_file_path: config_dir.join(REGISTRATION_FILE_NAME),
        }
    }
}

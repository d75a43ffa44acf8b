use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use smuff_core::{DeployError, Instance};
use tracing::debug;

pub const DATA_DIR_SUFFIX: &str = "_data";
pub const DEFAULT_INSTANCE_NAME: &str = "printer";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Candidate {
    pub name: String,
    pub data_dir: PathBuf,
}

impl Candidate {
    pub fn instance(&self) -> Instance {
        Instance::from_data_dir(self.name.clone(), &self.data_dir)
    }
}

/// Returns the legacy instance when the pre-`*_data` config directory exists.
pub fn detect_legacy_instance(config_dir: &Path, logs_dir: &Path) -> Option<Instance> {
    if config_dir.is_dir() {
        debug!(path = %config_dir.display(), "legacy config directory present");
        return Some(Instance::legacy(config_dir, logs_dir));
    }
    None
}

/// Lists `<name>_data` directories under `root`, ordered by instance name.
pub fn discover_candidates(root: &Path) -> Result<Vec<Candidate>> {
    let mut candidates = Vec::new();
    for entry in fs::read_dir(root)
        .with_context(|| format!("failed to read instances directory: {}", root.display()))?
    {
        let entry = entry?;
        let path = entry.path();
        if !path.is_dir() {
            continue;
        }
        let Some(file_name) = path.file_name().and_then(|value| value.to_str()) else {
            continue;
        };
        let Some(name) = file_name.strip_suffix(DATA_DIR_SUFFIX) else {
            continue;
        };
        if name.is_empty() {
            continue;
        }
        debug!(name, path = %path.display(), "found instance candidate");
        candidates.push(Candidate {
            name: name.to_string(),
            data_dir: path.clone(),
        });
    }

    if candidates.is_empty() {
        return Err(DeployError::NoInstances(root.to_path_buf()).into());
    }

    candidates.sort_by(|a, b| a.name.cmp(&b.name));
    Ok(candidates)
}

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use smuff_core::{DeployError, Instance};

pub const RECEIPT_FILE_NAME: &str = ".smuff-deploy.receipt";

/// Every path the deployment touches, derived once from the home directory
/// and the distribution checkout.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeployConfig {
    home: PathBuf,
    dist_dir: PathBuf,
}

impl DeployConfig {
    pub fn new(home: impl Into<PathBuf>, dist_dir: impl Into<PathBuf>) -> Self {
        Self {
            home: home.into(),
            dist_dir: dist_dir.into(),
        }
    }

    pub fn from_env() -> Result<Self> {
        let home = default_home_dir()?;
        let mut dist_dir = default_dist_dir(&home);
        if dist_dir.is_relative() {
            let cwd = std::env::current_dir().context("failed to resolve current directory")?;
            dist_dir = cwd.join(dist_dir);
        }
        if dist_dir.is_dir() {
            dist_dir = fs::canonicalize(&dist_dir).with_context(|| {
                format!("failed to resolve distribution directory: {}", dist_dir.display())
            })?;
        }
        Ok(Self::new(home, dist_dir))
    }

    pub fn home(&self) -> &Path {
        &self.home
    }

    pub fn dist_dir(&self) -> &Path {
        &self.dist_dir
    }

    pub fn module_dir(&self) -> PathBuf {
        self.home.join("klipper").join("klippy").join("extras")
    }

    pub fn styles_root(&self) -> PathBuf {
        self.home.join("KlipperScreen").join("styles")
    }

    pub fn legacy_config_dir(&self) -> PathBuf {
        self.home.join("klipper_config")
    }

    pub fn legacy_logs_dir(&self) -> PathBuf {
        self.home.join("klipper_logs")
    }

    pub fn instances_root(&self) -> PathBuf {
        self.home.clone()
    }

    pub fn catalog_override_path(&self) -> PathBuf {
        self.dist_dir.join("deploy.toml")
    }

    pub fn receipt_path(&self, instance: &Instance) -> PathBuf {
        instance.config_path.join(RECEIPT_FILE_NAME)
    }

    /// Module links point into the distribution, so it must be an existing
    /// absolute directory.
    pub fn ensure_dist_dir(&self) -> Result<()> {
        if self.dist_dir.is_relative() {
            bail!(
                "distribution directory must be an absolute path: {}",
                self.dist_dir.display()
            );
        }
        if !self.dist_dir.is_dir() {
            return Err(DeployError::MissingDirectory(self.dist_dir.clone()).into());
        }
        Ok(())
    }
}

pub fn default_home_dir() -> Result<PathBuf> {
    let home = std::env::var("HOME").context("HOME is not set; cannot locate host directories")?;
    Ok(PathBuf::from(home))
}

pub fn default_dist_dir(home: &Path) -> PathBuf {
    match std::env::var_os("SMUFF_DIST_DIR") {
        Some(value) if !value.is_empty() => PathBuf::from(value),
        _ => home.join("SMuFF-Klipper"),
    }
}

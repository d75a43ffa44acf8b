use std::fs;
use std::path::Component;

use anyhow::{anyhow, Context, Result};
use smuff_core::{Catalog, RegistrationBlock};
use tracing::{debug, info};

use crate::DeployConfig;

/// The packaged `deploy.toml` when present, the built-in catalog otherwise.
pub fn load_catalog(config: &DeployConfig) -> Result<Catalog> {
    let path = config.catalog_override_path();
    if !path.exists() {
        debug!("no catalog override, using built-in catalog");
        return Ok(Catalog::smuff_default());
    }
    let raw = fs::read_to_string(&path)
        .with_context(|| format!("failed to read catalog: {}", path.display()))?;
    let catalog = Catalog::from_toml_str(&raw)
        .with_context(|| format!("invalid catalog: {}", path.display()))?;
    info!(path = %path.display(), artifacts = catalog.artifacts.len(), "loaded catalog override");
    Ok(catalog)
}

pub fn load_registration_block(
    config: &DeployConfig,
    catalog: &Catalog,
) -> Result<RegistrationBlock> {
    let path = config.dist_dir().join(&catalog.registration_template);
    let raw = fs::read_to_string(&path)
        .with_context(|| format!("failed to read registration template: {}", path.display()))?;
    RegistrationBlock::parse(&raw)
        .with_context(|| format!("invalid registration template: {}", path.display()))
}

/// Deletes the distribution checkout. Refuses paths that could be the home
/// directory, the filesystem root or a relative path.
pub fn remove_distribution_dir(config: &DeployConfig) -> Result<()> {
    let dist_dir = config.dist_dir();
    if !dist_dir.is_absolute()
        || dist_dir.parent().is_none()
        || dist_dir == config.home()
        || config.home().starts_with(dist_dir)
        || dist_dir
            .components()
            .any(|component| matches!(component, Component::ParentDir))
    {
        return Err(anyhow!(
            "refusing to remove distribution directory {}",
            dist_dir.display()
        ));
    }
    if !dist_dir.exists() {
        return Ok(());
    }
    fs::remove_dir_all(dist_dir).with_context(|| {
        format!(
            "failed to remove distribution directory: {}",
            dist_dir.display()
        )
    })?;
    info!(path = %dist_dir.display(), "distribution directory removed");
    Ok(())
}

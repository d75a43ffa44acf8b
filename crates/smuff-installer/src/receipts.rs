use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result};
use smuff_core::Instance;

use crate::fs_utils::remove_file_if_exists;
use crate::{DeployConfig, DeployReceipt, FragmentRecord};

pub fn write_deploy_receipt(
    config: &DeployConfig,
    instance: &Instance,
    receipt: &DeployReceipt,
) -> Result<PathBuf> {
    let mut payload = String::new();
    payload.push_str(&format!("instance={}\n", receipt.instance));
    for fragment in &receipt.fragments {
        payload.push_str(&format!("fragment={}:{}\n", fragment.name, fragment.sha256));
    }
    payload.push_str(&format!(
        "installed_at_unix={}\n",
        receipt.installed_at_unix
    ));

    let path = config.receipt_path(instance);
    fs::write(&path, payload.as_bytes())
        .with_context(|| format!("failed to write deploy receipt: {}", path.display()))?;
    Ok(path)
}

pub fn read_deploy_receipt(
    config: &DeployConfig,
    instance: &Instance,
) -> Result<Option<DeployReceipt>> {
    let path = config.receipt_path(instance);
    if !path.exists() {
        return Ok(None);
    }
    let raw = fs::read_to_string(&path)
        .with_context(|| format!("failed to read deploy receipt: {}", path.display()))?;
    let receipt = parse_receipt(&raw)
        .with_context(|| format!("failed to parse deploy receipt: {}", path.display()))?;
    Ok(Some(receipt))
}

pub(crate) fn clear_deploy_receipt(config: &DeployConfig, instance: &Instance) -> Result<()> {
    let path = config.receipt_path(instance);
    remove_file_if_exists(&path)
        .with_context(|| format!("failed to remove deploy receipt: {}", path.display()))
}

pub(crate) fn parse_receipt(raw: &str) -> Result<DeployReceipt> {
    let mut instance = None;
    let mut fragments = Vec::new();
    let mut installed_at_unix = None;

    for line in raw.lines().map(str::trim).filter(|line| !line.is_empty()) {
        let Some((k, v)) = line.split_once('=') else {
            continue;
        };
        match k {
            "instance" => instance = Some(v.to_string()),
            "fragment" => {
                let (name, sha256) = v
                    .rsplit_once(':')
                    .with_context(|| format!("fragment entry '{v}' must be name:sha256"))?;
                fragments.push(FragmentRecord {
                    name: name.to_string(),
                    sha256: sha256.to_string(),
                });
            }
            "installed_at_unix" => {
                installed_at_unix = Some(v.parse().context("installed_at_unix must be u64")?)
            }
            _ => {}
        }
    }

    Ok(DeployReceipt {
        instance: instance.context("missing instance")?,
        fragments,
        installed_at_unix: installed_at_unix.context("missing installed_at_unix")?,
    })
}

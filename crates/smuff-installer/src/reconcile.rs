use std::fs::{self, OpenOptions};
use std::path::Path;
use std::time::{SystemTime, UNIX_EPOCH};

use anyhow::{Context, Result};
use smuff_core::{
    Artifact, ArtifactKind, Catalog, ConflictPolicy, DeployError, HostDirs, Instance,
};
use smuff_security::{sha256_file_hex, verify_sha256_file};
use tracing::{debug, info, warn};

use crate::fs_utils::{copy_new_file, create_symlink, entry_metadata, set_mode};
use crate::receipts::{clear_deploy_receipt, read_deploy_receipt, write_deploy_receipt};
use crate::{
    ArtifactOutcome, DeployConfig, DeployReceipt, FragmentRecord, Report, Transition,
};

const MODULE_MODE: u32 = 0o755;
const FRAGMENT_MODE: u32 = 0o755;
const ICON_MODE: u32 = 0o644;

pub fn apply_transition(
    transition: Transition,
    config: &DeployConfig,
    instance: &Instance,
    catalog: &Catalog,
    approve_unrecorded: impl FnMut(&Path) -> Result<bool>,
) -> Result<Report> {
    match transition {
        Transition::Install => install_artifacts(config, instance, catalog),
        Transition::Uninstall => {
            uninstall_artifacts_with_approval(config, instance, catalog, approve_unrecorded)
        }
    }
}

/// Brings every catalog artifact into place without touching anything that
/// already exists. Only missing host directories abort the pass; every other
/// failure is recorded and the next artifact is attempted.
pub fn install_artifacts(
    config: &DeployConfig,
    instance: &Instance,
    catalog: &Catalog,
) -> Result<Report> {
    config.ensure_dist_dir()?;
    let module_dir = config.module_dir();
    for dir in [&module_dir, &instance.config_path] {
        if !dir.is_dir() {
            return Err(DeployError::MissingDirectory(dir.clone()).into());
        }
    }

    let styles_root = config.styles_root();
    let host = HostDirs {
        module_dir: &module_dir,
    };
    let mut report = Report::new(Transition::Install);
    let mut copied_fragments = Vec::new();

    for artifact in &catalog.artifacts {
        match artifact.kind {
            ArtifactKind::LinkedModule => {
                let Some(destination) = artifact.destination(instance, &host) else {
                    continue;
                };
                let source = artifact.source_path(config.dist_dir());
                let outcome = link_module(&source, &destination);
                report.record(artifact.kind, destination, outcome);
            }
            ArtifactKind::ConfigFragment => {
                let Some(destination) = artifact.destination(instance, &host) else {
                    continue;
                };
                let source = artifact.source_path(config.dist_dir());
                let outcome = copy_fragment(artifact, &source, &destination);
                if outcome == ArtifactOutcome::Copied {
                    match sha256_file_hex(&destination) {
                        Ok(sha256) => copied_fragments.push(FragmentRecord {
                            name: artifact.file_name(),
                            sha256,
                        }),
                        Err(err) => report.errors.push(format!("{err:#}")),
                    }
                }
                report.record(artifact.kind, destination, outcome);
            }
            ArtifactKind::ThemeIcon => {
                install_theme_icon(artifact, config, catalog, &styles_root, &mut report);
            }
            ArtifactKind::LogLink => {
                let Some(destination) = artifact.destination(instance, &host) else {
                    continue;
                };
                let backing = artifact.source_path(config.dist_dir());
                let outcome = link_log(&backing, &destination);
                report.record(artifact.kind, destination, outcome);
            }
        }
    }

    if !copied_fragments.is_empty() {
        if let Err(err) = record_copied_fragments(config, instance, copied_fragments) {
            report.errors.push(format!("{err:#}"));
        }
    }

    let summary = report.summary();
    info!(
        instance = %instance.name,
        changed = summary.changed,
        unchanged = summary.unchanged,
        failed = summary.failed,
        "install pass finished"
    );
    Ok(report)
}

/// Uninstall that keeps every config fragment the receipt does not vouch for.
pub fn uninstall_artifacts(
    config: &DeployConfig,
    instance: &Instance,
    catalog: &Catalog,
) -> Result<Report> {
    uninstall_artifacts_with_approval(config, instance, catalog, |_| Ok(false))
}

/// Removes links and config fragments the install pass created. Fragments
/// missing from the receipt, or changed since they were copied, are only
/// removed when `approve_unrecorded` says so. Theme icons stay.
pub fn uninstall_artifacts_with_approval(
    config: &DeployConfig,
    instance: &Instance,
    catalog: &Catalog,
    mut approve_unrecorded: impl FnMut(&Path) -> Result<bool>,
) -> Result<Report> {
    let module_dir = config.module_dir();
    let host = HostDirs {
        module_dir: &module_dir,
    };
    let receipt = match read_deploy_receipt(config, instance) {
        Ok(receipt) => receipt,
        Err(err) => {
            warn!("ignoring unreadable deploy receipt: {err:#}");
            None
        }
    };
    let mut report = Report::new(Transition::Uninstall);

    for artifact in &catalog.artifacts {
        match artifact.kind {
            ArtifactKind::LinkedModule | ArtifactKind::LogLink => {
                let Some(destination) = artifact.destination(instance, &host) else {
                    continue;
                };
                let target = artifact.source_path(config.dist_dir());
                let outcome = remove_link(&destination, &target);
                report.record(artifact.kind, destination, outcome);
            }
            ArtifactKind::ConfigFragment => {
                let Some(destination) = artifact.destination(instance, &host) else {
                    continue;
                };
                let record = receipt
                    .as_ref()
                    .and_then(|receipt| receipt.fragment(&artifact.file_name()));
                let outcome = remove_fragment(&destination, record, &mut approve_unrecorded)?;
                report.record(artifact.kind, destination, outcome);
            }
            ArtifactKind::ThemeIcon => {}
        }
    }

    if let Some(receipt) = receipt {
        if let Err(err) = retain_remaining_fragments(config, instance, receipt) {
            report.errors.push(format!("{err:#}"));
        }
    }

    let summary = report.summary();
    info!(
        instance = %instance.name,
        removed = summary.changed,
        kept = summary.kept,
        failed = summary.failed,
        "uninstall pass finished"
    );
    Ok(report)
}

fn link_module(source: &Path, destination: &Path) -> ArtifactOutcome {
    match entry_metadata(destination) {
        Ok(Some(metadata)) if metadata.file_type().is_symlink() => {
            if destination.exists() {
                debug!(path = %destination.display(), "module already linked");
                return ArtifactOutcome::AlreadyLinked;
            }
            debug!(path = %destination.display(), "replacing dangling module link");
            if let Err(err) = fs::remove_file(destination) {
                return failed(format!(
                    "failed to remove dangling link {}: {err}",
                    destination.display()
                ));
            }
        }
        Ok(Some(_)) => return ArtifactOutcome::Exists,
        Ok(None) => {}
        Err(err) => return failed(format!("failed to inspect {}: {err}", destination.display())),
    }

    if !source.is_absolute() || !source.is_file() {
        return failed(format!("module source is missing: {}", source.display()));
    }
    // The host sees the mode of the link target.
    if let Err(err) = set_mode(source, MODULE_MODE) {
        return failed(format!(
            "failed to set the mode of {}: {err}",
            source.display()
        ));
    }
    if let Err(err) = create_symlink(source, destination) {
        return failed(format!(
            "failed to create symlink {} -> {}: {err}",
            destination.display(),
            source.display()
        ));
    }
    if !destination.exists() {
        let _ = fs::remove_file(destination);
        return failed(format!(
            "link {} does not resolve to {}",
            destination.display(),
            source.display()
        ));
    }
    ArtifactOutcome::Linked
}

fn copy_fragment(artifact: &Artifact, source: &Path, destination: &Path) -> ArtifactOutcome {
    match entry_metadata(destination) {
        Ok(Some(_)) => {
            return match artifact.policy() {
                ConflictPolicy::OverwriteNever => ArtifactOutcome::ExistsUpdateManually,
                ConflictPolicy::SkipIfExists => ArtifactOutcome::Exists,
            };
        }
        Ok(None) => {}
        Err(err) => return failed(format!("failed to inspect {}: {err}", destination.display())),
    }
    copy_new(source, destination, FRAGMENT_MODE)
}

fn install_theme_icon(
    artifact: &Artifact,
    config: &DeployConfig,
    catalog: &Catalog,
    styles_root: &Path,
    report: &mut Report,
) {
    let source = artifact.source_path(config.dist_dir());
    for theme in &catalog.themes {
        let theme_dir = styles_root.join(theme);
        if !theme_dir.is_dir() {
            debug!(theme = %theme, "theme not installed, skipping icon");
            continue;
        }

        let destination = artifact.theme_destination(&theme_dir);
        let outcome = match entry_metadata(&destination) {
            Ok(Some(_)) => ArtifactOutcome::Exists,
            Ok(None) => match destination.parent() {
                Some(images_dir) => match fs::create_dir_all(images_dir) {
                    Ok(()) => copy_new(&source, &destination, ICON_MODE),
                    Err(err) => failed(format!(
                        "failed to create {}: {err}",
                        images_dir.display()
                    )),
                },
                None => copy_new(&source, &destination, ICON_MODE),
            },
            Err(err) => failed(format!("failed to inspect {}: {err}", destination.display())),
        };
        report.record(artifact.kind, destination, outcome);
    }
}

fn link_log(backing: &Path, destination: &Path) -> ArtifactOutcome {
    if let Err(err) = OpenOptions::new().create(true).append(true).open(backing) {
        return failed(format!(
            "failed to create log file {}: {err}",
            backing.display()
        ));
    }

    match entry_metadata(destination) {
        Ok(Some(metadata)) if metadata.file_type().is_symlink() => {
            if destination.exists() {
                return ArtifactOutcome::AlreadyLinked;
            }
            debug!(path = %destination.display(), "replacing dangling log link");
            if let Err(err) = fs::remove_file(destination) {
                return failed(format!(
                    "failed to remove dangling link {}: {err}",
                    destination.display()
                ));
            }
        }
        Ok(Some(_)) => return ArtifactOutcome::Exists,
        Ok(None) => {}
        Err(err) => return failed(format!("failed to inspect {}: {err}", destination.display())),
    }

    match create_symlink(backing, destination) {
        Ok(()) => ArtifactOutcome::Linked,
        Err(err) => failed(format!(
            "failed to create symlink {} -> {}: {err}",
            destination.display(),
            backing.display()
        )),
    }
}

fn remove_link(destination: &Path, expected_target: &Path) -> ArtifactOutcome {
    match entry_metadata(destination) {
        Ok(Some(metadata)) if metadata.file_type().is_symlink() => {}
        Ok(Some(_)) => {
            return ArtifactOutcome::Kept {
                reason: "not a symbolic link".to_string(),
            }
        }
        Ok(None) => {
            debug!(path = %destination.display(), "link not present");
            return ArtifactOutcome::NotPresent;
        }
        Err(err) => return failed(format!("failed to inspect {}: {err}", destination.display())),
    }

    match fs::read_link(destination) {
        Ok(target) if target == expected_target => {}
        Ok(target) => {
            return ArtifactOutcome::Kept {
                reason: format!("links to {}", target.display()),
            }
        }
        Err(err) => return failed(format!("failed to read link {}: {err}", destination.display())),
    }

    match fs::remove_file(destination) {
        Ok(()) => ArtifactOutcome::Removed,
        Err(err) => failed(format!(
            "failed to remove link {}: {err}",
            destination.display()
        )),
    }
}

fn remove_fragment(
    destination: &Path,
    record: Option<&FragmentRecord>,
    approve_unrecorded: &mut impl FnMut(&Path) -> Result<bool>,
) -> Result<ArtifactOutcome> {
    match entry_metadata(destination) {
        Ok(Some(metadata)) if metadata.is_file() => {}
        Ok(Some(_)) => {
            return Ok(ArtifactOutcome::Kept {
                reason: "not a regular file".to_string(),
            })
        }
        Ok(None) => return Ok(ArtifactOutcome::NotPresent),
        Err(err) => {
            return Ok(failed(format!(
                "failed to inspect {}: {err}",
                destination.display()
            )))
        }
    }

    let owned_unchanged = match record {
        Some(record) => verify_sha256_file(destination, &record.sha256).unwrap_or(false),
        None => false,
    };
    if !owned_unchanged && !approve_unrecorded(destination)? {
        let reason = if record.is_some() {
            "modified since install"
        } else {
            "not created by this installer"
        };
        return Ok(ArtifactOutcome::Kept {
            reason: reason.to_string(),
        });
    }

    Ok(match fs::remove_file(destination) {
        Ok(()) => ArtifactOutcome::Removed,
        Err(err) => failed(format!(
            "failed to remove {}: {err}",
            destination.display()
        )),
    })
}

/// Keeps receipt records only for fragments still on disk, so a kept file
/// stays recognisable on the next uninstall.
fn retain_remaining_fragments(
    config: &DeployConfig,
    instance: &Instance,
    mut receipt: DeployReceipt,
) -> Result<()> {
    receipt
        .fragments
        .retain(|record| instance.config_path.join(&record.name).is_file());
    if receipt.fragments.is_empty() {
        return clear_deploy_receipt(config, instance);
    }
    let path = write_deploy_receipt(config, instance, &receipt)?;
    debug!(path = %path.display(), kept = receipt.fragments.len(), "deploy receipt trimmed");
    Ok(())
}

fn copy_new(source: &Path, destination: &Path, mode: u32) -> ArtifactOutcome {
    if let Err(err) = copy_new_file(source, destination) {
        return failed(format!(
            "failed to copy {} -> {}: {err}",
            source.display(),
            destination.display()
        ));
    }
    if let Err(err) = set_mode(destination, mode) {
        return failed(format!(
            "copied {} but failed to set its mode: {err}",
            destination.display()
        ));
    }
    ArtifactOutcome::Copied
}

fn record_copied_fragments(
    config: &DeployConfig,
    instance: &Instance,
    copied: Vec<FragmentRecord>,
) -> Result<()> {
    let mut fragments = match read_deploy_receipt(config, instance)? {
        Some(existing) => existing.fragments,
        None => Vec::new(),
    };
    for record in copied {
        fragments.retain(|existing| existing.name != record.name);
        fragments.push(record);
    }

    let receipt = DeployReceipt {
        instance: instance.name.clone(),
        fragments,
        installed_at_unix: current_unix_timestamp()?,
    };
    let path = write_deploy_receipt(config, instance, &receipt)?;
    debug!(path = %path.display(), "deploy receipt written");
    Ok(())
}

fn current_unix_timestamp() -> Result<u64> {
    Ok(SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .context("system time is before unix epoch")?
        .as_secs())
}

fn failed(reason: String) -> ArtifactOutcome {
    debug!("{reason}");
    ArtifactOutcome::Failed { reason }
}

use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::Path;

use anyhow::{Context, Result};
use smuff_core::{DeployError, RegistrationBlock};
use tracing::debug;

use crate::RegistrationOutcome;

/// Appends `block` to the registration file unless its marker line is
/// already there. Existing content is never rewritten.
pub fn ensure_registered(path: &Path, block: &RegistrationBlock) -> Result<RegistrationOutcome> {
    let content = read_registration_file(path)?;
    if block.is_present_in(&content) {
        debug!(path = %path.display(), marker = block.marker(), "registration already present");
        return Ok(RegistrationOutcome::AlreadyRegistered);
    }

    let mut payload = String::new();
    if !content.is_empty() && !content.ends_with('\n') {
        payload.push('\n');
    }
    for line in block.lines() {
        payload.push_str(line);
        payload.push('\n');
    }

    let mut file = OpenOptions::new()
        .append(true)
        .open(path)
        .with_context(|| format!("failed to open registration file for append: {}", path.display()))?;
    file.write_all(payload.as_bytes())
        .with_context(|| format!("failed to append registration block: {}", path.display()))?;

    debug!(path = %path.display(), lines = block.lines().len(), "registration block appended");
    Ok(RegistrationOutcome::Appended {
        lines: block.lines().len(),
    })
}

pub fn is_registered(path: &Path, block: &RegistrationBlock) -> Result<bool> {
    let content = read_registration_file(path)?;
    Ok(block.is_present_in(&content))
}

fn read_registration_file(path: &Path) -> Result<String> {
    if !path.is_file() {
        return Err(DeployError::RegistrationFileMissing(path.to_path_buf()).into());
    }
    fs::read_to_string(path)
        .with_context(|| format!("failed to read registration file: {}", path.display()))
}

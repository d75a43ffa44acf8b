use std::io::{BufRead, Write};
use std::path::PathBuf;

use anyhow::Result;
use smuff_core::Instance;
use tracing::{debug, info};

use crate::discover::{detect_legacy_instance, discover_candidates, Candidate};
use crate::prompt::{Answer, Prompter};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolverPaths {
    pub legacy_config_dir: PathBuf,
    pub legacy_logs_dir: PathBuf,
    pub instances_root: PathBuf,
    pub default_instance: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResolutionSource {
    Legacy,
    Selected,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolution {
    pub instance: Instance,
    pub source: ResolutionSource,
}

pub fn resolve_instance<R: BufRead, W: Write>(
    paths: &ResolverPaths,
    prompter: &mut Prompter<R, W>,
) -> Result<Resolution> {
    if let Some(instance) =
        detect_legacy_instance(&paths.legacy_config_dir, &paths.legacy_logs_dir)
    {
        info!(config = %instance.config_path.display(), "using legacy single-instance layout");
        return Ok(Resolution {
            instance,
            source: ResolutionSource::Legacy,
        });
    }

    let candidates = discover_candidates(&paths.instances_root)?;
    let instance = select_candidate(&candidates, &paths.default_instance, prompter)?;
    Ok(Resolution {
        instance,
        source: ResolutionSource::Selected,
    })
}

/// Numbered selection followed by a confirmation of the derived config path.
/// Declining the confirmation goes back to the selection.
pub fn select_candidate<R: BufRead, W: Write>(
    candidates: &[Candidate],
    default_name: &str,
    prompter: &mut Prompter<R, W>,
) -> Result<Instance> {
    let default_index = candidates
        .iter()
        .position(|candidate| candidate.name == default_name);

    loop {
        prompter.say(&format!("Found {} host instance(s):", candidates.len()))?;
        for (index, candidate) in candidates.iter().enumerate() {
            let marker = if Some(index) == default_index {
                " (default)"
            } else {
                ""
            };
            prompter.say(&format!("  {}) {}{}", index + 1, candidate.name, marker))?;
        }

        let question = match default_index {
            Some(index) => format!(
                "Select instance [1-{}, enter for {}]:",
                candidates.len(),
                index + 1
            ),
            None => format!("Select instance [1-{}]:", candidates.len()),
        };
        let index = prompter.ask(&question, |value| {
            parse_selection(value, candidates.len(), default_index)
        })?;

        let instance = candidates[index].instance();
        debug!(name = %instance.name, "instance selected");
        prompter.say(&format!(
            "Config directory: {}",
            instance.config_path.display()
        ))?;
        if prompter.confirm("Use this instance?")? {
            return Ok(instance);
        }
    }
}

pub(crate) fn parse_selection(
    value: &str,
    count: usize,
    default_index: Option<usize>,
) -> Answer<usize> {
    if value.is_empty() {
        return match default_index {
            Some(index) => Answer::Accept(index),
            None => Answer::Reject(format!("Please enter a number between 1 and {count}.")),
        };
    }
    match value.parse::<usize>() {
        Ok(number) if (1..=count).contains(&number) => Answer::Accept(number - 1),
        _ => Answer::Reject(format!(
            "'{value}' is not a valid choice; enter a number between 1 and {count}."
        )),
    }
}

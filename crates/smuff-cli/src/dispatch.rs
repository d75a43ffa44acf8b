use std::io::{BufRead, Write};
use std::process::ExitCode;

use anyhow::Result;
use smuff_core::{DeployError, Instance};
use smuff_installer::{
    ensure_registered, install_artifacts, is_registered, load_catalog, load_registration_block,
    remove_distribution_dir, uninstall_artifacts_with_approval, DeployConfig, Report,
};
use smuff_resolver::{
    resolve_instance, Prompter, Resolution, ResolutionSource, ResolverPaths, DEFAULT_INSTANCE_NAME,
};
use tracing::debug;

use crate::render::{
    format_registration_line, format_report_lines, format_summary_line, render_section_header,
    render_status_line, OutputStyle,
};
use crate::Mode;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum RunOutcome {
    Completed,
    CompletedWithFailures,
    Declined,
}

impl RunOutcome {
    pub(crate) fn exit_code(self) -> ExitCode {
        match self {
            Self::Completed | Self::Declined => ExitCode::SUCCESS,
            Self::CompletedWithFailures => ExitCode::FAILURE,
        }
    }

    fn from_report(report: &Report) -> Self {
        if report.has_failures() {
            Self::CompletedWithFailures
        } else {
            Self::Completed
        }
    }
}

pub(crate) fn resolver_paths(config: &DeployConfig) -> ResolverPaths {
    ResolverPaths {
        legacy_config_dir: config.legacy_config_dir(),
        legacy_logs_dir: config.legacy_logs_dir(),
        instances_root: config.instances_root(),
        default_instance: DEFAULT_INSTANCE_NAME.to_string(),
    }
}

pub(crate) fn run_mode<R: BufRead, W: Write>(
    mode: Mode,
    config: &DeployConfig,
    prompter: &mut Prompter<R, W>,
    style: OutputStyle,
) -> Result<RunOutcome> {
    debug!(?mode, dist = %config.dist_dir().display(), "starting");
    match mode {
        Mode::Install => run_install(config, prompter, style),
        Mode::Uninstall => run_uninstall(config, prompter, style),
    }
}

fn run_install<R: BufRead, W: Write>(
    config: &DeployConfig,
    prompter: &mut Prompter<R, W>,
    style: OutputStyle,
) -> Result<RunOutcome> {
    config.ensure_dist_dir()?;
    let catalog = load_catalog(config)?;
    let block = load_registration_block(config, &catalog)?;

    let resolution = resolve_instance(&resolver_paths(config), prompter)?;
    announce_instance(prompter, style, &resolution)?;
    let instance = &resolution.instance;
    if !instance.registration_file_path.is_file() {
        return Err(
            DeployError::RegistrationFileMissing(instance.registration_file_path.clone()).into(),
        );
    }

    prompter.say(&render_section_header(style, "Installing artifacts"))?;
    let report = install_artifacts(config, instance, &catalog)?;
    for line in format_report_lines(&report, style) {
        prompter.say(&line)?;
    }

    prompter.say(&render_section_header(style, "Update manager"))?;
    let registration = ensure_registered(&instance.registration_file_path, &block)?;
    prompter.say(&format_registration_line(
        style,
        registration,
        &instance.registration_file_path,
    ))?;

    prompter.say(&format_summary_line(&report, style))?;
    Ok(RunOutcome::from_report(&report))
}

fn run_uninstall<R: BufRead, W: Write>(
    config: &DeployConfig,
    prompter: &mut Prompter<R, W>,
    style: OutputStyle,
) -> Result<RunOutcome> {
    prompter.say(&render_status_line(
        style,
        "warn",
        "This removes the SMuFF module links, log link and config files from a printer instance.",
    ))?;
    if !prompter.confirm("Do you really want to uninstall?")? {
        prompter.say(&render_status_line(style, "info", "uninstall cancelled"))?;
        return Ok(RunOutcome::Declined);
    }

    let catalog = load_catalog(config)?;
    let resolution = resolve_instance(&resolver_paths(config), prompter)?;
    announce_instance(prompter, style, &resolution)?;
    let instance = &resolution.instance;

    prompter.say(&render_section_header(style, "Removing artifacts"))?;
    let report = uninstall_artifacts_with_approval(config, instance, &catalog, |path| {
        prompter.confirm(&format!(
            "{} was not verified as installed by this tool. Remove it anyway?",
            path.display()
        ))
    })?;
    for line in format_report_lines(&report, style) {
        prompter.say(&line)?;
    }

    remind_registration(config, prompter, style, instance, &catalog)?;

    let dist_dir = config.dist_dir();
    if dist_dir.exists()
        && prompter.confirm(&format!(
            "Also delete {}? This cannot be undone.",
            dist_dir.display()
        ))?
    {
        remove_distribution_dir(config)?;
        prompter.say(&render_status_line(
            style,
            "ok",
            &format!("removed {}", dist_dir.display()),
        ))?;
    }

    prompter.say(&format_summary_line(&report, style))?;
    Ok(RunOutcome::from_report(&report))
}

fn announce_instance<R: BufRead, W: Write>(
    prompter: &mut Prompter<R, W>,
    style: OutputStyle,
    resolution: &Resolution,
) -> Result<()> {
    let message = match resolution.source {
        ResolutionSource::Legacy => format!(
            "legacy layout detected, using {}",
            resolution.instance.config_path.display()
        ),
        ResolutionSource::Selected => format!(
            "using instance '{}' ({})",
            resolution.instance.name,
            resolution.instance.config_path.display()
        ),
    };
    prompter.say(&render_status_line(style, "info", &message))
}

/// The update-manager section is never removed automatically.
fn remind_registration<R: BufRead, W: Write>(
    config: &DeployConfig,
    prompter: &mut Prompter<R, W>,
    style: OutputStyle,
    instance: &Instance,
    catalog: &smuff_core::Catalog,
) -> Result<()> {
    let path = &instance.registration_file_path;
    let registered = load_registration_block(config, catalog)
        .and_then(|block| is_registered(path, &block).map(|found| (block, found)));
    let message = match registered {
        Ok((_, false)) => return Ok(()),
        Ok((block, true)) => format!(
            "remove the {} section from {} manually",
            block.marker(),
            path.display()
        ),
        Err(err) => {
            debug!("registration check skipped: {err:#}");
            format!(
                "remove the SMuFF update manager section from {} manually if present",
                path.display()
            )
        }
    };
    prompter.say(&render_status_line(style, "warn", &message))
}

mod dispatch;
mod render;

use std::io;
use std::process::ExitCode;

use clap::{Parser, ValueEnum};
use smuff_core::DeployError;
use smuff_installer::DeployConfig;
use smuff_resolver::Prompter;
use tracing_subscriber::EnvFilter;

use crate::dispatch::run_mode;
use crate::render::{current_output_style, render_status_line, OutputStyle};

#[derive(Parser, Debug)]
#[command(name = "smuff-deploy")]
#[command(about = "Install or remove the SMuFF Klipper module", long_about = None)]
struct Cli {
    /// Omit to install; `uninstall` removes what install created.
    mode: Option<Mode>,
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Mode {
    #[value(skip)]
    Install,
    Uninstall,
}

fn main() -> ExitCode {
    init_tracing();
    let cli = Cli::parse();
    let mode = cli.mode.unwrap_or(Mode::Install);
    let style = current_output_style();

    let config = match DeployConfig::from_env() {
        Ok(config) => config,
        Err(err) => return report_error(style, &err),
    };

    let mut prompter = Prompter::new(io::stdin().lock(), io::stdout());
    match run_mode(mode, &config, &mut prompter, style) {
        Ok(outcome) => outcome.exit_code(),
        Err(err) => report_error(style, &err),
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_env("SMUFF_DEPLOY_LOG")
        .or_else(|_| EnvFilter::try_from_default_env())
        .unwrap_or_else(|_| EnvFilter::new("warn"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .without_time()
        .try_init();
}

fn report_error(style: OutputStyle, err: &anyhow::Error) -> ExitCode {
    let message = match err.downcast_ref::<DeployError>() {
        Some(DeployError::InputClosed) => "aborted: no more input".to_string(),
        Some(precondition) => format!("precondition failed: {precondition}"),
        None => format!("{err:#}"),
    };
    eprintln!("{}", render_status_line(style, "err", &message));
    ExitCode::FAILURE
}

#[cfg(all(test, unix))]
mod tests;

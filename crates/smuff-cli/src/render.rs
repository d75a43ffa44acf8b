use std::io::IsTerminal;

use anstyle::{AnsiColor, Effects, Style};
use smuff_installer::{ArtifactOutcome, ArtifactReport, RegistrationOutcome, Report};

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub(crate) enum OutputStyle {
    Plain,
    Rich,
}

pub(crate) fn current_output_style() -> OutputStyle {
    let no_color = std::env::var_os("NO_COLOR").is_some_and(|value| !value.is_empty());
    if no_color || !std::io::stdout().is_terminal() {
        OutputStyle::Plain
    } else {
        OutputStyle::Rich
    }
}

pub(crate) fn render_status_line(style: OutputStyle, status: &str, message: &str) -> String {
    match style {
        OutputStyle::Plain => message.to_string(),
        OutputStyle::Rich => format!("{} {message}", status_badge(status)),
    }
}

fn status_badge(status: &str) -> &'static str {
    match status {
        "ok" => "[OK]",
        "warn" => "[WARN]",
        "err" => "[ERR]",
        _ => "[..]",
    }
}

pub(crate) fn render_section_header(style: OutputStyle, title: &str) -> String {
    match style {
        OutputStyle::Plain => format!("{title}:"),
        OutputStyle::Rich => colorize(section_style(), &format!("== {title} ==")),
    }
}

pub(crate) fn format_report_lines(report: &Report, style: OutputStyle) -> Vec<String> {
    let mut lines = report
        .entries
        .iter()
        .map(|entry| {
            let (status, message) = describe_entry(entry);
            render_status_line(style, status, &message)
        })
        .collect::<Vec<_>>();
    lines.extend(
        report
            .errors
            .iter()
            .map(|error| render_status_line(style, "err", error)),
    );
    lines
}

pub(crate) fn format_summary_line(report: &Report, style: OutputStyle) -> String {
    let summary = report.summary();
    let verb = report.transition.as_str();
    let line = format!(
        "{verb} finished: {} changed, {} unchanged, {} kept, {} failed",
        summary.changed, summary.unchanged, summary.kept, summary.failed
    );
    match style {
        OutputStyle::Plain => line,
        OutputStyle::Rich if summary.failed > 0 => colorize(failure_style(), &line),
        OutputStyle::Rich => colorize(success_style(), &line),
    }
}

pub(crate) fn format_registration_line(
    style: OutputStyle,
    outcome: RegistrationOutcome,
    path: &std::path::Path,
) -> String {
    match outcome {
        RegistrationOutcome::AlreadyRegistered => render_status_line(
            style,
            "info",
            &format!("update manager already registered in {}", path.display()),
        ),
        RegistrationOutcome::Appended { lines } => render_status_line(
            style,
            "ok",
            &format!(
                "registered update manager in {} ({lines} lines appended)",
                path.display()
            ),
        ),
    }
}

fn describe_entry(entry: &ArtifactReport) -> (&'static str, String) {
    let path = entry.destination.display();
    match &entry.outcome {
        ArtifactOutcome::Linked => ("ok", format!("linked {path}")),
        ArtifactOutcome::Copied => ("ok", format!("copied {path}")),
        ArtifactOutcome::AlreadyLinked => ("info", format!("already linked {path}")),
        ArtifactOutcome::Exists => ("info", format!("already present {path}")),
        ArtifactOutcome::ExistsUpdateManually => {
            ("warn", format!("{path} exists, update manually"))
        }
        ArtifactOutcome::Removed => ("ok", format!("removed {path}")),
        ArtifactOutcome::NotPresent => ("warn", format!("{path} not present")),
        ArtifactOutcome::Kept { reason } => ("warn", format!("kept {path} ({reason})")),
        ArtifactOutcome::Failed { reason } => ("err", reason.clone()),
    }
}

fn section_style() -> Style {
    Style::new()
        .fg_color(Some(AnsiColor::BrightBlue.into()))
        .effects(Effects::BOLD)
}

fn success_style() -> Style {
    Style::new()
        .fg_color(Some(AnsiColor::BrightGreen.into()))
        .effects(Effects::BOLD)
}

fn failure_style() -> Style {
    Style::new()
        .fg_color(Some(AnsiColor::BrightRed.into()))
        .effects(Effects::BOLD)
}

fn colorize(style: Style, text: &str) -> String {
    format!("{}{}{}", style.render(), text, style.render_reset())
}

use super::*;
use std::collections::BTreeMap;
use std::fs;
use std::io::Cursor;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

use smuff_core::ArtifactKind;
use smuff_installer::{ArtifactOutcome, RegistrationOutcome, Report, Transition};

use crate::dispatch::RunOutcome;
use crate::render::{format_registration_line, format_report_lines, format_summary_line};

static TEST_ROOT_COUNTER: AtomicU64 = AtomicU64::new(0);

const REGISTRATION_TEMPLATE: &str =
    "[update_manager smuff]\ntype: git_repo\npath: ~/SMuFF-Klipper\nprimary_branch: main\n";

struct Host {
    root: PathBuf,
    config: DeployConfig,
}

impl Host {
    /// A home directory with one `printer_data` instance, the `z-bolt` theme
    /// and a distribution whose `deploy.toml` keeps the log inside the test
    /// root.
    fn new() -> Self {
        let root = build_test_root();
        let home = root.join("home");
        let dist = home.join("SMuFF-Klipper");
        let config = DeployConfig::new(&home, &dist);

        write_file(&dist.join("klippy/extras/smuff.py"), "# smuff module\n");
        write_file(&dist.join("config/smuff.cfg"), "[smuff]\n");
        write_file(&dist.join("icons/smuff.svg"), "<svg/>");
        write_file(&dist.join("moonraker_update.txt"), REGISTRATION_TEMPLATE);
        write_file(
            &dist.join("deploy.toml"),
            &format!(
                r#"
registration_template = "moonraker_update.txt"
themes = ["z-bolt"]

[[artifacts]]
kind = "linked-module"
source = "klippy/extras/smuff.py"

[[artifacts]]
kind = "config-fragment"
source = "config/smuff.cfg"

[[artifacts]]
kind = "theme-icon"
source = "icons/smuff.svg"

[[artifacts]]
kind = "log-link"
source = "{}"
"#,
                root.join("tmp").join("smuff.log").display()
            ),
        );
        fs::create_dir_all(root.join("tmp")).expect("must create tmp dir");

        fs::create_dir_all(config.module_dir()).expect("must create module dir");
        fs::create_dir_all(config.styles_root().join("z-bolt")).expect("must create theme");
        let data = home.join("printer_data");
        fs::create_dir_all(data.join("config")).expect("must create config dir");
        fs::create_dir_all(data.join("logs")).expect("must create logs dir");
        write_file(&data.join("config/moonraker.conf"), "[server]\nhost: 0.0.0.0\n");

        Self { root, config }
    }

    fn config_dir(&self) -> PathBuf {
        self.config.home().join("printer_data").join("config")
    }

    fn run(&self, mode: Mode, input: &str) -> (RunOutcome, String) {
        let mut prompter = Prompter::new(Cursor::new(input.as_bytes().to_vec()), Vec::new());
        let outcome = run_mode(mode, &self.config, &mut prompter, OutputStyle::Plain)
            .expect("run must succeed");
        let output = String::from_utf8(prompter.into_output()).expect("output must be utf-8");
        (outcome, output)
    }
}

impl Drop for Host {
    fn drop(&mut self) {
        let _ = fs::remove_dir_all(&self.root);
    }
}

fn build_test_root() -> PathBuf {
    let nanos = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .expect("system time")
        .as_nanos();
    let sequence = TEST_ROOT_COUNTER.fetch_add(1, Ordering::Relaxed);
    std::env::temp_dir().join(format!(
        "smuff-cli-tests-{}-{}-{}",
        std::process::id(),
        nanos,
        sequence
    ))
}

fn write_file(path: &Path, content: &str) {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).expect("must create parent dir");
    }
    fs::write(path, content).expect("must write file");
}

fn snapshot(root: &Path) -> BTreeMap<PathBuf, String> {
    let mut entries = BTreeMap::new();
    let mut pending = vec![root.to_path_buf()];
    while let Some(dir) = pending.pop() {
        for entry in fs::read_dir(&dir).expect("must read dir") {
            let path = entry.expect("must read entry").path();
            let metadata = fs::symlink_metadata(&path).expect("must stat entry");
            let description = if metadata.file_type().is_symlink() {
                format!("link:{}", fs::read_link(&path).expect("must read link").display())
            } else if metadata.is_dir() {
                pending.push(path.clone());
                "dir".to_string()
            } else {
                format!("file:{}", fs::read_to_string(&path).unwrap_or_default())
            };
            entries.insert(path, description);
        }
    }
    entries
}

#[test]
fn render_status_line_plain_has_no_badge() {
    assert_eq!(
        render_status_line(OutputStyle::Plain, "ok", "linked /tmp/x"),
        "linked /tmp/x"
    );
}

#[test]
fn render_status_line_rich_uses_badges() {
    assert_eq!(
        render_status_line(OutputStyle::Rich, "ok", "done"),
        "[OK] done"
    );
    assert_eq!(
        render_status_line(OutputStyle::Rich, "warn", "careful"),
        "[WARN] careful"
    );
    assert_eq!(
        render_status_line(OutputStyle::Rich, "err", "broken"),
        "[ERR] broken"
    );
    assert_eq!(
        render_status_line(OutputStyle::Rich, "info", "note"),
        "[..] note"
    );
}

#[test]
fn report_lines_describe_each_outcome() {
    let mut report = Report::new(Transition::Install);
    report.record(
        ArtifactKind::LinkedModule,
        PathBuf::from("/extras/smuff.py"),
        ArtifactOutcome::Linked,
    );
    report.record(
        ArtifactKind::ConfigFragment,
        PathBuf::from("/config/smuff.cfg"),
        ArtifactOutcome::ExistsUpdateManually,
    );
    report.record(
        ArtifactKind::LogLink,
        PathBuf::from("/logs/smuff.log"),
        ArtifactOutcome::Failed {
            reason: "failed to create symlink".to_string(),
        },
    );
    report.errors.push("module directory missing".to_string());

    let lines = format_report_lines(&report, OutputStyle::Plain);
    assert_eq!(
        lines,
        vec![
            "linked /extras/smuff.py",
            "/config/smuff.cfg exists, update manually",
            "failed to create symlink",
            "module directory missing",
        ]
    );
    assert_eq!(
        format_summary_line(&report, OutputStyle::Plain),
        "install finished: 1 changed, 1 unchanged, 0 kept, 2 failed"
    );
}

#[test]
fn registration_line_reports_appended_lines() {
    let line = format_registration_line(
        OutputStyle::Plain,
        RegistrationOutcome::Appended { lines: 4 },
        Path::new("/config/moonraker.conf"),
    );
    assert_eq!(
        line,
        "registered update manager in /config/moonraker.conf (4 lines appended)"
    );
}

#[test]
fn run_outcome_maps_to_exit_code() {
    let code = |outcome: RunOutcome| format!("{:?}", outcome.exit_code());
    let success = format!("{:?}", ExitCode::SUCCESS);
    assert_eq!(code(RunOutcome::Completed), success);
    assert_eq!(code(RunOutcome::Declined), success);
    assert_eq!(
        code(RunOutcome::CompletedWithFailures),
        format!("{:?}", ExitCode::FAILURE)
    );
}

#[test]
fn install_deploys_artifacts_and_registers_updater() {
    let host = Host::new();
    let (outcome, output) = host.run(Mode::Install, "\ny\n");

    assert_eq!(outcome, RunOutcome::Completed);
    assert!(output.contains("1) printer (default)"));
    assert!(output.contains("install finished: 4 changed, 0 unchanged, 0 kept, 0 failed"));

    let module = host.config.module_dir().join("smuff.py");
    assert_eq!(
        fs::read_link(&module).expect("module must be a link"),
        host.config.dist_dir().join("klippy/extras/smuff.py")
    );
    assert!(host.config_dir().join("smuff.cfg").is_file());
    assert!(host
        .config
        .styles_root()
        .join("z-bolt/images/smuff.svg")
        .is_file());
    let moonraker =
        fs::read_to_string(host.config_dir().join("moonraker.conf")).expect("must read conf");
    assert!(moonraker.starts_with("[server]\nhost: 0.0.0.0\n"));
    assert!(moonraker.contains("[update_manager smuff]"));
}

#[test]
fn second_install_changes_nothing() {
    let host = Host::new();
    host.run(Mode::Install, "\ny\n");
    let before = snapshot(&host.root);

    let (outcome, output) = host.run(Mode::Install, "1\ny\n");

    assert_eq!(outcome, RunOutcome::Completed);
    assert!(output.contains("update manager already registered"));
    assert!(output.contains("install finished: 0 changed, 4 unchanged, 0 kept, 0 failed"));
    assert_eq!(snapshot(&host.root), before);
}

#[test]
fn install_without_registration_file_changes_nothing() {
    let host = Host::new();
    fs::remove_file(host.config_dir().join("moonraker.conf")).expect("must remove conf");
    let before = snapshot(&host.root);

    let mut prompter = Prompter::new(Cursor::new(b"\ny\n".to_vec()), Vec::new());
    let err = run_mode(Mode::Install, &host.config, &mut prompter, OutputStyle::Plain)
        .expect_err("install must fail");

    assert!(matches!(
        err.downcast_ref::<DeployError>(),
        Some(DeployError::RegistrationFileMissing(_))
    ));
    assert_eq!(snapshot(&host.root), before);
}

#[test]
fn install_without_distribution_fails_before_prompting() {
    let host = Host::new();
    fs::remove_dir_all(host.config.dist_dir()).expect("must remove dist");

    let mut prompter = Prompter::new(Cursor::new(Vec::new()), Vec::new());
    let err = run_mode(Mode::Install, &host.config, &mut prompter, OutputStyle::Plain)
        .expect_err("install must fail");

    assert!(matches!(
        err.downcast_ref::<DeployError>(),
        Some(DeployError::MissingDirectory(_))
    ));
    assert!(prompter.into_output().is_empty());
}

#[test]
fn declined_uninstall_leaves_host_untouched() {
    let host = Host::new();
    host.run(Mode::Install, "\ny\n");
    let before = snapshot(&host.root);

    let (outcome, output) = host.run(Mode::Uninstall, "n\n");

    assert_eq!(outcome, RunOutcome::Declined);
    assert!(output.contains("uninstall cancelled"));
    assert_eq!(snapshot(&host.root), before);
}

#[test]
fn uninstall_removes_installed_artifacts_and_keeps_distribution() {
    let host = Host::new();
    host.run(Mode::Install, "\ny\n");

    let (outcome, output) = host.run(Mode::Uninstall, "y\n\ny\nn\n");

    assert_eq!(outcome, RunOutcome::Completed);
    assert!(fs::symlink_metadata(host.config.module_dir().join("smuff.py")).is_err());
    assert!(!host.config_dir().join("smuff.cfg").exists());
    assert!(fs::symlink_metadata(host.config.home().join("printer_data/logs/smuff.log")).is_err());
    assert!(host
        .config
        .styles_root()
        .join("z-bolt/images/smuff.svg")
        .is_file());
    assert!(output.contains("remove the [update_manager smuff] section"));
    assert!(host.config.dist_dir().is_dir());
}

#[test]
fn uninstall_asks_before_removing_edited_fragment() {
    let host = Host::new();
    host.run(Mode::Install, "\ny\n");
    let fragment = host.config_dir().join("smuff.cfg");
    fs::write(&fragment, "[smuff]\nserial=/dev/ttyUSB0\n").expect("must edit fragment");

    let (_, output) = host.run(Mode::Uninstall, "y\n\ny\nn\nn\n");

    assert!(output.contains("was not verified as installed by this tool"));
    assert_eq!(
        fs::read_to_string(&fragment).expect("fragment must remain"),
        "[smuff]\nserial=/dev/ttyUSB0\n"
    );
}

#[test]
fn uninstall_can_delete_distribution() {
    let host = Host::new();
    host.run(Mode::Install, "\ny\n");

    let (outcome, output) = host.run(Mode::Uninstall, "y\n\ny\ny\n");

    assert_eq!(outcome, RunOutcome::Completed);
    assert!(!host.config.dist_dir().exists());
    assert!(output.contains("removed"));
}

#[test]
fn closed_input_aborts_selection() {
    let host = Host::new();
    let mut prompter = Prompter::new(Cursor::new(Vec::new()), Vec::new());
    let err = run_mode(Mode::Install, &host.config, &mut prompter, OutputStyle::Plain)
        .expect_err("closed input must abort");

    assert!(matches!(
        err.downcast_ref::<DeployError>(),
        Some(DeployError::InputClosed)
    ));
    assert!(!host.config_dir().join("smuff.cfg").exists());
}

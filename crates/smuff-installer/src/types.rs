use std::path::PathBuf;

use smuff_core::ArtifactKind;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    Install,
    Uninstall,
}

impl Transition {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Install => "install",
            Self::Uninstall => "uninstall",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ArtifactOutcome {
    Linked,
    Copied,
    AlreadyLinked,
    /// Destination exists and the steady state is reached.
    Exists,
    /// Destination exists and may differ from the shipped version.
    ExistsUpdateManually,
    Removed,
    NotPresent,
    /// Uninstall left the destination alone because the tool does not own it.
    Kept { reason: String },
    Failed { reason: String },
}

impl ArtifactOutcome {
    pub fn is_change(&self) -> bool {
        matches!(self, Self::Linked | Self::Copied | Self::Removed)
    }

    pub fn is_failure(&self) -> bool {
        matches!(self, Self::Failed { .. })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactReport {
    pub kind: ArtifactKind,
    pub destination: PathBuf,
    pub outcome: ArtifactOutcome,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReportSummary {
    pub changed: usize,
    pub unchanged: usize,
    pub kept: usize,
    pub failed: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Report {
    pub transition: Transition,
    pub entries: Vec<ArtifactReport>,
    /// Failures that do not belong to one artifact, e.g. the receipt write.
    pub errors: Vec<String>,
}

impl Report {
    pub fn new(transition: Transition) -> Self {
        Self {
            transition,
            entries: Vec::new(),
            errors: Vec::new(),
        }
    }

    pub fn record(&mut self, kind: ArtifactKind, destination: PathBuf, outcome: ArtifactOutcome) {
        self.entries.push(ArtifactReport {
            kind,
            destination,
            outcome,
        });
    }

    pub fn has_failures(&self) -> bool {
        !self.errors.is_empty() || self.entries.iter().any(|entry| entry.outcome.is_failure())
    }

    pub fn summary(&self) -> ReportSummary {
        let mut summary = ReportSummary {
            failed: self.errors.len(),
            ..ReportSummary::default()
        };
        for entry in &self.entries {
            match &entry.outcome {
                outcome if outcome.is_change() => summary.changed += 1,
                ArtifactOutcome::Failed { .. } => summary.failed += 1,
                ArtifactOutcome::Kept { .. } => summary.kept += 1,
                _ => summary.unchanged += 1,
            }
        }
        summary
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FragmentRecord {
    pub name: String,
    pub sha256: String,
}

/// Provenance of the config fragments a previous install copied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeployReceipt {
    pub instance: String,
    pub fragments: Vec<FragmentRecord>,
    pub installed_at_unix: u64,
}

impl DeployReceipt {
    pub fn fragment(&self, name: &str) -> Option<&FragmentRecord> {
        self.fragments.iter().find(|record| record.name == name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegistrationOutcome {
    AlreadyRegistered,
    Appended { lines: usize },
}

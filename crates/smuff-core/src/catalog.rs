use std::collections::HashSet;
use std::path::{Component, Path, PathBuf};

use anyhow::{anyhow, Context};
use serde::Deserialize;

use crate::instance::Instance;

#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "kebab-case")]
pub enum ArtifactKind {
    LinkedModule,
    ConfigFragment,
    ThemeIcon,
    LogLink,
}

impl ArtifactKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::LinkedModule => "linked-module",
            Self::ConfigFragment => "config-fragment",
            Self::ThemeIcon => "theme-icon",
            Self::LogLink => "log-link",
        }
    }

    pub fn default_policy(self) -> ConflictPolicy {
        match self {
            Self::ConfigFragment => ConflictPolicy::OverwriteNever,
            Self::LinkedModule | Self::ThemeIcon | Self::LogLink => ConflictPolicy::SkipIfExists,
        }
    }
}

/// What happens when the destination already exists. Neither policy ever
/// replaces it; they differ in how the skip is reported.
#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "kebab-case")]
pub enum ConflictPolicy {
    /// Existing destination is the expected steady state.
    SkipIfExists,
    /// Existing destination may hold user edits; the operator updates it by hand.
    OverwriteNever,
}

/// Host directories that do not belong to any single instance.
#[derive(Debug, Clone, Copy)]
pub struct HostDirs<'a> {
    pub module_dir: &'a Path,
}

#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct Artifact {
    pub kind: ArtifactKind,
    /// Relative to the distribution directory, except for log links where it
    /// is the absolute path of the backing log file.
    pub source: PathBuf,
    pub name: Option<String>,
    pub policy: Option<ConflictPolicy>,
}

impl Artifact {
    pub fn new(kind: ArtifactKind, source: impl Into<PathBuf>) -> Self {
        Self {
            kind,
            source: source.into(),
            name: None,
            policy: None,
        }
    }

    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn file_name(&self) -> String {
        if let Some(name) = &self.name {
            return name.clone();
        }
        self.source
            .file_name()
            .map(|value| value.to_string_lossy().into_owned())
            .unwrap_or_default()
    }

    pub fn policy(&self) -> ConflictPolicy {
        self.policy.unwrap_or_else(|| self.kind.default_policy())
    }

    pub fn source_path(&self, dist_dir: &Path) -> PathBuf {
        if self.source.is_absolute() {
            return self.source.clone();
        }
        dist_dir.join(&self.source)
    }

    /// Destination for every kind except theme icons, which have one
    /// destination per existing theme (see [`Artifact::theme_destination`]).
    pub fn destination(&self, instance: &Instance, host: &HostDirs<'_>) -> Option<PathBuf> {
        let file_name = self.file_name();
        match self.kind {
            ArtifactKind::LinkedModule => Some(host.module_dir.join(file_name)),
            ArtifactKind::ConfigFragment => Some(instance.config_path.join(file_name)),
            ArtifactKind::LogLink => Some(instance.logs_path.join(file_name)),
            ArtifactKind::ThemeIcon => None,
        }
    }

    pub fn theme_destination(&self, theme_dir: &Path) -> PathBuf {
        theme_dir.join("images").join(self.file_name())
    }
}

#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct Catalog {
    pub registration_template: PathBuf,
    #[serde(default)]
    pub themes: Vec<String>,
    #[serde(default)]
    pub artifacts: Vec<Artifact>,
}

impl Catalog {
    pub fn smuff_default() -> Self {
        Self {
            registration_template: PathBuf::from("moonraker_update.txt"),
            themes: [
                "z-bolt",
                "colorized",
                "material-dark",
                "material-darker",
                "material-light",
            ]
            .into_iter()
            .map(str::to_string)
            .collect(),
            artifacts: vec![
                Artifact::new(ArtifactKind::LinkedModule, "klippy/extras/smuff.py"),
                Artifact::new(ArtifactKind::LinkedModule, "klippy/extras/smuff_core.py"),
                Artifact::new(ArtifactKind::ConfigFragment, "config/smuff.cfg"),
                Artifact::new(ArtifactKind::ConfigFragment, "config/smuff-macros.cfg"),
                Artifact::new(ArtifactKind::ThemeIcon, "KlipperScreen/styles/icons/smuff.svg"),
                Artifact::new(
                    ArtifactKind::ThemeIcon,
                    "KlipperScreen/styles/icons/smuff-tool.svg",
                ),
                Artifact::new(ArtifactKind::LogLink, "/tmp/smuff.log"),
            ],
        }
    }

    pub fn from_toml_str(input: &str) -> anyhow::Result<Self> {
        let catalog: Self = toml::from_str(input).context("failed to parse deploy catalog")?;
        catalog.validate()?;
        Ok(catalog)
    }

    pub fn artifacts_of(&self, kind: ArtifactKind) -> impl Iterator<Item = &Artifact> {
        self.artifacts
            .iter()
            .filter(move |artifact| artifact.kind == kind)
    }

    fn validate(&self) -> anyhow::Result<()> {
        validate_relative_source(&self.registration_template)
            .context("invalid registration_template")?;

        let mut seen = HashSet::new();
        for artifact in &self.artifacts {
            let file_name = artifact.file_name();
            if file_name.trim().is_empty() {
                return Err(anyhow!(
                    "{} artifact '{}' has no file name",
                    artifact.kind.as_str(),
                    artifact.source.display()
                ));
            }
            if file_name.contains('/') || file_name.contains('\\') {
                return Err(anyhow!(
                    "artifact name '{file_name}' must not contain path separators"
                ));
            }
            if !seen.insert((artifact.kind, file_name.clone())) {
                return Err(anyhow!(
                    "duplicate {} artifact '{file_name}'",
                    artifact.kind.as_str()
                ));
            }

            match artifact.kind {
                ArtifactKind::LogLink => {
                    if !artifact.source.is_absolute() {
                        return Err(anyhow!(
                            "log link backing file must be absolute: {}",
                            artifact.source.display()
                        ));
                    }
                }
                _ => validate_relative_source(&artifact.source).with_context(|| {
                    format!("invalid source for artifact '{file_name}'")
                })?,
            }
        }

        if self.artifacts_of(ArtifactKind::LogLink).count() > 1 {
            return Err(anyhow!("at most one log-link artifact may be declared"));
        }

        for theme in &self.themes {
            if theme.trim().is_empty() || theme.contains('/') || theme == ".." {
                return Err(anyhow!("invalid theme name '{theme}'"));
            }
        }
        Ok(())
    }
}

fn validate_relative_source(path: &Path) -> anyhow::Result<()> {
    if path.as_os_str().is_empty() {
        return Err(anyhow!("source path must not be empty"));
    }
    if path.is_absolute() {
        return Err(anyhow!(
            "source path must be relative to the distribution directory: {}",
            path.display()
        ));
    }
    if path
        .components()
        .any(|component| matches!(component, Component::ParentDir))
    {
        return Err(anyhow!(
            "source path must not escape the distribution directory: {}",
            path.display()
        ));
    }
    Ok(())
}

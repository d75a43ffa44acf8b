use anyhow::anyhow;

/// Lines appended verbatim to the host's update-manager configuration.
///
/// The first non-blank line is the section header and doubles as the marker
/// that tells an already-registered file apart from a fresh one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegistrationBlock {
    lines: Vec<String>,
    marker: String,
}

impl RegistrationBlock {
    pub fn parse(raw: &str) -> anyhow::Result<Self> {
        let lines = raw.lines().map(str::to_string).collect::<Vec<_>>();
        let marker = lines
            .iter()
            .map(|line| line.trim())
            .find(|line| !line.is_empty())
            .ok_or_else(|| anyhow!("registration template is empty"))?
            .to_string();
        if !(marker.starts_with('[') && marker.ends_with(']')) {
            return Err(anyhow!(
                "registration template must start with a section header, found '{marker}'"
            ));
        }
        Ok(Self { lines, marker })
    }

    pub fn marker(&self) -> &str {
        &self.marker
    }

    pub fn lines(&self) -> &[String] {
        &self.lines
    }

    /// True when some line of `content` equals the marker, ignoring
    /// surrounding whitespace.
    /// Matches the marker on a line of its own, ignoring surrounding
    /// whitespace and a trailing `#` or `;` comment.
    pub fn is_present_in(&self, content: &str) -> bool {
        content
            .lines()
            .map(|line| strip_inline_comment(line).trim())
            .any(|line| line == self.marker)
    }
}

fn strip_inline_comment(line: &str) -> &str {
    match line.find(['#', ';']) {
        Some(index) => &line[..index],
        None => line,
    }
}

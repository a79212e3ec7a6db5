use std::fmt;
use std::str::FromStr;

use anyhow::bail;

/// A single package specifier, exactly as written in a requirements file.
///
/// The raw text is handed to the installer untouched; the accessors below
/// only exist so pins can be compared against what pip reports.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RequirementSpec {
    raw: String,
}

/// Characters that end the distribution name in a requirement line.
const NAME_TERMINATORS: &[char] = &['=', '>', '<', '!', '~', ';', '[', '@', ' ', '\t'];

impl RequirementSpec {
    /// Build a spec from an already filtered line. Callers must have rejected
    /// blank and comment lines.
    pub(crate) fn from_line(line: &str) -> Self {
        Self {
            raw: line.to_string(),
        }
    }

    pub fn as_str(&self) -> &str {
        &self.raw
    }

    /// Distribution name as written.
    pub fn name(&self) -> &str {
        let end = self.raw.find(NAME_TERMINATORS).unwrap_or(self.raw.len());
        &self.raw[..end]
    }

    /// Name normalized per PEP 503.
    pub fn normalized_name(&self) -> String {
        normalize_name(self.name())
    }

    /// Version of an exact `name==version` pin.
    pub fn pinned_version(&self) -> Option<&str> {
        let (_, rest) = self.raw.split_once("==")?;
        // "===" is arbitrary equality, not a pin we can compare
        if rest.starts_with('=') {
            return None;
        }
        let version = rest.split(|c: char| c == ';' || c == ',' || c.is_whitespace()).next()?;
        (!version.is_empty()).then_some(version)
    }
}

/// Lowercase and collapse runs of `-`, `_` and `.` into a single `-`.
pub fn normalize_name(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    let mut in_separator = false;
    for c in name.trim().chars() {
        if matches!(c, '-' | '_' | '.') {
            if !in_separator {
                out.push('-');
            }
            in_separator = true;
        } else {
            out.extend(c.to_lowercase());
            in_separator = false;
        }
    }
    out
}

impl FromStr for RequirementSpec {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let line = s.trim();
        if line.is_empty() {
            bail!("Empty package specifier");
        }
        if line.starts_with('#') {
            bail!("'{}' is a comment, not a package specifier", line);
        }
        Ok(Self::from_line(line))
    }
}

impl fmt::Display for RequirementSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

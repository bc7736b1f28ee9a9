use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::Arc;

use clap::ValueEnum;

use crate::error::ReleaseError;
use crate::logger::Logger;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct VersionTriple {
    pub major: u64,
    pub minor: u64,
    pub build: u64,
}

impl VersionTriple {
    pub fn new(major: u64, minor: u64, build: u64) -> Self {
        Self {
            major,
            minor,
            build,
        }
    }

    pub fn bumped(self, policy: IncrementPolicy) -> Self {
        match policy {
            IncrementPolicy::None => self,
            IncrementPolicy::Build => Self::new(self.major, self.minor, self.build.saturating_add(1)),
            IncrementPolicy::MinorCut => Self::new(self.major, self.minor.saturating_add(1), 0),
            IncrementPolicy::MajorCut => Self::new(self.major.saturating_add(1), 0, 0),
        }
    }
}

impl fmt::Display for VersionTriple {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.build)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseVersionError(String);

impl fmt::Display for ParseVersionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid version string '{}'", self.0)
    }
}

impl std::error::Error for ParseVersionError {}

impl FromStr for VersionTriple {
    type Err = ParseVersionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        let parts: Vec<&str> = trimmed.split('.').collect();
        if parts.len() != 3 {
            return Err(ParseVersionError(trimmed.to_string()));
        }

        let parse = |part: &str| {
            part.parse::<u64>()
                .map_err(|_| ParseVersionError(trimmed.to_string()))
        };

        Ok(Self::new(parse(parts[0])?, parse(parts[1])?, parse(parts[2])?))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IncrementPolicy {
    None,
    Build,
    MinorCut,
    MajorCut,
}

/// Version action as typed on the command line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum VersionAction {
    Skip,
    Build,
    Ver,
    Release,
}

/// Explicit increment kind passed with `--version-type`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum IncrementKind {
    Build,
    Ver,
    Release,
}

impl From<IncrementKind> for IncrementPolicy {
    fn from(kind: IncrementKind) -> Self {
        match kind {
            IncrementKind::Build => IncrementPolicy::Build,
            IncrementKind::Ver => IncrementPolicy::MinorCut,
            IncrementKind::Release => IncrementPolicy::MajorCut,
        }
    }
}

impl VersionAction {
    /// `override_kind` replaces the action's own increment unless the action is `skip`.
    pub fn policy(self, override_kind: Option<IncrementKind>) -> IncrementPolicy {
        let own = match self {
            VersionAction::Skip => return IncrementPolicy::None,
            VersionAction::Build => IncrementKind::Build,
            VersionAction::Ver => IncrementKind::Ver,
            VersionAction::Release => IncrementKind::Release,
        };

        override_kind.unwrap_or(own).into()
    }
}

impl fmt::Display for IncrementPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            IncrementPolicy::None => "none",
            IncrementPolicy::Build => "build",
            IncrementPolicy::MinorCut => "minor-cut",
            IncrementPolicy::MajorCut => "major-cut",
        };
        write!(f, "{}", name)
    }
}

/// The persisted version counter. A single writer is assumed; nothing locks the file.
#[derive(Debug, Clone)]
pub struct VersionStore {
    path: PathBuf,
    logger: Option<Arc<Logger>>,
}

impl VersionStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            logger: None,
        }
    }

    /// Unparseable version files are reported through `logger`.
    pub fn with_logger(mut self, logger: Arc<Logger>) -> Self {
        self.logger = Some(logger);
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// `Ok(None)` when the file is absent or unreadable, `Err` when it holds garbage.
    pub fn load(&self) -> Result<Option<VersionTriple>, ParseVersionError> {
        match fs::read_to_string(&self.path) {
            Ok(content) => content.parse().map(Some),
            Err(_) => Ok(None),
        }
    }

    /// Missing or unreadable content reads as `0.0.0`.
    pub fn read(&self) -> VersionTriple {
        match self.load() {
            Ok(version) => version.unwrap_or_default(),
            Err(e) => {
                if let Some(logger) = &self.logger {
                    logger.warn(&format!(
                        "{} in {}, starting from 0.0.0",
                        e,
                        self.path.display()
                    ));
                }
                VersionTriple::default()
            }
        }
    }

    pub fn write(&self, version: VersionTriple) -> Result<String, ReleaseError> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)
                    .map_err(|e| ReleaseError::io("Failed to create directory", parent, e))?;
            }
        }

        let version_str = version.to_string();
        fs::write(&self.path, &version_str)
            .map_err(|e| ReleaseError::io("Failed to write version file", &self.path, e))?;

        Ok(version_str)
    }

    pub fn increment(&self, policy: IncrementPolicy) -> Result<VersionTriple, ReleaseError> {
        let current = self.read();
        if policy == IncrementPolicy::None {
            return Ok(current);
        }

        let next = current.bumped(policy);
        self.write(next)?;
        Ok(next)
    }
}

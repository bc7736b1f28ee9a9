use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stage {
    Preflight,
    PrepareSettings,
    WebUiInstall,
    WebUiBundle,
    WebUiSync,
    Firmware,
    Filesystem,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StageKind {
    Precondition,
    ConditionalInstall,
    BuildInvocation,
    Sync,
}

#[derive(Debug, Clone)]
pub struct StageMetadata {
    pub description: String,
    pub kind: StageKind,
}

impl Stage {
    pub fn metadata(&self) -> StageMetadata {
        match self {
            Stage::Preflight => StageMetadata {
                description: "Checking required tools".to_string(),
                kind: StageKind::Precondition,
            },
            Stage::PrepareSettings => StageMetadata {
                description: "Preparing user settings".to_string(),
                kind: StageKind::Precondition,
            },
            Stage::WebUiInstall => StageMetadata {
                description: "Installing web UI dependencies".to_string(),
                kind: StageKind::ConditionalInstall,
            },
            Stage::WebUiBundle => StageMetadata {
                description: "Building Lightweight WebUI".to_string(),
                kind: StageKind::BuildInvocation,
            },
            Stage::WebUiSync => StageMetadata {
                description: "Deploying web UI assets".to_string(),
                kind: StageKind::Sync,
            },
            Stage::Firmware => StageMetadata {
                description: "Building Firmware".to_string(),
                kind: StageKind::BuildInvocation,
            },
            Stage::Filesystem => StageMetadata {
                description: "Building Filesystem".to_string(),
                kind: StageKind::BuildInvocation,
            },
        }
    }

    pub fn kind(&self) -> StageKind {
        self.metadata().kind
    }

    /// Stages run after the preflight check and the version bump, in order.
    pub fn pipeline() -> Vec<Stage> {
        vec![
            Stage::PrepareSettings,
            Stage::WebUiInstall,
            Stage::WebUiBundle,
            Stage::WebUiSync,
            Stage::Firmware,
            Stage::Filesystem,
        ]
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Preflight => "Preflight",
            Stage::PrepareSettings => "PrepareSettings",
            Stage::WebUiInstall => "WebUiInstall",
            Stage::WebUiBundle => "WebUiBundle",
            Stage::WebUiSync => "WebUiSync",
            Stage::Firmware => "Firmware",
            Stage::Filesystem => "Filesystem",
        };
        write!(f, "{}", name)
    }
}

use std::path::PathBuf;

use thiserror::Error;

pub const GENERIC_FAILURE_CODE: i32 = 1;

#[derive(Debug, Error)]
pub enum ReleaseError {
    #[error("Unknown board environment '{target}'")]
    UnknownTarget {
        target: String,
        supported: Vec<String>,
    },

    #[error("`{tool}` is not on PATH. {hint}")]
    MissingTool { tool: String, hint: String },

    #[error("Command failed with {}: {command}", exit_code_label(.exit_code))]
    StageFailure {
        command: String,
        exit_code: Option<i32>,
    },

    #[error("{action} {}: {source}", .path.display())]
    Io {
        action: &'static str,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),
}

impl ReleaseError {
    pub fn io(action: &'static str, path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        ReleaseError::Io {
            action,
            path: path.into(),
            source,
        }
    }

    /// Process exit code for this failure. Stage failures mirror the child's code.
    pub fn exit_code(&self) -> i32 {
        match self {
            ReleaseError::StageFailure {
                exit_code: Some(code),
                ..
            } if *code != 0 => *code,
            _ => GENERIC_FAILURE_CODE,
        }
    }
}

fn exit_code_label(code: &Option<i32>) -> String {
    match code {
        Some(code) => format!("exit code {}", code),
        None => "no exit code (terminated by signal)".to_string(),
    }
}

use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};

use crate::board::Board;

/// One external process invocation. `env` is layered over the parent environment of the
/// child only.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildStep {
    pub description: String,
    pub program: PathBuf,
    pub args: Vec<String>,
    pub cwd: PathBuf,
    pub env: BTreeMap<String, String>,
}

impl BuildStep {
    pub fn new(description: String, program: PathBuf, args: Vec<String>, cwd: PathBuf) -> Self {
        Self {
            description,
            program,
            args,
            cwd,
            env: BTreeMap::new(),
        }
    }

    pub fn with_env(mut self, key: &str, value: &str) -> Self {
        self.env.insert(key.to_string(), value.to_string());
        self
    }

    pub fn with_envs(mut self, env: &BTreeMap<String, String>) -> Self {
        self.env
            .extend(env.iter().map(|(k, v)| (k.clone(), v.clone())));
        self
    }

    pub fn command_line(&self) -> String {
        let mut line = self.program.display().to_string();
        for arg in &self.args {
            line.push(' ');
            line.push_str(arg);
        }
        line
    }
}

impl fmt::Display for BuildStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "> {} (cwd={})", self.command_line(), self.cwd.display())
    }
}

#[derive(Debug, Clone)]
pub struct PlatformIoCommands {
    pio: PathBuf,
    chip_family_var: String,
}

impl PlatformIoCommands {
    pub fn new(pio: PathBuf, chip_family_var: String) -> Self {
        Self {
            pio,
            chip_family_var,
        }
    }

    pub fn firmware_step(&self, root: &Path, board: &Board) -> BuildStep {
        BuildStep::new(
            format!("Building Firmware for {}", board.target),
            self.pio.clone(),
            self.run_args(&board.target),
            root.to_path_buf(),
        )
        .with_env(&self.chip_family_var, &board.chip_family)
    }

    pub fn filesystem_step(&self, root: &Path, board: &Board) -> BuildStep {
        let mut args = self.run_args(&board.target);
        args.push("-t".to_string());
        args.push("buildfs".to_string());

        BuildStep::new(
            "Building Filesystem".to_string(),
            self.pio.clone(),
            args,
            root.to_path_buf(),
        )
        .with_env(&self.chip_family_var, &board.chip_family)
    }

    pub fn rebuild_step(
        &self,
        root: &Path,
        target: &str,
        chip_family: &str,
        extra_env: &BTreeMap<String, String>,
    ) -> BuildStep {
        BuildStep::new(
            format!("Rebuilding ELF for {}", target),
            self.pio.clone(),
            self.run_args(target),
            root.to_path_buf(),
        )
        .with_env(&self.chip_family_var, chip_family)
        .with_envs(extra_env)
    }

    fn run_args(&self, target: &str) -> Vec<String> {
        vec!["run".to_string(), "-e".to_string(), target.to_string()]
    }
}

#[derive(Debug, Clone)]
pub struct WebUiCommands {
    npm: PathBuf,
    node: PathBuf,
}

impl WebUiCommands {
    pub fn new(npm: PathBuf, node: PathBuf) -> Self {
        Self { npm, node }
    }

    pub fn install_step(&self, webui_dir: &Path) -> BuildStep {
        BuildStep::new(
            "Installing web UI dependencies".to_string(),
            self.npm.clone(),
            vec!["install".to_string()],
            webui_dir.to_path_buf(),
        )
    }

    pub fn bundle_step(&self, webui_dir: &Path) -> BuildStep {
        BuildStep::new(
            "Building Lightweight WebUI".to_string(),
            self.node.clone(),
            vec!["build.js".to_string()],
            webui_dir.to_path_buf(),
        )
    }
}

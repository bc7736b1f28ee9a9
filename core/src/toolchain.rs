use std::ffi::OsString;
use std::path::{Path, PathBuf};

use crate::config::ToolsConfig;
use crate::error::ReleaseError;

/// Resolved absolute paths of the external tools the pipeline drives.
#[derive(Debug, Clone)]
pub struct Toolchain {
    pub npm: PathBuf,
    pub node: PathBuf,
    pub platformio: PathBuf,
}

pub struct ToolLocator {
    search_path: Option<OsString>,
    cwd: PathBuf,
}

impl ToolLocator {
    pub fn new(tools: &ToolsConfig, cwd: &Path) -> Self {
        let search_path = tools
            .search_path
            .as_ref()
            .map(OsString::from)
            .or_else(|| std::env::var_os("PATH"));

        Self {
            search_path,
            cwd: cwd.to_path_buf(),
        }
    }

    pub fn locate(&self, name: &str) -> Result<PathBuf, ReleaseError> {
        which::which_in(name, self.search_path.as_ref(), &self.cwd).map_err(|_| {
            ReleaseError::MissingTool {
                tool: name.to_string(),
                hint: install_hint(name),
            }
        })
    }

    /// First candidate found wins, e.g. `pio` before `platformio`.
    pub fn locate_any(&self, candidates: &[String]) -> Result<PathBuf, ReleaseError> {
        candidates
            .iter()
            .find_map(|name| self.locate(name).ok())
            .ok_or_else(|| {
                let tool = candidates.join("` or `");
                ReleaseError::MissingTool {
                    hint: candidates
                        .first()
                        .map(|name| install_hint(name))
                        .unwrap_or_default(),
                    tool,
                }
            })
    }
}

impl Toolchain {
    /// Precondition check run before anything touches the project tree.
    pub fn discover(tools: &ToolsConfig, cwd: &Path) -> Result<Self, ReleaseError> {
        let locator = ToolLocator::new(tools, cwd);

        Ok(Self {
            npm: locator.locate(&tools.npm)?,
            node: locator.locate(&tools.node)?,
            platformio: locator.locate_any(&tools.platformio)?,
        })
    }
}

fn install_hint(name: &str) -> String {
    let base = name.trim_end_matches(".cmd").trim_end_matches(".exe");
    match base {
        "npm" | "node" => "Please install Node.js (which includes npm) and try again.".to_string(),
        "pio" | "platformio" => "Install PlatformIO Core (pip install platformio) \
                                 and/or add its Scripts directory to PATH."
            .to_string(),
        _ => format!("Install `{}` or update your PATH.", name),
    }
}

use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use crate::board::{BoardEntry, BoardRegistry};
use crate::layout::ProjectLayout;
use crate::parser::LogLevel;
use crate::Cli;

pub const CONFIG_FILE_NAME: &str = "kiln.toml";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub release: ReleaseConfig,
    #[serde(default)]
    pub paths: PathsConfig,
    #[serde(default)]
    pub tools: ToolsConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub boards: BTreeMap<String, BoardEntry>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReleaseConfig {
    #[serde(default = "default_target")]
    pub default_target: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PathsConfig {
    #[serde(default = "default_webui_dir")]
    pub webui_dir: String,
    #[serde(default = "default_webui_staging_dir")]
    pub webui_staging_dir: String,
    #[serde(default = "default_webui_dest_dir")]
    pub webui_dest_dir: String,
    #[serde(default = "default_version_file")]
    pub version_file: String,
    #[serde(default = "default_settings_file")]
    pub settings_file: String,
    #[serde(default = "default_settings_template")]
    pub settings_template: String,
    #[serde(default = "default_build_dir")]
    pub build_dir: String,
    #[serde(default = "default_artifact_name")]
    pub artifact_name: String,
    #[serde(default = "default_distribution_dir")]
    pub distribution_dir: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolsConfig {
    #[serde(default = "default_npm")]
    pub npm: String,
    #[serde(default = "default_node")]
    pub node: String,
    #[serde(default = "default_platformio")]
    pub platformio: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub search_path: Option<String>,
    #[serde(default = "default_chip_family_var")]
    pub chip_family_var: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: LogLevel,
}

impl Default for ReleaseConfig {
    fn default() -> Self {
        Self {
            default_target: default_target(),
        }
    }
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            webui_dir: default_webui_dir(),
            webui_staging_dir: default_webui_staging_dir(),
            webui_dest_dir: default_webui_dest_dir(),
            version_file: default_version_file(),
            settings_file: default_settings_file(),
            settings_template: default_settings_template(),
            build_dir: default_build_dir(),
            artifact_name: default_artifact_name(),
            distribution_dir: default_distribution_dir(),
        }
    }
}

impl Default for ToolsConfig {
    fn default() -> Self {
        Self {
            npm: default_npm(),
            node: default_node(),
            platformio: default_platformio(),
            search_path: None,
            chip_family_var: default_chip_family_var(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

fn default_target() -> String {
    "esp32-s3-dev".to_string()
}

fn default_webui_dir() -> String {
    "webui_lite".to_string()
}

fn default_webui_staging_dir() -> String {
    "data_lite".to_string()
}

fn default_webui_dest_dir() -> String {
    "data/lite".to_string()
}

fn default_version_file() -> String {
    "data/.version".to_string()
}

fn default_settings_file() -> String {
    "data/user_settings.json".to_string()
}

fn default_settings_template() -> String {
    "data/user_settings.template.json".to_string()
}

fn default_build_dir() -> String {
    ".pio/build".to_string()
}

fn default_artifact_name() -> String {
    "firmware_merged.bin".to_string()
}

fn default_distribution_dir() -> String {
    "distributor/firmware".to_string()
}

fn default_npm() -> String {
    if cfg!(windows) { "npm.cmd" } else { "npm" }.to_string()
}

fn default_node() -> String {
    if cfg!(windows) { "node.exe" } else { "node" }.to_string()
}

fn default_platformio() -> Vec<String> {
    vec!["pio".to_string(), "platformio".to_string()]
}

fn default_chip_family_var() -> String {
    "CHIP_FAMILY".to_string()
}

fn default_log_level() -> LogLevel {
    LogLevel::Info
}

impl Config {
    /// Loads `kiln.toml` from `--config` or the project root; a missing file yields defaults.
    pub fn load_from_cli(cli: &Cli) -> anyhow::Result<Self> {
        let path = match &cli.config {
            Some(path) => Self::expand_path(&path.display().to_string()),
            None => cli.source_directory()?.join(CONFIG_FILE_NAME),
        };

        Self::load_from_file(path)
    }

    pub fn load_from_file<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let path = Self::expand_path(&path.as_ref().display().to_string());

        if !path.exists() {
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(&path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(config)
    }

    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> anyhow::Result<()> {
        let content = toml::to_string_pretty(self).context("Failed to serialize config to TOML")?;

        std::fs::write(path.as_ref(), content)
            .with_context(|| format!("Failed to write config file: {}", path.as_ref().display()))?;

        Ok(())
    }

    pub fn expand_path(path: &str) -> PathBuf {
        let expanded = shellexpand::tilde(path);
        PathBuf::from(expanded.as_ref())
    }

    pub fn registry(&self) -> BoardRegistry {
        BoardRegistry::builtin().with_overrides(&self.boards)
    }

    pub fn layout(&self, root: &Path) -> ProjectLayout {
        let resolve = |value: &str| {
            let path = Self::expand_path(value);
            if path.is_absolute() {
                path
            } else {
                root.join(path)
            }
        };

        ProjectLayout {
            root: root.to_path_buf(),
            webui_dir: resolve(&self.paths.webui_dir),
            webui_staging_dir: resolve(&self.paths.webui_staging_dir),
            webui_dest_dir: resolve(&self.paths.webui_dest_dir),
            version_file: resolve(&self.paths.version_file),
            settings_file: resolve(&self.paths.settings_file),
            settings_template: resolve(&self.paths.settings_template),
            build_dir: resolve(&self.paths.build_dir),
            artifact_name: self.paths.artifact_name.clone(),
            distribution_dir: resolve(&self.paths.distribution_dir),
        }
    }
}

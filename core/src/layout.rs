use std::path::{Path, PathBuf};

/// Absolute locations inside the firmware project, resolved from `[paths]`.
#[derive(Debug, Clone)]
pub struct ProjectLayout {
    pub root: PathBuf,
    pub webui_dir: PathBuf,
    pub webui_staging_dir: PathBuf,
    pub webui_dest_dir: PathBuf,
    pub version_file: PathBuf,
    pub settings_file: PathBuf,
    pub settings_template: PathBuf,
    pub build_dir: PathBuf,
    pub artifact_name: String,
    pub distribution_dir: PathBuf,
}

impl ProjectLayout {
    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn target_build_dir(&self, target: &str) -> PathBuf {
        self.build_dir.join(target)
    }

    pub fn artifact_path(&self, target: &str) -> PathBuf {
        self.target_build_dir(target).join(&self.artifact_name)
    }

    pub fn elf_path(&self, target: &str) -> PathBuf {
        self.target_build_dir(target).join("firmware.elf")
    }

    pub fn node_modules_dir(&self) -> PathBuf {
        self.webui_dir.join("node_modules")
    }

    pub fn slot_dir(&self, slot: &str) -> PathBuf {
        self.distribution_dir.join(slot)
    }
}

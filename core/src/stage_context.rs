use crate::{
    board::Board,
    command::{BuildStep, PlatformIoCommands, WebUiCommands},
    layout::ProjectLayout,
    stage::Stage,
    toolchain::Toolchain,
};

#[derive(Debug, Clone, PartialEq)]
pub enum StageResult {
    Success {
        duration: f64,
        steps_executed: usize,
    },
    Skipped {
        reason: String,
    },
}

impl StageResult {
    pub fn skipped(reason: impl Into<String>) -> Self {
        StageResult::Skipped {
            reason: reason.into(),
        }
    }

    pub fn is_skipped(&self) -> bool {
        matches!(self, StageResult::Skipped { .. })
    }
}

pub struct StageContext {
    board: Board,
    layout: ProjectLayout,
    pio: PlatformIoCommands,
    webui: WebUiCommands,
}

impl StageContext {
    pub fn new(
        board: Board,
        layout: ProjectLayout,
        toolchain: Toolchain,
        chip_family_var: String,
    ) -> Self {
        Self {
            board,
            layout,
            pio: PlatformIoCommands::new(toolchain.platformio, chip_family_var),
            webui: WebUiCommands::new(toolchain.npm, toolchain.node),
        }
    }

    pub fn board(&self) -> &Board {
        &self.board
    }

    pub fn layout(&self) -> &ProjectLayout {
        &self.layout
    }

    pub fn has_webui(&self) -> bool {
        self.layout.webui_dir.is_dir()
    }

    pub fn generate_steps_for_stage(&self, stage: Stage) -> Vec<BuildStep> {
        match stage {
            Stage::WebUiInstall => self.generate_install_steps(),
            Stage::WebUiBundle => self.generate_bundle_steps(),
            Stage::Firmware => vec![self.pio.firmware_step(self.layout.root(), &self.board)],
            Stage::Filesystem => vec![self.pio.filesystem_step(self.layout.root(), &self.board)],
            Stage::Preflight | Stage::PrepareSettings | Stage::WebUiSync => vec![],
        }
    }

    fn generate_install_steps(&self) -> Vec<BuildStep> {
        if !self.has_webui() || self.layout.node_modules_dir().exists() {
            return vec![];
        }

        vec![self.webui.install_step(&self.layout.webui_dir)]
    }

    fn generate_bundle_steps(&self) -> Vec<BuildStep> {
        if !self.has_webui() {
            return vec![];
        }

        vec![self.webui.bundle_step(&self.layout.webui_dir)]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Config;
    use std::path::PathBuf;

    fn create_test_context(root: &std::path::Path) -> StageContext {
        let board = Board {
            target: "esp32-dev".to_string(),
            chip_family: "ESP32".to_string(),
            slot: "esp32".to_string(),
        };
        let toolchain = Toolchain {
            npm: PathBuf::from("npm"),
            node: PathBuf::from("node"),
            platformio: PathBuf::from("pio"),
        };
        StageContext::new(
            board,
            Config::default().layout(root),
            toolchain,
            "CHIP_FAMILY".to_string(),
        )
    }

    #[test]
    fn test_webui_steps_absent_without_sources() {
        let dir = tempfile::tempdir().unwrap();
        let context = create_test_context(dir.path());

        assert!(context.generate_steps_for_stage(Stage::WebUiInstall).is_empty());
        assert!(context.generate_steps_for_stage(Stage::WebUiBundle).is_empty());
    }

    #[test]
    fn test_install_skipped_when_cache_is_warm() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("webui_lite")).unwrap();
        let context = create_test_context(dir.path());

        assert_eq!(context.generate_steps_for_stage(Stage::WebUiInstall).len(), 1);

        std::fs::create_dir_all(dir.path().join("webui_lite").join("node_modules")).unwrap();
        assert!(context.generate_steps_for_stage(Stage::WebUiInstall).is_empty());
        assert_eq!(context.generate_steps_for_stage(Stage::WebUiBundle).len(), 1);
    }

    #[test]
    fn test_firmware_steps_use_board() {
        let dir = tempfile::tempdir().unwrap();
        let context = create_test_context(dir.path());

        let steps = context.generate_steps_for_stage(Stage::Firmware);
        assert_eq!(steps.len(), 1);
        assert_eq!(steps[0].args, vec!["run", "-e", "esp32-dev"]);
        assert_eq!(steps[0].env["CHIP_FAMILY"], "ESP32");

        assert!(context.generate_steps_for_stage(Stage::WebUiSync).is_empty());
    }

    #[test]
    fn test_stage_result_helpers() {
        assert!(StageResult::skipped("no web UI").is_skipped());
        assert!(!StageResult::Success {
            duration: 1.5,
            steps_executed: 1
        }
        .is_skipped());
    }
}

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use crate::{
    board::{Board, BoardRegistry},
    config::ToolsConfig,
    error::ReleaseError,
    layout::ProjectLayout,
    logger::Logger,
    publish::{ArtifactPublisher, PublishResult},
    stage::Stage,
    stage_context::{StageContext, StageResult},
    stage_runner::StageRunner,
    toolchain::Toolchain,
    version::{IncrementPolicy, VersionStore, VersionTriple},
};

#[derive(Debug, Clone)]
pub struct ReleaseRequest {
    pub target: String,
    pub policy: IncrementPolicy,
}

#[derive(Debug, Clone)]
pub struct ReleaseReport {
    pub board: Board,
    pub version: VersionTriple,
    pub version_changed: bool,
    pub stages: Vec<(Stage, StageResult)>,
    pub publication: PublishResult,
    pub distribution_dir: PathBuf,
}

/// Drives one target from registry lookup to published artifact.
pub struct Release {
    registry: BoardRegistry,
    store: VersionStore,
    layout: ProjectLayout,
    tools: ToolsConfig,
    logger: Arc<Logger>,
}

impl Release {
    pub fn new(
        registry: BoardRegistry,
        store: VersionStore,
        layout: ProjectLayout,
        tools: ToolsConfig,
        logger: Arc<Logger>,
    ) -> Self {
        Self {
            registry,
            store: store.with_logger(Arc::clone(&logger)),
            layout,
            tools,
            logger,
        }
    }

    /// The version is bumped before the build stages and is kept even if a
    /// later stage fails.
    pub async fn run(&self, request: &ReleaseRequest) -> Result<ReleaseReport, ReleaseError> {
        let board = self.registry.resolve(&request.target)?;

        let preflight_start = Instant::now();
        let toolchain = Toolchain::discover(&self.tools, self.layout.root())?;
        let mut stages = vec![(
            Stage::Preflight,
            StageResult::Success {
                duration: preflight_start.elapsed().as_secs_f64(),
                steps_executed: 1,
            },
        )];

        let version = self.store.increment(request.policy)?;
        let version_changed = request.policy != IncrementPolicy::None;
        if version_changed {
            self.logger
                .info(&format!("Version incremented to: v{}", version));
        }

        let ctx = StageContext::new(
            board.clone(),
            self.layout.clone(),
            toolchain,
            self.tools.chip_family_var.clone(),
        );
        let runner = StageRunner::new(ctx, Arc::clone(&self.logger));
        stages.extend(runner.run(&Stage::pipeline()).await?);

        self.logger.section("Build Complete");
        self.logger.info(&format!(
            "Firmware and filesystem built successfully for {}",
            board.target
        ));

        let publisher = ArtifactPublisher::new(&self.layout.distribution_dir, &self.logger);
        let publication = publisher.publish(
            &self.layout.artifact_path(&board.target),
            self.registry.slot(&board.target),
            true,
        )?;

        Ok(ReleaseReport {
            distribution_dir: self.layout.slot_dir(&board.slot),
            board,
            version,
            version_changed,
            stages,
            publication,
        })
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use crate::board::BoardEntry;
    use crate::publish::SkipReason;
    use crate::toolchain::tests::write_script;
    use crate::Config;
    use std::collections::BTreeMap;
    use std::fs;
    use std::path::Path;

    struct Project {
        root: tempfile::TempDir,
        bin: tempfile::TempDir,
    }

    impl Project {
        fn new() -> Self {
            let project = Self {
                root: tempfile::tempdir().unwrap(),
                bin: tempfile::tempdir().unwrap(),
            };
            let log = project.log_path();
            write_script(project.bin.path(), "npm", "exit 0");
            write_script(project.bin.path(), "node", "exit 0");
            // Fake PlatformIO: `pio run -e <target> [-t buildfs]`.
            write_script(
                project.bin.path(),
                "pio",
                &format!(
                    "echo \"$* [$CHIP_FAMILY]\" >> {log}\n\
                     if [ -z \"$4\" ]; then\n\
                       mkdir -p .pio/build/$3\n\
                       printf 'merged-image' > .pio/build/$3/firmware_merged.bin\n\
                     fi",
                    log = log.display()
                ),
            );
            project
        }

        fn root(&self) -> &Path {
            self.root.path()
        }

        fn log_path(&self) -> PathBuf {
            self.bin.path().join("pio.log")
        }

        fn pio_calls(&self) -> Vec<String> {
            fs::read_to_string(self.log_path())
                .unwrap_or_default()
                .lines()
                .map(String::from)
                .collect()
        }

        fn config(&self) -> Config {
            let mut config = Config::default();
            config.tools.search_path = Some(self.bin.path().display().to_string());
            config
        }

        fn release_with(&self, config: Config, registry: BoardRegistry) -> Release {
            let layout = config.layout(self.root());
            Release::new(
                registry,
                VersionStore::new(layout.version_file.clone()),
                layout,
                config.tools.clone(),
                Arc::new(Logger::new().with_colors(false)),
            )
        }

        fn release(&self) -> Release {
            let config = self.config();
            let registry = config.registry();
            self.release_with(config, registry)
        }

        fn version_file(&self) -> PathBuf {
            self.root().join("data").join(".version")
        }
    }

    fn registry_with_family_x() -> BoardRegistry {
        let mut boards = BTreeMap::new();
        boards.insert(
            "bench-board".to_string(),
            BoardEntry {
                chip_family: "X".to_string(),
                slot: "bench".to_string(),
            },
        );
        BoardRegistry::new(boards)
    }

    #[tokio::test]
    async fn test_release_fresh_project() {
        let project = Project::new();
        let release = project.release_with(project.config(), registry_with_family_x());

        let report = release
            .run(&ReleaseRequest {
                target: "bench-board".to_string(),
                policy: IncrementPolicy::MinorCut,
            })
            .await
            .unwrap();

        assert_eq!(fs::read_to_string(project.version_file()).unwrap(), "0.1.0");
        assert_eq!(report.version, VersionTriple::new(0, 1, 0));
        assert_eq!(
            project.pio_calls(),
            vec!["run -e bench-board [X]", "run -e bench-board -t buildfs [X]"]
        );

        let published = project
            .root()
            .join("distributor/firmware/bench/firmware_merged.bin");
        assert_eq!(fs::read_to_string(&published).unwrap(), "merged-image");
        assert_eq!(
            report.publication,
            PublishResult::Published {
                destination: published,
                bytes: 12
            }
        );
        assert_eq!(report.stages[0].0, Stage::Preflight);
    }

    #[tokio::test]
    async fn test_build_increment_from_existing_version() {
        let project = Project::new();
        fs::create_dir_all(project.root().join("data")).unwrap();
        fs::write(project.version_file(), "2.3.7").unwrap();

        let report = project
            .release()
            .run(&ReleaseRequest {
                target: "esp32-dev".to_string(),
                policy: IncrementPolicy::Build,
            })
            .await
            .unwrap();

        assert_eq!(fs::read_to_string(project.version_file()).unwrap(), "2.3.8");
        assert!(report.version_changed);
        assert_eq!(report.board.chip_family, "ESP32");
    }

    #[tokio::test]
    async fn test_missing_tool_aborts_before_side_effects() {
        let project = Project::new();
        fs::remove_file(project.bin.path().join("pio")).unwrap();
        let data = project.root().join("data");
        fs::create_dir_all(&data).unwrap();
        fs::write(data.join("user_settings.template.json"), "{}").unwrap();

        let err = project
            .release()
            .run(&ReleaseRequest {
                target: "esp32-s3-dev".to_string(),
                policy: IncrementPolicy::MinorCut,
            })
            .await
            .unwrap_err();

        assert!(matches!(err, ReleaseError::MissingTool { .. }));
        assert!(!project.version_file().exists());
        assert!(!data.join("user_settings.json").exists());
        assert!(!project.root().join("distributor").exists());
    }

    #[tokio::test]
    async fn test_missing_artifact_still_succeeds() {
        let project = Project::new();
        write_script(project.bin.path(), "pio", "exit 0");

        let report = project
            .release()
            .run(&ReleaseRequest {
                target: "esp32-c3-supermini-ota".to_string(),
                policy: IncrementPolicy::None,
            })
            .await
            .unwrap();

        assert!(matches!(
            report.publication,
            PublishResult::Skipped(SkipReason::ArtifactMissing(_))
        ));
        assert!(!report.version_changed);
        assert!(!project.version_file().exists());
    }

    #[tokio::test]
    async fn test_copy_failure_does_not_fail_release() {
        let project = Project::new();
        let blocked = project
            .root()
            .join("distributor/firmware/esp32/firmware_merged.bin");
        fs::create_dir_all(&blocked).unwrap();

        let report = project
            .release()
            .run(&ReleaseRequest {
                target: "esp32-dev".to_string(),
                policy: IncrementPolicy::Build,
            })
            .await
            .unwrap();

        assert!(matches!(
            report.publication,
            PublishResult::Skipped(SkipReason::CopyFailed(_))
        ));
        assert_eq!(fs::read_to_string(project.version_file()).unwrap(), "0.0.1");
        assert!(blocked.is_dir());
    }

    #[tokio::test]
    async fn test_unknown_target_never_starts() {
        let project = Project::new();

        let err = project
            .release()
            .run(&ReleaseRequest {
                target: "esp8266".to_string(),
                policy: IncrementPolicy::MajorCut,
            })
            .await
            .unwrap_err();

        assert!(matches!(err, ReleaseError::UnknownTarget { .. }));
        assert!(project.pio_calls().is_empty());
        assert!(!project.version_file().exists());
    }

    #[tokio::test]
    async fn test_failed_build_keeps_bumped_version() {
        let project = Project::new();
        write_script(project.bin.path(), "pio", "exit 2");

        let err = project
            .release()
            .run(&ReleaseRequest {
                target: "esp32-dev".to_string(),
                policy: IncrementPolicy::Build,
            })
            .await
            .unwrap_err();

        assert_eq!(err.exit_code(), 2);
        assert_eq!(fs::read_to_string(project.version_file()).unwrap(), "0.0.1");
        assert!(!project.root().join("distributor").exists());
    }
}

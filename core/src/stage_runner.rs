use std::fs;
use std::sync::Arc;
use std::time::Instant;

use crate::{
    error::ReleaseError,
    executor,
    logger::Logger,
    parser::ToolOutputParser,
    stage::{Stage, StageKind},
    stage_context::{StageContext, StageResult},
    sync,
};

pub struct StageRunner {
    ctx: StageContext,
    logger: Arc<Logger>,
}

impl StageRunner {
    pub fn new(ctx: StageContext, logger: Arc<Logger>) -> Self {
        Self { ctx, logger }
    }

    /// Runs `stages` in order. The first fatal error ends the run; work done by
    /// earlier stages stays on disk.
    pub async fn run(&self, stages: &[Stage]) -> Result<Vec<(Stage, StageResult)>, ReleaseError> {
        let mut results = Vec::with_capacity(stages.len());

        for stage in stages {
            let result = self.execute_stage(*stage).await?;
            if let StageResult::Skipped { reason } = &result {
                self.logger.debug(&format!("{} skipped: {}", stage, reason));
            }
            results.push((*stage, result));
        }

        Ok(results)
    }

    pub async fn execute_stage(&self, stage: Stage) -> Result<StageResult, ReleaseError> {
        match stage {
            Stage::PrepareSettings => self.prepare_settings(),
            Stage::WebUiSync => self.sync_webui(),
            Stage::Preflight => Ok(StageResult::skipped("toolchain already resolved")),
            _ => self.invoke(stage).await,
        }
    }

    async fn invoke(&self, stage: Stage) -> Result<StageResult, ReleaseError> {
        let start = Instant::now();
        let metadata = stage.metadata();

        if matches!(stage, Stage::WebUiInstall | Stage::WebUiBundle) && !self.ctx.has_webui() {
            return Ok(StageResult::skipped(format!(
                "web UI sources not found at {}",
                self.ctx.layout().webui_dir.display()
            )));
        }

        let steps = self.ctx.generate_steps_for_stage(stage);

        if steps.is_empty() {
            if metadata.kind == StageKind::ConditionalInstall {
                self.logger.info("node_modules found, skipping npm install");
                return Ok(StageResult::skipped("dependency cache present"));
            }
            return Ok(StageResult::skipped("No steps to execute"));
        }

        match stage {
            Stage::Firmware => {
                self.logger.section(&format!(
                    "Building Firmware for {}",
                    self.ctx.board().target
                ));
                self.logger
                    .info(&format!("Chip family: {}", self.ctx.board().chip_family));
            }
            Stage::WebUiInstall => self.logger.info("node_modules not found, running npm install..."),
            _ => self.logger.section(&metadata.description),
        }

        for step in &steps {
            self.logger.info(&step.to_string());
        }

        let parser = ToolOutputParser::new();
        let logger = Arc::clone(&self.logger);
        let execution_results = executor::execute_steps(&steps, move |line| {
            logger.log_entry(&parser.parse_line(&line));
        })
        .await?;

        for (step, result) in steps.iter().zip(&execution_results) {
            self.logger.debug(&format!(
                "{} finished in {:.1}s",
                step.description, result.duration
            ));
        }

        if let Some((step, failed)) = steps
            .iter()
            .zip(&execution_results)
            .find(|(_, result)| !result.success)
        {
            if let Some(reason) = &failed.failure_reason {
                self.logger.error(&format!("{}: {}", step.description, reason));
            }
            return Err(ReleaseError::StageFailure {
                command: step.command_line(),
                exit_code: failed.exit_code,
            });
        }

        Ok(StageResult::Success {
            duration: start.elapsed().as_secs_f64(),
            steps_executed: execution_results.len(),
        })
    }

    fn prepare_settings(&self) -> Result<StageResult, ReleaseError> {
        let layout = self.ctx.layout();

        if layout.settings_file.exists() {
            return Ok(StageResult::skipped("settings file present"));
        }
        if !layout.settings_template.exists() {
            return Ok(StageResult::skipped("no settings template"));
        }

        let start = Instant::now();
        if let Some(parent) = layout.settings_file.parent() {
            fs::create_dir_all(parent)
                .map_err(|e| ReleaseError::io("Failed to create directory", parent, e))?;
        }
        fs::copy(&layout.settings_template, &layout.settings_file)
            .map_err(|e| ReleaseError::io("Failed to copy", &layout.settings_template, e))?;

        self.logger.info(&format!(
            "Created {} from template (no secrets).",
            layout.settings_file.display()
        ));

        Ok(StageResult::Success {
            duration: start.elapsed().as_secs_f64(),
            steps_executed: 1,
        })
    }

    fn sync_webui(&self) -> Result<StageResult, ReleaseError> {
        let layout = self.ctx.layout();

        if !self.ctx.has_webui() {
            return Ok(StageResult::skipped("web UI was not built"));
        }

        if !layout.webui_staging_dir.exists() {
            self.logger.warn(&format!(
                "Build output not found at {}",
                layout.webui_staging_dir.display()
            ));
            return Ok(StageResult::skipped("web UI build output missing"));
        }

        let start = Instant::now();
        let copied = sync::replace_dir(&layout.webui_staging_dir, &layout.webui_dest_dir)?;
        self.logger.info(&format!(
            "Lightweight UI deployed to {} ({} files)",
            layout.webui_dest_dir.display(),
            copied
        ));

        Ok(StageResult::Success {
            duration: start.elapsed().as_secs_f64(),
            steps_executed: 1,
        })
    }
}

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;

use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime};
use once_cell::sync::Lazy;
use regex::Regex;

use crate::{
    board::{compose_chip_family, BoardRegistry},
    command::PlatformIoCommands,
    config::ToolsConfig,
    error::ReleaseError,
    executor,
    layout::ProjectLayout,
    logger::Logger,
    parser::ToolOutputParser,
    toolchain::ToolLocator,
};

static TARGET_IDENTIFIER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z0-9_.-]+$").expect("valid target identifier regex"));

pub const DEFAULT_CHIP_PREFIX: &str = "ESP32";

const DATE_OUTPUT_FORMAT: &str = "%b %d %Y";
const TIME_OUTPUT_FORMAT: &str = "%H:%M:%S";

pub const FIRMWARE_VERSION_VAR: &str = "FIRMWARE_VERSION";
pub const BUILD_DATE_VAR: &str = "BUILD_DATE_OVERRIDE";
pub const BUILD_TIME_VAR: &str = "BUILD_TIME_OVERRIDE";

#[derive(Debug, Clone)]
pub struct RebuildRequest {
    pub target: String,
    pub chip_prefix: Option<String>,
    pub chip_family: Option<String>,
    pub firmware_label: String,
    pub build_date: Option<String>,
    pub build_time: Option<String>,
    pub build_datetime: Option<String>,
}

impl RebuildRequest {
    pub fn new(target: impl Into<String>) -> Self {
        Self {
            target: target.into(),
            chip_prefix: None,
            chip_family: None,
            firmware_label: "alpha".to_string(),
            build_date: None,
            build_time: None,
            build_datetime: None,
        }
    }
}

/// Metadata baked into the image through environment overrides.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildMetadata {
    pub chip_family: String,
    pub firmware_label: String,
    pub build_date: Option<String>,
    pub build_time: Option<String>,
}

impl BuildMetadata {
    /// Validates `request` before anything runs.
    pub fn resolve(
        request: &RebuildRequest,
        registry: &BoardRegistry,
    ) -> Result<Self, ReleaseError> {
        if !TARGET_IDENTIFIER.is_match(&request.target) {
            return Err(ReleaseError::InvalidArgument(format!(
                "malformed board environment '{}'",
                request.target
            )));
        }

        // --chip-family, then --chip, then the registry, then the default prefix.
        let chip_family = match (non_empty(&request.chip_family), non_empty(&request.chip_prefix)) {
            (Some(label), _) => label.to_string(),
            (None, Some(prefix)) => compose_chip_family(prefix, &request.target),
            (None, None) => registry
                .chip_family(&request.target)
                .map(String::from)
                .unwrap_or_else(|| compose_chip_family(DEFAULT_CHIP_PREFIX, &request.target)),
        };

        let firmware_label = match request.firmware_label.trim() {
            "" => "alpha".to_string(),
            label => label.to_string(),
        };

        let (build_date, build_time) = match non_empty(&request.build_datetime) {
            Some(value) => {
                let (date, time) = split_build_datetime(value)?;
                (Some(date), Some(time))
            }
            None => (
                non_empty(&request.build_date)
                    .map(format_build_date)
                    .transpose()?,
                non_empty(&request.build_time)
                    .map(format_build_time)
                    .transpose()?,
            ),
        };

        Ok(Self {
            chip_family,
            firmware_label,
            build_date,
            build_time,
        })
    }

    pub fn env(&self) -> BTreeMap<String, String> {
        let mut env = BTreeMap::new();
        env.insert(FIRMWARE_VERSION_VAR.to_string(), self.firmware_label.clone());
        if let Some(date) = &self.build_date {
            env.insert(BUILD_DATE_VAR.to_string(), date.clone());
        }
        if let Some(time) = &self.build_time {
            env.insert(BUILD_TIME_VAR.to_string(), time.clone());
        }
        env
    }
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

/// Accepts `Nov 27 2025` or `2025-11-27`.
pub fn format_build_date(value: &str) -> Result<String, ReleaseError> {
    let value = value.trim();
    ["%b %d %Y", "%Y-%m-%d"]
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(value, fmt).ok())
        .map(|date| date.format(DATE_OUTPUT_FORMAT).to_string())
        .ok_or_else(|| {
            ReleaseError::InvalidArgument(
                "build-date must be like 'Nov 27 2025' or '2025-11-27'".to_string(),
            )
        })
}

/// Accepts `14:30:45` or `14:30`.
pub fn format_build_time(value: &str) -> Result<String, ReleaseError> {
    let value = value.trim();
    ["%H:%M:%S", "%H:%M"]
        .iter()
        .find_map(|fmt| NaiveTime::parse_from_str(value, fmt).ok())
        .map(|time| time.format(TIME_OUTPUT_FORMAT).to_string())
        .ok_or_else(|| {
            ReleaseError::InvalidArgument(
                "build-time must be like '14:30:45' or '14:30'".to_string(),
            )
        })
}

/// Splits an ISO 8601 datetime into `(date, time)`. An explicit offset is kept as local
/// wall-clock time.
pub fn split_build_datetime(value: &str) -> Result<(String, String), ReleaseError> {
    let value = value.trim();
    let normalized = match value.strip_suffix('Z') {
        Some(stripped) => format!("{}+00:00", stripped),
        None => value.to_string(),
    };

    let parsed = DateTime::parse_from_rfc3339(&normalized)
        .map(|dt| dt.naive_local())
        .ok()
        .or_else(|| {
            ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M"]
                .iter()
                .find_map(|fmt| NaiveDateTime::parse_from_str(&normalized, fmt).ok())
        })
        .ok_or_else(|| {
            ReleaseError::InvalidArgument(format!(
                "build-datetime must be ISO 8601 like '2025-12-28T12:03:00', got '{}'",
                value
            ))
        })?;

    Ok((
        parsed.format(DATE_OUTPUT_FORMAT).to_string(),
        parsed.format(TIME_OUTPUT_FORMAT).to_string(),
    ))
}

/// Re-runs the firmware build for one target with custom metadata and returns the ELF path.
pub async fn rebuild(
    request: &RebuildRequest,
    registry: &BoardRegistry,
    layout: &ProjectLayout,
    tools: &ToolsConfig,
    logger: Arc<Logger>,
) -> Result<PathBuf, ReleaseError> {
    let metadata = BuildMetadata::resolve(request, registry)?;
    let pio = ToolLocator::new(tools, layout.root()).locate_any(&tools.platformio)?;

    logger.info(&format!("Rebuilding ELF for env '{}'", request.target));
    logger.info(&format!("{}='{}'", tools.chip_family_var, metadata.chip_family));
    logger.info(&format!(
        "{}='{}'",
        FIRMWARE_VERSION_VAR, metadata.firmware_label
    ));
    if metadata.build_date.is_some() || metadata.build_time.is_some() {
        logger.info(&format!(
            "BUILD_DATE='{}'",
            metadata.build_date.as_deref().unwrap_or("(default)")
        ));
        logger.info(&format!(
            "BUILD_TIME='{}'",
            metadata.build_time.as_deref().unwrap_or("(default)")
        ));
    } else {
        logger.info("BUILD_DATE/BUILD_TIME: using current time");
    }

    let step = PlatformIoCommands::new(pio, tools.chip_family_var.clone()).rebuild_step(
        layout.root(),
        &request.target,
        &metadata.chip_family,
        &metadata.env(),
    );
    logger.info(&step.to_string());

    let parser = ToolOutputParser::new();
    let sink = Arc::clone(&logger);
    let result = executor::execute_step(&step, move |line| {
        sink.log_entry(&parser.parse_line(&line));
    })
    .await?;

    if !result.success {
        return Err(ReleaseError::StageFailure {
            command: step.command_line(),
            exit_code: result.exit_code,
        });
    }

    let elf = layout.elf_path(&request.target);
    logger.info(&format!("ELF output: {}", elf.display()));
    Ok(elf)
}

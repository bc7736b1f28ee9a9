use anyhow::Context;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

use crate::rebuild::RebuildRequest;
use crate::version::{IncrementKind, IncrementPolicy, VersionAction};

#[derive(Parser, Debug)]
#[command(name = "kiln")]
#[command(author, about = "Build and release firmware for a single board", long_about = None)]
#[command(disable_version_flag = true)]
pub struct Cli {
    #[arg(
        short = 'e',
        long = "env",
        value_name = "TARGET",
        help = "Board environment to build (defaults to [release] default_target)"
    )]
    pub env: Option<String>,

    #[arg(
        long = "version",
        value_enum,
        default_value = "ver",
        help = "Version action before building"
    )]
    pub version_action: VersionAction,

    #[arg(
        long = "version-type",
        value_enum,
        help = "Increment kind overriding the version action (ignored with skip)"
    )]
    pub version_type: Option<IncrementKind>,

    #[arg(
        short = 'C',
        long = "directory",
        value_name = "DIR",
        help = "Firmware project root"
    )]
    pub source_dir: Option<PathBuf>,

    #[arg(long, help = "Configuration file path")]
    pub config: Option<PathBuf>,

    #[arg(short, long, help = "Show debug output")]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    #[command(about = "List supported board environments")]
    Boards,

    #[command(about = "Print the persisted firmware version")]
    Version,

    #[command(about = "Initialize a new kiln.toml configuration")]
    Init,

    #[command(about = "Rebuild firmware.elf with custom build metadata")]
    Rebuild {
        #[arg(short = 'e', long = "env", help = "Board environment to rebuild")]
        env: String,

        #[arg(
            long,
            help = "Chip prefix combined with the board suffix (defaults to the registry family, else ESP32)"
        )]
        chip: Option<String>,

        #[arg(long = "chip-family", help = "Override the chip family label")]
        chip_family: Option<String>,

        #[arg(
            long = "firmware-label",
            default_value = "alpha",
            help = "Firmware version string to embed"
        )]
        firmware_label: String,

        #[arg(long = "build-date", help = "Build date like 'Nov 27 2025' or '2025-11-27'")]
        build_date: Option<String>,

        #[arg(long = "build-time", help = "Build time like '14:30:45' or '14:30'")]
        build_time: Option<String>,

        #[arg(
            long = "build-datetime",
            help = "ISO datetime like '2025-12-28T12:03:00' (overrides date and time)"
        )]
        build_datetime: Option<String>,
    },
}

impl Commands {
    pub fn rebuild_request(&self) -> Option<RebuildRequest> {
        match self {
            Commands::Rebuild {
                env,
                chip,
                chip_family,
                firmware_label,
                build_date,
                build_time,
                build_datetime,
            } => Some(RebuildRequest {
                target: env.clone(),
                chip_prefix: chip.clone(),
                chip_family: chip_family.clone(),
                firmware_label: firmware_label.clone(),
                build_date: build_date.clone(),
                build_time: build_time.clone(),
                build_datetime: build_datetime.clone(),
            }),
            _ => None,
        }
    }
}

impl Cli {
    pub fn source_directory(&self) -> anyhow::Result<PathBuf> {
        match &self.source_dir {
            Some(dir) => Ok(dir.clone()),
            None => std::env::current_dir().context("Failed to determine current directory"),
        }
    }

    pub fn increment_policy(&self) -> IncrementPolicy {
        self.version_action.policy(self.version_type)
    }
}

pub mod board;
pub mod cli;
pub mod command;
pub mod config;
pub mod error;
pub mod executor;
pub mod layout;
pub mod logger;
pub mod parser;
pub mod publish;
pub mod rebuild;
pub mod release;
pub mod stage;
pub mod stage_context;
pub mod stage_runner;
pub mod sync;
pub mod toolchain;
pub mod version;

pub use board::{Board, BoardEntry, BoardRegistry};
pub use cli::{Cli, Commands};
pub use config::Config;
pub use error::ReleaseError;
pub use executor::{execute_step, execute_steps, ExecutionResult};
pub use layout::ProjectLayout;
pub use publish::{ArtifactPublisher, PublishResult, SkipReason};
pub use rebuild::{rebuild, BuildMetadata, RebuildRequest};
pub use release::{Release, ReleaseReport, ReleaseRequest};
pub use stage::{Stage, StageMetadata};
pub use stage_context::{StageContext, StageResult};
pub use stage_runner::StageRunner;
pub use toolchain::Toolchain;
pub use version::{IncrementKind, IncrementPolicy, VersionAction, VersionStore, VersionTriple};

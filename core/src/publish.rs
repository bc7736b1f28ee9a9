use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::ReleaseError;
use crate::logger::Logger;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipReason {
    /// Secrets may have been merged into the image.
    NotAuthorized,
    ArtifactMissing(PathBuf),
    SlotUnresolved,
    /// The slot directory exists but the copy itself failed.
    CopyFailed(String),
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SkipReason::NotAuthorized => write!(f, "publication not authorized"),
            SkipReason::ArtifactMissing(path) => {
                write!(f, "artifact not found at {}", path.display())
            }
            SkipReason::SlotUnresolved => write!(f, "no distribution directory for target"),
            SkipReason::CopyFailed(reason) => write!(f, "copy failed: {}", reason),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PublishResult {
    Published { destination: PathBuf, bytes: u64 },
    Skipped(SkipReason),
}

pub struct ArtifactPublisher<'a> {
    distribution_dir: &'a Path,
    logger: &'a Logger,
}

impl<'a> ArtifactPublisher<'a> {
    pub fn new(distribution_dir: &'a Path, logger: &'a Logger) -> Self {
        Self {
            distribution_dir,
            logger,
        }
    }

    /// Copies `artifact` into `<distribution_dir>/<slot>/`. Every skip condition is a no-op
    /// that leaves the destination untouched.
    pub fn publish(
        &self,
        artifact: &Path,
        slot: Option<&str>,
        authorized: bool,
    ) -> Result<PublishResult, ReleaseError> {
        if !authorized {
            self.logger.section("Skipping Distributor Copy");
            self.logger
                .info("Distributor copy skipped because secrets were merged into firmware.");
            self.logger
                .info("Only firmware built without secrets may be distributed.");
            return Ok(PublishResult::Skipped(SkipReason::NotAuthorized));
        }

        if !artifact.is_file() {
            self.logger.warn(&format!(
                "{} not found at {}",
                file_name(artifact),
                artifact.display()
            ));
            self.logger.info("Skipping distributor copy.");
            return Ok(PublishResult::Skipped(SkipReason::ArtifactMissing(
                artifact.to_path_buf(),
            )));
        }

        let slot = match slot.filter(|slot| !slot.is_empty()) {
            Some(slot) => slot,
            None => {
                self.logger.warn("Unknown distributor directory for this board");
                self.logger.info("Skipping distributor copy.");
                return Ok(PublishResult::Skipped(SkipReason::SlotUnresolved));
            }
        };

        let slot_dir = self.distribution_dir.join(slot);
        let destination = slot_dir.join(file_name(artifact));

        fs::create_dir_all(&slot_dir)
            .map_err(|e| ReleaseError::io("Failed to create directory", &slot_dir, e))?;
        let bytes = match fs::copy(artifact, &destination)
            .and_then(|_| fs::metadata(&destination))
        {
            Ok(metadata) => metadata.len(),
            Err(e) => {
                self.logger
                    .error(&format!("Failed to copy firmware to distributor: {}", e));
                return Ok(PublishResult::Skipped(SkipReason::CopyFailed(e.to_string())));
            }
        };

        self.logger.section("Distributor Copy");
        self.logger
            .info(&format!("Copied firmware to: {}", destination.display()));
        self.logger.info(&format!("File size: {} bytes", bytes));
        self.logger.info("Clean firmware ready for distribution.");

        Ok(PublishResult::Published { destination, bytes })
    }
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().to_string())
        .unwrap_or_else(|| "artifact".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Fixture {
        dir: tempfile::TempDir,
        logger: Logger,
    }

    impl Fixture {
        fn new() -> Self {
            Self {
                dir: tempfile::tempdir().unwrap(),
                logger: Logger::new().with_colors(false),
            }
        }

        fn artifact(&self, content: &[u8]) -> PathBuf {
            let build = self.dir.path().join(".pio/build/esp32-dev");
            fs::create_dir_all(&build).unwrap();
            let path = build.join("firmware_merged.bin");
            fs::write(&path, content).unwrap();
            path
        }

        fn distribution_dir(&self) -> PathBuf {
            self.dir.path().join("distributor/firmware")
        }
    }

    #[test]
    fn test_publish_copies_and_reports_size() {
        let fixture = Fixture::new();
        let artifact = fixture.artifact(&[0xE9; 1024]);
        let dist = fixture.distribution_dir();
        let publisher = ArtifactPublisher::new(&dist, &fixture.logger);

        let result = publisher.publish(&artifact, Some("esp32"), true).unwrap();

        let expected = dist.join("esp32").join("firmware_merged.bin");
        assert_eq!(
            result,
            PublishResult::Published {
                destination: expected.clone(),
                bytes: 1024
            }
        );
        assert_eq!(fs::read(&expected).unwrap(), vec![0xE9; 1024]);
    }

    #[test]
    fn test_publish_is_idempotent() {
        let fixture = Fixture::new();
        let artifact = fixture.artifact(b"image-v1");
        let dist = fixture.distribution_dir();
        let publisher = ArtifactPublisher::new(&dist, &fixture.logger);

        let first = publisher.publish(&artifact, Some("esp32"), true).unwrap();
        let after_first = fs::read(dist.join("esp32/firmware_merged.bin")).unwrap();
        let second = publisher.publish(&artifact, Some("esp32"), true).unwrap();
        let after_second = fs::read(dist.join("esp32/firmware_merged.bin")).unwrap();

        assert_eq!(first, second);
        assert_eq!(after_first, after_second);
    }

    #[test]
    fn test_publish_overwrites_previous_release() {
        let fixture = Fixture::new();
        let dist = fixture.distribution_dir();
        fs::create_dir_all(dist.join("esp32")).unwrap();
        fs::write(dist.join("esp32/firmware_merged.bin"), b"old-and-longer").unwrap();

        let artifact = fixture.artifact(b"new");
        let publisher = ArtifactPublisher::new(&dist, &fixture.logger);
        publisher.publish(&artifact, Some("esp32"), true).unwrap();

        assert_eq!(fs::read(dist.join("esp32/firmware_merged.bin")).unwrap(), b"new");
    }

    #[test]
    fn test_unauthorized_is_a_noop() {
        let fixture = Fixture::new();
        let artifact = fixture.artifact(b"image");
        let dist = fixture.distribution_dir();
        let publisher = ArtifactPublisher::new(&dist, &fixture.logger);

        let result = publisher.publish(&artifact, Some("esp32"), false).unwrap();

        assert_eq!(result, PublishResult::Skipped(SkipReason::NotAuthorized));
        assert!(!dist.exists());
    }

    #[test]
    fn test_missing_artifact_is_a_noop() {
        let fixture = Fixture::new();
        let dist = fixture.distribution_dir();
        let missing = fixture.dir.path().join(".pio/build/esp32-dev/firmware_merged.bin");
        let publisher = ArtifactPublisher::new(&dist, &fixture.logger);

        let result = publisher.publish(&missing, Some("esp32"), true).unwrap();

        assert_eq!(
            result,
            PublishResult::Skipped(SkipReason::ArtifactMissing(missing))
        );
        assert!(!dist.exists());
    }

    #[test]
    fn test_copy_failure_is_reported_not_raised() {
        let fixture = Fixture::new();
        let artifact = fixture.artifact(b"image");
        let dist = fixture.distribution_dir();
        let blocked = dist.join("esp32").join("firmware_merged.bin");
        fs::create_dir_all(&blocked).unwrap();
        let publisher = ArtifactPublisher::new(&dist, &fixture.logger);

        let result = publisher.publish(&artifact, Some("esp32"), true).unwrap();

        assert!(matches!(
            result,
            PublishResult::Skipped(SkipReason::CopyFailed(_))
        ));
        assert!(blocked.is_dir());
    }

    #[test]
    fn test_slot_directory_failure_is_fatal() {
        let fixture = Fixture::new();
        let artifact = fixture.artifact(b"image");
        let dist = fixture.distribution_dir();
        fs::create_dir_all(&dist).unwrap();
        fs::write(dist.join("esp32"), b"not a directory").unwrap();
        let publisher = ArtifactPublisher::new(&dist, &fixture.logger);

        assert!(matches!(
            publisher.publish(&artifact, Some("esp32"), true),
            Err(ReleaseError::Io { .. })
        ));
    }

    #[test]
    fn test_skip_reasons_explain_themselves() {
        let reasons = [
            SkipReason::NotAuthorized,
            SkipReason::ArtifactMissing(PathBuf::from(".pio/build/esp32-dev/firmware_merged.bin")),
            SkipReason::SlotUnresolved,
            SkipReason::CopyFailed("Is a directory (os error 21)".to_string()),
        ];
        let messages: Vec<String> = reasons.iter().map(ToString::to_string).collect();

        assert_eq!(messages[0], "publication not authorized");
        assert!(messages[1].contains("firmware_merged.bin"));
        assert_eq!(messages[2], "no distribution directory for target");
        assert_eq!(messages[3], "copy failed: Is a directory (os error 21)");
    }

    #[test]
    fn test_unresolved_slot_is_a_noop() {
        let fixture = Fixture::new();
        let artifact = fixture.artifact(b"image");
        let dist = fixture.distribution_dir();
        let publisher = ArtifactPublisher::new(&dist, &fixture.logger);

        assert_eq!(
            publisher.publish(&artifact, None, true).unwrap(),
            PublishResult::Skipped(SkipReason::SlotUnresolved)
        );
        assert_eq!(
            publisher.publish(&artifact, Some(""), true).unwrap(),
            PublishResult::Skipped(SkipReason::SlotUnresolved)
        );
        assert!(!dist.exists());
    }
}

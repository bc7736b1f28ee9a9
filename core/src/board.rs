use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::ReleaseError;

/// Suffixes recognised inside a target identifier when composing a chip family label.
const CHIP_SUFFIXES: [&str; 5] = ["S3", "C3", "C6", "S2", "H2"];

const BUILTIN_BOARDS: [(&str, &str, &str); 11] = [
    ("esp32-dev", "ESP32", "esp32"),
    ("esp32-build", "ESP32", "esp32"),
    ("esp32-s3-dev", "ESP32-S3", "esp32s3"),
    ("esp32-s3-build", "ESP32-S3", "esp32s3"),
    ("seeed_xiao_esp32s3-dev", "ESP32-S3", "seeed_xaio_esp32s3"),
    ("seeed_xiao_esp32s3-build", "ESP32-S3", "seeed_xaio_esp32s3"),
    ("seeed_xiao_esp32c3-dev", "ESP32-C3", "seeed_xaio_esp32c3"),
    ("seeed_xiao_esp32c3-build", "ESP32-C3", "seeed_xaio_esp32c3"),
    ("esp32-c3-supermini-dev", "ESP32-C3", "esp32c3supermini"),
    ("esp32-c3-supermini-ota", "ESP32-C3", "esp32c3supermini"),
    ("esp32c3supermini", "ESP32-C3", "esp32c3supermini"),
];

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BoardEntry {
    pub chip_family: String,
    pub slot: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Board {
    pub target: String,
    pub chip_family: String,
    pub slot: String,
}

impl fmt::Display for Board {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({} -> {})", self.target, self.chip_family, self.slot)
    }
}

#[derive(Debug, Clone)]
pub struct BoardRegistry {
    boards: BTreeMap<String, BoardEntry>,
}

impl BoardRegistry {
    pub fn new(boards: BTreeMap<String, BoardEntry>) -> Self {
        Self { boards }
    }

    pub fn builtin() -> Self {
        let boards = BUILTIN_BOARDS
            .iter()
            .map(|(target, family, slot)| {
                (
                    target.to_string(),
                    BoardEntry {
                        chip_family: family.to_string(),
                        slot: slot.to_string(),
                    },
                )
            })
            .collect();

        Self { boards }
    }

    /// Adds or replaces entries, e.g. from the `[boards]` table of `kiln.toml`.
    pub fn with_overrides(mut self, overrides: &BTreeMap<String, BoardEntry>) -> Self {
        for (target, entry) in overrides {
            self.boards.insert(target.clone(), entry.clone());
        }
        self
    }

    pub fn resolve(&self, target: &str) -> Result<Board, ReleaseError> {
        self.boards
            .get(target)
            .filter(|entry| !entry.chip_family.is_empty() && !entry.slot.is_empty())
            .map(|entry| Board {
                target: target.to_string(),
                chip_family: entry.chip_family.clone(),
                slot: entry.slot.clone(),
            })
            .ok_or_else(|| ReleaseError::UnknownTarget {
                target: target.to_string(),
                supported: self.targets(),
            })
    }

    pub fn chip_family(&self, target: &str) -> Option<&str> {
        self.boards.get(target).map(|entry| entry.chip_family.as_str())
    }

    pub fn slot(&self, target: &str) -> Option<&str> {
        self.boards.get(target).map(|entry| entry.slot.as_str())
    }

    pub fn targets(&self) -> Vec<String> {
        self.boards.keys().cloned().collect()
    }

    pub fn boards(&self) -> impl Iterator<Item = Board> + '_ {
        self.boards.iter().map(|(target, entry)| Board {
            target: target.clone(),
            chip_family: entry.chip_family.clone(),
            slot: entry.slot.clone(),
        })
    }
}

impl Default for BoardRegistry {
    fn default() -> Self {
        Self::builtin()
    }
}

/// Builds a chip family label from a raw prefix such as `ESP32` and an ad-hoc target.
///
/// `compose_chip_family("ESP32", "xiao-esp32s3")` yields `ESP32-S3`; a target without a
/// recognised suffix yields the prefix unchanged.
pub fn compose_chip_family(prefix: &str, target: &str) -> String {
    let prefix = prefix.trim();
    let lower_target = target.to_lowercase();

    CHIP_SUFFIXES
        .iter()
        .find(|suffix| lower_target.contains(&suffix.to_lowercase()))
        .map(|suffix| format!("{}-{}", prefix, suffix))
        .unwrap_or_else(|| prefix.to_string())
}

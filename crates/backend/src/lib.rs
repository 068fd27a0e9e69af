//! Storage backends for composable pipelines.
//!
//! Writers persist their results through the [`DataStore`] trait. The trait is
//! the narrow contract the batch runner relies on: existence checks for
//! checkpointing, identifier derivation, writing results and failure records,
//! attaching log files, and closing. [`DirectoryDataStore`] is the reference
//! implementation backed by a plain directory.

pub mod directory;
pub mod error;

pub use directory::DirectoryDataStore;
pub use error::StoreError;

use composable_types::NotCompleted;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;
use std::path::Path;
use std::str::FromStr;

/// Behaviour when an output identifier already exists in a store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum IfExists {
    /// Return the existing identifier without recomputing.
    #[default]
    Skip,
    /// Same as `Skip`; kept for configuration compatibility.
    Ignore,
    /// Fail hard when the identifier exists.
    Raise,
    /// Recompute and replace the stored member.
    Overwrite,
}

impl fmt::Display for IfExists {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IfExists::Skip => write!(f, "skip"),
            IfExists::Ignore => write!(f, "ignore"),
            IfExists::Raise => write!(f, "raise"),
            IfExists::Overwrite => write!(f, "overwrite"),
        }
    }
}

impl FromStr for IfExists {
    type Err = StoreError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_lowercase().as_str() {
            "skip" => Ok(IfExists::Skip),
            "ignore" => Ok(IfExists::Ignore),
            "raise" => Ok(IfExists::Raise),
            "overwrite" => Ok(IfExists::Overwrite),
            _ => Err(StoreError::InvalidPolicy(value.to_string())),
        }
    }
}

/// A member held by a store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DataMember {
    /// Suffix-free name, unique within the store.
    pub name: String,
    /// Absolute identifier of the member.
    pub identifier: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub checksum: Option<String>,
}

/// Storage contract used by writer stages and the batch runner.
pub trait DataStore: Send + Sync {
    /// Location of the store.
    fn source(&self) -> &Path;

    /// Policy applied by checkpointing stages when an output already exists.
    fn if_exists(&self) -> IfExists;

    /// Whether a completed member exists for `identifier`.
    fn contains(&self, identifier: &str) -> bool;

    /// Absolute identifier a result derived from `name` would be stored under.
    fn make_absolute_identifier(&self, name: &str) -> String;

    fn write(&self, identifier: &str, content: &str) -> Result<DataMember, StoreError>;

    /// Persist a failure record in place of a result.
    fn write_incomplete(
        &self,
        identifier: &str,
        record: &NotCompleted,
    ) -> Result<DataMember, StoreError>;

    /// Copy an external file (typically a run log) into the store.
    fn add_file(
        &self,
        path: &Path,
        cleanup: bool,
        keep_suffix: bool,
    ) -> Result<DataMember, StoreError>;

    fn close(&self) -> Result<(), StoreError>;

    fn members(&self) -> Vec<DataMember>;

    fn logs(&self) -> Vec<DataMember>;

    fn incomplete(&self) -> Vec<DataMember>;
}

/// Hex encoded SHA-256 of `bytes`.
pub fn compute_sha256_hex(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    hex::encode(hasher.finalize())
}

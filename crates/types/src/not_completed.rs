use crate::data::Data;
use crate::VERSION;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::str::FromStr;

/// Fully-qualified type name written into the serialized record.
pub const NOT_COMPLETED_TYPE: &str = "composable_types::NotCompleted";

/// Why a value failed to complete.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum FailureKind {
    /// An unexpected fault inside a stage, or a data-type mismatch.
    Error,
    /// A stage rejected its input on domain grounds.
    Fail,
    /// A checkpoint or an explicit bypass.
    Skip,
    /// A stage returned an ambiguous empty value instead of an explicit failure.
    Bug,
}

impl FailureKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            FailureKind::Error => "ERROR",
            FailureKind::Fail => "FAIL",
            FailureKind::Skip => "SKIP",
            FailureKind::Bug => "BUG",
        }
    }
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FailureKind {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_uppercase().as_str() {
            "ERROR" => Ok(FailureKind::Error),
            "FAIL" => Ok(FailureKind::Fail),
            "SKIP" => Ok(FailureKind::Skip),
            "BUG" => Ok(FailureKind::Bug),
            _ => Err(format!(
                "invalid failure kind '{}'; supported values are ERROR, FAIL, SKIP, BUG",
                value
            )),
        }
    }
}

/// Record of a value that failed to complete. It travels down the rest of the
/// chain untouched and is finally returned to the caller or persisted by a writer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(into = "NotCompletedRecord", try_from = "NotCompletedRecord")]
pub struct NotCompleted {
    pub kind: FailureKind,
    pub origin: String,
    pub message: String,
    pub source: Option<String>,
}

impl NotCompleted {
    pub fn new(kind: FailureKind, origin: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            kind,
            origin: origin.into(),
            message: message.into(),
            source: None,
        }
    }

    pub fn error(origin: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(FailureKind::Error, origin, message)
    }

    pub fn fail(origin: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(FailureKind::Fail, origin, message)
    }

    pub fn skip(origin: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(FailureKind::Skip, origin, message)
    }

    pub fn bug(origin: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(FailureKind::Bug, origin, message)
    }

    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source = Some(source.into());
        self
    }

    /// Records the best-effort source of `data`.
    pub fn with_source_of(mut self, data: &Data) -> Self {
        self.source = data.data_source();
        self
    }

    pub fn to_rich_dict(&self) -> Value {
        serde_json::to_value(self).unwrap_or(Value::Null)
    }

    pub fn to_json(&self) -> String {
        self.to_rich_dict().to_string()
    }

    pub fn from_json(text: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(text)
    }
}

impl fmt::Display for NotCompleted {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "NotCompleted(type={}, origin={}, source=\"{}\", message=\"{}\")",
            self.kind,
            self.origin,
            self.source.as_deref().unwrap_or("Unknown"),
            self.message
        )
    }
}

#[derive(Serialize, Deserialize)]
struct NotCompletedRecord {
    #[serde(rename = "type")]
    type_name: String,
    not_completed_construction: Construction,
    version: String,
}

#[derive(Serialize, Deserialize)]
struct Construction {
    args: (FailureKind, String, String),
    #[serde(default)]
    kwargs: ConstructionKwargs,
}

#[derive(Serialize, Deserialize, Default)]
struct ConstructionKwargs {
    #[serde(default)]
    source: Option<String>,
}

impl From<NotCompleted> for NotCompletedRecord {
    fn from(value: NotCompleted) -> Self {
        NotCompletedRecord {
            type_name: NOT_COMPLETED_TYPE.to_string(),
            not_completed_construction: Construction {
                args: (value.kind, value.origin, value.message),
                kwargs: ConstructionKwargs {
                    source: value.source,
                },
            },
            version: VERSION.to_string(),
        }
    }
}

impl TryFrom<NotCompletedRecord> for NotCompleted {
    type Error = String;

    fn try_from(record: NotCompletedRecord) -> Result<Self, Self::Error> {
        if record.type_name != NOT_COMPLETED_TYPE {
            return Err(format!(
                "expected type '{}', found '{}'",
                NOT_COMPLETED_TYPE, record.type_name
            ));
        }
        let (kind, origin, message) = record.not_completed_construction.args;
        Ok(NotCompleted {
            kind,
            origin,
            message,
            source: record.not_completed_construction.kwargs.source,
        })
    }
}

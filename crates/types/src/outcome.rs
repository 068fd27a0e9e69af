use crate::data::Data;
use crate::not_completed::NotCompleted;
use serde::{Deserialize, Serialize};

/// Result of pushing one value through a stage or chain.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", content = "payload", rename_all = "snake_case")]
pub enum Outcome {
    Success(Data),
    Incomplete(NotCompleted),
}

impl Outcome {
    pub fn is_success(&self) -> bool {
        matches!(self, Outcome::Success(_))
    }

    pub fn is_incomplete(&self) -> bool {
        matches!(self, Outcome::Incomplete(_))
    }

    pub fn success(&self) -> Option<&Data> {
        match self {
            Outcome::Success(data) => Some(data),
            Outcome::Incomplete(_) => None,
        }
    }

    pub fn incomplete(&self) -> Option<&NotCompleted> {
        match self {
            Outcome::Success(_) => None,
            Outcome::Incomplete(record) => Some(record),
        }
    }

    pub fn into_result(self) -> Result<Data, NotCompleted> {
        match self {
            Outcome::Success(data) => Ok(data),
            Outcome::Incomplete(record) => Err(record),
        }
    }

    /// Best-effort identifier of whatever produced this outcome.
    pub fn source(&self) -> Option<String> {
        match self {
            Outcome::Success(data) => data.data_source(),
            Outcome::Incomplete(record) => record.source.clone(),
        }
    }
}

impl From<Data> for Outcome {
    fn from(data: Data) -> Self {
        Outcome::Success(data)
    }
}

impl From<NotCompleted> for Outcome {
    fn from(record: NotCompleted) -> Self {
        Outcome::Incomplete(record)
    }
}

impl From<&str> for Outcome {
    fn from(value: &str) -> Self {
        Outcome::Success(Data::from(value))
    }
}

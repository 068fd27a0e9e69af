use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::path::{Path, PathBuf};

/// Type name accepted by stages that operate on any identifier (paths, names, store members).
pub const IDENTIFIER_TYPE: &str = "IdentifierType";

/// Type name accepted by stages that operate on anything serialisable.
pub const SERIALISABLE_TYPE: &str = "SerialisableType";

/// A value flowing through a pipeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Data {
    /// Semantic type name checked against a stage's accepted data types.
    pub type_name: String,
    pub value: Value,
    /// Where the value originated, typically an input path or store identifier.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
    /// Content hash, when the value was read from or written to a store.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub checksum: Option<String>,
}

impl Data {
    pub fn new(type_name: impl Into<String>, value: impl Into<Value>) -> Self {
        Self {
            type_name: type_name.into(),
            value: value.into(),
            source: None,
            checksum: None,
        }
    }

    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source = Some(source.into());
        self
    }

    pub fn with_checksum(mut self, checksum: impl Into<String>) -> Self {
        self.checksum = Some(checksum.into());
        self
    }

    /// Data referring to a stored member by its identifier.
    pub fn identifier(identifier: impl Into<String>) -> Self {
        let identifier = identifier.into();
        Self::new(IDENTIFIER_TYPE, identifier.clone()).with_source(identifier)
    }

    /// Mirrors dynamic-language truthiness: null, false, zero and empty
    /// strings or collections are falsy.
    pub fn is_truthy(&self) -> bool {
        match &self.value {
            Value::Null => false,
            Value::Bool(flag) => *flag,
            Value::Number(number) => number.as_f64().map(|n| n != 0.0).unwrap_or(true),
            Value::String(text) => !text.is_empty(),
            Value::Array(items) => !items.is_empty(),
            Value::Object(map) => !map.is_empty(),
        }
    }

    /// Best-effort identifier of the data: its recorded source, otherwise the
    /// value itself when it is a string.
    pub fn data_source(&self) -> Option<String> {
        if let Some(source) = &self.source {
            return Some(source.clone());
        }
        self.value.as_str().map(str::to_string)
    }
}

impl From<&str> for Data {
    fn from(value: &str) -> Self {
        Data::new("str", value).with_source(value)
    }
}

impl From<String> for Data {
    fn from(value: String) -> Self {
        Data::from(value.as_str())
    }
}

impl From<&Path> for Data {
    fn from(path: &Path) -> Self {
        let text = path.display().to_string();
        Data::new("Path", text.clone()).with_source(text)
    }
}

impl From<PathBuf> for Data {
    fn from(path: PathBuf) -> Self {
        Data::from(path.as_path())
    }
}

/// Basename of `path` with every suffix removed, so `data/a.bats.fasta`
/// becomes `a`. Leading dots of hidden files are kept.
pub fn identifier_stem(path: &str) -> String {
    let name = Path::new(path)
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.to_string());
    if name.ends_with('.') {
        return name;
    }
    let leading = name.len() - name.trim_start_matches('.').len();
    match name[leading..].find('.') {
        Some(idx) => name[..leading + idx].to_string(),
        None => name,
    }
}

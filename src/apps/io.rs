use crate::core::pipeline::{Checkpoint, Params};
use crate::core::registry::App;
use crate::core::tags::{TypeHint, IDENTIFIER_TYPE, SERIALISABLE_TYPE};
use anyhow::{anyhow, Context};
use composable_backend::{compute_sha256_hex, DataStore};
use composable_types::{Data, Outcome};
use std::fs;
use std::sync::Arc;

/// Reads a UTF-8 file named by the input.
#[derive(Debug, Default, Clone)]
pub struct LoadText;

impl App for LoadText {
    const NAME: &'static str = "load_text";
    const INPUT: TypeHint = TypeHint::Names(&[IDENTIFIER_TYPE]);
    const OUTPUT: TypeHint = TypeHint::Names(&["Text"]);

    fn main(&self, data: Data) -> anyhow::Result<Outcome> {
        let path = data
            .value
            .as_str()
            .map(str::to_string)
            .or_else(|| data.data_source())
            .ok_or_else(|| anyhow!("input does not name a file"))?;
        let bytes = fs::read(&path).with_context(|| format!("failed to read {}", path))?;
        let checksum = compute_sha256_hex(&bytes);
        let text = String::from_utf8(bytes).with_context(|| format!("{} is not UTF-8", path))?;
        Ok(Data::new("Text", text)
            .with_source(path)
            .with_checksum(checksum)
            .into())
    }
}

/// Writes each result as JSON into a data store.
pub struct WriteJson {
    store: Arc<dyn DataStore>,
}

impl WriteJson {
    pub fn new(store: Arc<dyn DataStore>) -> Self {
        Self { store }
    }
}

impl App for WriteJson {
    const NAME: &'static str = "write_json";
    const INPUT: TypeHint = TypeHint::Names(&["Text", SERIALISABLE_TYPE]);
    const OUTPUT: TypeHint = TypeHint::Names(&[IDENTIFIER_TYPE]);

    fn main(&self, data: Data) -> anyhow::Result<Outcome> {
        let name = data
            .data_source()
            .ok_or_else(|| anyhow!("cannot name output for data without a source"))?;
        let content = serde_json::to_string_pretty(&data)?;
        let member = self.store.write(&name, &content)?;
        let mut written = Data::identifier(member.identifier);
        written.checksum = member.checksum;
        Ok(written.into())
    }

    fn params(&self) -> Params {
        Params::new().with("data_store", self.store.source().display().to_string())
    }

    fn data_store(&self) -> Option<Arc<dyn DataStore>> {
        Some(Arc::clone(&self.store))
    }

    fn checkpoint(&self) -> Option<Checkpoint> {
        Some(Checkpoint::new(Arc::clone(&self.store)))
    }
}

use crate::core::pipeline::Params;
use crate::core::registry::App;
use crate::core::tags::TypeHint;
use composable_types::{Data, NotCompleted, Outcome};

/// Passes text through unchanged when it has at least `length` characters.
#[derive(Debug, Clone)]
pub struct MinLength {
    pub length: usize,
}

impl MinLength {
    pub fn new(length: usize) -> Self {
        Self { length }
    }
}

impl App for MinLength {
    const NAME: &'static str = "min_length";
    const INPUT: TypeHint = TypeHint::Names(&["Text"]);
    const OUTPUT: TypeHint = TypeHint::Names(&["Text"]);

    fn main(&self, data: Data) -> anyhow::Result<Outcome> {
        let length = data
            .value
            .as_str()
            .map(|text| text.chars().count())
            .unwrap_or_default();
        if length < self.length {
            let failure = NotCompleted::fail(
                Self::NAME,
                format!("{} < min_length {}", length, self.length),
            )
            .with_source_of(&data);
            return Ok(failure.into());
        }
        Ok(data.into())
    }

    fn params(&self) -> Params {
        Params::new().with("length", self.length)
    }
}

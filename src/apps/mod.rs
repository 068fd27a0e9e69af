//! Ready-made stages: a text loader, a length filter and a JSON writer.

pub mod io;
pub mod sample;

pub use io::{LoadText, WriteJson};
pub use sample::MinLength;

use crate::core::error::AppError;
use crate::core::registry::{AppOptions, AppRegistry, AppType};

/// Stage types of the built-in apps, registered together.
pub struct BuiltinApps {
    pub load_text: AppType<LoadText>,
    pub min_length: AppType<MinLength>,
    pub write_json: AppType<WriteJson>,
}

impl BuiltinApps {
    pub fn register(registry: &AppRegistry) -> Result<Self, AppError> {
        Ok(Self {
            load_text: registry.define::<LoadText>(AppOptions::loader())?,
            min_length: registry.define::<MinLength>(AppOptions::default())?,
            write_json: registry.define::<WriteJson>(AppOptions::writer())?,
        })
    }
}

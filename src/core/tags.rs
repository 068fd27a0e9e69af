//! Capability tags: the semantic type names attached to every stage that decide
//! which stages may be connected and which runtime values a stage accepts.

use crate::core::error::AppError;
use crate::core::types::ErrorCategory;
use composable_types::{Data, NotCompleted};
use std::collections::BTreeSet;

pub use composable_types::{IDENTIFIER_TYPE, SERIALISABLE_TYPE};

/// Type names that make a stage accept any runtime value.
pub const ANY_TYPES: [&str; 2] = [SERIALISABLE_TYPE, IDENTIFIER_TYPE];

/// Declared type of a stage's input argument or return value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TypeHint {
    /// No annotation was declared.
    #[default]
    Missing,
    /// The unit type, which carries no data and is never a valid hint.
    Unit,
    /// One or more accepted type names; several names form a union.
    Names(&'static [&'static str]),
}

impl TypeHint {
    fn resolve(&self, app: &str, position: &str) -> Result<BTreeSet<String>, AppError> {
        match self {
            TypeHint::Missing => Err(AppError::new(
                ErrorCategory::RegistrationError,
                format!("{}: must specify type hint for {}", app, position),
            )
            .with_code("CMP-REG-004")),
            TypeHint::Unit => Err(AppError::new(
                ErrorCategory::RegistrationError,
                format!("{}: unit type invalid for {}", app, position),
            )
            .with_code("CMP-REG-005")),
            TypeHint::Names(names) => {
                let resolved: BTreeSet<String> = names
                    .iter()
                    .map(|name| name.trim())
                    .filter(|name| !name.is_empty())
                    .map(str::to_string)
                    .collect();
                if resolved.is_empty() {
                    return Err(AppError::new(
                        ErrorCategory::RegistrationError,
                        format!("{}: empty type hint for {}", app, position),
                    )
                    .with_code("CMP-REG-006"));
                }
                Ok(resolved)
            }
        }
    }
}

/// Immutable type-name sets governing connection and validation.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CapabilityTags {
    input_types: BTreeSet<String>,
    output_types: BTreeSet<String>,
    data_types: BTreeSet<String>,
}

impl CapabilityTags {
    pub fn new<I, O, D>(input_types: I, output_types: O, data_types: D) -> Self
    where
        I: IntoIterator,
        I::Item: Into<String>,
        O: IntoIterator,
        O::Item: Into<String>,
        D: IntoIterator,
        D::Item: Into<String>,
    {
        Self {
            input_types: input_types.into_iter().map(Into::into).collect(),
            output_types: output_types.into_iter().map(Into::into).collect(),
            data_types: data_types.into_iter().map(Into::into).collect(),
        }
    }

    /// Derive tags from the declared hints of an app's `main`. The input hint
    /// supplies both the connectable input types and the validated data types.
    pub fn from_hints(app: &str, input: TypeHint, output: TypeHint) -> Result<Self, AppError> {
        let input_types = input.resolve(app, "first parameter")?;
        let output_types = output.resolve(app, "return type")?;
        Ok(Self {
            data_types: input_types.clone(),
            input_types,
            output_types,
        })
    }

    pub fn input_types(&self) -> &BTreeSet<String> {
        &self.input_types
    }

    pub fn output_types(&self) -> &BTreeSet<String> {
        &self.output_types
    }

    pub fn data_types(&self) -> &BTreeSet<String> {
        &self.data_types
    }

    /// Whether `producer`'s outputs can feed these inputs.
    pub fn compatible_input(&self, producer: &CapabilityTags) -> bool {
        compatible(producer, self)
    }

    /// Check a runtime value against the accepted data types. Rejection is a
    /// soft failure so it can flow on through the chain.
    pub fn accepts(&self, data: &Data, origin: &str) -> Result<(), NotCompleted> {
        if self.data_types.is_empty()
            || ANY_TYPES.iter().any(|marker| self.data_types.contains(*marker))
        {
            return Ok(());
        }
        if self.data_types.contains(&data.type_name) {
            return Ok(());
        }
        let message = format!(
            "invalid data type, '{}' not in {}",
            data.type_name,
            self.data_types
                .iter()
                .map(String::as_str)
                .collect::<Vec<_>>()
                .join(", ")
        );
        Err(NotCompleted::error(origin, message).with_source_of(data))
    }
}

/// True when at least one of `producer`'s output types is an input type of `consumer`.
pub fn compatible(producer: &CapabilityTags, consumer: &CapabilityTags) -> bool {
    producer
        .output_types
        .intersection(&consumer.input_types)
        .next()
        .is_some()
}

/// Render a type set as `{A, B}`.
pub fn format_types(types: &BTreeSet<String>) -> String {
    let names: Vec<String> = types.iter().map(|name| format!("'{}'", name)).collect();
    format!("{{{}}}", names.join(", "))
}

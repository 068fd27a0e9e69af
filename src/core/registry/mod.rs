//! Registration of user operations as pipeline stage types.
//!
//! An operation becomes a stage type either by implementing [`App`] and being
//! passed to [`AppRegistry::define`], or as a bare function through
//! [`AppRegistry::define_fn`]. Both validate the declaration, derive the
//! capability tags from its type hints and record the type in the registry.

use crate::core::error::AppError;
use crate::core::pipeline::{CallContext, Checkpoint, Operation, Params, Stage, StageParts};
use crate::core::tags::{CapabilityTags, TypeHint};
use crate::core::types::{AppKind, ErrorCategory};
use composable_backend::DataStore;
use composable_types::{Data, Outcome};
use serde_json::Value;
use std::collections::HashMap;
use std::marker::PhantomData;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

/// Members every stage provides itself.
pub const RESERVED_MEMBERS: &[&str] = &["new", "invoke", "call", "fmt", "to_string"];

/// Additional members provided by composable stages.
pub const COMPOSABLE_MEMBERS: &[&str] = &["add", "connect", "input", "disconnect", "apply_to"];

/// A user operation that can be registered as a stage type.
///
/// The associated constants declare what a dynamic registry would otherwise
/// discover by introspection: type hints of `main`, the extra members the
/// type defines, the type it extends and whether its layout is sealed.
pub trait App: Send + Sync + 'static {
    /// Display name of stages built from this app.
    const NAME: &'static str;
    /// Declared type of the `data` argument of `main`.
    const INPUT: TypeHint = TypeHint::Missing;
    /// Declared return type of `main`.
    const OUTPUT: TypeHint = TypeHint::Missing;
    /// Names of the additional members the type defines.
    const MEMBERS: &'static [&'static str] = &[];
    /// Registered type this app derives from, if any.
    const EXTENDS: Option<&'static str> = None;
    /// A sealed layout cannot carry the per-stage state stages need.
    const SEALED: bool = false;

    fn main(&self, data: Data) -> anyhow::Result<Outcome>;

    /// Construction arguments, shown when the stage is displayed.
    fn params(&self) -> Params {
        Params::new()
    }

    /// Store written to by writer apps.
    fn data_store(&self) -> Option<Arc<dyn DataStore>> {
        None
    }

    fn checkpoint(&self) -> Option<Checkpoint> {
        None
    }
}

/// Registration options.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AppOptions {
    pub kind: AppKind,
    pub composable: bool,
}

impl Default for AppOptions {
    fn default() -> Self {
        Self {
            kind: AppKind::Generic,
            composable: true,
        }
    }
}

impl AppOptions {
    pub fn loader() -> Self {
        Self {
            kind: AppKind::Loader,
            ..Self::default()
        }
    }

    pub fn writer() -> Self {
        Self {
            kind: AppKind::Writer,
            ..Self::default()
        }
    }

    pub fn non_composable() -> Self {
        Self {
            composable: false,
            ..Self::default()
        }
    }
}

/// A registered app type; builds stages from app values.
pub struct AppType<A: App> {
    type_name: String,
    options: AppOptions,
    tags: CapabilityTags,
    _app: PhantomData<fn() -> A>,
}

impl<A: App> AppType<A> {
    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    pub fn tags(&self) -> &CapabilityTags {
        &self.tags
    }

    pub fn is_composable(&self) -> bool {
        self.options.composable
    }

    /// Build a stage from `app`. A stage is a writer exactly when the app
    /// owns a data store; a generic app with one is promoted to writer.
    pub fn build(&self, app: A) -> Result<Stage, AppError> {
        let data_store = app.data_store();
        let kind = match (self.options.kind, &data_store) {
            (AppKind::Generic, Some(_)) | (AppKind::Writer, Some(_)) => AppKind::Writer,
            (AppKind::Writer, None) => {
                return Err(registration_error(
                    "CMP-REG-008",
                    format!("{} is registered as a writer but has no data store", self.type_name),
                ))
            }
            (AppKind::Loader, Some(_)) => {
                return Err(registration_error(
                    "CMP-REG-008",
                    format!("{} is a loader and cannot own a data store", self.type_name),
                ))
            }
            (kind, None) => kind,
        };
        Ok(Stage::from_parts(StageParts {
            name: A::NAME.to_string(),
            type_name: self.type_name.clone(),
            kind,
            tags: self.tags.clone(),
            args: Vec::new(),
            params: app.params(),
            composable: self.options.composable,
            checkpoint: app.checkpoint(),
            data_store,
            operation: Box::new(AppOperation { app }),
        }))
    }
}

struct AppOperation<A: App> {
    app: A,
}

impl<A: App> Operation for AppOperation<A> {
    fn main(&self, data: Data, _ctx: &CallContext) -> anyhow::Result<Outcome> {
        self.app.main(data)
    }
}

/// Signature of a bare function stage.
#[derive(Debug, Clone, Copy)]
pub struct FnSignature {
    pub name: &'static str,
    pub module: &'static str,
    pub input: TypeHint,
    pub output: TypeHint,
}

/// Body of a function stage: the data, then captured positional arguments,
/// then keyword arguments.
pub type StageFn = dyn Fn(Data, &[Value], &Params) -> anyhow::Result<Outcome> + Send + Sync;

/// A registered function; builds stages that capture its extra arguments.
#[derive(Clone)]
pub struct FnAppType {
    name: &'static str,
    type_name: String,
    options: AppOptions,
    tags: CapabilityTags,
    func: Arc<StageFn>,
}

impl FnAppType {
    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    pub fn tags(&self) -> &CapabilityTags {
        &self.tags
    }

    pub fn is_composable(&self) -> bool {
        self.options.composable
    }

    pub fn build(&self, args: Vec<Value>, kwargs: Params) -> Stage {
        Stage::from_parts(StageParts {
            name: self.name.to_string(),
            type_name: self.type_name.clone(),
            kind: self.options.kind,
            tags: self.tags.clone(),
            args: args.clone(),
            params: kwargs.clone(),
            composable: self.options.composable,
            checkpoint: None,
            data_store: None,
            operation: Box::new(FnOperation {
                func: Arc::clone(&self.func),
                args,
                kwargs,
            }),
        })
    }
}

struct FnOperation {
    func: Arc<StageFn>,
    args: Vec<Value>,
    kwargs: Params,
}

impl Operation for FnOperation {
    fn main(&self, data: Data, ctx: &CallContext) -> anyhow::Result<Outcome> {
        let kwargs = self.kwargs.merged(&ctx.kwargs);
        (self.func)(data, &self.args, &kwargs)
    }
}

/// Registry of defined stage types, keyed by fully-qualified name, recording
/// whether each is composable.
#[derive(Debug, Default)]
pub struct AppRegistry {
    entries: RwLock<HashMap<String, bool>>,
}

impl AppRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `A` as a stage type.
    pub fn define<A: App>(&self, options: AppOptions) -> Result<AppType<A>, AppError> {
        let type_name = std::any::type_name::<A>().to_string();
        self.ensure_new(&type_name)?;

        if let Some(parent) = A::EXTENDS {
            if self.find(parent).is_some() {
                return Err(registration_error(
                    "CMP-REG-002",
                    format!(
                        "{} extends registered app {}, use composition instead",
                        type_name, parent
                    ),
                ));
            }
        }

        let mut reserved: Vec<&str> = RESERVED_MEMBERS.to_vec();
        if options.composable {
            reserved.extend_from_slice(COMPOSABLE_MEMBERS);
        }
        let clashes: Vec<&str> = A::MEMBERS
            .iter()
            .copied()
            .filter(|member| reserved.contains(member))
            .collect();
        if !clashes.is_empty() {
            return Err(registration_error(
                "CMP-REG-003",
                format!("{} defines reserved members: {}", type_name, clashes.join(", ")),
            ));
        }

        if A::SEALED {
            return Err(registration_error(
                "CMP-REG-007",
                format!("{} has a sealed layout and cannot hold stage state", type_name),
            ));
        }

        let tags = CapabilityTags::from_hints(&type_name, A::INPUT, A::OUTPUT)?;
        self.insert(&type_name, options.composable)?;
        tracing::debug!(app = %type_name, composable = options.composable, "registered app");
        Ok(AppType {
            type_name,
            options,
            tags,
            _app: PhantomData,
        })
    }

    /// Register a bare function as a stage type.
    pub fn define_fn<F>(
        &self,
        signature: FnSignature,
        func: F,
        options: AppOptions,
    ) -> Result<FnAppType, AppError>
    where
        F: Fn(Data, &[Value], &Params) -> anyhow::Result<Outcome> + Send + Sync + 'static,
    {
        let type_name = format!("{}::{}", signature.module, signature.name);
        self.ensure_new(&type_name)?;
        if options.kind == AppKind::Writer {
            return Err(registration_error(
                "CMP-REG-008",
                format!("{} is a function and cannot own the data store a writer needs", type_name),
            ));
        }
        let tags = CapabilityTags::from_hints(&type_name, signature.input, signature.output)?;
        self.insert(&type_name, options.composable)?;
        tracing::debug!(app = %type_name, composable = options.composable, "registered function");
        Ok(FnAppType {
            name: signature.name,
            type_name,
            options,
            tags,
            func: Arc::new(func),
        })
    }

    /// Whether the stage type registered under `name` is composable. The name
    /// may be fully qualified or the final path segment. Unknown names are not.
    pub fn is_composable(&self, name: &str) -> bool {
        self.find(name).map(|(_, composable)| composable).unwrap_or(false)
    }

    pub fn is_composable_type<A: App>(&self) -> bool {
        self.is_composable(std::any::type_name::<A>())
    }

    pub fn is_composable_stage(&self, stage: &Stage) -> bool {
        self.is_composable(stage.type_name()) && stage.is_composable()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.find(name).is_some()
    }

    /// Forget a registration. Returns whether it existed.
    pub fn remove(&self, name: &str) -> bool {
        let key = match self.find(name) {
            Some((key, _)) => key,
            None => return false,
        };
        self.write_entries().remove(&key).is_some()
    }

    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.read_entries().keys().cloned().collect();
        names.sort();
        names
    }

    fn ensure_new(&self, type_name: &str) -> Result<(), AppError> {
        if self.read_entries().contains_key(type_name) {
            return Err(registration_error(
                "CMP-REG-001",
                format!("{} is already registered", type_name),
            ));
        }
        Ok(())
    }

    fn insert(&self, type_name: &str, composable: bool) -> Result<(), AppError> {
        let mut entries = self.write_entries();
        if entries.contains_key(type_name) {
            return Err(registration_error(
                "CMP-REG-001",
                format!("{} is already registered", type_name),
            ));
        }
        entries.insert(type_name.to_string(), composable);
        Ok(())
    }

    /// Exact match first, then a unique `::<name>` suffix. A short name shared
    /// by several registrations resolves to nothing.
    fn find(&self, name: &str) -> Option<(String, bool)> {
        let entries = self.read_entries();
        if let Some(composable) = entries.get(name) {
            return Some((name.to_string(), *composable));
        }
        let suffix = format!("::{}", name);
        let mut matches = entries.iter().filter(|(key, _)| key.ends_with(&suffix));
        let found = matches.next();
        if matches.next().is_some() {
            tracing::warn!(name, "short name matches several registered apps, use the full name");
            return None;
        }
        found.map(|(key, composable)| (key.clone(), *composable))
    }

    fn read_entries(&self) -> RwLockReadGuard<'_, HashMap<String, bool>> {
        self.entries.read().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn write_entries(&self) -> RwLockWriteGuard<'_, HashMap<String, bool>> {
        self.entries.write().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

fn registration_error(code: &str, message: String) -> AppError {
    AppError::new(ErrorCategory::RegistrationError, message).with_code(code)
}

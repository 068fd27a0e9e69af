//! Pipeline stages.
//!
//! A [`Stage`] is a shared handle to one operation plus its position in a
//! linear chain. Chains are singly linked from the tail: each stage owns an
//! optional predecessor and invoking the tail pulls data through every stage
//! upstream of it.

pub mod checkpoint;
pub mod connect;
pub mod invoke;
pub mod params;

pub use checkpoint::Checkpoint;
pub use connect::connect;
pub use invoke::CallContext;
pub use params::Params;

use crate::core::tags::CapabilityTags;
use crate::core::types::AppKind;
use composable_backend::DataStore;
use composable_types::{Data, Outcome};
use serde_json::Value;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

/// Column width of the rendered chain.
const DISPLAY_WIDTH: usize = 80;

/// The body of a stage. Registered apps and bare functions are both adapted
/// to this trait by the registry.
pub trait Operation: Send + Sync {
    fn main(&self, data: Data, ctx: &CallContext) -> anyhow::Result<Outcome>;
}

/// Everything needed to build a stage.
pub(crate) struct StageParts {
    pub name: String,
    pub type_name: String,
    pub kind: AppKind,
    pub tags: CapabilityTags,
    pub args: Vec<Value>,
    pub params: Params,
    pub composable: bool,
    pub checkpoint: Option<Checkpoint>,
    pub data_store: Option<Arc<dyn DataStore>>,
    pub operation: Box<dyn Operation>,
}

struct StageInner {
    name: String,
    type_name: String,
    kind: AppKind,
    tags: CapabilityTags,
    args: Vec<Value>,
    params: Params,
    composable: bool,
    checkpoint: Option<Checkpoint>,
    data_store: Option<Arc<dyn DataStore>>,
    operation: Box<dyn Operation>,
    predecessor: Mutex<Option<Stage>>,
    has_successor: AtomicBool,
}

/// Shared handle to a pipeline stage. Clones refer to the same stage.
#[derive(Clone)]
pub struct Stage {
    inner: Arc<StageInner>,
}

impl Stage {
    pub(crate) fn from_parts(parts: StageParts) -> Self {
        Self {
            inner: Arc::new(StageInner {
                name: parts.name,
                type_name: parts.type_name,
                kind: parts.kind,
                tags: parts.tags,
                args: parts.args,
                params: parts.params,
                composable: parts.composable,
                checkpoint: parts.checkpoint,
                data_store: parts.data_store,
                operation: parts.operation,
                predecessor: Mutex::new(None),
                has_successor: AtomicBool::new(false),
            }),
        }
    }

    /// Display name, also used as the origin of failures raised here.
    pub fn name(&self) -> &str {
        &self.inner.name
    }

    /// Fully-qualified name the stage type is registered under.
    pub fn type_name(&self) -> &str {
        &self.inner.type_name
    }

    pub fn kind(&self) -> AppKind {
        self.inner.kind
    }

    pub fn tags(&self) -> &CapabilityTags {
        &self.inner.tags
    }

    pub fn args(&self) -> &[Value] {
        &self.inner.args
    }

    pub fn params(&self) -> &Params {
        &self.inner.params
    }

    pub fn is_composable(&self) -> bool {
        self.inner.composable
    }

    pub fn checkpoint(&self) -> Option<&Checkpoint> {
        self.inner.checkpoint.as_ref()
    }

    pub fn data_store(&self) -> Option<&Arc<dyn DataStore>> {
        self.inner.data_store.as_ref()
    }

    /// A writer persists its results through a data store.
    pub fn is_writer(&self) -> bool {
        self.inner.data_store.is_some()
    }

    pub fn predecessor(&self) -> Option<Stage> {
        self.predecessor_slot().clone()
    }

    /// Whether this stage currently feeds another stage.
    pub fn has_successor(&self) -> bool {
        self.inner.has_successor.load(Ordering::SeqCst)
    }

    pub fn ptr_eq(&self, other: &Stage) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    /// Every stage of the chain ending here, head first.
    pub fn chain(&self) -> Vec<Stage> {
        let mut stages = vec![self.clone()];
        let mut current = self.predecessor();
        while let Some(stage) = current {
            current = stage.predecessor();
            stages.push(stage);
        }
        stages.reverse();
        stages
    }

    /// `name(args, key=value)` for this stage alone.
    pub fn signature(&self) -> String {
        let mut parts: Vec<String> = self.inner.args.iter().map(|arg| arg.to_string()).collect();
        if !self.inner.params.is_empty() {
            parts.push(self.inner.params.to_string());
        }
        format!("{}({})", self.inner.name, parts.join(", "))
    }

    fn predecessor_slot(&self) -> MutexGuard<'_, Option<Stage>> {
        self.inner
            .predecessor
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn set_has_successor(&self, value: bool) {
        self.inner.has_successor.store(value, Ordering::SeqCst);
    }

    pub(crate) fn operation(&self) -> &dyn Operation {
        self.inner.operation.as_ref()
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let rendered: Vec<String> = self.chain().iter().map(Stage::signature).collect();
        write!(f, "{}", params::wrap(&rendered.join(" + "), DISPLAY_WIDTH))
    }
}

impl fmt::Debug for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Stage")
            .field("name", &self.inner.name)
            .field("type_name", &self.inner.type_name)
            .field("kind", &self.inner.kind)
            .field("composable", &self.inner.composable)
            .field("has_predecessor", &self.predecessor_slot().is_some())
            .field("has_successor", &self.has_successor())
            .finish()
    }
}

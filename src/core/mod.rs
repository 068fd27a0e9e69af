pub mod config;
pub mod error;
pub mod pipeline;
pub mod registry;
pub mod run_log;
pub mod runner;
pub mod tags;
pub mod types;

pub use config::{ComposableConfig, ConfigLoader, ConfigValidator};
pub use error::AppError;
pub use pipeline::{connect, CallContext, Checkpoint, Operation, Params, Stage};
pub use registry::{App, AppOptions, AppRegistry, AppType, FnAppType, FnSignature};
pub use run_log::{CachingLogger, LogSink};
pub use runner::{
    BatchRunner, ParallelConfig, ParallelExecutor, RunnerConfig, ThreadPoolExecutor,
};
pub use tags::{compatible, CapabilityTags, TypeHint};
pub use types::*;

//! Audit log written alongside a writer's outputs during a batch run.

use crate::core::error::AppError;
use crate::core::types::ErrorCategory;
use chrono::Utc;
use regex::Regex;
use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

/// Destination of batch-run audit lines.
pub trait LogSink: Send {
    fn log_message(&mut self, message: &str, label: &str) -> Result<(), AppError>;

    /// Record `name==version` for each component.
    fn log_versions(&mut self, components: &[(&str, &str)]) -> Result<(), AppError> {
        for (name, version) in components {
            self.log_message(&format!("{}=={}", name, version), "version")?;
        }
        Ok(())
    }

    fn log_file_path(&self) -> Option<&Path>;

    fn set_log_file_path(&mut self, path: PathBuf) -> Result<(), AppError>;

    fn shutdown(&mut self) -> Result<(), AppError>;
}

/// Logger that holds lines in memory until it knows where to write them.
#[derive(Debug)]
pub struct CachingLogger {
    path: Option<PathBuf>,
    file: Option<File>,
    cache: Vec<String>,
    pid: u32,
}

impl Default for CachingLogger {
    fn default() -> Self {
        Self::new()
    }
}

impl CachingLogger {
    pub fn new() -> Self {
        Self {
            path: None,
            file: None,
            cache: Vec::new(),
            pid: std::process::id(),
        }
    }

    /// Lines not yet flushed to a file.
    pub fn cached(&self) -> &[String] {
        &self.cache
    }

    fn format_line(&self, message: &str, label: &str) -> String {
        format!(
            "{}\tpid{}\t{} : {}",
            Utc::now().to_rfc3339(),
            self.pid,
            label,
            message
        )
    }

    fn write_line(file: &mut File, path: &Path, line: &str) -> Result<(), AppError> {
        writeln!(file, "{}", line).map_err(|err| log_io_error("write", path, err))
    }
}

impl LogSink for CachingLogger {
    fn log_message(&mut self, message: &str, label: &str) -> Result<(), AppError> {
        tracing::info!(target: "composable::run_log", label, "{}", message);
        let line = self.format_line(message, label);
        match (&mut self.file, &self.path) {
            (Some(file), Some(path)) => Self::write_line(file, path, &line),
            _ => {
                self.cache.push(line);
                Ok(())
            }
        }
    }

    fn log_file_path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    fn set_log_file_path(&mut self, path: PathBuf) -> Result<(), AppError> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).map_err(|err| log_io_error("create", parent, err))?;
            }
        }
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .map_err(|err| log_io_error("open", &path, err))?;
        for line in self.cache.drain(..) {
            Self::write_line(&mut file, &path, &line)?;
        }
        self.file = Some(file);
        self.path = Some(path);
        Ok(())
    }

    fn shutdown(&mut self) -> Result<(), AppError> {
        if let (Some(file), Some(path)) = (&mut self.file, &self.path) {
            file.flush().map_err(|err| log_io_error("flush", path, err))?;
        }
        self.file = None;
        Ok(())
    }
}

fn log_io_error(action: &str, path: &Path, err: std::io::Error) -> AppError {
    let mut error = AppError::new(
        ErrorCategory::IoError,
        format!("failed to {} log file {}: {}", action, path.display(), err),
    )
    .with_code("CMP-LOG-001");
    error.source = Some(anyhow::anyhow!(err));
    error
}

fn stage_separator() -> &'static Regex {
    static SEPARATOR: OnceLock<Regex> = OnceLock::new();
    SEPARATOR.get_or_init(|| Regex::new(r"\s+\+\s+").expect("static regex is valid"))
}

/// `<stage names joined by '-'>-pid<pid>.log` for a rendered chain such as
/// `load_text() + write_json(...)`.
pub fn make_logfile_name(chain: &str) -> String {
    let names: Vec<&str> = stage_separator()
        .split(chain.trim())
        .map(|part| part.split('(').next().unwrap_or(part).trim())
        .filter(|name| !name.is_empty())
        .collect();
    format!("{}-pid{}.log", names.join("-"), std::process::id())
}

/// Default log location: next to the store, never inside it.
pub fn default_log_path(store_source: &Path, chain: &str) -> PathBuf {
    let parent = store_source.parent().unwrap_or_else(|| Path::new("."));
    parent.join(make_logfile_name(chain))
}

use composable::core::error::AppError;
use composable::core::run_log::{default_log_path, make_logfile_name, CachingLogger, LogSink};
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// Sink that only keeps lines in memory.
#[derive(Default)]
struct MemorySink {
    lines: Vec<(String, String)>,
    path: Option<PathBuf>,
}

impl LogSink for MemorySink {
    fn log_message(&mut self, message: &str, label: &str) -> Result<(), AppError> {
        self.lines.push((label.to_string(), message.to_string()));
        Ok(())
    }

    fn log_file_path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    fn set_log_file_path(&mut self, path: PathBuf) -> Result<(), AppError> {
        self.path = Some(path);
        Ok(())
    }

    fn shutdown(&mut self) -> Result<(), AppError> {
        Ok(())
    }
}

#[test]
fn test_log_versions_default_format() {
    let mut sink = MemorySink::default();
    sink.log_versions(&[("composable", "0.1.0"), ("serde", "1.0")])
        .unwrap();
    assert_eq!(
        sink.lines,
        vec![
            ("version".to_string(), "composable==0.1.0".to_string()),
            ("version".to_string(), "serde==1.0".to_string()),
        ]
    );
}

#[test]
fn test_caching_logger_line_format() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("logs").join("run.log");
    let mut logger = CachingLogger::new();
    logger.set_log_file_path(path.clone()).unwrap();
    assert_eq!(logger.log_file_path(), Some(path.as_path()));

    logger.log_message("min_length : 3 < min_length 5", "FAIL").unwrap();
    logger.shutdown().unwrap();

    let content = fs::read_to_string(&path).unwrap();
    let fields: Vec<&str> = content.trim_end().split('\t').collect();
    assert_eq!(fields.len(), 3);
    assert!(chrono::DateTime::parse_from_rfc3339(fields[0]).is_ok());
    assert_eq!(fields[1], format!("pid{}", std::process::id()));
    assert_eq!(fields[2], "FAIL : min_length : 3 < min_length 5");
}

#[test]
fn test_caching_logger_appends_to_existing_file() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("run.log");
    fs::write(&path, "earlier line\n").unwrap();

    let mut logger = CachingLogger::new();
    logger.log_message("cached", "input").unwrap();
    logger.set_log_file_path(path.clone()).unwrap();
    assert!(logger.cached().is_empty());
    logger.shutdown().unwrap();

    let content = fs::read_to_string(&path).unwrap();
    assert!(content.starts_with("earlier line\n"));
    assert!(content.trim_end().ends_with("input : cached"));
}

#[test]
fn test_logfile_name_uses_stage_names() {
    let name = make_logfile_name("load_text() + min_length(length=5) + write_json(data_store=\"/out\")");
    assert!(name.starts_with("load_text-min_length-write_json-pid"));
    assert!(name.ends_with(".log"));
}

#[test]
fn test_default_log_path_sits_beside_store() {
    let path = default_log_path(Path::new("/data/results"), "load_text() + write_json()");
    assert_eq!(
        path,
        PathBuf::from(format!(
            "/data/load_text-write_json-pid{}.log",
            std::process::id()
        ))
    );
}

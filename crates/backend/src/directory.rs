use crate::{compute_sha256_hex, DataMember, DataStore, IfExists, StoreError};
use composable_types::{identifier_stem, NotCompleted};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};

const INCOMPLETE_DIR: &str = "not_completed";
const LOGS_DIR: &str = "logs";

/// Store that keeps one file per member under a root directory.
///
/// Layout:
/// - `<root>/<name>.<suffix>` completed members
/// - `<root>/not_completed/<name>.json` failure records
/// - `<root>/logs/<file>` attached run logs
pub struct DirectoryDataStore {
    root: PathBuf,
    suffix: String,
    if_exists: IfExists,
    closed: AtomicBool,
}

impl DirectoryDataStore {
    /// Open the store at `root`. The directory is created when `create` is set,
    /// otherwise it must already exist.
    pub fn new(
        root: impl Into<PathBuf>,
        suffix: &str,
        create: bool,
        if_exists: IfExists,
    ) -> Result<Self, StoreError> {
        let root = root.into();
        if !root.is_dir() {
            if create {
                fs::create_dir_all(&root)
                    .map_err(|err| StoreError::io("create store directory", &root, err))?;
            } else {
                return Err(StoreError::io(
                    "open store directory",
                    &root,
                    std::io::Error::new(std::io::ErrorKind::NotFound, "directory does not exist"),
                ));
            }
        }
        Ok(Self {
            root,
            suffix: suffix.trim_start_matches('.').to_string(),
            if_exists,
            closed: AtomicBool::new(false),
        })
    }

    pub fn suffix(&self) -> &str {
        &self.suffix
    }

    fn ensure_open(&self) -> Result<(), StoreError> {
        if self.closed.load(Ordering::SeqCst) {
            return Err(StoreError::Closed(self.root.clone()));
        }
        Ok(())
    }

    fn incomplete_path(&self, name: &str) -> PathBuf {
        self.root.join(INCOMPLETE_DIR).join(format!("{}.json", name))
    }
}

impl DataStore for DirectoryDataStore {
    fn source(&self) -> &Path {
        &self.root
    }

    fn if_exists(&self) -> IfExists {
        self.if_exists
    }

    fn contains(&self, identifier: &str) -> bool {
        Path::new(&self.make_absolute_identifier(identifier)).is_file()
    }

    fn make_absolute_identifier(&self, name: &str) -> String {
        let stem = identifier_stem(name);
        self.root
            .join(format!("{}.{}", stem, self.suffix))
            .display()
            .to_string()
    }

    fn write(&self, identifier: &str, content: &str) -> Result<DataMember, StoreError> {
        self.ensure_open()?;
        let identifier = self.make_absolute_identifier(identifier);
        let name = identifier_stem(&identifier);
        atomic_write(Path::new(&identifier), content.as_bytes())?;

        // a success supersedes any failure recorded by an earlier run
        let stale = self.incomplete_path(&name);
        if stale.is_file() {
            let _ = fs::remove_file(&stale);
        }

        tracing::debug!(identifier = %identifier, "wrote store member");
        Ok(DataMember {
            name,
            identifier,
            checksum: Some(compute_sha256_hex(content.as_bytes())),
        })
    }

    fn write_incomplete(
        &self,
        identifier: &str,
        record: &NotCompleted,
    ) -> Result<DataMember, StoreError> {
        self.ensure_open()?;
        let name = identifier_stem(identifier);
        let path = self.incomplete_path(&name);
        let content = record.to_json();
        atomic_write(&path, content.as_bytes())?;
        tracing::debug!(name = %name, kind = %record.kind, "recorded incomplete member");
        Ok(DataMember {
            name,
            identifier: path.display().to_string(),
            checksum: Some(compute_sha256_hex(content.as_bytes())),
        })
    }

    fn add_file(
        &self,
        path: &Path,
        cleanup: bool,
        keep_suffix: bool,
    ) -> Result<DataMember, StoreError> {
        self.ensure_open()?;
        let file_name = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        let name = identifier_stem(&file_name);
        let target_name = if keep_suffix { file_name } else { name.clone() };
        let target = self.root.join(LOGS_DIR).join(target_name);

        let bytes = fs::read(path).map_err(|err| StoreError::io("read", path, err))?;
        atomic_write(&target, &bytes)?;
        if cleanup {
            fs::remove_file(path).map_err(|err| StoreError::io("remove", path, err))?;
        }
        Ok(DataMember {
            name,
            identifier: target.display().to_string(),
            checksum: Some(compute_sha256_hex(&bytes)),
        })
    }

    fn close(&self) -> Result<(), StoreError> {
        self.closed.store(true, Ordering::SeqCst);
        Ok(())
    }

    fn members(&self) -> Vec<DataMember> {
        let suffix = format!(".{}", self.suffix);
        list_members(&self.root, |name| name.ends_with(&suffix))
    }

    fn logs(&self) -> Vec<DataMember> {
        list_members(&self.root.join(LOGS_DIR), |_| true)
    }

    fn incomplete(&self) -> Vec<DataMember> {
        list_members(&self.root.join(INCOMPLETE_DIR), |name| name.ends_with(".json"))
    }
}

fn list_members(dir: &Path, keep: impl Fn(&str) -> bool) -> Vec<DataMember> {
    let mut members = Vec::new();
    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(_) => return members,
    };
    for entry in entries.flatten() {
        let path = entry.path();
        if !path.is_file() {
            continue;
        }
        let file_name = entry.file_name().to_string_lossy().into_owned();
        if !keep(&file_name) {
            continue;
        }
        let checksum = fs::read(&path).ok().map(|bytes| compute_sha256_hex(&bytes));
        members.push(DataMember {
            name: identifier_stem(&file_name),
            identifier: path.display().to_string(),
            checksum,
        });
    }
    members.sort_by(|a, b| a.name.cmp(&b.name));
    members
}

fn atomic_write(path: &Path, data: &[u8]) -> Result<(), StoreError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|err| StoreError::io("create", parent, err))?;
    }
    let tmp = path.with_extension("tmp");
    fs::write(&tmp, data).map_err(|err| StoreError::io("write", &tmp, err))?;
    fs::rename(&tmp, path).map_err(|err| StoreError::io("rename", &tmp, err))?;
    Ok(())
}

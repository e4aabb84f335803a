//! Snapshot persistence for the voting store.
//!
//! Every resource class is mirrored as one full JSON snapshot. Writes replace
//! the whole snapshot; there is no log and no backup generation.

use std::{
    collections::HashMap,
    fmt, fs,
    io::{self, Write},
    path::{Path, PathBuf},
    sync::{
        Mutex, PoisonError,
        atomic::{AtomicBool, Ordering},
    },
};

/// Independently persisted resource classes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Resource {
    Users,
    Items,
    Util,
}

impl Resource {
    pub fn file_name(self) -> &'static str {
        match self {
            Resource::Users => "users.json",
            Resource::Items => "items.json",
            Resource::Util => "util.json",
        }
    }
}

impl fmt::Display for Resource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Resource::Users => "users",
            Resource::Items => "items",
            Resource::Util => "util",
        };
        f.write_str(name)
    }
}

/// Backing storage for full snapshots, injected into the store.
pub trait Snapshots: Send + Sync {
    /// Returns `Ok(None)` when the resource has never been written.
    fn load(&self, resource: Resource) -> io::Result<Option<Vec<u8>>>;

    /// Replaces the stored snapshot for `resource`.
    fn save(&self, resource: Resource, bytes: &[u8]) -> io::Result<()>;
}

/// One JSON file per resource inside a data directory.
///
/// Saves go to a temporary sibling that is fsynced and renamed over the
/// target, so a crash mid-write leaves the previous snapshot intact.
#[derive(Debug, Clone)]
pub struct JsonDir {
    root: PathBuf,
}

impl JsonDir {
    /// Opens `root`, creating it if needed.
    pub fn open(root: impl AsRef<Path>) -> io::Result<Self> {
        let root = root.as_ref().to_path_buf();
        fs::create_dir_all(&root)?;
        Ok(Self { root })
    }

    pub fn path_of(&self, resource: Resource) -> PathBuf {
        self.root.join(resource.file_name())
    }

    fn temp_path_of(&self, resource: Resource) -> PathBuf {
        self.root.join(format!(".{}.tmp", resource.file_name()))
    }
}

impl Snapshots for JsonDir {
    fn load(&self, resource: Resource) -> io::Result<Option<Vec<u8>>> {
        match fs::read(self.path_of(resource)) {
            Ok(bytes) => Ok(Some(bytes)),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(err) => Err(err),
        }
    }

    fn save(&self, resource: Resource, bytes: &[u8]) -> io::Result<()> {
        let temp = self.temp_path_of(resource);
        {
            let mut file = fs::File::create(&temp)?;
            file.write_all(bytes)?;
            file.sync_all()?;
        }
        fs::rename(&temp, self.path_of(resource))
    }
}

/// In-process snapshots with switchable write failures.
#[derive(Debug, Default)]
pub struct MemorySnapshots {
    files: Mutex<HashMap<Resource, Vec<u8>>>,
    fail_writes: AtomicBool,
}

impl MemorySnapshots {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every subsequent `save` fail (or succeed again).
    pub fn fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    /// Last successfully saved bytes for `resource`.
    pub fn contents(&self, resource: Resource) -> Option<Vec<u8>> {
        self.files
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&resource)
            .cloned()
    }

    pub fn seed(&self, resource: Resource, bytes: impl Into<Vec<u8>>) {
        self.files
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(resource, bytes.into());
    }
}

impl Snapshots for MemorySnapshots {
    fn load(&self, resource: Resource) -> io::Result<Option<Vec<u8>>> {
        Ok(self.contents(resource))
    }

    fn save(&self, resource: Resource, bytes: &[u8]) -> io::Result<()> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(io::Error::other(format!("{resource} snapshot is read-only")));
        }
        self.seed(resource, bytes);
        Ok(())
    }
}

impl<S: Snapshots + ?Sized> Snapshots for std::sync::Arc<S> {
    fn load(&self, resource: Resource) -> io::Result<Option<Vec<u8>>> {
        (**self).load(resource)
    }

    fn save(&self, resource: Resource, bytes: &[u8]) -> io::Result<()> {
        (**self).save(resource, bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_snapshot_loads_as_none() {
        let dir = tempfile::tempdir().expect("tempdir");
        let snapshots = JsonDir::open(dir.path()).expect("open");
        assert!(snapshots.load(Resource::Users).expect("load").is_none());
    }

    #[test]
    fn save_replaces_previous_snapshot_and_leaves_no_temp_file() {
        let dir = tempfile::tempdir().expect("tempdir");
        let snapshots = JsonDir::open(dir.path().join("nested")).expect("open");

        snapshots.save(Resource::Items, b"{\"1\":{}}").expect("first save");
        snapshots.save(Resource::Items, b"{}").expect("second save");

        let stored = snapshots.load(Resource::Items).expect("load");
        assert_eq!(stored.as_deref(), Some(&b"{}"[..]));
        assert!(!snapshots.temp_path_of(Resource::Items).exists());
        assert!(snapshots.path_of(Resource::Items).ends_with("items.json"));
    }

    #[test]
    fn memory_snapshots_can_refuse_writes() {
        let snapshots = MemorySnapshots::new();
        snapshots.save(Resource::Util, b"a").expect("save");
        snapshots.fail_writes(true);
        assert!(snapshots.save(Resource::Util, b"b").is_err());
        assert_eq!(snapshots.contents(Resource::Util).as_deref(), Some(&b"a"[..]));
    }
}

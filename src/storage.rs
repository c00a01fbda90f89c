// --- Atomic JSON persistence ---

use std::{
    fs::{self, File, OpenOptions},
    io::{BufWriter, ErrorKind, Write},
    path::{Path, PathBuf},
    sync::{Mutex, MutexGuard, PoisonError},
};

use fs4::fs_std::FileExt;
use serde::{Deserialize, Serialize};
use tempfile::NamedTempFile; // For atomic writes
use tracing::{debug, warn};

use crate::{
    error::{Result, TodoError},
    model::Item,
};

/// Current on-disk layout version.
const FORMAT_VERSION: u32 = 1;

/// Whole-collection persistence. Implementations must make `save` atomic
/// for readers: a concurrent `load` sees the old or the new collection,
/// never a mix.
pub trait Store: Send + Sync {
    /// Held for the span of one mutation, across processes where the
    /// medium allows it.
    type Guard<'a>
    where
        Self: 'a;

    fn lock(&self) -> Result<Self::Guard<'_>>;

    /// Full current collection. A store that was never written is empty.
    fn load(&self) -> Result<Vec<Item>>;

    /// Replace the entire collection.
    fn save(&self, items: &[Item]) -> Result<()>;
}

// --- File layout ---
#[derive(Debug, Serialize)]
struct TodoFile<'a> {
    version: u32,
    items: &'a [Item],
}

#[derive(Debug, Deserialize)]
struct StoredFile {
    version: u32,
    items: Vec<Item>,
}

/// Parse either layout. The first significant byte picks the decoder, so a
/// broken file reports where it broke.
fn decode(bytes: &[u8]) -> std::result::Result<Vec<Item>, serde_json::Error> {
    // Bare array, as written by earlier deployments.
    if bytes.iter().find(|b| !b.is_ascii_whitespace()) == Some(&b'[') {
        return serde_json::from_slice(bytes);
    }

    let file: StoredFile = serde_json::from_slice(bytes)?;
    if file.version != FORMAT_VERSION {
        return Err(<serde_json::Error as serde::de::Error>::custom(format_args!(
            "unsupported format version {} (expected {FORMAT_VERSION})",
            file.version
        )));
    }
    Ok(file.items)
}

/// JSON file store. Cross-process exclusion uses an advisory lock on a
/// sidecar `<file>.lock`, since the data file itself is replaced by rename
/// on every save.
#[derive(Debug, Clone)]
pub struct FileStore {
    path: PathBuf,
    lock_path: PathBuf,
}

impl FileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let mut lock_path = path.clone().into_os_string();
        lock_path.push(".lock");
        Self {
            path,
            lock_path: PathBuf::from(lock_path),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Store for FileStore {
    type Guard<'a> = File;

    fn lock(&self) -> Result<File> {
        ensure_parent(&self.path)?;
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(&self.lock_path)
            .map_err(|e| {
                TodoError::unavailable(format!("opening {}", self.lock_path.display()), e)
            })?;
        lock_file(&file, &self.lock_path)?;
        Ok(file)
    }

    fn load(&self) -> Result<Vec<Item>> {
        let bytes = match fs::read(&self.path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!(path = %self.path.display(), "no backing file yet, starting empty");
                return Ok(Vec::new());
            }
            Err(e) => {
                return Err(TodoError::unavailable(
                    format!("reading {}", self.path.display()),
                    e,
                ));
            }
        };

        let items = decode(&bytes).map_err(|source| {
            warn!(path = %self.path.display(), error = %source, "backing file is corrupt");
            TodoError::StorageCorrupt {
                path: self.path.clone(),
                source,
            }
        })?;

        debug!(path = %self.path.display(), count = items.len(), "loaded collection");
        Ok(items)
    }

    fn save(&self, items: &[Item]) -> Result<()> {
        atomic_write(
            &self.path,
            &TodoFile {
                version: FORMAT_VERSION,
                items,
            },
        )?;
        debug!(path = %self.path.display(), count = items.len(), "saved collection");
        Ok(())
    }
}

/// Atomically write any serializable value to `path`. The previous content
/// is replaced only once the whole payload is on disk.
pub fn atomic_write<T>(path: &Path, value: &T) -> Result<()>
where
    T: Serialize,
{
    let dir = ensure_parent(path)?;

    // Temp file in the *same* directory so the rename stays on one filesystem.
    let tmp = NamedTempFile::new_in(dir)
        .map_err(|e| TodoError::unavailable("creating temp file", e))?;

    let mut writer = BufWriter::new(tmp);
    serde_json::to_writer_pretty(&mut writer, value).map_err(|e| {
        TodoError::unavailable("serializing collection", std::io::Error::from(e))
    })?;
    writer
        .write_all(b"\n")
        .map_err(|e| TodoError::unavailable("writing temp file", e))?;
    let tmp = writer
        .into_inner()
        .map_err(|e| TodoError::unavailable("flushing temp file", e.into_error()))?;

    tmp.as_file()
        .sync_all()
        .map_err(|e| TodoError::unavailable("syncing temp file", e))?;

    // atomic rename over the final path on POSIX, replace-file on Windows
    tmp.persist(path)
        .map_err(|e| TodoError::unavailable(format!("persist {}", path.display()), e.error))?;

    Ok(())
}

fn ensure_parent(path: &Path) -> Result<&Path> {
    match path.parent().filter(|p| !p.as_os_str().is_empty()) {
        Some(dir) => {
            fs::create_dir_all(dir)
                .map_err(|e| TodoError::unavailable(format!("creating {}", dir.display()), e))?;
            Ok(dir)
        }
        None => Ok(Path::new(".")),
    }
}

// --- Internal Helper: advisory locking ---
fn lock_file(file: &File, path: &Path) -> Result<()> {
    file.lock_exclusive()
        .map_err(|e| TodoError::unavailable(format!("locking {}", path.display()), e))
}

/// In-process store, for tests and embedding. Same contract as
/// [`FileStore`], minus the disk.
#[derive(Debug, Default)]
pub struct MemoryStore {
    items: Mutex<Vec<Item>>,
    writer: Mutex<()>,
}

impl MemoryStore {
    pub fn with_items(items: Vec<Item>) -> Self {
        Self {
            items: Mutex::new(items),
            writer: Mutex::new(()),
        }
    }
}

impl Store for MemoryStore {
    type Guard<'a> = MutexGuard<'a, ()>;

    fn lock(&self) -> Result<MutexGuard<'_, ()>> {
        Ok(self.writer.lock().unwrap_or_else(PoisonError::into_inner))
    }

    fn load(&self) -> Result<Vec<Item>> {
        Ok(self
            .items
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone())
    }

    fn save(&self, items: &[Item]) -> Result<()> {
        *self.items.lock().unwrap_or_else(PoisonError::into_inner) = items.to_vec();
        Ok(())
    }
}

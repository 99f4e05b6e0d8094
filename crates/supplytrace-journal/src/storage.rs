use std::io::Write as IoWrite;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use crate::error::JournalError;

/// Byte-level backend for a [`Journal`](crate::Journal).
///
/// Storage is a single append-only byte sequence; framing, checksums and
/// the hash chain live one layer up.
pub trait JournalStorage: Send + Sync {
    fn read_all(&self) -> Result<Vec<u8>, JournalError>;
    fn append(&mut self, data: &[u8]) -> Result<(), JournalError>;
    fn flush(&mut self) -> Result<(), JournalError>;
    fn sync(&mut self) -> Result<(), JournalError>;
    /// Cut the journal back to `len` bytes (torn-tail repair and failed writes).
    fn truncate(&mut self, len: u64) -> Result<(), JournalError>;
    fn describe(&self) -> String;
}

// ---- File-backed storage ----

pub struct FileJournal {
    path: PathBuf,
    file: std::fs::File,
}

impl FileJournal {
    pub fn open(path: impl AsRef<Path>) -> Result<Self, JournalError> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let file = std::fs::OpenOptions::new()
            .create(true)
            .read(true)
            .append(true)
            .open(&path)?;
        Ok(Self { path, file })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl JournalStorage for FileJournal {
    fn read_all(&self) -> Result<Vec<u8>, JournalError> {
        Ok(std::fs::read(&self.path)?)
    }

    fn append(&mut self, data: &[u8]) -> Result<(), JournalError> {
        self.file.write_all(data)?;
        Ok(())
    }

    fn flush(&mut self) -> Result<(), JournalError> {
        self.file.flush()?;
        Ok(())
    }

    fn sync(&mut self) -> Result<(), JournalError> {
        self.file.sync_all()?;
        Ok(())
    }

    fn truncate(&mut self, len: u64) -> Result<(), JournalError> {
        self.file.set_len(len)?;
        self.file.sync_all()?;
        Ok(())
    }

    fn describe(&self) -> String {
        format!("file:{}", self.path.display())
    }
}

// ---- In-memory storage ----

/// In-memory journal bytes.
///
/// Clones share the same buffer, so a test can drop a tracker and reopen
/// the same journal. Writes can be made to fail on demand.
#[derive(Clone, Default)]
pub struct MemoryJournal {
    bytes: Arc<Mutex<Vec<u8>>>,
    fail_writes: Arc<AtomicBool>,
}

impl MemoryJournal {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_bytes(bytes: Vec<u8>) -> Self {
        Self {
            bytes: Arc::new(Mutex::new(bytes)),
            fail_writes: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Copy of the raw journal bytes.
    pub fn snapshot(&self) -> Result<Vec<u8>, JournalError> {
        self.read_all()
    }

    /// When set, every append fails with an I/O error and writes nothing.
    pub fn fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }
}

impl JournalStorage for MemoryJournal {
    fn read_all(&self) -> Result<Vec<u8>, JournalError> {
        let bytes = self.bytes.lock().map_err(|_| JournalError::LockPoisoned)?;
        Ok(bytes.clone())
    }

    fn append(&mut self, data: &[u8]) -> Result<(), JournalError> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(JournalError::Io(std::io::Error::other(
                "memory journal rejecting writes",
            )));
        }
        let mut bytes = self.bytes.lock().map_err(|_| JournalError::LockPoisoned)?;
        bytes.extend_from_slice(data);
        Ok(())
    }

    fn flush(&mut self) -> Result<(), JournalError> {
        Ok(())
    }

    fn sync(&mut self) -> Result<(), JournalError> {
        Ok(())
    }

    fn truncate(&mut self, len: u64) -> Result<(), JournalError> {
        let mut bytes = self.bytes.lock().map_err(|_| JournalError::LockPoisoned)?;
        let len = usize::try_from(len).map_err(|_| JournalError::Corruption {
            offset: len,
            reason: "truncate offset exceeds address space".to_string(),
        })?;
        bytes.truncate(len);
        Ok(())
    }

    fn describe(&self) -> String {
        "memory".to_string()
    }
}

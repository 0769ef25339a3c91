//! Checkpoint stores keyed by thread id

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::sync::RwLock;
use tracing::{debug, warn};

use crate::{Result, SessionError, SessionState};

/// Pluggable persistence for [`SessionState`].
///
/// Implementations must tolerate concurrent calls for distinct thread ids.
#[async_trait]
pub trait CheckpointStore: Send + Sync {
    /// `None` when the thread has never been saved
    async fn load(&self, thread_id: &str) -> Result<Option<SessionState>>;

    async fn save(&self, state: &SessionState) -> Result<()>;

    /// Returns whether anything was removed
    async fn delete(&self, thread_id: &str) -> Result<bool>;

    async fn list(&self) -> Result<Vec<String>>;
}

/// Process-lifetime store
#[derive(Default)]
pub struct MemoryCheckpointStore {
    threads: RwLock<HashMap<String, SessionState>>,
}

impl MemoryCheckpointStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CheckpointStore for MemoryCheckpointStore {
    async fn load(&self, thread_id: &str) -> Result<Option<SessionState>> {
        Ok(self.threads.read().await.get(thread_id).cloned())
    }

    async fn save(&self, state: &SessionState) -> Result<()> {
        self.threads
            .write()
            .await
            .insert(state.thread_id.clone(), state.clone());
        Ok(())
    }

    async fn delete(&self, thread_id: &str) -> Result<bool> {
        Ok(self.threads.write().await.remove(thread_id).is_some())
    }

    async fn list(&self) -> Result<Vec<String>> {
        let mut ids: Vec<String> = self.threads.read().await.keys().cloned().collect();
        ids.sort();
        Ok(ids)
    }
}

/// Map a thread id to a file stem that no other id shares.
///
/// `[a-z0-9-]` pass through; every other byte becomes `_xx` (lowercase hex),
/// so the stem is injective even on case-insensitive filesystems.
fn encode_file_stem(thread_id: &str) -> String {
    let mut stem = String::with_capacity(thread_id.len());
    for byte in thread_id.bytes() {
        match byte {
            b'a'..=b'z' | b'0'..=b'9' | b'-' => stem.push(char::from(byte)),
            _ => stem.push_str(&format!("_{:02x}", byte)),
        }
    }
    stem
}

/// One pretty-printed JSON file per thread
pub struct FileCheckpointStore {
    dir: PathBuf,
    max_messages: usize,
}

impl FileCheckpointStore {
    /// Create the store, creating `dir` if needed.
    ///
    /// Loaded threads are re-truncated to `max_messages`.
    pub fn new(dir: impl AsRef<Path>, max_messages: usize) -> Result<Self> {
        let dir = dir.as_ref().to_path_buf();
        std::fs::create_dir_all(&dir)?;
        Ok(Self { dir, max_messages })
    }

    fn thread_path(&self, thread_id: &str) -> PathBuf {
        self.dir.join(format!("{}.json", encode_file_stem(thread_id)))
    }

    async fn read_file(&self, path: &Path) -> Result<Option<SessionState>> {
        match tokio::fs::read_to_string(path).await {
            Ok(content) => serde_json::from_str(&content)
                .map(Some)
                .map_err(|source| SessionError::Corrupt {
                    thread_id: path.display().to_string(),
                    source,
                }),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}

#[async_trait]
impl CheckpointStore for FileCheckpointStore {
    async fn load(&self, thread_id: &str) -> Result<Option<SessionState>> {
        let path = self.thread_path(thread_id);
        let Some(mut state) = self.read_file(&path).await? else {
            return Ok(None);
        };

        if state.thread_id != thread_id {
            warn!(
                "Checkpoint {} belongs to thread '{}', not '{}'",
                path.display(),
                state.thread_id,
                thread_id
            );
            return Ok(None);
        }

        if state.max_messages != self.max_messages {
            state.set_max_messages(self.max_messages);
        }
        debug!("Loaded thread {}", thread_id);
        Ok(Some(state))
    }

    async fn save(&self, state: &SessionState) -> Result<()> {
        let path = self.thread_path(&state.thread_id);
        let content = serde_json::to_string_pretty(state)?;
        tokio::fs::write(&path, content).await?;
        debug!("Saved thread {} to {}", state.thread_id, path.display());
        Ok(())
    }

    async fn delete(&self, thread_id: &str) -> Result<bool> {
        match tokio::fs::remove_file(self.thread_path(thread_id)).await {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    async fn list(&self) -> Result<Vec<String>> {
        let mut ids = Vec::new();
        let mut entries = tokio::fs::read_dir(&self.dir).await?;

        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }
            match self.read_file(&path).await {
                Ok(Some(state)) => ids.push(state.thread_id),
                Ok(None) => {}
                Err(e) => warn!("Skipping {}: {}", path.display(), e),
            }
        }

        ids.sort();
        Ok(ids)
    }
}

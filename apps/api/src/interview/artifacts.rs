//! Artifact Store — where agent results land on disk.
//!
//! Layout: `<root>/<session_id>/questions.json` and `<root>/<session_id>/evaluation.json`.
//! Each request writes under its own session directory, so concurrent requests
//! never share a path and a request can never read another request's result.

use std::io;
use std::path::{Path, PathBuf};

use anyhow::Context;
use serde_json::Value;
use tracing::{debug, warn};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArtifactKind {
    Questions,
    Evaluation,
}

impl ArtifactKind {
    pub const ALL: [ArtifactKind; 2] = [ArtifactKind::Questions, ArtifactKind::Evaluation];

    pub fn file_name(self) -> &'static str {
        match self {
            ArtifactKind::Questions => "questions.json",
            ArtifactKind::Evaluation => "evaluation.json",
        }
    }
}

#[derive(Debug, Clone)]
pub struct ArtifactStore {
    root: PathBuf,
}

impl ArtifactStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn path_for(&self, session_id: Uuid, kind: ArtifactKind) -> PathBuf {
        self.root
            .join(session_id.to_string())
            .join(kind.file_name())
    }

    /// Writes `contents` verbatim, creating the session directory if needed.
    pub async fn write(
        &self,
        session_id: Uuid,
        kind: ArtifactKind,
        contents: &str,
    ) -> io::Result<PathBuf> {
        let path = self.path_for(session_id, kind);
        if let Some(dir) = path.parent() {
            tokio::fs::create_dir_all(dir).await?;
        }
        tokio::fs::write(&path, contents).await?;
        debug!("Wrote {} bytes to {}", contents.len(), path.display());
        Ok(path)
    }

    /// Reads an artifact back. `Ok(None)` when the file does not exist.
    pub async fn read(&self, session_id: Uuid, kind: ArtifactKind) -> anyhow::Result<Option<Value>> {
        let path = self.path_for(session_id, kind);
        let text = match tokio::fs::read_to_string(&path).await {
            Ok(text) => text,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(e) => {
                return Err(e).with_context(|| format!("Failed to read {}", path.display()));
            }
        };
        let value = serde_json::from_str(&text)
            .with_context(|| format!("{} is not valid JSON", path.display()))?;
        Ok(Some(value))
    }

    /// Removes one session's artifacts. Returns the number of artifact files removed.
    pub async fn remove_session(&self, session_id: Uuid) -> usize {
        self.remove_session_dir(&self.root.join(session_id.to_string()))
            .await
    }

    /// Removes every session directory under the root, plus the well-known
    /// top-level `questions.json` / `evaluation.json` if present.
    /// Only directories named by a UUID are touched. Returns the number of artifact files removed.
    pub async fn clear(&self) -> usize {
        let mut removed = 0;

        for kind in ArtifactKind::ALL {
            let path = self.root.join(kind.file_name());
            if remove_file_if_present(&path).await {
                removed += 1;
            }
        }

        let mut entries = match tokio::fs::read_dir(&self.root).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return removed,
            Err(e) => {
                warn!("Cannot list {}: {e}", self.root.display());
                return removed;
            }
        };

        loop {
            let entry = match entries.next_entry().await {
                Ok(Some(entry)) => entry,
                Ok(None) => break,
                Err(e) => {
                    warn!("Stopped listing {}: {e}", self.root.display());
                    break;
                }
            };
            let is_session = entry
                .file_name()
                .to_str()
                .is_some_and(|name| Uuid::parse_str(name).is_ok());
            let is_dir = entry.file_type().await.map(|t| t.is_dir()).unwrap_or(false);
            if is_session && is_dir {
                removed += self.remove_session_dir(&entry.path()).await;
            }
        }

        removed
    }

    async fn remove_session_dir(&self, dir: &Path) -> usize {
        let mut removed = 0;
        for kind in ArtifactKind::ALL {
            if remove_file_if_present(&dir.join(kind.file_name())).await {
                removed += 1;
            }
        }
        match tokio::fs::remove_dir(dir).await {
            Ok(()) => {}
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => warn!("Could not remove {}: {e}", dir.display()),
        }
        removed
    }
}

async fn remove_file_if_present(path: &Path) -> bool {
    match tokio::fs::remove_file(path).await {
        Ok(()) => true,
        Err(e) if e.kind() == io::ErrorKind::NotFound => false,
        Err(e) => {
            warn!("Could not remove {}: {e}", path.display());
            false
        }
    }
}

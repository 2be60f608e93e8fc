//! Artifact storage backends.
//!
//! `InMemoryArtifactStorage` keeps bytes in a map and hands out
//! `memory://` references. `DirectoryArtifactStorage` writes one file per
//! artifact under a root directory and returns `{base_url}/{name}`.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use tracing::{debug, warn};

use certa_contracts::error::{CertError, CertResult};
use certa_core::traits::ArtifactStorage;

const MEMORY_SCHEME: &str = "memory://certificates/";

/// Reject names that could escape the storage root.
fn check_name(name: &str) -> CertResult<()> {
    let invalid = name.is_empty()
        || name.starts_with('.')
        || name.contains(['/', '\\'])
        || name.contains("..");
    if invalid {
        return Err(CertError::Storage {
            reason: format!("invalid artifact name '{name}'"),
        });
    }
    Ok(())
}

/// Non-durable artifact storage.
#[derive(Default)]
pub struct InMemoryArtifactStorage {
    objects: Mutex<HashMap<String, Vec<u8>>>,
}

impl InMemoryArtifactStorage {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<String, Vec<u8>>> {
        self.objects.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// The bytes stored under `reference`, if any.
    pub fn get(&self, reference: &str) -> Option<Vec<u8>> {
        self.lock().get(reference).cloned()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl ArtifactStorage for InMemoryArtifactStorage {
    fn store(&self, name: &str, bytes: &[u8]) -> CertResult<String> {
        check_name(name)?;
        let reference = format!("{MEMORY_SCHEME}{name}");
        self.lock().insert(reference.clone(), bytes.to_vec());
        Ok(reference)
    }

    fn discard(&self, reference: &str) -> CertResult<()> {
        self.lock().remove(reference);
        Ok(())
    }
}

/// Artifact storage on the local filesystem.
pub struct DirectoryArtifactStorage {
    root: PathBuf,
    base_url: String,
}

impl DirectoryArtifactStorage {
    /// Store artifacts under `root`, creating it if needed. References are
    /// `{base_url}/{name}`.
    pub fn new(root: impl AsRef<Path>, base_url: impl Into<String>) -> CertResult<Self> {
        let root = root.as_ref().to_path_buf();
        std::fs::create_dir_all(&root).map_err(|e| CertError::Storage {
            reason: format!("failed to create artifact directory '{}': {}", root.display(), e),
        })?;
        Ok(Self {
            root,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Map a reference handed out by `store` back to its file.
    pub fn path_for(&self, reference: &str) -> Option<PathBuf> {
        let name = reference.strip_prefix(&self.base_url)?.strip_prefix('/')?;
        check_name(name).ok()?;
        Some(self.root.join(name))
    }
}

impl ArtifactStorage for DirectoryArtifactStorage {
    fn store(&self, name: &str, bytes: &[u8]) -> CertResult<String> {
        check_name(name)?;
        let path = self.root.join(name);
        std::fs::write(&path, bytes).map_err(|e| CertError::Storage {
            reason: format!("failed to write artifact '{}': {}", path.display(), e),
        })?;
        debug!(path = %path.display(), bytes = bytes.len(), "artifact written");
        Ok(format!("{}/{}", self.base_url, name))
    }

    fn discard(&self, reference: &str) -> CertResult<()> {
        let Some(path) = self.path_for(reference) else {
            warn!(reference, "discard requested for a foreign artifact reference");
            return Ok(());
        };
        match std::fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(CertError::Storage {
                reason: format!("failed to remove artifact '{}': {}", path.display(), e),
            }),
        }
    }
}

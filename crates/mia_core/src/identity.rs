//! Device-local persistence of the active companion identifier.
//!
//! Only one string survives a restart: the id of the companion the user
//! created last. Everything else is fetched from the backend again.

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

/// Well-known key the identifier is stored under.
pub const CURRENT_PET_KEY: &str = "current_pet_id";

pub trait IdentityStore: Send + Sync {
    fn load(&self) -> Result<Option<String>>;
    fn save(&self, id: &str) -> Result<()>;
    fn clear(&self) -> Result<()>;
}

/// Stores the identifier as a small file named after [`CURRENT_PET_KEY`].
#[derive(Debug, Clone)]
pub struct FileIdentityStore {
    path: PathBuf,
}

impl FileIdentityStore {
    /// Store the identifier inside `data_dir`. The directory is created on
    /// first save, not here.
    pub fn new(data_dir: impl AsRef<Path>) -> Self {
        Self {
            path: data_dir.as_ref().join(CURRENT_PET_KEY),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl IdentityStore for FileIdentityStore {
    fn load(&self) -> Result<Option<String>> {
        match std::fs::read_to_string(&self.path) {
            Ok(content) => {
                let id = content.trim();
                Ok((!id.is_empty()).then(|| id.to_string()))
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e).with_context(|| {
                format!("Failed to read companion id from {}", self.path.display())
            }),
        }
    }

    fn save(&self, id: &str) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create data dir {}", parent.display()))?;
        }
        std::fs::write(&self.path, id)
            .with_context(|| format!("Failed to write companion id to {}", self.path.display()))
    }

    fn clear(&self) -> Result<()> {
        match std::fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e).with_context(|| {
                format!("Failed to remove companion id at {}", self.path.display())
            }),
        }
    }
}

/// Process-local identifier storage, lost on exit.
#[derive(Debug, Default)]
pub struct MemoryIdentityStore {
    slot: Mutex<Option<String>>,
}

impl MemoryIdentityStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_id(id: &str) -> Self {
        Self {
            slot: Mutex::new(Some(id.to_string())),
        }
    }

    fn slot(&self) -> Result<std::sync::MutexGuard<'_, Option<String>>> {
        self.slot
            .lock()
            .map_err(|_| anyhow::anyhow!("identity slot poisoned"))
    }
}

impl IdentityStore for MemoryIdentityStore {
    fn load(&self) -> Result<Option<String>> {
        Ok(self.slot()?.clone())
    }

    fn save(&self, id: &str) -> Result<()> {
        *self.slot()? = Some(id.to_string());
        Ok(())
    }

    fn clear(&self) -> Result<()> {
        *self.slot()? = None;
        Ok(())
    }
}

//! Scratch directory for uploads and converted files
//!
//! There is no index: the directory listing is the set of live files and each
//! file's modification time is its age.

use std::io;
use std::path::{Path, PathBuf};
use tokio::task::JoinHandle;
use uuid::Uuid;

use crate::core::{ConvertError, Result};
use crate::utils::{is_plain_file_name, normalize_extension};

#[derive(Debug, Clone)]
pub struct TempStore {
    dir: PathBuf,
}

impl TempStore {
    /// Opens the scratch directory, creating it if needed.
    pub fn open(dir: impl Into<PathBuf>) -> io::Result<Self> {
        let dir = dir.into();
        std::fs::create_dir_all(&dir)?;
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Random v4 UUID plus `extension`.
    pub fn generate_name(extension: &str) -> String {
        format!("{}{}", Uuid::new_v4(), normalize_extension(extension))
    }

    pub fn path_for(&self, name: &str) -> PathBuf {
        self.dir.join(name)
    }

    pub fn save(&self, bytes: &[u8], name: &str) -> Result<PathBuf> {
        if !is_plain_file_name(name) {
            return Err(ConvertError::StorageError(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("refusing to write outside the scratch directory: {}", name),
            )));
        }

        let path = self.path_for(name);
        std::fs::write(&path, bytes)?;
        log::debug!("Stored {} ({} bytes)", path.display(), bytes.len());
        Ok(path)
    }

    /// Path of a live file; anything absent, or not a plain name, is `NotFound`.
    pub fn locate(&self, name: &str) -> Result<PathBuf> {
        if !is_plain_file_name(name) {
            return Err(ConvertError::NotFound);
        }

        let path = self.path_for(name);
        if path.is_file() {
            Ok(path)
        } else {
            Err(ConvertError::NotFound)
        }
    }

    /// Removes `name`; a file that is already gone counts as removed.
    pub fn delete(&self, name: &str) -> io::Result<()> {
        match std::fs::remove_file(self.path_for(name)) {
            Err(e) if e.kind() != io::ErrorKind::NotFound => Err(e),
            _ => Ok(()),
        }
    }

    /// Deletes `name` in the background. Failures are logged and go nowhere else.
    pub fn schedule_delete(&self, name: &str) -> JoinHandle<()> {
        let path = self.path_for(name);

        tokio::spawn(async move {
            match tokio::fs::remove_file(&path).await {
                Ok(()) => log::debug!("Removed {}", path.display()),
                Err(e) if e.kind() == io::ErrorKind::NotFound => {}
                Err(e) => log::warn!("Failed to remove {}: {}", path.display(), e),
            }
        })
    }
}

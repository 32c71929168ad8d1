use anyhow::{Context, Result};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

/// Durable storage for the session token.
///
/// Whatever is stored here must survive a process restart; the in-memory
/// copy lives on `SessionContext`.
pub trait StorageAdapter: Send + Sync {
    /// Store authentication credentials
    fn store_credentials(&self, credentials: &str) -> Result<()>;

    /// Load authentication credentials
    fn load_credentials(&self) -> Result<Option<String>>;

    /// Clear stored credentials
    fn clear_credentials(&self) -> Result<()>;
}

impl<T: StorageAdapter + ?Sized> StorageAdapter for std::sync::Arc<T> {
    fn store_credentials(&self, credentials: &str) -> Result<()> {
        (**self).store_credentials(credentials)
    }

    fn load_credentials(&self) -> Result<Option<String>> {
        (**self).load_credentials()
    }

    fn clear_credentials(&self) -> Result<()> {
        (**self).clear_credentials()
    }
}

/// Token file in the user's config directory (`~/.tasarruf/token`).
///
/// Written atomically with 0600 permissions so only the owner can read it.
#[derive(Debug, Clone)]
pub struct FileStorageAdapter {
    file_path: PathBuf,
}

impl FileStorageAdapter {
    /// Creates an adapter backed by an explicit file.
    pub fn with_path(file_path: impl Into<PathBuf>) -> Self {
        Self {
            file_path: file_path.into(),
        }
    }

    /// Returns the path to the token file.
    pub fn path(&self) -> &Path {
        &self.file_path
    }

    /// Removes leftovers of interrupted writes (`token.tmp`, `token.bak`, ...)
    /// so only one token file exists.
    fn cleanup_old_files(&self) -> Result<()> {
        let Some(parent) = self.file_path.parent() else {
            return Ok(());
        };
        if !parent.exists() {
            return Ok(());
        }
        let Some(stem) = self.file_path.file_name().and_then(|n| n.to_str()) else {
            return Ok(());
        };
        let prefix = format!("{}.", stem);

        let entries = fs::read_dir(parent).context("Failed to read config directory")?;
        for entry in entries {
            let entry = entry.context("Failed to read directory entry")?;
            let path = entry.path();
            if path == self.file_path {
                continue;
            }
            if let Some(file_name) = path.file_name().and_then(|n| n.to_str()) {
                if file_name.starts_with(&prefix) {
                    log::debug!("Removing stale token file: {}", path.display());
                    if let Err(e) = fs::remove_file(&path) {
                        log::warn!("Failed to remove stale token file {}: {}", path.display(), e);
                    }
                }
            }
        }
        Ok(())
    }
}

impl StorageAdapter for FileStorageAdapter {
    /// Writes the token via a temporary file and an atomic rename.
    fn store_credentials(&self, token: &str) -> Result<()> {
        if let Some(parent) = self.file_path.parent() {
            fs::create_dir_all(parent).context("Failed to create config directory")?;
        }

        self.cleanup_old_files()?;

        let temp_path = self.file_path.with_extension("tmp");
        let mut file =
            fs::File::create(&temp_path).context("Failed to create temporary token file")?;
        file.write_all(token.as_bytes())
            .context("Failed to write session token")?;
        file.sync_all()
            .context("Failed to sync token file to disk")?;
        drop(file);

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let permissions = fs::Permissions::from_mode(0o600);
            fs::set_permissions(&temp_path, permissions)
                .context("Failed to set token file permissions")?;
        }

        fs::rename(&temp_path, &self.file_path)
            .context("Failed to rename temporary token file")?;

        log::info!("Saved session token to {}", self.file_path.display());
        Ok(())
    }

    /// - `Ok(Some(token))` if the file exists and holds a plausible token
    /// - `Ok(None)` if the file is missing, empty or corrupted
    /// - `Err(_)` if the file cannot be read
    fn load_credentials(&self) -> Result<Option<String>> {
        if !self.file_path.exists() {
            return Ok(None);
        }

        let content = fs::read_to_string(&self.file_path).context("Failed to read token file")?;
        let token = content.trim();

        if token.is_empty() {
            log::warn!("Token file is empty, treating as no session");
            return Ok(None);
        }

        // Backend tokens are JWTs; anything outside this range is not one of ours
        if token.len() < 8 || token.len() > 4096 {
            log::warn!("Session token has invalid length: {}, treating as corrupted", token.len());
            return Ok(None);
        }

        if token.chars().any(|c| c.is_control()) {
            log::warn!("Token file contains control characters, treating as corrupted");
            return Ok(None);
        }

        log::debug!("Loaded session token from {}", self.file_path.display());
        Ok(Some(token.to_string()))
    }

    /// Returns `Ok(())` even if the file doesn't exist.
    fn clear_credentials(&self) -> Result<()> {
        if self.file_path.exists() {
            fs::remove_file(&self.file_path).context("Failed to delete token file")?;
            log::info!("Deleted token file at {}", self.file_path.display());
        } else {
            log::debug!("Token file does not exist, nothing to delete");
        }
        Ok(())
    }
}

/// Process-local storage. Used for `--ephemeral` sessions and in tests.
#[derive(Debug, Default)]
pub struct MemoryStorageAdapter {
    token: Mutex<Option<String>>,
}

impl MemoryStorageAdapter {
    pub fn new() -> Self {
        Self::default()
    }
}

impl StorageAdapter for MemoryStorageAdapter {
    fn store_credentials(&self, credentials: &str) -> Result<()> {
        let mut slot = self.token.lock().unwrap_or_else(|e| e.into_inner());
        *slot = Some(credentials.to_string());
        Ok(())
    }

    fn load_credentials(&self) -> Result<Option<String>> {
        let slot = self.token.lock().unwrap_or_else(|e| e.into_inner());
        Ok(slot.clone())
    }

    fn clear_credentials(&self) -> Result<()> {
        let mut slot = self.token.lock().unwrap_or_else(|e| e.into_inner());
        *slot = None;
        Ok(())
    }
}

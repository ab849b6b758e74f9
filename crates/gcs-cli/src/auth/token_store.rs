//! Persistent storage for the OAuth credential
//!
//! The credential lives as JSON in a per-user directory that is created
//! owner-only on first use. Writes go through a temp file in the same
//! directory followed by a rename, so readers never see a partial file.

use super::types::{AuthError, AuthResult, Credential};
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Token storage backed by a single JSON file
#[derive(Debug, Clone)]
pub struct TokenStore {
    path: PathBuf,
}

impl TokenStore {
    /// Create a token store for the given file path
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Location of the token file
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the stored credential
    ///
    /// Returns `AuthError::NotFound` when nothing has been stored yet.
    pub async fn load(&self) -> AuthResult<Credential> {
        let content = match tokio::fs::read(&self.path).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!("No token file at {}", self.path.display());
                return Err(AuthError::NotFound);
            }
            Err(e) => return Err(AuthError::IoError(e)),
        };

        let credential: Credential = serde_json::from_slice(&content)?;
        debug!("Loaded credential from {}", self.path.display());
        Ok(credential)
    }

    /// Persist a credential, replacing any previous one atomically
    pub async fn save(&self, credential: &Credential) -> AuthResult<()> {
        let content = serde_json::to_vec_pretty(credential)?;
        let path = self.path.clone();

        tokio::task::spawn_blocking(move || write_atomic(&path, &content))
            .await
            .map_err(|e| AuthError::IoError(std::io::Error::other(e)))??;

        debug!("Saved credential to {}", self.path.display());
        Ok(())
    }

    /// Remove the stored credential; a missing file is not an error
    pub async fn delete(&self) -> AuthResult<()> {
        match tokio::fs::remove_file(&self.path).await {
            Ok(()) => {
                debug!("Deleted credential at {}", self.path.display());
                Ok(())
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(AuthError::IoError(e)),
        }
    }
}

/// Create `dir` (and parents) with owner-only permissions if it is missing
pub fn ensure_private_dir(dir: &Path) -> std::io::Result<()> {
    if dir.is_dir() {
        return Ok(());
    }

    let mut builder = std::fs::DirBuilder::new();
    builder.recursive(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::DirBuilderExt;
        builder.mode(0o700);
    }
    builder.create(dir)
}

fn write_atomic(path: &Path, content: &[u8]) -> std::io::Result<()> {
    let dir = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    ensure_private_dir(dir)?;

    // NamedTempFile is created 0600 on unix
    let mut file = tempfile::NamedTempFile::new_in(dir)?;
    file.write_all(content)?;
    file.as_file().sync_all()?;
    file.persist(path).map_err(|e| e.error)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::time::Duration;

    #[tokio::test]
    async fn test_load_missing_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let store = TokenStore::new(dir.path().join("gcs_token.json"));

        assert!(matches!(store.load().await, Err(AuthError::NotFound)));
    }

    #[tokio::test]
    async fn test_save_then_load_is_equal() {
        let dir = tempfile::tempdir().unwrap();
        let store = TokenStore::new(dir.path().join("gcs_token.json"));
        let credential = Credential::new(
            "access",
            Some("refresh".to_string()),
            Some(Duration::from_secs(3600)),
        );

        store.save(&credential).await.unwrap();
        let loaded = store.load().await.unwrap();

        assert_eq!(loaded, credential);
    }

    #[tokio::test]
    async fn test_save_creates_missing_directory() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("a").join("b");
        let store = TokenStore::new(nested.join("gcs_token.json"));

        store.save(&Credential::new("x", None, None)).await.unwrap();

        assert!(nested.is_dir());
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let mode = std::fs::metadata(&nested).unwrap().permissions().mode();
            assert_eq!(mode & 0o777, 0o700);
        }
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_token_file_is_owner_only() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let store = TokenStore::new(dir.path().join("gcs_token.json"));
        store.save(&Credential::new("x", None, None)).await.unwrap();

        let mode = std::fs::metadata(store.path()).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
    }

    #[tokio::test]
    async fn test_save_overwrites_previous_credential() {
        let dir = tempfile::tempdir().unwrap();
        let store = TokenStore::new(dir.path().join("gcs_token.json"));

        store.save(&Credential::new("first", None, None)).await.unwrap();
        store.save(&Credential::new("second", None, None)).await.unwrap();

        assert_eq!(store.load().await.unwrap().access_token, "second");
    }

    #[tokio::test]
    async fn test_corrupt_file_is_serde_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("gcs_token.json");
        std::fs::write(&path, "{not json").unwrap();

        let store = TokenStore::new(path);
        assert!(matches!(store.load().await, Err(AuthError::SerdeError(_))));
    }

    #[tokio::test]
    async fn test_delete_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let store = TokenStore::new(dir.path().join("gcs_token.json"));
        store.save(&Credential::new("x", None, None)).await.unwrap();

        store.delete().await.unwrap();
        store.delete().await.unwrap();
        assert!(matches!(store.load().await, Err(AuthError::NotFound)));
    }
}

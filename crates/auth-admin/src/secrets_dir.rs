//! Helpers for writing operator-controlled secrets to disk.

use auth_core::AuthError;
use std::path::{Path, PathBuf};

pub struct SecretsDir {
    root: PathBuf,
}

impl SecretsDir {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn path(&self, name: &str) -> PathBuf {
        self.root.join(name)
    }

    /// Creates the directory (mode 0700) if missing, then writes `contents`
    /// to `{root}/{name}` with mode 0600.
    pub fn write(&self, name: &str, contents: &str) -> Result<PathBuf, AuthError> {
        ensure_dir(&self.root)?;
        let path = self.root.join(name);
        std::fs::write(&path, contents)
            .map_err(|e| AuthError::storage_unavailable(format!("write {}: {e}", path.display())))?;
        secure_file(&path)?;
        Ok(path)
    }

    pub fn read(&self, name: &str) -> Result<Option<String>, AuthError> {
        let path = self.root.join(name);
        match std::fs::read_to_string(&path) {
            Ok(contents) => Ok(Some(contents)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(AuthError::storage_unavailable(format!(
                "read {}: {e}",
                path.display()
            ))),
        }
    }
}

fn ensure_dir(root: &Path) -> Result<(), AuthError> {
    std::fs::create_dir_all(root)
        .map_err(|e| AuthError::storage_unavailable(format!("create {}: {e}", root.display())))?;
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let mut perms = std::fs::metadata(root)
            .map_err(|e| AuthError::storage_unavailable(e.to_string()))?
            .permissions();
        perms.set_mode(0o700);
        std::fs::set_permissions(root, perms)
            .map_err(|e| AuthError::storage_unavailable(e.to_string()))?;
    }
    Ok(())
}

fn secure_file(path: &Path) -> Result<(), AuthError> {
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let mut perms = std::fs::metadata(path)
            .map_err(|e| AuthError::storage_unavailable(e.to_string()))?
            .permissions();
        perms.set_mode(0o600);
        std::fs::set_permissions(path, perms)
            .map_err(|e| AuthError::storage_unavailable(e.to_string()))?;
    }
    #[cfg(not(unix))]
    {
        let _ = path;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn write_then_read_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let secrets = SecretsDir::new(dir.path().join("secrets"));
        secrets.write("vault_root_token", "s.abc123").unwrap();
        assert_eq!(
            secrets.read("vault_root_token").unwrap(),
            Some("s.abc123".to_string())
        );
    }

    #[test]
    fn read_missing_file_returns_none() {
        let dir = tempfile::tempdir().unwrap();
        let secrets = SecretsDir::new(dir.path().join("secrets"));
        assert_eq!(secrets.read("nope").unwrap(), None);
    }

    #[cfg(unix)]
    #[test]
    fn written_files_are_owner_only() {
        use std::os::unix::fs::PermissionsExt;
        let dir = tempfile::tempdir().unwrap();
        let secrets = SecretsDir::new(dir.path().join("secrets"));
        let path = secrets.write("vault_unseal_key", "key-material").unwrap();
        let mode = std::fs::metadata(&path).unwrap().permissions().mode() & 0o777;
        assert_eq!(mode, 0o600);
    }
}

//! Durable client-local storage for the bearer token.
//!
//! A tiny string key/value surface. Only the session store reads or writes it, so
//! implementations do not coordinate concurrent writers to the same key.

use std::collections::HashMap;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::{debug, warn};

use crate::error::PortalResult;

/// Key under which the current bearer token is kept.
pub const TOKEN_KEY: &str = "access_token";

pub trait TokenStorage: Send + Sync {
    fn get(&self, key: &str) -> PortalResult<Option<String>>;
    fn set(&self, key: &str, value: &str) -> PortalResult<()>;
    /// Removing an absent key is not an error.
    fn remove(&self, key: &str) -> PortalResult<()>;
}

fn sanitize_filename(s: &str) -> String {
    s.chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '_' || c == '-' { c } else { '_' })
        .collect()
}

/// One plain-text file per key under a root directory.
#[derive(Debug, Clone)]
pub struct FileTokenStorage {
    root: PathBuf,
}

impl FileTokenStorage {
    pub fn new<P: AsRef<Path>>(root: P) -> Self {
        Self { root: root.as_ref().to_path_buf() }
    }

    pub fn root(&self) -> &Path { &self.root }

    pub fn path_for(&self, key: &str) -> PathBuf {
        self.root.join(sanitize_filename(key))
    }
}

impl TokenStorage for FileTokenStorage {
    fn get(&self, key: &str) -> PortalResult<Option<String>> {
        let p = self.path_for(key);
        match std::fs::read_to_string(&p) {
            Ok(s) => {
                let v = s.trim();
                if v.is_empty() { Ok(None) } else { Ok(Some(v.to_string())) }
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn set(&self, key: &str, value: &str) -> PortalResult<()> {
        std::fs::create_dir_all(&self.root)?;
        let p = self.path_for(key);
        // write-then-rename so a crash never leaves half a token behind
        let tmp = p.with_extension("tmp");
        let written = remove_stale(&tmp)
            .and_then(|()| write_private(&tmp, value))
            .and_then(|()| std::fs::rename(&tmp, &p));
        if let Err(e) = written {
            // the temp file may hold the full token
            if let Err(rm) = std::fs::remove_file(&tmp) {
                if rm.kind() != std::io::ErrorKind::NotFound {
                    warn!(target: "medledger::storage", "could not remove {}: {}", tmp.display(), rm);
                }
            }
            return Err(e.into());
        }
        debug!(target: "medledger::storage", "stored key={} path={}", key, p.display());
        Ok(())
    }

    fn remove(&self, key: &str) -> PortalResult<()> {
        let p = self.path_for(key);
        match std::fs::remove_file(&p) {
            Ok(()) => {
                debug!(target: "medledger::storage", "removed key={}", key);
                Ok(())
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

// `mode` only applies at creation, so a leftover temp file must go first.
fn remove_stale(p: &Path) -> std::io::Result<()> {
    match std::fs::remove_file(p) {
        Err(e) if e.kind() != std::io::ErrorKind::NotFound => Err(e),
        _ => Ok(()),
    }
}

// Created owner-only on unix.
fn write_private(p: &Path, value: &str) -> std::io::Result<()> {
    let mut opts = std::fs::OpenOptions::new();
    opts.write(true).create_new(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        opts.mode(0o600);
    }
    let mut f = opts.open(p)?;
    f.write_all(value.as_bytes())?;
    f.sync_all()
}

/// Process-lifetime storage. Clones share the same map, so a caller can keep a
/// handle and observe what the session store wrote.
#[derive(Debug, Clone, Default)]
pub struct MemoryTokenStorage {
    map: Arc<Mutex<HashMap<String, String>>>,
}

impl MemoryTokenStorage {
    pub fn new() -> Self { Self::default() }

    pub fn with_entry(key: &str, value: &str) -> Self {
        let s = Self::default();
        s.map.lock().insert(key.to_string(), value.to_string());
        s
    }

    pub fn contains(&self, key: &str) -> bool { self.map.lock().contains_key(key) }
}

impl TokenStorage for MemoryTokenStorage {
    fn get(&self, key: &str) -> PortalResult<Option<String>> {
        Ok(self.map.lock().get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> PortalResult<()> {
        self.map.lock().insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> PortalResult<()> {
        self.map.lock().remove(key);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn file_storage_set_get_remove() {
        let tmp = tempdir().unwrap();
        let s = FileTokenStorage::new(tmp.path().join("nested"));
        assert_eq!(s.get(TOKEN_KEY).unwrap(), None);
        s.set(TOKEN_KEY, "abc.def.ghi").unwrap();
        assert_eq!(s.get(TOKEN_KEY).unwrap().as_deref(), Some("abc.def.ghi"));
        assert!(s.path_for(TOKEN_KEY).exists());
        s.remove(TOKEN_KEY).unwrap();
        assert!(!s.path_for(TOKEN_KEY).exists());
        // absent key removal is fine
        s.remove(TOKEN_KEY).unwrap();
    }

    #[test]
    fn file_storage_trims_and_treats_blank_as_absent() {
        let tmp = tempdir().unwrap();
        let s = FileTokenStorage::new(tmp.path());
        std::fs::write(s.path_for(TOKEN_KEY), "tok\n").unwrap();
        assert_eq!(s.get(TOKEN_KEY).unwrap().as_deref(), Some("tok"));
        std::fs::write(s.path_for(TOKEN_KEY), "  \n").unwrap();
        assert_eq!(s.get(TOKEN_KEY).unwrap(), None);
    }

    #[test]
    fn keys_cannot_escape_root() {
        let tmp = tempdir().unwrap();
        let s = FileTokenStorage::new(tmp.path());
        let p = s.path_for("../../etc/passwd");
        assert_eq!(p.parent().unwrap(), tmp.path());
    }

    #[test]
    fn failed_write_leaves_no_token_copy_behind() {
        let tmp = tempdir().unwrap();
        let s = FileTokenStorage::new(tmp.path());
        // a non-empty directory where the token file goes makes the rename fail
        let target = s.path_for(TOKEN_KEY);
        std::fs::create_dir(&target).unwrap();
        std::fs::write(target.join("keep"), "x").unwrap();

        let err = s.set(TOKEN_KEY, "h.SECRET.s").unwrap_err();
        assert_eq!(err.code(), "storage_error");
        assert!(!target.with_extension("tmp").exists());
        for entry in std::fs::read_dir(tmp.path()).unwrap() {
            let path = entry.unwrap().path();
            if path.is_file() {
                let body = std::fs::read_to_string(&path).unwrap();
                assert!(!body.contains("SECRET"), "token copy left at {}", path.display());
            }
        }
    }

    #[cfg(unix)]
    #[test]
    fn token_file_is_owner_only() {
        use std::os::unix::fs::PermissionsExt;
        let tmp = tempdir().unwrap();
        let s = FileTokenStorage::new(tmp.path());
        // stale world-readable temp file from an earlier crash
        std::fs::write(s.path_for(TOKEN_KEY).with_extension("tmp"), "old").unwrap();
        std::fs::set_permissions(
            s.path_for(TOKEN_KEY).with_extension("tmp"),
            std::fs::Permissions::from_mode(0o644),
        )
        .unwrap();
        s.set(TOKEN_KEY, "a.b.c").unwrap();
        let mode = std::fs::metadata(s.path_for(TOKEN_KEY)).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
        assert_eq!(s.get(TOKEN_KEY).unwrap().as_deref(), Some("a.b.c"));
    }

    #[test]
    fn memory_clones_share_state() {
        let a = MemoryTokenStorage::new();
        let b = a.clone();
        a.set(TOKEN_KEY, "t").unwrap();
        assert!(b.contains(TOKEN_KEY));
        b.remove(TOKEN_KEY).unwrap();
        assert_eq!(a.get(TOKEN_KEY).unwrap(), None);
    }
}

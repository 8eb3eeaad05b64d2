//! Single-slot cache of the last resolved user.
//!
//! The store is a cache, not a source of truth. Anything that cannot be read
//! back cleanly (missing file, bad JSON, unknown envelope version) is a miss.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tracing::warn;

use super::User;
use crate::tprintln;

const ENVELOPE_VERSION: u32 = 1;

pub trait SessionStore: Send + Sync {
    fn save(&self, user: &User) -> Result<()>;
    fn load(&self) -> Option<User>;
    fn clear(&self) -> Result<()>;
}

#[derive(Debug, Serialize, Deserialize)]
struct Envelope {
    version: u32,
    saved_at: DateTime<Utc>,
    user: User,
}

fn encode(user: &User) -> Result<String> {
    let env = Envelope { version: ENVELOPE_VERSION, saved_at: Utc::now(), user: user.clone() };
    serde_json::to_string(&env).context("serialize session entry")
}

fn decode(raw: &str) -> Option<User> {
    match serde_json::from_str::<Envelope>(raw) {
        Ok(env) if env.version == ENVELOPE_VERSION => Some(env.user),
        Ok(env) => {
            warn!(target: "auth", version = env.version, "session cache has unknown version; ignoring");
            None
        }
        Err(e) => {
            warn!(target: "auth", "session cache unreadable; ignoring: {e}");
            None
        }
    }
}

/// JSON file holding one session entry. Writes go through a temp file and a
/// rename so a crash mid-write leaves either the old entry or the new one.
pub struct FileSessionStore {
    path: PathBuf,
}

impl FileSessionStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl SessionStore for FileSessionStore {
    fn save(&self, user: &User) -> Result<()> {
        if let Some(dir) = self.path.parent() {
            if !dir.as_os_str().is_empty() {
                std::fs::create_dir_all(dir)
                    .with_context(|| format!("create session dir {}", dir.display()))?;
            }
        }
        let body = encode(user)?;
        let tmp = self.path.with_extension("tmp");
        std::fs::write(&tmp, body).with_context(|| format!("write {}", tmp.display()))?;
        std::fs::rename(&tmp, &self.path)
            .with_context(|| format!("rename {} -> {}", tmp.display(), self.path.display()))?;
        tprintln!("session_store.save path={} user={}", self.path.display(), user.id);
        Ok(())
    }

    fn load(&self) -> Option<User> {
        let raw = match std::fs::read_to_string(&self.path) {
            Ok(s) => s,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return None,
            Err(e) => {
                warn!(target: "auth", "session cache {} unreadable: {e}", self.path.display());
                return None;
            }
        };
        decode(&raw)
    }

    fn clear(&self) -> Result<()> {
        match std::fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e).with_context(|| format!("remove {}", self.path.display())),
        }
    }
}

/// In-process slot. Keeps the serialized text rather than the `User` so it
/// goes through the same decode path as the file store.
#[derive(Default)]
pub struct MemorySessionStore {
    slot: Mutex<Option<String>>,
}

impl MemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed the slot with arbitrary text, e.g. to exercise corrupt entries.
    pub fn with_raw(raw: impl Into<String>) -> Self {
        Self { slot: Mutex::new(Some(raw.into())) }
    }

    pub fn raw(&self) -> Option<String> {
        self.slot.lock().clone()
    }
}

impl SessionStore for MemorySessionStore {
    fn save(&self, user: &User) -> Result<()> {
        let body = encode(user)?;
        *self.slot.lock() = Some(body);
        Ok(())
    }

    fn load(&self) -> Option<User> {
        let raw = self.slot.lock().clone()?;
        decode(&raw)
    }

    fn clear(&self) -> Result<()> {
        *self.slot.lock() = None;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::identity::{Role, UserProfile};

    fn user() -> User {
        User::from_profile(UserProfile {
            id: "u-7".into(),
            name: "Meera".into(),
            email: "meera@example.com".into(),
            role: Role::Service,
            tenant_id: Some("t-1".into()),
            tenant_name: None,
        })
    }

    #[test]
    fn memory_store_save_load_clear() {
        let s = MemorySessionStore::new();
        assert!(s.load().is_none());
        s.save(&user()).unwrap();
        assert_eq!(s.load(), Some(user()));
        s.clear().unwrap();
        assert!(s.load().is_none());
        assert!(s.raw().is_none());
    }

    #[test]
    fn corrupt_entries_are_misses() {
        assert!(MemorySessionStore::with_raw("{not json").load().is_none());
        assert!(MemorySessionStore::with_raw("").load().is_none());
        let wrong_shape = r#"{"version":1,"saved_at":"2024-01-01T00:00:00Z","user":{"id":"x"}}"#;
        assert!(MemorySessionStore::with_raw(wrong_shape).load().is_none());
        let bad_role = r#"{"version":1,"saved_at":"2024-01-01T00:00:00Z","user":{"id":"x","name":"n","email":"e","role":"chef"}}"#;
        assert!(MemorySessionStore::with_raw(bad_role).load().is_none());
    }

    #[test]
    fn unknown_version_is_a_miss() {
        let future = r#"{"version":99,"saved_at":"2024-01-01T00:00:00Z","user":{"id":"x","name":"n","email":"e","role":"owner"}}"#;
        assert!(MemorySessionStore::with_raw(future).load().is_none());
    }

    #[test]
    fn file_store_persists_across_instances() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("session.json");
        FileSessionStore::new(&path).save(&user()).unwrap();
        let again = FileSessionStore::new(&path);
        assert_eq!(again.load(), Some(user()));
        again.clear().unwrap();
        assert!(!path.exists());
        // clearing twice is fine
        again.clear().unwrap();
        assert!(again.load().is_none());
    }

    #[test]
    fn file_store_tolerates_garbage() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("session.json");
        std::fs::write(&path, b"\x00\x01garbage").unwrap();
        assert!(FileSessionStore::new(&path).load().is_none());
    }
}

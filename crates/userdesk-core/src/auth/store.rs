//! Persisted session state.
//!
//! The session is two string values, `token` and `tokenTimestamp`, kept
//! together in one JSON object so they are always written as a pair.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use anyhow::{Context, Result};
use tracing::{debug, warn};

/// Session file name in the data directory
const SESSION_FILE: &str = "session.json";

/// Key holding the opaque session credential
pub const TOKEN_KEY: &str = "token";

/// Key holding the decimal milliseconds-since-epoch at which the token was stored
pub const TIMESTAMP_KEY: &str = "tokenTimestamp";

/// A stored session as read back from the store.
///
/// `issued_at` is optional: sessions written before timestamps were tracked
/// only carry a token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub token: String,
    pub issued_at: Option<i64>,
}

/// Process-wide session storage.
///
/// Storage is synchronous. `clear` on an empty store is a no-op.
pub trait SessionStore: Send + Sync {
    /// Read the session, or `None` when no token is stored.
    fn get(&self) -> Option<Session>;

    /// Store `token` issued at `now` (ms since epoch), replacing any prior session.
    fn set(&self, token: &str, now: i64) -> Result<()>;

    /// Remove both values.
    fn clear(&self) -> Result<()>;
}

/// Build a session from raw key-value entries.
fn session_from_entries(entries: &HashMap<String, String>) -> Option<Session> {
    let token = entries.get(TOKEN_KEY).filter(|t| !t.is_empty())?;
    let issued_at = entries
        .get(TIMESTAMP_KEY)
        .and_then(|ts| ts.trim().parse::<i64>().ok());

    Some(Session {
        token: token.clone(),
        issued_at,
    })
}

fn entries_for(token: &str, now: i64) -> HashMap<String, String> {
    HashMap::from([
        (TOKEN_KEY.to_string(), token.to_string()),
        (TIMESTAMP_KEY.to_string(), now.to_string()),
    ])
}

// ============================================================================
// File-backed store
// ============================================================================

/// Session store persisted as `session.json` in the data directory.
pub struct FileSessionStore {
    data_dir: PathBuf,
    // Serializes writers within this process
    write_lock: Mutex<()>,
}

impl FileSessionStore {
    pub fn new(data_dir: PathBuf) -> Self {
        Self {
            data_dir,
            write_lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> PathBuf {
        self.data_dir.join(SESSION_FILE)
    }

    fn read_entries(path: &Path) -> Result<Option<HashMap<String, String>>> {
        if !path.exists() {
            return Ok(None);
        }
        let contents = std::fs::read_to_string(path).context("Failed to read session file")?;
        let entries: HashMap<String, String> =
            serde_json::from_str(&contents).context("Failed to parse session file")?;
        Ok(Some(entries))
    }
}

impl SessionStore for FileSessionStore {
    fn get(&self) -> Option<Session> {
        match Self::read_entries(&self.path()) {
            Ok(Some(entries)) => session_from_entries(&entries),
            Ok(None) => None,
            Err(e) => {
                // Corrupt sessions count as absent
                warn!(error = %e, "Ignoring unreadable session file");
                None
            }
        }
    }

    fn set(&self, token: &str, now: i64) -> Result<()> {
        let _guard = self
            .write_lock
            .lock()
            .map_err(|_| anyhow::anyhow!("Session store lock poisoned"))?;

        std::fs::create_dir_all(&self.data_dir)
            .with_context(|| format!("Failed to create {}", self.data_dir.display()))?;

        let contents = serde_json::to_string_pretty(&entries_for(token, now))?;
        let path = self.path();
        let tmp = path.with_extension("json.tmp");

        // Write then rename so token and timestamp land together
        std::fs::write(&tmp, contents).context("Failed to write session file")?;
        std::fs::rename(&tmp, &path).context("Failed to move session file into place")?;

        debug!(issued_at = now, "Session stored");
        Ok(())
    }

    fn clear(&self) -> Result<()> {
        let _guard = self
            .write_lock
            .lock()
            .map_err(|_| anyhow::anyhow!("Session store lock poisoned"))?;

        let path = self.path();
        match std::fs::remove_file(&path) {
            Ok(()) => {
                debug!("Session cleared");
                Ok(())
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e).context("Failed to remove session file"),
        }
    }
}

// ============================================================================
// In-memory store
// ============================================================================

/// Session store that lives only as long as the process.
#[derive(Default)]
pub struct MemorySessionStore {
    entries: Mutex<HashMap<String, String>>,
}

impl MemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed raw values, bypassing `set`. Lets callers reproduce partial or
    /// legacy layouts such as a token with no timestamp.
    pub fn with_entries<I, K, V>(entries: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            entries: Mutex::new(
                entries
                    .into_iter()
                    .map(|(k, v)| (k.into(), v.into()))
                    .collect(),
            ),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.entries.lock().map(|e| e.is_empty()).unwrap_or(true)
    }
}

impl SessionStore for MemorySessionStore {
    fn get(&self) -> Option<Session> {
        let entries = self.entries.lock().ok()?;
        session_from_entries(&entries)
    }

    fn set(&self, token: &str, now: i64) -> Result<()> {
        let mut entries = self
            .entries
            .lock()
            .map_err(|_| anyhow::anyhow!("Session store lock poisoned"))?;
        *entries = entries_for(token, now);
        Ok(())
    }

    fn clear(&self) -> Result<()> {
        let mut entries = self
            .entries
            .lock()
            .map_err(|_| anyhow::anyhow!("Session store lock poisoned"))?;
        entries.remove(TOKEN_KEY);
        entries.remove(TIMESTAMP_KEY);
        Ok(())
    }
}

// ============================================================================
// Tests
// ============================================================================

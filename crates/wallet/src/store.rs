//! Session cache.
//!
//! One durable key holds the last successful connection as JSON text
//! (`{"walletType","address","timestamp"}`, timestamp in epoch millis). The
//! TTL is enforced by the reader, never by the storage medium.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

use chrono::{DateTime, Utc};
use log::{debug, warn};
use serde::{Deserialize, Serialize};

use crate::config::SESSION_KEY;
use crate::errors::SessionStoreError;
use crate::kinds::WalletKind;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionCacheEntry {
    #[serde(rename = "walletType")]
    pub wallet_kind: WalletKind,
    pub address: String,
    #[serde(rename = "timestamp", with = "chrono::serde::ts_milliseconds")]
    pub created_at: DateTime<Utc>,
}

impl SessionCacheEntry {
    pub fn new(wallet_kind: WalletKind, address: impl Into<String>) -> Self {
        Self::at(wallet_kind, address, Utc::now())
    }

    pub fn at(wallet_kind: WalletKind, address: impl Into<String>, created_at: DateTime<Utc>) -> Self {
        Self {
            wallet_kind,
            address: address.into(),
            created_at,
        }
    }

    pub fn is_expired(&self, now: DateTime<Utc>, ttl: Duration) -> bool {
        let age_ms = (now - self.created_at).num_milliseconds();
        age_ms > i64::try_from(ttl.as_millis()).unwrap_or(i64::MAX)
    }

    pub fn matches_address(&self, address: &str) -> bool {
        self.address.eq_ignore_ascii_case(address)
    }
}

/// Durable client storage for the cached connection.
pub trait SessionStore: Send + Sync {
    fn load(&self) -> Result<Option<SessionCacheEntry>, SessionStoreError>;
    fn save(&self, entry: &SessionCacheEntry) -> Result<(), SessionStoreError>;
    fn clear(&self) -> Result<(), SessionStoreError>;
}

fn parse_entry(raw: Option<&String>) -> Result<Option<SessionCacheEntry>, SessionStoreError> {
    raw.map(|text| serde_json::from_str(text))
        .transpose()
        .map_err(SessionStoreError::from)
}

/// Key/value file, one JSON object per file.
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

    fn read_all(&self) -> Result<HashMap<String, String>, SessionStoreError> {
        match fs::read_to_string(&self.path) {
            Ok(text) if text.trim().is_empty() => Ok(HashMap::new()),
            Ok(text) => Ok(serde_json::from_str(&text)?),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(HashMap::new()),
            Err(e) => Err(e.into()),
        }
    }

    /// Write through a temp file so a crash never leaves half a document.
    fn write_all(&self, values: &HashMap<String, String>) -> Result<(), SessionStoreError> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        let tmp = self.path.with_extension("tmp");
        fs::write(&tmp, serde_json::to_vec_pretty(values)?)?;
        fs::rename(&tmp, &self.path)?;
        Ok(())
    }
}

impl SessionStore for FileSessionStore {
    fn load(&self) -> Result<Option<SessionCacheEntry>, SessionStoreError> {
        parse_entry(self.read_all()?.get(SESSION_KEY))
    }

    fn save(&self, entry: &SessionCacheEntry) -> Result<(), SessionStoreError> {
        let mut values = self.read_all().unwrap_or_else(|e| {
            warn!("Session file unreadable, starting fresh: {}", e);
            HashMap::new()
        });
        values.insert(SESSION_KEY.to_string(), serde_json::to_string(entry)?);
        self.write_all(&values)?;
        debug!("Session cached at {}", self.path.display());
        Ok(())
    }

    fn clear(&self) -> Result<(), SessionStoreError> {
        let mut values = match self.read_all() {
            Ok(values) => values,
            Err(SessionStoreError::Serialization(_)) => HashMap::new(),
            Err(e) => return Err(e),
        };
        if values.remove(SESSION_KEY).is_some() || self.path.exists() {
            self.write_all(&values)?;
        }
        Ok(())
    }
}

/// In-process store.
#[derive(Default)]
pub struct MemorySessionStore {
    values: Mutex<HashMap<String, String>>,
}

impl MemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Put raw text under the session key, bypassing serialization.
    pub fn insert_raw(&self, text: impl Into<String>) {
        self.lock().insert(SESSION_KEY.to_string(), text.into());
    }

    pub fn raw(&self) -> Option<String> {
        self.lock().get(SESSION_KEY).cloned()
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, String>> {
        self.values.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl SessionStore for MemorySessionStore {
    fn load(&self) -> Result<Option<SessionCacheEntry>, SessionStoreError> {
        parse_entry(self.lock().get(SESSION_KEY))
    }

    fn save(&self, entry: &SessionCacheEntry) -> Result<(), SessionStoreError> {
        let text = serde_json::to_string(entry)?;
        self.lock().insert(SESSION_KEY.to_string(), text);
        Ok(())
    }

    fn clear(&self) -> Result<(), SessionStoreError> {
        self.lock().remove(SESSION_KEY);
        Ok(())
    }
}

//! Persistent registry of recently used connections.
//!
//! Entries are keyed by DSN in `<config dir>/sqlscope/connections.json`.
//! Every change rewrites the whole file.

use crate::db::pool::ConnectionStore;
use crate::error::{DbError, DbResult};
use crate::models::{PersistedConnection, mask_dsn};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tokio::sync::Mutex;
use tracing::{debug, info};

/// Directory created under the platform config dir.
pub const APP_DIR: &str = "sqlscope";

pub const FILE_NAME: &str = "connections.json";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct RegistryFile {
    #[serde(default)]
    connections: BTreeMap<String, PersistedConnection>,
}

#[derive(Debug)]
pub struct ConnectionRegistry {
    path: PathBuf,
    state: Mutex<RegistryFile>,
}

impl ConnectionRegistry {
    /// `<platform config dir>/sqlscope`, if the platform has one.
    pub fn default_dir() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join(APP_DIR))
    }

    /// Load the registry in `dir`, creating the directory if needed.
    ///
    /// A missing or empty file is an empty registry.
    pub async fn open(dir: impl AsRef<Path>) -> DbResult<Self> {
        let dir = dir.as_ref();
        tokio::fs::create_dir_all(dir).await?;
        let path = dir.join(FILE_NAME);

        let state = match tokio::fs::read_to_string(&path).await {
            Ok(contents) if contents.trim().is_empty() => RegistryFile::default(),
            Ok(contents) => serde_json::from_str(&contents).map_err(|e| {
                DbError::registry(format!("decode {}: {}", path.display(), e))
            })?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => RegistryFile::default(),
            Err(e) => return Err(e.into()),
        };

        info!(
            path = %path.display(),
            connections = state.connections.len(),
            "Loaded connection registry"
        );
        Ok(Self {
            path,
            state: Mutex::new(state),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Record `dsn` as used now under `name`, replacing any previous entry.
    pub async fn add_connection(&self, name: &str, dsn: &str) -> DbResult<()> {
        self.add_connection_at(name, dsn, Utc::now()).await
    }

    /// Record `dsn` with an explicit timestamp.
    pub async fn add_connection_at(
        &self,
        name: &str,
        dsn: &str,
        last_used_at: DateTime<Utc>,
    ) -> DbResult<()> {
        if name.is_empty() {
            return Err(DbError::validation("name"));
        }
        if dsn.is_empty() {
            return Err(DbError::validation("dsn"));
        }

        let mut state = self.state.lock().await;
        let mut next = state.clone();
        next.connections.insert(
            dsn.to_string(),
            PersistedConnection {
                name: name.to_string(),
                dsn: dsn.to_string(),
                last_used_at,
            },
        );
        self.commit(&mut state, next).await?;
        debug!(name, dsn = %mask_dsn(dsn), "Saved connection");
        Ok(())
    }

    /// All entries, most recently used first; ties by name, then DSN.
    pub async fn get_connections(&self) -> Vec<PersistedConnection> {
        let state = self.state.lock().await;
        let mut connections: Vec<_> = state.connections.values().cloned().collect();
        connections.sort_by(|a, b| {
            b.last_used_at
                .cmp(&a.last_used_at)
                .then_with(|| a.name.cmp(&b.name))
                .then_with(|| a.dsn.cmp(&b.dsn))
        });
        connections
    }

    /// Most recently used entry with this name.
    pub async fn find_by_name(&self, name: &str) -> Option<PersistedConnection> {
        self.get_connections()
            .await
            .into_iter()
            .find(|c| c.name == name)
    }

    /// Forget `dsn`. Returns whether an entry existed.
    pub async fn remove_connection(&self, dsn: &str) -> DbResult<bool> {
        let mut state = self.state.lock().await;
        let mut next = state.clone();
        if next.connections.remove(dsn).is_none() {
            return Ok(false);
        }
        self.commit(&mut state, next).await?;
        info!(dsn = %mask_dsn(dsn), "Removed connection");
        Ok(true)
    }

    /// Forget the entry saved under this exact DSN, or else every entry
    /// saved under this name. Returns how many entries were removed.
    ///
    /// Listings mask passwords, so the name is the handle users can see.
    pub async fn forget(&self, name_or_dsn: &str) -> DbResult<usize> {
        if self.remove_connection(name_or_dsn).await? {
            return Ok(1);
        }

        let mut state = self.state.lock().await;
        let mut next = state.clone();
        next.connections.retain(|_, c| c.name != name_or_dsn);
        let removed = state.connections.len() - next.connections.len();
        if removed > 0 {
            self.commit(&mut state, next).await?;
            info!(name = name_or_dsn, removed, "Removed connections by name");
        }
        Ok(removed)
    }

    /// Write `next` to disk, then adopt it. A failed write leaves `state` as it was.
    async fn commit(&self, state: &mut RegistryFile, next: RegistryFile) -> DbResult<()> {
        let encoded = serde_json::to_vec_pretty(&next)?;
        tokio::fs::write(&self.path, encoded).await?;
        *state = next;
        Ok(())
    }
}

impl ConnectionStore for ConnectionRegistry {
    async fn add_connection(&self, name: &str, dsn: &str) -> DbResult<()> {
        ConnectionRegistry::add_connection(self, name, dsn).await
    }
}

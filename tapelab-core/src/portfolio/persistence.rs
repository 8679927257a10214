//! Snapshot persistence — a durable mirror of the ledger, never the system
//! of record during a run.
//!
//! The engine saves fire-and-forget: a failed write is logged and the
//! simulation continues. Writes are atomic (tmp file + rename) so a crashed
//! run never leaves a torn document behind.

use super::ledger::PortfolioSnapshot;
use std::fs;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("snapshot io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("snapshot serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Where ledger snapshots go.
pub trait SnapshotStore: Send {
    fn save(&self, portfolio_id: &str, snapshot: &PortfolioSnapshot) -> Result<(), StoreError>;
}

/// JSON documents on disk, one per portfolio: `{dir}/portfolio-{id}.json`.
pub struct JsonSnapshotStore {
    dir: PathBuf,
}

impl JsonSnapshotStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    fn path_for(&self, portfolio_id: &str) -> PathBuf {
        self.dir.join(format!("portfolio-{portfolio_id}.json"))
    }

    pub fn load(&self, portfolio_id: &str) -> Result<PortfolioSnapshot, StoreError> {
        let content = fs::read_to_string(self.path_for(portfolio_id))?;
        Ok(serde_json::from_str(&content)?)
    }
}

impl SnapshotStore for JsonSnapshotStore {
    fn save(&self, portfolio_id: &str, snapshot: &PortfolioSnapshot) -> Result<(), StoreError> {
        fs::create_dir_all(&self.dir)?;
        let path = self.path_for(portfolio_id);
        let tmp = path.with_extension("json.tmp");
        let json = serde_json::to_string_pretty(snapshot)?;
        fs::write(&tmp, json)?;
        fs::rename(&tmp, &path)?;
        Ok(())
    }
}

/// Discards snapshots. Default for tests and quick runs.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullSnapshotStore;

impl SnapshotStore for NullSnapshotStore {
    fn save(&self, _portfolio_id: &str, _snapshot: &PortfolioSnapshot) -> Result<(), StoreError> {
        Ok(())
    }
}

//! Portfolio ledger, performance statistics, and snapshot persistence.

pub mod ledger;
pub mod performance;
pub mod persistence;

pub use ledger::{Portfolio, PortfolioSnapshot, IDENTITY_TOLERANCE};
pub use performance::{EquityPoint, PortfolioStatistics};
pub use persistence::{JsonSnapshotStore, NullSnapshotStore, SnapshotStore, StoreError};

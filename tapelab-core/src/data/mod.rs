//! Market data boundary: provider trait, retry wrapper, in-memory source.

pub mod memory;
pub mod provider;
pub mod retry;

pub use memory::{synthetic_walk, MemoryProvider};
pub use provider::{DataError, Features, MarketDataProvider};
pub use retry::{with_retry, RetryPolicy};

//! The fetch, score and publish pipeline.
//!
//! - `aggregator`: one pass over the registry plus the river probe.
//! - `scheduler`: repeats that pass on a fixed interval and publishes the results.

mod aggregator;
mod scheduler;

pub use aggregator::*;
pub use scheduler::*;

use crate::error::Result;
use crate::models::AggregateSnapshot;
use std::future::Future;

/// Anything able to produce a complete snapshot for one tick.
pub trait SnapshotSource: Send + Sync + 'static {
    fn collect(&self) -> impl Future<Output = Result<AggregateSnapshot>> + Send;
}

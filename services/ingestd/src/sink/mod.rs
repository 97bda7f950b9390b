//! Reading sink: the durable destination for drained buffer batches.
//! Bulk insert is the only write path; duplicate rows within a batch or
//! already present in storage are rejected silently rather than erroring,
//! which keeps the flusher's at-most-once contract simple.
use acequia_model::Reading;
use async_trait::async_trait;
use std::sync::Arc;

mod memory;
mod postgres;

pub use memory::MemorySink;
pub use postgres::PostgresSink;

pub type Result<T> = std::result::Result<T, SinkError>;

#[derive(thiserror::Error, Debug)]
pub enum SinkError {
    /// The backend gave up on the batch. `inserted` counts rows durably
    /// written before the failure, so callers can still report them.
    #[error("sink unavailable: {source}")]
    Unavailable {
        #[source]
        source: anyhow::Error,
        inserted: usize,
    },
}

impl SinkError {
    pub fn unavailable(source: impl Into<anyhow::Error>) -> Self {
        Self::Unavailable {
            source: source.into(),
            inserted: 0,
        }
    }

    /// Rows that made it to storage despite the failure.
    pub fn inserted(&self) -> usize {
        match self {
            Self::Unavailable { inserted, .. } => *inserted,
        }
    }
}

/// Outcome of one bulk insert. `rejected` counts rows refused individually
/// (duplicates, constraint violations) while the batch as a whole succeeded.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BulkInsertOutcome {
    pub inserted: usize,
    pub rejected: usize,
}

#[async_trait]
pub trait ReadingSink: Send + Sync {
    /// Persist a drained batch. Per-row rejection is reported in the
    /// outcome; a mid-batch failure returns `Err` carrying the count of
    /// rows already written.
    async fn insert_many(&self, readings: &[Arc<Reading>]) -> Result<BulkInsertOutcome>;

    /// Cheap backend liveness probe for the health endpoint.
    async fn health_check(&self) -> Result<()>;

    fn backend_name(&self) -> &'static str;
}

use super::{BulkInsertOutcome, ReadingSink, Result};
use acequia_model::Reading;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use std::collections::HashSet;
use std::sync::Arc;

/// In-memory sink. Keeps every accepted row for the process lifetime and
/// applies the same uniqueness rule as the Postgres schema, so duplicate
/// batches behave identically across backends.
#[derive(Debug, Default)]
pub struct MemorySink {
    state: Mutex<SinkState>,
}

#[derive(Debug, Default)]
struct SinkState {
    rows: Vec<Arc<Reading>>,
    seen: HashSet<(String, String, DateTime<Utc>)>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every row accepted so far, in insertion order.
    pub fn rows(&self) -> Vec<Arc<Reading>> {
        self.state.lock().rows.clone()
    }
}

#[async_trait]
impl ReadingSink for MemorySink {
    async fn insert_many(&self, readings: &[Arc<Reading>]) -> Result<BulkInsertOutcome> {
        let mut state = self.state.lock();
        let mut outcome = BulkInsertOutcome::default();
        for reading in readings {
            let key = (
                reading.channel_id.to_string(),
                reading.device_id.clone(),
                reading.timestamp,
            );
            if state.seen.insert(key) {
                state.rows.push(Arc::clone(reading));
                outcome.inserted += 1;
            } else {
                outcome.rejected += 1;
            }
        }
        Ok(outcome)
    }

    async fn health_check(&self) -> Result<()> {
        Ok(())
    }

    fn backend_name(&self) -> &'static str {
        "memory"
    }
}

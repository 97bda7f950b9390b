//! In-memory reading buffer for the ingestion hot path.
//!
//! # Purpose
//! Holds, per channel, the most recent reading plus the queue of readings
//! accumulated since the last flush. Ingestion pushes here without touching
//! durable storage; the flusher periodically drains everything in one atomic
//! sweep and bulk-writes the result.
//!
//! # Durability and consistency
//! - **Not durable**: all state is lost on process restart. The loss window
//!   is bounded by the flush interval.
//! - **Single-process consistency**: one mutex guards the whole channel map,
//!   so `drain` observes and clears every pending queue atomically. A push
//!   racing a drain lands wholly in the next batch; nothing is lost or
//!   duplicated across two drains.
//!
//! # Performance characteristics
//! Push and the read accessors are short critical sections over a
//! `parking_lot::Mutex`; there are no await points and no I/O anywhere in
//! this crate. `latest` is never cleared, only replaced, so snapshot reads
//! after the first push always observe data.
use acequia_model::{ChannelId, Reading};
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;

/// Per-channel buffered state. Created lazily on the first reading for a
/// channel and kept for the process lifetime.
#[derive(Debug, Default)]
struct ChannelState {
    latest: Option<Arc<Reading>>,
    pending: Vec<Arc<Reading>>,
}

/// Pending-queue depth and freshness for one channel, for observability.
#[derive(Debug, Clone, PartialEq)]
pub struct ChannelStats {
    pub pending: usize,
    pub latest_timestamp: Option<DateTime<Utc>>,
}

/// The process-wide reading buffer. Explicitly constructed and injected;
/// tests build a fresh instance each.
#[derive(Debug, Default)]
pub struct ReadingBuffer {
    channels: Mutex<HashMap<ChannelId, ChannelState>>,
}

impl ReadingBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a reading to its channel's pending queue and replace the
    /// channel's latest reading. Returns the pending depth after the push.
    pub fn push(&self, reading: Arc<Reading>) -> usize {
        let mut channels = self.channels.lock();
        let state = channels.entry(reading.channel_id.clone()).or_default();
        state.latest = Some(Arc::clone(&reading));
        state.pending.push(reading);
        let depth = state.pending.len();
        metrics::counter!("acequia_buffer_pushed_total").increment(1);
        depth
    }

    /// Most recent reading for one channel, if any has ever arrived.
    pub fn latest(&self, channel_id: &ChannelId) -> Option<Arc<Reading>> {
        let channels = self.channels.lock();
        channels.get(channel_id).and_then(|s| s.latest.clone())
    }

    /// Point-in-time snapshot of the latest reading for every channel.
    pub fn all_latest(&self) -> HashMap<ChannelId, Arc<Reading>> {
        let channels = self.channels.lock();
        channels
            .iter()
            .filter_map(|(id, state)| state.latest.clone().map(|r| (id.clone(), r)))
            .collect()
    }

    /// Number of readings waiting for the next flush on one channel.
    pub fn pending_count(&self, channel_id: &ChannelId) -> usize {
        let channels = self.channels.lock();
        channels.get(channel_id).map_or(0, |s| s.pending.len())
    }

    /// Pending depth and latest timestamp per channel.
    pub fn stats(&self) -> HashMap<ChannelId, ChannelStats> {
        let channels = self.channels.lock();
        channels
            .iter()
            .map(|(id, state)| {
                (
                    id.clone(),
                    ChannelStats {
                        pending: state.pending.len(),
                        latest_timestamp: state.latest.as_ref().map(|r| r.timestamp),
                    },
                )
            })
            .collect()
    }

    /// Atomically collect and clear every channel's pending queue.
    ///
    /// Each channel's `latest` stays intact. Once drained, readings are the
    /// caller's responsibility; the buffer never re-queues them.
    pub fn drain(&self) -> Vec<Arc<Reading>> {
        let mut channels = self.channels.lock();
        let mut drained = Vec::new();
        for state in channels.values_mut() {
            drained.append(&mut state.pending);
        }
        if !drained.is_empty() {
            metrics::counter!("acequia_buffer_drained_total").increment(drained.len() as u64);
        }
        drained
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use acequia_model::{ChannelStatus, SensorType};
    use rand::Rng;
    use std::thread;

    fn reading(channel: &str, device: &str) -> Arc<Reading> {
        Arc::new(Reading {
            channel_id: ChannelId::parse(channel).expect("channel id"),
            device_id: device.to_string(),
            sensor_type: SensorType::Radar,
            status: ChannelStatus::Flowing,
            flow_rate: 3.2,
            velocity: None,
            discharge: None,
            water_level: None,
            depth: None,
            area: None,
            hydraulic_radius: None,
            wetted_perimeter: None,
            temperature: None,
            ph: None,
            turbidity: None,
            battery_level: None,
            signal_strength: None,
            gps: None,
            errors: Vec::new(),
            timestamp: Utc::now(),
            received_at: Utc::now(),
        })
    }

    #[test]
    fn push_then_latest_round_trips() {
        let buffer = ReadingBuffer::new();
        let pushed = reading("west-main", "esp32-001");
        buffer.push(Arc::clone(&pushed));
        let latest = buffer.latest(&ChannelId::parse("west-main").expect("id"));
        assert_eq!(latest.as_deref(), Some(pushed.as_ref()));
    }

    #[test]
    fn latest_is_absent_for_unknown_channel() {
        let buffer = ReadingBuffer::new();
        assert!(buffer.latest(&ChannelId::parse("nowhere").expect("id")).is_none());
    }

    #[test]
    fn drain_returns_all_pending_then_nothing() {
        let buffer = ReadingBuffer::new();
        for i in 0..5 {
            buffer.push(reading("west-main", &format!("esp32-{i}")));
        }
        let first = buffer.drain();
        assert_eq!(first.len(), 5);
        let second = buffer.drain();
        assert!(second.is_empty());
        // Latest survives the drain.
        assert!(buffer
            .latest(&ChannelId::parse("west-main").expect("id"))
            .is_some());
    }

    #[test]
    fn push_reports_pending_depth() {
        let buffer = ReadingBuffer::new();
        assert_eq!(buffer.push(reading("west-main", "a")), 1);
        assert_eq!(buffer.push(reading("west-main", "b")), 2);
        assert_eq!(buffer.push(reading("east-side", "c")), 1);
        buffer.drain();
        assert_eq!(buffer.push(reading("west-main", "d")), 1);
    }

    #[test]
    fn stats_cover_every_channel() {
        let buffer = ReadingBuffer::new();
        buffer.push(reading("west-main", "a"));
        buffer.push(reading("west-main", "b"));
        buffer.push(reading("east-side", "c"));
        let stats = buffer.stats();
        assert_eq!(stats.len(), 2);
        let west = &stats[&ChannelId::parse("west-main").expect("id")];
        assert_eq!(west.pending, 2);
        assert!(west.latest_timestamp.is_some());
    }

    #[test]
    fn all_latest_returns_one_reading_per_channel() {
        let buffer = ReadingBuffer::new();
        buffer.push(reading("west-main", "a"));
        let newest = reading("west-main", "b");
        buffer.push(Arc::clone(&newest));
        buffer.push(reading("east-side", "c"));
        let all = buffer.all_latest();
        assert_eq!(all.len(), 2);
        assert_eq!(
            all[&ChannelId::parse("west-main").expect("id")].device_id,
            "b"
        );
    }

    #[test]
    fn concurrent_pushes_and_drains_lose_and_duplicate_nothing() {
        let buffer = Arc::new(ReadingBuffer::new());
        let channels = ["north-01", "north-02", "south-01", "south-02"];
        let pushers = 8;
        let per_pusher = 500;

        let mut handles = Vec::new();
        for p in 0..pushers {
            let buffer = Arc::clone(&buffer);
            handles.push(thread::spawn(move || {
                let mut rng = rand::thread_rng();
                for i in 0..per_pusher {
                    let channel = channels[rng.gen_range(0..channels.len())];
                    // Device id doubles as a unique marker for accounting.
                    buffer.push(reading(channel, &format!("pusher-{p}-{i}")));
                }
            }));
        }

        let drainer = {
            let buffer = Arc::clone(&buffer);
            thread::spawn(move || {
                let mut collected = Vec::new();
                for _ in 0..200 {
                    collected.extend(buffer.drain());
                    thread::yield_now();
                }
                collected
            })
        };

        for handle in handles {
            handle.join().expect("pusher");
        }
        let mut collected = drainer.join().expect("drainer");
        collected.extend(buffer.drain());

        assert_eq!(collected.len(), pushers * per_pusher);
        let mut markers: Vec<&str> = collected.iter().map(|r| r.device_id.as_str()).collect();
        markers.sort_unstable();
        markers.dedup();
        assert_eq!(markers.len(), pushers * per_pusher);
    }
}

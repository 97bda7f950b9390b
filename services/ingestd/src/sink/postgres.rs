use super::{BulkInsertOutcome, ReadingSink, Result, SinkError};
use acequia_model::{Reading, SensorType};
use async_trait::async_trait;
use sqlx::types::Json;
use sqlx::{PgPool, QueryBuilder};
use std::sync::Arc;

// 21 binds per row; stays well under the Postgres bind limit per statement.
const INSERT_CHUNK_ROWS: usize = 1000;

/// Postgres-backed sink. Batches land as multi-row inserts with
/// `ON CONFLICT DO NOTHING`, so replayed or duplicated rows are rejected
/// per row instead of failing the batch.
#[derive(Debug, Clone)]
pub struct PostgresSink {
    pool: PgPool,
}

impl PostgresSink {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn sensor_type_str(sensor_type: SensorType) -> &'static str {
    match sensor_type {
        SensorType::Radar => "radar",
        SensorType::Ultrasonic => "ultrasonic",
    }
}

#[async_trait]
impl ReadingSink for PostgresSink {
    async fn insert_many(&self, readings: &[Arc<Reading>]) -> Result<BulkInsertOutcome> {
        let mut outcome = BulkInsertOutcome::default();
        for chunk in readings.chunks(INSERT_CHUNK_ROWS) {
            let mut builder = QueryBuilder::new(
                "INSERT INTO readings \
                 (channel_id, device_id, sensor_type, status, flow_rate, velocity, discharge, \
                  water_level, depth, area, hydraulic_radius, wetted_perimeter, temperature, \
                  ph, turbidity, battery_level, signal_strength, gps, errors, \
                  recorded_at, received_at) ",
            );
            builder.push_values(chunk, |mut row, reading| {
                row.push_bind(reading.channel_id.as_str())
                    .push_bind(&reading.device_id)
                    .push_bind(sensor_type_str(reading.sensor_type))
                    .push_bind(reading.status.as_str())
                    .push_bind(reading.flow_rate)
                    .push_bind(reading.velocity)
                    .push_bind(reading.discharge)
                    .push_bind(reading.water_level)
                    .push_bind(reading.depth)
                    .push_bind(reading.area)
                    .push_bind(reading.hydraulic_radius)
                    .push_bind(reading.wetted_perimeter)
                    .push_bind(reading.temperature)
                    .push_bind(reading.ph)
                    .push_bind(reading.turbidity)
                    .push_bind(reading.battery_level)
                    .push_bind(reading.signal_strength)
                    .push_bind(reading.gps.clone().map(Json))
                    .push_bind((!reading.errors.is_empty()).then(|| Json(reading.errors.clone())))
                    .push_bind(reading.timestamp)
                    .push_bind(reading.received_at);
            });
            builder.push(" ON CONFLICT (channel_id, device_id, recorded_at) DO NOTHING");
            // A later chunk can fail after earlier ones landed; report the
            // rows already written instead of discarding the count.
            let result = builder
                .build()
                .execute(&self.pool)
                .await
                .map_err(|err| SinkError::Unavailable {
                    source: err.into(),
                    inserted: outcome.inserted,
                })?;
            let inserted = result.rows_affected() as usize;
            outcome.inserted += inserted;
            outcome.rejected += chunk.len() - inserted;
        }
        Ok(outcome)
    }

    async fn health_check(&self) -> Result<()> {
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .map_err(SinkError::unavailable)?;
        Ok(())
    }

    fn backend_name(&self) -> &'static str {
        "postgres"
    }
}

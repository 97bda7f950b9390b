use super::{ChannelRegistry, RegistryError, Result};
use acequia_hydraulics::Geometry;
use acequia_model::{ChannelConfig, ChannelId, SensorType};
use anyhow::Context;
use async_trait::async_trait;
use sqlx::postgres::PgRow;
use sqlx::types::Json;
use sqlx::{PgPool, Row};

/// Postgres-backed registry. Shares its pool with the reading sink; the
/// schema is applied by the embedded migrations at connect time.
#[derive(Debug, Clone)]
pub struct PostgresRegistry {
    pool: PgPool,
}

impl PostgresRegistry {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn row_to_config(row: &PgRow) -> anyhow::Result<ChannelConfig> {
    let channel_id: String = row.try_get("channel_id")?;
    let sensor_type: String = row.try_get("sensor_type")?;
    let geometry: Option<Json<Geometry>> = row.try_get("geometry")?;
    Ok(ChannelConfig {
        channel_id: ChannelId::parse(&channel_id)
            .with_context(|| format!("stored channel id {channel_id:?} is invalid"))?,
        name: row.try_get("name")?,
        sensor_type: match sensor_type.as_str() {
            "ultrasonic" => SensorType::Ultrasonic,
            _ => SensorType::Radar,
        },
        geometry: geometry.map(|g| g.0),
        depth_offset: row.try_get("depth_offset")?,
        device_id: row.try_get("device_id")?,
        active: row.try_get("active")?,
    })
}

fn sensor_type_str(sensor_type: SensorType) -> &'static str {
    match sensor_type {
        SensorType::Radar => "radar",
        SensorType::Ultrasonic => "ultrasonic",
    }
}

#[async_trait]
impl ChannelRegistry for PostgresRegistry {
    async fn get(&self, channel_id: &ChannelId) -> Result<Option<ChannelConfig>> {
        let row = sqlx::query(
            "SELECT channel_id, name, sensor_type, geometry, depth_offset, device_id, active \
             FROM channels WHERE channel_id = $1",
        )
        .bind(channel_id.as_str())
        .fetch_optional(&self.pool)
        .await
        .context("fetch channel")?;
        row.as_ref().map(row_to_config).transpose().map_err(Into::into)
    }

    async fn list(&self) -> Result<Vec<ChannelConfig>> {
        let rows = sqlx::query(
            "SELECT channel_id, name, sensor_type, geometry, depth_offset, device_id, active \
             FROM channels ORDER BY channel_id",
        )
        .fetch_all(&self.pool)
        .await
        .context("list channels")?;
        rows.iter()
            .map(|row| row_to_config(row).map_err(Into::into))
            .collect()
    }

    async fn create(&self, config: ChannelConfig) -> Result<ChannelConfig> {
        let result = sqlx::query(
            "INSERT INTO channels \
             (channel_id, name, sensor_type, geometry, depth_offset, device_id, active) \
             VALUES ($1, $2, $3, $4, $5, $6, $7) \
             ON CONFLICT (channel_id) DO NOTHING",
        )
        .bind(config.channel_id.as_str())
        .bind(&config.name)
        .bind(sensor_type_str(config.sensor_type))
        .bind(config.geometry.clone().map(Json))
        .bind(config.depth_offset)
        .bind(config.device_id.as_deref())
        .bind(config.active)
        .execute(&self.pool)
        .await
        .context("insert channel")?;
        if result.rows_affected() == 0 {
            return Err(RegistryError::Conflict(config.channel_id.to_string()));
        }
        Ok(config)
    }

    async fn bind_device(&self, channel_id: &ChannelId, device_id: &str) -> Result<()> {
        let result = sqlx::query("UPDATE channels SET device_id = $2 WHERE channel_id = $1")
            .bind(channel_id.as_str())
            .bind(device_id)
            .execute(&self.pool)
            .await
            .context("bind device")?;
        if result.rows_affected() == 0 {
            return Err(RegistryError::NotFound(channel_id.to_string()));
        }
        Ok(())
    }

    async fn find_by_device(&self, device_id: &str) -> Result<Option<ChannelConfig>> {
        let row = sqlx::query(
            "SELECT channel_id, name, sensor_type, geometry, depth_offset, device_id, active \
             FROM channels WHERE device_id = $1 ORDER BY channel_id LIMIT 1",
        )
        .bind(device_id)
        .fetch_optional(&self.pool)
        .await
        .context("find channel by device")?;
        row.as_ref().map(row_to_config).transpose().map_err(Into::into)
    }

    async fn health_check(&self) -> Result<()> {
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .context("registry health check")?;
        Ok(())
    }

    fn backend_name(&self) -> &'static str {
        "postgres"
    }
}

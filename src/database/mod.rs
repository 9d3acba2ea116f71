pub mod connection;
pub mod operations;

pub use operations::{ensure_schema, store_points};

use crate::error::SinkError;
use crate::models::MetricPoint;

/// Destination for metric points
pub trait PointSink {
    /// Write `points` as one batch
    async fn write_points(&self, points: &[MetricPoint]) -> Result<(), SinkError>;
}

/// PostgreSQL / TimescaleDB sink, one connection per batch
#[derive(Debug, Clone)]
pub struct TimescaleSink {
    database_url: String,
}

impl TimescaleSink {
    pub fn new(database_url: &str) -> Self {
        TimescaleSink {
            database_url: database_url.to_string(),
        }
    }

    pub async fn ensure_schema(&self) -> Result<(), SinkError> {
        ensure_schema(&self.database_url).await
    }
}

impl PointSink for TimescaleSink {
    async fn write_points(&self, points: &[MetricPoint]) -> Result<(), SinkError> {
        let rows = store_points(&self.database_url, points).await?;
        log::debug!("Stored {} points as {} rows", points.len(), rows);
        Ok(())
    }
}

/// Database operations for storing metric points
use time::OffsetDateTime;

use crate::database::connection::connect;
use crate::error::SinkError;
use crate::models::{FieldValue, MetricPoint};

/// Long format: one row per point field, the value in the column matching its type
const CREATE_SCHEMA: &str = "
    CREATE TABLE IF NOT EXISTS metric_points (
        time timestamptz NOT NULL,
        measurement text NOT NULL,
        name text NULL,
        field text NOT NULL,
        value_double double precision NULL,
        value_int bigint NULL,
        value_bool boolean NULL,
        value_text text NULL
    );
    CREATE INDEX IF NOT EXISTS metric_points_measurement_time_idx
        ON metric_points (measurement, time DESC);
";

const INSERT_ROW: &str = "INSERT INTO metric_points(time, measurement, name, field, value_double, value_int, value_bool, value_text)
     VALUES ($1, $2, $3, $4, $5, $6, $7, $8)";

#[derive(Debug, Clone, PartialEq)]
pub struct PointRow {
    pub time: OffsetDateTime,
    pub measurement: String,
    pub name: Option<String>,
    pub field: String,
    pub value_double: Option<f64>,
    pub value_int: Option<i64>,
    pub value_bool: Option<bool>,
    pub value_text: Option<String>,
}

/// Flatten points into table rows, one per field
pub fn point_rows(points: &[MetricPoint]) -> Vec<PointRow> {
    points
        .iter()
        .flat_map(|point| {
            let name = point.tags().get("name").cloned();
            point.fields().iter().map(move |(field, value)| {
                let mut row = PointRow {
                    time: point.time(),
                    measurement: point.measurement().to_string(),
                    name: name.clone(),
                    field: field.clone(),
                    value_double: None,
                    value_int: None,
                    value_bool: None,
                    value_text: None,
                };
                match value {
                    FieldValue::Float(v) => row.value_double = Some(*v),
                    FieldValue::Integer(v) => row.value_int = Some(*v),
                    FieldValue::Bool(v) => row.value_bool = Some(*v),
                    FieldValue::Text(v) => row.value_text = Some(v.clone()),
                }
                row
            })
        })
        .collect()
}

/// Create the points table if it isn't there yet
pub async fn ensure_schema(database_url: &str) -> Result<(), SinkError> {
    let client = connect(database_url).await?;
    client.batch_execute(CREATE_SCHEMA).await?;
    Ok(())
}

/// Insert all `points` in a single transaction
///
/// Either every row lands or none do. Returns the number of rows inserted.
pub async fn store_points(database_url: &str, points: &[MetricPoint]) -> Result<u64, SinkError> {
    let rows = point_rows(points);
    if rows.is_empty() {
        return Ok(0);
    }

    let mut client = connect(database_url).await?;
    let transaction = client.transaction().await?;
    let statement = transaction.prepare(INSERT_ROW).await?;

    let mut inserted = 0;
    for row in &rows {
        inserted += transaction
            .execute(
                &statement,
                &[
                    &row.time,
                    &row.measurement,
                    &row.name,
                    &row.field,
                    &row.value_double,
                    &row.value_int,
                    &row.value_bool,
                    &row.value_text,
                ],
            )
            .await?;
    }

    transaction.commit().await?;
    Ok(inserted)
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::datetime;

    #[test]
    fn one_row_per_field_with_typed_column() {
        let time = datetime!(2024-01-15 12:00 UTC);
        let points = vec![
            MetricPoint::new("ecobee_sensor", time)
                .with_tag("name", "EcobeeSensor: Den (X1)")
                .with_field("temperature", 70.5)
                .with_field("occupancy", true),
            MetricPoint::new("ecobeemetrics", time)
                .with_field("api_failure_total", 2i64),
            MetricPoint::new("ecobee_thermostat", time)
                .with_tag("name", "Hallway")
                .with_field("program", "home"),
        ];

        let rows = point_rows(&points);
        assert_eq!(rows.len(), 4);

        let occupancy = &rows[0];
        assert_eq!(occupancy.field, "occupancy");
        assert_eq!(occupancy.name.as_deref(), Some("EcobeeSensor: Den (X1)"));
        assert_eq!(occupancy.value_bool, Some(true));
        assert_eq!(occupancy.value_double, None);

        let temperature = &rows[1];
        assert_eq!(temperature.field, "temperature");
        assert_eq!(temperature.value_double, Some(70.5));

        let failures = &rows[2];
        assert_eq!(failures.measurement, "ecobeemetrics");
        assert_eq!(failures.name, None);
        assert_eq!(failures.value_int, Some(2));

        let program = &rows[3];
        assert_eq!(program.value_text.as_deref(), Some("home"));
        assert_eq!(program.time, time);
    }
}

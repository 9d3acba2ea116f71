/// Conversion of thermostat and sensor snapshots into metric points
use time::OffsetDateTime;

use crate::models::{FieldValue, MetricPoint, SensorSnapshot, ThermostatSnapshot};

/// A record that can be written as one tagged metric point
///
/// `attributes` lists every attribute under its identifier. Attributes that
/// are `None` are left out of the point rather than written as a default.
pub trait MetricRecord {
    fn display_name(&self) -> &str;
    fn attributes(&self) -> Vec<(&'static str, Option<FieldValue>)>;
}

impl MetricRecord for ThermostatSnapshot {
    fn display_name(&self) -> &str {
        &self.name
    }

    fn attributes(&self) -> Vec<(&'static str, Option<FieldValue>)> {
        let eq = &self.equipment;
        vec![
            ("CoolingSetpoint", Some(self.cooling_setpoint.into())),
            ("HeatingSetpoint", Some(self.heating_setpoint.into())),
            ("Program", Some(self.program.as_str().into())),
            ("EquipmentStatus", Some(self.equipment_status.as_str().into())),
            ("Heat1", Some(eq.heat1.into())),
            ("Heat2", Some(eq.heat2.into())),
            ("Heat3", Some(eq.heat3.into())),
            ("Cool1", Some(eq.cool1.into())),
            ("Cool2", Some(eq.cool2.into())),
            ("AuxHeat1", Some(eq.aux_heat1.into())),
            ("AuxHeat2", Some(eq.aux_heat2.into())),
            ("AuxHeat3", Some(eq.aux_heat3.into())),
            ("Fan", Some(eq.fan.into())),
            ("Idle", Some(self.idle.into())),
        ]
    }
}

impl MetricRecord for SensorSnapshot {
    fn display_name(&self) -> &str {
        &self.name
    }

    fn attributes(&self) -> Vec<(&'static str, Option<FieldValue>)> {
        vec![
            ("Temperature", Some(self.temperature.into())),
            ("Occupancy", Some(self.occupancy.into())),
            ("Humidity", self.humidity.map(FieldValue::from)),
        ]
    }
}

/// Build one point tagged with the record's name and one field per present attribute
pub fn build_point(
    record: &impl MetricRecord,
    measurement: &str,
    time: OffsetDateTime,
) -> MetricPoint {
    record.attributes().into_iter().fold(
        MetricPoint::new(measurement, time).with_tag("name", record.display_name()),
        |point, (ident, value)| match value {
            Some(value) => point.with_field(to_snake_case(ident), value),
            None => point,
        },
    )
}

/// The exporter's own health point, written every cycle without tags
pub fn exporter_point(
    measurement: &str,
    api_failure_total: u64,
    last_update: Option<OffsetDateTime>,
    time: OffsetDateTime,
) -> MetricPoint {
    let failures = i64::try_from(api_failure_total).unwrap_or(i64::MAX);
    let last_update_secs = last_update.map(|t| t.unix_timestamp()).unwrap_or(0);

    MetricPoint::new(measurement, time)
        .with_field("api_failure_total", failures)
        .with_field("last_update_timestamp_seconds", last_update_secs)
}

/// Convert an identifier such as `CoolingSetpoint` or `AuxHeat1` to snake case
///
/// Word boundaries are lower-to-upper transitions, letter/digit transitions and
/// the last capital of an acronym run (`HTTPServer` -> `http_server`).
pub fn to_snake_case(ident: &str) -> String {
    let chars: Vec<char> = ident.chars().collect();
    let mut out = String::with_capacity(ident.len() + 4);

    for (i, &c) in chars.iter().enumerate() {
        if c == '_' || c == '-' || c == ' ' || c == '.' {
            if !out.is_empty() && !out.ends_with('_') {
                out.push('_');
            }
            continue;
        }

        let prev = if i > 0 { Some(chars[i - 1]) } else { None };
        let next = chars.get(i + 1).copied();

        let boundary = match prev {
            None => false,
            Some(p) if c.is_uppercase() => {
                p.is_lowercase()
                    || p.is_ascii_digit()
                    || (p.is_uppercase() && next.is_some_and(|n| n.is_lowercase()))
            }
            Some(p) if c.is_ascii_digit() => p.is_alphabetic(),
            Some(p) => p.is_ascii_digit(),
        };

        if boundary && !out.is_empty() && !out.ends_with('_') {
            out.push('_');
        }
        out.extend(c.to_lowercase());
    }

    out.trim_end_matches('_').to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::EquipmentFlags;
    use time::macros::datetime;

    fn thermostat() -> ThermostatSnapshot {
        ThermostatSnapshot {
            name: "Hallway".to_string(),
            cooling_setpoint: 76.0,
            heating_setpoint: 68.5,
            program: "home".to_string(),
            equipment_status: "Heat1".to_string(),
            equipment: EquipmentFlags {
                heat1: true,
                fan: true,
                ..Default::default()
            },
            idle: false,
        }
    }

    #[test]
    fn snake_case_matches_schema_names() {
        assert_eq!(to_snake_case("CoolingSetpoint"), "cooling_setpoint");
        assert_eq!(to_snake_case("EquipmentStatus"), "equipment_status");
        assert_eq!(to_snake_case("AuxHeat1"), "aux_heat_1");
        assert_eq!(to_snake_case("Heat2"), "heat_2");
        assert_eq!(to_snake_case("Idle"), "idle");
        assert_eq!(to_snake_case("HTTPServer"), "http_server");
        assert_eq!(to_snake_case("numbers2And55with000"), "numbers_2_and_55_with_000");
        assert_eq!(to_snake_case("already_snake"), "already_snake");
    }

    #[test]
    fn thermostat_point_has_name_tag_and_every_field() {
        let time = datetime!(2024-01-15 12:00 UTC);
        let point = build_point(&thermostat(), "ecobee_thermostat", time);

        assert_eq!(point.measurement(), "ecobee_thermostat");
        assert_eq!(point.tags().len(), 1);
        assert_eq!(point.tags().get("name").map(String::as_str), Some("Hallway"));
        assert_eq!(point.time(), time);
        assert_eq!(point.fields().len(), 14);
        assert_eq!(point.fields().get("cooling_setpoint"), Some(&FieldValue::Float(76.0)));
        assert_eq!(point.fields().get("heating_setpoint"), Some(&FieldValue::Float(68.5)));
        assert_eq!(point.fields().get("program"), Some(&FieldValue::Text("home".into())));
        assert_eq!(point.fields().get("equipment_status"), Some(&FieldValue::Text("Heat1".into())));
        assert_eq!(point.fields().get("heat_1"), Some(&FieldValue::Bool(true)));
        assert_eq!(point.fields().get("aux_heat_3"), Some(&FieldValue::Bool(false)));
        assert_eq!(point.fields().get("fan"), Some(&FieldValue::Bool(true)));
        assert_eq!(point.fields().get("idle"), Some(&FieldValue::Bool(false)));
    }

    #[test]
    fn missing_humidity_is_omitted() {
        let time = datetime!(2024-01-15 12:00 UTC);
        let mut sensor = SensorSnapshot {
            name: "EcobeeSensor: Bedroom (AB12)".to_string(),
            temperature: 70.1,
            occupancy: true,
            humidity: None,
        };

        let point = build_point(&sensor, "ecobee_sensor", time);
        assert_eq!(point.fields().len(), 2);
        assert!(point.fields().get("humidity").is_none());
        assert_eq!(point.fields().get("temperature"), Some(&FieldValue::Float(70.1)));
        assert_eq!(point.fields().get("occupancy"), Some(&FieldValue::Bool(true)));

        sensor.humidity = Some(41.0);
        let point = build_point(&sensor, "ecobee_sensor", time);
        assert_eq!(point.fields().get("humidity"), Some(&FieldValue::Float(41.0)));
    }

    #[test]
    fn exporter_point_has_no_tags() {
        let time = datetime!(2024-01-15 12:00 UTC);
        let last = datetime!(2024-01-15 11:58 UTC);

        let point = exporter_point("ecobeemetrics", 3, Some(last), time);
        assert!(point.tags().is_empty());
        assert_eq!(point.fields().get("api_failure_total"), Some(&FieldValue::Integer(3)));
        assert_eq!(
            point.fields().get("last_update_timestamp_seconds"),
            Some(&FieldValue::Integer(last.unix_timestamp()))
        );

        let cold = exporter_point("ecobeemetrics", 0, None, time);
        assert_eq!(
            cold.fields().get("last_update_timestamp_seconds"),
            Some(&FieldValue::Integer(0))
        );
    }
}

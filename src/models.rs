use std::collections::BTreeMap;
use time::OffsetDateTime;

/// Which equipment circuits the thermostat reports as running
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EquipmentFlags {
    pub heat1: bool,
    pub heat2: bool,
    pub heat3: bool,
    pub cool1: bool,
    pub cool2: bool,
    pub aux_heat1: bool,
    pub aux_heat2: bool,
    pub aux_heat3: bool,
    pub fan: bool,
}

impl EquipmentFlags {
    pub fn is_idle(&self) -> bool {
        !(self.heat1
            || self.heat2
            || self.heat3
            || self.cool1
            || self.cool2
            || self.aux_heat1
            || self.aux_heat2
            || self.aux_heat3
            || self.fan)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ThermostatSnapshot {
    pub name: String,
    pub cooling_setpoint: f64,
    pub heating_setpoint: f64,
    pub program: String,
    pub equipment_status: String,
    pub equipment: EquipmentFlags,
    pub idle: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SensorSnapshot {
    pub name: String,
    pub temperature: f64,
    pub occupancy: bool,
    pub humidity: Option<f64>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    Float(f64),
    Integer(i64),
    Bool(bool),
    Text(String),
}

impl From<f64> for FieldValue {
    fn from(value: f64) -> Self {
        FieldValue::Float(value)
    }
}

impl From<i64> for FieldValue {
    fn from(value: i64) -> Self {
        FieldValue::Integer(value)
    }
}

impl From<bool> for FieldValue {
    fn from(value: bool) -> Self {
        FieldValue::Bool(value)
    }
}

impl From<&str> for FieldValue {
    fn from(value: &str) -> Self {
        FieldValue::Text(value.to_string())
    }
}

/// A single time-series point as handed to the sink
///
/// Built with the consuming `with_*` methods and never changed afterwards.
#[derive(Debug, Clone, PartialEq)]
pub struct MetricPoint {
    measurement: String,
    tags: BTreeMap<String, String>,
    fields: BTreeMap<String, FieldValue>,
    time: OffsetDateTime,
}

impl MetricPoint {
    pub fn new(measurement: impl Into<String>, time: OffsetDateTime) -> Self {
        MetricPoint {
            measurement: measurement.into(),
            tags: BTreeMap::new(),
            fields: BTreeMap::new(),
            time,
        }
    }

    pub fn with_tag(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.tags.insert(key.into(), value.into());
        self
    }

    pub fn with_field(mut self, key: impl Into<String>, value: impl Into<FieldValue>) -> Self {
        self.fields.insert(key.into(), value.into());
        self
    }

    pub fn measurement(&self) -> &str {
        &self.measurement
    }

    pub fn tags(&self) -> &BTreeMap<String, String> {
        &self.tags
    }

    pub fn fields(&self) -> &BTreeMap<String, FieldValue> {
        &self.fields
    }

    pub fn time(&self) -> OffsetDateTime {
        self.time
    }
}

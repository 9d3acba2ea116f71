/// Extraction of thermostat state and sensor readings from ecobee payloads
use log::{debug, warn};

use crate::ecobee::types::{RemoteSensor, Thermostat};
use crate::models::{EquipmentFlags, SensorSnapshot, ThermostatSnapshot};

const REMOTE_SENSOR_PREFIX: &str = "rs:";
const INTERNAL_SENSOR_PREFIX: &str = "ei:";

// Running event types that replace the scheduled climate as the active program
const OVERRIDE_EVENTS: [&str; 2] = ["vacation", "hold"];

/// ecobee reports temperatures and setpoints in tenths of a degree
pub fn scale_tenths(raw: f64) -> f64 {
    raw / 10.0
}

/// Display name for a sensor, based on its identifier prefix
///
/// `rs:` is a remote sensor and carries its pairing code, `ei:` is the
/// sensor built into the thermostat.
pub fn sensor_name(sensor: &RemoteSensor) -> String {
    if sensor.id.starts_with(REMOTE_SENSOR_PREFIX) {
        format!(
            "EcobeeSensor: {} ({})",
            sensor.name,
            sensor.code.as_deref().unwrap_or_default()
        )
    } else if sensor.id.starts_with(INTERNAL_SENSOR_PREFIX) {
        format!("EcobeeSensor: {} (Thermostat)", sensor.name)
    } else {
        debug!("Sensor {} has an unrecognised id prefix", sensor.id);
        format!("EcobeeSensor: {}", sensor.name)
    }
}

/// Temperature, occupancy and humidity from one sensor's capability list
///
/// A value that doesn't parse is logged and leaves its field at zero (temperature)
/// or absent (humidity); the remaining capabilities are still read.
pub fn sensor_snapshot(sensor: &RemoteSensor) -> SensorSnapshot {
    let name = sensor_name(sensor);
    let mut temperature = 0.0;
    let mut occupancy = false;
    let mut humidity = None;

    for capability in &sensor.capability {
        match capability.kind.as_str() {
            "temperature" => match capability.value.trim().parse::<f64>() {
                Ok(value) => temperature = scale_tenths(value),
                Err(e) => warn!(
                    "Unable to parse temperature '{}' for {}: {}",
                    capability.value, name, e
                ),
            },
            "occupancy" => {
                if capability.value == "true" {
                    occupancy = true;
                }
            }
            // Humidity is already a percentage
            "humidity" => match capability.value.trim().parse::<f64>() {
                Ok(value) => humidity = Some(value),
                Err(e) => warn!(
                    "Unable to parse humidity '{}' for {}: {}",
                    capability.value, name, e
                ),
            },
            _ => {}
        }
    }

    SensorSnapshot {
        name,
        temperature,
        occupancy,
        humidity,
    }
}

/// Snapshots for every remote sensor plus one for the thermostat itself
///
/// The thermostat's entry is last. It counts as occupied when any of the
/// other sensors is.
pub fn sensor_snapshots(thermostat: &Thermostat) -> Vec<SensorSnapshot> {
    let mut sensors: Vec<SensorSnapshot> =
        thermostat.remote_sensors.iter().map(sensor_snapshot).collect();

    let occupancy = sensors.iter().any(|s| s.occupancy);
    sensors.push(SensorSnapshot {
        name: format!("EcobeeTherm: {}", thermostat.name),
        temperature: scale_tenths(thermostat.runtime.actual_temperature as f64),
        occupancy,
        humidity: None,
    });
    sensors
}

/// Single label for the running equipment, first match in stage order
pub fn equipment_label(flags: &EquipmentFlags) -> &'static str {
    let ordered = [
        (flags.heat1, "Heat1"),
        (flags.heat2, "Heat2"),
        (flags.heat3, "Heat3"),
        (flags.cool1, "Cool1"),
        (flags.cool2, "Cool2"),
        (flags.aux_heat1, "Aux1"),
        (flags.aux_heat2, "Aux2"),
        (flags.aux_heat3, "Aux3"),
        (flags.fan, "Fan"),
    ];
    ordered
        .iter()
        .find(|(active, _)| *active)
        .map(|(_, label)| *label)
        .unwrap_or("Idle")
}

/// The running vacation or hold event if there is one, otherwise the scheduled climate
pub fn active_program(thermostat: &Thermostat) -> String {
    thermostat
        .events
        .iter()
        .filter(|event| event.running)
        .find(|event| OVERRIDE_EVENTS.contains(&event.kind.as_str()))
        .map(|event| {
            debug!("Running {} event '{}' overrides program", event.kind, event.name);
            event.kind.clone()
        })
        .unwrap_or_else(|| thermostat.program.current_climate_ref.clone())
}

pub fn thermostat_snapshot(thermostat: &Thermostat, equipment: &EquipmentFlags) -> ThermostatSnapshot {
    ThermostatSnapshot {
        name: thermostat.name.clone(),
        cooling_setpoint: scale_tenths(thermostat.runtime.desired_cool as f64),
        heating_setpoint: scale_tenths(thermostat.runtime.desired_heat as f64),
        program: active_program(thermostat),
        equipment_status: equipment_label(equipment).to_string(),
        equipment: *equipment,
        idle: equipment.is_idle(),
    }
}

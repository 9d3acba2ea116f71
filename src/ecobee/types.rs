/// ecobee API request and response payloads
use log::debug;
use serde::{Deserialize, Serialize};

use crate::error::EcobeeError;
use crate::models::EquipmentFlags;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ApiStatus {
    #[serde(default)]
    pub code: i64,
    #[serde(default)]
    pub message: String,
}

/// Envelope used to pull just the `status` object out of any response body
#[derive(Debug, Deserialize)]
pub(crate) struct StatusEnvelope {
    pub status: Option<ApiStatus>,
}

#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct Selection {
    pub selection_type: String,
    pub selection_match: String,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub include_equipment_status: bool,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub include_runtime: bool,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub include_program: bool,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub include_events: bool,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub include_sensors: bool,
}

impl Selection {
    pub fn thermostat(thermostat_id: &str) -> Self {
        Selection {
            selection_type: "thermostats".to_string(),
            selection_match: thermostat_id.to_string(),
            ..Default::default()
        }
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct SelectionRequest<'a> {
    pub selection: &'a Selection,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct SummaryResponse {
    #[serde(default)]
    pub revision_list: Vec<String>,
    #[serde(default)]
    pub status_list: Vec<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct ThermostatResponse {
    #[serde(default)]
    pub thermostat_list: Vec<Thermostat>,
}

/// Revision and equipment state of one thermostat from `/1/thermostatSummary`
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ThermostatSummary {
    pub identifier: String,
    pub name: String,
    pub connected: bool,
    pub runtime_revision: String,
    pub equipment: EquipmentFlags,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Thermostat {
    pub identifier: String,
    pub name: String,
    pub runtime: Runtime,
    pub program: Program,
    pub events: Vec<Event>,
    pub remote_sensors: Vec<RemoteSensor>,
}

/// Temperatures are tenths of a degree
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Runtime {
    pub actual_temperature: i64,
    pub desired_heat: i64,
    pub desired_cool: i64,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Program {
    pub current_climate_ref: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Event {
    #[serde(rename = "type")]
    pub kind: String,
    pub name: String,
    pub running: bool,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RemoteSensor {
    pub id: String,
    pub name: String,
    pub code: Option<String>,
    pub capability: Vec<Capability>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Capability {
    #[serde(rename = "type")]
    pub kind: String,
    pub value: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PinResponse {
    #[serde(rename = "ecobeePin")]
    pub ecobee_pin: String,
    pub code: String,
    /// Minutes the PIN stays valid
    #[serde(default)]
    pub expires_in: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct TokenResponse {
    pub access_token: String,
    pub refresh_token: String,
    #[serde(default)]
    pub expires_in: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct OAuthError {
    pub error: String,
    #[serde(default)]
    pub error_description: String,
}

/// Pick the entry for `thermostat_id` out of a summary response
///
/// Revision entries look like `id:name:connected:thermostatRev:alertsRev:runtimeRev:intervalRev`
/// and status entries like `id:heatPump,fan` (empty after the colon when idle).
pub(crate) fn parse_summary(
    response: &SummaryResponse,
    thermostat_id: &str,
) -> Result<ThermostatSummary, EcobeeError> {
    let revision = response
        .revision_list
        .iter()
        .find(|entry| entry.split(':').next() == Some(thermostat_id))
        .ok_or_else(|| EcobeeError::ThermostatNotFound(thermostat_id.to_string()))?;

    let parts: Vec<&str> = revision.split(':').collect();
    if parts.len() != 7 {
        return Err(EcobeeError::MalformedSummary(format!(
            "revision entry has {} fields: {}",
            parts.len(),
            revision
        )));
    }

    let equipment = response
        .status_list
        .iter()
        .find_map(|entry| {
            entry
                .split_once(':')
                .filter(|(id, _)| *id == thermostat_id)
                .map(|(_, running)| parse_equipment(running))
        })
        .unwrap_or_default();

    Ok(ThermostatSummary {
        identifier: parts[0].to_string(),
        name: parts[1].to_string(),
        connected: parts[2] == "true",
        runtime_revision: parts[5].to_string(),
        equipment,
    })
}

/// Parse the comma separated list of running equipment
pub(crate) fn parse_equipment(running: &str) -> EquipmentFlags {
    let mut flags = EquipmentFlags::default();
    for item in running.split(',').map(str::trim).filter(|s| !s.is_empty()) {
        match item {
            "heatPump" => flags.heat1 = true,
            "heatPump2" => flags.heat2 = true,
            "heatPump3" => flags.heat3 = true,
            "compCool1" => flags.cool1 = true,
            "compCool2" => flags.cool2 = true,
            "auxHeat1" => flags.aux_heat1 = true,
            "auxHeat2" => flags.aux_heat2 = true,
            "auxHeat3" => flags.aux_heat3 = true,
            "fan" => flags.fan = true,
            other => debug!("Ignoring equipment status {}", other),
        }
    }
    flags
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn summary_entry_is_split_into_revisions_and_equipment() {
        let response: SummaryResponse = serde_json::from_str(
            r#"{
                "revisionList": [
                    "311111111111:Other:true:1:2:3:4",
                    "522222222222:Hallway:true:240115120000:240115110000:240115120501:240115120000"
                ],
                "thermostatCount": 2,
                "statusList": ["311111111111:fan", "522222222222:heatPump,auxHeat1,fan,humidifier"],
                "status": {"code": 0, "message": ""}
            }"#,
        )
        .unwrap();

        let summary = parse_summary(&response, "522222222222").unwrap();
        assert_eq!(summary.name, "Hallway");
        assert!(summary.connected);
        assert_eq!(summary.runtime_revision, "240115120501");
        assert_eq!(
            summary.equipment,
            EquipmentFlags {
                heat1: true,
                aux_heat1: true,
                fan: true,
                ..Default::default()
            }
        );
    }

    #[test]
    fn empty_status_means_idle() {
        let response = SummaryResponse {
            revision_list: vec!["1:T:false:a:b:c:d".to_string()],
            status_list: vec!["1:".to_string()],
        };
        let summary = parse_summary(&response, "1").unwrap();
        assert!(!summary.connected);
        assert!(summary.equipment.is_idle());
    }

    #[test]
    fn unknown_thermostat_and_bad_entries_are_errors() {
        let response = SummaryResponse {
            revision_list: vec!["1:T:true:a:b".to_string()],
            status_list: vec![],
        };
        assert!(matches!(
            parse_summary(&response, "2"),
            Err(EcobeeError::ThermostatNotFound(_))
        ));
        assert!(matches!(
            parse_summary(&response, "1"),
            Err(EcobeeError::MalformedSummary(_))
        ));
    }

    #[test]
    fn thermostat_payload_deserializes() {
        let response: ThermostatResponse = serde_json::from_str(
            r#"{
                "page": {"page": 1, "totalPages": 1, "pageSize": 1, "total": 1},
                "thermostatList": [{
                    "identifier": "522222222222",
                    "name": "Hallway",
                    "runtime": {"connected": true, "actualTemperature": 705, "actualHumidity": 38,
                                "desiredHeat": 680, "desiredCool": 760},
                    "program": {"currentClimateRef": "home", "climates": []},
                    "events": [{"type": "hold", "name": "auto", "running": true}],
                    "remoteSensors": [
                        {"id": "rs:100", "name": "Bedroom", "type": "ecobee3_remote_sensor", "code": "AB12",
                         "inUse": false,
                         "capability": [{"id": "1", "type": "temperature", "value": "702"},
                                        {"id": "2", "type": "occupancy", "value": "false"}]},
                        {"id": "ei:0", "name": "Hallway", "type": "thermostat", "inUse": true,
                         "capability": [{"id": "1", "type": "temperature", "value": "705"},
                                        {"id": "2", "type": "humidity", "value": "38"},
                                        {"id": "3", "type": "occupancy", "value": "true"}]}
                    ]
                }],
                "status": {"code": 0, "message": ""}
            }"#,
        )
        .unwrap();

        let t = &response.thermostat_list[0];
        assert_eq!(t.runtime.desired_cool, 760);
        assert_eq!(t.program.current_climate_ref, "home");
        assert_eq!(t.events[0].kind, "hold");
        assert_eq!(t.remote_sensors.len(), 2);
        assert_eq!(t.remote_sensors[0].code.as_deref(), Some("AB12"));
        assert!(t.remote_sensors[1].code.is_none());
        assert_eq!(t.remote_sensors[1].capability[1].kind, "humidity");
    }

    #[test]
    fn selection_omits_false_flags() {
        let mut selection = Selection::thermostat("522222222222");
        selection.include_runtime = true;
        let json = serde_json::to_string(&SelectionRequest {
            selection: &selection,
        })
        .unwrap();
        assert_eq!(
            json,
            r#"{"selection":{"selectionType":"thermostats","selectionMatch":"522222222222","includeRuntime":true}}"#
        );
    }
}

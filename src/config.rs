use log::debug;
use std::env;
use std::path::PathBuf;
use std::time::Duration;

const DEFAULT_AUTH_CACHE_FILE: &str = "ecobee-auth.json";
const DEFAULT_POLL_INTERVAL_SECS: u64 = 60;
const DEFAULT_STALE_AFTER_SECS: u64 = 15 * 60;

/// ecobee application credentials, enough for the one-time PIN/token bootstrap
#[derive(Debug, Clone)]
pub struct EcobeeConfig {
    pub app_id: String,
    pub auth_cache_file: PathBuf,
}

impl EcobeeConfig {
    pub fn new() -> Result<Self, Box<dyn std::error::Error>> {
        let app_id = required("ECOBEE_APP_ID")?;
        let auth_cache_file = PathBuf::from(
            optional("ECOBEE_AUTH_CACHE_FILE").unwrap_or_else(|| DEFAULT_AUTH_CACHE_FILE.into()),
        );
        Ok(EcobeeConfig {
            app_id,
            auth_cache_file,
        })
    }
}

/// Measurement names the points are written under
#[derive(Debug, Clone)]
pub struct Measurements {
    pub thermostat: String,
    pub sensor: String,
    pub exporter: String,
}

#[derive(Debug, Clone)]
pub struct ExporterConfig {
    pub ecobee: EcobeeConfig,
    pub thermostat_id: String,
    pub database_url: String,
    pub measurements: Measurements,
    pub poll_interval: Duration,
    pub stale_after: Duration,
}

impl ExporterConfig {
    pub fn new() -> Result<Self, Box<dyn std::error::Error>> {
        let ecobee = EcobeeConfig::new()?;
        let thermostat_id = required("ECOBEE_THERMOSTAT_ID")?;
        let database_url =
            env::var("DATABASE_URL").map_err(|_| "DATABASE_URL environment variable not set")?;

        let measurements = Measurements {
            thermostat: optional("THERMOSTAT_MEASUREMENT")
                .unwrap_or_else(|| "ecobee_thermostat".into()),
            sensor: optional("SENSOR_MEASUREMENT").unwrap_or_else(|| "ecobee_sensor".into()),
            exporter: optional("EXPORTER_MEASUREMENT").unwrap_or_else(|| "ecobeemetrics".into()),
        };

        let poll_interval = Duration::from_secs(parse_secs(
            "POLL_INTERVAL_SECS",
            optional("POLL_INTERVAL_SECS"),
            DEFAULT_POLL_INTERVAL_SECS,
        )?);
        let stale_after = Duration::from_secs(parse_secs(
            "STALE_AFTER_SECS",
            optional("STALE_AFTER_SECS"),
            DEFAULT_STALE_AFTER_SECS,
        )?);

        debug!(
            "Thermostat {}, polling every {:?}, stale after {:?}",
            thermostat_id, poll_interval, stale_after
        );
        debug!(
            "Measurements: thermostat={}, sensor={}, exporter={}",
            measurements.thermostat, measurements.sensor, measurements.exporter
        );

        Ok(ExporterConfig {
            ecobee,
            thermostat_id,
            database_url,
            measurements,
            poll_interval,
            stale_after,
        })
    }
}

/// Load variables from `path`, or from `.env` in the working directory
pub fn load_env_file(path: Option<&PathBuf>) -> Result<(), Box<dyn std::error::Error>> {
    match path {
        Some(path) => {
            dotenv::from_path(path)
                .map_err(|e| format!("Failed to load {}: {}", path.display(), e))?;
        }
        None => {
            dotenv::dotenv().ok();
        }
    }
    Ok(())
}

fn required(key: &str) -> Result<String, String> {
    optional(key).ok_or_else(|| format!("{} environment variable not set", key))
}

fn optional(key: &str) -> Option<String> {
    env::var(key)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

fn parse_secs(key: &str, value: Option<String>, default: u64) -> Result<u64, String> {
    let secs = match value {
        Some(value) => value
            .parse::<u64>()
            .map_err(|e| format!("{} must be a number of seconds: {}", key, e))?,
        None => default,
    };
    if secs == 0 {
        return Err(format!("{} must be greater than zero", key));
    }
    Ok(secs)
}

pub mod auth;
pub mod client;
pub mod types;

pub use client::EcobeeClient;
pub use types::{Thermostat, ThermostatSummary};

use crate::error::EcobeeError;

/// The two reads a poll cycle makes against the thermostat vendor
pub trait ThermostatApi {
    /// Revision tokens and running equipment for one thermostat
    async fn thermostat_summary(&self, thermostat_id: &str)
        -> Result<ThermostatSummary, EcobeeError>;

    /// Runtime, program, events and remote sensors for one thermostat
    async fn thermostat(&self, thermostat_id: &str) -> Result<Thermostat, EcobeeError>;
}

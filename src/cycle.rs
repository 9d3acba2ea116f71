/// One poll of the thermostat: fetch, decide, transform, write
use log::{debug, error, info, warn};
use time::OffsetDateTime;

use crate::config::Measurements;
use crate::database::PointSink;
use crate::ecobee::{Thermostat, ThermostatApi, ThermostatSummary};
use crate::extract::{sensor_snapshots, thermostat_snapshot};
use crate::models::MetricPoint;
use crate::points::{build_point, exporter_point};
use crate::policy::{PollDecision, PollState};
use crate::utils::format_datetime;

/// How a cycle ended, for logging and `--once`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CycleOutcome {
    /// A vendor call failed, only the exporter point was written
    FetchFailed,
    /// Unchanged data past the staleness threshold, device points skipped
    Skipped,
    /// Device and sensor points were written
    Written { points: usize },
    /// The device and sensor batch was rejected by the sink
    WriteFailed,
}

/// The recurring task body together with the state it carries between runs
///
/// Runs are expected to be strictly sequential; `run` takes `&mut self` so
/// two cycles can never touch the state at the same time.
pub struct PollCycle<A, S> {
    api: A,
    sink: S,
    thermostat_id: String,
    measurements: Measurements,
    state: PollState,
}

impl<A: ThermostatApi, S: PointSink> PollCycle<A, S> {
    pub fn new(
        api: A,
        sink: S,
        thermostat_id: &str,
        measurements: Measurements,
        state: PollState,
    ) -> Self {
        PollCycle {
            api,
            sink,
            thermostat_id: thermostat_id.to_string(),
            measurements,
            state,
        }
    }

    pub fn state(&self) -> &PollState {
        &self.state
    }

    pub async fn run(&mut self) -> CycleOutcome {
        self.run_at(OffsetDateTime::now_utc()).await
    }

    pub async fn run_at(&mut self, now: OffsetDateTime) -> CycleOutcome {
        let summary = match self.api.thermostat_summary(&self.thermostat_id).await {
            Ok(summary) => summary,
            Err(e) => {
                error!(
                    "Error retrieving thermostat summary for {}: {}",
                    self.thermostat_id, e
                );
                return self.fetch_failed(now).await;
            }
        };

        let thermostat = match self.api.thermostat(&self.thermostat_id).await {
            Ok(thermostat) => thermostat,
            Err(e) => {
                error!("Error retrieving thermostat {}: {}", self.thermostat_id, e);
                return self.fetch_failed(now).await;
            }
        };

        if !summary.connected {
            warn!("Thermostat {} reports as disconnected", summary.identifier);
        }

        let decision = self.state.observe_revision(&summary.runtime_revision, now);
        self.write_exporter_point(now).await;

        if !decision.should_write() {
            let since = self
                .state
                .last_update()
                .map(|t| format_datetime(&t))
                .unwrap_or_else(|| "never".to_string());
            warn!(
                "Revision {} unchanged since {}, skipping thermostat and sensor points",
                self.state.last_revision().unwrap_or_default(),
                since
            );
            return CycleOutcome::Skipped;
        }

        if decision == PollDecision::Changed {
            info!(
                "--- Got updated data on thermostat {} and {} sensors ---",
                summary.name,
                thermostat.remote_sensors.len()
            );
        } else {
            info!("--- No update ---");
        }

        let points = self.device_points(&summary, &thermostat, now);
        match self.sink.write_points(&points).await {
            Ok(()) => {
                info!("Stored {} thermostat and sensor points", points.len());
                CycleOutcome::Written {
                    points: points.len(),
                }
            }
            Err(e) => {
                error!("Write failed: {}", e);
                CycleOutcome::WriteFailed
            }
        }
    }

    async fn fetch_failed(&mut self, now: OffsetDateTime) -> CycleOutcome {
        self.state.record_failure();
        self.write_exporter_point(now).await;
        CycleOutcome::FetchFailed
    }

    async fn write_exporter_point(&self, now: OffsetDateTime) {
        let point = exporter_point(
            &self.measurements.exporter,
            self.state.failure_total(),
            self.state.last_update(),
            now,
        );
        if let Err(e) = self.sink.write_points(std::slice::from_ref(&point)).await {
            error!("Failed to write exporter metrics: {}", e);
        }
    }

    /// Sensor points first, thermostat last, all stamped with the cycle time
    fn device_points(
        &self,
        summary: &ThermostatSummary,
        thermostat: &Thermostat,
        now: OffsetDateTime,
    ) -> Vec<MetricPoint> {
        let mut points: Vec<MetricPoint> = sensor_snapshots(thermostat)
            .iter()
            .map(|sensor| build_point(sensor, &self.measurements.sensor, now))
            .collect();

        let therm = thermostat_snapshot(thermostat, &summary.equipment);
        debug!(
            "Thermostat {} ({}): cool {:.1}, heat {:.1}, program {}, equipment {}",
            therm.name,
            thermostat.identifier,
            therm.cooling_setpoint,
            therm.heating_setpoint,
            therm.program,
            therm.equipment_status
        );
        points.push(build_point(&therm, &self.measurements.thermostat, now));
        points
    }
}

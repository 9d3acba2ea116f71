mod config;
mod cycle;
mod database;
mod ecobee;
mod error;
mod extract;
mod models;
mod points;
mod policy;
mod utils;

use clap::Parser;
use log::{debug, error, info};
use std::path::PathBuf;
use time::OffsetDateTime;
use tokio::time::{interval, MissedTickBehavior};

use config::{EcobeeConfig, ExporterConfig};
use cycle::{CycleOutcome, PollCycle};
use database::TimescaleSink;
use ecobee::{auth, EcobeeClient};
use policy::PollState;
use utils::format_datetime;

#[derive(Parser, Debug)]
#[command(
    name = "rust-ecobee-etl",
    version,
    about = "Poll an ecobee thermostat and store its readings in TimescaleDB"
)]
struct Args {
    /// Load environment variables from this file instead of ./.env
    #[arg(long)]
    env_file: Option<PathBuf>,
    /// Request an ecobee PIN for authorizing this app, then exit
    #[arg(long, default_value_t = false)]
    get_pin: bool,
    /// Exchange the code of an authorized PIN for tokens, then exit
    #[arg(long, value_name = "CODE")]
    save_token: Option<String>,
    /// Run a single poll cycle and exit
    #[arg(long, default_value_t = false)]
    once: bool,
}

async fn main_loop(config: ExporterConfig, once: bool) -> Result<(), Box<dyn std::error::Error>> {
    info!(
        "Starting ecobee data collection for thermostat {}",
        config.thermostat_id
    );

    let api = EcobeeClient::new(&config.ecobee.app_id, config.ecobee.auth_cache_file.clone())?;
    let sink = TimescaleSink::new(&config.database_url);
    sink.ensure_schema().await?;

    let stale_after = time::Duration::try_from(config.stale_after)?;
    let mut cycle = PollCycle::new(
        api,
        sink,
        &config.thermostat_id,
        config.measurements.clone(),
        PollState::new(stale_after),
    );

    if once {
        match cycle.run().await {
            CycleOutcome::Written { points } => info!("Single cycle wrote {} points", points),
            outcome => info!("Single cycle finished: {:?}", outcome),
        }
        return Ok(());
    }

    // Cycles run inline, so a slow one delays the next tick instead of overlapping it
    let mut ticker = interval(config.poll_interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        ticker.tick().await;
        let started = OffsetDateTime::now_utc();
        let outcome = cycle.run().await;
        debug!(
            "Cycle started at {} finished: {:?} ({} API failures so far)",
            format_datetime(&started),
            outcome,
            cycle.state().failure_total()
        );
    }
}

async fn get_pin(ecobee: &EcobeeConfig) -> Result<(), Box<dyn std::error::Error>> {
    let pin = auth::request_pin(&reqwest::Client::new(), &ecobee.app_id).await?;
    println!("Ecobee PIN: {}", pin.ecobee_pin);
    println!("Ecobee code: {}", pin.code);
    println!(
        "Add the PIN under My Apps in the ecobee portal within {} minutes, then run with --save-token {}",
        pin.expires_in, pin.code
    );
    Ok(())
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    // Initialize logging, RUST_LOG wins over the default level
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp_secs()
        .init();

    config::load_env_file(args.env_file.as_ref())?;

    if args.get_pin {
        let ecobee = EcobeeConfig::new()?;
        return get_pin(&ecobee).await;
    }

    if let Some(code) = args.save_token.as_deref() {
        let ecobee = EcobeeConfig::new()?;
        auth::save_token(&ecobee.app_id, &ecobee.auth_cache_file, code).await?;
        info!(
            "Saved ecobee tokens to {}",
            ecobee.auth_cache_file.display()
        );
        return Ok(());
    }

    // Load configuration
    let config = match ExporterConfig::new() {
        Ok(config) => config,
        Err(e) => {
            error!("Failed to load configuration: {}", e);
            return Err(e);
        }
    };

    // Run main loop or wait for shutdown signal
    tokio::select! {
        result = main_loop(config, args.once) => {
            match result {
                Ok(_) => info!("Program completed successfully"),
                Err(e) => {
                    error!("Fatal error: {}", e);
                    return Err(e);
                }
            }
        }
        _ = tokio::signal::ctrl_c() => {
            info!("Program terminated by user. Exiting gracefully.");
        }
    }

    Ok(())
}

//! Relay bot: process entry point.
//!
//! Startup sequence:
//!   1. Load .env (if present)
//!   2. Load config
//!   3. Init logger at the configured level (`RUST_LOG` wins when set)
//!   4. Build the LLM provider
//!   5. Start the relay worker and the comms channels
//!   6. Run until Ctrl-C or a component fails

use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use relay_bot::error::AppError;
use relay_bot::llm::providers;
use relay_bot::subsystems::runtime::{Component, spawn_components};
use relay_bot::subsystems::{comms, relay};
use relay_bot::{config, logger};

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}

async fn run() -> Result<(), AppError> {
    // Load .env if present; ignore errors (file is optional).
    let _ = dotenvy::dotenv();

    let config = config::load()?;
    logger::init(&config.log_level)?;

    info!(
        bot_name = %config.bot_name,
        log_level = %config.log_level,
        provider = %config.llm.provider,
        "config loaded"
    );

    let provider = providers::build(&config.llm, config.llm_api_key.clone())?;

    let shutdown = CancellationToken::new();
    let ctrl_c = shutdown.clone();
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                info!("ctrl-c received, shutting down");
                ctrl_c.cancel();
            }
            Err(e) => warn!("cannot listen for ctrl-c: {e}"),
        }
    });

    let (relay, worker) = relay::start(&config.relay, provider);
    let workers: Vec<Box<dyn Component>> = vec![Box::new(worker)];
    let relay_handle = spawn_components(workers, shutdown.clone());
    let comms_handle = comms::start(&config, &relay, shutdown.clone());

    // Dropping the last handle closes the queue once channels are gone.
    drop(relay);

    let comms_result = comms_handle.join().await;
    let relay_result = relay_handle.join().await;
    comms_result.and(relay_result)?;

    info!("relay bot stopped");
    Ok(())
}

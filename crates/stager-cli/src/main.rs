//! Staging builder.
//!
//! Runs a docker daemon and the metadata builder as one process group and
//! reports the outcome through the exit status:
//! `0` success, `1` invalid input or failed setup (nothing started), `2` a
//! worker failed.

use std::process::ExitCode;

use tracing::{error, info};
use tracing_subscriber::EnvFilter;

mod cli;
mod config;
mod stage;

use cli::Args;
use config::StagerConfig;
use stage::{stage, ExitStatus};
use stager_supervisor::SignalRelay;

#[tokio::main]
async fn main() -> ExitCode {
    // Logs go to stderr; stdout carries only the status lines.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(true)
        .with_writer(std::io::stderr)
        .init();

    let args = match Args::try_parse_normalized(std::env::args()) {
        Ok(args) => args,
        Err(e) => {
            let _ = e.print();
            return if e.use_stderr() {
                ExitStatus::ConfigError.into()
            } else {
                ExitStatus::Success.into()
            };
        }
    };

    let config = match StagerConfig::from_args(args) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("{e}");
            return ExitStatus::ConfigError.into();
        }
    };

    let relay = match SignalRelay::new() {
        Ok(relay) => relay,
        Err(e) => {
            // No worker has started yet, so this is a setup failure.
            error!(error = %e, "Failed to subscribe to interrupts");
            eprintln!("failed to subscribe to interrupts: {e}");
            return ExitStatus::ConfigError.into();
        }
    };

    info!(
        image = %config.image,
        insecure_registries = %config.insecure_registries,
        output = %config.output_path.display(),
        "Starting staging process"
    );
    println!("Staging process started ...");

    let result = stage(&config, relay).await;
    let status = ExitStatus::from_group_result(&result);

    match result {
        Ok(()) => println!("Staging process finished"),
        Err(e) => eprintln!("Staging process failed: {e}"),
    }

    status.into()
}

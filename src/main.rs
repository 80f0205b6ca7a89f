mod command_line;
mod config;
mod dynamodb;
mod loader;
mod logging;
mod movie;
mod provision;
mod utils;
mod writer;

#[cfg(test)]
mod tests;

use anyhow::Result;
use std::process::ExitCode;
use tracing::error;

use crate::{
    config::Config,
    dynamodb::{DynamoDb, StoreError},
};

#[tokio::main]
async fn main() -> ExitCode {
    dotenv::dotenv().ok();
    if let Err(e) = logging::init_logging() {
        eprintln!("Failed to initialise logging: {e}");
        return ExitCode::FAILURE;
    }

    match run().await {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(e) => {
            report(&e);
            ExitCode::FAILURE
        }
    }
}

async fn run() -> Result<bool> {
    let Some(command) = command_line::parse_args(std::env::args().skip(1))? else {
        println!("{}", command_line::USAGE);
        return Ok(true);
    };
    let config = Config::from_env()?;

    let sdk_config = config.load_sdk_config().await;
    let ddb = DynamoDb::new(&sdk_config);
    ddb.check_auth().await?;

    let outcome = command_line::run(command, &ddb, &config).await?;
    Ok(outcome.is_success())
}

/// Logs a fatal error, with the diagnostic fields of a store failure if there is one.
fn report(err: &anyhow::Error) {
    match err.chain().find_map(|cause| cause.downcast_ref::<StoreError>()) {
        Some(StoreError::Service {
            message,
            status_code,
            code,
            error_type,
            request_id,
        }) => {
            error!("{err}");
            error!("Request reached DynamoDB but was rejected");
            error!("Error Message:    {message}");
            error!("HTTP Status Code: {status_code}");
            error!("AWS Error Code:   {code}");
            error!("Error Type:       {error_type}");
            error!(
                "Request ID:       {}",
                request_id.as_deref().unwrap_or("unknown")
            );
        }
        Some(StoreError::Client { message }) => {
            error!("{err}");
            error!("Could not communicate with DynamoDB");
            error!("Error Message: {message}");
        }
        _ => error!("{err:#}"),
    }
}

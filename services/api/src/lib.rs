mod cli;
mod demo;
mod evaluate;
mod infra;
mod routes;
mod server;

use grc_automation::error::AppError;

pub async fn run() -> Result<(), AppError> {
    cli::run().await
}

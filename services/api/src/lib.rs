mod analyze;
mod cli;
mod infra;
mod routes;
mod server;

use vf_detector::error::AppError;

pub async fn run() -> Result<(), AppError> {
    cli::run().await
}

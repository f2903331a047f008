pub(crate) mod cli;
pub(crate) mod core;
pub(crate) mod schemas;
pub(crate) mod services;
pub(crate) mod session;
pub(crate) mod tasks;

#[cfg(test)]
mod test_support;

use clap::Parser;

use crate::core::{config::Settings, telemetry};

pub async fn run() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let args = cli::Args::parse();
    let settings = Settings::load()?;
    telemetry::init_tracing(&settings)?;
    crate::core::metrics::init(&settings)?;

    tracing::info!(
        exam_id = %args.exam_id,
        api = %settings.api().base_url,
        environment = %settings.runtime().environment.as_str(),
        "Exam player starting"
    );

    let result = cli::run(args, settings).await;
    crate::core::metrics::flush();
    result
}

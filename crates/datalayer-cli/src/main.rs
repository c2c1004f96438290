//! `datalayer` command line client

mod cli;
mod commands;
mod logging;
mod settings;

use std::{process::ExitCode, sync::Arc};

use anyhow::{Context as _, Result};
use clap::Parser;
use datalayer_sdk::{DatalayerClient, FileUploadStore};
use tracing::debug;

use crate::{
    cli::Cli,
    commands::{Context, Output},
    settings::{Overrides, Settings},
};

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    logging::init(cli.verbose);

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<()> {
    let settings_dir = settings::settings_dir()?;
    let settings = Settings::load(
        &settings_dir,
        &Overrides {
            run_url: cli.run_url.as_deref(),
            token: cli.token.as_deref(),
        },
    )?;
    debug!("Using run URL {}", settings.run_url);

    let client = DatalayerClient::new(settings.client_config())
        .await
        .context("Failed to create client")?
        .with_upload_store(Arc::new(FileUploadStore::new(settings::uploads_file(
            &settings_dir,
        ))));

    let ctx = Context {
        client,
        output: Output::new(cli.json),
        settings_dir,
    };
    commands::dispatch(&ctx, cli.command).await
}

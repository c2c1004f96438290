//! Command handlers

mod iam;
mod runtimes;
mod snapshots;
mod spacer;

use std::path::PathBuf;

use anyhow::Result;
use chrono::{DateTime, Duration, Utc};
use datalayer_sdk::DatalayerClient;
use serde::Serialize;
use serde_json::json;

use crate::cli::Command;

/// Everything a command handler needs
pub struct Context {
    pub client: DatalayerClient,
    pub output: Output,
    /// Directory holding stored credentials and upload state
    pub settings_dir: PathBuf,
}

/// Prints results either as JSON or as plain text
pub struct Output {
    json: bool,
}

impl Output {
    pub fn new(json: bool) -> Self {
        Self { json }
    }

    pub fn show<T: Serialize + ?Sized>(&self, value: &T, human: impl FnOnce(&T)) -> Result<()> {
        if self.json {
            println!("{}", serde_json::to_string_pretty(value)?);
        } else {
            human(value);
        }
        Ok(())
    }

    /// Report a completed action that has no result value
    pub fn done(&self, message: &str) -> Result<()> {
        self.show(&json!({"success": true, "message": message}), |_| {
            println!("{}", message)
        })
    }
}

pub async fn dispatch(ctx: &Context, command: Command) -> Result<()> {
    match command {
        Command::Login(args) => iam::login(ctx, args).await,
        Command::Logout => iam::logout(ctx).await,
        Command::Whoami => iam::whoami(ctx).await,
        Command::Credits => iam::credits(ctx).await,
        Command::Tokens(command) => iam::tokens(ctx, command).await,
        Command::Envs => runtimes::environments(ctx).await,
        Command::Runtimes(command) => runtimes::runtimes(ctx, command).await,
        Command::Snapshots(command) => snapshots::snapshots(ctx, command).await,
        Command::Spaces(command) => spacer::spaces(ctx, command).await,
        Command::Notebooks(command) => spacer::notebooks(ctx, command).await,
        Command::Documents(command) => spacer::documents(ctx, command).await,
        Command::Items(command) => spacer::items(ctx, command).await,
    }
}

pub(crate) fn format_time(time: Option<DateTime<Utc>>) -> String {
    time.map(|t| t.format("%Y-%m-%d %H:%M:%S").to_string())
        .unwrap_or_else(|| "-".to_string())
}

pub(crate) fn format_duration(duration: Option<Duration>) -> String {
    match duration {
        Some(d) => {
            let minutes = d.num_minutes();
            if minutes >= 60 {
                format!("{}h{:02}m", minutes / 60, minutes % 60)
            } else {
                format!("{}m{:02}s", minutes, d.num_seconds() % 60)
            }
        }
        None => "-".to_string(),
    }
}

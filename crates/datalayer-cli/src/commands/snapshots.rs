use std::{io::Write, path::PathBuf, sync::Arc};

use anyhow::{Context as _, Result};
use datalayer_sdk::{ProgressCallback, model::UploadSnapshot};

use super::{Context, format_time};
use crate::cli::SnapshotsCommand;

pub async fn snapshots(ctx: &Context, command: SnapshotsCommand) -> Result<()> {
    match command {
        SnapshotsCommand::List => {
            let snapshots = ctx.client.list_snapshots().await?;
            ctx.output.show(&snapshots, |snapshots| {
                for snapshot in snapshots {
                    println!(
                        "{:<28} {:<24} {:<10} {}",
                        snapshot.uid,
                        snapshot.name,
                        snapshot.status,
                        format_time(snapshot.updated_at())
                    );
                }
            })
        }
        SnapshotsCommand::Get { uid } => {
            let snapshot = ctx.client.get_snapshot(&uid).await?;
            ctx.output.show(&snapshot, |snapshot| {
                println!("uid:         {}", snapshot.uid);
                println!("name:        {}", snapshot.name);
                println!("environment: {}", snapshot.environment);
                println!("format:      {}", snapshot.format);
                println!("status:      {}", snapshot.status);
                println!("updated:     {}", format_time(snapshot.updated_at()));
            })
        }
        SnapshotsCommand::Create {
            pod_name,
            name,
            description,
            stop,
        } => {
            let snapshot = ctx
                .client
                .create_snapshot(&pod_name, &name, &description, stop)
                .await
                .context("Failed to create snapshot")?;
            ctx.output.show(&snapshot, |snapshot| {
                println!("Created snapshot {} ({})", snapshot.name, snapshot.uid)
            })
        }
        SnapshotsCommand::Delete { uid } => {
            ctx.client
                .delete_snapshot(&uid)
                .await
                .with_context(|| format!("Failed to delete snapshot {}", uid))?;
            ctx.output.done(&format!("Deleted snapshot {}", uid))
        }
        SnapshotsCommand::Download { uid, dest } => {
            let dest = dest.unwrap_or_else(|| PathBuf::from(format!("{}.tar.gz", uid)));
            let written = ctx
                .client
                .download_snapshot(&uid, &dest)
                .await
                .with_context(|| format!("Failed to download snapshot {}", uid))?;
            ctx.output.done(&format!(
                "Downloaded {} bytes to {}",
                written,
                dest.display()
            ))
        }
        SnapshotsCommand::Upload {
            path,
            name,
            environment,
            description,
            format,
        } => {
            let mut upload = UploadSnapshot::new(&name, &environment).with_description(&description);
            if let Some(format) = &format {
                upload = upload.with_format(format);
            }

            let url = ctx
                .client
                .upload_snapshot(&path, &upload, Some(progress_bar()))
                .await
                .with_context(|| format!("Failed to upload {}", path.display()))?;
            eprintln!();
            ctx.output.done(&format!("Uploaded {} to {}", path.display(), url))
        }
    }
}

fn progress_bar() -> ProgressCallback {
    Arc::new(|sent, total| {
        let percent = if total == 0 {
            100.0
        } else {
            sent as f64 * 100.0 / total as f64
        };
        let mut stderr = std::io::stderr();
        let _ = write!(stderr, "\r{:>5.1}% ({} / {} bytes)", percent, sent, total);
        let _ = stderr.flush();
    })
}

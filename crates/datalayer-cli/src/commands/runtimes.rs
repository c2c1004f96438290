use anyhow::{Context as _, Result};
use chrono::Utc;
use datalayer_sdk::model::CreateRuntime;

use super::{Context, format_duration, format_time};
use crate::cli::RuntimesCommand;

pub async fn environments(ctx: &Context) -> Result<()> {
    let environments = ctx
        .client
        .list_environments()
        .await
        .context("Failed to list environments")?;
    ctx.output.show(environments.as_slice(), |environments| {
        for env in environments {
            println!(
                "{:<28} {:<32} {:>10.4} credits/s{}",
                env.name,
                env.display_title(),
                env.burning_rate,
                if env.resources.has_gpu() { "  gpu" } else { "" }
            );
        }
    })
}

pub async fn runtimes(ctx: &Context, command: RuntimesCommand) -> Result<()> {
    match command {
        RuntimesCommand::List => {
            let runtimes = ctx.client.list_runtimes().await?;
            let now = Utc::now();
            ctx.output.show(&runtimes, |runtimes| {
                for runtime in runtimes {
                    println!(
                        "{:<36} {:<24} {:<8} {:>8} left  {:>8.2} credits",
                        runtime.pod_name,
                        runtime.environment_name,
                        runtime.runtime_type.as_str(),
                        format_duration(runtime.remaining(now)),
                        runtime.credits_consumed(now)
                    );
                }
            })
        }
        RuntimesCommand::Get { pod_name } => {
            let runtime = ctx.client.get_runtime(&pod_name).await?;
            let now = Utc::now();
            ctx.output.show(&runtime, |runtime| {
                println!("pod:         {}", runtime.pod_name);
                println!("environment: {}", runtime.environment_name);
                println!("type:        {}", runtime.runtime_type);
                println!("started:     {}", format_time(runtime.started_at()));
                println!("expires:     {}", format_time(runtime.expires_at()));
                println!("remaining:   {}", format_duration(runtime.remaining(now)));
                println!("consumed:    {:.2} credits", runtime.credits_consumed(now));
                if let Some(url) = runtime.jupyter_server_url() {
                    println!("jupyter:     {}", url);
                }
            })
        }
        RuntimesCommand::Create {
            environment,
            credits_limit,
            runtime_type,
            name,
            from,
        } => {
            let mut request = CreateRuntime::new(&environment, credits_limit).with_type(runtime_type);
            if let Some(name) = &name {
                request = request.with_given_name(name);
            }
            if let Some(from) = &from {
                request = request.from_snapshot(from);
            }

            let runtime = ctx
                .client
                .create_runtime(&request)
                .await
                .context("Failed to create runtime")?;
            ctx.output.show(&runtime, |runtime| {
                println!("Created runtime {}", runtime.pod_name);
                if let Some(url) = runtime.jupyter_server_url() {
                    println!("jupyter: {}", url);
                }
            })
        }
        RuntimesCommand::Delete { pod_name } => {
            ctx.client.delete_runtime(&pod_name).await?;
            ctx.output.done(&format!("Deleted runtime {}", pod_name))
        }
        RuntimesCommand::Restore {
            pod_name,
            snapshot_uid,
        } => {
            ctx.client
                .restore_runtime(&pod_name, &snapshot_uid)
                .await
                .context("Failed to restore snapshot")?;
            ctx.output.done(&format!(
                "Restored snapshot {} into runtime {}",
                snapshot_uid, pod_name
            ))
        }
    }
}

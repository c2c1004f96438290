use anyhow::{Context as _, Result, bail};
use chrono::{DateTime, TimeDelta, Utc};
use datalayer_sdk::Service;

use super::{Context, format_time};
use crate::{
    cli::{LoginArgs, TokensCommand},
    settings::{self, Credentials},
};

pub async fn login(ctx: &Context, args: LoginArgs) -> Result<()> {
    let response = match args.with_token {
        Some(token) => ctx
            .client
            .login_with_token(&token)
            .await
            .context("Token was rejected")?,
        None => {
            let (Some(handle), Some(password)) = (args.handle, args.password) else {
                bail!("--handle and --password (or DATALAYER_HANDLE and DATALAYER_PASSWORD) are required");
            };
            ctx.client
                .login(&handle, &password)
                .await
                .context("Login failed")?
        }
    };

    settings::save_credentials(
        &ctx.settings_dir,
        &Credentials {
            run_url: ctx.client.run_url(),
            token: response.token.clone(),
        },
    )?;

    let who = response
        .user
        .as_ref()
        .map(|user| user.display_name())
        .unwrap_or_else(|| "token".to_string());
    ctx.output
        .done(&format!("Logged in to {} as {}", ctx.client.run_url(), who))
}

pub async fn logout(ctx: &Context) -> Result<()> {
    if ctx.client.token().is_some() {
        // The stored token is forgotten even when the platform is unreachable
        if let Err(e) = ctx.client.logout().await {
            tracing::warn!("Logout request failed: {}", e);
        }
    }
    let removed = settings::remove_credentials(&ctx.settings_dir)?;
    ctx.output.done(if removed {
        "Logged out"
    } else {
        "No stored login"
    })
}

pub async fn whoami(ctx: &Context) -> Result<()> {
    let user = ctx.client.whoami().await.context("Failed to fetch profile")?;
    let iam_url = ctx.client.service_url(Service::Iam);
    ctx.output.show(&user, |user| {
        println!("{} (@{})", user.display_name(), user.handle);
        if !user.email.is_empty() {
            println!("email:  {}", user.email);
        }
        if !user.roles.is_empty() {
            println!("roles:  {}", user.roles.join(", "));
        }
        println!("server: {}", iam_url);
    })
}

pub async fn credits(ctx: &Context) -> Result<()> {
    let info = ctx.client.credits().await.context("Failed to fetch credits")?;
    ctx.output.show(&info, |info| {
        println!("credits:   {:.2}", info.credits.credits);
        if let Some(quota) = info.credits.quota {
            println!("quota:     {:.2}", quota);
        }
        println!("reserved:  {:.2}", info.reserved());
        println!("available: {:.2}", info.available());
    })
}

pub async fn tokens(ctx: &Context, command: TokensCommand) -> Result<()> {
    match command {
        TokensCommand::List => {
            let tokens = ctx.client.list_tokens().await?;
            ctx.output.show(&tokens, |tokens| {
                for token in tokens {
                    println!(
                        "{:<28} {:<24} expires {}",
                        token.uid,
                        token.name,
                        format_time(token.expiration_date)
                    );
                }
            })
        }
        TokensCommand::Create {
            name,
            description,
            days,
        } => {
            let expiration = token_expiration(Utc::now(), days)?;
            let token = ctx
                .client
                .create_token(&name, &description, expiration)
                .await
                .context("Failed to create token")?;
            ctx.output.show(&token, |token| {
                println!("Created token {} ({})", token.name, token.uid);
                if let Some(value) = &token.value {
                    println!("{}", value);
                }
            })
        }
        TokensCommand::Delete { uid } => {
            ctx.client.delete_token(&uid).await?;
            ctx.output.done(&format!("Deleted token {}", uid))
        }
    }
}

/// Expiration instant `days` days after `now`
fn token_expiration(now: DateTime<Utc>, days: i64) -> Result<DateTime<Utc>> {
    if days <= 0 {
        bail!("--days must be positive");
    }
    match TimeDelta::try_days(days).and_then(|delta| now.checked_add_signed(delta)) {
        Some(expiration) => Ok(expiration),
        None => bail!("--days {} is out of range", days),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_token_expiration() {
        let now = DateTime::from_timestamp(1_700_000_000, 0).unwrap();
        let expiration = token_expiration(now, 30).unwrap();
        assert_eq!(expiration.timestamp(), 1_700_000_000 + 30 * 86_400);
    }

    #[test]
    fn test_token_expiration_rejects_non_positive_days() {
        let now = Utc::now();
        assert!(token_expiration(now, 0).is_err());
        assert!(token_expiration(now, -3).is_err());
    }

    #[test]
    fn test_token_expiration_out_of_range() {
        let now = Utc::now();
        let err = token_expiration(now, i64::MAX).unwrap_err();
        assert!(err.to_string().contains("out of range"));

        let err = token_expiration(now, 100_000_000).unwrap_err();
        assert!(err.to_string().contains("out of range"));
    }
}

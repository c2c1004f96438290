use chrono::{DateTime, Utc};
use datalayer_common::{require_non_empty, require_path_segment};
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, info};

use super::DatalayerClient;
use crate::{
    Result,
    constants::{TOKEN_VARIANT_USER, api_path},
    model::{
        ApiToken, CreditsInfo, LoginResponse, UpdateMe, User,
        common::{check_success, into_body, into_field, into_list},
        iam::CreateToken,
    },
};

impl DatalayerClient {
    // ============================================================================
    // Authentication APIs
    // ============================================================================

    /// Log in with a handle and password; the returned token is used for
    /// subsequent requests.
    pub async fn login(&self, handle: &str, password: &str) -> Result<LoginResponse> {
        require_non_empty("handle", handle)?;
        require_non_empty("password", password)?;

        #[derive(Serialize)]
        struct Body<'a> {
            handle: &'a str,
            password: &'a str,
        }

        let body: Value = self
            .http
            .post_json_public(api_path::IAM_LOGIN, &Body { handle, password })
            .await?;
        let response: LoginResponse = into_body(body)?;
        require_non_empty("token", &response.token)?;

        self.http.set_token(response.token.clone());
        self.invalidate_environments();
        info!("Logged in as {}", handle);
        Ok(response)
    }

    /// Check an existing token with the platform and use it for subsequent
    /// requests.
    pub async fn login_with_token(&self, token: &str) -> Result<LoginResponse> {
        require_non_empty("token", token)?;

        #[derive(Serialize)]
        struct Body<'a> {
            token: &'a str,
        }

        let body: Value = self
            .http
            .post_json_public(api_path::IAM_LOGIN, &Body { token })
            .await?;
        let mut response: LoginResponse = into_body(body)?;
        if response.token.is_empty() {
            response.token = token.to_string();
        }

        self.http.set_token(response.token.clone());
        self.invalidate_environments();
        debug!("Token accepted");
        Ok(response)
    }

    /// Log out and forget the token
    pub async fn logout(&self) -> Result<()> {
        let result = self
            .http
            .get::<Value>(api_path::IAM_LOGOUT)
            .await
            .and_then(check_success);
        self.http.clear_token();
        self.invalidate_environments();
        result.map(|_| ())
    }

    pub async fn whoami(&self) -> Result<User> {
        let body: Value = self.http.get(api_path::IAM_WHOAMI).await?;
        into_field(body, "profile")
    }

    pub async fn me(&self) -> Result<User> {
        let body: Value = self.http.get(api_path::IAM_ME).await?;
        into_field(body, "me")
    }

    /// Update profile fields of the current user
    pub async fn update_me(&self, update: &UpdateMe) -> Result<User> {
        if update.is_empty() {
            return Err(datalayer_common::ArgumentError::Missing("update").into());
        }
        let body: Value = self.http.put_json(api_path::IAM_ME, update).await?;
        into_field(body, "me")
    }

    // ============================================================================
    // Usage APIs
    // ============================================================================

    pub async fn credits(&self) -> Result<CreditsInfo> {
        let body: Value = self.http.get(api_path::IAM_CREDITS).await?;
        into_body(body)
    }

    // ============================================================================
    // Token APIs
    // ============================================================================

    pub async fn list_tokens(&self) -> Result<Vec<ApiToken>> {
        let body: Value = self.http.get(api_path::IAM_TOKENS).await?;
        into_list(body, "tokens")
    }

    /// Create an API token expiring at `expiration`. The secret is only
    /// available in the returned [`ApiToken::value`].
    pub async fn create_token(
        &self,
        name: &str,
        description: &str,
        expiration: DateTime<Utc>,
    ) -> Result<ApiToken> {
        require_non_empty("name", name)?;

        let body: Value = self
            .http
            .post_json(
                api_path::IAM_TOKENS,
                &CreateToken {
                    name,
                    description,
                    variant: TOKEN_VARIANT_USER,
                    expiration_date: expiration.timestamp(),
                },
            )
            .await?;

        let body = check_success(body)?;
        let secret = body.get("value").and_then(Value::as_str).map(String::from);
        let mut token: ApiToken = into_field(body, "token")?;
        // The secret may come back next to the token record
        if token.value.is_none() {
            token.value = secret;
        }
        info!("Created API token {}", token.uid);
        Ok(token)
    }

    pub async fn get_token(&self, uid: &str) -> Result<ApiToken> {
        require_path_segment("uid", uid)?;
        let body: Value = self
            .http
            .get(&format!("{}/{}", api_path::IAM_TOKENS, uid))
            .await?;
        into_field(body, "token")
    }

    pub async fn delete_token(&self, uid: &str) -> Result<()> {
        require_path_segment("uid", uid)?;
        let body: Value = self
            .http
            .delete(&format!("{}/{}", api_path::IAM_TOKENS, uid))
            .await?;
        check_success(body)?;
        info!("Deleted API token {}", uid);
        Ok(())
    }
}

//! HTTP client with bearer authentication, re-login, and failover
//!
//! This module provides the transport every Datalayer API call goes through.
//! Requests carry `Authorization: Bearer <token>`; when credentials are
//! configured an expired or rejected token triggers a single login before the
//! request is retried, and transport failures move on to the next run URL.

use std::{
    path::{Path, PathBuf},
    sync::RwLock,
    time::Duration,
};

use chrono::Utc;
use datalayer_common::{ArgumentError, DEFAULT_RUN_URL, TokenClaims, join_url};
use futures::StreamExt;
use reqwest::{Client, RequestBuilder, Response, StatusCode, multipart::Form};
use serde::{Serialize, de::DeserializeOwned};
use tokio::io::AsyncWriteExt;
use tracing::{debug, error, warn};

use crate::error::{ClientError, Result};

/// Login endpoint of the IAM service
pub const DEFAULT_LOGIN_ENDPOINT: &str = "/api/iam/v1/login";

/// Tokens expiring within this many seconds are refreshed before use
const TOKEN_EXPIRY_MARGIN_SECS: i64 = 60;

/// Configuration for the HTTP client
#[derive(Clone, Debug)]
pub struct HttpClientConfig {
    /// Run URLs of the Datalayer deployment, tried in order on failure
    pub run_urls: Vec<String>,
    /// Pre-issued API token
    pub token: Option<String>,
    /// Handle for login (used when no valid token is available)
    pub handle: String,
    /// Password for login
    pub password: String,
    /// Connection timeout in milliseconds
    pub connect_timeout_ms: u64,
    /// Read timeout in milliseconds
    pub read_timeout_ms: u64,
    /// Login endpoint path
    pub login_endpoint: String,
    /// User-Agent header value
    pub user_agent: String,
}

impl Default for HttpClientConfig {
    fn default() -> Self {
        Self {
            run_urls: vec![DEFAULT_RUN_URL.to_string()],
            token: None,
            handle: String::new(),
            password: String::new(),
            connect_timeout_ms: 5000,
            read_timeout_ms: 30000,
            login_endpoint: DEFAULT_LOGIN_ENDPOINT.to_string(),
            user_agent: concat!("datalayer-rs/", env!("CARGO_PKG_VERSION")).to_string(),
        }
    }
}

impl HttpClientConfig {
    /// Create a new config with a single run URL
    pub fn new(run_url: &str) -> Self {
        Self {
            run_urls: vec![run_url.to_string()],
            ..Default::default()
        }
    }

    /// Create a config with multiple run URLs
    pub fn with_run_urls(run_urls: Vec<String>) -> Self {
        Self {
            run_urls,
            ..Default::default()
        }
    }

    /// Set the API token
    pub fn with_token(mut self, token: &str) -> Self {
        self.token = Some(token.to_string());
        self
    }

    /// Set login credentials
    pub fn with_credentials(mut self, handle: &str, password: &str) -> Self {
        self.handle = handle.to_string();
        self.password = password.to_string();
        self
    }

    /// Set timeouts
    pub fn with_timeouts(mut self, connect_ms: u64, read_ms: u64) -> Self {
        self.connect_timeout_ms = connect_ms;
        self.read_timeout_ms = read_ms;
        self
    }

    /// Set login endpoint path
    pub fn with_login_endpoint(mut self, endpoint: &str) -> Self {
        self.login_endpoint = endpoint.to_string();
        self
    }

    /// Set the User-Agent header
    pub fn with_user_agent(mut self, user_agent: &str) -> Self {
        self.user_agent = user_agent.to_string();
        self
    }

    pub fn has_credentials(&self) -> bool {
        !self.handle.is_empty() && !self.password.is_empty()
    }
}

/// Token info for authentication
#[derive(Clone, Debug)]
struct TokenInfo {
    access_token: String,
    claims: Option<TokenClaims>,
}

impl TokenInfo {
    fn new(access_token: String) -> Self {
        let claims = TokenClaims::decode(&access_token);
        Self {
            access_token,
            claims,
        }
    }

    fn is_usable(&self) -> bool {
        self.claims
            .as_ref()
            .map(|c| !c.is_expired_at(Utc::now(), TOKEN_EXPIRY_MARGIN_SECS))
            .unwrap_or(true)
    }
}

#[derive(Serialize)]
struct LoginRequest<'a> {
    handle: &'a str,
    password: &'a str,
}

/// HTTP client with authentication and failover support
pub struct DatalayerHttpClient {
    client: Client,
    config: HttpClientConfig,
    current_server_index: RwLock<usize>,
    token: RwLock<Option<TokenInfo>>,
}

impl DatalayerHttpClient {
    /// Create a new HTTP client, logging in up front when credentials are
    /// configured and no usable token was given.
    pub async fn new(config: HttpClientConfig) -> Result<Self> {
        let instance = Self::new_without_login(config)?;

        // A failed initial login is not fatal: ensure_token() retries on demand.
        if instance.token().is_none() && instance.config.has_credentials() {
            if let Err(e) = instance.authenticate().await {
                warn!("Initial login failed (will retry on demand): {}", e);
            }
        }

        Ok(instance)
    }

    /// Create a client without an initial login
    pub fn new_without_login(config: HttpClientConfig) -> Result<Self> {
        if config.run_urls.is_empty() {
            return Err(ArgumentError::Missing("run_urls").into());
        }

        let client = Client::builder()
            .connect_timeout(Duration::from_millis(config.connect_timeout_ms))
            .timeout(Duration::from_millis(config.read_timeout_ms))
            .user_agent(config.user_agent.clone())
            .build()?;

        let initial_token = config
            .token
            .as_deref()
            .filter(|t| !t.trim().is_empty())
            .map(|t| TokenInfo::new(t.to_string()));

        Ok(Self {
            client,
            config,
            current_server_index: RwLock::new(0),
            token: RwLock::new(initial_token),
        })
    }

    pub fn config(&self) -> &HttpClientConfig {
        &self.config
    }

    /// Get the current run URL
    pub fn current_server(&self) -> String {
        let index = *self
            .current_server_index
            .read()
            .unwrap_or_else(|e| e.into_inner());
        self.config.run_urls[index].clone()
    }

    /// Switch to the next run URL (for failover)
    fn switch_to_next_server(&self) {
        let mut index = self
            .current_server_index
            .write()
            .unwrap_or_else(|e| e.into_inner());
        *index = (*index + 1) % self.config.run_urls.len();
        debug!("Switched to run URL index: {}", *index);
    }

    /// Build a full URL for `path`; absolute URLs are returned unchanged
    pub fn build_url(&self, path: &str) -> String {
        if path.starts_with("http://") || path.starts_with("https://") {
            path.to_string()
        } else {
            join_url(&self.current_server(), path)
        }
    }

    /// The current token, unless it is missing or about to expire
    pub fn token(&self) -> Option<String> {
        let token_guard = self.token.read().unwrap_or_else(|e| e.into_inner());
        token_guard
            .as_ref()
            .filter(|t| t.is_usable())
            .map(|t| t.access_token.clone())
    }

    /// Replace the stored token
    pub fn set_token(&self, access_token: String) {
        let mut token_guard = self.token.write().unwrap_or_else(|e| e.into_inner());
        *token_guard = Some(TokenInfo::new(access_token));
    }

    pub fn clear_token(&self) {
        let mut token_guard = self.token.write().unwrap_or_else(|e| e.into_inner());
        *token_guard = None;
    }

    /// Log in with the configured handle and password
    pub async fn authenticate(&self) -> Result<()> {
        if !self.config.has_credentials() {
            return Err(ClientError::NotAuthenticated);
        }

        let url = self.build_url(&self.config.login_endpoint);
        debug!("Logging in to: {}", url);

        let response = self
            .client
            .post(&url)
            .json(&LoginRequest {
                handle: &self.config.handle,
                password: &self.config.password,
            })
            .send()
            .await?;

        let status = response.status();
        let body: serde_json::Value = response.json().await.unwrap_or_default();
        let success = body
            .get("success")
            .and_then(|v| v.as_bool())
            .unwrap_or(true);

        if status.is_success() && success {
            if let Some(token) = body.get("token").and_then(|v| v.as_str()) {
                self.set_token(token.to_string());
                debug!("Login successful for handle {}", self.config.handle);
                return Ok(());
            }
        }

        let message = body
            .get("message")
            .and_then(|v| v.as_str())
            .unwrap_or("Authentication failed");
        Err(ClientError::AuthFailed(message.to_string()))
    }

    /// Ensure we have a valid token, logging in if needed
    async fn ensure_token(&self) -> Result<String> {
        if let Some(token) = self.token() {
            return Ok(token);
        }

        if !self.config.has_credentials() {
            return Err(ClientError::NotAuthenticated);
        }

        self.authenticate().await?;

        self.token()
            .ok_or_else(|| ClientError::AuthFailed("no token after login".to_string()))
    }

    /// Make a GET request
    pub async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        let response = self
            .request_with_retry(path, true, |client, url| client.get(url))
            .await?;
        handle_response(response).await
    }

    /// Make a POST request with JSON body
    pub async fn post_json<T: DeserializeOwned, B: Serialize + ?Sized>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T> {
        let response = self
            .request_with_retry(path, true, |client, url| client.post(url).json(body))
            .await?;
        handle_response(response).await
    }

    /// Make an unauthenticated POST request with JSON body (login)
    pub async fn post_json_public<T: DeserializeOwned, B: Serialize + ?Sized>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T> {
        let response = self
            .request_with_retry(path, false, |client, url| client.post(url).json(body))
            .await?;
        handle_response(response).await
    }

    /// Make a PUT request with JSON body
    pub async fn put_json<T: DeserializeOwned, B: Serialize + ?Sized>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T> {
        let response = self
            .request_with_retry(path, true, |client, url| client.put(url).json(body))
            .await?;
        handle_response(response).await
    }

    /// Make a DELETE request
    pub async fn delete<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        let response = self
            .request_with_retry(path, true, |client, url| client.delete(url))
            .await?;
        handle_response(response).await
    }

    /// Make a POST request with multipart form data.
    ///
    /// `make_form` is called once per attempt since a `Form` cannot be cloned.
    pub async fn post_multipart<T, F>(&self, path: &str, make_form: F) -> Result<T>
    where
        T: DeserializeOwned,
        F: Fn() -> Form,
    {
        let response = self
            .request_with_retry(path, true, |client, url| {
                client.post(url).multipart(make_form())
            })
            .await?;
        handle_response(response).await
    }

    /// Stream a GET response body into `dest`, returning the number of bytes written.
    ///
    /// The body is written to `<dest>.part` and renamed once complete, so a
    /// failed transfer never leaves a truncated file at `dest`.
    pub async fn download(&self, path: &str, dest: &Path) -> Result<u64> {
        let response = self
            .request_with_retry(path, true, |client, url| client.get(url))
            .await?;
        if !response.status().is_success() {
            return Err(status_error(response).await);
        }

        let partial = partial_path(dest)?;
        let result = async {
            let written = write_body(response, &partial).await?;
            tokio::fs::rename(&partial, dest).await?;
            Ok::<_, ClientError>(written)
        }
        .await;
        let written = match result {
            Ok(written) => written,
            Err(e) => {
                if let Err(remove_err) = tokio::fs::remove_file(&partial).await {
                    warn!(
                        "Failed to remove partial download {}: {}",
                        partial.display(),
                        remove_err
                    );
                }
                return Err(e);
            }
        };

        debug!("Downloaded {} bytes to {}", written, dest.display());
        Ok(written)
    }

    /// Send an authenticated request built by `build` and return the raw
    /// response without interpreting its status.
    pub async fn execute<F>(&self, path: &str, build: F) -> Result<Response>
    where
        F: Fn(&Client, &str) -> RequestBuilder,
    {
        self.request_with_retry(path, true, build).await
    }

    /// Generic request with re-login and failover
    async fn request_with_retry<F>(&self, path: &str, authorize: bool, build: F) -> Result<Response>
    where
        F: Fn(&Client, &str) -> RequestBuilder,
    {
        let max_retries = self.config.run_urls.len();
        let mut last_error = None;
        let mut relogged = false;
        let mut attempt = 0;

        while attempt < max_retries {
            let url = self.build_url(path);
            let mut request = build(&self.client, &url);
            if authorize {
                let token = self.ensure_token().await?;
                request = request.bearer_auth(token);
            }

            match request.send().await {
                Ok(response) => {
                    if response.status() == StatusCode::UNAUTHORIZED
                        && authorize
                        && !relogged
                        && self.config.has_credentials()
                    {
                        warn!("Token rejected, logging in again...");
                        self.clear_token();
                        self.authenticate().await?;
                        relogged = true;
                        continue;
                    }
                    return Ok(response);
                }
                Err(e) => {
                    warn!("Request to {} failed: {}, switching to next run URL", url, e);
                    self.switch_to_next_server();
                    last_error = Some(e.into());
                    attempt += 1;
                }
            }
        }

        Err(last_error.unwrap_or(ClientError::AllServersFailed))
    }
}

/// Sibling of `dest` that receives the body while it downloads
fn partial_path(dest: &Path) -> Result<PathBuf> {
    let file_name = dest
        .file_name()
        .ok_or_else(|| ArgumentError::invalid("dest", "must name a file"))?;
    let mut partial = file_name.to_os_string();
    partial.push(".part");
    Ok(dest.with_file_name(partial))
}

async fn write_body(response: Response, target: &Path) -> Result<u64> {
    let mut file = tokio::fs::File::create(target).await?;
    let mut stream = response.bytes_stream();
    let mut written = 0u64;
    while let Some(chunk) = stream.next().await {
        let chunk = chunk?;
        file.write_all(&chunk).await?;
        written += chunk.len() as u64;
    }
    file.flush().await?;
    Ok(written)
}

/// Parse a JSON response body, mapping non-success statuses to errors.
///
/// An empty success body deserializes as JSON `null`, so `()` and `Option<T>`
/// work for endpoints answering `204 No Content`.
pub async fn handle_response<T: DeserializeOwned>(response: Response) -> Result<T> {
    if !response.status().is_success() {
        return Err(status_error(response).await);
    }

    let body = response.bytes().await?;
    if body.iter().all(|b| b.is_ascii_whitespace()) {
        return Ok(serde_json::from_value(serde_json::Value::Null)?);
    }
    Ok(serde_json::from_slice(&body)?)
}

/// Convert a non-success response into a [`ClientError`]
pub async fn status_error(response: Response) -> ClientError {
    let status = response.status();
    let path = response.url().path().to_string();

    if status == StatusCode::NOT_FOUND {
        return ClientError::NotFound(path);
    }

    let body = response.text().await.unwrap_or_default();
    let message = serde_json::from_str::<serde_json::Value>(&body)
        .ok()
        .and_then(|v| v.get("message").and_then(|m| m.as_str()).map(String::from))
        .unwrap_or(body);

    if status == StatusCode::UNAUTHORIZED {
        return ClientError::AuthFailed(message);
    }

    error!("Request to {} failed with status {}: {}", path, status, message);
    ClientError::RequestFailed {
        status: status.as_u16(),
        message,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use base64::Engine;
    use base64::engine::general_purpose::URL_SAFE_NO_PAD;

    fn jwt_with_exp(exp: i64) -> String {
        let header = URL_SAFE_NO_PAD.encode(r#"{"alg":"HS256"}"#);
        let payload = URL_SAFE_NO_PAD.encode(format!(r#"{{"exp":{}}}"#, exp));
        format!("{}.{}.sig", header, payload)
    }

    #[test]
    fn test_config_default() {
        let config = HttpClientConfig::default();
        assert_eq!(config.run_urls, vec![DEFAULT_RUN_URL]);
        assert!(config.token.is_none());
        assert!(!config.has_credentials());
        assert_eq!(config.connect_timeout_ms, 5000);
        assert_eq!(config.login_endpoint, DEFAULT_LOGIN_ENDPOINT);
    }

    #[test]
    fn test_config_builder() {
        let config = HttpClientConfig::new("http://localhost:8888")
            .with_credentials("eric", "secret")
            .with_timeouts(3000, 15000)
            .with_token("abc")
            .with_user_agent("test-agent")
            .with_login_endpoint("/api/iam/v2/login");

        assert_eq!(config.run_urls[0], "http://localhost:8888");
        assert_eq!(config.login_endpoint, "/api/iam/v2/login");
        assert!(config.has_credentials());
        assert_eq!(config.token.as_deref(), Some("abc"));
        assert_eq!(config.read_timeout_ms, 15000);
        assert_eq!(config.user_agent, "test-agent");
    }

    #[test]
    fn test_empty_run_urls_rejected() {
        let config = HttpClientConfig::with_run_urls(vec![]);
        let err = DatalayerHttpClient::new_without_login(config)
            .err()
            .unwrap();
        assert_eq!(err.to_string(), "run_urls is required");
    }

    #[test]
    fn test_build_url() {
        let config = HttpClientConfig::new("http://localhost:8888/");
        let client = DatalayerHttpClient::new_without_login(config).unwrap();

        assert_eq!(
            client.build_url("/api/iam/v1/whoami"),
            "http://localhost:8888/api/iam/v1/whoami"
        );
        assert_eq!(
            client.build_url("https://uploads.example.com/files/abc"),
            "https://uploads.example.com/files/abc"
        );
    }

    #[test]
    fn test_failover_rotates_servers() {
        let config = HttpClientConfig::with_run_urls(vec![
            "http://a:1".to_string(),
            "http://b:2".to_string(),
        ]);
        let client = DatalayerHttpClient::new_without_login(config).unwrap();

        assert_eq!(client.current_server(), "http://a:1");
        client.switch_to_next_server();
        assert_eq!(client.current_server(), "http://b:2");
        client.switch_to_next_server();
        assert_eq!(client.current_server(), "http://a:1");
    }

    #[test]
    fn test_token_lifecycle() {
        let config = HttpClientConfig::new("http://localhost:8888").with_token("opaque-token");
        let client = DatalayerHttpClient::new_without_login(config).unwrap();
        assert_eq!(client.token().as_deref(), Some("opaque-token"));

        client.clear_token();
        assert!(client.token().is_none());

        let fresh = jwt_with_exp(Utc::now().timestamp() + 3600);
        client.set_token(fresh.clone());
        assert_eq!(client.token(), Some(fresh));

        client.set_token(jwt_with_exp(Utc::now().timestamp() + 10));
        assert!(client.token().is_none());
    }

    #[test]
    fn test_blank_config_token_ignored() {
        let config = HttpClientConfig::new("http://localhost:8888").with_token("  ");
        let client = DatalayerHttpClient::new_without_login(config).unwrap();
        assert!(client.token().is_none());
    }
}

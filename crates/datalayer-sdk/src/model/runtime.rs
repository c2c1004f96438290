// Runtime model types

use std::{fmt, str::FromStr};

use chrono::{DateTime, Duration, Utc};
use datalayer_common::{ArgumentError, require_non_empty, require_positive};
use serde::{Deserialize, Serialize};

use super::common::epoch_seconds;
use crate::{DatalayerClient, Result};

/// What a runtime hosts
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RuntimeType {
    #[default]
    Notebook,
    Cell,
}

impl RuntimeType {
    pub fn as_str(&self) -> &'static str {
        match self {
            RuntimeType::Notebook => "notebook",
            RuntimeType::Cell => "cell",
        }
    }
}

impl fmt::Display for RuntimeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for RuntimeType {
    type Err = ArgumentError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "notebook" => Ok(RuntimeType::Notebook),
            "cell" => Ok(RuntimeType::Cell),
            other => Err(ArgumentError::invalid(
                "runtime_type",
                format!("unknown runtime type '{}'", other),
            )),
        }
    }
}

/// A running kernel pod
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Runtime {
    pub pod_name: String,
    pub uid: String,
    pub given_name: String,
    pub environment_name: String,
    pub environment_title: String,
    #[serde(rename = "type")]
    pub runtime_type: RuntimeType,
    /// Credits burnt per second
    pub burning_rate: f64,
    /// Jupyter server URL of the runtime
    pub ingress: String,
    /// Jupyter server token
    pub token: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reservation_id: Option<String>,
    #[serde(with = "epoch_seconds")]
    pub started_at: Option<DateTime<Utc>>,
    #[serde(with = "epoch_seconds")]
    pub expired_at: Option<DateTime<Utc>>,
}

impl Runtime {
    pub fn started_at(&self) -> Option<DateTime<Utc>> {
        self.started_at
    }

    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        self.expired_at
    }

    /// A runtime without an expiry never expires
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expired_at.is_some_and(|expired_at| now >= expired_at)
    }

    /// Time left before expiry, zero once expired
    pub fn remaining(&self, now: DateTime<Utc>) -> Option<Duration> {
        self.expired_at
            .map(|expired_at| (expired_at - now).max(Duration::zero()))
    }

    /// Running time so far, stopping at expiry
    pub fn elapsed(&self, now: DateTime<Utc>) -> Option<Duration> {
        let started_at = self.started_at?;
        let end = match self.expired_at {
            Some(expired_at) if expired_at < now => expired_at,
            _ => now,
        };
        Some((end - started_at).max(Duration::zero()))
    }

    /// Credits burnt so far: burning rate times elapsed seconds
    pub fn credits_consumed(&self, now: DateTime<Utc>) -> f64 {
        self.elapsed(now)
            .map(|elapsed| self.burning_rate * elapsed.num_milliseconds() as f64 / 1000.0)
            .unwrap_or(0.0)
    }

    pub fn jupyter_server_url(&self) -> Option<&str> {
        Some(self.ingress.as_str()).filter(|url| !url.is_empty())
    }

    pub fn jupyter_token(&self) -> Option<&str> {
        Some(self.token.as_str()).filter(|token| !token.is_empty())
    }

    /// Delete this runtime. The value is consumed so it cannot be used afterwards.
    pub async fn delete(self, client: &DatalayerClient) -> Result<()> {
        client.delete_runtime(&self.pod_name).await
    }
}

/// Request to start a runtime
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct CreateRuntime {
    pub environment_name: String,
    #[serde(rename = "type")]
    pub runtime_type: RuntimeType,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub given_name: Option<String>,
    pub credits_limit: f64,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub capabilities: Vec<String>,
    /// Snapshot uid to load when the runtime starts
    #[serde(skip_serializing_if = "Option::is_none")]
    pub from: Option<String>,
}

impl CreateRuntime {
    pub fn new(environment_name: &str, credits_limit: f64) -> Self {
        Self {
            environment_name: environment_name.to_string(),
            runtime_type: RuntimeType::default(),
            given_name: None,
            credits_limit,
            capabilities: Vec::new(),
            from: None,
        }
    }

    pub fn with_type(mut self, runtime_type: RuntimeType) -> Self {
        self.runtime_type = runtime_type;
        self
    }

    pub fn with_given_name(mut self, given_name: &str) -> Self {
        self.given_name = Some(given_name.to_string());
        self
    }

    pub fn with_capability(mut self, capability: &str) -> Self {
        self.capabilities.push(capability.to_string());
        self
    }

    pub fn from_snapshot(mut self, snapshot_uid: &str) -> Self {
        self.from = Some(snapshot_uid.to_string());
        self
    }

    pub fn validate(&self) -> std::result::Result<(), ArgumentError> {
        require_non_empty("environment_name", &self.environment_name)?;
        require_positive("credits_limit", self.credits_limit)?;
        if let Some(from) = &self.from {
            require_non_empty("from", from)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn at(secs: i64) -> DateTime<Utc> {
        DateTime::from_timestamp(secs, 0).unwrap()
    }

    fn runtime() -> Runtime {
        serde_json::from_value(json!({
            "pod_name": "jupyter-ada-abc12",
            "uid": "01HRT",
            "given_name": "My runtime",
            "environment_name": "python-cpu-env",
            "type": "notebook",
            "burning_rate": 0.5,
            "ingress": "https://prod1.datalayer.run/jupyter/server/ada-abc12",
            "token": "jt",
            "started_at": "1700000000",
            "expired_at": 1_700_003_600,
        }))
        .unwrap()
    }

    #[test]
    fn test_runtime_type_parse() {
        assert_eq!("cell".parse::<RuntimeType>().unwrap(), RuntimeType::Cell);
        assert_eq!(" Notebook ".parse::<RuntimeType>().unwrap(), RuntimeType::Notebook);
        assert!("kernel".parse::<RuntimeType>().is_err());
        assert_eq!(RuntimeType::Cell.to_string(), "cell");
    }

    #[test]
    fn test_runtime_timing() {
        let runtime = runtime();
        assert_eq!(runtime.started_at(), Some(at(1_700_000_000)));
        assert_eq!(runtime.expires_at(), Some(at(1_700_003_600)));

        let now = at(1_700_000_600);
        assert!(!runtime.is_expired(now));
        assert_eq!(runtime.elapsed(now), Some(Duration::seconds(600)));
        assert_eq!(runtime.remaining(now), Some(Duration::seconds(3000)));
        assert!((runtime.credits_consumed(now) - 300.0).abs() < 1e-9);
    }

    #[test]
    fn test_runtime_after_expiry() {
        let runtime = runtime();
        let later = at(1_700_010_000);
        assert!(runtime.is_expired(later));
        assert_eq!(runtime.remaining(later), Some(Duration::zero()));
        assert_eq!(runtime.elapsed(later), Some(Duration::seconds(3600)));
        assert!((runtime.credits_consumed(later) - 1800.0).abs() < 1e-9);
    }

    #[test]
    fn test_runtime_without_timestamps() {
        let runtime = Runtime::default();
        let now = at(1_700_000_000);
        assert!(!runtime.is_expired(now));
        assert!(runtime.elapsed(now).is_none());
        assert!(runtime.remaining(now).is_none());
        assert_eq!(runtime.credits_consumed(now), 0.0);
        assert!(runtime.jupyter_server_url().is_none());
        assert!(runtime.jupyter_token().is_none());
    }

    #[test]
    fn test_jupyter_accessors() {
        let runtime = runtime();
        assert_eq!(
            runtime.jupyter_server_url(),
            Some("https://prod1.datalayer.run/jupyter/server/ada-abc12")
        );
        assert_eq!(runtime.jupyter_token(), Some("jt"));
    }

    #[test]
    fn test_create_runtime_body() {
        let request = CreateRuntime::new("python-cpu-env", 10.0)
            .with_type(RuntimeType::Cell)
            .with_given_name("scratch")
            .from_snapshot("snap-1");

        assert!(request.validate().is_ok());
        assert_eq!(
            serde_json::to_value(&request).unwrap(),
            json!({
                "environment_name": "python-cpu-env",
                "type": "cell",
                "given_name": "scratch",
                "credits_limit": 10.0,
                "from": "snap-1",
            })
        );
    }

    #[test]
    fn test_create_runtime_validation() {
        assert_eq!(
            CreateRuntime::new("", 10.0).validate(),
            Err(ArgumentError::Missing("environment_name"))
        );
        assert!(matches!(
            CreateRuntime::new("python-cpu-env", 0.0).validate(),
            Err(ArgumentError::Invalid {
                name: "credits_limit",
                ..
            })
        ));
        assert!(
            CreateRuntime::new("python-cpu-env", 1.0)
                .from_snapshot(" ")
                .validate()
                .is_err()
        );
    }
}

// Runtime snapshot model types

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::common::epoch_seconds;
use crate::{DatalayerClient, Result, constants::SNAPSHOT_FORMAT};

/// Saved state of a runtime
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RuntimeSnapshot {
    pub uid: String,
    pub name: String,
    pub description: String,
    pub environment: String,
    pub format: String,
    pub format_version: String,
    pub status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub size: Option<u64>,
    #[serde(with = "epoch_seconds")]
    pub updated_at: Option<DateTime<Utc>>,
    pub metadata: HashMap<String, Value>,
}

impl RuntimeSnapshot {
    pub fn is_ready(&self) -> bool {
        self.status.eq_ignore_ascii_case("ready")
    }

    pub fn updated_at(&self) -> Option<DateTime<Utc>> {
        self.updated_at
    }

    /// Delete this snapshot and wait until the platform no longer serves it.
    /// The value is consumed so it cannot be used afterwards.
    pub async fn delete(self, client: &DatalayerClient) -> Result<()> {
        client.delete_snapshot(&self.uid).await
    }
}

#[derive(Clone, Debug, Serialize)]
pub(crate) struct CreateSnapshot<'a> {
    pub pod_name: &'a str,
    pub name: &'a str,
    pub description: &'a str,
    pub stop: bool,
}

/// Metadata attached to a snapshot upload
#[derive(Clone, Debug, PartialEq)]
pub struct UploadSnapshot {
    pub name: String,
    pub description: String,
    pub environment: String,
    pub format: String,
}

impl UploadSnapshot {
    pub fn new(name: &str, environment: &str) -> Self {
        Self {
            name: name.to_string(),
            description: String::new(),
            environment: environment.to_string(),
            format: SNAPSHOT_FORMAT.to_string(),
        }
    }

    pub fn with_description(mut self, description: &str) -> Self {
        self.description = description.to_string();
        self
    }

    pub fn with_format(mut self, format: &str) -> Self {
        self.format = format.to_string();
        self
    }

    /// tus metadata pairs for this upload
    pub fn metadata(&self, filename: &str) -> Vec<(String, String)> {
        [
            ("filename", filename),
            ("name", self.name.as_str()),
            ("description", self.description.as_str()),
            ("environment", self.environment.as_str()),
            ("format", self.format.as_str()),
        ]
        .into_iter()
        .filter(|(_, value)| !value.is_empty())
        .map(|(key, value)| (key.to_string(), value.to_string()))
        .collect()
    }
}

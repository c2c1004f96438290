// Runtime environment model types

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Compute resources of an environment as reported by the platform
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Resources {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cpu: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub memory: Option<Value>,
    #[serde(alias = "nvidia.com/gpu", skip_serializing_if = "Option::is_none")]
    pub gpu: Option<Value>,
}

impl Resources {
    pub fn has_gpu(&self) -> bool {
        match &self.gpu {
            None | Some(Value::Null) => false,
            Some(Value::Number(n)) => n.as_f64().is_some_and(|n| n > 0.0),
            Some(Value::String(s)) => !matches!(s.trim(), "" | "0"),
            Some(_) => true,
        }
    }
}

/// Runtime environment (image plus resources) a runtime is started from
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Environment {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(alias = "dockerImage", skip_serializing_if = "Option::is_none")]
    pub docker_image: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
    /// Credits burnt per second while a runtime of this environment runs
    #[serde(alias = "burningRate")]
    pub burning_rate: f64,
    pub resources: Resources,
    pub tags: Vec<String>,
}

impl Environment {
    /// Kernel language, `python` when the platform leaves it out
    pub fn language_or_default(&self) -> &str {
        self.language
            .as_deref()
            .filter(|l| !l.is_empty())
            .unwrap_or("python")
    }

    pub fn description_or_default(&self) -> &str {
        self.description.as_deref().unwrap_or_default()
    }

    /// Title when present, otherwise the name
    pub fn display_title(&self) -> &str {
        self.title
            .as_deref()
            .filter(|t| !t.is_empty())
            .unwrap_or(&self.name)
    }

    /// Credits a runtime of this environment burns in `hours`
    pub fn credits_per_hours(&self, hours: f64) -> f64 {
        self.burning_rate * hours * 3600.0
    }
}

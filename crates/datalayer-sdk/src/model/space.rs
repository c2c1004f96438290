// Spacer model types

use std::fmt;

use chrono::{DateTime, Utc};
use datalayer_common::{ArgumentError, is_valid_handle, require_non_empty};
use serde::{Deserialize, Serialize};

use super::common::epoch_seconds;

/// Kind of a Spacer item, read from its `type_s` field
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ItemKind {
    Notebook,
    Document,
    Cell,
    Exercise,
    Other(String),
}

impl ItemKind {
    pub fn as_str(&self) -> &str {
        match self {
            ItemKind::Notebook => "notebook",
            ItemKind::Document => "lexical",
            ItemKind::Cell => "cell",
            ItemKind::Exercise => "exercise",
            ItemKind::Other(kind) => kind,
        }
    }
}

impl Default for ItemKind {
    fn default() -> Self {
        ItemKind::Other(String::new())
    }
}

impl From<String> for ItemKind {
    fn from(kind: String) -> Self {
        match kind.to_lowercase().as_str() {
            "notebook" => ItemKind::Notebook,
            "lexical" | "document" => ItemKind::Document,
            "cell" => ItemKind::Cell,
            "exercise" => ItemKind::Exercise,
            _ => ItemKind::Other(kind),
        }
    }
}

impl From<ItemKind> for String {
    fn from(kind: ItemKind) -> Self {
        match kind {
            ItemKind::Other(kind) => kind,
            known => known.as_str().to_string(),
        }
    }
}

impl fmt::Display for ItemKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Content stored in a space
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Item {
    pub uid: String,
    #[serde(rename = "type_s", alias = "type")]
    pub kind: ItemKind,
    #[serde(rename = "name_t", alias = "name")]
    pub name: String,
    #[serde(rename = "description_t", alias = "description")]
    pub description: String,
    #[serde(rename = "creation_ts_dt", alias = "created_at", with = "epoch_seconds")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(rename = "last_update_ts_dt", alias = "updated_at", with = "epoch_seconds")]
    pub updated_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub space_uid: Option<String>,
}

impl Item {
    pub fn is_notebook(&self) -> bool {
        self.kind == ItemKind::Notebook
    }

    pub fn is_document(&self) -> bool {
        self.kind == ItemKind::Document
    }
}

/// Workspace grouping items
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Space {
    pub uid: String,
    #[serde(rename = "handle_s", alias = "handle")]
    pub handle: String,
    #[serde(rename = "name_t", alias = "name")]
    pub name: String,
    #[serde(rename = "description_t", alias = "description")]
    pub description: String,
    #[serde(rename = "variant_s", alias = "variant")]
    pub variant: String,
    #[serde(rename = "public_b", alias = "public")]
    pub public: bool,
    pub items: Vec<Item>,
}

impl Space {
    pub fn notebooks(&self) -> impl Iterator<Item = &Item> {
        self.items.iter().filter(|item| item.is_notebook())
    }

    pub fn documents(&self) -> impl Iterator<Item = &Item> {
        self.items.iter().filter(|item| item.is_document())
    }
}

/// Request to create a space
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct CreateSpace {
    pub name: String,
    pub description: String,
    pub handle: String,
    pub variant: String,
    pub public: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub organization_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub seed_space_id: Option<String>,
}

impl CreateSpace {
    pub fn new(name: &str, handle: &str) -> Self {
        Self {
            name: name.to_string(),
            description: String::new(),
            handle: handle.to_string(),
            variant: "default".to_string(),
            public: false,
            organization_id: None,
            seed_space_id: None,
        }
    }

    pub fn with_description(mut self, description: &str) -> Self {
        self.description = description.to_string();
        self
    }

    pub fn with_variant(mut self, variant: &str) -> Self {
        self.variant = variant.to_string();
        self
    }

    pub fn with_public(mut self, public: bool) -> Self {
        self.public = public;
        self
    }

    pub fn with_organization(mut self, organization_id: &str) -> Self {
        self.organization_id = Some(organization_id.to_string());
        self
    }

    pub fn with_seed_space(mut self, seed_space_id: &str) -> Self {
        self.seed_space_id = Some(seed_space_id.to_string());
        self
    }

    pub fn validate(&self) -> Result<(), ArgumentError> {
        require_non_empty("name", &self.name)?;
        require_non_empty("handle", &self.handle)?;
        if !is_valid_handle(&self.handle) {
            return Err(ArgumentError::invalid(
                "handle",
                format!(
                    "'{}' must start with a letter or digit and contain only letters, digits, '-' or '_'",
                    self.handle
                ),
            ));
        }
        Ok(())
    }
}

use datalayer_common::{require_non_empty, require_path_segment};
use reqwest::multipart::{Form, Part};
use serde::Serialize;
use serde_json::Value;
use tracing::info;

use super::DatalayerClient;
use crate::{
    Result,
    constants::{DOCUMENT_TYPE_LEXICAL, NOTEBOOK_TYPE_JUPYTER, api_path},
    model::{
        CreateSpace, Item, Space,
        common::{check_success, into_field, into_list},
    },
};

/// Name and description changes; unset fields are left as-is
#[derive(Serialize)]
struct ItemUpdate<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    name: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    description: Option<&'a str>,
}

impl DatalayerClient {
    // ============================================================================
    // Space APIs
    // ============================================================================

    pub async fn create_space(&self, request: &CreateSpace) -> Result<Space> {
        request.validate()?;
        let body: Value = self.http.post_json(api_path::SPACES, request).await?;
        let space: Space = into_field(body, "space")?;
        info!("Created space {} ({})", space.uid, request.handle);
        Ok(space)
    }

    /// Spaces of the current user
    pub async fn list_my_spaces(&self) -> Result<Vec<Space>> {
        let body: Value = self.http.get(api_path::MY_SPACES).await?;
        into_list(body, "spaces")
    }

    pub async fn get_space(&self, uid: &str) -> Result<Space> {
        require_path_segment("uid", uid)?;
        let body: Value = self
            .http
            .get(&format!("{}/{}", api_path::SPACES, uid))
            .await?;
        into_field(body, "space")
    }

    pub async fn list_space_items(&self, space_uid: &str) -> Result<Vec<Item>> {
        require_path_segment("space_uid", space_uid)?;
        let body: Value = self
            .http
            .get(&format!("{}/{}/items", api_path::SPACES, space_uid))
            .await?;
        into_list(body, "items")
    }

    // ============================================================================
    // Notebook APIs
    // ============================================================================

    /// Create a notebook in a space, optionally with initial `.ipynb` content
    pub async fn create_notebook(
        &self,
        space_uid: &str,
        name: &str,
        description: &str,
        content: Option<&str>,
    ) -> Result<Item> {
        require_path_segment("space_uid", space_uid)?;
        require_non_empty("name", name)?;

        let body: Value = self
            .http
            .post_multipart(api_path::NOTEBOOKS, || {
                let form = item_form(space_uid, name, description)
                    .text("notebook_type", NOTEBOOK_TYPE_JUPYTER);
                match content {
                    Some(content) => form.part(
                        "file",
                        Part::text(content.to_string()).file_name(format!("{}.ipynb", name)),
                    ),
                    None => form,
                }
            })
            .await?;
        let notebook: Item = into_field(body, "notebook")?;
        info!("Created notebook {} in space {}", notebook.uid, space_uid);
        Ok(notebook)
    }

    pub async fn get_notebook(&self, uid: &str) -> Result<Item> {
        require_path_segment("uid", uid)?;
        let body: Value = self
            .http
            .get(&format!("{}/{}", api_path::NOTEBOOKS, uid))
            .await?;
        into_field(body, "notebook")
    }

    pub async fn update_notebook(
        &self,
        uid: &str,
        name: Option<&str>,
        description: Option<&str>,
    ) -> Result<Item> {
        require_path_segment("uid", uid)?;
        let body: Value = self
            .http
            .put_json(
                &format!("{}/{}", api_path::NOTEBOOKS, uid),
                &ItemUpdate { name, description },
            )
            .await?;
        into_field(body, "notebook")
    }

    // ============================================================================
    // Document APIs
    // ============================================================================

    pub async fn create_document(
        &self,
        space_uid: &str,
        name: &str,
        description: &str,
    ) -> Result<Item> {
        require_path_segment("space_uid", space_uid)?;
        require_non_empty("name", name)?;

        let body: Value = self
            .http
            .post_multipart(api_path::DOCUMENTS, || {
                item_form(space_uid, name, description)
                    .text("document_type", DOCUMENT_TYPE_LEXICAL)
            })
            .await?;
        let document: Item = into_field(body, "document")?;
        info!("Created document {} in space {}", document.uid, space_uid);
        Ok(document)
    }

    pub async fn get_document(&self, uid: &str) -> Result<Item> {
        require_path_segment("uid", uid)?;
        let body: Value = self
            .http
            .get(&format!("{}/{}", api_path::DOCUMENTS, uid))
            .await?;
        into_field(body, "document")
    }

    pub async fn update_document(
        &self,
        uid: &str,
        name: Option<&str>,
        description: Option<&str>,
    ) -> Result<Item> {
        require_path_segment("uid", uid)?;
        let body: Value = self
            .http
            .put_json(
                &format!("{}/{}", api_path::DOCUMENTS, uid),
                &ItemUpdate { name, description },
            )
            .await?;
        into_field(body, "document")
    }

    // ============================================================================
    // Item APIs
    // ============================================================================

    pub async fn delete_item(&self, uid: &str) -> Result<()> {
        require_path_segment("uid", uid)?;
        let body: Value = self
            .http
            .delete(&format!("{}/{}", api_path::ITEMS, uid))
            .await?;
        check_success(body)?;
        info!("Deleted item {}", uid);
        Ok(())
    }
}

fn item_form(space_uid: &str, name: &str, description: &str) -> Form {
    Form::new()
        .text("space_id", space_uid.to_string())
        .text("name", name.to_string())
        .text("description", description.to_string())
}

use std::sync::Arc;

use datalayer_common::require_path_segment;
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, info};

use super::DatalayerClient;
use crate::{
    Result,
    constants::api_path,
    model::{
        CreateRuntime, Environment, Runtime,
        common::{check_success, into_field, into_list},
    },
};

impl DatalayerClient {
    // ============================================================================
    // Environment APIs
    // ============================================================================

    /// Environments available to the current user, cached per run URL.
    ///
    /// Logging in or out drops the cache.
    pub async fn list_environments(&self) -> Result<Arc<Vec<Environment>>> {
        let key = self.run_url();
        if let Some(environments) = self.environments.get(&key) {
            debug!("Environments served from cache for {}", key);
            return Ok(environments);
        }

        let body: Value = self.http.get(api_path::ENVIRONMENTS).await?;
        let environments = Arc::new(into_list::<Environment>(body, "environments")?);
        self.environments.insert(key, environments.clone());
        Ok(environments)
    }

    /// Drop cached environments so the next listing hits the platform
    pub fn invalidate_environments(&self) {
        self.environments.invalidate_all();
    }

    // ============================================================================
    // Runtime APIs
    // ============================================================================

    /// Start a runtime
    pub async fn create_runtime(&self, request: &CreateRuntime) -> Result<Runtime> {
        request.validate()?;

        let body: Value = self.http.post_json(api_path::RUNTIMES, request).await?;
        let runtime: Runtime = into_field(body, "runtime")?;
        info!(
            "Created runtime {} from environment {}",
            runtime.pod_name, request.environment_name
        );
        Ok(runtime)
    }

    pub async fn list_runtimes(&self) -> Result<Vec<Runtime>> {
        let body: Value = self.http.get(api_path::RUNTIMES).await?;
        into_list(body, "runtimes")
    }

    pub async fn get_runtime(&self, pod_name: &str) -> Result<Runtime> {
        require_path_segment("pod_name", pod_name)?;
        let body: Value = self
            .http
            .get(&format!("{}/{}", api_path::RUNTIMES, pod_name))
            .await?;
        into_field(body, "runtime")
    }

    pub async fn delete_runtime(&self, pod_name: &str) -> Result<()> {
        require_path_segment("pod_name", pod_name)?;
        let body: Value = self
            .http
            .delete(&format!("{}/{}", api_path::RUNTIMES, pod_name))
            .await?;
        check_success(body)?;
        info!("Deleted runtime {}", pod_name);
        Ok(())
    }

    /// Load a snapshot into a running runtime
    pub async fn restore_runtime(&self, pod_name: &str, snapshot_uid: &str) -> Result<()> {
        require_path_segment("pod_name", pod_name)?;
        require_path_segment("snapshot_uid", snapshot_uid)?;

        #[derive(Serialize)]
        struct Body<'a> {
            from: &'a str,
        }

        let body: Value = self
            .http
            .put_json(
                &format!("{}/{}", api_path::RUNTIMES, pod_name),
                &Body { from: snapshot_uid },
            )
            .await?;
        check_success(body)?;
        info!("Restored snapshot {} into runtime {}", snapshot_uid, pod_name);
        Ok(())
    }
}

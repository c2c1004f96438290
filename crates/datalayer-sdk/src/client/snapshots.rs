use std::path::Path;

use datalayer_client::{ProgressCallback, TusOptions, TusUploader, poll_until};
use datalayer_common::{require_non_empty, require_path_segment};
use serde_json::Value;
use tracing::{debug, info};

use super::DatalayerClient;
use crate::{
    Result,
    constants::api_path,
    model::{
        RuntimeSnapshot, UploadSnapshot,
        common::{check_success, into_field, into_list},
        snapshot::CreateSnapshot,
    },
};

impl DatalayerClient {
    // ============================================================================
    // Runtime Snapshot APIs
    // ============================================================================

    pub async fn list_snapshots(&self) -> Result<Vec<RuntimeSnapshot>> {
        let body: Value = self.http.get(api_path::RUNTIME_SNAPSHOTS).await?;
        into_list(body, "snapshots")
    }

    /// Snapshot the runtime `pod_name`, optionally stopping it afterwards
    pub async fn create_snapshot(
        &self,
        pod_name: &str,
        name: &str,
        description: &str,
        stop: bool,
    ) -> Result<RuntimeSnapshot> {
        require_path_segment("pod_name", pod_name)?;
        require_non_empty("name", name)?;

        let body: Value = self
            .http
            .post_json(
                api_path::RUNTIME_SNAPSHOTS,
                &CreateSnapshot {
                    pod_name,
                    name,
                    description,
                    stop,
                },
            )
            .await?;
        let snapshot: RuntimeSnapshot = into_field(body, "snapshot")?;
        info!("Created snapshot {} of runtime {}", snapshot.uid, pod_name);
        Ok(snapshot)
    }

    pub async fn get_snapshot(&self, uid: &str) -> Result<RuntimeSnapshot> {
        require_path_segment("uid", uid)?;
        let body: Value = self.http.get(&snapshot_path(uid)).await?;
        into_field(body, "snapshot")
    }

    /// Delete a snapshot and wait until the platform answers 404 for it.
    ///
    /// Waiting follows [`DatalayerClientConfig::snapshot_deletion`]; errors
    /// other than 404 while waiting are returned as-is.
    ///
    /// [`DatalayerClientConfig::snapshot_deletion`]: crate::DatalayerClientConfig::snapshot_deletion
    pub async fn delete_snapshot(&self, uid: &str) -> Result<()> {
        require_path_segment("uid", uid)?;
        let path = snapshot_path(uid);

        let body: Value = self.http.delete(&path).await?;
        check_success(body)?;
        debug!("Deletion of snapshot {} requested", uid);

        let path = path.as_str();
        poll_until(
            &self.config.snapshot_deletion,
            &format!("deletion of snapshot {}", uid),
            || async move {
                match self.http.get::<Value>(path).await {
                    Err(e) if e.is_not_found() => Ok(Some(())),
                    Err(e) => Err(e),
                    Ok(_) => Ok(None),
                }
            },
        )
        .await?;

        info!("Deleted snapshot {}", uid);
        Ok(())
    }

    /// Stream a snapshot archive into `dest`, returning the bytes written
    pub async fn download_snapshot(&self, uid: &str, dest: &Path) -> Result<u64> {
        require_path_segment("uid", uid)?;
        let written = self
            .http
            .download(&format!("{}?download=1", snapshot_path(uid)), dest)
            .await?;
        info!("Downloaded snapshot {} ({} bytes)", uid, written);
        Ok(written)
    }

    /// Upload a snapshot archive with the tus protocol, resuming an
    /// unfinished upload of the same file. Returns the upload URL.
    pub async fn upload_snapshot(
        &self,
        path: &Path,
        snapshot: &UploadSnapshot,
        progress: Option<ProgressCallback>,
    ) -> Result<String> {
        require_non_empty("name", &snapshot.name)?;
        require_non_empty("environment", &snapshot.environment)?;

        let filename = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default();

        let mut options = TusOptions::default().with_chunk_size(self.config.upload_chunk_size);
        options.metadata = snapshot.metadata(&filename);
        options.progress = progress;

        let url = TusUploader::new(&self.http, api_path::RUNTIME_SNAPSHOTS_UPLOAD)
            .with_options(options)
            .with_store(self.upload_store.clone())
            .upload_file(path)
            .await?;

        info!("Uploaded snapshot {} to {}", snapshot.name, url);
        Ok(url)
    }
}

fn snapshot_path(uid: &str) -> String {
    format!("{}/{}", api_path::RUNTIME_SNAPSHOTS, uid)
}

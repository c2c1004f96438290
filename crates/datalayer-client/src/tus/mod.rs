//! Resumable uploads over the tus 1.0.0 protocol
//!
//! An upload is created with `POST` (answered by a `Location`), its current
//! offset is read with `HEAD`, and the bytes are sent in `PATCH` chunks.
//! A failed chunk is retried after each of `retry_delays`, re-reading the
//! server offset first so nothing is sent twice.

mod store;

pub use store::{FileUploadStore, MemoryUploadStore, UploadStore};

use std::{
    fmt,
    io::SeekFrom,
    path::Path,
    sync::Arc,
    time::{Duration, UNIX_EPOCH},
};

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use bytes::Bytes;
use datalayer_common::ArgumentError;
use reqwest::{
    Response, StatusCode,
    header::{CONTENT_TYPE, LOCATION},
};
use tokio::io::{AsyncReadExt, AsyncSeekExt};
use tracing::{debug, info, warn};
use url::Url;

use crate::{
    error::{ClientError, Result},
    http::{DatalayerHttpClient, status_error},
};

/// Protocol version sent in `Tus-Resumable`
pub const TUS_VERSION: &str = "1.0.0";

/// Default PATCH body size
pub const DEFAULT_CHUNK_SIZE: usize = 5 * 1024 * 1024;

const OFFSET_CONTENT_TYPE: &str = "application/offset+octet-stream";

/// Called with `(bytes_sent, bytes_total)` after every chunk
pub type ProgressCallback = Arc<dyn Fn(u64, u64) + Send + Sync>;

/// Upload tuning and metadata
#[derive(Clone)]
pub struct TusOptions {
    pub chunk_size: usize,
    pub retry_delays: Vec<Duration>,
    pub metadata: Vec<(String, String)>,
    pub progress: Option<ProgressCallback>,
}

impl Default for TusOptions {
    fn default() -> Self {
        Self {
            chunk_size: DEFAULT_CHUNK_SIZE,
            retry_delays: vec![
                Duration::ZERO,
                Duration::from_secs(1),
                Duration::from_secs(3),
                Duration::from_secs(5),
            ],
            metadata: Vec::new(),
            progress: None,
        }
    }
}

impl fmt::Debug for TusOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TusOptions")
            .field("chunk_size", &self.chunk_size)
            .field("retry_delays", &self.retry_delays)
            .field("metadata", &self.metadata)
            .field("progress", &self.progress.is_some())
            .finish()
    }
}

impl TusOptions {
    pub fn with_chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = chunk_size.max(1);
        self
    }

    pub fn with_retry_delays(mut self, delays: Vec<Duration>) -> Self {
        self.retry_delays = delays;
        self
    }

    pub fn with_metadata(mut self, key: &str, value: &str) -> Self {
        self.metadata.push((key.to_string(), value.to_string()));
        self
    }

    pub fn with_progress<F>(mut self, progress: F) -> Self
    where
        F: Fn(u64, u64) + Send + Sync + 'static,
    {
        self.progress = Some(Arc::new(progress));
        self
    }
}

/// Encode metadata pairs as an `Upload-Metadata` header value.
///
/// Keys must be non-empty and free of spaces and commas; values are base64
/// encoded, and an empty value is sent as the bare key.
pub fn encode_metadata(pairs: &[(String, String)]) -> Result<String> {
    let mut encoded = Vec::with_capacity(pairs.len());
    for (key, value) in pairs {
        if key.is_empty() || key.contains([' ', ',']) {
            return Err(ArgumentError::invalid(
                "metadata key",
                format!("'{}' must be non-empty without spaces or commas", key),
            )
            .into());
        }
        if value.is_empty() {
            encoded.push(key.clone());
        } else {
            encoded.push(format!("{} {}", key, STANDARD.encode(value)));
        }
    }
    Ok(encoded.join(","))
}

/// Decode an `Upload-Metadata` header value
pub fn decode_metadata(header: &str) -> Result<Vec<(String, String)>> {
    header
        .split(',')
        .map(str::trim)
        .filter(|pair| !pair.is_empty())
        .map(|pair| {
            let (key, value) = match pair.split_once(' ') {
                Some((key, encoded)) => {
                    let bytes = STANDARD.decode(encoded.trim()).map_err(|e| {
                        ClientError::Upload(format!("invalid metadata value for {}: {}", key, e))
                    })?;
                    let value = String::from_utf8(bytes).map_err(|e| {
                        ClientError::Upload(format!("invalid metadata value for {}: {}", key, e))
                    })?;
                    (key, value)
                }
                None => (pair, String::new()),
            };
            Ok((key.to_string(), value))
        })
        .collect()
}

/// Identify a file by canonical path, size, and modification time
pub async fn fingerprint(path: &Path) -> Result<String> {
    let canonical = tokio::fs::canonicalize(path).await?;
    let metadata = tokio::fs::metadata(&canonical).await?;
    let modified = metadata
        .modified()
        .ok()
        .and_then(|t| t.duration_since(UNIX_EPOCH).ok())
        .map(|d| d.as_secs())
        .unwrap_or(0);
    Ok(format!(
        "tus::{}::{}::{}",
        canonical.display(),
        metadata.len(),
        modified
    ))
}

/// Where the bytes of an upload come from
enum Source {
    File(tokio::fs::File),
    Memory(Bytes),
}

impl Source {
    async fn read_chunk(&mut self, offset: u64, len: usize) -> Result<Bytes> {
        match self {
            Source::Memory(data) => {
                let start = (offset as usize).min(data.len());
                let end = start.saturating_add(len).min(data.len());
                Ok(data.slice(start..end))
            }
            Source::File(file) => {
                file.seek(SeekFrom::Start(offset)).await?;
                let mut buf = Vec::with_capacity(len);
                (&mut *file).take(len as u64).read_to_end(&mut buf).await?;
                Ok(Bytes::from(buf))
            }
        }
    }
}

/// Client side of a tus upload against one creation endpoint
pub struct TusUploader<'a> {
    http: &'a DatalayerHttpClient,
    endpoint: String,
    options: TusOptions,
    store: Option<Arc<dyn UploadStore>>,
}

impl<'a> TusUploader<'a> {
    pub fn new(http: &'a DatalayerHttpClient, endpoint: &str) -> Self {
        Self {
            http,
            endpoint: endpoint.to_string(),
            options: TusOptions::default(),
            store: None,
        }
    }

    pub fn with_options(mut self, options: TusOptions) -> Self {
        self.options = options;
        self
    }

    /// Remember unfinished uploads in `store` so they can be resumed
    pub fn with_store(mut self, store: Arc<dyn UploadStore>) -> Self {
        self.store = Some(store);
        self
    }

    /// Upload a file, resuming an unfinished upload of the same file when
    /// the store knows one. Returns the upload URL.
    pub async fn upload_file(&self, path: &Path) -> Result<String> {
        let file = tokio::fs::File::open(path).await?;
        let length = file.metadata().await?.len();
        let fingerprint = fingerprint(path).await?;

        let (url, offset) = self.resume_or_create(&fingerprint, length).await?;
        let url = self.transfer(url, offset, length, Source::File(file)).await?;

        if let Some(store) = &self.store {
            store.remove(&fingerprint).await?;
        }
        Ok(url)
    }

    /// Upload an in-memory buffer. Returns the upload URL.
    pub async fn upload_bytes(&self, data: Bytes) -> Result<String> {
        let length = data.len() as u64;
        let url = self.create(length).await?;
        self.transfer(url, 0, length, Source::Memory(data)).await
    }

    async fn resume_or_create(&self, fingerprint: &str, length: u64) -> Result<(String, u64)> {
        if let Some(store) = &self.store {
            if let Some(url) = store.get(fingerprint).await {
                match self.offset(&url).await {
                    Ok(offset) if offset <= length => {
                        info!("Resuming upload {} at offset {}", url, offset);
                        return Ok((url, offset));
                    }
                    Ok(offset) => {
                        warn!(
                            "Stored upload {} is at offset {} beyond length {}, starting over",
                            url, offset, length
                        );
                    }
                    Err(e) => {
                        warn!("Stored upload {} is unusable ({}), starting over", url, e);
                    }
                }
                store.remove(fingerprint).await?;
            }
        }

        let url = self.create(length).await?;
        if let Some(store) = &self.store {
            store.put(fingerprint, &url).await?;
        }
        Ok((url, 0))
    }

    /// Create an upload of `length` bytes and return its absolute URL
    pub async fn create(&self, length: u64) -> Result<String> {
        let metadata = encode_metadata(&self.options.metadata)?;

        let response = self
            .http
            .execute(&self.endpoint, |client, url| {
                let request = client
                    .post(url)
                    .header("Tus-Resumable", TUS_VERSION)
                    .header("Upload-Length", length.to_string())
                    .body("");
                if metadata.is_empty() {
                    request
                } else {
                    request.header("Upload-Metadata", metadata.as_str())
                }
            })
            .await?;

        if !response.status().is_success() {
            return Err(status_error(response).await);
        }

        let location = response
            .headers()
            .get(LOCATION)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string)
            .ok_or_else(|| {
                ClientError::Upload("creation response has no Location header".to_string())
            })?;

        let base = Url::parse(&self.http.build_url(&self.endpoint))?;
        let url = base.join(&location)?.to_string();
        debug!("Created upload {} ({} bytes)", url, length);
        Ok(url)
    }

    /// Current server-side offset of the upload at `url`
    pub async fn offset(&self, url: &str) -> Result<u64> {
        let response = self
            .http
            .execute(url, |client, url| {
                client.head(url).header("Tus-Resumable", TUS_VERSION)
            })
            .await?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND || status == StatusCode::GONE {
            return Err(ClientError::NotFound(url.to_string()));
        }
        if !status.is_success() {
            return Err(status_error(response).await);
        }
        parse_offset(&response)
    }

    async fn patch(&self, url: &str, offset: u64, chunk: Bytes) -> Result<u64> {
        let response = self
            .http
            .execute(url, |client, url| {
                client
                    .patch(url)
                    .header("Tus-Resumable", TUS_VERSION)
                    .header("Upload-Offset", offset.to_string())
                    .header(CONTENT_TYPE, OFFSET_CONTENT_TYPE)
                    .body(chunk.clone())
            })
            .await?;

        if !response.status().is_success() {
            return Err(status_error(response).await);
        }
        parse_offset(&response)
    }

    async fn transfer(
        &self,
        url: String,
        mut offset: u64,
        length: u64,
        mut source: Source,
    ) -> Result<String> {
        let mut attempt = 0;
        self.report(offset, length);

        while offset < length {
            let chunk_len = (length - offset).min(self.options.chunk_size as u64) as usize;
            let chunk = source.read_chunk(offset, chunk_len).await?;
            if chunk.is_empty() {
                return Err(ClientError::Upload(format!(
                    "source ended at offset {} of {} bytes",
                    offset, length
                )));
            }

            match self.patch(&url, offset, chunk).await {
                Ok(new_offset) => {
                    if new_offset <= offset {
                        return Err(ClientError::Upload(format!(
                            "server did not advance past offset {}",
                            offset
                        )));
                    }
                    offset = new_offset;
                    attempt = 0;
                    self.report(offset.min(length), length);
                }
                Err(e) if e.is_retryable() && attempt < self.options.retry_delays.len() => {
                    let delay = self.options.retry_delays[attempt];
                    attempt += 1;
                    warn!(
                        "Chunk at offset {} of {} failed ({}), retry {} in {:?}",
                        offset, url, e, attempt, delay
                    );
                    tokio::time::sleep(delay).await;

                    match self.offset(&url).await {
                        Ok(server_offset) => offset = server_offset,
                        Err(e) if e.is_retryable() => {}
                        Err(e) => return Err(e),
                    }
                }
                Err(e) => return Err(e),
            }
        }

        info!("Upload {} complete ({} bytes)", url, length);
        Ok(url)
    }

    fn report(&self, sent: u64, total: u64) {
        if let Some(progress) = &self.options.progress {
            progress(sent, total);
        }
    }
}

fn parse_offset(response: &Response) -> Result<u64> {
    response
        .headers()
        .get("Upload-Offset")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.trim().parse::<u64>().ok())
        .ok_or_else(|| ClientError::Upload("missing or invalid Upload-Offset header".to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pairs(items: &[(&str, &str)]) -> Vec<(String, String)> {
        items
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_encode_metadata() {
        let header = encode_metadata(&pairs(&[
            ("filename", "snapshot.tar.gz"),
            ("environment", "python-cpu-env"),
            ("empty", ""),
        ]))
        .unwrap();

        assert_eq!(
            header,
            "filename c25hcHNob3QudGFyLmd6,environment cHl0aG9uLWNwdS1lbnY=,empty"
        );
    }

    #[test]
    fn test_decode_metadata() {
        let decoded =
            decode_metadata("filename c25hcHNob3QudGFyLmd6, empty ,name bXkgc25hcA==").unwrap();
        assert_eq!(
            decoded,
            pairs(&[
                ("filename", "snapshot.tar.gz"),
                ("empty", ""),
                ("name", "my snap"),
            ])
        );
    }

    #[test]
    fn test_invalid_metadata_key() {
        let err = encode_metadata(&pairs(&[("bad key", "v")])).unwrap_err();
        assert!(matches!(err, ClientError::Argument(_)));

        let err = encode_metadata(&pairs(&[("", "v")])).unwrap_err();
        assert!(matches!(err, ClientError::Argument(_)));

        assert!(decode_metadata("name !!!").is_err());
    }

    #[test]
    fn test_options_builder() {
        let options = TusOptions::default()
            .with_chunk_size(0)
            .with_metadata("name", "snap")
            .with_retry_delays(vec![]);

        assert_eq!(options.chunk_size, 1);
        assert_eq!(options.metadata, pairs(&[("name", "snap")]));
        assert!(options.retry_delays.is_empty());
        assert!(options.progress.is_none());
    }

    #[tokio::test]
    async fn test_memory_source_chunks() {
        let mut source = Source::Memory(Bytes::from_static(b"0123456789"));
        assert_eq!(source.read_chunk(0, 4).await.unwrap(), Bytes::from_static(b"0123"));
        assert_eq!(source.read_chunk(8, 4).await.unwrap(), Bytes::from_static(b"89"));
        assert!(source.read_chunk(12, 4).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_file_source_chunks() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("data.bin");
        tokio::fs::write(&path, b"abcdefgh").await.unwrap();

        let file = tokio::fs::File::open(&path).await.unwrap();
        let mut source = Source::File(file);
        assert_eq!(source.read_chunk(2, 3).await.unwrap(), Bytes::from_static(b"cde"));
        assert_eq!(source.read_chunk(6, 10).await.unwrap(), Bytes::from_static(b"gh"));
    }

    #[tokio::test]
    async fn test_fingerprint_tracks_size() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("data.bin");
        tokio::fs::write(&path, b"abc").await.unwrap();
        let first = fingerprint(&path).await.unwrap();
        assert!(first.contains("::3::"));

        tokio::fs::write(&path, b"abcdef").await.unwrap();
        let second = fingerprint(&path).await.unwrap();
        assert_ne!(first, second);
    }
}

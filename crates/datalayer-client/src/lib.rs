//! Datalayer Client - transport layer of the Datalayer Rust SDK
//!
//! This crate provides:
//! - HTTP client with bearer authentication, re-login, and failover
//! - Typed client errors
//! - Poll loops with a growing delay
//! - Resumable uploads over the tus protocol

pub mod error;
pub mod http;
pub mod poll;
pub mod tus;

pub use error::{ClientError, Result};
pub use http::{DatalayerHttpClient, HttpClientConfig};
pub use poll::{PollPolicy, poll_until};
pub use tus::{
    FileUploadStore, MemoryUploadStore, ProgressCallback, TusOptions, TusUploader, UploadStore,
};

// datalayer-sdk: typed client for the Datalayer IAM, Runtimes, and Spacer APIs

pub mod client;
pub mod config;
pub mod constants;
pub mod model;

pub use client::DatalayerClient;
pub use config::DatalayerClientConfig;
pub use datalayer_client::{
    ClientError, FileUploadStore, MemoryUploadStore, PollPolicy, ProgressCallback, Result,
    UploadStore,
};
pub use datalayer_common::Service;

//! HTTP retrieval for the fetcher and the provisioner.

mod client;

pub use client::{HttpClient, HttpClientConfig, HttpError};

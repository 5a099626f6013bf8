//! drive_client - A small client for Google Drive files.
//!
//! This library provides functionality to:
//! - Upload, update, download and delete files
//! - List files (one page) and fetch file metadata
//! - Create folders
//!
//! Every call is retried on transient service errors (429 and 5xx gateway
//! statuses) a fixed number of times with a fixed delay.
//!
//! # Example
//!
//! ```no_run
//! use drive_client::{DriveClient, DriveConfig, DEFAULT_PAGE_SIZE};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = DriveConfig::builder()
//!         .credentials_path("service-account.json")
//!         .resolve()?;
//!     let client = DriveClient::new(config)?;
//!
//!     let files = client.list_files(None, DEFAULT_PAGE_SIZE).await?;
//!     for file in files {
//!         println!("{}", file);
//!     }
//!
//!     Ok(())
//! }
//! ```

pub mod auth;
pub mod client;
pub mod config;
pub mod error;
pub mod models;
pub mod retry;

// Re-exports for convenience
pub use auth::{Authenticator, StaticToken, TokenProvider};
pub use client::{DriveClient, DEFAULT_PAGE_SIZE};
pub use config::{DriveConfig, DriveConfigBuilder};
pub use error::{DriveError, RequestError, Result};
pub use models::DriveFile;
pub use retry::RetryPolicy;

//! # pail-client
//!
//! Client for S3-compatible object storage using the legacy AWS
//! request signature.
//!
//! Requests are resolved against a region's addressing rules
//! (path-style or virtual-hosted), signed with HMAC-SHA1 per attempt,
//! and delivered through a transport that retries transient network
//! faults internally. Idempotent operations additionally run under an
//! attempt sequence that re-signs and retries transient server errors.
//!
//! ## Example
//!
//! ```rust,ignore
//! use pail_client::{Config, S3Client};
//! use pail_core::{Credentials, EU_WEST_1};
//!
//! #[tokio::main]
//! async fn main() -> pail_client::Result<()> {
//!     let credentials = Credentials::from_env()?;
//!     let client = S3Client::new(credentials, Config::new(EU_WEST_1))?;
//!
//!     client.put_object(
//!         "my-bucket",
//!         "hello.txt",
//!         &b"Hello, World!"[..],
//!         "text/plain",
//!         pail_client::Acl::Private,
//!     ).await?;
//!
//!     let data = client.get_object("my-bucket", "hello.txt").await?;
//!     println!("{}", String::from_utf8_lossy(&data));
//!     Ok(())
//! }
//! ```

mod client;
mod config;
mod error;
mod request;
mod sign;
mod types;

pub use client::S3Client;
pub use config::Config;
pub use error::{Result, S3Error};
pub use types::{Acl, CommonPrefix, Key, ListBucket, ListOptions, Owner};

// Re-export the building blocks callers configure the client with.
pub use pail_core::{AttemptStrategy, Credentials, Region, TransportOptions};

//! # pail-core
//!
//! The service-independent layer of the pail object-storage client:
//! credential resolution, the region endpoint table, the
//! attempt-sequence retry state machine, and a resilient HTTP transport
//! with bounded internal retries.
//!
//! ## Example
//!
//! ```rust,ignore
//! use pail_core::{Credentials, MetadataClient, RetryingTransport, TransportOptions};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), pail_core::CoreError> {
//!     let transport = RetryingTransport::new(TransportOptions::default())?;
//!     let metadata = MetadataClient::new(transport.clone());
//!
//!     // Explicit values win; environment and instance metadata follow.
//!     let credentials = Credentials::resolve(None, None, &metadata).await?;
//!     println!("authenticated as {}", credentials.access_key);
//!     Ok(())
//! }
//! ```

mod attempt;
mod credentials;
mod error;
mod region;
mod transport;

pub use attempt::{Attempt, AttemptStrategy};
pub use credentials::{Credentials, MetadataClient};
pub use error::{CoreError, Result};
pub use region::{
    Region, AP_NORTHEAST_1, AP_SOUTHEAST_1, AP_SOUTHEAST_2, EU_WEST_1, REGIONS, SA_EAST_1,
    US_EAST_1, US_WEST_1, US_WEST_2,
};
pub use transport::{
    Backoff, DefaultRetryPolicy, ExponentialBackoff, LinearBackoff, RetryPolicy,
    RetryingTransport, TransportOptions,
};

//! Credential resolution
//!
//! Credentials come from one of three sources, tried in order: values
//! passed in explicitly, the process environment, and the EC2-style
//! instance metadata service. Whatever source wins, the resulting
//! [`Credentials`] value is immutable for the life of the client.

use serde::Deserialize;
use tracing::debug;

use crate::error::{CoreError, Result};
use crate::transport::RetryingTransport;

/// An access key / secret key / optional session token triple
#[derive(Clone, Debug)]
pub struct Credentials {
    /// Access key ID
    pub access_key: String,
    /// Secret signing key
    pub secret_key: String,
    /// Session token for temporary credentials
    pub token: Option<String>,
}

impl Credentials {
    /// Create credentials from an access key and secret key
    pub fn new(access_key: impl Into<String>, secret_key: impl Into<String>) -> Self {
        Self {
            access_key: access_key.into(),
            secret_key: secret_key.into(),
            token: None,
        }
    }

    /// Attach a session token
    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    /// Read credentials from the environment.
    ///
    /// `AWS_ACCESS_KEY_ID` and `AWS_SECRET_ACCESS_KEY` are preferred,
    /// with `AWS_ACCESS_KEY` and `AWS_SECRET_KEY` as fallbacks.
    pub fn from_env() -> Result<Self> {
        let access_key = env_either("AWS_ACCESS_KEY_ID", "AWS_ACCESS_KEY").ok_or_else(|| {
            CoreError::Credentials(
                "AWS_ACCESS_KEY_ID or AWS_ACCESS_KEY not found in environment".into(),
            )
        })?;
        let secret_key = env_either("AWS_SECRET_ACCESS_KEY", "AWS_SECRET_KEY").ok_or_else(|| {
            CoreError::Credentials(
                "AWS_SECRET_ACCESS_KEY or AWS_SECRET_KEY not found in environment".into(),
            )
        })?;
        Ok(Self::new(access_key, secret_key))
    }

    /// Resolve credentials from explicit values, the environment, or
    /// the instance metadata service, in that priority order.
    pub async fn resolve(
        access_key: Option<&str>,
        secret_key: Option<&str>,
        metadata: &MetadataClient,
    ) -> Result<Self> {
        if let (Some(access), Some(secret)) = (access_key, secret_key) {
            if !access.is_empty() && !secret.is_empty() {
                return Ok(Self::new(access, secret));
            }
        }

        if let Ok(credentials) = Self::from_env() {
            return Ok(credentials);
        }

        debug!("no explicit or environment credentials, querying instance metadata");
        metadata.credentials().await.map_err(|err| {
            CoreError::Credentials(format!(
                "explicit, environment and instance metadata sources all failed ({err})"
            ))
        })
    }
}

fn env_either(primary: &str, fallback: &str) -> Option<String> {
    std::env::var(primary)
        .or_else(|_| std::env::var(fallback))
        .ok()
        .filter(|value| !value.is_empty())
}

/// Credential document served by the instance metadata service
#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct InstanceCredentials {
    access_key_id: String,
    secret_access_key: String,
    #[serde(default)]
    token: Option<String>,
}

const METADATA_BASE_URL: &str = "http://169.254.169.254";
const SECURITY_CREDENTIALS_PATH: &str = "latest/meta-data/iam/security-credentials/";

/// Client for the link-local instance metadata service
pub struct MetadataClient {
    transport: RetryingTransport,
    base_url: String,
}

impl MetadataClient {
    /// Metadata client against the standard link-local address
    pub fn new(transport: RetryingTransport) -> Self {
        Self::with_base_url(transport, METADATA_BASE_URL)
    }

    /// Metadata client against a different base URL
    pub fn with_base_url(transport: RetryingTransport, base_url: impl Into<String>) -> Self {
        let mut base_url = base_url.into();
        while base_url.ends_with('/') {
            base_url.pop();
        }
        Self {
            transport,
            base_url,
        }
    }

    /// Fetch one metadata path as text
    pub async fn fetch(&self, path: &str) -> Result<String> {
        let url = format!("{}/{}", self.base_url, path);
        let request = self.transport.http().get(&url).build()?;
        let response = self.transport.execute(request).await?;

        let status = response.status();
        if !status.is_success() {
            return Err(CoreError::Metadata {
                path: path.to_string(),
                status: status.as_u16(),
            });
        }
        Ok(response.text().await?)
    }

    /// Fetch the instance role's credentials.
    ///
    /// The role name is discovered first, then its credential document
    /// is fetched and decoded.
    pub async fn credentials(&self) -> Result<Credentials> {
        let role = self.fetch(SECURITY_CREDENTIALS_PATH).await?;
        let role = role.trim();

        let document = self
            .fetch(&format!("{SECURITY_CREDENTIALS_PATH}{role}"))
            .await?;
        let parsed: InstanceCredentials = serde_json::from_str(&document)?;

        let mut credentials = Credentials::new(parsed.access_key_id, parsed.secret_access_key);
        if let Some(token) = parsed.token.filter(|token| !token.is_empty()) {
            credentials = credentials.with_token(token);
        }
        Ok(credentials)
    }
}

//! Main client implementation

use std::collections::HashMap;

use bytes::Bytes;
use chrono::{DateTime, Utc};
use pail_core::{Credentials, RetryingTransport};
use reqwest::{Method, Response, StatusCode};
use serde::de::DeserializeOwned;
use tracing::{debug, instrument};
use url::Url;

use crate::config::Config;
use crate::error::{Result, S3Error};
use crate::request::{RequestSpec, ResolvedRequest};
use crate::sign::sign_request;
use crate::types::{Acl, Key, ListBucket, ListOptions};

const CREATE_BUCKET_CONFIGURATION: &str = r#"<CreateBucketConfiguration xmlns="http://s3.amazonaws.com/doc/2006-03-01/">
  <LocationConstraint>{region}</LocationConstraint>
</CreateBucketConfiguration>"#;

/// Object storage client
///
/// All state is immutable after construction; concurrent calls share
/// the credentials, region table and transport freely.
pub struct S3Client {
    credentials: Credentials,
    config: Config,
    transport: RetryingTransport,
}

impl S3Client {
    /// Create a client with the given credentials and configuration
    pub fn new(credentials: Credentials, config: Config) -> Result<Self> {
        let transport = RetryingTransport::new(config.transport.clone())?;
        Ok(Self {
            credentials,
            config,
            transport,
        })
    }

    /// Get the configuration
    pub fn config(&self) -> &Config {
        &self.config
    }

    // ==================== Bucket Operations ====================

    /// Create a bucket.
    ///
    /// Regions that demand a location constraint get the declaration in
    /// the request body.
    #[instrument(skip(self))]
    pub async fn create_bucket(&self, bucket: &str, acl: Acl) -> Result<()> {
        let mut spec = RequestSpec::new(Method::PUT, Some(bucket), "/")
            .header("x-amz-acl", acl.as_str());
        if self.config.region.s3_location_constraint {
            spec = spec.payload(
                CREATE_BUCKET_CONFIGURATION.replace("{region}", self.config.region.name),
            );
        }
        self.execute_once(&spec).await.map(drop)
    }

    /// Delete an empty bucket
    #[instrument(skip(self))]
    pub async fn delete_bucket(&self, bucket: &str) -> Result<()> {
        let spec = RequestSpec::new(Method::DELETE, Some(bucket), "/");
        self.execute_with_attempts(&spec).await.map(drop)
    }

    // ==================== Object Operations ====================

    /// Retrieve an object's content
    #[instrument(skip(self))]
    pub async fn get_object(&self, bucket: &str, key: &str) -> Result<Bytes> {
        let spec = RequestSpec::new(Method::GET, Some(bucket), key);
        let response = self.execute_with_attempts(&spec).await?;
        Ok(response.bytes().await?)
    }

    /// Upload an object
    #[instrument(skip(self, data))]
    pub async fn put_object(
        &self,
        bucket: &str,
        key: &str,
        data: impl Into<Bytes>,
        content_type: &str,
        acl: Acl,
    ) -> Result<()> {
        let spec = RequestSpec::new(Method::PUT, Some(bucket), key)
            .header("content-type", content_type)
            .header("x-amz-acl", acl.as_str())
            .payload(data);
        self.execute_once(&spec).await.map(drop)
    }

    /// Upload an object with caller-controlled headers.
    ///
    /// Defaults (`content-type: application/octet-stream`, private ACL)
    /// apply unless the caller's headers override them.
    #[instrument(skip(self, data, headers))]
    pub async fn put_object_with_headers(
        &self,
        bucket: &str,
        key: &str,
        data: impl Into<Bytes>,
        headers: impl IntoIterator<Item = (String, String)>,
    ) -> Result<()> {
        let mut spec = RequestSpec::new(Method::PUT, Some(bucket), key)
            .header("content-type", "application/octet-stream")
            .header("x-amz-acl", Acl::Private.as_str());
        for (name, value) in headers {
            spec = spec.header(name, value);
        }
        spec = spec.payload(data);
        self.execute_once(&spec).await.map(drop)
    }

    /// Delete an object
    #[instrument(skip(self))]
    pub async fn delete_object(&self, bucket: &str, key: &str) -> Result<()> {
        let spec = RequestSpec::new(Method::DELETE, Some(bucket), key);
        self.execute_once(&spec).await.map(drop)
    }

    /// List objects in a bucket, one page
    #[instrument(skip(self))]
    pub async fn list_objects(&self, bucket: &str, options: ListOptions) -> Result<ListBucket> {
        let mut spec = RequestSpec::new(Method::GET, Some(bucket), "/");
        if let Some(prefix) = options.prefix {
            spec = spec.param("prefix", prefix);
        }
        if let Some(delimiter) = options.delimiter {
            spec = spec.param("delimiter", delimiter);
        }
        if let Some(marker) = options.marker {
            spec = spec.param("marker", marker);
        }
        if let Some(max_keys) = options.max_keys {
            spec = spec.param("max-keys", max_keys.to_string());
        }

        let response = self.execute_with_attempts(&spec).await?;
        decode_xml(response).await
    }

    /// Every key in the bucket, following pagination markers
    #[instrument(skip(self))]
    pub async fn bucket_contents(&self, bucket: &str) -> Result<HashMap<String, Key>> {
        let mut contents = HashMap::new();
        let mut marker: Option<String> = None;

        loop {
            let mut options = ListOptions::default().with_max_keys(1000);
            if let Some(marker) = &marker {
                options = options.with_marker(marker.clone());
            }

            let page = self.list_objects(bucket, options).await?;
            let next = page
                .next_marker
                .clone()
                .or_else(|| page.contents.last().map(|key| key.key.clone()));
            for key in page.contents {
                contents.insert(key.key.clone(), key);
            }

            if !page.is_truncated {
                return Ok(contents);
            }
            marker = next;
        }
    }

    // ==================== URLs ====================

    /// Non-signed URL for an object; usable only if the object is
    /// publicly readable
    pub fn object_url(&self, bucket: &str, key: &str) -> Result<Url> {
        let spec = RequestSpec::new(Method::GET, Some(bucket), key);
        let resolved = spec.resolve(&self.config.region)?;
        Ok(resolved.url())
    }

    /// Signed URL granting retrieval of an object to any holder until
    /// `expires`
    pub fn signed_url(&self, bucket: &str, key: &str, expires: DateTime<Utc>) -> Result<Url> {
        let spec = RequestSpec::new(Method::GET, Some(bucket), key)
            .param("Expires", expires.timestamp().to_string());
        let mut resolved = spec.resolve(&self.config.region)?;
        sign_request(&self.credentials, &mut resolved);
        Ok(resolved.url())
    }

    // ==================== Request Pipeline ====================

    /// Resolve and deliver a request once (atop the transport's own
    /// retries for network faults)
    async fn execute_once(&self, spec: &RequestSpec) -> Result<Response> {
        let resolved = spec.resolve(&self.config.region)?;
        self.run(&resolved).await
    }

    /// Resolve a request once, then deliver under an attempt sequence,
    /// re-signing every try and retrying transient failures
    async fn execute_with_attempts(&self, spec: &RequestSpec) -> Result<Response> {
        let resolved = spec.resolve(&self.config.region)?;
        let mut attempt = self.config.attempts.start();

        while attempt.next().await {
            match self.run(&resolved).await {
                Ok(response) => return Ok(response),
                Err(err) => {
                    if err.is_transient(&self.config.transient_error_codes) && attempt.has_next() {
                        debug!(error = %err, attempts = attempt.count(), "retrying operation");
                        continue;
                    }
                    return Err(err);
                }
            }
        }
        unreachable!("an attempt sequence always grants the first try")
    }

    /// Sign with a fresh timestamp and deliver through the transport.
    ///
    /// Signing works on a per-try copy: the server's clock-skew
    /// tolerance means a previous try's `Date` must never be reused, so
    /// every delivery recomputes it.
    async fn run(&self, prepared: &ResolvedRequest) -> Result<Response> {
        let mut request = prepared.clone();
        let host = request.host();
        request.headers.insert("host".to_string(), host);
        request
            .headers
            .insert("date".to_string(), http_date(Utc::now()));
        sign_request(&self.credentials, &mut request);

        let url = request.url();
        debug!(method = %request.method, url = %url, "sending request");

        let mut builder = self
            .transport
            .http()
            .request(request.method.clone(), url)
            .header("user-agent", self.config.user_agent.as_str());
        for (name, value) in &request.headers {
            // The payload length travels with the body, not as a
            // caller-supplied header.
            if name == "content-length" {
                continue;
            }
            builder = builder.header(name.as_str(), value.as_str());
        }
        if let Some(payload) = &request.payload {
            builder = builder.body(payload.clone());
        }

        let response = self.transport.execute(builder.build()?).await?;

        let status = response.status();
        if status != StatusCode::OK && status != StatusCode::NO_CONTENT {
            return Err(S3Error::from_response(response).await);
        }
        Ok(response)
    }
}

/// RFC1123 timestamp for the `Date` header
fn http_date(now: DateTime<Utc>) -> String {
    now.format("%a, %d %b %Y %H:%M:%S GMT").to_string()
}

async fn decode_xml<T: DeserializeOwned>(response: Response) -> Result<T> {
    let body = response.text().await?;
    quick_xml::de::from_str(&body).map_err(|err| S3Error::Decode(err.to_string()))
}

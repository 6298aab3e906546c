//! Outbound request descriptors
//!
//! A [`RequestSpec`] is the unresolved description of one API call:
//! method, optional bucket, resource path, query parameters, headers,
//! payload. [`RequestSpec::resolve`] turns it into a
//! [`ResolvedRequest`] with the addressing decision applied; the
//! resolved value is what gets signed (fresh, per attempt) and
//! delivered. Resolution never mutates the original descriptor, so a
//! rejected bucket name leaves nothing half-rewritten.

use std::collections::BTreeMap;

use bytes::Bytes;
use pail_core::Region;
use reqwest::Method;
use url::Url;

use crate::error::{Result, S3Error};

/// Characters that would let a bucket name escape its host-name slot
const BUCKET_INJECTION_CHARS: [char; 3] = ['/', ':', '@'];

/// An unresolved API call
#[derive(Clone, Debug)]
pub(crate) struct RequestSpec {
    pub method: Method,
    /// Target bucket; `None` addresses the account-level endpoint
    pub bucket: Option<String>,
    pub path: String,
    pub params: BTreeMap<String, String>,
    pub headers: BTreeMap<String, String>,
    pub payload: Option<Bytes>,
}

impl RequestSpec {
    pub fn new(method: Method, bucket: Option<&str>, path: impl Into<String>) -> Self {
        Self {
            method,
            bucket: bucket.map(String::from),
            path: path.into(),
            params: BTreeMap::new(),
            headers: BTreeMap::new(),
            payload: None,
        }
    }

    pub fn param(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.params.insert(key.into(), value.into());
        self
    }

    /// Set a header. Names are case-insensitive; a repeated name
    /// replaces the earlier value.
    pub fn header(mut self, name: impl AsRef<str>, value: impl Into<String>) -> Self {
        self.headers
            .insert(name.as_ref().to_lowercase(), value.into());
        self
    }

    pub fn payload(mut self, payload: impl Into<Bytes>) -> Self {
        self.payload = Some(payload.into());
        self
    }

    /// Apply the region's addressing rules.
    ///
    /// With no bucket, the service endpoint is used and the path passes
    /// through. A bucket routes either path-style (bucket becomes the
    /// leading path segment) or virtual-hosted (bucket substituted into
    /// the region's endpoint template). Either way the sign path is the
    /// path-style concatenation, since the server computes signatures
    /// as if path-style addressing were in use.
    pub fn resolve(&self, region: &Region) -> Result<ResolvedRequest> {
        let mut path = if self.path.starts_with('/') {
            self.path.clone()
        } else {
            format!("/{}", self.path)
        };
        let mut sign_path = path.clone();

        let endpoint = match &self.bucket {
            None => region.s3_endpoint.to_string(),
            Some(raw) => {
                let has_bucket_endpoint = !region.s3_bucket_endpoint.is_empty();
                let bucket = if has_bucket_endpoint || region.s3_lowercase_bucket {
                    raw.to_lowercase()
                } else {
                    raw.clone()
                };

                sign_path = format!("/{bucket}{sign_path}");

                if has_bucket_endpoint {
                    if bucket.contains(BUCKET_INJECTION_CHARS) {
                        return Err(S3Error::Addressing(format!("bad bucket name {bucket:?}")));
                    }
                    region.s3_bucket_endpoint.replace("${bucket}", &bucket)
                } else {
                    path = format!("/{bucket}{path}");
                    region.s3_endpoint.to_string()
                }
            }
        };

        let base = Url::parse(&endpoint)
            .map_err(|err| S3Error::Addressing(format!("bad endpoint URL {endpoint:?}: {err}")))?;

        Ok(ResolvedRequest {
            method: self.method.clone(),
            base,
            path,
            sign_path,
            params: self.params.clone(),
            headers: self.headers.clone(),
            payload: self.payload.clone(),
        })
    }
}

/// A call with its addressing fixed, ready to sign and deliver
#[derive(Clone, Debug)]
pub(crate) struct ResolvedRequest {
    pub method: Method,
    pub base: Url,
    pub path: String,
    /// Bucket-qualified path used in the signature base string
    pub sign_path: String,
    pub params: BTreeMap<String, String>,
    pub headers: BTreeMap<String, String>,
    pub payload: Option<Bytes>,
}

impl ResolvedRequest {
    /// Host header value for the resolved endpoint
    pub fn host(&self) -> String {
        let host = self.base.host_str().unwrap_or_default();
        match self.base.port() {
            Some(port) => format!("{host}:{port}"),
            None => host.to_string(),
        }
    }

    /// Final URL: base, rewritten path, encoded query
    pub fn url(&self) -> Url {
        let mut url = self.base.clone();
        url.set_path(&self.path);
        if self.params.is_empty() {
            url.set_query(None);
        } else {
            url.query_pairs_mut().clear().extend_pairs(&self.params);
        }
        url
    }
}

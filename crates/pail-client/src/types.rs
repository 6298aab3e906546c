//! Response shapes and request options

use chrono::{DateTime, Utc};
use serde::Deserialize;

/// Canned access control policies applied at creation/upload time
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Acl {
    #[default]
    Private,
    PublicRead,
    PublicReadWrite,
    AuthenticatedRead,
}

impl Acl {
    pub fn as_str(self) -> &'static str {
        match self {
            Acl::Private => "private",
            Acl::PublicRead => "public-read",
            Acl::PublicReadWrite => "public-read-write",
            Acl::AuthenticatedRead => "authenticated-read",
        }
    }
}

/// Owner of an object
#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Owner {
    #[serde(rename = "ID")]
    pub id: String,
    #[serde(default)]
    pub display_name: String,
}

/// One object entry in a bucket listing
#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Key {
    pub key: String,
    pub last_modified: DateTime<Utc>,
    pub e_tag: String,
    pub size: u64,
    #[serde(default)]
    pub storage_class: String,
    #[serde(default)]
    pub owner: Option<Owner>,
}

/// A grouped prefix in a delimited listing
#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct CommonPrefix {
    pub prefix: String,
}

/// Results of a bucket listing
#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ListBucket {
    pub name: String,
    #[serde(default)]
    pub prefix: String,
    #[serde(default)]
    pub delimiter: String,
    #[serde(default)]
    pub marker: String,
    #[serde(default)]
    pub next_marker: Option<String>,
    #[serde(default)]
    pub max_keys: i64,
    /// True when more keys and prefixes exist than fit in `max_keys`
    #[serde(default)]
    pub is_truncated: bool,
    #[serde(default)]
    pub contents: Vec<Key>,
    #[serde(default)]
    pub common_prefixes: Vec<CommonPrefix>,
}

/// Options for listing objects in a bucket
#[derive(Clone, Debug, Default)]
pub struct ListOptions {
    /// Limit results to keys beginning with this prefix
    pub prefix: Option<String>,
    /// Group keys sharing a prefix up to this delimiter
    pub delimiter: Option<String>,
    /// Return keys alphabetically after this marker
    pub marker: Option<String>,
    /// Maximum keys plus common prefixes per page
    pub max_keys: Option<u32>,
}

impl ListOptions {
    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = Some(prefix.into());
        self
    }

    pub fn with_delimiter(mut self, delimiter: impl Into<String>) -> Self {
        self.delimiter = Some(delimiter.into());
        self
    }

    pub fn with_marker(mut self, marker: impl Into<String>) -> Self {
        self.marker = Some(marker.into());
        self
    }

    pub fn with_max_keys(mut self, max_keys: u32) -> Self {
        self.max_keys = Some(max_keys);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn list_bucket_parses() {
        let xml = r#"<?xml version="1.0" encoding="UTF-8"?>
<ListBucketResult xmlns="http://s3.amazonaws.com/doc/2006-03-01/">
    <Name>sample-bucket</Name>
    <Prefix>photos/</Prefix>
    <Marker></Marker>
    <MaxKeys>1000</MaxKeys>
    <Delimiter>/</Delimiter>
    <IsTruncated>false</IsTruncated>
    <Contents>
        <Key>photos/puppy.jpg</Key>
        <LastModified>2006-01-01T12:00:00.000Z</LastModified>
        <ETag>&quot;828ef3fdfa96f00ad9f27c383fc9ac7f&quot;</ETag>
        <Size>144113</Size>
        <StorageClass>STANDARD</StorageClass>
        <Owner>
            <ID>8a6925ce4adf588a4f21c32aa379004fef</ID>
            <DisplayName>webfile</DisplayName>
        </Owner>
    </Contents>
    <CommonPrefixes>
        <Prefix>photos/2006/</Prefix>
    </CommonPrefixes>
</ListBucketResult>"#;

        let listing: ListBucket = quick_xml::de::from_str(xml).unwrap();
        assert_eq!(listing.name, "sample-bucket");
        assert_eq!(listing.prefix, "photos/");
        assert_eq!(listing.max_keys, 1000);
        assert!(!listing.is_truncated);
        assert_eq!(listing.contents.len(), 1);

        let entry = &listing.contents[0];
        assert_eq!(entry.key, "photos/puppy.jpg");
        assert_eq!(entry.size, 144113);
        assert_eq!(entry.e_tag, "\"828ef3fdfa96f00ad9f27c383fc9ac7f\"");
        assert_eq!(
            entry.owner.as_ref().unwrap().id,
            "8a6925ce4adf588a4f21c32aa379004fef"
        );

        assert_eq!(listing.common_prefixes.len(), 1);
        assert_eq!(listing.common_prefixes[0].prefix, "photos/2006/");
    }

    #[test]
    fn truncated_listing_carries_the_next_marker() {
        let xml = r#"<ListBucketResult>
    <Name>b</Name>
    <IsTruncated>true</IsTruncated>
    <NextMarker>photos/zebra.jpg</NextMarker>
</ListBucketResult>"#;

        let listing: ListBucket = quick_xml::de::from_str(xml).unwrap();
        assert!(listing.is_truncated);
        assert_eq!(listing.next_marker.as_deref(), Some("photos/zebra.jpg"));
        assert!(listing.contents.is_empty());
    }

    #[test]
    fn acl_header_values() {
        assert_eq!(Acl::Private.as_str(), "private");
        assert_eq!(Acl::PublicRead.as_str(), "public-read");
        assert_eq!(Acl::default(), Acl::Private);
    }
}

//! Object storage client for Cloudflare R2 (S3-compatible API).
//!
//! Talks plain HTTPS with SigV4-signed requests rather than pulling in a
//! full AWS SDK; the handful of operations the catalog needs (put, copy,
//! delete, prefix listing) map to single S3 calls.

pub mod sigv4;

use chrono::Utc;
use lineup_core::UserId;
use secrecy::{ExposeSecret, SecretString};
use thiserror::Error;

use crate::config::StorageConfig;
use sigv4::{SigningParams, EMPTY_PAYLOAD_HASH};

/// Hard cap on a single uploaded image.
pub const MAX_UPLOAD_BYTES: usize = 10 * 1024 * 1024;

const S3_SERVICE: &str = "s3";

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("storage request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("storage API returned {status}: {body}")]
    Api { status: u16, body: String },

    #[error("invalid object key: {0}")]
    InvalidKey(String),

    #[error("unexpected storage response: {0}")]
    Response(String),
}

/// One page of a prefix listing.
#[derive(Debug, Default)]
pub struct ListPage {
    pub keys: Vec<String>,
    pub next_continuation_token: Option<String>,
}

pub struct StorageClient {
    http: reqwest::Client,
    endpoint: String,
    host: String,
    bucket: String,
    region: String,
    access_key_id: String,
    secret_access_key: SecretString,
    public_base_url: String,
}

impl StorageClient {
    pub fn new(config: &StorageConfig) -> Result<Self, StorageError> {
        let endpoint = config.endpoint.trim_end_matches('/').to_string();
        let host = endpoint
            .strip_prefix("https://")
            .or_else(|| endpoint.strip_prefix("http://"))
            .unwrap_or(&endpoint)
            .to_string();

        let http = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(30))
            .build()?;

        Ok(Self {
            http,
            endpoint,
            host,
            bucket: config.bucket.clone(),
            region: config.region.clone(),
            access_key_id: config.access_key_id.clone(),
            secret_access_key: config.secret_access_key.clone(),
            public_base_url: config.public_base_url.trim_end_matches('/').to_string(),
        })
    }

    /// URL an object is served from via the public bucket domain.
    #[must_use]
    pub fn public_url(&self, key: &str) -> String {
        format!("{}/{}", self.public_base_url, sigv4::uri_encode(key, false))
    }

    /// Upload an object.
    pub async fn put_object(
        &self,
        key: &str,
        content_type: &str,
        body: Vec<u8>,
    ) -> Result<(), StorageError> {
        let hash = sigv4::payload_hash(&body);
        let mut headers = self.base_headers(&hash);
        headers.push(("content-type".to_string(), content_type.to_string()));

        let response = self
            .signed_request(reqwest::Method::PUT, key, &[], headers, &hash)?
            .header("content-type", content_type)
            .body(body)
            .send()
            .await?;

        Self::check_status(response).await.map(|_| ())
    }

    /// Server-side copy between keys in the same bucket.
    pub async fn copy_object(&self, from_key: &str, to_key: &str) -> Result<(), StorageError> {
        let source = format!(
            "/{}/{}",
            self.bucket,
            sigv4::uri_encode(from_key, false)
        );
        let mut headers = self.base_headers(EMPTY_PAYLOAD_HASH);
        headers.push(("x-amz-copy-source".to_string(), source.clone()));

        let response = self
            .signed_request(reqwest::Method::PUT, to_key, &[], headers, EMPTY_PAYLOAD_HASH)?
            .header("x-amz-copy-source", source)
            .send()
            .await?;

        Self::check_status(response).await.map(|_| ())
    }

    /// Delete an object. S3 treats deleting a missing key as success.
    pub async fn delete_object(&self, key: &str) -> Result<(), StorageError> {
        let headers = self.base_headers(EMPTY_PAYLOAD_HASH);
        let response = self
            .signed_request(reqwest::Method::DELETE, key, &[], headers, EMPTY_PAYLOAD_HASH)?
            .send()
            .await?;
        Self::check_status(response).await.map(|_| ())
    }

    /// One page of keys under a prefix (ListObjectsV2).
    pub async fn list_prefix(
        &self,
        prefix: &str,
        continuation_token: Option<&str>,
    ) -> Result<ListPage, StorageError> {
        let mut query: Vec<(&str, &str)> = vec![("list-type", "2"), ("prefix", prefix)];
        if let Some(token) = continuation_token {
            query.push(("continuation-token", token));
        }

        let headers = self.base_headers(EMPTY_PAYLOAD_HASH);
        let response = self
            .signed_request(reqwest::Method::GET, "", &query, headers, EMPTY_PAYLOAD_HASH)?
            .send()
            .await?;
        let body = Self::check_status(response).await?;

        parse_list_response(&body)
    }

    /// Delete every object under a prefix, paging through the listing.
    /// Returns the number of objects removed.
    pub async fn delete_prefix(&self, prefix: &str) -> Result<u64, StorageError> {
        if prefix.is_empty() || !prefix.ends_with('/') {
            return Err(StorageError::InvalidKey(format!(
                "refusing to bulk-delete non-directory prefix {prefix:?}"
            )));
        }

        let mut deleted = 0u64;
        let mut token: Option<String> = None;
        loop {
            let page = self.list_prefix(prefix, token.as_deref()).await?;
            for key in &page.keys {
                self.delete_object(key).await?;
                deleted += 1;
            }
            match page.next_continuation_token {
                Some(next) => token = Some(next),
                None => break,
            }
        }
        Ok(deleted)
    }

    fn base_headers(&self, payload_hash: &str) -> Vec<(String, String)> {
        vec![
            ("host".to_string(), self.host.clone()),
            ("x-amz-content-sha256".to_string(), payload_hash.to_string()),
            ("x-amz-date".to_string(), sigv4::amz_date(Utc::now())),
        ]
    }

    /// Build a request with the SigV4 `Authorization` header attached.
    /// `key` may be empty for bucket-level operations.
    fn signed_request(
        &self,
        method: reqwest::Method,
        key: &str,
        query: &[(&str, &str)],
        headers: Vec<(String, String)>,
        payload_hash: &str,
    ) -> Result<reqwest::RequestBuilder, StorageError> {
        let encoded_key = sigv4::uri_encode(key, false);
        let canonical_uri = format!("/{}/{}", self.bucket, encoded_key);
        let canonical_query = sigv4::canonical_query_string(query);

        let amz_date = headers
            .iter()
            .find(|(name, _)| name == "x-amz-date")
            .map(|(_, value)| value.clone())
            .ok_or_else(|| StorageError::Response("missing x-amz-date header".into()))?;
        let datetime = chrono::NaiveDateTime::parse_from_str(&amz_date, "%Y%m%dT%H%M%SZ")
            .map_err(|err| StorageError::Response(format!("bad x-amz-date: {err}")))?
            .and_utc();

        let params = SigningParams {
            access_key_id: &self.access_key_id,
            secret_access_key: self.secret_access_key.expose_secret(),
            region: &self.region,
            service: S3_SERVICE,
            datetime,
        };
        let authorization = sigv4::authorization_header(
            &params,
            method.as_str(),
            &canonical_uri,
            &canonical_query,
            &headers,
            payload_hash,
        );

        let mut url = format!("{}{}", self.endpoint, canonical_uri);
        if !canonical_query.is_empty() {
            url.push('?');
            url.push_str(&canonical_query);
        }

        Ok(self
            .http
            .request(method, url)
            .header("authorization", authorization)
            .header("x-amz-date", amz_date)
            .header("x-amz-content-sha256", payload_hash))
    }

    async fn check_status(response: reqwest::Response) -> Result<String, StorageError> {
        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        if status.is_success() {
            Ok(body)
        } else {
            Err(StorageError::Api {
                status: status.as_u16(),
                body: body.chars().take(512).collect(),
            })
        }
    }
}

/// Root of every key belonging to one account.
#[must_use]
pub fn owner_prefix(owner_id: UserId) -> String {
    format!("users/{owner_id}/")
}

/// Key for a freshly uploaded, not-yet-cataloged image.
#[must_use]
pub fn unprocessed_key(owner_id: UserId, extension: &str) -> String {
    format!(
        "users/{owner_id}/unprocessed/{}.{extension}",
        uuid::Uuid::new_v4()
    )
}

/// Destination key when an unprocessed image becomes a product image.
/// Keeps the original file name so only the directory changes.
pub fn product_key_from_unprocessed(key: &str, owner_id: UserId) -> Result<String, StorageError> {
    let prefix = format!("users/{owner_id}/unprocessed/");
    let file_name = key
        .strip_prefix(&prefix)
        .ok_or_else(|| StorageError::InvalidKey(format!("key {key:?} is not an unprocessed image for this account")))?;
    if file_name.is_empty() || file_name.contains('/') {
        return Err(StorageError::InvalidKey(format!("malformed key {key:?}")));
    }
    Ok(format!("users/{owner_id}/products/{file_name}"))
}

/// Reject keys outside the owner's namespace or containing path tricks.
pub fn validate_owned_key(key: &str, owner_id: UserId) -> Result<(), StorageError> {
    let prefix = owner_prefix(owner_id);
    if !key.starts_with(&prefix) {
        return Err(StorageError::InvalidKey(format!(
            "key {key:?} does not belong to this account"
        )));
    }
    if key.contains("..") || key.contains("//") || key.ends_with('/') {
        return Err(StorageError::InvalidKey(format!("malformed key {key:?}")));
    }
    Ok(())
}

/// File extension for an accepted image content type, `None` otherwise.
#[must_use]
pub fn extension_for_content_type(content_type: &str) -> Option<&'static str> {
    match content_type {
        "image/jpeg" => Some("jpg"),
        "image/png" => Some("png"),
        "image/webp" => Some("webp"),
        "image/gif" => Some("gif"),
        _ => None,
    }
}

/// Minimal ListObjectsV2 response reader. Pulls out `<Key>` elements and
/// the continuation token without a full XML parser; S3 list responses do
/// not nest these tags.
fn parse_list_response(xml: &str) -> Result<ListPage, StorageError> {
    if !xml.contains("<ListBucketResult") {
        return Err(StorageError::Response(
            "response is not a ListBucketResult document".into(),
        ));
    }
    let keys = extract_tag_values(xml, "Key")
        .into_iter()
        .map(|raw| xml_unescape(&raw))
        .collect();
    let truncated = extract_tag_values(xml, "IsTruncated")
        .first()
        .is_some_and(|value| value == "true");
    let next_continuation_token = if truncated {
        extract_tag_values(xml, "NextContinuationToken")
            .into_iter()
            .next()
            .map(|raw| xml_unescape(&raw))
    } else {
        None
    };
    Ok(ListPage {
        keys,
        next_continuation_token,
    })
}

fn extract_tag_values(xml: &str, tag: &str) -> Vec<String> {
    let open = format!("<{tag}>");
    let close = format!("</{tag}>");
    let mut values = Vec::new();
    let mut rest = xml;
    while let Some(start) = rest.find(&open) {
        rest = &rest[start + open.len()..];
        let Some(end) = rest.find(&close) else { break };
        values.push(rest[..end].to_string());
        rest = &rest[end + close.len()..];
    }
    values
}

fn xml_unescape(input: &str) -> String {
    input
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&apos;", "'")
        .replace("&amp;", "&")
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn owner() -> UserId {
        UserId::new(42)
    }

    #[test]
    fn test_owner_prefix_shape() {
        assert_eq!(owner_prefix(owner()), "users/42/");
    }

    #[test]
    fn test_unprocessed_key_layout() {
        let key = unprocessed_key(owner(), "webp");
        assert!(key.starts_with("users/42/unprocessed/"));
        assert!(key.ends_with(".webp"));
        validate_owned_key(&key, owner()).unwrap();
    }

    #[test]
    fn test_product_key_from_unprocessed() {
        let moved =
            product_key_from_unprocessed("users/42/unprocessed/abc123.png", owner()).unwrap();
        assert_eq!(moved, "users/42/products/abc123.png");
    }

    #[test]
    fn test_product_key_rejects_foreign_owner() {
        let err = product_key_from_unprocessed("users/7/unprocessed/abc.png", owner());
        assert!(matches!(err, Err(StorageError::InvalidKey(_))));
    }

    #[test]
    fn test_product_key_rejects_nested_path() {
        let err = product_key_from_unprocessed("users/42/unprocessed/a/b.png", owner());
        assert!(matches!(err, Err(StorageError::InvalidKey(_))));
    }

    #[test]
    fn test_validate_owned_key_rejects_traversal() {
        assert!(validate_owned_key("users/42/../41/products/x.png", owner()).is_err());
        assert!(validate_owned_key("users/41/products/x.png", owner()).is_err());
        assert!(validate_owned_key("users/42/products/", owner()).is_err());
        assert!(validate_owned_key("users/42/products/x.png", owner()).is_ok());
    }

    #[test]
    fn test_extension_for_content_type() {
        assert_eq!(extension_for_content_type("image/jpeg"), Some("jpg"));
        assert_eq!(extension_for_content_type("image/png"), Some("png"));
        assert_eq!(extension_for_content_type("image/svg+xml"), None);
        assert_eq!(extension_for_content_type("application/pdf"), None);
    }

    #[test]
    fn test_parse_list_response_page() {
        let xml = r#"<?xml version="1.0" encoding="UTF-8"?>
<ListBucketResult xmlns="http://s3.amazonaws.com/doc/2006-03-01/">
  <Name>lineup</Name>
  <IsTruncated>true</IsTruncated>
  <NextContinuationToken>token&amp;1</NextContinuationToken>
  <Contents><Key>users/42/products/a.png</Key><Size>10</Size></Contents>
  <Contents><Key>users/42/products/b &amp; c.png</Key><Size>11</Size></Contents>
</ListBucketResult>"#;

        let page = parse_list_response(xml).unwrap();
        assert_eq!(
            page.keys,
            vec![
                "users/42/products/a.png".to_string(),
                "users/42/products/b & c.png".to_string()
            ]
        );
        assert_eq!(page.next_continuation_token.as_deref(), Some("token&1"));
    }

    #[test]
    fn test_parse_list_response_final_page() {
        let xml = r#"<ListBucketResult><IsTruncated>false</IsTruncated><Contents><Key>k</Key></Contents></ListBucketResult>"#;
        let page = parse_list_response(xml).unwrap();
        assert_eq!(page.keys, vec!["k".to_string()]);
        assert!(page.next_continuation_token.is_none());
    }

    #[test]
    fn test_parse_list_response_rejects_other_documents() {
        assert!(parse_list_response("<Error><Code>NoSuchBucket</Code></Error>").is_err());
    }
}

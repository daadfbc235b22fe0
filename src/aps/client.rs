//! reqwest client for the platform REST API

use async_trait::async_trait;
use bytes::Bytes;
use reqwest::{Client, Response};
use serde_json::json;
use std::time::Duration;
use tracing::{debug, instrument};
use url::Url;

use super::types::{
    BucketDetails, CreateBucket, Credentials, JobRequest, JobResponse, ListQuery, Manifest,
    ObjectDetails, ObjectsPage, Region, ScopeSet, SignedDownload, SignedUpload, ThumbnailSize,
};
use super::{ApsError, Authenticator, ContentSource, DerivativeService, ObjectStorage, Result};

/// Size of each part in a signed S3 upload
pub const UPLOAD_CHUNK_BYTES: usize = 5 * 1024 * 1024;

/// Most part URLs the service hands out per request
const MAX_URLS_PER_REQUEST: usize = 25;

/// HTTP client configuration
#[derive(Debug, Clone)]
pub struct ClientSettings {
    pub base_url: String,
    pub client_id: String,
    pub client_secret: String,
    pub request_timeout: Duration,
    pub user_agent: String,
}

impl Default for ClientSettings {
    fn default() -> Self {
        Self {
            base_url: "https://developer.api.autodesk.com".to_string(),
            client_id: String::new(),
            client_secret: String::new(),
            request_timeout: Duration::from_secs(60),
            user_agent: concat!("apsgate/", env!("CARGO_PKG_VERSION")).to_string(),
        }
    }
}

/// Live platform client
pub struct ApsClient {
    client: Client,
    base: Url,
    settings: ClientSettings,
}

impl ApsClient {
    pub fn new(settings: ClientSettings) -> Result<Self> {
        let base = Url::parse(&settings.base_url)
            .map_err(|e| ApsError::InvalidUrl(format!("{}: {}", settings.base_url, e)))?;

        let client = Client::builder()
            .timeout(settings.request_timeout)
            .user_agent(&settings.user_agent)
            .build()?;

        Ok(Self {
            client,
            base,
            settings,
        })
    }

    /// Build an endpoint URL, percent-encoding every segment
    fn endpoint(&self, segments: &[&str]) -> Result<Url> {
        let mut url = self.base.clone();
        url.path_segments_mut()
            .map_err(|_| ApsError::InvalidUrl(self.settings.base_url.clone()))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    async fn check(response: Response, resource: &str) -> Result<Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        debug!(resource, %status, "Platform request failed");
        Err(ApsError::from_status(status, resource, body))
    }

    async fn request_upload_urls(
        &self,
        token: &str,
        url: &Url,
        key: &str,
        parts: usize,
        first_part: usize,
        upload_key: Option<&str>,
    ) -> Result<SignedUpload> {
        let mut request = self.client.get(url.clone()).bearer_auth(token).query(&[
            ("parts", parts.to_string()),
            ("firstPart", first_part.to_string()),
        ]);
        if let Some(upload_key) = upload_key {
            request = request.query(&[("uploadKey", upload_key)]);
        }

        let signed: SignedUpload = Self::check(request.send().await?, key).await?.json().await?;
        if signed.urls.len() < parts {
            return Err(ApsError::InvalidResponse(format!(
                "expected {} upload URLs for '{}', got {}",
                parts,
                key,
                signed.urls.len()
            )));
        }
        Ok(signed)
    }
}

#[async_trait]
impl Authenticator for ApsClient {
    #[instrument(skip(self))]
    async fn two_legged_token(&self, scopes: ScopeSet) -> Result<Credentials> {
        let url = self.endpoint(&["authentication", "v2", "token"])?;
        let response = self
            .client
            .post(url)
            .basic_auth(&self.settings.client_id, Some(&self.settings.client_secret))
            .form(&[
                ("grant_type", "client_credentials".to_string()),
                ("scope", scopes.to_scope_param()),
            ])
            .send()
            .await?;

        let credentials = Self::check(response, "token").await?.json().await?;
        Ok(credentials)
    }
}

#[async_trait]
impl ObjectStorage for ApsClient {
    #[instrument(skip(self, token))]
    async fn bucket_details(&self, token: &str, bucket: &str) -> Result<BucketDetails> {
        let url = self.endpoint(&["oss", "v2", "buckets", bucket, "details"])?;
        let response = self.client.get(url).bearer_auth(token).send().await?;
        Ok(Self::check(response, bucket).await?.json().await?)
    }

    #[instrument(skip(self, token))]
    async fn create_bucket(
        &self,
        token: &str,
        region: Region,
        request: &CreateBucket,
    ) -> Result<BucketDetails> {
        let url = self.endpoint(&["oss", "v2", "buckets"])?;
        let response = self
            .client
            .post(url)
            .bearer_auth(token)
            .header("x-ads-region", region.as_str())
            .json(request)
            .send()
            .await?;
        Ok(Self::check(response, &request.bucket_key).await?.json().await?)
    }

    #[instrument(skip(self, token))]
    async fn list_objects(
        &self,
        token: &str,
        bucket: &str,
        query: &ListQuery,
    ) -> Result<ObjectsPage> {
        let url = self.endpoint(&["oss", "v2", "buckets", bucket, "objects"])?;
        let mut request = self
            .client
            .get(url)
            .bearer_auth(token)
            .query(&[("limit", query.limit.to_string())]);
        if let Some(ref start_at) = query.start_at {
            request = request.query(&[("startAt", start_at)]);
        }
        if let Some(ref prefix) = query.begins_with {
            request = request.query(&[("beginsWith", prefix)]);
        }

        Ok(Self::check(request.send().await?, bucket).await?.json().await?)
    }

    #[instrument(skip(self, token, source))]
    async fn upload_object(
        &self,
        token: &str,
        bucket: &str,
        key: &str,
        source: ContentSource,
    ) -> Result<ObjectDetails> {
        let url = self.endpoint(&["oss", "v2", "buckets", bucket, "objects", key, "signeds3upload"])?;
        let mut parts = source.into_parts(UPLOAD_CHUNK_BYTES).await?;
        let total_parts = parts.part_count();

        let mut upload_key: Option<String> = None;
        let mut part = 0;
        while part < total_parts {
            let batch = (total_parts - part).min(MAX_URLS_PER_REQUEST);
            let signed = self
                .request_upload_urls(token, &url, key, batch, part + 1, upload_key.as_deref())
                .await?;

            for part_url in signed.urls.iter().take(batch) {
                let chunk = parts.next_part().await?;
                let response = self.client.put(part_url).body(chunk).send().await?;
                Self::check(response, key).await?;
                debug!(key, part = part + 1, total_parts, "Uploaded part");
                part += 1;
            }

            upload_key = Some(signed.upload_key);
        }

        let upload_key = upload_key
            .ok_or_else(|| ApsError::InvalidResponse(format!("no upload key for '{key}'")))?;
        let response = self
            .client
            .post(url)
            .bearer_auth(token)
            .json(&json!({ "uploadKey": upload_key }))
            .send()
            .await?;

        Ok(Self::check(response, key).await?.json().await?)
    }

    #[instrument(skip(self, token))]
    async fn object_details(&self, token: &str, bucket: &str, key: &str) -> Result<ObjectDetails> {
        let url = self.endpoint(&["oss", "v2", "buckets", bucket, "objects", key, "details"])?;
        let response = self.client.get(url).bearer_auth(token).send().await?;
        Ok(Self::check(response, key).await?.json().await?)
    }

    #[instrument(skip(self, token))]
    async fn signed_download(
        &self,
        token: &str,
        bucket: &str,
        key: &str,
        minutes: u32,
    ) -> Result<SignedDownload> {
        let url =
            self.endpoint(&["oss", "v2", "buckets", bucket, "objects", key, "signeds3download"])?;
        let response = self
            .client
            .get(url)
            .bearer_auth(token)
            .query(&[("minutesExpiration", minutes)])
            .send()
            .await?;
        Ok(Self::check(response, key).await?.json().await?)
    }
}

#[async_trait]
impl DerivativeService for ApsClient {
    #[instrument(skip(self, token, request), fields(urn = %request.input.urn))]
    async fn start_job(&self, token: &str, request: &JobRequest) -> Result<JobResponse> {
        let url = self.endpoint(&["modelderivative", "v2", "designdata", "job"])?;
        let response = self
            .client
            .post(url)
            .bearer_auth(token)
            .json(request)
            .send()
            .await?;
        Ok(Self::check(response, &request.input.urn).await?.json().await?)
    }

    #[instrument(skip(self, token))]
    async fn manifest(&self, token: &str, urn: &str) -> Result<Manifest> {
        let url = self.endpoint(&["modelderivative", "v2", "designdata", urn, "manifest"])?;
        let response = self.client.get(url).bearer_auth(token).send().await?;
        Ok(Self::check(response, urn).await?.json().await?)
    }

    #[instrument(skip(self, token))]
    async fn thumbnail(&self, token: &str, urn: &str, size: ThumbnailSize) -> Result<Bytes> {
        let url = self.endpoint(&["modelderivative", "v2", "designdata", urn, "thumbnail"])?;
        let response = self
            .client
            .get(url)
            .bearer_auth(token)
            .query(&[("width", size.pixels()), ("height", size.pixels())])
            .send()
            .await?;
        Ok(Self::check(response, urn).await?.bytes().await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client(base: &str) -> ApsClient {
        ApsClient::new(ClientSettings {
            base_url: base.to_string(),
            ..ClientSettings::default()
        })
        .unwrap()
    }

    #[test]
    fn test_endpoint_encodes_keys() {
        let client = client("https://example.com");
        let url = client
            .endpoint(&["oss", "v2", "buckets", "b", "objects", "folder/a b.rvt", "details"])
            .unwrap();
        assert_eq!(
            url.as_str(),
            "https://example.com/oss/v2/buckets/b/objects/folder%2Fa%20b.rvt/details"
        );
    }

    #[test]
    fn test_endpoint_keeps_base_path() {
        let client = client("http://127.0.0.1:9000/aps/");
        let url = client.endpoint(&["authentication", "v2", "token"]).unwrap();
        assert_eq!(url.as_str(), "http://127.0.0.1:9000/aps/authentication/v2/token");
    }

    #[test]
    fn test_rejects_unparseable_base() {
        let result = ApsClient::new(ClientSettings {
            base_url: "not a url".into(),
            ..ClientSettings::default()
        });
        assert!(matches!(result, Err(ApsError::InvalidUrl(_))));
    }
}

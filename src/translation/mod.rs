//! Derivative job submission, manifest status and thumbnails

use bytes::Bytes;
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;
use tracing::info;

use crate::aps::types::{
    JobFormat, JobInput, JobOutput, JobRequest, JobResponse, Manifest, ManifestNode,
    ThumbnailSize, View,
};
use crate::aps::{ApsError, DerivativeService};
use crate::auth::CredentialCache;
use crate::error::{GatewayError, Result};
use crate::observability::Metrics;
use crate::urn;

const NOT_APPLICABLE: &str = "n/a";

/// Flattened translation state reported to clients
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StatusReport {
    pub status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub progress: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub messages: Option<Vec<Value>>,
}

impl StatusReport {
    /// Report for a model that has never been translated
    pub fn not_applicable() -> Self {
        Self {
            status: NOT_APPLICABLE.to_string(),
            progress: None,
            messages: None,
        }
    }

    pub fn from_manifest(manifest: Manifest) -> Self {
        Self {
            status: manifest.status,
            progress: Some(manifest.progress),
            messages: Some(flatten_messages(manifest.derivatives)),
        }
    }
}

/// Collect messages from every derivative and all of its descendants,
/// parents before children, in document order.
pub fn flatten_messages(derivatives: Vec<ManifestNode>) -> Vec<Value> {
    fn visit(node: ManifestNode, out: &mut Vec<Value>) {
        out.extend(node.messages);
        for child in node.children {
            visit(child, out);
        }
    }

    let mut messages = Vec::new();
    for derivative in derivatives {
        visit(derivative, &mut messages);
    }
    messages
}

/// Static translation settings
#[derive(Debug, Clone)]
pub struct TranslationSettings {
    pub output_format: String,
    pub thumbnail_size: ThumbnailSize,
}

pub struct TranslationService {
    derivatives: Arc<dyn DerivativeService>,
    credentials: Arc<CredentialCache>,
    settings: TranslationSettings,
    metrics: Arc<Metrics>,
}

impl TranslationService {
    pub fn new(
        derivatives: Arc<dyn DerivativeService>,
        credentials: Arc<CredentialCache>,
        settings: TranslationSettings,
        metrics: Arc<Metrics>,
    ) -> Self {
        Self {
            derivatives,
            credentials,
            settings,
            metrics,
        }
    }

    fn upstream(&self, err: ApsError) -> GatewayError {
        self.metrics.upstream_failed();
        GatewayError::Upstream(err)
    }

    async fn token(&self) -> Result<String> {
        self.credentials
            .internal_token()
            .await
            .map_err(|e| self.upstream(e))
    }

    /// Job body requesting 2D and 3D views in the configured format
    pub fn job_request(&self, urn: &str, root_filename: Option<&str>) -> JobRequest {
        let root_filename = root_filename
            .map(str::trim)
            .filter(|name| !name.is_empty())
            .map(str::to_string);

        JobRequest {
            input: JobInput::builder()
                .urn(urn)
                .compressed_urn(root_filename.is_some())
                .maybe_root_filename(root_filename)
                .build(),
            output: JobOutput {
                formats: vec![JobFormat {
                    kind: self.settings.output_format.clone(),
                    views: vec![View::TwoD, View::ThreeD],
                }],
            },
        }
    }

    /// Start a translation job; a root filename marks the input as an archive
    pub async fn submit(&self, urn: &str, root_filename: Option<&str>) -> Result<JobResponse> {
        urn::decode(urn)?;
        let token = self.token().await?;
        let request = self.job_request(urn, root_filename);

        let response = self
            .derivatives
            .start_job(&token, &request)
            .await
            .map_err(|e| self.upstream(e))?;

        self.metrics.translation_submitted();
        info!(
            urn,
            compressed = request.input.compressed_urn,
            result = %response.result,
            "Submitted translation job"
        );
        Ok(response)
    }

    /// Current translation state, `n/a` when no manifest exists
    pub async fn status(&self, urn: &str) -> Result<StatusReport> {
        urn::decode(urn)?;
        let token = self.token().await?;

        match self.derivatives.manifest(&token, urn).await {
            Ok(manifest) => Ok(StatusReport::from_manifest(manifest)),
            Err(err) if err.is_not_found() => Ok(StatusReport::not_applicable()),
            Err(err) => Err(self.upstream(err)),
        }
    }

    /// PNG thumbnail of a translated model
    pub async fn thumbnail(&self, urn: &str, size: Option<ThumbnailSize>) -> Result<Bytes> {
        urn::decode(urn)?;
        let token = self.token().await?;
        let size = size.unwrap_or(self.settings.thumbnail_size);

        match self.derivatives.thumbnail(&token, urn, size).await {
            Ok(png) => Ok(png),
            Err(err) if err.is_not_found() => Err(GatewayError::ThumbnailNotFound),
            Err(err) => Err(self.upstream(err)),
        }
    }
}

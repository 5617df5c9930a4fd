// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Kubernetes API Adapter
//!
//! Minimal REST client for the core/v1 `PersistentVolume` resource.
//! Implements `VolumeLister` and `VolumeStore` as an Anti-Corruption Layer:
//! the rest of the crate never sees HTTP.
//!
//! # API Endpoints
//!
//! - `GET /api/v1/persistentvolumes` - List volumes (driver filter applied client side)
//! - `GET /api/v1/persistentvolumes/{name}` - Fetch one volume
//! - `PATCH /api/v1/persistentvolumes/{name}` - Merge-patch annotations
//!
//! The API server has no field selector for `spec.csi.driver`, hence the
//! client-side filter.

use async_trait::async_trait;
use reqwest::header::CONTENT_TYPE;
use reqwest::{Certificate, Client, RequestBuilder, Response, StatusCode};
use serde_json::json;
use std::path::Path;
use std::time::Duration;
use tracing::debug;

use crate::domain::config::ClusterConfig;
use crate::domain::repository::{RepositoryError, VolumeLister, VolumeStore};
use crate::domain::volume::{Volume, VolumeList};

const PERSISTENT_VOLUMES_PATH: &str = "/api/v1/persistentvolumes";
const MERGE_PATCH: &str = "application/merge-patch+json";

pub struct KubeApiClient {
    client: Client,

    /// API server base URL (e.g., "https://kubernetes.default.svc")
    base_url: String,

    token: Option<String>,
}

impl KubeApiClient {
    /// Create a client with no extra trust roots
    pub fn new(
        base_url: impl Into<String>,
        token: Option<String>,
        timeout: Duration,
    ) -> Result<Self, RepositoryError> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            token,
        })
    }

    /// Create a client from cluster settings, reading the service account
    /// token and CA bundle when the files exist
    pub fn from_config(cluster: &ClusterConfig) -> Result<Self, RepositoryError> {
        let token = read_optional(&cluster.token_path)?.map(|t| t.trim().to_string());

        let mut builder = Client::builder().timeout(Duration::from_secs(cluster.timeout_seconds));
        if let Some(ca_path) = &cluster.ca_path {
            if let Some(pem) = read_optional(ca_path)? {
                let cert = Certificate::from_pem(pem.as_bytes())?;
                builder = builder.add_root_certificate(cert);
            }
        }

        Ok(Self {
            client: builder.build()?,
            base_url: cluster.api_server.trim_end_matches('/').to_string(),
            token,
        })
    }

    fn build_url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        match &self.token {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }

    /// Map non-success statuses onto repository errors
    async fn check(response: Response, subject: &str) -> Result<Response, RepositoryError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response
            .text()
            .await
            .unwrap_or_else(|_| format!("HTTP {}", status));

        Err(match status {
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => RepositoryError::Unauthorized(body),
            StatusCode::NOT_FOUND => RepositoryError::NotFound(subject.to_string()),
            StatusCode::CONFLICT => RepositoryError::Conflict(body),
            _ => RepositoryError::Backend(format!("{} returned {}: {}", subject, status, body)),
        })
    }
}

fn read_optional(path: &str) -> Result<Option<String>, RepositoryError> {
    if !Path::new(path).exists() {
        return Ok(None);
    }
    std::fs::read_to_string(path)
        .map(Some)
        .map_err(|e| RepositoryError::Backend(format!("Failed to read {}: {}", path, e)))
}

#[async_trait]
impl VolumeLister for KubeApiClient {
    async fn list_by_driver(&self, driver: &str) -> Result<Vec<Volume>, RepositoryError> {
        let url = self.build_url(PERSISTENT_VOLUMES_PATH);
        let response = self.authorize(self.client.get(&url)).send().await?;
        let response = Self::check(response, PERSISTENT_VOLUMES_PATH).await?;

        let list: VolumeList = response.json().await?;
        let total = list.items.len();
        let volumes: Vec<Volume> = list
            .items
            .into_iter()
            .filter(|volume| volume.is_driven_by(driver))
            .collect();

        debug!(total, matching = volumes.len(), driver, "Listed PersistentVolumes");
        Ok(volumes)
    }
}

#[async_trait]
impl VolumeStore for KubeApiClient {
    async fn get(&self, name: &str) -> Result<Option<Volume>, RepositoryError> {
        let url = self.build_url(&format!("{}/{}", PERSISTENT_VOLUMES_PATH, name));
        let response = self.authorize(self.client.get(&url)).send().await?;

        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        let response = Self::check(response, name).await?;
        Ok(Some(response.json().await?))
    }

    async fn update_annotations(&self, volume: &Volume) -> Result<(), RepositoryError> {
        let mut metadata = json!({ "annotations": volume.metadata.annotations });
        if let Some(resource_version) = &volume.metadata.resource_version {
            metadata["resourceVersion"] = json!(resource_version);
        }
        let body = serde_json::to_vec(&json!({ "metadata": metadata }))?;

        let url = self.build_url(&format!("{}/{}", PERSISTENT_VOLUMES_PATH, volume.name()));
        let response = self
            .authorize(self.client.patch(&url))
            .header(CONTENT_TYPE, MERGE_PATCH)
            .body(body)
            .send()
            .await?;

        Self::check(response, volume.name()).await?;
        Ok(())
    }
}

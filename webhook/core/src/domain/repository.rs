// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # Collaborator Contracts
//!
//! Read and write access to cluster volumes, defined in the domain layer and
//! implemented in `crate::infrastructure`.
//!
//! | Trait | Used by | Implementations |
//! |-------|---------|-----------------|
//! | `VolumeLister` | `ProvenanceDefaulter`, `OriginBackfill::reconcile_all` | `KubeApiClient`, `InMemoryVolumeRepository` |
//! | `VolumeStore` | `OriginBackfill` | `KubeApiClient`, `InMemoryVolumeRepository` |

use async_trait::async_trait;
use thiserror::Error;
use crate::domain::volume::Volume;

/// Lists volumes by CSI driver
#[async_trait]
pub trait VolumeLister: Send + Sync {
    /// Every volume whose `spec.csi.driver` equals `driver`, in no
    /// particular order
    async fn list_by_driver(&self, driver: &str) -> Result<Vec<Volume>, RepositoryError>;
}

/// Fetches and writes back single volumes
#[async_trait]
pub trait VolumeStore: Send + Sync {
    async fn get(&self, name: &str) -> Result<Option<Volume>, RepositoryError>;

    /// Persist the annotation map of `volume`. Implementations use
    /// `metadata.resourceVersion` for optimistic concurrency when present.
    async fn update_annotations(&self, volume: &Volume) -> Result<(), RepositoryError>;
}

#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("Timeout while communicating with the API server")]
    Timeout,

    #[error("Request was cancelled")]
    Cancelled,

    #[error("Volume not found: {0}")]
    NotFound(String),

    #[error("Conflicting update: {0}")]
    Conflict(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Failed to decode response: {0}")]
    Decode(String),

    #[error("Backend error: {0}")]
    Backend(String),
}

impl RepositoryError {
    /// Timeouts and cancellation mean "no answer", not "wrong answer"
    pub fn is_unavailable(&self) -> bool {
        matches!(self, Self::Timeout | Self::Cancelled)
    }
}

impl From<reqwest::Error> for RepositoryError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            RepositoryError::Timeout
        } else if err.is_decode() {
            RepositoryError::Decode(err.to_string())
        } else {
            RepositoryError::Backend(err.to_string())
        }
    }
}

impl From<serde_json::Error> for RepositoryError {
    fn from(err: serde_json::Error) -> Self {
        RepositoryError::Decode(err.to_string())
    }
}

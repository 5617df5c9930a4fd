// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Repository Implementations
//!
//! # Architecture
//!
//! - **Layer:** Infrastructure
//! - **Purpose:** Hold volume snapshots outside a cluster
//! - **Pattern:** Repository (DDD), Adapter (Hexagonal Architecture)
//!
//! `InMemoryVolumeRepository` backs the offline `check` command and the test
//! suites. Listing order follows `HashMap` iteration, so it is as unordered
//! as the real API server.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use crate::domain::repository::{RepositoryError, VolumeLister, VolumeStore};
use crate::domain::volume::Volume;

#[derive(Clone, Default)]
pub struct InMemoryVolumeRepository {
    volumes: Arc<RwLock<HashMap<String, Volume>>>,
}

impl InMemoryVolumeRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_volumes(volumes: impl IntoIterator<Item = Volume>) -> Self {
        let map = volumes
            .into_iter()
            .map(|volume| (volume.name().to_string(), volume))
            .collect();
        Self {
            volumes: Arc::new(RwLock::new(map)),
        }
    }

    /// Insert or replace a volume
    pub fn insert(&self, volume: Volume) -> Result<(), RepositoryError> {
        let mut volumes = self
            .volumes
            .write()
            .map_err(|e| RepositoryError::Backend(e.to_string()))?;
        volumes.insert(volume.name().to_string(), volume);
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.volumes.read().map(|v| v.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl VolumeLister for InMemoryVolumeRepository {
    async fn list_by_driver(&self, driver: &str) -> Result<Vec<Volume>, RepositoryError> {
        let volumes = self
            .volumes
            .read()
            .map_err(|e| RepositoryError::Backend(e.to_string()))?;
        Ok(volumes
            .values()
            .filter(|volume| volume.is_driven_by(driver))
            .cloned()
            .collect())
    }
}

#[async_trait]
impl VolumeStore for InMemoryVolumeRepository {
    async fn get(&self, name: &str) -> Result<Option<Volume>, RepositoryError> {
        let volumes = self
            .volumes
            .read()
            .map_err(|e| RepositoryError::Backend(e.to_string()))?;
        Ok(volumes.get(name).cloned())
    }

    async fn update_annotations(&self, volume: &Volume) -> Result<(), RepositoryError> {
        let mut volumes = self
            .volumes
            .write()
            .map_err(|e| RepositoryError::Backend(e.to_string()))?;
        let stored = volumes
            .get_mut(volume.name())
            .ok_or_else(|| RepositoryError::NotFound(volume.name().to_string()))?;

        if let (Some(expected), Some(actual)) = (
            volume.metadata.resource_version.as_deref(),
            stored.metadata.resource_version.as_deref(),
        ) {
            if expected != actual {
                return Err(RepositoryError::Conflict(format!(
                    "{} has resourceVersion {}, update was based on {}",
                    volume.name(),
                    actual,
                    expected
                )));
            }
        }

        stored.metadata.annotations = volume.metadata.annotations.clone();
        Ok(())
    }
}

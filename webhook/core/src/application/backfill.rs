// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Origin Backfill
//!
//! Volumes the defaulter had no opinion on stay unannotated until they get
//! bound. This reconcile copies the bound claim's namespace into `origin`
//! afterwards. It runs once per call; scheduling and retries belong to the
//! caller.

use serde::Serialize;
use std::sync::Arc;
use tracing::{error, info, instrument};

use crate::domain::provenance::SkipReason;
use crate::domain::repository::{RepositoryError, VolumeLister, VolumeStore};
use crate::domain::volume::Volume;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "kebab-case")]
pub enum BackfillOutcome {
    NotFound,
    Skipped { reason: SkipReason },
    Unchanged { origin: String },
    /// No claim binding to copy from yet
    Unbound,
    Backfilled { namespace: String },
}

/// Per-outcome tally of a `reconcile_all` run
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct BackfillSummary {
    pub backfilled: Vec<String>,
    pub unchanged: usize,
    pub unbound: Vec<String>,
    pub skipped: usize,
    /// `(volume, error)` pairs
    pub failed: Vec<(String, String)>,
}

pub struct OriginBackfill {
    target_driver: String,
    lister: Arc<dyn VolumeLister>,
    store: Arc<dyn VolumeStore>,
}

impl OriginBackfill {
    pub fn new(
        target_driver: impl Into<String>,
        lister: Arc<dyn VolumeLister>,
        store: Arc<dyn VolumeStore>,
    ) -> Self {
        Self {
            target_driver: target_driver.into(),
            lister,
            store,
        }
    }

    /// Fetch `name` and backfill its origin if possible
    #[instrument(skip(self))]
    pub async fn reconcile(&self, name: &str) -> Result<BackfillOutcome, RepositoryError> {
        match self.store.get(name).await? {
            Some(volume) => self.reconcile_volume(volume).await,
            None => {
                info!("PersistentVolume not found, ignoring");
                Ok(BackfillOutcome::NotFound)
            }
        }
    }

    /// Reconcile every volume of the target driver, continuing past failures
    pub async fn reconcile_all(&self) -> Result<BackfillSummary, RepositoryError> {
        let volumes = self.lister.list_by_driver(&self.target_driver).await?;
        let mut summary = BackfillSummary::default();

        for volume in volumes {
            let name = volume.name().to_string();
            match self.reconcile_volume(volume).await {
                Ok(BackfillOutcome::Backfilled { .. }) => summary.backfilled.push(name),
                Ok(BackfillOutcome::Unchanged { .. }) => summary.unchanged += 1,
                Ok(BackfillOutcome::Unbound) => summary.unbound.push(name),
                Ok(BackfillOutcome::Skipped { .. }) | Ok(BackfillOutcome::NotFound) => {
                    summary.skipped += 1
                }
                Err(e) => {
                    error!(volume = %name, error = %e, "Failed to backfill origin");
                    summary.failed.push((name, e.to_string()));
                }
            }
        }

        info!(
            backfilled = summary.backfilled.len(),
            unchanged = summary.unchanged,
            unbound = summary.unbound.len(),
            failed = summary.failed.len(),
            "Origin backfill finished"
        );
        Ok(summary)
    }

    #[instrument(skip_all, fields(volume = %volume.name()))]
    async fn reconcile_volume(&self, mut volume: Volume) -> Result<BackfillOutcome, RepositoryError> {
        if volume.is_being_deleted() {
            return Ok(BackfillOutcome::Skipped {
                reason: SkipReason::BeingDeleted,
            });
        }
        if !volume.is_driven_by(&self.target_driver) {
            return Ok(BackfillOutcome::Skipped {
                reason: SkipReason::ForeignDriver,
            });
        }
        if let Some(origin) = volume.origin() {
            return Ok(BackfillOutcome::Unchanged {
                origin: origin.to_string(),
            });
        }

        let Some(namespace) = volume.bound_namespace().map(str::to_string) else {
            info!("PersistentVolume is not bound to any PersistentVolumeClaim");
            return Ok(BackfillOutcome::Unbound);
        };

        volume.set_origin(namespace.clone());
        self.store.update_annotations(&volume).await?;
        info!(namespace = %namespace, "Updated PersistentVolume with 'origin' annotation");

        Ok(BackfillOutcome::Backfilled { namespace })
    }
}

// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Provenance Defaulter
//!
//! Mutating half of the admission pair. Sets the `origin` annotation once,
//! from the volume's own claim binding when it has one, otherwise from a
//! bound sibling found by the [`OwnershipResolver`].

use std::sync::Arc;
use thiserror::Error;
use tracing::{info, instrument, warn};

use crate::application::ownership_resolver::OwnershipResolver;
use crate::domain::provenance::{CandidateOrder, NoOpinionReason, OriginSource, Resolution, SkipReason};
use crate::domain::repository::{RepositoryError, VolumeLister};
use crate::domain::volume::Volume;

/// What `apply_default` did to the volume
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DefaultOutcome {
    Skipped(SkipReason),
    /// `origin` was already present and was left alone
    AlreadySet { origin: String },
    Assigned { namespace: String, source: OriginSource },
    /// Nothing to go on; the volume stays unannotated until it is bound
    NoOpinion(NoOpinionReason),
}

impl DefaultOutcome {
    /// `true` iff the volume was modified
    pub fn mutated(&self) -> bool {
        matches!(self, Self::Assigned { .. })
    }
}

#[derive(Debug, Error)]
pub enum DefaultingError {
    #[error("failed to list volumes for driver {driver}: {source}")]
    Lister {
        driver: String,
        #[source]
        source: RepositoryError,
    },
}

pub struct ProvenanceDefaulter {
    target_driver: String,
    lister: Arc<dyn VolumeLister>,
    resolver: OwnershipResolver,
}

impl ProvenanceDefaulter {
    pub fn new(
        target_driver: impl Into<String>,
        lister: Arc<dyn VolumeLister>,
        order: CandidateOrder,
    ) -> Self {
        let target_driver = target_driver.into();
        let resolver = OwnershipResolver::new(target_driver.clone(), order);
        Self {
            target_driver,
            lister,
            resolver,
        }
    }

    pub fn target_driver(&self) -> &str {
        &self.target_driver
    }

    /// Assign `origin` on `volume` in place if it can be determined.
    ///
    /// Idempotent: a volume that already carries `origin` is never changed.
    /// Listing timeouts degrade to `NoOpinion`; other listing failures abort.
    #[instrument(skip_all, fields(volume = %volume.name()))]
    pub async fn apply_default(&self, volume: &mut Volume) -> Result<DefaultOutcome, DefaultingError> {
        if volume.is_being_deleted() {
            info!("Skipping defaulting for PersistentVolume being deleted");
            return Ok(DefaultOutcome::Skipped(SkipReason::BeingDeleted));
        }

        if !volume.is_driven_by(&self.target_driver) {
            info!(driver = ?volume.driver(), "Skipping defaulting, not the target driver");
            return Ok(DefaultOutcome::Skipped(SkipReason::ForeignDriver));
        }

        if let Some(origin) = volume.origin() {
            return Ok(DefaultOutcome::AlreadySet {
                origin: origin.to_string(),
            });
        }

        if let Some(namespace) = volume.bound_namespace().map(str::to_string) {
            volume.set_origin(namespace.clone());
            info!(namespace = %namespace, "Set default annotation origin from claimRef");
            return Ok(DefaultOutcome::Assigned {
                namespace,
                source: OriginSource::ClaimRef,
            });
        }

        let candidates = match self.lister.list_by_driver(&self.target_driver).await {
            Ok(candidates) => candidates,
            Err(e) if e.is_unavailable() => {
                warn!(error = %e, "Candidate listing unavailable, leaving origin unset");
                return Ok(DefaultOutcome::NoOpinion(NoOpinionReason::ListingUnavailable));
            }
            Err(e) => {
                warn!(error = %e, "Failed to list PersistentVolumes");
                return Err(DefaultingError::Lister {
                    driver: self.target_driver.clone(),
                    source: e,
                });
            }
        };

        match self.resolver.resolve(volume, &candidates) {
            Resolution::Resolved { namespace, volume: matched, claim } => {
                volume.set_origin(namespace.clone());
                Ok(DefaultOutcome::Assigned {
                    namespace,
                    source: OriginSource::SiblingVolume {
                        volume: matched,
                        claim,
                    },
                })
            }
            Resolution::NoOpinion(reason) => {
                info!(%reason, "Origin left unset");
                Ok(DefaultOutcome::NoOpinion(reason))
            }
        }
    }
}

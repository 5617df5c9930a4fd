// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Provenance Validator
//!
//! Validating half of the admission pair. On update:
//!
//! 1. An existing `origin` can neither change nor disappear, and a claim
//!    binding must point into that namespace.
//! 2. Without a previous `origin`, a claim binding is only accepted together
//!    with a matching `origin` (written by the defaulter in the same request).
//!
//! Pure predicate; nothing is remembered between calls.

use tracing::{debug, info, instrument, warn};

use crate::domain::provenance::{SkipReason, Violation};
use crate::domain::volume::Volume;

#[derive(Debug, Clone)]
pub struct ProvenanceValidator {
    target_driver: String,
}

impl ProvenanceValidator {
    pub fn new(target_driver: impl Into<String>) -> Self {
        Self {
            target_driver: target_driver.into(),
        }
    }

    #[instrument(skip_all, fields(volume = %volume.name()))]
    pub fn validate_create(&self, volume: &Volume) -> Result<(), Violation> {
        info!("Validation for PersistentVolume upon creation");
        Ok(())
    }

    #[instrument(skip_all, fields(volume = %new.name()))]
    pub fn validate_update(&self, old: &Volume, new: &Volume) -> Result<(), Violation> {
        info!("Validation for PersistentVolume upon update");

        if let Some(reason) = self.skip_reason(new) {
            debug!(%reason, "Skipping validation");
            return Ok(());
        }

        let result = check_transition(old, new);
        if let Err(violation) = &result {
            warn!(%violation, "Rejecting PersistentVolume update");
        }
        result
    }

    #[instrument(skip_all, fields(volume = %volume.name()))]
    pub fn validate_delete(&self, volume: &Volume) -> Result<(), Violation> {
        info!("Validation for PersistentVolume upon deletion");
        Ok(())
    }

    fn skip_reason(&self, volume: &Volume) -> Option<SkipReason> {
        if volume.is_being_deleted() {
            Some(SkipReason::BeingDeleted)
        } else if !volume.is_driven_by(&self.target_driver) {
            Some(SkipReason::ForeignDriver)
        } else {
            None
        }
    }
}

fn check_transition(old: &Volume, new: &Volume) -> Result<(), Violation> {
    match old.origin() {
        Some(current) => {
            if new.origin() != Some(current) {
                return Err(Violation::OriginImmutable {
                    current: current.to_string(),
                });
            }
            if let Some(namespace) = new.bound_namespace() {
                if namespace != current {
                    return Err(Violation::BindingMismatch {
                        namespace: namespace.to_string(),
                        origin: current.to_string(),
                    });
                }
            }
        }
        None => {
            if let Some(namespace) = new.bound_namespace() {
                if new.origin() != Some(namespace) {
                    return Err(Violation::BindingWithoutOrigin {
                        namespace: namespace.to_string(),
                    });
                }
            }
        }
    }
    Ok(())
}

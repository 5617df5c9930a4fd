// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Ownership Resolver
//!
//! Infers the owning namespace of an unbound volume from an already-bound
//! sibling: same backend configuration key, and the sibling's export path is
//! a boundary-delimited prefix of the target's path.
//!
//! The first matching candidate wins. Under `CandidateOrder::AsListed` that
//! is whichever the lister happened to return first, so two equally valid
//! siblings bound to different namespaces give a nondeterministic answer.

use tracing::{debug, info};

use crate::domain::path_prefix::is_prefix_of;
use crate::domain::provenance::{CandidateOrder, NoOpinionReason, Resolution};
use crate::domain::volume::Volume;
use crate::domain::volume_handle::VolumeHandle;

#[derive(Debug, Clone)]
pub struct OwnershipResolver {
    target_driver: String,
    order: CandidateOrder,
}

/// Candidate that passed eligibility checks
struct Eligible<'a> {
    volume: &'a Volume,
    namespace: &'a str,
    handle: VolumeHandle<'a>,
}

impl OwnershipResolver {
    pub fn new(target_driver: impl Into<String>, order: CandidateOrder) -> Self {
        Self {
            target_driver: target_driver.into(),
            order,
        }
    }

    pub fn order(&self) -> CandidateOrder {
        self.order
    }

    /// Find the namespace owning `target` among `candidates`.
    ///
    /// `target` is expected to have no usable claim binding; `candidates`
    /// may contain `target` itself, which is ignored.
    pub fn resolve(&self, target: &Volume, candidates: &[Volume]) -> Resolution {
        let Some(raw) = target.volume_handle() else {
            debug!(volume = %target.name(), "Volume has no volume handle, nothing to match");
            return Resolution::NoOpinion(NoOpinionReason::MissingHandle);
        };

        let handle = match VolumeHandle::parse(raw) {
            Ok(handle) => handle,
            Err(e) => {
                info!(volume = %target.name(), error = %e, "Volume does not have a valid volume handle, skipping");
                return Resolution::NoOpinion(NoOpinionReason::UnparsableHandle);
            }
        };

        let mut eligible: Vec<Eligible<'_>> = candidates
            .iter()
            .filter_map(|candidate| self.eligible(target, candidate))
            .collect();

        if self.order == CandidateOrder::Stable {
            eligible.sort_by(|a, b| {
                a.handle
                    .path()
                    .len()
                    .cmp(&b.handle.path().len())
                    .then_with(|| a.volume.name().cmp(b.volume.name()))
            });
        }

        for candidate in eligible {
            if candidate.handle.config_key() == handle.config_key()
                && is_prefix_of(candidate.handle.path(), handle.path())
            {
                let claim = candidate
                    .volume
                    .claim_ref()
                    .map(|claim| claim.name.clone())
                    .unwrap_or_default();

                info!(
                    volume = %target.name(),
                    namespace = %candidate.namespace,
                    matched_volume = %candidate.volume.name(),
                    pvc = %claim,
                    volume_handle = %raw,
                    "Found binding information with the same prefix path"
                );

                return Resolution::Resolved {
                    namespace: candidate.namespace.to_string(),
                    volume: candidate.volume.name().to_string(),
                    claim,
                };
            }
        }

        debug!(volume = %target.name(), config = %handle.config_key(), path = %handle.path(), "No bound volume matched");
        Resolution::NoOpinion(NoOpinionReason::NoMatchingCandidate)
    }

    fn eligible<'a>(&self, target: &Volume, candidate: &'a Volume) -> Option<Eligible<'a>> {
        if candidate.name() == target.name() || !candidate.is_driven_by(&self.target_driver) {
            return None;
        }

        let namespace = candidate.bound_namespace()?;
        let raw = candidate.volume_handle()?;

        match VolumeHandle::parse(raw) {
            Ok(handle) => Some(Eligible {
                volume: candidate,
                namespace,
                handle,
            }),
            Err(e) => {
                debug!(candidate = %candidate.name(), error = %e, "Skipping candidate with invalid volume handle");
                None
            }
        }
    }
}

// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # Provenance Decisions
//!
//! Result and error vocabulary shared by the resolver, defaulter, validator
//! and backfill. "No opinion" is an explicit variant rather than a silent
//! return, so callers (and tests) can tell "decided not to act" apart from
//! "failed".
//!
//! | Type | Produced by |
//! |------|-------------|
//! | `Resolution` | `OwnershipResolver` |
//! | `NoOpinionReason` | resolver and defaulter |
//! | `SkipReason` | every entry point's guard clauses |
//! | `Violation` | `ProvenanceValidator` |

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Why an entry point returned before looking at provenance at all
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SkipReason {
    /// `metadata.deletionTimestamp` is set; the volume is read-only
    BeingDeleted,
    /// The volume is not provisioned by the governed CSI driver
    ForeignDriver,
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::BeingDeleted => write!(f, "volume is being deleted"),
            Self::ForeignDriver => write!(f, "volume is not managed by the target driver"),
        }
    }
}

/// Why ownership could not be inferred
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum NoOpinionReason {
    MissingHandle,
    UnparsableHandle,
    NoMatchingCandidate,
    /// Listing timed out or was cancelled
    ListingUnavailable,
}

impl fmt::Display for NoOpinionReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingHandle => write!(f, "volume has no volume handle"),
            Self::UnparsableHandle => write!(f, "volume handle could not be parsed"),
            Self::NoMatchingCandidate => write!(f, "no bound volume shares a prefix path"),
            Self::ListingUnavailable => write!(f, "candidate volumes could not be listed in time"),
        }
    }
}

/// Where an assigned origin came from
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum OriginSource {
    /// The volume's own `spec.claimRef`
    ClaimRef,
    /// Inherited from an already-bound volume with a matching handle
    SiblingVolume { volume: String, claim: String },
}

/// Outcome of ownership inference
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    Resolved {
        namespace: String,
        /// Name of the matched candidate volume
        volume: String,
        /// Name of the candidate's bound claim
        claim: String,
    },
    NoOpinion(NoOpinionReason),
}

impl Resolution {
    pub fn namespace(&self) -> Option<&str> {
        match self {
            Self::Resolved { namespace, .. } => Some(namespace),
            Self::NoOpinion(_) => None,
        }
    }
}

/// Ordering applied to candidates before first-match selection.
///
/// With `AsListed` the winner among several valid candidates depends on the
/// order the lister returns, which the API server does not guarantee.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CandidateOrder {
    #[default]
    AsListed,
    /// Shortest candidate path first, then volume name
    Stable,
}

impl std::str::FromStr for CandidateOrder {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "as-listed" => Ok(Self::AsListed),
            "stable" => Ok(Self::Stable),
            other => Err(format!(
                "unknown candidate order '{}', expected 'as-listed' or 'stable'",
                other
            )),
        }
    }
}

/// Rejected update. Messages are returned verbatim to the API client.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Violation {
    #[error("cannot update/delete 'origin' annotation, it is immutable (current value '{current}')")]
    OriginImmutable { current: String },

    #[error("cannot update ClaimRef namespace to '{namespace}', it must match the 'origin' annotation '{origin}'")]
    BindingMismatch { namespace: String, origin: String },

    #[error("cannot bind to a claim in namespace '{namespace}' without a matching 'origin' annotation")]
    BindingWithoutOrigin { namespace: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_candidate_order_parsing() {
        assert_eq!("stable".parse::<CandidateOrder>().unwrap(), CandidateOrder::Stable);
        assert_eq!("as-listed".parse::<CandidateOrder>().unwrap(), CandidateOrder::AsListed);
        assert!("random".parse::<CandidateOrder>().is_err());
    }

    #[test]
    fn test_candidate_order_yaml() {
        let order: CandidateOrder = serde_yaml::from_str("stable").unwrap();
        assert_eq!(order, CandidateOrder::Stable);
    }

    #[test]
    fn test_violation_messages_name_the_invariant() {
        let immutable = Violation::OriginImmutable { current: "tenant1".to_string() };
        assert!(immutable.to_string().contains("immutable"));

        let mismatch = Violation::BindingMismatch {
            namespace: "tenant2".to_string(),
            origin: "tenant1".to_string(),
        };
        assert!(mismatch.to_string().contains("must match"));

        let missing = Violation::BindingWithoutOrigin { namespace: "tenantX".to_string() };
        assert!(missing.to_string().contains("tenantX"));
    }

    #[test]
    fn test_resolution_namespace() {
        let resolved = Resolution::Resolved {
            namespace: "tenant2".to_string(),
            volume: "pv-a".to_string(),
            claim: "data".to_string(),
        };
        assert_eq!(resolved.namespace(), Some("tenant2"));
        assert_eq!(Resolution::NoOpinion(NoOpinionReason::NoMatchingCandidate).namespace(), None);
    }
}

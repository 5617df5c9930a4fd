// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # Application Layer (`origin-guard-core`)
//!
//! Decision services built on the domain model. Each service is constructed
//! once with its configuration and collaborators and then invoked per
//! admission request; none keeps mutable state between calls.
//!
//! | Module | Entry point |
//! |--------|-------------|
//! | [`ownership_resolver`] | `OwnershipResolver::resolve` |
//! | [`defaulter`] | `ProvenanceDefaulter::apply_default` |
//! | [`validator`] | `ProvenanceValidator::validate_{create,update,delete}` |
//! | [`backfill`] | `OriginBackfill::reconcile`, `reconcile_all` |

pub mod ownership_resolver;
pub mod defaulter;
pub mod validator;
pub mod backfill;

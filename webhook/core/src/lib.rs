// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # origin-guard core
//!
//! Assigns and protects the `origin` provenance annotation on CSI-backed
//! `PersistentVolume` objects shared between tenant namespaces.
//!
//! # Architecture
//!
//! - **domain:** volume model, handle parsing, prefix matching, collaborator traits
//! - **application:** ownership resolver, defaulter, validator, origin backfill
//! - **infrastructure:** Kubernetes API adapter and in-memory repository
//! - **presentation:** AdmissionReview HTTP surface (Axum)

pub mod domain;
pub mod application;
pub mod infrastructure;
pub mod presentation;

pub use domain::*;

// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Infrastructure
//!
//! Concrete implementations of the domain collaborator traits.
//!
//! # Architecture
//!
//! - **Layer:** Infrastructure
//! - **Purpose:** Adapters for the Kubernetes API server and in-memory storage

pub mod kube_api;
pub mod repositories;

pub use kube_api::KubeApiClient;
pub use repositories::InMemoryVolumeRepository;

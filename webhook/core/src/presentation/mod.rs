// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # Presentation Layer (`origin-guard-core`)
//!
//! HTTP surface that translates `AdmissionReview` requests into application
//! service calls. **No business logic lives here**; this is also the only
//! place an untyped object is checked for being a `PersistentVolume`.
//!
//! | Module | Transport | Description |
//! |--------|-----------|-------------|
//! | [`admission`] | HTTP (Axum) | Mutating and validating webhook endpoints |

pub mod admission;

// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Domain
//!
//! Pure types and rules for volume provenance. Nothing here performs I/O.
//!
//! # Architecture
//!
//! - **Layer:** Domain Layer
//! - **Purpose:** Volume model, identifier parsing, prefix matching, contracts

pub mod volume;
pub mod volume_handle;
pub mod path_prefix;
pub mod provenance;
pub mod repository;
pub mod config;

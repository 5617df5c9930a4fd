// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Command implementations for the Origin Guard CLI

pub mod backfill;
pub mod check;
pub mod config;
pub mod serve;

pub use self::backfill::BackfillArgs;
pub use self::check::CheckArgs;
pub use self::config::ConfigCommand;
pub use self::serve::ServeArgs;

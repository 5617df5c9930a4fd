// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Volume Handle Parser
//!
//! A CSI volume handle is an opaque `:`-separated string. Only the first
//! component (the backend configuration key) and the last component (the
//! export path) carry meaning for provenance; everything in between (host
//! lists, mount points) is ignored.
//!
//! ```text
//! exa1:192.168.2.103@tcp;192.168.2.102@tcp;/testfs:/mnt:/nginx-persistent
//! ^^^^                                                  ^^^^^^^^^^^^^^^^^
//! config key                                            path
//! ```

use thiserror::Error;

/// Separator between handle components
pub const HANDLE_DELIMITER: char = ':';

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HandleParseError {
    #[error("volume handle '{0}' has fewer than two ':'-separated components")]
    TooFewComponents(String),
}

/// Borrowed view over the meaningful parts of a volume handle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VolumeHandle<'a> {
    config_key: &'a str,
    path: &'a str,
}

impl<'a> VolumeHandle<'a> {
    pub fn parse(raw: &'a str) -> Result<Self, HandleParseError> {
        let mut components = raw.split(HANDLE_DELIMITER);
        let config_key = components.next().unwrap_or_default();
        let path = components
            .next_back()
            .ok_or_else(|| HandleParseError::TooFewComponents(raw.to_string()))?;

        Ok(Self { config_key, path })
    }

    pub fn config_key(&self) -> &'a str {
        self.config_key
    }

    pub fn path(&self) -> &'a str {
        self.path
    }
}

// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Unified error types for Belegwerk.

use thiserror::Error;

/// Top-level error type for all Belegwerk operations.
///
/// A detection miss is deliberately absent: failing to find a document
/// boundary is a normal capture outcome, not an error.
#[derive(Debug, Error)]
pub enum BelegwerkError {
    // -- Camera errors --
    #[error("camera unavailable: {0}")]
    CameraUnavailable(String),

    #[error("camera session is not active")]
    SessionInactive,

    // -- Imaging errors --
    #[error("image encoding failed: {0}")]
    EncodingFailed(String),

    // -- Configuration --
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    // -- Storage / persistence --
    #[error("file I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    // -- Platform bridge --
    #[error("platform bridge error: {0}")]
    Bridge(String),
}

impl BelegwerkError {
    /// Whether this error ends the capture workflow outright.
    ///
    /// Only camera acquisition failures are fatal; everything else is
    /// absorbed by the state machine's retry/cancel transitions.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::CameraUnavailable(_))
    }
}

/// Alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, BelegwerkError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_camera_failures_are_fatal() {
        assert!(BelegwerkError::CameraUnavailable("denied".into()).is_fatal());
        assert!(!BelegwerkError::Bridge("stream dropped".into()).is_fatal());
        assert!(!BelegwerkError::EncodingFailed("disk".into()).is_fatal());
        assert!(!BelegwerkError::SessionInactive.is_fatal());
    }
}

// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Stub bridge for builds without any camera backend.

use belegwerk_core::error::{BelegwerkError, Result};

use crate::traits::*;

/// Bridge returned when no camera backend is compiled in.
pub struct StubBridge;

impl PlatformBridge for StubBridge {
    fn platform_name(&self) -> &str {
        "Desktop (stub)"
    }
}

impl NativeCamera for StubBridge {
    fn open_stream(&self, request: &StreamRequest) -> Result<Box<dyn VideoSource>> {
        tracing::warn!(
            facing = request.facing.facing_mode(),
            "NativeCamera::open_stream called on stub bridge"
        );
        Err(BelegwerkError::CameraUnavailable(
            "no camera backend on this platform".into(),
        ))
    }
}

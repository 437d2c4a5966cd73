// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Core domain types for the Belegwerk capture engine.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Unique identifier for a camera session.
///
/// Stable for the whole lifetime of a session, so callers can tell whether a
/// retry reused the stream or reacquired the camera.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SessionId(pub Uuid);

impl SessionId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for SessionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Which camera the stream should come from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FacingPreference {
    /// Back-facing camera, pointed away from the user (documents).
    Environment,
    /// Front-facing camera.
    User,
}

impl FacingPreference {
    /// Media-constraint `facingMode` keyword.
    pub fn facing_mode(&self) -> &'static str {
        match self {
            Self::Environment => "environment",
            Self::User => "user",
        }
    }
}

/// Pixel dimensions of a frame or stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Resolution {
    pub width: u32,
    pub height: u32,
}

impl Resolution {
    /// 1920x1080, the ideal stream size requested from the device.
    pub const FULL_HD: Self = Self {
        width: 1920,
        height: 1080,
    };

    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// Total pixel count.
    pub fn area(&self) -> u64 {
        self.width as u64 * self.height as u64
    }
}

impl std::fmt::Display for Resolution {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

/// Compressed image formats the encoder can produce.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OutputFormat {
    Jpeg,
    Png,
}

impl OutputFormat {
    /// MIME type string for the encoded payload.
    pub fn mime_type(&self) -> &'static str {
        match self {
            Self::Jpeg => "image/jpeg",
            Self::Png => "image/png",
        }
    }

    /// Conventional file extension (without the dot).
    pub fn extension(&self) -> &'static str {
        match self {
            Self::Jpeg => "jpg",
            Self::Png => "png",
        }
    }

    /// Infer the format from a file extension.
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_ascii_lowercase().as_str() {
            "jpg" | "jpeg" => Some(Self::Jpeg),
            "png" => Some(Self::Png),
            _ => None,
        }
    }
}

/// Size of the rectified output raster.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OutputSize {
    /// Aspect ratio taken from the detected corner distances; the longer
    /// side is scaled to this many pixels.
    FitLongEdge(u32),
    /// Exact width and height, regardless of the detected shape.
    Exact { width: u32, height: u32 },
}

/// The encoded image handed to the host once a capture is confirmed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Blob {
    /// Compressed image bytes.
    pub bytes: Vec<u8>,
    pub format: OutputFormat,
    /// Pixel width of the encoded raster.
    pub width: u32,
    /// Pixel height of the encoded raster.
    pub height: u32,
    /// `true` when the raster was perspective-corrected, `false` for a raw
    /// fallback frame.
    pub rectified: bool,
    /// SHA-256 of `bytes`, lowercase hex.
    pub sha256: String,
    pub encoded_at: DateTime<Utc>,
}

impl Blob {
    /// MIME type of the payload.
    pub fn mime_type(&self) -> &'static str {
        self.format.mime_type()
    }

    /// Payload size in bytes.
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Image output: JPEG/PNG encoding of reviewed rasters.

pub mod encoder;

pub use encoder::{OutputEncoder, encode};

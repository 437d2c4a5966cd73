// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// JSON persistence of the capture configuration.

use std::path::Path;

use belegwerk_core::CaptureConfig;
use belegwerk_core::error::Result;
use tracing::{debug, info, warn};

/// Load a configuration file.
///
/// Returns `None` when the file is missing, unreadable, malformed, or holds
/// out-of-range values; callers fall back to defaults.
pub fn load_config(path: &Path) -> Option<CaptureConfig> {
    let data = match std::fs::read_to_string(path) {
        Ok(data) => data,
        Err(err) => {
            debug!(path = %path.display(), error = %err, "No configuration file");
            return None;
        }
    };
    let config: CaptureConfig = match serde_json::from_str(&data) {
        Ok(config) => config,
        Err(err) => {
            warn!(path = %path.display(), error = %err, "Ignoring malformed configuration");
            return None;
        }
    };
    if let Err(err) = config.validate() {
        warn!(path = %path.display(), error = %err, "Ignoring invalid configuration");
        return None;
    }
    info!(path = %path.display(), "Configuration loaded");
    Some(config)
}

/// Write `config` as pretty-printed JSON, creating parent directories.
pub fn persist_config(path: &Path, config: &CaptureConfig) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }
    let json = serde_json::to_string_pretty(config)?;
    std::fs::write(path, json)?;
    info!(path = %path.display(), "Configuration saved");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use belegwerk_core::{OutputFormat, OutputSize};

    #[test]
    fn persisted_config_loads_back() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("nested").join("config.json");

        let mut config = CaptureConfig::default();
        config.detection.min_area_fraction = 0.35;
        config.detection.output_size = OutputSize::Exact {
            width: 1240,
            height: 1754,
        };
        config.encoding.format = OutputFormat::Png;

        persist_config(&path, &config).expect("persist");
        assert_eq!(load_config(&path), Some(config));
    }

    #[test]
    fn missing_file_is_none() {
        let dir = tempfile::tempdir().expect("tempdir");
        assert!(load_config(&dir.path().join("absent.json")).is_none());
    }

    #[test]
    fn malformed_or_invalid_files_are_ignored() {
        let dir = tempfile::tempdir().expect("tempdir");

        let garbage = dir.path().join("garbage.json");
        std::fs::write(&garbage, "{ not json").expect("write");
        assert!(load_config(&garbage).is_none());

        let out_of_range = dir.path().join("range.json");
        std::fs::write(&out_of_range, r#"{"detection":{"min_area_fraction":1.5}}"#)
            .expect("write");
        assert!(load_config(&out_of_range).is_none());
    }
}

// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Platform-aware configuration directory resolution.

use std::path::{Path, PathBuf};

/// File name of the persisted capture configuration.
pub const CONFIG_FILE: &str = "config.json";

/// Return the Belegwerk configuration directory. Not created here; the
/// directory only appears once a configuration is persisted.
pub fn config_dir() -> PathBuf {
    config_dir_from(
        std::env::var_os("XDG_CONFIG_HOME").map(PathBuf::from),
        std::env::var_os("HOME").map(PathBuf::from),
    )
}

/// Default location of the configuration file.
pub fn default_config_path() -> PathBuf {
    config_dir().join(CONFIG_FILE)
}

fn config_dir_from(xdg: Option<PathBuf>, home: Option<PathBuf>) -> PathBuf {
    let base = match (xdg, home) {
        (Some(xdg), _) if !xdg.as_os_str().is_empty() => xdg,
        (_, Some(home)) => home.join(".config"),
        // Last resort
        _ => Path::new(".").to_path_buf(),
    };
    base.join("belegwerk")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn xdg_wins_over_home() {
        let dir = config_dir_from(Some("/xdg".into()), Some("/home/u".into()));
        assert_eq!(dir, PathBuf::from("/xdg/belegwerk"));
    }

    #[test]
    fn home_fallback() {
        let dir = config_dir_from(Some(PathBuf::new()), Some("/home/u".into()));
        assert_eq!(dir, PathBuf::from("/home/u/.config/belegwerk"));
        assert_eq!(config_dir_from(None, None), PathBuf::from("./belegwerk"));
    }
}

//! Application directory resolution (XDG base directories with fallbacks).

use std::env;
use std::path::PathBuf;

/// Directory name used under the XDG base directories.
const APP_DIR: &str = "glsched";

/// Resolve the configuration directory for the profile store.
///
/// `$XDG_CONFIG_HOME/glsched` when set, otherwise `~/.config/glsched`,
/// falling back to the current directory when no home can be determined.
/// The directory is not created here; callers create it on first write.
#[must_use]
pub fn config_dir() -> PathBuf {
    xdg_dir("XDG_CONFIG_HOME", ".config")
}

/// Resolve the state directory for the activity log.
///
/// `$XDG_STATE_HOME/glsched` when set, otherwise `~/.local/state/glsched`.
#[must_use]
pub fn state_dir() -> PathBuf {
    xdg_dir("XDG_STATE_HOME", ".local/state")
}

fn xdg_dir(var: &str, home_suffix: &str) -> PathBuf {
    if let Ok(base) = env::var(var) {
        if !base.is_empty() {
            return PathBuf::from(base).join(APP_DIR);
        }
    }
    env::var("HOME").map_or_else(
        |_| PathBuf::from(".").join(APP_DIR),
        |home| PathBuf::from(home).join(home_suffix).join(APP_DIR),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_dir_ends_with_app_name() {
        assert!(config_dir().ends_with(APP_DIR));
    }

    #[test]
    fn state_dir_ends_with_app_name() {
        assert!(state_dir().ends_with(APP_DIR));
    }
}

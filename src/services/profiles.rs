//! Profile store: named connection profiles persisted as one TOML file.
//!
//! The list is read and written atomically as a whole (temp file + rename),
//! so a crash mid-save never leaves a truncated store behind. A missing file
//! is an empty list, not an error.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::core::errors::{GlsError, Result};
use crate::core::paths;
use crate::models::Profile;

/// File name under the config directory.
const STORE_FILE: &str = "profiles.toml";

/// Read/write access to the persisted profile list.
pub trait ProfileStore: Send + Sync {
    /// Load all profiles; a missing store is an empty list.
    fn load(&self) -> Result<Vec<Profile>>;
    /// Replace the whole store atomically.
    fn save(&self, profiles: &[Profile]) -> Result<()>;
}

/// On-disk TOML shape: a single `[[profiles]]` array of tables.
#[derive(Debug, Default, Serialize, Deserialize)]
struct StoreFile {
    #[serde(default)]
    profiles: Vec<Profile>,
}

/// TOML-file-backed [`ProfileStore`].
#[derive(Debug, Clone)]
pub struct TomlProfileStore {
    path: PathBuf,
}

impl TomlProfileStore {
    /// Store at the default location (`$XDG_CONFIG_HOME/glsched/profiles.toml`).
    #[must_use]
    pub fn default_location() -> Self {
        Self {
            path: paths::config_dir().join(STORE_FILE),
        }
    }

    /// Store at an explicit path (`--config` override, tests).
    #[must_use]
    pub fn at(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    /// Path of the backing file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl ProfileStore for TomlProfileStore {
    fn load(&self) -> Result<Vec<Profile>> {
        let text = match fs::read_to_string(&self.path) {
            Ok(text) => text,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                return Ok(Vec::new());
            }
            Err(err) => return Err(GlsError::io(&self.path, err)),
        };

        let store: StoreFile = toml::from_str(&text).map_err(|err| GlsError::ProfileParse {
            path: self.path.clone(),
            details: err.to_string(),
        })?;
        Ok(store.profiles)
    }

    fn save(&self, profiles: &[Profile]) -> Result<()> {
        let store = StoreFile {
            profiles: profiles.to_vec(),
        };
        let text = toml::to_string_pretty(&store)?;

        let dir = self.path.parent().unwrap_or_else(|| Path::new("."));
        fs::create_dir_all(dir).map_err(|err| GlsError::io(dir, err))?;

        let tmp = self.path.with_extension("toml.tmp");
        fs::write(&tmp, text).map_err(|err| GlsError::io(&tmp, err))?;
        restrict_permissions(&tmp)?;
        fs::rename(&tmp, &self.path).map_err(|err| GlsError::io(&self.path, err))?;
        Ok(())
    }
}

/// The store holds access tokens; keep it owner-readable only.
#[cfg(unix)]
fn restrict_permissions(path: &Path) -> Result<()> {
    use std::os::unix::fs::PermissionsExt;
    fs::set_permissions(path, fs::Permissions::from_mode(0o600))
        .map_err(|err| GlsError::io(path, err))
}

#[cfg(not(unix))]
fn restrict_permissions(_path: &Path) -> Result<()> {
    Ok(())
}

//! `settings.toml`: flat string keys behind `KeyValueStore`.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use tally_core::{Error, KeyValueStore};

pub struct SettingsFile {
    path: PathBuf,
    values: BTreeMap<String, String>,
}

impl SettingsFile {
    /// A missing file opens as empty.
    pub fn open(path: impl Into<PathBuf>) -> tally_core::Result<Self> {
        let path = path.into();
        let values = match fs::read_to_string(&path) {
            Ok(s) => toml::from_str(&s).map_err(|e| settings_error(&path, "*", e))?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => BTreeMap::new(),
            Err(e) => return Err(settings_error(&path, "*", e)),
        };
        Ok(Self { path, values })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

fn settings_error(path: &Path, key: &str, err: impl std::fmt::Display) -> Error {
    Error::Settings {
        key: key.to_string(),
        message: format!("{}: {err}", path.display()),
    }
}

impl KeyValueStore for SettingsFile {
    fn get(&self, key: &str) -> tally_core::Result<Option<String>> {
        Ok(self.values.get(key).cloned())
    }

    fn set(&mut self, key: &str, value: &str) -> tally_core::Result<()> {
        self.values.insert(key.to_string(), value.to_string());
        let s = toml::to_string(&self.values).map_err(|e| settings_error(&self.path, key, e))?;
        fs::write(&self.path, s).map_err(|e| settings_error(&self.path, key, e))
    }
}

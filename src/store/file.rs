//! A JSON file-backed implementation of the
//! [`SettingsStore`][super::SettingsStore] trait.
//!
//! Wraps a [`MemoryStore`][super::memory::MemoryStore], persisting each
//! update to a JSON file on disk that is reloaded across restarts.

use crate::error::Error;
use crate::store::memory::MemoryStore;
use crate::store::SettingsStore;
use std::fs;
use std::io::ErrorKind;

#[derive(Default, Debug, Clone)]
pub struct FileStore {
    store: MemoryStore,
    path: String,
}

impl FileStore {
    /// Loads a [`FileStore`] from the JSON state at the given path. A
    /// missing file is created with empty state.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidJson`] if the state file holds invalid JSON,
    /// and [`Error::Io`] if it can't be read or created.
    pub fn try_from_file(p: &str) -> Result<Self, Error> {
        let contents = match fs::read(p) {
            Ok(bytes) => bytes,
            Err(err) if err.kind() == ErrorKind::NotFound => Self::write_empty_state(p)?,
            Err(err) => return Err(Error::Io(err)),
        };

        let store: MemoryStore = serde_json::from_slice(&contents)?;
        Ok(Self {
            store,
            path: p.to_string(),
        })
    }

    /// Saves the store state as JSON to the configured path.
    pub fn save(&self) -> Result<(), Error> {
        let data = serde_json::to_string_pretty(&self.store)?;
        fs::write(&self.path, data)?;
        Ok(())
    }

    fn write_empty_state(p: &str) -> Result<Vec<u8>, Error> {
        let default_data = serde_json::to_string_pretty(&MemoryStore::default())?;
        fs::write(p, &default_data)?;
        Ok(default_data.into_bytes())
    }
}

impl SettingsStore for FileStore {
    fn load_port(&self) -> Option<u16> {
        self.store.load_port()
    }

    fn save_port(&mut self, port: u16) -> Result<(), Error> {
        self.store.save_port(port)?;
        self.save()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn state_survives_a_reload() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("srpd.json");
        let path = path.to_str().unwrap();

        let mut store = FileStore::try_from_file(path).unwrap();
        assert_eq!(store.load_port(), None);
        store.save_port(53540).unwrap();

        let reloaded = FileStore::try_from_file(path).unwrap();
        assert_eq!(reloaded.load_port(), Some(53540));
    }
}

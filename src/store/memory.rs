//! An in-memory implementation of the [`SettingsStore`][super::SettingsStore]
//! trait. Makes no effort to persist settings between restarts.

use crate::error::Error;
use crate::store::SettingsStore;
use serde::{Deserialize, Serialize};

#[derive(Default, Debug, Clone, Serialize, Deserialize)]
pub struct MemoryStore {
    port: Option<u16>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SettingsStore for MemoryStore {
    fn load_port(&self) -> Option<u16> {
        self.port
    }

    fn save_port(&mut self, port: u16) -> Result<(), Error> {
        self.port = Some(port);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn remembers_the_last_port() {
        let mut store = MemoryStore::new();
        assert_eq!(store.load_port(), None);
        store.save_port(53535).unwrap();
        store.save_port(53536).unwrap();
        assert_eq!(store.load_port(), Some(53536));
    }
}

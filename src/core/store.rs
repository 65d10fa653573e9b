//! Persistence seam for pet state and user settings
//!
//! The desktop shell owns the real key-value store; the core only needs the
//! `PetStore` trait. Records tolerate missing fields so a partial or stale
//! store never aborts startup. Read/write failures are absorbed by callers
//! (logged, defaults applied) per the crate error policy.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::core::error::{PetError, Result};

/// Persisted energy snapshot
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PetRecord {
    pub energy: i32,
    /// Milliseconds since epoch of the last energy update
    #[serde(default)]
    pub last_energy_update: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SoundSettings {
    #[serde(default = "default_true")]
    pub enabled: bool,
}

fn default_true() -> bool {
    true
}

impl Default for SoundSettings {
    fn default() -> Self {
        Self { enabled: true }
    }
}

/// User preferences surviving restarts
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub sound: SoundSettings,
    #[serde(default)]
    pub quiet_mode: bool,
    #[serde(default)]
    pub skin: Option<String>,
}

/// Abstract settings/state store supplied by the shell
pub trait PetStore {
    fn load_state(&mut self) -> Result<Option<PetRecord>>;
    fn save_state(&mut self, record: &PetRecord) -> Result<()>;
    fn load_settings(&mut self) -> Result<Settings>;
    fn save_settings(&mut self, settings: &Settings) -> Result<()>;
}

/// In-memory store for tests and storeless operation
#[derive(Default)]
pub struct MemoryStore {
    pub record: Option<PetRecord>,
    pub settings: Settings,
    /// When set, every write fails; used to exercise fallback paths
    pub fail_writes: bool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_record(record: PetRecord) -> Self {
        Self {
            record: Some(record),
            ..Self::default()
        }
    }
}

impl PetStore for MemoryStore {
    fn load_state(&mut self) -> Result<Option<PetRecord>> {
        Ok(self.record.clone())
    }

    fn save_state(&mut self, record: &PetRecord) -> Result<()> {
        if self.fail_writes {
            return Err(PetError::Store("writes disabled".to_string()));
        }
        self.record = Some(record.clone());
        Ok(())
    }

    fn load_settings(&mut self) -> Result<Settings> {
        Ok(self.settings.clone())
    }

    fn save_settings(&mut self, settings: &Settings) -> Result<()> {
        if self.fail_writes {
            return Err(PetError::Store("writes disabled".to_string()));
        }
        self.settings = settings.clone();
        Ok(())
    }
}

/// Full persisted document
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct StoreDocument {
    #[serde(default)]
    state: Option<PetRecord>,
    #[serde(default)]
    settings: Settings,
}

/// Single-file JSON store used by the desktop app
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    fn read(&self) -> Result<StoreDocument> {
        if !self.path.exists() {
            return Ok(StoreDocument::default());
        }
        let content = std::fs::read_to_string(&self.path)?;
        Ok(serde_json::from_str(&content)?)
    }

    fn write(&self, doc: &StoreDocument) -> Result<()> {
        let content = serde_json::to_string_pretty(doc)?;
        std::fs::write(&self.path, content)?;
        Ok(())
    }
}

impl PetStore for JsonFileStore {
    fn load_state(&mut self) -> Result<Option<PetRecord>> {
        Ok(self.read()?.state)
    }

    fn save_state(&mut self, record: &PetRecord) -> Result<()> {
        let mut doc = self.read().unwrap_or_default();
        doc.state = Some(record.clone());
        self.write(&doc)
    }

    fn load_settings(&mut self) -> Result<Settings> {
        Ok(self.read()?.settings)
    }

    fn save_settings(&mut self, settings: &Settings) -> Result<()> {
        let mut doc = self.read().unwrap_or_default();
        doc.settings = settings.clone();
        self.write(&doc)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_store_roundtrip() {
        let mut store = MemoryStore::new();
        assert!(store.load_state().unwrap().is_none());

        store
            .save_state(&PetRecord {
                energy: 60,
                last_energy_update: 1000,
            })
            .unwrap();
        let record = store.load_state().unwrap().unwrap();
        assert_eq!(record.energy, 60);
        assert_eq!(record.last_energy_update, 1000);
    }

    #[test]
    fn test_memory_store_failed_writes() {
        let mut store = MemoryStore::new();
        store.fail_writes = true;
        let result = store.save_state(&PetRecord {
            energy: 50,
            last_energy_update: 0,
        });
        assert!(result.is_err());
        assert!(store.load_state().unwrap().is_none());
    }

    #[test]
    fn test_settings_tolerate_partial_json() {
        let settings: Settings = serde_json::from_str("{}").unwrap();
        assert!(settings.sound.enabled);
        assert!(!settings.quiet_mode);
        assert!(settings.skin.is_none());

        let settings: Settings =
            serde_json::from_str(r#"{"quiet_mode": true}"#).unwrap();
        assert!(settings.quiet_mode);
        assert!(settings.sound.enabled);
    }

    #[test]
    fn test_record_tolerates_missing_timestamp() {
        let record: PetRecord = serde_json::from_str(r#"{"energy": 40}"#).unwrap();
        assert_eq!(record.energy, 40);
        assert_eq!(record.last_energy_update, 0);
    }

    #[test]
    fn test_json_file_store_roundtrip() {
        let dir = std::env::temp_dir().join("deskpet_store_test");
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("pet_state.json");
        let _ = std::fs::remove_file(&path);

        let mut store = JsonFileStore::new(&path);
        assert!(store.load_state().unwrap().is_none());

        store
            .save_state(&PetRecord {
                energy: 42,
                last_energy_update: 999,
            })
            .unwrap();
        store
            .save_settings(&Settings {
                quiet_mode: true,
                ..Settings::default()
            })
            .unwrap();

        // State and settings live in the same document
        let mut reopened = JsonFileStore::new(&path);
        assert_eq!(reopened.load_state().unwrap().unwrap().energy, 42);
        assert!(reopened.load_settings().unwrap().quiet_mode);

        let _ = std::fs::remove_file(&path);
    }
}

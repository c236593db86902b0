/// Persistence bridge for in-progress sessions
///
/// Saves the scalar form values and the current step into a durable
/// key-value slot, reads them back on the next start, and clears them once a
/// submission succeeds. Uploaded artifacts are never written.
use crate::circuit_breaker::{create_autosave_circuit_breaker, AutosaveBreaker};
use crate::errors::PersistenceError;
use crate::models::{FormValues, Step};
use crate::session::{Session, SessionSnapshot};
use crate::slot_entry::SlotEntry;
use failsafe::CircuitBreaker;
use std::collections::HashMap;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

/// Slot key holding the serialized scalar values.
pub const FORM_STATE_KEY: &str = "form-state";
/// Slot key holding the current step number as text.
pub const CURRENT_STEP_KEY: &str = "current-step";

/// A durable key-value slot.
pub trait SlotStore {
    fn get(&self, key: &str) -> Result<Option<String>, PersistenceError>;
    fn set(&self, key: &str, value: &str) -> Result<(), PersistenceError>;
    fn remove(&self, key: &str) -> Result<(), PersistenceError>;
}

/// Slot backed by one file per key inside a directory.
#[derive(Debug, Clone)]
pub struct FileSlotStore {
    dir: PathBuf,
}

impl FileSlotStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, key: &str) -> PathBuf {
        self.dir.join(key)
    }
}

impl SlotStore for FileSlotStore {
    fn get(&self, key: &str) -> Result<Option<String>, PersistenceError> {
        match fs::read_to_string(self.path_for(key)) {
            Ok(content) => Ok(Some(content)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// Writes to a temporary sibling and renames it over the key file, so a
    /// crash never leaves a half-written value behind.
    fn set(&self, key: &str, value: &str) -> Result<(), PersistenceError> {
        fs::create_dir_all(&self.dir)?;
        let target = self.path_for(key);
        let staging = self.dir.join(format!(".{}.tmp", key));
        fs::write(&staging, value)?;
        fs::rename(&staging, &target)?;
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), PersistenceError> {
        match fs::remove_file(self.path_for(key)) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

/// In-memory slot. Clones share the same storage.
#[derive(Debug, Clone, Default)]
pub struct MemorySlotStore {
    slots: Arc<Mutex<HashMap<String, String>>>,
}

impl MemorySlotStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, HashMap<String, String>>, PersistenceError> {
        self.slots
            .lock()
            .map_err(|_| PersistenceError::Unavailable("memory slot lock poisoned".to_string()))
    }
}

impl SlotStore for MemorySlotStore {
    fn get(&self, key: &str) -> Result<Option<String>, PersistenceError> {
        Ok(self.lock()?.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), PersistenceError> {
        self.lock()?.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), PersistenceError> {
        self.lock()?.remove(key);
        Ok(())
    }
}

pub struct PersistenceBridge<S> {
    store: S,
    breaker: AutosaveBreaker,
}

impl<S: SlotStore> PersistenceBridge<S> {
    pub fn new(store: S) -> Self {
        Self {
            store,
            breaker: create_autosave_circuit_breaker(),
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Writes the session's scalar values and current step.
    pub fn save(&self, session: &Session) -> Result<(), PersistenceError> {
        let values = serde_json::to_string(session.values())?;
        let entry = SlotEntry::new(values).encode()?;
        let step = session.current_step().number().to_string();

        let result = self.breaker.call(|| {
            self.store.set(FORM_STATE_KEY, &entry)?;
            self.store.set(CURRENT_STEP_KEY, &step)
        });

        match result {
            Ok(()) => {
                tracing::debug!(
                    "Session {} saved at step {}",
                    session.id(),
                    session.current_step().number()
                );
                Ok(())
            }
            Err(failsafe::Error::Inner(e)) => Err(e),
            Err(failsafe::Error::Rejected) => Err(PersistenceError::Suspended),
        }
    }

    /// Returns the saved snapshot, or `None` when there is no usable prior session.
    ///
    /// Read failures and corrupt values are treated as "no prior session". A
    /// missing or unreadable step with intact values restarts on step 1.
    pub fn load(&self) -> Option<SessionSnapshot> {
        let raw = match self.store.get(FORM_STATE_KEY) {
            Ok(Some(raw)) => raw,
            Ok(None) => return None,
            Err(e) => {
                tracing::warn!("Could not read saved form state: {}", e);
                return None;
            }
        };

        let data = SlotEntry::decode(&raw)?;
        let values: FormValues = match serde_json::from_str(&data) {
            Ok(values) => values,
            Err(e) => {
                tracing::warn!("Saved form state is not valid JSON: {}", e);
                return None;
            }
        };

        let step = match self.store.get(CURRENT_STEP_KEY) {
            Ok(Some(raw)) => parse_step(&raw).unwrap_or_else(|| {
                tracing::warn!("Saved step '{}' is not a valid step, starting over", raw.trim());
                Step::FIRST
            }),
            Ok(None) => Step::FIRST,
            Err(e) => {
                tracing::warn!("Could not read saved step: {}", e);
                Step::FIRST
            }
        };

        Some(SessionSnapshot { step, values })
    }

    /// Removes both slot keys.
    pub fn clear(&self) -> Result<(), PersistenceError> {
        self.store.remove(FORM_STATE_KEY)?;
        self.store.remove(CURRENT_STEP_KEY)?;
        tracing::debug!("Saved session cleared");
        Ok(())
    }
}

fn parse_step(raw: &str) -> Option<Step> {
    raw.trim().parse::<u8>().ok().and_then(Step::from_number)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Artifact, Field};

    #[test]
    fn test_save_then_load_round_trips_scalars() {
        let bridge = PersistenceBridge::new(MemorySlotStore::new());
        let mut session = Session::new();
        session.set_text(Field::FirstName, "Katherine").unwrap();
        session.set_text(Field::City, "Hampton").unwrap();
        session
            .attach(Field::Selfie, Artifact::new("me.png", "image/png", vec![1]))
            .unwrap();

        bridge.save(&session).unwrap();
        let snapshot = bridge.load().unwrap();

        assert_eq!(snapshot.step, Step::Personal);
        assert_eq!(snapshot.values.text(Field::FirstName), Some("Katherine"));
        assert_eq!(snapshot.values.text(Field::City), Some("Hampton"));
        assert!(snapshot.values.selfie.is_none());
    }

    #[test]
    fn test_step_stored_as_text() {
        let store = MemorySlotStore::new();
        let bridge = PersistenceBridge::new(store.clone());
        bridge.save(&Session::new()).unwrap();

        assert_eq!(store.get(CURRENT_STEP_KEY).unwrap().as_deref(), Some("1"));
    }

    #[test]
    fn test_empty_slot_is_no_session() {
        let bridge = PersistenceBridge::new(MemorySlotStore::new());
        assert!(bridge.load().is_none());
    }

    #[test]
    fn test_corrupt_form_state_is_no_session() {
        let store = MemorySlotStore::new();
        store.set(FORM_STATE_KEY, "{not json").unwrap();
        store.set(CURRENT_STEP_KEY, "3").unwrap();

        let bridge = PersistenceBridge::new(store);
        assert!(bridge.load().is_none());
    }

    #[test]
    fn test_corrupt_step_restarts_on_first_step() {
        let store = MemorySlotStore::new();
        let bridge = PersistenceBridge::new(store.clone());
        bridge.save(&Session::new()).unwrap();
        store.set(CURRENT_STEP_KEY, "9").unwrap();

        assert_eq!(bridge.load().unwrap().step, Step::Personal);
    }

    #[test]
    fn test_clear_removes_both_keys() {
        let store = MemorySlotStore::new();
        let bridge = PersistenceBridge::new(store.clone());
        bridge.save(&Session::new()).unwrap();
        bridge.clear().unwrap();

        assert!(store.get(FORM_STATE_KEY).unwrap().is_none());
        assert!(store.get(CURRENT_STEP_KEY).unwrap().is_none());
        assert!(bridge.load().is_none());
    }

    #[test]
    fn test_file_store_round_trip() {
        let dir = std::env::temp_dir().join(format!("kyc-slot-{}", uuid::Uuid::new_v4()));
        let store = FileSlotStore::new(&dir);

        assert_eq!(store.get("missing").unwrap(), None);
        store.set(CURRENT_STEP_KEY, "2").unwrap();
        assert_eq!(store.get(CURRENT_STEP_KEY).unwrap().as_deref(), Some("2"));
        store.remove(CURRENT_STEP_KEY).unwrap();
        store.remove(CURRENT_STEP_KEY).unwrap();
        assert_eq!(store.get(CURRENT_STEP_KEY).unwrap(), None);

        let _ = fs::remove_dir_all(dir);
    }

    struct BrokenStore;

    impl SlotStore for BrokenStore {
        fn get(&self, _key: &str) -> Result<Option<String>, PersistenceError> {
            Err(PersistenceError::Unavailable("offline".to_string()))
        }
        fn set(&self, _key: &str, _value: &str) -> Result<(), PersistenceError> {
            Err(PersistenceError::Unavailable("offline".to_string()))
        }
        fn remove(&self, _key: &str) -> Result<(), PersistenceError> {
            Err(PersistenceError::Unavailable("offline".to_string()))
        }
    }

    #[test]
    fn test_failing_store_reads_as_no_session() {
        let bridge = PersistenceBridge::new(BrokenStore);
        assert!(bridge.load().is_none());
    }

    #[test]
    fn test_repeated_write_failures_suspend_autosave() {
        let bridge = PersistenceBridge::new(BrokenStore);
        let session = Session::new();

        for _ in 0..5 {
            assert!(matches!(
                bridge.save(&session),
                Err(PersistenceError::Unavailable(_))
            ));
        }
        assert!(matches!(
            bridge.save(&session),
            Err(PersistenceError::Suspended)
        ));
    }
}

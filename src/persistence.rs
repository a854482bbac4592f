//! Persistence of the detector's running state.
//!
//! Two opaque values survive restarts: the running daily count and the
//! timestamp of the last accepted step. The second one lets the rollover
//! logic decide after a restart whether the persisted count still belongs
//! to "today".

use serde::{Deserialize, Serialize};

use crate::host::{StateStore, StoreError};

/// Store key for the running daily count.
pub const KEY_STEPS_TODAY: &str = "steps_today";
/// Store key for the timestamp of the last accepted step.
pub const KEY_LAST_STEP_MS: &str = "last_step_ms";

/// The state that must survive a restart.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct PersistedState {
    /// Steps counted since the last day rollover.
    pub steps_today: u32,
    /// Timestamp of the most recently accepted step, if any step has been
    /// accepted since the store was created.
    pub last_step_ms: Option<u64>,
}

/// Load persisted state, treating absent or damaged values as first start.
pub fn load(store: &dyn StateStore) -> PersistedState {
    let steps_today = store
        .get(KEY_STEPS_TODAY)
        .and_then(|v| u32::try_from(v).ok())
        .unwrap_or(0);
    let last_step_ms = store
        .get(KEY_LAST_STEP_MS)
        .and_then(|v| u64::try_from(v).ok())
        .filter(|&v| v > 0);
    PersistedState {
        steps_today,
        last_step_ms,
    }
}

/// Write the snapshot to the store. A missing last step is stored as zero,
/// the same "no step yet" sentinel `load` maps back to `None`.
pub fn save(store: &dyn StateStore, state: &PersistedState) -> Result<(), StoreError> {
    store.put(KEY_STEPS_TODAY, i64::from(state.steps_today))?;
    let last = state
        .last_step_ms
        .map(|v| i64::try_from(v).unwrap_or(i64::MAX))
        .unwrap_or(0);
    store.put(KEY_LAST_STEP_MS, last)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::MemoryStore;

    #[test]
    fn test_missing_state_is_first_start() {
        let store = MemoryStore::new();
        let state = load(&store);
        assert_eq!(state, PersistedState::default());
        assert_eq!(state.steps_today, 0);
        assert_eq!(state.last_step_ms, None);
    }

    #[test]
    fn test_save_then_load_restores_exactly() {
        let store = MemoryStore::new();
        let state = PersistedState {
            steps_today: 1234,
            last_step_ms: Some(1_700_000_000_000),
        };
        save(&store, &state).unwrap();
        assert_eq!(load(&store), state);
    }

    #[test]
    fn test_no_step_yet_roundtrips_as_none() {
        let store = MemoryStore::new();
        let state = PersistedState {
            steps_today: 0,
            last_step_ms: None,
        };
        save(&store, &state).unwrap();
        assert_eq!(load(&store).last_step_ms, None);
    }

    #[test]
    fn test_damaged_values_fall_back_to_defaults() {
        let store = MemoryStore::new();
        store.put(KEY_STEPS_TODAY, -5).unwrap();
        store.put(KEY_LAST_STEP_MS, -1).unwrap();
        let state = load(&store);
        assert_eq!(state.steps_today, 0);
        assert_eq!(state.last_step_ms, None);
    }
}

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;

use crate::ShowId;

#[derive(Default)]
struct RegistryState {
    /// Running show id -> generation of the playback that owns it.
    running: HashMap<ShowId, u64>,
    next_generation: u64,
}

/// The set of shows currently playing.
///
/// Presence here is the only thing that makes a show "running". Runners poll
/// it through their [`PlaybackToken`] and stop as soon as their entry is gone.
#[derive(Default)]
pub struct PlaybackRegistry {
    state: Mutex<RegistryState>,
}

impl PlaybackRegistry {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn is_running(&self, show_id: ShowId) -> bool {
        self.state.lock().running.contains_key(&show_id)
    }

    /// Registers a new playback of `show_id`.
    ///
    /// Returns `None` when the show is already running. The membership check
    /// and the insert happen under one lock, so two callers can never both
    /// register the same id.
    pub fn register(self: &Arc<Self>, show_id: ShowId) -> Option<PlaybackToken> {
        let mut state = self.state.lock();
        if state.running.contains_key(&show_id) {
            return None;
        }

        state.next_generation += 1;
        let generation = state.next_generation;
        state.running.insert(show_id, generation);

        Some(PlaybackToken {
            registry: Arc::clone(self),
            show_id,
            generation,
        })
    }

    /// Removes `show_id`; returns whether it was present. Removing an absent
    /// id is a no-op.
    pub fn remove(&self, show_id: ShowId) -> bool {
        self.state.lock().running.remove(&show_id).is_some()
    }

    /// Ids of every running show, ascending.
    pub fn running(&self) -> Vec<ShowId> {
        let mut ids: Vec<ShowId> = self.state.lock().running.keys().copied().collect();
        ids.sort_unstable();
        ids
    }

    pub fn len(&self) -> usize {
        self.state.lock().running.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn owns(&self, show_id: ShowId, generation: u64) -> bool {
        self.state.lock().running.get(&show_id) == Some(&generation)
    }

    fn release(&self, show_id: ShowId, generation: u64) -> bool {
        let mut state = self.state.lock();
        if state.running.get(&show_id) == Some(&generation) {
            state.running.remove(&show_id);
            true
        } else {
            false
        }
    }
}

/// Cancellation handle held by one playback.
///
/// A token is live while the registry still maps its show id to the
/// generation it was issued with. A stop followed by a fresh start of the
/// same show therefore cancels the old runner instead of reviving it.
pub struct PlaybackToken {
    registry: Arc<PlaybackRegistry>,
    show_id: ShowId,
    generation: u64,
}

impl PlaybackToken {
    pub fn show_id(&self) -> ShowId {
        self.show_id
    }

    pub fn is_active(&self) -> bool {
        self.registry.owns(self.show_id, self.generation)
    }

    /// Removes this playback's entry if it still owns it. Returns true only
    /// for the call that actually retired the playback.
    pub fn retire(&self) -> bool {
        self.registry.release(self.show_id, self.generation)
    }
}

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::task::JoinHandle;

use super::globals::Globals;
use super::registry::PlaybackRegistry;
use super::runner::{publish_state, RunOutcome, Sequencer, ShowRunner, Unbounded};
use crate::error::{EngineError, Result};
use crate::show::show::{Action, Group, Scene};
use crate::store::HierarchyStore;
use crate::transport::{show_command_filter, CommandTransport, ShowState};
use crate::ShowId;

/// Starts and stops show playbacks.
///
/// Every playback runs as its own tokio task. The controller, the runners
/// and the inbound command handler share one [`PlaybackRegistry`].
pub struct PlaybackController {
    store: Arc<dyn HierarchyStore>,
    transport: Arc<dyn CommandTransport>,
    registry: Arc<PlaybackRegistry>,
    handles: Mutex<HashMap<ShowId, JoinHandle<RunOutcome>>>,
}

impl PlaybackController {
    pub fn new(store: Arc<dyn HierarchyStore>, transport: Arc<dyn CommandTransport>) -> Self {
        Self {
            store,
            transport,
            registry: PlaybackRegistry::new(),
            handles: Mutex::new(HashMap::new()),
        }
    }

    pub fn store(&self) -> &Arc<dyn HierarchyStore> {
        &self.store
    }

    pub fn registry(&self) -> &Arc<PlaybackRegistry> {
        &self.registry
    }

    pub fn is_running(&self, show_id: ShowId) -> bool {
        self.registry.is_running(show_id)
    }

    pub fn running(&self) -> Vec<ShowId> {
        self.registry.running()
    }

    /// Starts playing `show_id` in the background.
    ///
    /// The show is read fresh from the store; later edits do not reach this
    /// playback. Returns once the runner task has been spawned.
    pub async fn start(&self, show_id: ShowId) -> Result<()> {
        if self.registry.is_running(show_id) {
            return Err(EngineError::AlreadyRunning(show_id));
        }

        let show = self.store.get_show_recursive(show_id)?;

        // A concurrent start may have won while the tree was loading.
        let token = self
            .registry
            .register(show_id)
            .ok_or(EngineError::AlreadyRunning(show_id))?;

        log::info!("Starting show: {}", show.name);
        publish_state(self.transport.as_ref(), &show, ShowState::On).await;

        let mut runner = ShowRunner::new(show, token, Arc::clone(&self.transport));
        let handle = tokio::spawn(async move { runner.run().await });

        let mut handles = self.handles.lock();
        handles.retain(|_, h| !h.is_finished());
        handles.insert(show_id, handle);

        Ok(())
    }

    /// Stops `show_id` and publishes OFF. The runner notices at its next
    /// checkpoint; this does not wait for it.
    ///
    /// Stopping a show that is not running still publishes OFF.
    pub async fn stop(&self, show_id: ShowId) -> Result<()> {
        let show = self.store.get_show(show_id)?;

        if self.registry.remove(show_id) {
            log::info!("Stopping show: {}", show.name);
        } else {
            log::debug!("Show {} is not running", show.name);
        }
        publish_state(self.transport.as_ref(), &show, ShowState::Off).await;

        Ok(())
    }

    /// Waits for the most recent playback of `show_id` to end. Returns `None`
    /// when there is no playback to wait for. Handles of finished playbacks
    /// are dropped on the next `start`, so join before starting another show
    /// to see how one ended.
    pub async fn join(&self, show_id: ShowId) -> Option<RunOutcome> {
        let handle = self.handles.lock().remove(&show_id)?;
        match handle.await {
            Ok(outcome) => Some(outcome),
            Err(e) => {
                log::error!("Show {} playback task failed: {}", show_id, e);
                None
            }
        }
    }

    /// Stops every running show and waits for the runners to exit.
    pub async fn shutdown(&self) {
        for show_id in self.registry.running() {
            if let Err(e) = self.stop(show_id).await {
                log::error!("Failed to stop show {}: {}", show_id, e);
                self.registry.remove(show_id);
            }
        }

        let handles: Vec<(ShowId, JoinHandle<RunOutcome>)> =
            self.handles.lock().drain().collect();
        for (show_id, handle) in handles {
            if let Err(e) = handle.await {
                log::error!("Show {} playback task failed: {}", show_id, e);
            }
        }
        log::info!("Playback shutdown complete");
    }

    /// Publishes OFF for every show with a topic and returns the command
    /// filters to subscribe to.
    pub async fn announce_shows(&self) -> Result<Vec<String>> {
        let mut filters = Vec::new();

        for show in self.store.get_shows()? {
            if show.topic.is_empty() {
                continue;
            }
            publish_state(self.transport.as_ref(), &show, ShowState::Off).await;
            filters.push(show_command_filter(&show.topic));
        }

        Ok(filters)
    }

    /// Sends one action to its devices, outside any playback.
    pub async fn execute_action(&self, action: &Action) {
        let sequencer = Sequencer::new(self.transport.as_ref(), &Unbounded);
        let _ = sequencer.dispatch(action, &Globals::default()).await;
    }

    /// Plays one group, including its delay, outside any playback.
    pub async fn execute_group(&self, group: &Group, globals: &Globals) {
        let sequencer = Sequencer::new(self.transport.as_ref(), &Unbounded);
        let _ = sequencer.play_group(group, globals).await;
    }

    /// Plays every group of a scene once, outside any playback.
    pub async fn execute_scene(&self, scene: &Scene, globals: &Globals) {
        log::info!("Executing scene: {}", scene.name);
        let sequencer = Sequencer::new(self.transport.as_ref(), &Unbounded);
        let _ = sequencer.play_scene(scene, globals).await;
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::store::{MemoryStore, ShowRecord};
    use crate::transport::RecordingTransport;

    #[tokio::test(start_paused = true)]
    async fn test_start_drops_finished_handles() {
        let store = MemoryStore::new();
        let first = store.add_show(ShowRecord {
            name: "first".to_string(),
            ..Default::default()
        });
        let second = store.add_show(ShowRecord {
            name: "second".to_string(),
            ..Default::default()
        });
        let controller =
            PlaybackController::new(Arc::new(store), Arc::new(RecordingTransport::new()));

        controller.start(first).await.unwrap();
        tokio::time::sleep(Duration::from_millis(10)).await;
        assert!(!controller.is_running(first));

        controller.start(second).await.unwrap();
        let tracked: Vec<ShowId> = controller.handles.lock().keys().copied().collect();
        assert_eq!(tracked, vec![second]);
    }
}

use std::sync::Arc;
use std::time::Duration;

use super::globals::Globals;
use super::registry::PlaybackToken;
use crate::show::show::{Action, Cycle, Group, Scene, Show};
use crate::transport::{CommandTransport, ShowState};

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum RunnerState {
    Idle,
    Running,
    Completed,
    Cancelled,
}

/// How a playback ended.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum RunOutcome {
    Completed,
    Cancelled,
}

/// Returned from a checkpoint once the playback has been stopped.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub(crate) struct Cancelled;

/// Polled before every cycle, scene repetition, group, action and device.
pub(crate) trait Checkpoint: Send + Sync {
    fn proceed(&self) -> bool;
}

impl Checkpoint for PlaybackToken {
    fn proceed(&self) -> bool {
        self.is_active()
    }
}

/// Checkpoint for one-shot execution outside any tracked playback.
pub(crate) struct Unbounded;

impl Checkpoint for Unbounded {
    fn proceed(&self) -> bool {
        true
    }
}

/// Sleeps for `seconds`. Not interrupted by a stop; the next checkpoint
/// observes it.
async fn wait(seconds: f64) {
    if seconds.is_finite() && seconds > 0.0 {
        tokio::time::sleep(Duration::from_secs_f64(seconds)).await;
    }
}

/// Walks scenes, groups and actions, publishing one command per device.
pub(crate) struct Sequencer<'a> {
    transport: &'a dyn CommandTransport,
    checkpoint: &'a dyn Checkpoint,
}

impl<'a> Sequencer<'a> {
    pub(crate) fn new(transport: &'a dyn CommandTransport, checkpoint: &'a dyn Checkpoint) -> Self {
        Self {
            transport,
            checkpoint,
        }
    }

    fn check(&self) -> Result<(), Cancelled> {
        if self.checkpoint.proceed() {
            Ok(())
        } else {
            Err(Cancelled)
        }
    }

    pub(crate) async fn play_scene(&self, scene: &Scene, globals: &Globals) -> Result<(), Cancelled> {
        let mut groups: Vec<&Group> = scene.groups.iter().collect();
        groups.sort_by_key(|g| g.order);

        for group in groups {
            self.check()?;
            self.play_group(group, globals).await?;
        }
        Ok(())
    }

    /// Fires every action back to back, then waits out the group delay.
    pub(crate) async fn play_group(&self, group: &Group, globals: &Globals) -> Result<(), Cancelled> {
        let mut actions: Vec<&Action> = group.actions.iter().collect();
        actions.sort_by_key(|a| a.order);

        for action in actions {
            self.check()?;
            self.dispatch(action, globals).await?;
        }

        wait(globals.group_delay(group)).await;
        Ok(())
    }

    pub(crate) async fn dispatch(&self, action: &Action, globals: &Globals) -> Result<(), Cancelled> {
        let parameter = globals.action_parameter(action);

        for device in &action.devices {
            self.check()?;

            log::debug!(
                "{} -> {} {} '{}'",
                device.name,
                device.topic,
                action.command,
                parameter
            );
            // Publish failures are logged; the remaining devices still get the command.
            if let Err(e) = self
                .transport
                .publish(&device.topic, &action.command, &parameter)
                .await
            {
                log::warn!(
                    "Failed to send {} to device {}: {}",
                    action.command,
                    device.name,
                    e
                );
            }
        }
        Ok(())
    }
}

/// Publishes a show's on/off state. Shows without a topic have no state to
/// publish.
pub(crate) async fn publish_state(transport: &dyn CommandTransport, show: &Show, state: ShowState) {
    if show.topic.is_empty() {
        log::debug!("Show {} has no topic, not publishing {}", show.name, state);
        return;
    }

    if let Err(e) = transport.publish_show_state(&show.topic, state).await {
        log::error!("Failed to publish {} for show {}: {}", state, show.name, e);
    }
}

/// Plays one show snapshot from start to finish, or until its playback token
/// is revoked.
pub struct ShowRunner {
    show: Show,
    token: PlaybackToken,
    transport: Arc<dyn CommandTransport>,
    state: RunnerState,
}

impl ShowRunner {
    pub fn new(show: Show, token: PlaybackToken, transport: Arc<dyn CommandTransport>) -> Self {
        Self {
            show,
            token,
            transport,
            state: RunnerState::Idle,
        }
    }

    pub fn state(&self) -> RunnerState {
        self.state
    }

    pub fn show(&self) -> &Show {
        &self.show
    }

    pub async fn run(&mut self) -> RunOutcome {
        if self.state != RunnerState::Idle {
            log::warn!("Show {} runner was already used", self.show.name);
            return RunOutcome::Cancelled;
        }
        self.state = RunnerState::Running;

        let outcome = match self.play().await {
            Ok(()) => RunOutcome::Completed,
            Err(Cancelled) => RunOutcome::Cancelled,
        };

        self.state = match outcome {
            RunOutcome::Completed => RunnerState::Completed,
            RunOutcome::Cancelled => RunnerState::Cancelled,
        };
        self.retire().await;

        outcome
    }

    async fn play(&self) -> Result<(), Cancelled> {
        let sequencer = Sequencer::new(self.transport.as_ref(), &self.token);
        let globals = Globals::for_show(&self.show.globals);
        let mut looping = false;

        loop {
            for cycle in &self.show.cycles {
                sequencer.check()?;

                if looping && !cycle.loop_include {
                    continue;
                }
                self.play_cycle(&sequencer, cycle, &globals).await?;
            }

            if !self.show.repeat {
                return Ok(());
            }
            if !self.show.cycles.iter().any(|c| c.loop_include) {
                log::info!(
                    "Show {} repeats but no cycle is included in the loop",
                    self.show.name
                );
                return Ok(());
            }

            looping = true;
            tokio::task::yield_now().await;
        }
    }

    async fn play_cycle(
        &self,
        sequencer: &Sequencer<'_>,
        cycle: &Cycle,
        show_globals: &Globals,
    ) -> Result<(), Cancelled> {
        let globals = show_globals.merge(&cycle.globals);

        for _ in 0..cycle.scene_cycles {
            sequencer.check()?;
            sequencer.play_scene(&cycle.scene, &globals).await?;
        }

        wait(cycle.end_delay).await;
        Ok(())
    }

    /// Takes the show out of the registry and publishes OFF, unless a stop
    /// already did both.
    async fn retire(&self) {
        if !self.token.retire() {
            log::info!("Show {} stopped", self.show.name);
            return;
        }

        log::info!("Show {} finished", self.show.name);
        publish_state(self.transport.as_ref(), &self.show, ShowState::Off).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::playback::registry::PlaybackRegistry;
    use crate::show::show::{Device, GlobalOverrides, GlobalParameter};
    use crate::transport::RecordingTransport;

    fn device(id: u64) -> Device {
        Device {
            id,
            name: format!("light-{}", id),
            topic: format!("light{}", id),
            device_type: 1,
        }
    }

    fn action(order: i32, command: &str, devices: Vec<Device>) -> Action {
        Action {
            id: order as u64,
            group_id: 1,
            devices,
            command: command.to_string(),
            parameter: "1".to_string(),
            global_parameter: GlobalParameter::None,
            order,
        }
    }

    fn scene(groups: Vec<Group>) -> Scene {
        Scene {
            id: 1,
            name: "scene".to_string(),
            allowed_devices: vec![],
            groups,
        }
    }

    fn group(order: i32, delay: f64, actions: Vec<Action>) -> Group {
        Group {
            id: order as u64,
            scene_id: 1,
            delay,
            global_delay: false,
            order,
            actions,
        }
    }

    fn cycle(id: u64, scene_cycles: u32, loop_include: bool, scene: Scene) -> Cycle {
        Cycle {
            id,
            show_id: 1,
            scene_id: scene.id,
            scene_cycles,
            end_delay: 0.0,
            loop_include,
            globals: GlobalOverrides::default(),
            scene,
        }
    }

    fn show(repeat: bool, cycles: Vec<Cycle>) -> Show {
        Show {
            id: 1,
            name: "test".to_string(),
            topic: "test".to_string(),
            repeat,
            globals: GlobalOverrides::default(),
            cycles,
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_groups_and_actions_follow_explicit_order() {
        let transport = Arc::new(RecordingTransport::new());
        let registry = PlaybackRegistry::new();
        let token = registry.register(1).unwrap();

        let scene = scene(vec![
            group(2, 0.0, vec![action(1, "Third", vec![device(1)])]),
            group(
                1,
                0.0,
                vec![
                    action(2, "Second", vec![device(1)]),
                    action(1, "First", vec![device(1)]),
                ],
            ),
        ]);
        let mut runner = ShowRunner::new(
            show(false, vec![cycle(1, 1, false, scene)]),
            token,
            transport.clone(),
        );
        assert_eq!(runner.state(), RunnerState::Idle);

        assert_eq!(runner.run().await, RunOutcome::Completed);
        assert_eq!(runner.state(), RunnerState::Completed);

        let topics: Vec<String> = transport.commands().into_iter().map(|m| m.topic).collect();
        assert_eq!(
            topics,
            vec!["light1/cmnd/First", "light1/cmnd/Second", "light1/cmnd/Third"]
        );
        assert_eq!(transport.states("test"), vec![ShowState::Off]);
        assert!(!registry.is_running(1));
    }

    #[tokio::test(start_paused = true)]
    async fn test_scene_repeats_scene_cycles_times() {
        let transport = Arc::new(RecordingTransport::new());
        let registry = PlaybackRegistry::new();
        let token = registry.register(1).unwrap();

        let scene = scene(vec![group(
            1,
            0.5,
            vec![action(1, "Power", vec![device(1), device(2)])],
        )]);
        let started = tokio::time::Instant::now();
        let mut runner = ShowRunner::new(
            show(false, vec![cycle(1, 3, false, scene)]),
            token,
            transport.clone(),
        );
        runner.run().await;

        assert_eq!(transport.commands().len(), 6);
        let elapsed = started.elapsed();
        assert!(elapsed >= Duration::from_millis(1500));
        assert!(elapsed < Duration::from_millis(1550));
    }

    #[tokio::test(start_paused = true)]
    async fn test_revoked_token_cancels_before_dispatch() {
        let transport = Arc::new(RecordingTransport::new());
        let registry = PlaybackRegistry::new();
        let token = registry.register(1).unwrap();
        registry.remove(1);

        let scene = scene(vec![group(1, 0.0, vec![action(1, "Power", vec![device(1)])])]);
        let mut runner = ShowRunner::new(
            show(true, vec![cycle(1, 1, true, scene)]),
            token,
            transport.clone(),
        );

        assert_eq!(runner.run().await, RunOutcome::Cancelled);
        assert_eq!(runner.state(), RunnerState::Cancelled);
        assert!(transport.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_repeat_without_loop_cycles_finishes_after_first_pass() {
        let transport = Arc::new(RecordingTransport::new());
        let registry = PlaybackRegistry::new();
        let token = registry.register(1).unwrap();

        let scene = scene(vec![group(1, 0.0, vec![action(1, "Power", vec![device(1)])])]);
        let mut runner = ShowRunner::new(
            show(true, vec![cycle(1, 1, false, scene)]),
            token,
            transport.clone(),
        );

        assert_eq!(runner.run().await, RunOutcome::Completed);
        assert_eq!(transport.commands().len(), 1);
    }

    #[tokio::test]
    async fn test_unbounded_sequencer_plays_group() {
        let transport = RecordingTransport::new();
        let sequencer = Sequencer::new(&transport, &Unbounded);
        let group = group(1, 0.0, vec![action(1, "Power", vec![device(1), device(2)])]);

        let result = sequencer.play_group(&group, &Globals::default()).await;
        assert_eq!(result, Ok(()));
        assert_eq!(transport.commands().len(), 2);
    }
}

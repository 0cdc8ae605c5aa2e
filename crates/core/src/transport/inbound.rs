use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use tokio::time::Instant;

use super::transport::ShowState;
use crate::playback::PlaybackController;
use crate::ShowId;

/// A message received on a subscribed topic.
#[derive(Debug, Clone, PartialEq)]
pub struct InboundMessage {
    pub topic: String,
    pub payload: String,
    pub received_at: DateTime<Utc>,
}

/// What the handler did with a message.
#[derive(Debug, Clone, PartialEq)]
pub enum InboundOutcome {
    /// Arrived during the startup grace period and was dropped.
    Ignored,
    /// Kept in the history; not a show command.
    Recorded,
    Started(ShowId),
    Stopped(ShowId),
    /// A show command that could not be carried out.
    Rejected(String),
}

/// Turns `ON`/`OFF` payloads on `mqlightshow/show/<topic>/cmnd/...` into
/// starts and stops of the show with that topic.
pub struct InboundHandler {
    controller: Arc<PlaybackController>,
    history: Mutex<VecDeque<InboundMessage>>,
    capacity: usize,
    ready_at: Instant,
}

impl InboundHandler {
    /// Messages are ignored until `grace` has passed, so retained state
    /// replayed on subscribe cannot start shows.
    pub fn new(controller: Arc<PlaybackController>, capacity: usize, grace: Duration) -> Self {
        Self {
            controller,
            history: Mutex::new(VecDeque::with_capacity(capacity)),
            capacity,
            ready_at: Instant::now() + grace,
        }
    }

    pub fn is_ready(&self) -> bool {
        Instant::now() >= self.ready_at
    }

    /// The most recent messages, oldest first.
    pub fn history(&self) -> Vec<InboundMessage> {
        self.history.lock().iter().cloned().collect()
    }

    pub async fn handle(&self, topic: &str, payload: &str) -> InboundOutcome {
        if !self.is_ready() {
            log::debug!("Ignoring message on {} while initializing", topic);
            return InboundOutcome::Ignored;
        }

        self.record(topic, payload);

        let state = match payload.parse::<ShowState>() {
            Ok(state) => state,
            Err(_) => {
                log::debug!("{} <- '{}'", topic, payload);
                return InboundOutcome::Recorded;
            }
        };

        let show_topic = match topic.split('/').nth(2) {
            Some(show_topic) => show_topic,
            None => return InboundOutcome::Recorded,
        };

        let show = match self.controller.store().get_show_by_topic(show_topic) {
            Ok(show) => show,
            Err(e) => {
                log::error!("Cannot get show by topic {}: {}", show_topic, e);
                return InboundOutcome::Rejected(e.to_string());
            }
        };

        let result = match state {
            ShowState::On => self.controller.start(show.id).await,
            ShowState::Off => self.controller.stop(show.id).await,
        };

        match (result, state) {
            (Ok(()), ShowState::On) => InboundOutcome::Started(show.id),
            (Ok(()), ShowState::Off) => InboundOutcome::Stopped(show.id),
            (Err(e), _) => {
                log::error!("{} command for show {} failed: {}", state, show.name, e);
                InboundOutcome::Rejected(e.to_string())
            }
        }
    }

    fn record(&self, topic: &str, payload: &str) {
        if self.capacity == 0 {
            return;
        }

        let mut history = self.history.lock();
        while history.len() >= self.capacity {
            history.pop_front();
        }
        history.push_back(InboundMessage {
            topic: topic.to_string(),
            payload: payload.to_string(),
            received_at: Utc::now(),
        });
    }
}

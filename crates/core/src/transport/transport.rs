use std::fmt;
use std::str::FromStr;

use async_trait::async_trait;

/// Prefix of every show state and show command topic.
pub const SHOW_TOPIC_PREFIX: &str = "mqlightshow/show";

/// On/off state published for a show.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShowState {
    On,
    Off,
}

impl ShowState {
    pub fn as_str(&self) -> &'static str {
        match self {
            ShowState::On => "ON",
            ShowState::Off => "OFF",
        }
    }
}

impl fmt::Display for ShowState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ShowState {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "ON" => Ok(ShowState::On),
            "OFF" => Ok(ShowState::Off),
            _ => Err(format!("not a show state: '{}'", s)),
        }
    }
}

pub fn command_topic(device_topic: &str, command: &str) -> String {
    format!("{}/cmnd/{}", device_topic, command)
}

pub fn show_state_topic(show_topic: &str) -> String {
    format!("{}/{}/stat", SHOW_TOPIC_PREFIX, show_topic)
}

/// Subscription filter for start/stop commands addressed to a show.
pub fn show_command_filter(show_topic: &str) -> String {
    format!("{}/{}/cmnd/#", SHOW_TOPIC_PREFIX, show_topic)
}

/// A message ready to hand to the broker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutboundMessage {
    pub topic: String,
    pub payload: String,
    pub retain: bool,
}

impl OutboundMessage {
    pub fn command(device_topic: &str, command: &str, parameter: &str) -> Self {
        Self {
            topic: command_topic(device_topic, command),
            payload: parameter.to_string(),
            retain: false,
        }
    }

    /// Show state is retained so late subscribers see the current state.
    pub fn show_state(show_topic: &str, state: ShowState) -> Self {
        Self {
            topic: show_state_topic(show_topic),
            payload: state.as_str().to_string(),
            retain: true,
        }
    }
}

#[derive(Debug, Clone, thiserror::Error)]
pub enum TransportError {
    #[error("transport is disconnected")]
    Disconnected,
    #[error("publish to '{topic}' rejected: {reason}")]
    Rejected { topic: String, reason: String },
}

/// Fire-and-forget publisher for device commands and show state.
///
/// Implementations must be safe to share between every running show.
#[async_trait]
pub trait CommandTransport: Send + Sync {
    async fn send(&self, message: OutboundMessage) -> Result<(), TransportError>;

    async fn publish(
        &self,
        device_topic: &str,
        command: &str,
        parameter: &str,
    ) -> Result<(), TransportError> {
        self.send(OutboundMessage::command(device_topic, command, parameter))
            .await
    }

    async fn publish_show_state(
        &self,
        show_topic: &str,
        state: ShowState,
    ) -> Result<(), TransportError> {
        self.send(OutboundMessage::show_state(show_topic, state))
            .await
    }
}

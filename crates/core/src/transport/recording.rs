use std::collections::HashSet;

use async_trait::async_trait;
use parking_lot::Mutex;

use super::transport::{
    show_state_topic, CommandTransport, OutboundMessage, ShowState, TransportError,
};

/// Keeps every published message in memory instead of sending it.
///
/// Used for dry runs and tests. Topics registered with
/// [`RecordingTransport::fail_topic`] reject publishes without recording them.
#[derive(Default)]
pub struct RecordingTransport {
    messages: Mutex<Vec<OutboundMessage>>,
    failing: Mutex<HashSet<String>>,
}

impl RecordingTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail_topic(&self, topic: impl Into<String>) {
        self.failing.lock().insert(topic.into());
    }

    pub fn messages(&self) -> Vec<OutboundMessage> {
        self.messages.lock().clone()
    }

    /// Device command messages only, in publish order.
    pub fn commands(&self) -> Vec<OutboundMessage> {
        self.messages
            .lock()
            .iter()
            .filter(|m| !m.retain)
            .cloned()
            .collect()
    }

    /// Every state published for `show_topic`, in publish order.
    pub fn states(&self, show_topic: &str) -> Vec<ShowState> {
        let topic = show_state_topic(show_topic);
        self.messages
            .lock()
            .iter()
            .filter(|m| m.topic == topic)
            .filter_map(|m| m.payload.parse().ok())
            .collect()
    }

    pub fn count_for(&self, topic: &str) -> usize {
        self.messages
            .lock()
            .iter()
            .filter(|m| m.topic == topic)
            .count()
    }

    pub fn len(&self) -> usize {
        self.messages.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&self) {
        self.messages.lock().clear();
    }
}

#[async_trait]
impl CommandTransport for RecordingTransport {
    async fn send(&self, message: OutboundMessage) -> Result<(), TransportError> {
        if self.failing.lock().contains(&message.topic) {
            return Err(TransportError::Rejected {
                topic: message.topic,
                reason: "configured to fail".to_string(),
            });
        }

        self.messages.lock().push(message);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_records_commands_and_states() {
        let transport = RecordingTransport::new();
        transport.publish("porch", "Power", "ON").await.unwrap();
        transport
            .publish_show_state("xmas", ShowState::On)
            .await
            .unwrap();

        assert_eq!(transport.len(), 2);
        assert_eq!(transport.commands()[0].topic, "porch/cmnd/Power");
        assert_eq!(transport.states("xmas"), vec![ShowState::On]);
    }

    #[tokio::test]
    async fn test_failing_topic_is_not_recorded() {
        let transport = RecordingTransport::new();
        transport.fail_topic("porch/cmnd/Power");

        let result = transport.publish("porch", "Power", "ON").await;
        assert!(matches!(result, Err(TransportError::Rejected { .. })));
        assert!(transport.is_empty());
    }
}

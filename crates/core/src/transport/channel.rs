use async_trait::async_trait;
use tokio::sync::mpsc;

use super::transport::{CommandTransport, OutboundMessage, TransportError};

/// Hands outbound messages to whatever task owns the broker connection.
pub struct ChannelTransport {
    sender: mpsc::Sender<OutboundMessage>,
}

impl ChannelTransport {
    pub fn new(capacity: usize) -> (Self, mpsc::Receiver<OutboundMessage>) {
        let (sender, receiver) = mpsc::channel(capacity);
        (Self { sender }, receiver)
    }

    pub fn from_sender(sender: mpsc::Sender<OutboundMessage>) -> Self {
        Self { sender }
    }
}

#[async_trait]
impl CommandTransport for ChannelTransport {
    async fn send(&self, message: OutboundMessage) -> Result<(), TransportError> {
        self.sender
            .send(message)
            .await
            .map_err(|_| TransportError::Disconnected)
    }
}

/// Writes outbound messages to the log instead of a broker.
#[derive(Default)]
pub struct LogTransport;

#[async_trait]
impl CommandTransport for LogTransport {
    async fn send(&self, message: OutboundMessage) -> Result<(), TransportError> {
        log::info!(
            "publish {} <- '{}'{}",
            message.topic,
            message.payload,
            if message.retain { " (retained)" } else { "" }
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_forwards_to_receiver() {
        let (transport, mut rx) = ChannelTransport::new(4);
        transport.publish("porch", "Dimmer", "40").await.unwrap();

        let msg = rx.recv().await.unwrap();
        assert_eq!(msg.topic, "porch/cmnd/Dimmer");
        assert_eq!(msg.payload, "40");
    }

    #[tokio::test]
    async fn test_closed_receiver_reports_disconnected() {
        let (transport, rx) = ChannelTransport::new(1);
        drop(rx);

        let result = transport.publish("porch", "Dimmer", "40").await;
        assert!(matches!(result, Err(TransportError::Disconnected)));
    }
}

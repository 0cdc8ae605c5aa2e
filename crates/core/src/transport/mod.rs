pub mod channel;
pub mod inbound;
pub mod recording;
pub mod transport;

pub use channel::{ChannelTransport, LogTransport};
pub use inbound::{InboundHandler, InboundMessage, InboundOutcome};
pub use recording::RecordingTransport;
pub use transport::{
    command_topic, show_command_filter, show_state_topic, CommandTransport, OutboundMessage,
    ShowState, TransportError, SHOW_TOPIC_PREFIX,
};

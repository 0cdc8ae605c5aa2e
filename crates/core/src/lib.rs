pub use config::{ConfigError, ConfigManager, Settings};
pub use error::{EngineError, Result};
pub use playback::{
    Globals, PlaybackController, PlaybackRegistry, PlaybackToken, RunOutcome, RunnerState,
    ShowRunner,
};
pub use show::show::{
    Action, ActionId, Cycle, CycleId, Device, DeviceId, GlobalOverrides, GlobalParameter, Group,
    GroupId, Scene, SceneId, Show, ShowId,
};
pub use store::{HierarchyStore, MemoryStore, StoreError};
pub use transport::{
    ChannelTransport, CommandTransport, InboundHandler, InboundMessage, InboundOutcome,
    LogTransport, OutboundMessage, RecordingTransport, ShowState, TransportError,
};

mod config;
mod error;
pub mod playback;
mod show;
pub mod store;
pub mod transport;

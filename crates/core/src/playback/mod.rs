pub mod controller;
pub mod globals;
pub mod registry;
pub mod runner;

pub use controller::PlaybackController;
pub use globals::Globals;
pub use registry::{PlaybackRegistry, PlaybackToken};
pub use runner::{RunOutcome, RunnerState, ShowRunner};

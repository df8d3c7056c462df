pub mod controller;
pub mod state;

pub use controller::{Recorder, TickOutcome};
pub use state::{RecordingSession, RecordingStatus};

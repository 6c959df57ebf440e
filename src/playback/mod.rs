pub mod output;
pub mod session;
pub mod types;

pub use output::{AudioSink, CpalSink, SilentSink, SinkFactory, SinkProbe};
pub use session::PlaybackSession;
pub use types::{PlaybackEvent, PlaybackState, PlaybackStatus, StartOutcome};

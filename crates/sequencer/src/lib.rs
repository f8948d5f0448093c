//! Scripted choreography for the incident demo: beat-by-beat timeline
//! playback, the blast-radius failure cascade, simulated agent chat and the
//! revenue ticker. Nothing here touches the network; all timing runs on
//! cancellable tokio tasks owned by the [`Scheduler`].

use shared::domain::NodeId;
use thiserror::Error;

pub mod cascade;
pub mod chat;
pub mod driver;
pub mod scheduler;
pub mod script;
pub mod story;
pub mod ticker;
pub mod timeline;

pub use cascade::{Cascade, CascadeConfig, CascadeEvent, CascadePhase, CascadeWave};
pub use chat::{ChatConfig, ChatDriver, ChatEvent, ChatSession};
pub use driver::{CascadeDriver, PlaybackDriver};
pub use scheduler::Scheduler;
pub use story::StoryBeat;
pub use ticker::{format_clock, format_revenue, RevenueTicker, TickerDriver};
pub use timeline::{Beat, PlaybackState, Timeline, TimelineConfig, TimelineEvent};

/// Invalid static configuration; runtime misuse is a no-op, never an error.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum SequencerError {
    #[error("timeline has no beats")]
    EmptyTimeline,
    #[error("seconds per beat must be positive")]
    ZeroBeatLength,
    #[error("maximum duration must be positive")]
    ZeroDuration,
    #[error("beat {index} would start after the maximum duration")]
    BeatPastEnd { index: usize },
    #[error("cascade has no waves")]
    NoWaves,
    #[error("cascade wave {index} lists no entities")]
    EmptyWave { index: usize },
    #[error("entity '{node}' appears in more than one wave")]
    OverlappingWave { node: NodeId },
}

//! Core library for the beatsync rhythm scheduler.
//!
//! A [`Session`] loads a [`Track`] of notes, obstacles and stage cues, keeps
//! a [`LookaheadClock`] ahead of the playback clock and, on every step,
//! dispatches the entries whose time entered the step's window. Notes and
//! obstacles are handed to a [`PoolGateway`] as pooled presentable objects;
//! cues are routed through the [`CueRouter`] to a [`StageHandler`].

pub mod clock;
pub mod config;
pub mod cue;
pub mod error;
pub mod placement;
pub mod pool;
pub mod scheduler;
pub mod session;
pub mod stage;
pub mod track;

pub use clock::{ClockSource, ClockTick, LookaheadClock, ManualClock, PlaybackClock};
pub use config::{AppConfig, PoolConfig, SessionConfig, WARMUP_OFFSET_MS};
pub use cue::{CueAction, CueRouter, StageCall, StageHandler};
pub use error::{BeatSyncError, Result};
pub use placement::{CutDirection, NotePlacement, Placement, WallPlacement};
pub use pool::{NoteColor, NoteStyle, PoolGateway, PoolKey, PoolSet, PresentableHandle};
pub use scheduler::{DispatchPlan, Scheduler};
pub use session::{ResetRequest, Session, SessionEvent, SessionState, StepReport};
pub use stage::StageState;
pub use track::{CueEvent, Note, NoteKind, Obstacle, Track, TrackSummary};

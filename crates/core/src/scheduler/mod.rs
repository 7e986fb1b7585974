//! Window scheduling over the three track sequences.
//!
//! Each sequence keeps a monotone cursor. A step consumes every entry at or
//! after the cursor whose time falls at or before the end of that step's
//! window, so no entry is ever handed out twice, even when a resync moves
//! virtual time backwards. Consumed entries outside the window, such as
//! those a forward resync jumped over, are reported as stale and are not
//! replayed.

use std::ops::Range;

use crate::{clock::ClockTick, track::Track};

/// Entries of one sequence consumed by a step.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Slot {
    /// Outside every window this step could cover; never dispatched.
    pub stale: Range<usize>,
    /// Due in this step, in authoring order.
    pub due: Range<usize>,
}

impl Slot {
    fn empty(at: usize) -> Self {
        Self {
            stale: at..at,
            due: at..at,
        }
    }
}

/// What a single step should dispatch. Channels are dispatched in field
/// order: notes, then obstacles, then cues.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DispatchPlan {
    pub notes: Slot,
    pub obstacles: Slot,
    pub cues: Slot,
}

impl DispatchPlan {
    pub fn stale_count(&self) -> usize {
        self.notes.stale.len() + self.obstacles.stale.len() + self.cues.stale.len()
    }

    pub fn due_count(&self) -> usize {
        self.notes.due.len() + self.obstacles.due.len() + self.cues.due.len()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Scheduler {
    note_cursor: usize,
    obstacle_cursor: usize,
    cue_cursor: usize,
}

impl Scheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Positions the cursors at the start of `track`. The cue cursor starts
    /// after the priming entries, which are dispatched once at activation.
    pub fn arm(&mut self, track: &Track) {
        self.note_cursor = 0;
        self.obstacle_cursor = 0;
        self.cue_cursor = track.priming_entries().len();
    }

    pub fn clear(&mut self) {
        *self = Self::default();
    }

    pub fn cursors(&self) -> (usize, usize, usize) {
        (self.note_cursor, self.obstacle_cursor, self.cue_cursor)
    }

    /// Consumes the entries due in `tick`'s window. The melodic window is
    /// shifted back by `warmup_offset_ms` so notes have travel time.
    pub fn plan(&mut self, track: &Track, tick: &ClockTick, warmup_offset_ms: f64) -> DispatchPlan {
        let start = tick.window_start_ms;
        let end = tick.window_end_ms();
        let catch_up = !tick.resynced;

        let notes = consume(
            &mut self.note_cursor,
            track.notes(),
            |note| track.millis_at_offset(note.beat),
            start - warmup_offset_ms,
            end - warmup_offset_ms,
            catch_up,
        );
        let obstacles = consume(
            &mut self.obstacle_cursor,
            track.obstacles(),
            |obstacle| track.millis_at_offset(obstacle.beat),
            start,
            end,
            catch_up,
        );
        let cues = consume(
            &mut self.cue_cursor,
            track.events(),
            |event| track.millis_at_offset(event.beat),
            start,
            end,
            catch_up,
        );

        DispatchPlan {
            notes,
            obstacles,
            cues,
        }
    }
}

/// Advances `cursor` past every entry timed at or before `end`. Consumed
/// entries timed at or before `start` lie outside the window `(start, end]`
/// and are stale. With `catch_up` set, those timed at or after zero are due
/// instead, so an entry at the very start of the track is not lost to the
/// first window. Relies on `entries` being sorted by time.
fn consume<T>(
    cursor: &mut usize,
    entries: &[T],
    time_ms: impl Fn(&T) -> f64,
    start: f64,
    end: f64,
    catch_up: bool,
) -> Slot {
    let from = (*cursor).min(entries.len());
    let pending = &entries[from..];
    let to = from + pending.partition_point(|entry| time_ms(entry) <= end);
    if to == from {
        return Slot::empty(from);
    }

    let consumed = &entries[from..to];
    let mut split = from + consumed.partition_point(|entry| time_ms(entry) <= start);
    if catch_up {
        split = split.min(from + consumed.partition_point(|entry| time_ms(entry) < 0.0));
    }
    *cursor = to;

    Slot {
        stale: from..split,
        due: split..to,
    }
}

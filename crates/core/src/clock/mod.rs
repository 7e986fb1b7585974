//! Playback clock sources and the lookahead clock that leads them.

/// Anything that can report the current playback position. `None` means
/// playback has not started yet.
pub trait ClockSource {
    fn current_time_ms(&self) -> Option<f64>;
}

impl<F> ClockSource for F
where
    F: Fn() -> Option<f64>,
{
    fn current_time_ms(&self) -> Option<f64> {
        self()
    }
}

/// Clock source whose reading is set by hand.
#[derive(Debug, Default, Clone, Copy, PartialEq)]
pub struct ManualClock {
    reading: Option<f64>,
}

impl ManualClock {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn at(time_ms: f64) -> Self {
        Self {
            reading: Some(time_ms),
        }
    }

    pub fn set(&mut self, time_ms: f64) {
        self.reading = Some(time_ms);
    }

    pub fn clear(&mut self) {
        self.reading = None;
    }
}

impl ClockSource for ManualClock {
    fn current_time_ms(&self) -> Option<f64> {
        self.reading
    }
}

/// Simulated audio clock. Position advances continuously once started but
/// is only reported in `report_interval_ms` increments, the way an audio
/// backend updates its playback position less often than frames are drawn.
#[derive(Debug, Clone, PartialEq)]
pub struct PlaybackClock {
    position_ms: f64,
    report_interval_ms: f64,
    playing: bool,
}

impl PlaybackClock {
    pub fn new(report_interval_ms: f64) -> Self {
        Self {
            position_ms: 0.0,
            report_interval_ms: report_interval_ms.max(0.0),
            playing: false,
        }
    }

    pub fn start(&mut self) {
        self.playing = true;
    }

    pub fn reset(&mut self) {
        self.position_ms = 0.0;
        self.playing = false;
    }

    pub fn advance(&mut self, delta_ms: f64) {
        if self.playing {
            self.position_ms = (self.position_ms + delta_ms).max(0.0);
        }
    }

    pub fn position_ms(&self) -> f64 {
        self.position_ms
    }
}

impl ClockSource for PlaybackClock {
    fn current_time_ms(&self) -> Option<f64> {
        if !self.playing {
            return None;
        }
        if self.report_interval_ms <= 0.0 {
            return Some(self.position_ms);
        }
        let reports = (self.position_ms / self.report_interval_ms).floor();
        Some(reports * self.report_interval_ms)
    }
}

/// Outcome of one [`LookaheadClock::advance`] call.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ClockTick {
    /// Virtual time at the start of the step, after any resync.
    pub window_start_ms: f64,
    pub delta_ms: f64,
    /// The playback reading changed and virtual time was snapped to it.
    pub resynced: bool,
    /// Set on the single step where the warmup countdown ran out.
    pub preload_complete: bool,
}

impl ClockTick {
    pub fn window_end_ms(&self) -> f64 {
        self.window_start_ms + self.delta_ms
    }
}

/// Virtual clock that leads the playback clock by a fixed anticipation
/// interval, so objects can be spawned ahead of the moment they are due.
#[derive(Debug, Clone, PartialEq)]
pub struct LookaheadClock {
    virtual_time_ms: f64,
    anticipation_ms: f64,
    last_observed_ms: Option<f64>,
    warmup_remaining_ms: Option<f64>,
}

impl LookaheadClock {
    pub fn new(anticipation_ms: f64) -> Self {
        Self {
            virtual_time_ms: 0.0,
            anticipation_ms,
            last_observed_ms: None,
            warmup_remaining_ms: Some(anticipation_ms),
        }
    }

    /// Re-arms the clock to its initial warmup state.
    pub fn reset(&mut self) {
        *self = Self::new(self.anticipation_ms);
    }

    pub fn virtual_time_ms(&self) -> f64 {
        self.virtual_time_ms
    }

    pub fn anticipation_ms(&self) -> f64 {
        self.anticipation_ms
    }

    pub fn last_observed_ms(&self) -> Option<f64> {
        self.last_observed_ms
    }

    pub fn is_warming_up(&self) -> bool {
        self.warmup_remaining_ms.is_some()
    }

    /// Runs one step of `step_delta_ms`. The returned window starts at the
    /// current virtual time and virtual time moves on by exactly the delta,
    /// so windows of consecutive steps are contiguous unless a new playback
    /// reading forces a resync.
    pub fn advance(&mut self, step_delta_ms: f64, playback_ms: Option<f64>) -> ClockTick {
        let mut resynced = false;
        if let Some(reading) = playback_ms {
            if self.last_observed_ms != Some(reading) {
                self.last_observed_ms = Some(reading);
                self.virtual_time_ms = reading + self.anticipation_ms;
                resynced = true;
                tracing::debug!(
                    playback_ms = reading,
                    virtual_time_ms = self.virtual_time_ms,
                    "resynced lookahead clock"
                );
            }
        }

        let window_start_ms = self.virtual_time_ms;

        let mut preload_complete = false;
        if let Some(remaining) = self.warmup_remaining_ms {
            let remaining = remaining - step_delta_ms;
            if remaining <= 0.0 {
                preload_complete = true;
                self.last_observed_ms = playback_ms;
                self.warmup_remaining_ms = None;
            } else {
                self.warmup_remaining_ms = Some(remaining);
            }
        }

        self.virtual_time_ms += step_delta_ms;

        ClockTick {
            window_start_ms,
            delta_ms: step_delta_ms,
            resynced,
            preload_complete,
        }
    }
}

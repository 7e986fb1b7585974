//! Lifecycle of a playback session: loading, activation, stepping and reset.

use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};

use serde_json::Value;

use crate::{
    clock::{ClockSource, LookaheadClock},
    cue::{CueRouter, StageHandler},
    placement::{NotePlacement, Placement, WallPlacement},
    pool::{PoolGateway, PoolKey, PresentableHandle},
    scheduler::Scheduler,
    track::Track,
    BeatSyncError, Result, SessionConfig,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Idle,
    /// A track is loaded and waiting for [`Session::start`].
    Prefetched,
    Active,
}

/// Signals for the surrounding UI and audio layers. Each fires at most once
/// per load or activation cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionEvent {
    LoadStarted,
    LoadFinished { success: bool },
    PreloadComplete,
}

/// Cloneable flag that asks the session to reset. Collaborators may set it
/// while the session is dispatching; the session honors it before the next
/// entry is dispatched.
#[derive(Debug, Clone, Default)]
pub struct ResetRequest {
    flag: Arc<AtomicBool>,
}

impl ResetRequest {
    pub fn request(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    pub fn is_requested(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }

    fn take(&self) -> bool {
        self.flag.swap(false, Ordering::SeqCst)
    }

    fn clear(&self) {
        self.flag.store(false, Ordering::SeqCst);
    }
}

/// What happened during one [`Session::step`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StepReport {
    pub window_start_ms: f64,
    pub window_end_ms: f64,
    pub resynced: bool,
    pub notes: usize,
    pub obstacles: usize,
    pub cues: usize,
    /// Entries skipped because no presentable object could be acquired.
    pub exhausted: usize,
    /// Entries consumed outside the window, such as those a forward resync
    /// jumped over.
    pub stale: usize,
    pub preload_complete: bool,
    /// The step ended in a reset.
    pub reset: bool,
}

impl StepReport {
    pub fn dispatched(&self) -> usize {
        self.notes + self.obstacles + self.cues
    }
}

/// Drives one track at a time against a pool gateway and a stage handler.
#[derive(Debug)]
pub struct Session<P, S> {
    config: SessionConfig,
    state: SessionState,
    track: Option<Arc<Track>>,
    clock: LookaheadClock,
    scheduler: Scheduler,
    router: CueRouter,
    live: Vec<PresentableHandle>,
    pools: P,
    stage: S,
    events: Vec<SessionEvent>,
    reset_request: ResetRequest,
}

impl<P, S> Session<P, S>
where
    P: PoolGateway,
    S: StageHandler,
{
    pub fn new(config: SessionConfig, pools: P, stage: S) -> Self {
        Self {
            clock: LookaheadClock::new(config.anticipation_ms),
            config,
            state: SessionState::Idle,
            track: None,
            scheduler: Scheduler::new(),
            router: CueRouter::new(),
            live: Vec::new(),
            pools,
            stage,
            events: Vec::new(),
            reset_request: ResetRequest::default(),
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub fn track(&self) -> Option<&Track> {
        self.track.as_deref()
    }

    pub fn clock(&self) -> &LookaheadClock {
        &self.clock
    }

    pub fn pools(&self) -> &P {
        &self.pools
    }

    pub fn pools_mut(&mut self) -> &mut P {
        &mut self.pools
    }

    pub fn stage(&self) -> &S {
        &self.stage
    }

    pub fn stage_mut(&mut self) -> &mut S {
        &mut self.stage
    }

    /// Objects dispatched and not yet completed or reset, oldest first.
    pub fn live_handles(&self) -> &[PresentableHandle] {
        &self.live
    }

    pub fn reset_handle(&self) -> ResetRequest {
        self.reset_request.clone()
    }

    pub fn drain_events(&mut self) -> Vec<SessionEvent> {
        std::mem::take(&mut self.events)
    }

    /// Loads and validates raw track data so a later [`Session::start`] can
    /// begin playback without parsing.
    pub fn prefetch(&mut self, raw: &Value) -> Result<()> {
        if self.state == SessionState::Active {
            return Err(BeatSyncError::InvalidInput(
                "cannot prefetch while a track is active",
            ));
        }

        self.events.push(SessionEvent::LoadStarted);
        match Track::load(raw) {
            Ok(track) => {
                let summary = track.summary();
                tracing::info!(
                    tempo = summary.tempo,
                    notes = summary.notes,
                    obstacles = summary.obstacles,
                    events = summary.events,
                    "track loaded"
                );
                self.track = Some(Arc::new(track));
                self.state = SessionState::Prefetched;
                self.events.push(SessionEvent::LoadFinished { success: true });
                Ok(())
            }
            Err(err) => {
                tracing::warn!(%err, "failed to load track");
                self.track = None;
                self.state = SessionState::Idle;
                self.events.push(SessionEvent::LoadFinished { success: false });
                Err(err)
            }
        }
    }

    /// Starts playback of the prefetched track, or restarts the last one.
    pub fn start(&mut self) -> Result<()> {
        let track = self
            .track
            .clone()
            .ok_or(BeatSyncError::InvalidInput("no track has been loaded"))?;
        self.activate_shared(track);
        Ok(())
    }

    pub fn activate(&mut self, track: Track) {
        self.activate_shared(Arc::new(track));
    }

    fn activate_shared(&mut self, track: Arc<Track>) {
        self.release_live();
        self.clock.reset();
        self.scheduler.arm(&track);
        self.reset_request.clear();
        self.state = SessionState::Active;

        let priming = track.priming_entries();
        for event in priming {
            self.router
                .dispatch(&mut self.stage, event.category, &event.value);
        }
        tracing::info!(
            tempo = track.tempo(),
            primed = priming.len(),
            "track activated"
        );
        self.track = Some(track);
    }

    /// Pauses dispatching. Live objects stay out until completed or reset.
    pub fn stop(&mut self) {
        if self.state == SessionState::Active {
            tracing::info!(live = self.live.len(), "session stopped");
            self.state = SessionState::Idle;
        }
    }

    /// Returns every live object to its pool and re-arms the clock. The
    /// loaded track is kept so [`Session::start`] can replay it. Calling
    /// this again has no further effect.
    pub fn reset(&mut self) {
        let drained = self.live.len();
        self.release_live();
        self.clock.reset();
        self.scheduler.clear();
        self.reset_request.clear();
        if self.state != SessionState::Idle || drained > 0 {
            tracing::info!(drained, "session reset");
        }
        self.state = SessionState::Idle;
    }

    /// Reports that a live object finished on its own. Returns `false` when
    /// the handle is not live, so each object is released at most once.
    pub fn complete(&mut self, handle: &PresentableHandle) -> bool {
        let Some(position) = self.live.iter().position(|live| live == handle) else {
            return false;
        };
        let handle = self.live.remove(position);
        self.pools.release(handle);
        true
    }

    /// Advances the session by `delta_ms`, sampling `clock` once, and
    /// dispatches every entry due in the step's window.
    pub fn step<C>(&mut self, clock: &C, delta_ms: f64) -> Result<StepReport>
    where
        C: ClockSource + ?Sized,
    {
        if !delta_ms.is_finite() || delta_ms < 0.0 {
            return Err(BeatSyncError::InvalidInput(
                "step delta must be a non-negative number",
            ));
        }

        let mut report = StepReport::default();
        if self.state != SessionState::Active {
            return Ok(report);
        }
        let Some(track) = self.track.clone() else {
            return Ok(report);
        };
        if self.honor_reset_request(&mut report) {
            return Ok(report);
        }

        let tick = self.clock.advance(delta_ms, clock.current_time_ms());
        report.window_start_ms = tick.window_start_ms;
        report.window_end_ms = tick.window_end_ms();
        report.resynced = tick.resynced;

        let plan = self
            .scheduler
            .plan(&track, &tick, self.config.warmup_offset_ms);
        report.stale = plan.stale_count();
        if report.stale > 0 {
            tracing::debug!(
                stale = report.stale,
                window_start_ms = tick.window_start_ms,
                "skipped entries outside the dispatch window"
            );
        }

        for index in plan.notes.due {
            self.dispatch_note(&track, index, &mut report);
            if self.honor_reset_request(&mut report) {
                return Ok(report);
            }
        }
        for index in plan.obstacles.due {
            self.dispatch_obstacle(&track, index, &mut report);
            if self.honor_reset_request(&mut report) {
                return Ok(report);
            }
        }
        for index in plan.cues.due {
            let event = &track.events()[index];
            self.router
                .dispatch(&mut self.stage, event.category, &event.value);
            report.cues += 1;
            if self.honor_reset_request(&mut report) {
                return Ok(report);
            }
        }

        if tick.preload_complete {
            tracing::info!(virtual_time_ms = self.clock.virtual_time_ms(), "preload complete");
            report.preload_complete = true;
            self.events.push(SessionEvent::PreloadComplete);
        }

        Ok(report)
    }

    fn dispatch_note(&mut self, track: &Track, index: usize, report: &mut StepReport) {
        let note = &track.notes()[index];
        let key = PoolKey::for_note(note);
        let Some(handle) = self.pools.acquire(&key) else {
            tracing::debug!(%key, beat = note.beat, "no presentable available, skipping note");
            report.exhausted += 1;
            return;
        };

        let time_ms = track.millis_at_offset(note.beat);
        let placement = NotePlacement::for_note(note, time_ms, &self.config);
        tracing::trace!(%key, time_ms, direction = %note.cut_direction, "dispatching note");
        self.pools.present(&handle, Placement::Note(placement));
        self.live.push(handle);
        report.notes += 1;
    }

    fn dispatch_obstacle(&mut self, track: &Track, index: usize, report: &mut StepReport) {
        let obstacle = &track.obstacles()[index];
        let Some(handle) = self.pools.acquire(&PoolKey::Wall) else {
            tracing::debug!(beat = obstacle.beat, "no wall available, skipping obstacle");
            report.exhausted += 1;
            return;
        };

        let placement = WallPlacement::for_obstacle(obstacle, track, &self.config);
        tracing::trace!(time_ms = placement.time_ms, "dispatching obstacle");
        self.pools.present(&handle, Placement::Wall(placement));
        self.live.push(handle);
        report.obstacles += 1;
    }

    fn honor_reset_request(&mut self, report: &mut StepReport) -> bool {
        if self.reset_request.take() {
            self.reset();
            report.reset = true;
            true
        } else {
            false
        }
    }

    fn release_live(&mut self) {
        for handle in self.live.drain(..) {
            self.pools.release(handle);
        }
    }
}

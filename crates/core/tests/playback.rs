use beatsync_core::{
    ManualClock, Placement, PoolGateway, PoolKey, PoolSet, PresentableHandle, Session,
    SessionConfig, StageState, StepReport, Track, WARMUP_OFFSET_MS,
};
use proptest::prelude::*;
use serde_json::{json, Value};

/// Gateway with unlimited objects that remembers the time of everything it
/// was asked to present.
#[derive(Debug, Default)]
struct RecordingPools {
    next_id: u64,
    notes: Vec<f64>,
    walls: Vec<f64>,
}

impl PoolGateway for RecordingPools {
    fn acquire(&mut self, key: &PoolKey) -> Option<PresentableHandle> {
        self.next_id += 1;
        Some(PresentableHandle::new(self.next_id, *key))
    }

    fn present(&mut self, _handle: &PresentableHandle, placement: Placement) {
        match placement {
            Placement::Note(note) => self.notes.push(note.time_ms),
            Placement::Wall(wall) => self.walls.push(wall.time_ms),
        }
    }

    fn release(&mut self, _handle: PresentableHandle) {}
}

fn note(beat: f64, kind: u8) -> Value {
    json!({ "_time": beat, "_lineIndex": 1, "_lineLayer": 1, "_type": kind, "_cutDirection": 0 })
}

fn obstacle(beat: f64) -> Value {
    json!({ "_time": beat, "_lineIndex": 2, "_type": 0, "_duration": 1, "_width": 1 })
}

fn cue(beat: f64, category: i64, value: Value) -> Value {
    json!({ "_time": beat, "_type": category, "_value": value })
}

fn track(tempo: f64, notes: Vec<Value>, obstacles: Vec<Value>, events: Vec<Value>) -> Track {
    Track::load(&json!({
        "_beatsPerMinute": tempo,
        "_notes": notes,
        "_obstacles": obstacles,
        "_events": events,
    }))
    .unwrap()
}

fn pool_session(pools: PoolSet) -> Session<PoolSet, StageState> {
    Session::new(SessionConfig::default(), pools, StageState::new())
}

#[test]
fn obstacle_dispatches_in_the_step_whose_window_holds_it() {
    // 60 bpm: beat 1 is at 1000 ms.
    let mut session = Session::new(
        SessionConfig::default(),
        RecordingPools::default(),
        StageState::new(),
    );
    session.activate(track(60.0, vec![], vec![obstacle(1.0)], vec![]));

    let clock = ManualClock::new();
    let reports: Vec<StepReport> = (0..20).map(|_| session.step(&clock, 100.0).unwrap()).collect();

    let steps: Vec<usize> = reports
        .iter()
        .enumerate()
        .filter(|(_, r)| r.obstacles > 0)
        .map(|(i, _)| i)
        .collect();
    assert_eq!(steps, [9]);
    assert_eq!(reports[9].window_start_ms, 900.0);
    assert_eq!(reports[9].window_end_ms, 1000.0);
    assert_eq!(session.pools().walls, [1000.0]);
}

#[test]
fn melodic_dispatch_leads_by_exactly_the_warmup_offset() {
    let mut session = Session::new(
        SessionConfig::default(),
        RecordingPools::default(),
        StageState::new(),
    );
    session.activate(track(60.0, vec![note(2.0, 0)], vec![], vec![]));

    let clock = ManualClock::new();
    let mut dispatched_in = None;
    for _ in 0..400 {
        let report = session.step(&clock, 10.0).unwrap();
        if report.notes > 0 {
            dispatched_in = Some(report);
            break;
        }
    }

    let report = dispatched_in.expect("note should dispatch");
    let start = report.window_start_ms - WARMUP_OFFSET_MS;
    let end = report.window_end_ms - WARMUP_OFFSET_MS;
    assert!(start < 2000.0 && 2000.0 <= end, "({start}, {end}]");
    assert_eq!(session.config().warmup_offset_ms, WARMUP_OFFSET_MS);
}

#[test]
fn repeated_clock_reading_does_not_resync() {
    let mut session = pool_session(PoolSet::from_config(&Default::default()));
    session.activate(track(120.0, vec![], vec![], vec![]));

    let clock = ManualClock::at(500.0);
    let first = session.step(&clock, 16.0).unwrap();
    let second = session.step(&clock, 16.0).unwrap();

    assert!(first.resynced);
    assert_eq!(first.window_start_ms, 2500.0);
    assert!(!second.resynced);
    assert_eq!(second.window_start_ms, 2516.0);
}

#[test]
fn undefined_clock_holds_lookahead_free_running() {
    let mut session = pool_session(PoolSet::from_config(&Default::default()));
    session.activate(track(120.0, vec![], vec![], vec![]));

    let mut clock = ManualClock::at(100.0);
    session.step(&clock, 10.0).unwrap();
    clock.clear();
    let report = session.step(&clock, 10.0).unwrap();

    assert!(!report.resynced);
    assert_eq!(report.window_start_ms, 2110.0);
}

#[test]
fn priming_dispatches_negative_cues_in_order_before_any_step() {
    let mut session = pool_session(PoolSet::new());
    session.activate(track(
        90.0,
        vec![],
        vec![],
        vec![
            cue(2.0, 1, json!("d")),
            cue(-1.0, 1, json!("b")),
            cue(-3.0, 1, json!("a")),
            cue(-1.0, 1, json!("c")),
        ],
    ));

    let values: Vec<&Value> = session.stage().history().iter().map(|c| &c.value).collect();
    assert_eq!(values, [&json!("a"), &json!("b"), &json!("c")]);

    let clock = ManualClock::new();
    let cues: usize = (0..200)
        .map(|_| session.step(&clock, 16.0).unwrap().cues)
        .sum();
    assert_eq!(cues, 1);
    assert_eq!(session.stage().history().last().unwrap().value, json!("d"));
}

#[test]
fn reset_drains_pools_and_reactivation_is_fresh() {
    let pools = PoolSet::from_config(&Default::default());
    let mut session = pool_session(pools);
    let red = PoolKey::Note {
        style: beatsync_core::NoteStyle::Arrow,
        color: beatsync_core::NoteColor::Red,
    };
    let red_before = session.pools().available(&red);
    let walls_before = session.pools().available(&PoolKey::Wall);

    let track = track(
        120.0,
        vec![note(1.0, 0), note(2.0, 0)],
        vec![obstacle(1.5)],
        vec![cue(1.0, 4, json!(3))],
    );
    session.activate(track.clone());

    let clock = ManualClock::new();
    let first_run: Vec<StepReport> = (0..100).map(|_| session.step(&clock, 20.0).unwrap()).collect();
    assert_eq!(session.pools().available(&red), red_before - 2);
    assert_eq!(session.pools().available(&PoolKey::Wall), walls_before - 1);

    session.reset();
    assert_eq!(session.pools().available(&red), red_before);
    assert_eq!(session.pools().available(&PoolKey::Wall), walls_before);
    assert_eq!(session.pools().total_in_use(), 0);

    session.activate(track);
    let second_run: Vec<StepReport> = (0..100).map(|_| session.step(&clock, 20.0).unwrap()).collect();
    assert_eq!(first_run, second_run);
}

#[test]
fn exhausted_pool_skips_only_that_entry() {
    let mut pools = PoolSet::new();
    pools.register(
        PoolKey::Note {
            style: beatsync_core::NoteStyle::Arrow,
            color: beatsync_core::NoteColor::Red,
        },
        0,
    );
    pools.register(
        PoolKey::Note {
            style: beatsync_core::NoteStyle::Arrow,
            color: beatsync_core::NoteColor::Blue,
        },
        4,
    );
    let mut session = pool_session(pools);
    session.activate(track(
        60.0,
        vec![note(1.0, 0), note(1.0, 1), note(1.0, 3)],
        vec![],
        vec![],
    ));

    let clock = ManualClock::new();
    let due: Vec<StepReport> = (0..200)
        .map(|_| session.step(&clock, 10.0).unwrap())
        .filter(|r| r.notes > 0 || r.exhausted > 0)
        .collect();

    // Red has no objects and the mine pool is missing; the blue note still
    // goes out in the same step.
    assert_eq!(due.len(), 1);
    assert_eq!(due[0].notes, 1);
    assert_eq!(due[0].exhausted, 2);
    assert_eq!(session.live_handles().len(), 1);
}

#[test]
fn left_laser_cue_sets_each_laser_once() {
    let mut session = pool_session(PoolSet::new());
    session.activate(track(60.0, vec![], vec![], vec![cue(0.5, 2, json!(7))]));

    let clock = ManualClock::new();
    for _ in 0..10 {
        session.step(&clock, 100.0).unwrap();
    }

    let targets: Vec<&str> = session
        .stage()
        .history()
        .iter()
        .map(|c| c.target.as_str())
        .collect();
    assert_eq!(targets, ["left-laser-0", "left-laser-1", "left-laser-2"]);
    assert!(session
        .stage()
        .history()
        .iter()
        .all(|c| c.value == json!(7)));
}

#[test]
fn entries_before_the_first_window_are_never_dispatched() {
    let mut session = Session::new(
        SessionConfig::default(),
        RecordingPools::default(),
        StageState::new(),
    );
    session.activate(track(60.0, vec![note(-5.0, 1)], vec![obstacle(-4.0)], vec![]));

    let clock = ManualClock::new();
    let first = session.step(&clock, 16.0).unwrap();
    assert_eq!((first.window_start_ms, first.window_end_ms), (0.0, 16.0));
    assert_eq!((first.notes, first.obstacles), (0, 0));
    assert_eq!(first.stale, 2);

    for _ in 0..100 {
        session.step(&clock, 16.0).unwrap();
    }
    assert!(session.pools().notes.is_empty());
    assert!(session.pools().walls.is_empty());
}

#[test]
fn forward_resync_skips_instead_of_replaying() {
    let mut session = Session::new(
        SessionConfig::default(),
        RecordingPools::default(),
        StageState::new(),
    );
    session.activate(track(60.0, vec![], vec![obstacle(1.0), obstacle(5.0)], vec![]));

    let mut clock = ManualClock::new();
    session.step(&clock, 100.0).unwrap();
    clock.set(2000.0);
    let jump = session.step(&clock, 100.0).unwrap();
    assert!(jump.resynced);
    assert_eq!(jump.stale, 1);

    clock.clear();
    for _ in 0..20 {
        session.step(&clock, 100.0).unwrap();
    }
    assert_eq!(session.pools().walls, [5000.0]);
}

#[test]
fn jittery_clock_never_duplicates() {
    let mut session = Session::new(
        SessionConfig::default(),
        RecordingPools::default(),
        StageState::new(),
    );
    let obstacles = (1..40).map(|i| obstacle(i as f64 * 0.25)).collect();
    session.activate(track(60.0, vec![], obstacles, vec![]));

    // The reading wobbles back and forth around the true position.
    let mut clock = ManualClock::new();
    for step in 0..600u32 {
        let jitter = if step % 3 == 0 { -30.0 } else { 10.0 };
        clock.set(f64::from(step) * 16.0 + jitter);
        session.step(&clock, 16.0).unwrap();
    }

    let walls = &session.pools().walls;
    let mut deduped = walls.clone();
    deduped.dedup();
    assert_eq!(walls, &deduped);
    assert!(walls.windows(2).all(|w| w[0] < w[1]));
}

proptest! {
    #[test]
    fn monotone_steps_dispatch_each_entry_exactly_once(
        tempo in 60.0f64..240.0,
        note_beats in prop::collection::vec(-1.0f64..30.0, 0..30),
        wall_beats in prop::collection::vec(-1.0f64..30.0, 0..30),
        deltas in prop::collection::vec(0.5f64..40.0, 1..300),
    ) {
        let mut session = Session::new(
            SessionConfig::default(),
            RecordingPools::default(),
            StageState::new(),
        );
        let track = track(
            tempo,
            note_beats.iter().map(|&b| note(b, 1)).collect(),
            wall_beats.iter().map(|&b| obstacle(b)).collect(),
            vec![],
        );
        session.activate(track.clone());

        let clock = ManualClock::new();
        for delta in &deltas {
            session.step(&clock, *delta).unwrap();
        }

        let end = session.clock().virtual_time_ms();
        let expected_notes: Vec<f64> = track
            .notes()
            .iter()
            .map(|n| track.millis_at_offset(n.beat))
            .filter(|&t| t > -WARMUP_OFFSET_MS && t <= end - WARMUP_OFFSET_MS)
            .collect();
        let expected_walls: Vec<f64> = track
            .obstacles()
            .iter()
            .map(|o| track.millis_at_offset(o.beat))
            .filter(|&t| (0.0..=end).contains(&t))
            .collect();

        prop_assert_eq!(&session.pools().notes, &expected_notes);
        prop_assert_eq!(&session.pools().walls, &expected_walls);
    }
}

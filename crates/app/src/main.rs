use std::{collections::VecDeque, path::PathBuf};

use beatsync_core::{
    AppConfig, PlaybackClock, PoolSet, PresentableHandle, Session, SessionEvent, StageState, Track,
};
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

fn main() -> beatsync_core::Result<()> {
    init_tracing();

    let cli = Cli::parse();

    match cli.command {
        Commands::Inspect { track } => run_inspect(&track),
        Commands::Simulate(args) => run_simulate(&args),
    }
}

fn run_inspect(path: &PathBuf) -> beatsync_core::Result<()> {
    tracing::info!(?path, "inspecting track");
    let track = Track::from_path(path)?;
    println!("{}", track.summary());
    Ok(())
}

fn run_simulate(args: &SimulateArgs) -> beatsync_core::Result<()> {
    tracing::info!(track = ?args.track, config = ?args.config, "starting simulation");

    let config = match &args.config {
        Some(path) => AppConfig::from_path(path)?,
        None => AppConfig::default(),
    };
    if args.step_ms.is_nan() || args.step_ms <= 0.0 {
        return Err(beatsync_core::BeatSyncError::InvalidInput(
            "--step-ms must be positive",
        ));
    }

    let json = std::fs::read_to_string(&args.track)?;
    let raw = serde_json::from_str(&json)
        .map_err(|err| beatsync_core::BeatSyncError::MalformedTrack(err.to_string()))?;

    let mut session = Session::new(
        config.session.clone(),
        PoolSet::from_config(&config.pools),
        StageState::new(),
    );
    session.prefetch(&raw)?;
    let span_ms = session.track().map_or(0.0, |track| track.summary().span_ms);
    let duration_ms = args
        .duration_ms
        .unwrap_or(span_ms + config.session.anticipation_ms + 1000.0);

    session.start()?;
    let mut audio = PlaybackClock::new(args.report_ms);
    let mut totals = Totals::default();
    // Live objects complete once they have travelled for their lifetime.
    let mut lifetimes: VecDeque<(f64, PresentableHandle)> = VecDeque::new();
    let mut elapsed_ms = 0.0;

    while elapsed_ms < duration_ms {
        let report = session.step(&audio, args.step_ms)?;
        totals.add(&report);

        for event in session.drain_events() {
            if event == SessionEvent::PreloadComplete {
                tracing::info!(elapsed_ms, "preload complete, starting playback");
                audio.start();
            }
        }

        // Objects dispatched this step sit at the end of the live list.
        let expires_at = elapsed_ms + args.complete_after_ms;
        let fresh = report.notes + report.obstacles;
        let live = session.live_handles();
        for handle in &live[live.len().saturating_sub(fresh)..] {
            lifetimes.push_back((expires_at, handle.clone()));
        }
        while lifetimes
            .front()
            .is_some_and(|(expires_at, _)| *expires_at <= elapsed_ms)
        {
            if let Some((_, handle)) = lifetimes.pop_front() {
                session.complete(&handle);
            }
        }

        audio.advance(args.step_ms);
        elapsed_ms += args.step_ms;
    }

    session.reset();
    tracing::info!(
        notes = totals.notes,
        obstacles = totals.obstacles,
        cues = totals.cues,
        exhausted = totals.exhausted,
        stale = totals.stale,
        resyncs = totals.resyncs,
        stage_calls = session.stage().history().len(),
        "simulation finished"
    );
    println!(
        "dispatched {} notes, {} obstacles, {} cues ({} skipped for lack of objects, {} outside their window)",
        totals.notes, totals.obstacles, totals.cues, totals.exhausted, totals.stale
    );
    Ok(())
}

#[derive(Debug, Default)]
struct Totals {
    notes: usize,
    obstacles: usize,
    cues: usize,
    exhausted: usize,
    stale: usize,
    resyncs: usize,
}

impl Totals {
    fn add(&mut self, report: &beatsync_core::StepReport) {
        self.notes += report.notes;
        self.obstacles += report.obstacles;
        self.cues += report.cues;
        self.exhausted += report.exhausted;
        self.stale += report.stale;
        self.resyncs += usize::from(report.resynced);
    }
}

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .try_init();
}

#[derive(Parser, Debug)]
#[command(author, version, about = "Rhythm track scheduler", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Validate a track file and print its summary.
    Inspect {
        /// Path to the difficulty JSON file.
        track: PathBuf,
    },
    /// Play a track headless against in-memory pools and report dispatches.
    Simulate(SimulateArgs),
}

#[derive(clap::Args, Debug)]
struct SimulateArgs {
    /// Path to the difficulty JSON file.
    track: PathBuf,
    /// Optional JSON configuration file.
    #[arg(short, long)]
    config: Option<PathBuf>,
    /// Simulation step length in milliseconds.
    #[arg(long, default_value_t = 1000.0 / 60.0)]
    step_ms: f64,
    /// How often the simulated audio clock reports its position.
    #[arg(long, default_value_t = 50.0)]
    report_ms: f64,
    /// Total simulated time; defaults to the track span plus lead-in.
    #[arg(long)]
    duration_ms: Option<f64>,
    /// Lifetime of a dispatched object before it completes.
    #[arg(long, default_value_t = 2500.0)]
    complete_after_ms: f64,
}

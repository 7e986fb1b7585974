//! Track model: tempo plus three independently sorted sequences of notes,
//! obstacles and cue events, loaded from the difficulty JSON format.

use std::{cmp::Ordering, fmt, path::Path};

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::placement::{CutDirection, HORIZONTAL_POSITIONS, VERTICAL_POSITIONS};
use crate::{BeatSyncError, Result};

/// Color category of a note. Code 0 is red, 3 is a mine and every other
/// code plays as blue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "u8", into = "u8")]
pub enum NoteKind {
    Red,
    Blue,
    Mine,
}

impl From<u8> for NoteKind {
    fn from(code: u8) -> Self {
        match code {
            0 => NoteKind::Red,
            3 => NoteKind::Mine,
            _ => NoteKind::Blue,
        }
    }
}

impl From<NoteKind> for u8 {
    fn from(kind: NoteKind) -> Self {
        match kind {
            NoteKind::Red => 0,
            NoteKind::Blue => 1,
            NoteKind::Mine => 3,
        }
    }
}

/// Melodic entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Note {
    #[serde(rename = "_time")]
    pub beat: f64,
    #[serde(rename = "_lineIndex")]
    pub lane: usize,
    #[serde(rename = "_lineLayer")]
    pub layer: usize,
    #[serde(rename = "_type")]
    pub kind: NoteKind,
    #[serde(rename = "_cutDirection")]
    pub cut_direction: CutDirection,
}

/// Barrier entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Obstacle {
    #[serde(rename = "_time")]
    pub beat: f64,
    #[serde(rename = "_lineIndex")]
    pub lane: usize,
    #[serde(rename = "_type", default)]
    pub kind: u8,
    /// Length of the obstacle in beats.
    #[serde(rename = "_duration")]
    pub duration: f64,
    /// Width in lanes.
    #[serde(rename = "_width")]
    pub width: u32,
}

/// Stage cue entry. The value is forwarded to stage handlers untouched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CueEvent {
    #[serde(rename = "_time")]
    pub beat: f64,
    #[serde(rename = "_type")]
    pub category: i64,
    #[serde(rename = "_value", default)]
    pub value: Value,
}

#[derive(Deserialize)]
struct RawTrack {
    #[serde(rename = "_beatsPerMinute")]
    tempo: Option<f64>,
    #[serde(rename = "_notes", default)]
    notes: Vec<Note>,
    #[serde(rename = "_obstacles", default)]
    obstacles: Vec<Obstacle>,
    #[serde(rename = "_events", default)]
    events: Vec<CueEvent>,
}

/// Validated, sorted track. Immutable once loaded.
#[derive(Debug, Clone, PartialEq)]
pub struct Track {
    tempo: f64,
    notes: Vec<Note>,
    obstacles: Vec<Obstacle>,
    events: Vec<CueEvent>,
    priming: usize,
}

impl Track {
    /// Validates raw track data and sorts every sequence by beat offset.
    pub fn load(raw: &Value) -> Result<Self> {
        let raw = RawTrack::deserialize(raw).map_err(|err| BeatSyncError::malformed(err.to_string()))?;

        let tempo = raw
            .tempo
            .ok_or_else(|| BeatSyncError::malformed("missing `_beatsPerMinute`"))?;
        if !tempo.is_finite() || tempo <= 0.0 {
            return Err(BeatSyncError::malformed(format!(
                "tempo must be a positive number, got {tempo}"
            )));
        }

        for (index, note) in raw.notes.iter().enumerate() {
            check_beat("_notes", index, note.beat)?;
            check_index("_notes", index, "_lineIndex", note.lane, HORIZONTAL_POSITIONS.len())?;
            check_index("_notes", index, "_lineLayer", note.layer, VERTICAL_POSITIONS.len())?;
        }
        for (index, obstacle) in raw.obstacles.iter().enumerate() {
            check_beat("_obstacles", index, obstacle.beat)?;
            check_index(
                "_obstacles",
                index,
                "_lineIndex",
                obstacle.lane,
                HORIZONTAL_POSITIONS.len(),
            )?;
            if !obstacle.duration.is_finite() || obstacle.duration < 0.0 {
                return Err(BeatSyncError::malformed(format!(
                    "_obstacles[{index}]: `_duration` must be a non-negative number"
                )));
            }
        }
        for (index, event) in raw.events.iter().enumerate() {
            check_beat("_events", index, event.beat)?;
        }

        Ok(Self::from_parts(tempo, raw.notes, raw.obstacles, raw.events))
    }

    pub fn from_json_str(json: &str) -> Result<Self> {
        let raw: Value =
            serde_json::from_str(json).map_err(|err| BeatSyncError::malformed(err.to_string()))?;
        Self::load(&raw)
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json_str(&json)
    }

    fn from_parts(
        tempo: f64,
        mut notes: Vec<Note>,
        mut obstacles: Vec<Obstacle>,
        mut events: Vec<CueEvent>,
    ) -> Self {
        // `sort_by` is stable: equal offsets, including -0 and 0, keep
        // authoring order. Offsets were checked finite while loading.
        notes.sort_by(|a, b| by_beat(a.beat, b.beat));
        obstacles.sort_by(|a, b| by_beat(a.beat, b.beat));
        events.sort_by(|a, b| by_beat(a.beat, b.beat));
        let priming = events.partition_point(|event| event.beat < 0.0);

        Self {
            tempo,
            notes,
            obstacles,
            events,
            priming,
        }
    }

    pub fn tempo(&self) -> f64 {
        self.tempo
    }

    pub fn notes(&self) -> &[Note] {
        &self.notes
    }

    pub fn obstacles(&self) -> &[Obstacle] {
        &self.obstacles
    }

    pub fn events(&self) -> &[CueEvent] {
        &self.events
    }

    /// Leading cue events with a negative offset. They set the initial stage
    /// state before playback begins.
    pub fn priming_entries(&self) -> &[CueEvent] {
        &self.events[..self.priming]
    }

    /// Converts a beat offset to milliseconds at the track tempo.
    pub fn millis_at_offset(&self, beat: f64) -> f64 {
        beat * 60_000.0 / self.tempo
    }

    /// Converts a length in beats to seconds at the track tempo.
    pub fn seconds_for_beats(&self, beats: f64) -> f64 {
        60.0 * (beats / self.tempo)
    }

    pub fn summary(&self) -> TrackSummary {
        let offsets = self
            .notes
            .iter()
            .map(|n| n.beat)
            .chain(self.obstacles.iter().map(|o| o.beat + o.duration))
            .chain(self.events.iter().map(|e| e.beat));
        let last_beat = offsets.fold(None, |acc: Option<f64>, beat| {
            Some(acc.map_or(beat, |current| current.max(beat)))
        });

        TrackSummary {
            tempo: self.tempo,
            notes: self.notes.len(),
            mines: self
                .notes
                .iter()
                .filter(|n| n.kind == NoteKind::Mine)
                .count(),
            obstacles: self.obstacles.len(),
            events: self.events.len(),
            priming_events: self.priming,
            span_ms: last_beat.map_or(0.0, |beat| self.millis_at_offset(beat).max(0.0)),
        }
    }
}

fn check_beat(field: &str, index: usize, beat: f64) -> Result<()> {
    if beat.is_finite() {
        Ok(())
    } else {
        Err(BeatSyncError::malformed(format!(
            "{field}[{index}]: `_time` must be a finite number"
        )))
    }
}

fn check_index(field: &str, index: usize, name: &str, value: usize, len: usize) -> Result<()> {
    if value < len {
        Ok(())
    } else {
        Err(BeatSyncError::malformed(format!(
            "{field}[{index}]: `{name}` {value} is out of range 0..{len}"
        )))
    }
}

/// Headline numbers for a loaded track.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrackSummary {
    pub tempo: f64,
    pub notes: usize,
    pub mines: usize,
    pub obstacles: usize,
    pub events: usize,
    pub priming_events: usize,
    /// Time of the last scheduled moment on the track.
    pub span_ms: f64,
}

impl fmt::Display for TrackSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "tempo:          {} bpm", self.tempo)?;
        writeln!(f, "notes:          {} ({} mines)", self.notes, self.mines)?;
        writeln!(f, "obstacles:      {}", self.obstacles)?;
        writeln!(f, "events:         {}", self.events)?;
        writeln!(f, "priming events: {}", self.priming_events)?;
        write!(f, "span:           {:.0} ms", self.span_ms)
    }
}

fn by_beat(a: f64, b: f64) -> Ordering {
    a.partial_cmp(&b).unwrap_or(Ordering::Equal)
}

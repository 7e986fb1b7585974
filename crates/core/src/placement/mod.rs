//! Fixed lane, layer and direction tables plus the placement values handed
//! to the pool gateway for every dispatched object.

use std::fmt;

use glam::Vec3;
use serde::{Deserialize, Serialize};

use crate::track::{Note, Obstacle, Track};
use crate::SessionConfig;

/// Horizontal position of each of the four lanes.
pub const HORIZONTAL_POSITIONS: [f32; 4] = [-0.60, -0.25, 0.25, 0.60];
/// Height of each of the three layers.
pub const VERTICAL_POSITIONS: [f32; 3] = [1.00, 1.35, 1.70];
/// Extra distance so notes arrive at sword-stroke range in sync with the music.
pub const SWORD_OFFSET: f32 = 1.5;
pub const WALL_HEIGHT: f32 = 1.30;
pub const WALL_WIDTH_SCALE: f32 = 0.30;
pub const WALL_HEIGHT_SCALE: f32 = 2.5;

/// Cut direction of a note. The wire code is the index into the direction
/// table; code 8 is a dot, which carries no rotation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum CutDirection {
    Up,
    Down,
    Left,
    Right,
    UpLeft,
    UpRight,
    DownLeft,
    DownRight,
    Dot,
}

impl CutDirection {
    const ALL: [CutDirection; 9] = [
        CutDirection::Up,
        CutDirection::Down,
        CutDirection::Left,
        CutDirection::Right,
        CutDirection::UpLeft,
        CutDirection::UpRight,
        CutDirection::DownLeft,
        CutDirection::DownRight,
        CutDirection::Dot,
    ];

    pub fn from_code(code: u8) -> Option<Self> {
        Self::ALL.get(code as usize).copied()
    }

    pub fn code(self) -> u8 {
        self as u8
    }

    /// Roll angle in degrees around the approach axis.
    pub fn degrees(self) -> f32 {
        match self {
            CutDirection::Up => 180.0,
            CutDirection::Down => 0.0,
            CutDirection::Left => 270.0,
            CutDirection::Right => 90.0,
            CutDirection::UpLeft => 225.0,
            CutDirection::UpRight => 135.0,
            CutDirection::DownLeft => 315.0,
            CutDirection::DownRight => 45.0,
            CutDirection::Dot => 0.0,
        }
    }

    pub fn radians(self) -> f32 {
        self.degrees().to_radians()
    }

    pub fn is_dot(self) -> bool {
        self == CutDirection::Dot
    }

    /// Compass name of the direction, or `None` for dots.
    pub fn name(self) -> Option<&'static str> {
        match self {
            CutDirection::Up => Some("up"),
            CutDirection::Down => Some("down"),
            CutDirection::Left => Some("left"),
            CutDirection::Right => Some("right"),
            CutDirection::UpLeft => Some("upleft"),
            CutDirection::UpRight => Some("upright"),
            CutDirection::DownLeft => Some("downleft"),
            CutDirection::DownRight => Some("downright"),
            CutDirection::Dot => None,
        }
    }
}

impl TryFrom<u8> for CutDirection {
    type Error = String;

    fn try_from(code: u8) -> std::result::Result<Self, Self::Error> {
        Self::from_code(code).ok_or_else(|| format!("unknown cut direction {code}"))
    }
}

impl From<CutDirection> for u8 {
    fn from(value: CutDirection) -> Self {
        value.code()
    }
}

impl fmt::Display for CutDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name().unwrap_or("dot"))
    }
}

/// Everything a gateway needs to present one dispatched object. A fresh value
/// is built for every dispatch.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum Placement {
    Note(NotePlacement),
    Wall(WallPlacement),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NotePlacement {
    pub position: Vec3,
    /// Roll around the approach axis, in radians.
    pub rotation_z: f32,
    pub cut_direction: CutDirection,
    pub speed: f32,
    /// Scheduled time of the note on the track.
    pub time_ms: f64,
}

impl NotePlacement {
    pub fn for_note(note: &Note, time_ms: f64, config: &SessionConfig) -> Self {
        let travel = config.anticipation_seconds() * config.beat_speed + SWORD_OFFSET;
        Self {
            position: Vec3::new(
                HORIZONTAL_POSITIONS[note.lane],
                VERTICAL_POSITIONS[note.layer],
                -travel,
            ),
            rotation_z: note.cut_direction.radians(),
            cut_direction: note.cut_direction,
            speed: config.beat_speed,
            time_ms,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WallPlacement {
    pub position: Vec3,
    /// Scheduled time of the obstacle on the track.
    pub time_ms: f64,
    pub scale: Vec3,
    pub speed: f32,
    pub duration_seconds: f32,
}

impl WallPlacement {
    pub fn for_obstacle(obstacle: &Obstacle, track: &Track, config: &SessionConfig) -> Self {
        let speed = config.beat_speed;
        let duration_seconds = track.seconds_for_beats(obstacle.duration) as f32;
        Self {
            position: Vec3::new(
                HORIZONTAL_POSITIONS[obstacle.lane],
                WALL_HEIGHT,
                -(config.anticipation_seconds() * speed),
            ),
            time_ms: track.millis_at_offset(obstacle.beat),
            scale: Vec3::new(
                obstacle.width as f32 * WALL_WIDTH_SCALE,
                WALL_HEIGHT_SCALE,
                duration_seconds * speed,
            ),
            speed,
            duration_seconds,
        }
    }
}

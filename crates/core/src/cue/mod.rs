use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Effect a cue applies to a stage target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CueAction {
    SetColor,
    Pulse,
}

/// One named stage call produced by routing a cue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct StageCall {
    pub target: &'static str,
    pub action: CueAction,
}

const fn set(target: &'static str) -> StageCall {
    StageCall {
        target,
        action: CueAction::SetColor,
    }
}

const fn pulse(target: &'static str) -> StageCall {
    StageCall {
        target,
        action: CueAction::Pulse,
    }
}

const BACKGROUND: &[StageCall] = &[set("fog"), set("sky"), set("backglow")];
const TUNNEL: &[StageCall] = &[set("tunnel-neon")];
const LEFT_LASERS: &[StageCall] = &[set("left-laser-0"), set("left-laser-1"), set("left-laser-2")];
const RIGHT_LASERS: &[StageCall] = &[
    set("right-laser-0"),
    set("right-laser-1"),
    set("right-laser-2"),
];
const FLOOR: &[StageCall] = &[set("floor"), set("stage-neon")];
const TWISTER: &[StageCall] = &[pulse("twister")];
const LEFT_STAGE_LASERS: &[StageCall] = &[pulse("left-stage-lasers")];
const RIGHT_STAGE_LASERS: &[StageCall] = &[pulse("right-stage-lasers")];

/// Receiver of stage calls. Calls are fire-and-forget.
pub trait StageHandler {
    fn set_color(&mut self, target: &str, value: &Value);

    fn pulse(&mut self, target: &str, value: &Value);
}

/// Table-driven mapping from cue categories to stage calls.
#[derive(Debug, Default, Clone, Copy)]
pub struct CueRouter;

impl CueRouter {
    pub fn new() -> Self {
        Self
    }

    /// Stage calls for `category`. Unknown categories map to nothing.
    pub fn route(&self, category: i64) -> &'static [StageCall] {
        match category {
            0 => BACKGROUND,
            1 => TUNNEL,
            2 => LEFT_LASERS,
            3 => RIGHT_LASERS,
            4 => FLOOR,
            8 | 9 => TWISTER,
            12 => LEFT_STAGE_LASERS,
            13 => RIGHT_STAGE_LASERS,
            _ => &[],
        }
    }

    /// Routes one cue to `handler` and returns the number of calls made.
    pub fn dispatch<S>(&self, handler: &mut S, category: i64, value: &Value) -> usize
    where
        S: StageHandler + ?Sized,
    {
        let calls = self.route(category);
        if calls.is_empty() {
            tracing::trace!(category, "ignoring unknown cue category");
        }
        for call in calls {
            match call.action {
                CueAction::SetColor => handler.set_color(call.target, value),
                CueAction::Pulse => handler.pulse(call.target, value),
            }
        }
        calls.len()
    }
}

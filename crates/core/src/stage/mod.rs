use std::collections::BTreeMap;

use serde::Serialize;
use serde_json::Value;

use crate::cue::{CueAction, StageHandler};

/// Record of a single call received by a [`StageState`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReceivedCall {
    pub target: String,
    pub action: CueAction,
    pub value: Value,
}

/// In-memory stage that keeps the latest color of every target and counts
/// pulses. Used headless in place of the real stage elements.
#[derive(Debug, Default, Clone, Serialize)]
pub struct StageState {
    colors: BTreeMap<String, Value>,
    pulses: BTreeMap<String, usize>,
    #[serde(skip)]
    history: Vec<ReceivedCall>,
}

impl StageState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn color(&self, target: &str) -> Option<&Value> {
        self.colors.get(target)
    }

    pub fn pulse_count(&self, target: &str) -> usize {
        self.pulses.get(target).copied().unwrap_or(0)
    }

    /// Every call received so far, oldest first.
    pub fn history(&self) -> &[ReceivedCall] {
        &self.history
    }

    pub fn clear(&mut self) {
        self.colors.clear();
        self.pulses.clear();
        self.history.clear();
    }

    fn record(&mut self, target: &str, action: CueAction, value: &Value) {
        self.history.push(ReceivedCall {
            target: target.to_string(),
            action,
            value: value.clone(),
        });
    }
}

impl StageHandler for StageState {
    fn set_color(&mut self, target: &str, value: &Value) {
        self.colors.insert(target.to_string(), value.clone());
        self.record(target, CueAction::SetColor, value);
    }

    fn pulse(&mut self, target: &str, value: &Value) {
        *self.pulses.entry(target.to_string()).or_default() += 1;
        self.record(target, CueAction::Pulse, value);
    }
}

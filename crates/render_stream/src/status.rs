//! Status surface polled by a display widget
//!
//! Two independent text+color lines: "input" describes the link and the data
//! arriving from the controller, "output" describes the streams going back.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// Severity color of a status line
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StatusColor {
    /// Error
    Red,
    /// Healthy
    Green,
    /// Waiting or degraded
    #[default]
    Orange,
}

/// One status line
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct StatusLine {
    /// Message text
    pub text: String,
    /// Severity color
    pub color: StatusColor,
}

#[derive(Debug, Default)]
struct StatusState {
    input: StatusLine,
    output: StatusLine,
    changed: bool,
}

/// Thread-safe, cloneable handle to the status surface
#[derive(Debug, Clone, Default)]
pub struct RenderStreamStatus {
    state: Arc<Mutex<StatusState>>,
}

impl RenderStreamStatus {
    /// Create an empty status surface
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, StatusState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Set the input line
    pub fn input(&self, text: impl Into<String>, color: StatusColor) {
        let mut state = self.state();
        state.input = StatusLine {
            text: text.into(),
            color,
        };
        state.changed = true;
    }

    /// Set the output line
    pub fn output(&self, text: impl Into<String>, color: StatusColor) {
        let mut state = self.state();
        state.output = StatusLine {
            text: text.into(),
            color,
        };
        state.changed = true;
    }

    /// Set both lines at once
    pub fn input_output(
        &self,
        input: impl Into<String>,
        input_color: StatusColor,
        output: impl Into<String>,
        output_color: StatusColor,
    ) {
        let mut state = self.state();
        state.input = StatusLine {
            text: input.into(),
            color: input_color,
        };
        state.output = StatusLine {
            text: output.into(),
            color: output_color,
        };
        state.changed = true;
    }

    /// Current `(input, output)` lines
    pub fn lines(&self) -> (StatusLine, StatusLine) {
        let state = self.state();
        (state.input.clone(), state.output.clone())
    }

    /// Return and clear the changed flag
    pub fn take_changed(&self) -> bool {
        std::mem::take(&mut self.state().changed)
    }
}

//! Sign-in throttle state machine using rust-fsm.
//!
//! ## State Diagram
//!
//! ```text
//!                Lock (attempt lands on a window boundary)
//! ┌────────┐ ─────────────────────────────────────────► ┌──────────┐
//! │  Open  │                                            │  Locked  │ ◄─┐ Tick / Lock (re-arm)
//! └────────┘ ◄───────────────────────────────────────── └──────────┘ ──┘
//!   ▲    │         Expire (countdown reached 0) / Reset (logout)
//!   └────┘ Reset
//! ```

use rust_fsm::*;
use serde::{Deserialize, Serialize};
use std::time::Duration;

state_machine! {
    #[derive(Debug, Clone, PartialEq, Eq)]
    pub throttle_machine(Open)

    Open => {
        Lock => Locked,
        Reset => Open
    },
    Locked => {
        // A new boundary crossed while still locked restarts the countdown
        Lock => Locked,
        Tick => Locked,
        Expire => Open,
        Reset => Open
    }
}

pub use throttle_machine::Input as ThrottleMachineInput;
pub use throttle_machine::State as ThrottleMachineState;
pub use throttle_machine::StateMachine as ThrottleMachine;

/// Throttle state as exposed to callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ThrottleState {
    /// Sign-in submissions are allowed.
    Open,
    /// A lockout is in progress.
    Locked,
}

impl ThrottleState {
    pub fn is_locked(&self) -> bool {
        matches!(self, ThrottleState::Locked)
    }
}

impl From<&ThrottleMachineState> for ThrottleState {
    fn from(state: &ThrottleMachineState) -> Self {
        match state {
            ThrottleMachineState::Open => ThrottleState::Open,
            ThrottleMachineState::Locked => ThrottleState::Locked,
        }
    }
}

/// Throttle tuning.
#[derive(Debug, Clone)]
pub struct ThrottleConfig {
    /// Every attempt count divisible by this triggers a lockout.
    pub attempts_per_window: u32,
    /// Length of the first lockout, in seconds. Later ones double.
    pub initial_lockout_secs: u32,
    /// Countdown resolution; one tick removes one second.
    pub tick_interval: Duration,
}

impl Default for ThrottleConfig {
    fn default() -> Self {
        Self {
            attempts_per_window: 3,
            initial_lockout_secs: 60,
            tick_interval: Duration::from_secs(1),
        }
    }
}

impl ThrottleConfig {
    /// Whether `attempt_count` sits on a window boundary.
    pub fn is_boundary(&self, attempt_count: u32) -> bool {
        attempt_count % self.attempts_per_window.max(1) == 0
    }

    /// Backoff for the lockout that starts at `attempt_count`, given the
    /// previous backoff: the first window gets `initial_lockout_secs`, every
    /// later one doubles. A zero previous backoff restarts from the initial
    /// length.
    pub fn next_backoff_secs(&self, attempt_count: u32, previous_secs: u32) -> u32 {
        if attempt_count == self.attempts_per_window || previous_secs == 0 {
            self.initial_lockout_secs
        } else {
            previous_secs.saturating_mul(2)
        }
    }
}

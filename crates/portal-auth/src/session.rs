//! Session state: bearer token, user profile and the sign-in throttle.
//!
//! [`SessionStore`] is the single owner of the five persisted session keys
//! and of the `Authorization` default header. Its mutators are synchronous
//! and never fail; storage problems are logged and the in-memory state stays
//! authoritative for the rest of the process.

use crate::credentials::DefaultHeaders;
use crate::payload::LoginPayload;
use crate::throttle_fsm::{ThrottleConfig, ThrottleMachine, ThrottleMachineInput, ThrottleState};
use crate::ticker::CountdownTicker;
use parking_lot::Mutex;
use portal_storage::{Profile, SessionVault, ThrottleCounters};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::{Arc, Weak};
use tracing::{debug, info, warn};

/// Which kind of sign-in form event is being recorded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SignInAction {
    /// The form was shown. Resumes a persisted lockout; never counts.
    Initial,
    /// A submission failed and counts toward the throttle.
    Retry,
}

/// What `logout` does to the throttle counters.
///
/// Both policies cancel the countdown and remove every persisted key.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogoutPolicy {
    /// Attempt count and backoff survive in memory.
    #[default]
    KeepThrottle,
    /// Attempt count and backoff are zeroed.
    ClearThrottle,
}

/// Point-in-time view of the session. Never carries the token itself.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionSnapshot {
    pub is_authenticated: bool,
    pub profile: Profile,
    pub attempt_count: u32,
    pub accumulated_backoff_secs: u32,
    pub remaining_secs: u32,
    pub is_throttled: bool,
    pub throttle_state: ThrottleState,
}

/// Callback invoked after every state change.
pub type SessionChangeCallback = Box<dyn Fn(&SessionSnapshot) + Send + Sync>;

struct SessionState {
    token: Option<String>,
    profile: Profile,
    counters: ThrottleCounters,
    fsm: ThrottleMachine,
}

impl SessionState {
    fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            is_authenticated: self.token.is_some(),
            profile: self.profile.clone(),
            attempt_count: self.counters.attempt_count,
            accumulated_backoff_secs: self.counters.accumulated_backoff_secs,
            remaining_secs: self.counters.remaining_secs,
            is_throttled: self.counters.remaining_secs > 0,
            throttle_state: ThrottleState::from(self.fsm.state()),
        }
    }

    fn transition(&mut self, input: ThrottleMachineInput) {
        let old_state = ThrottleState::from(self.fsm.state());
        if self.fsm.consume(&input).is_err() {
            debug!(input = ?input, state = ?old_state, "Ignoring throttle input");
            return;
        }
        let new_state = ThrottleState::from(self.fsm.state());
        if old_state != new_state {
            debug!(old_state = ?old_state, new_state = ?new_state, "Throttle state transition");
        }
    }
}

struct Inner {
    vault: SessionVault,
    credentials: DefaultHeaders,
    config: ThrottleConfig,
    logout_policy: LogoutPolicy,
    state: Mutex<SessionState>,
    ticker: CountdownTicker,
    change_callback: Mutex<Option<Arc<SessionChangeCallback>>>,
}

/// Explicitly constructed session context.
///
/// Clones share the same session. Construct once per process and pass it to
/// whatever needs to read or change the session.
#[derive(Clone)]
pub struct SessionStore {
    inner: Arc<Inner>,
}

impl SessionStore {
    /// Rehydrate the session from `vault` with default throttle settings.
    pub fn new(vault: SessionVault, credentials: DefaultHeaders) -> Self {
        Self::with_options(vault, credentials, ThrottleConfig::default(), LogoutPolicy::default())
    }

    /// Rehydrate the session from `vault`.
    ///
    /// Unreadable storage falls back to defaults. A rehydrated token is
    /// installed as the bearer header straight away. A persisted lockout is
    /// restored as `Locked` but its countdown only resumes on
    /// [`SignInAction::Initial`].
    pub fn with_options(
        vault: SessionVault,
        credentials: DefaultHeaders,
        config: ThrottleConfig,
        logout_policy: LogoutPolicy,
    ) -> Self {
        let token = vault.token().unwrap_or_else(|e| {
            warn!(error = %e, "Failed to read stored token");
            None
        });
        let profile = vault.profile().unwrap_or_else(|e| {
            warn!(error = %e, "Failed to read stored profile");
            Profile::new()
        });
        let counters = vault.counters().unwrap_or_else(|e| {
            warn!(error = %e, "Failed to read stored throttle counters");
            ThrottleCounters::default()
        });

        let token = token.filter(|token| match credentials.install_bearer(token) {
            Ok(()) => true,
            Err(e) => {
                warn!(error = %e, "Stored token cannot be used as a bearer header");
                false
            }
        });
        if token.is_none() {
            credentials.clear_authorization();
        }

        let mut state = SessionState {
            token,
            profile,
            counters,
            fsm: ThrottleMachine::new(),
        };
        if counters.remaining_secs > 0 {
            state.transition(ThrottleMachineInput::Lock);
        }

        info!(
            authenticated = state.token.is_some(),
            attempt_count = counters.attempt_count,
            remaining_secs = counters.remaining_secs,
            "Session rehydrated"
        );

        let ticker = CountdownTicker::new(config.tick_interval);
        Self {
            inner: Arc::new(Inner {
                vault,
                credentials,
                config,
                logout_policy,
                state: Mutex::new(state),
                ticker,
                change_callback: Mutex::new(None),
            }),
        }
    }

    /// Register a callback fired after each change, outside the state lock.
    pub fn set_change_callback(&self, callback: SessionChangeCallback) {
        *self.inner.change_callback.lock() = Some(Arc::new(callback));
    }

    // ==========================================
    // Mutators
    // ==========================================

    /// Record a successful credential exchange.
    ///
    /// A payload without a usable token (absent, empty, or not a valid
    /// header value) clears the bearer header and marks the session
    /// unauthenticated without touching storage.
    pub fn login(&self, payload: &LoginPayload) {
        {
            let mut state = self.inner.state.lock();
            let installed = payload.token().filter(|token| {
                match self.inner.credentials.install_bearer(token) {
                    Ok(()) => true,
                    Err(e) => {
                        warn!(error = %e, "Rejected login token");
                        false
                    }
                }
            });
            match installed {
                Some(token) => {
                    state.token = Some(token.to_string());
                    state.profile = payload.user.clone().unwrap_or_default();

                    if let Err(e) = self.inner.vault.set_token(token) {
                        warn!(error = %e, "Failed to persist token");
                    }
                    if let Err(e) = self.inner.vault.set_profile(&state.profile) {
                        warn!(error = %e, "Failed to persist profile");
                    }

                    info!(profile_id = ?state.profile.get("id"), "Logged in");
                }
                None => {
                    state.token = None;
                    self.inner.credentials.clear_authorization();
                    debug!("Login payload carried no token");
                }
            }
        }
        self.inner.notify_changed();
    }

    /// Drop the session. Idempotent.
    pub fn logout(&self) {
        {
            let mut state = self.inner.state.lock();
            self.inner.ticker.cancel();

            state.token = None;
            state.profile = Profile::new();
            state.counters.remaining_secs = 0;
            if self.inner.logout_policy == LogoutPolicy::ClearThrottle {
                state.counters = ThrottleCounters::default();
            }
            state.transition(ThrottleMachineInput::Reset);

            self.inner.credentials.clear_authorization();
            if let Err(e) = self.inner.vault.clear_session() {
                warn!(error = %e, "Failed to clear stored session");
            }
        }
        info!(policy = ?self.inner.logout_policy, "Logged out");
        self.inner.notify_changed();
    }

    /// Record a sign-in form event and apply the throttle.
    ///
    /// Every `attempts_per_window`-th retry starts a lockout: the first lasts
    /// `initial_lockout_secs`, each later one twice the previous.
    pub fn attempt_sign_in(&self, action: SignInAction) {
        {
            let mut state = self.inner.state.lock();
            let config = &self.inner.config;
            let mut locked_now = false;

            if action == SignInAction::Retry {
                let counters = &mut state.counters;
                counters.attempt_count = counters.attempt_count.saturating_add(1);

                if config.is_boundary(counters.attempt_count) {
                    counters.accumulated_backoff_secs = config.next_backoff_secs(
                        counters.attempt_count,
                        counters.accumulated_backoff_secs,
                    );
                    counters.remaining_secs = counters.accumulated_backoff_secs;
                    locked_now = true;

                    info!(
                        attempt_count = counters.attempt_count,
                        lockout_secs = counters.remaining_secs,
                        "Sign-in locked out"
                    );
                } else {
                    debug!(attempt_count = counters.attempt_count, "Sign-in attempt recorded");
                }
            }

            let resume = state.counters.remaining_secs > 0
                && (action == SignInAction::Initial || !self.inner.ticker.is_active());

            if locked_now || resume {
                self.arm_countdown(&mut state);
            }

            if let Err(e) = self.inner.vault.set_counters(&state.counters) {
                warn!(error = %e, "Failed to persist throttle counters");
            }
        }
        self.inner.notify_changed();
    }

    /// Start (or restart) the countdown from the current remaining seconds.
    /// With nothing remaining any running countdown is stopped instead.
    fn arm_countdown(&self, state: &mut SessionState) {
        if state.counters.remaining_secs == 0 {
            self.inner.ticker.cancel();
            state.transition(ThrottleMachineInput::Expire);
            return;
        }

        state.transition(ThrottleMachineInput::Lock);
        let weak: Weak<Inner> = Arc::downgrade(&self.inner);
        let generation = self.inner.ticker.arm(move |generation| match weak.upgrade() {
            Some(inner) => inner.tick(generation),
            None => false,
        });
        debug!(
            generation = ?generation,
            remaining_secs = state.counters.remaining_secs,
            "Lockout countdown armed"
        );
    }

    // ==========================================
    // Accessors
    // ==========================================

    pub fn token(&self) -> Option<String> {
        self.inner.state.lock().token.clone()
    }

    pub fn profile(&self) -> Profile {
        self.inner.state.lock().profile.clone()
    }

    /// The profile's `id` field, if present.
    pub fn profile_id(&self) -> Option<Value> {
        self.inner.state.lock().profile.get("id").cloned()
    }

    pub fn is_authenticated(&self) -> bool {
        self.inner.state.lock().token.is_some()
    }

    pub fn attempt_count(&self) -> u32 {
        self.inner.state.lock().counters.attempt_count
    }

    pub fn accumulated_backoff_secs(&self) -> u32 {
        self.inner.state.lock().counters.accumulated_backoff_secs
    }

    pub fn remaining_secs(&self) -> u32 {
        self.inner.state.lock().counters.remaining_secs
    }

    pub fn counters(&self) -> ThrottleCounters {
        self.inner.state.lock().counters
    }

    pub fn is_throttled(&self) -> bool {
        self.inner.state.lock().counters.remaining_secs > 0
    }

    pub fn throttle_state(&self) -> ThrottleState {
        ThrottleState::from(self.inner.state.lock().fsm.state())
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        self.inner.state.lock().snapshot()
    }

    /// Whether a countdown task is currently running.
    pub fn has_active_tick(&self) -> bool {
        self.inner.ticker.is_active()
    }

    pub fn logout_policy(&self) -> LogoutPolicy {
        self.inner.logout_policy
    }

    pub fn throttle_config(&self) -> &ThrottleConfig {
        &self.inner.config
    }

    /// Wait until the lockout ends.
    ///
    /// Returns `false` immediately if the session is throttled but no
    /// countdown is running, since it would never open.
    pub async fn wait_until_open(&self) -> bool {
        loop {
            if !self.is_throttled() {
                return true;
            }
            if !self.inner.ticker.is_active() {
                return false;
            }
            tokio::time::sleep(self.inner.config.tick_interval).await;
        }
    }
}

impl Inner {
    /// One countdown step. Returns whether the countdown continues.
    fn tick(&self, generation: u64) -> bool {
        let keep_going = {
            let mut state = self.state.lock();
            if !self.ticker.is_current(generation) {
                return false;
            }

            state.counters.remaining_secs = state.counters.remaining_secs.saturating_sub(1);
            if let Err(e) = self.vault.set_counters(&state.counters) {
                warn!(error = %e, "Failed to persist throttle counters");
            }

            if state.counters.remaining_secs == 0 {
                state.transition(ThrottleMachineInput::Expire);
                info!(attempt_count = state.counters.attempt_count, "Sign-in lockout expired");
                false
            } else {
                state.transition(ThrottleMachineInput::Tick);
                true
            }
        };
        self.notify_changed();
        keep_going
    }

    fn notify_changed(&self) {
        let callback = self.change_callback.lock().clone();
        if let Some(callback) = callback {
            let snapshot = self.state.lock().snapshot();
            callback(&snapshot);
        }
    }
}

//! Storage key constants.

/// Keys under which the session is persisted.
///
/// The names are shared with the browser build of the client, so a store
/// written by one can be read by the other.
pub struct StorageKeys;

impl StorageKeys {
    /// Bearer token
    pub const TOKEN: &'static str = "token";

    /// Authenticated user's profile (JSON object)
    pub const USER_AUTH: &'static str = "userAuth";

    /// Counted sign-in attempts
    pub const SIGN_IN_TRIES: &'static str = "signInTries";

    /// Base of the next lockout duration, in seconds
    pub const SIGN_IN_SECONDS_ACCUMULATED: &'static str = "signInSecondsAcumulated";

    /// Seconds left in the current lockout
    pub const SIGN_IN_SECONDS_REMAINING: &'static str = "signInSecondsRemaining";

    /// Every key owned by the session, in the order they are cleared.
    pub const ALL: [&'static str; 5] = [
        Self::TOKEN,
        Self::USER_AUTH,
        Self::SIGN_IN_TRIES,
        Self::SIGN_IN_SECONDS_ACCUMULATED,
        Self::SIGN_IN_SECONDS_REMAINING,
    ];
}

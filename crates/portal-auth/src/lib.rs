//! Authentication and session state for Portal.
//!
//! This crate provides:
//! - [`SessionStore`]: token, profile and the sign-in throttle, persisted
//!   through a [`portal_storage::SessionVault`]
//! - An FSM-based throttle with a single cancellable countdown task
//! - [`ApiClient`], a JSON REST client that reads its default headers from a
//!   [`CredentialProvider`]
//! - Google credential exchange and the password/passcode account flows
//! - Routes with an authentication guard, and a [`Notifier`] seam for
//!   user-facing messages

mod account;
mod api_client;
mod credentials;
mod error;
mod google;
mod notify;
mod payload;
mod router;
mod session;
mod throttle_fsm;
mod ticker;

pub use account::{
    lockout_message, register_account, sign_in_with_password, AccountApi, SignInCredentials,
    SignOnRequest, RESET_EMAIL_SUBJECT,
};
pub use api_client::{ApiClient, ApiResponse};
pub use credentials::{CredentialProvider, DefaultHeaders};
pub use error::{AuthError, AuthResult};
pub use google::{
    exchange_google_credential, login_with_google, GoogleCredential, GoogleIdentity,
    GoogleLoginRequest, GOOGLE_LOGIN_PATH,
};
pub use notify::{LogNotifier, NotificationKind, Notifier, RecordingNotifier};
pub use payload::LoginPayload;
pub use router::{Route, Router};
pub use session::{
    LogoutPolicy, SessionChangeCallback, SessionSnapshot, SessionStore, SignInAction,
};
pub use throttle_fsm::throttle_machine;
pub use throttle_fsm::{
    ThrottleConfig, ThrottleMachine, ThrottleMachineInput, ThrottleMachineState, ThrottleState,
};

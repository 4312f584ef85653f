//! Authentication state machine, session payload and one-time codes.

mod state;
pub use state::{Auth, AuthState};

mod session;
pub use session::AuthSession;

pub mod otp;

mod family;
mod login;
mod signup;
mod verification;

#[cfg(test)]
mod tests;

//! # API crate — the coordination core behind every ChoreSync frontend
//!
//! This crate owns everything between the views and the row store: who is
//! signed in, which families they belong to, which family they are looking
//! at, and what a navigation layer should do about it.
//!
//! ## Modules
//!
//! | Module | Feature gate | Purpose |
//! |--------|-------------|---------|
//! | [`auth`] | — | The [`Auth`] state machine (login, signup, one-time-code verification, logout, family membership), the persistent [`AuthSession`] payload, and one-time-code handling |
//! | [`guard`] | — | Pure navigation decisions from an [`AuthState`] snapshot |
//! | [`provider`] | — | The [`IdentityProvider`] contract and the local Argon2-backed [`PasswordVault`] |
//! | [`notify`] | — | User-facing notifications and the [`Notifier`] sinks |
//! | [`settings`] | — | Layered configuration (defaults → `config.toml` → environment) |
//! | [`pg`] | `server` | [`store::Gateway`] over PostgreSQL with sqlx, plus pool and migrations |
//!
//! The machine is built from injected parts — a [`store::Gateway`], a
//! [`store::KvStore`] for the session payload, a [`Notifier`] and an
//! [`IdentityProvider`] — and publishes every state change on a
//! [`tokio::sync::watch`] channel. Nothing in here navigates or renders;
//! operations hand back [`guard::Route`] values and the embedding router
//! decides.

pub mod auth;
pub mod guard;
pub mod notify;
pub mod provider;
pub mod settings;

mod error;
pub use error::AuthError;

#[cfg(feature = "server")]
pub mod pg;

pub use auth::{Auth, AuthSession, AuthState};
pub use guard::{Access, Route};
pub use notify::{Notification, Notifier, Severity};
pub use provider::{IdentityProvider, PasswordVault, ProviderError};

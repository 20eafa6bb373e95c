//! State containers shared with the UI.
//!
//! `auth` owns identity and the persisted token; `profile` depends on it for
//! the bearer token but never observes it. Coupling between the two lives in
//! [`Session`](crate::Session).

mod auth;
mod profile;

pub use auth::{AuthState, AuthStore};
pub use profile::{ProfileState, ProfileStore};
pub(crate) use profile::Attempt;

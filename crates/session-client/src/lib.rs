//! Client-side session and profile synchronization.
//!
//! [`AuthStore`] and [`ProfileStore`] hold reactive state for the UI and keep
//! it in line with the remote API; [`Session`] wires them together and owns
//! the login and registration form state.

pub mod api;
pub mod config;
pub mod forms;
pub mod session;
pub mod state;
pub mod store;

#[cfg(test)]
mod testing;

pub use api::{ApiClient, ApiError, FileTokenStore, MemoryTokenStore, TokenStore};
pub use config::Config;
pub use forms::FormState;
pub use session::Session;
pub use state::{AuthState, AuthStore, ProfileState, ProfileStore};
pub use store::{Store, Subscription};

mod auth;
mod error;
mod profile;

pub use auth::*;
pub use error::*;
pub use profile::*;

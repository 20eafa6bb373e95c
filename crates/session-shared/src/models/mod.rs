mod profile;
mod user;

pub use profile::*;
pub use user::*;

pub mod auth;
pub mod backend;
pub mod passwd;

pub use auth::AuthContext;
pub use backend::{is_valid_username, AuthBackend, AuthOutcome, TrustedAuthBackend};
pub use passwd::{PasswdAuthBackend, PasswdEntry};

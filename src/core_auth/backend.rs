use crate::constants::USERNAME_REGEX;
use crate::core_error::{Result, VfsError};
use log::debug;
use once_cell::sync::Lazy;
use regex::Regex;

// pattern is constant
static USERNAME: Lazy<Regex> =
    Lazy::new(|| Regex::new(USERNAME_REGEX).expect("invalid USERNAME_REGEX"));

pub fn is_valid_username(username: &str) -> bool {
    USERNAME.is_match(username)
}

/// Result of one authentication step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthOutcome {
    /// The user is known, a password must follow.
    NeedPassword,
    /// The session is identified (FTP 230).
    LoggedIn,
}

/// Decides whether a user may log in and where their sandbox lives.
///
/// Rejections are reported as `VfsError::LoginRejected`.
pub trait AuthBackend: Send + Sync {
    fn validate_user(&self, user: &str) -> Result<AuthOutcome>;

    fn validate_password(&self, user: &str, password: &str) -> Result<AuthOutcome>;

    /// Business root for an identified user, `/{user}` when `None`.
    fn resolve_business_root(&self, _user: &str) -> Option<String> {
        None
    }

    /// Whether `path` is `root` itself or lies below it.
    fn is_business_path_valid(&self, root: &str, path: &str) -> bool {
        if root == "/" {
            return path.starts_with('/');
        }
        let root = root.trim_end_matches('/');
        path == root
            || path
                .strip_prefix(root)
                .map_or(false, |rest| rest.starts_with('/'))
    }
}

/// Lets any well-formed user name in without a password.
#[derive(Debug, Default, Clone)]
pub struct TrustedAuthBackend {
    root_override: Option<String>,
}

impl TrustedAuthBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every user shares `root` instead of `/{user}`.
    pub fn with_root(root: impl Into<String>) -> Self {
        Self {
            root_override: Some(root.into()),
        }
    }
}

impl AuthBackend for TrustedAuthBackend {
    fn validate_user(&self, user: &str) -> Result<AuthOutcome> {
        if !is_valid_username(user) {
            return Err(VfsError::LoginRejected(user.to_string()));
        }
        debug!("Trusted login for {}", user);
        Ok(AuthOutcome::LoggedIn)
    }

    fn validate_password(&self, user: &str, _password: &str) -> Result<AuthOutcome> {
        self.validate_user(user)
    }

    fn resolve_business_root(&self, _user: &str) -> Option<String> {
        self.root_override.clone()
    }
}

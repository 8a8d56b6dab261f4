use crate::core_auth::backend::{AuthBackend, AuthOutcome};
use crate::core_error::{Result, VfsError};
use crate::core_path::normalize;
use log::{debug, info};
use once_cell::sync::Lazy;
use regex::Regex;
use std::fmt;
use std::sync::Arc;

// pattern is constant
static MULTI_SLASH: Lazy<Regex> = Lazy::new(|| Regex::new("/{2,}").expect("invalid slash pattern"));

fn collapse_slashes(path: &str) -> String {
    MULTI_SLASH.replace_all(path, "/").into_owned()
}

/// Identity of a session and translation between business and real paths.
pub struct AuthContext {
    user: Option<String>,
    identified: bool,
    business_root: Option<String>,
    base_directory: String,
    backend: Arc<dyn AuthBackend>,
}

impl fmt::Debug for AuthContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthContext")
            .field("user", &self.user)
            .field("identified", &self.identified)
            .field("business_root", &self.business_root)
            .field("base_directory", &self.base_directory)
            .finish()
    }
}

impl AuthContext {
    /// `base_directory` is the mount point on the real filesystem.
    pub fn new(base_directory: &str, backend: Arc<dyn AuthBackend>) -> Self {
        let mut base = normalize(base_directory);
        while base.len() > 1 && base.ends_with('/') {
            base.pop();
        }
        Self {
            user: None,
            identified: false,
            business_root: None,
            base_directory: base,
            backend,
        }
    }

    /// First login step.
    pub fn set_user(&mut self, user: &str) -> Result<AuthOutcome> {
        self.identified = false;
        self.business_root = None;
        self.user = Some(user.to_string());
        let outcome = self.backend.validate_user(user)?;
        if outcome == AuthOutcome::LoggedIn {
            self.identify(user);
        }
        Ok(outcome)
    }

    /// Second login step, for the user given to `set_user`.
    pub fn set_password(&mut self, password: &str) -> Result<AuthOutcome> {
        let user = self
            .user
            .clone()
            .ok_or_else(|| VfsError::InvalidArgument("PASS before USER".to_string()))?;
        let outcome = self.backend.validate_password(&user, password)?;
        if outcome == AuthOutcome::LoggedIn {
            self.identify(&user);
        }
        Ok(outcome)
    }

    fn identify(&mut self, user: &str) {
        let root = self
            .backend
            .resolve_business_root(user)
            .unwrap_or_else(|| format!("/{}", user));
        let mut root = normalize(&root);
        if !root.starts_with('/') {
            root.insert(0, '/');
        }
        info!("User {} identified, business root {}", user, root);
        self.business_root = Some(root);
        self.identified = true;
    }

    pub fn user(&self) -> Option<&str> {
        self.user.as_deref()
    }

    pub fn is_identified(&self) -> bool {
        self.identified
    }

    pub fn business_root(&self) -> Option<&str> {
        self.business_root.as_deref()
    }

    pub fn base_directory(&self) -> &str {
        &self.base_directory
    }

    /// Real path backing a business path.
    pub fn to_absolute(&self, business_path: &str) -> String {
        if business_path.is_empty() {
            return self.base_directory.clone();
        }
        normalize(&format!("{}/{}", self.base_directory, business_path))
    }

    /// Business path for a real path. Paths outside the mount point only get
    /// their duplicate slashes collapsed.
    pub fn to_relative(&self, absolute_path: &str) -> String {
        let stripped = if self.base_directory == "/" {
            absolute_path
        } else {
            match absolute_path.strip_prefix(self.base_directory.as_str()) {
                Some(rest) if rest.is_empty() || rest.starts_with('/') => rest,
                _ => absolute_path,
            }
        };
        collapse_slashes(stripped)
    }

    /// Whether a canonical real path lies inside the mount point.
    pub fn contains_real_path(&self, canonical: &str) -> bool {
        if self.base_directory == "/" {
            return true;
        }
        canonical == self.base_directory
            || canonical
                .strip_prefix(self.base_directory.as_str())
                .map_or(false, |rest| rest.starts_with('/'))
    }

    /// False until identified, then delegated to the backend.
    pub fn is_business_path_valid(&self, path: &str) -> bool {
        match (&self.business_root, self.identified) {
            (Some(root), true) => self.backend.is_business_path_valid(root, path),
            _ => {
                debug!("Not identified, rejecting {}", path);
                false
            }
        }
    }

    /// Logs out. Safe to call any number of times.
    pub fn clear(&mut self) {
        self.user = None;
        self.identified = false;
        self.business_root = None;
    }
}

use crate::core_auth::backend::{is_valid_username, AuthBackend, AuthOutcome};
use crate::core_error::{Result, VfsError};
use bcrypt::{hash, verify};
use log::{info, warn};
use std::collections::HashMap;
use std::fs;
use std::path::Path;

/// One `user:bcrypt_hash` line of a passwd file.
#[derive(Debug, Clone)]
pub struct PasswdEntry {
    username: String,
    hashed_password: String,
}

impl PasswdEntry {
    pub fn from_line(line: &str) -> Option<Self> {
        let (username, hashed_password) = line.trim().split_once(':')?;
        if username.is_empty() || hashed_password.is_empty() || hashed_password.contains(':') {
            return None;
        }
        Some(PasswdEntry {
            username: username.to_string(),
            hashed_password: hashed_password.to_string(),
        })
    }

    pub fn get_hashed_password(&self) -> &str {
        &self.hashed_password
    }

    pub fn get_username(&self) -> &str {
        &self.username
    }
}

pub fn hash_password(password: &str, cost: u32) -> Result<String> {
    hash(password, cost).map_err(|e| VfsError::InvalidArgument(e.to_string()))
}

pub fn verify_password(password: &str, hashed_password: &str) -> bool {
    verify(password, hashed_password).unwrap_or(false)
}

/// Two-phase USER/PASS login against bcrypt hashes.
#[derive(Debug, Default, Clone)]
pub struct PasswdAuthBackend {
    entries: HashMap<String, PasswdEntry>,
}

impl PasswdAuthBackend {
    pub fn from_entries(entries: impl IntoIterator<Item = PasswdEntry>) -> Self {
        let entries = entries
            .into_iter()
            .map(|entry| (entry.get_username().to_string(), entry))
            .collect();
        Self { entries }
    }

    /// Parses passwd content. Comments, blank and malformed lines are skipped.
    pub fn parse(content: &str) -> Self {
        let mut entries = Vec::new();
        for line in content.lines() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            match PasswdEntry::from_line(line) {
                Some(entry) => entries.push(entry),
                None => warn!("Skipping malformed passwd line"),
            }
        }
        Self::from_entries(entries)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        let backend = Self::parse(&content);
        info!("Loaded {} users from {:?}", backend.len(), path);
        Ok(backend)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl AuthBackend for PasswdAuthBackend {
    fn validate_user(&self, user: &str) -> Result<AuthOutcome> {
        if !is_valid_username(user) {
            return Err(VfsError::LoginRejected(user.to_string()));
        }
        // Unknown users still get asked for a password.
        Ok(AuthOutcome::NeedPassword)
    }

    fn validate_password(&self, user: &str, password: &str) -> Result<AuthOutcome> {
        match self.entries.get(user) {
            Some(entry) if verify_password(password, entry.get_hashed_password()) => {
                info!("User {} logged in", user);
                Ok(AuthOutcome::LoggedIn)
            }
            _ => {
                warn!("Login incorrect for {}", user);
                Err(VfsError::LoginRejected(user.to_string()))
            }
        }
    }
}

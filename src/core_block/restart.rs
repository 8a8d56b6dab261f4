use crate::core_error::{Result, VfsError};
use log::debug;

/// One-shot resume state set by a REST command.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RestartMarker {
    armed: bool,
    position: u64,
    remaining: Option<u32>,
}

impl RestartMarker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Arms the marker at `position`, limiting the resumed transfer to `cap`
    /// bytes when given.
    pub fn arm(&mut self, position: u64, cap: Option<u32>) {
        self.armed = true;
        self.position = position;
        self.remaining = cap;
        debug!("Restart marker armed at {} (cap {:?})", position, cap);
    }

    /// Parses a REST argument and arms the marker with it.
    pub fn arm_from_arg(&mut self, arg: &str) -> Result<()> {
        let position = arg
            .trim()
            .parse::<u64>()
            .map_err(|_| VfsError::InvalidArgument(format!("bad restart offset: {}", arg)))?;
        self.arm(position, None);
        Ok(())
    }

    pub fn is_armed(&self) -> bool {
        self.armed
    }

    pub fn remaining(&self) -> Option<u32> {
        self.remaining
    }

    /// Consumes the armed position and drops the cap. A second call fails
    /// until re-armed.
    pub fn take_position(&mut self) -> Result<u64> {
        if !self.armed {
            return Err(VfsError::NotArmed);
        }
        self.armed = false;
        self.remaining = None;
        Ok(self.position)
    }

    /// Bounds the next block length by the resume window.
    ///
    /// Returns `requested` when unlimited. Once the window is used up a
    /// single `0` is returned and the window becomes unlimited again.
    pub fn cap(&mut self, requested: u32) -> u32 {
        match self.remaining {
            None => requested,
            Some(0) => {
                self.remaining = None;
                0
            }
            Some(left) => {
                let granted = requested.min(left);
                self.remaining = Some(left - granted);
                granted
            }
        }
    }

    pub fn clear(&mut self) {
        *self = Self::default();
    }
}

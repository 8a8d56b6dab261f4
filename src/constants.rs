// src/constants.rs

pub const USERNAME_REGEX: &str = r"^[a-zA-Z0-9]{1,32}$";

pub const SEPARATOR: &str = "/";
pub const SEPARATOR_CHAR: char = '/';

/// Default size of one transfer block (64 KB).
pub const DEFAULT_BLOCK_SIZE: usize = 0x10000;

/// Read buffer used when streaming a file through a digest.
pub const DIGEST_BUFFER_SIZE: usize = 0x10000;

pub const DEFAULT_UNIQUE_EXTENSION: &str = ".stou";

/// Number of bytes carried by a restart marker block.
pub const MARKER_LENGTH: usize = 6;

/// Files older than this are listed with their year instead of the time of day.
pub const LS_OLD_FILE_MILLIS: i64 = 6 * 30 * 24 * 60 * 60 * 1000;

/// Clock skew tolerated before a file is considered to be in the future.
pub const LS_FUTURE_SLOP_MILLIS: i64 = 60 * 60 * 1000;

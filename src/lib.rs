//! Sandboxed virtual filesystem and block transfer core for FTP-style servers.
//!
//! A session logs in through an [`core_auth::AuthBackend`], browses its
//! business root with [`core_dir::VirtualDirectory`] and moves data with
//! [`core_file::VirtualFile`] one [`core_block::DataBlock`] at a time.

pub mod config;
pub mod constants;
pub mod core_auth;
pub mod core_block;
pub mod core_digest;
pub mod core_dir;
pub mod core_error;
pub mod core_file;
pub mod core_path;
pub mod helpers;
pub mod session;

pub use core_error::{Result, VfsError};
pub use session::{run_blocking, Session, SharedSession};

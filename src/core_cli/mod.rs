#[allow(clippy::module_inception)]
pub mod core_cli;

pub use self::core_cli::{Cli, Command};

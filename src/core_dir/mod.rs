pub mod dir;
pub mod listing;
pub mod mlsx;

#[cfg(test)]
mod test_dir;

pub use dir::VirtualDirectory;
pub use listing::EntryKind;
pub use mlsx::{Fact, FactState, OptsMlsx};

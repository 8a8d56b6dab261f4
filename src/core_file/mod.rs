pub mod file;

#[cfg(test)]
mod test_file;

pub use file::{TransferParams, VirtualFile};

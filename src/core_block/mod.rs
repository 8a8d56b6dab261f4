pub mod data_block;
pub mod restart;

pub use data_block::{to_binary_string, DataBlock, EOF, EOR, ERROR, RESTART};
pub use restart::RestartMarker;

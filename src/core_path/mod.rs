pub mod platform;
pub mod resolver;

pub use platform::Platform;
pub use resolver::{canonicalize, has_wildcard, is_absolute, normalize, path_from_uri, validate};

pub mod digest;

pub use digest::{
    crc32_file, digest_equals, from_hex, hash_bytes, hash_file, hash_file_prefix, to_hex,
    DigestAlgo, Digester,
};

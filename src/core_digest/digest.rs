use crate::constants::DIGEST_BUFFER_SIZE;
use crate::core_error::{Result, VfsError};
use log::debug;
use sha2::digest::DynDigest;
use std::fmt;
use std::fs::File;
use std::io::Read;
use std::path::Path;
use std::str::FromStr;

/// Checksum and hash algorithms available to transfers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DigestAlgo {
    Crc32,
    Adler32,
    Md5,
    Md2,
    Sha1,
    Sha256,
    Sha384,
    Sha512,
}

pub const ALL_ALGOS: [DigestAlgo; 8] = [
    DigestAlgo::Crc32,
    DigestAlgo::Adler32,
    DigestAlgo::Md5,
    DigestAlgo::Md2,
    DigestAlgo::Sha1,
    DigestAlgo::Sha256,
    DigestAlgo::Sha384,
    DigestAlgo::Sha512,
];

impl DigestAlgo {
    /// Standard algorithm name, e.g. `SHA-256`.
    pub fn name(&self) -> &'static str {
        match self {
            DigestAlgo::Crc32 => "CRC32",
            DigestAlgo::Adler32 => "ADLER32",
            DigestAlgo::Md5 => "MD5",
            DigestAlgo::Md2 => "MD2",
            DigestAlgo::Sha1 => "SHA-1",
            DigestAlgo::Sha256 => "SHA-256",
            DigestAlgo::Sha384 => "SHA-384",
            DigestAlgo::Sha512 => "SHA-512",
        }
    }

    /// Identifier without punctuation, e.g. `SHA256`.
    pub fn ident(&self) -> &'static str {
        match self {
            DigestAlgo::Crc32 => "CRC32",
            DigestAlgo::Adler32 => "ADLER32",
            DigestAlgo::Md5 => "MD5",
            DigestAlgo::Md2 => "MD2",
            DigestAlgo::Sha1 => "SHA1",
            DigestAlgo::Sha256 => "SHA256",
            DigestAlgo::Sha384 => "SHA384",
            DigestAlgo::Sha512 => "SHA512",
        }
    }

    /// Maximum size of the raw digest in bytes.
    ///
    /// Checksums are rendered as octal text, hence 11 bytes for CRC32.
    pub fn byte_size(&self) -> usize {
        match self {
            DigestAlgo::Crc32 => 11,
            DigestAlgo::Adler32 => 9,
            DigestAlgo::Md5 | DigestAlgo::Md2 => 16,
            DigestAlgo::Sha1 => 20,
            DigestAlgo::Sha256 => 32,
            DigestAlgo::Sha384 => 48,
            DigestAlgo::Sha512 => 64,
        }
    }

    pub fn hex_size(&self) -> usize {
        self.byte_size() * 2
    }

    /// Looks an algorithm up by identifier or standard name, ignoring case.
    pub fn from_name(name: &str) -> Result<Self> {
        let wanted = name.trim();
        ALL_ALGOS
            .iter()
            .copied()
            .find(|algo| {
                algo.ident().eq_ignore_ascii_case(wanted) || algo.name().eq_ignore_ascii_case(wanted)
            })
            .ok_or_else(|| VfsError::UnknownAlgorithm(name.to_string()))
    }
}

impl FromStr for DigestAlgo {
    type Err = VfsError;

    fn from_str(s: &str) -> Result<Self> {
        DigestAlgo::from_name(s)
    }
}

impl fmt::Display for DigestAlgo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

enum Inner {
    Crc32(crc32fast::Hasher),
    Adler32(adler2::Adler32),
    Hash(Box<dyn DynDigest + Send>),
}

/// Streaming digest over one algorithm.
pub struct Digester {
    algo: DigestAlgo,
    inner: Inner,
}

impl Digester {
    pub fn new(algo: DigestAlgo) -> Self {
        let inner = match algo {
            DigestAlgo::Crc32 => Inner::Crc32(crc32fast::Hasher::new()),
            DigestAlgo::Adler32 => Inner::Adler32(adler2::Adler32::new()),
            DigestAlgo::Md5 => Inner::Hash(Box::new(md5::Md5::default())),
            DigestAlgo::Md2 => Inner::Hash(Box::new(md2::Md2::default())),
            DigestAlgo::Sha1 => Inner::Hash(Box::new(sha1::Sha1::default())),
            DigestAlgo::Sha256 => Inner::Hash(Box::new(sha2::Sha256::default())),
            DigestAlgo::Sha384 => Inner::Hash(Box::new(sha2::Sha384::default())),
            DigestAlgo::Sha512 => Inner::Hash(Box::new(sha2::Sha512::default())),
        };
        Self { algo, inner }
    }

    pub fn algo(&self) -> DigestAlgo {
        self.algo
    }

    pub fn update(&mut self, data: &[u8]) {
        match &mut self.inner {
            Inner::Crc32(hasher) => hasher.update(data),
            Inner::Adler32(hasher) => hasher.write_slice(data),
            Inner::Hash(hasher) => hasher.update(data),
        }
    }

    /// Consumes the digester. Checksums come back as the ASCII octal
    /// rendering of their value.
    pub fn finalize(self) -> Vec<u8> {
        match self.inner {
            Inner::Crc32(hasher) => format!("{:o}", hasher.finalize()).into_bytes(),
            Inner::Adler32(hasher) => format!("{:o}", hasher.checksum()).into_bytes(),
            Inner::Hash(hasher) => hasher.finalize().into_vec(),
        }
    }
}

pub fn hash_bytes(data: &[u8], algo: DigestAlgo) -> Vec<u8> {
    let mut digester = Digester::new(algo);
    digester.update(data);
    digester.finalize()
}

/// Streams a whole file through `algo`.
pub fn hash_file(path: &Path, algo: DigestAlgo) -> Result<Vec<u8>> {
    let mut file = File::open(path)?;
    let mut digester = Digester::new(algo);
    let mut buf = vec![0u8; DIGEST_BUFFER_SIZE];
    loop {
        let n = file.read(&mut buf)?;
        if n == 0 {
            break;
        }
        digester.update(&buf[..n]);
    }
    debug!("{} computed for {:?}", algo, path);
    Ok(digester.finalize())
}

/// Hashes at most the first `limit` bytes of a file.
pub fn hash_file_prefix(path: &Path, algo: DigestAlgo, limit: u64) -> Result<Vec<u8>> {
    let file = File::open(path)?;
    let mut reader = file.take(limit);
    let mut digester = Digester::new(algo);
    let mut buf = vec![0u8; DIGEST_BUFFER_SIZE];
    loop {
        let n = reader.read(&mut buf)?;
        if n == 0 {
            break;
        }
        digester.update(&buf[..n]);
    }
    Ok(digester.finalize())
}

/// Raw CRC32 value of a file.
pub fn crc32_file(path: &Path) -> Result<u32> {
    let mut file = File::open(path)?;
    let mut hasher = crc32fast::Hasher::new();
    let mut buf = vec![0u8; DIGEST_BUFFER_SIZE];
    loop {
        let n = file.read(&mut buf)?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
    }
    Ok(hasher.finalize())
}

pub fn to_hex(digest: &[u8]) -> String {
    hex::encode(digest)
}

pub fn from_hex(text: &str) -> Result<Vec<u8>> {
    hex::decode(text.trim())
        .map_err(|e| VfsError::InvalidArgument(format!("invalid hex digest {}: {}", text, e)))
}

/// Compares two digests without short-circuiting on the first mismatch.
pub fn digest_equals(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.iter().zip(b).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}

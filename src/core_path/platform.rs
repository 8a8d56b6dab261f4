use log::warn;
use once_cell::sync::Lazy;
use std::path::{Path, PathBuf};

static PLATFORM: Lazy<Platform> = Lazy::new(Platform::detect);

/// Operating system family and filesystem roots, computed once per process.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Platform {
    is_unix: bool,
    roots: Vec<PathBuf>,
}

impl Platform {
    /// The process-wide platform description. Never mutated after first use.
    pub fn current() -> &'static Platform {
        &PLATFORM
    }

    pub fn detect() -> Self {
        if cfg!(windows) {
            Self::windows(windows_roots())
        } else {
            Self::posix()
        }
    }

    pub fn posix() -> Self {
        Self {
            is_unix: true,
            roots: vec![PathBuf::from("/")],
        }
    }

    pub fn windows(roots: Vec<PathBuf>) -> Self {
        let roots = if roots.is_empty() {
            vec![PathBuf::from("C:\\")]
        } else {
            roots
        };
        Self {
            is_unix: false,
            roots,
        }
    }

    pub fn is_unix(&self) -> bool {
        self.is_unix
    }

    pub fn roots(&self) -> &[PathBuf] {
        &self.roots
    }

    /// Returns the filesystem root holding `path`.
    pub fn corresponding_root(&self, path: &Path) -> PathBuf {
        if self.is_unix {
            return PathBuf::from("/");
        }
        let path = path.to_string_lossy();
        for root in &self.roots {
            if path.starts_with(root.to_string_lossy().as_ref()) {
                return root.clone();
            }
        }
        warn!("No root found for {:?}", path);
        self.roots[0].clone()
    }
}

fn windows_roots() -> Vec<PathBuf> {
    let mut roots = Vec::new();
    for letter in b'A'..=b'Z' {
        let drive = PathBuf::from(format!("{}:\\", letter as char));
        if drive.exists() {
            roots.push(drive);
        }
    }
    roots
}

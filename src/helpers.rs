use log::debug;
#[cfg(unix)]
use nix::unistd::{self, AccessFlags};
use std::io;
use std::path::Path;
use sysinfo::{DiskExt, System, SystemExt};

/// Returns the space available to unprivileged users on the disk holding `path`.
///
/// # Arguments
///
/// * `path` - Any real path, usually a session's current directory.
///
/// # Returns
///
/// The available bytes, from the deepest mount point containing `path`.
pub fn get_free_space(path: &Path) -> io::Result<u64> {
    let mut sys = System::new();
    sys.refresh_disks_list();

    let mut best: Option<(usize, u64)> = None;
    for disk in sys.disks() {
        let mount_point = disk.mount_point();
        if path.starts_with(mount_point) {
            let depth = mount_point.components().count();
            if best.map_or(true, |(current, _)| depth > current) {
                best = Some((depth, disk.available_space()));
            }
        }
    }

    match best {
        Some((_, available)) => Ok(available),
        None => {
            debug!("No disk listed for {:?}, asking the filesystem", path);
            fs2::available_space(path)
        }
    }
}

#[cfg(unix)]
fn access(path: &Path, mode: AccessFlags) -> bool {
    unistd::access(path, mode).is_ok()
}

#[cfg(unix)]
pub fn can_read(path: &Path) -> bool {
    access(path, AccessFlags::R_OK)
}

#[cfg(unix)]
pub fn can_write(path: &Path) -> bool {
    access(path, AccessFlags::W_OK)
}

#[cfg(unix)]
pub fn can_execute(path: &Path) -> bool {
    access(path, AccessFlags::X_OK)
}

#[cfg(not(unix))]
pub fn can_read(path: &Path) -> bool {
    path.exists()
}

#[cfg(not(unix))]
pub fn can_write(path: &Path) -> bool {
    path.metadata()
        .map(|m| !m.permissions().readonly())
        .unwrap_or(false)
}

#[cfg(not(unix))]
pub fn can_execute(path: &Path) -> bool {
    path.is_dir()
}

/// Formats a byte count the way SITE replies show free space.
pub fn format_free_space(bytes: u64) -> String {
    let size_in_mb = bytes as f64 / 1_048_576.0;
    if size_in_mb >= 1_048_576.0 {
        format!("{:.2} TB", size_in_mb / 1_048_576.0)
    } else if size_in_mb >= 1_024.0 {
        format!("{:.2} GB", size_in_mb / 1_024.0)
    } else {
        format!("{:.2} MB", size_in_mb)
    }
}

use crate::constants::{LS_FUTURE_SLOP_MILLIS, LS_OLD_FILE_MILLIS};
use crate::core_dir::mlsx::{Fact, OptsMlsx};
use crate::core_error::{Result, VfsError};
use crate::helpers::{can_execute, can_read, can_write};
use chrono::{DateTime, Local, TimeZone};
use filetime::FileTime;
use std::fmt::Write;
use std::fs;
use std::path::Path;

/// Last modification time of a real path, in the local time zone.
pub fn modified_at(path: &Path) -> Result<DateTime<Local>> {
    let metadata = fs::metadata(path)?;
    let mtime = FileTime::from_last_modification_time(&metadata);
    Local
        .timestamp_opt(mtime.unix_seconds(), mtime.nanoseconds())
        .earliest()
        .ok_or_else(|| VfsError::InvalidArgument(format!("bad modification time for {:?}", path)))
}

/// `YYYYMMDDHHMMSS.sss` rendering used by MDTM and the `Modify` fact.
pub fn modification_time(path: &Path) -> Result<String> {
    Ok(modified_at(path)?.format("%Y%m%d%H%M%S%.3f").to_string())
}

/// Date column of an `ls` line: time of day for recent files, year otherwise.
pub fn ls_date(mtime: DateTime<Local>, now: DateTime<Local>) -> String {
    let age = now.timestamp_millis() - mtime.timestamp_millis();
    if age > LS_OLD_FILE_MILLIS || age < -LS_FUTURE_SLOP_MILLIS {
        mtime.format("%b %d  %Y").to_string()
    } else {
        mtime.format("%b %d %H:%M").to_string()
    }
}

/// One `ls -l` style line. Owner, group and link count are placeholders.
pub fn ls_line(path: &Path, name: &str) -> Result<String> {
    let metadata = fs::metadata(path)?;
    let mut line = String::with_capacity(64);
    line.push(if metadata.is_dir() { 'd' } else { '-' });
    line.push(if can_read(path) { 'r' } else { '-' });
    line.push(if can_write(path) { 'w' } else { '-' });
    line.push(if can_execute(path) { 'x' } else { '-' });
    let date = ls_date(modified_at(path)?, Local::now());
    let _ = write!(
        line,
        "------ 1 anybody\tanygroup\t{}\t{}\t{}",
        metadata.len(),
        date,
        name
    );
    Ok(line)
}

/// Kind of entry for the `Type` fact.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryKind {
    CurrentDir,
    Dir,
    File,
}

impl EntryKind {
    fn fact(&self) -> &'static str {
        match self {
            EntryKind::CurrentDir => "cdir",
            EntryKind::Dir => "dir",
            EntryKind::File => "file",
        }
    }
}

/// One MLSx fact line: ` Size=..;Modify=..;Type=..;Perm=..; name`.
///
/// `path_valid` says whether the directory's own business path is valid,
/// which grants the `dmp` permissions on writable directories.
pub fn mlsx_line(
    path: &Path,
    name: &str,
    opts: &OptsMlsx,
    kind: EntryKind,
    path_valid: bool,
) -> Result<String> {
    let metadata = fs::metadata(path)?;
    let mut line = String::from(" ");
    if opts.is_active(Fact::Size) {
        let _ = write!(line, "Size={};", metadata.len());
    }
    if opts.is_active(Fact::Modify) {
        let _ = write!(line, "Modify={};", modification_time(path)?);
    }
    if opts.is_active(Fact::Type) {
        let _ = write!(line, "Type={};", kind.fact());
    }
    if opts.is_active(Fact::Perm) {
        line.push_str("Perm=");
        if metadata.is_file() {
            if can_write(path) {
                line.push_str("adfw");
            }
            if can_read(path) {
                line.push('r');
            }
        } else {
            if can_write(path) {
                line.push('c');
                if path_valid {
                    line.push_str("dmp");
                }
            }
            if can_read(path) {
                line.push_str("le");
            }
        }
        line.push(';');
    }
    line.push(' ');
    line.push_str(name);
    Ok(line)
}

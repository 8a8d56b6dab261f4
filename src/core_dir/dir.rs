use crate::constants::{DEFAULT_UNIQUE_EXTENSION, SEPARATOR};
use crate::core_auth::AuthContext;
use crate::core_digest::{crc32_file, hash_file, DigestAlgo};
use crate::core_dir::listing::{ls_line, mlsx_line, modification_time, EntryKind};
use crate::core_dir::mlsx::OptsMlsx;
use crate::core_error::{Result, VfsError};
use crate::core_file::{TransferParams, VirtualFile};
use crate::core_path::{canonicalize, has_wildcard, is_absolute, normalize, validate, Platform};
use crate::helpers;
use glob::{MatchOptions, Pattern};
use log::{debug, info, warn};
use std::fs::{self, OpenOptions};
use std::io::ErrorKind;
use std::path::{Component, Path, PathBuf};

const MATCH_OPTIONS: MatchOptions = MatchOptions {
    case_sensitive: true,
    require_literal_separator: true,
    require_literal_leading_dot: false,
};

/// Directory view of one session, expressed in business paths.
///
/// Every operation takes the session's `AuthContext`, which owns the
/// translation between business paths and the mount point.
#[derive(Debug, Clone)]
pub struct VirtualDirectory {
    current_dir: Option<String>,
    opts: OptsMlsx,
    wildcard_enabled: bool,
    platform: &'static Platform,
}

impl VirtualDirectory {
    pub fn new(wildcard_enabled: bool) -> Self {
        Self::with_platform(wildcard_enabled, Platform::current())
    }

    pub fn with_platform(wildcard_enabled: bool, platform: &'static Platform) -> Self {
        Self {
            current_dir: None,
            opts: OptsMlsx::for_directory(),
            wildcard_enabled,
            platform,
        }
    }

    pub fn opts(&self) -> &OptsMlsx {
        &self.opts
    }

    pub fn opts_mut(&mut self) -> &mut OptsMlsx {
        &mut self.opts
    }

    pub fn wildcard_enabled(&self) -> bool {
        self.wildcard_enabled
    }

    /// Moves to the business root once the session is identified.
    pub fn init_after_identification(&mut self, auth: &AuthContext) {
        self.current_dir = auth.business_root().map(str::to_string);
    }

    pub fn clear(&mut self) {
        self.current_dir = None;
    }

    pub fn pwd(&self) -> Result<&str> {
        self.current_dir.as_deref().ok_or(VfsError::NotAuthenticated)
    }

    fn check_identify(&self, auth: &AuthContext) -> Result<()> {
        if !auth.is_identified() || self.current_dir.is_none() {
            return Err(VfsError::NotAuthenticated);
        }
        Ok(())
    }

    /// Resolves `path` (absolute, business or relative to the current
    /// directory) to a valid business path.
    pub fn validate_path(&self, auth: &AuthContext, path: &str) -> Result<String> {
        if path.is_empty() {
            return Err(VfsError::InvalidArgument("Path must not be empty".to_string()));
        }
        if is_absolute(path, self.platform) {
            match validate(path, auth, self.platform) {
                Ok(business) => return Ok(business),
                // Could still be a business path.
                Err(VfsError::PathOutsideSandbox(_)) => {}
                Err(e) => return Err(e),
            }
        }
        let ext_dir = if path.starts_with(SEPARATOR) {
            path.to_string()
        } else {
            format!("{}{}{}", self.pwd()?, SEPARATOR, path)
        };
        let real = format!("{}{}{}", auth.base_directory(), SEPARATOR, ext_dir);
        validate(&real, auth, self.platform)
    }

    /// Turns a client path into an absolute business path, without
    /// validating it.
    pub fn consolidate_path(&self, path: &str) -> Result<String> {
        if path.is_empty() {
            return Err(VfsError::InvalidArgument("Path must not be empty".to_string()));
        }
        if is_absolute(path, self.platform) {
            return Ok(normalize(path));
        }
        let ext_dir = normalize(path);
        if ext_dir.starts_with(SEPARATOR) {
            return Ok(ext_dir);
        }
        Ok(format!("{}{}{}", self.pwd()?, SEPARATOR, ext_dir))
    }

    /// Real path behind a business path, after validation.
    pub fn file_from_path(&self, auth: &AuthContext, path: &str) -> Result<PathBuf> {
        let business = self.validate_path(auth, path)?;
        Ok(PathBuf::from(auth.to_absolute(&business)))
    }

    fn business_of(&self, auth: &AuthContext, real: &Path) -> String {
        auth.to_relative(&normalize(&real.to_string_lossy()))
    }

    /// Expands `*`, `?` and character classes, segment by segment.
    ///
    /// A path without wildcard characters is returned as is when its business
    /// path is valid, without touching the filesystem. Every expanded match
    /// is validated.
    pub fn wildcard_files(&self, auth: &AuthContext, pattern: &str) -> Result<Vec<String>> {
        if !has_wildcard(pattern) {
            if auth.is_business_path_valid(pattern) {
                return Ok(vec![pattern.to_string()]);
            }
            return Ok(Vec::new());
        }
        if !self.wildcard_enabled {
            return Err(VfsError::WildcardNotSupported(pattern.to_string()));
        }

        let absolute = is_absolute(pattern, self.platform);
        let (root, wildcard_file) = if !self.platform.is_unix() && absolute {
            let wildcard_file = PathBuf::from(pattern);
            (self.platform.corresponding_root(&wildcard_file), wildcard_file)
        } else {
            let root = if absolute {
                PathBuf::from(SEPARATOR)
            } else {
                PathBuf::from(auth.base_directory())
            };
            let wildcard_file = PathBuf::from(format!("{}{}{}", root.display(), SEPARATOR, pattern));
            (root, wildcard_file)
        };

        let relative = wildcard_file
            .strip_prefix(&root)
            .map(Path::to_path_buf)
            .unwrap_or_else(|_| wildcard_file.clone());

        let mut candidates = vec![root];
        for component in relative.components() {
            candidates = match component {
                Component::Normal(segment) => {
                    let segment = segment.to_string_lossy();
                    let mut next = Vec::new();
                    for dir in &candidates {
                        if dir.is_dir() {
                            next.extend(matching_children(dir, &segment)?);
                        }
                    }
                    next
                }
                Component::ParentDir => candidates
                    .into_iter()
                    .map(|dir| dir.parent().map(Path::to_path_buf).unwrap_or(dir))
                    .collect(),
                _ => candidates,
            };
            if candidates.is_empty() {
                break;
            }
        }

        let mut results = Vec::with_capacity(candidates.len());
        for file in &candidates {
            let relative = self.business_of(auth, file);
            results.push(self.validate_path(auth, &relative)?);
        }
        debug!("{} expanded to {} entries", pattern, results.len());
        Ok(results)
    }

    fn single_match(&self, auth: &AuthContext, path: &str) -> Result<String> {
        let paths = self.wildcard_files(auth, path)?;
        if paths.len() != 1 {
            return Err(VfsError::AmbiguousOrNotFound {
                path: path.to_string(),
                count: paths.len(),
            });
        }
        Ok(paths.into_iter().next().unwrap_or_default())
    }

    pub fn change_directory(&mut self, auth: &AuthContext, path: &str) -> Result<()> {
        self.change_directory_inner(auth, path, true)
    }

    /// Same as `change_directory` without requiring the target to exist.
    pub fn change_directory_not_checked(&mut self, auth: &AuthContext, path: &str) -> Result<()> {
        self.change_directory_inner(auth, path, false)
    }

    fn change_directory_inner(&mut self, auth: &AuthContext, path: &str, checked: bool) -> Result<()> {
        self.check_identify(auth)?;
        let newpath = self.consolidate_path(path)?;
        let ext_dir = match self.single_match(auth, &newpath) {
            Ok(found) => found,
            Err(e) => {
                warn!("CD error: {}", newpath);
                return Err(e);
            }
        };
        let ext_dir = self.validate_path(auth, &ext_dir)?;
        if checked && !self.is_directory(auth, &ext_dir)? {
            return Err(VfsError::NotFound(format!("Directory not found: {}", ext_dir)));
        }
        debug!("CWD {}", ext_dir);
        self.current_dir = Some(ext_dir);
        Ok(())
    }

    pub fn change_parent_directory(&mut self, auth: &AuthContext) -> Result<()> {
        self.change_directory(auth, "..")
    }

    /// Creates one directory level. Returns its business path.
    pub fn mkdir(&self, auth: &AuthContext, directory: &str) -> Result<String> {
        self.check_identify(auth)?;
        let (parent, name) = self.split_leaf(directory)?;
        let parent = self.single_match(auth, &normalize(&parent))?;
        let new_dir = self.validate_path(auth, &format!("{}{}{}", parent, SEPARATOR, name))?;
        let real = self.file_from_path(auth, &new_dir)?;
        fs::create_dir(&real)?;
        info!("Directory created: {}", new_dir);
        Ok(new_dir)
    }

    /// Removes an empty directory. Returns its business path.
    pub fn rmdir(&self, auth: &AuthContext, directory: &str) -> Result<String> {
        self.check_identify(auth)?;
        let (parent, name) = self.split_leaf(directory)?;
        let parent = self.single_match(auth, &normalize(&parent))?;
        let target = self.single_match(auth, &format!("{}{}{}", parent, SEPARATOR, name))?;
        let ext_dir = self.validate_path(auth, &target)?;
        let real = self.file_from_path(auth, &ext_dir)?;
        fs::remove_dir(&real)?;
        info!("Directory removed: {}", ext_dir);
        Ok(ext_dir)
    }

    fn split_leaf(&self, directory: &str) -> Result<(String, String)> {
        let consolidated = self.consolidate_path(directory)?;
        let trimmed = consolidated.trim_end_matches('/');
        match trimmed.rsplit_once('/') {
            Some((parent, name)) if !name.is_empty() => {
                let parent = if parent.is_empty() { SEPARATOR } else { parent };
                Ok((parent.to_string(), name.to_string()))
            }
            _ => Err(VfsError::InvalidArgument(format!(
                "No parent directory for {}",
                directory
            ))),
        }
    }

    pub fn is_directory(&self, auth: &AuthContext, path: &str) -> Result<bool> {
        self.check_identify(auth)?;
        Ok(self.file_from_path(auth, path)?.is_dir())
    }

    pub fn is_file(&self, auth: &AuthContext, path: &str) -> Result<bool> {
        self.check_identify(auth)?;
        Ok(self.file_from_path(auth, path)?.is_file())
    }

    /// MDTM value: `YYYYMMDDHHMMSS.sss` in local time.
    pub fn get_modification_time(&self, auth: &AuthContext, path: &str) -> Result<String> {
        self.check_identify(auth)?;
        let file = self.file_from_path(auth, path)?;
        if !file.exists() {
            return Err(VfsError::NotFound(format!("\"{}\" does not exist", path)));
        }
        modification_time(&file)
    }

    // Empty means the current directory, `-a` / `-A` asks for dot files.
    fn list_args(&self, path: &str) -> Result<(String, bool)> {
        let current = self.pwd()?.to_string();
        if path.is_empty() {
            return Ok((current, false));
        }
        if path.starts_with("-a") || path.starts_with("-A") {
            let target = path
                .split(' ')
                .nth(1)
                .filter(|arg| !arg.is_empty())
                .map(str::to_string)
                .unwrap_or(current);
            return Ok((target, true));
        }
        Ok((path.to_string(), false))
    }

    fn matched_paths(&self, auth: &AuthContext, path: &str) -> Result<(String, Vec<String>)> {
        let newpath = self.consolidate_path(path)?;
        let paths = self.wildcard_files(auth, &newpath)?;
        if paths.is_empty() {
            return Err(VfsError::NotFound("No files found".to_string()));
        }
        Ok((newpath, paths))
    }

    /// Names of the matched entries; directories are replaced by their
    /// children.
    pub fn list(&self, auth: &AuthContext, path: &str) -> Result<Vec<String>> {
        self.check_identify(auth)?;
        let (path, all) = self.list_args(path)?;
        let (_, paths) = self.matched_paths(auth, &path)?;
        let mut names = Vec::new();
        for file in paths {
            let real = self.file_from_path(auth, &file)?;
            if real.is_dir() {
                names.extend(children(&real, all)?.into_iter().map(|(name, _)| name));
            } else if real.exists() {
                names.push(file);
            }
        }
        Ok(names)
    }

    /// Like `list`, rendered as `ls` lines or MLSx fact lines.
    pub fn list_full(&self, auth: &AuthContext, path: &str, ls_format: bool) -> Result<Vec<String>> {
        self.check_identify(auth)?;
        let (path, all) = self.list_args(path)?;
        let (newpath, paths) = self.matched_paths(auth, &path)?;
        let mut lines = Vec::new();
        for file in paths {
            let real = self.file_from_path(auth, &file)?;
            if real.is_dir() {
                for (name, child) in children(&real, all)? {
                    lines.push(self.info(auth, &child, &name, ls_format)?);
                }
            } else if real.exists() {
                let name = leaf_name(&real);
                lines.push(self.info(auth, &real, &name, ls_format)?);
            }
        }
        if all {
            let parent = self.file_from_path(auth, &newpath)?.join("..");
            if parent.exists() {
                lines.push(self.info(auth, &parent, "..", ls_format)?);
            }
        }
        Ok(lines)
    }

    /// Single-entry listing for `STAT path` or `MLST path`.
    pub fn file_full(&self, auth: &AuthContext, path: &str, ls_format: bool) -> Result<String> {
        self.check_identify(auth)?;
        let newpath = self.consolidate_path(path)?;
        let found = self.single_match(auth, &normalize(&newpath))?;
        let real = self.file_from_path(auth, &found)?;
        if !real.exists() {
            return Ok(format!("No file with name \"{}\"", path));
        }
        let name = leaf_name(&real);
        let info = self.info(auth, &real, &name, ls_format)?;
        Ok(format!("Listing of \"{}\"\n{}\nEnd of listing", found, info))
    }

    fn info(&self, auth: &AuthContext, real: &Path, name: &str, ls_format: bool) -> Result<String> {
        if ls_format {
            return ls_line(real, name);
        }
        let real_text = normalize(&real.to_string_lossy());
        let canonical = normalize(&canonicalize(&real_text, self.platform));
        let kind = if self.is_current_dir(auth, &canonical) {
            EntryKind::CurrentDir
        } else if real.is_dir() {
            EntryKind::Dir
        } else {
            EntryKind::File
        };
        let path_valid = validate(&real_text, auth, self.platform).is_ok();
        mlsx_line(real, name, &self.opts, kind, path_valid)
    }

    fn is_current_dir(&self, auth: &AuthContext, canonical: &str) -> bool {
        match self.current_dir.as_deref() {
            Some(current) => {
                let current_real = auth.to_absolute(current);
                normalize(&canonicalize(&current_real, self.platform)) == canonical
            }
            None => false,
        }
    }

    /// Free bytes on the disk holding the current directory.
    pub fn get_free_space(&self, auth: &AuthContext) -> Result<u64> {
        self.check_identify(auth)?;
        let real = self.file_from_path(auth, self.pwd()?)?;
        Ok(helpers::get_free_space(&real)?)
    }

    /// Creates `{user}{N}{extension}` in the current directory and opens it.
    pub fn set_unique_file(
        &self,
        auth: &AuthContext,
        extension: &str,
        params: &TransferParams,
    ) -> Result<VirtualFile> {
        self.check_identify(auth)?;
        let dir = self.file_from_path(auth, self.pwd()?)?;
        let prefix = auth.user().unwrap_or_default();
        let extension = if extension.is_empty() {
            DEFAULT_UNIQUE_EXTENSION
        } else {
            extension
        };
        loop {
            let candidate = dir.join(format!("{}{}{}", prefix, rand::random::<u32>(), extension));
            match OpenOptions::new().write(true).create_new(true).open(&candidate) {
                Ok(_) => {
                    let business = self.business_of(auth, &candidate);
                    debug!("Unique file {}", business);
                    return VirtualFile::new(self, auth, &business, false, params);
                }
                Err(e) if e.kind() == ErrorKind::AlreadyExists => continue,
                Err(e) => return Err(e.into()),
            }
        }
    }

    /// Opens the single file matching `path`.
    pub fn set_file(
        &self,
        auth: &AuthContext,
        path: &str,
        append: bool,
        params: &TransferParams,
    ) -> Result<VirtualFile> {
        self.check_identify(auth)?;
        let newpath = self.consolidate_path(path)?;
        let found = self.single_match(auth, &newpath)?;
        VirtualFile::new(self, auth, &found, append, params)
    }

    pub fn can_read(&self, auth: &AuthContext) -> Result<bool> {
        self.check_identify(auth)?;
        Ok(helpers::can_read(&self.file_from_path(auth, self.pwd()?)?))
    }

    pub fn can_write(&self, auth: &AuthContext) -> Result<bool> {
        self.check_identify(auth)?;
        Ok(helpers::can_write(&self.file_from_path(auth, self.pwd()?)?))
    }

    pub fn exists(&self, auth: &AuthContext) -> Result<bool> {
        self.check_identify(auth)?;
        Ok(self.file_from_path(auth, self.pwd()?)?.exists())
    }

    /// Whether `path` lies in the current directory or below it.
    pub fn is_path_in_current_dir(&self, auth: &AuthContext, path: &str) -> bool {
        let current = match self.current_dir.as_deref() {
            Some(current) => current,
            None => return false,
        };
        let real = if is_absolute(path, self.platform) {
            path.to_string()
        } else if path.starts_with(SEPARATOR) {
            format!("{}{}{}", auth.base_directory(), SEPARATOR, path)
        } else {
            format!("{}{}{}{}{}", auth.base_directory(), SEPARATOR, current, SEPARATOR, path)
        };
        let business = auth.to_relative(&normalize(&canonicalize(&real, self.platform)));
        let inside = business == current
            || business
                .strip_prefix(current)
                .map_or(false, |rest| rest.starts_with('/') || current.ends_with('/'));
        if !inside {
            warn!("File not OK: {} not in {}", business, current);
        }
        inside
    }

    /// Real path of the single regular file matching `path`.
    pub fn get_true_file(&self, auth: &AuthContext, path: &str) -> Result<PathBuf> {
        self.check_identify(auth)?;
        let newpath = self.consolidate_path(path)?;
        let found = self.single_match(auth, &normalize(&newpath))?;
        let ext_dir = self.validate_path(auth, &found)?;
        let file = self.file_from_path(auth, &ext_dir)?;
        if !file.is_file() {
            return Err(VfsError::NotFound(format!("Path is not a file: {}", path)));
        }
        Ok(file)
    }

    pub fn get_crc(&self, auth: &AuthContext, path: &str) -> Result<u32> {
        crc32_file(&self.get_true_file(auth, path)?)
    }

    pub fn get_md5(&self, auth: &AuthContext, path: &str) -> Result<Vec<u8>> {
        hash_file(&self.get_true_file(auth, path)?, DigestAlgo::Md5)
    }

    pub fn get_sha1(&self, auth: &AuthContext, path: &str) -> Result<Vec<u8>> {
        hash_file(&self.get_true_file(auth, path)?, DigestAlgo::Sha1)
    }

    pub fn get_sha256(&self, auth: &AuthContext, path: &str) -> Result<Vec<u8>> {
        hash_file(&self.get_true_file(auth, path)?, DigestAlgo::Sha256)
    }

    pub fn get_sha512(&self, auth: &AuthContext, path: &str) -> Result<Vec<u8>> {
        hash_file(&self.get_true_file(auth, path)?, DigestAlgo::Sha512)
    }

    /// Digest of a file with an algorithm chosen by name, e.g. `SHA-384`.
    pub fn get_digest(&self, auth: &AuthContext, path: &str, algo_name: &str) -> Result<Vec<u8>> {
        let algo = DigestAlgo::from_name(algo_name)?;
        hash_file(&self.get_true_file(auth, path)?, algo)
    }
}

fn leaf_name(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.to_string_lossy().into_owned())
}

/// Sorted children of a directory; dot files only when `all` is set.
fn children(dir: &Path, all: bool) -> Result<Vec<(String, PathBuf)>> {
    let mut entries = Vec::new();
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        let name = entry.file_name().to_string_lossy().into_owned();
        if !all && name.starts_with('.') {
            continue;
        }
        entries.push((name, entry.path()));
    }
    entries.sort();
    Ok(entries)
}

/// Children of `dir` whose name matches one glob segment.
fn matching_children(dir: &Path, segment: &str) -> Result<Vec<PathBuf>> {
    if !has_wildcard(segment) && !segment.contains('[') {
        let child = dir.join(segment);
        return Ok(if child.exists() { vec![child] } else { Vec::new() });
    }
    let pattern = Pattern::new(segment).or_else(|_| Pattern::new(&Pattern::escape(segment)));
    let pattern = pattern.map_err(|e| VfsError::InvalidArgument(e.to_string()))?;
    let mut matches = Vec::new();
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        let name = entry.file_name();
        if pattern.matches_with(&name.to_string_lossy(), MATCH_OPTIONS) {
            matches.push(entry.path());
        }
    }
    matches.sort();
    Ok(matches)
}

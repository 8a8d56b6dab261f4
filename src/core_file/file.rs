use crate::constants::DEFAULT_BLOCK_SIZE;
use crate::core_auth::AuthContext;
use crate::core_block::{DataBlock, RestartMarker};
use crate::core_dir::VirtualDirectory;
use crate::core_error::{Result, VfsError};
use crate::core_path::normalize;
use crate::helpers;
use log::{debug, error, info, warn};
use std::fs::{self, File, OpenOptions};
use std::io::{self, ErrorKind, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

/// Per-session settings a file needs while transferring.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransferParams {
    pub block_size: usize,
    pub delete_on_abort: bool,
}

impl Default for TransferParams {
    fn default() -> Self {
        Self {
            block_size: DEFAULT_BLOCK_SIZE,
            delete_on_abort: false,
        }
    }
}

/// One file being transferred, read or written block by block.
///
/// At most one of the input and output handles is open. Closing releases
/// the handle and resets the position but keeps the path, so the same
/// file can be reopened for a restart.
#[derive(Debug)]
pub struct VirtualFile {
    business_path: String,
    real_path: PathBuf,
    append: bool,
    position: u64,
    ready: bool,
    input: Option<File>,
    output: Option<File>,
    block_size: usize,
    delete_on_abort: bool,
}

impl VirtualFile {
    /// Binds a business path to its real file.
    ///
    /// # Arguments
    ///
    /// * `dir` - Directory used to validate `path`.
    /// * `auth` - The identified session.
    /// * `path` - Business path, absolute or relative to the current directory.
    /// * `append` - Start at the current end of file instead of 0.
    /// * `params` - Block size and abort policy.
    ///
    /// # Returns
    ///
    /// A ready file. Nothing is opened until the first block.
    pub fn new(
        dir: &VirtualDirectory,
        auth: &AuthContext,
        path: &str,
        append: bool,
        params: &TransferParams,
    ) -> Result<Self> {
        if !auth.is_identified() {
            return Err(VfsError::NotAuthenticated);
        }
        let business_path = dir.validate_path(auth, path)?;
        let real_path = PathBuf::from(auth.to_absolute(&business_path));
        let position = if append {
            fs::metadata(&real_path).map(|m| m.len()).unwrap_or(0)
        } else {
            0
        };
        debug!("File {} opened at {}", business_path, position);
        Ok(Self {
            business_path,
            real_path,
            append,
            position,
            ready: true,
            input: None,
            output: None,
            block_size: params.block_size.max(1),
            delete_on_abort: params.delete_on_abort,
        })
    }

    pub fn business_path(&self) -> &str {
        &self.business_path
    }

    pub fn real_path(&self) -> &Path {
        &self.real_path
    }

    pub fn is_append(&self) -> bool {
        self.append
    }

    pub fn position(&self) -> u64 {
        self.position
    }

    pub fn block_size(&self) -> usize {
        self.block_size
    }

    pub fn is_ready(&self) -> bool {
        self.ready
    }

    pub fn is_in_reading(&self) -> bool {
        self.ready && self.input.is_some()
    }

    pub fn is_in_writing(&self) -> bool {
        self.ready && self.output.is_some()
    }

    pub fn is_directory(&self) -> bool {
        self.ready && self.real_path.is_dir()
    }

    pub fn is_file(&self) -> bool {
        self.ready && self.real_path.is_file()
    }

    pub fn exists(&self) -> bool {
        self.ready && self.real_path.exists()
    }

    pub fn can_read(&self) -> bool {
        self.ready && helpers::can_read(&self.real_path)
    }

    /// A missing file is writable when its parent directory is.
    pub fn can_write(&self) -> bool {
        if !self.ready {
            return false;
        }
        if self.real_path.exists() {
            return helpers::can_write(&self.real_path);
        }
        self.real_path
            .parent()
            .map_or(false, helpers::can_write)
    }

    pub fn length(&self) -> Result<u64> {
        if !self.ready {
            return Err(VfsError::FileNotReady(self.business_path.clone()));
        }
        match fs::metadata(&self.real_path) {
            Ok(metadata) => Ok(metadata.len()),
            Err(e) if e.kind() == ErrorKind::NotFound => {
                Err(VfsError::NotFound(self.business_path.clone()))
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Moves the transfer offset.
    ///
    /// An open input is seeked. An open output is closed and reopened at
    /// `position`, truncating anything beyond it.
    pub fn set_position(&mut self, position: u64) -> Result<()> {
        self.position = position;
        if let Some(input) = self.input.as_mut() {
            input.seek(SeekFrom::Start(position))?;
        }
        if let Some(mut output) = self.output.take() {
            output.flush()?;
            drop(output);
            self.output = Some(self.open_output()?);
        }
        Ok(())
    }

    /// Releases the handles. The path survives, the file is no longer ready.
    pub fn close_file(&mut self) {
        self.input = None;
        if let Some(mut output) = self.output.take() {
            if let Err(e) = output.flush() {
                warn!("Flush of {} failed: {}", self.business_path, e);
            }
        }
        self.position = 0;
        self.ready = false;
    }

    /// Makes a closed file usable again from its initial position.
    pub fn reopen(&mut self) {
        self.input = None;
        self.output = None;
        self.ready = true;
        self.position = if self.append {
            fs::metadata(&self.real_path).map(|m| m.len()).unwrap_or(0)
        } else {
            0
        };
    }

    /// Prepares a download, honouring an armed restart marker.
    pub fn retrieve(&mut self, marker: &mut RestartMarker) -> Result<bool> {
        self.reopen();
        if !self.real_path.is_file() {
            self.ready = false;
            return Err(VfsError::NotFound(self.business_path.clone()));
        }
        self.restart_marker(marker)?;
        Ok(true)
    }

    /// Prepares an upload, honouring an armed restart marker.
    pub fn store(&mut self, marker: &mut RestartMarker) -> Result<bool> {
        self.reopen();
        self.restart_marker(marker)?;
        Ok(true)
    }

    /// Repositions at the armed marker, if any. The marker is consumed.
    pub fn restart_marker(&mut self, marker: &mut RestartMarker) -> Result<bool> {
        if !marker.is_armed() {
            return Ok(false);
        }
        let position = marker.take_position()?;
        self.set_position(position)?;
        info!("Restarting {} at {}", self.business_path, position);
        Ok(true)
    }

    /// Reads the next block.
    ///
    /// A block shorter than the block size carries `EOF` and closes the
    /// file. Reading past the end fails with `EndOfTransfer`.
    pub fn read_data_block(&mut self) -> Result<DataBlock> {
        if !self.ready {
            return Err(VfsError::FileNotReady(self.business_path.clone()));
        }
        if self.input.is_none() {
            match self.open_input() {
                Ok(input) => self.input = Some(input),
                Err(e) => {
                    error!("Cannot open {} for reading: {}", self.business_path, e);
                    self.close_file();
                    return Err(e.into());
                }
            }
        }
        let mut buffer = vec![0u8; self.block_size];
        let filled = match self.input.as_mut() {
            Some(input) => fill(input, &mut buffer),
            None => Ok(0),
        };
        let filled = match filled {
            Ok(filled) => filled,
            Err(e) => {
                error!("Error during read of {}: {}", self.business_path, e);
                self.close_file();
                return Err(e.into());
            }
        };
        if filled == 0 {
            self.close_file();
            return Err(VfsError::EndOfTransfer);
        }
        self.position += filled as u64;
        buffer.truncate(filled);
        let mut block = DataBlock::from_payload(buffer);
        if filled < self.block_size {
            block.set_eof(true);
            info!("Read of {} finished", self.business_path);
            self.close_file();
        }
        Ok(block)
    }

    /// Writes the unread bytes of `block`, then closes the file on `EOF`.
    ///
    /// On failure the file is closed and bytes already written stay on disk.
    pub fn write_data_block(&mut self, block: &DataBlock) -> Result<()> {
        if !self.ready {
            return Err(VfsError::FileNotReady(self.business_path.clone()));
        }
        self.write_block(block)?;
        if block.is_eof() {
            info!("Write of {} finished at {}", self.business_path, self.position);
            self.close_file();
        }
        Ok(())
    }

    fn write_block(&mut self, block: &DataBlock) -> Result<()> {
        if self.output.is_none() {
            match self.open_output() {
                Ok(output) => self.output = Some(output),
                Err(e) => {
                    error!("Cannot open {} for writing: {}", self.business_path, e);
                    self.close_file();
                    return Err(e);
                }
            }
        }
        let data = block.unread();
        if data.is_empty() {
            return Ok(());
        }
        let written = match self.output.as_mut() {
            Some(output) => output.write_all(&data),
            None => Ok(()),
        };
        if let Err(e) = written {
            error!("Error during write of {}: {}", self.business_path, e);
            self.close_file();
            return Err(e.into());
        }
        self.position += data.len() as u64;
        Ok(())
    }

    fn open_input(&self) -> io::Result<File> {
        let mut input = File::open(&self.real_path)?;
        if self.position != 0 {
            input.seek(SeekFrom::Start(self.position))?;
        }
        Ok(input)
    }

    // Past offset 0 the file is cut at the position and written in append mode.
    fn open_output(&self) -> Result<File> {
        if self.position == 0 {
            return Ok(OpenOptions::new()
                .write(true)
                .create(true)
                .truncate(true)
                .open(&self.real_path)?);
        }
        let length = fs::metadata(&self.real_path)?.len();
        if length < self.position {
            return Err(VfsError::InvalidArgument(format!(
                "{} is {} bytes, cannot write at {}",
                self.business_path, length, self.position
            )));
        }
        let file = OpenOptions::new().write(true).open(&self.real_path)?;
        file.set_len(self.position)?;
        drop(file);
        debug!("New size of {}: {}", self.business_path, self.position);
        Ok(OpenOptions::new().append(true).open(&self.real_path)?)
    }

    /// Renames the file to `path`, copying it when a plain rename fails.
    ///
    /// Returns `false` without touching anything when the file is not ready
    /// or unreadable, the target exists, or the target directory is not
    /// writable.
    pub fn rename_to(
        &mut self,
        dir: &VirtualDirectory,
        auth: &AuthContext,
        path: &str,
    ) -> Result<bool> {
        if !self.ready {
            warn!("File not ready: {}", self.business_path);
            return Ok(false);
        }
        if !helpers::can_read(&self.real_path) {
            warn!("Cannot read file: {}", self.business_path);
            return Ok(false);
        }
        let target_business = dir.validate_path(auth, path)?;
        let target = PathBuf::from(auth.to_absolute(&target_business));
        if same_path(&target, &self.real_path) {
            return Ok(true);
        }
        if target.exists() {
            warn!("Target file already exists: {}", target_business);
            return Ok(false);
        }
        if !target.parent().map_or(false, helpers::can_write) {
            warn!("Cannot write file: {} from {}", target_business, self.business_path);
            return Ok(false);
        }
        self.input = None;
        self.output = None;
        if let Err(e) = fs::rename(&self.real_path, &target) {
            debug!("Rename failed ({}), copying {}", e, self.business_path);
            fs::copy(&self.real_path, &target)?;
            File::open(&target)?.sync_all()?;
            fs::remove_file(&self.real_path)?;
        }
        info!("File renamed: {} -> {}", self.business_path, target_business);
        self.business_path = target_business;
        self.real_path = target;
        self.ready = true;
        Ok(true)
    }

    /// Closes and removes the file. A missing file counts as deleted.
    pub fn delete(&mut self) -> Result<bool> {
        if !self.ready {
            return Ok(false);
        }
        if !self.real_path.exists() {
            return Ok(true);
        }
        self.close_file();
        fs::remove_file(&self.real_path)?;
        info!("File deleted: {}", self.business_path);
        Ok(true)
    }

    /// Stops the transfer. A partial upload is removed when configured so.
    pub fn abort_file(&mut self) {
        if self.is_in_writing() && self.delete_on_abort {
            if let Err(e) = self.delete() {
                warn!("Cannot delete aborted file {}: {}", self.business_path, e);
            }
        }
        self.close_file();
    }
}

fn fill(input: &mut File, buffer: &mut [u8]) -> io::Result<usize> {
    let mut filled = 0;
    while filled < buffer.len() {
        match input.read(&mut buffer[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        }
    }
    Ok(filled)
}

fn same_path(a: &Path, b: &Path) -> bool {
    normalize(&a.to_string_lossy()).replace("//", "/") == normalize(&b.to_string_lossy()).replace("//", "/")
}

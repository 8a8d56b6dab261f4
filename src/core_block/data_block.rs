use crate::constants::MARKER_LENGTH;
use crate::core_error::{Result, VfsError};
use bytes::Bytes;
use std::fmt;

/// End of record.
pub const EOR: u8 = 128;
/// End of file.
pub const EOF: u8 = 64;
/// Suspected errors in the block.
pub const ERROR: u8 = 32;
/// Block carries a restart marker instead of data.
pub const RESTART: u8 = 16;

/// One framed block exchanged with the transport.
///
/// When `RESTART` is set the payload is not data: its first six bytes are
/// the restart marker and the byte count is fixed to six.
///
/// The descriptor byte is kept as received. Flag setters only ever add
/// their bit to it, the booleans carry the current state.
#[derive(Debug, Clone)]
pub struct DataBlock {
    payload: Option<Bytes>,
    offset: i32,
    length: i32,
    descriptor: u8,
    eor: bool,
    eof: bool,
    error: bool,
    restart: bool,
    markers: Option<[u8; MARKER_LENGTH]>,
}

impl Default for DataBlock {
    fn default() -> Self {
        Self::new()
    }
}

impl DataBlock {
    pub fn new() -> Self {
        Self {
            payload: None,
            offset: 0,
            length: -1,
            descriptor: 0,
            eor: false,
            eof: false,
            error: false,
            restart: false,
            markers: None,
        }
    }

    /// Builds a data block holding all of `payload`.
    pub fn from_payload(payload: impl Into<Bytes>) -> Self {
        let payload = payload.into();
        let length = payload.len() as i32;
        let mut block = Self::new();
        block.payload = Some(payload);
        block.length = length;
        block
    }

    /// Sets the block content.
    ///
    /// # Arguments
    ///
    /// * `payload` - The bytes received or to be sent.
    /// * `declared_len` - The byte count announced by the frame header.
    ///
    /// # Returns
    ///
    /// An error if a restart block carries fewer than six marker bytes, or if
    /// the declared length exceeds the payload.
    pub fn set_payload(&mut self, payload: Bytes, declared_len: usize) -> Result<()> {
        self.offset = 0;
        if self.is_restart() {
            if payload.len() < MARKER_LENGTH {
                return Err(VfsError::InvalidArgument(format!(
                    "restart marker needs {} bytes, got {}",
                    MARKER_LENGTH,
                    payload.len()
                )));
            }
            let mut markers = [0u8; MARKER_LENGTH];
            markers.copy_from_slice(&payload[..MARKER_LENGTH]);
            self.markers = Some(markers);
            self.payload = Some(payload.slice(..MARKER_LENGTH));
            self.length = MARKER_LENGTH as i32;
            return Ok(());
        }
        if declared_len > payload.len() {
            return Err(VfsError::InvalidArgument(format!(
                "declared length {} exceeds payload of {} bytes",
                declared_len,
                payload.len()
            )));
        }
        self.payload = Some(payload);
        self.length = declared_len as i32;
        Ok(())
    }

    /// The whole payload, including bytes already consumed.
    pub fn payload(&self) -> Option<&Bytes> {
        self.payload.as_ref()
    }

    /// Zero-copy view on the bytes not consumed yet.
    pub fn unread(&self) -> Bytes {
        match &self.payload {
            Some(payload) if self.length > 0 => {
                let end = (self.length as usize).min(payload.len());
                let start = (self.offset.max(0) as usize).min(end);
                payload.slice(start..end)
            }
            _ => Bytes::new(),
        }
    }

    /// Unread byte count: declared length minus the consumed offset.
    pub fn byte_count(&self) -> i32 {
        self.length - self.offset
    }

    pub fn offset(&self) -> i32 {
        self.offset
    }

    /// Marks `n` more bytes as consumed.
    pub fn add_offset(&mut self, n: i32) {
        self.offset += n;
    }

    pub fn set_byte_count(&mut self, length: i32) {
        self.length = length;
    }

    /// Sets the byte count from the two header bytes.
    pub fn set_byte_count_from(&mut self, upper: u8, lower: u8) {
        self.length = ((upper as i32) << 8) | lower as i32;
    }

    pub fn byte_count_upper(&self) -> u8 {
        ((self.length >> 8) & 0xFF) as u8
    }

    pub fn byte_count_lower(&self) -> u8 {
        (self.length & 0xFF) as u8
    }

    /// The six marker bytes, zeros when the block is not a restart block.
    pub fn byte_markers(&self) -> [u8; MARKER_LENGTH] {
        self.markers.unwrap_or([0u8; MARKER_LENGTH])
    }

    pub fn markers(&self) -> Option<&[u8; MARKER_LENGTH]> {
        self.markers.as_ref()
    }

    /// Sets the marker bytes and flags the block as a restart block.
    pub fn set_markers(&mut self, markers: [u8; MARKER_LENGTH]) {
        self.markers = Some(markers);
        self.set_restart(true);
        self.payload = Some(Bytes::copy_from_slice(&markers));
        self.offset = 0;
        self.length = MARKER_LENGTH as i32;
    }

    pub fn descriptor(&self) -> u8 {
        self.descriptor
    }

    /// Stores the byte untouched and decodes the four flags from it.
    pub fn set_descriptor(&mut self, descriptor: u8) {
        self.descriptor = descriptor;
        self.eor = descriptor & EOR != 0;
        self.eof = descriptor & EOF != 0;
        self.error = descriptor & ERROR != 0;
        self.restart = descriptor & RESTART != 0;
    }

    pub fn is_eor(&self) -> bool {
        self.eor
    }

    pub fn is_eof(&self) -> bool {
        self.eof
    }

    pub fn is_error(&self) -> bool {
        self.error
    }

    pub fn is_restart(&self) -> bool {
        self.restart
    }

    pub fn set_eor(&mut self, on: bool) {
        self.eor = on;
        self.descriptor |= EOR;
    }

    pub fn set_eof(&mut self, on: bool) {
        self.eof = on;
        self.descriptor |= EOF;
    }

    pub fn set_error(&mut self, on: bool) {
        self.error = on;
        self.descriptor |= ERROR;
    }

    pub fn set_restart(&mut self, on: bool) {
        self.restart = on;
        self.descriptor |= RESTART;
    }

    /// Releases the payload and resets every field.
    pub fn clear(&mut self) {
        self.payload = None;
        self.markers = None;
        self.offset = 0;
        self.length = -1;
        self.descriptor = 0;
        self.eor = false;
        self.eof = false;
        self.error = false;
        self.restart = false;
    }

    pub fn is_cleared(&self) -> bool {
        self.length == -1
    }
}

impl fmt::Display for DataBlock {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "DataBlock Length:{} Offset:{} Flags:{}{}{}{} Markers:{}",
            self.length,
            self.offset,
            if self.is_eor() { "EOR " } else { "" },
            if self.is_eof() { "EOF " } else { "" },
            if self.is_error() { "ERROR " } else { "" },
            if self.is_restart() { "RESTART " } else { "" },
            to_binary_string(&self.byte_markers(), true)
        )
    }
}

/// Renders bytes as 8-bit binary strings, space separated when `grouped`.
pub fn to_binary_string(bytes: &[u8], grouped: bool) -> String {
    let separator = if grouped { " " } else { "" };
    bytes
        .iter()
        .map(|b| format!("{:08b}", b))
        .collect::<Vec<_>>()
        .join(separator)
}

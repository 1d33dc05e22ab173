//! File header and frame layout
//!
//! ```text
//! file   := header frame*
//! header := magic[4] version:u32le
//! frame  := len:u32le crc:u32le payload[len]
//! ```
//!
//! `crc` is the CRC32 of `payload`. Payloads are capped at
//! [`MAX_FRAME_LEN`] on both the write and the read path, so every frame the
//! backend wrote decodes again.

use crate::error::{StorageError, StorageResult};
use byteorder::{ByteOrder, LittleEndian};

/// Magic bytes at the start of every log file
pub const FILE_MAGIC: [u8; 4] = *b"CHLG";

/// Current file format version
pub const FILE_FORMAT_VERSION: u32 = 1;

/// Size of the file header in bytes
pub const HEADER_SIZE: usize = 8;

/// Size of a frame's length and CRC prefix
pub const FRAME_HEADER_SIZE: usize = 8;

/// Upper bound on a single frame's payload
pub const MAX_FRAME_LEN: usize = 64 * 1024 * 1024;

/// Result of decoding one frame from a buffer
#[derive(Debug, PartialEq, Eq)]
pub enum DecodeOutcome<'a> {
    /// A complete, CRC-checked frame
    Complete {
        /// Frame payload
        payload: &'a [u8],
        /// Bytes consumed, prefix included
        consumed: usize,
    },
    /// The buffer ends before the frame does
    Incomplete,
    /// The frame is whole but its CRC does not match, or its length is absurd
    Corrupt,
}

/// Encode the file header
pub fn encode_header() -> [u8; HEADER_SIZE] {
    let mut buf = [0u8; HEADER_SIZE];
    buf[..4].copy_from_slice(&FILE_MAGIC);
    LittleEndian::write_u32(&mut buf[4..], FILE_FORMAT_VERSION);
    buf
}

/// Validate the file header
pub fn decode_header(bytes: &[u8]) -> StorageResult<()> {
    if bytes.len() < HEADER_SIZE {
        return Err(StorageError::Encoding(format!(
            "file too short for header: {} bytes",
            bytes.len()
        )));
    }
    if bytes[..4] != FILE_MAGIC {
        return Err(StorageError::Encoding("bad file magic".into()));
    }
    let version = LittleEndian::read_u32(&bytes[4..HEADER_SIZE]);
    if version != FILE_FORMAT_VERSION {
        return Err(StorageError::Encoding(format!(
            "unsupported file format version {}",
            version
        )));
    }
    Ok(())
}

/// Wrap a payload in a frame
///
/// Fails with [`StorageError::Encoding`] when the payload exceeds
/// [`MAX_FRAME_LEN`].
pub fn encode_frame(payload: &[u8]) -> StorageResult<Vec<u8>> {
    let len = u32::try_from(payload.len())
        .ok()
        .filter(|len| *len as usize <= MAX_FRAME_LEN)
        .ok_or_else(|| {
            StorageError::Encoding(format!(
                "record of {} bytes exceeds the {} byte frame limit",
                payload.len(),
                MAX_FRAME_LEN
            ))
        })?;
    let mut buf = vec![0u8; FRAME_HEADER_SIZE + payload.len()];
    LittleEndian::write_u32(&mut buf[..4], len);
    LittleEndian::write_u32(&mut buf[4..8], crc32fast::hash(payload));
    buf[FRAME_HEADER_SIZE..].copy_from_slice(payload);
    Ok(buf)
}

/// Decode the frame at the start of `bytes`
pub fn decode_frame(bytes: &[u8]) -> DecodeOutcome<'_> {
    if bytes.len() < FRAME_HEADER_SIZE {
        return DecodeOutcome::Incomplete;
    }
    let len = LittleEndian::read_u32(&bytes[..4]) as usize;
    if len > MAX_FRAME_LEN {
        return DecodeOutcome::Corrupt;
    }
    let crc = LittleEndian::read_u32(&bytes[4..8]);
    let end = FRAME_HEADER_SIZE + len;
    if bytes.len() < end {
        return DecodeOutcome::Incomplete;
    }
    let payload = &bytes[FRAME_HEADER_SIZE..end];
    if crc32fast::hash(payload) != crc {
        return DecodeOutcome::Corrupt;
    }
    DecodeOutcome::Complete {
        payload,
        consumed: end,
    }
}

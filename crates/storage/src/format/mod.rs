//! On-disk byte formats for the commit log file.
//!
//! Serialization of persistent state lives here, apart from the backend
//! that decides when to write and how to replay.
//!
//! # Module Structure
//!
//! - `frame`: file header and length/CRC framing
//! - `record`: the records carried inside frames

pub mod frame;
pub mod record;

pub use frame::{
    decode_frame, decode_header, encode_frame, encode_header, DecodeOutcome, FILE_FORMAT_VERSION,
    FILE_MAGIC, FRAME_HEADER_SIZE, HEADER_SIZE, MAX_FRAME_LEN,
};
pub use record::LogRecord;

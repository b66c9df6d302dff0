// src/error.rs
// Failure modes of the codec. Every variant is per-file: a batch logs it and moves on.

use std::{io, path::PathBuf};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum CodecError {
    /// Input could not be opened, read, or ended early.
    #[error("source unreadable: {0}")]
    SourceUnreadable(#[source] io::Error),

    /// Output could not be created or written.
    #[error("destination unwritable: {0}")]
    DestinationUnwritable(#[source] io::Error),

    #[error("invalid signature {0:02x?} (expected \"BM\")")]
    InvalidSignature([u8; 2]),

    #[error("unsupported depth: {0} bits per pixel (only 24 is supported)")]
    UnsupportedDepth(u16),

    /// Only uncompressed (BI_RGB) pixel data is supported.
    #[error("unsupported compression method {0} (only uncompressed is supported)")]
    UnsupportedCompression(u32),

    /// Header fields are out of range or disagree with each other.
    #[error("invalid geometry ({reason}): width={width}, height={height}")]
    InvalidGeometry { reason: &'static str, width: i32, height: i32 },

    #[error("length record {recorded} exceeds payload capacity {capacity}")]
    InvalidLengthRecord { recorded: u32, capacity: u64 },

    /// Source is larger than a 24-bit container header can describe.
    #[error("input too large for the container format ({0} bytes)")]
    InputTooLarge(u64),

    #[error("destination {0:?} and its .restored fallback both exist (use --force to overwrite)")]
    DestinationExists(PathBuf),

    #[error("verification failed: {0:?} does not decode back to its source")]
    VerificationFailed(PathBuf),
}

pub type Result<T, E = CodecError> = std::result::Result<T, E>;

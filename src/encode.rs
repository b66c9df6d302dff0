// src/encode.rs
// Forward transcoder: byte stream → 24-bit container.

use std::io::{Read, Write};

use blake3::Hasher;

use crate::error::{CodecError, Result};
use crate::geometry::{plan_dimensions, Dimensions, BYTES_PER_PIXEL};
use crate::header::{build_header, ContainerHeader};
use crate::progress::{Progress, ProgressFn};

#[derive(Debug, Clone, Copy, Default)]
pub struct EncodeOptions {
    /// Record the source length in the reserved header fields so decode can trim the
    /// zero padding. Off by default: the baseline format carries no length.
    pub record_length: bool,
}

#[derive(Debug, Clone)]
pub struct EncodeSummary {
    pub dimensions: Dimensions,
    pub header: ContainerHeader,
    pub source_len: u64,
    /// BLAKE3 of the `len` source bytes consumed.
    pub source_hash: [u8; 32],
}

/// Encode `len` bytes from `src` into `dst` as a complete container.
///
/// Rows are written in the order the source is read, left to right, each pixel
/// holding three source bytes in reversed order (`[b0,b1,b2]` → `[b2,b1,b0]`).
/// The last partial pixel and every pixel past the end of the source are zero.
/// `src` must yield at least `len` bytes; anything beyond is ignored.
pub fn encode<R: Read, W: Write>(mut src: R, len: u64, mut dst: W, options: EncodeOptions, progress: ProgressFn<'_>) -> Result<EncodeSummary> {
    let dims = plan_dimensions(len);
    let mut header = build_header(dims)?;
    if options.record_length {
        let recorded = u32::try_from(len).map_err(|_| CodecError::InputTooLarge(len))?;
        header.set_length_record(recorded);
    }
    log::debug!("encode: {} bytes → {}×{} grid, capacity {}", len, dims.width, dims.height, dims.capacity());

    dst.write_all(&header.to_bytes()).map_err(CodecError::DestinationUnwritable)?;

    let row_bytes = dims.row_bytes() as usize;
    let mut row = vec![0u8; dims.row_stride() as usize];
    let mut hasher = Hasher::new();
    let mut consumed = 0u64;
    let mut progress = Progress::new(len, progress);
    progress.update(0);

    for _ in 0..dims.height {
        let take = (len - consumed).min(row_bytes as u64) as usize;
        src.read_exact(&mut row[..take]).map_err(CodecError::SourceUnreadable)?;
        hasher.update(&row[..take]);
        row[take..].fill(0);
        consumed += take as u64;
        swap_channels(&mut row[..row_bytes]);
        dst.write_all(&row).map_err(CodecError::DestinationUnwritable)?;
        progress.update(consumed);
    }
    dst.flush().map_err(CodecError::DestinationUnwritable)?;
    progress.finish();

    Ok(EncodeSummary { dimensions: dims, header, source_len: len, source_hash: *hasher.finalize().as_bytes() })
}

/// Reverse each 3-byte triplet in place. Its own inverse.
pub(crate) fn swap_channels(pixels: &mut [u8]) {
    for px in pixels.chunks_exact_mut(BYTES_PER_PIXEL as usize) { px.swap(0, 2); }
}

// ========================= Tests =========================

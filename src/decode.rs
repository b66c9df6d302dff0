// src/decode.rs
// Inverse transcoder: 24-bit container → original byte stream.

use std::io::{self, Read, Write};

use crate::encode::swap_channels;
use crate::error::{CodecError, Result};
use crate::geometry::Dimensions;
use crate::header::{ContainerHeader, HEADER_LEN};
use crate::progress::{Progress, ProgressFn};

/// Largest slice of a row held in memory at once. A multiple of 3 so no pixel straddles two chunks.
const CHUNK_LEN: usize = 3 * 16 * 1024;

#[derive(Debug, Clone)]
pub struct DecodeSummary {
    pub dimensions: Dimensions,
    pub header: ContainerHeader,
    pub bytes_written: u64,
    /// True when a length record trimmed the output below the grid capacity.
    pub truncated: bool,
}

/// Decode a container from `src` into `dst`.
///
/// Replays the encoder's row order, reversing each triplet back and dropping row
/// padding. Without a length record the output is the full grid capacity
/// (`width * height * 3`), so a source that did not fill the grid comes back with
/// its zero padding attached.
pub fn decode<R: Read, W: Write>(mut src: R, mut dst: W, progress: ProgressFn<'_>) -> Result<DecodeSummary> {
    let mut raw = [0u8; HEADER_LEN];
    src.read_exact(&mut raw).map_err(CodecError::SourceUnreadable)?;
    let header = ContainerHeader::parse(&raw)?;
    let dims = header.dimensions();
    let capacity = dims.capacity();

    let output_len = match header.length_record() {
        Some(recorded) if recorded as u64 > capacity => return Err(CodecError::InvalidLengthRecord { recorded, capacity }),
        Some(recorded) => recorded as u64,
        None => capacity,
    };
    log::debug!("decode: {}×{} grid, capacity {}, writing {} bytes", dims.width, dims.height, capacity, output_len);

    // Skip anything between the header and the pixel data
    let gap = header.offset_data as u64 - HEADER_LEN as u64;
    if gap > 0 {
        let skipped = io::copy(&mut (&mut src).take(gap), &mut io::sink()).map_err(CodecError::SourceUnreadable)?;
        if skipped < gap { return Err(CodecError::SourceUnreadable(io::ErrorKind::UnexpectedEof.into())); }
    }

    // Rows are streamed in whole-pixel chunks; the header decides row length, not the buffer
    let row_bytes = dims.row_bytes();
    let padding = dims.row_padding();
    let mut buf = vec![0u8; row_bytes.min(CHUNK_LEN as u64) as usize];
    let mut written = 0u64;
    let mut progress = Progress::new(output_len, progress);
    progress.update(0);

    for _ in 0..dims.height {
        let mut left = row_bytes;
        while left > 0 {
            let chunk = &mut buf[..left.min(CHUNK_LEN as u64) as usize];
            src.read_exact(chunk).map_err(CodecError::SourceUnreadable)?;
            swap_channels(chunk);
            let keep = (output_len - written).min(chunk.len() as u64) as usize;
            dst.write_all(&chunk[..keep]).map_err(CodecError::DestinationUnwritable)?;
            written += keep as u64;
            left -= chunk.len() as u64;
        }
        if padding > 0 {
            // The final row's padding may be missing at EOF; that is not an error
            io::copy(&mut (&mut src).take(padding), &mut io::sink()).map_err(CodecError::SourceUnreadable)?;
        }
        progress.update(written);
    }
    dst.flush().map_err(CodecError::DestinationUnwritable)?;
    progress.finish();

    Ok(DecodeSummary { dimensions: dims, header, bytes_written: written, truncated: output_len < capacity })
}

// ========================= Tests =========================

// src/geometry.rs
// Pixel grid planning: byte length → near-square 24-bit grid with 4-byte row alignment.

/// Bytes carried by one 24-bit pixel.
pub const BYTES_PER_PIXEL: u64 = 3;
/// Every stored row is padded to a multiple of this many bytes.
pub const ROW_ALIGN: u64 = 4;

/// Grid geometry in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Dimensions {
    pub width: u64,
    pub height: u64,
}

impl Dimensions {
    pub fn new(width: u64, height: u64) -> Self { Self { width, height } }

    /// Pixel bytes in one row, without padding.
    pub fn row_bytes(&self) -> u64 { self.width * BYTES_PER_PIXEL }

    /// Stored bytes in one row, padding included.
    pub fn row_stride(&self) -> u64 { self.row_bytes().div_ceil(ROW_ALIGN) * ROW_ALIGN }

    pub fn row_padding(&self) -> u64 { self.row_stride() - self.row_bytes() }

    pub fn pixel_count(&self) -> u64 { self.width * self.height }

    /// Payload bytes the grid can carry (`width * height * 3`).
    pub fn capacity(&self) -> u64 { self.pixel_count() * BYTES_PER_PIXEL }

    /// Payload bytes on disk, row padding included.
    pub fn image_size(&self) -> u64 { self.height * self.row_stride() }
}

/// Plan the grid for `file_size` bytes.
///
/// `width` starts at `ceil(sqrt(pixels))` and is bumped one column at a time until
/// `width * 3` is a multiple of 4, so rows never need padding. Zero-length input still
/// gets one pixel. The result always satisfies `capacity() >= file_size`.
pub fn plan_dimensions(file_size: u64) -> Dimensions {
    let total_pixels = file_size.div_ceil(BYTES_PER_PIXEL).max(1);
    let mut width = ceil_sqrt(total_pixels);
    while (width * BYTES_PER_PIXEL) % ROW_ALIGN != 0 { width += 1; }
    let height = total_pixels.div_ceil(width);
    Dimensions { width, height }
}

fn ceil_sqrt(n: u64) -> u64 {
    // f64 gets within a step or two; settle exactly with integer checks
    let mut r = (n as f64).sqrt() as u64;
    while r > 0 && r.saturating_mul(r) > n { r -= 1; }
    while r.saturating_mul(r) < n { r += 1; }
    r
}

// ========================= Tests =========================

// src/header.rs
// 54-byte container header (14-byte file header + 40-byte info header), little-endian.
// Read and written field by field at fixed offsets; never via in-memory struct layout.

use crate::error::{CodecError, Result};
use crate::geometry::Dimensions;

pub const SIGNATURE: [u8; 2] = *b"BM";
pub const HEADER_LEN: usize = 54;
const FILE_HEADER_LEN: u64 = 14;
pub const INFO_HEADER_LEN: u32 = 40;
pub const BIT_COUNT: u16 = 24;

// Field offsets
const OFF_FILE_SIZE: usize = 2;
const OFF_RESERVED1: usize = 6;
const OFF_RESERVED2: usize = 8;
const OFF_DATA: usize = 10;
const OFF_INFO_SIZE: usize = 14;
const OFF_WIDTH: usize = 18;
const OFF_HEIGHT: usize = 22;
const OFF_PLANES: usize = 26;
const OFF_BIT_COUNT: usize = 28;
const OFF_COMPRESSION: usize = 30;
const OFF_SIZE_IMAGE: usize = 34;
const OFF_X_PPM: usize = 38;
const OFF_Y_PPM: usize = 42;
const OFF_COLORS_USED: usize = 46;
const OFF_COLORS_IMPORTANT: usize = 50;

/// Every field after the 2-byte signature, in file order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContainerHeader {
    pub file_size: u32,
    pub reserved1: u16,
    pub reserved2: u16,
    pub offset_data: u32,
    pub header_size: u32,
    pub width: i32,
    pub height: i32,
    pub planes: u16,
    pub bit_count: u16,
    pub compression: u32,
    pub size_image: u32,
    pub x_ppm: i32,
    pub y_ppm: i32,
    pub colors_used: u32,
    pub colors_important: u32,
}

/// Header for a grid of `dims`. Fails only when the geometry overflows the i32/u32 fields.
pub fn build_header(dims: Dimensions) -> Result<ContainerHeader> {
    let too_large = || CodecError::InputTooLarge(dims.capacity());
    let width = i32::try_from(dims.width).map_err(|_| too_large())?;
    let height = i32::try_from(dims.height).map_err(|_| too_large())?;
    let size_image = u32::try_from(dims.image_size()).map_err(|_| too_large())?;
    let file_size = size_image.checked_add(HEADER_LEN as u32).ok_or_else(too_large)?;
    Ok(ContainerHeader {
        file_size,
        reserved1: 0,
        reserved2: 0,
        offset_data: HEADER_LEN as u32,
        header_size: INFO_HEADER_LEN,
        width,
        height,
        planes: 1,
        bit_count: BIT_COUNT,
        compression: 0,
        size_image,
        x_ppm: 0,
        y_ppm: 0,
        colors_used: 0,
        colors_important: 0,
    })
}

impl ContainerHeader {
    pub fn to_bytes(&self) -> [u8; HEADER_LEN] {
        let mut b = [0u8; HEADER_LEN];
        b[0..2].copy_from_slice(&SIGNATURE);
        put(&mut b, OFF_FILE_SIZE, &self.file_size.to_le_bytes());
        put(&mut b, OFF_RESERVED1, &self.reserved1.to_le_bytes());
        put(&mut b, OFF_RESERVED2, &self.reserved2.to_le_bytes());
        put(&mut b, OFF_DATA, &self.offset_data.to_le_bytes());
        put(&mut b, OFF_INFO_SIZE, &self.header_size.to_le_bytes());
        put(&mut b, OFF_WIDTH, &self.width.to_le_bytes());
        put(&mut b, OFF_HEIGHT, &self.height.to_le_bytes());
        put(&mut b, OFF_PLANES, &self.planes.to_le_bytes());
        put(&mut b, OFF_BIT_COUNT, &self.bit_count.to_le_bytes());
        put(&mut b, OFF_COMPRESSION, &self.compression.to_le_bytes());
        put(&mut b, OFF_SIZE_IMAGE, &self.size_image.to_le_bytes());
        put(&mut b, OFF_X_PPM, &self.x_ppm.to_le_bytes());
        put(&mut b, OFF_Y_PPM, &self.y_ppm.to_le_bytes());
        put(&mut b, OFF_COLORS_USED, &self.colors_used.to_le_bytes());
        put(&mut b, OFF_COLORS_IMPORTANT, &self.colors_important.to_le_bytes());
        b
    }

    /// Parse and validate: signature first, then depth and compression, then geometry.
    pub fn parse(b: &[u8; HEADER_LEN]) -> Result<Self> {
        let sig = [b[0], b[1]];
        if sig != SIGNATURE { return Err(CodecError::InvalidSignature(sig)); }
        let hdr = ContainerHeader {
            file_size: u32_at(b, OFF_FILE_SIZE),
            reserved1: u16_at(b, OFF_RESERVED1),
            reserved2: u16_at(b, OFF_RESERVED2),
            offset_data: u32_at(b, OFF_DATA),
            header_size: u32_at(b, OFF_INFO_SIZE),
            width: i32_at(b, OFF_WIDTH),
            height: i32_at(b, OFF_HEIGHT),
            planes: u16_at(b, OFF_PLANES),
            bit_count: u16_at(b, OFF_BIT_COUNT),
            compression: u32_at(b, OFF_COMPRESSION),
            size_image: u32_at(b, OFF_SIZE_IMAGE),
            x_ppm: i32_at(b, OFF_X_PPM),
            y_ppm: i32_at(b, OFF_Y_PPM),
            colors_used: u32_at(b, OFF_COLORS_USED),
            colors_important: u32_at(b, OFF_COLORS_IMPORTANT),
        };
        if hdr.bit_count != BIT_COUNT { return Err(CodecError::UnsupportedDepth(hdr.bit_count)); }
        if hdr.compression != 0 { return Err(CodecError::UnsupportedCompression(hdr.compression)); }
        hdr.check_geometry()?;
        Ok(hdr)
    }

    /// Header fields must agree with each other before anything is sized from them.
    /// `size_image` and `file_size` of 0 mean "not filled in" and are not checked.
    fn check_geometry(&self) -> Result<()> {
        let bad = |reason: &'static str| CodecError::InvalidGeometry { reason, width: self.width, height: self.height };
        if self.width <= 0 || self.height <= 0 { return Err(bad("width and height must be positive")); }
        if self.planes != 1 { return Err(bad("planes must be 1")); }
        if self.header_size < INFO_HEADER_LEN || (self.offset_data as u64) < FILE_HEADER_LEN + self.header_size as u64 {
            return Err(bad("pixel data offset points inside the header"));
        }
        let needed = self.dimensions().image_size();
        if needed > u32::MAX as u64 { return Err(bad("pixel data larger than the format can describe")); }
        if self.size_image != 0 && (self.size_image as u64) < needed {
            return Err(bad("size_image smaller than height × row stride"));
        }
        if self.file_size != 0 && (self.file_size as u64) < self.offset_data as u64 + needed {
            return Err(bad("file_size smaller than header plus pixel data"));
        }
        Ok(())
    }

    /// Grid geometry. Only meaningful on a validated header (positive width/height).
    pub fn dimensions(&self) -> Dimensions {
        Dimensions::new(self.width.max(0) as u64, self.height.max(0) as u64)
    }

    /// Original source length, if the encoder recorded one in the reserved fields.
    /// Zero in both fields means "not recorded".
    pub fn length_record(&self) -> Option<u32> {
        let len = (self.reserved2 as u32) << 16 | self.reserved1 as u32;
        (len != 0).then_some(len)
    }

    /// Store `len` across reserved1 (low half) and reserved2 (high half).
    pub fn set_length_record(&mut self, len: u32) {
        self.reserved1 = (len & 0xFFFF) as u16;
        self.reserved2 = (len >> 16) as u16;
    }
}

fn put(b: &mut [u8; HEADER_LEN], off: usize, v: &[u8]) { b[off..off + v.len()].copy_from_slice(v); }
fn u16_at(b: &[u8; HEADER_LEN], off: usize) -> u16 { u16::from_le_bytes([b[off], b[off + 1]]) }
fn u32_at(b: &[u8; HEADER_LEN], off: usize) -> u32 { u32::from_le_bytes([b[off], b[off + 1], b[off + 2], b[off + 3]]) }
fn i32_at(b: &[u8; HEADER_LEN], off: usize) -> i32 { i32::from_le_bytes([b[off], b[off + 1], b[off + 2], b[off + 3]]) }

// ========================= Tests =========================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::plan_dimensions;

    #[test]
    fn header_fields_are_consistent() -> anyhow::Result<()> {
        for size in [0u64, 1, 7, 48, 1000, 123_457] {
            let d = plan_dimensions(size);
            let h = build_header(d)?;
            assert_eq!(h.size_image as u64, d.height * d.row_stride());
            assert_eq!(h.file_size, 54 + h.size_image);
            assert_eq!(h.offset_data, 54);
            assert_eq!(h.header_size, 40);
            assert_eq!((h.planes, h.bit_count, h.compression), (1, 24, 0));
            assert_eq!(h.length_record(), None);
        }
        Ok(())
    }

    #[test]
    fn byte_layout_is_fixed() -> anyhow::Result<()> {
        let h = build_header(Dimensions::new(4, 1))?;
        let b = h.to_bytes();
        assert_eq!(&b[0..2], b"BM");
        assert_eq!(&b[2..6], &66u32.to_le_bytes());
        assert_eq!(&b[6..10], &[0, 0, 0, 0]);
        assert_eq!(&b[10..14], &54u32.to_le_bytes());
        assert_eq!(&b[14..18], &40u32.to_le_bytes());
        assert_eq!(&b[18..22], &4i32.to_le_bytes());
        assert_eq!(&b[22..26], &1i32.to_le_bytes());
        assert_eq!(&b[26..28], &1u16.to_le_bytes());
        assert_eq!(&b[28..30], &24u16.to_le_bytes());
        assert_eq!(&b[34..38], &12u32.to_le_bytes());
        assert!(b[38..54].iter().all(|&x| x == 0));
        assert_eq!(ContainerHeader::parse(&b)?, h);
        Ok(())
    }

    #[test]
    fn bad_signature_is_rejected() -> anyhow::Result<()> {
        let mut b = build_header(Dimensions::new(4, 1))?.to_bytes();
        b[0] = b'P';
        b[1] = b'K';
        assert!(matches!(ContainerHeader::parse(&b), Err(CodecError::InvalidSignature([b'P', b'K']))));
        Ok(())
    }

    #[test]
    fn eight_bit_depth_is_rejected() -> anyhow::Result<()> {
        let mut h = build_header(Dimensions::new(4, 1))?;
        h.bit_count = 8;
        assert!(matches!(ContainerHeader::parse(&h.to_bytes()), Err(CodecError::UnsupportedDepth(8))));
        Ok(())
    }

    #[test]
    fn non_positive_geometry_is_rejected() -> anyhow::Result<()> {
        let mut h = build_header(Dimensions::new(4, 1))?;
        h.height = -1;
        assert!(matches!(ContainerHeader::parse(&h.to_bytes()), Err(CodecError::InvalidGeometry { height: -1, .. })));
        let mut h = build_header(Dimensions::new(4, 1))?;
        h.offset_data = 20;
        assert!(matches!(ContainerHeader::parse(&h.to_bytes()), Err(CodecError::InvalidGeometry { reason: "pixel data offset points inside the header", .. })));
        let mut h = build_header(Dimensions::new(4, 1))?;
        h.planes = 3;
        assert!(matches!(ContainerHeader::parse(&h.to_bytes()), Err(CodecError::InvalidGeometry { reason: "planes must be 1", .. })));
        Ok(())
    }

    #[test]
    fn huge_dimensions_with_tiny_sizes_are_rejected() -> anyhow::Result<()> {
        let mut h = build_header(Dimensions::new(4, 1))?;
        h.width = i32::MAX;
        h.height = i32::MAX;
        assert!(matches!(ContainerHeader::parse(&h.to_bytes()), Err(CodecError::InvalidGeometry { reason: "pixel data larger than the format can describe", .. })));

        // fits the format, but disagrees with the declared sizes (12 payload bytes)
        let mut h = build_header(Dimensions::new(4, 1))?;
        h.width = 1_000_000;
        assert!(matches!(ContainerHeader::parse(&h.to_bytes()), Err(CodecError::InvalidGeometry { reason: "size_image smaller than height × row stride", width: 1_000_000, .. })));
        h.size_image = 3_000_000;
        assert!(matches!(ContainerHeader::parse(&h.to_bytes()), Err(CodecError::InvalidGeometry { reason: "file_size smaller than header plus pixel data", .. })));
        h.file_size = 0;
        h.size_image = 0;
        assert!(ContainerHeader::parse(&h.to_bytes()).is_ok());
        Ok(())
    }

    #[test]
    fn compressed_bitmaps_are_rejected() -> anyhow::Result<()> {
        let mut h = build_header(Dimensions::new(4, 1))?;
        h.compression = 3; // BI_BITFIELDS
        assert!(matches!(ContainerHeader::parse(&h.to_bytes()), Err(CodecError::UnsupportedCompression(3))));
        Ok(())
    }

    #[test]
    fn length_record_spans_both_reserved_fields() -> anyhow::Result<()> {
        let mut h = build_header(plan_dimensions(0x0012_3456))?;
        h.set_length_record(0x0012_3456);
        assert_eq!((h.reserved1, h.reserved2), (0x3456, 0x0012));
        let back = ContainerHeader::parse(&h.to_bytes())?;
        assert_eq!(back.length_record(), Some(0x0012_3456));
        Ok(())
    }

    #[test]
    fn oversized_geometry_is_rejected() {
        let d = plan_dimensions(u32::MAX as u64);
        assert!(matches!(build_header(d), Err(CodecError::InputTooLarge(_))));
    }
}

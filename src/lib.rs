// src/lib.rs
// bmpwrap — any file in, one 24-bit BMP out, and back again.
// The pixels ARE the data: three bytes per pixel, channel order reversed, rows
// padded to 4 bytes, behind a standard 54-byte header.
//
// Pipeline:
//   • plan_dimensions: byte length → near-square grid whose rows need no padding.
//   • build_header:    grid → 54-byte header (explicit little-endian field codec).
//   • encode / decode: stream transcoders, one row at a time.
//   • run_batch:       file naming, collision policy, post-encode verification.
//
// The baseline header has no original-length field, so decode returns the full
// grid capacity (source bytes followed by zero padding). EncodeOptions::record_length
// stores the length in the reserved fields and decode trims to it.

pub mod batch;
pub mod decode;
pub mod encode;
pub mod error;
pub mod geometry;
pub mod header;
pub mod progress;

pub use batch::{run_batch, BatchReport, FileOutcome, FileSource, Mode, Options, PathList, Transcoded};
pub use decode::{decode, DecodeSummary};
pub use encode::{encode, EncodeOptions, EncodeSummary};
pub use error::CodecError;
pub use geometry::{plan_dimensions, Dimensions};
pub use header::{build_header, ContainerHeader};
pub use progress::ProgressFn;

// src/batch.rs
// File-level glue: path naming, collision policy, temp-then-rename writes,
// post-encode verification, and sequential batches where one failure never stops the rest.

use std::{
    ffi::{OsStr, OsString},
    fs,
    io::{self, BufReader, BufWriter, Read, Write},
    path::{Path, PathBuf},
};

use blake3::Hasher;
use tempfile::NamedTempFile;

use crate::decode::{decode, DecodeSummary};
use crate::encode::{encode, EncodeOptions, EncodeSummary};
use crate::error::{CodecError, Result};
use crate::geometry::Dimensions;
use crate::header::SIGNATURE;
use crate::progress::ProgressFn;

/// Suffix appended on encode and stripped on decode.
pub const CONTAINER_SUFFIX: &str = ".bmp";
const RESTORED_SUFFIX: &str = ".restored";
const TMP_SUFFIX: &str = ".tmp";

// ========================= Collaborator =========================

/// Supplies the paths for one invocation (a file picker, argv, a test stub…).
pub trait FileSource {
    fn select(&mut self) -> Vec<PathBuf>;
}

/// A fixed list of paths, handed out once.
#[derive(Debug, Clone, Default)]
pub struct PathList(pub Vec<PathBuf>);

impl FileSource for PathList {
    fn select(&mut self) -> Vec<PathBuf> { std::mem::take(&mut self.0) }
}

// ========================= Options & reports =========================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Encode,
    Decode,
    /// Decode files that look like containers, encode everything else.
    Auto,
}

#[derive(Debug, Clone, Copy)]
pub struct Options {
    /// Store the source length in the header (format extension, see `EncodeOptions`).
    pub exact_length: bool,
    /// Replace existing destinations instead of diverting to `<dest>.restored`.
    pub overwrite: bool,
    /// Re-open each encoded container and check it decodes back to the source.
    pub verify: bool,
}

impl Default for Options {
    fn default() -> Self { Self { exact_length: false, overwrite: false, verify: true } }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction { Encoded, Decoded }

#[derive(Debug, Clone)]
pub struct Transcoded {
    pub direction: Direction,
    pub output: PathBuf,
    pub dimensions: Dimensions,
    /// Source bytes on encode, bytes written on decode.
    pub payload_bytes: u64,
    /// Encode: a length record was stored. Decode: a length record trimmed the output.
    pub exact: bool,
    /// Decode only: `output` already held identical content, so nothing was written.
    pub reused: bool,
}

#[derive(Debug)]
pub struct FileOutcome {
    pub input: PathBuf,
    pub result: Result<Transcoded>,
}

impl FileOutcome {
    pub fn is_ok(&self) -> bool { self.result.is_ok() }
}

#[derive(Debug, Default)]
pub struct BatchReport {
    pub outcomes: Vec<FileOutcome>,
}

impl BatchReport {
    pub fn succeeded(&self) -> usize { self.outcomes.iter().filter(|o| o.is_ok()).count() }
    pub fn failed(&self) -> usize { self.outcomes.len() - self.succeeded() }
    pub fn all_ok(&self) -> bool { self.failed() == 0 }
    pub fn is_empty(&self) -> bool { self.outcomes.is_empty() }
}

// ========================= Naming =========================

/// `<input>.bmp`
pub fn encoded_path(input: &Path) -> PathBuf {
    let mut s: OsString = input.as_os_str().to_os_string();
    s.push(CONTAINER_SUFFIX);
    PathBuf::from(s)
}

fn has_container_suffix(path: &Path) -> bool {
    path.extension() == Some(OsStr::new(&CONTAINER_SUFFIX[1..]))
}

/// Strip a trailing `.bmp` from the file name; otherwise the input path itself.
/// The latter collides with the input, which `resolve_destination` diverts.
/// Works on the raw name, so non-UTF-8 names are stripped too.
pub fn decoded_path(input: &Path) -> PathBuf {
    if has_container_suffix(input) { input.with_extension("") } else { input.to_path_buf() }
}

fn with_suffix(path: &Path, suffix: &str) -> PathBuf {
    let mut s = path.as_os_str().to_os_string();
    s.push(suffix);
    PathBuf::from(s)
}

/// Pick where output for `input` goes. An existing `dest` is only replaced with
/// `overwrite`; otherwise `<dest>.restored` is used, and if that exists too the file is refused.
pub fn resolve_destination(dest: &Path, input: &Path, overwrite: bool) -> Result<PathBuf> {
    let taken = dest.exists() || dest == input;
    if !taken || overwrite { return Ok(dest.to_path_buf()); }
    let alt = with_suffix(dest, RESTORED_SUFFIX);
    if alt.exists() { return Err(CodecError::DestinationExists(dest.to_path_buf())); }
    log::warn!("{:?} already exists; writing {:?} instead", dest, alt);
    Ok(alt)
}

/// Name ends in `.bmp` and the file starts with the container signature.
pub fn looks_like_container(path: &Path) -> bool {
    has_container_suffix(path) && match fs::File::open(path) {
        Ok(mut f) => {
            let mut sig = [0u8; 2];
            f.read_exact(&mut sig).is_ok() && sig == SIGNATURE
        }
        Err(_) => false,
    }
}

// ========================= Single file =========================

/// Run `write` against a fresh `<dest>.XXXXXX.tmp` beside `dest`, then persist it into place.
/// The temp name is unique, so no existing file is ever opened; on failure it is deleted on drop.
fn write_via_temp<T>(dest: &Path, write: impl FnOnce(&mut BufWriter<NamedTempFile>) -> Result<T>) -> Result<T> {
    let dir = match dest.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    let mut prefix = dest.file_name().unwrap_or_default().to_os_string();
    prefix.push(".");
    let tmp = tempfile::Builder::new()
        .prefix(&prefix)
        .suffix(TMP_SUFFIX)
        .tempfile_in(dir)
        .map_err(CodecError::DestinationUnwritable)?;
    let mut out = BufWriter::new(tmp);
    let value = write(&mut out)?;
    let tmp = out.into_inner().map_err(|e| CodecError::DestinationUnwritable(e.into_error()))?;
    tmp.persist(dest).map_err(|e| CodecError::DestinationUnwritable(e.error))?;
    Ok(value)
}

/// Encode the file at `input` into a container at `output`.
pub fn encode_file(input: &Path, output: &Path, options: EncodeOptions, progress: ProgressFn<'_>) -> Result<EncodeSummary> {
    let file = fs::File::open(input).map_err(CodecError::SourceUnreadable)?;
    let len = file.metadata().map_err(CodecError::SourceUnreadable)?.len();
    let src = BufReader::new(file);
    write_via_temp(output, |dst| encode(src, len, dst, options, progress))
}

/// Decode the container at `input` into `output`.
pub fn decode_file(input: &Path, output: &Path, progress: ProgressFn<'_>) -> Result<DecodeSummary> {
    let file = fs::File::open(input).map_err(CodecError::SourceUnreadable)?;
    let src = BufReader::new(file);
    write_via_temp(output, |dst| decode(src, dst, progress))
}

/// Hashes the first `limit` bytes it receives and checks everything after is zero.
struct VerifySink {
    hasher: Hasher,
    limit: u64,
    seen: u64,
    nonzero_tail: bool,
}

impl Write for VerifySink {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let head = (self.limit.saturating_sub(self.seen)).min(buf.len() as u64) as usize;
        self.hasher.update(&buf[..head]);
        self.nonzero_tail |= buf[head..].iter().any(|&b| b != 0);
        self.seen += buf.len() as u64;
        Ok(buf.len())
    }
    fn flush(&mut self) -> io::Result<()> { Ok(()) }
}

/// Re-open `container` and check it decodes to `source_len` bytes hashing to `source_hash`,
/// followed by nothing but zero padding.
pub fn verify_container(container: &Path, source_len: u64, source_hash: &[u8; 32]) -> Result<()> {
    let file = fs::File::open(container).map_err(CodecError::SourceUnreadable)?;
    let mut sink = VerifySink { hasher: Hasher::new(), limit: source_len, seen: 0, nonzero_tail: false };
    decode(BufReader::new(file), &mut sink, None)?;
    let matches = sink.seen >= source_len && !sink.nonzero_tail && sink.hasher.finalize().as_bytes() == source_hash;
    if matches { Ok(()) } else { Err(CodecError::VerificationFailed(container.to_path_buf())) }
}

/// Verify a freshly written container; a container that fails is deleted.
fn verify_or_discard(container: &Path, summary: &EncodeSummary) -> Result<()> {
    let verdict = verify_container(container, summary.source_len, &summary.source_hash);
    if verdict.is_err() {
        if let Err(e) = fs::remove_file(container) {
            log::warn!("could not remove unverified container {:?}: {}", container, e);
        }
    }
    verdict
}

/// BLAKE3 and length of a file, streamed.
fn hash_file(path: &Path) -> io::Result<([u8; 32], u64)> {
    let mut hasher = Hasher::new();
    let len = io::copy(&mut fs::File::open(path)?, &mut hasher)?;
    Ok((*hasher.finalize().as_bytes(), len))
}

/// Decode `container` straight into a hasher and compare with `existing`.
/// `Some` when `existing` already holds exactly the decoded bytes.
fn matching_output(container: &Path, existing: &Path) -> Result<Option<DecodeSummary>> {
    let Ok((have_hash, have_len)) = hash_file(existing) else { return Ok(None) };
    let file = fs::File::open(container).map_err(CodecError::SourceUnreadable)?;
    let mut hasher = Hasher::new();
    let summary = decode(BufReader::new(file), &mut hasher, None)?;
    let same = summary.bytes_written == have_len && *hasher.finalize().as_bytes() == have_hash;
    Ok(same.then_some(summary))
}

fn encode_one(input: &Path, options: &Options, progress: ProgressFn<'_>) -> Result<Transcoded> {
    let dest = resolve_destination(&encoded_path(input), input, options.overwrite)?;
    log::info!("encoding {:?} → {:?}", input, dest);
    let summary = encode_file(input, &dest, EncodeOptions { record_length: options.exact_length }, progress)?;
    if options.verify {
        verify_or_discard(&dest, &summary)?;
        log::debug!("verified {:?}", dest);
    }
    Ok(Transcoded {
        direction: Direction::Encoded,
        output: dest,
        dimensions: summary.dimensions,
        payload_bytes: summary.source_len,
        exact: summary.header.length_record().is_some(),
        reused: false,
    })
}

fn decode_one(input: &Path, options: &Options, progress: ProgressFn<'_>) -> Result<Transcoded> {
    let natural = decoded_path(input);
    if !options.overwrite && natural != input && natural.is_file() {
        if let Some(summary) = matching_output(input, &natural)? {
            log::info!("{:?} already holds the content of {:?}; leaving it as is", natural, input);
            return Ok(Transcoded {
                direction: Direction::Decoded,
                output: natural,
                dimensions: summary.dimensions,
                payload_bytes: summary.bytes_written,
                exact: summary.truncated,
                reused: true,
            });
        }
    }
    let dest = resolve_destination(&natural, input, options.overwrite)?;
    log::info!("decoding {:?} → {:?}", input, dest);
    let summary = decode_file(input, &dest, progress)?;
    if !summary.truncated {
        log::debug!("{:?}: no length record, output keeps the grid's zero padding", input);
    }
    Ok(Transcoded {
        direction: Direction::Decoded,
        output: dest,
        dimensions: summary.dimensions,
        payload_bytes: summary.bytes_written,
        exact: summary.truncated,
        reused: false,
    })
}

// ========================= Batch =========================

fn reborrow<'s>(p: &'s mut ProgressFn<'_>) -> ProgressFn<'s> {
    match p {
        Some(f) => Some(&mut **f),
        None => None,
    }
}

/// Process every path from `source`, one after another. Failures are logged and recorded;
/// they never stop the remaining files. No paths means an empty report, not an error.
pub fn run_batch(mode: Mode, source: &mut dyn FileSource, options: &Options, mut progress: ProgressFn<'_>) -> BatchReport {
    let paths = source.select();
    if paths.is_empty() {
        log::info!("no files selected, nothing to do");
        return BatchReport::default();
    }
    log::info!("processing {} file(s)", paths.len());

    let mut report = BatchReport { outcomes: Vec::with_capacity(paths.len()) };
    for input in paths {
        let decode_it = match mode {
            Mode::Encode => false,
            Mode::Decode => true,
            Mode::Auto => looks_like_container(&input),
        };
        let result = if decode_it {
            decode_one(&input, options, reborrow(&mut progress))
        } else {
            encode_one(&input, options, reborrow(&mut progress))
        };
        if let Err(e) = &result { log::warn!("{:?}: {}", input, e); }
        report.outcomes.push(FileOutcome { input, result });
    }
    report
}

// ========================= Tests =========================

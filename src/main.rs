// src/main.rs
// bmpwrap CLI — disguise files as 24-bit BMPs and restore them.
//
//   bmpwrap [encode|decode] [--exact] [--force] [--no-verify] <path>...
//
// Without a mode, `.bmp` files starting with "BM" are decoded and everything else is encoded.
//   --exact      record the original length so decode is byte-exact (format extension)
//   --force      overwrite existing outputs instead of writing `<name>.restored`
//   --no-verify  skip re-decoding each new container against its source
//
// Logging: RUST_LOG=info|debug for per-file details (default: warn).

use std::{env, ffi::OsString, io::Write, path::PathBuf};

use anyhow::{bail, Result};
use bmpwrap::{batch::Direction, run_batch, Mode, Options, PathList};

macro_rules! step { ($($arg:tt)*) => { eprintln!("▶ {}", format!($($arg)*)); }; }
macro_rules! ok   { ($($arg:tt)*) => { eprintln!("✔ {}", format!($($arg)*)); }; }
macro_rules! fail { ($($arg:tt)*) => { eprintln!("✘ {}", format!($($arg)*)); }; }

const USAGE: &str = "Usage: bmpwrap [encode|decode] [--exact] [--force] [--no-verify] <path>...";

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();
    match real_main() {
        Ok(true) => {}
        Ok(false) => std::process::exit(1),
        Err(e) => {
            fail!("{e:#}");
            std::process::exit(2);
        }
    }
}

fn parse_args(args: impl IntoIterator<Item = OsString>) -> Result<(Mode, Options, Vec<PathBuf>)> {
    let mut mode = Mode::Auto;
    let mut options = Options::default();
    let mut paths = Vec::new();
    for (i, arg) in args.into_iter().enumerate() {
        match arg.to_str() {
            Some("encode") if i == 0 => mode = Mode::Encode,
            Some("decode") if i == 0 => mode = Mode::Decode,
            Some("--exact") => options.exact_length = true,
            Some("--force") => options.overwrite = true,
            Some("--no-verify") => options.verify = false,
            Some("-h" | "--help") => bail!("{USAGE}"),
            Some(flag) if flag.starts_with("--") => bail!("Unknown option {flag}\n{USAGE}"),
            _ => paths.push(PathBuf::from(arg.clone())),
        }
    }
    Ok((mode, options, paths))
}

/// Ok(false) when at least one file failed.
fn real_main() -> Result<bool> {
    let (mode, options, paths) = parse_args(env::args_os().skip(1))?;
    if paths.is_empty() {
        eprintln!("{USAGE}");
        ok!("No files given, nothing to do.");
        return Ok(true);
    }
    step!("Processing {} file(s)…", paths.len());
    if options.exact_length { step!("Recording original lengths in the header (decode will be byte-exact)."); }

    let mut print_progress = |p: u8| {
        eprint!("\rProgress: {p}%");
        if p == 100 { eprintln!(); }
        let _ = std::io::stderr().flush();
    };
    let report = run_batch(mode, &mut PathList(paths), &options, Some(&mut print_progress));

    for outcome in &report.outcomes {
        let name = outcome.input.file_name().unwrap_or_default();
        match &outcome.result {
            Ok(t) => {
                let out = t.output.file_name().unwrap_or_default();
                match t.direction {
                    Direction::Encoded => { ok!("Encoded {:?} → {:?} ({}×{}, {} bytes{})", name, out, t.dimensions.width, t.dimensions.height, t.payload_bytes, if t.exact { ", length recorded" } else { "" }); }
                    Direction::Decoded if t.reused => { ok!("Decoded {:?}: {:?} already identical, left untouched", name, out); }
                    Direction::Decoded if t.exact => { ok!("Decoded {:?} → {:?} ({} bytes, exact)", name, out, t.payload_bytes); }
                    Direction::Decoded => { ok!("Decoded {:?} → {:?} ({} bytes incl. zero padding; no length record)", name, out, t.payload_bytes); }
                }
            }
            Err(e) => { fail!("{:?}: {}", name, e); }
        }
    }

    eprintln!();
    if report.all_ok() {
        ok!("ALL DONE: {} file(s) processed.", report.succeeded());
    } else {
        fail!("{} of {} file(s) failed.", report.failed(), report.outcomes.len());
    }
    Ok(report.all_ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(v: &[&str]) -> Vec<OsString> { v.iter().map(OsString::from).collect() }

    #[test]
    fn mode_and_flags() -> Result<()> {
        let (mode, opts, paths) = parse_args(args(&["decode", "--force", "a.bmp", "--no-verify", "b.bmp"]))?;
        assert_eq!(mode, Mode::Decode);
        assert!(opts.overwrite && !opts.verify && !opts.exact_length);
        assert_eq!(paths, vec![PathBuf::from("a.bmp"), PathBuf::from("b.bmp")]);
        Ok(())
    }

    #[test]
    fn mode_word_only_counts_first() -> Result<()> {
        let (mode, opts, paths) = parse_args(args(&["--exact", "encode"]))?;
        assert_eq!(mode, Mode::Auto);
        assert!(opts.exact_length);
        assert_eq!(paths, vec![PathBuf::from("encode")]);
        Ok(())
    }

    #[test]
    fn unknown_flag_is_an_error() {
        assert!(parse_args(args(&["--bogus", "x"])).is_err());
    }

    #[test]
    fn no_paths_is_not_an_error() -> Result<()> {
        let (_, _, paths) = parse_args(args(&[]))?;
        assert!(paths.is_empty());
        Ok(())
    }
}

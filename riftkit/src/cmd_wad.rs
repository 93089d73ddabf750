use std::fs::File;
use std::io::Cursor;
use std::path::{Path, PathBuf};
use anyhow::{Context, Result};
use memmap2::Mmap;
use riftkit_hashes::HashKind;
use riftkit_wad::{VerifyPolicy, WadEntry, WadExtractor, WadHashMapper, WadReader};
use crate::cli::*;
use crate::utils::HashValuePattern;

pub fn subcommand(name: &'static str) -> Subcommand {
    let arg_wad = || Arg::new("wad")
        .required(true)
        .value_parser(value_parser!(PathBuf))
        .help("WAD file to parse");

    let cmd = parent_command(name)
        .about("Work on WAD archives")
        .subcommand(
            Command::new("list")
            .about("List WAD entries, sorted by name")
            .arg(arg_wad())
            .arg(arg_hashes_dir())
        )
        .subcommand(
            Command::new("extract")
            .about("Extract WAD entries")
            .arg(arg_wad())
            .arg(Arg::new("output")
                .short('o')
                .value_name("dir")
                .value_parser(value_parser!(PathBuf))
                .default_value(".")
                .help("Output directory for extracted files"))
            .arg(Arg::new("unknown")
                .short('u')
                .value_name("subdir")
                .value_parser(value_parser!(PathBuf))
                .help("Output unknown files to the given subdirectory (omit to skip them)"))
            .arg(Arg::new("overwrite")
                .short('f')
                .long("overwrite")
                .action(ArgAction::SetTrue)
                .help("Overwrite destinations that already exist"))
            .arg(Arg::new("verify")
                .long("verify")
                .value_name("mode")
                .value_parser(["off", "accept-zero", "strict"])
                .num_args(0..=1)
                .require_equals(true)
                .default_value("off")
                .default_missing_value("accept-zero")
                .help("Verify SHA-256 prefixes of extracted entries"))
            .arg(arg_hashes_dir())
            .arg(Arg::new("patterns")
                .num_args(0..)
                .help("Hashes or paths of entries to extract, `*` wildcards are supported for paths"))
        )
        ;
    (cmd, handle)
}

fn handle(matches: &ArgMatches) -> CliResult {
    match matches.subcommand() {
        Some(("list", matches)) => {
            let wad_path = matches.get_one::<PathBuf>("wad").unwrap();
            let (mmap, hmapper) = mmap_and_hmapper(wad_path, get_hashes_dir(matches))?;
            let wad = WadReader::new(Cursor::new(&mmap[..]))?;

            let mut lines: Vec<(String, u64)> = wad.entries()
                .iter()
                .map(|e| (hmapper.get(e.path.hash).unwrap_or("?").to_string(), e.path.hash))
                .collect();
            lines.sort();
            for (name, hash) in lines {
                println!("{:016x} {}", hash, name);
            }
            Ok(())
        }
        Some(("extract", matches)) => {
            let wad_path = matches.get_one::<PathBuf>("wad").unwrap();
            let (mmap, hmapper) = mmap_and_hmapper(wad_path, get_hashes_dir(matches))?;
            let mut wad = WadReader::new(Cursor::new(&mmap[..]))?;

            let patterns: Option<Vec<HashValuePattern<u64>>> = matches
                .get_many::<String>("patterns")
                .map(|p| p.map(|v| HashValuePattern::new(v)).collect());
            if let Some(patterns) = patterns {
                // Restrict the extraction by dropping non-matching entries
                let keep: Vec<WadEntry> = wad.entries()
                    .iter()
                    .filter(|e| patterns.iter().any(|pat| pat.is_match(e.path.hash, &hmapper)))
                    .copied()
                    .collect();
                return extract_entries(&mut wad, keep, &hmapper, matches);
            }
            let entries = wad.entries().to_vec();
            extract_entries(&mut wad, entries, &hmapper, matches)
        }
        _ => unreachable!(),
    }
}

fn extract_entries(
    wad: &mut WadReader<Cursor<&[u8]>>,
    entries: Vec<WadEntry>,
    hmapper: &WadHashMapper,
    matches: &ArgMatches,
) -> CliResult {
    let output = matches.get_one::<PathBuf>("output").unwrap();
    let verify = match matches.get_one::<String>("verify").unwrap().as_str() {
        "off" => VerifyPolicy::Off,
        "accept-zero" => VerifyPolicy::AcceptZero,
        "strict" => VerifyPolicy::Strict,
        _ => unreachable!(),
    };

    let extractor = WadExtractor::new(output)
        .with_mapper(hmapper)
        .unknown_dir(matches.get_one::<PathBuf>("unknown").cloned())
        .overwrite(matches.get_flag("overwrite"))
        .verify(verify);

    let mut entries = entries;
    entries.sort_by_key(|e| e.offset);

    let cancel = crate::utils::install_cancel_flag();
    let report = {
        let mut report = riftkit_wad::ExtractReport::default();
        for entry in entries {
            if cancel.load(std::sync::atomic::Ordering::Relaxed) {
                eprintln!("interrupted after {} entries", report.extracted);
                break;
            }
            if let Err(e) = extractor.extract_one(wad, &entry, &mut report) {
                eprintln!("failed to extract {:x}: {}", entry.path, e);
                report.errors.push((entry.path.hash, e));
            }
        }
        report
    };

    println!(
        "extracted: {}, skipped: {}, symlinked: {}, errors: {}",
        report.extracted, report.skipped, report.symlinked, report.errors.len()
    );
    Ok(())
}

/// Map the archive and load the hash mapping matching its path
fn mmap_and_hmapper(wad_path: &Path, hashes_dir: Option<PathBuf>) -> Result<(Mmap, WadHashMapper)> {
    let file = File::open(wad_path)
        .with_context(|| format!("failed to open WAD file {}", wad_path.display()))?;
    let mmap = unsafe { Mmap::map(&file) }
        .with_context(|| format!("failed to map WAD file {}", wad_path.display()))?;

    let mut hmapper = WadHashMapper::new();
    if let Some(dir) = hashes_dir {
        if let Some(kind) = HashKind::from_wad_path(wad_path) {
            let path = dir.join(kind.mapping_path());
            hmapper.load_path(&path)
                .with_context(|| format!("failed to load hash mapping {}", path.display()))?;
        }
    }
    Ok((mmap, hmapper))
}

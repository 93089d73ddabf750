use std::collections::{HashMap, HashSet};
use std::fs::File;
use std::io::Cursor;
use std::path::PathBuf;
use std::sync::atomic::Ordering;
use anyhow::{bail, Context, Result};
use memmap2::Mmap;
use riftkit_hashes::HashKind;
use riftkit_prop::{PropFile, PropHashMappers, PropHashSets};
use riftkit_wad::{WadHashMapper, WadReader};
use crate::cli::*;
use crate::guess_prop_hashes::{PropHashFinder, PropHashGuesser};
use crate::guess_wad_hashes::{ProgressSink, Strategy, WadHashFinder, WadHashGuesser};
use crate::utils::{install_cancel_flag, prop_files_from_dir};

pub fn subcommand(name: &'static str) -> Subcommand {
    let cmd = parent_command(name)
        .about("Discover unknown hashes")
        .subcommand(
            Command::new("guess-wad")
            .about("Guess unknown archive paths from archive content and known paths")
            .arg(Arg::new("wad")
                .required(true)
                .num_args(1..)
                .value_parser(value_parser!(PathBuf))
                .help("WAD files to mine"))
            .arg(arg_hashes_dir().required(true))
            .arg(Arg::new("strategies")
                .short('s')
                .value_name("list")
                .help("Comma-separated strategies to run (default: all)"))
            .arg(Arg::new("nmax")
                .long("nmax")
                .value_name("N")
                .value_parser(value_parser!(u32))
                .help("Maximum value enumerated by the numbers strategy"))
        )
        .subcommand(
            Command::new("guess-prop")
            .about("Guess unknown property hashes from decoded PROP files")
            .arg(Arg::new("dir")
                .required(true)
                .value_parser(value_parser!(PathBuf))
                .help("Directory of `.bin` files to mine"))
            .arg(arg_hashes_dir().required(true))
        )
        ;
    (cmd, handle)
}

fn handle(matches: &ArgMatches) -> CliResult {
    match matches.subcommand() {
        Some(("guess-wad", matches)) => guess_wad(matches),
        Some(("guess-prop", matches)) => guess_prop(matches),
        _ => unreachable!(),
    }
}


/// Print one line per strategy group, overwriting the previous one
struct StderrProgress;

impl ProgressSink for StderrProgress {
    fn on_progress(&mut self, strategy: &str, done: usize, total: usize) {
        if done == total || done % 64 == 0 {
            eprint!("\r{strategy}: {done}/{total}");
            if done == total {
                eprintln!();
            }
        }
    }
}

fn guess_wad(matches: &ArgMatches) -> CliResult {
    let hashes_dir = get_hashes_dir(matches).expect("required arg");
    let cancel = install_cancel_flag();
    let strategies: Vec<Strategy> = match matches.get_one::<String>("strategies") {
        Some(list) => list.split(',')
            .map(|s| s.trim().parse())
            .collect::<Result<_, _>>()
            .map_err(anyhow::Error::msg)?,
        None => Strategy::ALL.to_vec(),
    };

    // Group archives by hash family; each family has its own mapping file
    let mut by_kind: HashMap<HashKind, Vec<PathBuf>> = HashMap::new();
    for path in matches.get_many::<PathBuf>("wad").unwrap() {
        match HashKind::from_wad_path(path) {
            Some(kind) => by_kind.entry(kind).or_default().push(path.clone()),
            None => bail!("not a WAD path: {}", path.display()),
        }
    }

    for (kind, paths) in by_kind {
        let mapping_path = hashes_dir.join(kind.mapping_path());
        let mut known = WadHashMapper::new();
        if mapping_path.is_file() {
            known.load_path(&mapping_path)
                .with_context(|| format!("failed to load hash mapping {}", mapping_path.display()))?;
        }

        // Collect unknown hashes from all archives of this family
        let mut unknown = HashSet::new();
        for path in &paths {
            let file = File::open(path)
                .with_context(|| format!("failed to open WAD file {}", path.display()))?;
            let mmap = unsafe { Mmap::map(&file) }?;
            let wad = WadReader::new(Cursor::new(&mmap[..]))?;
            unknown.extend(wad.entries().iter().map(|e| e.path.hash));
        }

        let mut finder = WadHashFinder::new(known, unknown);
        finder.on_found = |hash, path| println!("{:016x} {}", hash, path);
        let before = finder.unknown_len();
        let mut guesser = WadHashGuesser::new(finder)
            .with_cancel(&cancel)
            .with_progress(Box::new(StderrProgress));
        if let Some(nmax) = matches.get_one::<u32>("nmax") {
            guesser.number_max = *nmax;
        }

        if strategies.contains(&Strategy::Grep) {
            for path in &paths {
                let file = File::open(path)?;
                let mmap = unsafe { Mmap::map(&file) }?;
                let mut wad = WadReader::new(Cursor::new(&mmap[..]))?;
                guesser.grep_wad(&mut wad);
            }
            log::debug!("after grep: {} still unknown", guesser.finder().unknown_len());
        }
        for strategy in &strategies {
            guesser.run(*strategy);
        }

        if cancel.load(Ordering::Relaxed) {
            // Leave the mapping files as they were
            eprintln!("interrupted, discovered names are not saved");
            return Ok(());
        }
        let finder = guesser.into_finder();
        let found = before - finder.unknown_len();
        eprintln!(
            "{}: found {} new paths, {} still unknown",
            kind.mapping_path(), found, finder.unknown_len()
        );
        finder.known.write_path(&mapping_path)
            .with_context(|| format!("failed to save hash mapping {}", mapping_path.display()))?;
    }
    Ok(())
}

fn guess_prop(matches: &ArgMatches) -> CliResult {
    let hashes_dir = get_hashes_dir(matches).expect("required arg");
    let cancel = install_cancel_flag();
    let root = matches.get_one::<PathBuf>("dir").unwrap();

    let mut hmappers = PropHashMappers::default();
    if let Err(e) = hmappers.load_dirpath(&hashes_dir) {
        log::warn!("incomplete hash mappings in {}: {}", hashes_dir.display(), e);
    }

    // Gather every hash referenced by the files, drop the known ones
    let mut hashes = PropHashSets::default();
    for path in prop_files_from_dir(root) {
        let prop = match PropFile::from_path(&path) {
            Ok(prop) => prop,
            Err(e) => {
                log::debug!("skipping {}: {}", path.display(), e);
                continue;
            }
        };
        for entry in &prop.entries {
            entry.gather_prop_hashes(&mut hashes);
        }
    }
    for kind in riftkit_hashes::fnv::PropNameKind::VARIANTS {
        let known = hmappers.get(kind);
        hashes.get_mut(kind).retain(|h| !known.is_known(*h));
    }
    hashes.path_value.retain(|h| !hmappers.path_value.is_known(*h));

    let finder = PropHashFinder::new(hashes, hmappers)
        .on_found(|hash, name| println!("{:08x} {}", hash, name));
    let before = finder.unknown_len();

    let mut guesser = PropHashGuesser::new(finder)
        .with_cancel(&cancel)
        .with_default_hooks();
    if !guesser.guess_dir(root) {
        eprintln!("interrupted, discovered names are not saved");
        return Ok(());
    }
    log::debug!("hooks done: {} still unknown", guesser.finder().unknown_len());

    let finder = guesser.into_finder();
    let found = before - finder.unknown_len();
    eprintln!("found {} new names, {} still unknown", found, finder.unknown_len());
    finder.hmappers.write_dirpath(&hashes_dir)
        .with_context(|| format!("failed to save hash mappings to {}", hashes_dir.display()))?;
    Ok(())
}

use std::fs::File;
use std::io;
use std::path::PathBuf;
use anyhow::{Context, Result};
use riftkit_prop::{
    prop_hash_from_str,
    EntryPath,
    PropEntriesSerializer,
    PropHashMappers,
    PropScanner,
    TagMapper,
    TypeName,
};
use crate::cli::*;
use crate::utils::{
    build_entry_serializer,
    prop_files_from_dir,
};

pub fn subcommand(name: &'static str) -> Subcommand {
    let cmd = parent_command(name)
        .about("Work on PROP files")
        .subcommand(
            Command::new("dump")
            .about("Dump a PROP file as plain text or JSON")
            .arg(Arg::new("input")
                .value_name("bin")
                .required(true)
                .num_args(1..)
                .value_parser(value_parser!(PathBuf))
                .help("`.bin` files or directories to dump (recursively for directories)"))
            .arg(arg_hashes_dir())
            .arg(Arg::new("patch-version")
                .short('V')
                .value_name("version")
                .help("Patch version the files originate from (`X.Y`), selects the wire tag numbering"))
            .arg(Arg::new("json")
                .short('j')
                .action(ArgAction::SetTrue)
                .help("Dump as JSON (one object per file)"))
            .arg(Arg::new("entry-type")
                .short('e')
                .value_name("type")
                .help("Dump only entries with the given type"))
        )
        ;
    (cmd, handle)
}

fn handle(matches: &ArgMatches) -> CliResult {
    match matches.subcommand() {
        Some(("dump", matches)) => {
            let hmappers = match get_hashes_dir(matches) {
                Some(dir) => PropHashMappers::from_dirpath(&dir)
                    .with_context(|| format!("failed to load hash mappers from {}", dir.display()))?,
                _ => PropHashMappers::default(),
            };
            let tags = match matches.get_one::<String>("patch-version") {
                Some(s) => parse_tag_mapper(s)?,
                None => TagMapper::latest(),
            };

            let mut writer = io::BufWriter::new(io::stdout());
            let mut serializer = build_entry_serializer(&mut writer, &hmappers, matches.get_flag("json"))?;
            let filter: Box<dyn Fn(EntryPath, TypeName) -> bool> = match matches.get_one::<String>("entry-type") {
                Some(s) => {
                    let ctype: TypeName = prop_hash_from_str(s).into();
                    Box::new(move |_, t| t == ctype)
                }
                None => Box::new(|_, _| true),
            };

            for path in matches.get_many::<PathBuf>("input").unwrap() {
                if path.is_dir() {
                    for path in prop_files_from_dir(path) {
                        serialize_prop_path(&path, tags, &mut *serializer, &filter)?;
                    }
                } else {
                    serialize_prop_path(path, tags, &mut *serializer, &filter)?;
                }
            }

            serializer.end()?;
            Ok(())
        }
        _ => unreachable!(),
    }
}

/// Parse a `-V` value: `X.Y` patch version or raw revision number
fn parse_tag_mapper(s: &str) -> Result<TagMapper> {
    if let Some((major, minor)) = s.split_once('.') {
        let major = major.parse().with_context(|| format!("invalid patch version: {s}"))?;
        let minor = minor.parse().with_context(|| format!("invalid patch version: {s}"))?;
        Ok(TagMapper::for_patch(major, minor))
    } else {
        let version = s.parse().with_context(|| format!("invalid patch version: {s}"))?;
        Ok(TagMapper::for_version(version))
    }
}

/// Serialize filtered entries from a PROP file path
fn serialize_prop_path<F: Fn(EntryPath, TypeName) -> bool>(
    path: &PathBuf,
    tags: TagMapper,
    serializer: &mut dyn PropEntriesSerializer,
    filter: F,
) -> Result<()> {
    let file = File::open(path).with_context(|| format!("failed to open {}", path.display()))?;
    let scanner = PropScanner::with_tags(io::BufReader::new(file), tags)?;
    scanner.filter_parse(filter).try_for_each(|entry| -> Result<()> {
        serializer.write_entry(&entry?)?;
        Ok(())
    })
}

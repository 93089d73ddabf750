use std::path::PathBuf;
use anyhow::Context;
use riftkit_rst::{Rst, RstHashMapper};
use crate::cli::*;

pub fn subcommand(name: &'static str) -> Subcommand {
    let arg_rst = || Arg::new("rst")
        .required(true)
        .value_parser(value_parser!(PathBuf))
        .help("RST file to parse");

    let cmd = parent_command(name)
        .about("Work on RST string tables")
        .subcommand(
            Command::new("dump")
            .about("Dump all entries of an RST file")
            .arg(arg_rst())
            .arg(arg_hashes_dir())
        )
        .subcommand(
            Command::new("get")
            .about("Get values for given keys")
            .arg(arg_rst())
            .arg(Arg::new("keys")
                .required(true)
                .num_args(1..)
                .help("Keys to look up, as strings or hex hashes"))
        )
        ;
    (cmd, handle)
}

fn handle(matches: &ArgMatches) -> CliResult {
    match matches.subcommand() {
        Some(("dump", matches)) => {
            let path = matches.get_one::<PathBuf>("rst").unwrap();
            let rst = Rst::open(path)
                .with_context(|| format!("failed to open RST file {}", path.display()))?;

            let hmapper: RstHashMapper = match get_hashes_dir(matches) {
                Some(dir) => {
                    let path = dir.join(riftkit_hashes::HashKind::Rst.mapping_path());
                    RstHashMapper::from_path(&path)
                        .with_context(|| format!("failed to load hash mapping {}", path.display()))?
                }
                None => RstHashMapper::new(),
            };

            let mut entries: Vec<(u64, String)> = rst.iter()
                .map(|(hash, value)| (hash, value.into_owned()))
                .collect();
            entries.sort();
            for (hash, value) in entries {
                println!("{} {:?}", hmapper.seek(hash), value);
            }
            Ok(())
        }
        Some(("get", matches)) => {
            let path = matches.get_one::<PathBuf>("rst").unwrap();
            let rst = Rst::open(path)
                .with_context(|| format!("failed to open RST file {}", path.display()))?;

            for key in matches.get_many::<String>("keys").unwrap() {
                // Hex input is taken as a key hash, anything else as a key
                let value = match key.strip_prefix("0x")
                    .and_then(|h| u64::from_str_radix(h, 16).ok()) {
                    Some(hash) => rst.get(hash),
                    None => rst.get(key.as_str()),
                };
                match value {
                    Some(value) => println!("{}", value),
                    None => println!("?"),
                }
            }
            Ok(())
        }
        _ => unreachable!(),
    }
}

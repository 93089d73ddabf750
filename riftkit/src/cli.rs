//! Helpers for building clap commands
use std::path::PathBuf;
pub use clap::{Arg, ArgAction, ArgMatches, Command, value_parser};

pub type CliResult = Result<(), anyhow::Error>;
pub type Subcommand = (Command, fn(&ArgMatches) -> CliResult);

pub fn parent_command(name: &'static str) -> Command {
    Command::new(name)
        .arg_required_else_help(true)
        .subcommand_required(true)
        .after_help(
            "RIFTKIT_HASHES_DIR is used as a fallback to find hash files.\n\
             It should point to a directory with `hashes.*.txt` files."
        )
}

pub fn arg_hashes_dir() -> Arg {
    Arg::new("hashes")
        .short('H')
        .env("RIFTKIT_HASHES_DIR")
        .value_name("dir")
        .value_parser(value_parser!(PathBuf))
        .help("Directory with lists of known hashes")
}

/// Get the hashes directory from the `hashes` arg or the environment
pub fn get_hashes_dir(matches: &ArgMatches) -> Option<PathBuf> {
    matches.get_one::<PathBuf>("hashes").cloned()
}

//! riftkit toolbox CLI
use std::collections::HashMap;
use std::process::ExitCode;

mod cli;
mod utils;
mod cmd_bin;
mod cmd_hashes;
mod cmd_rst;
mod cmd_wad;
mod guess_prop_hashes;
mod guess_wad_hashes;

use cli::*;

struct Cli {
    command: Command,
    handlers: HashMap<&'static str, fn(&ArgMatches) -> CliResult>,
}

impl Cli {
    fn new() -> Self {
        Self {
            command: parent_command("riftkit").about("Toolbox to read, extract and reverse game asset formats"),
            handlers: Default::default(),
        }
    }

    /// Register a subcommand
    fn register(self, name: &'static str, source: fn(&'static str) -> Subcommand) -> Self {
        let Self { command, mut handlers } = self;
        let (subcmd, handler) = source(name);
        handlers.insert(name, handler);
        Self {
            command: command.subcommand(subcmd),
            handlers,
        }
    }

    fn process(self) -> CliResult {
        let Self { command, handlers } = self;
        let matches = command.get_matches();
        let (name, submatches) = matches.subcommand().expect("subcommand is required");
        let handler = handlers.get(name).expect("registered handler");
        handler(submatches)
    }
}

/// Exit code from the first recognizable error in the chain
///
/// 2 is usage (left to clap), 3 is a format error, 4 an I/O error.
fn exit_code(err: &anyhow::Error) -> u8 {
    for cause in err.chain() {
        if cause.downcast_ref::<std::io::Error>().is_some() {
            return 4;
        }
        if let Some(e) = cause.downcast_ref::<riftkit_wad::WadError>() {
            return match e {
                riftkit_wad::WadError::Io(_) => 4,
                _ => 3,
            };
        }
        if let Some(e) = cause.downcast_ref::<riftkit_prop::PropError>() {
            return match e {
                riftkit_prop::PropError::Io(_) => 4,
                _ => 3,
            };
        }
        if let Some(e) = cause.downcast_ref::<riftkit_rst::RstError>() {
            return match e {
                riftkit_rst::RstError::Io(_) => 4,
                _ => 3,
            };
        }
        if let Some(e) = cause.downcast_ref::<riftkit_hashes::HashError>() {
            return match e {
                riftkit_hashes::HashError::Io(_) => 4,
                _ => 3,
            };
        }
    }
    1
}

fn main() -> ExitCode {
    env_logger::init();

    let result = Cli::new()
        .register("bin", cmd_bin::subcommand)
        .register("hashes", cmd_hashes::subcommand)
        .register("rst", cmd_rst::subcommand)
        .register("wad", cmd_wad::subcommand)
        .process();

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("error: {:#}", err);
            ExitCode::from(exit_code(&err))
        }
    }
}

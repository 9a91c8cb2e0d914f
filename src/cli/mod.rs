// Command-line surface
//
// One positional argument, the rendezvous name. Anything else that makes
// the invocation unusable ends in the usage text and a non-zero exit,
// before any socket or advertisement exists.

use clap::error::ErrorKind;
use clap::{CommandFactory, Parser};
use std::ffi::OsString;
use std::path::PathBuf;

use crate::rendezvous::RendezvousName;

/// Pipe stdin/stdout to the other instance started with the same name on
/// this network.
#[derive(Parser, Debug, Clone)]
#[command(name = "lanpipe", author, version, about, long_about = None)]
pub struct Args {
    /// Rendezvous name shared with the peer (at least 2 characters)
    pub name: String,

    /// Configuration file (default: ~/.lanpipe/config.toml)
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// More logging on stderr (-v info, -vv debug)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,
}

/// Result of interpreting the command line.
#[derive(Debug)]
pub enum Invocation {
    /// Valid arguments; go ahead.
    Run { args: Args, name: RendezvousName },
    /// `--help` / `--version`: print and exit successfully.
    Info(clap::Error),
    /// Unusable invocation: print usage and exit non-zero.
    Usage,
}

/// Parse `argv` (including the program name).
pub fn parse<I, T>(argv: I) -> Invocation
where
    I: IntoIterator<Item = T>,
    T: Into<OsString> + Clone,
{
    let args = match Args::try_parse_from(argv) {
        Ok(args) => args,
        Err(e) if matches!(e.kind(), ErrorKind::DisplayHelp | ErrorKind::DisplayVersion) => {
            return Invocation::Info(e);
        }
        Err(_) => return Invocation::Usage,
    };

    match RendezvousName::parse(&args.name) {
        Ok(name) => Invocation::Run { args, name },
        Err(_) => Invocation::Usage,
    }
}

/// Usage line, e.g. `Usage: lanpipe [OPTIONS] <NAME>`.
pub fn usage() -> String {
    Args::command().render_usage().to_string()
}

/*
 * args.rs
 *
 * Clap derive for the portshim binary. One subcommand per wrapped
 * primitive worth poking at from a shell.
 *
 * Epochs may be negative, so those positionals accept leading dashes.
 */

use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(
    name = "portshim",
    version,
    about = "Poke at the portable file, memory and time primitives",
    long_about = "Run one wrapped primitive and print what it returned.\n\n\
                  Failures are reported through tracing (stderr) and the\n\
                  command exits with status 1.\n\n\
                  Examples:\n\
                    portshim stat Cargo.toml\n\
                    portshim gmtime 1000000000 --json\n\
                    portshim alloc 4096 4096 16\n\
                    portshim strerror 2",
    after_help = "Exit status:\n\
                  0 on success\n\
                  1 if the wrapped operation failed\n\
                  2 on a bad command line\n\n\
                  Set PORTSHIM_DEBUG=1 to trace every wrapped call."
)]
pub struct Args {
    /// Trace every wrapped call to stderr.
    ///
    /// Same as PORTSHIM_DEBUG=1.
    #[arg(long = "trace", global = true)]
    pub trace: bool,

    /// Suppress reports and error messages.
    ///
    /// The exit status still reflects failure.
    #[arg(short = 'q', long = "quiet", global = true, conflicts_with = "trace")]
    pub quiet: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, PartialEq, Eq)]
pub enum Command {
    /// Show size, type, permissions and timestamps of a path.
    Stat {
        #[arg(value_name = "PATH")]
        path: PathBuf,

        /// Print a JSON object instead of text.
        #[arg(long = "json")]
        json: bool,
    },

    /// Print the current epoch time and its local rendering.
    Time,

    /// Break an epoch timestamp down as UTC.
    Gmtime {
        #[arg(value_name = "EPOCH", allow_negative_numbers = true)]
        epoch: i64,

        #[arg(long = "json")]
        json: bool,
    },

    /// Break an epoch timestamp down in the local zone.
    Localtime {
        #[arg(value_name = "EPOCH", allow_negative_numbers = true)]
        epoch: i64,

        #[arg(long = "json")]
        json: bool,
    },

    /// Print the message for an errno value.
    Strerror {
        #[arg(value_name = "ERRNO", allow_negative_numbers = true)]
        errno: i32,
    },

    /// Run the overflow-checked allocator on 2 or 3 factors.
    Alloc {
        #[arg(value_name = "FACTOR", num_args = 2..=3, required = true)]
        factors: Vec<usize>,
    },

    /// Copy files to stdout through the stream wrappers.
    Cat {
        #[arg(value_name = "PATH", required = true)]
        paths: Vec<PathBuf>,
    },
}

impl Args {
    #[must_use]
    pub fn parse_args() -> Self {
        Self::parse()
    }
}

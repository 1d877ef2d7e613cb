//! CLI binary for `edit_validator`.
//!
//! This binary is a thin wrapper that reads stdin and delegates to the library.

use std::io::{self, Read};
use std::process::ExitCode;

use clap::Parser;
use edit_validator::cli::{context_unavailable, run, Cli, CliContext};
use edit_validator::signals::watch_signals;
use edit_validator::CancelToken;

fn main() -> ExitCode {
    let cli = Cli::parse();

    // Only read stdin for commands that need it (avoids blocking on terminal)
    let stdin = if cli.command.needs_stdin() { read_stdin() } else { String::new() };

    let cancel = CancelToken::new();
    if let Err(e) = watch_signals(cancel.clone()) {
        eprintln!("edit-validator: warning: signal handling unavailable: {e}");
    }

    let output = match CliContext::from_env(cancel) {
        Ok(ctx) => run(cli.command, &stdin, &ctx),
        Err(e) => context_unavailable(&cli.command, &e),
    };
    for msg in output.stdout {
        println!("{msg}");
    }
    for msg in output.stderr {
        eprintln!("{msg}");
    }
    output.exit_code
}

fn read_stdin() -> String {
    let mut input = String::new();
    if let Err(e) = io::stdin().read_to_string(&mut input) {
        eprintln!("Error reading stdin: {e}");
    }
    input
}

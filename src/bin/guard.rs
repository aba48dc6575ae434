//! One-shot guard CLI.
//!
//! `guard --check` exits 0 when no lock marker exists and 3 when one does.
//! `guard --lock` writes the marker. Run `--check` before the guarded step and
//! `--lock` only after it succeeded.
//!
//! Exit codes: 0 ok, 1 usage, 2 could not write the marker, 3 locked.

use std::path::PathBuf;
use std::process;

use chrono::Utc;
use clap::error::ErrorKind;
use clap::{ArgGroup, Parser};
use rss_digest::guard::{
    OneShotGuard, DEFAULT_LOCK_PATH, EXIT_FAILURE, EXIT_OK, EXIT_USAGE,
};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Allow a workflow to run only once
#[derive(Parser, Debug)]
#[command(name = "guard", version, about, long_about = None)]
#[command(group(ArgGroup::new("mode").args(["check", "lock"])))]
struct Cli {
    /// Exit 3 if the lock marker exists, 0 otherwise
    #[arg(long)]
    check: bool,

    /// Write the lock marker with the current UTC time
    #[arg(long)]
    lock: bool,

    /// Lock marker location
    #[arg(long, default_value = DEFAULT_LOCK_PATH, value_hint = clap::ValueHint::FilePath)]
    lock_path: PathBuf,
}

fn enable_tracing() {
    // stdout belongs to the guard messages; logs go to stderr.
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().compact().with_writer(std::io::stderr))
        .init();
}

fn main() {
    let _ = dotenvy::dotenv();
    enable_tracing();

    // Every argument error, including `--check --lock`, is a usage error.
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) if matches!(e.kind(), ErrorKind::DisplayHelp | ErrorKind::DisplayVersion) => e.exit(),
        Err(e) => {
            let _ = e.print();
            process::exit(EXIT_USAGE);
        }
    };
    let guard = OneShotGuard::new(cli.lock_path);

    if cli.check {
        let state = guard.state();
        println!("{}", state.message(guard.path()));
        process::exit(state.exit_code());
    }

    if cli.lock {
        match guard.lock(Utc::now()) {
            Ok(_) => {
                println!("[OK] Locked -> {}", guard.path().display());
                process::exit(EXIT_OK);
            }
            Err(e) => {
                tracing::error!(target: "guard", error = ?e, "lock failed");
                println!("[ERROR] Could not write {}: {e:#}", guard.path().display());
                process::exit(EXIT_FAILURE);
            }
        }
    }

    println!("Usage: guard --check | --lock");
    process::exit(EXIT_USAGE);
}

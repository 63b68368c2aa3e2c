/*
 * Copyright © 2026 Volodymyr Kadzhaia
 * Copyright © 2026 Pieter Bonte
 * KU Leuven — Stream Intelligence Lab, Belgium
 *
 * This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this file,
 * you can obtain one at https://mozilla.org/MPL/2.0/.
 */

use clap::{Parser, Subcommand};
use quadstore::storage::file_io::FileIo;
use quadstore::{MemoryStore, StoreConfig, StoreError};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

#[derive(Parser)]
#[command(
    name = "quadstore-cli",
    version = "0.1.0",
    author = "Volodymyr Kadzhaia <vkadzhaia@gmail.com>",
    author = "Pieter Bonte <pieter.bonte@kuleuven.be>",
    about = "Inspect a quadstore data directory",
    long_about = "quadstore CLI - opens the snapshot stored in a data directory and prints statistics or its statements in N-Quads style."
)]
struct Args {
    #[arg(short, long, help = "Directory holding memorystore.data", value_name = "DIR")]
    data_dir: PathBuf,

    #[arg(long, help = "Include inferred statements", default_value_t = false)]
    inferred: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Statement, context and namespace counts
    Stats,
    /// Every statement, one per line
    Dump,
}

/// Opens the store in `data_dir` without creating anything on disk.
fn open_existing(data_dir: &Path) -> quadstore::Result<MemoryStore> {
    let io = FileIo::new(data_dir);
    if !io.exists() {
        return Err(StoreError::InvalidArgument(format!(
            "no data file at {}",
            io.data_file().display()
        )));
    }
    // Sync only at shutdown, and there is nothing to write back
    MemoryStore::open(StoreConfig::persistent(data_dir).with_sync_delay(-1))
}

fn run(args: &Args) -> quadstore::Result<()> {
    let store = open_existing(&args.data_dir)?;
    let con = store.connection()?;

    match args.command {
        Command::Stats => {
            let explicit = con.size(&[])?;
            let total = con.get_statements(None, None, None, true, &[])?.count();
            println!("statements: {}", explicit);
            println!("inferred:   {}", total - explicit);
            println!("contexts:   {}", con.context_ids()?.len());
            println!("namespaces: {}", con.namespaces()?.len());
        }
        Command::Dump => {
            for (prefix, name) in con.namespaces()? {
                println!("@prefix {}: <{}> .", prefix, name);
            }
            for st in con.get_statements(None, None, None, args.inferred, &[])? {
                println!("{}", st?);
            }
        }
    }
    Ok(())
}

fn main() -> ExitCode {
    let args = Args::parse();
    match run(&args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_data_file_is_not_created() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("no-such-store");
        let err = open_existing(&target).unwrap_err();
        assert!(matches!(err, StoreError::InvalidArgument(_)));
        assert!(!target.exists());
    }

    #[test]
    fn test_opens_existing_snapshot() {
        let dir = tempfile::tempdir().unwrap();
        drop(MemoryStore::open(StoreConfig::persistent(dir.path())).unwrap());
        let store = open_existing(dir.path()).unwrap();
        assert_eq!(store.connection().unwrap().size(&[]).unwrap(), 0);
    }
}

//-
// Copyright (c) 2024, Jason Lingle
//
// This file is part of Mimegraph.
//
// Mimegraph is free software: you can  redistribute it and/or modify it under
// the terms of the GNU General Public  License as published by the Free
// Software Foundation, either version 3 of the License, or (at your option)
// any later version.
//
// Mimegraph is distributed in the hope  that it will be useful, but WITHOUT
// ANY WARRANTY; without even the  implied warranty of MERCHANTABILITY or
// FITNESS FOR A PARTICULAR PURPOSE. See  the GNU General Public License for
// more details.
//
// You should have received a copy of the GNU General Public License along with
// Mimegraph. If not, see <http://www.gnu.org/licenses/>.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use structopt::StructOpt;

use crate::store::Address;
use crate::support::sysexits::*;
use crate::support::system_config::SystemConfig;

#[derive(StructOpt)]
#[structopt(max_term_width = 80)]
struct Options {
    /// The directory containing `mimegraph.toml`, `logging.toml`, and (by
    /// default) the blob store.
    #[structopt(long, parse(from_os_str), default_value = ".")]
    root: PathBuf,

    #[structopt(subcommand)]
    command: Command,
}

#[derive(StructOpt)]
pub(super) enum Command {
    /// Load messages and print an outline of their structure.
    ///
    /// Each address must be that of the root record of a message. Records in
    /// any layout revision can be read.
    Get {
        #[structopt(required = true)]
        addresses: Vec<Address>,
    },
    /// Rewrite messages in the current record layout.
    ///
    /// For each address, prints the old and new address of the message. A
    /// message already in the current layout keeps its address. Old records
    /// are never removed.
    Migrate {
        #[structopt(required = true)]
        addresses: Vec<Address>,
    },
    /// Write a raw blob to standard output.
    Cat { address: Address },
}

pub fn main() {
    // Clap exits with status 1 instead of EX_USAGE if we use the more concise
    // API
    let options = Options::from_clap(&match Options::clap().get_matches_safe()
    {
        Ok(matches) => matches,
        Err(
            e @ clap::Error {
                kind: clap::ErrorKind::HelpDisplayed,
                ..
            },
        )
        | Err(
            e @ clap::Error {
                kind: clap::ErrorKind::VersionDisplayed,
                ..
            },
        ) => {
            println!("{}", e.message);
            return;
        }
        Err(e) => {
            eprintln!("{}", e.message);
            EX_USAGE.exit()
        }
    });

    let system_config = load_system_config(&options.root);
    init_log(&options.root);

    let store_path = options.root.join(&system_config.store.path);
    if let Err(exit) =
        super::commands::run(&system_config, store_path, options.command)
    {
        exit.exit();
    }
}

fn load_system_config(root: &Path) -> SystemConfig {
    let system_config_path = root.join("mimegraph.toml");
    let system_config_toml = match fs::read(&system_config_path) {
        Ok(data) => data,
        Err(e) if io::ErrorKind::NotFound == e.kind() => {
            return SystemConfig::default()
        }
        Err(e) => {
            eprintln!(
                "Error reading '{}': {}",
                system_config_path.display(),
                e
            );
            EX_CONFIG.exit()
        }
    };

    match toml::from_slice(&system_config_toml) {
        Ok(config) => config,
        Err(e) => {
            eprintln!(
                "Error in config file at '{}': {}",
                system_config_path.display(),
                e
            );
            EX_CONFIG.exit()
        }
    }
}

fn init_log(root: &Path) {
    let log_config_file = root.join("logging.toml");
    if log_config_file.is_file() {
        if let Err(e) = log4rs::init_file(
            &log_config_file,
            log4rs::file::Deserializers::new(),
        ) {
            eprintln!(
                "Failed to initialise logging from '{}': {}",
                log_config_file.display(),
                e
            );
            EX_CONFIG.exit();
        }
    } else {
        crate::init_simple_log();
    }
}

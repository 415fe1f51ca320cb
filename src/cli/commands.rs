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

use std::io::{self, Write};
use std::path::PathBuf;

use log::error;

use super::main::Command;
use crate::codec::{self, Decoder};
use crate::mime::{Body, MailPart};
use crate::store::{Address, BlobStore, FileStore, StoreError};
use crate::support::error::Error;
use crate::support::sysexits::*;
use crate::support::system_config::SystemConfig;

pub(super) fn run(
    config: &SystemConfig,
    store_path: PathBuf,
    command: Command,
) -> Result<(), Sysexit> {
    if !store_path.is_dir() {
        eprintln!("'{}' seems to be missing", store_path.display());
        return Err(EX_CONFIG);
    }

    let store = FileStore::new(store_path);
    match command {
        Command::Get { addresses } => get(config, &store, &addresses),
        Command::Migrate { addresses } => migrate(config, &store, &addresses),
        Command::Cat { address } => cat(&store, &address),
    }
}

/// Runs `f` on each address, carrying on past failures. The exit code is
/// that of the last failure.
fn for_each_address(
    addresses: &[Address],
    mut f: impl FnMut(&Address) -> Result<(), Error>,
) -> Result<(), Sysexit> {
    let mut result = Ok(());
    for address in addresses {
        if let Err(e) = f(address) {
            error!("{}: {}", address, e);
            result = Err(Sysexit::for_error(&e));
        }
    }
    result
}

fn get(
    config: &SystemConfig,
    store: &impl BlobStore,
    addresses: &[Address],
) -> Result<(), Sysexit> {
    let decoder = Decoder::new(store).with_config(config.codec);
    let stdout = io::stdout();
    let mut stdout = stdout.lock();

    for_each_address(addresses, |address| {
        let message = decoder.decode_message(address)?;
        if writeln!(stdout, "{}", address)
            .and_then(|_| outline(&mut stdout, &message, true, 1))
            .is_err()
        {
            // Nowhere left to report it
            EX_IOERR.exit();
        }
        Ok(())
    })
}

fn outline(
    out: &mut impl Write,
    part: &MailPart,
    is_message: bool,
    depth: usize,
) -> io::Result<()> {
    write!(
        out,
        "{:indent$}{} {}",
        "",
        if is_message { "message" } else { "part" },
        part.content_type,
        indent = 2 * depth
    )?;
    if let Some(ref subject) = part.subject {
        write!(out, " {:?}", subject)?;
    }
    if let Some(ref sender) = part.sender {
        write!(out, " from {}", sender.address)?;
    }
    if let Some(ref time) = part.time {
        write!(out, " at {}", time.to_rfc3339())?;
    }

    match part.body {
        Body::Leaf(ref data) => writeln!(out, ", {} bytes", data.len()),
        Body::DeliveryStatus(ref ds) => {
            writeln!(out, ", {} recipients", ds.recipients.len())
        }
        Body::Multipart(ref multipart) => {
            writeln!(out)?;
            for child in &multipart.parts {
                outline(out, child, false, depth + 1)?;
            }
            Ok(())
        }
        Body::SubMessage(ref message) => {
            writeln!(out)?;
            outline(out, message, true, depth + 1)
        }
    }
}

fn migrate(
    config: &SystemConfig,
    store: &impl BlobStore,
    addresses: &[Address],
) -> Result<(), Sysexit> {
    for_each_address(addresses, |address| {
        let migrated = codec::migrate(store, address, config.codec)?;
        println!("{} -> {}", address, migrated);
        Ok(())
    })
}

fn cat(store: &impl BlobStore, address: &Address) -> Result<(), Sysexit> {
    let data = match store.fetch(address) {
        Ok(data) => data,
        Err(e @ StoreError::NotFound(..)) => {
            eprintln!("{}", e);
            return Err(EX_NOINPUT);
        }
        Err(e) => {
            eprintln!("Error reading {}: {}", address, e);
            return Err(EX_IOERR);
        }
    };

    let stdout = io::stdout();
    let mut stdout = stdout.lock();
    if let Err(e) = stdout.write_all(&data).and_then(|_| stdout.flush()) {
        eprintln!("Error writing to standard output: {}", e);
        return Err(EX_IOERR);
    }

    Ok(())
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::mime::{ContentType, Multipart};

    #[test]
    fn outline_shows_structure() {
        let mut inner = MailPart::new(
            ContentType::text_plain(),
            Body::Leaf(b"hello".to_vec()),
        );
        inner.subject = Some("Hi".to_owned());
        let message = MailPart::new(
            ContentType::new("multipart", "mixed"),
            Body::Multipart(Multipart {
                parts: vec![
                    MailPart::new(
                        ContentType::new("image", "png"),
                        Body::Leaf(vec![0; 3]),
                    ),
                    MailPart::new(
                        ContentType::message_rfc822(),
                        Body::SubMessage(Box::new(inner)),
                    ),
                ],
                ..Multipart::default()
            }),
        );

        let mut out = Vec::new();
        outline(&mut out, &message, true, 0).unwrap();
        assert_eq!(
            "message multipart/mixed\n  \
             part image/png, 3 bytes\n  \
             part message/rfc822\n    \
             message text/plain \"Hi\", 5 bytes\n",
            String::from_utf8(out).unwrap()
        );
    }
}

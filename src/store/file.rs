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
use std::path::PathBuf;

use log::debug;

use super::{Address, BlobStore, StoreError};
use crate::support::file_ops::{self, IgnoreKinds};

/// A `BlobStore` backed by a directory tree.
///
/// Each blob lives at `<root>/<algorithm>/<first octet>/<remaining octets>`,
/// all in lowercase hex. Blobs are staged under `<root>/tmp` and moved into
/// place atomically, so a reader never observes a partial blob, and an
/// existing blob is never overwritten.
pub struct FileStore {
    root: PathBuf,
}

impl FileStore {
    pub fn new(root: PathBuf) -> Self {
        Self { root }
    }

    /// Computes the path of `address` relative to the store root.
    pub fn canonical_path(address: &Address) -> PathBuf {
        let hex = address.digest_hex();
        let split = hex.len().min(2);
        let mut path = PathBuf::from(address.algorithm());
        path.push(&hex[..split]);
        path.push(&hex[split..]);
        path
    }

    fn tmp(&self) -> PathBuf {
        self.root.join("tmp")
    }
}

impl BlobStore for FileStore {
    fn put(&self, data: &[u8]) -> Result<Address, StoreError> {
        let address = Address::of(data);
        let dst = self.root.join(Self::canonical_path(&address));
        if dst.is_file() {
            return Ok(address);
        }

        if let Some(parent) = dst.parent() {
            fs::create_dir_all(parent)?;
        }
        let tmp = self.tmp();
        fs::create_dir_all(&tmp)?;

        // Another writer racing us for the same content is harmless; it
        // produced the same bytes.
        file_ops::spit_noclobber(&tmp, &dst, data).ignore_already_exists()?;
        debug!("Stored blob {} ({} bytes)", address, data.len());
        Ok(address)
    }

    fn fetch(&self, address: &Address) -> Result<Vec<u8>, StoreError> {
        match fs::read(self.root.join(Self::canonical_path(address))) {
            Ok(data) => Ok(data),
            Err(e) if io::ErrorKind::NotFound == e.kind() => {
                Err(StoreError::NotFound(address.clone()))
            }
            Err(e) => Err(e.into()),
        }
    }
}

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

//! The boundary to the content-addressed blob store.
//!
//! The codec only ever talks to a store through `BlobStore`. Both operations
//! are assumed to be idempotent and content-addressed: putting the same bytes
//! twice yields the same address and stores nothing new. The codec performs
//! no retries; a store implementation (or its caller) may.

use std::convert::TryFrom;
use std::fmt::{self, Write as _};
use std::io;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tiny_keccak::{Hasher, Sha3};

pub mod file;
pub mod memory;

pub use self::file::FileStore;
pub use self::memory::MemoryStore;

/// The algorithm tag of every address this crate computes itself.
pub const ADDRESS_ALGORITHM: &str = "sha3-256";

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Blob {0} not found")]
    NotFound(Address),
    #[error(transparent)]
    Io(#[from] io::Error),
    #[error(transparent)]
    Other(Box<dyn std::error::Error + Send + Sync>),
}

/// An immutable blob store keyed by content digest.
pub trait BlobStore: Send + Sync {
    /// Stores `data`, returning its address.
    ///
    /// If the content is already present, this has no effect beyond
    /// returning the address.
    fn put(&self, data: &[u8]) -> Result<Address, StoreError>;

    /// Retrieves the content previously stored under `address`.
    ///
    /// A bogus or expired address yields `StoreError::NotFound`.
    fn fetch(&self, address: &Address) -> Result<Vec<u8>, StoreError>;
}

impl<S: BlobStore + ?Sized> BlobStore for &S {
    fn put(&self, data: &[u8]) -> Result<Address, StoreError> {
        (**self).put(data)
    }

    fn fetch(&self, address: &Address) -> Result<Vec<u8>, StoreError> {
        (**self).fetch(address)
    }
}

/// The content address of a blob, of the form `<algorithm>-<hex digest>`.
///
/// Addresses produced by this crate always use SHA3-256. Addresses using
/// other algorithms (for example `sha224-...` or `sha1-...` references found
/// in records written by other tools) can be parsed and fetched, but are
/// never produced.
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Address(String);

impl Address {
    /// Computes the address of `data`.
    pub fn of(data: &[u8]) -> Self {
        let mut sha3 = Sha3::v256();
        sha3.update(data);
        let mut hash = [0u8; 32];
        sha3.finalize(&mut hash);

        let mut s =
            String::with_capacity(ADDRESS_ALGORITHM.len() + 1 + 2 * hash.len());
        s.push_str(ADDRESS_ALGORITHM);
        s.push('-');
        for &b in &hash {
            let _ = write!(s, "{:02x}", b);
        }

        Address(s)
    }

    pub fn algorithm(&self) -> &str {
        self.split().0
    }

    /// The digest in lowercase hexadecimal.
    pub fn digest_hex(&self) -> &str {
        self.split().1
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    fn split(&self) -> (&str, &str) {
        // Validated on construction
        self.0.rsplit_once('-').unwrap_or(("", &self.0))
    }

    /// Returns whether `data` hashes to this address.
    ///
    /// Always false for algorithms this crate does not compute.
    pub fn matches(&self, data: &[u8]) -> bool {
        ADDRESS_ALGORITHM == self.algorithm() && *self == Address::of(data)
    }
}

impl FromStr for Address {
    type Err = AddressParseError;

    fn from_str(s: &str) -> Result<Self, AddressParseError> {
        let (algorithm, digest) =
            s.rsplit_once('-').ok_or(AddressParseError)?;

        let valid_algorithm = !algorithm.is_empty()
            && algorithm.bytes().all(|b| {
                b.is_ascii_lowercase() || b.is_ascii_digit() || b == b'-'
            });
        let valid_digest = !digest.is_empty()
            && 0 == digest.len() % 2
            && digest
                .bytes()
                .all(|b| b.is_ascii_digit() || (b'a'..=b'f').contains(&b));

        if valid_algorithm && valid_digest {
            Ok(Address(s.to_owned()))
        } else {
            Err(AddressParseError)
        }
    }
}

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
#[error("Invalid content address")]
pub struct AddressParseError;

impl TryFrom<String> for Address {
    type Error = AddressParseError;

    fn try_from(s: String) -> Result<Self, AddressParseError> {
        s.parse()
    }
}

impl From<Address> for String {
    fn from(address: Address) -> String {
        address.0
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl fmt::Debug for Address {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "Address({})", self.0)
    }
}

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

//! Reassembly of chunked `bytes` schema blobs.
//!
//! Prototype records point their leaf bodies at a small JSON document
//! describing the content as a sequence of ranges:
//!
//! ```text
//! {"camliVersion": 1,
//!  "camliType": "bytes",
//!  "parts": [
//!   {"blobRef": "sha3-256-...", "size": 1024},
//!   {"bytesRef": "sha3-256-...", "size": 512, "offset": 16}
//!  ]}
//! ```
//!
//! `blobRef` names a raw chunk and `bytesRef` another document of the same
//! kind. `offset` skips into the referenced content and `size` is the length
//! taken from it. A range with neither reference is `size` zero bytes.

use log::debug;
use serde::Deserialize;

use crate::store::{Address, BlobStore};
use crate::support::error::{Error, PathElement, ResultContext};
use crate::support::interrupt::Interrupt;

/// The largest body that will be reassembled.
pub const MAX_CHUNKED_SIZE: usize = 1 << 30;

#[derive(Deserialize, Debug)]
struct BytesSchema {
    #[serde(rename = "camliType")]
    camli_type: String,
    #[serde(default)]
    parts: Vec<BytesPart>,
}

#[derive(Deserialize, Debug)]
struct BytesPart {
    #[serde(rename = "blobRef")]
    blob_ref: Option<Address>,
    #[serde(rename = "bytesRef")]
    bytes_ref: Option<Address>,
    size: u64,
    #[serde(default)]
    offset: u64,
}

/// Reads the full content described by the `bytes` (or `file`) schema blob at
/// `address`.
///
/// At most `max_depth` levels of `bytesRef` indirection are followed, and the
/// result may be no larger than `MAX_CHUNKED_SIZE`. `interrupt` is checked
/// before each schema blob is read.
pub fn read_chunked(
    store: &(impl BlobStore + ?Sized),
    address: &Address,
    max_depth: u32,
    interrupt: &Interrupt,
) -> Result<Vec<u8>, Error> {
    let mut out = Vec::new();
    append_chunked(store, address, max_depth, interrupt, &mut out)
        .at(PathElement::Record(address.clone()))?;
    debug!("Reassembled {} bytes from {}", out.len(), address);
    Ok(out)
}

fn append_chunked(
    store: &(impl BlobStore + ?Sized),
    address: &Address,
    depth_left: u32,
    interrupt: &Interrupt,
    out: &mut Vec<u8>,
) -> Result<(), Error> {
    interrupt.check()?;
    let schema: BytesSchema = serde_json::from_slice(&store.fetch(address)?)?;
    if "bytes" != schema.camli_type && "file" != schema.camli_type {
        return Err(Error::Malformed("not a bytes schema blob"));
    }

    for part in schema.parts {
        let size = usize_of(part.size)?;
        let offset = usize_of(part.offset)?;

        match (part.blob_ref, part.bytes_ref) {
            (Some(_), Some(_)) => {
                return Err(Error::Malformed(
                    "bytes range with two references",
                ));
            }

            (None, None) => {
                let len = grown_len(out, size)?;
                out.resize(len, 0);
            }

            (Some(blob), None) => {
                let data = store
                    .fetch(&blob)
                    .map_err(Error::from)
                    .at(PathElement::Record(blob.clone()))?;
                let range = slice_range(&data, offset, size)?;
                grown_len(out, range.len())?;
                out.extend_from_slice(range);
            }

            (None, Some(nested)) => {
                if 0 == depth_left {
                    return Err(Error::Malformed("bytes schema nested too deep"));
                }

                let mut data = Vec::new();
                append_chunked(
                    store,
                    &nested,
                    depth_left - 1,
                    interrupt,
                    &mut data,
                )
                .at(PathElement::Record(nested.clone()))?;
                let range = slice_range(&data, offset, size)?;
                grown_len(out, range.len())?;
                out.extend_from_slice(range);
            }
        }
    }

    Ok(())
}

fn usize_of(n: u64) -> Result<usize, Error> {
    use std::convert::TryFrom;
    usize::try_from(n).map_err(|_| Error::Malformed("bytes range too large"))
}

fn grown_len(out: &[u8], additional: usize) -> Result<usize, Error> {
    out.len()
        .checked_add(additional)
        .filter(|&len| len <= MAX_CHUNKED_SIZE)
        .ok_or(Error::Malformed("bytes schema content too large"))
}

fn slice_range(data: &[u8], offset: usize, size: usize) -> Result<&[u8], Error> {
    offset
        .checked_add(size)
        .and_then(|end| data.get(offset..end))
        .ok_or(Error::Malformed("bytes range exceeds its chunk"))
}

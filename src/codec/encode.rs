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

use log::debug;
use rayon::prelude::*;

use super::BodyKind;
use crate::mime::{Body, MailPart};
use crate::schema::{LeafBody, Record, RecordBody, RecordKind, SchemaVersion};
use crate::store::{Address, BlobStore};
use crate::support::chronox;
use crate::support::error::{Error, PathElement, ResultContext};
use crate::support::interrupt::Interrupt;
use crate::support::system_config::CodecConfig;

/// Writes `MailPart` trees into a `BlobStore`.
///
/// The whole tree is checked before anything is written, so a tree the codec
/// cannot represent leaves the store untouched. Failures after that point
/// (store errors or cancellation) may leave some blobs behind, but never a
/// record referring to a missing blob.
pub struct Encoder<'a, S: ?Sized> {
    store: &'a S,
    config: CodecConfig,
    interrupt: Interrupt,
}

impl<'a, S: BlobStore + ?Sized> Encoder<'a, S> {
    pub fn new(store: &'a S) -> Self {
        Encoder {
            store,
            config: CodecConfig::default(),
            interrupt: Interrupt::new(),
        }
    }

    pub fn with_config(mut self, config: CodecConfig) -> Self {
        self.config = config;
        self
    }

    pub fn with_interrupt(mut self, interrupt: Interrupt) -> Self {
        self.interrupt = interrupt;
        self
    }

    /// Stores `message` as a top-level message, returning the address of its
    /// root record.
    pub fn encode_message(&self, message: &MailPart) -> Result<Address, Error> {
        self.encode(message, RecordKind::Message)
    }

    /// Stores `part` as an embedded part, returning the address of its
    /// record.
    pub fn encode_part(&self, part: &MailPart) -> Result<Address, Error> {
        self.encode(part, RecordKind::Part)
    }

    fn encode(
        &self,
        part: &MailPart,
        kind: RecordKind,
    ) -> Result<Address, Error> {
        check(part, 0, self.config.max_depth)?;
        self.put(part, kind)
    }

    fn put(&self, part: &MailPart, kind: RecordKind) -> Result<Address, Error> {
        self.interrupt.check()?;

        let body = match part.body {
            Body::Multipart(ref multipart) => RecordBody::Subparts {
                parts: self.put_children(&multipart.parts)?,
                preamble: multipart.preamble.clone(),
                postamble: multipart.postamble.clone(),
            },
            Body::SubMessage(ref message) => RecordBody::SubMessage(
                self.put(message, RecordKind::Message)
                    .at(PathElement::SubMessage)?,
            ),
            Body::DeliveryStatus(ref ds) => {
                RecordBody::DeliveryStatus(ds.clone())
            }
            Body::Leaf(ref data) => {
                RecordBody::Leaf(LeafBody::Blob(self.store.put(data)?))
            }
        };

        let record = project(part, kind, body);
        let address = self.store.put(&record.to_canonical_bytes()?)?;
        debug!("Wrote {} {} ({})", kind, address, part.content_type);
        Ok(address)
    }

    fn put_children(&self, parts: &[MailPart]) -> Result<Vec<Address>, Error> {
        let put_child = |(ix, part): (usize, &MailPart)| {
            self.put(part, RecordKind::Part).at(PathElement::Subpart(ix))
        };

        if self.config.parallel_subparts && parts.len() > 1 {
            parts.par_iter().enumerate().map(put_child).collect()
        } else {
            parts.iter().enumerate().map(put_child).collect()
        }
    }
}

/// Verifies that every part in the tree rooted at `part` can be encoded.
fn check(part: &MailPart, depth: u32, max_depth: u32) -> Result<(), Error> {
    if depth > max_depth {
        return Err(Error::Malformed("parts nested too deep"));
    }

    if part.content_type.major.is_empty() || part.content_type.minor.is_empty()
    {
        return Err(Error::Malformed("part without content type"));
    }

    if BodyKind::for_type(&part.content_type)? != BodyKind::of_body(&part.body)
    {
        return Err(Error::Malformed("body does not match content type"));
    }

    if let Some(ref time) = part.time {
        if !chronox::is_representable(time) {
            return Err(Error::Malformed("time cannot be stored"));
        }
    }

    match part.body {
        Body::Multipart(ref multipart) => {
            for (ix, child) in multipart.parts.iter().enumerate() {
                check(child, depth + 1, max_depth)
                    .at(PathElement::Subpart(ix))?;
            }
        }
        Body::SubMessage(ref message) => {
            check(message, depth + 1, max_depth).at(PathElement::SubMessage)?;
        }
        Body::DeliveryStatus(..) | Body::Leaf(..) => (),
    }

    Ok(())
}

/// Builds the record for `part`, whose body is already stored as `body`.
fn project(part: &MailPart, kind: RecordKind, body: RecordBody) -> Record {
    let non_empty =
        |s: &Option<String>| s.as_ref().filter(|s| !s.is_empty()).cloned();

    Record {
        kind,
        version: SchemaVersion::CURRENT,
        content_type: part.content_type.clone(),
        disposition: part.disposition.clone(),
        header: part.header.clone(),
        time: part.time,
        charset: if "text" == part.content_type.major {
            non_empty(&part.charset)
        } else {
            None
        },
        subject: non_empty(&part.subject),
        sender: part.sender.clone(),
        recipients: part.recipients.clone(),
        message_id: non_empty(&part.message_id),
        in_reply_to: non_empty(&part.in_reply_to),
        references: part.references.clone(),
        body,
    }
}

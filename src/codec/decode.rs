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

use log::{debug, warn};
use rayon::prelude::*;

use super::BodyKind;
use crate::mime::{Body, ContentType, MailPart, Multipart};
use crate::schema::{
    bytes, LeafBody, Record, RecordBody, RecordKind, SchemaVersion,
};
use crate::store::{Address, BlobStore};
use crate::support::error::{Error, PathElement, ResultContext};
use crate::support::interrupt::Interrupt;
use crate::support::system_config::CodecConfig;

/// Reads `MailPart` trees out of a `BlobStore`.
///
/// Records in any layout revision are accepted. Failures are wrapped in
/// `Error::Context` layers locating the offending record within the tree.
pub struct Decoder<'a, S: ?Sized> {
    store: &'a S,
    config: CodecConfig,
    interrupt: Interrupt,
}

impl<'a, S: BlobStore + ?Sized> Decoder<'a, S> {
    pub fn new(store: &'a S) -> Self {
        Decoder {
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

    /// Loads the message whose root record is at `address`.
    pub fn decode_message(&self, address: &Address) -> Result<MailPart, Error> {
        self.get(address, RecordKind::Message, &ContentType::text_plain(), 0)
    }

    /// Loads the embedded part at `address`.
    ///
    /// `default_type` is the content type assumed if the record does not
    /// declare one, which depends on the part's parent; see
    /// `ContentType::child_default`.
    pub fn decode_part(
        &self,
        address: &Address,
        default_type: &ContentType,
    ) -> Result<MailPart, Error> {
        self.get(address, RecordKind::Part, default_type, 0)
    }

    fn get(
        &self,
        address: &Address,
        expected: RecordKind,
        default_type: &ContentType,
        depth: u32,
    ) -> Result<MailPart, Error> {
        self.get_impl(address, expected, default_type, depth)
            .at(PathElement::Record(address.clone()))
    }

    fn get_impl(
        &self,
        address: &Address,
        expected: RecordKind,
        default_type: &ContentType,
        depth: u32,
    ) -> Result<MailPart, Error> {
        self.interrupt.check()?;
        if depth > self.config.max_depth {
            return Err(Error::Malformed("parts nested too deep"));
        }

        let record = Record::parse(&self.store.fetch(address)?)?;
        if expected != record.kind {
            return Err(Error::Malformed("unexpected record type"));
        }
        if SchemaVersion::CURRENT == record.version {
            debug!("Read {} {}", record.kind, address);
        } else {
            warn!(
                "{} {} uses legacy layout {:?}",
                record.kind, address, record.version
            );
        }

        let content_type = record.effective_content_type(default_type);
        if BodyKind::for_type(&content_type)? != BodyKind::of_record(&record.body)
        {
            return Err(Error::Malformed("body does not match content type"));
        }

        let body = match record.body {
            RecordBody::Subparts {
                parts,
                preamble,
                postamble,
            } => Body::Multipart(Multipart {
                parts: self.get_children(
                    &parts,
                    &content_type.child_default(),
                    depth,
                )?,
                preamble,
                postamble,
            }),

            RecordBody::SubMessage(message) => Body::SubMessage(Box::new(
                self.get(
                    &message,
                    RecordKind::Message,
                    &ContentType::text_plain(),
                    depth + 1,
                )
                .at(PathElement::SubMessage)?,
            )),

            RecordBody::DeliveryStatus(ds) => Body::DeliveryStatus(ds),

            RecordBody::Leaf(LeafBody::Blob(blob)) => Body::Leaf(
                self.store
                    .fetch(&blob)
                    .map_err(Error::from)
                    .at(PathElement::Record(blob.clone()))?,
            ),

            RecordBody::Leaf(LeafBody::File(file)) => Body::Leaf(
                bytes::read_chunked(
                    self.store,
                    &file,
                    self.config.max_depth,
                    &self.interrupt,
                )?,
            ),

            RecordBody::Leaf(LeafBody::Inline(data)) => Body::Leaf(data),
        };

        Ok(MailPart {
            header: record.header,
            content_type,
            disposition: record.disposition,
            time: record.time,
            charset: record.charset,
            subject: record.subject,
            sender: record.sender,
            recipients: record.recipients,
            message_id: record.message_id,
            in_reply_to: record.in_reply_to,
            references: record.references,
            body,
        })
    }

    fn get_children(
        &self,
        parts: &[Address],
        default_type: &ContentType,
        depth: u32,
    ) -> Result<Vec<MailPart>, Error> {
        let get_child = |(ix, address): (usize, &Address)| {
            self.get(address, RecordKind::Part, default_type, depth + 1)
                .at(PathElement::Subpart(ix))
        };

        if self.config.parallel_subparts && parts.len() > 1 {
            parts.par_iter().enumerate().map(get_child).collect()
        } else {
            parts.iter().enumerate().map(get_child).collect()
        }
    }
}

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

//! The stored form of a single MIME part.
//!
//! Each part of a message is stored as one *record*, a small JSON document
//! which carries the part's metadata and exactly one body field:
//!
//! - `subparts`: for `multipart/*`, the addresses of the child records, in
//!   order.
//! - `submessage`: for `message/rfc822` and `message/news`, the address of
//!   the nested message's record.
//! - `delivery_status`: for `message/delivery-status`, the report itself.
//! - `body`: for everything else, the address of a raw blob holding the
//!   content.
//!
//! The record of a whole message has `camliType` `mime-message`; every other
//! record has `mime-part`.
//!
//! Records never change once written. Over time the layout has gone through
//! three revisions (see `SchemaVersion`); only the current one is ever
//! written, but all three can be read. Reading is a pure function of the
//! record's bytes: the revision is inferred from the version tag and from
//! which fields are present.

use std::fmt;

use crate::mime::{Address as MailAddress, *};
use crate::store::Address;
use crate::support::error::Error;

pub mod bytes;
mod canonical;
mod shape;

pub use self::canonical::FIELD_ORDER;

/// A revision of the record layout.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub enum SchemaVersion {
    /// Records without a version tag.
    ///
    /// The header may be a nested object, delivery reports live under the
    /// hyphenated `delivery-status` key, and leaf bodies point to a chunked
    /// `bytes` schema blob rather than to the content itself.
    Prototype,
    /// Version tags `1.0.x`.
    ///
    /// Flat header list; leaf bodies point to the raw content. Writers of this
    /// revision still sometimes used the hyphenated delivery status key.
    V1_0,
    /// Version tags `1.1.x`; the current revision.
    ///
    /// Adds preamble, postamble, and the message identifier fields, and only
    /// accepts the underscored `delivery_status` key.
    V1_1,
}

impl SchemaVersion {
    pub const CURRENT: Self = SchemaVersion::V1_1;

    /// The tag written into records of this revision.
    pub fn tag(self) -> Option<&'static str> {
        match self {
            SchemaVersion::Prototype => None,
            SchemaVersion::V1_0 => Some("1.0.1"),
            SchemaVersion::V1_1 => Some("1.1.0"),
        }
    }

    /// Determines the revision of a record from its version tag.
    pub fn detect(tag: Option<&str>) -> Result<Self, Error> {
        let tag = match tag {
            None | Some("") => return Ok(SchemaVersion::Prototype),
            Some(tag) => tag,
        };

        let mut it = tag.split('.');
        match (it.next(), it.next()) {
            (Some("1"), Some("0")) => Ok(SchemaVersion::V1_0),
            (Some("1"), Some("1")) => Ok(SchemaVersion::V1_1),
            _ => Err(Error::Malformed("unknown schema version")),
        }
    }
}

/// Whether a record is the root of a message or an embedded part.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RecordKind {
    Message,
    Part,
}

impl RecordKind {
    pub fn camli_type(self) -> &'static str {
        match self {
            RecordKind::Message => "mime-message",
            RecordKind::Part => "mime-part",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "mime-message" => Some(RecordKind::Message),
            "mime-part" => Some(RecordKind::Part),
            _ => None,
        }
    }
}

impl fmt::Display for RecordKind {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.camli_type())
    }
}

/// Where the content of a leaf part lives.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum LeafBody {
    /// A raw blob holding exactly the content. The only form ever written.
    Blob(Address),
    /// A chunked `bytes` schema blob; see `schema::bytes`.
    File(Address),
    /// The content itself, embedded in the record.
    Inline(Vec<u8>),
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RecordBody {
    Subparts {
        parts: Vec<Address>,
        preamble: Vec<u8>,
        postamble: Vec<u8>,
    },
    SubMessage(Address),
    DeliveryStatus(DeliveryStatus),
    Leaf(LeafBody),
}

/// The in-memory form of one record.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Record {
    pub kind: RecordKind,
    pub version: SchemaVersion,
    /// The declared content type.
    ///
    /// An empty `major` means the record did not declare one, and the
    /// reader must fall back to the default its parent implies. Parameters
    /// are kept either way.
    pub content_type: ContentType,
    pub disposition: Disposition,
    pub header: Vec<Field>,
    pub time: Option<chrono::DateTime<chrono::FixedOffset>>,
    pub charset: Option<String>,
    pub subject: Option<String>,
    pub sender: Option<MailAddress>,
    pub recipients: Vec<MailAddress>,
    pub message_id: Option<String>,
    pub in_reply_to: Option<String>,
    pub references: Vec<String>,
    pub body: RecordBody,
}

impl Record {
    /// Parses a record in any supported revision.
    pub fn parse(data: &[u8]) -> Result<Self, Error> {
        shape::parse(data)
    }

    /// Produces the canonical byte form of this record, whose address is its
    /// identity.
    ///
    /// Only records of the current revision with raw blob leaf bodies can be
    /// written.
    pub fn to_canonical_bytes(&self) -> Result<Vec<u8>, Error> {
        canonical::to_bytes(self)
    }

    /// Returns the effective content type, substituting `default` (but
    /// keeping any declared parameters) when none was declared.
    pub fn effective_content_type(&self, default: &ContentType) -> ContentType {
        if self.content_type.major.is_empty() {
            let mut ct = ContentType::new(&default.major, &default.minor);
            ct.params = self.content_type.params.clone();
            ct
        } else {
            self.content_type.clone()
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn version_detection() {
        assert_eq!(
            SchemaVersion::Prototype,
            SchemaVersion::detect(None).unwrap()
        );
        assert_eq!(
            SchemaVersion::Prototype,
            SchemaVersion::detect(Some("")).unwrap()
        );
        assert_eq!(
            SchemaVersion::V1_0,
            SchemaVersion::detect(Some("1.0.0")).unwrap()
        );
        assert_eq!(
            SchemaVersion::V1_0,
            SchemaVersion::detect(Some("1.0.1")).unwrap()
        );
        assert_eq!(
            SchemaVersion::V1_1,
            SchemaVersion::detect(Some("1.1.0")).unwrap()
        );
        assert_matches!(
            Err(Error::Malformed(_)),
            SchemaVersion::detect(Some("2.0.0"))
        );
        assert_matches!(
            Err(Error::Malformed(_)),
            SchemaVersion::detect(Some("banana"))
        );

        for &v in &[SchemaVersion::V1_0, SchemaVersion::V1_1] {
            assert_eq!(v, SchemaVersion::detect(v.tag()).unwrap());
        }
    }
}

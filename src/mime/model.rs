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

//! The in-memory MIME tree.
//!
//! A `MailPart` is what a MIME parser hands us when storing a message and
//! what we hand back when loading one. It is a plain value: parts do not know
//! their own addresses, and two parts are equal if and only if they would be
//! stored as the same records.

use std::collections::BTreeMap;
use std::fmt;

use chrono::prelude::*;
use serde::{Deserialize, Serialize};

/// A single header field, possibly repeated.
///
/// The name is kept exactly as it appeared in the message. Comparisons of
/// names at the protocol level are case-insensitive; see
/// `MailPart::header_values`.
///
/// The field order here is also the order of the keys in a stored record.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Field {
    pub name: String,
    #[serde(default)]
    pub values: Vec<String>,
}

impl Field {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Field {
            name: name.into(),
            values: vec![value.into()],
        }
    }
}

/// An email address, as extracted from `From`, `To`, etc.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Address {
    /// The `local@domain` address proper.
    pub address: String,
    /// The decoded display name, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

impl Address {
    pub fn new(address: impl Into<String>) -> Self {
        Address {
            address: address.into(),
            name: None,
        }
    }

    pub fn named(name: impl Into<String>, address: impl Into<String>) -> Self {
        Address {
            address: address.into(),
            name: Some(name.into()),
        }
    }
}

/// The content type of a part.
///
/// `major` and `minor` are always lower case. Parameters are kept sorted by
/// name, so the order in which they were added is irrelevant.
#[derive(Clone, Debug, PartialEq, Eq, Default)]
pub struct ContentType {
    pub major: String,
    pub minor: String,
    pub params: BTreeMap<String, String>,
}

impl ContentType {
    pub fn new(major: &str, minor: &str) -> Self {
        ContentType {
            major: major.to_ascii_lowercase(),
            minor: minor.to_ascii_lowercase(),
            params: BTreeMap::new(),
        }
    }

    pub fn text_plain() -> Self {
        ContentType::new("text", "plain")
    }

    pub fn message_rfc822() -> Self {
        ContentType::new("message", "rfc822")
    }

    /// Parses a bare `major/minor` token pair.
    ///
    /// Returns `None` unless there is exactly one `/` with a non-empty token
    /// on either side.
    pub fn parse(s: &str) -> Option<Self> {
        let mut it = s.trim().split('/');
        let major = it.next()?.trim();
        let minor = it.next()?.trim();
        if it.next().is_some()
            || major.is_empty()
            || minor.is_empty()
            || major.contains(char::is_whitespace)
            || minor.contains(char::is_whitespace)
        {
            return None;
        }

        Some(ContentType::new(major, minor))
    }

    pub fn with_param(
        mut self,
        name: impl Into<String>,
        value: impl Into<String>,
    ) -> Self {
        self.params.insert(name.into(), value.into());
        self
    }

    pub fn is(&self, major: &str, minor: &str) -> bool {
        self.major == major && self.minor == minor
    }

    /// The content type children of a multipart with this type assume when
    /// they do not declare their own.
    pub fn child_default(&self) -> ContentType {
        if self.is("multipart", "digest") {
            ContentType::message_rfc822()
        } else {
            ContentType::text_plain()
        }
    }
}

impl fmt::Display for ContentType {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}/{}", self.major, self.minor)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DispositionKind {
    Inline,
    Attachment,
}

impl DispositionKind {
    pub fn as_str(self) -> &'static str {
        match self {
            DispositionKind::Inline => "inline",
            DispositionKind::Attachment => "attachment",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        if "inline".eq_ignore_ascii_case(s) {
            Some(DispositionKind::Inline)
        } else if "attachment".eq_ignore_ascii_case(s) {
            Some(DispositionKind::Attachment)
        } else {
            None
        }
    }
}

/// The `Content-Disposition` of a part.
#[derive(Clone, Debug, PartialEq, Eq, Default)]
pub struct Disposition {
    pub kind: Option<DispositionKind>,
    pub params: BTreeMap<String, String>,
}

/// The body of a `message/delivery-status` part (RFC 3464).
///
/// `message` holds the per-message fields and `recipients` one field list
/// per recipient.
#[derive(Clone, Debug, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct DeliveryStatus {
    #[serde(default)]
    pub message: Vec<Field>,
    #[serde(default)]
    pub recipients: Vec<Vec<Field>>,
}

#[derive(Clone, Debug, PartialEq, Eq, Default)]
pub struct Multipart {
    /// Raw text before the first boundary.
    pub preamble: Vec<u8>,
    /// Raw text after the final boundary.
    pub postamble: Vec<u8>,
    pub parts: Vec<MailPart>,
}

/// The body of a part. Which variant is legal is determined entirely by the
/// part's content type; see `codec::BodyKind`.
#[derive(Clone, PartialEq, Eq)]
pub enum Body {
    Multipart(Multipart),
    /// A `message/rfc822` or `message/news` body. The nested part is a full
    /// message of its own.
    SubMessage(Box<MailPart>),
    DeliveryStatus(DeliveryStatus),
    /// Raw content, with any content transfer encoding left as-is.
    Leaf(Vec<u8>),
}

impl fmt::Debug for Body {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            Body::Multipart(ref m) => f.debug_tuple("Multipart").field(m).finish(),
            Body::SubMessage(ref m) => {
                f.debug_tuple("SubMessage").field(m).finish()
            }
            Body::DeliveryStatus(ref ds) => {
                f.debug_tuple("DeliveryStatus").field(ds).finish()
            }
            Body::Leaf(ref data) => {
                write!(f, "Leaf({} bytes)", data.len())
            }
        }
    }
}

impl Default for Body {
    fn default() -> Self {
        Body::Leaf(Vec::new())
    }
}

/// A node of a MIME tree.
#[derive(Clone, Debug, PartialEq, Eq, Default)]
pub struct MailPart {
    pub header: Vec<Field>,
    pub content_type: ContentType,
    pub disposition: Disposition,
    /// The parsed `Date`.
    pub time: Option<DateTime<FixedOffset>>,
    /// Only stored for `text/*` parts.
    pub charset: Option<String>,
    /// The decoded `Subject`. Normally only present on messages.
    pub subject: Option<String>,
    pub sender: Option<Address>,
    pub recipients: Vec<Address>,
    pub message_id: Option<String>,
    pub in_reply_to: Option<String>,
    pub references: Vec<String>,
    pub body: Body,
}

impl MailPart {
    /// Creates a bare part of the given type and body.
    pub fn new(content_type: ContentType, body: Body) -> Self {
        MailPart {
            content_type,
            body,
            ..MailPart::default()
        }
    }

    /// Returns every value of every header field called `name`, compared
    /// case-insensitively, in order of appearance.
    pub fn header_values<'a>(
        &'a self,
        name: &'a str,
    ) -> impl Iterator<Item = &'a str> + 'a {
        self.header
            .iter()
            .filter(move |f| f.name.eq_ignore_ascii_case(name))
            .flat_map(|f| f.values.iter().map(String::as_str))
    }

    /// Iterates over the direct children of this part: the parts of a
    /// multipart, or the single message of a `message/rfc822` part.
    pub fn children(&self) -> impl Iterator<Item = &MailPart> {
        let (parts, message): (&[MailPart], Option<&MailPart>) =
            match self.body {
                Body::Multipart(ref m) => (m.parts.as_slice(), None),
                Body::SubMessage(ref m) => (&[][..], Some(&**m)),
                _ => (&[][..], None),
            };

        parts.iter().chain(message)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn content_type_parsing() {
        let ct = ContentType::parse("Text/HTML").unwrap();
        assert_eq!("text", ct.major);
        assert_eq!("html", ct.minor);
        assert!(ct.params.is_empty());

        assert_eq!(
            ContentType::message_rfc822(),
            ContentType::parse(" message/rfc822 ").unwrap()
        );

        assert!(ContentType::parse("").is_none());
        assert!(ContentType::parse("text").is_none());
        assert!(ContentType::parse("text/").is_none());
        assert!(ContentType::parse("/plain").is_none());
        assert!(ContentType::parse("text/plain/extra").is_none());
        assert!(ContentType::parse("te xt/plain").is_none());
    }

    #[test]
    fn child_default_content_type() {
        assert_eq!(
            ContentType::message_rfc822(),
            ContentType::new("multipart", "digest").child_default()
        );
        assert_eq!(
            ContentType::text_plain(),
            ContentType::new("multipart", "mixed").child_default()
        );
    }

    #[test]
    fn params_ignore_insertion_order() {
        let a = ContentType::text_plain()
            .with_param("charset", "utf-8")
            .with_param("format", "flowed");
        let b = ContentType::text_plain()
            .with_param("format", "flowed")
            .with_param("charset", "utf-8");
        assert_eq!(a, b);
    }

    #[test]
    fn header_lookup_is_case_insensitive() {
        let mut part = MailPart::default();
        part.header.push(Field::new("Received", "a"));
        part.header.push(Field::new("Subject", "hello"));
        part.header.push(Field::new("RECEIVED", "b"));

        assert_eq!(
            vec!["a", "b"],
            part.header_values("received").collect::<Vec<_>>()
        );
        // Names are stored verbatim
        assert_eq!("RECEIVED", part.header[2].name);
    }
}

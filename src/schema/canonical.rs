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

//! The canonical byte form of a record.
//!
//! Since a record's address is the digest of its bytes, the same record must
//! always serialise to exactly the same bytes. The rules, which match what the
//! records already in the store were written with, are:
//!
//! - The document starts with `{"camliVersion": 1,` and a newline.
//! - Keys appear in lexical order (`FIELD_ORDER`), including within nested
//!   objects, and empty optional fields are left out.
//! - Every level is indented by one space; a key is followed by `: `.
//! - `<`, `>`, `&`, U+2028 and U+2029 are written as `\u` escapes, as are
//!   all control characters other than `\n`, `\r` and `\t`.
//!
//! Map-valued fields are `BTreeMap`s, so their iteration order is already
//! lexical and does not depend on insertion order.

use std::io;

use serde::ser::{Error as _, Serialize, SerializeMap, Serializer};
use serde_json::ser::{CharEscape, Formatter, PrettyFormatter};

use super::{LeafBody, Record, RecordBody, SchemaVersion};
use crate::support::chronox::format_record_time;
use crate::support::error::Error;

/// Every key a record can carry, in the order they are written.
pub const FIELD_ORDER: &[&str] = &[
    "body",
    "camliType",
    "charset",
    "content_disposition",
    "content_disposition_params",
    "content_type",
    "content_type_params",
    "delivery_status",
    "header",
    "in_reply_to",
    "message_id",
    "pkmail_version",
    "postamble",
    "preamble",
    "recipients",
    "references",
    "sender",
    "subject",
    "submessage",
    "subparts",
    "time",
];

const PREFIX: &[u8] = b"{\"camliVersion\": 1,\n";

pub(super) fn to_bytes(record: &Record) -> Result<Vec<u8>, Error> {
    if SchemaVersion::CURRENT != record.version {
        return Err(Error::Malformed(
            "only current-version records can be written",
        ));
    }

    let mut out = Vec::new();
    {
        let mut ser = serde_json::Serializer::with_formatter(
            &mut out,
            CanonicalFormatter::new(),
        );
        record.serialize(&mut ser)?;
    }

    let rest = out
        .strip_prefix(b"{\n")
        .ok_or(Error::Malformed("record serialised to an empty object"))?;
    let mut canonical = Vec::with_capacity(PREFIX.len() + rest.len());
    canonical.extend_from_slice(PREFIX);
    canonical.extend_from_slice(rest);
    Ok(canonical)
}

impl Serialize for Record {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(None)?;
        for &key in FIELD_ORDER {
            self.serialize_field(key, &mut map)?;
        }
        map.end()
    }
}

impl Record {
    fn serialize_field<M: SerializeMap>(
        &self,
        key: &'static str,
        map: &mut M,
    ) -> Result<(), M::Error> {
        match key {
            "body" => match self.body {
                RecordBody::Leaf(LeafBody::Blob(ref address)) => {
                    map.serialize_entry(key, address)
                }
                RecordBody::Leaf(_) => Err(M::Error::custom(
                    "only raw blob leaf bodies can be written",
                )),
                _ => Ok(()),
            },
            "camliType" => map.serialize_entry(key, self.kind.camli_type()),
            "charset" => opt_str(map, key, &self.charset),
            "content_disposition" => match self.disposition.kind {
                Some(kind) => map.serialize_entry(key, kind.as_str()),
                None => Ok(()),
            },
            "content_disposition_params" => {
                if self.disposition.params.is_empty() {
                    Ok(())
                } else {
                    map.serialize_entry(key, &self.disposition.params)
                }
            }
            "content_type" => {
                if self.content_type.major.is_empty() {
                    Ok(())
                } else {
                    map.serialize_entry(key, &self.content_type.to_string())
                }
            }
            "content_type_params" => {
                if self.content_type.params.is_empty() {
                    Ok(())
                } else {
                    map.serialize_entry(key, &self.content_type.params)
                }
            }
            "delivery_status" => match self.body {
                RecordBody::DeliveryStatus(ref ds) => {
                    map.serialize_entry(key, ds)
                }
                _ => Ok(()),
            },
            "header" => opt_seq(map, key, &self.header),
            "in_reply_to" => opt_str(map, key, &self.in_reply_to),
            "message_id" => opt_str(map, key, &self.message_id),
            "pkmail_version" => match self.version.tag() {
                Some(tag) => map.serialize_entry(key, tag),
                None => Ok(()),
            },
            "postamble" => match self.body {
                RecordBody::Subparts { ref postamble, .. } => {
                    opt_base64(map, key, postamble)
                }
                _ => Ok(()),
            },
            "preamble" => match self.body {
                RecordBody::Subparts { ref preamble, .. } => {
                    opt_base64(map, key, preamble)
                }
                _ => Ok(()),
            },
            "recipients" => opt_seq(map, key, &self.recipients),
            "references" => opt_seq(map, key, &self.references),
            "sender" => match self.sender {
                Some(ref sender) => map.serialize_entry(key, sender),
                None => Ok(()),
            },
            "subject" => opt_str(map, key, &self.subject),
            "submessage" => match self.body {
                RecordBody::SubMessage(ref address) => {
                    map.serialize_entry(key, address)
                }
                _ => Ok(()),
            },
            // An empty multipart still needs its body field
            "subparts" => match self.body {
                RecordBody::Subparts { ref parts, .. } => {
                    map.serialize_entry(key, parts)
                }
                _ => Ok(()),
            },
            "time" => match self.time {
                Some(ref time) => {
                    map.serialize_entry(key, &format_record_time(time))
                }
                None => Ok(()),
            },
            _ => Err(M::Error::custom(format!("unknown record field {}", key))),
        }
    }
}

fn opt_str<M: SerializeMap>(
    map: &mut M,
    key: &'static str,
    value: &Option<String>,
) -> Result<(), M::Error> {
    match *value {
        Some(ref s) if !s.is_empty() => map.serialize_entry(key, s),
        _ => Ok(()),
    }
}

fn opt_seq<M: SerializeMap, T: Serialize>(
    map: &mut M,
    key: &'static str,
    value: &[T],
) -> Result<(), M::Error> {
    if value.is_empty() {
        Ok(())
    } else {
        map.serialize_entry(key, value)
    }
}

fn opt_base64<M: SerializeMap>(
    map: &mut M,
    key: &'static str,
    value: &[u8],
) -> Result<(), M::Error> {
    if value.is_empty() {
        Ok(())
    } else {
        map.serialize_entry(key, &base64::encode(value))
    }
}

/// One-space pretty printing with HTML-sensitive characters escaped.
struct CanonicalFormatter {
    pretty: PrettyFormatter<'static>,
}

impl CanonicalFormatter {
    fn new() -> Self {
        CanonicalFormatter {
            pretty: PrettyFormatter::with_indent(b" "),
        }
    }
}

impl Formatter for CanonicalFormatter {
    fn begin_array<W: ?Sized + io::Write>(
        &mut self,
        writer: &mut W,
    ) -> io::Result<()> {
        self.pretty.begin_array(writer)
    }

    fn end_array<W: ?Sized + io::Write>(
        &mut self,
        writer: &mut W,
    ) -> io::Result<()> {
        self.pretty.end_array(writer)
    }

    fn begin_array_value<W: ?Sized + io::Write>(
        &mut self,
        writer: &mut W,
        first: bool,
    ) -> io::Result<()> {
        self.pretty.begin_array_value(writer, first)
    }

    fn end_array_value<W: ?Sized + io::Write>(
        &mut self,
        writer: &mut W,
    ) -> io::Result<()> {
        self.pretty.end_array_value(writer)
    }

    fn begin_object<W: ?Sized + io::Write>(
        &mut self,
        writer: &mut W,
    ) -> io::Result<()> {
        self.pretty.begin_object(writer)
    }

    fn end_object<W: ?Sized + io::Write>(
        &mut self,
        writer: &mut W,
    ) -> io::Result<()> {
        self.pretty.end_object(writer)
    }

    fn begin_object_key<W: ?Sized + io::Write>(
        &mut self,
        writer: &mut W,
        first: bool,
    ) -> io::Result<()> {
        self.pretty.begin_object_key(writer, first)
    }

    fn begin_object_value<W: ?Sized + io::Write>(
        &mut self,
        writer: &mut W,
    ) -> io::Result<()> {
        self.pretty.begin_object_value(writer)
    }

    fn end_object_value<W: ?Sized + io::Write>(
        &mut self,
        writer: &mut W,
    ) -> io::Result<()> {
        self.pretty.end_object_value(writer)
    }

    fn write_string_fragment<W: ?Sized + io::Write>(
        &mut self,
        writer: &mut W,
        fragment: &str,
    ) -> io::Result<()> {
        let mut start = 0;
        for (ix, ch) in fragment.char_indices() {
            let escape = match ch {
                '<' => "\\u003c",
                '>' => "\\u003e",
                '&' => "\\u0026",
                '\u{2028}' => "\\u2028",
                '\u{2029}' => "\\u2029",
                _ => continue,
            };

            writer.write_all(fragment[start..ix].as_bytes())?;
            writer.write_all(escape.as_bytes())?;
            start = ix + ch.len_utf8();
        }

        writer.write_all(fragment[start..].as_bytes())
    }

    fn write_char_escape<W: ?Sized + io::Write>(
        &mut self,
        writer: &mut W,
        char_escape: CharEscape,
    ) -> io::Result<()> {
        match char_escape {
            CharEscape::Backspace => writer.write_all(b"\\u0008"),
            CharEscape::FormFeed => writer.write_all(b"\\u000c"),
            other => self.pretty.write_char_escape(writer, other),
        }
    }
}

#[cfg(test)]
mod test {
    use std::collections::BTreeMap;

    use super::super::RecordKind;
    use super::*;
    use crate::mime::*;
    use crate::store::Address as BlobAddress;

    fn leaf_record() -> Record {
        Record {
            kind: RecordKind::Part,
            version: SchemaVersion::CURRENT,
            content_type: ContentType::text_plain(),
            disposition: Disposition::default(),
            header: vec![],
            time: None,
            charset: None,
            subject: None,
            sender: None,
            recipients: vec![],
            message_id: None,
            in_reply_to: None,
            references: vec![],
            body: RecordBody::Leaf(LeafBody::Blob(BlobAddress::of(b""))),
        }
    }

    fn canonical_str(record: &Record) -> String {
        String::from_utf8(to_bytes(record).unwrap()).unwrap()
    }

    #[test]
    fn field_order_is_lexical() {
        let mut sorted = FIELD_ORDER.to_vec();
        sorted.sort_unstable();
        sorted.dedup();
        assert_eq!(sorted, FIELD_ORDER);
    }

    #[test]
    fn minimal_leaf_layout() {
        assert_eq!(
            format!(
                "{{\"camliVersion\": 1,\n \
                 \"body\": \"{}\",\n \
                 \"camliType\": \"mime-part\",\n \
                 \"content_type\": \"text/plain\",\n \
                 \"pkmail_version\": \"1.1.0\"\n}}",
                BlobAddress::of(b"")
            ),
            canonical_str(&leaf_record())
        );
    }

    #[test]
    fn nested_values_layout_and_escaping() {
        let mut record = leaf_record();
        record.kind = RecordKind::Message;
        record.header = vec![Field::new("From", "Zim <zim@irk.com>")];
        record.sender = Some(Address::named("Zim & Gir", "zim@irk.com"));
        record.subject = Some("Invasion".to_owned());
        record.content_type = record.content_type.with_param("format", "flowed");

        let s = canonical_str(&record);
        assert!(s.contains(
            " \"header\": [\n  {\n   \"name\": \"From\",\n   \
             \"values\": [\n    \"Zim \\u003czim@irk.com\\u003e\"\n   ]\n  \
             }\n ],\n"
        ));
        assert!(s.contains(
            " \"sender\": {\n  \"address\": \"zim@irk.com\",\n  \
             \"name\": \"Zim \\u0026 Gir\"\n },\n \"subject\": \"Invasion\"\n}"
        ));
        assert!(s.contains(
            " \"content_type_params\": {\n  \"format\": \"flowed\"\n },\n"
        ));
        assert!(s.contains("\"camliType\": \"mime-message\""));
    }

    #[test]
    fn control_characters_use_unicode_escapes() {
        let mut record = leaf_record();
        record.subject = Some("a\u{8}b\u{c}c\u{1}d\ne\tf\"g\\h".to_owned());

        assert!(canonical_str(&record).contains(
            " \"subject\": \"a\\u0008b\\u000cc\\u0001d\\ne\\tf\\\"g\\\\h\"\n"
        ));
    }

    #[test]
    fn param_insertion_order_is_irrelevant() {
        let mut a = leaf_record();
        let mut b = leaf_record();
        let mut pa = BTreeMap::new();
        pa.insert("filename".to_owned(), "x.txt".to_owned());
        pa.insert("size".to_owned(), "3".to_owned());
        let mut pb = BTreeMap::new();
        pb.insert("size".to_owned(), "3".to_owned());
        pb.insert("filename".to_owned(), "x.txt".to_owned());
        a.disposition = Disposition {
            kind: Some(DispositionKind::Attachment),
            params: pa,
        };
        b.disposition = Disposition {
            kind: Some(DispositionKind::Attachment),
            params: pb,
        };

        assert_eq!(to_bytes(&a).unwrap(), to_bytes(&b).unwrap());
    }

    #[test]
    fn empty_multipart_keeps_subparts() {
        let mut record = leaf_record();
        record.content_type = ContentType::new("multipart", "mixed");
        record.body = RecordBody::Subparts {
            parts: vec![],
            preamble: vec![],
            postamble: b"bye".to_vec(),
        };

        let s = canonical_str(&record);
        assert!(s.contains(" \"subparts\": []\n"));
        assert!(s.contains(" \"postamble\": \"Ynll\",\n"));
        assert!(!s.contains("preamble\""));
        assert!(!s.contains("\"body\""));
    }

    #[test]
    fn only_current_blob_records_are_writable() {
        let mut record = leaf_record();
        record.body = RecordBody::Leaf(LeafBody::Inline(b"x".to_vec()));
        assert_matches!(Err(Error::BadJson(_)), to_bytes(&record));

        let mut record = leaf_record();
        record.version = SchemaVersion::V1_0;
        assert_matches!(Err(Error::Malformed(_)), to_bytes(&record));
    }
}

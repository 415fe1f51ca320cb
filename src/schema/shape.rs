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

//! Reading records in every revision of the layout.
//!
//! A record is first read into `RawRecord`, which accepts the union of every
//! shape ever written, and then normalised according to the revision its
//! version tag names.

use std::collections::BTreeMap;

use serde::Deserialize;

use super::{LeafBody, Record, RecordBody, RecordKind, SchemaVersion};
use crate::mime::{Address as MailAddress, *};
use crate::store::Address;
use crate::support::chronox::parse_record_time;
use crate::support::error::Error;

#[derive(Deserialize, Debug)]
struct RawRecord {
    #[serde(rename = "camliType")]
    camli_type: Option<String>,
    pkmail_version: Option<String>,

    content_type: Option<String>,
    content_type_params: Option<BTreeMap<String, String>>,
    content_disposition: Option<String>,
    content_disposition_params: Option<BTreeMap<String, String>>,
    header: Option<RawHeader>,
    time: Option<String>,
    charset: Option<String>,
    subject: Option<String>,
    sender: Option<MailAddress>,
    recipients: Option<Vec<MailAddress>>,
    message_id: Option<String>,
    in_reply_to: Option<String>,
    references: Option<Vec<String>>,

    preamble: Option<String>,
    postamble: Option<String>,
    subparts: Option<Vec<Address>>,
    submessage: Option<Address>,
    delivery_status: Option<DeliveryStatus>,
    #[serde(rename = "delivery-status")]
    hyphenated_delivery_status: Option<DeliveryStatus>,
    body: Option<RawBody>,
}

#[derive(Deserialize, Debug)]
#[serde(untagged)]
enum RawHeader {
    Flat(Vec<Field>),
    /// Prototype records wrapped the field list in an object.
    Nested {
        #[serde(default)]
        fields: Vec<Field>,
    },
}

#[derive(Deserialize, Debug)]
#[serde(untagged)]
enum RawBody {
    Reference(Address),
    Text { text: String },
    Data { data: String },
}

pub(super) fn parse(data: &[u8]) -> Result<Record, Error> {
    let raw: RawRecord = serde_json::from_slice(data)?;

    let kind = raw
        .camli_type
        .as_deref()
        .and_then(RecordKind::parse)
        .ok_or(Error::Malformed("not a MIME record"))?;
    let version = SchemaVersion::detect(raw.pkmail_version.as_deref())?;
    let current = SchemaVersion::V1_1 == version;

    let header = match raw.header {
        None => Vec::new(),
        Some(RawHeader::Flat(fields)) => fields,
        Some(RawHeader::Nested { fields })
            if SchemaVersion::Prototype == version =>
        {
            fields
        }
        Some(RawHeader::Nested { .. }) => {
            return Err(Error::Malformed("nested header in versioned record"))
        }
    };

    let delivery_status = match (
        raw.delivery_status,
        raw.hyphenated_delivery_status,
    ) {
        (Some(_), Some(_)) => {
            return Err(Error::Malformed("duplicate delivery status"))
        }
        (Some(ds), None) => Some(ds),
        (None, Some(_)) if current => {
            return Err(Error::Malformed(
                "hyphenated delivery status in current record",
            ))
        }
        (None, hyphenated) => hyphenated,
    };

    let variants = raw.subparts.is_some() as u32
        + raw.submessage.is_some() as u32
        + delivery_status.is_some() as u32
        + raw.body.is_some() as u32;
    if 1 != variants {
        return Err(Error::Malformed(
            "record must have exactly one body field",
        ));
    }

    let body = if let Some(parts) = raw.subparts {
        let (preamble, postamble) = if current {
            (
                decode_base64(raw.preamble.as_deref())?,
                decode_base64(raw.postamble.as_deref())?,
            )
        } else {
            (Vec::new(), Vec::new())
        };
        RecordBody::Subparts {
            parts,
            preamble,
            postamble,
        }
    } else if let Some(submessage) = raw.submessage {
        RecordBody::SubMessage(submessage)
    } else if let Some(ds) = delivery_status {
        RecordBody::DeliveryStatus(ds)
    } else {
        RecordBody::Leaf(match raw.body {
            Some(RawBody::Reference(address))
                if SchemaVersion::Prototype == version =>
            {
                LeafBody::File(address)
            }
            Some(RawBody::Reference(address)) => LeafBody::Blob(address),
            Some(RawBody::Text { text }) => LeafBody::Inline(text.into_bytes()),
            Some(RawBody::Data { data }) => {
                LeafBody::Inline(decode_base64(Some(&data))?)
            }
            None => return Err(Error::Malformed("missing body")),
        })
    };

    let mut content_type = match non_empty(raw.content_type) {
        None => ContentType::default(),
        Some(ct) => ContentType::parse(&ct)
            .ok_or(Error::Malformed("unparsable content type"))?,
    };
    content_type.params = raw.content_type_params.unwrap_or_default();

    let disposition = Disposition {
        kind: match non_empty(raw.content_disposition) {
            None => None,
            Some(s) => Some(
                DispositionKind::parse(&s)
                    .ok_or(Error::Malformed("unknown content disposition"))?,
            ),
        },
        params: raw.content_disposition_params.unwrap_or_default(),
    };

    let time = match non_empty(raw.time) {
        None => None,
        Some(s) => parse_record_time(&s)
            .map_err(|_| Error::Malformed("unparsable time"))?,
    };

    // Only the current revision knows about these; anything an older record
    // has under these names was never written by us.
    let (message_id, in_reply_to, references) = if current {
        (
            non_empty(raw.message_id),
            non_empty(raw.in_reply_to),
            raw.references.unwrap_or_default(),
        )
    } else {
        (None, None, Vec::new())
    };

    Ok(Record {
        kind,
        version,
        content_type,
        disposition,
        header,
        time,
        charset: non_empty(raw.charset),
        subject: non_empty(raw.subject),
        sender: raw.sender,
        recipients: raw.recipients.unwrap_or_default(),
        message_id,
        in_reply_to,
        references,
        body,
    })
}

fn non_empty(s: Option<String>) -> Option<String> {
    s.filter(|s| !s.is_empty())
}

fn decode_base64(s: Option<&str>) -> Result<Vec<u8>, Error> {
    match s {
        None => Ok(Vec::new()),
        Some(s) => {
            base64::decode(s).map_err(|_| Error::Malformed("invalid base64"))
        }
    }
}

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

//! Conversion between `MailPart` trees and stored records.
//!
//! Encoding walks the tree in post-order, storing every leaf body and every
//! child record before the record which refers to it, so that no record ever
//! names an address the store does not hold. Decoding walks the other way,
//! fetching each record and everything it references.
//!
//! Which of the four body forms a part carries is decided entirely by its
//! content type, through `BodyKind::for_type`. Both directions use the same
//! rule, so anything the encoder accepts, the decoder accepts too.

use log::info;

use crate::mime::{Body, ContentType};
use crate::schema::{RecordBody, SchemaVersion};
use crate::store::{Address, BlobStore};
use crate::support::error::Error;
use crate::support::system_config::CodecConfig;

mod decode;
mod encode;

pub use self::decode::Decoder;
pub use self::encode::Encoder;

/// The body form a content type calls for.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BodyKind {
    Multipart,
    SubMessage,
    DeliveryStatus,
    Leaf,
}

impl BodyKind {
    /// Determines the body form for `ct`.
    ///
    /// `message/*` types other than `rfc822`, `news` and `delivery-status`
    /// (for example `message/partial`) have no defined form and fail with
    /// `Error::Unimplemented`.
    pub fn for_type(ct: &ContentType) -> Result<Self, Error> {
        match (ct.major.as_str(), ct.minor.as_str()) {
            ("multipart", _) => Ok(BodyKind::Multipart),
            ("message", "rfc822") | ("message", "news") => {
                Ok(BodyKind::SubMessage)
            }
            ("message", "delivery-status") => Ok(BodyKind::DeliveryStatus),
            ("message", _) => Err(Error::Unimplemented(ct.to_string())),
            _ => Ok(BodyKind::Leaf),
        }
    }

    pub fn of_body(body: &Body) -> Self {
        match *body {
            Body::Multipart(..) => BodyKind::Multipart,
            Body::SubMessage(..) => BodyKind::SubMessage,
            Body::DeliveryStatus(..) => BodyKind::DeliveryStatus,
            Body::Leaf(..) => BodyKind::Leaf,
        }
    }

    pub fn of_record(body: &RecordBody) -> Self {
        match *body {
            RecordBody::Subparts { .. } => BodyKind::Multipart,
            RecordBody::SubMessage(..) => BodyKind::SubMessage,
            RecordBody::DeliveryStatus(..) => BodyKind::DeliveryStatus,
            RecordBody::Leaf(..) => BodyKind::Leaf,
        }
    }
}

/// Rewrites the message at `address`, and everything beneath it, in the
/// current record layout, returning the address of the rewritten message.
///
/// A message already in the current layout comes back at the same address.
/// The old records are left in place.
pub fn migrate<S: BlobStore + ?Sized>(
    store: &S,
    address: &Address,
    config: CodecConfig,
) -> Result<Address, Error> {
    let message = Decoder::new(store)
        .with_config(config)
        .decode_message(address)?;
    let migrated = Encoder::new(store)
        .with_config(config)
        .encode_message(&message)?;

    if migrated != *address {
        info!(
            "Migrated {} to {} (schema {:?})",
            address,
            migrated,
            SchemaVersion::CURRENT
        );
    }

    Ok(migrated)
}

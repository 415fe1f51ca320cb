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

use std::fmt;

use thiserror::Error;

use crate::store::{Address, StoreError};

#[derive(Error, Debug)]
pub enum Error {
    #[error("Malformed record: {0}")]
    Malformed(&'static str),
    #[error("Malformed record: {0}")]
    BadJson(#[source] serde_json::Error),
    #[error("Unimplemented content type {0}")]
    Unimplemented(String),
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error("Operation cancelled")]
    Cancelled,
    #[error("{at}: {source}")]
    Context {
        at: PathElement,
        #[source]
        source: Box<Error>,
    },
}

/// The broad classes of failure a caller may want to distinguish between.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ErrorKind {
    Malformed,
    Unimplemented,
    StoreFailure,
    Cancelled,
}

/// Identifies where in a tree a failure occurred.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PathElement {
    /// The record stored at the given address.
    Record(Address),
    /// The n-th (zero-based) child of a multipart.
    Subpart(usize),
    /// The message nested inside a `message/rfc822` or `message/news` part.
    SubMessage,
}

impl fmt::Display for PathElement {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            PathElement::Record(ref address) => write!(f, "record {}", address),
            PathElement::Subpart(ix) => write!(f, "subpart {}", ix),
            PathElement::SubMessage => write!(f, "submessage"),
        }
    }
}

impl Error {
    pub fn kind(&self) -> ErrorKind {
        match *self {
            Error::Malformed(..) | Error::BadJson(..) => ErrorKind::Malformed,
            Error::Unimplemented(..) => ErrorKind::Unimplemented,
            Error::Store(..) => ErrorKind::StoreFailure,
            Error::Cancelled => ErrorKind::Cancelled,
            Error::Context { ref source, .. } => source.kind(),
        }
    }

    /// Returns the path to the failing node, outermost element first.
    pub fn path(&self) -> Vec<&PathElement> {
        let mut path = Vec::new();
        let mut e = self;
        while let Error::Context { ref at, ref source } = *e {
            path.push(at);
            e = source;
        }
        path
    }

    /// Returns the error at the bottom of any context layers.
    pub fn root_cause(&self) -> &Error {
        match *self {
            Error::Context { ref source, .. } => source.root_cause(),
            ref e => e,
        }
    }

    pub fn at(self, at: PathElement) -> Self {
        Error::Context {
            at,
            source: Box::new(self),
        }
    }
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::BadJson(e)
    }
}

pub trait ResultContext {
    fn at(self, at: PathElement) -> Self;
}

impl<T> ResultContext for Result<T, Error> {
    fn at(self, at: PathElement) -> Self {
        self.map_err(|e| e.at(at))
    }
}

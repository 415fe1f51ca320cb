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

//! Constants from `sysexits.h`, for the command-line tool.

use super::error::{Error, ErrorKind};

#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Debug)]
pub struct Sysexit(pub i32);

pub const EX_USAGE: Sysexit = Sysexit(64);
pub const EX_DATAERR: Sysexit = Sysexit(65);
pub const EX_NOINPUT: Sysexit = Sysexit(66);
pub const EX_SOFTWARE: Sysexit = Sysexit(70);
pub const EX_IOERR: Sysexit = Sysexit(74);
pub const EX_TEMPFAIL: Sysexit = Sysexit(75);
pub const EX_CONFIG: Sysexit = Sysexit(78);

impl Sysexit {
    pub fn exit(self) -> ! {
        std::process::exit(self.0)
    }

    /// Chooses the exit code that best describes `e`.
    pub fn for_error(e: &Error) -> Self {
        match e.kind() {
            ErrorKind::Malformed => EX_DATAERR,
            ErrorKind::Unimplemented => EX_SOFTWARE,
            ErrorKind::Cancelled => EX_TEMPFAIL,
            ErrorKind::StoreFailure => match *e.root_cause() {
                Error::Store(crate::store::StoreError::NotFound(..)) => {
                    EX_NOINPUT
                }
                _ => EX_IOERR,
            },
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::store::{Address, StoreError};
    use crate::support::error::PathElement;

    #[test]
    fn exit_codes_follow_error_kinds() {
        assert_eq!(EX_DATAERR, Sysexit::for_error(&Error::Malformed("x")));
        assert_eq!(
            EX_SOFTWARE,
            Sysexit::for_error(&Error::Unimplemented("message/partial".into()))
        );
        assert_eq!(
            EX_NOINPUT,
            Sysexit::for_error(
                &Error::from(StoreError::NotFound(Address::of(b"")))
                    .at(PathElement::Subpart(0))
            )
        );
    }
}

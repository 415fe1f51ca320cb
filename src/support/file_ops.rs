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

//! Miscellaneous functions for working with files.

use std::io::{self, Write};
use std::path::Path;

/// Write `data` into a new file at `path`, atomically.
///
/// The file will first be staged within `tmp`. The call fails with
/// `AlreadyExists` if `path` already exists.
pub fn spit_noclobber(
    tmp: impl AsRef<Path>,
    path: impl AsRef<Path>,
    data: &[u8],
) -> io::Result<()> {
    let mut tf = tempfile::NamedTempFile::new_in(tmp)?;
    tf.as_file_mut().write_all(data)?;
    tf.as_file_mut().sync_all()?;
    tf.persist_noclobber(path)?;
    Ok(())
}

pub trait IgnoreKinds {
    fn ignore_already_exists(self) -> Self;
}

impl<R: Default> IgnoreKinds for Result<R, io::Error> {
    fn ignore_already_exists(self) -> Self {
        match self {
            Ok(r) => Ok(r),
            Err(e) if io::ErrorKind::AlreadyExists == e.kind() => {
                Ok(R::default())
            }
            Err(e) => Err(e),
        }
    }
}

#[cfg(test)]
mod test {
    use std::fs;

    use tempfile::TempDir;

    use super::*;

    #[test]
    fn spit_refuses_to_clobber() {
        let root = TempDir::new().unwrap();
        let path = root.path().join("foo");

        spit_noclobber(root.path(), &path, b"foo").unwrap();
        let e = spit_noclobber(root.path(), &path, b"bar").unwrap_err();
        assert_eq!(io::ErrorKind::AlreadyExists, e.kind());
        assert!(spit_noclobber(root.path(), &path, b"bar")
            .ignore_already_exists()
            .is_ok());

        assert_eq!(b"foo", &fs::read(&path).unwrap()[..]);
    }
}

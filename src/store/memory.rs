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

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use super::{Address, BlobStore, StoreError};

/// A `BlobStore` held entirely in memory.
#[derive(Debug, Default)]
pub struct MemoryStore {
    inner: Mutex<Inner>,
}

#[derive(Debug, Default)]
struct Inner {
    blobs: HashMap<Address, Arc<[u8]>>,
    puts: usize,
    writes: usize,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts `data` under an arbitrary `address`, without verifying the
    /// address.
    ///
    /// This is how blobs addressed with a foreign algorithm get into the
    /// store.
    pub fn insert_unchecked(&self, address: Address, data: &[u8]) {
        let mut inner = self.lock();
        inner.blobs.insert(address, Arc::from(data));
    }

    /// The number of distinct blobs held.
    pub fn len(&self) -> usize {
        self.lock().blobs.len()
    }

    pub fn is_empty(&self) -> bool {
        0 == self.len()
    }

    /// The number of `put` calls that actually stored something new.
    pub fn writes(&self) -> usize {
        self.lock().writes
    }

    /// The total number of `put` calls.
    pub fn puts(&self) -> usize {
        self.lock().puts
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Inner> {
        // No operation can leave the map half-updated, so poisoning is moot.
        match self.inner.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

impl BlobStore for MemoryStore {
    fn put(&self, data: &[u8]) -> Result<Address, StoreError> {
        let address = Address::of(data);
        let mut inner = self.lock();
        inner.puts += 1;
        if !inner.blobs.contains_key(&address) {
            inner.blobs.insert(address.clone(), Arc::from(data));
            inner.writes += 1;
        }
        Ok(address)
    }

    fn fetch(&self, address: &Address) -> Result<Vec<u8>, StoreError> {
        self.lock()
            .blobs
            .get(address)
            .map(|data| data.to_vec())
            .ok_or_else(|| StoreError::NotFound(address.clone()))
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn put_is_idempotent() {
        let store = MemoryStore::new();
        let a = store.put(b"foo").unwrap();
        let b = store.put(b"foo").unwrap();
        assert_eq!(a, b);
        assert_eq!(1, store.len());
        assert_eq!(2, store.puts());
        assert_eq!(1, store.writes());
        assert_eq!(b"foo", &store.fetch(&a).unwrap()[..]);
    }

    #[test]
    fn fetch_missing() {
        let store = MemoryStore::new();
        assert_matches!(
            Err(StoreError::NotFound(_)),
            store.fetch(&Address::of(b"nope"))
        );
    }
}

//! Order-independent sets keyed by content
//!
//! Filters, references and feature privileges are declared as sets. Two
//! declarations listing the same entries in a different order must compare
//! equal, so each entry is keyed by a hash of its identifying fields and the
//! set is kept sorted by that key. Equality also compares the entries, so a
//! change under an unchanged key still shows up.

use serde::de::{Deserialize, Deserializer};
use serde::ser::{Serialize, Serializer};
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;

pub trait ContentHash {
    /// Canonical text of the fields that make two entries the same.
    fn content_key(&self) -> String;

    fn content_hash(&self) -> u64 {
        let digest = Sha256::digest(self.content_key().as_bytes());
        let mut bytes = [0u8; 8];
        bytes.copy_from_slice(&digest[..8]);
        u64::from_be_bytes(bytes)
    }
}

#[derive(Clone, Debug)]
pub struct HashedSet<T> {
    items: BTreeMap<u64, T>,
}

impl<T> Default for HashedSet<T> {
    fn default() -> Self {
        Self {
            items: BTreeMap::new(),
        }
    }
}

impl<T: ContentHash> HashedSet<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert `item`; returns false when an entry with the same content is
    /// already present (the new one replaces it).
    pub fn insert(&mut self, item: T) -> bool {
        self.items.insert(item.content_hash(), item).is_none()
    }

    pub fn contains(&self, item: &T) -> bool {
        self.items.contains_key(&item.content_hash())
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Entries in hash order.
    pub fn iter(&self) -> impl Iterator<Item = &T> {
        self.items.values()
    }
}

impl<T: ContentHash> FromIterator<T> for HashedSet<T> {
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        let mut set = Self::new();
        for item in iter {
            set.insert(item);
        }
        set
    }
}

impl<T> IntoIterator for HashedSet<T> {
    type Item = T;
    type IntoIter = std::collections::btree_map::IntoValues<u64, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.into_values()
    }
}

impl<T: PartialEq> PartialEq for HashedSet<T> {
    fn eq(&self, other: &Self) -> bool {
        self.items == other.items
    }
}

impl<T: Eq> Eq for HashedSet<T> {}

impl<T: Serialize> Serialize for HashedSet<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_seq(self.items.values())
    }
}

impl<'de, T> Deserialize<'de> for HashedSet<T>
where
    T: Deserialize<'de> + ContentHash,
{
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Vec::<T>::deserialize(deserializer).map(|items| items.into_iter().collect())
    }
}

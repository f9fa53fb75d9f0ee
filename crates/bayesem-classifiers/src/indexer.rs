//! Bidirectional string <-> id mapping for features and labels.
//!
//! Ids are assigned densely in insertion order and never reused, so an
//! indexer only grows.
use std::collections::HashMap;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Indexer {
    names: Vec<String>,
    ids: HashMap<String, u32>,
}

impl Indexer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Id of `name`, assigning the next free id if it is new.
    pub fn get_or_insert(&mut self, name: &str) -> u32 {
        if let Some(&id) = self.ids.get(name) {
            return id;
        }
        let id = self.names.len() as u32;
        self.names.push(name.to_string());
        self.ids.insert(name.to_string(), id);
        id
    }

    pub fn get(&self, name: &str) -> Option<u32> {
        self.ids.get(name).copied()
    }

    pub fn name(&self, id: u32) -> Option<&str> {
        self.names.get(id as usize).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    /// Names in id order.
    pub fn names(&self) -> &[String] {
        &self.names
    }
}

impl<S: AsRef<str>> FromIterator<S> for Indexer {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        let mut indexer = Indexer::new();
        for name in iter {
            indexer.get_or_insert(name.as_ref());
        }
        indexer
    }
}

// Persisted as the plain list of names; ids are the positions.
impl Serialize for Indexer {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.names.serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for Indexer {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let names = Vec::<String>::deserialize(deserializer)?;
        Ok(names.into_iter().collect())
    }
}

//! Ordered registry of names with stable integer indices

use std::collections::HashMap;
use serde::{Serialize, Deserialize};

/// A bidirectional name <-> index registry
///
/// - Indices are assigned in insertion order starting at 0
/// - Names are never removed, so an index stays valid forever
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StringDictionary {
    /// Names ordered by index
    names: Vec<String>,
    /// Reverse lookup
    #[serde(skip)]
    indices: HashMap<String, usize>,
}

impl StringDictionary {
    /// Create an empty registry
    pub fn new() -> Self {
        StringDictionary {
            names: Vec::new(),
            indices: HashMap::new(),
        }
    }

    /// Build a registry from a list of names (duplicates keep their first index)
    pub fn from_names<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut dictionary = StringDictionary::new();
        for name in names {
            dictionary.add(name);
        }
        dictionary
    }

    /// Number of registered names
    pub fn len(&self) -> usize {
        self.names.len()
    }

    /// Check if nothing has been registered
    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    /// Get the index of `name`, registering it if needed
    ///
    /// Returns the index and whether the name was newly added.
    pub fn add(&mut self, name: impl Into<String>) -> (usize, bool) {
        let name = name.into();
        if let Some(&index) = self.indices.get(&name) {
            return (index, false);
        }
        let index = self.names.len();
        self.indices.insert(name.clone(), index);
        self.names.push(name);
        (index, true)
    }

    /// Find the index of an already registered name
    pub fn find(&self, name: &str) -> Option<usize> {
        self.indices.get(name).copied()
    }

    /// Name registered at `index`, if any
    pub fn get(&self, index: usize) -> Option<&str> {
        self.names.get(index).map(String::as_str)
    }

    /// Iterate over names in index order
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.names.iter().map(String::as_str)
    }

    /// Rebuild the reverse index (needed after deserialization)
    pub fn reindex(&mut self) {
        self.indices = self
            .names
            .iter()
            .enumerate()
            .map(|(index, name)| (name.clone(), index))
            .collect();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_add_is_idempotent() {
        let mut dictionary = StringDictionary::new();
        assert_eq!(dictionary.add("a"), (0, true));
        assert_eq!(dictionary.add("b"), (1, true));
        assert_eq!(dictionary.add("a"), (0, false));
        assert_eq!(dictionary.len(), 2);
        assert_eq!(dictionary.get(1), Some("b"));
        assert_eq!(dictionary.get(2), None);
    }

    #[test]
    fn test_from_names_keeps_first_index() {
        let dictionary = StringDictionary::from_names(["x", "y", "x", "z"]);
        assert_eq!(dictionary.len(), 3);
        assert_eq!(dictionary.find("z"), Some(2));
        assert_eq!(dictionary.iter().collect::<Vec<_>>(), vec!["x", "y", "z"]);
    }

    #[test]
    fn test_reindex_after_json() {
        let dictionary = StringDictionary::from_names(["left", "right"]);
        let json = serde_json::to_string(&dictionary).unwrap();
        let mut loaded: StringDictionary = serde_json::from_str(&json).unwrap();
        assert_eq!(loaded.find("right"), None);
        loaded.reindex();
        assert_eq!(loaded.find("right"), Some(1));
        assert_eq!(loaded, dictionary);
    }
}

//! Name-keyed, serializable form of a feature vector
//!
//! Indices are only meaningful relative to a live dictionary, so snapshots
//! store names. Loading a snapshot registers unknown names in the target
//! dictionary.

use super::{DenseVector, SparseVector};
use crate::dictionary::{DictionaryRef, FeatureDictionary};
use crate::{FeatureMLError, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Nonzero content of a vector, keyed by feature and scope names
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct VectorSnapshot {
    /// Name of the dictionary the vector was expressed in
    pub dictionary: String,
    /// Leaf features of this level
    pub features: Vec<(String, f64)>,
    /// Non-empty sub-scopes
    pub scopes: Vec<ScopeSnapshot>,
}

/// A named scope of a [`VectorSnapshot`]
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ScopeSnapshot {
    /// Scope name in the parent dictionary
    pub name: String,
    /// Content of the scope
    pub vector: VectorSnapshot,
}

impl VectorSnapshot {
    /// Create an empty snapshot for dictionary `dictionary`
    pub fn new(dictionary: impl Into<String>) -> Self {
        VectorSnapshot {
            dictionary: dictionary.into(),
            features: Vec::new(),
            scopes: Vec::new(),
        }
    }

    /// Check if the snapshot holds no feature at any depth
    pub fn is_empty(&self) -> bool {
        self.features.is_empty() && self.scopes.iter().all(|scope| scope.vector.is_empty())
    }

    /// Serialize to pretty JSON
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Parse from JSON
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    fn check_dictionary(&self, dictionary: &DictionaryRef) -> Result<()> {
        if self.dictionary != dictionary.name() {
            return Err(FeatureMLError::InvalidSnapshot(format!(
                "snapshot of dictionary '{}' cannot be loaded into dictionary '{}'",
                self.dictionary,
                dictionary.name()
            )));
        }
        Ok(())
    }
}

impl ScopeSnapshot {
    /// Register the scope under `parent` and pick its child dictionary
    ///
    /// An already bound scope keeps its dictionary. A new scope is bound to a
    /// dictionary named as recorded, shared by every scope of this load that
    /// recorded the same name.
    fn bind(
        &self,
        parent: &DictionaryRef,
        bound: &mut HashMap<String, DictionaryRef>,
    ) -> (usize, DictionaryRef) {
        let index = parent.get_or_add_scope(self.name.as_str());
        let recorded = &self.vector.dictionary;
        let child = match parent.existing_sub_dictionary(index) {
            Some(existing) => {
                bound.entry(recorded.clone()).or_insert_with(|| existing.clone());
                existing
            }
            None => {
                let child = bound
                    .entry(recorded.clone())
                    .or_insert_with(|| FeatureDictionary::new(recorded.as_str()))
                    .clone();
                parent.ensure_sub_dictionary(index, child.clone());
                child
            }
        };
        (index, child)
    }
}

impl SparseVector {
    /// Rebuild a sparse vector over `dictionary` from its snapshot
    ///
    /// Only the root dictionary name must match.
    pub fn from_snapshot(snapshot: &VectorSnapshot, dictionary: DictionaryRef) -> Result<Self> {
        snapshot.check_dictionary(&dictionary)?;
        Ok(SparseVector::load(snapshot, dictionary, &mut HashMap::new()))
    }

    fn load(
        snapshot: &VectorSnapshot,
        dictionary: DictionaryRef,
        bound: &mut HashMap<String, DictionaryRef>,
    ) -> Self {
        let mut vector = SparseVector::new(dictionary.clone());
        for (name, value) in &snapshot.features {
            vector.set_by_name(name, *value);
        }
        for scope in &snapshot.scopes {
            let (index, child_dictionary) = scope.bind(&dictionary, bound);
            let child = SparseVector::load(&scope.vector, child_dictionary, bound);
            vector.set_sub_vector(index, child);
        }
        vector
    }
}

impl DenseVector {
    /// Rebuild a dense vector over `dictionary` from its snapshot
    ///
    /// Only the root dictionary name must match.
    pub fn from_snapshot(snapshot: &VectorSnapshot, dictionary: DictionaryRef) -> Result<Self> {
        snapshot.check_dictionary(&dictionary)?;
        Ok(DenseVector::load(snapshot, dictionary, &mut HashMap::new()))
    }

    fn load(
        snapshot: &VectorSnapshot,
        dictionary: DictionaryRef,
        bound: &mut HashMap<String, DictionaryRef>,
    ) -> Self {
        let mut vector = DenseVector::new(dictionary.clone());
        for (name, value) in &snapshot.features {
            vector.set_by_name(name, *value);
        }
        for scope in &snapshot.scopes {
            let (index, child_dictionary) = scope.bind(&dictionary, bound);
            let child = DenseVector::load(&scope.vector, child_dictionary, bound);
            vector.set_sub_vector(index, child);
        }
        vector
    }
}

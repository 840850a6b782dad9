//! Sparse feature vectors: sorted (index, value) and (scope, sub-vector) lists

use super::FeatureGenerator;
use crate::dictionary::{check_same_dictionary, same_dictionary, DictionaryRef};
use crate::visitor::{visit_scope, AccumulationTarget, FeatureVisitor, ScopePath, ScopedLookup};
use std::fmt;

/// Pair-list representation of a feature tree
///
/// - `values` holds (leaf index, value), sorted by index, each index once
/// - `sub_vectors` holds (scope index, child), sorted by scope, each scope once
/// - absent entries are zero
#[derive(Clone, Debug, Default)]
pub struct SparseVector {
    dictionary: Option<DictionaryRef>,
    values: Vec<(usize, f64)>,
    sub_vectors: Vec<(usize, SparseVector)>,
}

impl SparseVector {
    /// Create an empty vector over `dictionary`
    pub fn new(dictionary: DictionaryRef) -> Self {
        SparseVector::with_dictionary(Some(dictionary))
    }

    /// Create an empty vector, possibly without dictionary yet
    pub fn with_dictionary(dictionary: Option<DictionaryRef>) -> Self {
        SparseVector {
            dictionary,
            values: Vec::new(),
            sub_vectors: Vec::new(),
        }
    }

    /// Number of stored leaf entries
    pub fn num_values(&self) -> usize {
        self.values.len()
    }

    /// Number of stored sub-vectors
    pub fn num_sub_vectors(&self) -> usize {
        self.sub_vectors.len()
    }

    /// Stored leaf entries, sorted by index
    pub fn values(&self) -> &[(usize, f64)] {
        &self.values
    }

    /// Stored sub-vectors, sorted by scope index
    pub fn sub_vectors(&self) -> &[(usize, SparseVector)] {
        &self.sub_vectors
    }

    /// Check if nothing is stored at any depth
    pub fn is_empty(&self) -> bool {
        self.values.is_empty() && self.sub_vectors.iter().all(|(_, sub)| sub.is_empty())
    }

    /// Value of leaf `index` (0 when absent)
    pub fn get(&self, index: usize) -> f64 {
        match self.values.binary_search_by_key(&index, |&(i, _)| i) {
            Ok(position) => self.values[position].1,
            Err(_) => 0.0,
        }
    }

    /// Value of a named leaf (0 when unknown)
    pub fn get_by_name(&self, name: &str) -> f64 {
        self.dictionary
            .as_ref()
            .and_then(|dictionary| dictionary.find_feature(name))
            .map_or(0.0, |index| self.get(index))
    }

    /// Set leaf `index`; setting 0 removes the entry
    pub fn set(&mut self, index: usize, value: f64) {
        match self.values.binary_search_by_key(&index, |&(i, _)| i) {
            Ok(position) if value == 0.0 => {
                self.values.remove(position);
            }
            Ok(position) => self.values[position].1 = value,
            Err(_) if value == 0.0 => {}
            Err(position) => self.values.insert(position, (index, value)),
        }
    }

    /// Set a named leaf, registering the name in the dictionary
    ///
    /// # Panics
    /// If the vector has no dictionary.
    pub fn set_by_name(&mut self, name: &str, value: f64) {
        let index = self.require_dictionary().get_or_add_feature(name);
        self.set(index, value);
    }

    /// Mutable slot of leaf `index`, inserted as 0 when absent
    pub fn value_mut(&mut self, index: usize) -> &mut f64 {
        let position = match self.values.binary_search_by_key(&index, |&(i, _)| i) {
            Ok(position) => position,
            Err(position) => {
                self.values.insert(position, (index, 0.0));
                position
            }
        };
        &mut self.values[position].1
    }

    /// Sub-vector of scope `scope`, if present
    pub fn sub_vector(&self, scope: usize) -> Option<&SparseVector> {
        self.sub_vectors
            .binary_search_by_key(&scope, |(s, _)| *s)
            .ok()
            .map(|position| &self.sub_vectors[position].1)
    }

    /// Sub-vector of scope `scope`, created empty when absent
    ///
    /// # Panics
    /// If the vector has no dictionary.
    pub fn sub_vector_mut(&mut self, scope: usize) -> &mut SparseVector {
        let child_dictionary = self.require_dictionary().sub_dictionary(scope);
        self.sub_vector_entry(scope, &child_dictionary)
    }

    /// Sub-vector of a named scope, created when absent
    pub fn sub_vector_by_name_mut(&mut self, name: &str) -> &mut SparseVector {
        let scope = self.require_dictionary().get_or_add_scope(name);
        self.sub_vector_mut(scope)
    }

    /// Replace the sub-vector of scope `scope`
    pub fn set_sub_vector(&mut self, scope: usize, sub_vector: SparseVector) {
        if let (Some(dictionary), Some(child)) = (&self.dictionary, &sub_vector.dictionary) {
            dictionary.ensure_sub_dictionary(scope, child.clone());
        }
        match self.sub_vectors.binary_search_by_key(&scope, |(s, _)| *s) {
            Ok(position) => self.sub_vectors[position].1 = sub_vector,
            Err(position) => self.sub_vectors.insert(position, (scope, sub_vector)),
        }
    }

    /// Remove all content (the dictionary is kept)
    pub fn clear(&mut self) {
        self.values.clear();
        self.sub_vectors.clear();
    }

    /// Multiply every leaf by `scalar`
    pub fn multiply_by_scalar(&mut self, scalar: f64) {
        if scalar == 0.0 {
            self.clear();
            return;
        }
        for (_, value) in &mut self.values {
            *value *= scalar;
        }
        for (_, sub_vector) in &mut self.sub_vectors {
            sub_vector.multiply_by_scalar(scalar);
        }
    }

    /// `self += weight * generator`
    pub fn add_weighted(&mut self, generator: &dyn FeatureGenerator, weight: f64) {
        generator.add_weighted_to(self, weight);
    }

    /// `self += generator`
    pub fn add(&mut self, generator: &dyn FeatureGenerator) {
        generator.add_to(self);
    }

    /// `self -= generator`
    pub fn substract(&mut self, generator: &dyn FeatureGenerator) {
        generator.substract_from(self);
    }

    fn require_dictionary(&self) -> &DictionaryRef {
        match &self.dictionary {
            Some(dictionary) => dictionary,
            None => panic!("sparse vector has no feature dictionary"),
        }
    }

    fn sub_vector_entry(
        &mut self,
        scope: usize,
        child_dictionary: &DictionaryRef,
    ) -> &mut SparseVector {
        let position = match self.sub_vectors.binary_search_by_key(&scope, |(s, _)| *s) {
            Ok(position) => position,
            Err(position) => {
                let child = SparseVector::new(child_dictionary.clone());
                self.sub_vectors.insert(position, (scope, child));
                position
            }
        };
        let child = &mut self.sub_vectors[position].1;
        match child.dictionary.clone() {
            Some(existing) => check_same_dictionary(&existing, child_dictionary),
            None => child.dictionary = Some(child_dictionary.clone()),
        }
        child
    }

    fn content_eq(&self, other: &SparseVector) -> bool {
        let nonzero = |values: &[(usize, f64)]| -> Vec<(usize, f64)> {
            values.iter().copied().filter(|&(_, v)| v != 0.0).collect()
        };
        if nonzero(&self.values) != nonzero(&other.values) {
            return false;
        }
        let children = |vector: &SparseVector| -> Vec<usize> {
            vector
                .sub_vectors
                .iter()
                .filter(|(_, sub)| !sub.is_empty())
                .map(|(scope, _)| *scope)
                .collect()
        };
        children(self) == children(other)
            && self.sub_vectors.iter().all(|(scope, sub)| match other.sub_vector(*scope) {
                Some(other_sub) => sub.content_eq(other_sub),
                None => sub.is_empty(),
            })
    }
}

impl FeatureGenerator for SparseVector {
    fn dictionary(&self) -> Option<DictionaryRef> {
        self.dictionary.clone()
    }

    fn accept(&self, visitor: &mut dyn FeatureVisitor) {
        let dictionary = match &self.dictionary {
            Some(dictionary) => dictionary,
            None => {
                assert!(self.is_empty(), "sparse vector has content but no feature dictionary");
                return;
            }
        };
        for &(index, value) in &self.values {
            if value != 0.0 {
                visitor.sense(dictionary, index, value);
            }
        }
        for (scope, sub_vector) in &self.sub_vectors {
            visit_scope(visitor, dictionary, *scope, sub_vector);
        }
    }

    fn as_sparse(&self) -> Option<&SparseVector> {
        Some(self)
    }

    fn to_sparse_vector(&self) -> SparseVector {
        self.clone()
    }
}

impl AccumulationTarget for SparseVector {
    fn target_dictionary(&self) -> Option<DictionaryRef> {
        self.dictionary.clone()
    }

    fn adopt_dictionary(&mut self, dictionary: DictionaryRef) {
        debug_assert!(self.dictionary.is_none());
        self.dictionary = Some(dictionary);
    }

    fn leaf_mut(&mut self, path: &ScopePath, index: usize) -> &mut f64 {
        let mut node = self;
        for (scope, child_dictionary) in path {
            node = node.sub_vector_entry(*scope, child_dictionary);
        }
        node.value_mut(index)
    }

    fn as_sparse_mut(&mut self) -> Option<&mut SparseVector> {
        Some(self)
    }
}

impl ScopedLookup for SparseVector {
    fn leaf(&self, index: usize) -> f64 {
        self.get(index)
    }

    fn child(&self, scope: usize) -> Option<&Self> {
        self.sub_vector(scope)
    }
}

/// Same dictionary instance and same nonzero content
impl PartialEq for SparseVector {
    fn eq(&self, other: &Self) -> bool {
        let same = match (&self.dictionary, &other.dictionary) {
            (Some(a), Some(b)) => same_dictionary(a, b),
            (None, None) => true,
            _ => false,
        };
        same && self.content_eq(other)
    }
}

impl fmt::Display for SparseVector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_feature_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dictionary::FeatureDictionary;
    use crate::visitor::testing::UniqueVisitChecker;

    #[test]
    fn test_set_keeps_indices_sorted_and_unique() {
        let mut vector = SparseVector::new(FeatureDictionary::new("flat"));
        vector.set(5, 1.0);
        vector.set(1, 2.0);
        vector.set(3, 3.0);
        vector.set(1, 4.0);
        assert_eq!(vector.values(), &[(1, 4.0), (3, 3.0), (5, 1.0)]);

        vector.set(3, 0.0);
        assert_eq!(vector.values(), &[(1, 4.0), (5, 1.0)]);
        assert_eq!(vector.get(3), 0.0);
    }

    #[test]
    fn test_sub_vectors_share_dictionary_tree() {
        let dictionary = FeatureDictionary::new("root");
        let mut vector = SparseVector::new(dictionary.clone());
        vector.sub_vector_by_name_mut("child").set_by_name("x", 1.0);
        vector.sub_vector_by_name_mut("child").set_by_name("y", 2.0);

        assert_eq!(vector.num_sub_vectors(), 1);
        let child = vector.sub_vector(0).unwrap();
        assert!(same_dictionary(&child.dictionary().unwrap(), &dictionary.sub_dictionary(0)));
        assert_eq!(child.get_by_name("y"), 2.0);
    }

    #[test]
    fn test_accept_visits_each_index_once() {
        let mut vector = SparseVector::new(FeatureDictionary::new("root"));
        for (i, name) in ["a", "b", "c"].iter().enumerate() {
            vector.set_by_name(name, i as f64 + 1.0);
            vector.sub_vector_by_name_mut("s").set_by_name(name, 1.0);
        }
        let mut checker = UniqueVisitChecker::default();
        vector.accept(&mut checker);
        assert_eq!(checker.num_leaves, 6);
    }

    #[test]
    fn test_multiply_and_equality() {
        let dictionary = FeatureDictionary::new("root");
        let mut first = SparseVector::new(dictionary.clone());
        first.set_by_name("a", 2.0);
        first.sub_vector_by_name_mut("s").set_by_name("x", -1.0);
        let mut second = first.clone();
        second.multiply_by_scalar(0.5);
        second.multiply_by_scalar(2.0);
        assert_eq!(first, second);

        second.sub_vector_by_name_mut("empty");
        assert_eq!(first, second);

        second.set_by_name("a", 3.0);
        assert_ne!(first, second);
    }

    #[test]
    fn test_add_and_substract() {
        let dictionary = FeatureDictionary::new("root");
        let mut target = SparseVector::new(dictionary.clone());
        let mut operand = SparseVector::new(dictionary);
        operand.set_by_name("a", 1.5);

        target.add(&operand);
        target.add_weighted(&operand, 2.0);
        target.substract(&operand);
        assert_eq!(target.get_by_name("a"), 3.0);
    }

    #[test]
    #[should_panic(expected = "no feature dictionary")]
    fn test_named_access_requires_dictionary() {
        let mut vector = SparseVector::default();
        vector.set_by_name("a", 1.0);
    }
}

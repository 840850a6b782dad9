//! Lock-step dot product between a traversed generator and a stored vector

use super::FeatureVisitor;
use crate::dictionary::DictionaryRef;

/// Random access into a stored (sparse or dense) vector tree
pub trait ScopedLookup {
    /// Value of leaf `index` (0 when absent)
    fn leaf(&self, index: usize) -> f64;

    /// Child vector of scope `scope`, if present
    fn child(&self, scope: usize) -> Option<&Self>;
}

/// Sums `own(leaf) * other(leaf)` while walking the traversed generator
///
/// Scopes missing from `other` are pruned: they contribute an implicit zero.
pub struct DotProductVisitor<'a, L: ScopedLookup> {
    stack: Vec<&'a L>,
    sum: f64,
}

impl<'a, L: ScopedLookup> DotProductVisitor<'a, L> {
    /// Start a dot product against `other`
    pub fn new(other: &'a L) -> Self {
        DotProductVisitor {
            stack: vec![other],
            sum: 0.0,
        }
    }

    /// Accumulated dot product
    pub fn result(&self) -> f64 {
        self.sum
    }
}

impl<'a, L: ScopedLookup> FeatureVisitor for DotProductVisitor<'a, L> {
    fn enter_scope(&mut self, _dictionary: &DictionaryRef, scope: usize) -> bool {
        let child = self
            .stack
            .last()
            .copied()
            .and_then(|current: &'a L| current.child(scope));
        match child {
            Some(child) => {
                self.stack.push(child);
                true
            }
            None => false,
        }
    }

    fn sense(&mut self, _dictionary: &DictionaryRef, index: usize, value: f64) {
        if let Some(current) = self.stack.last() {
            self.sum += value * current.leaf(index);
        }
    }

    fn leave_scope(&mut self) {
        self.stack.pop();
    }
}

#[cfg(test)]
mod tests {
    use crate::dictionary::FeatureDictionary;
    use crate::vector::{DenseVector, FeatureGenerator, SparseVector};

    #[test]
    fn test_missing_scopes_are_zero() {
        let dictionary = FeatureDictionary::new("root");
        let mut sparse = SparseVector::new(dictionary.clone());
        sparse.set_by_name("a", 2.0);
        sparse.sub_vector_by_name_mut("only_here").set_by_name("b", 5.0);

        let mut dense = DenseVector::new(dictionary.clone());
        dense.set_by_name("a", 4.0);
        dense.sub_vector_by_name_mut("only_there").set_by_name("c", 7.0);

        assert_eq!(sparse.dot_product(&dense), 8.0);
        assert_eq!(dense.dot_product(&sparse), 8.0);
    }

    #[test]
    fn test_sparse_sparse() {
        let dictionary = FeatureDictionary::new("root");
        let mut first = SparseVector::new(dictionary.clone());
        first.set_by_name("a", 1.5);
        first.sub_vector_by_name_mut("s").set_by_name("x", 2.0);
        let mut second = SparseVector::new(dictionary);
        second.set_by_name("a", 2.0);
        second.sub_vector_by_name_mut("s").set_by_name("x", -1.0);

        assert_eq!(first.dot_product(&second), 1.0);
    }
}

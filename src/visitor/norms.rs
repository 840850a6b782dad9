//! l0 / l1 / squared-l2 norms

use super::FeatureVisitor;
use crate::dictionary::DictionaryRef;

/// Collects the three norm statistics in a single traversal
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct NormStatistics {
    /// Count of nonzero leaves
    pub l0: usize,
    /// Sum of absolute values
    pub l1: f64,
    /// Sum of squared values
    pub sum_of_squares: f64,
}

impl NormStatistics {
    /// Zeroed statistics
    pub fn new() -> Self {
        NormStatistics::default()
    }

    /// Euclidean norm
    pub fn l2(&self) -> f64 {
        self.sum_of_squares.sqrt()
    }
}

impl FeatureVisitor for NormStatistics {
    fn enter_scope(&mut self, _dictionary: &DictionaryRef, _scope: usize) -> bool {
        true
    }

    fn sense(&mut self, _dictionary: &DictionaryRef, _index: usize, value: f64) {
        if value != 0.0 {
            self.l0 += 1;
            self.l1 += value.abs();
            self.sum_of_squares += value * value;
        }
    }

    fn leave_scope(&mut self) {}
}

#[cfg(test)]
mod tests {
    use crate::dictionary::FeatureDictionary;
    use crate::vector::{FeatureGenerator, SparseVector};

    #[test]
    fn test_norms_over_nested_vector() {
        let mut vector = SparseVector::new(FeatureDictionary::new("root"));
        vector.set_by_name("a", 3.0);
        vector.sub_vector_by_name_mut("inner").set_by_name("b", -4.0);

        assert_eq!(vector.l0norm(), 2);
        assert_eq!(vector.l1norm(), 7.0);
        assert_eq!(vector.sum_of_squares(), 25.0);
        assert_eq!(vector.l2norm(), 5.0);
    }
}

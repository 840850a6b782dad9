//! The feature-generator capability and its default operations

use super::{DenseVector, LazyVector, SparseVector, VectorSnapshot};
use crate::dictionary::{check_same_dictionary, DictionaryRef};
use crate::visitor::{
    Accumulator, AccumulationMode, AccumulationTarget, DotProductVisitor, FeatureEnumerator,
    FeatureVisitor, NormStatistics, ScopedLookup, SnapshotBuilder, StringRenderer,
};
use std::rc::Rc;

/// Shared handle on any feature generator
pub type GeneratorRef = Rc<dyn FeatureGenerator>;

/// Anything that reports a dictionary and can drive a visitor over its
/// nonzero content.
///
/// Implementors provide [`dictionary`](Self::dictionary) and
/// [`accept`](Self::accept); every numerical operation has a default
/// implementation expressed through the visitor protocol.
pub trait FeatureGenerator {
    /// Dictionary naming the generator's features (None for content-free generators)
    fn dictionary(&self) -> Option<DictionaryRef>;

    /// Drive `visitor` over the generator, depth-first, each index at most once
    fn accept(&self, visitor: &mut dyn FeatureVisitor);

    /// Whether the natural materialization of this generator is dense
    fn is_dense(&self) -> bool {
        false
    }

    /// Downcast hook
    fn as_dense(&self) -> Option<&DenseVector> {
        None
    }

    /// Downcast hook
    fn as_sparse(&self) -> Option<&SparseVector> {
        None
    }

    /// Downcast hook
    fn as_lazy(&self) -> Option<&LazyVector> {
        None
    }

    /// Structural simplification of `weight * self`, when one exists
    ///
    /// Used by [`multiply_by_scalar`](super::multiply_by_scalar); `None` means
    /// the product is wrapped as is.
    fn scale_by(&self, _weight: f64) -> Option<GeneratorRef> {
        None
    }

    /// Check that `other` shares this generator's dictionary
    ///
    /// # Panics
    /// If both dictionaries exist and differ.
    fn check_dictionary_equals(&self, other: &DictionaryRef) {
        if let Some(own) = self.dictionary() {
            check_same_dictionary(&own, other);
        }
    }

    /// Indented `name = value` rendering
    fn to_feature_string(&self) -> String {
        let mut renderer = StringRenderer::new();
        self.accept(&mut renderer);
        renderer.finish()
    }

    /// Materialize as an equivalent sparse tree
    fn to_sparse_vector(&self) -> SparseVector {
        let mut result = SparseVector::with_dictionary(self.dictionary());
        self.add_to(&mut result);
        result
    }

    /// Materialize as an equivalent dense tree
    fn to_dense_vector(&self) -> DenseVector {
        let mut result = DenseVector::with_dictionary(self.dictionary());
        self.add_to(&mut result);
        result
    }

    /// Count of reachable nonzero leaves
    fn l0norm(&self) -> usize {
        self.norm_statistics().l0
    }

    /// Sum of absolute leaf values
    fn l1norm(&self) -> f64 {
        self.norm_statistics().l1
    }

    /// Sum of squared leaf values
    fn sum_of_squares(&self) -> f64 {
        self.norm_statistics().sum_of_squares
    }

    /// Euclidean norm
    fn l2norm(&self) -> f64 {
        self.sum_of_squares().sqrt()
    }

    /// All three norms in a single traversal
    fn norm_statistics(&self) -> NormStatistics {
        let mut statistics = NormStatistics::new();
        self.accept(&mut statistics);
        statistics
    }

    /// `target += self`
    fn add_to(&self, target: &mut dyn AccumulationTarget) {
        self.add_weighted_to(target, 1.0);
    }

    /// `target -= self`
    fn substract_from(&self, target: &mut dyn AccumulationTarget) {
        self.add_weighted_to(target, -1.0);
    }

    /// `target += weight * self`
    fn add_weighted_to(&self, target: &mut dyn AccumulationTarget, weight: f64) {
        if weight == 0.0 {
            return;
        }
        target.prepare_for(self.dictionary());
        let mut accumulator = Accumulator::new(target, weight, AccumulationMode::Values);
        self.accept(&mut accumulator);
    }

    /// `target += weight * sign(self)`, leaf by leaf
    fn add_weighted_signs_to(&self, target: &mut dyn AccumulationTarget, weight: f64) {
        if weight == 0.0 {
            return;
        }
        target.prepare_for(self.dictionary());
        let mut accumulator = Accumulator::new(target, weight, AccumulationMode::Signs);
        self.accept(&mut accumulator);
    }

    /// Dot product with another generator
    ///
    /// Scopes present in only one operand count as zero.
    fn dot_product(&self, other: &dyn FeatureGenerator) -> f64 {
        if let Some(other_dictionary) = other.dictionary() {
            self.check_dictionary_equals(&other_dictionary);
        }
        if let Some(dense) = other.as_dense() {
            dot_product_with(self, dense)
        } else if let Some(sparse) = other.as_sparse() {
            dot_product_with(self, sparse)
        } else {
            let dense = other.to_dense_vector();
            dot_product_with(self, &dense)
        }
    }

    /// Scope-qualified `(name, value)` rows, in traversal order
    fn enumerate_features(&self) -> Vec<(String, f64)> {
        let mut enumerator = FeatureEnumerator::new();
        self.accept(&mut enumerator);
        enumerator.into_features()
    }

    /// Name-keyed snapshot of the nonzero content
    fn snapshot(&self) -> VectorSnapshot {
        let name = self
            .dictionary()
            .map(|dictionary| dictionary.name().to_string())
            .unwrap_or_default();
        let mut builder = SnapshotBuilder::new(&name);
        self.accept(&mut builder);
        builder.finish()
    }
}

/// Walk `generator` in lock-step with a stored vector tree
pub fn dot_product_with<G, L>(generator: &G, other: &L) -> f64
where
    G: FeatureGenerator + ?Sized,
    L: ScopedLookup,
{
    let mut visitor = DotProductVisitor::new(other);
    generator.accept(&mut visitor);
    visitor.result()
}

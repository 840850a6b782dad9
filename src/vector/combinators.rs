//! Algebra over shared generators: scaling, weighted sums, linear combinations

use super::{
    CompositeFeatureGenerator, EmptyFeatureGenerator, FeatureGenerator, GeneratorRef, LazyVector,
};
use crate::dictionary::DictionaryRef;
use crate::visitor::{AccumulationTarget, FeatureVisitor};
use std::fmt;
use std::rc::Rc;

/// `weight * generator`, without copying the generator
#[derive(Clone)]
pub struct ScaledFeatureGenerator {
    generator: GeneratorRef,
    weight: f64,
}

impl ScaledFeatureGenerator {
    /// The wrapped generator
    pub fn generator(&self) -> &GeneratorRef {
        &self.generator
    }

    /// The scale factor
    pub fn weight(&self) -> f64 {
        self.weight
    }
}

struct ScalingVisitor<'a> {
    inner: &'a mut dyn FeatureVisitor,
    weight: f64,
}

impl FeatureVisitor for ScalingVisitor<'_> {
    fn enter_scope(&mut self, dictionary: &DictionaryRef, scope: usize) -> bool {
        self.inner.enter_scope(dictionary, scope)
    }

    fn sense(&mut self, dictionary: &DictionaryRef, index: usize, value: f64) {
        self.inner.sense(dictionary, index, self.weight * value);
    }

    fn leave_scope(&mut self) {
        self.inner.leave_scope();
    }
}

impl FeatureGenerator for ScaledFeatureGenerator {
    fn dictionary(&self) -> Option<DictionaryRef> {
        self.generator.dictionary()
    }

    fn accept(&self, visitor: &mut dyn FeatureVisitor) {
        let mut scaling = ScalingVisitor {
            inner: visitor,
            weight: self.weight,
        };
        self.generator.accept(&mut scaling);
    }

    fn is_dense(&self) -> bool {
        self.generator.is_dense()
    }

    fn scale_by(&self, weight: f64) -> Option<GeneratorRef> {
        Some(multiply_by_scalar(Rc::clone(&self.generator), self.weight * weight))
    }

    fn add_weighted_to(&self, target: &mut dyn AccumulationTarget, weight: f64) {
        self.generator.add_weighted_to(target, self.weight * weight);
    }

    fn dot_product(&self, other: &dyn FeatureGenerator) -> f64 {
        self.weight * self.generator.dot_product(other)
    }
}

impl fmt::Debug for ScaledFeatureGenerator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ScaledFeatureGenerator")
            .field("weight", &self.weight)
            .finish_non_exhaustive()
    }
}

/// `weight * generator`, simplified where the algebra allows
///
/// - `0 * x` is the empty generator and `1 * x` is `x` itself
/// - `k * (k' * x)` becomes `(k * k') * x`
/// - scaling distributes over composites, sub-generators and lazy sums
pub fn multiply_by_scalar(generator: GeneratorRef, weight: f64) -> GeneratorRef {
    if weight == 1.0 {
        return generator;
    }
    if weight == 0.0 {
        return EmptyFeatureGenerator::shared();
    }
    match generator.scale_by(weight) {
        Some(simplified) => simplified,
        None => Rc::new(ScaledFeatureGenerator { generator, weight }),
    }
}

/// `w1 * g1 + w2 * g2`, evaluated immediately when `compute_now` is set
pub fn weighted_sum(
    first: GeneratorRef,
    first_weight: f64,
    second: GeneratorRef,
    second_weight: f64,
    compute_now: bool,
) -> GeneratorRef {
    let mut sum = LazyVector::empty();
    sum.add_weighted(first, first_weight);
    sum.add_weighted(second, second_weight);
    if compute_now {
        sum.force();
    }
    Rc::new(sum)
}

/// `first + second`
pub fn addition(first: GeneratorRef, second: GeneratorRef) -> GeneratorRef {
    weighted_sum(first, 1.0, second, 1.0, false)
}

/// `first - second`
pub fn difference(first: GeneratorRef, second: GeneratorRef) -> GeneratorRef {
    weighted_sum(first, 1.0, second, -1.0, false)
}

/// `Σ weights[i] * composite.sub_generator(i)`, expressed in the sub-generators' space
///
/// # Panics
/// If `weights` does not hold one weight per scope slot.
pub fn linear_combination(composite: &CompositeFeatureGenerator, weights: &[f64]) -> LazyVector {
    assert_eq!(
        weights.len(),
        composite.num_sub_generators(),
        "one weight per sub-generator expected"
    );
    let mut result = LazyVector::empty();
    for (scope, generator) in composite.sub_generators() {
        result.add_weighted(Rc::clone(generator), weights[scope]);
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dictionary::FeatureDictionary;
    use crate::vector::{DenseVector, SparseVector, SubFeatureGenerator};

    fn vector(dictionary: &DictionaryRef, values: &[(&str, f64)]) -> GeneratorRef {
        let mut vector = SparseVector::new(dictionary.clone());
        for (name, value) in values {
            vector.set_by_name(name, *value);
        }
        Rc::new(vector)
    }

    #[test]
    fn test_trivial_weights() {
        let dictionary = FeatureDictionary::new("flat");
        let x = vector(&dictionary, &[("a", 1.0)]);
        assert!(Rc::ptr_eq(&multiply_by_scalar(Rc::clone(&x), 1.0), &x));
        assert!(multiply_by_scalar(Rc::clone(&x), 0.0).dictionary().is_none());
    }

    #[test]
    fn test_nested_weights_collapse() {
        let dictionary = FeatureDictionary::new("flat");
        let x = vector(&dictionary, &[("a", 1.0), ("b", -2.0)]);
        let twice = multiply_by_scalar(Rc::clone(&x), 2.0);
        let six_times = multiply_by_scalar(twice, 3.0);
        assert_eq!(six_times.to_sparse_vector().get_by_name("b"), -12.0);
        assert_eq!(six_times.l1norm(), 18.0);
    }

    #[test]
    fn test_scaling_distributes_over_structure() {
        let parent = FeatureDictionary::new("parent");
        let child = FeatureDictionary::new("child");
        let scope = parent.add_scope("inner", child.clone());
        let sub: GeneratorRef =
            Rc::new(SubFeatureGenerator::new(parent, scope, vector(&child, &[("x", 1.5)])));
        let scaled = multiply_by_scalar(sub, -2.0);
        assert_eq!(scaled.enumerate_features(), vec![("inner.x".to_string(), -3.0)]);
    }

    #[test]
    fn test_weighted_sum_now_and_later() {
        let dictionary = FeatureDictionary::new("flat");
        let x = vector(&dictionary, &[("a", 1.0), ("b", 1.0)]);
        let y = vector(&dictionary, &[("b", 2.0)]);

        let later = difference(Rc::clone(&x), Rc::clone(&y));
        let now = weighted_sum(Rc::clone(&x), 1.0, Rc::clone(&y), -1.0, true);
        assert!(later.as_lazy().unwrap().is_symbolic());
        assert!(!now.as_lazy().unwrap().is_symbolic());
        assert_eq!(later.to_sparse_vector(), now.to_sparse_vector());
        assert_eq!(addition(x, y).to_sparse_vector().get_by_name("b"), 3.0);
    }

    #[test]
    fn test_linear_combination_of_alternatives() {
        let alternatives = FeatureDictionary::new("alternative");
        let mut composite = CompositeFeatureGenerator::new(FeatureDictionary::new("example"));
        composite.append(vector(&alternatives, &[("x", 1.0)]));
        composite.append(vector(&alternatives, &[("x", 2.0), ("y", 1.0)]));
        composite.append(vector(&alternatives, &[("y", 4.0)]));

        let combination = linear_combination(&composite, &[1.0, -0.5, 0.25]);
        let dense: DenseVector = combination.to_dense_vector();
        assert_eq!(dense.get_by_name("x"), 0.0);
        assert_eq!(dense.get_by_name("y"), 0.5);
    }

    #[test]
    #[should_panic(expected = "one weight per sub-generator")]
    fn test_linear_combination_weight_count() {
        let composite = CompositeFeatureGenerator::new(FeatureDictionary::new("example"));
        linear_combination(&composite, &[1.0]);
    }
}

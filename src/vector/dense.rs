//! Dense feature vectors: contiguous leaf values plus optional sub-vectors

use super::{dot_product_with, FeatureGenerator};
use crate::dictionary::{check_same_dictionary, same_dictionary, DictionaryRef};
use crate::visitor::{
    visit_scope, Accumulator, AccumulationMode, AccumulationTarget, FeatureVisitor, ScopePath,
    ScopedLookup,
};
use crate::{FeatureMLError, Result};
use ndarray::Array1;
use rand::Rng;
use rand_distr::{Distribution, Normal};
use std::fmt;

/// Growing a vector past this multiple of its size is reported as suspicious
const SUSPICIOUS_GROWTH_FACTOR: usize = 100;

/// Array representation of a feature tree
///
/// Leaf `i` lives at `values[i]` (0 past the end); scope `j` lives at
/// `sub_vectors[j]` (`None` means all zeros).
#[derive(Clone, Debug, Default)]
pub struct DenseVector {
    dictionary: Option<DictionaryRef>,
    values: Vec<f64>,
    sub_vectors: Vec<Option<DenseVector>>,
}

impl DenseVector {
    /// Create an empty vector over `dictionary`
    pub fn new(dictionary: DictionaryRef) -> Self {
        DenseVector::with_dictionary(Some(dictionary))
    }

    /// Create an empty vector, possibly without dictionary yet
    pub fn with_dictionary(dictionary: Option<DictionaryRef>) -> Self {
        DenseVector {
            dictionary,
            values: Vec::new(),
            sub_vectors: Vec::new(),
        }
    }

    /// Create a flat vector from raw leaf values
    pub fn with_values(dictionary: DictionaryRef, values: Vec<f64>) -> Self {
        DenseVector {
            dictionary: Some(dictionary),
            values,
            sub_vectors: Vec::new(),
        }
    }

    /// Create a flat vector from an ndarray
    pub fn from_array(dictionary: DictionaryRef, array: &Array1<f64>) -> Self {
        DenseVector::with_values(dictionary, array.to_vec())
    }

    /// Copy the leaf values into an ndarray
    pub fn to_array(&self) -> Array1<f64> {
        Array1::from(self.values.clone())
    }

    /// Leaf values (trailing leaves may be implicit zeros)
    pub fn values(&self) -> &[f64] {
        &self.values
    }

    /// Mutable leaf values
    pub fn values_mut(&mut self) -> &mut [f64] {
        &mut self.values
    }

    /// Number of stored leaf slots
    pub fn num_values(&self) -> usize {
        self.values.len()
    }

    /// Number of stored scope slots
    pub fn num_sub_vectors(&self) -> usize {
        self.sub_vectors.len()
    }

    /// Check if no slot holds a nonzero value at any depth
    pub fn is_empty(&self) -> bool {
        self.values.iter().all(|&value| value == 0.0)
            && self.sub_vectors.iter().flatten().all(DenseVector::is_empty)
    }

    /// Value of leaf `index` (0 past the end)
    pub fn get(&self, index: usize) -> f64 {
        self.values.get(index).copied().unwrap_or(0.0)
    }

    /// Value of a named leaf (0 when unknown)
    pub fn get_by_name(&self, name: &str) -> f64 {
        self.dictionary
            .as_ref()
            .and_then(|dictionary| dictionary.find_feature(name))
            .map_or(0.0, |index| self.get(index))
    }

    /// Set leaf `index`, growing the storage as needed
    pub fn set(&mut self, index: usize, value: f64) {
        *self.value_mut(index) = value;
    }

    /// Set a named leaf, registering the name in the dictionary
    ///
    /// # Panics
    /// If the vector has no dictionary.
    pub fn set_by_name(&mut self, name: &str, value: f64) {
        let index = self.require_dictionary().get_or_add_feature(name);
        self.set(index, value);
    }

    /// Mutable slot of leaf `index`, growing the storage as needed
    pub fn value_mut(&mut self, index: usize) -> &mut f64 {
        if index >= self.values.len() {
            let current = self.values.len();
            if current > 0 && index > SUSPICIOUS_GROWTH_FACTOR * current {
                tracing::warn!(
                    dictionary = %self.dictionary_name(),
                    from = current,
                    to = index + 1,
                    "large dense vector growth, a sparse vector may fit better"
                );
            }
            self.values.resize(index + 1, 0.0);
        }
        &mut self.values[index]
    }

    /// Sub-vector of scope `scope`, if present
    pub fn sub_vector(&self, scope: usize) -> Option<&DenseVector> {
        self.sub_vectors.get(scope).and_then(Option::as_ref)
    }

    /// Sub-vector of scope `scope`, created empty when absent
    ///
    /// # Panics
    /// If the vector has no dictionary.
    pub fn sub_vector_mut(&mut self, scope: usize) -> &mut DenseVector {
        let child_dictionary = self.require_dictionary().sub_dictionary(scope);
        self.sub_vector_entry(scope, &child_dictionary)
    }

    /// Sub-vector of a named scope, created when absent
    pub fn sub_vector_by_name_mut(&mut self, name: &str) -> &mut DenseVector {
        let scope = self.require_dictionary().get_or_add_scope(name);
        self.sub_vector_mut(scope)
    }

    /// Replace the sub-vector of scope `scope`
    pub fn set_sub_vector(&mut self, scope: usize, sub_vector: DenseVector) {
        if let (Some(dictionary), Some(child)) = (&self.dictionary, &sub_vector.dictionary) {
            dictionary.ensure_sub_dictionary(scope, child.clone());
        }
        if self.sub_vectors.len() <= scope {
            self.sub_vectors.resize(scope + 1, None);
        }
        self.sub_vectors[scope] = Some(sub_vector);
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
        for value in &mut self.values {
            *value *= scalar;
        }
        for sub_vector in self.sub_vectors.iter_mut().flatten() {
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

    /// Index of the first largest leaf value of this level
    pub fn argmax(&self) -> Option<usize> {
        let mut best: Option<(usize, f64)> = None;
        for (index, &value) in self.values.iter().enumerate() {
            if best.map_or(true, |(_, max)| value > max) {
                best = Some((index, value));
            }
        }
        best.map(|(index, _)| index)
    }

    /// Largest leaf value of this level
    pub fn max_value(&self) -> Option<f64> {
        self.argmax().map(|index| self.values[index])
    }

    /// `ln(sum(exp(v)))` over the leaf values of this level, computed stably
    ///
    /// An empty vector yields negative infinity.
    pub fn log_sum_exp(&self) -> f64 {
        let max = match self.max_value() {
            Some(max) if max.is_finite() => max,
            Some(max) => return max,
            None => return f64::NEG_INFINITY,
        };
        let sum: f64 = self.values.iter().map(|&value| (value - max).exp()).sum();
        max + sum.ln()
    }

    /// Fill every leaf (at least one per dictionary feature) with Gaussian noise
    ///
    /// Existing sub-vectors are filled recursively.
    pub fn initialize_randomly<R: Rng + ?Sized>(
        &mut self,
        rng: &mut R,
        mean: f64,
        standard_deviation: f64,
    ) -> Result<()> {
        if !mean.is_finite() || !standard_deviation.is_finite() || standard_deviation < 0.0 {
            return Err(FeatureMLError::InvalidConfig(format!(
                "gaussian parameters must be finite with a non-negative std, \
                 got mean {} and std {}",
                mean, standard_deviation
            )));
        }
        let normal = Normal::new(mean, standard_deviation).map_err(|e| {
            FeatureMLError::InvalidConfig(format!(
                "invalid gaussian parameters (mean {}, std {}): {}",
                mean, standard_deviation, e
            ))
        })?;
        self.fill_with(rng, &normal);
        Ok(())
    }

    fn fill_with<R: Rng + ?Sized>(&mut self, rng: &mut R, normal: &Normal<f64>) {
        let size = self
            .dictionary
            .as_ref()
            .map_or(0, |dictionary| dictionary.num_features())
            .max(self.values.len());
        self.values.resize(size, 0.0);
        for value in &mut self.values {
            *value = normal.sample(rng);
        }
        for sub_vector in self.sub_vectors.iter_mut().flatten() {
            sub_vector.fill_with(rng, normal);
        }
    }

    /// `self += weight * other`, slot by slot
    pub(crate) fn add_weighted_dense(&mut self, other: &DenseVector, weight: f64) {
        if self.values.len() < other.values.len() {
            self.values.resize(other.values.len(), 0.0);
        }
        for (value, &delta) in self.values.iter_mut().zip(&other.values) {
            *value += weight * delta;
        }
        if self.sub_vectors.len() < other.sub_vectors.len() {
            self.sub_vectors.resize(other.sub_vectors.len(), None);
        }
        for (slot, other_sub) in self.sub_vectors.iter_mut().zip(&other.sub_vectors) {
            if let Some(other_sub) = other_sub {
                slot.get_or_insert_with(|| {
                    DenseVector::with_dictionary(other_sub.dictionary.clone())
                })
                    .add_weighted_dense(other_sub, weight);
            }
        }
    }

    fn dense_dot(&self, other: &DenseVector) -> f64 {
        let own: f64 = self
            .values
            .iter()
            .zip(&other.values)
            .map(|(a, b)| a * b)
            .sum();
        let children: f64 = self
            .sub_vectors
            .iter()
            .zip(&other.sub_vectors)
            .filter_map(|pair| match pair {
                (Some(a), Some(b)) => Some(a.dense_dot(b)),
                _ => None,
            })
            .sum();
        own + children
    }

    fn require_dictionary(&self) -> &DictionaryRef {
        match &self.dictionary {
            Some(dictionary) => dictionary,
            None => panic!("dense vector has no feature dictionary"),
        }
    }

    fn dictionary_name(&self) -> String {
        self.dictionary
            .as_ref()
            .map(|dictionary| dictionary.name().to_string())
            .unwrap_or_default()
    }

    fn sub_vector_entry(
        &mut self,
        scope: usize,
        child_dictionary: &DictionaryRef,
    ) -> &mut DenseVector {
        if self.sub_vectors.len() <= scope {
            self.sub_vectors.resize(scope + 1, None);
        }
        let child = self.sub_vectors[scope]
            .get_or_insert_with(|| DenseVector::new(child_dictionary.clone()));
        match child.dictionary.clone() {
            Some(existing) => check_same_dictionary(&existing, child_dictionary),
            None => child.dictionary = Some(child_dictionary.clone()),
        }
        child
    }

    fn content_eq(&self, other: &DenseVector) -> bool {
        let num_values = self.values.len().max(other.values.len());
        let num_scopes = self.sub_vectors.len().max(other.sub_vectors.len());
        (0..num_values).all(|index| self.get(index) == other.get(index))
            && (0..num_scopes).all(|scope| match (self.sub_vector(scope), other.sub_vector(scope)) {
                (Some(a), Some(b)) => a.content_eq(b),
                (Some(only), None) | (None, Some(only)) => only.is_empty(),
                (None, None) => true,
            })
    }
}

impl FeatureGenerator for DenseVector {
    fn dictionary(&self) -> Option<DictionaryRef> {
        self.dictionary.clone()
    }

    fn accept(&self, visitor: &mut dyn FeatureVisitor) {
        let dictionary = match &self.dictionary {
            Some(dictionary) => dictionary,
            None => {
                assert!(self.is_empty(), "dense vector has content but no feature dictionary");
                return;
            }
        };
        for (index, &value) in self.values.iter().enumerate() {
            if value != 0.0 {
                visitor.sense(dictionary, index, value);
            }
        }
        for (scope, sub_vector) in self.sub_vectors.iter().enumerate() {
            if let Some(sub_vector) = sub_vector {
                visit_scope(visitor, dictionary, scope, sub_vector);
            }
        }
    }

    fn is_dense(&self) -> bool {
        true
    }

    fn as_dense(&self) -> Option<&DenseVector> {
        Some(self)
    }

    fn to_dense_vector(&self) -> DenseVector {
        self.clone()
    }

    fn add_weighted_to(&self, target: &mut dyn AccumulationTarget, weight: f64) {
        if weight == 0.0 {
            return;
        }
        target.prepare_for(self.dictionary());
        if let Some(dense) = target.as_dense_mut() {
            dense.add_weighted_dense(self, weight);
            return;
        }
        let mut accumulator = Accumulator::new(target, weight, AccumulationMode::Values);
        self.accept(&mut accumulator);
    }

    fn dot_product(&self, other: &dyn FeatureGenerator) -> f64 {
        if let Some(other_dictionary) = other.dictionary() {
            self.check_dictionary_equals(&other_dictionary);
        }
        if let Some(dense) = other.as_dense() {
            self.dense_dot(dense)
        } else if other.as_lazy().is_some() {
            other.dot_product(self)
        } else {
            // Walk the (usually sparser) operand against our random access storage
            dot_product_with(other, self)
        }
    }
}

impl AccumulationTarget for DenseVector {
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

    fn as_dense_mut(&mut self) -> Option<&mut DenseVector> {
        Some(self)
    }
}

impl ScopedLookup for DenseVector {
    fn leaf(&self, index: usize) -> f64 {
        self.get(index)
    }

    fn child(&self, scope: usize) -> Option<&Self> {
        self.sub_vector(scope)
    }
}

/// Same dictionary instance and same values, trailing zeros ignored
impl PartialEq for DenseVector {
    fn eq(&self, other: &Self) -> bool {
        let same = match (&self.dictionary, &other.dictionary) {
            (Some(a), Some(b)) => same_dictionary(a, b),
            (None, None) => true,
            _ => false,
        };
        same && self.content_eq(other)
    }
}

impl fmt::Display for DenseVector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_feature_string())
    }
}

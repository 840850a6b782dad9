//! Symbolic weighted sums of generators, materialized on demand

use super::{DenseVector, FeatureGenerator, GeneratorRef, SparseVector};
use crate::dictionary::{check_same_dictionary, DictionaryRef};
use crate::visitor::{AccumulationTarget, FeatureVisitor};
use std::fmt;
use std::rc::Rc;

/// Concrete storage of a forced [`LazyVector`]
#[derive(Clone, Debug, PartialEq)]
pub enum Materialized {
    /// Dense storage
    Dense(DenseVector),
    /// Sparse storage
    Sparse(SparseVector),
}

impl Materialized {
    /// The stored vector as a generator
    pub fn as_generator(&self) -> &dyn FeatureGenerator {
        match self {
            Materialized::Dense(dense) => dense,
            Materialized::Sparse(sparse) => sparse,
        }
    }

    fn as_target_mut(&mut self) -> &mut dyn AccumulationTarget {
        match self {
            Materialized::Dense(dense) => dense,
            Materialized::Sparse(sparse) => sparse,
        }
    }

    fn empty(dense: bool, dictionary: Option<DictionaryRef>) -> Self {
        if dense {
            Materialized::Dense(DenseVector::with_dictionary(dictionary))
        } else {
            Materialized::Sparse(SparseVector::with_dictionary(dictionary))
        }
    }
}

#[derive(Clone)]
enum LazyState {
    /// `base + Σ weight·generator`
    Symbolic {
        base: Option<Materialized>,
        terms: Vec<(GeneratorRef, f64)>,
    },
    Materialized(Materialized),
}

impl LazyState {
    fn empty() -> Self {
        LazyState::Symbolic {
            base: None,
            terms: Vec::new(),
        }
    }
}

/// Weighted linear combination of shared generators
///
/// Terms are kept by reference until [`force`](LazyVector::force) computes
/// the sum; forcing a vector that was already materialized folds the old
/// content back in as the base of the new sum.
#[derive(Clone)]
pub struct LazyVector {
    dictionary: Option<DictionaryRef>,
    state: LazyState,
}

impl Default for LazyVector {
    fn default() -> Self {
        LazyVector::empty()
    }
}

fn same_generator(a: &GeneratorRef, b: &GeneratorRef) -> bool {
    std::ptr::eq(Rc::as_ptr(a) as *const (), Rc::as_ptr(b) as *const ())
}

impl LazyVector {
    /// Create a zero vector over `dictionary`
    pub fn new(dictionary: DictionaryRef) -> Self {
        LazyVector {
            dictionary: Some(dictionary),
            state: LazyState::empty(),
        }
    }

    /// Create a zero vector that adopts the dictionary of its first term
    pub fn empty() -> Self {
        LazyVector {
            dictionary: None,
            state: LazyState::empty(),
        }
    }

    /// Create `weight * generator`
    pub fn from_term(generator: GeneratorRef, weight: f64) -> Self {
        let mut vector = LazyVector::empty();
        vector.add_weighted(generator, weight);
        vector
    }

    /// Whether the vector still holds unevaluated terms (or nothing at all)
    pub fn is_symbolic(&self) -> bool {
        matches!(self.state, LazyState::Symbolic { .. })
    }

    /// Number of distinct pending generators
    pub fn num_terms(&self) -> usize {
        match &self.state {
            LazyState::Symbolic { terms, .. } => terms.len(),
            LazyState::Materialized(_) => 0,
        }
    }

    /// Weight currently attached to `generator` (0 if absent)
    pub fn weight_of(&self, generator: &GeneratorRef) -> f64 {
        match &self.state {
            LazyState::Symbolic { terms, .. } => terms
                .iter()
                .find(|(term, _)| same_generator(term, generator))
                .map_or(0.0, |(_, weight)| *weight),
            LazyState::Materialized(_) => 0.0,
        }
    }

    /// Materialized content, if the vector has been forced and not extended since
    pub fn materialized(&self) -> Option<&Materialized> {
        match &self.state {
            LazyState::Materialized(materialized) => Some(materialized),
            LazyState::Symbolic { .. } => None,
        }
    }

    /// `self += weight * generator`, merging repeated generators by identity
    pub fn add_weighted(&mut self, generator: GeneratorRef, weight: f64) {
        if weight == 0.0 {
            return;
        }
        self.adopt_or_check(generator.dictionary());
        let terms = self.symbolic_terms();
        match terms.iter().position(|(term, _)| same_generator(term, &generator)) {
            Some(position) => {
                terms[position].1 += weight;
                if terms[position].1 == 0.0 {
                    terms.remove(position);
                }
            }
            None => terms.push((generator, weight)),
        }
    }

    /// `self += weight * other`, term by term
    pub fn add_weighted_lazy(&mut self, other: &LazyVector, weight: f64) {
        if weight == 0.0 {
            return;
        }
        self.adopt_or_check(other.dictionary.clone());
        let (other_base, other_terms) = match &other.state {
            LazyState::Symbolic { base, terms } => (base.as_ref(), terms.as_slice()),
            LazyState::Materialized(materialized) => (Some(materialized), &[][..]),
        };
        if let Some(other_base) = other_base {
            let dense = matches!(other_base, Materialized::Dense(_));
            other_base
                .as_generator()
                .add_weighted_to(self.base_mut(dense).as_target_mut(), weight);
        }
        for (generator, term_weight) in other_terms {
            self.add_weighted(Rc::clone(generator), weight * term_weight);
        }
    }

    /// Scale every term (and any materialized content) by `scalar`
    pub fn multiply_by_scalar(&mut self, scalar: f64) {
        if scalar == 0.0 {
            self.clear();
            return;
        }
        match &mut self.state {
            LazyState::Symbolic { base, terms } => {
                if let Some(base) = base {
                    scale(base, scalar);
                }
                for (_, weight) in terms.iter_mut() {
                    *weight *= scalar;
                }
            }
            LazyState::Materialized(materialized) => scale(materialized, scalar),
        }
    }

    /// Drop every term and materialized value (the dictionary is kept)
    pub fn clear(&mut self) {
        self.state = LazyState::empty();
    }

    /// Materialize, densely if any operand is dense
    pub fn force(&mut self) -> &Materialized {
        if self.prefers_dense() {
            self.force_dense();
        } else {
            self.force_sparse();
        }
        match &self.state {
            LazyState::Materialized(materialized) => materialized,
            LazyState::Symbolic { .. } => unreachable!("lazy vector was just materialized"),
        }
    }

    /// Materialize as a dense vector
    pub fn force_dense(&mut self) -> &DenseVector {
        let dense = match std::mem::replace(&mut self.state, LazyState::empty()) {
            LazyState::Materialized(Materialized::Dense(dense)) => dense,
            LazyState::Materialized(Materialized::Sparse(sparse)) => sparse.to_dense_vector(),
            LazyState::Symbolic { base, terms } => {
                let mut result = match base {
                    Some(Materialized::Dense(dense)) => dense,
                    Some(Materialized::Sparse(sparse)) => sparse.to_dense_vector(),
                    None => DenseVector::with_dictionary(self.dictionary.clone()),
                };
                for (generator, weight) in &terms {
                    generator.add_weighted_to(&mut result, *weight);
                }
                result
            }
        };
        self.state = LazyState::Materialized(Materialized::Dense(dense));
        match &self.state {
            LazyState::Materialized(Materialized::Dense(dense)) => dense,
            _ => unreachable!("lazy vector was just materialized as dense"),
        }
    }

    /// Materialize as a sparse vector
    pub fn force_sparse(&mut self) -> &SparseVector {
        if self.holds_dense_content() {
            tracing::warn!(
                dictionary = %self.dictionary.as_ref().map_or("", |d| d.name()),
                "converting dense content into a sparse vector"
            );
        }
        let sparse = match std::mem::replace(&mut self.state, LazyState::empty()) {
            LazyState::Materialized(Materialized::Sparse(sparse)) => sparse,
            LazyState::Materialized(Materialized::Dense(dense)) => dense.to_sparse_vector(),
            LazyState::Symbolic { base, terms } => {
                let mut result = match base {
                    Some(Materialized::Sparse(sparse)) => sparse,
                    Some(Materialized::Dense(dense)) => dense.to_sparse_vector(),
                    None => SparseVector::with_dictionary(self.dictionary.clone()),
                };
                for (generator, weight) in &terms {
                    generator.add_weighted_to(&mut result, *weight);
                }
                result
            }
        };
        self.state = LazyState::Materialized(Materialized::Sparse(sparse));
        match &self.state {
            LazyState::Materialized(Materialized::Sparse(sparse)) => sparse,
            _ => unreachable!("lazy vector was just materialized as sparse"),
        }
    }

    fn prefers_dense(&self) -> bool {
        match &self.state {
            LazyState::Materialized(materialized) => matches!(materialized, Materialized::Dense(_)),
            LazyState::Symbolic { base, terms } => {
                matches!(base, Some(Materialized::Dense(_)))
                    || terms.iter().any(|(generator, _)| generator.is_dense())
            }
        }
    }

    fn holds_dense_content(&self) -> bool {
        match &self.state {
            LazyState::Materialized(Materialized::Dense(dense)) => !dense.is_empty(),
            LazyState::Materialized(Materialized::Sparse(_)) => false,
            LazyState::Symbolic { base, terms } => {
                matches!(base, Some(Materialized::Dense(dense)) if !dense.is_empty())
                    || terms.iter().any(|(generator, _)| generator.is_dense())
            }
        }
    }

    fn adopt_or_check(&mut self, operand: Option<DictionaryRef>) {
        if let Some(operand) = operand {
            match &self.dictionary {
                Some(own) => check_same_dictionary(own, &operand),
                None => self.dictionary = Some(operand),
            }
        }
    }

    /// Switch back to symbolic form (keeping materialized content as base)
    fn symbolic_terms(&mut self) -> &mut Vec<(GeneratorRef, f64)> {
        if let LazyState::Materialized(_) = self.state {
            if let LazyState::Materialized(materialized) =
                std::mem::replace(&mut self.state, LazyState::empty())
            {
                self.state = LazyState::Symbolic {
                    base: Some(materialized),
                    terms: Vec::new(),
                };
            }
        }
        match &mut self.state {
            LazyState::Symbolic { terms, .. } => terms,
            LazyState::Materialized(_) => unreachable!("lazy vector was just made symbolic"),
        }
    }

    fn base_mut(&mut self, dense: bool) -> &mut Materialized {
        self.symbolic_terms();
        let dictionary = self.dictionary.clone();
        match &mut self.state {
            LazyState::Symbolic { base, .. } => {
                base.get_or_insert_with(|| Materialized::empty(dense, dictionary))
            }
            LazyState::Materialized(_) => unreachable!("lazy vector was just made symbolic"),
        }
    }

    /// Transient sum, used when a visitor must see each leaf exactly once
    fn evaluate(&self) -> Materialized {
        let mut copy = self.clone();
        copy.force().clone()
    }
}

fn scale(materialized: &mut Materialized, scalar: f64) {
    match materialized {
        Materialized::Dense(dense) => dense.multiply_by_scalar(scalar),
        Materialized::Sparse(sparse) => sparse.multiply_by_scalar(scalar),
    }
}

impl FeatureGenerator for LazyVector {
    fn dictionary(&self) -> Option<DictionaryRef> {
        self.dictionary.clone()
    }

    fn accept(&self, visitor: &mut dyn FeatureVisitor) {
        match &self.state {
            LazyState::Materialized(materialized) => materialized.as_generator().accept(visitor),
            LazyState::Symbolic { base: None, terms } if terms.is_empty() => {}
            LazyState::Symbolic { base: Some(base), terms } if terms.is_empty() => {
                base.as_generator().accept(visitor)
            }
            LazyState::Symbolic { .. } => self.evaluate().as_generator().accept(visitor),
        }
    }

    fn is_dense(&self) -> bool {
        self.prefers_dense()
    }

    fn as_lazy(&self) -> Option<&LazyVector> {
        Some(self)
    }

    fn scale_by(&self, weight: f64) -> Option<GeneratorRef> {
        let mut scaled = self.clone();
        scaled.multiply_by_scalar(weight);
        Some(Rc::new(scaled))
    }

    fn add_weighted_to(&self, target: &mut dyn AccumulationTarget, weight: f64) {
        if weight == 0.0 {
            return;
        }
        target.prepare_for(self.dictionary());
        match &self.state {
            LazyState::Materialized(materialized) => {
                materialized.as_generator().add_weighted_to(target, weight)
            }
            LazyState::Symbolic { base, terms } => {
                if let Some(base) = base {
                    base.as_generator().add_weighted_to(target, weight);
                }
                for (generator, term_weight) in terms {
                    generator.add_weighted_to(target, weight * term_weight);
                }
            }
        }
    }

    fn dot_product(&self, other: &dyn FeatureGenerator) -> f64 {
        if let Some(other_dictionary) = other.dictionary() {
            self.check_dictionary_equals(&other_dictionary);
        }
        match &self.state {
            LazyState::Materialized(materialized) => materialized.as_generator().dot_product(other),
            LazyState::Symbolic { base, terms } => {
                let base_product = base
                    .as_ref()
                    .map_or(0.0, |base| base.as_generator().dot_product(other));
                terms.iter().fold(base_product, |sum, (generator, weight)| {
                    sum + weight * generator.dot_product(other)
                })
            }
        }
    }
}

impl fmt::Debug for LazyVector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut debug = f.debug_struct("LazyVector");
        debug.field("dictionary", &self.dictionary.as_ref().map(|d| d.name().to_string()));
        match &self.state {
            LazyState::Symbolic { base, terms } => debug
                .field("base", base)
                .field("weights", &terms.iter().map(|(_, w)| *w).collect::<Vec<_>>()),
            LazyState::Materialized(materialized) => debug.field("materialized", materialized),
        };
        debug.finish()
    }
}

impl fmt::Display for LazyVector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_feature_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dictionary::FeatureDictionary;
    use crate::visitor::testing::UniqueVisitChecker;

    fn operands(dictionary: &DictionaryRef) -> (GeneratorRef, GeneratorRef) {
        let mut sparse = SparseVector::new(dictionary.clone());
        sparse.set_by_name("a", 1.0);
        sparse.sub_vector_by_name_mut("s").set_by_name("x", 2.0);
        let mut dense = DenseVector::new(dictionary.clone());
        dense.set_by_name("b", 3.0);
        dense.sub_vector_by_name_mut("s").set_by_name("x", -1.0);
        (Rc::new(sparse), Rc::new(dense))
    }

    #[test]
    fn test_terms_merge_by_identity() {
        let dictionary = FeatureDictionary::new("root");
        let (sparse, dense) = operands(&dictionary);
        let mut lazy = LazyVector::new(dictionary);
        lazy.add_weighted(Rc::clone(&sparse), 1.0);
        lazy.add_weighted(Rc::clone(&dense), 2.0);
        lazy.add_weighted(Rc::clone(&sparse), 0.5);
        assert_eq!(lazy.num_terms(), 2);
        assert_eq!(lazy.weight_of(&sparse), 1.5);

        lazy.add_weighted(Rc::clone(&dense), -2.0);
        assert_eq!(lazy.num_terms(), 1);
    }

    #[test]
    fn test_force_picks_dense_when_any_operand_is_dense() {
        let dictionary = FeatureDictionary::new("root");
        let (sparse, dense) = operands(&dictionary);
        let mut lazy = LazyVector::from_term(Rc::clone(&sparse), 2.0);
        assert!(matches!(lazy.force(), Materialized::Sparse(_)));

        lazy.add_weighted(dense, 1.0);
        assert!(lazy.is_symbolic());
        let forced = lazy.force_dense().clone();
        assert_eq!(forced.get_by_name("a"), 2.0);
        assert_eq!(forced.get_by_name("b"), 3.0);
        let scope = dictionary.find_scope("s").unwrap();
        assert_eq!(forced.sub_vector(scope).unwrap().get_by_name("x"), 3.0);
    }

    #[test]
    fn test_force_re_absorbs_previous_content() {
        let dictionary = FeatureDictionary::new("root");
        let (sparse, _) = operands(&dictionary);
        let mut lazy = LazyVector::from_term(Rc::clone(&sparse), 1.0);
        lazy.force_sparse();
        lazy.add_weighted(Rc::clone(&sparse), 1.0);
        let forced = lazy.force_sparse();
        assert_eq!(forced.get_by_name("a"), 2.0);
    }

    #[test]
    fn test_distributed_operations_match_materialized() {
        let dictionary = FeatureDictionary::new("root");
        let (sparse, dense) = operands(&dictionary);
        let mut lazy = LazyVector::new(dictionary.clone());
        lazy.add_weighted(Rc::clone(&sparse), 0.5);
        lazy.add_weighted(Rc::clone(&dense), -1.5);

        let mut distributed = DenseVector::default();
        lazy.add_weighted_to(&mut distributed, 2.0);
        let mut expected = lazy.clone().force_dense().clone();
        expected.multiply_by_scalar(2.0);
        assert_eq!(distributed, expected);

        let reference = dense.to_dense_vector();
        let materialized = lazy.clone().force_dense().dot_product(&reference);
        assert!((lazy.dot_product(&reference) - materialized).abs() < 1e-12);
        assert!((reference.dot_product(&lazy) - materialized).abs() < 1e-12);
    }

    #[test]
    fn test_overlapping_terms_are_visited_once() {
        let dictionary = FeatureDictionary::new("root");
        let (sparse, dense) = operands(&dictionary);
        let mut lazy = LazyVector::new(dictionary);
        lazy.add_weighted(sparse, 1.0);
        lazy.add_weighted(dense, 1.0);
        let mut checker = UniqueVisitChecker::default();
        lazy.accept(&mut checker);
        // a, b and the shared s.x leaf
        assert_eq!(checker.num_leaves, 3);
        assert_eq!(lazy.l1norm(), 1.0 + 3.0 + 1.0);
    }

    #[test]
    fn test_lazy_of_lazy_and_scaling() {
        let dictionary = FeatureDictionary::new("root");
        let (sparse, dense) = operands(&dictionary);
        let mut inner = LazyVector::from_term(Rc::clone(&sparse), 1.0);
        inner.force();
        inner.add_weighted(dense, 1.0);

        let mut outer = LazyVector::empty();
        outer.add_weighted_lazy(&inner, 2.0);
        outer.multiply_by_scalar(0.5);
        assert_eq!(outer.to_dense_vector(), inner.to_dense_vector());

        outer.multiply_by_scalar(0.0);
        assert_eq!(outer.l0norm(), 0);
    }

    #[test]
    #[should_panic(expected = "feature dictionary mismatch")]
    fn test_mixing_dictionaries_panics() {
        let (first, _) = operands(&FeatureDictionary::new("first"));
        let (second, _) = operands(&FeatureDictionary::new("second"));
        let mut lazy = LazyVector::from_term(first, 1.0);
        lazy.add_weighted(second, 1.0);
    }
}

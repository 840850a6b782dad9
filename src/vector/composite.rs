//! Generators built from other generators, one per scope or summed into one

use super::{multiply_by_scalar, DenseVector, FeatureGenerator, GeneratorRef, SparseVector};
use crate::dictionary::{check_same_dictionary, DictionaryRef};
use crate::visitor::{visit_scope, AccumulationTarget, FeatureVisitor};
use std::fmt;
use std::rc::Rc;

/// Ordered sub-generators, sub-generator `i` living under scope `i`
#[derive(Clone)]
pub struct CompositeFeatureGenerator {
    dictionary: DictionaryRef,
    sub_generators: Vec<Option<GeneratorRef>>,
}

impl CompositeFeatureGenerator {
    /// Create a composite with no sub-generator
    pub fn new(dictionary: DictionaryRef) -> Self {
        CompositeFeatureGenerator {
            dictionary,
            sub_generators: Vec::new(),
        }
    }

    /// Dictionary of the composite
    pub fn composite_dictionary(&self) -> &DictionaryRef {
        &self.dictionary
    }

    /// Number of scope slots (some may be empty)
    pub fn num_sub_generators(&self) -> usize {
        self.sub_generators.len()
    }

    /// Sub-generator of scope `scope`
    pub fn sub_generator(&self, scope: usize) -> Option<&GeneratorRef> {
        self.sub_generators.get(scope).and_then(Option::as_ref)
    }

    /// Iterate over `(scope, generator)` for every filled slot
    pub fn sub_generators(&self) -> impl Iterator<Item = (usize, &GeneratorRef)> + '_ {
        self.sub_generators
            .iter()
            .enumerate()
            .filter_map(|(scope, generator)| generator.as_ref().map(|g| (scope, g)))
    }

    /// Put `generator` under scope `scope`, binding the scope to its dictionary
    ///
    /// # Panics
    /// If the scope is already bound to another dictionary.
    pub fn set_sub_generator(&mut self, scope: usize, generator: GeneratorRef) {
        if let Some(child) = generator.dictionary() {
            self.dictionary.ensure_sub_dictionary(scope, child);
        }
        if self.sub_generators.len() <= scope {
            self.sub_generators.resize(scope + 1, None);
        }
        self.sub_generators[scope] = Some(generator);
    }

    /// Put `generator` under the scope called `name`, returning its index
    pub fn push_named(&mut self, name: &str, generator: GeneratorRef) -> usize {
        let scope = self.dictionary.get_or_add_scope(name);
        self.set_sub_generator(scope, generator);
        scope
    }

    /// Append `generator` under a scope named after its position
    pub fn append(&mut self, generator: GeneratorRef) -> usize {
        let name = self.sub_generators.len().to_string();
        self.push_named(&name, generator)
    }
}

impl FeatureGenerator for CompositeFeatureGenerator {
    fn dictionary(&self) -> Option<DictionaryRef> {
        Some(self.dictionary.clone())
    }

    fn accept(&self, visitor: &mut dyn FeatureVisitor) {
        for (scope, generator) in self.sub_generators() {
            visit_scope(visitor, &self.dictionary, scope, generator.as_ref());
        }
    }

    fn scale_by(&self, weight: f64) -> Option<GeneratorRef> {
        let mut scaled = CompositeFeatureGenerator::new(self.dictionary.clone());
        for (scope, generator) in self.sub_generators() {
            scaled.set_sub_generator(scope, multiply_by_scalar(Rc::clone(generator), weight));
        }
        Some(Rc::new(scaled))
    }
}

impl fmt::Debug for CompositeFeatureGenerator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CompositeFeatureGenerator")
            .field("dictionary", &self.dictionary.name())
            .field("num_sub_generators", &self.num_sub_generators())
            .finish()
    }
}

/// Generators of one shared dictionary, summed leaf by leaf
///
/// Operands may overlap, so traversal visits the materialized sum rather than
/// each operand (a leaf must be sensed once).
#[derive(Clone)]
pub struct SumFeatureGenerator {
    dictionary: DictionaryRef,
    generators: Vec<GeneratorRef>,
}

impl SumFeatureGenerator {
    /// Create an empty sum over `dictionary`
    pub fn new(dictionary: DictionaryRef) -> Self {
        SumFeatureGenerator {
            dictionary,
            generators: Vec::new(),
        }
    }

    /// Add an operand
    ///
    /// # Panics
    /// If the operand has a different dictionary.
    pub fn push(&mut self, generator: GeneratorRef) {
        if let Some(other) = generator.dictionary() {
            check_same_dictionary(&self.dictionary, &other);
        }
        self.generators.push(generator);
    }

    /// Number of operands
    pub fn num_generators(&self) -> usize {
        self.generators.len()
    }

    fn materialize(&self) -> Box<dyn FeatureGenerator> {
        if self.is_dense() {
            let mut sum = DenseVector::new(self.dictionary.clone());
            self.add_to(&mut sum);
            Box::new(sum)
        } else {
            let mut sum = SparseVector::new(self.dictionary.clone());
            self.add_to(&mut sum);
            Box::new(sum)
        }
    }
}

impl FeatureGenerator for SumFeatureGenerator {
    fn dictionary(&self) -> Option<DictionaryRef> {
        Some(self.dictionary.clone())
    }

    fn accept(&self, visitor: &mut dyn FeatureVisitor) {
        match self.generators.as_slice() {
            [] => {}
            [single] => single.accept(visitor),
            _ => self.materialize().accept(visitor),
        }
    }

    fn is_dense(&self) -> bool {
        self.generators.iter().any(|generator| generator.is_dense())
    }

    fn add_weighted_to(&self, target: &mut dyn AccumulationTarget, weight: f64) {
        if weight == 0.0 {
            return;
        }
        target.prepare_for(self.dictionary());
        for generator in &self.generators {
            generator.add_weighted_to(target, weight);
        }
    }

    fn dot_product(&self, other: &dyn FeatureGenerator) -> f64 {
        self.generators
            .iter()
            .map(|generator| generator.dot_product(other))
            .sum()
    }
}

impl fmt::Debug for SumFeatureGenerator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SumFeatureGenerator")
            .field("dictionary", &self.dictionary.name())
            .field("num_generators", &self.num_generators())
            .finish()
    }
}

/// A single generator placed under one scope of a parent dictionary
#[derive(Clone)]
pub struct SubFeatureGenerator {
    dictionary: DictionaryRef,
    scope: usize,
    generator: GeneratorRef,
}

impl SubFeatureGenerator {
    /// Place `generator` under scope `scope` of `dictionary`
    pub fn new(dictionary: DictionaryRef, scope: usize, generator: GeneratorRef) -> Self {
        if let Some(child) = generator.dictionary() {
            dictionary.ensure_sub_dictionary(scope, child);
        }
        SubFeatureGenerator {
            dictionary,
            scope,
            generator,
        }
    }

    /// Scope index in the parent dictionary
    pub fn scope(&self) -> usize {
        self.scope
    }

    /// The wrapped generator
    pub fn generator(&self) -> &GeneratorRef {
        &self.generator
    }
}

impl FeatureGenerator for SubFeatureGenerator {
    fn dictionary(&self) -> Option<DictionaryRef> {
        Some(self.dictionary.clone())
    }

    fn accept(&self, visitor: &mut dyn FeatureVisitor) {
        visit_scope(visitor, &self.dictionary, self.scope, self.generator.as_ref());
    }

    fn is_dense(&self) -> bool {
        self.generator.is_dense()
    }

    fn scale_by(&self, weight: f64) -> Option<GeneratorRef> {
        let scaled = multiply_by_scalar(Rc::clone(&self.generator), weight);
        Some(Rc::new(SubFeatureGenerator::new(self.dictionary.clone(), self.scope, scaled)))
    }
}

impl fmt::Debug for SubFeatureGenerator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SubFeatureGenerator")
            .field("dictionary", &self.dictionary.name())
            .field("scope", &self.scope)
            .finish()
    }
}

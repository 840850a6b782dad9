//! Constant generators: nothing at all, and the single bias feature

use super::{FeatureGenerator, GeneratorRef};
use crate::dictionary::{DictionaryRef, FeatureDictionary};
use crate::visitor::FeatureVisitor;
use std::rc::Rc;

thread_local! {
    static UNIT_DICTIONARY: DictionaryRef = FeatureDictionary::with_features("unit", ["unit"]);
}

/// Dictionary of [`UnitFeatureGenerator`]: one feature called `unit`
pub fn unit_dictionary() -> DictionaryRef {
    UNIT_DICTIONARY.with(Rc::clone)
}

/// Generator without any feature
#[derive(Clone, Copy, Debug, Default)]
pub struct EmptyFeatureGenerator;

impl EmptyFeatureGenerator {
    /// Shared handle on an empty generator
    pub fn shared() -> GeneratorRef {
        Rc::new(EmptyFeatureGenerator)
    }
}

impl FeatureGenerator for EmptyFeatureGenerator {
    fn dictionary(&self) -> Option<DictionaryRef> {
        None
    }

    fn accept(&self, _visitor: &mut dyn FeatureVisitor) {}

    fn scale_by(&self, _weight: f64) -> Option<GeneratorRef> {
        Some(EmptyFeatureGenerator::shared())
    }
}

/// Generator sensing the constant feature `unit = 1`, used as a bias term
#[derive(Clone, Debug)]
pub struct UnitFeatureGenerator {
    dictionary: DictionaryRef,
}

impl UnitFeatureGenerator {
    /// Create a unit generator over the per-thread unit dictionary
    pub fn new() -> Self {
        UnitFeatureGenerator {
            dictionary: unit_dictionary(),
        }
    }
}

impl Default for UnitFeatureGenerator {
    fn default() -> Self {
        UnitFeatureGenerator::new()
    }
}

impl FeatureGenerator for UnitFeatureGenerator {
    fn dictionary(&self) -> Option<DictionaryRef> {
        Some(self.dictionary.clone())
    }

    fn accept(&self, visitor: &mut dyn FeatureVisitor) {
        visitor.sense(&self.dictionary, 0, 1.0);
    }
}

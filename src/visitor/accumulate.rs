//! In-place weighted accumulation into sparse or dense targets

use super::FeatureVisitor;
use crate::dictionary::{check_same_dictionary, DictionaryRef};
use crate::vector::{DenseVector, SparseVector};

/// Path from a target's root to the current scope: (scope index, child dictionary)
pub type ScopePath = [(usize, DictionaryRef)];

/// A mutable vector that generators can be accumulated into
pub trait AccumulationTarget {
    /// Dictionary of the target, if it has adopted one yet
    fn target_dictionary(&self) -> Option<DictionaryRef>;

    /// Adopt `dictionary` (only called while the target has none)
    fn adopt_dictionary(&mut self, dictionary: DictionaryRef);

    /// Mutable slot of leaf `index` under `path`, creating missing scopes
    fn leaf_mut(&mut self, path: &ScopePath, index: usize) -> &mut f64;

    /// Downcast hook for dense/dense fast paths
    fn as_dense_mut(&mut self) -> Option<&mut DenseVector> {
        None
    }

    /// Downcast hook for sparse/sparse fast paths
    fn as_sparse_mut(&mut self) -> Option<&mut SparseVector> {
        None
    }

    /// Make the target commensurable with an operand dictionary
    ///
    /// A target without dictionary adopts the operand's (write-once); two
    /// different dictionaries are a contract violation.
    fn prepare_for(&mut self, operand: Option<DictionaryRef>) {
        if let Some(operand) = operand {
            match self.target_dictionary() {
                Some(own) => check_same_dictionary(&own, &operand),
                None => self.adopt_dictionary(operand),
            }
        }
    }
}

/// What an [`Accumulator`] adds for each sensed value
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AccumulationMode {
    /// `weight * value`
    Values,
    /// `weight * sign(value)`, used by l1 sub-gradient steps
    Signs,
}

/// `sign(x)` with `sign(0) = 0`
pub fn sign(value: f64) -> f64 {
    if value > 0.0 {
        1.0
    } else if value < 0.0 {
        -1.0
    } else {
        0.0
    }
}

/// Adds every sensed leaf, weighted, into an [`AccumulationTarget`]
pub struct Accumulator<'a> {
    target: &'a mut dyn AccumulationTarget,
    path: Vec<(usize, DictionaryRef)>,
    weight: f64,
    mode: AccumulationMode,
}

impl<'a> Accumulator<'a> {
    /// Create an accumulator writing into `target`
    pub fn new(
        target: &'a mut dyn AccumulationTarget,
        weight: f64,
        mode: AccumulationMode,
    ) -> Self {
        Accumulator {
            target,
            path: Vec::new(),
            weight,
            mode,
        }
    }
}

impl FeatureVisitor for Accumulator<'_> {
    fn enter_scope(&mut self, dictionary: &DictionaryRef, scope: usize) -> bool {
        self.path.push((scope, dictionary.sub_dictionary(scope)));
        true
    }

    fn sense(&mut self, _dictionary: &DictionaryRef, index: usize, value: f64) {
        let delta = match self.mode {
            AccumulationMode::Values => self.weight * value,
            AccumulationMode::Signs => self.weight * sign(value),
        };
        *self.target.leaf_mut(&self.path, index) += delta;
    }

    fn leave_scope(&mut self) {
        self.path.pop();
    }
}

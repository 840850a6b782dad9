//! Generic traversal protocol over feature generators
//!
//! Every numerical operation on feature vectors is written once as a
//! [`FeatureVisitor`] and works for every representation that can drive a
//! traversal over itself: sparse, dense, lazy and composite generators.
//!
//! Traversal is pre-order depth-first. Each scope index and each leaf index is
//! visited at most once per traversal; summation-based visitors (norms, dot
//! products, accumulation) silently double count otherwise.

mod render;
mod norms;
mod accumulate;
mod dot_product;
mod enumerate;

use crate::dictionary::DictionaryRef;
use crate::vector::FeatureGenerator;

pub use render::StringRenderer;
pub use norms::NormStatistics;
pub use accumulate::{Accumulator, AccumulationMode, AccumulationTarget, ScopePath, sign};
pub use dot_product::{DotProductVisitor, ScopedLookup};
pub use enumerate::{FeatureEnumerator, SnapshotBuilder};

/// Receiver of a depth-first traversal over a feature generator
pub trait FeatureVisitor {
    /// Enter sub-scope `scope` of `dictionary`; returning false prunes the subtree
    fn enter_scope(&mut self, dictionary: &DictionaryRef, scope: usize) -> bool;

    /// Observe the (nonzero) value of leaf feature `index` of `dictionary`
    fn sense(&mut self, dictionary: &DictionaryRef, index: usize, value: f64);

    /// Leave the scope entered last
    fn leave_scope(&mut self);
}

/// Traverse `generator` as sub-scope `scope` of `dictionary`
///
/// Wraps enter / traverse / leave, skipping the traversal when the visitor
/// prunes the scope.
pub fn visit_scope(
    visitor: &mut dyn FeatureVisitor,
    dictionary: &DictionaryRef,
    scope: usize,
    generator: &dyn FeatureGenerator,
) {
    if visitor.enter_scope(dictionary, scope) {
        generator.accept(visitor);
        visitor.leave_scope();
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use std::collections::HashSet;

    /// Records every visited leaf and scope, failing on duplicates
    #[derive(Default)]
    pub(crate) struct UniqueVisitChecker {
        path: Vec<usize>,
        seen_leaves: HashSet<(Vec<usize>, usize)>,
        seen_scopes: HashSet<Vec<usize>>,
        pub(crate) num_leaves: usize,
    }

    impl FeatureVisitor for UniqueVisitChecker {
        fn enter_scope(&mut self, _dictionary: &DictionaryRef, scope: usize) -> bool {
            self.path.push(scope);
            assert!(
                self.seen_scopes.insert(self.path.clone()),
                "scope {:?} visited twice",
                self.path
            );
            true
        }

        fn sense(&mut self, _dictionary: &DictionaryRef, index: usize, _value: f64) {
            assert!(
                self.seen_leaves.insert((self.path.clone(), index)),
                "leaf {} in scope {:?} visited twice",
                index,
                self.path
            );
            self.num_leaves += 1;
        }

        fn leave_scope(&mut self) {
            self.path.pop();
        }
    }
}

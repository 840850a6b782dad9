//! Name-based views of a generator: flat feature table and snapshot tree

use super::FeatureVisitor;
use crate::dictionary::DictionaryRef;
use crate::vector::{ScopeSnapshot, VectorSnapshot};

/// Lists every leaf as a dot-separated, scope-qualified name with its value
#[derive(Debug, Default)]
pub struct FeatureEnumerator {
    path: Vec<String>,
    features: Vec<(String, f64)>,
}

impl FeatureEnumerator {
    /// Create an empty enumerator
    pub fn new() -> Self {
        FeatureEnumerator::default()
    }

    /// Collected `(qualified name, value)` rows in traversal order
    pub fn into_features(self) -> Vec<(String, f64)> {
        self.features
    }
}

impl FeatureVisitor for FeatureEnumerator {
    fn enter_scope(&mut self, dictionary: &DictionaryRef, scope: usize) -> bool {
        self.path.push(dictionary.scope_name(scope));
        true
    }

    fn sense(&mut self, dictionary: &DictionaryRef, index: usize, value: f64) {
        let name = dictionary.feature_name(index);
        let qualified = if self.path.is_empty() {
            name
        } else {
            format!("{}.{}", self.path.join("."), name)
        };
        self.features.push((qualified, value));
    }

    fn leave_scope(&mut self) {
        self.path.pop();
    }
}

/// Builds a [`VectorSnapshot`] tree keyed by names instead of indices
#[derive(Debug)]
pub struct SnapshotBuilder {
    stack: Vec<(String, VectorSnapshot)>,
}

impl SnapshotBuilder {
    /// Start a snapshot for a generator whose root dictionary is named `dictionary`
    pub fn new(dictionary: &str) -> Self {
        SnapshotBuilder {
            stack: vec![(String::new(), VectorSnapshot::new(dictionary))],
        }
    }

    /// Finish the traversal and return the root snapshot
    pub fn finish(mut self) -> VectorSnapshot {
        // Unbalanced traversals only happen if a generator misbehaves; fold what is left.
        while self.stack.len() > 1 {
            self.leave_scope();
        }
        self.stack
            .pop()
            .map(|(_, snapshot)| snapshot)
            .unwrap_or_default()
    }
}

impl FeatureVisitor for SnapshotBuilder {
    fn enter_scope(&mut self, dictionary: &DictionaryRef, scope: usize) -> bool {
        let child = dictionary.sub_dictionary(scope);
        self.stack
            .push((dictionary.scope_name(scope), VectorSnapshot::new(child.name())));
        true
    }

    fn sense(&mut self, dictionary: &DictionaryRef, index: usize, value: f64) {
        if let Some((_, current)) = self.stack.last_mut() {
            current.features.push((dictionary.feature_name(index), value));
        }
    }

    fn leave_scope(&mut self) {
        if let Some((name, vector)) = self.stack.pop() {
            if vector.is_empty() {
                return;
            }
            if let Some((_, parent)) = self.stack.last_mut() {
                parent.scopes.push(ScopeSnapshot { name, vector });
            }
        }
    }
}

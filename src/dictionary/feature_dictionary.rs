//! Tree-shaped naming scheme shared by feature vectors of the same shape

use super::StringDictionary;
use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

/// Shared handle on a [`FeatureDictionary`]
///
/// Vectors of the same shape alias one dictionary instance; identity of the
/// handle (not structural equality) decides whether two vectors are combinable.
pub type DictionaryRef = Rc<FeatureDictionary>;

/// Naming tree: leaf-feature names, sub-scope names and one child dictionary
/// per scope.
///
/// The dictionary grows lazily and never shrinks. It is single-threaded by
/// construction (`Rc` + `RefCell`); every borrow is released before a method
/// returns, so it can be grown while vectors referencing it are traversed.
pub struct FeatureDictionary {
    name: String,
    features: RefCell<StringDictionary>,
    scopes: RefCell<StringDictionary>,
    sub_dictionaries: RefCell<Vec<Option<DictionaryRef>>>,
}

impl FeatureDictionary {
    /// Create a new, empty, shared dictionary
    pub fn new(name: impl Into<String>) -> DictionaryRef {
        Rc::new(FeatureDictionary {
            name: name.into(),
            features: RefCell::new(StringDictionary::new()),
            scopes: RefCell::new(StringDictionary::new()),
            sub_dictionaries: RefCell::new(Vec::new()),
        })
    }

    /// Create a flat dictionary with the given feature names
    pub fn with_features<I, S>(name: impl Into<String>, features: I) -> DictionaryRef
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let dictionary = FeatureDictionary::new(name);
        for feature in features {
            dictionary.get_or_add_feature(feature);
        }
        dictionary
    }

    /// Dictionary name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Check if no feature nor scope has been registered
    pub fn is_empty(&self) -> bool {
        self.num_features() == 0 && self.num_scopes() == 0
    }

    /// Number of leaf features
    pub fn num_features(&self) -> usize {
        self.features.borrow().len()
    }

    /// Number of sub-scopes
    pub fn num_scopes(&self) -> usize {
        self.scopes.borrow().len()
    }

    /// Get the index of a leaf feature, registering it on first sight
    pub fn get_or_add_feature(&self, name: impl Into<String>) -> usize {
        let name = name.into();
        let (index, added) = self.features.borrow_mut().add(name.as_str());
        if added {
            tracing::trace!(dictionary = %self.name, feature = %name, index, "new feature");
        }
        index
    }

    /// Get the index of a sub-scope, registering it on first sight
    pub fn get_or_add_scope(&self, name: impl Into<String>) -> usize {
        let name = name.into();
        let (index, added) = self.scopes.borrow_mut().add(name.as_str());
        if added {
            tracing::trace!(dictionary = %self.name, scope = %name, index, "new scope");
        }
        index
    }

    /// Register a scope bound to an existing child dictionary
    ///
    /// # Panics
    /// If the scope is already bound to a different dictionary.
    pub fn add_scope(&self, name: impl Into<String>, sub_dictionary: DictionaryRef) -> usize {
        let index = self.get_or_add_scope(name);
        self.ensure_sub_dictionary(index, sub_dictionary);
        index
    }

    /// Index of an already known feature
    pub fn find_feature(&self, name: &str) -> Option<usize> {
        self.features.borrow().find(name)
    }

    /// Index of an already known scope
    pub fn find_scope(&self, name: &str) -> Option<usize> {
        self.scopes.borrow().find(name)
    }

    /// Name of the feature at `index`
    ///
    /// # Panics
    /// If no feature has been registered at `index`.
    pub fn feature_name(&self, index: usize) -> String {
        match self.features.borrow().get(index) {
            Some(name) => name.to_string(),
            None => panic!(
                "dictionary '{}' has no feature at index {} ({} features)",
                self.name,
                index,
                self.num_features()
            ),
        }
    }

    /// Name of the scope at `index`
    ///
    /// # Panics
    /// If no scope has been registered at `index`.
    pub fn scope_name(&self, index: usize) -> String {
        match self.scopes.borrow().get(index) {
            Some(name) => name.to_string(),
            None => panic!(
                "dictionary '{}' has no scope at index {} ({} scopes)",
                self.name,
                index,
                self.num_scopes()
            ),
        }
    }

    /// Child dictionary of scope `index`, created empty on first access
    pub fn sub_dictionary(&self, index: usize) -> DictionaryRef {
        if let Some(Some(existing)) = self.sub_dictionaries.borrow().get(index) {
            return Rc::clone(existing);
        }
        let child_name = match self.scopes.borrow().get(index) {
            Some(scope) => format!("{}.{}", self.name, scope),
            None => format!("{}.{}", self.name, index),
        };
        let child = FeatureDictionary::new(child_name);
        self.set_sub_dictionary(index, Rc::clone(&child));
        child
    }

    /// Child dictionary of a named scope (the scope is registered if needed)
    pub fn sub_dictionary_by_name(&self, name: &str) -> DictionaryRef {
        let index = self.get_or_add_scope(name);
        self.sub_dictionary(index)
    }

    /// Child dictionary of scope `index` if it was already created
    pub fn existing_sub_dictionary(&self, index: usize) -> Option<DictionaryRef> {
        self.sub_dictionaries.borrow().get(index).cloned().flatten()
    }

    /// Bind scope `index` to `sub_dictionary` unless it is already bound
    ///
    /// # Panics
    /// If the scope is bound to a different dictionary instance.
    pub fn ensure_sub_dictionary(&self, index: usize, sub_dictionary: DictionaryRef) {
        match self.existing_sub_dictionary(index) {
            Some(existing) => check_same_dictionary(&existing, &sub_dictionary),
            None => self.set_sub_dictionary(index, sub_dictionary),
        }
    }

    fn set_sub_dictionary(&self, index: usize, sub_dictionary: DictionaryRef) {
        let mut children = self.sub_dictionaries.borrow_mut();
        if children.len() <= index {
            children.resize(index + 1, None);
        }
        children[index] = Some(sub_dictionary);
    }

    fn fmt_recursive(&self, f: &mut fmt::Formatter<'_>, indent: usize) -> fmt::Result {
        let padding = "  ".repeat(indent);
        writeln!(f, "{}{}", padding, self.name)?;
        let features = self.features.borrow();
        if !features.is_empty() {
            let joined = features.iter().collect::<Vec<_>>().join(", ");
            writeln!(f, "{}  features: {}", padding, joined)?;
        }
        let num_scopes = self.num_scopes();
        for index in 0..num_scopes {
            writeln!(f, "{}  [{}]", padding, self.scope_name(index))?;
            if let Some(child) = self.existing_sub_dictionary(index) {
                child.fmt_recursive(f, indent + 2)?;
            }
        }
        Ok(())
    }
}

/// Check if two dictionary handles designate the same instance
pub fn same_dictionary(a: &DictionaryRef, b: &DictionaryRef) -> bool {
    Rc::ptr_eq(a, b)
}

/// Assert that two handles designate the same dictionary instance
///
/// # Panics
/// On mismatch: combining vectors of different shapes is a programming error.
pub fn check_same_dictionary(a: &DictionaryRef, b: &DictionaryRef) {
    assert!(
        same_dictionary(a, b),
        "feature dictionary mismatch: '{}' vs '{}'",
        a.name(),
        b.name()
    );
}

impl fmt::Debug for FeatureDictionary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FeatureDictionary")
            .field("name", &self.name)
            .field("num_features", &self.num_features())
            .field("num_scopes", &self.num_scopes())
            .finish()
    }
}

impl fmt::Display for FeatureDictionary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.fmt_recursive(f, 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lazy_growth() {
        let dictionary = FeatureDictionary::new("root");
        assert!(dictionary.is_empty());
        assert_eq!(dictionary.get_or_add_feature("a"), 0);
        assert_eq!(dictionary.get_or_add_feature("b"), 1);
        assert_eq!(dictionary.get_or_add_feature("a"), 0);
        assert_eq!(dictionary.get_or_add_scope("child"), 0);
        assert_eq!(dictionary.num_features(), 2);
        assert_eq!(dictionary.num_scopes(), 1);
        assert_eq!(dictionary.feature_name(1), "b");
        assert_eq!(dictionary.find_feature("c"), None);
    }

    #[test]
    fn test_sub_dictionary_is_created_once() {
        let dictionary = FeatureDictionary::new("root");
        let scope = dictionary.get_or_add_scope("child");
        assert!(dictionary.existing_sub_dictionary(scope).is_none());

        let first = dictionary.sub_dictionary(scope);
        let second = dictionary.sub_dictionary(scope);
        assert!(same_dictionary(&first, &second));
        assert_eq!(first.name(), "root.child");
        assert!(same_dictionary(&first, &dictionary.sub_dictionary_by_name("child")));
    }

    #[test]
    fn test_shared_sub_dictionary() {
        let alternative = FeatureDictionary::with_features("alternative", ["x", "y"]);
        let example = FeatureDictionary::new("example");
        let first = example.add_scope("0", Rc::clone(&alternative));
        let second = example.add_scope("1", Rc::clone(&alternative));
        assert_eq!((first, second), (0, 1));
        assert!(same_dictionary(&example.sub_dictionary(0), &example.sub_dictionary(1)));

        // Re-binding the identical child is accepted
        example.ensure_sub_dictionary(0, alternative);
    }

    #[test]
    #[should_panic(expected = "feature dictionary mismatch")]
    fn test_conflicting_sub_dictionary_panics() {
        let example = FeatureDictionary::new("example");
        example.add_scope("0", FeatureDictionary::new("a"));
        example.add_scope("0", FeatureDictionary::new("b"));
    }

    #[test]
    #[should_panic(expected = "has no feature at index 3")]
    fn test_unknown_index_panics() {
        let dictionary = FeatureDictionary::with_features("flat", ["x"]);
        dictionary.feature_name(3);
    }

    #[test]
    fn test_display_tree() {
        let dictionary = FeatureDictionary::with_features("root", ["bias"]);
        dictionary.sub_dictionary_by_name("words").get_or_add_feature("hello");
        let rendered = dictionary.to_string();
        assert!(rendered.starts_with("root\n"));
        assert!(rendered.contains("features: bias"));
        assert!(rendered.contains("[words]"));
        assert!(rendered.contains("features: hello"));
    }
}

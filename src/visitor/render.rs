//! Human-readable rendering of feature generators

use super::FeatureVisitor;
use crate::dictionary::DictionaryRef;

/// Renders `name = value` entries, comma-joined per scope, indented one level
/// per depth. Scopes are introduced by a `name:` header line.
///
/// A header is only written once something is sensed below it, so scopes
/// without content do not show up.
#[derive(Debug)]
pub struct StringRenderer {
    lines: Vec<String>,
    pending: Vec<Vec<String>>,
    /// Header of each entered scope, taken when written
    headers: Vec<Option<String>>,
}

impl StringRenderer {
    /// Create a renderer positioned at the root scope
    pub fn new() -> Self {
        StringRenderer {
            lines: Vec::new(),
            pending: vec![Vec::new()],
            headers: Vec::new(),
        }
    }

    /// Finish the traversal and return the rendered text
    pub fn finish(mut self) -> String {
        self.flush();
        self.lines.join("\n")
    }

    fn depth(&self) -> usize {
        self.pending.len().saturating_sub(1)
    }

    fn flush(&mut self) {
        let indent = "  ".repeat(self.depth());
        if let Some(entries) = self.pending.last_mut() {
            if !entries.is_empty() {
                self.lines.push(format!("{}{}", indent, entries.join(", ")));
                entries.clear();
            }
        }
    }

    fn write_headers(&mut self) {
        for (depth, header) in self.headers.iter_mut().enumerate() {
            if let Some(name) = header.take() {
                self.lines.push(format!("{}{}:", "  ".repeat(depth), name));
            }
        }
    }
}

impl Default for StringRenderer {
    fn default() -> Self {
        StringRenderer::new()
    }
}

impl FeatureVisitor for StringRenderer {
    fn enter_scope(&mut self, dictionary: &DictionaryRef, scope: usize) -> bool {
        self.flush();
        self.headers.push(Some(dictionary.scope_name(scope)));
        self.pending.push(Vec::new());
        true
    }

    fn sense(&mut self, dictionary: &DictionaryRef, index: usize, value: f64) {
        self.write_headers();
        let entry = format!("{} = {}", dictionary.feature_name(index), value);
        if let Some(entries) = self.pending.last_mut() {
            entries.push(entry);
        }
    }

    fn leave_scope(&mut self) {
        self.flush();
        self.pending.pop();
        self.headers.pop();
    }
}

#[cfg(test)]
mod tests {
    use crate::dictionary::FeatureDictionary;
    use crate::vector::{FeatureGenerator, SparseVector};

    #[test]
    fn test_render_nested() {
        let dictionary = FeatureDictionary::new("root");
        let mut vector = SparseVector::new(dictionary.clone());
        vector.set_by_name("a", 1.0);
        vector.set_by_name("b", -2.5);
        vector.sub_vector_by_name_mut("inner").set_by_name("x", 3.0);

        assert_eq!(vector.to_feature_string(), "a = 1, b = -2.5\ninner:\n  x = 3");
    }

    #[test]
    fn test_render_empty() {
        let vector = SparseVector::new(FeatureDictionary::new("root"));
        assert_eq!(vector.to_feature_string(), "");
    }

    #[test]
    fn test_render_skips_empty_scopes() {
        let dictionary = FeatureDictionary::new("root");
        let mut vector = SparseVector::new(dictionary);
        vector.set_by_name("a", 1.0);
        vector.sub_vector_by_name_mut("empty");
        vector
            .sub_vector_by_name_mut("outer")
            .sub_vector_by_name_mut("inner")
            .set_by_name("x", 2.0);
        assert_eq!(vector.to_feature_string(), "a = 1\nouter:\n  inner:\n    x = 2");
    }
}

use std::collections::HashSet;

/// An instrumentation-attached marker on a runtime value, carrying zero or
/// more symbolic labels.
///
/// Labels are stored sorted and deduplicated, so two tags compare equal
/// exactly when their label sets are equal.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct Tag {
    labels: Vec<String>,
}

impl Tag {
    /// A tag with no labels. Never user-symbolic.
    pub fn empty() -> Self {
        Tag::default()
    }

    /// A tag carrying a single label.
    pub fn of(label: impl Into<String>) -> Self {
        Tag {
            labels: vec![label.into()],
        }
    }

    /// A tag carrying the given labels, sorted and deduplicated.
    pub fn with_labels<I, S>(labels: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut labels: Vec<String> = labels.into_iter().map(Into::into).collect();
        labels.sort();
        labels.dedup();
        Tag { labels }
    }

    pub fn labels(&self) -> &[String] {
        &self.labels
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }
}

/// The set of labels registered as user-symbolic.
///
/// The registry is the sole authority on whether a comparison event should
/// produce a constraint: the recorder consults it and never guesses from
/// value identity.
#[derive(Debug, Default)]
pub struct LabelRegistry {
    labels: HashSet<String>,
}

impl LabelRegistry {
    pub fn new() -> Self {
        LabelRegistry::default()
    }

    pub fn add(&mut self, label: impl Into<String>) {
        self.labels.insert(label.into());
    }

    pub fn clear(&mut self) {
        self.labels.clear();
    }

    pub fn contains(&self, label: &str) -> bool {
        self.labels.contains(label)
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    /// A tag is user-symbolic iff any of its labels is registered.
    pub fn is_user_symbolic(&self, tag: &Tag) -> bool {
        tag.labels().iter().any(|label| self.contains(label))
    }

    /// The first registered label on `tag`, if any.
    pub fn registered_label<'t>(&self, tag: &'t Tag) -> Option<&'t str> {
        tag.labels()
            .iter()
            .map(String::as_str)
            .find(|label| self.contains(label))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tags_compare_by_label_set() {
        let a = Tag::with_labels(["x", "y"]);
        let b = Tag::with_labels(["y", "x"]);
        let c = Tag::with_labels(["y", "x", "x"]);
        assert_eq!(a, b);
        assert_eq!(a, c);
        assert_ne!(a, Tag::of("x"));
    }

    #[test]
    fn empty_tag_is_never_user_symbolic() {
        let mut registry = LabelRegistry::new();
        registry.add("x");
        assert!(!registry.is_user_symbolic(&Tag::empty()));
    }

    #[test]
    fn tag_is_user_symbolic_iff_intersection_nonempty() {
        let mut registry = LabelRegistry::new();
        registry.add("x");

        assert!(registry.is_user_symbolic(&Tag::of("x")));
        assert!(registry.is_user_symbolic(&Tag::with_labels(["unrelated", "x"])));
        assert!(!registry.is_user_symbolic(&Tag::of("unrelated")));
    }

    #[test]
    fn clear_empties_the_registry() {
        let mut registry = LabelRegistry::new();
        registry.add("x");
        registry.add("y");
        assert_eq!(registry.len(), 2);

        registry.clear();
        assert!(registry.is_empty());
        assert!(!registry.is_user_symbolic(&Tag::of("x")));
    }

    #[test]
    fn registered_label_picks_a_registered_one() {
        let mut registry = LabelRegistry::new();
        registry.add("y");
        let tag = Tag::with_labels(["a", "y"]);
        assert_eq!(registry.registered_label(&tag), Some("y"));
        assert_eq!(registry.registered_label(&Tag::of("a")), None);
    }
}

//! Closed set of spending categories
//!
//! The categorizer may only ever answer with a member of this set. One member
//! is designated as the fallback label ("Other" by default) and is returned
//! when the explicit low-margin policy fires.

use serde::Serialize;

use crate::error::{Error, Result};

/// Default spending categories, in display order
pub const DEFAULT_CATEGORIES: &[&str] = &[
    "Food & Dining",
    "Transportation",
    "Entertainment",
    "Shopping",
    "Utilities",
    "Health & Fitness",
    "Travel",
    "Other",
];

/// Default fallback label
pub const DEFAULT_FALLBACK: &str = "Other";

/// Ordered, closed set of category labels
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CategorySet {
    labels: Vec<String>,
    fallback: usize,
}

impl CategorySet {
    /// Build a category set, validating that labels are non-empty, unique,
    /// and include the fallback label
    pub fn new<S: AsRef<str>>(labels: &[S], fallback: &str) -> Result<Self> {
        let labels: Vec<String> = labels
            .iter()
            .map(|l| l.as_ref().trim().to_string())
            .collect();

        if labels.is_empty() {
            return Err(Error::Config("category set must not be empty".into()));
        }

        for (i, label) in labels.iter().enumerate() {
            if label.is_empty() {
                return Err(Error::Config(format!("category #{} is blank", i)));
            }
            if labels[..i].contains(label) {
                return Err(Error::Config(format!("duplicate category: {}", label)));
            }
        }

        let fallback = labels
            .iter()
            .position(|l| l == fallback)
            .ok_or_else(|| {
                Error::Config(format!(
                    "fallback category '{}' is not in the category set",
                    fallback
                ))
            })?;

        Ok(Self { labels, fallback })
    }

    pub fn labels(&self) -> &[String] {
        &self.labels
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    pub fn fallback(&self) -> &str {
        &self.labels[self.fallback]
    }

    pub fn contains(&self, label: &str) -> bool {
        self.labels.iter().any(|l| l == label)
    }

    pub fn get(&self, index: usize) -> Option<&str> {
        self.labels.get(index).map(String::as_str)
    }
}

impl Default for CategorySet {
    fn default() -> Self {
        Self {
            labels: DEFAULT_CATEGORIES.iter().map(|s| s.to_string()).collect(),
            fallback: DEFAULT_CATEGORIES.len() - 1,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_set() {
        let set = CategorySet::default();
        assert_eq!(set.len(), 8);
        assert_eq!(set.fallback(), "Other");
        assert!(set.contains("Travel"));
        assert_eq!(set.get(0), Some("Food & Dining"));
    }

    #[test]
    fn test_rejects_missing_fallback() {
        let err = CategorySet::new(&["Food", "Travel"], "Other").unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn test_rejects_duplicates_and_blanks() {
        assert!(CategorySet::new(&["Food", "Food", "Other"], "Other").is_err());
        assert!(CategorySet::new(&["Food", "  ", "Other"], "Other").is_err());
        assert!(CategorySet::new::<&str>(&[], "Other").is_err());
    }

    #[test]
    fn test_trims_labels() {
        let set = CategorySet::new(&[" Food ", "Misc"], "Misc").unwrap();
        assert_eq!(set.labels(), &["Food".to_string(), "Misc".to_string()]);
        assert_eq!(set.fallback(), "Misc");
    }
}

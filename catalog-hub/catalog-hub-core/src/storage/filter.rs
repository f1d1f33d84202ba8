use super::document::Document;
use serde_json::Value;

/// Predicate over dotted document paths.
///
/// Comparisons are type-strict: `1` and `"1"` are different values. A
/// missing field compares equal to `null`.
#[derive(Clone, Debug, PartialEq)]
pub enum Filter {
    Eq(String, Value),
    NotNull(String),
    /// Every value is an element of the array found at the path.
    AllIn(Vec<Value>, String),
    And(Vec<Filter>),
    Or(Vec<Filter>),
}

impl Filter {
    pub fn eq(path: impl Into<String>, value: impl Into<Value>) -> Self {
        Filter::Eq(path.into(), value.into())
    }

    pub fn not_null(path: impl Into<String>) -> Self {
        Filter::NotNull(path.into())
    }

    pub fn all_in(values: Vec<Value>, path: impl Into<String>) -> Self {
        Filter::AllIn(values, path.into())
    }

    pub fn and(self, other: Filter) -> Self {
        match self {
            Filter::And(mut all) => {
                all.push(other);
                Filter::And(all)
            }
            first => Filter::And(vec![first, other]),
        }
    }

    pub fn or(self, other: Filter) -> Self {
        match self {
            Filter::Or(mut any) => {
                any.push(other);
                Filter::Or(any)
            }
            first => Filter::Or(vec![first, other]),
        }
    }

    pub fn matches(&self, doc: &Document) -> bool {
        match self {
            Filter::Eq(path, expected) => doc.get_path(path).unwrap_or(&Value::Null) == expected,
            Filter::NotNull(path) => doc.get_path(path).is_some_and(|v| !v.is_null()),
            Filter::AllIn(needles, path) => match doc.get_path(path) {
                Some(Value::Array(haystack)) => needles.iter().all(|n| haystack.contains(n)),
                _ => false,
            },
            Filter::And(all) => all.iter().all(|f| f.matches(doc)),
            Filter::Or(any) => any.iter().any(|f| f.matches(doc)),
        }
    }
}

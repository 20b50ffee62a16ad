//! Filter expression trees and their evaluation.
//!
//! A [`Filter`] is an immutable boolean predicate over a set of component
//! names. Filters are built either from the combinator functions
//! ([`require_all`], [`require_any`], [`reject_all`], [`reject_any`]) or
//! compiled once from a pattern string ([`Filter::parse`]), and evaluate
//! with no side effects — the same tree can be shared by any number of
//! systems.

use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::parser::{ParseError, Parser};

/// Errors produced while constructing a filter.
#[derive(Debug, Clone, Error)]
pub enum FilterError {
    #[error("malformed filter pattern: {0}")]
    Parse(#[from] ParseError),
}

/// Anything a filter can be evaluated against: an entity's component bag,
/// a system's tag set, or a plain name list in tests.
pub trait ComponentSet {
    /// Returns `true` if a component with the given name is present.
    fn has_component(&self, name: &str) -> bool;
}

impl<V> ComponentSet for HashMap<String, V> {
    fn has_component(&self, name: &str) -> bool {
        self.contains_key(name)
    }
}

impl ComponentSet for HashSet<String> {
    fn has_component(&self, name: &str) -> bool {
        self.contains(name)
    }
}

impl ComponentSet for [&str] {
    fn has_component(&self, name: &str) -> bool {
        self.contains(&name)
    }
}

/// An immutable boolean membership predicate over component presence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Filter {
    /// True iff the named component is present.
    Component(String),
    /// True iff every term is true. Empty list is vacuously true.
    All(Vec<Filter>),
    /// True iff at least one term is true. Empty list is false.
    Any(Vec<Filter>),
    /// Logical negation of the inner filter.
    Not(Box<Filter>),
}

impl Filter {
    /// Compile a pattern string into a filter tree.
    ///
    /// Tokens are maximal runs of `[A-Za-z0-9_]`, each naming a required
    /// component. Operators: `!` (prefix NOT) binds tightest, then `&`
    /// (AND), then `|` (OR); both binary operators are left-associative
    /// and parentheses override. ASCII whitespace is permitted between
    /// any tokens.
    ///
    /// Compilation happens once; the returned tree evaluates without
    /// reparsing and may be shared freely.
    ///
    /// # Errors
    ///
    /// Returns [`FilterError::Parse`] for malformed input: an empty
    /// pattern, dangling operators, unbalanced or empty parentheses, or
    /// stray characters.
    pub fn parse(pattern: &str) -> Result<Self, FilterError> {
        Ok(Parser::parse(pattern)?)
    }

    /// Evaluate the filter against a component set.
    ///
    /// A pure, short-circuiting boolean reduction over the tree.
    #[must_use]
    pub fn matches<S: ComponentSet + ?Sized>(&self, set: &S) -> bool {
        match self {
            Filter::Component(name) => set.has_component(name),
            Filter::All(terms) => terms.iter().all(|t| t.matches(set)),
            Filter::Any(terms) => terms.iter().any(|t| t.matches(set)),
            Filter::Not(inner) => !inner.matches(set),
        }
    }
}

impl From<&str> for Filter {
    fn from(name: &str) -> Self {
        Filter::Component(name.to_string())
    }
}

impl From<String> for Filter {
    fn from(name: String) -> Self {
        Filter::Component(name)
    }
}

/// Selects entities that have all of the given components and filters.
pub fn require_all<I, F>(terms: I) -> Filter
where
    I: IntoIterator<Item = F>,
    F: Into<Filter>,
{
    Filter::All(terms.into_iter().map(Into::into).collect())
}

/// Selects entities that have at least one of the given components and
/// filters.
pub fn require_any<I, F>(terms: I) -> Filter
where
    I: IntoIterator<Item = F>,
    F: Into<Filter>,
{
    Filter::Any(terms.into_iter().map(Into::into).collect())
}

/// Rejects entities that have all of the given components and filters,
/// selecting every other entity.
pub fn reject_all<I, F>(terms: I) -> Filter
where
    I: IntoIterator<Item = F>,
    F: Into<Filter>,
{
    Filter::Not(Box::new(require_all(terms)))
}

/// Rejects entities that have at least one of the given components and
/// filters, selecting every other entity.
pub fn reject_any<I, F>(terms: I) -> Filter
where
    I: IntoIterator<Item = F>,
    F: Into<Filter>,
{
    Filter::Not(Box::new(require_any(terms)))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn set(names: &[&str]) -> HashSet<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_require_all() {
        let f = require_all(["a", "b"]);
        assert!(f.matches(&set(&["a", "b"])));
        assert!(f.matches(&set(&["a", "b", "c"])));
        assert!(!f.matches(&set(&["a"])));
        assert!(!f.matches(&set(&[])));
    }

    #[test]
    fn test_require_any() {
        let f = require_any(["a", "b"]);
        assert!(f.matches(&set(&["a"])));
        assert!(f.matches(&set(&["b", "c"])));
        assert!(!f.matches(&set(&["c"])));
        assert!(!f.matches(&set(&[])));
    }

    #[test]
    fn test_reject_all() {
        // True iff at least one term is absent.
        let f = reject_all(["a", "b"]);
        assert!(!f.matches(&set(&["a", "b"])));
        assert!(f.matches(&set(&["a"])));
        assert!(f.matches(&set(&[])));
    }

    #[test]
    fn test_reject_any() {
        // True iff every term is absent.
        let f = reject_any(["a", "b"]);
        assert!(f.matches(&set(&["c"])));
        assert!(f.matches(&set(&[])));
        assert!(!f.matches(&set(&["a"])));
        assert!(!f.matches(&set(&["a", "b"])));
    }

    #[test]
    fn test_empty_term_lists() {
        assert!(require_all(Vec::<Filter>::new()).matches(&set(&[])));
        assert!(!require_any(Vec::<Filter>::new()).matches(&set(&[])));
        assert!(!reject_all(Vec::<Filter>::new()).matches(&set(&[])));
        assert!(reject_any(Vec::<Filter>::new()).matches(&set(&[])));
    }

    #[test]
    fn test_nested_filters_as_terms() {
        // a AND NOT (b OR c)
        let f = require_all([Filter::from("a"), reject_any(["b", "c"])]);
        assert!(f.matches(&set(&["a"])));
        assert!(!f.matches(&set(&["a", "b"])));
        assert!(!f.matches(&set(&["a", "c"])));
        assert!(!f.matches(&set(&["d"])));
    }

    #[test]
    fn test_matches_component_map() {
        let mut bag: HashMap<String, u32> = HashMap::new();
        bag.insert("position".to_string(), 1);
        let f = require_all(["position"]);
        assert!(f.matches(&bag));
        assert!(!require_all(["velocity"]).matches(&bag));
    }

    #[test]
    fn test_matches_str_slice() {
        let f = Filter::parse("a&!b").unwrap();
        assert!(f.matches(&["a"][..]));
        assert!(!f.matches(&["a", "b"][..]));
    }

    #[test]
    fn test_parsed_and_not() {
        let f = Filter::parse("a&!b").unwrap();
        assert!(f.matches(&set(&["a"])));
        assert!(f.matches(&set(&["a", "c"])));
        assert!(!f.matches(&set(&["a", "b"])));
        assert!(!f.matches(&set(&["b"])));
        assert!(!f.matches(&set(&[])));
    }

    #[test]
    fn test_parsed_or_group_truth_table() {
        // a|(b&c): exhaustive over presence of {a, b, c}.
        let f = Filter::parse("a|(b&c)").unwrap();
        for mask in 0u8..8 {
            let mut names = Vec::new();
            if mask & 1 != 0 {
                names.push("a");
            }
            if mask & 2 != 0 {
                names.push("b");
            }
            if mask & 4 != 0 {
                names.push("c");
            }
            let expected = mask & 1 != 0 || (mask & 2 != 0 && mask & 4 != 0);
            assert_eq!(f.matches(&set(&names)), expected, "mask {mask:#05b}");
        }
    }

    #[test]
    fn test_shared_reuse() {
        let f = Filter::parse("a&b").unwrap();
        let g = f.clone();
        assert_eq!(f.matches(&set(&["a", "b"])), g.matches(&set(&["a", "b"])));
        assert_eq!(f, g);
    }
}

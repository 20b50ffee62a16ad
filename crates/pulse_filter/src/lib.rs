//! # pulse_filter
//!
//! Boolean component-membership filters for the pulse ECS kernel.
//!
//! A filter decides whether an entity belongs to a system by looking only
//! at which named components the entity carries; component values never
//! participate. Filters come from two places:
//!
//! - the combinators [`require_all`], [`require_any`], [`reject_all`] and
//!   [`reject_any`], whose terms are component names or other filters;
//! - the pattern language compiled by [`Filter::parse`], e.g. `"a&!b"` or
//!   `"a|(b&c&d)|e"`.
//!
//! Both produce the same immutable [`Filter`] tree, which evaluates any
//! [`ComponentSet`] with no side effects and can be shared across systems.

pub mod filter;
pub mod lexer;
pub mod parser;

pub use filter::{
    reject_all, reject_any, require_all, require_any, ComponentSet, Filter, FilterError,
};
pub use parser::ParseError;

/// Compile a pattern string into a [`Filter`]. Shorthand for
/// [`Filter::parse`].
///
/// # Errors
///
/// Returns [`FilterError::Parse`] for malformed input.
pub fn parse(pattern: &str) -> Result<Filter, FilterError> {
    Filter::parse(pattern)
}

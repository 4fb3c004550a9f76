#![forbid(unsafe_code)]

//! Query constraint model, full-text expressions, and traversal.

/// Immutable query object model.
///
/// Selectors, operands, constraints, join conditions, orderings, limits and
/// set operations, each built through a validating constructor.
pub mod model;

/// Full-text search expression parser and term tree.
pub mod fulltext;

/// Visitors over the query model: breadth-first navigation, canonical
/// rendering, and selector collection.
pub mod visit;

pub use fulltext::{ParseError, Term};
pub use model::ModelError;
pub use visit::{readable, visit_all, AstNode, Visitable, Visitor};

//! Penumbra: query constraint model and property indexes for a content
//! repository.
//!
//! The crate is split along the path a query takes:
//!
//! * [`query`] holds the immutable constraint model, the full-text
//!   expression parser, and visitors that walk, render and inspect queries;
//! * [`value`] defines typed property values and the per-type factories that
//!   convert and compare them;
//! * [`index`] stores property values per node and answers constraints with
//!   exact counts and lazily batched, scored results.

#![warn(missing_docs)]

pub mod config;
pub mod error;
pub mod index;
pub mod query;
pub mod value;

pub use config::{ConfigError, IndexOptions, TextOptions};
pub use error::{IndexError, Result};
pub use index::{
    Index, IndexConstraints, IndexDefinition, IndexKind, NodeKey, Parameters, PropertyIndex,
    ResultBatch, Results,
};
pub use value::{PropertyType, TypeSystem, Value};

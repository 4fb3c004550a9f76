#![forbid(unsafe_code)]

//! Property indexes answering query constraints.
//!
//! An [`Index`] stores the values of a fixed set of properties per node key
//! and evaluates constraints from [`crate::query::model`] against them:
//!
//! * writes are staged and published atomically by [`Index::commit`];
//! * every constraint except `NOT` matches a multi-valued property when at
//!   least one of its values satisfies it;
//! * [`Index::estimate_cardinality`] is exact and agrees with the number of
//!   rows [`Index::filter`] yields for the same constraints;
//! * cursors returned by [`Index::filter`] read the snapshot committed when
//!   they were created, in node key order.

mod compile;
mod cursor;
mod definition;
mod engine;
mod matcher;
mod persist;
mod staging;
mod store;
mod text;

use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::query::model::Constraint;
use crate::value::Value;

pub use cursor::{drain, ResultBatch, Results};
pub use definition::{
    ColumnDefinition, IndexDefinition, IndexKind, DEPTH_COLUMN, LOCAL_NAME_COLUMN, NAME_COLUMN,
    PATH_COLUMN,
};
pub use engine::PropertyIndex;
pub use persist::SNAPSHOT_EXTENSION;

/// Identifier of an indexed node.
#[derive(Clone, Debug, Eq, PartialEq, Ord, PartialOrd, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeKey(String);

impl NodeKey {
    /// Wraps `key`.
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    /// Key text.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for NodeKey {
    fn from(key: &str) -> Self {
        Self(key.to_owned())
    }
}

impl From<String> for NodeKey {
    fn from(key: String) -> Self {
        Self(key)
    }
}

impl AsRef<str> for NodeKey {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for NodeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Values bound to `$variable`s, keyed by name without the `$`.
pub type Parameters = HashMap<String, Value>;

/// Constraints routed to one index, all of which must hold, plus the bind
/// variable values they refer to.
#[derive(Clone, Debug, Default)]
pub struct IndexConstraints {
    /// Conjunction to evaluate; empty matches every indexed node.
    pub constraints: Vec<Constraint>,
    /// Bind variable values.
    pub parameters: Parameters,
}

impl IndexConstraints {
    /// Constraints without bind variables.
    pub fn new(constraints: impl IntoIterator<Item = Constraint>) -> Self {
        Self {
            constraints: constraints.into_iter().collect(),
            parameters: Parameters::new(),
        }
    }

    /// Binds `$name` to `value`.
    pub fn bind(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.parameters.insert(name.into(), value.into());
        self
    }
}

/// A queryable, mutable index.
///
/// All methods take `&self`; implementations synchronize internally. Once
/// [`Index::shutdown`] has been called, every fallible method returns
/// [`crate::IndexError::Closed`].
pub trait Index: Send + Sync {
    /// Index name.
    fn name(&self) -> &str;

    /// Definition fixed at construction.
    fn definition(&self) -> &IndexDefinition;

    /// Layout of the index.
    fn kind(&self) -> IndexKind;

    /// Stages `value` as the only value of `property` on `key`.
    fn add(&self, key: &NodeKey, property: &str, value: Value) -> Result<()>;

    /// Stages `values` as the values of `property` on `key`, replacing any
    /// committed ones. An empty list stages the property's removal.
    fn add_values(&self, key: &NodeKey, property: &str, values: Vec<Value>) -> Result<()>;

    /// Stages removal of every property of `key`.
    fn remove(&self, key: &NodeKey) -> Result<()>;

    /// Stages removal of one property of `key`.
    fn remove_property(&self, key: &NodeKey, property: &str) -> Result<()>;

    /// Publishes staged changes in the order they were made.
    fn commit(&self) -> Result<()>;

    /// Drops committed and staged data.
    fn clear_all_data(&self) -> Result<()>;

    /// Closes the index. With `persist`, the committed snapshot is written
    /// and synced first; staged changes are always discarded.
    fn shutdown(&self, persist: bool) -> Result<()>;

    /// Exact number of nodes holding at least one committed value.
    fn estimate_total_count(&self) -> Result<usize>;

    /// True until data has been committed to, or restored into, this index.
    fn requires_reindexing(&self) -> bool;

    /// Exact number of nodes satisfying every constraint.
    fn estimate_cardinality(
        &self,
        constraints: &[Constraint],
        parameters: &Parameters,
    ) -> Result<usize>;

    /// Lazy cursor over the nodes satisfying `constraints`.
    /// `cardinality_hint` is advisory.
    fn filter(
        &self,
        constraints: &IndexConstraints,
        cardinality_hint: usize,
    ) -> Result<Box<dyn Results>>;
}

//! Immutable query object model.
//!
//! Nodes are built once through validating constructors and never change
//! afterwards. Equality and hashing are structural. Traversal lives in
//! [`crate::query::visit`].

mod command;
mod constraint;
mod operand;
mod selector;

use thiserror::Error;

pub use command::{
    Column, Limit, Order, Ordering, Query, QueryCommand, SetOperation, SetQuery, Subquery,
};
pub use constraint::{
    And, Between, ChildNode, Comparison, Constraint, DescendantNode, FullTextSearch, Not,
    Operator, Or, PropertyExistence, Relike, SameNode, SetCriteria,
};
pub use operand::{
    BindVariableName, DynamicOperand, FullTextSearchScore, Length, Literal, LowerCase,
    NodeDepth, NodeLocalName, NodeName, NodePath, PropertyValue, ReferenceValue,
    StaticOperand, UpperCase,
};
pub use selector::{
    AllNodes, ChildNodeJoinCondition, DescendantNodeJoinCondition, EquiJoinCondition, Join,
    JoinCondition, JoinType, SameNodeJoinCondition, Selector, SelectorName, Source,
};

/// Construction failures for model nodes.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ModelError {
    /// A required string was empty or whitespace.
    #[error("{0} must not be blank")]
    Blank(&'static str),
    /// A required collection was empty.
    #[error("{0} must not be empty")]
    Empty(&'static str),
}

fn non_blank(value: String, what: &'static str) -> Result<String, ModelError> {
    if value.trim().is_empty() {
        Err(ModelError::Blank(what))
    } else {
        Ok(value)
    }
}

/// Tears `root` down without one stack frame per level. `detach` moves the
/// nested children of a node that themselves nest into `pending`, leaving
/// flat stand-ins in their place.
fn drop_tree<T>(root: &mut T, detach: impl Fn(&mut T, &mut Vec<T>)) {
    let mut pending = Vec::new();
    detach(root, &mut pending);
    while let Some(mut node) = pending.pop() {
        detach(&mut node, &mut pending);
    }
}

use smallvec::SmallVec;

use crate::query::model::{
    AllNodes, And, Between, BindVariableName, ChildNode, ChildNodeJoinCondition, Column,
    Comparison, Constraint, DescendantNode, DescendantNodeJoinCondition, DynamicOperand,
    EquiJoinCondition, FullTextSearch, FullTextSearchScore, Join, JoinCondition, Length, Limit,
    Literal, LowerCase, NodeDepth, NodeLocalName, NodeName, NodePath, Not, Or, Ordering,
    PropertyExistence, PropertyValue, Query, QueryCommand, ReferenceValue, Relike, SameNode,
    SameNodeJoinCondition, Selector, SetCriteria, SetQuery, Source, StaticOperand, Subquery,
    UpperCase,
};

use super::Visitable;

/// Borrowed view of any node in a query tree.
///
/// The set of variants is closed: a visitor matches the kinds it handles and
/// ignores the rest with a wildcard arm.
#[derive(Clone, Copy, Debug)]
pub enum AstNode<'a> {
    /// Query.
    Query(&'a Query),
    /// Set query.
    SetQuery(&'a SetQuery),
    /// Subquery.
    Subquery(&'a Subquery),
    /// Named selector.
    Selector(&'a Selector),
    /// All-nodes source.
    AllNodes(&'a AllNodes),
    /// Join.
    Join(&'a Join),
    /// Equi-join condition.
    EquiJoinCondition(&'a EquiJoinCondition),
    /// Same-node join condition.
    SameNodeJoinCondition(&'a SameNodeJoinCondition),
    /// Child-node join condition.
    ChildNodeJoinCondition(&'a ChildNodeJoinCondition),
    /// Descendant-node join condition.
    DescendantNodeJoinCondition(&'a DescendantNodeJoinCondition),
    /// Output column.
    Column(&'a Column),
    /// Sort key.
    Ordering(&'a Ordering),
    /// Limit.
    Limit(&'a Limit),
    /// Literal.
    Literal(&'a Literal),
    /// Bind variable.
    BindVariableName(&'a BindVariableName),
    /// Property value.
    PropertyValue(&'a PropertyValue),
    /// Reference value.
    ReferenceValue(&'a ReferenceValue),
    /// Length.
    Length(&'a Length),
    /// Lower case.
    LowerCase(&'a LowerCase),
    /// Upper case.
    UpperCase(&'a UpperCase),
    /// Node depth.
    NodeDepth(&'a NodeDepth),
    /// Node path.
    NodePath(&'a NodePath),
    /// Node name.
    NodeName(&'a NodeName),
    /// Node local name.
    NodeLocalName(&'a NodeLocalName),
    /// Full-text score.
    FullTextSearchScore(&'a FullTextSearchScore),
    /// Conjunction.
    And(&'a And),
    /// Disjunction.
    Or(&'a Or),
    /// Negation.
    Not(&'a Not),
    /// Comparison.
    Comparison(&'a Comparison),
    /// Range test.
    Between(&'a Between),
    /// Membership test.
    SetCriteria(&'a SetCriteria),
    /// Property existence.
    PropertyExistence(&'a PropertyExistence),
    /// Full-text search.
    FullTextSearch(&'a FullTextSearch),
    /// Same node.
    SameNode(&'a SameNode),
    /// Child node.
    ChildNode(&'a ChildNode),
    /// Descendant node.
    DescendantNode(&'a DescendantNode),
    /// Reverse LIKE.
    Relike(&'a Relike),
}

impl<'a> AstNode<'a> {
    /// Structural children, left to right.
    ///
    /// A query yields its source, columns, constraint and orderings; the limit
    /// is a property of the query rather than a walked child.
    pub fn children(&self) -> SmallVec<[AstNode<'a>; 4]> {
        let mut out = SmallVec::new();
        match *self {
            AstNode::Query(query) => {
                out.push(query.source().as_node());
                out.extend(query.columns().iter().map(AstNode::Column));
                if let Some(constraint) = query.constraint() {
                    out.push(constraint.as_node());
                }
                out.extend(query.orderings().iter().map(AstNode::Ordering));
            }
            AstNode::SetQuery(query) => {
                out.push(query.left().as_node());
                out.push(query.right().as_node());
            }
            AstNode::Subquery(subquery) => out.push(subquery.query().as_node()),
            AstNode::Join(join) => {
                out.push(join.left().as_node());
                out.push(join.condition().as_node());
                out.push(join.right().as_node());
            }
            AstNode::Ordering(ordering) => out.push(ordering.operand().as_node()),
            AstNode::Length(length) => out.push(AstNode::PropertyValue(length.property_value())),
            AstNode::LowerCase(lower) => out.push(lower.operand().as_node()),
            AstNode::UpperCase(upper) => out.push(upper.operand().as_node()),
            AstNode::And(and) => {
                out.push(and.left().as_node());
                out.push(and.right().as_node());
            }
            AstNode::Or(or) => {
                out.push(or.left().as_node());
                out.push(or.right().as_node());
            }
            AstNode::Not(not) => out.push(not.constraint().as_node()),
            AstNode::Comparison(comparison) => {
                out.push(comparison.operand1().as_node());
                out.push(comparison.operand2().as_node());
            }
            AstNode::Between(between) => {
                out.push(between.operand().as_node());
                out.push(between.lower().as_node());
                out.push(between.upper().as_node());
            }
            AstNode::SetCriteria(criteria) => {
                out.push(criteria.left().as_node());
                out.extend(criteria.right().iter().map(Visitable::as_node));
            }
            AstNode::Relike(relike) => {
                out.push(relike.operand1().as_node());
                out.push(AstNode::PropertyValue(relike.operand2()));
            }
            AstNode::Selector(_)
            | AstNode::AllNodes(_)
            | AstNode::EquiJoinCondition(_)
            | AstNode::SameNodeJoinCondition(_)
            | AstNode::ChildNodeJoinCondition(_)
            | AstNode::DescendantNodeJoinCondition(_)
            | AstNode::Column(_)
            | AstNode::Limit(_)
            | AstNode::Literal(_)
            | AstNode::BindVariableName(_)
            | AstNode::PropertyValue(_)
            | AstNode::ReferenceValue(_)
            | AstNode::NodeDepth(_)
            | AstNode::NodePath(_)
            | AstNode::NodeName(_)
            | AstNode::NodeLocalName(_)
            | AstNode::FullTextSearchScore(_)
            | AstNode::PropertyExistence(_)
            | AstNode::FullTextSearch(_)
            | AstNode::SameNode(_)
            | AstNode::ChildNode(_)
            | AstNode::DescendantNode(_) => {}
        }
        out
    }

    /// Kind name, e.g. `"Comparison"`.
    pub fn kind(&self) -> &'static str {
        match self {
            AstNode::Query(_) => "Query",
            AstNode::SetQuery(_) => "SetQuery",
            AstNode::Subquery(_) => "Subquery",
            AstNode::Selector(_) => "Selector",
            AstNode::AllNodes(_) => "AllNodes",
            AstNode::Join(_) => "Join",
            AstNode::EquiJoinCondition(_) => "EquiJoinCondition",
            AstNode::SameNodeJoinCondition(_) => "SameNodeJoinCondition",
            AstNode::ChildNodeJoinCondition(_) => "ChildNodeJoinCondition",
            AstNode::DescendantNodeJoinCondition(_) => "DescendantNodeJoinCondition",
            AstNode::Column(_) => "Column",
            AstNode::Ordering(_) => "Ordering",
            AstNode::Limit(_) => "Limit",
            AstNode::Literal(_) => "Literal",
            AstNode::BindVariableName(_) => "BindVariableName",
            AstNode::PropertyValue(_) => "PropertyValue",
            AstNode::ReferenceValue(_) => "ReferenceValue",
            AstNode::Length(_) => "Length",
            AstNode::LowerCase(_) => "LowerCase",
            AstNode::UpperCase(_) => "UpperCase",
            AstNode::NodeDepth(_) => "NodeDepth",
            AstNode::NodePath(_) => "NodePath",
            AstNode::NodeName(_) => "NodeName",
            AstNode::NodeLocalName(_) => "NodeLocalName",
            AstNode::FullTextSearchScore(_) => "FullTextSearchScore",
            AstNode::And(_) => "And",
            AstNode::Or(_) => "Or",
            AstNode::Not(_) => "Not",
            AstNode::Comparison(_) => "Comparison",
            AstNode::Between(_) => "Between",
            AstNode::SetCriteria(_) => "SetCriteria",
            AstNode::PropertyExistence(_) => "PropertyExistence",
            AstNode::FullTextSearch(_) => "FullTextSearch",
            AstNode::SameNode(_) => "SameNode",
            AstNode::ChildNode(_) => "ChildNode",
            AstNode::DescendantNode(_) => "DescendantNode",
            AstNode::Relike(_) => "Relike",
        }
    }
}

impl<'n> Visitable for AstNode<'n> {
    fn as_node(&self) -> AstNode<'_> {
        *self
    }
}

macro_rules! struct_visitable {
    ($($ty:ident),* $(,)?) => {
        $(
            impl Visitable for $ty {
                fn as_node(&self) -> AstNode<'_> {
                    AstNode::$ty(self)
                }
            }
        )*
    };
}

struct_visitable!(
    Query,
    SetQuery,
    Subquery,
    Selector,
    AllNodes,
    Join,
    EquiJoinCondition,
    SameNodeJoinCondition,
    ChildNodeJoinCondition,
    DescendantNodeJoinCondition,
    Column,
    Ordering,
    Limit,
    Literal,
    BindVariableName,
    PropertyValue,
    ReferenceValue,
    Length,
    LowerCase,
    UpperCase,
    NodeDepth,
    NodePath,
    NodeName,
    NodeLocalName,
    FullTextSearchScore,
    And,
    Or,
    Not,
    Comparison,
    Between,
    SetCriteria,
    PropertyExistence,
    FullTextSearch,
    SameNode,
    ChildNode,
    DescendantNode,
    Relike,
);

impl Visitable for QueryCommand {
    fn as_node(&self) -> AstNode<'_> {
        match self {
            QueryCommand::Query(q) => AstNode::Query(q),
            QueryCommand::SetQuery(q) => AstNode::SetQuery(q),
        }
    }
}

impl Visitable for Source {
    fn as_node(&self) -> AstNode<'_> {
        match self {
            Source::Selector(s) => AstNode::Selector(s),
            Source::AllNodes(s) => AstNode::AllNodes(s),
            Source::Join(j) => AstNode::Join(j),
        }
    }
}

impl Visitable for JoinCondition {
    fn as_node(&self) -> AstNode<'_> {
        match self {
            JoinCondition::Equi(c) => AstNode::EquiJoinCondition(c),
            JoinCondition::SameNode(c) => AstNode::SameNodeJoinCondition(c),
            JoinCondition::ChildNode(c) => AstNode::ChildNodeJoinCondition(c),
            JoinCondition::DescendantNode(c) => AstNode::DescendantNodeJoinCondition(c),
        }
    }
}

impl Visitable for StaticOperand {
    fn as_node(&self) -> AstNode<'_> {
        match self {
            StaticOperand::Literal(l) => AstNode::Literal(l),
            StaticOperand::BindVariable(v) => AstNode::BindVariableName(v),
            StaticOperand::Subquery(s) => AstNode::Subquery(s),
        }
    }
}

impl Visitable for DynamicOperand {
    fn as_node(&self) -> AstNode<'_> {
        match self {
            DynamicOperand::PropertyValue(o) => AstNode::PropertyValue(o),
            DynamicOperand::ReferenceValue(o) => AstNode::ReferenceValue(o),
            DynamicOperand::Length(o) => AstNode::Length(o),
            DynamicOperand::LowerCase(o) => AstNode::LowerCase(o),
            DynamicOperand::UpperCase(o) => AstNode::UpperCase(o),
            DynamicOperand::NodeDepth(o) => AstNode::NodeDepth(o),
            DynamicOperand::NodePath(o) => AstNode::NodePath(o),
            DynamicOperand::NodeName(o) => AstNode::NodeName(o),
            DynamicOperand::NodeLocalName(o) => AstNode::NodeLocalName(o),
            DynamicOperand::FullTextSearchScore(o) => AstNode::FullTextSearchScore(o),
        }
    }
}

impl Visitable for Constraint {
    fn as_node(&self) -> AstNode<'_> {
        match self {
            Constraint::And(c) => AstNode::And(c),
            Constraint::Or(c) => AstNode::Or(c),
            Constraint::Not(c) => AstNode::Not(c),
            Constraint::Comparison(c) => AstNode::Comparison(c),
            Constraint::Between(c) => AstNode::Between(c),
            Constraint::SetCriteria(c) => AstNode::SetCriteria(c),
            Constraint::PropertyExistence(c) => AstNode::PropertyExistence(c),
            Constraint::FullTextSearch(c) => AstNode::FullTextSearch(c),
            Constraint::SameNode(c) => AstNode::SameNode(c),
            Constraint::ChildNode(c) => AstNode::ChildNode(c),
            Constraint::DescendantNode(c) => AstNode::DescendantNode(c),
            Constraint::Relike(c) => AstNode::Relike(c),
        }
    }
}

use std::fmt;

use crate::query::model::{
    Column, Constraint, DynamicOperand, JoinCondition, Limit, Ordering, Query, QueryCommand,
    Source, StaticOperand,
};
use crate::value::{PropertyType, TypeSystem, Value};

use super::{AstNode, Visitable, Visitor};

enum Piece<'a> {
    Node(AstNode<'a>),
    Text(&'a str),
    Keyword(&'static str),
    Owned(String),
}

/// Renders query trees as canonical text.
///
/// Pending output is kept on an explicit stack, so rendering works on trees
/// of any depth. Rendering the same tree twice produces identical text.
pub struct ReadableVisitor<'a> {
    out: String,
    stack: Vec<Piece<'a>>,
    types: &'a TypeSystem,
}

impl<'a> ReadableVisitor<'a> {
    /// Renderer using the standard type system for literals.
    pub fn new() -> Self {
        Self::with_types(TypeSystem::standard())
    }

    /// Renderer using `types` to format literals.
    pub fn with_types(types: &'a TypeSystem) -> Self {
        Self {
            out: String::new(),
            stack: Vec::new(),
            types,
        }
    }

    /// Text rendered so far.
    pub fn as_str(&self) -> &str {
        &self.out
    }

    /// Consumes the renderer, returning its text.
    pub fn into_string(self) -> String {
        self.out
    }

    fn render(&mut self, root: AstNode<'a>) {
        self.stack.push(Piece::Node(root));
        let mut parts = Vec::new();
        while let Some(piece) = self.stack.pop() {
            match piece {
                Piece::Text(text) => self.out.push_str(text),
                Piece::Keyword(text) => self.out.push_str(text),
                Piece::Owned(text) => self.out.push_str(&text),
                Piece::Node(node) => {
                    self.expand(node, &mut parts);
                    self.stack.extend(parts.drain(..).rev());
                }
            }
        }
    }

    fn literal(&self, value: &Value) -> String {
        let text = self.types.factory(PropertyType::String).as_string(value);
        match value {
            Value::String(_) => format!("'{text}'"),
            Value::Path(_) => format!("CAST({text} AS {})", PropertyType::Path),
            Value::Name(_) => format!("CAST({text} AS {})", PropertyType::Name),
            other => format!("CAST('{text}' AS {})", other.property_type()),
        }
    }

    fn expand(&self, node: AstNode<'a>, parts: &mut Vec<Piece<'a>>) {
        use Piece::{Keyword as K, Node as N, Owned as O, Text as T};
        match node {
            AstNode::Query(query) => {
                parts.push(K("SELECT "));
                if query.is_distinct() {
                    parts.push(K("DISTINCT "));
                }
                if query.columns().is_empty() {
                    parts.push(K("*"));
                }
                for (i, column) in query.columns().iter().enumerate() {
                    if i > 0 {
                        parts.push(K(", "));
                    }
                    parts.push(N(AstNode::Column(column)));
                }
                parts.push(K(" FROM "));
                parts.push(N(query.source().as_node()));
                if let Some(constraint) = query.constraint() {
                    parts.push(K(" WHERE "));
                    parts.push(N(constraint.as_node()));
                }
                for (i, ordering) in query.orderings().iter().enumerate() {
                    parts.push(K(if i == 0 { " ORDER BY " } else { ", " }));
                    parts.push(N(AstNode::Ordering(ordering)));
                }
                if !query.limit().is_unlimited() {
                    parts.push(K(" "));
                    parts.push(N(AstNode::Limit(query.limit())));
                }
            }
            AstNode::SetQuery(query) => {
                parts.push(N(query.left().as_node()));
                parts.push(K(" "));
                parts.push(K(query.operation().symbol()));
                parts.push(K(" "));
                if query.is_all() {
                    parts.push(K("ALL "));
                }
                parts.push(N(query.right().as_node()));
            }
            AstNode::Subquery(subquery) => {
                parts.push(K("("));
                parts.push(N(subquery.query().as_node()));
                parts.push(K(")"));
            }
            AstNode::Selector(selector) => {
                parts.push(T(selector.name().as_str()));
                if let Some(alias) = selector.alias() {
                    parts.push(K(" AS "));
                    parts.push(T(alias.as_str()));
                }
            }
            AstNode::AllNodes(all) => {
                parts.push(T(all.name().as_str()));
                if let Some(alias) = all.alias() {
                    parts.push(K(" AS "));
                    parts.push(T(alias.as_str()));
                }
            }
            AstNode::Join(join) => {
                parts.push(N(join.left().as_node()));
                parts.push(K(" "));
                parts.push(K(join.join_type().symbol()));
                parts.push(K(" "));
                parts.push(N(join.right().as_node()));
                parts.push(K(" ON "));
                parts.push(N(join.condition().as_node()));
            }
            AstNode::EquiJoinCondition(c) => {
                parts.extend([
                    T(c.selector1().as_str()),
                    K("."),
                    T(c.property1()),
                    K(" = "),
                    T(c.selector2().as_str()),
                    K("."),
                    T(c.property2()),
                ]);
            }
            AstNode::SameNodeJoinCondition(c) => {
                parts.extend([
                    K("ISSAMENODE("),
                    T(c.selector1().as_str()),
                    K(","),
                    T(c.selector2().as_str()),
                ]);
                if let Some(path) = c.selector2_path() {
                    parts.extend([K(",'"), T(path), K("'")]);
                }
                parts.push(K(")"));
            }
            AstNode::ChildNodeJoinCondition(c) => {
                parts.extend([
                    K("ISCHILDNODE("),
                    T(c.child().as_str()),
                    K(","),
                    T(c.parent().as_str()),
                    K(")"),
                ]);
            }
            AstNode::DescendantNodeJoinCondition(c) => {
                parts.extend([
                    K("ISDESCENDANTNODE("),
                    T(c.descendant().as_str()),
                    K(","),
                    T(c.ancestor().as_str()),
                    K(")"),
                ]);
            }
            AstNode::Column(column) => {
                parts.push(T(column.selector().as_str()));
                match column.property_name() {
                    None => parts.push(K(".*")),
                    Some(property) => {
                        parts.extend([K("."), T(property)]);
                        if let Some(name) = column.column_name().filter(|name| *name != property) {
                            parts.extend([K(" AS "), T(name)]);
                        }
                    }
                }
            }
            AstNode::Ordering(ordering) => {
                parts.push(N(ordering.operand().as_node()));
                parts.push(K(" "));
                parts.push(K(ordering.order().symbol()));
            }
            AstNode::Limit(limit) => {
                let text = if limit.offset() != 0 {
                    format!("LIMIT {} OFFSET {}", limit.row_limit(), limit.offset())
                } else {
                    format!("LIMIT {}", limit.row_limit())
                };
                parts.push(O(text));
            }
            AstNode::Literal(literal) => parts.push(O(self.literal(literal.value()))),
            AstNode::BindVariableName(variable) => parts.extend([K("$"), T(variable.name())]),
            AstNode::PropertyValue(value) => {
                parts.extend([T(value.selector().as_str()), K("."), T(value.property())]);
            }
            AstNode::ReferenceValue(value) => {
                parts.push(T(value.selector().as_str()));
                if let Some(property) = value.property() {
                    parts.extend([K("."), T(property)]);
                }
            }
            AstNode::Length(length) => {
                parts.push(K("LENGTH("));
                parts.push(N(AstNode::PropertyValue(length.property_value())));
                parts.push(K(")"));
            }
            AstNode::LowerCase(lower) => {
                parts.extend([K("LOWER("), N(lower.operand().as_node()), K(")")]);
            }
            AstNode::UpperCase(upper) => {
                parts.extend([K("UPPER("), N(upper.operand().as_node()), K(")")]);
            }
            AstNode::NodeDepth(o) => parts.extend([K("DEPTH("), T(o.selector().as_str()), K(")")]),
            AstNode::NodePath(o) => parts.extend([K("PATH("), T(o.selector().as_str()), K(")")]),
            AstNode::NodeName(o) => parts.extend([K("NAME("), T(o.selector().as_str()), K(")")]),
            AstNode::NodeLocalName(o) => {
                parts.extend([K("LOCALNAME("), T(o.selector().as_str()), K(")")]);
            }
            AstNode::FullTextSearchScore(o) => {
                parts.extend([K("SCORE("), T(o.selector().as_str()), K(")")]);
            }
            AstNode::And(and) => {
                parts.extend([
                    K("("),
                    N(and.left().as_node()),
                    K(" AND "),
                    N(and.right().as_node()),
                    K(")"),
                ]);
            }
            AstNode::Or(or) => {
                parts.extend([
                    K("("),
                    N(or.left().as_node()),
                    K(" OR "),
                    N(or.right().as_node()),
                    K(")"),
                ]);
            }
            AstNode::Not(not) => {
                parts.extend([K("NOT ("), N(not.constraint().as_node()), K(")")]);
            }
            AstNode::Comparison(comparison) => {
                parts.extend([
                    N(comparison.operand1().as_node()),
                    K(" "),
                    K(comparison.operator().symbol()),
                    K(" "),
                    N(comparison.operand2().as_node()),
                ]);
            }
            AstNode::Between(between) => {
                parts.push(N(between.operand().as_node()));
                parts.push(K(" BETWEEN "));
                parts.push(N(between.lower().as_node()));
                if !between.is_lower_included() {
                    parts.push(K(" EXCLUSIVE"));
                }
                parts.push(K(" AND "));
                parts.push(N(between.upper().as_node()));
                if !between.is_upper_included() {
                    parts.push(K(" EXCLUSIVE"));
                }
            }
            AstNode::SetCriteria(criteria) => {
                parts.push(N(criteria.left().as_node()));
                parts.push(K(" IN ("));
                for (i, operand) in criteria.right().iter().enumerate() {
                    if i > 0 {
                        parts.push(K(","));
                    }
                    parts.push(N(operand.as_node()));
                }
                parts.push(K(")"));
            }
            AstNode::PropertyExistence(existence) => {
                parts.extend([
                    T(existence.selector().as_str()),
                    K("."),
                    T(existence.property()),
                    K(" IS NOT NULL"),
                ]);
            }
            AstNode::FullTextSearch(search) => {
                parts.extend([K("CONTAINS("), T(search.selector().as_str()), K(".")]);
                parts.push(match search.property() {
                    Some(property) => T(property),
                    None => K("*"),
                });
                parts.extend([K(",'"), T(search.expression()), K("')")]);
            }
            AstNode::SameNode(same) => {
                parts.extend([
                    K("ISSAMENODE("),
                    T(same.selector().as_str()),
                    K(",'"),
                    T(same.path()),
                    K("')"),
                ]);
            }
            AstNode::ChildNode(child) => {
                parts.extend([
                    K("ISCHILDNODE("),
                    T(child.selector().as_str()),
                    K(",'"),
                    T(child.parent_path()),
                    K("')"),
                ]);
            }
            AstNode::DescendantNode(descendant) => {
                parts.extend([
                    K("ISDESCENDANTNODE("),
                    T(descendant.selector().as_str()),
                    K(",'"),
                    T(descendant.ancestor_path()),
                    K("')"),
                ]);
            }
            AstNode::Relike(relike) => {
                parts.extend([
                    K("RELIKE("),
                    N(relike.operand1().as_node()),
                    K(", "),
                    N(AstNode::PropertyValue(relike.operand2())),
                    K(")"),
                ]);
            }
        }
    }
}

impl Default for ReadableVisitor<'_> {
    fn default() -> Self {
        Self::new()
    }
}

impl<'a> Visitor<'a> for ReadableVisitor<'a> {
    fn visit(&mut self, node: AstNode<'a>) {
        self.render(node);
    }
}

/// Canonical text of `root`.
pub fn readable<T: Visitable + ?Sized>(root: &T) -> String {
    let mut visitor = ReadableVisitor::new();
    visitor.render(root.as_node());
    visitor.into_string()
}

macro_rules! display_readable {
    ($($ty:ty),* $(,)?) => {
        $(
            impl fmt::Display for $ty {
                fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                    f.write_str(&readable(self))
                }
            }
        )*
    };
}

display_readable!(
    QueryCommand,
    Query,
    Source,
    JoinCondition,
    Column,
    Ordering,
    Limit,
    Constraint,
    DynamicOperand,
    StaticOperand,
);

use std::hash::{Hash, Hasher};
use std::sync::OnceLock;

use crate::query::fulltext::{self, ParseError, Term};

use super::{non_blank, DynamicOperand, ModelError, PropertyValue, SelectorName, StaticOperand};

/// Comparison operator.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub enum Operator {
    /// `=`
    EqualTo,
    /// `!=`
    NotEqualTo,
    /// `<`
    LessThan,
    /// `<=`
    LessThanOrEqualTo,
    /// `>`
    GreaterThan,
    /// `>=`
    GreaterThanOrEqualTo,
    /// `LIKE`
    Like,
}

impl Operator {
    /// Rendered symbol.
    pub const fn symbol(self) -> &'static str {
        match self {
            Operator::EqualTo => "=",
            Operator::NotEqualTo => "!=",
            Operator::LessThan => "<",
            Operator::LessThanOrEqualTo => "<=",
            Operator::GreaterThan => ">",
            Operator::GreaterThanOrEqualTo => ">=",
            Operator::Like => "LIKE",
        }
    }

    /// Operator with its operands swapped: `a < b` iff `b > a`.
    pub const fn reverse(self) -> Self {
        match self {
            Operator::LessThan => Operator::GreaterThan,
            Operator::LessThanOrEqualTo => Operator::GreaterThanOrEqualTo,
            Operator::GreaterThan => Operator::LessThan,
            Operator::GreaterThanOrEqualTo => Operator::LessThanOrEqualTo,
            other => other,
        }
    }

    /// Returns true for `<`, `<=`, `>` and `>=`.
    pub const fn is_range(self) -> bool {
        matches!(
            self,
            Operator::LessThan
                | Operator::LessThanOrEqualTo
                | Operator::GreaterThan
                | Operator::GreaterThanOrEqualTo
        )
    }
}

/// `(left AND right)`
#[derive(Clone, Debug, Eq, PartialEq, Hash)]
pub struct And {
    left: Box<Constraint>,
    right: Box<Constraint>,
}

impl And {
    /// Conjunction of two constraints.
    pub fn new(left: Constraint, right: Constraint) -> Self {
        Self {
            left: Box::new(left),
            right: Box::new(right),
        }
    }

    /// Left side.
    pub fn left(&self) -> &Constraint {
        &self.left
    }

    /// Right side.
    pub fn right(&self) -> &Constraint {
        &self.right
    }
}

/// `(left OR right)`
#[derive(Clone, Debug, Eq, PartialEq, Hash)]
pub struct Or {
    left: Box<Constraint>,
    right: Box<Constraint>,
}

impl Or {
    /// Disjunction of two constraints.
    pub fn new(left: Constraint, right: Constraint) -> Self {
        Self {
            left: Box::new(left),
            right: Box::new(right),
        }
    }

    /// Left side.
    pub fn left(&self) -> &Constraint {
        &self.left
    }

    /// Right side.
    pub fn right(&self) -> &Constraint {
        &self.right
    }
}

/// `NOT (constraint)`
#[derive(Clone, Debug, Eq, PartialEq, Hash)]
pub struct Not {
    constraint: Box<Constraint>,
}

impl Not {
    /// Negation.
    pub fn new(constraint: Constraint) -> Self {
        Self {
            constraint: Box::new(constraint),
        }
    }

    /// Negated constraint.
    pub fn constraint(&self) -> &Constraint {
        &self.constraint
    }
}

/// `operand1 OP operand2`
#[derive(Clone, Debug, Eq, PartialEq, Hash)]
pub struct Comparison {
    operand1: DynamicOperand,
    operator: Operator,
    operand2: StaticOperand,
}

impl Comparison {
    /// Compares a row operand against a static operand.
    pub fn new(operand1: impl Into<DynamicOperand>, operator: Operator, operand2: StaticOperand) -> Self {
        Self {
            operand1: operand1.into(),
            operator,
            operand2,
        }
    }

    /// Row operand.
    pub fn operand1(&self) -> &DynamicOperand {
        &self.operand1
    }

    /// Operator.
    pub fn operator(&self) -> Operator {
        self.operator
    }

    /// Static operand.
    pub fn operand2(&self) -> &StaticOperand {
        &self.operand2
    }
}

/// `operand BETWEEN lower[ EXCLUSIVE] AND upper[ EXCLUSIVE]`
#[derive(Clone, Debug, Eq, PartialEq, Hash)]
pub struct Between {
    operand: DynamicOperand,
    lower: StaticOperand,
    upper: StaticOperand,
    lower_included: bool,
    upper_included: bool,
}

impl Between {
    /// Range test with explicit bound inclusion.
    pub fn new(
        operand: impl Into<DynamicOperand>,
        lower: StaticOperand,
        upper: StaticOperand,
        lower_included: bool,
        upper_included: bool,
    ) -> Self {
        Self {
            operand: operand.into(),
            lower,
            upper,
            lower_included,
            upper_included,
        }
    }

    /// Tested operand.
    pub fn operand(&self) -> &DynamicOperand {
        &self.operand
    }

    /// Lower bound.
    pub fn lower(&self) -> &StaticOperand {
        &self.lower
    }

    /// Upper bound.
    pub fn upper(&self) -> &StaticOperand {
        &self.upper
    }

    /// Whether the lower bound itself matches.
    pub fn is_lower_included(&self) -> bool {
        self.lower_included
    }

    /// Whether the upper bound itself matches.
    pub fn is_upper_included(&self) -> bool {
        self.upper_included
    }
}

/// `left IN (a, b, ...)`
#[derive(Clone, Debug, Eq, PartialEq, Hash)]
pub struct SetCriteria {
    left: DynamicOperand,
    right: Vec<StaticOperand>,
}

impl SetCriteria {
    /// Membership test; at least one candidate is required.
    pub fn new(
        left: impl Into<DynamicOperand>,
        right: impl IntoIterator<Item = StaticOperand>,
    ) -> Result<Self, ModelError> {
        let right: Vec<_> = right.into_iter().collect();
        if right.is_empty() {
            return Err(ModelError::Empty("set criteria operands"));
        }
        Ok(Self {
            left: left.into(),
            right,
        })
    }

    /// Tested operand.
    pub fn left(&self) -> &DynamicOperand {
        &self.left
    }

    /// Candidate values.
    pub fn right(&self) -> &[StaticOperand] {
        &self.right
    }
}

/// `selector.property IS NOT NULL`
#[derive(Clone, Debug, Eq, PartialEq, Hash)]
pub struct PropertyExistence {
    selector: SelectorName,
    property: String,
}

impl PropertyExistence {
    /// Existence test; the property name must be non-blank.
    pub fn new(selector: SelectorName, property: impl Into<String>) -> Result<Self, ModelError> {
        Ok(Self {
            selector,
            property: non_blank(property.into(), "property name")?,
        })
    }

    /// Selector.
    pub fn selector(&self) -> &SelectorName {
        &self.selector
    }

    /// Property name.
    pub fn property(&self) -> &str {
        &self.property
    }
}

/// `CONTAINS(selector.property, 'expression')`
///
/// The expression is parsed on first use of [`FullTextSearch::term`] and the
/// resulting tree is kept for later calls.
#[derive(Clone, Debug)]
pub struct FullTextSearch {
    selector: SelectorName,
    property: Option<String>,
    expression: String,
    term: OnceLock<Term>,
}

impl FullTextSearch {
    /// Search over one property (`Some`) or every full-text property (`None`).
    pub fn new(
        selector: SelectorName,
        property: Option<String>,
        expression: impl Into<String>,
    ) -> Result<Self, ModelError> {
        let property = property
            .map(|p| non_blank(p, "property name"))
            .transpose()?;
        Ok(Self {
            selector,
            property,
            expression: non_blank(expression.into(), "full-text expression")?,
            term: OnceLock::new(),
        })
    }

    /// Search whose parsed term is already known.
    pub fn with_term(
        selector: SelectorName,
        property: Option<String>,
        expression: impl Into<String>,
        term: Term,
    ) -> Result<Self, ModelError> {
        let search = Self::new(selector, property, expression)?;
        let _ = search.term.set(term);
        Ok(search)
    }

    /// Selector.
    pub fn selector(&self) -> &SelectorName {
        &self.selector
    }

    /// Searched property, absent for all full-text properties.
    pub fn property(&self) -> Option<&str> {
        self.property.as_deref()
    }

    /// Raw expression text.
    pub fn expression(&self) -> &str {
        &self.expression
    }

    /// Parsed term. Parse failures are reported on every call.
    pub fn term(&self) -> Result<&Term, ParseError> {
        if let Some(term) = self.term.get() {
            return Ok(term);
        }
        let parsed = fulltext::parse(&self.expression)?;
        Ok(self.term.get_or_init(|| parsed))
    }
}

impl PartialEq for FullTextSearch {
    fn eq(&self, other: &Self) -> bool {
        self.selector == other.selector
            && self.property == other.property
            && self.expression == other.expression
    }
}

impl Eq for FullTextSearch {}

impl Hash for FullTextSearch {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.selector.hash(state);
        self.property.hash(state);
        self.expression.hash(state);
    }
}

/// `ISSAMENODE(selector, '/path')`
#[derive(Clone, Debug, Eq, PartialEq, Hash)]
pub struct SameNode {
    selector: SelectorName,
    path: String,
}

impl SameNode {
    /// Node at exactly `path`.
    pub fn new(selector: SelectorName, path: impl Into<String>) -> Result<Self, ModelError> {
        Ok(Self {
            selector,
            path: non_blank(path.into(), "path")?,
        })
    }

    /// Selector.
    pub fn selector(&self) -> &SelectorName {
        &self.selector
    }

    /// Node path.
    pub fn path(&self) -> &str {
        &self.path
    }
}

/// `ISCHILDNODE(selector, '/parent/path')`
#[derive(Clone, Debug, Eq, PartialEq, Hash)]
pub struct ChildNode {
    selector: SelectorName,
    parent_path: String,
}

impl ChildNode {
    /// Nodes whose parent is at `parent_path`.
    pub fn new(selector: SelectorName, parent_path: impl Into<String>) -> Result<Self, ModelError> {
        Ok(Self {
            selector,
            parent_path: non_blank(parent_path.into(), "parent path")?,
        })
    }

    /// Selector.
    pub fn selector(&self) -> &SelectorName {
        &self.selector
    }

    /// Parent path.
    pub fn parent_path(&self) -> &str {
        &self.parent_path
    }
}

/// `ISDESCENDANTNODE(selector, '/ancestor/path')`
#[derive(Clone, Debug, Eq, PartialEq, Hash)]
pub struct DescendantNode {
    selector: SelectorName,
    ancestor_path: String,
}

impl DescendantNode {
    /// Nodes strictly below `ancestor_path`.
    pub fn new(
        selector: SelectorName,
        ancestor_path: impl Into<String>,
    ) -> Result<Self, ModelError> {
        Ok(Self {
            selector,
            ancestor_path: non_blank(ancestor_path.into(), "ancestor path")?,
        })
    }

    /// Selector.
    pub fn selector(&self) -> &SelectorName {
        &self.selector
    }

    /// Ancestor path.
    pub fn ancestor_path(&self) -> &str {
        &self.ancestor_path
    }
}

/// `RELIKE(value, selector.property)`: stored values are patterns matched
/// against the static operand.
#[derive(Clone, Debug, Eq, PartialEq, Hash)]
pub struct Relike {
    operand1: StaticOperand,
    operand2: PropertyValue,
}

impl Relike {
    /// Reverse LIKE.
    pub fn new(operand1: StaticOperand, operand2: PropertyValue) -> Self {
        Self { operand1, operand2 }
    }

    /// Value tested against the stored patterns.
    pub fn operand1(&self) -> &StaticOperand {
        &self.operand1
    }

    /// Property holding the patterns.
    pub fn operand2(&self) -> &PropertyValue {
        &self.operand2
    }
}

/// Predicate over rows.
#[derive(Clone, Debug, Eq, PartialEq, Hash)]
pub enum Constraint {
    /// Conjunction.
    And(And),
    /// Disjunction.
    Or(Or),
    /// Negation.
    Not(Not),
    /// Comparison.
    Comparison(Comparison),
    /// Range test.
    Between(Between),
    /// Membership test.
    SetCriteria(SetCriteria),
    /// Property existence.
    PropertyExistence(PropertyExistence),
    /// Full-text search.
    FullTextSearch(FullTextSearch),
    /// Same node.
    SameNode(SameNode),
    /// Child node.
    ChildNode(ChildNode),
    /// Descendant node.
    DescendantNode(DescendantNode),
    /// Reverse LIKE.
    Relike(Relike),
}

impl Constraint {
    /// `(left AND right)`
    pub fn and(left: impl Into<Constraint>, right: impl Into<Constraint>) -> Self {
        Constraint::And(And::new(left.into(), right.into()))
    }

    /// `(left OR right)`
    pub fn or(left: impl Into<Constraint>, right: impl Into<Constraint>) -> Self {
        Constraint::Or(Or::new(left.into(), right.into()))
    }

    /// `NOT (inner)`
    pub fn not(inner: impl Into<Constraint>) -> Self {
        Constraint::Not(Not::new(inner.into()))
    }

    /// `operand1 OP operand2`
    pub fn comparison(
        operand1: impl Into<DynamicOperand>,
        operator: Operator,
        operand2: StaticOperand,
    ) -> Self {
        Constraint::Comparison(Comparison::new(operand1, operator, operand2))
    }
}

impl Constraint {
    fn vacant() -> Self {
        Constraint::PropertyExistence(PropertyExistence {
            selector: SelectorName::vacant(),
            property: String::new(),
        })
    }

    fn is_connective(&self) -> bool {
        matches!(self, Constraint::And(_) | Constraint::Or(_) | Constraint::Not(_))
    }
}

impl Drop for Constraint {
    fn drop(&mut self) {
        super::drop_tree(self, |constraint, pending| {
            let children = match constraint {
                Constraint::And(And { left, right }) | Constraint::Or(Or { left, right }) => {
                    [Some(left), Some(right)]
                }
                Constraint::Not(Not { constraint }) => [Some(constraint), None],
                _ => return,
            };
            for child in children.into_iter().flatten() {
                if child.is_connective() {
                    pending.push(std::mem::replace(&mut **child, Constraint::vacant()));
                }
            }
        });
    }
}

macro_rules! constraint_from {
    ($($variant:ident),* $(,)?) => {
        $(
            impl From<$variant> for Constraint {
                fn from(value: $variant) -> Self {
                    Constraint::$variant(value)
                }
            }
        )*
    };
}

constraint_from!(
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

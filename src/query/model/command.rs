use super::{
    non_blank, Constraint, DynamicOperand, ModelError, Selector, SelectorName, Source,
};

/// Output column: one property, or every property with `selector.*`.
#[derive(Clone, Debug, Eq, PartialEq, Hash)]
pub struct Column {
    selector: SelectorName,
    property: Option<String>,
    column_name: Option<String>,
}

impl Column {
    /// `selector.*`
    pub fn all(selector: SelectorName) -> Self {
        Self {
            selector,
            property: None,
            column_name: None,
        }
    }

    /// `selector.property`, named after the property.
    pub fn property(selector: SelectorName, property: impl Into<String>) -> Result<Self, ModelError> {
        Ok(Self {
            selector,
            property: Some(non_blank(property.into(), "property name")?),
            column_name: None,
        })
    }

    /// `selector.property AS column_name`
    pub fn aliased(
        selector: SelectorName,
        property: impl Into<String>,
        column_name: impl Into<String>,
    ) -> Result<Self, ModelError> {
        Ok(Self {
            selector,
            property: Some(non_blank(property.into(), "property name")?),
            column_name: Some(non_blank(column_name.into(), "column name")?),
        })
    }

    /// Selector.
    pub fn selector(&self) -> &SelectorName {
        &self.selector
    }

    /// Property, absent for `selector.*`.
    pub fn property_name(&self) -> Option<&str> {
        self.property.as_deref()
    }

    /// Column name: the alias when given, otherwise the property name.
    pub fn column_name(&self) -> Option<&str> {
        self.column_name.as_deref().or(self.property.as_deref())
    }
}

/// Sort direction.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub enum Order {
    /// Smallest first.
    Ascending,
    /// Largest first.
    Descending,
}

impl Order {
    /// Rendered keyword.
    pub const fn symbol(self) -> &'static str {
        match self {
            Order::Ascending => "ASC",
            Order::Descending => "DESC",
        }
    }
}

/// `operand ASC|DESC`
#[derive(Clone, Debug, Eq, PartialEq, Hash)]
pub struct Ordering {
    operand: DynamicOperand,
    order: Order,
}

impl Ordering {
    /// Sort key.
    pub fn new(operand: impl Into<DynamicOperand>, order: Order) -> Self {
        Self {
            operand: operand.into(),
            order,
        }
    }

    /// Sorted operand.
    pub fn operand(&self) -> &DynamicOperand {
        &self.operand
    }

    /// Direction.
    pub fn order(&self) -> Order {
        self.order
    }
}

/// Row limit and offset.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub struct Limit {
    row_limit: usize,
    offset: usize,
}

impl Limit {
    /// Limit of `row_limit` rows after skipping `offset`.
    pub const fn new(row_limit: usize, offset: usize) -> Self {
        Self { row_limit, offset }
    }

    /// No limit and no offset.
    pub const fn unlimited() -> Self {
        Self::new(usize::MAX, 0)
    }

    /// Maximum rows.
    pub fn row_limit(&self) -> usize {
        self.row_limit
    }

    /// Rows skipped.
    pub fn offset(&self) -> usize {
        self.offset
    }

    /// Returns true when no row limit applies.
    pub fn is_unlimited(&self) -> bool {
        self.row_limit == usize::MAX
    }

    /// Returns true when rows are skipped.
    pub fn is_offset(&self) -> bool {
        self.offset > 0
    }
}

impl Default for Limit {
    fn default() -> Self {
        Self::unlimited()
    }
}

/// `SELECT ... FROM ... [WHERE ...] [ORDER BY ...] [LIMIT ...]`
#[derive(Clone, Debug, Eq, PartialEq, Hash)]
pub struct Query {
    source: Source,
    constraint: Option<Constraint>,
    orderings: Vec<Ordering>,
    columns: Vec<Column>,
    limit: Limit,
    distinct: bool,
}

impl Query {
    /// `SELECT * FROM source` with no limit.
    pub fn new(source: impl Into<Source>) -> Self {
        Self {
            source: source.into(),
            constraint: None,
            orderings: Vec::new(),
            columns: Vec::new(),
            limit: Limit::unlimited(),
            distinct: false,
        }
    }

    /// Adds a `WHERE` clause.
    pub fn with_constraint(mut self, constraint: impl Into<Constraint>) -> Self {
        self.constraint = Some(constraint.into());
        self
    }

    /// Sets the output columns; empty means `*`.
    pub fn with_columns(mut self, columns: Vec<Column>) -> Self {
        self.columns = columns;
        self
    }

    /// Sets the `ORDER BY` keys.
    pub fn with_orderings(mut self, orderings: Vec<Ordering>) -> Self {
        self.orderings = orderings;
        self
    }

    /// Sets the limit.
    pub fn with_limit(mut self, limit: Limit) -> Self {
        self.limit = limit;
        self
    }

    /// Marks the query `DISTINCT`.
    pub fn distinct(mut self) -> Self {
        self.distinct = true;
        self
    }

    /// Row source.
    pub fn source(&self) -> &Source {
        &self.source
    }

    /// `WHERE` clause.
    pub fn constraint(&self) -> Option<&Constraint> {
        self.constraint.as_ref()
    }

    /// `ORDER BY` keys.
    pub fn orderings(&self) -> &[Ordering] {
        &self.orderings
    }

    /// Output columns.
    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    /// Limit.
    pub fn limit(&self) -> &Limit {
        &self.limit
    }

    /// Whether duplicates are removed.
    pub fn is_distinct(&self) -> bool {
        self.distinct
    }
}

/// Set operation combining two query results.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub enum SetOperation {
    /// Rows from either side.
    Union,
    /// Rows on both sides.
    Intersect,
    /// Left rows absent on the right.
    Except,
}

impl SetOperation {
    /// Rendered keyword.
    pub const fn symbol(self) -> &'static str {
        match self {
            SetOperation::Union => "UNION",
            SetOperation::Intersect => "INTERSECT",
            SetOperation::Except => "EXCEPT",
        }
    }
}

/// `left UNION|INTERSECT|EXCEPT [ALL] right`
#[derive(Clone, Debug, Eq, PartialEq, Hash)]
pub struct SetQuery {
    left: Box<QueryCommand>,
    operation: SetOperation,
    right: Box<QueryCommand>,
    all: bool,
    orderings: Vec<Ordering>,
    limit: Limit,
}

impl SetQuery {
    /// Combines two commands.
    pub fn new(left: QueryCommand, operation: SetOperation, right: QueryCommand, all: bool) -> Self {
        Self {
            left: Box::new(left),
            operation,
            right: Box::new(right),
            all,
            orderings: Vec::new(),
            limit: Limit::unlimited(),
        }
    }

    /// Sets the `ORDER BY` keys of the combined result.
    pub fn with_orderings(mut self, orderings: Vec<Ordering>) -> Self {
        self.orderings = orderings;
        self
    }

    /// Sets the limit of the combined result.
    pub fn with_limit(mut self, limit: Limit) -> Self {
        self.limit = limit;
        self
    }

    /// Left command.
    pub fn left(&self) -> &QueryCommand {
        &self.left
    }

    /// Operation.
    pub fn operation(&self) -> SetOperation {
        self.operation
    }

    /// Right command.
    pub fn right(&self) -> &QueryCommand {
        &self.right
    }

    /// Whether duplicates are kept.
    pub fn is_all(&self) -> bool {
        self.all
    }

    /// `ORDER BY` keys.
    pub fn orderings(&self) -> &[Ordering] {
        &self.orderings
    }

    /// Limit.
    pub fn limit(&self) -> &Limit {
        &self.limit
    }
}

/// Top-level command.
#[derive(Clone, Debug, Eq, PartialEq, Hash)]
pub enum QueryCommand {
    /// Single query.
    Query(Query),
    /// Set operation.
    SetQuery(SetQuery),
}

impl QueryCommand {
    /// `ORDER BY` keys of the command.
    pub fn orderings(&self) -> &[Ordering] {
        match self {
            QueryCommand::Query(q) => q.orderings(),
            QueryCommand::SetQuery(q) => q.orderings(),
        }
    }

    /// Limit of the command.
    pub fn limit(&self) -> &Limit {
        match self {
            QueryCommand::Query(q) => q.limit(),
            QueryCommand::SetQuery(q) => q.limit(),
        }
    }
}

impl Drop for QueryCommand {
    fn drop(&mut self) {
        super::drop_tree(self, |command, pending| {
            if let QueryCommand::SetQuery(set) = command {
                for side in [&mut set.left, &mut set.right] {
                    if matches!(**side, QueryCommand::SetQuery(_)) {
                        let vacant = Query::new(Selector::new(SelectorName::vacant()));
                        pending.push(std::mem::replace(&mut **side, vacant.into()));
                    }
                }
            }
        });
    }
}

impl From<Query> for QueryCommand {
    fn from(value: Query) -> Self {
        QueryCommand::Query(value)
    }
}

impl From<SetQuery> for QueryCommand {
    fn from(value: SetQuery) -> Self {
        QueryCommand::SetQuery(value)
    }
}

/// Query used as a static operand, rendered in parentheses.
#[derive(Clone, Debug, Eq, PartialEq, Hash)]
pub struct Subquery {
    query: Box<QueryCommand>,
}

impl Subquery {
    /// Wraps a command.
    pub fn new(query: impl Into<QueryCommand>) -> Self {
        Self {
            query: Box::new(query.into()),
        }
    }

    /// Wrapped command.
    pub fn query(&self) -> &QueryCommand {
        &self.query
    }
}

use std::fmt;

use super::{non_blank, ModelError};

/// Name or alias identifying a row source in a query.
#[derive(Clone, Debug, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct SelectorName(String);

impl SelectorName {
    /// Creates a selector name, rejecting blank input.
    pub fn new(name: impl Into<String>) -> Result<Self, ModelError> {
        non_blank(name.into(), "selector name").map(Self)
    }

    /// The name text.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Non-allocating stand-in left behind when a subtree is moved out
    /// during teardown. Never observable through the public API.
    pub(super) const fn vacant() -> Self {
        Self(String::new())
    }
}

impl fmt::Display for SelectorName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for SelectorName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Named node type selector, e.g. `nt:file AS f`.
#[derive(Clone, Debug, Eq, PartialEq, Hash)]
pub struct Selector {
    name: SelectorName,
    alias: Option<SelectorName>,
}

impl Selector {
    /// Selector without an alias.
    pub fn new(name: SelectorName) -> Self {
        Self { name, alias: None }
    }

    /// Selector with an alias.
    pub fn aliased(name: SelectorName, alias: SelectorName) -> Self {
        Self {
            name,
            alias: Some(alias),
        }
    }

    /// Node type name.
    pub fn name(&self) -> &SelectorName {
        &self.name
    }

    /// Optional alias.
    pub fn alias(&self) -> Option<&SelectorName> {
        self.alias.as_ref()
    }

    /// The alias when present, otherwise the name.
    pub fn alias_or_name(&self) -> &SelectorName {
        self.alias.as_ref().unwrap_or(&self.name)
    }
}

/// Source over every node in the workspace.
#[derive(Clone, Debug, Eq, PartialEq, Hash)]
pub struct AllNodes {
    name: SelectorName,
    alias: Option<SelectorName>,
}

impl AllNodes {
    /// Name used for the all-nodes source.
    pub const NAME: &'static str = "__ALLNODES__";

    /// All-nodes source without an alias.
    pub fn new() -> Self {
        Self {
            name: SelectorName(Self::NAME.to_owned()),
            alias: None,
        }
    }

    /// All-nodes source with an alias.
    pub fn aliased(alias: SelectorName) -> Self {
        Self {
            alias: Some(alias),
            ..Self::new()
        }
    }

    /// Fixed source name.
    pub fn name(&self) -> &SelectorName {
        &self.name
    }

    /// Optional alias.
    pub fn alias(&self) -> Option<&SelectorName> {
        self.alias.as_ref()
    }

    /// The alias when present, otherwise the name.
    pub fn alias_or_name(&self) -> &SelectorName {
        self.alias.as_ref().unwrap_or(&self.name)
    }
}

impl Default for AllNodes {
    fn default() -> Self {
        Self::new()
    }
}

/// Kind of join between two sources.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub enum JoinType {
    /// Rows present on both sides.
    Inner,
    /// Every left row, matched right rows when present.
    LeftOuter,
    /// Every right row, matched left rows when present.
    RightOuter,
    /// Every row from either side.
    FullOuter,
    /// Cartesian product.
    Cross,
}

impl JoinType {
    /// Rendered keyword.
    pub const fn symbol(self) -> &'static str {
        match self {
            JoinType::Inner => "INNER JOIN",
            JoinType::LeftOuter => "LEFT OUTER JOIN",
            JoinType::RightOuter => "RIGHT OUTER JOIN",
            JoinType::FullOuter => "FULL OUTER JOIN",
            JoinType::Cross => "CROSS JOIN",
        }
    }
}

/// Join of two sources under a condition.
#[derive(Clone, Debug, Eq, PartialEq, Hash)]
pub struct Join {
    left: Box<Source>,
    join_type: JoinType,
    right: Box<Source>,
    condition: JoinCondition,
}

impl Join {
    /// Creates a join.
    pub fn new(left: Source, join_type: JoinType, right: Source, condition: JoinCondition) -> Self {
        Self {
            left: Box::new(left),
            join_type,
            right: Box::new(right),
            condition,
        }
    }

    /// Left source.
    pub fn left(&self) -> &Source {
        &self.left
    }

    /// Join kind.
    pub fn join_type(&self) -> JoinType {
        self.join_type
    }

    /// Right source.
    pub fn right(&self) -> &Source {
        &self.right
    }

    /// Join condition.
    pub fn condition(&self) -> &JoinCondition {
        &self.condition
    }
}

/// Row source of a query.
#[derive(Clone, Debug, Eq, PartialEq, Hash)]
pub enum Source {
    /// Named node type.
    Selector(Selector),
    /// Every node.
    AllNodes(AllNodes),
    /// Join of two sources.
    Join(Join),
}

impl Source {
    fn vacant() -> Self {
        Source::Selector(Selector::new(SelectorName::vacant()))
    }

    fn is_join(&self) -> bool {
        matches!(self, Source::Join(_))
    }
}

impl Drop for Source {
    fn drop(&mut self) {
        super::drop_tree(self, |source, pending| {
            if let Source::Join(join) = source {
                for side in [&mut join.left, &mut join.right] {
                    if side.is_join() {
                        pending.push(std::mem::replace(&mut **side, Source::vacant()));
                    }
                }
            }
        });
    }
}

impl From<Selector> for Source {
    fn from(value: Selector) -> Self {
        Source::Selector(value)
    }
}

impl From<AllNodes> for Source {
    fn from(value: AllNodes) -> Self {
        Source::AllNodes(value)
    }
}

impl From<Join> for Source {
    fn from(value: Join) -> Self {
        Source::Join(value)
    }
}

/// `s1.p1 = s2.p2`
#[derive(Clone, Debug, Eq, PartialEq, Hash)]
pub struct EquiJoinCondition {
    selector1: SelectorName,
    property1: String,
    selector2: SelectorName,
    property2: String,
}

impl EquiJoinCondition {
    /// Creates an equi-join condition; property names must be non-blank.
    pub fn new(
        selector1: SelectorName,
        property1: impl Into<String>,
        selector2: SelectorName,
        property2: impl Into<String>,
    ) -> Result<Self, ModelError> {
        Ok(Self {
            selector1,
            property1: non_blank(property1.into(), "property name")?,
            selector2,
            property2: non_blank(property2.into(), "property name")?,
        })
    }

    /// Left selector.
    pub fn selector1(&self) -> &SelectorName {
        &self.selector1
    }

    /// Left property.
    pub fn property1(&self) -> &str {
        &self.property1
    }

    /// Right selector.
    pub fn selector2(&self) -> &SelectorName {
        &self.selector2
    }

    /// Right property.
    pub fn property2(&self) -> &str {
        &self.property2
    }
}

/// Both selectors denote the same node, optionally offset by a relative path.
#[derive(Clone, Debug, Eq, PartialEq, Hash)]
pub struct SameNodeJoinCondition {
    selector1: SelectorName,
    selector2: SelectorName,
    selector2_path: Option<String>,
}

impl SameNodeJoinCondition {
    /// Creates the condition; a supplied path must be non-blank.
    pub fn new(
        selector1: SelectorName,
        selector2: SelectorName,
        selector2_path: Option<String>,
    ) -> Result<Self, ModelError> {
        let selector2_path = selector2_path
            .map(|path| non_blank(path, "path"))
            .transpose()?;
        Ok(Self {
            selector1,
            selector2,
            selector2_path,
        })
    }

    /// First selector.
    pub fn selector1(&self) -> &SelectorName {
        &self.selector1
    }

    /// Second selector.
    pub fn selector2(&self) -> &SelectorName {
        &self.selector2
    }

    /// Path relative to the second selector.
    pub fn selector2_path(&self) -> Option<&str> {
        self.selector2_path.as_deref()
    }
}

/// The child selector's node is a child of the parent selector's node.
#[derive(Clone, Debug, Eq, PartialEq, Hash)]
pub struct ChildNodeJoinCondition {
    child: SelectorName,
    parent: SelectorName,
}

impl ChildNodeJoinCondition {
    /// Creates the condition.
    pub fn new(child: SelectorName, parent: SelectorName) -> Self {
        Self { child, parent }
    }

    /// Child selector.
    pub fn child(&self) -> &SelectorName {
        &self.child
    }

    /// Parent selector.
    pub fn parent(&self) -> &SelectorName {
        &self.parent
    }
}

/// The descendant selector's node lies below the ancestor selector's node.
#[derive(Clone, Debug, Eq, PartialEq, Hash)]
pub struct DescendantNodeJoinCondition {
    descendant: SelectorName,
    ancestor: SelectorName,
}

impl DescendantNodeJoinCondition {
    /// Creates the condition.
    pub fn new(descendant: SelectorName, ancestor: SelectorName) -> Self {
        Self {
            descendant,
            ancestor,
        }
    }

    /// Descendant selector.
    pub fn descendant(&self) -> &SelectorName {
        &self.descendant
    }

    /// Ancestor selector.
    pub fn ancestor(&self) -> &SelectorName {
        &self.ancestor
    }
}

/// Condition relating the two sides of a [`Join`].
#[derive(Clone, Debug, Eq, PartialEq, Hash)]
pub enum JoinCondition {
    /// Property equality.
    Equi(EquiJoinCondition),
    /// Same node.
    SameNode(SameNodeJoinCondition),
    /// Parent/child.
    ChildNode(ChildNodeJoinCondition),
    /// Ancestor/descendant.
    DescendantNode(DescendantNodeJoinCondition),
}

impl From<EquiJoinCondition> for JoinCondition {
    fn from(value: EquiJoinCondition) -> Self {
        JoinCondition::Equi(value)
    }
}

impl From<SameNodeJoinCondition> for JoinCondition {
    fn from(value: SameNodeJoinCondition) -> Self {
        JoinCondition::SameNode(value)
    }
}

impl From<ChildNodeJoinCondition> for JoinCondition {
    fn from(value: ChildNodeJoinCondition) -> Self {
        JoinCondition::ChildNode(value)
    }
}

impl From<DescendantNodeJoinCondition> for JoinCondition {
    fn from(value: DescendantNodeJoinCondition) -> Self {
        JoinCondition::DescendantNode(value)
    }
}

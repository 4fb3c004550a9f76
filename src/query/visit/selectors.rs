use std::collections::{BTreeMap, BTreeSet, VecDeque};

use crate::query::model::{SelectorName, Subquery};

use super::{visit_all, AstNode, Visitable, Visitor};

/// Every selector name referenced anywhere under `root`.
///
/// Sources contribute their alias when they have one and their name
/// otherwise. Operands, constraints, columns and join conditions contribute
/// the selectors they bind; literals, variables, limits and boolean
/// connectives contribute nothing of their own.
pub fn selectors_referenced_by<T: Visitable + ?Sized>(root: &T) -> BTreeSet<SelectorName> {
    visit_all(root, ReferencedSelectors::default()).0
}

#[derive(Default)]
struct ReferencedSelectors(BTreeSet<SelectorName>);

impl<'a> Visitor<'a> for ReferencedSelectors {
    fn visit(&mut self, node: AstNode<'a>) {
        collect(node, &mut self.0);
    }
}

fn collect(node: AstNode<'_>, names: &mut BTreeSet<SelectorName>) {
    let mut add = |name: &SelectorName| {
        if !names.contains(name) {
            names.insert(name.clone());
        }
    };
    match node {
        AstNode::Selector(s) => add(s.alias_or_name()),
        AstNode::AllNodes(s) => add(s.alias_or_name()),
        AstNode::Column(c) => add(c.selector()),
        AstNode::PropertyValue(o) => add(o.selector()),
        AstNode::ReferenceValue(o) => add(o.selector()),
        AstNode::Length(o) => add(o.selector()),
        AstNode::NodeDepth(o) => add(o.selector()),
        AstNode::NodePath(o) => add(o.selector()),
        AstNode::NodeName(o) => add(o.selector()),
        AstNode::NodeLocalName(o) => add(o.selector()),
        AstNode::FullTextSearchScore(o) => add(o.selector()),
        AstNode::PropertyExistence(c) => add(c.selector()),
        AstNode::FullTextSearch(c) => add(c.selector()),
        AstNode::SameNode(c) => add(c.selector()),
        AstNode::ChildNode(c) => add(c.selector()),
        AstNode::DescendantNode(c) => add(c.selector()),
        AstNode::EquiJoinCondition(c) => {
            add(c.selector1());
            add(c.selector2());
        }
        AstNode::SameNodeJoinCondition(c) => {
            add(c.selector1());
            add(c.selector2());
        }
        AstNode::ChildNodeJoinCondition(c) => {
            add(c.child());
            add(c.parent());
        }
        AstNode::DescendantNodeJoinCondition(c) => {
            add(c.ancestor());
            add(c.descendant());
        }
        _ => {}
    }
}

/// Subqueries under `root`, breadth first. Without `include_nested`, the
/// walk does not descend into a subquery once it has been collected.
pub fn subqueries<T: Visitable + ?Sized>(root: &T, include_nested: bool) -> Vec<&Subquery> {
    let mut found = Vec::new();
    let mut queue = VecDeque::from([root.as_node()]);
    while let Some(node) = queue.pop_front() {
        if let AstNode::Subquery(subquery) = node {
            found.push(subquery);
            if !include_nested {
                continue;
            }
        }
        queue.extend(node.children());
    }
    found
}

/// Map from alias to selector name for every aliased source under `root`.
pub fn selector_names_by_alias<T: Visitable + ?Sized>(
    root: &T,
) -> BTreeMap<SelectorName, SelectorName> {
    visit_all(root, AliasedSources::default())
        .0
        .into_iter()
        .map(|(name, alias)| (alias, name))
        .collect()
}

/// Map from selector name to alias for every aliased source under `root`.
pub fn selector_aliases_by_name<T: Visitable + ?Sized>(
    root: &T,
) -> BTreeMap<SelectorName, SelectorName> {
    visit_all(root, AliasedSources::default())
        .0
        .into_iter()
        .collect()
}

/// `(name, alias)` of every aliased source, in visiting order.
#[derive(Default)]
struct AliasedSources(Vec<(SelectorName, SelectorName)>);

impl<'a> Visitor<'a> for AliasedSources {
    fn visit(&mut self, node: AstNode<'a>) {
        if let Some((name, alias)) = aliased_source(node) {
            self.0.push((name.clone(), alias.clone()));
        }
    }
}

fn aliased_source<'a>(node: AstNode<'a>) -> Option<(&'a SelectorName, &'a SelectorName)> {
    match node {
        AstNode::Selector(s) => s.alias().map(|alias| (s.name(), alias)),
        AstNode::AllNodes(s) => s.alias().map(|alias| (s.name(), alias)),
        _ => None,
    }
}

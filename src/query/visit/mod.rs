//! Traversal over query trees.
//!
//! Every model node can be viewed as an [`AstNode`]. A [`Visitor`] receives
//! nodes one at a time; [`NavigationVisitor`] walks a whole tree breadth
//! first with an explicit queue, and [`ReadableVisitor`] renders canonical
//! text with an explicit stack, so neither depends on call-stack depth.

mod node;
mod readable;
mod selectors;
mod walk;

pub use node::AstNode;
pub use readable::{readable, ReadableVisitor};
pub use selectors::{
    selector_aliases_by_name, selector_names_by_alias, selectors_referenced_by, subqueries,
};
pub use walk::{visit_all, NavigationVisitor};

/// Receives query nodes.
///
/// Closures taking an [`AstNode`] are visitors too.
pub trait Visitor<'a> {
    /// Called once per delivered node.
    fn visit(&mut self, node: AstNode<'a>);
}

impl<'a, F> Visitor<'a> for F
where
    F: FnMut(AstNode<'a>),
{
    fn visit(&mut self, node: AstNode<'a>) {
        self(node)
    }
}

/// Implemented by every model node.
pub trait Visitable {
    /// Borrowed node view.
    fn as_node(&self) -> AstNode<'_>;

    /// Hands this node, and only this node, to `visitor`.
    fn accept<'a>(&'a self, visitor: &mut dyn Visitor<'a>) {
        visitor.visit(self.as_node());
    }
}

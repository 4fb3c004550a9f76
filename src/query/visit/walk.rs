use std::collections::VecDeque;

use super::{AstNode, Visitable, Visitor};

/// Breadth-first walker delivering every node of a tree to a strategy.
///
/// Visiting a node hands it to the strategy, queues its children, and then
/// drains the queue front to back. Each node reaches the strategy exactly
/// once and the call stack stays flat however deep the tree is.
#[derive(Debug)]
pub struct NavigationVisitor<'a, S> {
    strategy: S,
    queue: VecDeque<AstNode<'a>>,
}

impl<'a, S: Visitor<'a>> NavigationVisitor<'a, S> {
    /// Wraps a strategy.
    pub fn new(strategy: S) -> Self {
        Self {
            strategy,
            queue: VecDeque::new(),
        }
    }

    /// Queues a node without visiting it yet.
    pub fn enqueue(&mut self, node: AstNode<'a>) {
        self.queue.push_back(node);
    }

    /// Visits the next queued node. Returns false once the queue is empty.
    pub fn visit_next(&mut self) -> bool {
        let Some(node) = self.queue.pop_front() else {
            return false;
        };
        self.strategy.visit(node);
        self.queue.extend(node.children());
        true
    }

    /// Walks everything reachable from `root`.
    pub fn walk(&mut self, root: AstNode<'a>) {
        self.enqueue(root);
        while self.visit_next() {}
    }

    /// The wrapped strategy.
    pub fn strategy(&self) -> &S {
        &self.strategy
    }

    /// Unwraps the strategy.
    pub fn into_strategy(self) -> S {
        self.strategy
    }
}

impl<'a, S: Visitor<'a>> Visitor<'a> for NavigationVisitor<'a, S> {
    fn visit(&mut self, node: AstNode<'a>) {
        self.walk(node);
    }
}

/// Delivers every node under `root` (inclusive) to `strategy` and returns it.
pub fn visit_all<'a, T, S>(root: &'a T, strategy: S) -> S
where
    T: Visitable + ?Sized,
    S: Visitor<'a>,
{
    let mut navigator = NavigationVisitor::new(strategy);
    root.accept(&mut navigator);
    navigator.into_strategy()
}

//! The caller tree produced by a backward search.

use crate::signature::CallSignature;

/// Role of a node in a [`CallerTree`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, strum::Display)]
#[strum(serialize_all = "lowercase")]
pub enum NodeKind {
    /// The searched method
    Target,
    /// A method calling its parent node
    Caller,
    /// The topmost declaration its parent node was generalized to
    Declaration,
}

/// A node of the caller tree: a method and the nodes derived from it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallerTree {
    /// The method of this node
    pub signature: CallSignature,
    /// How this node relates to its parent
    pub kind: NodeKind,
    /// Callers of this method, or its single generalized declaration
    pub children: Vec<CallerTree>,
}

impl CallerTree {
    /// A node without children.
    pub fn leaf(signature: CallSignature, kind: NodeKind) -> Self {
        CallerTree {
            signature,
            kind,
            children: Vec::new(),
        }
    }

    /// Returns `true` if this node has no children.
    #[must_use]
    pub fn is_leaf(&self) -> bool {
        self.children.is_empty()
    }

    /// Returns `true` if any node carries `signature`.
    #[must_use]
    pub fn contains(&self, signature: &CallSignature) -> bool {
        self.find(signature).is_some()
    }

    /// The first node carrying `signature`, in pre-order.
    #[must_use]
    pub fn find(&self, signature: &CallSignature) -> Option<&CallerTree> {
        self.iter().find(|node| &node.signature == signature)
    }

    /// Number of nodes, this one included.
    #[must_use]
    pub fn len(&self) -> usize {
        self.iter().count()
    }

    /// Always `false`: a tree has at least its root.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        false
    }

    /// Number of nodes on the longest root-to-leaf path.
    #[must_use]
    pub fn depth(&self) -> usize {
        let mut deepest = 0;
        let mut stack = vec![(self, 1)];
        while let Some((node, depth)) = stack.pop() {
            deepest = deepest.max(depth);
            stack.extend(node.children.iter().map(|child| (child, depth + 1)));
        }
        deepest
    }

    /// All nodes without children, in pre-order.
    #[must_use]
    pub fn leaves(&self) -> Vec<&CallerTree> {
        self.iter().filter(|node| node.is_leaf()).collect()
    }

    /// Pre-order traversal over all nodes.
    pub fn iter(&self) -> Iter<'_> {
        Iter { stack: vec![self] }
    }
}

impl<'a> IntoIterator for &'a CallerTree {
    type Item = &'a CallerTree;
    type IntoIter = Iter<'a>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// Pre-order iterator over a [`CallerTree`].
pub struct Iter<'a> {
    stack: Vec<&'a CallerTree>,
}

impl<'a> Iterator for Iter<'a> {
    type Item = &'a CallerTree;

    fn next(&mut self) -> Option<Self::Item> {
        let node = self.stack.pop()?;
        self.stack.extend(node.children.iter().rev());
        Some(node)
    }
}

//! Mutable concrete syntax tree stored in an arena.
//!
//! Nodes are addressed by [`NodeId`] indices into the arena. Every node keeps
//! its parent index and its ordered children, so walking up to an ancestor or
//! across to a sibling is a plain index lookup. Whitespace and comments are
//! ordinary token nodes, which keeps the text of a composite equal to the
//! concatenation of its children by construction: the only edits are
//! [`insert_before`](SyntaxTree::insert_before),
//! [`replace`](SyntaxTree::replace) and [`remove`](SyntaxTree::remove).
//!
//! Removed nodes stay in the arena, detached, and may be re-inserted.

use std::fmt;

use once_cell::unsync::OnceCell;

use crate::error::TreeError;
use crate::kind::SyntaxKind;

/// Stable index of a node inside its [`SyntaxTree`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(u32);

impl NodeId {
    const fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[derive(Debug, Clone)]
struct NodeData {
    kind: SyntaxKind,
    grammar_kind: &'static str,
    /// `Some` for tokens, `None` for composites.
    text: Option<String>,
    children: Vec<NodeId>,
    parent: Option<NodeId>,
    /// Byte length of the node's text.
    len: usize,
}

/// An arena-backed syntax tree with a single root.
#[derive(Debug)]
pub struct SyntaxTree {
    nodes: Vec<NodeData>,
    root: NodeId,
    /// Absolute byte offsets of attached nodes, rebuilt on demand after edits.
    offsets: OnceCell<Vec<usize>>,
}

impl SyntaxTree {
    /// Creates a tree holding an empty composite root.
    #[must_use]
    pub fn new(root_kind: SyntaxKind, grammar_kind: &'static str) -> Self {
        let mut tree = Self {
            nodes: Vec::new(),
            root: NodeId(0),
            offsets: OnceCell::new(),
        };
        tree.root = tree.new_node_of(root_kind, grammar_kind);
        tree
    }

    #[must_use]
    pub const fn root(&self) -> NodeId {
        self.root
    }

    /// Allocates a detached token.
    pub fn new_token(&mut self, kind: SyntaxKind, text: impl Into<String>) -> NodeId {
        self.new_token_of(kind, kind.name(), text)
    }

    /// Allocates a detached token that remembers the grammar's kind name.
    pub fn new_token_of(
        &mut self,
        kind: SyntaxKind,
        grammar_kind: &'static str,
        text: impl Into<String>,
    ) -> NodeId {
        let text = text.into();
        let len = text.len();
        self.alloc(NodeData {
            kind,
            grammar_kind,
            text: Some(text),
            children: Vec::new(),
            parent: None,
            len,
        })
    }

    /// Allocates a detached, empty composite node.
    pub fn new_node(&mut self, kind: SyntaxKind) -> NodeId {
        self.new_node_of(kind, kind.name())
    }

    /// Allocates a detached composite node that remembers the grammar's kind name.
    pub fn new_node_of(&mut self, kind: SyntaxKind, grammar_kind: &'static str) -> NodeId {
        self.alloc(NodeData {
            kind,
            grammar_kind,
            text: None,
            children: Vec::new(),
            parent: None,
            len: 0,
        })
    }

    fn alloc(&mut self, data: NodeData) -> NodeId {
        let id = NodeId(u32::try_from(self.nodes.len()).unwrap_or(u32::MAX));
        self.nodes.push(data);
        id
    }

    fn data(&self, id: NodeId) -> &NodeData {
        &self.nodes[id.index()]
    }

    fn data_mut(&mut self, id: NodeId) -> &mut NodeData {
        &mut self.nodes[id.index()]
    }

    #[must_use]
    pub fn kind(&self, id: NodeId) -> SyntaxKind {
        self.data(id).kind
    }

    /// Kind name reported by the grammar that produced the node.
    #[must_use]
    pub fn grammar_kind(&self, id: NodeId) -> &'static str {
        self.data(id).grammar_kind
    }

    #[must_use]
    pub fn is_token(&self, id: NodeId) -> bool {
        self.data(id).text.is_some()
    }

    /// Literal text of a token, `None` for composites.
    #[must_use]
    pub fn token_text(&self, id: NodeId) -> Option<&str> {
        self.data(id).text.as_deref()
    }

    /// Byte length of the node's text.
    #[must_use]
    pub fn len(&self, id: NodeId) -> usize {
        self.data(id).len
    }

    /// Length of the node's text in characters.
    #[must_use]
    pub fn char_len(&self, id: NodeId) -> usize {
        match self.token_text(id) {
            Some(text) => text.chars().count(),
            None => self.text(id).chars().count(),
        }
    }

    /// Text of the node: the concatenation of all descendant token texts.
    #[must_use]
    pub fn text(&self, id: NodeId) -> String {
        if let Some(text) = self.token_text(id) {
            return text.to_owned();
        }
        let mut out = String::with_capacity(self.len(id));
        for node in self.preorder(id) {
            if let Some(text) = self.token_text(node) {
                out.push_str(text);
            }
        }
        out
    }

    #[must_use]
    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.data(id).parent
    }

    #[must_use]
    pub fn children(&self, id: NodeId) -> &[NodeId] {
        &self.data(id).children
    }

    #[must_use]
    pub fn first_child(&self, id: NodeId) -> Option<NodeId> {
        self.children(id).first().copied()
    }

    #[must_use]
    pub fn last_child(&self, id: NodeId) -> Option<NodeId> {
        self.children(id).last().copied()
    }

    fn index_in_parent(&self, id: NodeId) -> Option<(NodeId, usize)> {
        let parent = self.parent(id)?;
        let index = self.children(parent).iter().position(|&c| c == id)?;
        Some((parent, index))
    }

    #[must_use]
    pub fn prev_sibling(&self, id: NodeId) -> Option<NodeId> {
        let (parent, index) = self.index_in_parent(id)?;
        index
            .checked_sub(1)
            .map(|prev| self.children(parent)[prev])
    }

    #[must_use]
    pub fn next_sibling(&self, id: NodeId) -> Option<NodeId> {
        let (parent, index) = self.index_in_parent(id)?;
        self.children(parent).get(index + 1).copied()
    }

    /// First child of `id` with the given kind.
    #[must_use]
    pub fn child_of_kind(&self, id: NodeId, kind: SyntaxKind) -> Option<NodeId> {
        self.children(id)
            .iter()
            .copied()
            .find(|&c| self.kind(c) == kind)
    }

    /// Ancestors of `id`, nearest first, excluding `id` itself.
    pub fn ancestors(&self, id: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        std::iter::successors(self.parent(id), |&node| self.parent(node))
    }

    /// `id` and its leftmost descendants down to the first leaf.
    pub fn leftmost_path(&self, id: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        std::iter::successors(Some(id), |&node| self.first_child(node))
    }

    /// `id` and its rightmost descendants down to the last leaf.
    pub fn rightmost_path(&self, id: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        std::iter::successors(Some(id), |&node| self.last_child(node))
    }

    /// Whether `id` is the root or reaches it through parent links.
    #[must_use]
    pub fn is_attached(&self, id: NodeId) -> bool {
        id == self.root || self.ancestors(id).any(|a| a == self.root)
    }

    /// Pre-order walk of the subtree rooted at `id`: the node first, then its
    /// children left to right, recursively.
    #[must_use]
    pub fn preorder(&self, id: NodeId) -> Preorder<'_> {
        Preorder {
            tree: self,
            stack: vec![id],
        }
    }

    /// Absolute byte offset of an attached node. Detached nodes report `0`.
    #[must_use]
    pub fn offset(&self, id: NodeId) -> usize {
        self.offsets.get_or_init(|| self.compute_offsets())[id.index()]
    }

    fn compute_offsets(&self) -> Vec<usize> {
        let mut offsets = vec![0; self.nodes.len()];
        let mut stack = vec![self.root];
        while let Some(node) = stack.pop() {
            let mut running = offsets[node.index()];
            for &child in self.children(node) {
                offsets[child.index()] = running;
                running += self.len(child);
                stack.push(child);
            }
        }
        offsets
    }

    /// Token covering the byte `offset` of the root text.
    #[must_use]
    pub fn leaf_at(&self, offset: usize) -> Option<NodeId> {
        if offset >= self.len(self.root) {
            return None;
        }
        let mut node = self.root;
        let mut rel = offset;
        while !self.is_token(node) {
            let mut next = None;
            for &child in self.children(node) {
                let len = self.len(child);
                if rel < len {
                    next = Some(child);
                    break;
                }
                rel -= len;
            }
            node = next?;
        }
        Some(node)
    }

    fn invalidate(&mut self) {
        self.offsets.take();
    }

    fn grow(&mut self, from: Option<NodeId>, delta: usize) {
        let mut cursor = from;
        while let Some(node) = cursor {
            let data = self.data_mut(node);
            data.len += delta;
            cursor = data.parent;
        }
    }

    fn shrink(&mut self, from: Option<NodeId>, delta: usize) {
        let mut cursor = from;
        while let Some(node) = cursor {
            let data = self.data_mut(node);
            data.len -= delta;
            cursor = data.parent;
        }
    }

    fn check_insertable(&self, parent: NodeId, child: NodeId) -> Result<(), TreeError> {
        if self.is_token(parent) {
            return Err(TreeError::NotComposite(parent));
        }
        if self.parent(child).is_some() || child == self.root {
            return Err(TreeError::AlreadyAttached(child));
        }
        if child == parent || self.ancestors(parent).any(|a| a == child) {
            return Err(TreeError::WouldCycle(child));
        }
        Ok(())
    }

    /// Appends a detached `child` as the last child of `parent`.
    pub fn append_child(&mut self, parent: NodeId, child: NodeId) -> Result<(), TreeError> {
        self.insert_before(parent, child, None)
    }

    /// Inserts a detached `child` into `parent` right before `anchor`, or at
    /// the end when `anchor` is `None`.
    pub fn insert_before(
        &mut self,
        parent: NodeId,
        child: NodeId,
        anchor: Option<NodeId>,
    ) -> Result<(), TreeError> {
        self.check_insertable(parent, child)?;
        let index = match anchor {
            Some(anchor) => self
                .children(parent)
                .iter()
                .position(|&c| c == anchor)
                .ok_or(TreeError::NotAChild {
                    parent,
                    child: anchor,
                })?,
            None => self.children(parent).len(),
        };
        self.data_mut(parent).children.insert(index, child);
        self.data_mut(child).parent = Some(parent);
        let len = self.len(child);
        self.grow(Some(parent), len);
        self.invalidate();
        Ok(())
    }

    /// Puts the detached node `new` in place of the attached node `old`,
    /// which becomes detached.
    pub fn replace(&mut self, old: NodeId, new: NodeId) -> Result<(), TreeError> {
        let (parent, index) = self.index_in_parent(old).ok_or(TreeError::Detached(old))?;
        self.check_insertable(parent, new)?;
        self.data_mut(parent).children[index] = new;
        self.data_mut(new).parent = Some(parent);
        self.data_mut(old).parent = None;
        let (old_len, new_len) = (self.len(old), self.len(new));
        if new_len >= old_len {
            self.grow(Some(parent), new_len - old_len);
        } else {
            self.shrink(Some(parent), old_len - new_len);
        }
        self.invalidate();
        Ok(())
    }

    /// Detaches `child` from its parent.
    pub fn remove(&mut self, child: NodeId) -> Result<(), TreeError> {
        let (parent, index) = self
            .index_in_parent(child)
            .ok_or(TreeError::Detached(child))?;
        self.data_mut(parent).children.remove(index);
        self.data_mut(child).parent = None;
        let len = self.len(child);
        self.shrink(Some(parent), len);
        self.invalidate();
        Ok(())
    }
}

/// Iterator returned by [`SyntaxTree::preorder`].
pub struct Preorder<'a> {
    tree: &'a SyntaxTree,
    stack: Vec<NodeId>,
}

impl Iterator for Preorder<'_> {
    type Item = NodeId;

    fn next(&mut self) -> Option<NodeId> {
        let node = self.stack.pop()?;
        self.stack
            .extend(self.tree.children(node).iter().rev().copied());
        Some(node)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// `f(a, b)` as PROGRAM > ARGUMENT_LIST tokens.
    fn call_tree() -> (SyntaxTree, NodeId) {
        let mut tree = SyntaxTree::new(SyntaxKind::Program, "program");
        let root = tree.root();
        let name = tree.new_token(SyntaxKind::Identifier, "f");
        tree.append_child(root, name).unwrap();
        let args = tree.new_node(SyntaxKind::ArgumentList);
        for (kind, text) in [
            (SyntaxKind::LParen, "("),
            (SyntaxKind::Identifier, "a"),
            (SyntaxKind::Comma, ","),
            (SyntaxKind::Whitespace, " "),
            (SyntaxKind::Identifier, "b"),
            (SyntaxKind::RParen, ")"),
        ] {
            let token = tree.new_token(kind, text);
            tree.append_child(args, token).unwrap();
        }
        tree.append_child(root, args).unwrap();
        (tree, args)
    }

    #[test]
    fn text_is_concatenation_of_leaves() {
        let (tree, args) = call_tree();
        assert_eq!(tree.text(tree.root()), "f(a, b)");
        assert_eq!(tree.text(args), "(a, b)");
        assert_eq!(tree.len(tree.root()), 7);
    }

    #[test]
    fn offsets_follow_left_siblings() {
        let (tree, args) = call_tree();
        let b = tree.children(args)[4];
        assert_eq!(tree.offset(args), 1);
        assert_eq!(tree.offset(b), 5);
        assert_eq!(tree.leaf_at(5), Some(b));
        assert_eq!(tree.leaf_at(7), None);
    }

    #[test]
    fn edits_keep_lengths_and_offsets_current() {
        let (mut tree, args) = call_tree();
        let b = tree.children(args)[4];
        assert_eq!(tree.offset(b), 5);

        let space = tree.children(args)[3];
        let line_break = tree.new_token(SyntaxKind::Whitespace, "\n    ");
        tree.replace(space, line_break).unwrap();
        assert_eq!(tree.text(tree.root()), "f(a,\n    b)");
        assert_eq!(tree.offset(b), 9);
        assert!(!tree.is_attached(space));

        let rparen = tree.last_child(args).unwrap();
        let nl = tree.new_token(SyntaxKind::Whitespace, "\n");
        tree.insert_before(args, nl, Some(rparen)).unwrap();
        assert_eq!(tree.text(tree.root()), "f(a,\n    b\n)");

        tree.remove(nl).unwrap();
        assert_eq!(tree.text(tree.root()), "f(a,\n    b)");
        assert_eq!(tree.len(tree.root()), 11);
    }

    #[test]
    fn siblings_and_ancestors() {
        let (tree, args) = call_tree();
        let a = tree.children(args)[1];
        assert_eq!(tree.prev_sibling(a), tree.first_child(args));
        assert_eq!(tree.kind(tree.next_sibling(a).unwrap()), SyntaxKind::Comma);
        assert_eq!(tree.next_sibling(args), None);
        assert_eq!(tree.ancestors(a).collect::<Vec<_>>(), vec![args, tree.root()]);
        assert_eq!(
            tree.leftmost_path(args).last().map(|n| tree.kind(n)),
            Some(SyntaxKind::LParen)
        );
        assert_eq!(
            tree.rightmost_path(tree.root()).last().map(|n| tree.kind(n)),
            Some(SyntaxKind::RParen)
        );
    }

    #[test]
    fn preorder_visits_root_first_then_children_in_order() {
        let (tree, _) = call_tree();
        let texts: Vec<String> = tree
            .preorder(tree.root())
            .filter(|&n| tree.is_token(n))
            .map(|n| tree.text(n))
            .collect();
        assert_eq!(texts, ["f", "(", "a", ",", " ", "b", ")"]);
    }

    #[test]
    fn invalid_edits_are_rejected() {
        let (mut tree, args) = call_tree();
        let a = tree.children(args)[1];
        let stray = tree.new_token(SyntaxKind::Whitespace, " ");

        assert_eq!(tree.remove(stray), Err(TreeError::Detached(stray)));
        assert_eq!(
            tree.insert_before(args, a, None),
            Err(TreeError::AlreadyAttached(a))
        );
        assert_eq!(
            tree.insert_before(a, stray, None),
            Err(TreeError::NotComposite(a))
        );
        let root = tree.root();
        assert_eq!(
            tree.insert_before(root, stray, Some(a)),
            Err(TreeError::NotAChild { parent: root, child: a })
        );

        tree.remove(args).unwrap();
        assert_eq!(
            tree.insert_before(args, args, None),
            Err(TreeError::WouldCycle(args))
        );
    }
}

//! Expression trees rebuilt from prefix-order node sequences.
//!
//! A genetic-programming individual is a flat list in which every primitive
//! is immediately followed by the flattened sub-trees of its arguments:
//!
//! ```text
//! [add, x, mul, 3, x]   →   add
//!                          ├─ x
//!                          └─ mul
//!                             ├─ 3
//!                             └─ x
//! ```
//!
//! Reconstruction threads one shared [`Cursor`] through a recursive descent:
//! each call takes the node under the cursor, advances it, and then builds
//! one child per arity slot. Every child call advances the same cursor, so a
//! well-formed sequence is consumed exactly once, left to right. Sequences
//! whose arities do not partition their length are rejected, and so are
//! trees with more than [`MAX_DEPTH`] levels. Every traversal here and in
//! the renderer recurses once per level, so that limit bounds their stack
//! use too.
//!
//! Each [`Tree`] also carries a value slot. [`Tree::evaluate_all`] compiles
//! and runs every node's own sub-expression, so intermediate results are
//! available to the renderer and not just the root's.

mod compile;

#[cfg(test)]
mod tests;

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use crate::error::{Result, TreeError};
use crate::hash::{hash_nodes, ContentHash};
use crate::pset::{Node, PrimitiveSet};
use crate::value::Value;

pub use compile::{Instr, Program};

static NEXT_TREE_ID: AtomicU64 = AtomicU64::new(1);

/// Most nodes on any root-to-leaf path. A lone terminal has one level.
pub const MAX_DEPTH: usize = 128;

/// Process-unique handle for one tree instance. Never derived from content.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TreeId(u64);

impl TreeId {
    fn fresh() -> Self {
        Self(NEXT_TREE_ID.fetch_add(1, Ordering::Relaxed))
    }

    pub fn get(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for TreeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A single shared read position over a node sequence.
struct Cursor<'a> {
    nodes: &'a [Node],
    pos: usize,
}

impl<'a> Cursor<'a> {
    fn new(nodes: &'a [Node]) -> Self {
        Self { nodes, pos: 0 }
    }

    fn next(&mut self) -> Result<&'a Node> {
        let node = self
            .nodes
            .get(self.pos)
            .ok_or(TreeError::TruncatedSequence {
                needed_at: self.pos,
                len: self.nodes.len(),
            })?;
        self.pos += 1;
        Ok(node)
    }
}

/// An expression tree node with its children, context and last value.
#[derive(Debug)]
pub struct Tree {
    id: TreeId,
    node: Node,
    children: Vec<Tree>,
    pset: Arc<PrimitiveSet>,
    value: Option<Value>,
}

impl Tree {
    /// Wrap a node and exactly `node.arity()` children.
    pub fn new(node: Node, children: Vec<Tree>, pset: Arc<PrimitiveSet>) -> Result<Self> {
        if children.len() != node.arity() {
            return Err(TreeError::Arity {
                name: node.name().to_string(),
                expected: node.arity(),
                found: children.len(),
            });
        }
        if children.iter().any(|c| c.height() + 1 >= MAX_DEPTH) {
            return Err(TreeError::TooDeep { max: MAX_DEPTH });
        }
        Ok(Self {
            id: TreeId::fresh(),
            node,
            children,
            pset,
            value: None,
        })
    }

    /// Rebuild the nested tree from a prefix-order sequence.
    ///
    /// The whole sequence must be consumed by the root: running out of
    /// nodes mid-way or finishing with a remainder are both corruption.
    pub fn reconstruct(sequence: &[Node], pset: Arc<PrimitiveSet>) -> Result<Self> {
        if sequence.is_empty() {
            return Err(TreeError::EmptySequence);
        }
        let mut cursor = Cursor::new(sequence);
        let tree = Self::build(&mut cursor, &pset, 1)?;
        if cursor.pos != sequence.len() {
            return Err(TreeError::TrailingNodes {
                consumed: cursor.pos,
                len: sequence.len(),
            });
        }
        Ok(tree)
    }

    fn build(cursor: &mut Cursor<'_>, pset: &Arc<PrimitiveSet>, level: usize) -> Result<Self> {
        if level > MAX_DEPTH {
            return Err(TreeError::TooDeep { max: MAX_DEPTH });
        }
        let node = cursor.next()?.clone();
        let children = (0..node.arity())
            .map(|_| Self::build(cursor, pset, level + 1))
            .collect::<Result<Vec<_>>>()?;
        Ok(Self {
            id: TreeId::fresh(),
            node,
            children,
            pset: Arc::clone(pset),
            value: None,
        })
    }

    /// Parse an expression string in `pset` and reconstruct it.
    pub fn from_expr(source: &str, pset: Arc<PrimitiveSet>) -> Result<Self> {
        let sequence = pset.parse(source)?;
        Self::reconstruct(&sequence, pset)
    }

    pub fn id(&self) -> TreeId {
        self.id
    }

    pub fn node(&self) -> &Node {
        &self.node
    }

    pub fn children(&self) -> &[Tree] {
        &self.children
    }

    pub fn pset(&self) -> &Arc<PrimitiveSet> {
        &self.pset
    }

    /// Value from the last evaluation, `None` until evaluated.
    pub fn value(&self) -> Option<&Value> {
        self.value.as_ref()
    }

    pub fn is_leaf(&self) -> bool {
        self.children.is_empty()
    }

    /// Number of nodes in this tree.
    pub fn len(&self) -> usize {
        1 + self.children.iter().map(Tree::len).sum::<usize>()
    }

    /// Edges on the longest root-to-leaf path; a lone terminal has height 0.
    pub fn height(&self) -> usize {
        self.children
            .iter()
            .map(|c| c.height() + 1)
            .max()
            .unwrap_or(0)
    }

    /// All sub-trees in depth-first pre-order, starting with `self`.
    pub fn nodes(&self) -> Vec<&Tree> {
        let mut out = Vec::with_capacity(self.len());
        self.collect_nodes(&mut out);
        out
    }

    fn collect_nodes<'a>(&'a self, out: &mut Vec<&'a Tree>) {
        out.push(self);
        for child in &self.children {
            child.collect_nodes(out);
        }
    }

    /// The prefix-order sequence this tree represents.
    pub fn flatten(&self) -> Vec<Node> {
        self.nodes().into_iter().map(|t| t.node.clone()).collect()
    }

    /// Structural hash; equal for trees built from equal sequences.
    pub fn content_hash(&self) -> ContentHash {
        hash_nodes(self.nodes().into_iter().map(|t| &t.node))
    }

    /// Compile this sub-tree into a callable program over its set's arguments.
    pub fn compile(&self) -> Result<Program> {
        Program::compile(self)
    }

    /// Compile and run this sub-tree without touching any value slot.
    pub fn evaluate(&self, args: &[Value]) -> Result<Value> {
        self.compile()?.run(args)
    }

    /// Evaluate every node independently and cache the result on it.
    ///
    /// The root is compiled and run first, then each child in order, each
    /// from scratch. This repeats work the root evaluation already did, but
    /// it leaves every node holding its own value.
    pub fn evaluate_all(&mut self, args: &[Value]) -> Result<()> {
        let value = self.evaluate(args)?;
        log::debug!("tree {} `{}` = {}", self.id, self, value);
        self.value = Some(value);
        for child in &mut self.children {
            child.evaluate_all(args)?;
        }
        Ok(())
    }

    /// Drop every cached value.
    pub fn clear_values(&mut self) {
        self.value = None;
        for child in &mut self.children {
            child.clear_values();
        }
    }
}

/// Cloning allocates fresh ids so a copy never aliases the original's
/// graph nodes or image files.
impl Clone for Tree {
    fn clone(&self) -> Self {
        Self {
            id: TreeId::fresh(),
            node: self.node.clone(),
            children: self.children.clone(),
            pset: Arc::clone(&self.pset),
            value: self.value.clone(),
        }
    }
}

/// Formats as the expression the tree was built from, e.g. `add(x, 3)`.
impl fmt::Display for Tree {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let children: Vec<String> = self.children.iter().map(Tree::to_string).collect();
        write!(f, "{}", self.node.format(&children))
    }
}

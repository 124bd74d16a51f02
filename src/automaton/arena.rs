//! Arena-based node allocation for cyclic automata.
//!
//! Automaton graphs are full of cycles (`*` loops back to its own start), so
//! nodes never reference each other directly. A `NodeId` is an index into
//! the `NodeArena` that owns every node of one automaton; the arena hands out
//! identifiers in increasing order and frees everything when dropped.
//!
//! ```text
//!   start --ε--> a.start --[a-z]--> a.end --ε--> end
//!     |             ^                  |
//!     |             +--------ε---------+
//!     +---------------------ε------------------> end
//! ```

use std::cmp::Ordering;
use std::fmt;

use super::edge::{Edge, EPSILON};
use crate::rbtree::RbTree;

/// Index of a node inside its arena.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NodeId(u32);

impl NodeId {
    #[inline]
    pub fn new(index: u32) -> Self {
        NodeId(index)
    }

    #[inline]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Debug for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Identifies the lexer rule whose handler fires in an accepting node.
///
/// Lower ids belong to rules declared earlier and win ties.
pub type HandlerId = u32;

type EdgeSet = RbTree<Edge, fn(&Edge, &Edge) -> Ordering>;

/// A state of an NFA or DFA.
#[derive(Clone)]
pub struct AutomatonNode {
    id: NodeId,
    /// Outgoing edges, pairwise disjoint. Epsilon edges sort after every
    /// character edge and collapse into a single multi-target edge.
    edges: EdgeSet,
    /// Rules accepted in this node, earliest declared first.
    handlers: Vec<HandlerId>,
}

impl fmt::Debug for AutomatonNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AutomatonNode")
            .field("id", &self.id)
            .field("edges", &self.edges)
            .field("handlers", &self.handlers)
            .finish()
    }
}

impl AutomatonNode {
    fn new(id: NodeId) -> Self {
        Self {
            id,
            edges: RbTree::new(Edge::compare as fn(&Edge, &Edge) -> Ordering),
            handlers: Vec::new(),
        }
    }

    pub fn id(&self) -> NodeId {
        self.id
    }

    /// Add an edge, splitting it against any overlapping edge so that all
    /// outgoing edges stay pairwise disjoint.
    pub fn add_edge(&mut self, edge: Edge) {
        if edge.is_never() {
            return;
        }
        match self.edges.remove(&edge) {
            Some(existing) => {
                for piece in existing.separate(&edge) {
                    self.add_edge(piece);
                }
            }
            None => {
                self.edges.add(edge);
            }
        }
    }

    /// Character edges in range order, epsilon edge excluded.
    pub fn edges(&self) -> impl Iterator<Item = &Edge> {
        self.edges.iter().filter(|edge| !edge.is_epsilon())
    }

    pub fn edge_count(&self) -> usize {
        self.edges().count()
    }

    /// Targets reachable without consuming input.
    pub fn epsilon_targets(&self) -> &[NodeId] {
        match self.edges.find(&Edge::probe(EPSILON)) {
            Some(edge) => edge.targets.as_slice(),
            None => &[],
        }
    }

    /// The edge whose range contains `code`.
    pub fn edge_for(&self, code: u32) -> Option<&Edge> {
        self.edges.find(&Edge::probe(code))
    }

    /// Remove and return every edge, epsilon included, in range order.
    pub fn take_edges(&mut self) -> Vec<Edge> {
        self.edges.drain_sorted()
    }

    pub fn handlers(&self) -> &[HandlerId] {
        &self.handlers
    }

    pub fn is_accepting(&self) -> bool {
        !self.handlers.is_empty()
    }

    /// Record that this node accepts `handler`, keeping the list sorted.
    pub fn add_handler(&mut self, handler: HandlerId) {
        if let Err(at) = self.handlers.binary_search(&handler) {
            self.handlers.insert(at, handler);
        }
    }

    /// Replace the handler list verbatim, preserving the given priority.
    pub(crate) fn set_handlers(&mut self, handlers: Vec<HandlerId>) {
        self.handlers = handlers;
    }
}

/// Owner of every node of one automaton.
#[derive(Clone, Default)]
pub struct NodeArena {
    nodes: Vec<AutomatonNode>,
}

impl fmt::Debug for NodeArena {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NodeArena")
            .field("nodes_count", &self.nodes.len())
            .finish()
    }
}

impl NodeArena {
    pub fn new() -> Self {
        Self { nodes: Vec::new() }
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            nodes: Vec::with_capacity(capacity),
        }
    }

    /// Allocate a fresh node without edges.
    pub fn alloc(&mut self) -> NodeId {
        let id = NodeId(self.nodes.len() as u32);
        self.nodes.push(AutomatonNode::new(id));
        id
    }

    /// Shorthand for `arena[from].add_edge(edge)`.
    pub fn add_edge(&mut self, from: NodeId, edge: Edge) {
        self[from].add_edge(edge);
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &AutomatonNode> {
        self.nodes.iter()
    }
}

impl std::ops::Index<NodeId> for NodeArena {
    type Output = AutomatonNode;

    #[inline]
    fn index(&self, id: NodeId) -> &Self::Output {
        &self.nodes[id.index()]
    }
}

impl std::ops::IndexMut<NodeId> for NodeArena {
    #[inline]
    fn index_mut(&mut self, id: NodeId) -> &mut Self::Output {
        &mut self.nodes[id.index()]
    }
}

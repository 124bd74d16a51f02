//! Interval-labeled finite automata.
//!
//! The pieces, leaves first:
//!
//! - `edge`: transitions over closed code-point ranges, and the interval
//!   algebra used to keep a node's edges disjoint
//! - `arena`: nodes addressed by [`NodeId`] inside a [`NodeArena`]
//! - `nfa`: Thompson-style combinators and epsilon closure
//! - `subset`: NFA to DFA conversion
//! - `dfa`: longest-match scanning, serialization

mod arena;
mod dfa;
mod edge;
mod nfa;
mod subset;

pub use arena::{AutomatonNode, HandlerId, NodeArena, NodeId};
pub use dfa::{
    Dfa, Handler, HandlerTable, ScanError, SerializedDfa, SerializedEdge, SerializedNode,
};
pub use edge::{Edge, Targets, CODE_MAX, EPSILON, NEVER};
pub use nfa::{closure, signature, Nfa};
pub use subset::subset_construction;

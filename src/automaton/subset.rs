//! NFA to DFA conversion by subset construction.
//!
//! Each DFA node stands for the epsilon closure of a set of NFA nodes. Sets
//! are memoized by their [`signature`], so a set reached along several
//! paths becomes a single DFA node.
//!
//! The outgoing character edges of every NFA node in a set are first poured
//! into the DFA node's own edge tree. Edge insertion partitions overlapping
//! ranges, so what comes out is a list of disjoint ranges, each carrying the
//! raw NFA targets of every contributing edge. Those target sets are then
//! closed and resolved to DFA nodes one range at a time.

use std::collections::VecDeque;

use log::debug;
use rustc_hash::FxHashMap;
use smallvec::smallvec;

use super::arena::{NodeArena, NodeId};
use super::edge::Edge;
use super::nfa::{closure, signature};
use crate::Error;

struct SubsetBuilder<'a> {
    nfa: &'a NodeArena,
    dfa: NodeArena,
    memo: FxHashMap<String, NodeId>,
    worklist: VecDeque<(NodeId, Vec<NodeId>)>,
    max_states: Option<usize>,
}

impl<'a> SubsetBuilder<'a> {
    fn new(nfa: &'a NodeArena, max_states: Option<usize>) -> Self {
        Self {
            nfa,
            dfa: NodeArena::new(),
            memo: FxHashMap::default(),
            worklist: VecDeque::new(),
            max_states,
        }
    }

    /// DFA node for a closed NFA set, allocated and queued on first sight.
    fn resolve(&mut self, set: Vec<NodeId>) -> Result<NodeId, Error> {
        let key = signature(&set);
        if let Some(&existing) = self.memo.get(&key) {
            return Ok(existing);
        }
        if let Some(limit) = self.max_states {
            if self.dfa.len() >= limit {
                return Err(Error::TooManyStates { limit });
            }
        }

        let id = self.dfa.alloc();
        for &node in &set {
            for &handler in self.nfa[node].handlers() {
                self.dfa[id].add_handler(handler);
            }
        }
        self.memo.insert(key, id);
        self.worklist.push_back((id, set));
        Ok(id)
    }

    fn expand(&mut self, current: NodeId, set: &[NodeId]) -> Result<(), Error> {
        for &node in set {
            for edge in self.nfa[node].edges() {
                self.dfa.add_edge(current, edge.clone());
            }
        }

        // Targets are still NFA ids at this point.
        for edge in self.dfa[current].take_edges() {
            let closed = closure(self.nfa, edge.targets.iter().copied());
            let target = self.resolve(closed)?;
            self.dfa.add_edge(
                current,
                Edge {
                    start: edge.start,
                    end: edge.end,
                    targets: smallvec![target],
                },
            );
        }
        Ok(())
    }

    fn run(mut self, start: NodeId) -> Result<(NodeArena, NodeId), Error> {
        let initial = closure(self.nfa, [start]);
        let dfa_start = self.resolve(initial)?;
        while let Some((current, set)) = self.worklist.pop_front() {
            self.expand(current, &set)?;
        }
        debug!(
            "subset construction: {} NFA nodes -> {} DFA states",
            self.nfa.len(),
            self.dfa.len()
        );
        Ok((self.dfa, dfa_start))
    }
}

/// Build a DFA equivalent to the NFA rooted at `start`.
///
/// The DFA lives in a fresh arena; every edge in it has exactly one target
/// and the edges leaving any node are pairwise disjoint. A node accepts
/// every handler accepted by one of its NFA nodes, lowest id first.
///
/// With `max_states` set, construction stops with
/// [`Error::TooManyStates`] once the DFA would grow past that many nodes.
pub fn subset_construction(
    nfa: &NodeArena,
    start: NodeId,
    max_states: Option<usize>,
) -> Result<(NodeArena, NodeId), Error> {
    SubsetBuilder::new(nfa, max_states).run(start)
}

//! Thompson construction over the node arena.
//!
//! An [`Nfa`] is just a `(start, end)` pair of nodes inside a [`NodeArena`];
//! combinators rewire edges in the arena and update the pair in place. Every
//! fragment has exactly one entry and one exit, so fragments compose with
//! epsilon edges:
//!
//! - `concatenate`: `a.end --ε--> b.start`
//! - `union`: new start branches to both starts, both ends meet at a new end
//! - `kleene_closure`: new start may skip to a new end or enter the body, the
//!   body's end loops back to its start or leaves

use std::collections::VecDeque;

use log::trace;
use rustc_hash::{FxHashMap, FxHashSet};

use super::arena::{HandlerId, NodeArena, NodeId};
use super::edge::{Edge, CODE_MAX};
use crate::Error;

/// A fragment of a nondeterministic automaton.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Nfa {
    pub start: NodeId,
    pub end: NodeId,
}

impl Nfa {
    fn fresh(arena: &mut NodeArena) -> Self {
        let start = arena.alloc();
        let end = arena.alloc();
        Nfa { start, end }
    }

    /// Two nodes joined by one edge over `[lo, hi]`.
    pub fn literal(arena: &mut NodeArena, lo: u32, hi: u32) -> Result<Self, Error> {
        let nfa = Self::fresh(arena);
        arena.add_edge(nfa.start, Edge::new(lo, hi, [nfa.end])?);
        Ok(nfa)
    }

    /// Matches any single code point.
    pub fn any(arena: &mut NodeArena) -> Self {
        let nfa = Self::fresh(arena);
        arena.add_edge(nfa.start, Edge::full_range([nfa.end]));
        nfa
    }

    /// Matches one code point from any of `ranges`.
    ///
    /// Overlapping ranges are merged by the edge partitioning in
    /// [`AutomatonNode::add_edge`](super::AutomatonNode::add_edge).
    pub fn class(arena: &mut NodeArena, ranges: &[(u32, u32)]) -> Result<Self, Error> {
        if ranges.is_empty() {
            return Err(Error::EmptyClass);
        }
        let nfa = Self::fresh(arena);
        for &(lo, hi) in ranges {
            arena.add_edge(nfa.start, Edge::new(lo, hi, [nfa.end])?);
        }
        Ok(nfa)
    }

    /// Matches one code point outside every one of `ranges`.
    ///
    /// Each range is negated with [`Edge::not`] and the complements are
    /// intersected, so `[^ab]` excludes both `a` and `b`. A class that
    /// excludes the whole code space yields a fragment with no path from
    /// start to end.
    pub fn negated_class(arena: &mut NodeArena, ranges: &[(u32, u32)]) -> Result<Self, Error> {
        if ranges.is_empty() {
            return Err(Error::EmptyClass);
        }
        let mut allowed = vec![(0, CODE_MAX)];
        for &(lo, hi) in ranges {
            let complement: Vec<(u32, u32)> = Edge::new(lo, hi, [])?
                .not()
                .into_iter()
                .filter(|edge| !edge.is_never())
                .map(|edge| (edge.start, edge.end))
                .collect();
            allowed = intersect(&allowed, &complement);
        }

        let nfa = Self::fresh(arena);
        for (lo, hi) in allowed {
            arena.add_edge(nfa.start, Edge::new(lo, hi, [nfa.end])?);
        }
        Ok(nfa)
    }

    /// Append `next`, linking this fragment's end to its start.
    pub fn concatenate(&mut self, arena: &mut NodeArena, next: Nfa) {
        arena.add_edge(self.end, Edge::epsilon([next.start]));
        self.end = next.end;
    }

    /// Accept either this fragment or `other`.
    pub fn union(&mut self, arena: &mut NodeArena, other: Nfa) {
        let start = arena.alloc();
        let end = arena.alloc();
        arena.add_edge(start, Edge::epsilon([self.start, other.start]));
        arena.add_edge(self.end, Edge::epsilon([end]));
        arena.add_edge(other.end, Edge::epsilon([end]));
        *self = Nfa { start, end };
    }

    /// Zero or more repetitions.
    pub fn kleene_closure(&mut self, arena: &mut NodeArena) {
        let start = arena.alloc();
        let end = arena.alloc();
        arena.add_edge(start, Edge::epsilon([self.start, end]));
        arena.add_edge(self.end, Edge::epsilon([self.start, end]));
        *self = Nfa { start, end };
    }

    /// One or more repetitions: a copy of the fragment followed by its
    /// closure.
    ///
    /// The copy keeps the mandatory first pass from sharing nodes with the
    /// loop.
    pub fn plus(&mut self, arena: &mut NodeArena) {
        let mut once = self.deep_clone(arena);
        self.kleene_closure(arena);
        once.concatenate(arena, *self);
        *self = once;
    }

    /// Copy every node reachable from `start` into fresh nodes.
    pub fn deep_clone(&self, arena: &mut NodeArena) -> Nfa {
        let mut mapping: FxHashMap<NodeId, NodeId> = FxHashMap::default();
        let mut queue = VecDeque::new();
        mapping.insert(self.start, arena.alloc());
        queue.push_back(self.start);

        while let Some(old) = queue.pop_front() {
            let copy = mapping[&old];
            let edges: Vec<Edge> = arena[old]
                .edges()
                .cloned()
                .chain(
                    Some(arena[old].epsilon_targets())
                        .filter(|targets| !targets.is_empty())
                        .map(|targets| Edge::epsilon(targets.iter().copied())),
                )
                .collect();
            for handler in arena[old].handlers().to_vec() {
                arena[copy].add_handler(handler);
            }

            for mut edge in edges {
                for target in edge.targets.iter_mut() {
                    let old_target = *target;
                    *target = match mapping.get(&old_target) {
                        Some(&mapped) => mapped,
                        None => {
                            let mapped = arena.alloc();
                            mapping.insert(old_target, mapped);
                            queue.push_back(old_target);
                            mapped
                        }
                    };
                }
                arena.add_edge(copy, edge);
            }
        }

        let end = match mapping.get(&self.end) {
            Some(&end) => end,
            // End unreachable from start: keep the shape with a fresh node.
            None => arena.alloc(),
        };
        trace!("cloned fragment {:?} into {} nodes", self, mapping.len());
        Nfa {
            start: mapping[&self.start],
            end,
        }
    }

    /// Mark this fragment's end as accepting for `handler`.
    pub fn accept(&self, arena: &mut NodeArena, handler: HandlerId) {
        arena[self.end].add_handler(handler);
    }
}

/// All nodes reachable from `nodes` through epsilon edges, the inputs
/// included, each listed once and sorted by id.
pub fn closure<I>(arena: &NodeArena, nodes: I) -> Vec<NodeId>
where
    I: IntoIterator<Item = NodeId>,
{
    let mut seen: FxHashSet<NodeId> = FxHashSet::default();
    let mut queue: VecDeque<NodeId> = VecDeque::new();
    for node in nodes {
        if seen.insert(node) {
            queue.push_back(node);
        }
    }
    while let Some(node) = queue.pop_front() {
        for &next in arena[node].epsilon_targets() {
            if seen.insert(next) {
                queue.push_back(next);
            }
        }
    }
    let mut result: Vec<NodeId> = seen.into_iter().collect();
    result.sort_unstable();
    result
}

/// Memo key for a sorted node set: ids joined by commas.
pub fn signature(nodes: &[NodeId]) -> String {
    nodes
        .iter()
        .map(|node| node.to_string())
        .collect::<Vec<_>>()
        .join(",")
}

/// Intersection of two sorted lists of disjoint closed ranges.
fn intersect(a: &[(u32, u32)], b: &[(u32, u32)]) -> Vec<(u32, u32)> {
    let mut out = Vec::new();
    let (mut i, mut j) = (0, 0);
    while i < a.len() && j < b.len() {
        let lo = a[i].0.max(b[j].0);
        let hi = a[i].1.min(b[j].1);
        if lo <= hi {
            out.push((lo, hi));
        }
        if a[i].1 < b[j].1 {
            i += 1;
        } else {
            j += 1;
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Simulate the fragment on `input`, true when `end` is reached after
    /// consuming everything.
    fn accepts(arena: &NodeArena, nfa: Nfa, input: &str) -> bool {
        let mut current = closure(arena, [nfa.start]);
        for ch in input.chars() {
            let code = ch as u32;
            let next: Vec<NodeId> = current
                .iter()
                .filter_map(|&node| arena[node].edge_for(code))
                .flat_map(|edge| edge.targets.iter().copied())
                .collect();
            current = closure(arena, next);
        }
        current.contains(&nfa.end)
    }

    fn ch(c: char) -> u32 {
        c as u32
    }

    #[test]
    fn test_literal() {
        let mut arena = NodeArena::new();
        let nfa = Nfa::literal(&mut arena, ch('a'), ch('c')).unwrap();
        assert!(accepts(&arena, nfa, "b"));
        assert!(!accepts(&arena, nfa, "d"));
        assert!(!accepts(&arena, nfa, ""));
    }

    #[test]
    fn test_literal_malformed() {
        let mut arena = NodeArena::new();
        assert!(matches!(
            Nfa::literal(&mut arena, 10, 5),
            Err(Error::MalformedInterval { .. })
        ));
    }

    #[test]
    fn test_concatenate_and_union() {
        let mut arena = NodeArena::new();
        let mut ab = Nfa::literal(&mut arena, ch('a'), ch('a')).unwrap();
        let b = Nfa::literal(&mut arena, ch('b'), ch('b')).unwrap();
        ab.concatenate(&mut arena, b);
        assert!(accepts(&arena, ab, "ab"));
        assert!(!accepts(&arena, ab, "a"));

        let c = Nfa::literal(&mut arena, ch('c'), ch('c')).unwrap();
        ab.union(&mut arena, c);
        assert!(accepts(&arena, ab, "ab"));
        assert!(accepts(&arena, ab, "c"));
        assert!(!accepts(&arena, ab, "abc"));
    }

    #[test]
    fn test_kleene_closure() {
        let mut arena = NodeArena::new();
        let mut star = Nfa::literal(&mut arena, ch('a'), ch('a')).unwrap();
        star.kleene_closure(&mut arena);
        assert!(accepts(&arena, star, ""));
        assert!(accepts(&arena, star, "a"));
        assert!(accepts(&arena, star, "aaaa"));
        assert!(!accepts(&arena, star, "ab"));
    }

    #[test]
    fn test_plus() {
        let mut arena = NodeArena::new();
        let mut plus = Nfa::literal(&mut arena, ch('b'), ch('b')).unwrap();
        plus.plus(&mut arena);
        assert!(!accepts(&arena, plus, ""));
        assert!(accepts(&arena, plus, "b"));
        assert!(accepts(&arena, plus, "bbb"));
    }

    #[test]
    fn test_deep_clone_shares_no_nodes() {
        let mut arena = NodeArena::new();
        let mut original = Nfa::literal(&mut arena, ch('x'), ch('x')).unwrap();
        original.kleene_closure(&mut arena);
        let before = arena.len();

        let copy = original.deep_clone(&mut arena);

        assert!(copy.start.index() >= before);
        assert!(copy.end.index() >= before);
        assert_eq!(arena.len() - before, before);
        assert!(accepts(&arena, copy, "xxx"));
        assert!(accepts(&arena, copy, ""));
    }

    #[test]
    fn test_class_merges_overlapping_ranges() {
        let mut arena = NodeArena::new();
        let nfa = Nfa::class(&mut arena, &[(ch('a'), ch('m')), (ch('f'), ch('z'))]).unwrap();
        assert_eq!(arena[nfa.start].edge_count(), 3);
        assert!(accepts(&arena, nfa, "a"));
        assert!(accepts(&arena, nfa, "g"));
        assert!(accepts(&arena, nfa, "z"));
        assert!(!accepts(&arena, nfa, "A"));
    }

    #[test]
    fn test_class_empty() {
        let mut arena = NodeArena::new();
        assert!(matches!(Nfa::class(&mut arena, &[]), Err(Error::EmptyClass)));
        assert!(matches!(
            Nfa::negated_class(&mut arena, &[]),
            Err(Error::EmptyClass)
        ));
    }

    #[test]
    fn test_negated_class() {
        let mut arena = NodeArena::new();
        let nfa = Nfa::negated_class(&mut arena, &[(ch('a'), ch('a')), (ch('b'), ch('b'))]).unwrap();
        assert!(accepts(&arena, nfa, "c"));
        assert!(accepts(&arena, nfa, "\u{0}"));
        assert!(!accepts(&arena, nfa, "a"));
        assert!(!accepts(&arena, nfa, "b"));
    }

    #[test]
    fn test_negated_full_range_matches_nothing() {
        let mut arena = NodeArena::new();
        let nfa = Nfa::negated_class(&mut arena, &[(0, CODE_MAX)]).unwrap();
        assert_eq!(arena[nfa.start].edge_count(), 0);
        assert!(!accepts(&arena, nfa, "a"));
    }

    #[test]
    fn test_closure_deduplicates_and_sorts() {
        let mut arena = NodeArena::new();
        let a = arena.alloc();
        let b = arena.alloc();
        let c = arena.alloc();
        arena.add_edge(c, Edge::epsilon([a]));
        arena.add_edge(a, Edge::epsilon([b, c]));

        assert_eq!(closure(&arena, [c, c, c, c]), vec![a, b, c]);
        assert_eq!(signature(&closure(&arena, [a])), "0,1,2");
    }

    #[test]
    fn test_intersect() {
        assert_eq!(
            intersect(&[(0, 10), (20, 30)], &[(5, 25)]),
            vec![(5, 10), (20, 25)]
        );
        assert!(intersect(&[(0, 4)], &[(5, 9)]).is_empty());
    }
}

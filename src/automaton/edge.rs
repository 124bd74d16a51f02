//! Interval-labeled automaton edges.
//!
//! An edge covers the closed range `[start, end]` of the 16-bit code space
//! and may lead to several nodes at once, which is how NFA combinators
//! overlay transitions. Two sentinel ranges sit above the code space: the
//! epsilon label, and the never-match label produced by negating the full
//! range.

use std::cmp::Ordering;
use std::fmt;

use smallvec::SmallVec;

use super::arena::NodeId;
use crate::Error;

/// Largest code point an edge can carry.
pub const CODE_MAX: u32 = 0xFFFF;

/// Label of an edge that consumes no input.
pub const EPSILON: u32 = CODE_MAX + 1;

/// Label of an edge that can never be taken.
pub const NEVER: u32 = CODE_MAX + 2;

/// Target list of an edge; most edges lead to one or two nodes.
pub type Targets = SmallVec<[NodeId; 2]>;

#[derive(Clone, PartialEq, Eq)]
pub struct Edge {
    pub start: u32,
    pub end: u32,
    pub targets: Targets,
}

impl fmt::Debug for Edge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.start {
            EPSILON => write!(f, "ε -> {:?}", self.targets.as_slice()),
            NEVER => write!(f, "never"),
            _ => write!(
                f,
                "({}, {}) -> {:?}",
                self.start,
                self.end,
                self.targets.as_slice()
            ),
        }
    }
}

impl Edge {
    /// Create an edge over `[start, end]`.
    pub fn new<I>(start: u32, end: u32, targets: I) -> Result<Self, Error>
    where
        I: IntoIterator<Item = NodeId>,
    {
        if end < start || end > CODE_MAX {
            return Err(Error::MalformedInterval { start, end });
        }
        Ok(Self {
            start,
            end,
            targets: targets.into_iter().collect(),
        })
    }

    pub fn epsilon<I>(targets: I) -> Self
    where
        I: IntoIterator<Item = NodeId>,
    {
        Self {
            start: EPSILON,
            end: EPSILON,
            targets: targets.into_iter().collect(),
        }
    }

    /// Edge over the whole code space.
    pub fn full_range<I>(targets: I) -> Self
    where
        I: IntoIterator<Item = NodeId>,
    {
        Self {
            start: 0,
            end: CODE_MAX,
            targets: targets.into_iter().collect(),
        }
    }

    pub fn never() -> Self {
        Self {
            start: NEVER,
            end: NEVER,
            targets: Targets::new(),
        }
    }

    /// Zero-width probe used to look up the edge covering `code`.
    pub(crate) fn probe(code: u32) -> Self {
        Self {
            start: code,
            end: code,
            targets: Targets::new(),
        }
    }

    #[inline]
    pub fn is_epsilon(&self) -> bool {
        self.start == EPSILON
    }

    #[inline]
    pub fn is_never(&self) -> bool {
        self.start == NEVER
    }

    #[inline]
    pub fn contains(&self, code: u32) -> bool {
        self.start <= code && code <= self.end
    }

    /// Orders edges by range; overlapping ranges compare equal.
    pub fn compare(a: &Edge, b: &Edge) -> Ordering {
        if a.end < b.start {
            Ordering::Less
        } else if a.start > b.end {
            Ordering::Greater
        } else {
            Ordering::Equal
        }
    }

    /// Split two edges into disjoint edges covering the union of their
    /// ranges.
    ///
    /// Sub-ranges covered by both edges lead to the targets of both. Edges
    /// that do not overlap are returned unchanged.
    pub fn separate(&self, other: &Edge) -> Vec<Edge> {
        if Edge::compare(self, other) != Ordering::Equal {
            return vec![self.clone(), other.clone()];
        }

        let both = self.merged_targets(other);
        let piece = |start: u32, end: u32, targets: &Targets| Edge {
            start,
            end,
            targets: targets.clone(),
        };
        let (a, b) = (self, other);

        match (a.start.cmp(&b.start), a.end.cmp(&b.end)) {
            (Ordering::Equal, Ordering::Equal) => vec![piece(a.start, a.end, &both)],
            // Same start.
            (Ordering::Equal, Ordering::Greater) => vec![
                piece(a.start, b.end, &both),
                piece(b.end + 1, a.end, &a.targets),
            ],
            (Ordering::Equal, Ordering::Less) => vec![
                piece(a.start, a.end, &both),
                piece(a.end + 1, b.end, &b.targets),
            ],
            // Same end.
            (Ordering::Less, Ordering::Equal) => vec![
                piece(a.start, b.start - 1, &a.targets),
                piece(b.start, a.end, &both),
            ],
            (Ordering::Greater, Ordering::Equal) => vec![
                piece(b.start, a.start - 1, &b.targets),
                piece(a.start, a.end, &both),
            ],
            // `other` nested inside `self`.
            (Ordering::Less, Ordering::Greater) => vec![
                piece(a.start, b.start - 1, &a.targets),
                piece(b.start, b.end, &both),
                piece(b.end + 1, a.end, &a.targets),
            ],
            // `self` nested inside `other`.
            (Ordering::Greater, Ordering::Less) => vec![
                piece(b.start, a.start - 1, &b.targets),
                piece(a.start, a.end, &both),
                piece(a.end + 1, b.end, &b.targets),
            ],
            // `other` hangs over the left end of `self`.
            (Ordering::Greater, Ordering::Greater) => vec![
                piece(b.start, a.start - 1, &b.targets),
                piece(a.start, b.end, &both),
                piece(b.end + 1, a.end, &a.targets),
            ],
            // `other` hangs over the right end of `self`.
            (Ordering::Less, Ordering::Less) => vec![
                piece(a.start, b.start - 1, &a.targets),
                piece(b.start, a.end, &both),
                piece(a.end + 1, b.end, &b.targets),
            ],
        }
    }

    /// Complement of this edge's range within the code space.
    ///
    /// The full range complements to a single never-match edge. The
    /// resulting edges keep this edge's targets.
    pub fn not(&self) -> Vec<Edge> {
        assert!(
            !self.is_epsilon() && !self.is_never(),
            "cannot negate a sentinel edge: {self:?}"
        );
        let piece = |start: u32, end: u32| Edge {
            start,
            end,
            targets: self.targets.clone(),
        };
        match (self.start, self.end) {
            (0, CODE_MAX) => vec![Edge::never()],
            (0, end) => vec![piece(end + 1, CODE_MAX)],
            (start, CODE_MAX) => vec![piece(0, start - 1)],
            (start, end) => vec![piece(0, start - 1), piece(end + 1, CODE_MAX)],
        }
    }

    fn merged_targets(&self, other: &Edge) -> Targets {
        let mut targets = self.targets.clone();
        for &target in &other.targets {
            if !targets.contains(&target) {
                targets.push(target);
            }
        }
        targets
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    fn edge(start: u32, end: u32, targets: &[u32]) -> Edge {
        Edge::new(start, end, targets.iter().map(|&t| NodeId::new(t))).unwrap()
    }

    fn ranges(edges: &[Edge]) -> Vec<(u32, u32, Vec<u32>)> {
        edges
            .iter()
            .map(|e| {
                let mut targets: Vec<u32> = e.targets.iter().map(|t| t.index() as u32).collect();
                targets.sort_unstable();
                (e.start, e.end, targets)
            })
            .collect()
    }

    #[test]
    fn test_malformed_interval() {
        assert!(matches!(
            Edge::new(5, 4, []),
            Err(Error::MalformedInterval { start: 5, end: 4 })
        ));
        assert!(Edge::new(0, CODE_MAX + 1, []).is_err());
    }

    #[test]
    fn test_compare() {
        assert_eq!(Edge::compare(&edge(0, 4, &[]), &edge(5, 9, &[])), Ordering::Less);
        assert_eq!(Edge::compare(&edge(5, 9, &[]), &edge(0, 4, &[])), Ordering::Greater);
        assert_eq!(Edge::compare(&edge(0, 5, &[]), &edge(5, 9, &[])), Ordering::Equal);
    }

    #[test]
    fn test_separate_shapes() {
        let a = |s, e| edge(s, e, &[0]);
        let b = |s, e| edge(s, e, &[1]);

        assert_eq!(
            ranges(&a(10, 20).separate(&b(10, 20))),
            vec![(10, 20, vec![0, 1])]
        );
        assert_eq!(
            ranges(&a(10, 20).separate(&b(10, 15))),
            vec![(10, 15, vec![0, 1]), (16, 20, vec![0])]
        );
        assert_eq!(
            ranges(&a(10, 15).separate(&b(10, 20))),
            vec![(10, 15, vec![0, 1]), (16, 20, vec![1])]
        );
        assert_eq!(
            ranges(&a(10, 20).separate(&b(15, 20))),
            vec![(10, 14, vec![0]), (15, 20, vec![0, 1])]
        );
        assert_eq!(
            ranges(&a(11, 20).separate(&b(10, 20))),
            vec![(10, 10, vec![1]), (11, 20, vec![0, 1])]
        );
        assert_eq!(
            ranges(&a(10, 20).separate(&b(12, 18))),
            vec![(10, 11, vec![0]), (12, 18, vec![0, 1]), (19, 20, vec![0])]
        );
        assert_eq!(
            ranges(&a(12, 18).separate(&b(10, 20))),
            vec![(10, 11, vec![1]), (12, 18, vec![0, 1]), (19, 20, vec![1])]
        );
        assert_eq!(
            ranges(&a(10, 20).separate(&b(5, 12))),
            vec![(5, 9, vec![1]), (10, 12, vec![0, 1]), (13, 20, vec![0])]
        );
        assert_eq!(
            ranges(&a(10, 20).separate(&b(18, 25))),
            vec![(10, 17, vec![0]), (18, 20, vec![0, 1]), (21, 25, vec![1])]
        );
    }

    #[test]
    fn test_separate_disjoint_returns_both() {
        let pieces = edge(0, 4, &[0]).separate(&edge(6, 9, &[1]));
        assert_eq!(ranges(&pieces), vec![(0, 4, vec![0]), (6, 9, vec![1])]);
    }

    #[test]
    fn test_separate_shared_target_not_duplicated() {
        let pieces = edge(0, 9, &[3]).separate(&edge(0, 9, &[3]));
        assert_eq!(pieces.len(), 1);
        assert_eq!(pieces[0].targets.len(), 1);
    }

    #[test]
    fn test_separate_epsilon_merges_targets() {
        let pieces = Edge::epsilon([NodeId::new(1)]).separate(&Edge::epsilon([NodeId::new(2)]));
        assert_eq!(pieces.len(), 1);
        assert!(pieces[0].is_epsilon());
        assert_eq!(pieces[0].targets.len(), 2);
    }

    #[test]
    fn test_separate_random_intervals_are_exhaustive() {
        // Every overlapping pair must split into sorted, disjoint, gap-free
        // pieces covering exactly the union of both ranges.
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..5000 {
            let (s1, s2) = (rng.gen_range(0..40), rng.gen_range(0..40));
            let (e1, e2) = (s1 + rng.gen_range(0..20), s2 + rng.gen_range(0..20));
            let a = edge(s1, e1, &[0]);
            let b = edge(s2, e2, &[1]);
            if Edge::compare(&a, &b) != Ordering::Equal {
                continue;
            }

            let pieces = a.separate(&b);
            assert_eq!(pieces[0].start, s1.min(s2));
            assert_eq!(pieces[pieces.len() - 1].end, e1.max(e2));
            for pair in pieces.windows(2) {
                assert_eq!(pair[0].end + 1, pair[1].start);
            }
            for piece in &pieces {
                assert!(piece.start <= piece.end);
                let in_a = piece.start >= s1 && piece.end <= e1;
                let in_b = piece.start >= s2 && piece.end <= e2;
                let expected = match (in_a, in_b) {
                    (true, true) => vec![0, 1],
                    (true, false) => vec![0],
                    (false, true) => vec![1],
                    (false, false) => panic!("piece {piece:?} outside both inputs"),
                };
                assert_eq!(ranges(std::slice::from_ref(piece))[0].2, expected);
            }
        }
    }

    #[test]
    fn test_not() {
        assert!(edge(0, CODE_MAX, &[]).not()[0].is_never());
        assert_eq!(ranges(&edge(0, 9, &[4]).not()), vec![(10, CODE_MAX, vec![4])]);
        assert_eq!(ranges(&edge(10, CODE_MAX, &[]).not()), vec![(0, 9, vec![])]);
        assert_eq!(
            ranges(&edge(97, 98, &[]).not()),
            vec![(0, 96, vec![]), (99, CODE_MAX, vec![])]
        );
    }
}

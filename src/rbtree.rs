//! Red-black tree ordered by a user supplied comparator.
//!
//! Nodes live in a `Vec` and reference each other by index, so the tree has
//! no interior pointers and can be cloned cheaply. Removing a node moves the
//! last slot into the vacated one and patches the links pointing at it.
//!
//! The comparator decides what "equal" means. The automaton uses this to
//! store edges keyed by interval, where two edges are equal when their
//! ranges overlap, so `find` doubles as an overlap probe.

use std::cmp::Ordering;
use std::fmt;

type Link = Option<usize>;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Color {
    Red,
    Black,
}

#[derive(Clone)]
struct Node<T> {
    value: T,
    color: Color,
    parent: Link,
    left: Link,
    right: Link,
}

/// A balanced ordered set.
///
/// `add` replaces an element that compares equal instead of inserting a
/// duplicate, `remove` and `find` are no-ops on absent keys. All three run in
/// O(log n).
#[derive(Clone)]
pub struct RbTree<T, C = fn(&T, &T) -> Ordering> {
    nodes: Vec<Node<T>>,
    root: Link,
    cmp: C,
}

impl<T: fmt::Debug, C: Fn(&T, &T) -> Ordering> fmt::Debug for RbTree<T, C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.iter()).finish()
    }
}

impl<T: Ord> Default for RbTree<T> {
    fn default() -> Self {
        Self::new(T::cmp)
    }
}

impl<T, C> RbTree<T, C>
where
    C: Fn(&T, &T) -> Ordering,
{
    pub fn new(cmp: C) -> Self {
        Self {
            nodes: Vec::new(),
            root: None,
            cmp,
        }
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Insert `value`, replacing an element that compares equal to it.
    ///
    /// Returns the replaced element, if any.
    pub fn add(&mut self, value: T) -> Option<T> {
        let Some(mut current) = self.root else {
            self.nodes.push(Node {
                value,
                color: Color::Black,
                parent: None,
                left: None,
                right: None,
            });
            self.root = Some(0);
            return None;
        };

        let went_left = loop {
            match (self.cmp)(&self.nodes[current].value, &value) {
                Ordering::Equal => {
                    return Some(std::mem::replace(&mut self.nodes[current].value, value));
                }
                Ordering::Greater => match self.nodes[current].left {
                    Some(left) => current = left,
                    None => break true,
                },
                Ordering::Less => match self.nodes[current].right {
                    Some(right) => current = right,
                    None => break false,
                },
            }
        };

        let id = self.nodes.len();
        self.nodes.push(Node {
            value,
            color: Color::Red,
            parent: Some(current),
            left: None,
            right: None,
        });
        if went_left {
            self.nodes[current].left = Some(id);
        } else {
            self.nodes[current].right = Some(id);
        }
        self.fix_insert(id);
        None
    }

    /// Remove the element comparing equal to `value` and return it.
    pub fn remove(&mut self, value: &T) -> Option<T> {
        let found = self.locate(value)?;

        // Two children: the in-order successor's value takes this node's
        // place and the successor node is unlinked instead.
        let target = match (self.nodes[found].left, self.nodes[found].right) {
            (Some(_), Some(right)) => {
                let successor = self.leftmost(right);
                self.swap_values(found, successor);
                successor
            }
            _ => found,
        };

        match self.nodes[target].left.or(self.nodes[target].right) {
            Some(child) => {
                // A node with exactly one child is black and the child is a
                // red leaf, so recoloring the child restores black height.
                self.nodes[child].color = Color::Black;
                self.replace_in_parent(target, Some(child));
            }
            None => {
                if self.nodes[target].color == Color::Black {
                    self.fix_remove(target);
                }
                self.replace_in_parent(target, None);
            }
        }

        Some(self.release(target))
    }

    /// Return the stored element comparing equal to `value`.
    pub fn find(&self, value: &T) -> Option<&T> {
        self.locate(value).map(|id| &self.nodes[id].value)
    }

    pub fn has(&self, value: &T) -> bool {
        self.locate(value).is_some()
    }

    /// In-order iterator over the stored elements.
    pub fn iter(&self) -> Iter<'_, T, C> {
        let mut iter = Iter {
            tree: self,
            stack: Vec::new(),
        };
        iter.push_left(self.root);
        iter
    }

    /// Export the elements in comparator order.
    pub fn to_vec(&self) -> Vec<T>
    where
        T: Clone,
    {
        self.iter().cloned().collect()
    }

    /// Remove every element, returning them in comparator order.
    pub fn drain_sorted(&mut self) -> Vec<T> {
        let order: Vec<usize> = self.inorder_ids();
        let mut slots: Vec<Option<T>> = Vec::with_capacity(self.nodes.len());
        for node in self.nodes.drain(..) {
            slots.push(Some(node.value));
        }
        self.root = None;
        order
            .into_iter()
            .filter_map(|id| slots[id].take())
            .collect()
    }

    fn inorder_ids(&self) -> Vec<usize> {
        let mut out = Vec::with_capacity(self.nodes.len());
        let mut stack = Vec::new();
        let mut current = self.root;
        loop {
            while let Some(id) = current {
                stack.push(id);
                current = self.nodes[id].left;
            }
            match stack.pop() {
                Some(id) => {
                    out.push(id);
                    current = self.nodes[id].right;
                }
                None => return out,
            }
        }
    }

    fn locate(&self, value: &T) -> Option<usize> {
        let mut current = self.root;
        while let Some(id) = current {
            current = match (self.cmp)(&self.nodes[id].value, value) {
                Ordering::Equal => return Some(id),
                Ordering::Greater => self.nodes[id].left,
                Ordering::Less => self.nodes[id].right,
            };
        }
        None
    }

    fn leftmost(&self, mut id: usize) -> usize {
        while let Some(left) = self.nodes[id].left {
            id = left;
        }
        id
    }

    fn swap_values(&mut self, a: usize, b: usize) {
        if a == b {
            return;
        }
        let (low, high) = if a < b { (a, b) } else { (b, a) };
        let (head, tail) = self.nodes.split_at_mut(high);
        std::mem::swap(&mut head[low].value, &mut tail[0].value);
    }

    fn is_red(&self, link: Link) -> bool {
        link.is_some_and(|id| self.nodes[id].color == Color::Red)
    }

    /// Point `id`'s parent (or the root) at `replacement`.
    fn replace_in_parent(&mut self, id: usize, replacement: Link) {
        let parent = self.nodes[id].parent;
        match parent {
            None => self.root = replacement,
            Some(parent) => {
                if self.nodes[parent].left == Some(id) {
                    self.nodes[parent].left = replacement;
                } else {
                    self.nodes[parent].right = replacement;
                }
            }
        }
        if let Some(replacement) = replacement {
            self.nodes[replacement].parent = parent;
        }
    }

    fn rotate_left(&mut self, id: usize) {
        let pivot = self.nodes[id]
            .right
            .unwrap_or_else(|| panic!("cannot rotate left: node {id} has no right child"));
        let inner = self.nodes[pivot].left;

        self.replace_in_parent(id, Some(pivot));
        self.nodes[id].right = inner;
        if let Some(inner) = inner {
            self.nodes[inner].parent = Some(id);
        }
        self.nodes[pivot].left = Some(id);
        self.nodes[id].parent = Some(pivot);
    }

    fn rotate_right(&mut self, id: usize) {
        let pivot = self.nodes[id]
            .left
            .unwrap_or_else(|| panic!("cannot rotate right: node {id} has no left child"));
        let inner = self.nodes[pivot].right;

        self.replace_in_parent(id, Some(pivot));
        self.nodes[id].left = inner;
        if let Some(inner) = inner {
            self.nodes[inner].parent = Some(id);
        }
        self.nodes[pivot].right = Some(id);
        self.nodes[id].parent = Some(pivot);
    }

    fn fix_insert(&mut self, mut id: usize) {
        loop {
            let Some(parent) = self.nodes[id].parent else {
                break;
            };
            if self.nodes[parent].color == Color::Black {
                break;
            }
            // A red parent is never the root.
            let Some(grandparent) = self.nodes[parent].parent else {
                break;
            };
            let parent_is_left = self.nodes[grandparent].left == Some(parent);
            let uncle = if parent_is_left {
                self.nodes[grandparent].right
            } else {
                self.nodes[grandparent].left
            };

            if let Some(uncle) = uncle.filter(|&u| self.nodes[u].color == Color::Red) {
                self.nodes[parent].color = Color::Black;
                self.nodes[uncle].color = Color::Black;
                self.nodes[grandparent].color = Color::Red;
                id = grandparent;
                continue;
            }

            // Triangle: rotate the child into line with its parent first.
            let mut parent = parent;
            if parent_is_left && self.nodes[parent].right == Some(id) {
                self.rotate_left(parent);
                parent = id;
            } else if !parent_is_left && self.nodes[parent].left == Some(id) {
                self.rotate_right(parent);
                parent = id;
            }

            self.nodes[parent].color = Color::Black;
            self.nodes[grandparent].color = Color::Red;
            if parent_is_left {
                self.rotate_right(grandparent);
            } else {
                self.rotate_left(grandparent);
            }
            break;
        }

        if let Some(root) = self.root {
            self.nodes[root].color = Color::Black;
        }
    }

    /// Restore black height before unlinking the black leaf `id`.
    ///
    /// `id` stays in the tree while this runs and carries the extra black.
    fn fix_remove(&mut self, mut id: usize) {
        loop {
            let Some(parent) = self.nodes[id].parent else {
                break;
            };
            let is_left = self.nodes[parent].left == Some(id);
            let sibling = if is_left {
                self.nodes[parent].right
            } else {
                self.nodes[parent].left
            };
            let sibling = sibling
                .unwrap_or_else(|| panic!("black node {id} has no sibling; black height broken"));

            if self.nodes[sibling].color == Color::Red {
                self.nodes[sibling].color = Color::Black;
                self.nodes[parent].color = Color::Red;
                if is_left {
                    self.rotate_left(parent);
                } else {
                    self.rotate_right(parent);
                }
                continue;
            }

            let (near, far) = if is_left {
                (self.nodes[sibling].left, self.nodes[sibling].right)
            } else {
                (self.nodes[sibling].right, self.nodes[sibling].left)
            };

            if !self.is_red(near) && !self.is_red(far) {
                self.nodes[sibling].color = Color::Red;
                if self.nodes[parent].color == Color::Red {
                    self.nodes[parent].color = Color::Black;
                    break;
                }
                id = parent;
                continue;
            }

            if !self.is_red(far) {
                // Near nephew is red: turn it into the far one.
                if let Some(near) = near {
                    self.nodes[near].color = Color::Black;
                }
                self.nodes[sibling].color = Color::Red;
                if is_left {
                    self.rotate_right(sibling);
                } else {
                    self.rotate_left(sibling);
                }
                continue;
            }

            self.nodes[sibling].color = self.nodes[parent].color;
            self.nodes[parent].color = Color::Black;
            if let Some(far) = far {
                self.nodes[far].color = Color::Black;
            }
            if is_left {
                self.rotate_left(parent);
            } else {
                self.rotate_right(parent);
            }
            break;
        }
    }

    /// Drop the unlinked node `id` from storage, moving the last slot into
    /// its place.
    fn release(&mut self, id: usize) -> T {
        let last = self.nodes.len() - 1;
        if id != last {
            let moved = &self.nodes[last];
            let (parent, left, right) = (moved.parent, moved.left, moved.right);
            match parent {
                None => self.root = Some(id),
                Some(parent) => {
                    if self.nodes[parent].left == Some(last) {
                        self.nodes[parent].left = Some(id);
                    } else {
                        self.nodes[parent].right = Some(id);
                    }
                }
            }
            for child in [left, right].into_iter().flatten() {
                self.nodes[child].parent = Some(id);
            }
        }
        self.nodes.swap_remove(id).value
    }

    /// Check the red-black properties, returning the black height.
    #[cfg(test)]
    pub(crate) fn check_invariants(&self) -> Result<usize, String> {
        fn walk<T, C: Fn(&T, &T) -> Ordering>(
            tree: &RbTree<T, C>,
            link: Link,
            parent: Link,
        ) -> Result<usize, String> {
            let Some(id) = link else {
                return Ok(1);
            };
            let node = &tree.nodes[id];
            if node.parent != parent {
                return Err(format!("node {id} has a stale parent link"));
            }
            if node.color == Color::Red && (tree.is_red(node.left) || tree.is_red(node.right)) {
                return Err(format!("red node {id} has a red child"));
            }
            if let Some(left) = node.left {
                if (tree.cmp)(&tree.nodes[left].value, &node.value) != Ordering::Less {
                    return Err(format!("left child of {id} is out of order"));
                }
            }
            if let Some(right) = node.right {
                if (tree.cmp)(&tree.nodes[right].value, &node.value) != Ordering::Greater {
                    return Err(format!("right child of {id} is out of order"));
                }
            }
            let left = walk(tree, node.left, Some(id))?;
            let right = walk(tree, node.right, Some(id))?;
            if left != right {
                return Err(format!("black height differs below {id}: {left} vs {right}"));
            }
            Ok(left + usize::from(node.color == Color::Black))
        }

        if self.is_red(self.root) {
            return Err("root is red".into());
        }
        let height = walk(self, self.root, None)?;
        let reachable = self.inorder_ids().len();
        if reachable != self.nodes.len() {
            return Err(format!(
                "{} nodes stored but {reachable} reachable",
                self.nodes.len()
            ));
        }
        Ok(height)
    }
}

/// In-order iterator returned by [`RbTree::iter`].
pub struct Iter<'a, T, C> {
    tree: &'a RbTree<T, C>,
    stack: Vec<usize>,
}

impl<T, C> Iter<'_, T, C> {
    fn push_left(&mut self, mut link: Link) {
        while let Some(id) = link {
            self.stack.push(id);
            link = self.tree.nodes[id].left;
        }
    }
}

impl<'a, T, C> Iterator for Iter<'a, T, C> {
    type Item = &'a T;

    fn next(&mut self) -> Option<Self::Item> {
        let id = self.stack.pop()?;
        let tree = self.tree;
        self.push_left(tree.nodes[id].right);
        Some(&tree.nodes[id].value)
    }
}

impl<'a, T, C> IntoIterator for &'a RbTree<T, C>
where
    C: Fn(&T, &T) -> Ordering,
{
    type Item = &'a T;
    type IntoIter = Iter<'a, T, C>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

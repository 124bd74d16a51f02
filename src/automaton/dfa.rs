//! Longest-match scanning over a deterministic automaton.
//!
//! A [`Dfa`] owns its node arena, the handlers its accepting nodes refer to,
//! and a cursor into the text being scanned. Each [`Dfa::run`] call consumes
//! one token. With the rules `b+` (R1) and `a+` (R2):
//!
//! ```text
//! source:  b b b a a a
//!          ^-----^        run() -> handler(R1, "bbb")
//!                ^-----^  run() -> handler(R2, "aaa")
//!                      ^  run() -> on_end(), Ok(None)
//! ```
//!
//! A [`ScanError`] leaves the cursor on the offending character; call
//! [`Dfa::skip`] to step over it and keep scanning.
//!
//! Handlers are closures and cannot be written to disk, so a serialized
//! automaton names them by tag. Loading it back requires a
//! [`HandlerTable`] that maps each tag to code again.

use std::fmt;
use std::sync::Arc;

use log::{debug, trace};
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

use super::arena::{HandlerId, NodeArena, NodeId};
use super::edge::{Edge, CODE_MAX};
use crate::Error;

/// Code run on a matched token.
pub type Handler<R> = Arc<dyn Fn(&str) -> R + Send + Sync>;

/// Handlers indexed by [`HandlerId`], each registered under a unique tag.
///
/// Ids are assigned in registration order; a lower id wins when one
/// accepting node carries several handlers.
pub struct HandlerTable<R> {
    entries: Vec<(String, Handler<R>)>,
}

impl<R> Clone for HandlerTable<R> {
    fn clone(&self) -> Self {
        Self {
            entries: self.entries.clone(),
        }
    }
}

impl<R> Default for HandlerTable<R> {
    fn default() -> Self {
        Self::new()
    }
}

impl<R> fmt::Debug for HandlerTable<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list()
            .entries(self.entries.iter().map(|(tag, _)| tag))
            .finish()
    }
}

impl<R> HandlerTable<R> {
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    /// Register `handler` under `tag`.
    pub fn insert<F>(&mut self, tag: impl Into<String>, handler: F) -> Result<HandlerId, Error>
    where
        F: Fn(&str) -> R + Send + Sync + 'static,
    {
        self.insert_shared(tag, Arc::new(handler))
    }

    /// Register an already shared handler under `tag`.
    pub fn insert_shared(
        &mut self,
        tag: impl Into<String>,
        handler: Handler<R>,
    ) -> Result<HandlerId, Error> {
        let tag = tag.into();
        if self.lookup(&tag).is_some() {
            return Err(Error::DuplicateTag(tag));
        }
        let id = self.entries.len() as HandlerId;
        self.entries.push((tag, handler));
        Ok(id)
    }

    pub fn get(&self, id: HandlerId) -> Option<&Handler<R>> {
        self.entries.get(id as usize).map(|(_, handler)| handler)
    }

    pub fn tag(&self, id: HandlerId) -> Option<&str> {
        self.entries.get(id as usize).map(|(tag, _)| tag.as_str())
    }

    /// Id and handler registered under `tag`.
    pub fn lookup(&self, tag: &str) -> Option<(HandlerId, &Handler<R>)> {
        self.entries
            .iter()
            .position(|(t, _)| t == tag)
            .map(|index| (index as HandlerId, &self.entries[index].1))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn tags(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(tag, _)| tag.as_str())
    }
}

/// Input the automaton cannot tokenize.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ScanError {
    #[error("unrecognized character {ch:?} at offset {position}")]
    Unrecognized { ch: char, position: usize },
}

/// Persistent form of a [`Dfa`]. Node 0 is the start node.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SerializedDfa {
    pub nodes: Vec<SerializedNode>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SerializedNode {
    pub edges: Vec<SerializedEdge>,
    /// Handler tags, highest priority first.
    pub handlers: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SerializedEdge {
    pub start: u32,
    pub end: u32,
    pub target: usize,
}

/// A deterministic automaton together with its scan state.
pub struct Dfa<R> {
    arena: NodeArena,
    start: NodeId,
    handlers: HandlerTable<R>,
    source: String,
    /// Byte offset of the next unscanned character.
    position: usize,
    on_end: Option<Box<dyn FnMut() + Send>>,
}

impl<R> fmt::Debug for Dfa<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Dfa")
            .field("states", &self.arena.len())
            .field("start", &self.start)
            .field("handlers", &self.handlers)
            .field("position", &self.position)
            .field("source_len", &self.source.len())
            .finish()
    }
}

impl<R> Dfa<R> {
    /// Wrap a deterministic graph.
    ///
    /// Every handler id attached to a node of `arena` must be registered in
    /// `handlers`, and every edge must have exactly one target.
    pub fn new(arena: NodeArena, start: NodeId, handlers: HandlerTable<R>) -> Self {
        Self {
            arena,
            start,
            handlers,
            source: String::new(),
            position: 0,
            on_end: None,
        }
    }

    pub fn start(&self) -> NodeId {
        self.start
    }

    pub fn arena(&self) -> &NodeArena {
        &self.arena
    }

    pub fn handlers(&self) -> &HandlerTable<R> {
        &self.handlers
    }

    pub fn state_count(&self) -> usize {
        self.arena.len()
    }

    /// Replace the text to scan and rewind the cursor.
    pub fn set_source(&mut self, source: impl Into<String>) {
        self.source = source.into();
        self.position = 0;
    }

    /// Callback invoked when [`run`](Self::run) is called at end of input.
    pub fn on_end<F>(&mut self, callback: F)
    where
        F: FnMut() + Send + 'static,
    {
        self.on_end = Some(Box::new(callback));
    }

    pub fn position(&self) -> usize {
        self.position
    }

    pub fn is_finished(&self) -> bool {
        self.position >= self.source.len()
    }

    /// Step the cursor over one character without matching it, returning
    /// that character. Returns `None` at end of input.
    pub fn skip(&mut self) -> Option<char> {
        let ch = self.source[self.position..].chars().next()?;
        trace!("skipped {:?} at {}", ch, self.position);
        self.position += ch.len_utf8();
        Some(ch)
    }

    /// Tag and handler registered as `id`, which `state` carries.
    ///
    /// # Panics
    ///
    /// If `id` was never registered, which breaks the contract of
    /// [`Dfa::new`].
    fn registered(&self, state: NodeId, id: HandlerId) -> (&str, &Handler<R>) {
        match self.handlers.entries.get(id as usize) {
            Some((tag, handler)) => (tag.as_str(), handler),
            None => panic!("node {state:?} refers to unregistered handler {id}"),
        }
    }

    /// Follow the edge out of `state` labeled with `ch`.
    fn step(&self, state: NodeId, ch: char) -> Option<NodeId> {
        let code = ch as u32;
        if code > CODE_MAX {
            return None;
        }
        let edge = self.arena[state].edge_for(code)?;
        assert_eq!(
            edge.targets.len(),
            1,
            "deterministic edge {edge:?} must have exactly one target"
        );
        Some(edge.targets[0])
    }

    /// Scan one token from the cursor.
    ///
    /// The longest prefix that ends in an accepting node is matched, and
    /// the highest priority handler of that node is called with it. At end
    /// of input the end callback runs and `Ok(None)` is returned. Input with
    /// no non-empty accepted prefix is an error and leaves the cursor in
    /// place.
    pub fn run(&mut self) -> Result<Option<R>, ScanError> {
        if self.is_finished() {
            if let Some(on_end) = self.on_end.as_mut() {
                on_end();
            }
            return Ok(None);
        }

        let rest = &self.source[self.position..];
        let mut state = self.start;
        let mut accepted: Option<(NodeId, usize)> = None;
        for (offset, ch) in rest.char_indices() {
            match self.step(state, ch) {
                Some(next) => state = next,
                None => break,
            }
            if self.arena[state].is_accepting() {
                accepted = Some((state, offset + ch.len_utf8()));
            }
        }

        let Some((state, len)) = accepted else {
            let ch = rest.chars().next().unwrap_or_default();
            return Err(ScanError::Unrecognized {
                ch,
                position: self.position,
            });
        };
        let handler_id = self.arena[state].handlers()[0];
        let (tag, handler) = self.registered(state, handler_id);
        let text = &rest[..len];
        trace!("matched {:?} at {} with handler {:?}", text, self.position, tag);
        let result = handler(text);
        self.position += len;
        Ok(Some(result))
    }

    /// Scan all of `source`, collecting one result per token.
    pub fn tokenize(&mut self, source: impl Into<String>) -> Result<Vec<R>, ScanError> {
        self.set_source(source);
        let mut tokens = Vec::new();
        while let Some(token) = self.run()? {
            tokens.push(token);
        }
        Ok(tokens)
    }

    /// True if the whole of `input` leads from the start node to an
    /// accepting node. The scan cursor is untouched.
    pub fn matches(&self, input: &str) -> bool {
        let mut state = self.start;
        for ch in input.chars() {
            match self.step(state, ch) {
                Some(next) => state = next,
                None => return false,
            }
        }
        self.arena[state].is_accepting()
    }

    /// Nodes reachable from the start, breadth first.
    fn discovery_order(&self) -> (Vec<NodeId>, FxHashMap<NodeId, usize>) {
        let mut order = vec![self.start];
        let mut index: FxHashMap<NodeId, usize> = FxHashMap::default();
        index.insert(self.start, 0);
        let mut next = 0;
        while next < order.len() {
            let node = order[next];
            next += 1;
            for edge in self.arena[node].edges() {
                for &target in &edge.targets {
                    if !index.contains_key(&target) {
                        index.insert(target, order.len());
                        order.push(target);
                    }
                }
            }
        }
        (order, index)
    }

    /// Encode the reachable graph as an adjacency list.
    ///
    /// # Panics
    ///
    /// If a reachable node carries a handler id with no registered tag.
    pub fn serialize(&self) -> SerializedDfa {
        let (order, index) = self.discovery_order();
        let nodes = order
            .iter()
            .map(|&node| SerializedNode {
                edges: self.arena[node]
                    .edges()
                    .map(|edge| SerializedEdge {
                        start: edge.start,
                        end: edge.end,
                        target: index[&edge.targets[0]],
                    })
                    .collect(),
                handlers: self.arena[node]
                    .handlers()
                    .iter()
                    .map(|&id| self.registered(node, id).0)
                    .map(str::to_owned)
                    .collect(),
            })
            .collect();
        SerializedDfa { nodes }
    }

    /// Rebuild an automaton, resolving handler tags through `handlers`.
    pub fn deserialize(serialized: &SerializedDfa, handlers: &HandlerTable<R>) -> Result<Self, Error> {
        if serialized.nodes.is_empty() {
            return Err(Error::Deserialize("automaton has no start node".into()));
        }

        let mut arena = NodeArena::with_capacity(serialized.nodes.len());
        for _ in &serialized.nodes {
            arena.alloc();
        }

        for (index, node) in serialized.nodes.iter().enumerate() {
            let id = NodeId::new(index as u32);
            let mut resolved = Vec::with_capacity(node.handlers.len());
            for tag in &node.handlers {
                let (handler, _) = handlers
                    .lookup(tag)
                    .ok_or_else(|| Error::Deserialize(format!("unknown handler tag `{tag}`")))?;
                resolved.push(handler);
            }
            arena[id].set_handlers(resolved);

            let mut ranges: Vec<(u32, u32)> = Vec::with_capacity(node.edges.len());
            for edge in &node.edges {
                if edge.target >= serialized.nodes.len() {
                    return Err(Error::Deserialize(format!(
                        "node {index} has an edge to missing node {}",
                        edge.target
                    )));
                }
                let target = NodeId::new(edge.target as u32);
                arena.add_edge(id, Edge::new(edge.start, edge.end, [target])?);
                ranges.push((edge.start, edge.end));
            }
            ranges.sort_unstable();
            if ranges.windows(2).any(|pair| pair[0].1 >= pair[1].0) {
                return Err(Error::Deserialize(format!(
                    "node {index} has overlapping edges"
                )));
            }
        }

        debug!(
            "deserialized automaton with {} states",
            serialized.nodes.len()
        );
        Ok(Self::new(arena, NodeId::new(0), handlers.clone()))
    }

    pub fn to_json(&self) -> Result<String, Error> {
        Ok(serde_json::to_string(&self.serialize())?)
    }

    pub fn from_json(json: &str, handlers: &HandlerTable<R>) -> Result<Self, Error> {
        let serialized: SerializedDfa = serde_json::from_str(json)?;
        Self::deserialize(&serialized, handlers)
    }
}

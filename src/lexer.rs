//! Multi-rule lexers.
//!
//! A lexer is an ordered list of rules, each a pattern with a handler. All
//! patterns are compiled into one NFA whose start node branches to every
//! rule, and subset construction turns that into a single [`Dfa`]. When
//! several rules accept the same longest match, the rule declared first
//! wins.
//!
//! ```
//! use lexdfa::LexerBuilder;
//!
//! let mut lexer = LexerBuilder::new()
//!     .rule("if", "if", |_: &str| "keyword".to_string())
//!     .rule("[a-z]+", "ident", |text: &str| format!("ident {text}"))
//!     .build()
//!     .unwrap();
//!
//! assert_eq!(lexer.tokenize("if").unwrap(), vec!["keyword"]);
//! assert_eq!(lexer.tokenize("iffy").unwrap(), vec!["ident iffy"]);
//! ```

use std::fmt;
use std::sync::Arc;

use log::debug;

use crate::automaton::{subset_construction, Dfa, Edge, Handler, HandlerTable, NodeArena};
use crate::regexp::compile_regexp;
use crate::Error;

/// One pattern of a lexer and the handler run on its matches.
pub struct LexerRule<R> {
    pub pattern: String,
    /// Names the handler in serialized automata; unique within a lexer.
    pub tag: String,
    pub handler: Handler<R>,
}

impl<R> Clone for LexerRule<R> {
    fn clone(&self) -> Self {
        Self {
            pattern: self.pattern.clone(),
            tag: self.tag.clone(),
            handler: Arc::clone(&self.handler),
        }
    }
}

impl<R> fmt::Debug for LexerRule<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LexerRule")
            .field("pattern", &self.pattern)
            .field("tag", &self.tag)
            .finish()
    }
}

impl<R> LexerRule<R> {
    pub fn new<F>(pattern: impl Into<String>, tag: impl Into<String>, handler: F) -> Self
    where
        F: Fn(&str) -> R + Send + Sync + 'static,
    {
        Self {
            pattern: pattern.into(),
            tag: tag.into(),
            handler: Arc::new(handler),
        }
    }
}

/// Collects rules and options, then compiles them into a [`Dfa`].
pub struct LexerBuilder<R> {
    rules: Vec<LexerRule<R>>,
    dot_matches_any: bool,
    max_states: Option<usize>,
}

impl<R> Default for LexerBuilder<R> {
    fn default() -> Self {
        Self {
            rules: Vec::new(),
            dot_matches_any: true,
            max_states: None,
        }
    }
}

impl<R> fmt::Debug for LexerBuilder<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LexerBuilder")
            .field("rules", &self.rules)
            .field("dot_matches_any", &self.dot_matches_any)
            .field("max_states", &self.max_states)
            .finish()
    }
}

impl<R> LexerBuilder<R> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether an unescaped `.` matches any character (the default) or only
    /// a literal dot.
    pub fn dot_matches_any(mut self, yes: bool) -> Self {
        self.dot_matches_any = yes;
        self
    }

    /// Fail the build with [`Error::TooManyStates`] rather than produce a
    /// DFA with more than `limit` states.
    pub fn max_states(mut self, limit: Option<usize>) -> Self {
        self.max_states = limit;
        self
    }

    /// Append a rule. Earlier rules win ties.
    pub fn rule<F>(mut self, pattern: impl Into<String>, tag: impl Into<String>, handler: F) -> Self
    where
        F: Fn(&str) -> R + Send + Sync + 'static,
    {
        self.rules.push(LexerRule::new(pattern, tag, handler));
        self
    }

    pub fn push_rule(&mut self, rule: LexerRule<R>) {
        self.rules.push(rule);
    }

    pub fn rules(&self) -> &[LexerRule<R>] {
        &self.rules
    }

    /// Compile every rule into one automaton.
    pub fn build(&self) -> Result<Dfa<R>, Error> {
        let mut handlers = HandlerTable::new();
        let mut arena = NodeArena::new();
        let start = arena.alloc();

        for rule in &self.rules {
            let id = handlers.insert_shared(rule.tag.as_str(), Arc::clone(&rule.handler))?;
            let nfa = compile_regexp(&mut arena, &rule.pattern, self.dot_matches_any)?;
            nfa.accept(&mut arena, id);
            arena.add_edge(start, Edge::epsilon([nfa.start]));
        }

        let (dfa, dfa_start) = subset_construction(&arena, start, self.max_states)?;
        debug!(
            "built lexer from {} rules: {} NFA nodes, {} DFA states",
            self.rules.len(),
            arena.len(),
            dfa.len()
        );
        Ok(Dfa::new(dfa, dfa_start, handlers))
    }
}

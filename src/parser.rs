//! Table-driven LR(1) parser runtime.
//!
//! The parser knows nothing about any particular grammar. It is handed a
//! [`ParseTable`] produced by an external generator, a [`TokenSource`], and
//! a semantic-action callback invoked with the production index and the
//! values of the popped right-hand side on every reduction.
//!
//! Unexpected tokens put the parser in panic mode: the state stack is
//! unwound to the nearest state that can shift the synthetic `error` token,
//! and input is discarded until parsing can resume. Recovery only serves to
//! collect further diagnostics. A parse that reported anything fails.

use std::fmt;

use log::{debug, trace};
use rustc_hash::FxHashMap;

use crate::Error;

/// Token kind marking end of input.
pub const END: &str = "$";

/// Synthetic token kind shifted during error recovery.
pub const ERROR: &str = "error";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    /// Push the token and move to the given state.
    Shift(usize),
    /// Reduce by the given production.
    Reduce(usize),
}

impl Action {
    /// Decode the generator's `s<N>` / `r<N>` encoding. `err` means no
    /// action.
    fn decode(encoded: &str) -> Result<Option<Action>, Error> {
        if encoded == "err" {
            return Ok(None);
        }
        let malformed = || Error::MalformedTable(format!("bad action `{encoded}`"));
        let mut chars = encoded.chars();
        let kind = chars.next();
        let target: usize = chars.as_str().parse().map_err(|_| malformed())?;
        match kind {
            Some('s') => Ok(Some(Action::Shift(target))),
            Some('r') => Ok(Some(Action::Reduce(target))),
            _ => Err(malformed()),
        }
    }
}

/// LR action table with the head and length of every production.
///
/// Production 0 is the augmented start production; reducing by it accepts.
#[derive(Clone)]
pub struct ParseTable {
    actions: Vec<FxHashMap<String, Action>>,
    heads: Vec<String>,
    lengths: Vec<usize>,
}

impl fmt::Debug for ParseTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ParseTable")
            .field("states", &self.actions.len())
            .field("productions", &self.heads.len())
            .finish()
    }
}

impl ParseTable {
    /// Build a table from rows of `(symbol, action)` pairs, one row per
    /// state.
    ///
    /// Every shift must target an existing state and every reduce an
    /// existing production.
    pub fn from_actions(
        rows: &[&[(&str, &str)]],
        heads: &[&str],
        lengths: &[usize],
    ) -> Result<Self, Error> {
        if heads.len() != lengths.len() {
            return Err(Error::MalformedTable(format!(
                "{} production heads but {} lengths",
                heads.len(),
                lengths.len()
            )));
        }
        if heads.is_empty() {
            return Err(Error::MalformedTable("no productions".into()));
        }

        let mut actions = Vec::with_capacity(rows.len());
        for (state, row) in rows.iter().enumerate() {
            let mut entries = FxHashMap::default();
            for &(symbol, encoded) in row.iter() {
                let Some(action) = Action::decode(encoded)? else {
                    continue;
                };
                let in_range = match action {
                    Action::Shift(target) => target < rows.len(),
                    Action::Reduce(production) => production < heads.len(),
                };
                if !in_range {
                    return Err(Error::MalformedTable(format!(
                        "state {state}: `{encoded}` on `{symbol}` is out of range"
                    )));
                }
                entries.insert(symbol.to_owned(), action);
            }
            actions.push(entries);
        }

        Ok(Self {
            actions,
            heads: heads.iter().map(|head| head.to_string()).collect(),
            lengths: lengths.to_vec(),
        })
    }

    #[inline]
    pub fn action(&self, state: usize, symbol: &str) -> Option<Action> {
        self.actions.get(state)?.get(symbol).copied()
    }

    pub fn head(&self, production: usize) -> &str {
        &self.heads[production]
    }

    pub fn length(&self, production: usize) -> usize {
        self.lengths[production]
    }

    pub fn state_count(&self) -> usize {
        self.actions.len()
    }

    pub fn production_count(&self) -> usize {
        self.heads.len()
    }
}

/// A terminal from the token source, or a reduced non-terminal.
#[derive(Debug, Clone, PartialEq)]
pub struct Token<V> {
    pub kind: String,
    pub value: V,
    /// Source text of a terminal; empty for synthetic tokens.
    pub text: String,
}

impl<V> Token<V> {
    pub fn new(kind: impl Into<String>, value: V, text: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            value,
            text: text.into(),
        }
    }
}

impl<V: Default> Token<V> {
    /// End-of-input marker.
    pub fn end() -> Self {
        Self::new(END, V::default(), "")
    }

    fn synthetic(kind: &str, value: V) -> Self {
        Self::new(kind, value, "")
    }
}

/// Supplies terminals to the parser.
pub trait TokenSource<V> {
    type Error;

    /// The next token. Once input is exhausted this must keep returning a
    /// token of kind [`END`].
    fn next_token(&mut self) -> Result<Token<V>, Self::Error>;

    /// Called once per syntax error with a human readable description.
    fn on_error(&mut self, message: &str);
}

/// Input rejected by the grammar.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("syntax error: {}", .diagnostics.join("; "))]
pub struct ParseError {
    pub diagnostics: Vec<String>,
}

/// Parse everything `source` produces.
///
/// `action` computes the value of each reduced production from the values
/// of its right-hand side. The value produced by production 0 is the
/// result. An error from `action` or from the token source aborts at once.
pub fn parse<V, S, F, E>(table: &ParseTable, source: &mut S, mut action: F) -> Result<V, E>
where
    V: Default,
    S: TokenSource<V>,
    F: FnMut(usize, Vec<V>) -> Result<V, E>,
    E: From<ParseError> + From<S::Error>,
{
    let mut states: Vec<usize> = vec![0];
    let mut values: Vec<V> = vec![V::default()];
    // A reduction yields a non-terminal while the lookahead that triggered
    // it stays buffered; at most one of each is pending.
    let mut reduced: Option<Token<V>> = None;
    let mut lookahead: Option<Token<V>> = None;
    let mut recovering = false;
    let mut diagnostics: Vec<String> = Vec::new();
    let mut result: Option<V> = None;

    'parse: while let Some(&state) = states.last() {
        let symbol = match reduced.take() {
            Some(symbol) => symbol,
            None => match lookahead.take() {
                Some(symbol) => symbol,
                None => source.next_token()?,
            },
        };

        match table.action(state, &symbol.kind) {
            Some(Action::Shift(target)) => {
                trace!("state {state}: shift `{}` -> {target}", symbol.kind);
                if symbol.kind != ERROR {
                    recovering = false;
                }
                values.push(symbol.value);
                states.push(target);
            }
            Some(Action::Reduce(production)) => {
                if symbol.kind != ERROR {
                    recovering = false;
                }
                let length = table.length(production);
                if length >= states.len() {
                    let message = format!(
                        "production {production} pops {length} symbols from a stack of {}",
                        states.len()
                    );
                    debug!("{message}");
                    source.on_error(&message);
                    diagnostics.push(message);
                    break;
                }
                let args = values.split_off(values.len() - length);
                states.truncate(states.len() - length);
                trace!(
                    "state {state}: reduce by {production} -> `{}`",
                    table.head(production)
                );
                let value = action(production, args)?;
                if production == 0 {
                    result = Some(value);
                    break;
                }
                reduced = Some(Token::synthetic(table.head(production), value));
                lookahead = Some(symbol);
            }
            None if recovering => {
                if symbol.kind == END {
                    break;
                }
                trace!("state {state}: discard `{}`", symbol.kind);
            }
            None => {
                let message = if symbol.text.is_empty() {
                    format!("unexpected `{}`", symbol.kind)
                } else {
                    format!("unexpected `{}` ({:?})", symbol.kind, symbol.text)
                };
                debug!("{message}");
                source.on_error(&message);
                diagnostics.push(message);
                if symbol.kind == END {
                    break;
                }

                recovering = true;
                while let Some(&candidate) = states.last() {
                    if table.action(candidate, ERROR).is_some() {
                        reduced = Some(Token::synthetic(ERROR, V::default()));
                        lookahead = Some(symbol);
                        continue 'parse;
                    }
                    states.pop();
                    values.pop();
                }
            }
        }
    }

    match result {
        Some(value) if diagnostics.is_empty() => Ok(value),
        _ => {
            if diagnostics.is_empty() {
                diagnostics.push("input ended before it was accepted".to_owned());
            }
            Err(ParseError { diagnostics }.into())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::collections::VecDeque;

    /// Sums of integers:
    ///
    /// ```text
    /// 0  E' -> E
    /// 1  E  -> E + n
    /// 2  E  -> n
    /// 3  E  -> error
    /// ```
    fn sum_table() -> ParseTable {
        ParseTable::from_actions(
            &[
                &[("n", "s2"), ("error", "s3"), ("E", "s1")],
                &[("$", "r0"), ("+", "s4")],
                &[("$", "r2"), ("+", "r2")],
                &[("$", "r3"), ("+", "r3")],
                &[("n", "s5")],
                &[("$", "r1"), ("+", "r1")],
            ],
            &["E'", "E", "E", "E"],
            &[1, 3, 1, 1],
        )
        .unwrap()
    }

    struct Words {
        tokens: VecDeque<Token<i64>>,
        errors: Vec<String>,
    }

    fn words(input: &str) -> Words {
        let tokens = input
            .split_whitespace()
            .map(|word| match word.parse::<i64>() {
                Ok(n) => Token::new("n", n, word),
                Err(_) => Token::new(word, 0, word),
            })
            .collect();
        Words {
            tokens,
            errors: Vec::new(),
        }
    }

    impl TokenSource<i64> for Words {
        type Error = Error;

        fn next_token(&mut self) -> Result<Token<i64>, Error> {
            Ok(self.tokens.pop_front().unwrap_or_else(Token::end))
        }

        fn on_error(&mut self, message: &str) {
            self.errors.push(message.to_string());
        }
    }

    fn sum(production: usize, args: Vec<i64>) -> Result<i64, Error> {
        Ok(match production {
            1 => args[0] + args[2],
            3 => 0,
            _ => args[0],
        })
    }

    #[test]
    fn test_accepts() {
        let table = sum_table();
        let mut source = words("1 + 2 + 39");
        assert_eq!(parse(&table, &mut source, sum).unwrap(), 42);
        assert!(source.errors.is_empty());

        let mut single = words("5");
        assert_eq!(parse(&table, &mut single, sum).unwrap(), 5);
    }

    #[test]
    fn test_reduction_order() {
        let table = sum_table();
        let mut seen = Vec::new();
        let mut source = words("1 + 2");
        parse(&table, &mut source, |production, args: Vec<i64>| {
            seen.push((production, args.len()));
            sum(production, args)
        })
        .unwrap();
        assert_eq!(seen, vec![(2, 1), (1, 3), (0, 1)]);
    }

    #[test]
    fn test_unexpected_end() {
        let table = sum_table();
        let mut source = words("1 +");
        let err = parse(&table, &mut source, sum).unwrap_err();

        let diagnostics = match err {
            Error::Parse(ParseError { diagnostics }) => diagnostics,
            other => panic!("expected a parse error, got {other:?}"),
        };
        assert_eq!(diagnostics, vec!["unexpected `$`".to_string()]);
        assert_eq!(source.errors, diagnostics);
    }

    #[test]
    fn test_recovery_still_fails() {
        // The stray `+` is absorbed by `E -> error` and the rest parses.
        let table = sum_table();
        let mut seen = Vec::new();
        let mut source = words("1 + + 2");
        let err = parse(&table, &mut source, |production, args: Vec<i64>| {
            seen.push(production);
            sum(production, args)
        })
        .unwrap_err();

        assert!(matches!(err, Error::Parse(ref e) if e.diagnostics.len() == 1));
        assert_eq!(source.errors, vec!["unexpected `+` (\"+\")".to_string()]);
        assert_eq!(seen.last(), Some(&0));
        assert!(seen.contains(&3));
    }

    #[test]
    fn test_recovery_discards_tokens() {
        let table = sum_table();
        let mut source = words("1 7 8 9");
        let err = parse(&table, &mut source, sum).unwrap_err();
        assert!(matches!(err, Error::Parse(ref e) if e.diagnostics.len() == 1));
        assert!(source.tokens.is_empty());
    }

    #[test]
    fn test_no_error_state_gives_up() {
        let table = ParseTable::from_actions(
            &[&[("n", "s2"), ("E", "s1")], &[("$", "r0")], &[("$", "r1")]],
            &["E'", "E"],
            &[1, 1],
        )
        .unwrap();
        let mut source = words("+ 1");
        let err = parse(&table, &mut source, sum).unwrap_err();
        assert!(matches!(err, Error::Parse(ref e) if e.diagnostics.len() == 1));
        // The rest of the input was never read.
        assert_eq!(source.tokens.len(), 1);
    }

    #[test]
    fn test_action_error_aborts() {
        let table = sum_table();
        let mut source = words("1 + 2");
        let err = parse(&table, &mut source, |production, args: Vec<i64>| {
            if production == 1 {
                Err(Error::EmptyClass)
            } else {
                sum(production, args)
            }
        })
        .unwrap_err();
        assert!(matches!(err, Error::EmptyClass));
    }

    #[test]
    fn test_reduce_deeper_than_stack_fails() {
        let table = ParseTable::from_actions(
            &[&[("n", "s1")], &[("$", "r1")]],
            &["S'", "S"],
            &[1, 3],
        )
        .unwrap();
        let mut source = words("5");
        let err = parse(&table, &mut source, sum).unwrap_err();

        let diagnostics = match err {
            Error::Parse(ParseError { diagnostics }) => diagnostics,
            other => panic!("expected a parse error, got {other:?}"),
        };
        assert_eq!(
            diagnostics,
            vec!["production 1 pops 3 symbols from a stack of 2".to_string()]
        );
        assert_eq!(source.errors, diagnostics);
    }

    #[test]
    fn test_malformed_tables() {
        let bad_action = ParseTable::from_actions(&[&[("n", "x1")]], &["S"], &[1]);
        assert!(matches!(bad_action, Err(Error::MalformedTable(_))));

        let bad_number = ParseTable::from_actions(&[&[("n", "s")]], &["S"], &[1]);
        assert!(matches!(bad_number, Err(Error::MalformedTable(_))));

        let bad_target = ParseTable::from_actions(&[&[("n", "s4")]], &["S"], &[1]);
        assert!(matches!(bad_target, Err(Error::MalformedTable(_))));

        let bad_production = ParseTable::from_actions(&[&[("n", "r2")]], &["S"], &[1]);
        assert!(matches!(bad_production, Err(Error::MalformedTable(_))));

        let mismatched = ParseTable::from_actions(&[], &["S", "T"], &[1]);
        assert!(matches!(mismatched, Err(Error::MalformedTable(_))));

        let table = ParseTable::from_actions(&[&[("n", "err"), ("m", "s0")]], &["S"], &[1]).unwrap();
        assert_eq!(table.action(0, "n"), None);
        assert_eq!(table.action(0, "m"), Some(Action::Shift(0)));
    }
}

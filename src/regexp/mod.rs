//! Pattern compilation into NFA fragments.
//!
//! Supported syntax:
//! - a literal character, or `\` followed by a metacharacter
//! - `\n`, `\t`, `\r`, `\\` and `\uXXXX`
//! - `.` matches any character (unless disabled, then it is literal)
//! - `[...]` character classes with `a-z` ranges
//! - `[^...]` negated character classes
//! - `|` alternation
//! - `(...)` grouping
//! - `+` one-or-more and `*` zero-or-more, applied to a single unit
//!
//! Patterns are scanned into tokens and parsed with the LR runtime in
//! [`crate::parser`]; each reduction builds part of the automaton.

mod grammar;
mod scanner;

use log::debug;

use crate::automaton::{NodeArena, Nfa};
use crate::parser::parse;
use crate::Error;
use grammar::Value;
use scanner::Scanner;

/// Compile `pattern` into a fragment allocated in `arena`.
///
/// The fragment's end node is not accepting; callers attach handlers with
/// [`Nfa::accept`].
pub fn compile_regexp(
    arena: &mut NodeArena,
    pattern: &str,
    dot_matches_any: bool,
) -> Result<Nfa, Error> {
    let before = arena.len();
    let mut scanner = Scanner::new(pattern, dot_matches_any);
    let value = parse(grammar::table(), &mut scanner, |production, args| {
        grammar::reduce(arena, production, args)
    })?;
    match value {
        Value::Automaton(nfa) => {
            debug!(
                "compiled pattern {:?} into {} NFA nodes",
                pattern,
                arena.len() - before
            );
            Ok(nfa)
        }
        other => unreachable!("pattern grammar accepted a non-automaton value {other:?}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::automaton::{subset_construction, Dfa, HandlerTable};

    fn compile_with(pattern: &str, dot_matches_any: bool) -> Result<Dfa<()>, Error> {
        let mut arena = NodeArena::new();
        let nfa = compile_regexp(&mut arena, pattern, dot_matches_any)?;
        nfa.accept(&mut arena, 0);
        let (dfa, start) = subset_construction(&arena, nfa.start, None)?;
        let mut handlers = HandlerTable::new();
        handlers.insert("match", |_: &str| ())?;
        Ok(Dfa::new(dfa, start, handlers))
    }

    fn compile(pattern: &str) -> Dfa<()> {
        compile_with(pattern, true).unwrap()
    }

    fn assert_matches(pattern: &str, accepted: &[&str], rejected: &[&str]) {
        let dfa = compile(pattern);
        for input in accepted {
            assert!(dfa.matches(input), "{pattern:?} should match {input:?}");
        }
        for input in rejected {
            assert!(!dfa.matches(input), "{pattern:?} should not match {input:?}");
        }
    }

    #[test]
    fn test_literal_sequence() {
        assert_matches("abc", &["abc"], &["", "ab", "abcd", "abd"]);
    }

    #[test]
    fn test_alternation() {
        assert_matches("a|b", &["a", "b"], &["", "ab"]);
        assert_matches("(ab)|(cd)", &["ab", "cd"], &["ad", "abcd"]);
    }

    #[test]
    fn test_alternation_groups_last_unit_on_the_left() {
        assert_matches("ab|c", &["ab", "ac"], &["c", "abc"]);
        assert_matches("a|bc", &["a", "bc"], &["ac", "b"]);
    }

    #[test]
    fn test_group_star() {
        assert_matches("a(b|c)*", &["a", "abcbc", "acccb"], &["b", "", "abd"]);
    }

    #[test]
    fn test_plus() {
        assert_matches("b+", &["b", "bbbb"], &["", "a", "bba"]);
        assert_matches("(ab)+", &["ab", "abab"], &["", "aba"]);
    }

    #[test]
    fn test_class() {
        assert_matches("[a-cx]", &["a", "b", "c", "x"], &["d", "w", "ab"]);
        assert_matches("[a-zA-Z0-9]+", &["abcXYZ019"], &["a-b", ""]);
    }

    #[test]
    fn test_negated_class() {
        assert_matches("[^ab]", &["c", "z", "\n"], &["a", "b", ""]);
        assert_matches("[^a-y]", &["z", "A"], &["a", "m", "y"]);
    }

    #[test]
    fn test_dot() {
        assert_matches("a.c", &["abc", "a.c", "a\nc"], &["ac"]);
        assert_matches("[.]", &["."], &["a"]);

        let literal = compile_with("a.c", false).unwrap();
        assert!(literal.matches("a.c"));
        assert!(!literal.matches("abc"));
    }

    #[test]
    fn test_escapes() {
        assert_matches(r"\(\)", &["()"], &["(", ""]);
        assert_matches(r"A+", &["A", "AA"], &["a"]);
        assert_matches(r"\-\+\*", &["-+*"], &["-"]);
        assert_matches(r"[ \t\n\r]+", &[" \t\n\r "], &["x"]);
    }

    #[test]
    fn test_quoted_string() {
        assert_matches(
            r#""([^"]|(\\"))*""#,
            &[r#""""#, r#""hello""#, r#""a\"b""#],
            &[r#"""#, "hello"],
        );
    }

    #[test]
    fn test_syntax_errors() {
        for pattern in ["", "a|", "(a", "a)", "[]", "[^]", "+", "a-b", "a+*"] {
            match compile_with(pattern, true) {
                Err(Error::Parse(err)) => assert!(!err.diagnostics.is_empty()),
                other => panic!("{pattern:?} should fail to parse, got {other:?}"),
            }
        }
    }

    #[test]
    fn test_construction_errors() {
        assert!(matches!(
            compile_with("[z-a]", true),
            Err(Error::MalformedInterval { start: 122, end: 97 })
        ));
        assert!(matches!(
            compile_with(r"a\k", true),
            Err(Error::InvalidEscape { escape: 'k', .. })
        ));
    }
}

//! LR(1) table and semantic actions for the pattern grammar.
//!
//! ```text
//! 0  exp'        -> exp
//! 1  exp         -> exp_unit
//! 2  exp         -> exp exp
//! 3  exp         -> exp | exp
//! 4  exp         -> exp_unit +
//! 5  exp         -> exp_unit *
//! 6  exp_unit    -> [ union_units ]
//! 7  exp_unit    -> [ ^ union_units ]
//! 8  exp_unit    -> ch
//! 9  exp_unit    -> ( exp )
//! 10 union_units -> union_units union_unit
//! 11 union_units -> union_unit
//! 12 union_unit  -> ch
//! 13 union_unit  -> ch - ch
//! ```
//!
//! The table resolves the `exp exp | exp` conflict by shifting, so
//! alternation captures everything to its right but only the last unit
//! to its left: `ab|c` reads as `a(b|c)`.

use std::sync::OnceLock;

use crate::automaton::{NodeArena, Nfa};
use crate::parser::ParseTable;
use crate::Error;

/// A pattern character as delivered by the scanner.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Symbol {
    Code(u32),
    /// Unescaped `.`.
    Wildcard,
}

impl Symbol {
    /// The code point this symbol stands for inside a class, where `.` has
    /// no special meaning.
    fn literal(self) -> u32 {
        match self {
            Symbol::Code(code) => code,
            Symbol::Wildcard => '.' as u32,
        }
    }
}

/// Semantic value carried on the parser's value stack.
#[derive(Debug, Default)]
pub(crate) enum Value {
    /// Punctuation tokens and the stack bottom.
    #[default]
    Empty,
    Char(Symbol),
    Automaton(Nfa),
    Range(u32, u32),
    Ranges(Vec<(u32, u32)>),
}

impl Value {
    fn into_nfa(self) -> Nfa {
        match self {
            Value::Automaton(nfa) => nfa,
            other => panic!("expected an automaton, got {other:?}"),
        }
    }

    fn into_symbol(self) -> Symbol {
        match self {
            Value::Char(symbol) => symbol,
            other => panic!("expected a character, got {other:?}"),
        }
    }

    fn into_range(self) -> (u32, u32) {
        match self {
            Value::Range(lo, hi) => (lo, hi),
            other => panic!("expected a range, got {other:?}"),
        }
    }

    fn into_ranges(self) -> Vec<(u32, u32)> {
        match self {
            Value::Ranges(ranges) => ranges,
            other => panic!("expected a range list, got {other:?}"),
        }
    }
}

const HEADS: [&str; 14] = [
    "exp'",
    "exp",
    "exp",
    "exp",
    "exp",
    "exp",
    "exp_unit",
    "exp_unit",
    "exp_unit",
    "exp_unit",
    "union_units",
    "union_units",
    "union_unit",
    "union_unit",
];

const LENGTHS: [usize; 14] = [1, 1, 2, 3, 2, 2, 3, 4, 1, 3, 2, 1, 1, 3];

#[rustfmt::skip]
static ACTIONS: &[&[(&str, &str)]] = &[
    /*  0 */ &[("exp", "s1"), ("exp_unit", "s2"), ("[", "s3"), ("ch", "s4"), ("(", "s5")],
    /*  1 */ &[("$", "r0"), ("exp_unit", "s2"), ("exp", "s6"), ("|", "s7"), ("[", "s3"), ("ch", "s4"), ("(", "s5")],
    /*  2 */ &[("(", "r1"), ("[", "r1"), ("|", "r1"), ("$", "r1"), ("ch", "r1"), ("+", "s8"), ("*", "s9")],
    /*  3 */ &[("union_units", "s10"), ("^", "s11"), ("union_unit", "s12"), ("ch", "s13")],
    /*  4 */ &[("(", "r8"), ("[", "r8"), ("*", "r8"), ("+", "r8"), ("|", "r8"), ("$", "r8"), ("ch", "r8")],
    /*  5 */ &[("exp_unit", "s14"), ("exp", "s15"), ("[", "s16"), ("ch", "s17"), ("(", "s18")],
    /*  6 */ &[("exp_unit", "s2"), ("exp", "s6"), ("(", "r2"), ("[", "r2"), ("|", "s7"), ("$", "r2"), ("ch", "s4")],
    /*  7 */ &[("exp_unit", "s2"), ("exp", "s19"), ("[", "s3"), ("ch", "s4"), ("(", "s5")],
    /*  8 */ &[("(", "r4"), ("[", "r4"), ("|", "r4"), ("$", "r4"), ("ch", "r4")],
    /*  9 */ &[("(", "r5"), ("[", "r5"), ("|", "r5"), ("$", "r5"), ("ch", "r5")],
    /* 10 */ &[("]", "s20"), ("union_unit", "s21"), ("ch", "s13")],
    /* 11 */ &[("union_units", "s22"), ("union_unit", "s12"), ("ch", "s13")],
    /* 12 */ &[("]", "r11"), ("ch", "r11")],
    /* 13 */ &[("]", "r12"), ("ch", "r12"), ("-", "s23")],
    /* 14 */ &[("(", "r1"), (")", "r1"), ("[", "r1"), ("|", "r1"), ("ch", "r1"), ("+", "s24"), ("*", "s25")],
    /* 15 */ &[("exp_unit", "s14"), ("exp", "s26"), ("|", "s27"), ("[", "s16"), ("ch", "s17"), ("(", "s18"), (")", "s28")],
    /* 16 */ &[("union_units", "s29"), ("^", "s30"), ("union_unit", "s12"), ("ch", "s13")],
    /* 17 */ &[("(", "r8"), (")", "r8"), ("[", "r8"), ("*", "r8"), ("+", "r8"), ("|", "r8"), ("ch", "r8")],
    /* 18 */ &[("exp_unit", "s14"), ("exp", "s31"), ("[", "s16"), ("ch", "s17"), ("(", "s18")],
    /* 19 */ &[("exp_unit", "s2"), ("exp", "s6"), ("|", "r3"), ("(", "r3"), ("[", "r3"), ("$", "r3"), ("ch", "s4")],
    /* 20 */ &[("(", "r6"), ("[", "r6"), ("*", "r6"), ("+", "r6"), ("|", "r6"), ("$", "r6"), ("ch", "r6")],
    /* 21 */ &[("]", "r10"), ("ch", "r10")],
    /* 22 */ &[("]", "s32"), ("union_unit", "s21"), ("ch", "s13")],
    /* 23 */ &[("ch", "s33")],
    /* 24 */ &[("(", "r4"), (")", "r4"), ("[", "r4"), ("|", "r4"), ("ch", "r4")],
    /* 25 */ &[("(", "r5"), (")", "r5"), ("[", "r5"), ("|", "r5"), ("ch", "r5")],
    /* 26 */ &[("exp_unit", "s14"), ("exp", "s26"), ("(", "r2"), (")", "r2"), ("[", "r2"), ("|", "s27"), ("ch", "s17")],
    /* 27 */ &[("exp_unit", "s14"), ("exp", "s34"), ("[", "s16"), ("ch", "s17"), ("(", "s18")],
    /* 28 */ &[("(", "r9"), ("[", "r9"), ("*", "r9"), ("+", "r9"), ("|", "r9"), ("$", "r9"), ("ch", "r9")],
    /* 29 */ &[("]", "s35"), ("union_unit", "s21"), ("ch", "s13")],
    /* 30 */ &[("union_units", "s36"), ("union_unit", "s12"), ("ch", "s13")],
    /* 31 */ &[("exp_unit", "s14"), ("exp", "s26"), ("|", "s27"), ("[", "s16"), ("ch", "s17"), ("(", "s18"), (")", "s37")],
    /* 32 */ &[("(", "r7"), ("[", "r7"), ("*", "r7"), ("+", "r7"), ("|", "r7"), ("$", "r7"), ("ch", "r7")],
    /* 33 */ &[("]", "r13"), ("ch", "r13")],
    /* 34 */ &[("exp_unit", "s14"), ("exp", "s26"), ("|", "r3"), ("(", "r3"), (")", "r3"), ("[", "r3"), ("ch", "s17")],
    /* 35 */ &[("(", "r6"), (")", "r6"), ("[", "r6"), ("*", "r6"), ("+", "r6"), ("|", "r6"), ("ch", "r6")],
    /* 36 */ &[("]", "s38"), ("union_unit", "s21"), ("ch", "s13")],
    /* 37 */ &[("(", "r9"), (")", "r9"), ("[", "r9"), ("*", "r9"), ("+", "r9"), ("|", "r9"), ("ch", "r9")],
    /* 38 */ &[("(", "r7"), (")", "r7"), ("[", "r7"), ("*", "r7"), ("+", "r7"), ("|", "r7"), ("ch", "r7")],
];

/// The parse table, built on first use.
pub(crate) fn table() -> &'static ParseTable {
    static TABLE: OnceLock<ParseTable> = OnceLock::new();
    TABLE.get_or_init(|| {
        ParseTable::from_actions(ACTIONS, &HEADS, &LENGTHS)
            .unwrap_or_else(|err| panic!("pattern grammar table is malformed: {err}"))
    })
}

fn take<const N: usize>(args: Vec<Value>) -> [Value; N] {
    match <[Value; N]>::try_from(args) {
        Ok(values) => values,
        Err(args) => panic!("expected {N} values, got {}", args.len()),
    }
}

/// Compute the value of `production` from its right-hand side.
pub(crate) fn reduce(
    arena: &mut NodeArena,
    production: usize,
    args: Vec<Value>,
) -> Result<Value, Error> {
    let value = match production {
        0 | 1 => {
            let [exp] = take(args);
            exp
        }
        2 => {
            let [left, right] = take(args);
            let mut nfa = left.into_nfa();
            nfa.concatenate(arena, right.into_nfa());
            Value::Automaton(nfa)
        }
        3 => {
            let [left, _, right] = take(args);
            let mut nfa = left.into_nfa();
            nfa.union(arena, right.into_nfa());
            Value::Automaton(nfa)
        }
        4 => {
            let [unit, _] = take(args);
            let mut nfa = unit.into_nfa();
            nfa.plus(arena);
            Value::Automaton(nfa)
        }
        5 => {
            let [unit, _] = take(args);
            let mut nfa = unit.into_nfa();
            nfa.kleene_closure(arena);
            Value::Automaton(nfa)
        }
        6 => {
            let [_, ranges, _] = take(args);
            Value::Automaton(Nfa::class(arena, &ranges.into_ranges())?)
        }
        7 => {
            let [_, _, ranges, _] = take(args);
            Value::Automaton(Nfa::negated_class(arena, &ranges.into_ranges())?)
        }
        8 => {
            let [ch] = take(args);
            let nfa = match ch.into_symbol() {
                Symbol::Code(code) => Nfa::literal(arena, code, code)?,
                Symbol::Wildcard => Nfa::any(arena),
            };
            Value::Automaton(nfa)
        }
        9 => {
            let [_, exp, _] = take(args);
            exp
        }
        10 => {
            let [list, unit] = take(args);
            let mut ranges = list.into_ranges();
            ranges.push(unit.into_range());
            Value::Ranges(ranges)
        }
        11 => {
            let [unit] = take(args);
            Value::Ranges(vec![unit.into_range()])
        }
        12 => {
            let [ch] = take(args);
            let code = ch.into_symbol().literal();
            Value::Range(code, code)
        }
        13 => {
            let [lo, _, hi] = take(args);
            let (lo, hi) = (lo.into_symbol().literal(), hi.into_symbol().literal());
            if hi < lo {
                return Err(Error::MalformedInterval { start: lo, end: hi });
            }
            Value::Range(lo, hi)
        }
        _ => unreachable!("pattern grammar has no production {production}"),
    };
    Ok(value)
}

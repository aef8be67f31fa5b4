//! # Transition-table parser
//! Parsers for the plain-text transition-table notation used to write
//! DFAs and NFAs (with and without epsilon transitions).
//!
//! ## Notation
//! A machine is a table in UTF-8 text. The first significant line is the
//! header: the whitespace-separated alphabet, where a symbol may be any
//! whitespace-free string. An NFA header may additionally carry an `ε`
//! (or `eps`) column for epsilon transitions. Every further significant
//! line is one state row:
//! - `->` or `→` marks the initial state, `*` marks an accepting state
//!   (both optional, before the state name);
//! - the state name;
//! - one entry per header column. DFA entries are target state names,
//!   with `-` for a deliberately missing transition (a partial DFA).
//!   NFA entries are brace-wrapped sets of names, `{}` being empty.
//!
//! `#` starts a comment running to the end of its line; lines that are
//! blank after comment removal are skipped entirely.
//!
//! A DFA over `0 1` accepting the strings that end in an odd number of
//! 1s:
//! ```text
//!       0  1
//! -> q0 q0 q1
//!  * q1 q0 q2
//!    q2 q2 q1
//! ```
//!
//! An NFA for `a*b*`, using an epsilon move to hand over from the a-loop
//! to the b-loop:
//! ```text
//!      ε   a   b
//! -> p {q} {p} {}
//!  * q {}  {}  {q}
//! ```
//!
//! Parsing is only the first half of construction: a [DfaTable] or
//! [NfaTable] records what the text said, not whether it makes sense.
//! Converting with `TryInto` into a [Dfa](crate::dfa::Dfa) or
//! [Nfa](crate::nfa::Nfa) runs the consistency checks (known states,
//! matching row widths, exactly one initial state).

mod grammar;

use nom::error::{Error, ErrorKind};
use nom::{combinator::all_consuming, Finish, IResult};

/// One parsed state row: the two marker flags, the state name, and one
/// entry per header column. The entry type is the only thing a DFA row
/// and an NFA row disagree on.
#[derive(Debug, Clone)]
pub struct TableRow<'a, E> {
    pub initial: bool,
    pub accepting: bool,
    pub state: &'a str,
    pub entries: Vec<E>,
}

/// A DFA row entry: a target state, or `None` for a `-` hole.
pub type DfaRow<'a> = TableRow<'a, Option<&'a str>>;

/// An NFA row entry: a set of target states.
pub type NfaRow<'a> = TableRow<'a, Vec<&'a str>>;

/// A DFA as written in its table, before validation.
#[derive(Debug)]
pub struct DfaTable<'a> {
    pub alphabet: Vec<&'a str>,
    pub rows: Vec<DfaRow<'a>>,
}

/// An NFA as written in its table, before validation.
#[derive(Debug)]
pub struct NfaTable<'a> {
    pub columns: Vec<NfaColumn<'a>>,
    pub rows: Vec<NfaRow<'a>>,
}

/// One header column of an NFA table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NfaColumn<'a> {
    Symbol(&'a str),
    Epsilon,
}

/// Parses a DFA table into a [DfaTable]. Every significant line must
/// parse; consistency is checked later, by converting into a
/// [Dfa](crate::dfa::Dfa) with `TryInto`.
pub fn dfa(input: &str) -> Result<DfaTable, Error<&str>> {
    let mut lines = significant_lines(input);
    let header = lines
        .next()
        .ok_or_else(|| Error::new(input, ErrorKind::NonEmpty))?;
    let alphabet = parse_line(grammar::dfa_header, header)?;
    let rows = lines
        .map(|line| parse_line(grammar::dfa_row, line))
        .collect::<Result<Vec<_>, _>>()?;
    if rows.is_empty() {
        return Err(Error::new(input, ErrorKind::NonEmpty));
    }
    Ok(DfaTable { alphabet, rows })
}

/// Parses an NFA table into an [NfaTable]. Every significant line must
/// parse; consistency is checked later, by converting into an
/// [Nfa](crate::nfa::Nfa) with `TryInto`.
pub fn nfa(input: &str) -> Result<NfaTable, Error<&str>> {
    let mut lines = significant_lines(input);
    let header = lines
        .next()
        .ok_or_else(|| Error::new(input, ErrorKind::NonEmpty))?;
    let columns = parse_line(grammar::nfa_header, header)?;
    let rows = lines
        .map(|line| parse_line(grammar::nfa_row, line))
        .collect::<Result<Vec<_>, _>>()?;
    if rows.is_empty() {
        return Err(Error::new(input, ErrorKind::NonEmpty));
    }
    Ok(NfaTable { columns, rows })
}

/// The lines that actually carry table content: comments are cut at the
/// first `#`, surrounding whitespace is dropped, and what remains is
/// kept only if nonempty.
fn significant_lines(input: &str) -> impl Iterator<Item = &str> {
    input
        .lines()
        .map(|line| match line.find('#') {
            Some(comment) => line[..comment].trim(),
            None => line.trim(),
        })
        .filter(|line| !line.is_empty())
}

fn parse_line<'a, T, P>(parser: P, line: &'a str) -> Result<T, Error<&'a str>>
where
    P: FnMut(&'a str) -> IResult<&'a str, T>,
{
    all_consuming(parser)(line).finish().map(|(_, value)| value)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lines_are_trimmed_and_comments_cut() {
        let text = "  a b # the alphabet\n\n   # nothing here\n -> s s s  \n";
        let lines: Vec<&str> = significant_lines(text).collect();
        assert_eq!(lines, vec!["a b", "-> s s s"]);
    }

    #[test]
    fn parses_a_dfa_table() {
        let table = dfa("
              0  1
        -> q0 q0 q1
         * q1 q0 q2   # a comment
           q2 q2 q1
        ")
        .unwrap();
        assert_eq!(table.alphabet, vec!["0", "1"]);
        assert_eq!(table.rows.len(), 3);
        assert!(table.rows[0].initial && !table.rows[0].accepting);
        assert!(!table.rows[1].initial && table.rows[1].accepting);
        assert_eq!(table.rows[2].state, "q2");
        assert_eq!(table.rows[2].entries, vec![Some("q2"), Some("q1")]);
    }

    #[test]
    fn parses_holes_and_dashed_names() {
        let table = dfa("
             a b
          -> x - -x
             -x x x
        ")
        .unwrap();
        assert_eq!(table.rows[0].entries, vec![None, Some("-x")]);
        assert_eq!(table.rows[1].state, "-x");
    }

    #[test]
    fn parses_an_nfa_table_with_epsilon() {
        let table = nfa("
             ε   a   b
        -> p {q} {p} {}
         * q {}  {}  {q}
        ")
        .unwrap();
        assert_eq!(table.columns[0], NfaColumn::Epsilon);
        assert_eq!(table.columns[1], NfaColumn::Symbol("a"));
        assert_eq!(table.rows[0].entries, vec![vec!["q"], vec!["p"], vec![]]);
    }

    #[test]
    fn marker_order_is_free() {
        let table = dfa("
             a
         * -> s s
        ")
        .unwrap();
        assert!(table.rows[0].initial && table.rows[0].accepting);
    }

    #[test]
    fn rejects_garbage_rows() {
        assert!(dfa("a b\n-> s").is_err()); // no entries after the name
        assert!(dfa("").is_err()); // no header
        assert!(dfa("a b").is_err()); // no rows
        assert!(nfa("a\n-> s {t").is_err()); // unclosed set
        assert!(dfa("a\n-> eps s").is_err()); // reserved state name
    }
}

//! The per-line grammar of the table notation. The scanner is
//! token-first: a raw token runs to the next whitespace, brace or
//! comment character, and each line parser decides what its tokens may
//! be. Comment stripping and line splitting happen before any of these
//! run (see the module root), so none of them ever sees a `#` or a line
//! ending.

use crate::parser::{DfaRow, NfaColumn, NfaRow, TableRow};
use nom::character::complete::{char, space1};
use nom::error::{Error, ErrorKind};
use nom::multi::{separated_list0, separated_list1};
use nom::sequence::{delimited, preceded};
use nom::IResult;

/// Tokens that never name a state or an alphabet symbol.
const RESERVED: &[&str] = &["ε", "eps", "->", "→", "*", "-"];

fn reject(input: &str, kind: ErrorKind) -> nom::Err<Error<&str>> {
    nom::Err::Error(Error::new(input, kind))
}

/// A raw token: everything up to the next whitespace, brace or `#`.
fn raw_token(input: &str) -> IResult<&str, &str> {
    let end = input
        .find(|c: char| c.is_whitespace() || "{}#".contains(c))
        .unwrap_or(input.len());
    if end == 0 {
        return Err(reject(input, ErrorKind::TakeTill1));
    }
    let (token, rest) = input.split_at(end);
    Ok((rest, token))
}

/// A token usable as a state name or an alphabet symbol.
fn symbol(input: &str) -> IResult<&str, &str> {
    let (rest, token) = raw_token(input)?;
    if RESERVED.contains(&token) {
        return Err(reject(input, ErrorKind::Verify));
    }
    Ok((rest, token))
}

/// The `->`/`→` and `*` markers in front of a state name. Each may
/// appear at most once, in either order.
fn row_prefix(input: &str) -> IResult<&str, (bool, bool)> {
    let mut rest = input;
    let mut initial = false;
    let mut accepting = false;
    loop {
        let Ok((after_token, token)) = raw_token(rest) else {
            break;
        };
        let flag = match token {
            "->" | "→" if !initial => &mut initial,
            "*" if !accepting => &mut accepting,
            _ => break,
        };
        *flag = true;
        let (after_gap, _) = space1(after_token)?;
        rest = after_gap;
    }
    Ok((rest, (initial, accepting)))
}

pub(super) fn dfa_header(input: &str) -> IResult<&str, Vec<&str>> {
    separated_list1(space1, symbol)(input)
}

pub(super) fn nfa_header(input: &str) -> IResult<&str, Vec<NfaColumn>> {
    separated_list1(space1, column)(input)
}

fn column(input: &str) -> IResult<&str, NfaColumn> {
    let (rest, token) = raw_token(input)?;
    match token {
        "ε" | "eps" => Ok((rest, NfaColumn::Epsilon)),
        _ if RESERVED.contains(&token) => Err(reject(input, ErrorKind::Verify)),
        _ => Ok((rest, NfaColumn::Symbol(token))),
    }
}

pub(super) fn dfa_row(input: &str) -> IResult<&str, DfaRow> {
    let (input, (initial, accepting)) = row_prefix(input)?;
    let (input, state) = symbol(input)?;
    let (input, entries) = preceded(space1, separated_list1(space1, dfa_entry))(input)?;
    Ok((
        input,
        TableRow {
            initial,
            accepting,
            state,
            entries,
        },
    ))
}

/// A DFA entry: a `-` hole or a target state. The hole must be the
/// whole token, since state names may contain dashes.
fn dfa_entry(input: &str) -> IResult<&str, Option<&str>> {
    let (rest, token) = raw_token(input)?;
    match token {
        "-" => Ok((rest, None)),
        _ if RESERVED.contains(&token) => Err(reject(input, ErrorKind::Verify)),
        _ => Ok((rest, Some(token))),
    }
}

pub(super) fn nfa_row(input: &str) -> IResult<&str, NfaRow> {
    let (input, (initial, accepting)) = row_prefix(input)?;
    let (input, state) = symbol(input)?;
    let (input, entries) = preceded(space1, separated_list1(space1, state_set))(input)?;
    Ok((
        input,
        TableRow {
            initial,
            accepting,
            state,
            entries,
        },
    ))
}

/// A brace-wrapped, whitespace-separated set of state names.
fn state_set(input: &str) -> IResult<&str, Vec<&str>> {
    delimited(char('{'), separated_list0(space1, symbol), char('}'))(input)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tokens_stop_at_delimiters() {
        assert_eq!(raw_token("ab cd"), Ok((" cd", "ab")));
        assert_eq!(raw_token("a{b"), Ok(("{b", "a")));
        assert!(raw_token(" x").is_err());
        assert!(raw_token("").is_err());
    }

    #[test]
    fn reserved_tokens_are_not_symbols() {
        assert!(symbol("eps").is_err());
        assert!(symbol("*").is_err());
        assert_eq!(symbol("eps0"), Ok(("", "eps0")));
        assert_eq!(symbol("a-b"), Ok(("", "a-b")));
    }

    #[test]
    fn prefixes_stack_up() {
        assert_eq!(row_prefix("-> * s rest"), Ok(("s rest", (true, true))));
        assert_eq!(row_prefix("→ s"), Ok(("s", (true, false))));
        assert_eq!(row_prefix("s t"), Ok(("s t", (false, false))));
    }

    #[test]
    fn entries_distinguish_holes() {
        assert_eq!(dfa_entry("-"), Ok(("", None)));
        assert_eq!(dfa_entry("-x"), Ok(("", Some("-x"))));
        assert!(dfa_entry("->").is_err());
    }

    #[test]
    fn sets_may_be_empty() {
        assert_eq!(state_set("{}"), Ok(("", vec![])));
        assert_eq!(state_set("{a b}"), Ok(("", vec!["a", "b"])));
        assert!(state_set("{a").is_err());
    }
}

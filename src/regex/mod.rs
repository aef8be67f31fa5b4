//! # Regular expressions
//! A strictly regular regex dialect and its bridge to NFAs, built on the
//! token framework in [crate::postfix].
//!
//! ## Dialect
//! - Literals are single symbols: any character except the
//!   metacharacters `( ) | * ? .` and whitespace.
//! - `|` is union (precedence 1).
//! - Concatenation is implicit between adjacent expressions (precedence
//!   2); it may also be spelled `.` explicitly.
//! - Postfix `*` (Kleene star) and `?` (option) bind tightest
//!   (precedence 3).
//! - Parentheses group. The empty pattern denotes the language `{ε}`.
//!
//! There are no character classes, anchors or backreferences; the
//! dialect describes exactly the regular languages.
//!
//! ```
//! use machina::nfa::Nfa;
//!
//! let nfa = Nfa::from_regex("ab(cd*|dc)|a?").unwrap();
//! assert!(nfa.accepts_graphemes(""));
//! assert!(nfa.accepts_graphemes("a"));
//! assert!(nfa.accepts_graphemes("abcd"));
//! assert!(nfa.accepts_graphemes("abcddd"));
//! assert!(nfa.accepts_graphemes("abdc"));
//! assert!(!nfa.accepts_graphemes("b"));
//! assert!(!nfa.accepts_graphemes("acdc"));
//! ```

use crate::dfa::Dfa;
use crate::errors::MachineError;
use crate::nfa::Nfa;
use crate::postfix::validate_tokens;

pub(crate) mod parser;

/// Checks that a pattern is well-formed in the dialect. This is exactly
/// the lexing and token validation the NFA conversion would perform.
pub fn validate(pattern: &str) -> Result<(), MachineError> {
    if pattern.is_empty() {
        return Ok(());
    }
    let tokens = parser::regex_lexer().lex(pattern)?;
    if tokens.is_empty() {
        return Err(MachineError::InvalidRegex(
            "expression is empty".to_string(),
        ));
    }
    validate_tokens(&tokens)
}

pub(crate) fn build_nfa(
    pattern: &str,
    input_symbols: Option<&[&str]>,
) -> Result<Nfa, MachineError> {
    parser::parse(pattern)?.into_nfa(input_symbols)
}

/// Builds DFAs for two patterns over their combined symbol set, so the
/// language predicates below compare like with like.
fn comparable_dfas(a: &str, b: &str) -> Result<(Dfa, Dfa), MachineError> {
    let mut symbols = parser::symbols_of(a)?;
    symbols.extend(parser::symbols_of(b)?);
    symbols.sort();
    symbols.dedup();
    let symbols: Vec<&str> = symbols.iter().map(String::as_str).collect();
    let dfa_a = Nfa::from_regex_with_symbols(a, &symbols)?.to_dfa();
    let dfa_b = Nfa::from_regex_with_symbols(b, &symbols)?.to_dfa();
    Ok((dfa_a, dfa_b))
}

/// Checks if two patterns denote the same language.
pub fn is_equal(a: &str, b: &str) -> Result<bool, MachineError> {
    let (dfa_a, dfa_b) = comparable_dfas(a, b)?;
    Ok(dfa_a.equivalent_to(&dfa_b))
}

/// Checks if the language of `a` is contained in the language of `b`.
pub fn is_subset(a: &str, b: &str) -> Result<bool, MachineError> {
    let (dfa_a, dfa_b) = comparable_dfas(a, b)?;
    dfa_a.is_subset_of(&dfa_b)
}

/// Checks if the language of `a` contains the language of `b`.
pub fn is_superset(a: &str, b: &str) -> Result<bool, MachineError> {
    let (dfa_a, dfa_b) = comparable_dfas(a, b)?;
    dfa_a.is_superset_of(&dfa_b)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validates_good_patterns() {
        for pattern in ["", "a", "a|b", "(ab)*", "a?b", "a.b", "((a))", "a*b?c"] {
            assert!(validate(pattern).is_ok(), "{pattern} should validate");
        }
    }

    #[test]
    fn rejects_bad_patterns() {
        for pattern in ["*", "?a", "a|", "|a", "a||b", "(a", "a)", "()", "(|a)", "a|*b"] {
            assert!(
                matches!(validate(pattern), Err(MachineError::InvalidRegex(_))),
                "{pattern} should not validate"
            );
        }
    }

    #[test]
    fn lex_errors_carry_position() {
        assert!(matches!(
            validate("ab\ncd"),
            Err(MachineError::Lex { position: 2, .. })
        ));
    }

    #[test]
    fn precedence_binds_star_then_concat_then_union() {
        // ab* is a(b*), not (ab)*
        assert!(is_equal("ab*", "a(b*)").unwrap());
        assert!(!is_equal("ab*", "(ab)*").unwrap());
        // a|bc is a|(bc)
        assert!(is_equal("a|bc", "a|(bc)").unwrap());
        assert!(!is_equal("a|bc", "(a|b)c").unwrap());
    }

    #[test]
    fn explicit_concat_matches_implicit() {
        assert!(is_equal("a.b.c", "abc").unwrap());
    }

    #[test]
    fn empty_pattern_is_the_empty_word() {
        let nfa = Nfa::from_regex("").unwrap();
        assert!(nfa.accepts(&[]));
        let nfa = Nfa::from_regex_with_symbols("", &["a"]).unwrap();
        assert!(nfa.accepts(&[]));
        assert!(!nfa.accepts_graphemes("a"));
    }

    #[test]
    fn option_and_star() {
        let nfa = Nfa::from_regex("ab?c*").unwrap();
        assert!(nfa.accepts_graphemes("a"));
        assert!(nfa.accepts_graphemes("ab"));
        assert!(nfa.accepts_graphemes("accc"));
        assert!(nfa.accepts_graphemes("abc"));
        assert!(!nfa.accepts_graphemes("abb"));
        assert!(!nfa.accepts_graphemes(""));
    }

    #[test]
    fn subset_and_superset() {
        assert!(is_subset("ab", "a*b*").unwrap());
        assert!(!is_subset("a*b*", "ab").unwrap());
        assert!(is_superset("a*b*", "ab").unwrap());
        assert!(is_equal("a(b|c)", "ab|ac").unwrap());
    }

    #[test]
    fn patterns_with_disjoint_symbols_compare() {
        assert!(!is_equal("a", "b").unwrap());
        assert!(is_subset("a", "a|b").unwrap());
    }
}

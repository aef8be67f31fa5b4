//! The lexer half of the framework: an ordered registry of token rules,
//! each a pair of factory function and pattern.

use crate::postfix::Token;
use crate::MachineError;
use regex::Regex;
use std::collections::HashSet;

type TokenFactory<T> = Box<dyn Fn(&str) -> Token<T>>;

/// Splits text into [Token]s. Rules are tried at each position; the
/// longest match wins and ties go to the earliest registered rule.
/// Characters in the blank set are skipped when no rule matches; any
/// other unmatched character is a lex error carrying its byte position.
pub struct Lexer<T: 'static> {
    rules: Vec<(TokenFactory<T>, Regex)>,
    blank_chars: HashSet<char>,
}

impl<T: 'static> Default for Lexer<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: 'static> Lexer<T> {
    /// A lexer with the default blank set (space and tab).
    pub fn new() -> Self {
        Self::with_blank_chars([' ', '\t'].into_iter().collect())
    }

    pub fn with_blank_chars(blank_chars: HashSet<char>) -> Self {
        Self {
            rules: Vec::new(),
            blank_chars,
        }
    }

    /// Registers a token rule. `pattern` is anchored at the scan position;
    /// a malformed pattern is a programmer error and panics.
    pub fn register(&mut self, factory: impl Fn(&str) -> Token<T> + 'static, pattern: &str) {
        let anchored = Regex::new(&format!("^(?:{pattern})")).expect("token pattern must compile");
        self.rules.push((Box::new(factory), anchored));
    }

    /// Scans `text` left to right into a token list in infix ordering.
    pub fn lex(&self, text: &str) -> Result<Vec<Token<T>>, MachineError> {
        let mut pos = 0;
        let mut tokens = Vec::new();

        while pos < text.len() {
            let rest = &text[pos..];
            match self.best_match(rest) {
                Some((factory, len)) => {
                    tokens.push(factory(&rest[..len]));
                    pos += len;
                }
                None => {
                    let c = rest.chars().next().expect("pos < len");
                    if self.blank_chars.contains(&c) {
                        pos += c.len_utf8();
                    } else {
                        return Err(MachineError::Lex {
                            message: format!("no token rule matches {c:?}"),
                            position: pos,
                        });
                    }
                }
            }
        }
        Ok(tokens)
    }

    fn best_match(&self, rest: &str) -> Option<(&TokenFactory<T>, usize)> {
        let mut best: Option<(&TokenFactory<T>, usize)> = None;
        for (factory, pattern) in &self.rules {
            if let Some(found) = pattern.find(rest) {
                if found.end() > 0 && best.map_or(true, |(_, len)| found.end() > len) {
                    best = Some((factory, found.end()));
                }
            }
        }
        best
    }
}

//! The regex-to-NFA pipeline: token rules for the dialect, implicit
//! concatenation insertion, and the fragment builder the postfix
//! evaluator folds tokens into.

use crate::errors::MachineError;
use crate::nfa::{Nfa, NfaState};
use crate::postfix::{
    eval_postfix, to_postfix, validate_tokens, InfixOperator, Lexer, Literal, PostfixOperator,
    Token, TokenCategory,
};
use std::collections::{HashMap, HashSet};
use std::rc::Rc;
use unicode_segmentation::UnicodeSegmentation;

/// An NFA under construction. State ids are local to the fragment and
/// kept disjoint when fragments combine by shifting the right-hand
/// operand past `next_id`. The key `None` labels epsilon transitions.
pub(crate) struct NfaFragment {
    transitions: HashMap<usize, HashMap<Option<Rc<str>>, HashSet<usize>>>,
    initial_state: usize,
    final_states: HashSet<usize>,
    next_id: usize,
}

impl NfaFragment {
    /// A fragment accepting exactly the given literal (possibly empty),
    /// one state per grapheme boundary.
    pub(crate) fn from_string_literal(literal: &str) -> Self {
        let graphemes: Vec<&str> = literal.graphemes(true).collect();
        let mut transitions: HashMap<usize, HashMap<Option<Rc<str>>, HashSet<usize>>> =
            HashMap::new();
        for (idx, grapheme) in graphemes.iter().enumerate() {
            transitions
                .entry(idx)
                .or_default()
                .entry(Some(Rc::from(*grapheme)))
                .or_default()
                .insert(idx + 1);
        }
        transitions.entry(graphemes.len()).or_default();
        NfaFragment {
            transitions,
            initial_state: 0,
            final_states: HashSet::from([graphemes.len()]),
            next_id: graphemes.len() + 1,
        }
    }

    fn shifted(self, offset: usize) -> Self {
        NfaFragment {
            transitions: self
                .transitions
                .into_iter()
                .map(|(state, paths)| {
                    (
                        state + offset,
                        paths
                            .into_iter()
                            .map(|(label, targets)| {
                                (label, targets.into_iter().map(|t| t + offset).collect())
                            })
                            .collect(),
                    )
                })
                .collect(),
            initial_state: self.initial_state + offset,
            final_states: self.final_states.into_iter().map(|s| s + offset).collect(),
            next_id: self.next_id + offset,
        }
    }

    fn union(mut self, other: NfaFragment) -> Self {
        let other = other.shifted(self.next_id);
        let new_initial = other.next_id;
        self.transitions.extend(other.transitions);
        self.transitions.insert(
            new_initial,
            HashMap::from([(
                None,
                HashSet::from([self.initial_state, other.initial_state]),
            )]),
        );
        self.final_states.extend(other.final_states);
        self.initial_state = new_initial;
        self.next_id = new_initial + 1;
        self
    }

    fn concatenate(mut self, other: NfaFragment) -> Self {
        let other = other.shifted(self.next_id);
        self.next_id = other.next_id;
        self.transitions.extend(other.transitions);
        for state in &self.final_states {
            self.transitions
                .get_mut(state)
                .expect("final states have transition entries")
                .entry(None)
                .or_default()
                .insert(other.initial_state);
        }
        self.final_states = other.final_states;
        self
    }

    fn kleene_star(mut self) -> Self {
        let new_initial = self.next_id;
        self.next_id += 1;
        self.transitions.insert(
            new_initial,
            HashMap::from([(None, HashSet::from([self.initial_state]))]),
        );
        for state in &self.final_states {
            self.transitions
                .get_mut(state)
                .expect("final states have transition entries")
                .entry(None)
                .or_default()
                .insert(self.initial_state);
        }
        self.initial_state = new_initial;
        self.final_states.insert(new_initial);
        self
    }

    fn option(mut self) -> Self {
        let new_initial = self.next_id;
        self.next_id += 1;
        self.transitions.insert(
            new_initial,
            HashMap::from([(None, HashSet::from([self.initial_state]))]),
        );
        self.initial_state = new_initial;
        self.final_states.insert(new_initial);
        self
    }

    /// Finalizes the fragment into an [Nfa]. The alphabet is the set of
    /// symbols appearing in the fragment unless an explicit one is
    /// given, in which case it must cover them.
    pub(crate) fn into_nfa(self, input_symbols: Option<&[&str]>) -> Result<Nfa, MachineError> {
        let mut used: Vec<Rc<str>> = self
            .transitions
            .values()
            .flat_map(|paths| paths.keys().flatten().cloned())
            .collect::<HashSet<_>>()
            .into_iter()
            .collect();
        used.sort();

        let alphabet: Rc<[Rc<str>]> = match input_symbols {
            None => used.iter().cloned().collect(),
            Some(symbols) => {
                let mut seen = HashSet::new();
                for symbol in symbols {
                    if !seen.insert(*symbol) {
                        return Err(MachineError::InvalidSymbol(format!(
                            "'{symbol}' appears twice in the alphabet"
                        )));
                    }
                }
                for symbol in &used {
                    if !seen.contains(symbol.as_ref()) {
                        return Err(MachineError::InvalidSymbol(format!(
                            "'{symbol}' appears in the pattern but not in the alphabet"
                        )));
                    }
                }
                symbols.iter().map(|s| Rc::from(*s)).collect()
            }
        };

        let mut ids: Vec<usize> = self.transitions.keys().copied().collect();
        ids.sort_unstable();
        let index_of: HashMap<usize, usize> =
            ids.iter().enumerate().map(|(idx, &id)| (id, idx)).collect();

        let states = ids
            .iter()
            .enumerate()
            .map(|(idx, id)| {
                let paths = &self.transitions[id];
                let mut transitions = vec![Vec::new(); alphabet.len()];
                let mut epsilon_transitions = Vec::new();
                for (label, targets) in paths {
                    let mut resolved: Vec<usize> =
                        targets.iter().map(|t| index_of[t]).collect();
                    resolved.sort_unstable();
                    match label {
                        None => epsilon_transitions = resolved,
                        Some(symbol) => {
                            let sym = alphabet
                                .iter()
                                .position(|s| s == symbol)
                                .expect("used symbols are in the alphabet");
                            transitions[sym] = resolved;
                        }
                    }
                }
                NfaState {
                    name: Rc::from(idx.to_string()),
                    initial: *id == self.initial_state,
                    accepting: self.final_states.contains(id),
                    epsilon_transitions,
                    transitions,
                }
            })
            .collect();
        Ok(Nfa::from_parts(
            alphabet,
            states,
            index_of[&self.initial_state],
        ))
    }
}

struct UnionOp;
impl InfixOperator<NfaFragment> for UnionOp {
    fn precedence(&self) -> u32 {
        1
    }
    fn apply(&self, left: NfaFragment, right: NfaFragment) -> NfaFragment {
        left.union(right)
    }
}

struct ConcatOp;
impl InfixOperator<NfaFragment> for ConcatOp {
    fn precedence(&self) -> u32 {
        2
    }
    fn apply(&self, left: NfaFragment, right: NfaFragment) -> NfaFragment {
        left.concatenate(right)
    }
}

struct StarOp;
impl PostfixOperator<NfaFragment> for StarOp {
    fn precedence(&self) -> u32 {
        3
    }
    fn apply(&self, operand: NfaFragment) -> NfaFragment {
        operand.kleene_star()
    }
}

struct OptionOp;
impl PostfixOperator<NfaFragment> for OptionOp {
    fn precedence(&self) -> u32 {
        3
    }
    fn apply(&self, operand: NfaFragment) -> NfaFragment {
        operand.option()
    }
}

struct SymbolLit(String);
impl Literal<NfaFragment> for SymbolLit {
    fn value(&self) -> NfaFragment {
        NfaFragment::from_string_literal(&self.0)
    }
}

/// The lexer for the regex dialect: `|`, implicit or `.`-spelled
/// concatenation, postfix `*` and `?`, parentheses, and single-symbol
/// literals (anything except the metacharacters and whitespace).
pub(crate) fn regex_lexer() -> Lexer<NfaFragment> {
    let mut lexer = Lexer::new();
    lexer.register(|_| Token::left_paren(), r"\(");
    lexer.register(|_| Token::right_paren(), r"\)");
    lexer.register(
        |text| Token::literal(text, SymbolLit(text.to_string())),
        r"[^()|*?.\s]",
    );
    lexer.register(|text| Token::infix(text, UnionOp), r"\|");
    lexer.register(|text| Token::infix(text, ConcatOp), r"\.");
    lexer.register(|text| Token::postfix(text, StarOp), r"\*");
    lexer.register(|text| Token::postfix(text, OptionOp), r"\?");
    lexer
}

/// Inserts the implicit concatenation operator between adjacent tokens
/// wherever two expressions abut.
fn insert_concat_tokens(tokens: Vec<Token<NfaFragment>>) -> Vec<Token<NfaFragment>> {
    use TokenCategory::*;
    let adjacent = |left: TokenCategory, right: TokenCategory| {
        matches!(
            (left, right),
            (Literal, Literal)
                | (RightParen, LeftParen)
                | (RightParen, Literal)
                | (Literal, LeftParen)
                | (Postfix, Literal)
                | (Postfix, LeftParen)
        )
    };

    let mut result = Vec::with_capacity(tokens.len());
    let mut iter = tokens.into_iter().peekable();
    while let Some(token) = iter.next() {
        let category = token.category();
        result.push(token);
        if let Some(next) = iter.peek() {
            if adjacent(category, next.category()) {
                result.push(Token::infix(".", ConcatOp));
            }
        }
    }
    result
}

/// Lexes, validates and evaluates a pattern into an [NfaFragment]. The
/// empty pattern denotes the language containing only the empty word.
pub(crate) fn parse(pattern: &str) -> Result<NfaFragment, MachineError> {
    if pattern.is_empty() {
        return Ok(NfaFragment::from_string_literal(""));
    }
    let tokens = regex_lexer().lex(pattern)?;
    validate_tokens(&tokens)?;
    let tokens = insert_concat_tokens(tokens);
    eval_postfix(to_postfix(tokens))
}

/// The literal symbols appearing in a pattern, deduplicated and sorted.
pub(crate) fn symbols_of(pattern: &str) -> Result<Vec<String>, MachineError> {
    let tokens = regex_lexer().lex(pattern)?;
    let mut symbols: Vec<String> = tokens
        .iter()
        .filter(|t| t.category() == TokenCategory::Literal)
        .map(|t| t.text.clone())
        .collect::<HashSet<_>>()
        .into_iter()
        .collect();
    symbols.sort();
    Ok(symbols)
}

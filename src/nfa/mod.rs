//! # Nondeterministic finite automata, with or without ε-moves
//! The [Nfa] struct represents a nondeterministic finite automaton whose
//! states may carry epsilon transitions. NFAs come from parsing a
//! transition table ([crate::parser::nfa]), from a DFA, from a regular
//! expression ([Nfa::from_regex]), or from the Thompson-style combinators
//! below.
//!
//! ```
//! use machina::nfa::Nfa;
//!
//! // Strings ending in "ab"
//! let table = "
//!          a      b
//! -> s {s t} {s}
//!    t {}    {u}
//!  * u {}    {}
//! ";
//! let nfa: Nfa = machina::parser::nfa(table).unwrap().try_into().unwrap();
//! assert!(nfa.accepts_graphemes("aab"));
//! assert!(!nfa.accepts_graphemes("aba"));
//!
//! // The subset construction gives an equivalent DFA
//! let dfa = nfa.to_dfa();
//! assert!(dfa.accepts_graphemes("aab"));
//! assert!(!dfa.accepts_graphemes("aba"));
//! ```
//!
//! The epsilon closure of every state is computed once per machine and
//! cached; [Nfa::eliminate_lambda] produces an equivalent machine with no
//! epsilon transitions at all.

use crate::dfa::{Dfa, DfaState};
use crate::errors::MachineError;
use crate::table::Table;
use crate::util::{alphabet_equal, alphabet_translation, frozen_name, set_to_vec, UnionFind};
pub use eval::NfaEvaluator;
use std::cell::RefCell;
use std::collections::{HashMap, HashSet, VecDeque};
use std::rc::Rc;
use unicode_segmentation::UnicodeSegmentation;

pub mod eval;
pub mod parse;

/// A nondeterministic finite automaton: an alphabet, a set of states with
/// any number of transitions per (state, symbol) pair plus epsilon
/// transitions, one initial state and a set of accepting states.
#[derive(Debug)]
pub struct Nfa {
    pub(crate) alphabet: Rc<[Rc<str>]>,
    pub(crate) states: Vec<NfaState>,
    pub(crate) initial_state: usize,
    closures: RefCell<Option<Rc<Vec<HashSet<usize>>>>>,
}

/// A state in an NFA: its name, the initial/accepting flags, its epsilon
/// transitions and a set of targets per alphabet symbol.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NfaState {
    pub(crate) name: Rc<str>,
    pub(crate) initial: bool,
    pub(crate) accepting: bool,
    pub(crate) epsilon_transitions: Vec<usize>,
    pub(crate) transitions: Vec<Vec<usize>>,
}

impl NfaState {
    /// Gets the name of this state.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Checks if this state is the initial state.
    pub fn is_initial(&self) -> bool {
        self.initial
    }

    /// Checks if this state is accepting.
    pub fn is_accepting(&self) -> bool {
        self.accepting
    }

    /// The transition target sets for each element of the alphabet, in
    /// the alphabet's order.
    pub fn transitions(&self) -> &[Vec<usize>] {
        self.transitions.as_slice()
    }

    /// The epsilon transition targets of this state.
    pub fn epsilon_transitions(&self) -> &[usize] {
        self.epsilon_transitions.as_slice()
    }
}

impl Clone for Nfa {
    fn clone(&self) -> Self {
        Nfa::from_parts(self.alphabet.clone(), self.states.clone(), self.initial_state)
    }
}

impl PartialEq for Nfa {
    fn eq(&self, other: &Self) -> bool {
        self.alphabet == other.alphabet
            && self.states == other.states
            && self.initial_state == other.initial_state
    }
}

impl Eq for Nfa {}

impl Nfa {
    pub(crate) fn from_parts(
        alphabet: Rc<[Rc<str>]>,
        states: Vec<NfaState>,
        initial_state: usize,
    ) -> Self {
        Nfa {
            alphabet,
            states,
            initial_state,
            closures: RefCell::new(None),
        }
    }

    /// Gets the alphabet of this NFA.
    pub fn alphabet(&self) -> &[Rc<str>] {
        &self.alphabet
    }

    /// Gets the states of this NFA.
    pub fn states(&self) -> &[NfaState] {
        self.states.as_slice()
    }

    /// Gets the initial state of this NFA.
    pub fn initial_state(&self) -> &NfaState {
        &self.states[self.initial_state]
    }

    /// Gets the index of the initial state of this NFA.
    pub fn initial_state_index(&self) -> usize {
        self.initial_state
    }

    /// Checks if this automaton has any epsilon transitions.
    pub fn has_epsilon_moves(&self) -> bool {
        self.states
            .iter()
            .any(|state| !state.epsilon_transitions.is_empty())
    }

    /// Checks if the alphabet consists of single grapheme clusters only.
    pub fn graphemes_only(&self) -> bool {
        self.alphabet
            .iter()
            .all(|str| str.graphemes(true).count() == 1)
    }

    /// The epsilon closure table, computed once and cached behind the
    /// machine's interior-mutability boundary.
    pub(crate) fn lambda_closures(&self) -> Rc<Vec<HashSet<usize>>> {
        let mut cache = self.closures.borrow_mut();
        if cache.is_none() {
            let all = (0..self.states.len())
                .map(|idx| {
                    let mut set = HashSet::from([idx]);
                    let mut stack = vec![idx];
                    while let Some(q) = stack.pop() {
                        for &t in &self.states[q].epsilon_transitions {
                            if set.insert(t) {
                                stack.push(t);
                            }
                        }
                    }
                    set
                })
                .collect();
            *cache = Some(Rc::new(all));
        }
        cache.as_ref().expect("the closures were just computed").clone()
    }

    /// The epsilon closure of a state: itself plus every state reachable
    /// through epsilon transitions alone. `None` for an out-of-range
    /// index.
    pub fn closure(&self, state: usize) -> Option<HashSet<usize>> {
        (state < self.states.len()).then(|| self.lambda_closures()[state].clone())
    }

    /// Drops the cached epsilon closure table.
    pub fn clear_cache(&self) {
        *self.closures.borrow_mut() = None;
    }

    /// Gets an evaluator for stepwise execution over this automaton.
    pub fn evaluator(&self) -> NfaEvaluator<'_> {
        self.into()
    }

    /// Checks if this automaton accepts the given string of elements.
    pub fn accepts(&self, input: &[&str]) -> bool {
        let mut eval = self.evaluator();
        eval.step_multiple(input);
        eval.is_accepting()
    }

    /// Checks if this automaton accepts the given string, considering
    /// every extended grapheme cluster an element of the alphabet.
    pub fn accepts_graphemes(&self, input: &str) -> bool {
        let graphemes = input.graphemes(true).collect::<Vec<_>>();
        self.accepts(&graphemes)
    }

    /// Runs the automaton over the input and returns the terminal
    /// configuration (the set of states), or a
    /// [MachineError::Rejection] if no accepting state is among them.
    pub fn read_input(&self, input: &[&str]) -> Result<Vec<&NfaState>, MachineError> {
        let mut eval = self.evaluator();
        eval.step_multiple(input);
        if eval.is_accepting() {
            Ok(eval.current_states())
        } else {
            Err(MachineError::Rejection(
                "the NFA stopped on all non-accepting states".to_string(),
            ))
        }
    }

    /// Iterates over every transition exactly once, as (from, to, label)
    /// triples where `None` labels an epsilon transition.
    pub fn iter_transitions(&self) -> impl Iterator<Item = (usize, usize, Option<Rc<str>>)> + '_ {
        self.states.iter().enumerate().flat_map(move |(from, state)| {
            let eps = state
                .epsilon_transitions
                .iter()
                .map(move |&to| (from, to, None));
            let symbols = state
                .transitions
                .iter()
                .enumerate()
                .flat_map(move |(sym, targets)| {
                    targets
                        .iter()
                        .map(move |&to| (from, to, Some(self.alphabet[sym].clone())))
                });
            eps.chain(symbols)
        })
    }

    /// The NFA with exactly the given DFA's states and transitions (and
    /// no epsilon moves).
    pub fn from_dfa(dfa: &Dfa) -> Nfa {
        dfa.to_nfa()
    }

    /// An NFA accepting exactly the one-symbol string `symbol`. The
    /// alphabet is `{symbol}` unless a larger one is given.
    pub fn from_symbol(
        symbol: &str,
        input_symbols: Option<&[&str]>,
    ) -> Result<Nfa, MachineError> {
        Self::from_string_literal(symbol, input_symbols)
    }

    /// An NFA accepting exactly the given string literal, split into
    /// graphemes. The alphabet is derived from the literal unless given.
    pub fn from_string_literal(
        literal: &str,
        input_symbols: Option<&[&str]>,
    ) -> Result<Nfa, MachineError> {
        let graphemes: Vec<&str> = literal.graphemes(true).collect();
        let alphabet: Rc<[Rc<str>]> = match input_symbols {
            Some(symbols) => {
                let mut seen = HashSet::new();
                for symbol in symbols {
                    if !seen.insert(*symbol) {
                        return Err(MachineError::InvalidSymbol(format!(
                            "'{symbol}' appears twice in the alphabet"
                        )));
                    }
                }
                symbols.iter().map(|s| Rc::from(*s)).collect()
            }
            None => {
                let mut derived: Vec<&str> = graphemes.clone();
                derived.sort_unstable();
                derived.dedup();
                derived.into_iter().map(Rc::from).collect()
            }
        };
        let word = graphemes
            .iter()
            .map(|grapheme| {
                alphabet
                    .iter()
                    .position(|s| s.as_ref() == *grapheme)
                    .ok_or_else(|| {
                        MachineError::InvalidSymbol(format!(
                            "'{grapheme}' is not in the alphabet"
                        ))
                    })
            })
            .collect::<Result<Vec<_>, _>>()?;

        let states = (0..=word.len())
            .map(|idx| {
                let mut transitions = vec![Vec::new(); alphabet.len()];
                if let Some(&sym) = word.get(idx) {
                    transitions[sym].push(idx + 1);
                }
                NfaState {
                    name: Rc::from(idx.to_string()),
                    initial: idx == 0,
                    accepting: idx == word.len(),
                    epsilon_transitions: vec![],
                    transitions,
                }
            })
            .collect();
        Ok(Nfa::from_parts(alphabet, states, 0))
    }

    /// Builds the NFA for a regular expression in the crate's dialect
    /// (see [crate::regex]). The alphabet is the set of symbols
    /// appearing in the pattern.
    pub fn from_regex(pattern: &str) -> Result<Nfa, MachineError> {
        crate::regex::build_nfa(pattern, None)
    }

    /// Like [Nfa::from_regex] with an explicit alphabet, which must
    /// cover every symbol in the pattern.
    pub fn from_regex_with_symbols(
        pattern: &str,
        input_symbols: &[&str],
    ) -> Result<Nfa, MachineError> {
        crate::regex::build_nfa(pattern, Some(input_symbols))
    }

    /// The union of two NFAs: a new initial state takes epsilon
    /// transitions to both machines' initial states, and both final
    /// state sets stay. The alphabets are merged; states are renumbered.
    pub fn union(&self, other: &Nfa) -> Nfa {
        let (alphabet, b_map) = merge_alphabets(&self.alphabet, &other.alphabet);
        let a_map: Vec<usize> = (0..self.alphabet.len()).collect();
        let offset = self.states.len();
        let mut states = Vec::with_capacity(offset + other.states.len() + 1);
        states.extend(remapped_states(&self.states, 0, &a_map, alphabet.len(), 0));
        states.extend(remapped_states(
            &other.states,
            offset,
            &b_map,
            alphabet.len(),
            offset,
        ));
        let new_initial = states.len();
        states.push(NfaState {
            name: Rc::from(new_initial.to_string()),
            initial: true,
            accepting: false,
            epsilon_transitions: vec![self.initial_state, other.initial_state + offset],
            transitions: vec![Vec::new(); alphabet.len()],
        });
        Nfa::from_parts(alphabet, states, new_initial)
    }

    /// The concatenation of two NFAs: every final state of the first
    /// takes an epsilon transition to the second's initial state, and
    /// the final states are the second's. The alphabets are merged;
    /// states are renumbered.
    pub fn concatenate(&self, other: &Nfa) -> Nfa {
        let (alphabet, b_map) = merge_alphabets(&self.alphabet, &other.alphabet);
        let a_map: Vec<usize> = (0..self.alphabet.len()).collect();
        let offset = self.states.len();
        let mut states = Vec::with_capacity(offset + other.states.len());
        states.extend(remapped_states(&self.states, 0, &a_map, alphabet.len(), 0));
        states.extend(remapped_states(
            &other.states,
            offset,
            &b_map,
            alphabet.len(),
            offset,
        ));
        for state in states.iter_mut().take(offset) {
            if state.accepting {
                state.accepting = false;
                state
                    .epsilon_transitions
                    .push(other.initial_state + offset);
            }
        }
        states[self.initial_state].initial = true;
        Nfa::from_parts(alphabet, states, self.initial_state)
    }

    /// The Kleene star of this NFA: a new initial (and accepting) state
    /// takes an epsilon transition to the old initial state, and every
    /// final state takes one back to it.
    pub fn kleene_star(&self) -> Nfa {
        let mut states = self.states.clone();
        let new_initial = states.len();
        for state in states.iter_mut() {
            state.initial = false;
            if state.accepting {
                state.epsilon_transitions.push(self.initial_state);
            }
        }
        states.push(NfaState {
            name: self.fresh_name("s_new"),
            initial: true,
            accepting: true,
            epsilon_transitions: vec![self.initial_state],
            transitions: vec![Vec::new(); self.alphabet.len()],
        });
        Nfa::from_parts(self.alphabet.clone(), states, new_initial)
    }

    /// The option (`?`) of this NFA: a new initial and accepting state
    /// takes an epsilon transition to the old initial state, making the
    /// empty word accepted.
    pub fn option(&self) -> Nfa {
        let mut states = self.states.clone();
        let new_initial = states.len();
        for state in states.iter_mut() {
            state.initial = false;
        }
        states.push(NfaState {
            name: self.fresh_name("s_new"),
            initial: true,
            accepting: true,
            epsilon_transitions: vec![self.initial_state],
            transitions: vec![Vec::new(); self.alphabet.len()],
        });
        Nfa::from_parts(self.alphabet.clone(), states, new_initial)
    }

    /// The reversal of this NFA: every edge is reversed, a new initial
    /// state takes epsilon transitions to the old final states, and the
    /// old initial state becomes the only final state.
    pub fn reverse(&self) -> Nfa {
        let mut states: Vec<NfaState> = self
            .states
            .iter()
            .map(|state| NfaState {
                name: state.name.clone(),
                initial: false,
                accepting: false,
                epsilon_transitions: vec![],
                transitions: vec![Vec::new(); self.alphabet.len()],
            })
            .collect();
        for (from, state) in self.states.iter().enumerate() {
            for &t in &state.epsilon_transitions {
                states[t].epsilon_transitions.push(from);
            }
            for (sym, targets) in state.transitions.iter().enumerate() {
                for &t in targets {
                    states[t].transitions[sym].push(from);
                }
            }
        }
        let old_finals: Vec<usize> = self
            .states
            .iter()
            .enumerate()
            .filter(|(_, s)| s.accepting)
            .map(|(idx, _)| idx)
            .collect();
        let new_initial = states.len();
        states.push(NfaState {
            name: self.fresh_name("s_new"),
            initial: true,
            accepting: false,
            epsilon_transitions: old_finals,
            transitions: vec![Vec::new(); self.alphabet.len()],
        });
        states[self.initial_state].accepting = true;
        Nfa::from_parts(self.alphabet.clone(), states, new_initial)
    }

    /// The intersection of two NFAs through the pair product
    /// construction: on a symbol both coordinates advance, while epsilon
    /// transitions advance either coordinate independently. The
    /// alphabets are merged; states are renumbered.
    pub fn intersection(&self, other: &Nfa) -> Nfa {
        self.pair_product(other, false)
    }

    /// The shuffle product (interleaving) of two NFAs: on every symbol
    /// exactly one coordinate advances. A word is accepted when it can
    /// be split into two interleaved subsequences accepted by the two
    /// machines.
    pub fn shuffle_product(&self, other: &Nfa) -> Nfa {
        self.pair_product(other, true)
    }

    fn pair_product(&self, other: &Nfa, shuffle: bool) -> Nfa {
        let (alphabet, b_map) = merge_alphabets(&self.alphabet, &other.alphabet);
        // Per merged symbol, the original symbol index on each side.
        let mut rev_a: Vec<Option<usize>> = vec![None; alphabet.len()];
        for sym in 0..self.alphabet.len() {
            rev_a[sym] = Some(sym);
        }
        let mut rev_b: Vec<Option<usize>> = vec![None; alphabet.len()];
        for (sym, &merged) in b_map.iter().enumerate() {
            rev_b[merged] = Some(sym);
        }

        type Pair = (usize, usize);
        let start: Pair = (self.initial_state, other.initial_state);
        let mut index_of: HashMap<Pair, usize> = HashMap::from([(start, 0)]);
        let mut order: Vec<Pair> = vec![start];
        let mut rows: Vec<(Vec<Vec<Pair>>, Vec<Pair>)> = Vec::new();
        let mut queue = VecDeque::from([start]);

        while let Some((qa, qb)) = queue.pop_front() {
            let mut row: Vec<Vec<Pair>> = vec![Vec::new(); alphabet.len()];
            for (merged, targets) in row.iter_mut().enumerate() {
                let a_targets = rev_a[merged]
                    .map(|sym| self.states[qa].transitions[sym].as_slice())
                    .unwrap_or(&[]);
                let b_targets = rev_b[merged]
                    .map(|sym| other.states[qb].transitions[sym].as_slice())
                    .unwrap_or(&[]);
                if shuffle {
                    targets.extend(a_targets.iter().map(|&ta| (ta, qb)));
                    targets.extend(b_targets.iter().map(|&tb| (qa, tb)));
                } else {
                    for &ta in a_targets {
                        for &tb in b_targets {
                            targets.push((ta, tb));
                        }
                    }
                }
            }
            let mut eps: Vec<Pair> = Vec::new();
            eps.extend(
                self.states[qa]
                    .epsilon_transitions
                    .iter()
                    .map(|&ta| (ta, qb)),
            );
            eps.extend(
                other.states[qb]
                    .epsilon_transitions
                    .iter()
                    .map(|&tb| (qa, tb)),
            );
            for pair in row.iter().flatten().chain(eps.iter()) {
                if !index_of.contains_key(pair) {
                    index_of.insert(*pair, order.len());
                    order.push(*pair);
                    queue.push_back(*pair);
                }
            }
            rows.push((row, eps));
        }

        let states = order
            .iter()
            .zip(rows)
            .enumerate()
            .map(|(idx, (&(qa, qb), (row, eps)))| NfaState {
                name: Rc::from(idx.to_string()),
                initial: idx == 0,
                accepting: self.states[qa].accepting && other.states[qb].accepting,
                epsilon_transitions: eps.iter().map(|pair| index_of[pair]).collect(),
                transitions: row
                    .into_iter()
                    .map(|targets| targets.iter().map(|pair| index_of[pair]).collect())
                    .collect(),
            })
            .collect();
        Nfa::from_parts(alphabet, states, 0)
    }

    /// The left quotient of this NFA by `language`: the words `w` such
    /// that some `u` accepted by `language` makes `uw` accepted by this
    /// machine. Errs with [MachineError::SymbolMismatch] if the
    /// alphabets differ.
    pub fn left_quotient(&self, language: &Nfa) -> Result<Nfa, MachineError> {
        let forward = self.pair_reachability(language, true)?;
        let entry_points: HashSet<usize> = forward
            .iter()
            .filter(|&&(_, ql)| language.states[ql].accepting)
            .map(|&(qa, _)| qa)
            .collect();
        let mut states = self.states.clone();
        for state in states.iter_mut() {
            state.initial = false;
        }
        let new_initial = states.len();
        states.push(NfaState {
            name: self.fresh_name("s_new"),
            initial: true,
            accepting: false,
            epsilon_transitions: set_to_vec(&entry_points),
            transitions: vec![Vec::new(); self.alphabet.len()],
        });
        Ok(Nfa::from_parts(self.alphabet.clone(), states, new_initial))
    }

    /// The right quotient of this NFA by `language`: the words `w` such
    /// that some `u` accepted by `language` makes `wu` accepted by this
    /// machine. Errs with [MachineError::SymbolMismatch] if the
    /// alphabets differ.
    pub fn right_quotient(&self, language: &Nfa) -> Result<Nfa, MachineError> {
        let backward = self.pair_reachability(language, false)?;
        let new_finals: HashSet<usize> = backward
            .iter()
            .filter(|&&(_, ql)| ql == language.initial_state)
            .map(|&(qa, _)| qa)
            .collect();
        let mut states = self.states.clone();
        for (idx, state) in states.iter_mut().enumerate() {
            state.accepting = new_finals.contains(&idx);
        }
        Ok(Nfa::from_parts(
            self.alphabet.clone(),
            states,
            self.initial_state,
        ))
    }

    /// Explores the synchronous pair graph of this machine and
    /// `language` (symbols advance both coordinates, epsilon transitions
    /// advance one). Forward mode returns the pairs reachable from the
    /// two initial states; backward mode the pairs from which a doubly
    /// accepting pair is reachable.
    fn pair_reachability(
        &self,
        language: &Nfa,
        forward: bool,
    ) -> Result<HashSet<(usize, usize)>, MachineError> {
        if !alphabet_equal(&self.alphabet, &language.alphabet) {
            return Err(MachineError::SymbolMismatch(
                "the alphabets of the two NFAs differ".to_string(),
            ));
        }
        let translation = alphabet_translation(&self.alphabet, &language.alphabet);
        let successors = |qa: usize, ql: usize| -> Vec<(usize, usize)> {
            let mut next = Vec::new();
            for sym in 0..self.alphabet.len() {
                for &ta in &self.states[qa].transitions[sym] {
                    for &tl in &language.states[ql].transitions[translation[sym]] {
                        next.push((ta, tl));
                    }
                }
            }
            next.extend(
                self.states[qa]
                    .epsilon_transitions
                    .iter()
                    .map(|&ta| (ta, ql)),
            );
            next.extend(
                language.states[ql]
                    .epsilon_transitions
                    .iter()
                    .map(|&tl| (qa, tl)),
            );
            next
        };

        if forward {
            let start = (self.initial_state, language.initial_state);
            let mut seen = HashSet::from([start]);
            let mut queue = VecDeque::from([start]);
            while let Some((qa, ql)) = queue.pop_front() {
                for pair in successors(qa, ql) {
                    if seen.insert(pair) {
                        queue.push_back(pair);
                    }
                }
            }
            Ok(seen)
        } else {
            // Reverse reachability from the doubly accepting pairs, over
            // the full (finite) pair space.
            let mut incoming: HashMap<(usize, usize), Vec<(usize, usize)>> = HashMap::new();
            let mut queue = VecDeque::new();
            let mut seen = HashSet::new();
            for qa in 0..self.states.len() {
                for ql in 0..language.states.len() {
                    for pair in successors(qa, ql) {
                        incoming.entry(pair).or_default().push((qa, ql));
                    }
                    if self.states[qa].accepting && language.states[ql].accepting {
                        seen.insert((qa, ql));
                        queue.push_back((qa, ql));
                    }
                }
            }
            while let Some(pair) = queue.pop_front() {
                for &pred in incoming.get(&pair).map(Vec::as_slice).unwrap_or(&[]) {
                    if seen.insert(pred) {
                        queue.push_back(pred);
                    }
                }
            }
            Ok(seen)
        }
    }

    /// The Levenshtein NFA accepting all strings within edit distance
    /// `max_distance` of `reference`, with the admissible edit kinds
    /// chosen by the three flags. States are (position, edits used)
    /// pairs; deletions are epsilon moves to the next position.
    ///
    /// Panics if all three edit kinds are disabled.
    pub fn edit_distance(
        input_symbols: &[&str],
        reference: &str,
        max_distance: usize,
        insertion: bool,
        deletion: bool,
        substitution: bool,
    ) -> Result<Nfa, MachineError> {
        assert!(
            insertion || deletion || substitution,
            "at least one edit kind must be enabled"
        );
        let mut seen = HashSet::new();
        for symbol in input_symbols {
            if !seen.insert(*symbol) {
                return Err(MachineError::InvalidSymbol(format!(
                    "'{symbol}' appears twice in the alphabet"
                )));
            }
        }
        let alphabet: Rc<[Rc<str>]> = input_symbols.iter().map(|s| Rc::from(*s)).collect();
        let word = reference
            .graphemes(true)
            .map(|grapheme| {
                alphabet
                    .iter()
                    .position(|s| s.as_ref() == grapheme)
                    .ok_or_else(|| {
                        MachineError::InvalidSymbol(format!(
                            "'{grapheme}' is not in the alphabet"
                        ))
                    })
            })
            .collect::<Result<Vec<_>, _>>()?;

        let width = max_distance + 1;
        let alphabet_len = alphabet.len();
        let positions = word.len();
        let index = |position: usize, edits: usize| position * width + edits;
        let mut states: Vec<NfaState> = (0..=positions)
            .flat_map(|position| {
                (0..width).map(move |edits| NfaState {
                    name: Rc::from(format!("({position},{edits})")),
                    initial: position == 0 && edits == 0,
                    accepting: position == positions,
                    epsilon_transitions: vec![],
                    transitions: vec![Vec::new(); alphabet_len],
                })
            })
            .collect();

        for (position, &expected) in word.iter().enumerate() {
            for edits in 0..width {
                let here = index(position, edits);
                // Matching symbol
                states[here].transitions[expected].push(index(position + 1, edits));
                if edits < max_distance {
                    if insertion {
                        for sym in 0..alphabet.len() {
                            states[here].transitions[sym].push(index(position, edits + 1));
                        }
                    }
                    if deletion {
                        states[here]
                            .epsilon_transitions
                            .push(index(position + 1, edits + 1));
                    }
                    if substitution {
                        for sym in 0..alphabet.len() {
                            states[here].transitions[sym].push(index(position + 1, edits + 1));
                        }
                    }
                }
            }
        }
        for edits in 0..max_distance {
            if insertion {
                let here = index(word.len(), edits);
                for sym in 0..alphabet.len() {
                    states[here].transitions[sym].push(index(word.len(), edits + 1));
                }
            }
        }
        Ok(Nfa::from_parts(alphabet, states, 0))
    }

    /// An equivalent NFA with no epsilon transitions: each state gains
    /// the closure-expanded transitions of its epsilon reach, becomes
    /// accepting if its closure touches a final state, and unreachable
    /// states are pruned.
    pub fn eliminate_lambda(&self) -> Nfa {
        let closures = self.lambda_closures();
        let mut new_states = self.states.clone();
        for (idx, state) in new_states.iter_mut().enumerate() {
            let enclosure: Vec<usize> = closures[idx]
                .iter()
                .copied()
                .filter(|&q| q != idx)
                .collect();
            for sym in 0..self.alphabet.len() {
                let mut extra: HashSet<usize> = HashSet::new();
                for &q in &enclosure {
                    for &t in &self.states[q].transitions[sym] {
                        extra.extend(closures[t].iter().copied());
                    }
                }
                for t in extra {
                    if !state.transitions[sym].contains(&t) {
                        state.transitions[sym].push(t);
                    }
                }
                state.transitions[sym].sort_unstable();
            }
            if enclosure.iter().any(|&q| self.states[q].accepting) {
                state.accepting = true;
            }
            state.epsilon_transitions.clear();
        }

        // Prune states no longer reachable without the epsilon moves.
        let mut reachable = HashSet::from([self.initial_state]);
        let mut queue = VecDeque::from([self.initial_state]);
        while let Some(q) = queue.pop_front() {
            for &t in new_states[q].transitions.iter().flatten() {
                if reachable.insert(t) {
                    queue.push_back(t);
                }
            }
        }
        let mut remap = vec![None; new_states.len()];
        let mut next = 0;
        for idx in 0..new_states.len() {
            if reachable.contains(&idx) {
                remap[idx] = Some(next);
                next += 1;
            }
        }
        let states = new_states
            .into_iter()
            .enumerate()
            .filter(|(idx, _)| reachable.contains(idx))
            .map(|(_, state)| NfaState {
                transitions: state
                    .transitions
                    .iter()
                    .map(|targets| {
                        targets
                            .iter()
                            .filter_map(|&t| remap[t])
                            .collect()
                    })
                    .collect(),
                ..state
            })
            .collect();
        let initial = remap[self.initial_state].expect("the initial state is reachable");
        Nfa::from_parts(self.alphabet.clone(), states, initial)
    }

    /// The indices of all states reachable from the initial state.
    pub fn reachable_state_idx(&self) -> HashSet<usize> {
        let closures = self.lambda_closures();
        let mut reachable = HashSet::from([self.initial_state]);
        let mut queue = VecDeque::from([self.initial_state]);
        while let Some(q) = queue.pop_front() {
            let next = self.states[q]
                .transitions
                .iter()
                .flatten()
                .copied()
                .chain(closures[q].iter().copied());
            for t in next {
                if reachable.insert(t) {
                    queue.push_back(t);
                }
            }
        }
        reachable
    }

    /// Converts this NFA to a complete DFA using the reduced subset
    /// construction, numbering the new states from 0 in discovery order.
    pub fn to_dfa(&self) -> Dfa {
        self.subset_construction(false)
    }

    pub(crate) fn subset_construction(&self, retain_names: bool) -> Dfa {
        let closures = self.lambda_closures();
        let start = set_to_vec(&closures[self.initial_state]);
        let mut index_of: HashMap<Vec<usize>, usize> = HashMap::from([(start.clone(), 0)]);
        let mut order: Vec<Vec<usize>> = vec![start.clone()];
        let mut rows: Vec<Vec<usize>> = Vec::new();
        let mut queue = VecDeque::from([start]);

        while let Some(config) = queue.pop_front() {
            let mut row = Vec::with_capacity(self.alphabet.len());
            for sym in 0..self.alphabet.len() {
                let mut next = HashSet::new();
                for &q in &config {
                    for &t in &self.states[q].transitions[sym] {
                        next.extend(closures[t].iter().copied());
                    }
                }
                let next = set_to_vec(&next);
                let idx = match index_of.get(&next) {
                    Some(&idx) => idx,
                    None => {
                        let idx = order.len();
                        index_of.insert(next.clone(), idx);
                        order.push(next.clone());
                        queue.push_back(next);
                        idx
                    }
                };
                row.push(idx);
            }
            rows.push(row);
        }

        let states = order
            .iter()
            .zip(rows)
            .enumerate()
            .map(|(idx, (config, row))| {
                let name: Rc<str> = if retain_names {
                    let members = config
                        .iter()
                        .map(|&q| self.states[q].name.clone())
                        .collect::<Vec<_>>();
                    frozen_name(&members)
                } else {
                    Rc::from(idx.to_string())
                };
                DfaState {
                    name,
                    initial: idx == 0,
                    accepting: config.iter().any(|&q| self.states[q].accepting),
                    transitions: row.into_iter().map(Some).collect(),
                }
            })
            .collect();
        Dfa::from_parts(self.alphabet.clone(), states, 0)
    }

    /// Checks if this NFA accepts the same language as another NFA,
    /// using the closure-aware Hopcroft-Karp algorithm on the two
    /// machines' configuration sets. Machines with different alphabets
    /// are never equivalent; no determinization is performed.
    pub fn equivalent_to(&self, other: &Nfa) -> bool {
        if !alphabet_equal(&self.alphabet, &other.alphabet) {
            return false;
        }
        let translation = alphabet_translation(&self.alphabet, &other.alphabet);
        let self_closures = self.lambda_closures();
        let other_closures = other.lambda_closures();

        // A node is a closed configuration plus the operand it belongs
        // to; closed sets are kept sorted so they hash consistently.
        type Node = (Vec<usize>, u8);
        let accepting = |node: &Node| -> bool {
            let machine = if node.1 == 0 { self } else { other };
            node.0.iter().any(|&q| machine.states[q].accepting)
        };
        let step = |node: &Node, sym: usize| -> Node {
            let (machine, closures, sym) = if node.1 == 0 {
                (self, &self_closures, sym)
            } else {
                (other, &other_closures, translation[sym])
            };
            let mut next = HashSet::new();
            for &q in &node.0 {
                for &t in &machine.states[q].transitions[sym] {
                    next.extend(closures[t].iter().copied());
                }
            }
            (set_to_vec(&next), node.1)
        };

        let a0: Node = (set_to_vec(&self_closures[self.initial_state]), 0);
        let b0: Node = (set_to_vec(&other_closures[other.initial_state]), 1);
        let mut sets: UnionFind<Node> = UnionFind::new();
        sets.union(&a0, &b0);
        let mut stack = vec![(a0, b0)];

        while let Some((qa, qb)) = stack.pop() {
            if accepting(&qa) != accepting(&qb) {
                return false;
            }
            for sym in 0..self.alphabet.len() {
                let r1 = sets.find(&step(&qa, sym));
                let r2 = sets.find(&step(&qb, sym));
                if r1 != r2 {
                    sets.union(&r1, &r2);
                    stack.push((r1, r2));
                }
            }
        }
        true
    }

    /// Generates a table of this NFA suitable for printing, which parses
    /// back to this very automaton.
    pub fn to_table(&self) -> String {
        self.gen_table("ε", "→")
    }

    /// Like [Nfa::to_table] but ascii-only (`eps` and `->`).
    pub fn ascii_table(&self) -> String {
        self.gen_table("eps", "->")
    }

    fn gen_table(&self, eps: &str, arrow: &str) -> String {
        let mut table = Table::default();

        let mut head = vec!["".to_string(), "".to_string(), "".to_string(), eps.to_string()];
        head.extend(self.alphabet.iter().map(|s| s.to_string()));
        table.push_row(head);

        for state in &self.states {
            let mut row = vec![
                if state.initial { arrow } else { "" }.to_string(),
                if state.accepting { "*" } else { "" }.to_string(),
                state.name.to_string(),
            ];
            let render_set = |targets: &[usize]| {
                let names = targets
                    .iter()
                    .map(|&t| self.states[t].name.to_string())
                    .collect::<Vec<_>>();
                format!("{{{}}}", names.join(" "))
            };
            row.push(render_set(&state.epsilon_transitions));
            row.extend(state.transitions.iter().map(|targets| render_set(targets)));
            table.push_row(row);
        }
        table.render(" ")
    }

    /// A state name not yet used by this machine, derived from `wanted`.
    fn fresh_name(&self, wanted: &str) -> Rc<str> {
        if self.states.iter().all(|s| s.name.as_ref() != wanted) {
            Rc::from(wanted)
        } else {
            (0..)
                .map(|i| format!("{wanted}{i}"))
                .find(|n| self.states.iter().all(|s| s.name.as_ref() != n.as_str()))
                .map(|n| Rc::from(n.as_str()))
                .expect("some suffixed name is free")
        }
    }
}

/// Merges two alphabets, returning the merged alphabet and the map from
/// the second alphabet's indices into it. The first alphabet keeps its
/// indices.
fn merge_alphabets(a: &[Rc<str>], b: &[Rc<str>]) -> (Rc<[Rc<str>]>, Vec<usize>) {
    let mut merged: Vec<Rc<str>> = a.to_vec();
    let b_map = b
        .iter()
        .map(|sym| match merged.iter().position(|s| s == sym) {
            Some(idx) => idx,
            None => {
                merged.push(sym.clone());
                merged.len() - 1
            }
        })
        .collect();
    (merged.into(), b_map)
}

#[cfg(test)]
mod tests {
    use super::Nfa;
    use crate::errors::MachineError;

    const ABC: &[&str] = &["a", "b", "c"];

    #[test]
    fn intersection_keeps_common_words() {
        let a = Nfa::from_regex("a|ab").unwrap();
        let b = Nfa::from_regex_with_symbols("ab|b", &["a", "b"]).unwrap();
        let both = a.intersection(&b);
        assert!(both.accepts_graphemes("ab"));
        assert!(!both.accepts_graphemes("a"));
        assert!(!both.accepts_graphemes("b"));
    }

    #[test]
    fn shuffle_product_interleaves() {
        let ab = Nfa::from_string_literal("ab", None).unwrap();
        let cd = Nfa::from_string_literal("cd", None).unwrap();
        let shuffled = ab.shuffle_product(&cd);
        for word in ["abcd", "acbd", "acdb", "cabd", "cadb", "cdab"] {
            assert!(shuffled.accepts_graphemes(word), "{word} interleaves");
        }
        for word in ["adbc", "abdc", "ab", "abcdc", "bacd"] {
            assert!(!shuffled.accepts_graphemes(word), "{word} does not");
        }
    }

    #[test]
    fn quotients_strip_prefixes_and_suffixes() {
        let word = Nfa::from_string_literal("abc", Some(ABC)).unwrap();
        let prefix = Nfa::from_string_literal("a", Some(ABC)).unwrap();
        let suffix = Nfa::from_string_literal("c", Some(ABC)).unwrap();

        let left = word.left_quotient(&prefix).unwrap();
        assert!(left.accepts_graphemes("bc"));
        assert!(!left.accepts_graphemes("abc"));
        assert!(!left.accepts_graphemes("c"));

        let right = word.right_quotient(&suffix).unwrap();
        assert!(right.accepts_graphemes("ab"));
        assert!(!right.accepts_graphemes("abc"));
        assert!(!right.accepts_graphemes("a"));
    }

    #[test]
    fn quotients_require_matching_alphabets() {
        let word = Nfa::from_string_literal("ab", None).unwrap();
        let other = Nfa::from_string_literal("c", None).unwrap();
        assert!(matches!(
            word.left_quotient(&other),
            Err(MachineError::SymbolMismatch(_))
        ));
    }

    #[test]
    fn edit_distance_accepts_near_misses() {
        let lev = Nfa::edit_distance(ABC, "abc", 1, true, true, true).unwrap();
        for word in ["abc", "ab", "abcc", "aabc", "bbc", "abb"] {
            assert!(lev.accepts_graphemes(word), "{word} is within distance 1");
        }
        for word in ["a", "c", "ccc", "abccc", ""] {
            assert!(!lev.accepts_graphemes(word), "{word} is further away");
        }
    }

    #[test]
    fn hamming_distance_disables_insert_and_delete() {
        let hamming = Nfa::edit_distance(ABC, "abc", 1, false, false, true).unwrap();
        assert!(hamming.accepts_graphemes("abc"));
        assert!(hamming.accepts_graphemes("bbc"));
        assert!(!hamming.accepts_graphemes("ab"));
        assert!(!hamming.accepts_graphemes("abcc"));
    }

    #[test]
    fn eliminate_lambda_removes_epsilon_moves() {
        let nfa = Nfa::from_regex("(ab)*").unwrap();
        assert!(nfa.has_epsilon_moves());
        let eliminated = nfa.eliminate_lambda();
        assert!(!eliminated.has_epsilon_moves());
        for word in ["", "ab", "abab"] {
            assert!(eliminated.accepts_graphemes(word));
        }
        assert!(!eliminated.accepts_graphemes("aba"));
        assert!(eliminated.equivalent_to(&nfa));
    }

    #[test]
    fn equivalence_is_closure_aware() {
        let star = Nfa::from_regex("(a|b)*").unwrap();
        let either = Nfa::from_regex("(a*b*)*").unwrap();
        assert!(star.equivalent_to(&either));
        let other = Nfa::from_regex("(a|b)*a").unwrap();
        assert!(!star.equivalent_to(&other));
    }

    #[test]
    fn reverse_reverses() {
        let nfa = Nfa::from_regex("ab*").unwrap();
        let reversed = nfa.reverse();
        assert!(reversed.accepts_graphemes("ba"));
        assert!(reversed.accepts_graphemes("a"));
        assert!(!reversed.accepts_graphemes("ab"));
    }
}

/// Renumbers a state vector into a combined machine: state indices shift
/// by `state_offset`, symbol indices map through `sym_map`, and names
/// become the state's new index.
fn remapped_states(
    states: &[NfaState],
    state_offset: usize,
    sym_map: &[usize],
    alphabet_len: usize,
    name_offset: usize,
) -> Vec<NfaState> {
    states
        .iter()
        .enumerate()
        .map(|(idx, state)| {
            let mut transitions = vec![Vec::new(); alphabet_len];
            for (sym, targets) in state.transitions.iter().enumerate() {
                transitions[sym_map[sym]] =
                    targets.iter().map(|&t| t + state_offset).collect();
            }
            NfaState {
                name: Rc::from((name_offset + idx).to_string()),
                initial: false,
                accepting: state.accepting,
                epsilon_transitions: state
                    .epsilon_transitions
                    .iter()
                    .map(|&t| t + state_offset)
                    .collect(),
                transitions,
            }
        })
        .collect()
}

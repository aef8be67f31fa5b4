//! # Deterministic finite automata
//! The [Dfa] struct represents a deterministic finite automaton, complete
//! or partial. A DFA can be built by parsing a transition table
//! ([crate::parser::dfa]), by subset construction from an
//! [Nfa](crate::nfa::Nfa), or by one of the direct pattern constructors
//! (see [Dfa::from_prefix] and friends).
//!
//! ```
//! use machina::dfa::Dfa;
//!
//! // Binary strings ending in an odd number of 1s
//! let table = "
//!          0  1
//! -> q0 q0 q1
//!  * q1 q0 q2
//!    q2 q2 q1
//! ";
//! let dfa: Dfa = machina::parser::dfa(table).unwrap().try_into().unwrap();
//! assert!(dfa.accepts_graphemes("0111"));
//! assert!(dfa.accepts_graphemes("1"));
//! assert!(!dfa.accepts_graphemes("110"));
//! assert!(!dfa.accepts_graphemes(""));
//! ```
//!
//! All derived machines (the minimized DFA, the complement, the product
//! constructions) are fresh values sharing no mutable state with their
//! sources; a [Dfa] itself never changes after construction.
//!
//! ## Operations
//! - Execution: [Dfa::accepts], [Dfa::read_input], stepwise via
//!   [Dfa::evaluator], the transition trace via [Dfa::input_path].
//! - The algebra: [Dfa::minimized], [Dfa::complement], [Dfa::union],
//!   [Dfa::intersection], [Dfa::difference],
//!   [Dfa::symmetric_difference], [Dfa::is_subset_of],
//!   [Dfa::is_disjoint_from], [Dfa::equivalent_to].
//! - Language analysis: [Dfa::is_empty], [Dfa::is_finite],
//!   [Dfa::cardinality], [Dfa::minimum_word_length],
//!   [Dfa::maximum_word_length].
//! - Enumeration: [Dfa::words_of_length], [Dfa::count_words_of_length],
//!   [Dfa::words], [Dfa::random_word], [Dfa::successor],
//!   [Dfa::predecessor].
//! - Partiality: [Dfa::is_partial], [Dfa::to_complete],
//!   [Dfa::to_partial].

use crate::errors::MachineError;
use crate::nfa::{Nfa, NfaState};
use crate::partition::PartitionRefinement;
use crate::table::Table;
use crate::util::{alphabet_equal, alphabet_translation, frozen_name, UnionFind};
use enumerate::EnumerationCache;
pub use eval::DfaEvaluator;
pub use enumerate::{Successors, Words};
use std::cell::RefCell;
use std::collections::{HashMap, HashSet, VecDeque};
use std::rc::Rc;
use unicode_segmentation::UnicodeSegmentation;

mod build;
mod enumerate;
pub mod eval;
pub mod parse;

/// A deterministic finite automaton: an alphabet, a set of states with at
/// most one transition per (state, symbol) pair, one initial state and a
/// set of accepting states. Missing transitions make the machine
/// *partial*; a partial machine rejects any input that falls off its
/// transition table.
#[derive(Debug)]
pub struct Dfa {
    pub(crate) alphabet: Rc<[Rc<str>]>,
    pub(crate) states: Vec<DfaState>,
    pub(crate) initial_state: usize,
    pub(crate) cache: RefCell<EnumerationCache>,
}

/// A state in a DFA: its name, whether it is the initial state, whether
/// it is accepting, and one optional target state per alphabet symbol.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DfaState {
    pub(crate) name: Rc<str>,
    pub(crate) initial: bool,
    pub(crate) accepting: bool,
    pub(crate) transitions: Vec<Option<usize>>,
}

impl DfaState {
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

    /// The transition targets for each element of the alphabet, in the
    /// alphabet's order. `None` marks a missing (partial) transition.
    pub fn transitions(&self) -> &[Option<usize>] {
        self.transitions.as_slice()
    }
}

impl Clone for Dfa {
    fn clone(&self) -> Self {
        // Caches are derived data: a clone starts with a fresh one.
        Dfa::from_parts(self.alphabet.clone(), self.states.clone(), self.initial_state)
    }
}

impl PartialEq for Dfa {
    fn eq(&self, other: &Self) -> bool {
        self.alphabet == other.alphabet
            && self.states == other.states
            && self.initial_state == other.initial_state
    }
}

impl Eq for Dfa {}

impl From<DfaState> for NfaState {
    fn from(value: DfaState) -> Self {
        let DfaState {
            name,
            initial,
            accepting,
            transitions,
        } = value;
        NfaState {
            name,
            initial,
            accepting,
            epsilon_transitions: vec![],
            transitions: transitions
                .into_iter()
                .map(|t| t.map_or_else(Vec::new, |t| vec![t]))
                .collect(),
        }
    }
}

impl From<Dfa> for Nfa {
    fn from(value: Dfa) -> Self {
        value.to_nfa()
    }
}

impl Dfa {
    pub(crate) fn from_parts(
        alphabet: Rc<[Rc<str>]>,
        states: Vec<DfaState>,
        initial_state: usize,
    ) -> Self {
        Dfa {
            alphabet,
            states,
            initial_state,
            cache: RefCell::new(EnumerationCache::default()),
        }
    }

    /// Gets the alphabet of this DFA. Its order is the canonical symbol
    /// order used by all enumeration operations.
    pub fn alphabet(&self) -> &[Rc<str>] {
        &self.alphabet
    }

    /// Gets the states of this DFA.
    pub fn states(&self) -> &[DfaState] {
        self.states.as_slice()
    }

    /// Gets the initial state of this DFA.
    pub fn initial_state(&self) -> &DfaState {
        &self.states[self.initial_state]
    }

    /// Gets the index of the initial state of this DFA.
    pub fn initial_state_index(&self) -> usize {
        self.initial_state
    }

    /// Checks if any (state, symbol) pair is missing its transition.
    pub fn is_partial(&self) -> bool {
        self.states
            .iter()
            .any(|s| s.transitions.iter().any(Option::is_none))
    }

    /// Checks if the alphabet of this automaton consists of single
    /// grapheme clusters only, which makes [Dfa::accepts_graphemes]
    /// unambiguous.
    pub fn graphemes_only(&self) -> bool {
        self.alphabet
            .iter()
            .all(|str| str.graphemes(true).count() == 1)
    }

    /// Drops the cached enumeration tables. Purely a memory-usage knob:
    /// the caches are rebuilt on demand and are never observable through
    /// the public API.
    pub fn clear_cache(&self) {
        *self.cache.borrow_mut() = EnumerationCache::default();
    }

    /// Gets an evaluator for stepwise execution over this automaton.
    pub fn evaluator(&self) -> DfaEvaluator<'_> {
        self.into()
    }

    /// Checks if this automaton accepts the given string of elements.
    pub fn accepts(&self, input: &[&str]) -> bool {
        let mut eval = self.evaluator();
        eval.step_multiple(input);
        eval.is_accepting()
    }

    /// Checks if this automaton accepts the given string, considering
    /// every extended grapheme cluster an element of the alphabet. See
    /// [Dfa::graphemes_only].
    pub fn accepts_graphemes(&self, input: &str) -> bool {
        let graphemes = input.graphemes(true).collect::<Vec<_>>();
        self.accepts(&graphemes)
    }

    /// Runs the automaton over the input and returns the terminal state,
    /// or a [MachineError::Rejection] if the terminal state is not
    /// accepting (or the machine fell off its transition table).
    pub fn read_input(&self, input: &[&str]) -> Result<&DfaState, MachineError> {
        let mut eval = self.evaluator();
        eval.step_multiple(input);
        match eval.current_state() {
            Some(state) if state.is_accepting() => Ok(state),
            Some(state) => Err(MachineError::Rejection(format!(
                "the DFA stopped on the non-accepting state '{}'",
                state.name()
            ))),
            None => Err(MachineError::Rejection(
                "the DFA fell off its transition table".to_string(),
            )),
        }
    }

    /// The exact run of the machine on the input: one (from, to, symbol)
    /// triple per consumed element, ending early if the machine falls off
    /// its table, plus the acceptance verdict. Deterministic per
    /// (machine, input).
    pub fn input_path(&self, input: &[&str]) -> (Vec<(usize, usize, Rc<str>)>, bool) {
        let mut eval = self.evaluator();
        let mut path = Vec::with_capacity(input.len());
        for elem in input {
            let from = match eval.current_state_idx() {
                Some(idx) => idx,
                None => break,
            };
            eval.step(elem);
            match eval.current_state_idx() {
                Some(to) => {
                    let symbol = self
                        .alphabet
                        .iter()
                        .find(|s| s.as_ref() == *elem)
                        .expect("a successful step consumed an alphabet symbol")
                        .clone();
                    path.push((from, to, symbol));
                }
                None => break,
            }
        }
        (path, eval.is_accepting())
    }

    /// Iterates over every transition of the machine exactly once, as
    /// (from, to, symbol) triples.
    pub fn iter_transitions(&self) -> impl Iterator<Item = (usize, usize, Rc<str>)> + '_ {
        self.states.iter().enumerate().flat_map(move |(from, state)| {
            state
                .transitions
                .iter()
                .enumerate()
                .filter_map(move |(sym, target)| {
                    target.map(|to| (from, to, self.alphabet[sym].clone()))
                })
        })
    }

    /// Converts this DFA to an [Nfa] accepting the same language.
    pub fn to_nfa(&self) -> Nfa {
        let states = self.states.iter().cloned().map(NfaState::from).collect();
        Nfa::from_parts(self.alphabet.clone(), states, self.initial_state)
    }

    /// Builds the DFA equivalent to the given NFA with the subset
    /// construction, exploring reachable state sets only. With
    /// `retain_names` each new state is named after its frozen set of NFA
    /// states (`{a b}`); otherwise states are numbered from 0 in
    /// discovery order, 0 being the initial state.
    pub fn from_nfa(nfa: &Nfa, retain_names: bool) -> Dfa {
        nfa.subset_construction(retain_names)
    }

    /// The indices of all states reachable from the initial state.
    pub fn reachable_state_idx(&self) -> HashSet<usize> {
        let mut reachable = HashSet::from([self.initial_state]);
        let mut queue = VecDeque::from([self.initial_state]);
        while let Some(q) = queue.pop_front() {
            for &t in self.states[q].transitions.iter().flatten() {
                if reachable.insert(t) {
                    queue.push_back(t);
                }
            }
        }
        reachable
    }

    /// The states that cannot be reached by any input.
    pub fn unreachable_states(&self) -> Vec<&DfaState> {
        let reachable = self.reachable_state_idx();
        (0..self.states.len())
            .filter(|idx| !reachable.contains(idx))
            .map(|idx| &self.states[idx])
            .collect()
    }

    /// The indices of all states from which some accepting state is
    /// reachable.
    pub fn coaccessible_state_idx(&self) -> HashSet<usize> {
        let mut incoming: Vec<Vec<usize>> = vec![Vec::new(); self.states.len()];
        for (from, state) in self.states.iter().enumerate() {
            for &t in state.transitions.iter().flatten() {
                incoming[t].push(from);
            }
        }
        let mut coaccessible = HashSet::new();
        let mut queue = VecDeque::new();
        for (idx, state) in self.states.iter().enumerate() {
            if state.accepting && coaccessible.insert(idx) {
                queue.push_back(idx);
            }
        }
        while let Some(q) = queue.pop_front() {
            for &p in &incoming[q] {
                if coaccessible.insert(p) {
                    queue.push_back(p);
                }
            }
        }
        coaccessible
    }

    /// Checks if the language of this DFA is empty.
    pub fn is_empty(&self) -> bool {
        !self
            .reachable_state_idx()
            .iter()
            .any(|&idx| self.states[idx].accepting)
    }

    /// Checks if the language of this DFA is finite: the subgraph of
    /// states that are both reachable and coaccessible must be acyclic.
    pub fn is_finite(&self) -> bool {
        let trim = self.trim_state_idx();
        // Iterative three-color DFS looking for a back edge.
        #[derive(Clone, Copy, PartialEq)]
        enum Color {
            White,
            Gray,
            Black,
        }
        let mut color = vec![Color::White; self.states.len()];
        for &start in &trim {
            if color[start] != Color::White {
                continue;
            }
            let mut stack = vec![(start, 0usize)];
            color[start] = Color::Gray;
            while let Some(&mut (q, sym)) = stack.last_mut() {
                if sym >= self.alphabet.len() {
                    color[q] = Color::Black;
                    stack.pop();
                    continue;
                }
                stack.last_mut().expect("loop guard checked the stack").1 += 1;
                if let Some(t) = self.states[q].transitions[sym] {
                    if !trim.contains(&t) {
                        continue;
                    }
                    match color[t] {
                        Color::Gray => return false,
                        Color::White => {
                            color[t] = Color::Gray;
                            stack.push((t, 0));
                        }
                        Color::Black => {}
                    }
                }
            }
        }
        true
    }

    /// The states that are both reachable from the initial state and can
    /// reach an accepting state.
    pub(crate) fn trim_state_idx(&self) -> HashSet<usize> {
        let reachable = self.reachable_state_idx();
        let coaccessible = self.coaccessible_state_idx();
        reachable.intersection(&coaccessible).copied().collect()
    }

    /// The complement of this DFA. A partial machine is completed with a
    /// trap state first, so the complement accepts exactly the strings
    /// the original rejects.
    pub fn complement(&self) -> Dfa {
        let mut dfa = if self.is_partial() {
            self.to_complete("trap")
        } else {
            self.clone()
        };
        dfa.states.iter_mut().for_each(|s| s.accepting = !s.accepting);
        dfa
    }

    /// Completes a partial DFA by adding a trap state that absorbs every
    /// missing transition (and itself). A complete DFA is returned
    /// unchanged. The trap state gets `trap_name`, uniquified if a state
    /// of that name already exists.
    pub fn to_complete(&self, trap_name: &str) -> Dfa {
        if !self.is_partial() {
            return self.clone();
        }
        let mut states = self.states.clone();
        let trap = states.len();
        let name = self.fresh_name(trap_name);
        states
            .iter_mut()
            .for_each(|s| s.transitions.iter_mut().for_each(|t| *t = t.or(Some(trap))));
        states.push(DfaState {
            name,
            initial: false,
            accepting: false,
            transitions: vec![Some(trap); self.alphabet.len()],
        });
        Dfa::from_parts(self.alphabet.clone(), states, self.initial_state)
    }

    /// Trims this DFA to a partial machine: states that are unreachable,
    /// or from which no accepting state can be reached, are dropped
    /// (trap states are the canonical candidates) and the transitions
    /// into them become missing. The initial state always stays.
    pub fn to_partial(&self) -> Dfa {
        let reachable = self.reachable_state_idx();
        let coaccessible = self.coaccessible_state_idx();
        let keep = (0..self.states.len())
            .map(|idx| {
                reachable.contains(&idx)
                    && (coaccessible.contains(&idx) || idx == self.initial_state)
            })
            .collect::<Vec<bool>>();
        let mut remap = vec![None; self.states.len()];
        let mut next = 0;
        for (idx, &kept) in keep.iter().enumerate() {
            if kept {
                remap[idx] = Some(next);
                next += 1;
            }
        }
        let states = self
            .states
            .iter()
            .enumerate()
            .filter(|(idx, _)| keep[*idx])
            .map(|(_, state)| DfaState {
                name: state.name.clone(),
                initial: state.initial,
                accepting: state.accepting,
                transitions: state
                    .transitions
                    .iter()
                    .map(|t| t.and_then(|t| remap[t]))
                    .collect(),
            })
            .collect();
        let initial = remap[self.initial_state].expect("the initial state is kept");
        Dfa::from_parts(self.alphabet.clone(), states, initial)
    }

    /// Constructs the union of two DFAs: the result accepts exactly the
    /// strings accepted by either machine. Errs with
    /// [MachineError::SymbolMismatch] if the alphabets differ.
    pub fn union(&self, other: &Dfa) -> Result<Dfa, MachineError> {
        self.product_construction(other, |a, b| a || b)
    }

    /// Constructs the intersection of two DFAs: the result accepts
    /// exactly the strings accepted by both machines.
    pub fn intersection(&self, other: &Dfa) -> Result<Dfa, MachineError> {
        self.product_construction(other, |a, b| a && b)
    }

    /// Constructs the difference of two DFAs: the result accepts exactly
    /// the strings accepted by the first but not the second machine.
    pub fn difference(&self, other: &Dfa) -> Result<Dfa, MachineError> {
        self.product_construction(other, |a, b| a && !b)
    }

    /// Constructs the symmetric difference of two DFAs: the result
    /// accepts exactly the strings accepted by one machine but not both.
    pub fn symmetric_difference(&self, other: &Dfa) -> Result<Dfa, MachineError> {
        self.product_construction(other, |a, b| a != b)
    }

    /// The reduced product construction of two DFAs: state pairs are
    /// explored breadth-first from the pair of initial states, and the
    /// `combinator` decides acceptance of each pair from the two
    /// operands' acceptance. Partial operands are treated as completed
    /// (a missing coordinate counts as non-accepting); the result is
    /// always a complete DFA. Errs with [MachineError::SymbolMismatch]
    /// if the alphabets differ.
    pub fn product_construction(
        &self,
        other: &Dfa,
        mut combinator: impl FnMut(bool, bool) -> bool,
    ) -> Result<Dfa, MachineError> {
        if !alphabet_equal(&self.alphabet, &other.alphabet) {
            return Err(MachineError::SymbolMismatch(
                "the alphabets of the two DFAs differ".to_string(),
            ));
        }
        let translation = alphabet_translation(&self.alphabet, &other.alphabet);

        type Pair = (Option<usize>, Option<usize>);
        let start: Pair = (Some(self.initial_state), Some(other.initial_state));
        let mut index_of: HashMap<Pair, usize> = HashMap::from([(start, 0)]);
        let mut order: Vec<Pair> = vec![start];
        let mut rows: Vec<Vec<usize>> = Vec::new();
        let mut queue = VecDeque::from([start]);

        while let Some((p, q)) = queue.pop_front() {
            let mut row = Vec::with_capacity(self.alphabet.len());
            for sym in 0..self.alphabet.len() {
                let pair = (
                    p.and_then(|s| self.states[s].transitions[sym]),
                    q.and_then(|s| other.states[s].transitions[translation[sym]]),
                );
                let next = *index_of.entry(pair).or_insert_with(|| {
                    order.push(pair);
                    queue.push_back(pair);
                    order.len() - 1
                });
                row.push(next);
            }
            rows.push(row);
        }

        let pair_name = |pair: &Pair| -> String {
            let coord = |side: Option<usize>, dfa: &Dfa| match side {
                Some(s) => dfa.states[s].name.to_string(),
                None => "∅".to_string(),
            };
            format!("({},{})", coord(pair.0, self), coord(pair.1, other))
        };
        let mut names: Vec<Rc<str>> = order.iter().map(|p| Rc::from(pair_name(p))).collect();
        if names.iter().collect::<HashSet<_>>().len() < names.len() {
            names = (0..order.len()).map(|i| Rc::from(i.to_string())).collect();
        }

        let states = order
            .iter()
            .zip(rows)
            .zip(names)
            .enumerate()
            .map(|(idx, (((p, q), row), name))| DfaState {
                name,
                initial: idx == 0,
                accepting: combinator(
                    p.map_or(false, |s| self.states[s].accepting),
                    q.map_or(false, |s| other.states[s].accepting),
                ),
                transitions: row.into_iter().map(Some).collect(),
            })
            .collect();

        Ok(Dfa::from_parts(self.alphabet.clone(), states, 0))
    }

    /// Searches the (virtual) product of two DFAs for a reachable state
    /// pair satisfying the predicate, without constructing the product.
    fn reaches_product_state(
        &self,
        other: &Dfa,
        pred: impl Fn(bool, bool) -> bool,
    ) -> Result<bool, MachineError> {
        if !alphabet_equal(&self.alphabet, &other.alphabet) {
            return Err(MachineError::SymbolMismatch(
                "the alphabets of the two DFAs differ".to_string(),
            ));
        }
        let translation = alphabet_translation(&self.alphabet, &other.alphabet);
        type Pair = (Option<usize>, Option<usize>);
        let start: Pair = (Some(self.initial_state), Some(other.initial_state));
        let mut seen = HashSet::from([start]);
        let mut queue = VecDeque::from([start]);
        while let Some((p, q)) = queue.pop_front() {
            if pred(
                p.map_or(false, |s| self.states[s].accepting),
                q.map_or(false, |s| other.states[s].accepting),
            ) {
                return Ok(true);
            }
            for sym in 0..self.alphabet.len() {
                let pair = (
                    p.and_then(|s| self.states[s].transitions[sym]),
                    q.and_then(|s| other.states[s].transitions[translation[sym]]),
                );
                if seen.insert(pair) {
                    queue.push_back(pair);
                }
            }
        }
        Ok(false)
    }

    /// Checks if the language of this DFA is a subset of the language of
    /// another DFA, by searching the product for a counterexample pair.
    pub fn is_subset_of(&self, other: &Dfa) -> Result<bool, MachineError> {
        Ok(!self.reaches_product_state(other, |a, b| a && !b)?)
    }

    /// Checks if the language of this DFA is a superset of the language
    /// of another DFA.
    pub fn is_superset_of(&self, other: &Dfa) -> Result<bool, MachineError> {
        other.is_subset_of(self)
    }

    /// Checks if the languages of the two DFAs share no word.
    pub fn is_disjoint_from(&self, other: &Dfa) -> Result<bool, MachineError> {
        Ok(!self.reaches_product_state(other, |a, b| a && b)?)
    }

    /// Checks if this DFA accepts the same language as another DFA, with
    /// the near-linear Hopcroft-Karp union-find algorithm. Machines with
    /// different alphabets are never equivalent; neither machine needs to
    /// be minimal, and nothing new is constructed.
    pub fn equivalent_to(&self, other: &Dfa) -> bool {
        if !alphabet_equal(&self.alphabet, &other.alphabet) {
            return false;
        }
        let translation = alphabet_translation(&self.alphabet, &other.alphabet);

        // A node is (state, operand index); the missing state stands in
        // for the implicit trap of a partial machine.
        type Node = (Option<usize>, u8);
        let accepting = |node: Node| match node {
            (Some(s), 0) => self.states[s].accepting,
            (Some(s), _) => other.states[s].accepting,
            (None, _) => false,
        };
        let step = |node: Node, sym: usize| -> Node {
            match node {
                (Some(s), 0) => (self.states[s].transitions[sym], 0),
                (Some(s), which) => (other.states[s].transitions[translation[sym]], which),
                (None, which) => (None, which),
            }
        };

        let a0: Node = (Some(self.initial_state), 0);
        let b0: Node = (Some(other.initial_state), 1);
        let mut sets: UnionFind<Node> = UnionFind::new();
        sets.union(&a0, &b0);
        let mut stack = vec![(a0, b0)];

        while let Some((qa, qb)) = stack.pop() {
            if accepting(qa) != accepting(qb) {
                return false;
            }
            for sym in 0..self.alphabet.len() {
                let r1 = sets.find(&step(qa, sym));
                let r2 = sets.find(&step(qb, sym));
                if r1 != r2 {
                    sets.union(&r1, &r2);
                    stack.push((r1, r2));
                }
            }
        }
        true
    }

    /// The minimal DFA accepting the same language: non-reachable states
    /// are removed first, then equivalent states are merged with
    /// Hopcroft's partition-refinement algorithm. With `retain_names`
    /// each merged state is named after its frozen class (`{a b}`);
    /// otherwise states are numbered from 0. Partiality is preserved: a
    /// state class whose representative has no transition on a symbol
    /// has none in the minimized machine either.
    pub fn minimized(&self, retain_names: bool) -> Dfa {
        let n = self.states.len();
        let trap = n;
        // The machine is virtually completed with a trap so Hopcroft
        // never merges a dead-end state with a live one by accident; the
        // trap's class is dropped again when assembling the result.
        let step = |q: usize, sym: usize| -> usize {
            if q == trap {
                trap
            } else {
                self.states[q].transitions[sym].unwrap_or(trap)
            }
        };
        let accepting = |q: usize| q != trap && self.states[q].accepting;

        // Reachable states of the completed machine, in BFS order.
        let mut seen = vec![false; n + 1];
        let mut items: Vec<usize> = Vec::new();
        let mut queue = VecDeque::from([self.initial_state]);
        seen[self.initial_state] = true;
        while let Some(q) = queue.pop_front() {
            items.push(q);
            for sym in 0..self.alphabet.len() {
                let t = step(q, sym);
                if !seen[t] {
                    seen[t] = true;
                    queue.push_back(t);
                }
            }
        }
        let pos_of: HashMap<usize, usize> =
            items.iter().enumerate().map(|(pos, &q)| (q, pos)).collect();

        let mut partition = PartitionRefinement::new(items.len());
        let finals: Vec<usize> = items
            .iter()
            .enumerate()
            .filter(|&(_, &q)| accepting(q))
            .map(|(pos, _)| pos)
            .collect();
        let refinement = partition.refine(finals);
        let seed = refinement
            .first()
            .map(|&(new_id, _)| new_id)
            .unwrap_or_else(|| partition.class_ids().next().expect("one class exists"));

        // Per symbol, per item, the items stepping into it.
        let mut back: Vec<Vec<Vec<usize>>> =
            vec![vec![Vec::new(); items.len()]; self.alphabet.len()];
        for (pos, &q) in items.iter().enumerate() {
            for (sym, row) in back.iter_mut().enumerate() {
                row[pos_of[&step(q, sym)]].push(pos);
            }
        }

        let mut processing: HashSet<usize> = HashSet::from([seed]);
        loop {
            let id = match processing.iter().next() {
                Some(&id) => id,
                None => break,
            };
            processing.remove(&id);
            let active = partition.class(id).to_vec();
            for row in back.iter() {
                let preimage: Vec<usize> = active
                    .iter()
                    .flat_map(|&pos| row[pos].iter().copied())
                    .collect();
                for (new_id, old_id) in partition.refine(preimage) {
                    if processing.contains(&old_id) {
                        processing.insert(new_id);
                    } else if partition.class(new_id).len() <= partition.class(old_id).len() {
                        processing.insert(new_id);
                    } else {
                        processing.insert(old_id);
                    }
                }
            }
        }

        // Deterministic class order: by first-discovered member.
        let mut class_ids: Vec<usize> = partition.class_ids().collect();
        class_ids.sort_by_key(|&id| {
            partition
                .class(id)
                .iter()
                .min()
                .copied()
                .expect("classes are nonempty")
        });
        let trap_class = pos_of.get(&trap).map(|&pos| partition.class_of(pos));
        let initial_class = partition.class_of(pos_of[&self.initial_state]);

        if Some(initial_class) == trap_class {
            // The whole reachable part is dead: the language is empty.
            let name: Rc<str> = if retain_names {
                self.states[self.initial_state].name.clone()
            } else {
                Rc::from("0")
            };
            let state = DfaState {
                name,
                initial: true,
                accepting: false,
                transitions: vec![None; self.alphabet.len()],
            };
            return Dfa::from_parts(self.alphabet.clone(), vec![state], 0);
        }

        let kept: Vec<usize> = class_ids
            .into_iter()
            .filter(|&id| Some(id) != trap_class)
            .collect();
        let class_index: HashMap<usize, usize> =
            kept.iter().enumerate().map(|(i, &id)| (id, i)).collect();

        let states = kept
            .iter()
            .enumerate()
            .map(|(i, &id)| {
                let mut members = partition.class(id).to_vec();
                members.sort();
                let rep = items[members[0]];
                let name: Rc<str> = if retain_names {
                    let member_names = members
                        .iter()
                        .map(|&pos| self.states[items[pos]].name.clone())
                        .collect::<Vec<_>>();
                    frozen_name(&member_names)
                } else {
                    Rc::from(i.to_string())
                };
                let transitions = (0..self.alphabet.len())
                    .map(|sym| {
                        let t_class = partition.class_of(pos_of[&step(rep, sym)]);
                        if Some(t_class) == trap_class {
                            None
                        } else {
                            Some(class_index[&t_class])
                        }
                    })
                    .collect();
                DfaState {
                    name,
                    initial: i == class_index[&initial_class],
                    accepting: accepting(rep),
                    transitions,
                }
            })
            .collect();

        Dfa::from_parts(self.alphabet.clone(), states, class_index[&initial_class])
    }

    /// Generates a table of this DFA suitable for printing, which parses
    /// back to this very automaton. Missing transitions render as `-`.
    pub fn to_table(&self) -> String {
        self.gen_table("→")
    }

    /// Like [Dfa::to_table] but with the ascii arrow `->`.
    pub fn ascii_table(&self) -> String {
        self.gen_table("->")
    }

    fn gen_table(&self, arrow: &str) -> String {
        let mut table = Table::default();

        let mut head = vec!["".to_string(), "".to_string(), "".to_string()];
        head.extend(self.alphabet.iter().map(|s| s.to_string()));
        table.push_row(head);

        for state in &self.states {
            let mut row = vec![
                if state.initial { arrow } else { "" }.to_string(),
                if state.accepting { "*" } else { "" }.to_string(),
                state.name.to_string(),
            ];
            row.extend(state.transitions.iter().map(|t| match t {
                Some(t) => self.states[*t].name.to_string(),
                None => "-".to_string(),
            }));
            table.push_row(row);
        }
        table.render(" ")
    }

    /// A state name not yet used by this machine, derived from `wanted`.
    pub(crate) fn fresh_name(&self, wanted: &str) -> Rc<str> {
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

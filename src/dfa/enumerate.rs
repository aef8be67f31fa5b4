//! Language enumeration for DFAs: word counting, per-length listing,
//! lexicographic iteration, random sampling and the successor /
//! predecessor walks.
//!
//! The counting tables are a dynamic program over word length: level 0
//! marks the accepting states, and level `i` is obtained from level
//! `i - 1` through the integer matrix counting, for every state pair
//! (q, q'), the symbols that move q to q'. The levels are cached inside
//! the automaton behind a `RefCell`, so repeated queries reuse earlier
//! work without the automaton ever appearing mutable.

use crate::dfa::Dfa;
use crate::errors::MachineError;
use nalgebra::{DMatrix, DVector};
use rand::Rng;
use std::collections::{HashMap, HashSet, VecDeque};
use unicode_segmentation::UnicodeSegmentation;

#[derive(Debug, Default)]
pub(crate) struct EnumerationCache {
    /// transition_counts[(q, t)] = number of symbols moving q to t.
    transition_counts: Option<DMatrix<u64>>,
    /// count_levels[i][q] = number of accepted words of length i when
    /// starting from q.
    count_levels: Vec<DVector<u64>>,
    /// word_levels[i][q] = the accepted words of length i from q, in the
    /// alphabet's order.
    word_levels: Vec<Vec<Vec<String>>>,
}

impl Dfa {
    fn populate_count_levels_up_to(&self, k: usize) {
        let mut cache = self.cache.borrow_mut();
        let cache = &mut *cache;
        let n = self.states.len();
        if cache.transition_counts.is_none() {
            let mut matrix = DMatrix::<u64>::zeros(n, n);
            for (q, state) in self.states.iter().enumerate() {
                for &t in state.transitions.iter().flatten() {
                    matrix[(q, t)] += 1;
                }
            }
            cache.transition_counts = Some(matrix);
        }
        if cache.count_levels.is_empty() {
            let base = DVector::<u64>::from_fn(n, |q, _| u64::from(self.states[q].accepting));
            cache.count_levels.push(base);
        }
        while cache.count_levels.len() <= k {
            let matrix = cache
                .transition_counts
                .as_ref()
                .expect("the transition count matrix was just built");
            let next = matrix * cache.count_levels.last().expect("level 0 exists");
            cache.count_levels.push(next);
        }
    }

    /// Counts the words of length `k` accepted by this DFA.
    pub fn count_words_of_length(&self, k: usize) -> u64 {
        self.populate_count_levels_up_to(k);
        self.cache.borrow().count_levels[k][self.initial_state]
    }

    fn populate_word_levels_up_to(&self, k: usize) {
        let mut cache = self.cache.borrow_mut();
        let cache = &mut *cache;
        let n = self.states.len();
        if cache.word_levels.is_empty() {
            let base = (0..n)
                .map(|q| {
                    if self.states[q].accepting {
                        vec![String::new()]
                    } else {
                        vec![]
                    }
                })
                .collect();
            cache.word_levels.push(base);
        }
        while cache.word_levels.len() <= k {
            let prev = cache.word_levels.last().expect("level 0 exists");
            let level = (0..n)
                .map(|q| {
                    let mut words = Vec::new();
                    for (sym, target) in self.states[q].transitions.iter().enumerate() {
                        if let Some(t) = target {
                            for word in &prev[*t] {
                                words.push(format!("{}{}", self.alphabet[sym], word));
                            }
                        }
                    }
                    words
                })
                .collect();
            cache.word_levels.push(level);
        }
    }

    /// All accepted words of exactly length `k`, ordered
    /// lexicographically by the alphabet's order.
    pub fn words_of_length(&self, k: usize) -> Vec<String> {
        self.populate_word_levels_up_to(k);
        self.cache.borrow().word_levels[k][self.initial_state].clone()
    }

    /// Iterates over every accepted word, ordered first by length, then
    /// lexicographically by the alphabet's order. The iterator is
    /// infinite for infinite languages.
    pub fn words(&self) -> Words<'_> {
        Words::new(self)
    }

    /// The number of words in the language. Errs with
    /// [MachineError::InfiniteLanguage] when the language is infinite;
    /// the empty language has cardinality 0.
    pub fn cardinality(&self) -> Result<u64, MachineError> {
        let min = match self.minimum_word_length() {
            Ok(min) => min,
            Err(_) => return Ok(0),
        };
        match self.maximum_word_length()? {
            None => Err(MachineError::InfiniteLanguage(
                "the language of the DFA is infinite".to_string(),
            )),
            Some(max) => Ok((min..=max).map(|k| self.count_words_of_length(k)).sum()),
        }
    }

    /// The length of the shortest accepted word: the BFS distance from
    /// the initial state to the nearest accepting state. Errs with
    /// [MachineError::EmptyLanguage] if there is none.
    pub fn minimum_word_length(&self) -> Result<usize, MachineError> {
        let mut distances = HashMap::from([(self.initial_state, 0usize)]);
        let mut queue = VecDeque::from([self.initial_state]);
        while let Some(q) = queue.pop_front() {
            if self.states[q].accepting {
                return Ok(distances[&q]);
            }
            let d = distances[&q];
            for &t in self.states[q].transitions.iter().flatten() {
                distances.entry(t).or_insert_with(|| {
                    queue.push_back(t);
                    d + 1
                });
            }
        }
        Err(MachineError::EmptyLanguage(
            "the language of the DFA is empty".to_string(),
        ))
    }

    /// The length of the longest accepted word, or `None` when the
    /// language is infinite (the trim subgraph has a cycle). Errs with
    /// [MachineError::EmptyLanguage] for the empty language.
    pub fn maximum_word_length(&self) -> Result<Option<usize>, MachineError> {
        if self.is_empty() {
            return Err(MachineError::EmptyLanguage(
                "the language of the DFA is empty".to_string(),
            ));
        }
        if !self.is_finite() {
            return Ok(None);
        }
        let trim = self.trim_state_idx();
        let mut memo = vec![None; self.states.len()];
        Ok(Some(longest_from(
            self,
            self.initial_state,
            &trim,
            &mut memo,
        )))
    }

    /// A uniformly random accepted word of length `k` drawn with the
    /// given generator, or `None` if the language has no word of that
    /// length. At each step a symbol is chosen with probability
    /// proportional to the number of accepted completions behind it.
    pub fn random_word_with(&self, k: usize, rng: &mut impl Rng) -> Option<String> {
        self.populate_count_levels_up_to(k);
        let cache = self.cache.borrow();
        let levels = &cache.count_levels;
        let mut state = self.initial_state;
        if levels[k][state] == 0 {
            return None;
        }
        let mut word = String::new();
        for remaining in (1..=k).rev() {
            let mut choice = rng.gen_range(0..levels[remaining][state]);
            for (sym, target) in self.states[state].transitions.iter().enumerate() {
                if let Some(t) = target {
                    let below = levels[remaining - 1][*t];
                    if choice < below {
                        word.push_str(&self.alphabet[sym]);
                        state = *t;
                        break;
                    }
                    choice -= below;
                }
            }
        }
        debug_assert!(self.states[state].accepting);
        Some(word)
    }

    /// Like [Dfa::random_word_with], with the thread-local generator.
    pub fn random_word(&self, k: usize) -> Option<String> {
        self.random_word_with(k, &mut rand::thread_rng())
    }

    /// The first accepted word strictly after `from` in lexicographic
    /// order (by the alphabet's order), or the first word overall when
    /// `from` is `None`. With `strict` set to false, `from` itself is
    /// returned if it is accepted. The input must be a string of
    /// single-grapheme alphabet symbols.
    pub fn successor(
        &self,
        from: Option<&str>,
        strict: bool,
    ) -> Result<Option<String>, MachineError> {
        Ok(self.successors(from, strict)?.next())
    }

    /// The last accepted word strictly before `from`, or the last word
    /// overall when `from` is `None`. Errs with
    /// [MachineError::InfiniteLanguage] when the language is infinite.
    pub fn predecessor(
        &self,
        from: Option<&str>,
        strict: bool,
    ) -> Result<Option<String>, MachineError> {
        Ok(self.predecessors(from, strict)?.next())
    }

    /// Iterates over all accepted words after `from`, in ascending
    /// lexicographic order.
    pub fn successors(
        &self,
        from: Option<&str>,
        strict: bool,
    ) -> Result<Successors<'_>, MachineError> {
        let order = (0..self.alphabet.len()).collect();
        self.lexical_walk(from, strict, false, order)
    }

    /// Iterates over all accepted words before `from`, in descending
    /// lexicographic order. Only defined for finite languages.
    pub fn predecessors(
        &self,
        from: Option<&str>,
        strict: bool,
    ) -> Result<Successors<'_>, MachineError> {
        let order = (0..self.alphabet.len()).rev().collect();
        self.lexical_walk(from, strict, true, order)
    }

    /// Like [Dfa::successors], but ordering symbols by the given
    /// permutation of the alphabet instead of the alphabet's own order.
    pub fn successors_with_order(
        &self,
        from: Option<&str>,
        strict: bool,
        order: &[&str],
    ) -> Result<Successors<'_>, MachineError> {
        let order = self.resolve_order(order)?;
        self.lexical_walk(from, strict, false, order)
    }

    /// Like [Dfa::predecessors], but ordering symbols by the given
    /// permutation of the alphabet.
    pub fn predecessors_with_order(
        &self,
        from: Option<&str>,
        strict: bool,
        order: &[&str],
    ) -> Result<Successors<'_>, MachineError> {
        let mut order = self.resolve_order(order)?;
        order.reverse();
        self.lexical_walk(from, strict, true, order)
    }

    fn resolve_order(&self, order: &[&str]) -> Result<Vec<usize>, MachineError> {
        if order.len() != self.alphabet.len() {
            return Err(MachineError::InvalidSymbol(
                "the symbol order must be a permutation of the alphabet".to_string(),
            ));
        }
        let mut seen = HashSet::new();
        order
            .iter()
            .map(|symbol| {
                self.alphabet
                    .iter()
                    .position(|s| s.as_ref() == *symbol)
                    .filter(|idx| seen.insert(*idx))
                    .ok_or_else(|| {
                        MachineError::InvalidSymbol(format!(
                            "'{symbol}' does not order the alphabet"
                        ))
                    })
            })
            .collect()
    }

    fn lexical_walk(
        &self,
        from: Option<&str>,
        strict: bool,
        reverse: bool,
        order: Vec<usize>,
    ) -> Result<Successors<'_>, MachineError> {
        if reverse && !self.is_finite() {
            return Err(MachineError::InfiniteLanguage(
                "predecessors cannot be computed for infinite languages".to_string(),
            ));
        }

        let mut rank_of = vec![0usize; self.alphabet.len()];
        for (rank, &sym) in order.iter().enumerate() {
            rank_of[sym] = rank;
        }

        let trim = self.coaccessible_state_idx();
        let mut coaccessible = vec![false; self.states.len()];
        for idx in trim {
            coaccessible[idx] = true;
        }

        let mut state_stack: Vec<Option<usize>> = vec![Some(self.initial_state)];
        let mut char_stack: Vec<usize> = Vec::new();
        if let Some(word) = from {
            let mut eval = self.evaluator();
            for grapheme in word.graphemes(true) {
                let sym = self
                    .alphabet
                    .iter()
                    .position(|s| s.as_ref() == grapheme)
                    .ok_or_else(|| {
                        MachineError::InvalidSymbol(format!(
                            "'{grapheme}' is not in the alphabet"
                        ))
                    })?;
                eval.step(grapheme);
                state_stack.push(eval.current_state_idx());
                char_stack.push(rank_of[sym]);
            }
        }

        Ok(Successors {
            dfa: self,
            coaccessible,
            order,
            state_stack,
            char_stack,
            candidate: if reverse && from.is_some() {
                None
            } else {
                Some(0)
            },
            reverse,
            should_yield: !strict || from.is_none(),
            done: false,
        })
    }
}

fn longest_from(dfa: &Dfa, q: usize, trim: &HashSet<usize>, memo: &mut [Option<usize>]) -> usize {
    if let Some(length) = memo[q] {
        return length;
    }
    let mut best = 0;
    for &t in dfa.states[q].transitions.iter().flatten() {
        if trim.contains(&t) {
            best = best.max(1 + longest_from(dfa, t, trim, memo));
        }
    }
    memo[q] = Some(best);
    best
}

/// Iterator over every accepted word, ordered by length then
/// lexicographically. See [Dfa::words].
pub struct Words<'a> {
    dfa: &'a Dfa,
    length: usize,
    limit: Option<usize>,
    buffer: std::vec::IntoIter<String>,
    done: bool,
}

impl<'a> Words<'a> {
    fn new(dfa: &'a Dfa) -> Self {
        match dfa.minimum_word_length() {
            Err(_) => Words {
                dfa,
                length: 0,
                limit: None,
                buffer: Vec::new().into_iter(),
                done: true,
            },
            Ok(min) => Words {
                dfa,
                length: min,
                limit: dfa
                    .maximum_word_length()
                    .expect("the language is not empty"),
                buffer: dfa.words_of_length(min).into_iter(),
                done: false,
            },
        }
    }
}

impl Iterator for Words<'_> {
    type Item = String;

    fn next(&mut self) -> Option<String> {
        if self.done {
            return None;
        }
        loop {
            if let Some(word) = self.buffer.next() {
                return Some(word);
            }
            self.length += 1;
            if self.limit.map_or(false, |limit| self.length > limit) {
                self.done = true;
                return None;
            }
            self.buffer = self.dfa.words_of_length(self.length).into_iter();
        }
    }
}

/// A depth-first lexical walk over the DFA restricted to coaccessible
/// states, producing accepted words in lexicographic order. Produced by
/// [Dfa::successors] (ascending) and [Dfa::predecessors] (descending).
pub struct Successors<'a> {
    dfa: &'a Dfa,
    coaccessible: Vec<bool>,
    /// Symbol indices in traversal order (already reversed for the
    /// descending walk).
    order: Vec<usize>,
    state_stack: Vec<Option<usize>>,
    /// The current prefix, as ranks into `order`.
    char_stack: Vec<usize>,
    /// The rank of the next symbol to try from the current node; `None`
    /// when the node's symbols are exhausted.
    candidate: Option<usize>,
    reverse: bool,
    should_yield: bool,
    done: bool,
}

impl Successors<'_> {
    fn word(&self) -> String {
        self.char_stack
            .iter()
            .map(|&rank| self.dfa.alphabet[self.order[rank]].as_ref())
            .collect()
    }

    fn accepting(&self, state: Option<usize>) -> bool {
        state.map_or(false, |idx| self.dfa.states[idx].accepting)
    }
}

impl Iterator for Successors<'_> {
    type Item = String;

    fn next(&mut self) -> Option<String> {
        if self.done {
            return None;
        }
        while !self.char_stack.is_empty() || self.candidate.is_some() {
            let state = *self.state_stack.last().expect("the stack holds the root");
            let mut emit = None;

            if !self.reverse
                && self.should_yield
                && self.candidate == Some(0)
                && self.accepting(state)
            {
                emit = Some(self.word());
            }

            let candidate_state = match (self.candidate, state) {
                (Some(rank), Some(idx)) => self.dfa.states[idx].transitions[self.order[rank]],
                _ => None,
            };

            if candidate_state.map_or(false, |idx| self.coaccessible[idx]) {
                self.state_stack.push(candidate_state);
                self.char_stack
                    .push(self.candidate.expect("a candidate state needs a candidate"));
                self.candidate = Some(0);
            } else {
                if self.reverse
                    && self.should_yield
                    && self.candidate.is_none()
                    && self.accepting(state)
                {
                    emit = Some(self.word());
                }
                let rank = match self.candidate {
                    None => {
                        self.state_stack.pop();
                        self.char_stack.pop().expect("the walk mirrors the prefix")
                    }
                    Some(rank) => rank,
                };
                self.candidate = (rank + 1 < self.order.len()).then_some(rank + 1);
            }
            self.should_yield = true;

            if emit.is_some() {
                return emit;
            }
        }
        self.done = true;
        // The empty word comes last in a descending walk.
        if self.reverse
            && self.should_yield
            && self.accepting(*self.state_stack.last().expect("the root remains"))
        {
            return Some(String::new());
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use crate::dfa::Dfa;
    use crate::errors::MachineError;
    use crate::parser;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn ends_in_b() -> Dfa {
        let table = "
                 a b
            -> s s t
             * t s t
        ";
        parser::dfa(table).unwrap().try_into().unwrap()
    }

    fn finite_sample() -> Dfa {
        // Exactly {a, b, ab}
        Dfa::from_finite_language(&["a", "b"], &["a", "b", "ab"]).unwrap()
    }

    #[test]
    fn counts_words_by_length() {
        let dfa = ends_in_b();
        assert_eq!(dfa.count_words_of_length(0), 0);
        assert_eq!(dfa.count_words_of_length(1), 1);
        assert_eq!(dfa.count_words_of_length(2), 2);
        assert_eq!(dfa.count_words_of_length(3), 4);
    }

    #[test]
    fn words_of_length_are_sorted_and_counted() {
        let dfa = ends_in_b();
        let words = dfa.words_of_length(2);
        assert_eq!(words, vec!["ab", "bb"]);
        assert_eq!(words.len() as u64, dfa.count_words_of_length(2));
        assert!(words.iter().all(|w| dfa.accepts_graphemes(w)));
    }

    #[test]
    fn words_iterates_by_length_then_lex() {
        let dfa = ends_in_b();
        let words: Vec<String> = dfa.words().take(7).collect();
        assert_eq!(words, vec!["b", "ab", "bb", "aab", "abb", "bab", "bbb"]);
    }

    #[test]
    fn cardinality_of_finite_language() {
        let dfa = finite_sample();
        assert_eq!(dfa.cardinality().unwrap(), 3);
        assert_eq!(dfa.minimum_word_length().unwrap(), 1);
        assert_eq!(dfa.maximum_word_length().unwrap(), Some(2));
    }

    #[test]
    fn cardinality_of_infinite_language_errs() {
        let dfa = ends_in_b();
        assert!(matches!(
            dfa.cardinality(),
            Err(MachineError::InfiniteLanguage(_))
        ));
        assert_eq!(dfa.maximum_word_length().unwrap(), None);
        assert!(!dfa.is_finite());
    }

    #[test]
    fn empty_language_bounds() {
        let dfa = Dfa::empty_language(&["a"]).unwrap();
        assert!(dfa.is_empty());
        assert!(dfa.is_finite());
        assert_eq!(dfa.cardinality().unwrap(), 0);
        assert!(matches!(
            dfa.minimum_word_length(),
            Err(MachineError::EmptyLanguage(_))
        ));
    }

    #[test]
    fn random_words_are_accepted() {
        let dfa = ends_in_b();
        let mut rng = StdRng::seed_from_u64(7);
        for k in 1..6 {
            let word = dfa.random_word_with(k, &mut rng).unwrap();
            assert_eq!(word.len(), k);
            assert!(dfa.accepts_graphemes(&word));
        }
        assert_eq!(dfa.random_word_with(0, &mut rng), None);
    }

    #[test]
    fn successor_walks_lexicographically() {
        let dfa = finite_sample();
        assert_eq!(dfa.successor(None, true).unwrap(), Some("a".to_string()));
        assert_eq!(
            dfa.successor(Some("a"), true).unwrap(),
            Some("ab".to_string())
        );
        assert_eq!(
            dfa.successor(Some("ab"), true).unwrap(),
            Some("b".to_string())
        );
        assert_eq!(dfa.successor(Some("b"), true).unwrap(), None);
        // Non-strict returns accepted inputs themselves
        assert_eq!(
            dfa.successor(Some("a"), false).unwrap(),
            Some("a".to_string())
        );
    }

    #[test]
    fn successors_collects_everything_in_order() {
        let dfa = finite_sample();
        let all: Vec<String> = dfa.successors(None, true).unwrap().collect();
        assert_eq!(all, vec!["a", "ab", "b"]);
    }

    #[test]
    fn predecessor_walks_backwards() {
        let dfa = finite_sample();
        assert_eq!(dfa.predecessor(None, true).unwrap(), Some("b".to_string()));
        assert_eq!(
            dfa.predecessor(Some("b"), true).unwrap(),
            Some("ab".to_string())
        );
        assert_eq!(
            dfa.predecessor(Some("ab"), true).unwrap(),
            Some("a".to_string())
        );
        assert_eq!(dfa.predecessor(Some("a"), true).unwrap(), None);
        let all: Vec<String> = dfa.predecessors(None, true).unwrap().collect();
        assert_eq!(all, vec!["b", "ab", "a"]);
    }

    #[test]
    fn predecessor_of_infinite_language_errs() {
        let dfa = ends_in_b();
        assert!(matches!(
            dfa.predecessor(Some("b"), true),
            Err(MachineError::InfiniteLanguage(_))
        ));
    }

    #[test]
    fn successor_on_infinite_language() {
        // Strings starting with b: every successor query terminates
        // because accepted words appear along the leftmost viable path.
        let dfa = Dfa::from_prefix(&["a", "b"], "b", true).unwrap();
        assert_eq!(dfa.successor(None, true).unwrap(), Some("b".to_string()));
        assert_eq!(
            dfa.successor(Some("b"), true).unwrap(),
            Some("ba".to_string())
        );
        assert_eq!(
            dfa.successor(Some("ba"), true).unwrap(),
            Some("baa".to_string())
        );
    }

    #[test]
    fn custom_symbol_order() {
        let dfa = finite_sample();
        // With b < a the first word is b and the last is ab
        let all: Vec<String> = dfa
            .successors_with_order(None, true, &["b", "a"])
            .unwrap()
            .collect();
        assert_eq!(all, vec!["b", "a", "ab"]);
    }
}

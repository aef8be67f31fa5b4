use crate::nfa::{Nfa, NfaState};
use std::collections::{HashMap, HashSet};
use std::iter;
use std::rc::Rc;

/// Stepwise execution of an [Nfa]: the configuration is the set of
/// states the machine can currently be in, always closed under epsilon
/// transitions. The starting configuration is the closure of the initial
/// state.
#[derive(Clone, Debug)]
pub struct NfaEvaluator<'a> {
    nfa: &'a Nfa,
    rev_map: HashMap<&'a str, usize>,
    closures: Rc<Vec<HashSet<usize>>>,
    current_states: HashSet<usize>,
}

impl<'a> NfaEvaluator<'a> {
    pub fn is_accepting(&self) -> bool {
        self.current_states
            .iter()
            .any(|&s| self.nfa.states[s].accepting)
    }

    pub fn current_states(&self) -> Vec<&'a NfaState> {
        self.current_states
            .iter()
            .map(|&s| &self.nfa.states[s])
            .collect()
    }

    pub fn current_states_idx(&self) -> &HashSet<usize> {
        &self.current_states
    }

    /// Steps one copy of this evaluator per alphabet symbol, in alphabet
    /// order.
    pub fn step_all(&self) -> Vec<NfaEvaluator<'a>> {
        iter::repeat(self.clone())
            .zip(self.nfa.alphabet.iter())
            .map(|(mut eval, elem)| {
                eval.step(elem);
                eval
            })
            .collect()
    }

    /// Steps on one symbol: the new configuration is the epsilon closure
    /// of every target reachable from the current set on that symbol. A
    /// symbol outside the alphabet empties the configuration.
    pub fn step(&mut self, elem: &str) {
        match self.rev_map.get(elem) {
            None => self.current_states.clear(),
            Some(&idx) => {
                self.current_states = self
                    .current_states
                    .iter()
                    .flat_map(|&state| self.nfa.states[state].transitions[idx].iter())
                    .flat_map(|&target| self.closures[target].iter().copied())
                    .collect();
            }
        }
    }

    pub fn step_multiple(&mut self, elems: &[&str]) {
        elems.iter().for_each(|e| self.step(e));
    }
}

impl<'a> From<&'a Nfa> for NfaEvaluator<'a> {
    fn from(value: &'a Nfa) -> Self {
        let map = value
            .alphabet
            .iter()
            .enumerate()
            .map(|(idx, c)| (c as &str, idx))
            .collect();
        let closures = value.lambda_closures();
        let current_states = closures[value.initial_state].clone();
        Self {
            nfa: value,
            rev_map: map,
            closures,
            current_states,
        }
    }
}

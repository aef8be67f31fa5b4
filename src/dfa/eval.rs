use crate::dfa::{Dfa, DfaState};
use std::collections::HashMap;
use std::iter;

/// Stepwise execution of a [Dfa]: tracks the current state while symbols
/// are fed one at a time. A partial DFA that sees a symbol with no
/// transition (or any DFA that sees a symbol outside its alphabet) falls
/// off into an implicit trap: [DfaEvaluator::current_state] reports
/// `None` from then on and the run can never accept.
#[derive(Debug, Clone)]
pub struct DfaEvaluator<'a> {
    dfa: &'a Dfa,
    rev_map: HashMap<&'a str, usize>,
    current_state: Option<usize>,
}

impl<'a> DfaEvaluator<'a> {
    pub fn is_accepting(&self) -> bool {
        self.current_state().map_or(false, DfaState::is_accepting)
    }

    pub fn current_state(&self) -> Option<&'a DfaState> {
        self.current_state.map(|idx| &self.dfa.states[idx])
    }

    pub fn current_state_idx(&self) -> Option<usize> {
        self.current_state
    }

    /// Steps one copy of this evaluator per alphabet symbol, in alphabet
    /// order.
    pub fn step_all(&self) -> Vec<DfaEvaluator<'a>> {
        iter::repeat(self.clone())
            .zip(self.dfa.alphabet())
            .map(|(mut eval, elem)| {
                eval.step(elem);
                eval
            })
            .collect()
    }

    /// Steps on one symbol. Returns the new current state, or `None` if
    /// the machine has fallen off its transition table.
    pub fn step(&mut self, elem: &str) -> Option<&'a DfaState> {
        let next = match (self.current_state, self.rev_map.get(elem)) {
            (Some(state), Some(&idx)) => self.dfa.states[state].transitions[idx],
            _ => None,
        };
        self.current_state = next;
        self.current_state()
    }

    /// Steps once per symbol in the given order. Returns the terminal
    /// state like [DfaEvaluator::step].
    pub fn step_multiple(&mut self, elems: &[&str]) -> Option<&'a DfaState> {
        elems.iter().for_each(|e| {
            self.step(e);
        });
        self.current_state()
    }
}

impl<'a> From<&'a Dfa> for DfaEvaluator<'a> {
    fn from(value: &'a Dfa) -> Self {
        let map = value
            .alphabet
            .iter()
            .enumerate()
            .map(|(idx, c)| (c as &str, idx))
            .collect();
        Self {
            dfa: value,
            rev_map: map,
            current_state: Some(value.initial_state),
        }
    }
}

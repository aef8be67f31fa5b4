//! Nondeterministic pushdown automata.

use crate::errors::MachineError;
use crate::pda::{accepts_configuration, AcceptanceMode, PdaConfiguration, PdaTables};
use std::collections::{HashMap, HashSet};
use std::rc::Rc;
use unicode_segmentation::UnicodeSegmentation;

/// The name-based description of an [Npda], converted (and validated)
/// with `TryInto`. Unlike a [crate::pda::DpdaDef], rules may overlap
/// freely.
#[derive(Debug, Clone)]
pub struct NpdaDef<'a> {
    pub states: Vec<&'a str>,
    pub input_symbols: Vec<&'a str>,
    pub stack_symbols: Vec<&'a str>,
    pub rules: Vec<NpdaRule<'a>>,
    pub initial_state: &'a str,
    pub initial_stack_symbol: &'a str,
    pub final_states: Vec<&'a str>,
    pub acceptance_mode: AcceptanceMode,
}

/// One transition rule, as for [crate::pda::DpdaRule].
#[derive(Debug, Clone)]
pub struct NpdaRule<'a> {
    pub state: &'a str,
    pub input: Option<&'a str>,
    pub stack_top: &'a str,
    pub next_state: &'a str,
    pub push: Vec<&'a str>,
}

type TransitionKey = (usize, Option<Rc<str>>, Rc<str>);

/// A nondeterministic pushdown automaton. Execution tracks a frontier
/// of configurations; the machine accepts as soon as any configuration
/// does, and rejects when the frontier runs dry.
#[derive(Debug, Clone)]
pub struct Npda {
    state_names: Vec<Rc<str>>,
    input_symbols: Rc<[Rc<str>]>,
    stack_symbols: Rc<[Rc<str>]>,
    transitions: HashMap<TransitionKey, Vec<(usize, Vec<Rc<str>>)>>,
    initial_state: usize,
    initial_stack_symbol: Rc<str>,
    final_states: HashSet<usize>,
    acceptance_mode: AcceptanceMode,
}

impl<'a> TryFrom<NpdaDef<'a>> for Npda {
    type Error = MachineError;

    fn try_from(def: NpdaDef<'a>) -> Result<Self, Self::Error> {
        let tables = PdaTables::build(
            &def.states,
            &def.input_symbols,
            &def.stack_symbols,
            def.initial_state,
            def.initial_stack_symbol,
            &def.final_states,
        )?;

        let mut transitions: HashMap<TransitionKey, Vec<(usize, Vec<Rc<str>>)>> = HashMap::new();
        for rule in &def.rules {
            let state = tables.state_index(rule.state)?;
            let next_state = tables.state_index(rule.next_state)?;
            let input = rule
                .input
                .map(|symbol| tables.check_input_symbol(symbol))
                .transpose()?;
            let stack_top = tables.check_stack_symbol(rule.stack_top)?;
            let push = rule
                .push
                .iter()
                .map(|symbol| tables.check_stack_symbol(symbol))
                .collect::<Result<Vec<_>, _>>()?;
            transitions
                .entry((state, input, stack_top))
                .or_default()
                .push((next_state, push));
        }

        Ok(Npda {
            state_names: tables.state_names,
            input_symbols: tables.input_symbols,
            stack_symbols: tables.stack_symbols,
            transitions,
            initial_state: tables.initial_state,
            initial_stack_symbol: tables.initial_stack_symbol,
            final_states: tables.final_states,
            acceptance_mode: def.acceptance_mode,
        })
    }
}

impl Npda {
    /// Gets the state names of this NPDA.
    pub fn states(&self) -> &[Rc<str>] {
        &self.state_names
    }

    /// Resolves a state index from a configuration to its name.
    pub fn state_name(&self, idx: usize) -> &str {
        &self.state_names[idx]
    }

    pub fn input_symbols(&self) -> &[Rc<str>] {
        &self.input_symbols
    }

    pub fn stack_symbols(&self) -> &[Rc<str>] {
        &self.stack_symbols
    }

    pub fn acceptance_mode(&self) -> AcceptanceMode {
        self.acceptance_mode
    }

    /// Iterates over every transition exactly once, as
    /// (state, input, stack top) → (next state, pushed symbols).
    pub fn iter_transitions(
        &self,
    ) -> impl Iterator<Item = (usize, Option<&str>, &str, usize, &[Rc<str>])> + '_ {
        self.transitions
            .iter()
            .flat_map(|((state, input, top), results)| {
                results.iter().map(move |(next, push)| {
                    (
                        *state,
                        input.as_ref().map(|s| s.as_ref()),
                        top.as_ref(),
                        *next,
                        push.as_slice(),
                    )
                })
            })
    }

    fn accepts_config(&self, config: &PdaConfiguration) -> bool {
        accepts_configuration(config, self.acceptance_mode, &self.final_states)
    }

    fn has_lambda_transition(&self, state: usize, stack_top: Option<Rc<str>>) -> bool {
        stack_top.map_or(false, |top| {
            self.transitions.contains_key(&(state, None, top))
        })
    }

    /// All successors of a configuration: the symbol moves (when input
    /// remains) plus the epsilon moves.
    fn next_configurations(&self, config: &PdaConfiguration) -> Vec<PdaConfiguration> {
        let mut next = Vec::new();
        let top = match config.stack.top_symbol() {
            Some(top) => top,
            None => return next,
        };
        if let Some(symbol) = config.remaining_input.first() {
            let key = (config.state, Some(symbol.clone()), top.clone());
            if let Some(results) = self.transitions.get(&key) {
                for (next_state, push) in results {
                    next.push(config.advanced(*next_state, true, push));
                }
            }
        }
        if let Some(results) = self.transitions.get(&(config.state, None, top)) {
            for (next_state, push) in results {
                next.push(config.advanced(*next_state, false, push));
            }
        }
        next
    }

    /// An evaluator for stepwise execution over the given input.
    pub fn evaluator(&self, input: &[&str]) -> NpdaEvaluator<'_> {
        let initial = PdaConfiguration::initial(
            self.initial_state,
            input,
            self.initial_stack_symbol.clone(),
        );
        NpdaEvaluator {
            npda: self,
            frontier: HashSet::from([initial]),
            accepted: None,
            outcome: None,
        }
    }

    /// Runs the machine to halting and returns the first accepting
    /// configuration, or a [MachineError::Rejection].
    pub fn read_input(&self, input: &[&str]) -> Result<PdaConfiguration, MachineError> {
        let mut eval = self.evaluator(input);
        while eval.step().is_some() {}
        eval.accepting_configuration().cloned().ok_or_else(|| {
            MachineError::Rejection("the NPDA did not reach an accepting configuration".to_string())
        })
    }

    /// Checks if this NPDA accepts the given string of elements.
    pub fn accepts(&self, input: &[&str]) -> bool {
        let mut eval = self.evaluator(input);
        while eval.step().is_some() {}
        eval.has_accepted()
    }

    /// Checks if this NPDA accepts the given string, split into
    /// extended grapheme clusters.
    pub fn accepts_graphemes(&self, input: &str) -> bool {
        let graphemes = input.graphemes(true).collect::<Vec<_>>();
        self.accepts(&graphemes)
    }
}

/// Stepwise execution of an [Npda] on a fixed input: each
/// [step](NpdaEvaluator::step) expands the whole frontier by one move.
#[derive(Debug, Clone)]
pub struct NpdaEvaluator<'a> {
    npda: &'a Npda,
    frontier: HashSet<PdaConfiguration>,
    accepted: Option<PdaConfiguration>,
    outcome: Option<bool>,
}

impl NpdaEvaluator<'_> {
    /// The current frontier of configurations.
    pub fn configs(&self) -> &HashSet<PdaConfiguration> {
        &self.frontier
    }

    /// Whether the run has halted (accepting or not).
    pub fn has_halted(&self) -> bool {
        self.outcome.is_some()
    }

    /// Whether the run has halted accepting.
    pub fn has_accepted(&self) -> bool {
        self.outcome == Some(true)
    }

    /// The accepting configuration, once the run has halted accepting.
    pub fn accepting_configuration(&self) -> Option<&PdaConfiguration> {
        self.accepted.as_ref()
    }

    /// Expands the frontier one move. Returns the new frontier, or
    /// `None` once the machine has halted.
    pub fn step(&mut self) -> Option<&HashSet<PdaConfiguration>> {
        if self.outcome.is_some() {
            return None;
        }
        if let Some(accepting) = self
            .frontier
            .iter()
            .find(|config| self.npda.accepts_config(config))
        {
            self.accepted = Some(accepting.clone());
            self.outcome = Some(true);
            return None;
        }
        let mut next = HashSet::new();
        for config in &self.frontier {
            if !config.remaining_input.is_empty()
                || self
                    .npda
                    .has_lambda_transition(config.state, config.stack.top_symbol())
            {
                next.extend(self.npda.next_configurations(config));
            }
        }
        if next.is_empty() {
            self.outcome = Some(false);
            return None;
        }
        self.frontier = next;
        Some(&self.frontier)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Palindromes over {a, b}, guessing the middle nondeterministically.
    fn palindromes() -> Npda {
        let mut rules = Vec::new();
        for top in ["#", "a", "b"] {
            for symbol in ["a", "b"] {
                // Push phase: remember the symbol
                rules.push(NpdaRule {
                    state: "q0",
                    input: Some(symbol),
                    stack_top: top,
                    next_state: "q0",
                    push: vec![symbol, top],
                });
                // Guess an odd middle: consume it, change phase
                rules.push(NpdaRule {
                    state: "q0",
                    input: Some(symbol),
                    stack_top: top,
                    next_state: "q1",
                    push: vec![top],
                });
            }
            // Guess an even middle
            rules.push(NpdaRule {
                state: "q0",
                input: None,
                stack_top: top,
                next_state: "q1",
                push: vec![top],
            });
        }
        // Match phase: pop on equal symbols
        for symbol in ["a", "b"] {
            rules.push(NpdaRule {
                state: "q1",
                input: Some(symbol),
                stack_top: symbol,
                next_state: "q1",
                push: vec![],
            });
        }
        rules.push(NpdaRule {
            state: "q1",
            input: None,
            stack_top: "#",
            next_state: "q2",
            push: vec!["#"],
        });

        NpdaDef {
            states: vec!["q0", "q1", "q2"],
            input_symbols: vec!["a", "b"],
            stack_symbols: vec!["#", "a", "b"],
            rules,
            initial_state: "q0",
            initial_stack_symbol: "#",
            final_states: vec!["q2"],
            acceptance_mode: AcceptanceMode::FinalState,
        }
        .try_into()
        .unwrap()
    }

    #[test]
    fn accepts_palindromes() {
        let npda = palindromes();
        for word in ["", "a", "aa", "abba", "aabaa", "babbab"] {
            assert!(npda.accepts_graphemes(word), "{word} is a palindrome");
        }
    }

    #[test]
    fn rejects_non_palindromes() {
        let npda = palindromes();
        for word in ["ab", "abb", "aab", "abab"] {
            assert!(!npda.accepts_graphemes(word), "{word} is not a palindrome");
        }
    }

    #[test]
    fn read_input_returns_an_accepting_configuration() {
        let npda = palindromes();
        let config = npda.read_input(&["a", "b", "b", "a"]).unwrap();
        assert_eq!(npda.state_name(config.state), "q2");
        assert!(matches!(
            npda.read_input(&["a", "b"]),
            Err(MachineError::Rejection(_))
        ));
    }

    #[test]
    fn frontier_grows_and_shrinks() {
        let npda = palindromes();
        let mut eval = npda.evaluator(&["a", "b", "b", "a"]);
        let mut largest = 1;
        while let Some(frontier) = eval.step() {
            largest = largest.max(frontier.len());
        }
        assert!(eval.has_accepted());
        assert!(largest > 1);
    }
}

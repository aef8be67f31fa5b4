//! Deterministic pushdown automata.

use crate::errors::MachineError;
use crate::pda::{accepts_configuration, AcceptanceMode, PdaConfiguration, PdaTables};
use std::collections::{HashMap, HashSet};
use std::rc::Rc;
use unicode_segmentation::UnicodeSegmentation;

/// The name-based description of a [Dpda], converted (and validated)
/// with `TryInto`.
#[derive(Debug, Clone)]
pub struct DpdaDef<'a> {
    pub states: Vec<&'a str>,
    pub input_symbols: Vec<&'a str>,
    pub stack_symbols: Vec<&'a str>,
    pub rules: Vec<DpdaRule<'a>>,
    pub initial_state: &'a str,
    pub initial_stack_symbol: &'a str,
    pub final_states: Vec<&'a str>,
    pub acceptance_mode: AcceptanceMode,
}

/// One transition rule: on `input` (`None` for an epsilon move) with
/// `stack_top` on the stack, go to `next_state` and replace the top by
/// `push`, whose first symbol becomes the new top (empty pops).
#[derive(Debug, Clone)]
pub struct DpdaRule<'a> {
    pub state: &'a str,
    pub input: Option<&'a str>,
    pub stack_top: &'a str,
    pub next_state: &'a str,
    pub push: Vec<&'a str>,
}

type TransitionKey = (usize, Option<Rc<str>>, Rc<str>);

/// A deterministic pushdown automaton. At most one transition applies
/// in any configuration; the validation rejects rule sets where an
/// epsilon move and a symbol move share a (state, stack top) pair.
#[derive(Debug, Clone)]
pub struct Dpda {
    state_names: Vec<Rc<str>>,
    input_symbols: Rc<[Rc<str>]>,
    stack_symbols: Rc<[Rc<str>]>,
    transitions: HashMap<TransitionKey, (usize, Vec<Rc<str>>)>,
    initial_state: usize,
    initial_stack_symbol: Rc<str>,
    final_states: HashSet<usize>,
    acceptance_mode: AcceptanceMode,
}

impl<'a> TryFrom<DpdaDef<'a>> for Dpda {
    type Error = MachineError;

    fn try_from(def: DpdaDef<'a>) -> Result<Self, Self::Error> {
        let tables = PdaTables::build(
            &def.states,
            &def.input_symbols,
            &def.stack_symbols,
            def.initial_state,
            def.initial_stack_symbol,
            &def.final_states,
        )?;

        let mut transitions: HashMap<TransitionKey, (usize, Vec<Rc<str>>)> = HashMap::new();
        let mut lambda_pairs: HashSet<(usize, Rc<str>)> = HashSet::new();
        let mut symbol_pairs: HashSet<(usize, Rc<str>)> = HashSet::new();
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

            match input {
                None => lambda_pairs.insert((state, stack_top.clone())),
                Some(_) => symbol_pairs.insert((state, stack_top.clone())),
            };
            let key = (state, input, stack_top);
            if transitions.insert(key, (next_state, push)).is_some() {
                return Err(MachineError::Nondeterminism(format!(
                    "state '{}' has two transitions for the same input and stack top",
                    rule.state
                )));
            }
        }
        if let Some((state, stack_top)) = lambda_pairs.intersection(&symbol_pairs).next() {
            return Err(MachineError::Nondeterminism(format!(
                "state '{}' has a lambda transition adjacent to a symbol transition on \
                 stack top '{stack_top}'",
                tables.state_names[*state]
            )));
        }

        Ok(Dpda {
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

impl Dpda {
    /// Gets the state names of this DPDA.
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
            .map(|((state, input, top), (next, push))| {
                (
                    *state,
                    input.as_ref().map(|s| s.as_ref()),
                    top.as_ref(),
                    *next,
                    push.as_slice(),
                )
            })
    }

    pub(crate) fn accepts_config(&self, config: &PdaConfiguration) -> bool {
        accepts_configuration(config, self.acceptance_mode, &self.final_states)
    }

    fn has_lambda_transition(&self, state: usize, stack_top: Option<Rc<str>>) -> bool {
        stack_top.map_or(false, |top| {
            self.transitions.contains_key(&(state, None, top))
        })
    }

    /// The single applicable successor, trying the symbol transition
    /// first and the epsilon transition otherwise.
    fn next_configuration(&self, config: &PdaConfiguration) -> Option<PdaConfiguration> {
        let top = config.stack.top_symbol()?;
        if let Some(symbol) = config.remaining_input.first() {
            let key = (config.state, Some(symbol.clone()), top.clone());
            if let Some((next_state, push)) = self.transitions.get(&key) {
                return Some(config.advanced(*next_state, true, push));
            }
        }
        self.transitions
            .get(&(config.state, None, top))
            .map(|(next_state, push)| config.advanced(*next_state, false, push))
    }

    /// An evaluator for stepwise execution over the given input.
    pub fn evaluator(&self, input: &[&str]) -> DpdaEvaluator<'_> {
        DpdaEvaluator {
            dpda: self,
            config: PdaConfiguration::initial(
                self.initial_state,
                input,
                self.initial_stack_symbol.clone(),
            ),
            outcome: None,
        }
    }

    /// Runs the machine to halting and returns the accepting
    /// configuration, or a [MachineError::Rejection].
    pub fn read_input(&self, input: &[&str]) -> Result<PdaConfiguration, MachineError> {
        let mut eval = self.evaluator(input);
        while eval.step().is_some() {}
        if eval.has_accepted() {
            Ok(eval.config().clone())
        } else {
            Err(MachineError::Rejection(format!(
                "the DPDA stopped in a non-accepting configuration (state '{}', stack {})",
                self.state_name(eval.config().state),
                eval.config().stack
            )))
        }
    }

    /// Checks if this DPDA accepts the given string of elements.
    pub fn accepts(&self, input: &[&str]) -> bool {
        let mut eval = self.evaluator(input);
        while eval.step().is_some() {}
        eval.has_accepted()
    }

    /// Checks if this DPDA accepts the given string, split into
    /// extended grapheme clusters.
    pub fn accepts_graphemes(&self, input: &str) -> bool {
        let graphemes = input.graphemes(true).collect::<Vec<_>>();
        self.accepts(&graphemes)
    }
}

/// Stepwise execution of a [Dpda] on a fixed input: each
/// [step](DpdaEvaluator::step) applies one transition and yields the new
/// configuration, until the machine accepts or gets stuck.
#[derive(Debug, Clone)]
pub struct DpdaEvaluator<'a> {
    dpda: &'a Dpda,
    config: PdaConfiguration,
    outcome: Option<bool>,
}

impl DpdaEvaluator<'_> {
    /// The current configuration.
    pub fn config(&self) -> &PdaConfiguration {
        &self.config
    }

    /// Whether the run has halted (accepting or not).
    pub fn has_halted(&self) -> bool {
        self.outcome.is_some()
    }

    /// Whether the run has halted in an accepting configuration.
    pub fn has_accepted(&self) -> bool {
        self.outcome == Some(true)
    }

    /// Applies one transition. Returns the new configuration, or `None`
    /// once the machine has halted.
    pub fn step(&mut self) -> Option<&PdaConfiguration> {
        if self.outcome.is_some() {
            return None;
        }
        let lambda = self
            .dpda
            .has_lambda_transition(self.config.state, self.config.stack.top_symbol());
        if self.config.remaining_input.is_empty() && !lambda {
            self.outcome = Some(self.dpda.accepts_config(&self.config));
            return None;
        }
        match self.dpda.next_configuration(&self.config) {
            None => {
                self.outcome = Some(false);
                None
            }
            Some(next) => {
                self.config = next;
                if self.dpda.accepts_config(&self.config) {
                    self.outcome = Some(true);
                }
                Some(&self.config)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// The classic { aⁿbⁿ | n ≥ 1 } machine.
    fn an_bn() -> Dpda {
        DpdaDef {
            states: vec!["q0", "q1", "q2", "q3"],
            input_symbols: vec!["a", "b"],
            stack_symbols: vec!["0", "1"],
            rules: vec![
                DpdaRule {
                    state: "q0",
                    input: Some("a"),
                    stack_top: "0",
                    next_state: "q1",
                    push: vec!["1", "0"],
                },
                DpdaRule {
                    state: "q1",
                    input: Some("a"),
                    stack_top: "1",
                    next_state: "q1",
                    push: vec!["1", "1"],
                },
                DpdaRule {
                    state: "q1",
                    input: Some("b"),
                    stack_top: "1",
                    next_state: "q2",
                    push: vec![],
                },
                DpdaRule {
                    state: "q2",
                    input: Some("b"),
                    stack_top: "1",
                    next_state: "q2",
                    push: vec![],
                },
                DpdaRule {
                    state: "q2",
                    input: None,
                    stack_top: "0",
                    next_state: "q3",
                    push: vec!["0"],
                },
            ],
            initial_state: "q0",
            initial_stack_symbol: "0",
            final_states: vec!["q3"],
            acceptance_mode: AcceptanceMode::FinalState,
        }
        .try_into()
        .unwrap()
    }

    #[test]
    fn accepts_matched_counts() {
        let dpda = an_bn();
        assert!(dpda.accepts_graphemes("ab"));
        assert!(dpda.accepts_graphemes("aabb"));
        assert!(dpda.accepts_graphemes("aaaabbbb"));
    }

    #[test]
    fn rejects_mismatches() {
        let dpda = an_bn();
        assert!(!dpda.accepts_graphemes(""));
        assert!(!dpda.accepts_graphemes("aaabb"));
        assert!(!dpda.accepts_graphemes("abab"));
        assert!(!dpda.accepts_graphemes("b"));
        assert!(!dpda.accepts_graphemes("aabbb"));
    }

    #[test]
    fn read_input_reports_the_final_configuration() {
        let dpda = an_bn();
        let config = dpda.read_input(&["a", "b"]).unwrap();
        assert_eq!(dpda.state_name(config.state), "q3");
        assert!(config.remaining_input.is_empty());
        assert!(matches!(
            dpda.read_input(&["a"]),
            Err(MachineError::Rejection(_))
        ));
    }

    #[test]
    fn stepwise_run_walks_configurations() {
        let dpda = an_bn();
        let mut eval = dpda.evaluator(&["a", "a", "b", "b"]);
        let mut steps = 0;
        while eval.step().is_some() {
            steps += 1;
        }
        // Four input symbols plus the final lambda move
        assert_eq!(steps, 5);
        assert!(eval.has_accepted());
    }

    #[test]
    fn empty_stack_acceptance() {
        // A single state popping every a
        let dpda: Dpda = DpdaDef {
            states: vec!["q"],
            input_symbols: vec!["a"],
            stack_symbols: vec!["Z"],
            rules: vec![DpdaRule {
                state: "q",
                input: Some("a"),
                stack_top: "Z",
                next_state: "q",
                push: vec![],
            }],
            initial_state: "q",
            initial_stack_symbol: "Z",
            final_states: vec![],
            acceptance_mode: AcceptanceMode::EmptyStack,
        }
        .try_into()
        .unwrap();
        assert!(dpda.accepts_graphemes("a"));
        assert!(!dpda.accepts_graphemes(""));
        assert!(!dpda.accepts_graphemes("aa"));
    }

    #[test]
    fn rejects_nondeterministic_rule_sets() {
        let conflict: Result<Dpda, _> = DpdaDef {
            states: vec!["q"],
            input_symbols: vec!["a"],
            stack_symbols: vec!["Z"],
            rules: vec![
                DpdaRule {
                    state: "q",
                    input: Some("a"),
                    stack_top: "Z",
                    next_state: "q",
                    push: vec!["Z"],
                },
                DpdaRule {
                    state: "q",
                    input: None,
                    stack_top: "Z",
                    next_state: "q",
                    push: vec!["Z"],
                },
            ],
            initial_state: "q",
            initial_stack_symbol: "Z",
            final_states: vec![],
            acceptance_mode: AcceptanceMode::Both,
        }
        .try_into();
        assert!(matches!(conflict, Err(MachineError::Nondeterminism(_))));

        let duplicate: Result<Dpda, _> = DpdaDef {
            states: vec!["q", "r"],
            input_symbols: vec!["a"],
            stack_symbols: vec!["Z"],
            rules: vec![
                DpdaRule {
                    state: "q",
                    input: Some("a"),
                    stack_top: "Z",
                    next_state: "q",
                    push: vec!["Z"],
                },
                DpdaRule {
                    state: "q",
                    input: Some("a"),
                    stack_top: "Z",
                    next_state: "r",
                    push: vec!["Z"],
                },
            ],
            initial_state: "q",
            initial_stack_symbol: "Z",
            final_states: vec![],
            acceptance_mode: AcceptanceMode::Both,
        }
        .try_into();
        assert!(matches!(duplicate, Err(MachineError::Nondeterminism(_))));
    }

    #[test]
    fn rejects_unknown_names() {
        let bad: Result<Dpda, _> = DpdaDef {
            states: vec!["q"],
            input_symbols: vec!["a"],
            stack_symbols: vec!["Z"],
            rules: vec![DpdaRule {
                state: "q",
                input: Some("a"),
                stack_top: "Z",
                next_state: "missing",
                push: vec!["Z"],
            }],
            initial_state: "q",
            initial_stack_symbol: "Z",
            final_states: vec![],
            acceptance_mode: AcceptanceMode::Both,
        }
        .try_into();
        assert!(matches!(bad, Err(MachineError::InvalidState(_))));
    }
}

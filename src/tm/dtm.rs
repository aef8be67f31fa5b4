//! Deterministic Turing machines.

use crate::errors::MachineError;
use crate::tm::{Direction, TmConfiguration, TmTables, TmTape};
use std::collections::{HashMap, HashSet};
use std::rc::Rc;

/// The name-based description of a [Dtm], converted (and validated)
/// with `TryInto`.
#[derive(Debug, Clone)]
pub struct DtmDef<'a> {
    pub states: Vec<&'a str>,
    pub input_symbols: Vec<&'a str>,
    pub tape_symbols: Vec<&'a str>,
    pub rules: Vec<DtmRule<'a>>,
    pub initial_state: &'a str,
    pub blank_symbol: &'a str,
    pub final_states: Vec<&'a str>,
}

/// One transition rule: reading `read` in `state`, write `write`, move
/// the head in `direction` and go to `next_state`.
#[derive(Debug, Clone)]
pub struct DtmRule<'a> {
    pub state: &'a str,
    pub read: &'a str,
    pub next_state: &'a str,
    pub write: &'a str,
    pub direction: Direction,
}

/// A deterministic Turing machine: at most one transition per
/// (state, tape symbol) pair. The machine halts accepting when it
/// enters a final state and halts rejecting when no transition applies.
#[derive(Debug, Clone)]
pub struct Dtm {
    state_names: Vec<Rc<str>>,
    input_symbols: Rc<[Rc<str>]>,
    tape_symbols: Rc<[Rc<str>]>,
    transitions: HashMap<(usize, Rc<str>), (usize, Rc<str>, Direction)>,
    initial_state: usize,
    blank_symbol: Rc<str>,
    final_states: HashSet<usize>,
}

impl<'a> TryFrom<DtmDef<'a>> for Dtm {
    type Error = MachineError;

    fn try_from(def: DtmDef<'a>) -> Result<Self, Self::Error> {
        let tables = TmTables::build(
            &def.states,
            &def.input_symbols,
            &def.tape_symbols,
            def.initial_state,
            def.blank_symbol,
            &def.final_states,
        )?;

        let mut transitions = HashMap::new();
        for rule in &def.rules {
            let state = tables.state_index(rule.state)?;
            tables.check_rule_source(state)?;
            let next_state = tables.state_index(rule.next_state)?;
            let read = tables.check_tape_symbol(rule.read)?;
            let write = tables.check_tape_symbol(rule.write)?;
            if transitions
                .insert((state, read), (next_state, write, rule.direction))
                .is_some()
            {
                return Err(MachineError::Nondeterminism(format!(
                    "state '{}' has two transitions for tape symbol '{}'",
                    rule.state, rule.read
                )));
            }
        }

        Ok(Dtm {
            state_names: tables.state_names,
            input_symbols: tables.input_symbols,
            tape_symbols: tables.tape_symbols,
            transitions,
            initial_state: tables.initial_state,
            blank_symbol: tables.blank_symbol,
            final_states: tables.final_states,
        })
    }
}

impl Dtm {
    /// Gets the state names of this machine.
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

    pub fn tape_symbols(&self) -> &[Rc<str>] {
        &self.tape_symbols
    }

    pub fn blank_symbol(&self) -> &str {
        &self.blank_symbol
    }

    /// Iterates over every transition exactly once, as
    /// (state, read) → (next state, write, direction).
    pub fn iter_transitions(
        &self,
    ) -> impl Iterator<Item = (usize, &str, usize, &str, Direction)> + '_ {
        self.transitions
            .iter()
            .map(|((state, read), (next, write, direction))| {
                (*state, read.as_ref(), *next, write.as_ref(), *direction)
            })
    }

    /// An evaluator for stepwise execution over the given input string
    /// (split into graphemes onto the tape).
    pub fn evaluator(&self, input: &str) -> DtmEvaluator<'_> {
        DtmEvaluator {
            dtm: self,
            config: TmConfiguration {
                state: self.initial_state,
                tape: TmTape::from_input(input, self.blank_symbol.clone()),
            },
            outcome: None,
        }
    }

    /// Runs the machine to halting and returns the accepting
    /// configuration, or a [MachineError::Rejection]. Diverging machines
    /// never return.
    pub fn read_input(&self, input: &str) -> Result<TmConfiguration, MachineError> {
        let mut eval = self.evaluator(input);
        while eval.step().is_some() {}
        if eval.has_accepted() {
            Ok(eval.config().clone())
        } else {
            Err(MachineError::Rejection(format!(
                "the DTM halted in the non-final state '{}' reading '{}'",
                self.state_name(eval.config().state),
                eval.config().tape.read()
            )))
        }
    }

    /// Checks if this machine accepts the given input.
    pub fn accepts(&self, input: &str) -> bool {
        let mut eval = self.evaluator(input);
        while eval.step().is_some() {}
        eval.has_accepted()
    }
}

/// Stepwise execution of a [Dtm]: each [step](DtmEvaluator::step)
/// applies one transition (write, move, change state).
#[derive(Debug, Clone)]
pub struct DtmEvaluator<'a> {
    dtm: &'a Dtm,
    config: TmConfiguration,
    outcome: Option<bool>,
}

impl DtmEvaluator<'_> {
    /// The current configuration.
    pub fn config(&self) -> &TmConfiguration {
        &self.config
    }

    /// Whether the run has halted (accepting or not).
    pub fn has_halted(&self) -> bool {
        self.outcome.is_some()
    }

    /// Whether the run has halted accepting.
    pub fn has_accepted(&self) -> bool {
        self.outcome == Some(true)
    }

    /// Applies one transition. Returns the new configuration, or `None`
    /// once the machine has halted.
    pub fn step(&mut self) -> Option<&TmConfiguration> {
        if self.outcome.is_some() {
            return None;
        }
        if self.dtm.final_states.contains(&self.config.state) {
            self.outcome = Some(true);
            return None;
        }
        let key = (self.config.state, self.config.tape.read_symbol());
        match self.dtm.transitions.get(&key) {
            None => {
                self.outcome = Some(false);
                None
            }
            Some((next_state, write, direction)) => {
                self.config = TmConfiguration {
                    state: *next_state,
                    tape: self.config.tape.write(write.clone()).moved(*direction),
                };
                Some(&self.config)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// { 0ⁿ1ⁿ | n ≥ 0 }, replacing matched 0s with x and 1s with y.
    fn zeros_then_ones() -> Dtm {
        DtmDef {
            states: vec!["q0", "q1", "q2", "q3", "q4"],
            input_symbols: vec!["0", "1"],
            tape_symbols: vec!["0", "1", "x", "y", "."],
            rules: vec![
                DtmRule {
                    state: "q0",
                    read: "0",
                    next_state: "q1",
                    write: "x",
                    direction: Direction::Right,
                },
                DtmRule {
                    state: "q0",
                    read: "y",
                    next_state: "q3",
                    write: "y",
                    direction: Direction::Right,
                },
                DtmRule {
                    state: "q0",
                    read: ".",
                    next_state: "q4",
                    write: ".",
                    direction: Direction::Stay,
                },
                DtmRule {
                    state: "q1",
                    read: "0",
                    next_state: "q1",
                    write: "0",
                    direction: Direction::Right,
                },
                DtmRule {
                    state: "q1",
                    read: "y",
                    next_state: "q1",
                    write: "y",
                    direction: Direction::Right,
                },
                DtmRule {
                    state: "q1",
                    read: "1",
                    next_state: "q2",
                    write: "y",
                    direction: Direction::Left,
                },
                DtmRule {
                    state: "q2",
                    read: "0",
                    next_state: "q2",
                    write: "0",
                    direction: Direction::Left,
                },
                DtmRule {
                    state: "q2",
                    read: "y",
                    next_state: "q2",
                    write: "y",
                    direction: Direction::Left,
                },
                DtmRule {
                    state: "q2",
                    read: "x",
                    next_state: "q0",
                    write: "x",
                    direction: Direction::Right,
                },
                DtmRule {
                    state: "q3",
                    read: "y",
                    next_state: "q3",
                    write: "y",
                    direction: Direction::Right,
                },
                DtmRule {
                    state: "q3",
                    read: ".",
                    next_state: "q4",
                    write: ".",
                    direction: Direction::Stay,
                },
            ],
            initial_state: "q0",
            blank_symbol: ".",
            final_states: vec!["q4"],
        }
        .try_into()
        .unwrap()
    }

    #[test]
    fn accepts_balanced_words() {
        let dtm = zeros_then_ones();
        for word in ["", "01", "0011", "000111"] {
            assert!(dtm.accepts(word), "{word:?} should be accepted");
        }
    }

    #[test]
    fn rejects_unbalanced_words() {
        let dtm = zeros_then_ones();
        for word in ["0", "011", "0001", "10", "1"] {
            assert!(!dtm.accepts(word), "{word:?} should be rejected");
        }
    }

    #[test]
    fn leaves_the_tape_fully_marked() {
        let dtm = zeros_then_ones();
        let config = dtm.read_input("0011").unwrap();
        assert_eq!(config.tape.contents(), "xxyy.");
        assert_eq!(dtm.state_name(config.state), "q4");
    }

    #[test]
    fn stepwise_run_yields_each_configuration() {
        let dtm = zeros_then_ones();
        let mut eval = dtm.evaluator("01");
        let mut tapes = vec![eval.config().tape.contents()];
        while let Some(config) = eval.step() {
            tapes.push(config.tape.contents());
        }
        assert!(eval.has_accepted());
        assert_eq!(tapes.first().unwrap(), "01");
        assert_eq!(tapes.last().unwrap(), "xy.");
    }

    #[test]
    fn validation_guards_the_tm_invariants() {
        // Initial state must not be final
        let bad: Result<Dtm, _> = DtmDef {
            states: vec!["q0"],
            input_symbols: vec!["a"],
            tape_symbols: vec!["a", "."],
            rules: vec![],
            initial_state: "q0",
            blank_symbol: ".",
            final_states: vec!["q0"],
        }
        .try_into();
        assert!(matches!(bad, Err(MachineError::InitialState(_))));

        // Final states have no outgoing transitions
        let bad: Result<Dtm, _> = DtmDef {
            states: vec!["q0", "qf"],
            input_symbols: vec!["a"],
            tape_symbols: vec!["a", "."],
            rules: vec![DtmRule {
                state: "qf",
                read: "a",
                next_state: "q0",
                write: "a",
                direction: Direction::Right,
            }],
            initial_state: "q0",
            blank_symbol: ".",
            final_states: vec!["qf"],
        }
        .try_into();
        assert!(matches!(bad, Err(MachineError::FinalState(_))));

        // Blank symbol must not be an input symbol
        let bad: Result<Dtm, _> = DtmDef {
            states: vec!["q0"],
            input_symbols: vec!["a"],
            tape_symbols: vec!["a"],
            rules: vec![],
            initial_state: "q0",
            blank_symbol: "a",
            final_states: vec![],
        }
        .try_into();
        assert!(matches!(bad, Err(MachineError::InvalidSymbol(_))));

        // Two rules on one (state, symbol) pair
        let bad: Result<Dtm, _> = DtmDef {
            states: vec!["q0", "q1"],
            input_symbols: vec!["a"],
            tape_symbols: vec!["a", "."],
            rules: vec![
                DtmRule {
                    state: "q0",
                    read: "a",
                    next_state: "q0",
                    write: "a",
                    direction: Direction::Right,
                },
                DtmRule {
                    state: "q0",
                    read: "a",
                    next_state: "q1",
                    write: "a",
                    direction: Direction::Left,
                },
            ],
            initial_state: "q0",
            blank_symbol: ".",
            final_states: vec![],
        }
        .try_into();
        assert!(matches!(bad, Err(MachineError::Nondeterminism(_))));
    }
}

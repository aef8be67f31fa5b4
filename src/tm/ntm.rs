//! Nondeterministic Turing machines.

use crate::errors::MachineError;
use crate::tm::{Direction, TmConfiguration, TmTables, TmTape};
use std::collections::{HashMap, HashSet};
use std::rc::Rc;

/// The name-based description of an [Ntm], converted (and validated)
/// with `TryInto`. Rules may overlap.
#[derive(Debug, Clone)]
pub struct NtmDef<'a> {
    pub states: Vec<&'a str>,
    pub input_symbols: Vec<&'a str>,
    pub tape_symbols: Vec<&'a str>,
    pub rules: Vec<NtmRule<'a>>,
    pub initial_state: &'a str,
    pub blank_symbol: &'a str,
    pub final_states: Vec<&'a str>,
}

/// One transition rule, as for [crate::tm::DtmRule].
#[derive(Debug, Clone)]
pub struct NtmRule<'a> {
    pub state: &'a str,
    pub read: &'a str,
    pub next_state: &'a str,
    pub write: &'a str,
    pub direction: Direction,
}

/// A nondeterministic Turing machine. Execution explores the frontier
/// of configurations in parallel and accepts on the first accepting
/// one; it rejects when the frontier runs dry.
#[derive(Debug, Clone)]
pub struct Ntm {
    state_names: Vec<Rc<str>>,
    input_symbols: Rc<[Rc<str>]>,
    tape_symbols: Rc<[Rc<str>]>,
    transitions: HashMap<(usize, Rc<str>), Vec<(usize, Rc<str>, Direction)>>,
    initial_state: usize,
    blank_symbol: Rc<str>,
    final_states: HashSet<usize>,
}

impl<'a> TryFrom<NtmDef<'a>> for Ntm {
    type Error = MachineError;

    fn try_from(def: NtmDef<'a>) -> Result<Self, Self::Error> {
        let tables = TmTables::build(
            &def.states,
            &def.input_symbols,
            &def.tape_symbols,
            def.initial_state,
            def.blank_symbol,
            &def.final_states,
        )?;

        let mut transitions: HashMap<(usize, Rc<str>), Vec<(usize, Rc<str>, Direction)>> =
            HashMap::new();
        for rule in &def.rules {
            let state = tables.state_index(rule.state)?;
            tables.check_rule_source(state)?;
            let next_state = tables.state_index(rule.next_state)?;
            let read = tables.check_tape_symbol(rule.read)?;
            let write = tables.check_tape_symbol(rule.write)?;
            transitions
                .entry((state, read))
                .or_default()
                .push((next_state, write, rule.direction));
        }

        Ok(Ntm {
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

impl Ntm {
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
        self.transitions.iter().flat_map(|((state, read), results)| {
            results.iter().map(move |(next, write, direction)| {
                (*state, read.as_ref(), *next, write.as_ref(), *direction)
            })
        })
    }

    fn next_configurations(&self, config: &TmConfiguration) -> Vec<TmConfiguration> {
        let key = (config.state, config.tape.read_symbol());
        self.transitions
            .get(&key)
            .map(Vec::as_slice)
            .unwrap_or(&[])
            .iter()
            .map(|(next_state, write, direction)| TmConfiguration {
                state: *next_state,
                tape: config.tape.write(write.clone()).moved(*direction),
            })
            .collect()
    }

    /// An evaluator for stepwise execution over the given input.
    pub fn evaluator(&self, input: &str) -> NtmEvaluator<'_> {
        let initial = TmConfiguration {
            state: self.initial_state,
            tape: TmTape::from_input(input, self.blank_symbol.clone()),
        };
        NtmEvaluator {
            ntm: self,
            frontier: HashSet::from([initial]),
            accepted: None,
            outcome: None,
        }
    }

    /// Runs the machine to halting and returns the first accepting
    /// configuration, or a [MachineError::Rejection]. Diverging
    /// machines never return.
    pub fn read_input(&self, input: &str) -> Result<TmConfiguration, MachineError> {
        let mut eval = self.evaluator(input);
        while eval.step().is_some() {}
        eval.accepting_configuration().cloned().ok_or_else(|| {
            MachineError::Rejection("the NTM did not reach an accepting configuration".to_string())
        })
    }

    /// Checks if this machine accepts the given input.
    pub fn accepts(&self, input: &str) -> bool {
        let mut eval = self.evaluator(input);
        while eval.step().is_some() {}
        eval.has_accepted()
    }
}

/// Stepwise execution of an [Ntm]: each [step](NtmEvaluator::step)
/// expands the whole frontier by one move.
#[derive(Debug, Clone)]
pub struct NtmEvaluator<'a> {
    ntm: &'a Ntm,
    frontier: HashSet<TmConfiguration>,
    accepted: Option<TmConfiguration>,
    outcome: Option<bool>,
}

impl NtmEvaluator<'_> {
    /// The current frontier of configurations.
    pub fn configs(&self) -> &HashSet<TmConfiguration> {
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
    pub fn accepting_configuration(&self) -> Option<&TmConfiguration> {
        self.accepted.as_ref()
    }

    /// Expands the frontier one move. Returns the new frontier, or
    /// `None` once the machine has halted.
    pub fn step(&mut self) -> Option<&HashSet<TmConfiguration>> {
        if self.outcome.is_some() {
            return None;
        }
        if let Some(accepting) = self
            .frontier
            .iter()
            .find(|config| self.ntm.final_states.contains(&config.state))
        {
            self.accepted = Some(accepting.clone());
            self.outcome = Some(true);
            return None;
        }
        let mut next = HashSet::new();
        for config in &self.frontier {
            next.extend(self.ntm.next_configurations(config));
        }
        if next.is_empty() {
            self.outcome = Some(false);
            return None;
        }
        self.frontier = next;
        Some(&self.frontier)
    }
}

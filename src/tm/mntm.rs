//! Multitape nondeterministic Turing machines, and their single-tape
//! simulation.

use crate::errors::MachineError;
use crate::tm::{Direction, TmConfiguration, TmTables, TmTape};
use std::collections::{HashMap, HashSet, VecDeque};
use std::rc::Rc;

/// The name-based description of an [Mntm], converted (and validated)
/// with `TryInto`.
#[derive(Debug, Clone)]
pub struct MntmDef<'a> {
    pub states: Vec<&'a str>,
    pub input_symbols: Vec<&'a str>,
    pub tape_symbols: Vec<&'a str>,
    pub n_tapes: usize,
    pub rules: Vec<MntmRule<'a>>,
    pub initial_state: &'a str,
    pub blank_symbol: &'a str,
    pub final_states: Vec<&'a str>,
}

/// One transition rule: reading the tuple `reads` (one symbol per tape)
/// in `state`, move to `next_state` and apply one (write, direction)
/// pair per tape.
#[derive(Debug, Clone)]
pub struct MntmRule<'a> {
    pub state: &'a str,
    pub reads: Vec<&'a str>,
    pub next_state: &'a str,
    pub moves: Vec<(&'a str, Direction)>,
}

/// A multitape configuration: the current state (by index) and one tape
/// per track.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MtmConfiguration {
    pub state: usize,
    pub tapes: Vec<TmTape>,
}

/// A multitape nondeterministic Turing machine: transitions are keyed
/// by the tuple of symbols under the `n_tapes` heads and produce one
/// (write, move) pair per tape.
#[derive(Debug, Clone)]
pub struct Mntm {
    state_names: Vec<Rc<str>>,
    input_symbols: Rc<[Rc<str>]>,
    tape_symbols: Rc<[Rc<str>]>,
    n_tapes: usize,
    transitions: HashMap<(usize, Vec<Rc<str>>), Vec<(usize, Vec<(Rc<str>, Direction)>)>>,
    initial_state: usize,
    blank_symbol: Rc<str>,
    final_states: HashSet<usize>,
}

impl<'a> TryFrom<MntmDef<'a>> for Mntm {
    type Error = MachineError;

    fn try_from(def: MntmDef<'a>) -> Result<Self, Self::Error> {
        assert!(def.n_tapes >= 1, "a multitape machine needs a tape");
        let tables = TmTables::build(
            &def.states,
            &def.input_symbols,
            &def.tape_symbols,
            def.initial_state,
            def.blank_symbol,
            &def.final_states,
        )?;

        let mut transitions: HashMap<(usize, Vec<Rc<str>>), Vec<(usize, Vec<(Rc<str>, Direction)>)>> =
            HashMap::new();
        for rule in &def.rules {
            let state = tables.state_index(rule.state)?;
            tables.check_rule_source(state)?;
            let next_state = tables.state_index(rule.next_state)?;
            if rule.reads.len() != def.n_tapes || rule.moves.len() != def.n_tapes {
                return Err(MachineError::InvalidSymbol(format!(
                    "a transition of state '{}' does not have arity {}",
                    rule.state, def.n_tapes
                )));
            }
            let reads = rule
                .reads
                .iter()
                .map(|symbol| tables.check_tape_symbol(symbol))
                .collect::<Result<Vec<_>, _>>()?;
            let moves = rule
                .moves
                .iter()
                .map(|(symbol, direction)| {
                    tables
                        .check_tape_symbol(symbol)
                        .map(|symbol| (symbol, *direction))
                })
                .collect::<Result<Vec<_>, _>>()?;
            transitions
                .entry((state, reads))
                .or_default()
                .push((next_state, moves));
        }

        Ok(Mntm {
            state_names: tables.state_names,
            input_symbols: tables.input_symbols,
            tape_symbols: tables.tape_symbols,
            n_tapes: def.n_tapes,
            transitions,
            initial_state: tables.initial_state,
            blank_symbol: tables.blank_symbol,
            final_states: tables.final_states,
        })
    }
}

impl Mntm {
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

    pub fn n_tapes(&self) -> usize {
        self.n_tapes
    }

    /// Iterates over every transition exactly once, as
    /// (state, reads) → (next state, (write, move) pairs).
    pub fn iter_transitions(
        &self,
    ) -> impl Iterator<Item = (usize, &[Rc<str>], usize, &[(Rc<str>, Direction)])> + '_ {
        self.transitions.iter().flat_map(|((state, reads), results)| {
            results
                .iter()
                .map(move |(next, moves)| (*state, reads.as_slice(), *next, moves.as_slice()))
        })
    }

    fn initial_configuration(&self, input: &str) -> MtmConfiguration {
        let mut tapes = vec![TmTape::from_input(input, self.blank_symbol.clone())];
        for _ in 1..self.n_tapes {
            tapes.push(TmTape::from_input("", self.blank_symbol.clone()));
        }
        MtmConfiguration {
            state: self.initial_state,
            tapes,
        }
    }

    fn next_configurations(&self, config: &MtmConfiguration) -> Vec<MtmConfiguration> {
        let reads: Vec<Rc<str>> = config.tapes.iter().map(TmTape::read_symbol).collect();
        self.transitions
            .get(&(config.state, reads))
            .map(Vec::as_slice)
            .unwrap_or(&[])
            .iter()
            .map(|(next_state, moves)| MtmConfiguration {
                state: *next_state,
                tapes: config
                    .tapes
                    .iter()
                    .zip(moves)
                    .map(|(tape, (write, direction))| {
                        tape.write(write.clone()).moved(*direction)
                    })
                    .collect(),
            })
            .collect()
    }

    /// An evaluator for stepwise execution over the given input (loaded
    /// on the first tape; the rest start blank).
    pub fn evaluator(&self, input: &str) -> MntmEvaluator<'_> {
        MntmEvaluator {
            mntm: self,
            queue: VecDeque::from([self.initial_configuration(input)]),
            accepted: None,
            outcome: None,
        }
    }

    /// Runs the machine to halting and returns the first accepting
    /// configuration, or a [MachineError::Rejection]. Diverging
    /// machines never return.
    pub fn read_input(&self, input: &str) -> Result<MtmConfiguration, MachineError> {
        let mut eval = self.evaluator(input);
        while eval.step().is_some() {}
        eval.accepting_configuration().cloned().ok_or_else(|| {
            MachineError::Rejection(
                "the multitape NTM did not reach an accepting configuration".to_string(),
            )
        })
    }

    /// Checks if this machine accepts the given input.
    pub fn accepts(&self, input: &str) -> bool {
        let mut eval = self.evaluator(input);
        while eval.step().is_some() {}
        eval.has_accepted()
    }

    /// Simulates this machine on a single tape: the tapes are laid out
    /// side by side separated by `_`, with a `^` marker following the
    /// cell each virtual head is on. Each simulated step reads all
    /// virtual heads, applies one machine transition, and rewrites every
    /// virtual window in place, shifting the tape when a virtual head
    /// crosses its region boundary. The simulation accepts exactly when
    /// the multitape machine does, at a quadratic step overhead.
    pub fn simulate_as_ntm(&self, input: &str) -> Result<TmConfiguration, MachineError> {
        let head: Rc<str> = Rc::from("^");
        let separator: Rc<str> = Rc::from("_");
        for reserved in [&head, &separator] {
            if self.tape_symbols.iter().any(|s| s == reserved) {
                return Err(MachineError::InvalidSymbol(format!(
                    "tape symbol '{reserved}' is reserved by the single-tape simulation"
                )));
            }
        }

        let initial = {
            let mut extended: Vec<Rc<str>> = Vec::new();
            let multi = self.initial_configuration(input);
            for tape in &multi.tapes {
                let cells: Vec<Rc<str>> = tape.iter().map(Rc::from).collect();
                extended.push(cells[0].clone());
                extended.push(head.clone());
                extended.extend(cells[1..].iter().cloned());
                extended.push(separator.clone());
            }
            extended
        };

        let mut queue: VecDeque<(usize, Vec<Rc<str>>)> =
            VecDeque::from([(self.initial_state, initial)]);
        let mut seen: HashSet<(usize, Vec<Rc<str>>)> = queue.iter().cloned().collect();

        while let Some((state, tape)) = queue.pop_front() {
            if self.final_states.contains(&state) {
                return Ok(TmConfiguration {
                    state,
                    tape: TmTape::new(tape, self.blank_symbol.clone(), 0),
                });
            }
            let heads = Self::virtual_heads(&tape, &head);
            let options = self
                .transitions
                .get(&(state, heads))
                .map(Vec::as_slice)
                .unwrap_or(&[]);
            for (next_state, moves) in options {
                let next_tape = self.apply_virtual_moves(&tape, moves, &head, &separator);
                let next = (*next_state, next_tape);
                if seen.insert(next.clone()) {
                    queue.push_back(next);
                }
            }
        }
        Err(MachineError::Rejection(
            "the multitape NTM did not reach an accepting configuration".to_string(),
        ))
    }

    /// The symbols under the virtual heads: each cell directly before a
    /// head marker, in tape order.
    fn virtual_heads(tape: &[Rc<str>], head: &Rc<str>) -> Vec<Rc<str>> {
        tape.iter()
            .enumerate()
            .filter(|(_, cell)| *cell == head)
            .map(|(idx, _)| tape[idx - 1].clone())
            .collect()
    }

    /// Applies one (write, move) pair per virtual tape to the extended
    /// tape, walking it left to right. A head crossing its region
    /// boundary inserts a blank cell, shifting the rest of the tape.
    fn apply_virtual_moves(
        &self,
        tape: &[Rc<str>],
        moves: &[(Rc<str>, Direction)],
        head: &Rc<str>,
        separator: &Rc<str>,
    ) -> Vec<Rc<str>> {
        let mut tape = tape.to_vec();
        let mut i = 0usize;
        for (write, direction) in moves {
            let mut executing = true;
            while executing {
                if tape[i] == *head {
                    tape[i - 1] = write.clone();
                    tape.remove(i);
                    match direction {
                        Direction::Right => i += 1,
                        Direction::Left => i -= 1,
                        Direction::Stay => {}
                    }
                    let crossed = i == 0 || tape[i - 1] == *separator;
                    if crossed {
                        match direction {
                            Direction::Right | Direction::Stay => {
                                // Passed the right end of the region
                                i -= 1;
                                tape.insert(i, self.blank_symbol.clone());
                                tape.insert(i + 1, head.clone());
                                i += 1;
                            }
                            Direction::Left => {
                                // Passed the left end of the region
                                tape.insert(i, self.blank_symbol.clone());
                                tape.insert(i + 1, head.clone());
                                i += 1;
                            }
                        }
                    } else {
                        tape.insert(i, head.clone());
                    }
                } else if tape[i] == *separator {
                    executing = false;
                }
                i += 1;
            }
        }
        tape
    }
}

/// Stepwise execution of an [Mntm]: the queue of configurations is
/// explored breadth-first, one configuration per
/// [step](MntmEvaluator::step).
#[derive(Debug, Clone)]
pub struct MntmEvaluator<'a> {
    mntm: &'a Mntm,
    queue: VecDeque<MtmConfiguration>,
    accepted: Option<MtmConfiguration>,
    outcome: Option<bool>,
}

impl MntmEvaluator<'_> {
    /// Whether the run has halted (accepting or not).
    pub fn has_halted(&self) -> bool {
        self.outcome.is_some()
    }

    /// Whether the run has halted accepting.
    pub fn has_accepted(&self) -> bool {
        self.outcome == Some(true)
    }

    /// The accepting configuration, once the run has halted accepting.
    pub fn accepting_configuration(&self) -> Option<&MtmConfiguration> {
        self.accepted.as_ref()
    }

    /// Processes the next queued configuration: either it accepts, or
    /// its successors join the queue. Returns the processed
    /// configuration, or `None` once the machine has halted.
    pub fn step(&mut self) -> Option<MtmConfiguration> {
        if self.outcome.is_some() {
            return None;
        }
        match self.queue.pop_front() {
            None => {
                self.outcome = Some(false);
                None
            }
            Some(config) => {
                if self.mntm.final_states.contains(&config.state) {
                    self.accepted = Some(config.clone());
                    self.outcome = Some(true);
                    return Some(config);
                }
                self.queue.extend(self.mntm.next_configurations(&config));
                Some(config)
            }
        }
    }
}

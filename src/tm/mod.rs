//! # Turing machines
//! Deterministic ([Dtm]), nondeterministic ([Ntm]) and multitape
//! nondeterministic ([Mntm]) Turing machines over the immutable
//! [TmTape]. Machines are described by name-based definitions and
//! validated on conversion: the input symbols must be a proper subset of
//! the tape symbols, the blank symbol a tape symbol outside the input
//! symbols, the initial state must not be final, and final states must
//! have no outgoing transitions.
//!
//! ```
//! use machina::tm::{Dtm, DtmDef, DtmRule, Direction};
//!
//! // Flip every a to b until the first blank
//! let dtm: Dtm = DtmDef {
//!     states: vec!["q0", "done"],
//!     input_symbols: vec!["a"],
//!     tape_symbols: vec!["a", "b", "."],
//!     rules: vec![
//!         DtmRule { state: "q0", read: "a", next_state: "q0", write: "b", direction: Direction::Right },
//!         DtmRule { state: "q0", read: ".", next_state: "done", write: ".", direction: Direction::Stay },
//!     ],
//!     initial_state: "q0",
//!     blank_symbol: ".",
//!     final_states: vec!["done"],
//! }
//! .try_into()
//! .unwrap();
//!
//! let config = dtm.read_input("aaa").unwrap();
//! assert_eq!(config.tape.contents(), "bbb.");
//! ```

use crate::errors::MachineError;
use std::collections::HashSet;
use std::rc::Rc;

pub mod dtm;
pub mod mntm;
pub mod ntm;
pub mod tape;

pub use dtm::{Dtm, DtmDef, DtmEvaluator, DtmRule};
pub use mntm::{Mntm, MntmDef, MntmEvaluator, MntmRule, MtmConfiguration};
pub use ntm::{Ntm, NtmDef, NtmEvaluator, NtmRule};
pub use tape::{Direction, TmTape};

/// A single-tape Turing machine configuration: the current state (by
/// index) and the tape.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TmConfiguration {
    pub state: usize,
    pub tape: TmTape,
}

/// Shared validation of the name-based parts of a Turing machine
/// definition.
pub(crate) struct TmTables {
    pub state_names: Vec<Rc<str>>,
    pub input_symbols: Rc<[Rc<str>]>,
    pub tape_symbols: Rc<[Rc<str>]>,
    pub initial_state: usize,
    pub blank_symbol: Rc<str>,
    pub final_states: HashSet<usize>,
}

impl TmTables {
    pub(crate) fn build(
        states: &[&str],
        input_symbols: &[&str],
        tape_symbols: &[&str],
        initial_state: &str,
        blank_symbol: &str,
        final_states: &[&str],
    ) -> Result<TmTables, MachineError> {
        let mut seen = HashSet::new();
        for state in states {
            if !seen.insert(*state) {
                return Err(MachineError::InvalidState(format!(
                    "state '{state}' is defined multiple times"
                )));
            }
        }
        for symbols in [input_symbols, tape_symbols] {
            let mut seen = HashSet::new();
            for symbol in symbols {
                if !seen.insert(*symbol) {
                    return Err(MachineError::InvalidSymbol(format!(
                        "'{symbol}' appears twice in a symbol set"
                    )));
                }
            }
        }

        for symbol in input_symbols {
            if !tape_symbols.contains(symbol) {
                return Err(MachineError::MissingSymbol(format!(
                    "input symbol '{symbol}' is missing from the tape symbols"
                )));
            }
        }
        if !tape_symbols.contains(&blank_symbol) {
            return Err(MachineError::InvalidSymbol(format!(
                "blank symbol '{blank_symbol}' is not a tape symbol"
            )));
        }
        if input_symbols.contains(&blank_symbol) {
            return Err(MachineError::InvalidSymbol(format!(
                "blank symbol '{blank_symbol}' must not be an input symbol"
            )));
        }

        let state_index = |name: &str| -> Result<usize, MachineError> {
            states
                .iter()
                .position(|s| *s == name)
                .ok_or_else(|| MachineError::InvalidState(format!("'{name}' is not a state")))
        };
        let initial_state = state_index(initial_state)?;
        let final_states = final_states
            .iter()
            .map(|name| state_index(name))
            .collect::<Result<HashSet<_>, _>>()?;
        if final_states.contains(&initial_state) {
            return Err(MachineError::InitialState(format!(
                "initial state '{}' cannot be a final state",
                states[initial_state]
            )));
        }

        Ok(TmTables {
            state_names: states.iter().map(|s| Rc::from(*s)).collect(),
            input_symbols: input_symbols.iter().map(|s| Rc::from(*s)).collect(),
            tape_symbols: tape_symbols.iter().map(|s| Rc::from(*s)).collect(),
            initial_state,
            blank_symbol: Rc::from(blank_symbol),
            final_states,
        })
    }

    pub(crate) fn state_index(&self, name: &str) -> Result<usize, MachineError> {
        self.state_names
            .iter()
            .position(|s| s.as_ref() == name)
            .ok_or_else(|| MachineError::InvalidState(format!("'{name}' is not a state")))
    }

    pub(crate) fn check_tape_symbol(&self, symbol: &str) -> Result<Rc<str>, MachineError> {
        self.tape_symbols
            .iter()
            .find(|s| s.as_ref() == symbol)
            .cloned()
            .ok_or_else(|| {
                MachineError::InvalidSymbol(format!("'{symbol}' is not a tape symbol"))
            })
    }

    /// Rejects a rule whose source state is final.
    pub(crate) fn check_rule_source(&self, state: usize) -> Result<(), MachineError> {
        if self.final_states.contains(&state) {
            return Err(MachineError::FinalState(format!(
                "final state '{}' has transitions defined",
                self.state_names[state]
            )));
        }
        Ok(())
    }
}

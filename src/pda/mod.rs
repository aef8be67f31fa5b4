//! # Pushdown automata
//! Deterministic ([Dpda]) and nondeterministic ([Npda]) pushdown
//! automata over an immutable [PdaStack]. Machines are described by a
//! [DpdaDef]/[NpdaDef] rule list and validated on conversion; execution
//! is stepwise over [PdaConfiguration]s (state, remaining input, stack),
//! with three acceptance modes.
//!
//! ```
//! use machina::pda::{AcceptanceMode, Dpda, DpdaDef, DpdaRule};
//!
//! // { aⁿbⁿ | n ≥ 1 }
//! let dpda: Dpda = DpdaDef {
//!     states: vec!["q0", "q1", "q2", "q3"],
//!     input_symbols: vec!["a", "b"],
//!     stack_symbols: vec!["0", "1"],
//!     rules: vec![
//!         DpdaRule { state: "q0", input: Some("a"), stack_top: "0", next_state: "q1", push: vec!["1", "0"] },
//!         DpdaRule { state: "q1", input: Some("a"), stack_top: "1", next_state: "q1", push: vec!["1", "1"] },
//!         DpdaRule { state: "q1", input: Some("b"), stack_top: "1", next_state: "q2", push: vec![] },
//!         DpdaRule { state: "q2", input: Some("b"), stack_top: "1", next_state: "q2", push: vec![] },
//!         DpdaRule { state: "q2", input: None, stack_top: "0", next_state: "q3", push: vec!["0"] },
//!     ],
//!     initial_state: "q0",
//!     initial_stack_symbol: "0",
//!     final_states: vec!["q3"],
//!     acceptance_mode: AcceptanceMode::FinalState,
//! }
//! .try_into()
//! .unwrap();
//!
//! assert!(dpda.accepts_graphemes("ab"));
//! assert!(dpda.accepts_graphemes("aabb"));
//! assert!(!dpda.accepts_graphemes(""));
//! assert!(!dpda.accepts_graphemes("abab"));
//! ```

use crate::errors::MachineError;
use std::collections::HashSet;
use std::fmt;
use std::rc::Rc;
use std::str::FromStr;

pub mod dpda;
pub mod npda;
pub mod stack;

pub use dpda::{Dpda, DpdaDef, DpdaEvaluator, DpdaRule};
pub use npda::{Npda, NpdaDef, NpdaEvaluator, NpdaRule};
pub use stack::PdaStack;

/// When a PDA accepts: in a final state, with an empty stack, or either.
/// Input must be exhausted in every mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AcceptanceMode {
    FinalState,
    EmptyStack,
    #[default]
    Both,
}

impl FromStr for AcceptanceMode {
    type Err = MachineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "final_state" => Ok(AcceptanceMode::FinalState),
            "empty_stack" => Ok(AcceptanceMode::EmptyStack),
            "both" => Ok(AcceptanceMode::Both),
            other => Err(MachineError::InvalidAcceptanceMode(format!(
                "'{other}' is not an acceptance mode"
            ))),
        }
    }
}

impl fmt::Display for AcceptanceMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            AcceptanceMode::FinalState => "final_state",
            AcceptanceMode::EmptyStack => "empty_stack",
            AcceptanceMode::Both => "both",
        })
    }
}

/// The complete runtime state of a PDA: current state (by index),
/// remaining input, and stack.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PdaConfiguration {
    pub state: usize,
    pub remaining_input: Vec<Rc<str>>,
    pub stack: PdaStack,
}

impl PdaConfiguration {
    pub(crate) fn initial(state: usize, input: &[&str], stack_symbol: Rc<str>) -> Self {
        PdaConfiguration {
            state,
            remaining_input: input.iter().map(|s| Rc::from(*s)).collect(),
            stack: PdaStack::new(vec![stack_symbol]),
        }
    }

    /// A configuration with the first input symbol consumed (or the
    /// input untouched for an epsilon move) and the stack top replaced.
    pub(crate) fn advanced(
        &self,
        state: usize,
        consume_input: bool,
        push: &[Rc<str>],
    ) -> PdaConfiguration {
        PdaConfiguration {
            state,
            remaining_input: if consume_input {
                self.remaining_input[1..].to_vec()
            } else {
                self.remaining_input.clone()
            },
            stack: self.stack.replace(push),
        }
    }
}

pub(crate) fn accepts_configuration(
    config: &PdaConfiguration,
    mode: AcceptanceMode,
    final_states: &HashSet<usize>,
) -> bool {
    if !config.remaining_input.is_empty() {
        return false;
    }
    let in_final = final_states.contains(&config.state);
    let stack_empty = config.stack.is_empty();
    match mode {
        AcceptanceMode::FinalState => in_final,
        AcceptanceMode::EmptyStack => stack_empty,
        AcceptanceMode::Both => in_final || stack_empty,
    }
}

/// Shared validation of the name-based parts of a PDA definition.
/// Returns the interned states and symbol tables.
pub(crate) struct PdaTables {
    pub state_names: Vec<Rc<str>>,
    pub input_symbols: Rc<[Rc<str>]>,
    pub stack_symbols: Rc<[Rc<str>]>,
    pub initial_state: usize,
    pub initial_stack_symbol: Rc<str>,
    pub final_states: HashSet<usize>,
}

impl PdaTables {
    pub(crate) fn build(
        states: &[&str],
        input_symbols: &[&str],
        stack_symbols: &[&str],
        initial_state: &str,
        initial_stack_symbol: &str,
        final_states: &[&str],
    ) -> Result<PdaTables, MachineError> {
        let mut seen = HashSet::new();
        for state in states {
            if !seen.insert(*state) {
                return Err(MachineError::InvalidState(format!(
                    "state '{state}' is defined multiple times"
                )));
            }
        }
        for symbols in [input_symbols, stack_symbols] {
            let mut seen = HashSet::new();
            for symbol in symbols {
                if !seen.insert(*symbol) {
                    return Err(MachineError::InvalidSymbol(format!(
                        "'{symbol}' appears twice in a symbol set"
                    )));
                }
            }
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
        if !stack_symbols.contains(&initial_stack_symbol) {
            return Err(MachineError::InvalidSymbol(format!(
                "initial stack symbol '{initial_stack_symbol}' is not a stack symbol"
            )));
        }
        Ok(PdaTables {
            state_names: states.iter().map(|s| Rc::from(*s)).collect(),
            input_symbols: input_symbols.iter().map(|s| Rc::from(*s)).collect(),
            stack_symbols: stack_symbols.iter().map(|s| Rc::from(*s)).collect(),
            initial_state,
            initial_stack_symbol: Rc::from(initial_stack_symbol),
            final_states,
        })
    }

    pub(crate) fn state_index(&self, name: &str) -> Result<usize, MachineError> {
        self.state_names
            .iter()
            .position(|s| s.as_ref() == name)
            .ok_or_else(|| MachineError::InvalidState(format!("'{name}' is not a state")))
    }

    pub(crate) fn check_input_symbol(&self, symbol: &str) -> Result<Rc<str>, MachineError> {
        self.input_symbols
            .iter()
            .find(|s| s.as_ref() == symbol)
            .cloned()
            .ok_or_else(|| {
                MachineError::InvalidSymbol(format!("'{symbol}' is not an input symbol"))
            })
    }

    pub(crate) fn check_stack_symbol(&self, symbol: &str) -> Result<Rc<str>, MachineError> {
        self.stack_symbols
            .iter()
            .find(|s| s.as_ref() == symbol)
            .cloned()
            .ok_or_else(|| {
                MachineError::InvalidSymbol(format!("'{symbol}' is not a stack symbol"))
            })
    }
}

//! Validation of a parsed DFA table into a [Dfa]. This is the second
//! phase of construction: [crate::parser::dfa] checks only the syntax,
//! while the `TryFrom` here checks that all mentioned states exist, that
//! every row matches the alphabet, and that there is exactly one initial
//! state.

use crate::dfa::{Dfa, DfaState};
use crate::errors::MachineError;
use crate::parser::DfaTable;
use std::collections::HashMap;
use std::rc::Rc;

/// Checks a symbol list for duplicates and a state list for duplicate
/// names, returning the name-to-index map. Shared with the NFA
/// validation.
pub(crate) fn check_names<'a>(
    alphabet: impl Iterator<Item = &'a str>,
    states: impl Iterator<Item = &'a str>,
) -> Result<HashMap<&'a str, usize>, MachineError> {
    let mut seen = HashMap::new();
    for symbol in alphabet {
        if seen.insert(symbol, ()).is_some() {
            return Err(MachineError::InvalidSymbol(format!(
                "'{symbol}' appears twice in the alphabet"
            )));
        }
    }
    let mut indices = HashMap::new();
    for (idx, state) in states.enumerate() {
        if indices.insert(state, idx).is_some() {
            return Err(MachineError::InvalidState(format!(
                "state '{state}' is defined multiple times"
            )));
        }
    }
    Ok(indices)
}

/// Checks that every row has one entry per alphabet symbol.
pub(crate) fn check_row_width(
    state: &str,
    entries: usize,
    columns: usize,
) -> Result<(), MachineError> {
    let message = || {
        format!("state '{state}' has {entries} transition entries, expected {columns}")
    };
    if entries < columns {
        return Err(MachineError::MissingSymbol(message()));
    }
    if entries > columns {
        return Err(MachineError::InvalidSymbol(message()));
    }
    Ok(())
}

/// Tracks the "exactly one initial state" rule while rows stream by.
/// Shared with the NFA validation.
#[derive(Default)]
pub(crate) struct InitialStateCheck {
    found: Option<usize>,
}

impl InitialStateCheck {
    pub(crate) fn mark(&mut self, idx: usize) -> Result<(), MachineError> {
        if self.found.replace(idx).is_some() {
            return Err(MachineError::InitialState(
                "there are two or more initial states".to_string(),
            ));
        }
        Ok(())
    }

    pub(crate) fn finish(self) -> Result<usize, MachineError> {
        self.found.ok_or_else(|| {
            MachineError::InitialState("there is no initial state".to_string())
        })
    }
}

impl<'a> TryFrom<DfaTable<'a>> for Dfa {
    type Error = MachineError;

    fn try_from(table: DfaTable<'a>) -> Result<Self, Self::Error> {
        let index_of =
            check_names(table.alphabet.iter().copied(), table.rows.iter().map(|r| r.state))?;

        let mut initial = InitialStateCheck::default();
        let mut states = Vec::with_capacity(table.rows.len());
        for (idx, row) in table.rows.iter().enumerate() {
            check_row_width(row.state, row.entries.len(), table.alphabet.len())?;
            let mut transitions = Vec::with_capacity(row.entries.len());
            for entry in &row.entries {
                let target = match *entry {
                    None => None,
                    Some(target) => match index_of.get(target) {
                        Some(&target_idx) => Some(target_idx),
                        None => {
                            return Err(MachineError::InvalidState(format!(
                                "state '{target}' does not exist (in transition from '{}')",
                                row.state
                            )))
                        }
                    },
                };
                transitions.push(target);
            }
            if row.initial {
                initial.mark(idx)?;
            }
            states.push(DfaState {
                name: Rc::from(row.state),
                initial: row.initial,
                accepting: row.accepting,
                transitions,
            });
        }

        Ok(Dfa::from_parts(
            table.alphabet.into_iter().map(Rc::from).collect(),
            states,
            initial.finish()?,
        ))
    }
}

#[cfg(test)]
mod tests {
    use crate::dfa::Dfa;
    use crate::errors::MachineError;
    use crate::parser;

    #[test]
    fn parses_a_partial_dfa() {
        let table = "
               a b
            -> x y -
             * y - x
        ";
        let dfa: Dfa = parser::dfa(table).unwrap().try_into().unwrap();
        assert!(dfa.is_partial());
        assert!(dfa.accepts_graphemes("a"));
        assert!(dfa.accepts_graphemes("aba"));
        assert!(!dfa.accepts_graphemes("aa"));
        assert!(!dfa.accepts_graphemes("b"));
    }

    #[test]
    fn rejects_missing_initial_state() {
        let table = "
             a b
           * x y x
             y x y
        ";
        let result: Result<Dfa, _> = parser::dfa(table).unwrap().try_into();
        assert_eq!(
            result.unwrap_err(),
            MachineError::InitialState("there is no initial state".to_string())
        );
    }

    #[test]
    fn rejects_unknown_transition_target() {
        let table = "
              a
           -> x z
        ";
        let result: Result<Dfa, _> = parser::dfa(table).unwrap().try_into();
        assert!(matches!(result, Err(MachineError::InvalidState(_))));
    }

    #[test]
    fn rejects_duplicate_alphabet_symbol() {
        let table = "
              a a
           -> x x x
        ";
        let result: Result<Dfa, _> = parser::dfa(table).unwrap().try_into();
        assert!(matches!(result, Err(MachineError::InvalidSymbol(_))));
    }

    #[test]
    fn rejects_short_rows() {
        let table = "
              a b
           -> x x
        ";
        let result: Result<Dfa, _> = parser::dfa(table).unwrap().try_into();
        assert!(matches!(result, Err(MachineError::MissingSymbol(_))));
    }

    #[test]
    fn table_roundtrip_keeps_missing_entries() {
        let table = "
               a b
            -> x y -
             * y - x
        ";
        let dfa: Dfa = parser::dfa(table).unwrap().try_into().unwrap();
        let reparsed: Dfa = parser::dfa(&dfa.to_table()).unwrap().try_into().unwrap();
        assert_eq!(dfa, reparsed);
    }
}

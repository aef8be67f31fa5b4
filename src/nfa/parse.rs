//! Validation of a parsed NFA table into an [Nfa]: all mentioned states
//! must exist, every row must match the header, at most one `ε` column
//! may appear, and there must be exactly one initial state. The
//! name-level checks are shared with the DFA validation in
//! [crate::dfa::parse].

use crate::dfa::parse::{check_names, check_row_width, InitialStateCheck};
use crate::errors::MachineError;
use crate::nfa::{Nfa, NfaState};
use crate::parser::{NfaColumn, NfaTable};
use std::rc::Rc;

impl<'a> TryFrom<NfaTable<'a>> for Nfa {
    type Error = MachineError;

    fn try_from(table: NfaTable<'a>) -> Result<Self, Self::Error> {
        let mut eps_column = None;
        let mut alphabet: Vec<&str> = Vec::with_capacity(table.columns.len());
        for (idx, column) in table.columns.iter().enumerate() {
            match column {
                NfaColumn::Symbol(symbol) => alphabet.push(symbol),
                NfaColumn::Epsilon => {
                    if eps_column.replace(idx).is_some() {
                        return Err(MachineError::InvalidSymbol(
                            "'ε' appears twice in the alphabet".to_string(),
                        ));
                    }
                }
            }
        }

        let index_of = check_names(
            alphabet.iter().copied(),
            table.rows.iter().map(|r| r.state),
        )?;
        let resolve = |state: &str, targets: &[&str]| -> Result<Vec<usize>, MachineError> {
            targets
                .iter()
                .map(|&target| {
                    index_of.get(target).copied().ok_or_else(|| {
                        MachineError::InvalidState(format!(
                            "state '{target}' does not exist (in transition from '{state}')"
                        ))
                    })
                })
                .collect()
        };

        let mut initial = InitialStateCheck::default();
        let mut states = Vec::with_capacity(table.rows.len());
        for (idx, row) in table.rows.iter().enumerate() {
            check_row_width(row.state, row.entries.len(), table.columns.len())?;
            let mut epsilon_transitions = Vec::new();
            let mut transitions = Vec::with_capacity(alphabet.len());
            for (column, targets) in row.entries.iter().enumerate() {
                let resolved = resolve(row.state, targets)?;
                if Some(column) == eps_column {
                    epsilon_transitions = resolved;
                } else {
                    transitions.push(resolved);
                }
            }
            if row.initial {
                initial.mark(idx)?;
            }
            states.push(NfaState {
                name: Rc::from(row.state),
                initial: row.initial,
                accepting: row.accepting,
                epsilon_transitions,
                transitions,
            });
        }

        Ok(Nfa::from_parts(
            alphabet.into_iter().map(Rc::from).collect(),
            states,
            initial.finish()?,
        ))
    }
}

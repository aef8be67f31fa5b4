use thiserror::Error;

/// The single rooted error taxonomy for the whole library.
///
/// Every fallible operation reports one of these variants to the caller;
/// no error is logged or recovered internally. Construction is
/// transactional: when validation of a machine definition fails, no
/// partially-built machine is observable.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum MachineError {
    /// A state reference (initial, final, transition endpoint) is not a
    /// member of the machine's state set.
    #[error("invalid state: {0}")]
    InvalidState(String),
    /// A required transition entry is absent (non-partial DFA, DTM).
    #[error("missing state: {0}")]
    MissingState(String),
    /// A symbol used in a transition is not in the relevant symbol set.
    #[error("invalid symbol: {0}")]
    InvalidSymbol(String),
    /// A non-partial DFA lacks a transition for some (state, symbol).
    #[error("missing symbol: {0}")]
    MissingSymbol(String),
    /// A Turing machine transition moves the head outside {L, N, R}.
    #[error("invalid direction: {0}")]
    InvalidDirection(String),
    /// A PDA names an acceptance mode outside the three defined values.
    #[error("invalid acceptance mode: {0}")]
    InvalidAcceptanceMode(String),
    /// Regex syntax is ill-formed (unbalanced parens, stray operator, …).
    #[error("invalid regular expression: {0}")]
    InvalidRegex(String),
    /// A DPDA transition table exhibits nondeterminism.
    #[error("nondeterministic transitions: {0}")]
    Nondeterminism(String),
    /// The initial state fails a required condition: it is absent or
    /// duplicated, or a Turing machine's initial state is final.
    #[error("bad initial state: {0}")]
    InitialState(String),
    /// A final state of a Turing machine has outgoing transitions.
    #[error("bad final state: {0}")]
    FinalState(String),
    /// A binary operation was asked to combine machines with differing
    /// alphabets.
    #[error("alphabet mismatch: {0}")]
    SymbolMismatch(String),
    /// Execution terminated in a non-accepting configuration.
    #[error("input rejected: {0}")]
    Rejection(String),
    /// A quantity undefined on the empty language was requested.
    #[error("empty language: {0}")]
    EmptyLanguage(String),
    /// A quantity undefined on infinite languages was requested.
    #[error("infinite language: {0}")]
    InfiniteLanguage(String),
    /// The lexer hit a character no token rule matches.
    #[error("invalid character at position {position}: {message}")]
    Lex { message: String, position: usize },
}

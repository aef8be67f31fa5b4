//! # machina
//!
//! `machina` is a Rust library for the machines of a formal language
//! theory course: DFAs and NFAs with the classical algorithms relating
//! them, a strictly regular regex dialect bridged to NFAs in both
//! directions, and pushdown and Turing machines with stepwise
//! executors.
//!
//! ## Usage
//!
//! DFAs and NFAs are usually written as transition tables:
//!
//! ```rust
//! use machina::dfa::Dfa;
//!
//! // Strings that mention an a and end with a b
//! let table = "
//!       a  b
//! -> s0 s1 s0
//!    s1 s1 s2
//!  * s2 s1 s2
//! ";
//! // Parsing reads the table as written; converting it checks that
//! // every mentioned state exists, that each row matches the header,
//! // and that exactly one state is initial
//! let dfa: Dfa = machina::parser::dfa(table).unwrap().try_into().unwrap();
//! assert!(dfa.accepts(&["a", "b"]));
//! assert!(dfa.accepts(&["b", "a", "b"]));
//! assert!(!dfa.accepts(&["b", "b"]));
//! assert!(!dfa.accepts(&["a", "b", "a"]));
//! ```
//!
//! The regex bridge ties the finite-automaton core together:
//!
//! ```rust
//! use machina::gnfa::Gnfa;
//! use machina::nfa::Nfa;
//!
//! let nfa = Nfa::from_regex("(ab)*c").unwrap();
//! let dfa = nfa.to_dfa().minimized(false);
//! assert!(dfa.accepts_graphemes("ababc"));
//!
//! // ... and back out to a regex by GNFA state elimination
//! let regex = Gnfa::from_dfa(&dfa).to_regex().unwrap();
//! let roundtripped = Nfa::from_regex_with_symbols(&regex, &["a", "b", "c"]).unwrap();
//! assert!(roundtripped.to_dfa().equivalent_to(&dfa));
//! ```
//!
//! ## Layout
//!
//! * [dfa]: the DFA engine: validation, stepwise execution,
//!   minimization, the set-operation algebra, language analysis and
//!   enumeration, direct pattern constructors.
//! * [nfa]: the NFA engine: epsilon closures, Thompson combinators,
//!   products and quotients, lambda elimination, subset construction.
//! * [regex]: the regex dialect: validation and the NFA bridge.
//! * [gnfa]: regex-labeled automata and state elimination back to a
//!   regex.
//! * [pda]: deterministic and nondeterministic pushdown automata.
//! * [tm]: deterministic, nondeterministic and multitape Turing
//!   machines, including the single-tape simulation.
//! * [parser]: the text format for DFA and NFA transition tables.
//! * [postfix]: the generic lexer / shunting-yard / postfix-evaluation
//!   framework underneath the regex parser.
//! * [partition]: the partition refinement structure underneath DFA
//!   minimization.
//!
//! Machines are immutable values: every derived machine is a fresh
//! value, and all validation happens before a machine exists. All
//! errors share the [MachineError] taxonomy.

pub mod dfa;
pub mod gnfa;
pub mod nfa;
pub mod parser;
pub mod partition;
pub mod pda;
pub mod postfix;
pub mod regex;
pub mod tm;

mod errors;
mod table;
mod util;

pub use errors::MachineError;

#[cfg(test)]
mod tests;

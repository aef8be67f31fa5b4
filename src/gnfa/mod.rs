//! # Generalized NFA and state elimination
//! A [Gnfa] is a finite automaton whose edges carry regular expressions
//! (in the dialect of [crate::regex]) instead of single symbols. It has
//! exactly one initial state with no incoming edges and one final state
//! with no outgoing edges. Its purpose is the classical state
//! elimination procedure: build a GNFA from a [Dfa] or [Nfa] and
//! repeatedly rip out internal states, composing the edge labels, until
//! only the regex from initial to final state remains.
//!
//! ```
//! use machina::dfa::Dfa;
//! use machina::gnfa::Gnfa;
//! use machina::nfa::Nfa;
//!
//! let dfa: Dfa = machina::parser::dfa("
//!        a b
//! -> s t s
//!  * t t t
//! ").unwrap().try_into().unwrap();
//! let regex = Gnfa::from_dfa(&dfa).to_regex().unwrap();
//! // The regex round-trips to the same language
//! let back = Nfa::from_regex_with_symbols(&regex, &["a", "b"]).unwrap().to_dfa();
//! assert!(back.equivalent_to(&dfa));
//! ```

use crate::dfa::Dfa;
use crate::nfa::Nfa;
use std::collections::HashMap;
use std::rc::Rc;

/// A generalized NFA: a dense matrix of optional regex labels between
/// states, a dedicated initial state without incoming edges and a
/// dedicated final state without outgoing edges. The empty-string label
/// denotes an epsilon edge; an absent label denotes no edge.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Gnfa {
    state_names: Vec<Rc<str>>,
    /// transitions[from][to], `None` meaning no edge.
    transitions: Vec<Vec<Option<String>>>,
    initial_state: usize,
    final_state: usize,
}

impl Gnfa {
    /// Builds the GNFA equivalent to the given DFA: parallel symbol
    /// edges collapse into one union label, and fresh initial and final
    /// states are attached with epsilon edges.
    pub fn from_dfa(dfa: &Dfa) -> Gnfa {
        let finals = dfa
            .states()
            .iter()
            .enumerate()
            .filter(|(_, s)| s.is_accepting())
            .map(|(idx, _)| idx)
            .collect::<Vec<_>>();
        let labels = dfa
            .iter_transitions()
            .map(|(from, to, symbol)| ((from, to), vec![symbol.to_string()]))
            .fold(
                HashMap::<(usize, usize), Vec<String>>::new(),
                |mut edges, ((from, to), mut symbols)| {
                    edges.entry((from, to)).or_default().append(&mut symbols);
                    edges
                },
            );
        Self::assemble(
            dfa.states().iter().map(|s| Rc::from(s.name())).collect(),
            labels
                .into_iter()
                .map(|((from, to), symbols)| ((from, to), symbols.join("|")))
                .collect(),
            dfa.initial_state_index(),
            &finals,
        )
    }

    /// Builds the GNFA equivalent to the given NFA. Epsilon edges
    /// contribute the empty label; an epsilon edge parallel to symbol
    /// edges makes the union optional (`x?` / `(x|y)?`).
    pub fn from_nfa(nfa: &Nfa) -> Gnfa {
        let finals = nfa
            .states()
            .iter()
            .enumerate()
            .filter(|(_, s)| s.is_accepting())
            .map(|(idx, _)| idx)
            .collect::<Vec<_>>();
        let mut symbols: HashMap<(usize, usize), Vec<String>> = HashMap::new();
        let mut epsilon: HashMap<(usize, usize), bool> = HashMap::new();
        for (from, to, label) in nfa.iter_transitions() {
            match label {
                None => {
                    epsilon.insert((from, to), true);
                }
                Some(symbol) => symbols
                    .entry((from, to))
                    .or_default()
                    .push(symbol.to_string()),
            }
        }
        let mut labels: HashMap<(usize, usize), String> = HashMap::new();
        for (&edge, edge_symbols) in &symbols {
            let union = edge_symbols.join("|");
            let label = if epsilon.contains_key(&edge) {
                // ε alongside symbols: the whole union becomes optional
                if edge_symbols.len() == 1 && is_single_symbol(&union) {
                    format!("{union}?")
                } else {
                    format!("({union})?")
                }
            } else {
                union
            };
            labels.insert(edge, label);
        }
        for (&edge, _) in &epsilon {
            labels.entry(edge).or_default();
        }
        Self::assemble(
            nfa.states().iter().map(|s| Rc::from(s.name())).collect(),
            labels,
            nfa.initial_state_index(),
            &finals,
        )
    }

    fn assemble(
        mut state_names: Vec<Rc<str>>,
        labels: HashMap<(usize, usize), String>,
        old_initial: usize,
        old_finals: &[usize],
    ) -> Gnfa {
        let n = state_names.len();
        let initial = n;
        let final_state = n + 1;
        state_names.push(fresh_name(&state_names, "start"));
        state_names.push(fresh_name(&state_names, "end"));

        let mut transitions: Vec<Vec<Option<String>>> = vec![vec![None; n + 2]; n + 2];
        for ((from, to), label) in labels {
            transitions[from][to] = Some(label);
        }
        transitions[initial][old_initial] = Some(String::new());
        for &old_final in old_finals {
            transitions[old_final][final_state] = Some(String::new());
        }
        Gnfa {
            state_names,
            transitions,
            initial_state: initial,
            final_state,
        }
    }

    /// Gets the names of the states, the last two being the fresh
    /// initial and final states.
    pub fn states(&self) -> &[Rc<str>] {
        &self.state_names
    }

    /// Gets the initial state's index.
    pub fn initial_state_index(&self) -> usize {
        self.initial_state
    }

    /// Gets the final state's index.
    pub fn final_state_index(&self) -> usize {
        self.final_state
    }

    /// Iterates over every labeled edge exactly once, as
    /// (from, to, regex) triples.
    pub fn iter_transitions(&self) -> impl Iterator<Item = (usize, usize, &str)> + '_ {
        self.transitions
            .iter()
            .enumerate()
            .flat_map(move |(from, row)| {
                row.iter().enumerate().filter_map(move |(to, label)| {
                    label.as_ref().map(|label| (from, to, label.as_str()))
                })
            })
    }

    /// Converts this GNFA to a regular expression by eliminating one
    /// internal state at a time (always a minimum-degree one). Returns
    /// `None` when the machine accepts nothing at all, since the dialect has
    /// no notation for the empty language.
    pub fn to_regex(&self) -> Option<String> {
        let mut gnfa = self.clone();
        let mut alive: Vec<bool> = vec![true; gnfa.state_names.len()];
        let mut remaining = gnfa.state_names.len();

        while remaining > 2 {
            let rip = gnfa.min_degree_state(&alive);
            let through: Vec<usize> = (0..alive.len())
                .filter(|&s| alive[s] && s != rip)
                .collect();
            let sources: Vec<usize> = through
                .iter()
                .copied()
                .filter(|&s| s != gnfa.final_state)
                .collect();
            let targets: Vec<usize> = through
                .iter()
                .copied()
                .filter(|&s| s != gnfa.initial_state)
                .collect();
            for &i in &sources {
                for &j in &targets {
                    let r1 = gnfa.transitions[i][rip].clone();
                    let r2 = gnfa.transitions[rip][rip].clone();
                    let r3 = gnfa.transitions[rip][j].clone();
                    let r4 = gnfa.transitions[i][j].clone();
                    gnfa.transitions[i][j] = compose_labels(r1, r2, r3, r4);
                }
            }
            for s in 0..alive.len() {
                gnfa.transitions[rip][s] = None;
                gnfa.transitions[s][rip] = None;
            }
            alive[rip] = false;
            remaining -= 1;
        }
        gnfa.transitions[gnfa.initial_state][gnfa.final_state].clone()
    }

    /// The internal state with the fewest labeled edges, the classic
    /// heuristic for keeping intermediate regexes small.
    fn min_degree_state(&self, alive: &[bool]) -> usize {
        let mut degree: HashMap<usize, usize> = (0..alive.len())
            .filter(|&s| alive[s] && s != self.initial_state && s != self.final_state)
            .map(|s| (s, 0))
            .collect();
        for (from, to, _) in self.iter_transitions() {
            if !alive[from] || !alive[to] {
                continue;
            }
            if let Some(d) = degree.get_mut(&from) {
                *d += 1;
            }
            if let Some(d) = degree.get_mut(&to) {
                *d += 1;
            }
        }
        let mut entries: Vec<(usize, usize)> = degree.into_iter().collect();
        entries.sort();
        entries
            .into_iter()
            .min_by_key(|&(_, d)| d)
            .map(|(s, _)| s)
            .expect("an internal state remains")
    }
}

/// One elimination step for the edge (i, j) through the ripped state:
/// `R(i,j) ∪ R(i,rip)·R(rip,rip)*·R(rip,j)`, with parentheses only where
/// precedence demands them.
fn compose_labels(
    r1: Option<String>,
    r2: Option<String>,
    r3: Option<String>,
    r4: Option<String>,
) -> Option<String> {
    let (r1, r3) = match (r1, r3) {
        (Some(r1), Some(r3)) => (r1, r3),
        // No path through the ripped state: the edge stays as it was.
        _ => return r4,
    };

    let r1 = bracket_for_concat(r1);
    let r3 = bracket_for_concat(r3);
    let r2 = match r2 {
        None => String::new(),
        Some(r2) => star_label(&r2),
    };
    let through = format!("{r1}{r2}{r3}");
    match r4 {
        None => Some(through),
        // A union with an epsilon branch is spelled with the option
        // operator; the dialect has no epsilon literal.
        Some(r4) if r4.is_empty() => Some(optional_label(through)),
        Some(r4) if through.is_empty() => Some(optional_label(r4)),
        // The new label is a union alternative, so r4 itself needs no
        // parentheses.
        Some(r4) => Some(format!("{through}|{r4}")),
    }
}

/// The `x?` form of a label: the label's language plus the empty word.
fn optional_label(label: String) -> String {
    if label.is_empty() || is_starred_symbol(&label) {
        label
    } else if is_single_symbol(&label) {
        format!("{label}?")
    } else {
        format!("({label})?")
    }
}

/// Wraps a fragment in parentheses when a top-level union would
/// otherwise leak into a surrounding concatenation.
fn bracket_for_concat(label: String) -> String {
    if has_top_level_union(&label) {
        format!("({label})")
    } else {
        label
    }
}

/// The starred form of a self-loop label.
fn star_label(label: &str) -> String {
    if label.is_empty() {
        String::new()
    } else if is_single_symbol(label) {
        format!("{label}*")
    } else if is_starred_symbol(label) {
        label.to_string()
    } else {
        format!("({label})*")
    }
}

fn has_top_level_union(label: &str) -> bool {
    let mut depth = 0usize;
    for c in label.chars() {
        match c {
            '(' => depth += 1,
            ')' => depth = depth.saturating_sub(1),
            '|' if depth == 0 => return true,
            _ => {}
        }
    }
    false
}

fn is_single_symbol(label: &str) -> bool {
    label.chars().count() == 1
}

fn is_starred_symbol(label: &str) -> bool {
    let chars: Vec<char> = label.chars().collect();
    chars.len() == 2 && chars[1] == '*'
}

fn fresh_name(taken: &[Rc<str>], wanted: &str) -> Rc<str> {
    if taken.iter().all(|name| name.as_ref() != wanted) {
        Rc::from(wanted)
    } else {
        (0..)
            .map(|i| format!("{wanted}{i}"))
            .find(|name| taken.iter().all(|taken| taken.as_ref() != name.as_str()))
            .map(|name| Rc::from(name.as_str()))
            .expect("some suffixed name is free")
    }
}

#[cfg(test)]
mod tests {
    use super::Gnfa;
    use crate::dfa::Dfa;
    use crate::nfa::Nfa;
    use crate::parser;

    fn roundtrip(dfa: &Dfa) {
        let regex = Gnfa::from_dfa(dfa).to_regex().expect("nonempty language");
        let alphabet: Vec<&str> = dfa.alphabet().iter().map(|s| s.as_ref()).collect();
        let back = Nfa::from_regex_with_symbols(&regex, &alphabet)
            .unwrap()
            .to_dfa();
        assert!(
            back.equivalent_to(dfa),
            "the language changed through {regex}"
        );
    }

    #[test]
    fn eliminates_a_two_symbol_machine() {
        let dfa: Dfa = parser::dfa(
            "
               a b
            -> s t s
             * t t t
        ",
        )
        .unwrap()
        .try_into()
        .unwrap();
        roundtrip(&dfa);
    }

    #[test]
    fn eliminates_a_cyclic_machine() {
        // Even number of a:s
        let dfa = Dfa::count_mod(&["a", "b"], 2, None, Some(&["a"])).unwrap();
        roundtrip(&dfa);
    }

    #[test]
    fn eliminates_a_finite_language() {
        let dfa = Dfa::from_finite_language(&["a", "b"], &["ab", "ba", "abb"]).unwrap();
        roundtrip(&dfa);
    }

    #[test]
    fn empty_language_has_no_regex() {
        let dfa = Dfa::empty_language(&["a"]).unwrap();
        assert_eq!(Gnfa::from_dfa(&dfa).to_regex(), None);
    }

    #[test]
    fn nfa_with_epsilon_edges_roundtrips() {
        let table = "
              ε    a    b
           -> s {t} {s}  {}
              t {}  {}   {u}
            * u {}  {}   {}
        ";
        let nfa: Nfa = parser::nfa(table).unwrap().try_into().unwrap();
        let regex = Gnfa::from_nfa(&nfa).to_regex().unwrap();
        let alphabet: Vec<&str> = nfa.alphabet().iter().map(|s| s.as_ref()).collect();
        let back = Nfa::from_regex_with_symbols(&regex, &alphabet).unwrap();
        assert!(back.to_dfa().equivalent_to(&nfa.to_dfa()));
    }

    #[test]
    fn accepting_initial_state_keeps_the_empty_word() {
        let dfa = Dfa::count_mod(&["a"], 2, None, None).unwrap();
        roundtrip(&dfa);
    }
}

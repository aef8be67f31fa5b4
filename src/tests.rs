use crate::dfa::{Dfa, DfaState};
use crate::gnfa::Gnfa;
use crate::nfa::{Nfa, NfaState};
use crate::parser;
use ::regex::Regex as LibRegex;
use proptest::prelude::*;
use rand::prelude::*;
use std::collections::HashSet;
use std::ops::RangeInclusive;
use std::rc::Rc;

#[test]
fn minimization_collapses_the_classic_eight_state_machine() {
    // Eight states accepting all binary strings of length at least two;
    // q3..q6 are identical accepting sinks and q7 is unreachable.
    let dfa: Dfa = parser::dfa(
        "
             0  1
      -> q0 q1 q2
         q1 q3 q4
         q2 q5 q6
       * q3 q3 q3
       * q4 q4 q4
       * q5 q5 q5
       * q6 q6 q6
         q7 q7 q7
    ",
    )
    .unwrap()
    .try_into()
    .unwrap();

    let minimal = dfa.minimized(true);
    assert_eq!(minimal.states().len(), 3);
    assert!(minimal.equivalent_to(&dfa));
    let names: HashSet<&str> = minimal.states().iter().map(|s| s.name()).collect();
    assert_eq!(
        names,
        HashSet::from(["{q0}", "{q1 q2}", "{q3 q4 q5 q6}"])
    );

    let numbered = dfa.minimized(false);
    assert_eq!(numbered.states().len(), 3);
    assert!(numbered.equivalent_to(&dfa));
}

#[test]
fn regex_scenario_with_option_branch() {
    let nfa = Nfa::from_regex("ab(cd*|dc)|a?").unwrap();
    for word in ["", "a", "abcd", "abcddd", "abdc"] {
        assert!(nfa.accepts_graphemes(word), "{word:?} should be accepted");
    }
    for word in ["b", "acdc", "abcdd c"] {
        assert!(!nfa.accepts_graphemes(word), "{word:?} should be rejected");
    }
}

#[test]
fn stepwise_execution_is_deterministic() {
    let dfa: Dfa = parser::dfa(
        "
            0  1
     -> q0 q0 q1
      * q1 q0 q2
        q2 q2 q1
    ",
    )
    .unwrap()
    .try_into()
    .unwrap();
    for word in ["0111", "1", "11101", "", "110", "1111"] {
        let first = dfa.accepts_graphemes(word);
        for _ in 0..3 {
            assert_eq!(dfa.accepts_graphemes(word), first);
        }
        let symbols: Vec<String> = word.chars().map(String::from).collect();
        let symbols: Vec<&str> = symbols.iter().map(String::as_str).collect();
        let (path, accepted) = dfa.input_path(&symbols);
        assert_eq!(accepted, first);
        assert_eq!(path.len(), word.len());
    }
}

proptest! {
    /// A DFA turns into a table with to_table() and parses back to the
    /// *very same* DFA (not just an equivalent one).
    #[test]
    fn dfa_table_reparse(dfa in dfa(50, 50)) {
        let parsed_dfa: Dfa = parser::dfa(&dfa.to_table()).unwrap().try_into().unwrap();
        prop_assert_eq!(dfa, parsed_dfa);
    }

    /// A partial DFA round-trips through its table as well.
    #[test]
    fn partial_dfa_table_reparse(dfa in partial_dfa(30, 5)) {
        let parsed_dfa: Dfa = parser::dfa(&dfa.to_table()).unwrap().try_into().unwrap();
        prop_assert_eq!(dfa, parsed_dfa);
    }

    /// Minimization preserves the language and never grows the machine.
    #[test]
    fn dfa_minimize_eq(dfa in dfa(25, 25)) {
        let minimized = dfa.minimized(false);
        prop_assert!(minimized.states().len() <= dfa.states().len());
        prop_assert!(minimized.equivalent_to(&dfa), "minimized DFA should be equivalent");
        let named = dfa.minimized(true);
        prop_assert!(named.equivalent_to(&dfa), "retain_names should not change the language");
        prop_assert_eq!(named.states().len(), minimized.states().len());
    }

    /// Two equivalent machines have minimal DFAs of the same size, and
    /// re-minimizing a minimal machine changes nothing.
    #[test]
    fn dfa_minimize_is_canonical(dfa in dfa(20, 6)) {
        let once = dfa.minimized(false);
        let via_nfa = Dfa::from_nfa(&dfa.to_nfa(), false).minimized(false);
        prop_assert_eq!(once.states().len(), via_nfa.states().len());
        let twice = once.minimized(false);
        prop_assert_eq!(once.states().len(), twice.states().len());
    }

    /// DFA -> NFA -> DFA keeps the language.
    #[test]
    fn dfa_to_nfa_to_dfa(dfa in dfa(50, 50)) {
        let converted = dfa.to_nfa().to_dfa();
        prop_assert!(dfa.equivalent_to(&converted));
        prop_assert!(converted.equivalent_to(&dfa));
    }

    /// An NFA turns into a table and parses back to the same NFA.
    #[test]
    fn nfa_table_reparse(nfa in nfa(50, 50)) {
        let parsed_nfa: Nfa = parser::nfa(&nfa.to_table()).unwrap().try_into().unwrap();
        prop_assert_eq!(nfa, parsed_nfa);
    }

    /// NFA -> DFA -> NFA keeps the language.
    #[test]
    fn nfa_to_dfa_to_nfa(nfa in nfa(25, 25)) {
        let converted = nfa.to_dfa().to_nfa();
        prop_assert!(nfa.equivalent_to(&converted));
        prop_assert!(converted.equivalent_to(&nfa));
    }

    /// The NFA and its subset construction agree on concrete words.
    #[test]
    fn nfa_dfa_agree_on_words(
        nfa in fixed_alphabet_nfa(12, 'a'..='c', 3),
        words in prop::collection::vec("[a-c]{0,8}", 25),
    ) {
        let dfa = nfa.to_dfa();
        for word in &words {
            prop_assert_eq!(nfa.accepts_graphemes(word), dfa.accepts_graphemes(word));
        }
        let eliminated = nfa.eliminate_lambda();
        for word in &words {
            prop_assert_eq!(nfa.accepts_graphemes(word), eliminated.accepts_graphemes(word));
        }
    }

    /// The four set operations behave like their boolean definitions.
    #[test]
    fn binary_dfa_ops(
        dfa1 in fixed_alphabet_dfa(20, 'a'..='f', 6),
        dfa2 in fixed_alphabet_dfa(20, 'a'..='f', 6),
        tests in prop::collection::vec("[a-f]{0,10}", 100),
    ) {
        let intersection = dfa1.intersection(&dfa2).unwrap();
        let union = dfa1.union(&dfa2).unwrap();
        let difference = dfa1.difference(&dfa2).unwrap();
        let symmetric_difference = dfa1.symmetric_difference(&dfa2).unwrap();
        for test in tests.iter() {
            let r1 = dfa1.accepts_graphemes(test);
            let r2 = dfa2.accepts_graphemes(test);
            prop_assert_eq!(intersection.accepts_graphemes(test), r1 && r2);
            prop_assert_eq!(union.accepts_graphemes(test), r1 || r2);
            prop_assert_eq!(difference.accepts_graphemes(test), r1 && !r2);
            prop_assert_eq!(symmetric_difference.accepts_graphemes(test), r1 != r2);
        }
    }

    /// Complement is an involution and satisfies the De Morgan laws.
    #[test]
    fn complement_laws(
        dfa1 in fixed_alphabet_dfa(15, 'a'..='d', 4),
        dfa2 in fixed_alphabet_dfa(15, 'a'..='d', 4),
    ) {
        prop_assert!(dfa1.complement().complement().equivalent_to(&dfa1));
        let lhs = dfa1.union(&dfa2).unwrap().complement();
        let rhs = dfa1.complement().intersection(&dfa2.complement()).unwrap();
        prop_assert!(lhs.equivalent_to(&rhs));
        let lhs = dfa1.intersection(&dfa2).unwrap().complement();
        let rhs = dfa1.complement().union(&dfa2.complement()).unwrap();
        prop_assert!(lhs.equivalent_to(&rhs));
    }

    /// A ⊆ B, A ∪ B ≡ B, A ∩ B ≡ A and A ∖ B ≡ ∅ are all the same
    /// statement.
    #[test]
    fn subset_laws(
        dfa1 in fixed_alphabet_dfa(12, 'a'..='c', 3),
        dfa2 in fixed_alphabet_dfa(12, 'a'..='c', 3),
    ) {
        let subset = dfa1.is_subset_of(&dfa2).unwrap();
        prop_assert_eq!(subset, dfa1.union(&dfa2).unwrap().equivalent_to(&dfa2));
        prop_assert_eq!(subset, dfa1.intersection(&dfa2).unwrap().equivalent_to(&dfa1));
        prop_assert_eq!(subset, dfa1.difference(&dfa2).unwrap().is_empty());
        prop_assert_eq!(dfa2.is_subset_of(&dfa1).unwrap(), dfa1.is_superset_of(&dfa2).unwrap());
        prop_assert_eq!(
            dfa1.is_disjoint_from(&dfa2).unwrap(),
            dfa1.intersection(&dfa2).unwrap().is_empty()
        );
    }

    /// Everything words_of_length produces is accepted, counted and
    /// ordered.
    #[test]
    fn enumeration_soundness(dfa in fixed_alphabet_dfa(10, 'a'..='c', 3)) {
        for k in 0..6 {
            let words = dfa.words_of_length(k);
            prop_assert_eq!(words.len() as u64, dfa.count_words_of_length(k));
            let mut sorted = words.clone();
            sorted.sort();
            prop_assert_eq!(&words, &sorted, "words of one length come lexicographically");
            for word in &words {
                prop_assert_eq!(word.chars().count(), k);
                prop_assert!(dfa.accepts_graphemes(word));
            }
        }
    }

    /// For a finite language, iteration, successors and cardinality all
    /// see exactly the language.
    #[test]
    fn finite_language_enumeration(words in prop::collection::hash_set("[ab]{0,6}", 0..20)) {
        let words: Vec<&str> = words.iter().map(String::as_str).collect();
        let dfa = Dfa::from_finite_language(&["a", "b"], &words).unwrap();
        prop_assert_eq!(dfa.cardinality().unwrap() as usize, words.len());

        let mut expected: Vec<String> = words.iter().map(|w| w.to_string()).collect();
        expected.sort();
        let ascending: Vec<String> = dfa.successors(None, true).unwrap().collect();
        prop_assert_eq!(&ascending, &expected);
        let mut descending: Vec<String> = dfa.predecessors(None, true).unwrap().collect();
        descending.reverse();
        prop_assert_eq!(&descending, &expected);

        // successor steps through the same sequence one word at a time
        let mut walked = Vec::new();
        let mut current = dfa.successor(None, true).unwrap();
        while let Some(word) = current {
            current = dfa.successor(Some(&word), true).unwrap();
            walked.push(word);
        }
        prop_assert_eq!(&walked, &expected);

        let by_length: Vec<String> = dfa.words().collect();
        prop_assert_eq!(by_length.len(), words.len());
        for word in by_length {
            prop_assert!(words.contains(&word.as_str()));
        }
    }

    /// The regex pipeline agrees with the regex crate as an oracle.
    #[test]
    fn regex_agrees_with_reference(
        pattern in random_regex(),
        tests in prop::collection::vec("[a-d]{0,8}", 20),
    ) {
        let dfa = Nfa::from_regex(&pattern).unwrap().to_dfa().minimized(false);
        let oracle = LibRegex::new(&format!("^(?:{pattern})$")).unwrap();

        let known: HashSet<char> = pattern.chars().collect();
        for test in tests.iter() {
            // Skip symbols outside the pattern: they are outside the
            // machine's alphabet
            let test: String = test.chars().filter(|c| known.contains(c)).collect();
            prop_assert_eq!(dfa.accepts_graphemes(&test), oracle.is_match(&test));
        }
    }

    /// DFA -> GNFA -> regex -> NFA -> DFA is the identity on languages.
    #[test]
    fn gnfa_roundtrip(dfa in fixed_alphabet_dfa(8, 'a'..='c', 3)) {
        match Gnfa::from_dfa(&dfa).to_regex() {
            None => prop_assert!(dfa.is_empty()),
            Some(regex) => {
                let alphabet: Vec<&str> = dfa.alphabet().iter().map(|s| s.as_ref()).collect();
                let back = Nfa::from_regex_with_symbols(&regex, &alphabet).unwrap().to_dfa();
                prop_assert!(back.equivalent_to(&dfa), "language changed through {}", regex);
            }
        }
    }

    /// Thompson combinators do what they say, checked against the
    /// machines' own word enumeration.
    #[test]
    fn nfa_combinators(
        word1 in "[ab]{1,4}",
        word2 in "[ab]{1,4}",
        tests in prop::collection::vec("[ab]{0,6}", 30),
    ) {
        let alphabet = ["a", "b"];
        let nfa1 = Nfa::from_string_literal(&word1, Some(&alphabet)).unwrap();
        let nfa2 = Nfa::from_string_literal(&word2, Some(&alphabet)).unwrap();

        let union = nfa1.union(&nfa2);
        let concat = nfa1.concatenate(&nfa2);
        let star = nfa1.kleene_star();
        let option = nfa1.option();
        let reverse = nfa1.reverse();

        for test in tests.iter() {
            let expect_union = test == &word1 || test == &word2;
            prop_assert_eq!(union.accepts_graphemes(test), expect_union);
            let expect_concat = *test == format!("{word1}{word2}");
            prop_assert_eq!(concat.accepts_graphemes(test), expect_concat);
            let expect_star = is_repetition_of(test, &word1);
            prop_assert_eq!(star.accepts_graphemes(test), expect_star);
            let expect_option = test.is_empty() || test == &word1;
            prop_assert_eq!(option.accepts_graphemes(test), expect_option);
            let reversed: String = test.chars().rev().collect();
            prop_assert_eq!(reverse.accepts_graphemes(&reversed), test == &word1);
        }
    }
}

fn is_repetition_of(test: &str, unit: &str) -> bool {
    test.is_empty() || (test.len() % unit.len() == 0 && test == unit.repeat(test.len() / unit.len()))
}

prop_compose! {
    fn nfa(max_states: usize, max_alphabet_size: usize)
        (num_states in 1..max_states, alphabet_size in 1..max_alphabet_size)
        (
            states in state_names(num_states),
            alphabet in alphabet_elems(alphabet_size),
            initial_state in 0..num_states,
            accepting_states in prop::collection::vec(any::<bool>(), num_states..=num_states),
            epsilon_transitions in prop::collection::vec(epsilon_transitions(num_states), num_states..=num_states),
            transitions in prop::collection::vec(nfa_transitions(num_states, alphabet_size), num_states..=num_states)
        )
    -> Nfa {
        let states = states.into_iter().zip(
            accepting_states.into_iter().zip(
                transitions.into_iter().zip(
                    epsilon_transitions.into_iter()
                )
            )
        ).enumerate().map(|(idx, (state_name, (accepting, (transitions, epsilon_transitions))))|
            NfaState {
                name: Rc::from(state_name.as_str()),
                initial: idx == initial_state,
                accepting,
                epsilon_transitions,
                transitions
            }
        ).collect();

        Nfa::from_parts(
            alphabet.iter().map(|entry| Rc::from(entry.as_str())).collect(),
            states,
            initial_state,
        )
    }
}

prop_compose! {
    fn fixed_alphabet_nfa(max_states: usize, alphabet: RangeInclusive<char>, alphabet_size: usize)
        (num_states in 1..max_states)
        (
            states in state_names(num_states),
            initial_state in 0..num_states,
            accepting_states in prop::collection::vec(any::<bool>(), num_states..=num_states),
            epsilon_transitions in prop::collection::vec(epsilon_transitions(num_states), num_states..=num_states),
            transitions in prop::collection::vec(nfa_transitions(num_states, alphabet_size), num_states..=num_states)
        )
    -> Nfa {
        let states = states.into_iter().zip(
            accepting_states.into_iter().zip(
                transitions.into_iter().zip(
                    epsilon_transitions.into_iter()
                )
            )
        ).enumerate().map(|(idx, (state_name, (accepting, (transitions, epsilon_transitions))))|
            NfaState {
                name: Rc::from(state_name.as_str()),
                initial: idx == initial_state,
                accepting,
                epsilon_transitions,
                transitions
            }
        ).collect();

        Nfa::from_parts(
            alphabet.clone().map(|c| Rc::from(c.to_string().as_str())).collect(),
            states,
            initial_state,
        )
    }
}

prop_compose! {
    fn fixed_alphabet_dfa(max_states: usize, alphabet: RangeInclusive<char>, alphabet_size: usize)
        (num_states in 1..max_states)
        (
            states in state_names(num_states),
            initial_state in 0..num_states,
            accepting_states in prop::collection::vec(any::<bool>(), num_states..=num_states),
            transitions in prop::collection::vec(dfa_transitions(num_states, alphabet_size), num_states..=num_states)
        )
    -> Dfa {
        let states = states.into_iter().zip(
            accepting_states.into_iter().zip(
                transitions.into_iter()
            )
        ).enumerate().map(|(idx, (state_name, (accepting, transitions)))|
            DfaState {
                name: Rc::from(state_name.as_str()),
                initial: idx == initial_state,
                accepting,
                transitions: transitions.into_iter().map(Some).collect(),
            }
        ).collect();

        let mut alphabet: Vec<Rc<str>> = alphabet.clone().map(|c| Rc::from(c.to_string().as_str())).collect();
        alphabet.shuffle(&mut thread_rng());

        Dfa::from_parts(Rc::from(alphabet), states, initial_state)
    }
}

prop_compose! {
    fn dfa(max_states: usize, max_alphabet_size: usize)
        (num_states in 1..max_states, alphabet_size in 1..max_alphabet_size)
        (
            states in state_names(num_states),
            alphabet in alphabet_elems(alphabet_size),
            initial_state in 0..num_states,
            accepting_states in prop::collection::vec(any::<bool>(), num_states..=num_states),
            transitions in prop::collection::vec(dfa_transitions(num_states, alphabet_size), num_states..=num_states)
        )
    -> Dfa {
        let states = states.into_iter().zip(
            accepting_states.into_iter().zip(
                transitions.into_iter()
            )
        ).enumerate().map(|(idx, (state_name, (accepting, transitions)))|
            DfaState {
                name: Rc::from(state_name.as_str()),
                initial: idx == initial_state,
                accepting,
                transitions: transitions.into_iter().map(Some).collect(),
            }
        ).collect();

        Dfa::from_parts(
            alphabet.iter().map(|entry| Rc::from(entry.as_str())).collect(),
            states,
            initial_state,
        )
    }
}

prop_compose! {
    fn partial_dfa(max_states: usize, max_alphabet_size: usize)
        (num_states in 1..max_states, alphabet_size in 1..max_alphabet_size)
        (
            states in state_names(num_states),
            alphabet in alphabet_elems(alphabet_size),
            initial_state in 0..num_states,
            accepting_states in prop::collection::vec(any::<bool>(), num_states..=num_states),
            transitions in prop::collection::vec(
                prop::collection::vec(prop::option::of(0..num_states), alphabet_size..=alphabet_size),
                num_states..=num_states
            )
        )
    -> Dfa {
        let states = states.into_iter().zip(
            accepting_states.into_iter().zip(
                transitions.into_iter()
            )
        ).enumerate().map(|(idx, (state_name, (accepting, transitions)))|
            DfaState {
                name: Rc::from(state_name.as_str()),
                initial: idx == initial_state,
                accepting,
                transitions,
            }
        ).collect();

        Dfa::from_parts(
            alphabet.iter().map(|entry| Rc::from(entry.as_str())).collect(),
            states,
            initial_state,
        )
    }
}

prop_compose! {
    fn dfa_transitions(states: usize, alphabet_size: usize)
        (transitions in prop::collection::vec(0..states, alphabet_size..=alphabet_size))
    -> Vec<usize> {
        transitions
    }
}

prop_compose! {
    fn epsilon_transitions(states: usize)
        (transitions in prop::collection::vec(any::<bool>(), states..=states))
    -> Vec<usize> {
        let mut rng = thread_rng();
        let mut transitions: Vec<_> = transitions.into_iter()
            .enumerate()
            .filter_map(|(idx, b)| b.then_some(idx))
            .collect();
        transitions.shuffle(&mut rng);
        transitions
    }
}

prop_compose! {
    fn nfa_transitions(states: usize, alphabet_size: usize)
        (transitions in prop::collection::vec(
            prop::collection::vec(any::<bool>(), states..=states),
            alphabet_size..=alphabet_size
        ))
    -> Vec<Vec<usize>> {
        let mut rng = thread_rng();
        transitions.into_iter()
            .map(|row| {
                let mut row: Vec<usize> = row.into_iter()
                    .enumerate()
                    .filter_map(|(idx, b)| b.then_some(idx))
                    .collect();
                row.as_mut_slice().shuffle(&mut rng);
                row
            })
            .collect()
    }
}

prop_compose! {
    fn state_names(count: usize)
        (names in filtered_set(count, r"[^\s#{}]+", &["ε", "eps", "→", "->", "*", "-"]))
    -> Vec<String> {
        names
    }
}

prop_compose! {
    fn alphabet_elems(count: usize)
        (names in filtered_set(count, r"[^\s#{}]+", &["ε", "eps", "→", "->", "*", "-"]))
    -> Vec<String> {
        names
    }
}

prop_compose! {
    fn filtered_set(count: usize, regex: &'static str, deny: &'static [&'static str])
        (names in prop::collection::hash_set(
            regex.prop_filter(
                "name should not be reserved",
                |s| !deny.contains(&s.as_str()) && !s.contains(|c: char| c.is_whitespace())
            ),
            count..=count
        ))
    -> Vec<String> {
        let mut names: Vec<String> = names.into_iter().collect();
        names.sort();
        names
    }
}

fn random_regex() -> impl Strategy<Value = String> {
    "[a-d]".prop_recursive(8, 64, 10, |inner| {
        prop_oneof![
            6 => prop::collection::vec(inner.clone(), 1..6)
                .prop_map(|vec| format!("({})", vec.join(""))),
            6 => prop::collection::vec(inner.clone(), 1..6).prop_map(|vec| vec.join("|")),
            2 => inner.clone().prop_map(|r| format!("({r})*")),
            2 => inner.clone().prop_map(|r| format!("({r})?")),
        ]
    })
}

//! Direct constructors for common language patterns. Each builds its
//! machine outright instead of going through a regex or an NFA, and most
//! of them produce the minimal complete DFA for their language.

use crate::dfa::{Dfa, DfaState};
use crate::errors::MachineError;
use std::collections::{HashMap, HashSet, VecDeque};
use std::rc::Rc;
use unicode_segmentation::UnicodeSegmentation;

fn build_alphabet(input_symbols: &[&str]) -> Result<Rc<[Rc<str>]>, MachineError> {
    let mut seen = HashSet::new();
    for symbol in input_symbols {
        if !seen.insert(*symbol) {
            return Err(MachineError::InvalidSymbol(format!(
                "'{symbol}' appears twice in the alphabet"
            )));
        }
    }
    Ok(input_symbols.iter().map(|s| Rc::from(*s)).collect())
}

/// Splits a word into graphemes and resolves each to its alphabet index.
fn resolve_word(alphabet: &[Rc<str>], word: &str) -> Result<Vec<usize>, MachineError> {
    word.graphemes(true)
        .map(|grapheme| {
            alphabet
                .iter()
                .position(|s| s.as_ref() == grapheme)
                .ok_or_else(|| {
                    MachineError::InvalidSymbol(format!("'{grapheme}' is not in the alphabet"))
                })
        })
        .collect()
}

fn resolve_symbol_set(
    alphabet: &[Rc<str>],
    symbols: Option<&[&str]>,
) -> Result<Vec<bool>, MachineError> {
    match symbols {
        None => Ok(vec![true; alphabet.len()]),
        Some(symbols) => {
            let mut counted = vec![false; alphabet.len()];
            for symbol in symbols {
                let idx = alphabet
                    .iter()
                    .position(|s| s.as_ref() == *symbol)
                    .ok_or_else(|| {
                        MachineError::InvalidSymbol(format!("'{symbol}' is not in the alphabet"))
                    })?;
                counted[idx] = true;
            }
            Ok(counted)
        }
    }
}

/// Assembles a complete DFA from index-based rows, numbering the states.
fn assemble(
    alphabet: Rc<[Rc<str>]>,
    rows: Vec<Vec<usize>>,
    initial: usize,
    finals: &HashSet<usize>,
) -> Dfa {
    let states = rows
        .into_iter()
        .enumerate()
        .map(|(idx, row)| DfaState {
            name: Rc::from(idx.to_string()),
            initial: idx == initial,
            accepting: finals.contains(&idx),
            transitions: row.into_iter().map(Some).collect(),
        })
        .collect();
    Dfa::from_parts(alphabet, states, initial)
}

impl Dfa {
    /// The minimal DFA accepting every string over the alphabet.
    pub fn universal_language(input_symbols: &[&str]) -> Result<Dfa, MachineError> {
        let alphabet = build_alphabet(input_symbols)?;
        let row = vec![0; alphabet.len()];
        Ok(assemble(alphabet, vec![row], 0, &HashSet::from([0])))
    }

    /// The minimal DFA rejecting every string over the alphabet.
    pub fn empty_language(input_symbols: &[&str]) -> Result<Dfa, MachineError> {
        let alphabet = build_alphabet(input_symbols)?;
        let row = vec![0; alphabet.len()];
        Ok(assemble(alphabet, vec![row], 0, &HashSet::new()))
    }

    /// The minimal DFA for strings starting with `prefix` (or its
    /// complement when `contains` is false).
    pub fn from_prefix(
        input_symbols: &[&str],
        prefix: &str,
        contains: bool,
    ) -> Result<Dfa, MachineError> {
        let alphabet = build_alphabet(input_symbols)?;
        let word = resolve_word(&alphabet, prefix)?;
        let matched = word.len();
        let err = matched + 1;
        let mut rows = Vec::with_capacity(matched + 2);
        for (i, &expected) in word.iter().enumerate() {
            rows.push(
                (0..alphabet.len())
                    .map(|sym| if sym == expected { i + 1 } else { err })
                    .collect(),
            );
        }
        rows.push(vec![matched; alphabet.len()]);
        rows.push(vec![err; alphabet.len()]);
        let finals = flipped(&HashSet::from([matched]), rows.len(), contains);
        Ok(assemble(alphabet, rows, 0, &finals))
    }

    /// The minimal DFA for strings ending with `suffix` (or its
    /// complement when `contains` is false).
    pub fn from_suffix(
        input_symbols: &[&str],
        suffix: &str,
        contains: bool,
    ) -> Result<Dfa, MachineError> {
        Self::substring_automaton(input_symbols, suffix, contains, true)
    }

    /// The minimal DFA for strings containing `substring` (or its
    /// complement when `contains` is false). Transitions are precomputed
    /// with the Knuth-Morris-Pratt failure function.
    pub fn from_substring(
        input_symbols: &[&str],
        substring: &str,
        contains: bool,
    ) -> Result<Dfa, MachineError> {
        Self::substring_automaton(input_symbols, substring, contains, false)
    }

    fn substring_automaton(
        input_symbols: &[&str],
        substring: &str,
        contains: bool,
        must_be_suffix: bool,
    ) -> Result<Dfa, MachineError> {
        let alphabet = build_alphabet(input_symbols)?;
        let word = resolve_word(&alphabet, substring)?;
        let m = word.len();
        if m == 0 {
            // Every string contains (and ends with) the empty string.
            return if contains {
                Self::universal_language(input_symbols)
            } else {
                Self::empty_language(input_symbols)
            };
        }

        // KMP failure function, with an extra entry for the full match.
        let mut kmp: Vec<isize> = vec![-1; m];
        let mut candidate: isize = 0;
        for i in 1..m {
            if word[i] == word[candidate as usize] {
                kmp[i] = kmp[candidate as usize];
            } else {
                kmp[i] = candidate;
                while candidate >= 0 && word[candidate as usize] != word[i] {
                    candidate = kmp[candidate as usize];
                }
            }
            candidate += 1;
        }
        kmp.push(candidate);

        let mut rows: Vec<Vec<usize>> = vec![vec![m; alphabet.len()]; m + 1];
        // For the substring variant the match state absorbs; for the
        // suffix variant it keeps tracking partial matches.
        let limit = if must_be_suffix { m + 1 } else { m };
        for (i, row) in rows.iter_mut().enumerate().take(limit) {
            for (sym, entry) in row.iter_mut().enumerate() {
                let mut candidate = if i < m { i as isize } else { kmp[i] };
                while candidate != -1 && word[candidate as usize] != sym {
                    candidate = kmp[candidate as usize];
                }
                *entry = (candidate + 1) as usize;
            }
        }
        let finals = flipped(&HashSet::from([m]), rows.len(), contains);
        Ok(assemble(alphabet, rows, 0, &finals))
    }

    /// The minimal DFA for strings containing `subsequence` as a (not
    /// necessarily contiguous) subsequence, or its complement.
    pub fn from_subsequence(
        input_symbols: &[&str],
        subsequence: &str,
        contains: bool,
    ) -> Result<Dfa, MachineError> {
        let alphabet = build_alphabet(input_symbols)?;
        let word = resolve_word(&alphabet, subsequence)?;
        let mut rows: Vec<Vec<usize>> = vec![(0..alphabet.len()).map(|_| 0).collect()];
        for (prev, &expected) in word.iter().enumerate() {
            let next = prev + 1;
            rows.push(vec![next; alphabet.len()]);
            rows[prev][expected] = next;
        }
        let finals = flipped(&HashSet::from([word.len()]), rows.len(), contains);
        Ok(assemble(alphabet, rows, 0, &finals))
    }

    /// The DFA accepting strings containing any of the given substrings,
    /// built directly as an Aho-Corasick trie whose failure links are
    /// projected onto complete transitions (or the complement when
    /// `contains` is false).
    pub fn from_substrings(
        input_symbols: &[&str],
        substrings: &[&str],
        contains: bool,
    ) -> Result<Dfa, MachineError> {
        let alphabet = build_alphabet(input_symbols)?;
        if substrings.is_empty() {
            return if contains {
                Self::empty_language(input_symbols)
            } else {
                Self::universal_language(input_symbols)
            };
        }
        if substrings.iter().any(|s| s.is_empty()) {
            return if contains {
                Self::universal_language(input_symbols)
            } else {
                Self::empty_language(input_symbols)
            };
        }

        // Trie with one node per pattern prefix.
        let mut children: Vec<Vec<Option<usize>>> = vec![vec![None; alphabet.len()]];
        let mut output = vec![false];
        for pattern in substrings {
            let word = resolve_word(&alphabet, pattern)?;
            let mut node = 0;
            for sym in word {
                node = match children[node][sym] {
                    Some(child) => child,
                    None => {
                        children.push(vec![None; alphabet.len()]);
                        output.push(false);
                        let child = children.len() - 1;
                        children[node][sym] = Some(child);
                        child
                    }
                };
            }
            output[node] = true;
        }

        // Failure links by BFS; goto() resolves through them, and a
        // node matches if any suffix on its failure chain matches.
        let mut fail = vec![0usize; children.len()];
        let mut goto: Vec<Vec<usize>> = vec![vec![0; alphabet.len()]; children.len()];
        let mut queue = VecDeque::new();
        for sym in 0..alphabet.len() {
            match children[0][sym] {
                Some(child) => {
                    fail[child] = 0;
                    goto[0][sym] = child;
                    queue.push_back(child);
                }
                None => goto[0][sym] = 0,
            }
        }
        while let Some(node) = queue.pop_front() {
            output[node] = output[node] || output[fail[node]];
            for sym in 0..alphabet.len() {
                match children[node][sym] {
                    Some(child) => {
                        fail[child] = goto[fail[node]][sym];
                        goto[node][sym] = child;
                        queue.push_back(child);
                    }
                    None => goto[node][sym] = goto[fail[node]][sym],
                }
            }
        }

        // Project to a DFA with a single absorbing match state.
        let sink = children.len();
        let rows: Vec<Vec<usize>> = (0..=children.len())
            .map(|node| {
                (0..alphabet.len())
                    .map(|sym| {
                        if node == sink || output[goto[node][sym]] {
                            sink
                        } else {
                            goto[node][sym]
                        }
                    })
                    .collect()
            })
            .collect();
        let finals = flipped(&HashSet::from([sink]), rows.len(), contains);
        Ok(assemble(alphabet, rows, 0, &finals))
    }

    /// The minimal DFA counting occurrences of `symbols_to_count`
    /// (defaulting to the whole alphabet) against a length window: a
    /// string is accepted when its count lies in
    /// `min_length..=max_length`, with `None` leaving the window open
    /// upwards.
    pub fn of_length(
        input_symbols: &[&str],
        min_length: usize,
        max_length: Option<usize>,
        symbols_to_count: Option<&[&str]>,
    ) -> Result<Dfa, MachineError> {
        let alphabet = build_alphabet(input_symbols)?;
        let counted = resolve_symbol_set(&alphabet, symbols_to_count)?;
        let chain = match max_length {
            None => min_length,
            Some(max) => max + 1,
        };
        let mut rows = Vec::with_capacity(chain + 1);
        for prev in 0..chain {
            rows.push(
                counted
                    .iter()
                    .map(|&c| if c { prev + 1 } else { prev })
                    .collect(),
            );
        }
        let last = rows.len();
        rows.push(vec![last; alphabet.len()]);
        let finals = match max_length {
            None => HashSet::from([last]),
            Some(max) => (min_length..=max).collect(),
        };
        Ok(assemble(alphabet, rows, 0, &finals))
    }

    /// The residue automaton modulo `k`: accepts strings where the count
    /// of `symbols_to_count` (default: all symbols) is congruent to one
    /// of `remainders` (default: {0}) modulo `k`.
    ///
    /// Panics if `k` is zero or a remainder is not below `k`; those are
    /// programmer errors, not data errors.
    pub fn count_mod(
        input_symbols: &[&str],
        k: usize,
        remainders: Option<&[usize]>,
        symbols_to_count: Option<&[&str]>,
    ) -> Result<Dfa, MachineError> {
        assert!(k > 0, "the modulus must be positive");
        let alphabet = build_alphabet(input_symbols)?;
        let counted = resolve_symbol_set(&alphabet, symbols_to_count)?;
        let finals: HashSet<usize> = match remainders {
            None => HashSet::from([0]),
            Some(remainders) => {
                assert!(
                    remainders.iter().all(|&r| r < k),
                    "remainders must be below the modulus"
                );
                remainders.iter().copied().collect()
            }
        };
        let rows = (0..k)
            .map(|i| {
                counted
                    .iter()
                    .map(|&c| if c { (i + 1) % k } else { i })
                    .collect()
            })
            .collect();
        Ok(assemble(alphabet, rows, 0, &finals))
    }

    /// The minimal DFA accepting words whose `n`-th symbol from the
    /// start is `symbol` (`n` counted from 1).
    ///
    /// Panics if `n` is zero.
    pub fn nth_from_start(
        input_symbols: &[&str],
        symbol: &str,
        n: usize,
    ) -> Result<Dfa, MachineError> {
        assert!(n > 0, "the position must be positive");
        let alphabet = build_alphabet(input_symbols)?;
        let target = alphabet
            .iter()
            .position(|s| s.as_ref() == symbol)
            .ok_or_else(|| {
                MachineError::InvalidSymbol(format!("'{symbol}' is not in the alphabet"))
            })?;
        if alphabet.len() == 1 {
            return Self::of_length(input_symbols, n, None, None);
        }
        let mut rows: Vec<Vec<usize>> = (0..n).map(|i| vec![i + 1; alphabet.len()]).collect();
        rows[n - 1] = vec![n; alphabet.len()];
        rows[n - 1][target] = n + 1;
        rows.push(vec![n; alphabet.len()]);
        rows.push(vec![n + 1; alphabet.len()]);
        Ok(assemble(alphabet, rows, 0, &HashSet::from([n + 1])))
    }

    /// The minimal DFA accepting words whose `n`-th symbol from the end
    /// is `symbol` (`n` counted from 1). The states are the bitstrings
    /// of length `n` recording which of the last `n` symbols matched, so
    /// the machine has `2^n` states.
    ///
    /// Panics if `n` is zero.
    pub fn nth_from_end(
        input_symbols: &[&str],
        symbol: &str,
        n: usize,
    ) -> Result<Dfa, MachineError> {
        assert!(n > 0, "the position must be positive");
        let alphabet = build_alphabet(input_symbols)?;
        let target = alphabet
            .iter()
            .position(|s| s.as_ref() == symbol)
            .ok_or_else(|| {
                MachineError::InvalidSymbol(format!("'{symbol}' is not in the alphabet"))
            })?;
        if alphabet.len() == 1 {
            return Self::of_length(input_symbols, n, None, None);
        }
        let count = 1usize << n;
        let rows = (0..count)
            .map(|state| {
                (0..alphabet.len())
                    .map(|sym| {
                        if sym == target {
                            (2 * state + 1) % count
                        } else {
                            (2 * state) % count
                        }
                    })
                    .collect()
            })
            .collect();
        let finals = (count / 2..count).collect();
        Ok(assemble(alphabet, rows, 0, &finals))
    }

    /// The minimal (partial) DFA for a finite language, built with the
    /// incremental construction of Mihov and Schulz: the words are added
    /// to a trie in sorted order, and after each word the suffixes that
    /// cannot be shared with the next word are compressed against the
    /// signatures (finality plus outgoing transitions) seen so far.
    pub fn from_finite_language(
        input_symbols: &[&str],
        language: &[&str],
    ) -> Result<Dfa, MachineError> {
        type Signature = (bool, Vec<(usize, String)>);

        let alphabet = build_alphabet(input_symbols)?;
        let mut words: Vec<Vec<usize>> = language
            .iter()
            .map(|word| resolve_word(&alphabet, word))
            .collect::<Result<_, _>>()?;
        words.sort();
        words.dedup();
        if words.is_empty() {
            return Self::empty_language(input_symbols);
        }

        // Trie states are keyed by their prefix, encoded as the joined
        // symbol indices.
        let key = |word: &[usize]| -> String {
            word.iter()
                .map(|sym| sym.to_string())
                .collect::<Vec<_>>()
                .join(",")
        };

        let mut transitions: HashMap<String, HashMap<usize, String>> = HashMap::new();
        let mut back_map: HashMap<String, HashSet<String>> =
            HashMap::from([(String::new(), HashSet::new())]);
        let mut final_states: HashSet<String> = HashSet::new();
        let mut signatures: HashMap<Signature, String> = HashMap::new();

        let signature_of = |prefix: &str,
                            transitions: &HashMap<String, HashMap<usize, String>>,
                            final_states: &HashSet<String>|
         -> Signature {
            let mut items: Vec<(usize, String)> = transitions
                .get(prefix)
                .map(|paths| paths.iter().map(|(s, t)| (*s, t.clone())).collect())
                .unwrap_or_default();
            items.sort();
            (final_states.contains(prefix), items)
        };

        let add_to_trie = |word: &[usize],
                               transitions: &mut HashMap<String, HashMap<usize, String>>,
                               final_states: &mut HashSet<String>,
                               back_map: &mut HashMap<String, HashSet<String>>| {
            for i in 0..word.len() {
                let prefix = key(&word[..i]);
                let next_prefix = key(&word[..i + 1]);
                transitions
                    .entry(prefix.clone())
                    .or_default()
                    .entry(word[i])
                    .or_insert_with(|| next_prefix.clone());
                back_map.entry(next_prefix).or_default().insert(prefix);
            }
            transitions.entry(key(word)).or_default();
            final_states.insert(key(word));
        };

        let lcp = |a: &[usize], b: &[usize]| -> usize {
            a.iter().zip(b.iter()).take_while(|(x, y)| x == y).count()
        };

        let mut compress = |word: &[usize],
                            next_word: &[usize],
                            transitions: &mut HashMap<String, HashMap<usize, String>>,
                            final_states: &mut HashSet<String>,
                            back_map: &mut HashMap<String, HashSet<String>>| {
            let shared = lcp(word, next_word);
            for i in (shared + 1..=word.len()).rev() {
                let prefix = key(&word[..i]);
                let signature = signature_of(&prefix, transitions, final_states);
                match signatures.get(&signature).cloned() {
                    Some(identical) => {
                        final_states.remove(&prefix);
                        transitions.remove(&prefix);
                        let parents = back_map.get(&prefix).cloned().unwrap_or_default();
                        for parent in parents {
                            if let Some(paths) = transitions.get_mut(&parent) {
                                for target in paths.values_mut() {
                                    if *target == prefix {
                                        *target = identical.clone();
                                    }
                                }
                            }
                            back_map.entry(identical.clone()).or_default().insert(parent);
                        }
                    }
                    None => {
                        signatures.insert(signature, prefix);
                    }
                }
            }
        };

        let mut iter = words.iter();
        let mut prev = iter.next().expect("the language is not empty");
        add_to_trie(prev, &mut transitions, &mut final_states, &mut back_map);
        for word in iter {
            compress(
                prev,
                word,
                &mut transitions,
                &mut final_states,
                &mut back_map,
            );
            add_to_trie(word, &mut transitions, &mut final_states, &mut back_map);
            prev = word;
        }
        compress(
            prev,
            &[],
            &mut transitions,
            &mut final_states,
            &mut back_map,
        );

        // Assemble the partial DFA, numbering states deterministically.
        let mut prefixes: Vec<&String> = transitions.keys().collect();
        prefixes.sort();
        let index_of: HashMap<&str, usize> = prefixes
            .iter()
            .enumerate()
            .map(|(idx, prefix)| (prefix.as_str(), idx))
            .collect();
        let initial = index_of[""];
        let states = prefixes
            .iter()
            .enumerate()
            .map(|(idx, prefix)| DfaState {
                name: Rc::from(idx.to_string()),
                initial: idx == initial,
                accepting: final_states.contains(*prefix),
                transitions: (0..alphabet.len())
                    .map(|sym| {
                        transitions[*prefix]
                            .get(&sym)
                            .map(|target| index_of[target.as_str()])
                    })
                    .collect(),
            })
            .collect();
        Ok(Dfa::from_parts(alphabet, states, initial))
    }
}

fn flipped(finals: &HashSet<usize>, state_count: usize, contains: bool) -> HashSet<usize> {
    if contains {
        finals.clone()
    } else {
        (0..state_count).filter(|idx| !finals.contains(idx)).collect()
    }
}

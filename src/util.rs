use std::collections::{HashMap, HashSet};
use std::hash::Hash;
use std::rc::Rc;

/// Checks whether two alphabets contain the same symbols, ignoring order.
#[inline]
pub fn alphabet_equal(a: &[Rc<str>], b: &[Rc<str>]) -> bool {
    if a.len() != b.len() {
        return false;
    }

    let set1 = a.iter().collect::<HashSet<_>>();
    let set2 = b.iter().collect::<HashSet<_>>();
    set1 == set2
}

/// Maps every symbol of `from` to its index in `to`. The alphabets must
/// contain the same symbols (check with [alphabet_equal] first).
pub fn alphabet_translation(from: &[Rc<str>], to: &[Rc<str>]) -> Vec<usize> {
    from.iter()
        .map(|elem1| {
            to.iter()
                .enumerate()
                .find_map(|(idx, elem2)| (elem1 == elem2).then_some(idx))
                .expect("translation requires equal alphabets")
        })
        .collect()
}

/// Converts a set to a sorted `Vec`, which is hashable and has a
/// deterministic ordering.
pub fn set_to_vec<T: Clone + Ord>(set: &HashSet<T>) -> Vec<T> {
    let mut vec = set.iter().cloned().collect::<Vec<_>>();
    vec.sort();
    vec
}

/// A disjoint-set structure over arbitrary hashable items, with path
/// compression. Items are implicitly their own singleton set until
/// unioned. Drives the Hopcroft-Karp equivalence checks.
#[derive(Debug, Default)]
pub struct UnionFind<T: Hash + Eq + Clone> {
    parent: HashMap<T, T>,
}

impl<T: Hash + Eq + Clone> UnionFind<T> {
    pub fn new() -> Self {
        Self {
            parent: HashMap::new(),
        }
    }

    /// The representative of the set containing `item`.
    pub fn find(&mut self, item: &T) -> T {
        let mut root = item.clone();
        while let Some(p) = self.parent.get(&root) {
            if *p == root {
                break;
            }
            root = p.clone();
        }
        // path compression
        let mut current = item.clone();
        while current != root {
            let next = self.parent[&current].clone();
            self.parent.insert(current, root.clone());
            current = next;
        }
        root
    }

    /// Merges the sets containing `a` and `b`.
    pub fn union(&mut self, a: &T, b: &T) {
        let root_a = self.find(a);
        let root_b = self.find(b);
        if root_a != root_b {
            self.parent.insert(root_a, root_b);
        }
    }
}

/// Renders a set of state names the way subset-construction states are
/// named: members sorted and joined inside braces.
pub fn frozen_name(members: &[Rc<str>]) -> Rc<str> {
    let mut sorted = members.to_vec();
    sorted.sort();
    let inner = sorted
        .iter()
        .map(|s| s as &str)
        .collect::<Vec<_>>()
        .join(" ");
    Rc::from(format!("{{{inner}}}"))
}

//! A partition refinement structure over state indices, used by DFA
//! minimization. Space is linear in the number of items and each
//! [refine](PartitionRefinement::refine) call takes time proportional to
//! the size of its argument.

use std::collections::{HashMap, HashSet};

/// Maintains a partition of `0..n` into disjoint classes. Initially all
/// items share a single class. Classes are identified by `usize` ids that
/// stay valid across refinements: refining a class keeps the shrunken
/// remainder under the old id and gives the split-off part a fresh id.
#[derive(Debug, Clone)]
pub struct PartitionRefinement {
    /// Class id of each item.
    class_of: Vec<usize>,
    /// Members of each class, keyed by class id.
    members: HashMap<usize, Vec<usize>>,
    next_id: usize,
}

impl PartitionRefinement {
    /// Creates a partition of the items `0..n` with all items in one
    /// class (id 0).
    pub fn new(n: usize) -> Self {
        let mut members = HashMap::new();
        members.insert(0, (0..n).collect());
        Self {
            class_of: vec![0; n],
            members,
            next_id: 1,
        }
    }

    /// The id of the class currently containing `item`.
    pub fn class_of(&self, item: usize) -> usize {
        self.class_of[item]
    }

    /// The members of the class with the given id.
    pub fn class(&self, id: usize) -> &[usize] {
        &self.members[&id]
    }

    /// All current class ids.
    pub fn class_ids(&self) -> impl Iterator<Item = usize> + '_ {
        self.members.keys().copied()
    }

    /// All current classes.
    pub fn classes(&self) -> impl Iterator<Item = &[usize]> {
        self.members.values().map(|v| v.as_slice())
    }

    /// Refines every class A into A∩S and A∖S, for the given set S of
    /// items. Returns one `(new_id, old_id)` pair per class that was
    /// actually split, where `new_id` identifies A∩S (freshly created)
    /// and `old_id` the shrunken A∖S.
    pub fn refine(&mut self, set: impl IntoIterator<Item = usize>) -> Vec<(usize, usize)> {
        let mut hit: HashMap<usize, HashSet<usize>> = HashMap::new();
        for item in set {
            hit.entry(self.class_of[item]).or_default().insert(item);
        }

        let mut output = Vec::new();
        for (old_id, intersection) in hit {
            // The hit items form a subset of the class, so comparing
            // lengths decides whether the split is proper.
            if intersection.len() == self.members[&old_id].len() {
                continue;
            }
            let new_id = self.next_id;
            self.next_id += 1;
            for &item in &intersection {
                self.class_of[item] = new_id;
            }
            let class = self.members.get_mut(&old_id).expect("class id is live");
            class.retain(|&item| self.class_of[item] == old_id);
            self.members.insert(new_id, intersection.into_iter().collect());
            output.push((new_id, old_id));
        }
        output
    }
}

#[cfg(test)]
mod tests {
    use super::PartitionRefinement;

    #[test]
    fn initial_partition_has_one_class() {
        let partition = PartitionRefinement::new(4);
        assert_eq!(partition.classes().count(), 1);
        assert_eq!(partition.class(partition.class_of(2)), &[0, 1, 2, 3]);
    }

    #[test]
    fn refine_splits_classes() {
        let mut partition = PartitionRefinement::new(5);
        let split = partition.refine([1, 3]);
        assert_eq!(split.len(), 1);
        let (new_id, old_id) = split[0];
        let mut new_class = partition.class(new_id).to_vec();
        new_class.sort();
        assert_eq!(new_class, vec![1, 3]);
        let mut old_class = partition.class(old_id).to_vec();
        old_class.sort();
        assert_eq!(old_class, vec![0, 2, 4]);
    }

    #[test]
    fn refine_with_whole_class_is_noop() {
        let mut partition = PartitionRefinement::new(3);
        assert!(partition.refine([0, 1, 2]).is_empty());
        assert_eq!(partition.classes().count(), 1);
    }

    #[test]
    fn refine_twice() {
        let mut partition = PartitionRefinement::new(6);
        partition.refine([0, 1, 2]);
        let split = partition.refine([2, 3]);
        // {0 1 2} splits into {2} / {0 1}, and {3 4 5} into {3} / {4 5}
        assert_eq!(split.len(), 2);
        assert_eq!(partition.classes().count(), 4);
    }
}

use std::{cmp::Ordering, collections::BinaryHeap};

use crate::core::rdd::shuffle_rdd::KeyComparator;

struct Head<'a, K, V, C> {
    item: (K, V),
    source: usize,
    comparator: &'a C,
}

impl<K, V, C: KeyComparator<Key = K>> PartialEq for Head<'_, K, V, C> {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl<K, V, C: KeyComparator<Key = K>> Eq for Head<'_, K, V, C> {}

impl<K, V, C: KeyComparator<Key = K>> PartialOrd for Head<'_, K, V, C> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

// `BinaryHeap` pops the greatest element, so the comparator is flipped here.
impl<K, V, C: KeyComparator<Key = K>> Ord for Head<'_, K, V, C> {
    fn cmp(&self, other: &Self) -> Ordering {
        self.comparator
            .compare(&other.item.0, &self.item.0)
            .then_with(|| other.source.cmp(&self.source))
    }
}

/// K-way merge of partitions that are each already sorted by `comparator`.
/// On equal keys the lower partition index goes first.
pub fn merge_sorted<K, V, C>(partitions: Vec<Vec<(K, V)>>, comparator: &C) -> Vec<(K, V)>
where
    C: KeyComparator<Key = K>,
{
    let total = partitions.iter().map(Vec::len).sum();
    let mut sources: Vec<_> = partitions.into_iter().map(Vec::into_iter).collect();
    let mut heap = BinaryHeap::with_capacity(sources.len());
    for (source, it) in sources.iter_mut().enumerate() {
        if let Some(item) = it.next() {
            heap.push(Head {
                item,
                source,
                comparator,
            });
        }
    }

    let mut merged = Vec::with_capacity(total);
    while let Some(Head { item, source, .. }) = heap.pop() {
        merged.push(item);
        if let Some(item) = sources[source].next() {
            heap.push(Head {
                item,
                source,
                comparator,
            });
        }
    }
    merged
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{core::spark::comparator::DoubleDecreasing, record::Revenue};

    fn part(values: &[(f64, &'static str)]) -> Vec<(Revenue, &'static str)> {
        values.iter().map(|(r, c)| (Revenue(*r), *c)).collect()
    }

    #[test]
    fn merges_descending_partitions() {
        let merged = merge_sorted(
            vec![
                part(&[(90.0, "a"), (40.0, "b"), (10.0, "c")]),
                part(&[]),
                part(&[(100.0, "d"), (40.0, "e"), (5.0, "f")]),
            ],
            &DoubleDecreasing,
        );
        let order: Vec<&str> = merged.iter().map(|(_, c)| *c).collect();
        assert_eq!(order, vec!["d", "a", "b", "e", "c", "f"]);
    }

    #[test]
    fn nothing_to_merge() {
        let merged: Vec<(Revenue, ())> = merge_sorted(vec![Vec::new(), Vec::new()], &DoubleDecreasing);
        assert!(merged.is_empty());
    }
}

use std::hash::Hash;

use radsort::sort_by_key;
use rustc_hash::{FxHashMap, FxHashSet};

/// Splits `rows` into groups by `group`, each group ordered ascending by `order`.
///
/// Rows that tie on `order` keep their incoming relative order (radsort is a
/// stable LSD sort), so callers that need a deterministic tie-break sort their
/// input by it first. Groups come back sorted by key.
pub fn group_sorted_by<T, K, S, G, O>(mut rows: Vec<T>, group: G, order: O) -> Vec<(K, Vec<T>)>
where
    K: Hash + Eq + Ord,
    S: radsort::Key,
    G: Fn(&T) -> K,
    O: Fn(&T) -> S,
{
    sort_by_key(&mut rows, |r| order(r));

    let mut groups: FxHashMap<K, Vec<T>> = FxHashMap::default();
    for row in rows {
        groups.entry(group(&row)).or_default().push(row);
    }

    let mut groups: Vec<(K, Vec<T>)> = groups.into_iter().collect();
    groups.sort_by(|a, b| a.0.cmp(&b.0));
    groups
}

/// Keeps, for every group, the row that comes last when the group is sorted
/// ascending by `order`.
pub fn last_by<T, K, S, G, O>(rows: Vec<T>, group: G, order: O) -> Vec<T>
where
    K: Hash + Eq + Ord,
    S: radsort::Key,
    G: Fn(&T) -> K,
    O: Fn(&T) -> S,
{
    group_sorted_by(rows, group, order)
        .into_iter()
        .filter_map(|(_, mut members)| members.pop())
        .collect()
}

/// Keeps the first row seen for every key and reports how many were dropped.
pub fn unique_by<T, K, G>(rows: Vec<T>, key: G) -> (Vec<T>, usize)
where
    K: Hash + Eq,
    G: Fn(&T) -> K,
{
    let mut seen = FxHashSet::default();
    let before = rows.len();
    let kept: Vec<T> = rows.into_iter().filter(|r| seen.insert(key(r))).collect();
    let dropped = before - kept.len();
    (kept, dropped)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn groups_are_ordered_by_key_and_value() {
        let rows = vec![("b", 3), ("a", 2), ("b", 1), ("a", 5)];
        let groups = group_sorted_by(rows, |r| r.0, |r| r.1);
        assert_eq!(
            groups,
            vec![("a", vec![("a", 2), ("a", 5)]), ("b", vec![("b", 1), ("b", 3)])]
        );
    }

    #[test]
    fn last_by_picks_maximum() {
        let rows = vec![("x", 2.0, 'p'), ("x", 9.0, 'q'), ("x", 4.0, 'r'), ("y", 1.0, 's')];
        let last = last_by(rows, |r| r.0, |r| r.1);
        assert_eq!(last, vec![("x", 9.0, 'q'), ("y", 1.0, 's')]);
    }

    #[test]
    fn last_by_ties_keep_input_order() {
        let rows = vec![(1, 5, 'a'), (1, 5, 'b'), (1, 3, 'c')];
        let last = last_by(rows, |r| r.0, |r| r.1);
        assert_eq!(last, vec![(1, 5, 'b')]);
    }

    #[test]
    fn unique_by_counts_duplicates() {
        let (kept, dropped) = unique_by(vec![1, 2, 1, 3, 2], |v| *v);
        assert_eq!(kept, vec![1, 2, 3]);
        assert_eq!(dropped, 2);
    }
}

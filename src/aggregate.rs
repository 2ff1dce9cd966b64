//! Partial values and the fold that merges them.
//!
//! The same [`fold`] runs as the local pre-combine and as the final
//! reduce, so every [`Aggregate::merge`] must be associative and
//! commutative: applying it once over all partials or repeatedly over
//! pre-combined sub-results gives the same value.

use std::collections::btree_map::{self, BTreeMap};

use serde::{Deserialize, Serialize};

pub trait Aggregate: Sized {
    fn merge(self, other: Self) -> Self;
}

/// Merges a finite collection of partial values. `None` when empty.
pub fn fold<V, I>(values: I) -> Option<V>
where
    V: Aggregate,
    I: IntoIterator<Item = V>,
{
    values.into_iter().reduce(Aggregate::merge)
}

/// Per-document occurrence counts for one term. Counts are always >= 1.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Postings(BTreeMap<String, u64>);

impl Postings {
    /// A single raw occurrence of the term in `doc_id`.
    pub fn occurrence(doc_id: impl Into<String>) -> Self {
        let mut map = BTreeMap::new();
        map.insert(doc_id.into(), 1);
        Self(map)
    }

    pub fn get(&self, doc_id: &str) -> Option<u64> {
        self.0.get(doc_id).copied()
    }

    /// Documents in ascending docID order.
    pub fn iter(&self) -> btree_map::Iter<'_, String, u64> {
        self.0.iter()
    }
}

impl Aggregate for Postings {
    fn merge(self, other: Self) -> Self {
        let (mut big, small) = if self.0.len() >= other.0.len() {
            (self, other)
        } else {
            (other, self)
        };
        for (doc_id, count) in small.0 {
            *big.0.entry(doc_id).or_insert(0) += count;
        }
        big
    }
}

impl FromIterator<(String, u64)> for Postings {
    fn from_iter<T: IntoIterator<Item = (String, u64)>>(iter: T) -> Self {
        let mut map = BTreeMap::new();
        for (doc_id, count) in iter.into_iter().filter(|(_, c)| *c > 0) {
            *map.entry(doc_id).or_insert(0) += count;
        }
        Self(map)
    }
}

/// Occurrence count for one (phrase, docID) key.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Count(pub u64);

impl Count {
    pub const ONE: Count = Count(1);
}

impl Aggregate for Count {
    fn merge(self, other: Self) -> Self {
        Count(self.0 + other.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn postings(pairs: &[(&str, u64)]) -> Postings {
        pairs.iter().map(|(d, c)| (d.to_string(), *c)).collect()
    }

    #[test]
    fn fold_of_nothing_is_none() {
        assert_eq!(fold(Vec::<Count>::new()), None);
        assert_eq!(fold(Vec::<Postings>::new()), None);
    }

    #[test]
    fn occurrences_sum_per_document() {
        let merged = fold(vec![
            Postings::occurrence("doc1"),
            Postings::occurrence("doc2"),
            Postings::occurrence("doc1"),
        ])
        .unwrap();
        assert_eq!(merged, postings(&[("doc1", 2), ("doc2", 1)]));
    }

    #[test]
    fn postings_merge_is_associative_and_commutative() {
        let a = postings(&[("d1", 1), ("d2", 3)]);
        let b = postings(&[("d2", 1)]);
        let c = postings(&[("d3", 2), ("d1", 4)]);
        let expected = postings(&[("d1", 5), ("d2", 4), ("d3", 2)]);

        let left = a.clone().merge(b.clone()).merge(c.clone());
        let right = a.clone().merge(b.clone().merge(c.clone()));
        let shuffled = c.clone().merge(a.clone()).merge(b.clone());
        let grouped = fold(vec![fold(vec![b, c]).unwrap(), a]).unwrap();

        assert_eq!(left, expected);
        assert_eq!(right, expected);
        assert_eq!(shuffled, expected);
        assert_eq!(grouped, expected);
    }

    #[test]
    fn precombined_counts_sum_like_raw_ones() {
        let raw = fold(vec![Count::ONE; 5]).unwrap();
        let staged = fold(vec![
            fold(vec![Count::ONE; 2]).unwrap(),
            fold(vec![Count::ONE; 3]).unwrap(),
        ])
        .unwrap();
        assert_eq!(raw, Count(5));
        assert_eq!(staged, raw);
    }

    #[test]
    fn postings_iterate_in_doc_order_and_serialize_as_object() {
        let p = postings(&[("b", 1), ("a", 2)]);
        let docs: Vec<_> = p.iter().map(|(d, _)| d.as_str()).collect();
        assert_eq!(docs, vec!["a", "b"]);
        assert_eq!(serde_json::to_string(&p).unwrap(), r#"{"a":2,"b":1}"#);
        assert_eq!(serde_json::to_string(&Count(7)).unwrap(), "7");
    }
}

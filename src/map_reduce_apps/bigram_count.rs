use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::aggregate::Count;
use crate::common::MapReduceApp;
use crate::normalize::Normalizer;
use crate::phrases::TargetPhraseSet;
use crate::record::Document;

/// Composite key for one target phrase inside one document.
///
/// Displays as `(phrase, docID)`. Phrases only contain `[a-z0-9 ]`, so the
/// first `", "` always ends the phrase and the text form parses back
/// unambiguously even when the docID contains `", "` or `)`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct PhraseKey {
    pub phrase: String,
    pub doc_id: String,
}

impl PhraseKey {
    pub fn new(phrase: impl Into<String>, doc_id: impl Into<String>) -> Self {
        Self {
            phrase: phrase.into(),
            doc_id: doc_id.into(),
        }
    }

    pub fn parse(text: &str) -> Option<Self> {
        let inner = text.strip_prefix('(')?.strip_suffix(')')?;
        let (phrase, doc_id) = inner.split_once(", ")?;
        if phrase.is_empty() || doc_id.is_empty() {
            return None;
        }
        Some(Self::new(phrase, doc_id))
    }
}

impl fmt::Display for PhraseKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.phrase, self.doc_id)
    }
}

/// One `(PhraseKey, 1)` pair per adjacent token pair found in `phrases`.
/// Overlapping matches are all emitted.
pub fn bigram_pairs<'a>(
    doc_id: &'a str,
    tokens: &'a [String],
    phrases: &'a TargetPhraseSet,
) -> impl Iterator<Item = (PhraseKey, Count)> + 'a {
    tokens
        .windows(2)
        .filter(move |pair| phrases.contains(&pair[0], &pair[1]))
        .map(move |pair| {
            (
                PhraseKey::new(format!("{} {}", pair[0], pair[1]), doc_id),
                Count::ONE,
            )
        })
}

/// (phrase, docID) -> count
#[derive(Debug, Clone)]
pub struct BigramCount {
    normalizer: Normalizer,
    phrases: Arc<TargetPhraseSet>,
}

impl BigramCount {
    pub fn new(phrases: Arc<TargetPhraseSet>) -> Self {
        Self {
            normalizer: Normalizer::new(),
            phrases,
        }
    }
}

impl MapReduceApp for BigramCount {
    type Key = PhraseKey;
    type Value = Count;

    fn name(&self) -> &'static str {
        "bigram"
    }

    fn map(&self, doc: &Document) -> Vec<(PhraseKey, Count)> {
        let tokens = self.normalizer.tokenize(&doc.content);
        bigram_pairs(&doc.id, &tokens, &self.phrases).collect()
    }

    fn render(&self, key: &PhraseKey, count: &Count) -> Vec<String> {
        vec![format!("{}\t{}", key, count.0)]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn app(phrases: &[&str]) -> BigramCount {
        BigramCount::new(Arc::new(TargetPhraseSet::new(phrases).unwrap()))
    }

    fn doc(id: &str, content: &str) -> Document {
        Document {
            id: id.to_string(),
            content: content.to_string(),
        }
    }

    fn total(app: &BigramCount, d: &Document, key: &PhraseKey) -> Option<Count> {
        let values: Vec<_> = app
            .map(d)
            .into_iter()
            .filter(|(k, _)| k == key)
            .map(|(_, v)| v)
            .collect();
        app.reduce(key, values)
    }

    #[test]
    fn overlapping_matches_are_counted() {
        let a = app(&["a a"]);
        let d = doc("d1", "a a a");
        assert_eq!(total(&a, &d, &PhraseKey::new("a a", "d1")), Some(Count(2)));
    }

    #[test]
    fn case_is_normalized() {
        let a = app(&["los angeles"]);
        let d = doc("d1", "Los Angeles, then los angeles; LOS ANGELES.");
        let records = a.map(&d);
        assert_eq!(records.len(), 3);
        assert!(records
            .iter()
            .all(|(k, v)| *k == PhraseKey::new("los angeles", "d1") && *v == Count::ONE));
    }

    #[test]
    fn reference_document() {
        let a = BigramCount::new(Arc::new(TargetPhraseSet::default()));
        let d = doc("doc1", "Computer Science is fun. Computer science!");
        let key = PhraseKey::new("computer science", "doc1");
        let count = total(&a, &d, &key).unwrap();
        assert_eq!(a.render(&key, &count), vec!["(computer science, doc1)\t2"]);
    }

    #[test]
    fn only_contiguous_pairs_match() {
        let a = app(&["power politics"]);
        assert!(a.map(&doc("d", "power and politics")).is_empty());
        assert!(a.map(&doc("d", "politics power")).is_empty());
        assert!(a.map(&doc("d", "power")).is_empty());
        assert!(a.map(&doc("d", "")).is_empty());
        assert_eq!(a.map(&doc("d", "power...politics")).len(), 1);
    }

    #[test]
    fn key_text_round_trips_with_awkward_doc_ids() {
        for doc_id in ["doc1", "a, b", "x)", "(y, z)", "tab-free, ) , "] {
            let key = PhraseKey::new("bruce willis", doc_id);
            assert_eq!(PhraseKey::parse(&key.to_string()), Some(key));
        }
        assert_eq!(PhraseKey::parse("bruce willis, doc1"), None);
        assert_eq!(PhraseKey::parse("(bruce willis doc1)"), None);
    }
}

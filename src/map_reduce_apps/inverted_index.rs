use crate::aggregate::Postings;
use crate::common::MapReduceApp;
use crate::normalize::Normalizer;
use crate::record::Document;

/// One `(term, docID)` pair per token occurrence, duplicates included.
pub fn index_pairs<'a>(
    doc_id: &'a str,
    tokens: &'a [String],
) -> impl Iterator<Item = (&'a str, &'a str)> + 'a {
    tokens
        .iter()
        .filter(|t| !t.is_empty())
        .map(move |t| (t.as_str(), doc_id))
}

/// term -> {docID: count}
#[derive(Debug, Clone, Default)]
pub struct InvertedIndex {
    normalizer: Normalizer,
}

impl InvertedIndex {
    pub fn new() -> Self {
        Self::default()
    }
}

impl MapReduceApp for InvertedIndex {
    type Key = String;
    type Value = Postings;

    fn name(&self) -> &'static str {
        "index"
    }

    fn map(&self, doc: &Document) -> Vec<(String, Postings)> {
        let tokens = self.normalizer.tokenize(&doc.content);
        index_pairs(&doc.id, &tokens)
            .map(|(term, doc_id)| (term.to_string(), Postings::occurrence(doc_id)))
            .collect()
    }

    fn render(&self, term: &String, postings: &Postings) -> Vec<String> {
        postings
            .iter()
            .map(|(doc_id, count)| format!("{}\t{}:{}", term, doc_id, count))
            .collect()
    }
}

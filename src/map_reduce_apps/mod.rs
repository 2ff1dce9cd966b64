mod bigram_count;
mod inverted_index;

pub use bigram_count::{bigram_pairs, BigramCount, PhraseKey};
pub use inverted_index::{index_pairs, InvertedIndex};

use clap::ValueEnum;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum AppKind {
    /// term -> docID:count
    Index,
    /// (phrase, docID) -> count
    Bigram,
}

impl AppKind {
    pub fn name(self) -> &'static str {
        match self {
            AppKind::Index => "index",
            AppKind::Bigram => "bigram",
        }
    }
}

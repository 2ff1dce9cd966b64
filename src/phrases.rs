use std::collections::HashSet;
use std::fs;
use std::path::Path;

use crate::errors::PhraseError;
use crate::normalize::Normalizer;

const DEFAULT_PHRASES: &[&str] = &[
    "computer science",
    "information retrieval",
    "power politics",
    "los angeles",
    "bruce willis",
];

/// Immutable set of two-token phrases the bigram job counts.
///
/// Phrases are stored normalized and space-joined, so they only ever
/// contain `[a-z0-9 ]`. Build once and share by reference.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TargetPhraseSet {
    phrases: HashSet<String>,
}

impl TargetPhraseSet {
    pub fn new<I, S>(phrases: I) -> Result<Self, PhraseError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let normalizer = Normalizer::new();
        let mut set = HashSet::new();
        for phrase in phrases {
            let raw = phrase.as_ref();
            let tokens = normalizer.tokenize(raw);
            if tokens.len() != 2 {
                return Err(PhraseError::NotABigram(raw.to_string()));
            }
            set.insert(tokens.join(" "));
        }
        if set.is_empty() {
            return Err(PhraseError::Empty);
        }
        Ok(Self { phrases: set })
    }

    /// One phrase per line; blank lines and `#` comments are ignored.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, PhraseError> {
        let contents = fs::read_to_string(path)?;
        Self::new(
            contents
                .lines()
                .map(str::trim)
                .filter(|line| !line.is_empty() && !line.starts_with('#')),
        )
    }

    pub fn contains(&self, first: &str, second: &str) -> bool {
        self.phrases.contains(&format!("{} {}", first, second))
    }

    pub fn len(&self) -> usize {
        self.phrases.len()
    }

    pub fn is_empty(&self) -> bool {
        self.phrases.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.phrases.iter().map(String::as_str)
    }
}

impl Default for TargetPhraseSet {
    fn default() -> Self {
        Self {
            phrases: DEFAULT_PHRASES.iter().map(|p| p.to_string()).collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn default_set_has_reference_phrases() {
        let set = TargetPhraseSet::default();
        assert_eq!(set.len(), 5);
        assert!(set.contains("los", "angeles"));
        assert!(set.contains("computer", "science"));
        assert!(!set.contains("science", "computer"));
    }

    #[test]
    fn phrases_are_normalized() {
        let set = TargetPhraseSet::new(["Los   Angeles", "Bruce-Willis"]).unwrap();
        assert!(set.contains("los", "angeles"));
        assert!(set.contains("bruce", "willis"));
    }

    #[test]
    fn rejects_non_bigrams() {
        assert!(matches!(
            TargetPhraseSet::new(["computer"]),
            Err(PhraseError::NotABigram(_))
        ));
        assert!(matches!(
            TargetPhraseSet::new(["a b c"]),
            Err(PhraseError::NotABigram(_))
        ));
        assert!(matches!(
            TargetPhraseSet::new(Vec::<String>::new()),
            Err(PhraseError::Empty)
        ));
    }

    #[test]
    fn reads_phrase_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "# targets").unwrap();
        writeln!(file, "power politics").unwrap();
        writeln!(file).unwrap();
        writeln!(file, "a a").unwrap();
        let set = TargetPhraseSet::from_file(file.path()).unwrap();
        assert!(!set.is_empty());
        assert_eq!(set.len(), 2);
        let mut loaded: Vec<_> = set.iter().collect();
        loaded.sort();
        assert_eq!(loaded, vec!["a a", "power politics"]);
        assert!(set.contains("a", "a"));
    }
}

use thiserror::Error;

/// Reasons a single input line is skipped. Never fatal to the job.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RecordError {
    #[error("record has no tab between docID and content")]
    MissingDelimiter,
}

/// Target phrase configuration errors, raised before any document is read.
#[derive(Debug, Error)]
pub enum PhraseError {
    #[error("target phrase '{0}' does not normalize to exactly two tokens")]
    NotABigram(String),
    #[error("target phrase set is empty")]
    Empty,
    #[error("failed to read phrase file: {0}")]
    Io(#[from] std::io::Error),
}

use crate::errors::RecordError;

/// One input document. The docID is opaque and kept verbatim.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Document {
    pub id: String,
    pub content: String,
}

/// Parses a `docID<TAB>content` line. Only the first tab separates; the
/// content may contain more. An empty docID is still a docID.
///
/// Only the content is lower-cased later on. The docID is never folded, so
/// `DocA` and `doca` are two different documents.
pub fn parse_record(line: &str) -> Result<Document, RecordError> {
    let line = line.strip_suffix('\r').unwrap_or(line);
    let (id, content) = line
        .split_once('\t')
        .ok_or(RecordError::MissingDelimiter)?;
    Ok(Document {
        id: id.to_string(),
        content: content.to_string(),
    })
}

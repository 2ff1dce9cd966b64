use anyhow::Context;
use async_trait::async_trait;
use serde::{de::DeserializeOwned, Serialize};
use std::{
    fmt::Debug,
    fs,
    hash::Hash,
    path::{Path, PathBuf},
};

use crate::aggregate::{self, Aggregate};
use crate::record::{parse_record, Document};
use tracing::warn;

/// The pure functions an engine calls into: once per document (`map`) and
/// once per key group per phase (`reduce`).
pub trait MapReduceApp: Send + Sync + 'static {
    type Key: Ord + Hash + Clone + Debug + Send + Serialize + DeserializeOwned;
    type Value: Aggregate + Clone + Debug + Send + Serialize + DeserializeOwned;

    fn name(&self) -> &'static str;

    fn map(&self, doc: &Document) -> Vec<(Self::Key, Self::Value)>;

    /// Used both as the local pre-combine and as the final reduce.
    fn reduce(&self, _key: &Self::Key, values: Vec<Self::Value>) -> Option<Self::Value> {
        aggregate::fold(values)
    }

    /// Output lines for one final record, without trailing newlines.
    fn render(&self, key: &Self::Key, value: &Self::Value) -> Vec<String>;
}

/// A contiguous run of input lines handed to one map task.
#[derive(Debug, Clone)]
pub struct InputSplit {
    pub id: usize,
    pub source: String,
    /// zero-based line number of `lines[0]` within `source`
    pub first_line: usize,
    pub lines: Vec<String>,
}

pub enum Task {
    Map(InputSplit),
    // partition, spill files holding it
    Reduce(usize, Vec<PathBuf>),
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct JobReport {
    pub documents: usize,
    pub skipped: usize,
    pub emitted: usize,
    /// Records leaving the map side; equals `emitted` when nothing pre-combines.
    pub combined: usize,
    pub output_keys: usize,
    pub output_files: Vec<PathBuf>,
}

impl JobReport {
    pub fn absorb_map(&mut self, other: &JobReport) {
        self.documents += other.documents;
        self.skipped += other.skipped;
        self.emitted += other.emitted;
        self.combined += other.combined;
    }
}

/// Runs `app.map` over raw input lines. Malformed lines are logged, counted
/// and skipped; they never abort the rest of the split.
pub fn map_lines<A, I, S>(app: &A, source: &str, lines: I) -> (Vec<(A::Key, A::Value)>, JobReport)
where
    A: MapReduceApp,
    I: IntoIterator<Item = (usize, S)>,
    S: AsRef<str>,
{
    let mut records = Vec::new();
    let mut report = JobReport::default();
    for (line_no, line) in lines {
        match parse_record(line.as_ref()) {
            Ok(doc) => {
                report.documents += 1;
                records.extend(app.map(&doc));
            }
            Err(err) => {
                report.skipped += 1;
                warn!("{}:{}: skipping record: {}", source, line_no + 1, err);
            }
        }
    }
    report.emitted = records.len();
    report.combined = records.len();
    (records, report)
}

#[async_trait]
pub trait MapReduce {
    async fn run(self) -> anyhow::Result<JobReport>;
}

/// Input files under `input`: the path itself when it is a file, otherwise
/// the regular, non-hidden files directly inside it, sorted by name.
pub fn read_input_files(input: &Path) -> anyhow::Result<Vec<PathBuf>> {
    if input.is_file() {
        return Ok(vec![input.to_path_buf()]);
    }
    let mut files = Vec::new();
    for entry in fs::read_dir(input)? {
        let path = entry?.path();
        let hidden = path
            .file_name()
            .and_then(|name| name.to_str())
            .map_or(false, |name| name.starts_with('.') || name.starts_with('_'));
        if path.is_file() && !hidden {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}

/// Lines of one input file. Each line is decoded on its own and invalid
/// UTF-8 becomes U+FFFD, so a bad byte only ever touches its own record.
pub fn read_lines(path: &Path) -> anyhow::Result<Vec<String>> {
    let bytes = fs::read(path).with_context(|| format!("failed to read {}", path.display()))?;
    let mut lines: Vec<String> = bytes
        .split(|b| *b == b'\n')
        .map(|line| String::from_utf8_lossy(line).into_owned())
        .collect();
    // a trailing newline leaves one empty piece behind
    if lines.last().map_or(false, String::is_empty) {
        lines.pop();
    }
    Ok(lines)
}

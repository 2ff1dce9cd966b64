use std::collections::BTreeMap;

use async_trait::async_trait;
use tracing::info;

use crate::common::{map_lines, read_input_files, read_lines, JobReport, MapReduce, MapReduceApp};
use crate::config::JobConfig;
use crate::output::{prepare_output_dir, write_part};

/// Maps every document, groups everything in memory, reduces once per key.
/// No pre-combine, one output partition.
pub struct SequentialMapReduce<A: MapReduceApp> {
    config: JobConfig,
    mr_app: A,
}

impl<A: MapReduceApp> SequentialMapReduce<A> {
    pub fn new(config: JobConfig, mr_app: A) -> Self {
        Self { config, mr_app }
    }

    /// Final records sorted by key, plus map-side counters.
    pub fn run_in_memory(&self) -> anyhow::Result<(Vec<(A::Key, A::Value)>, JobReport)> {
        let mut report = JobReport::default();
        let mut grouped: BTreeMap<A::Key, Vec<A::Value>> = BTreeMap::new();

        for path in read_input_files(&self.config.input)? {
            let lines = read_lines(&path)?;
            info!("map read: {}", path.display());
            let source = path.display().to_string();
            let (records, file_report) = map_lines(&self.mr_app, &source, lines.iter().enumerate());
            report.absorb_map(&file_report);
            for (key, value) in records {
                grouped.entry(key).or_default().push(value);
            }
        }

        let output: Vec<_> = grouped
            .into_iter()
            .filter_map(|(key, values)| {
                let value = self.mr_app.reduce(&key, values)?;
                Some((key, value))
            })
            .collect();
        report.output_keys = output.len();
        Ok((output, report))
    }

    fn run_to_disk(&self) -> anyhow::Result<JobReport> {
        let (output, mut report) = self.run_in_memory()?;
        prepare_output_dir(&self.config.output)?;
        let path = write_part(&self.mr_app, &self.config.output, 0, &output)?;
        info!("reduce write: {}", path.display());
        report.output_files.push(path);
        Ok(report)
    }
}

#[async_trait]
impl<A: MapReduceApp> MapReduce for SequentialMapReduce<A> {
    async fn run(self) -> anyhow::Result<JobReport> {
        tokio::task::spawn_blocking(move || self.run_to_disk()).await?
    }
}

use std::fs;
use std::path::PathBuf;

use anyhow::{anyhow, Context};
use async_channel::Receiver;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::common::{read_input_files, read_lines, InputSplit, JobReport, MapReduceApp, Task};
use crate::config::JobConfig;
use crate::output::prepare_output_dir;

use super::worker_pool::{TaskEnv, TaskOutcome, WorkerPool};

pub struct Coordinator {
    config: JobConfig,
}

impl Coordinator {
    pub fn new(config: JobConfig) -> Self {
        Self { config }
    }

    /// Map phase, global barrier, reduce phase. Blocks until the job is
    /// done; the scratch directory is removed either way.
    pub fn start_pool<A: MapReduceApp>(&self, mr_app: A) -> anyhow::Result<JobReport> {
        let files = read_input_files(&self.config.input)?;
        prepare_output_dir(&self.config.output)?;

        let job_dir = self
            .config
            .work_dir
            .join(format!("job-{}", Uuid::new_v4().simple()));
        fs::create_dir_all(&job_dir)
            .with_context(|| format!("failed to create {}", job_dir.display()))?;

        let result = self.run_phases(mr_app, files, job_dir.clone());

        if let Err(err) = fs::remove_dir_all(&job_dir) {
            warn!("failed to clean up {}: {}", job_dir.display(), err);
        }
        // only succeeds when no other job shares it
        let _ = fs::remove_dir(&self.config.work_dir);

        result
    }

    fn run_phases<A: MapReduceApp>(
        &self,
        mr_app: A,
        files: Vec<PathBuf>,
        job_dir: PathBuf,
    ) -> anyhow::Result<JobReport> {
        let reducers = self.config.reducers;
        let env = TaskEnv {
            work_dir: job_dir,
            output: self.config.output.clone(),
            reducers,
            combine: self.config.combine,
        };
        info!(
            "{}: {} input files, {} workers, {} reducers, combine={}",
            mr_app.name(),
            files.len(),
            self.config.workers,
            reducers,
            self.config.combine
        );
        let pool = WorkerPool::new(self.config.workers, mr_app, env)?;

        let splits = self.read_splits(&files)?;
        let map_tasks = splits.into_iter().map(Task::Map).collect();

        let mut report = JobReport::default();
        let mut spills_by_partition: Vec<Vec<PathBuf>> = vec![Vec::new(); reducers];
        for outcome in run_phase(&pool, map_tasks)? {
            if let TaskOutcome::Mapped {
                split,
                spills,
                report: split_report,
            } = outcome
            {
                debug!("split {} done: {:?}", split, split_report);
                report.absorb_map(&split_report);
                for (partition, path) in spills {
                    spills_by_partition[partition].push(path);
                }
            }
        }
        info!(
            "map phase done: {} documents, {} skipped, {} records emitted, {} after combine",
            report.documents, report.skipped, report.emitted, report.combined
        );

        let reduce_tasks = spills_by_partition
            .into_iter()
            .enumerate()
            .map(|(partition, spills)| Task::Reduce(partition, spills))
            .collect();

        let mut reduced: Vec<(usize, PathBuf, usize)> = run_phase(&pool, reduce_tasks)?
            .into_iter()
            .filter_map(|outcome| match outcome {
                TaskOutcome::Reduced {
                    partition,
                    path,
                    keys,
                } => Some((partition, path, keys)),
                TaskOutcome::Mapped { .. } => None,
            })
            .collect();
        reduced.sort_by_key(|(partition, _, _)| *partition);

        for (_, path, keys) in reduced {
            report.output_keys += keys;
            report.output_files.push(path);
        }
        info!(
            "reduce phase done: {} keys in {} files",
            report.output_keys,
            report.output_files.len()
        );
        Ok(report)
    }

    fn read_splits(&self, files: &[PathBuf]) -> anyhow::Result<Vec<InputSplit>> {
        let mut splits = Vec::new();
        for path in files {
            let lines = read_lines(path)?;
            for (chunk_index, chunk) in lines.chunks(self.config.split_lines).enumerate() {
                splits.push(InputSplit {
                    id: splits.len(),
                    source: path.display().to_string(),
                    first_line: chunk_index * self.config.split_lines,
                    lines: chunk.to_vec(),
                });
            }
            debug!("map read: {} ({} lines)", path.display(), lines.len());
        }
        Ok(splits)
    }
}

/// Dispatches `tasks` and waits for all of them. The first failed task
/// fails the phase.
fn run_phase<A: MapReduceApp>(
    pool: &WorkerPool<A>,
    tasks: Vec<Task>,
) -> anyhow::Result<Vec<TaskOutcome>> {
    let expected = tasks.len();
    let (done, results) = async_channel::unbounded();
    for task in tasks {
        pool.run_task(task, done.clone())?;
    }
    // a panicked task drops its sender, which closes the channel
    drop(done);
    collect(&results, expected)
}

fn collect(
    results: &Receiver<anyhow::Result<TaskOutcome>>,
    expected: usize,
) -> anyhow::Result<Vec<TaskOutcome>> {
    let mut outcomes = Vec::with_capacity(expected);
    while outcomes.len() < expected {
        let outcome = results
            .recv_blocking()
            .map_err(|_| anyhow!("a worker exited without reporting its task"))?;
        outcomes.push(outcome?);
    }
    Ok(outcomes)
}

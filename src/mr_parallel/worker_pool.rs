use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::panic::{self, AssertUnwindSafe};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use anyhow::{anyhow, Context};
use async_channel::{Receiver, Sender};
use tracing::{debug, error, info};
use uuid::Uuid;

use crate::common::{map_lines, InputSplit, JobReport, MapReduceApp, Task};
use crate::output::write_part;
use crate::util::partition_for;

/// What a finished task reports back to the coordinator.
#[derive(Debug)]
pub enum TaskOutcome {
    Mapped {
        split: usize,
        /// (partition, spill file)
        spills: Vec<(usize, PathBuf)>,
        report: JobReport,
    },
    Reduced {
        partition: usize,
        path: PathBuf,
        keys: usize,
    },
}

/// Where tasks read from and write to. Shared by every task of one job.
#[derive(Debug, Clone)]
pub struct TaskEnv {
    pub work_dir: PathBuf,
    pub output: PathBuf,
    pub reducers: usize,
    pub combine: bool,
}

type Job = Box<dyn FnOnce(&str) + Send + 'static>;

pub struct WorkerPool<A: MapReduceApp> {
    pub workers: Vec<Worker>,
    sender: Option<Sender<Job>>,
    app: Arc<A>,
    env: Arc<TaskEnv>,
}

impl<A: MapReduceApp> WorkerPool<A> {
    pub fn new(size: usize, app: A, env: TaskEnv) -> anyhow::Result<WorkerPool<A>> {
        if size == 0 {
            return Err(anyhow!("worker pool needs at least one worker"));
        }

        let (sender, receiver) = async_channel::bounded(size);
        let mut workers = Vec::with_capacity(size);

        for index in 0..size {
            workers.push(Worker::new(index, receiver.clone())?);
        }

        Ok(WorkerPool {
            workers,
            sender: Some(sender),
            app: Arc::new(app),
            env: Arc::new(env),
        })
    }

    fn execute<F>(&self, f: F) -> anyhow::Result<()>
    where
        F: FnOnce(&str) + Send + 'static,
    {
        let sender = self
            .sender
            .as_ref()
            .ok_or_else(|| anyhow!("worker pool is shut down"))?;
        sender
            .send_blocking(Box::new(f))
            .map_err(|_| anyhow!("all workers have exited"))
    }

    /// Queues `task`; its outcome (or error) arrives on `done`.
    pub fn run_task(
        &self,
        task: Task,
        done: Sender<anyhow::Result<TaskOutcome>>,
    ) -> anyhow::Result<()> {
        let app = Arc::clone(&self.app);
        let env = Arc::clone(&self.env);
        self.execute(move |worker_id| {
            let outcome = match task {
                Task::Map(split) => run_map(app.as_ref(), &env, split, worker_id),
                Task::Reduce(partition, spills) => {
                    run_reduce(app.as_ref(), &env, partition, &spills)
                }
            };
            if done.send_blocking(outcome).is_err() {
                error!("worker {}: coordinator stopped listening", worker_id);
            }
        })
    }
}

impl<A: MapReduceApp> Drop for WorkerPool<A> {
    fn drop(&mut self) {
        // closing the channel ends every worker loop
        drop(self.sender.take());
        for worker in &mut self.workers {
            if let Some(thread) = worker.thread.take() {
                if thread.join().is_err() {
                    error!("worker {} terminated abnormally", worker.id);
                }
            }
        }
    }
}

fn run_map<A: MapReduceApp>(
    app: &A,
    env: &TaskEnv,
    split: InputSplit,
    worker_id: &str,
) -> anyhow::Result<TaskOutcome> {
    debug!(
        "worker {}: map split {} ({} lines of {})",
        worker_id,
        split.id,
        split.lines.len(),
        split.source
    );
    let first_line = split.first_line;
    let (records, mut report) = map_lines(
        app,
        &split.source,
        split
            .lines
            .iter()
            .enumerate()
            .map(|(i, line)| (first_line + i, line)),
    );

    let records = if env.combine {
        combine(app, records)
    } else {
        records
    };
    report.combined = records.len();

    let mut partitions: Vec<Vec<(A::Key, A::Value)>> =
        (0..env.reducers).map(|_| Vec::new()).collect();
    for (key, value) in records {
        partitions[partition_for(&key, env.reducers)].push((key, value));
    }

    let dir = construct_worker_dir(&env.work_dir, worker_id);
    fs::create_dir_all(&dir).with_context(|| format!("failed to create {}", dir.display()))?;

    let mut spills = Vec::new();
    for (partition, records) in partitions.into_iter().enumerate() {
        if records.is_empty() {
            continue;
        }
        let path = construct_spill_path(&dir, split.id, partition);
        write_spill(&path, &records)?;
        debug!("map write: {} ({} records)", path.display(), records.len());
        spills.push((partition, path));
    }

    Ok(TaskOutcome::Mapped {
        split: split.id,
        spills,
        report,
    })
}

/// Local pre-combine: the app's own reduce over this split's records.
fn combine<A: MapReduceApp>(app: &A, records: Vec<(A::Key, A::Value)>) -> Vec<(A::Key, A::Value)> {
    let mut grouped: HashMap<A::Key, Vec<A::Value>> = HashMap::new();
    for (key, value) in records {
        grouped.entry(key).or_default().push(value);
    }
    grouped
        .into_iter()
        .filter_map(|(key, values)| {
            let value = app.reduce(&key, values)?;
            Some((key, value))
        })
        .collect()
}

fn run_reduce<A: MapReduceApp>(
    app: &A,
    env: &TaskEnv,
    partition: usize,
    spills: &[PathBuf],
) -> anyhow::Result<TaskOutcome> {
    let mut grouped: BTreeMap<A::Key, Vec<A::Value>> = BTreeMap::new();
    for path in spills {
        for (key, value) in read_spill::<A>(path)? {
            grouped.entry(key).or_default().push(value);
        }
    }
    info!(
        "reduce partition {}: {} keys from {} spills",
        partition,
        grouped.len(),
        spills.len()
    );

    let output: Vec<_> = grouped
        .into_iter()
        .filter_map(|(key, values)| {
            let value = app.reduce(&key, values)?;
            Some((key, value))
        })
        .collect();

    let path = write_part(app, &env.output, partition, &output)?;
    info!("reduce write: {}", path.display());
    Ok(TaskOutcome::Reduced {
        partition,
        path,
        keys: output.len(),
    })
}

/// One JSON `[key, value]` array per line.
fn write_spill<K: serde::Serialize, V: serde::Serialize>(
    path: &Path,
    records: &[(K, V)],
) -> anyhow::Result<()> {
    let file =
        fs::File::create(path).with_context(|| format!("failed to create {}", path.display()))?;
    let mut out = BufWriter::new(file);
    for record in records {
        serde_json::to_writer(&mut out, record)?;
        out.write_all(b"\n")?;
    }
    out.flush()?;
    Ok(())
}

fn read_spill<A: MapReduceApp>(path: &Path) -> anyhow::Result<Vec<(A::Key, A::Value)>> {
    let file = fs::File::open(path).with_context(|| format!("failed to open {}", path.display()))?;
    let mut records = Vec::new();
    for (line_no, line) in BufReader::new(file).lines().enumerate() {
        let line = line?;
        let record = serde_json::from_str(&line)
            .with_context(|| format!("{}:{}: corrupt spill record", path.display(), line_no + 1))?;
        records.push(record);
    }
    Ok(records)
}

fn construct_worker_dir(work_dir: &Path, worker_id: &str) -> PathBuf {
    work_dir.join(format!("worker-{}", worker_id))
}

fn construct_spill_path(dir: &Path, split: usize, partition: usize) -> PathBuf {
    dir.join(format!("split-{:05}-r{:05}.jsonl", split, partition))
}

pub struct Worker {
    pub id: String,
    thread: Option<JoinHandle<()>>,
}

impl Worker {
    pub fn new(index: usize, receiver: Receiver<Job>) -> anyhow::Result<Worker> {
        let id = Uuid::new_v4().simple().to_string();
        let id_clone = id.clone();
        let thread = thread::Builder::new()
            .name(format!("mr-worker-{}", index))
            .spawn(move || {
                while let Ok(job) = receiver.recv_blocking() {
                    if panic::catch_unwind(AssertUnwindSafe(|| job(&id_clone))).is_err() {
                        error!("worker {}: task panicked", id_clone);
                    }
                }
                debug!("worker {}: channel closed, exiting", id_clone);
            })?;

        Ok(Worker {
            id,
            thread: Some(thread),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregate::Postings;
    use crate::map_reduce_apps::InvertedIndex;

    fn env(dir: &Path, combine: bool) -> TaskEnv {
        TaskEnv {
            work_dir: dir.join("work"),
            output: dir.join("out"),
            reducers: 2,
            combine,
        }
    }

    fn split(lines: &[&str]) -> InputSplit {
        InputSplit {
            id: 0,
            source: "test.tsv".to_string(),
            first_line: 0,
            lines: lines.iter().map(|l| l.to_string()).collect(),
        }
    }

    #[test]
    fn map_precombines_before_spilling() {
        let dir = tempfile::tempdir().unwrap();
        let app = InvertedIndex::new();
        let outcome = run_map(&app, &env(dir.path(), true), split(&["d1\ta a a b", "bad"]), "w").unwrap();
        let TaskOutcome::Mapped { spills, report, .. } = outcome else {
            panic!("expected map outcome");
        };
        assert_eq!(report.documents, 1);
        assert_eq!(report.skipped, 1);
        assert_eq!(report.emitted, 4);
        assert_eq!(report.combined, 2);

        let mut spilled = Vec::new();
        for (partition, path) in &spills {
            assert!(*partition < 2);
            spilled.extend(read_spill::<InvertedIndex>(path).unwrap());
        }
        spilled.sort_by(|a, b| a.0.cmp(&b.0));
        assert_eq!(spilled[0].0, "a");
        assert_eq!(spilled[0].1.get("d1"), Some(3));
        assert_eq!(spilled[1].1, Postings::occurrence("d1"));
    }

    #[test]
    fn map_without_combine_spills_every_occurrence() {
        let dir = tempfile::tempdir().unwrap();
        let app = InvertedIndex::new();
        let outcome = run_map(&app, &env(dir.path(), false), split(&["d1\ta a a b"]), "w").unwrap();
        let TaskOutcome::Mapped { spills, report, .. } = outcome else {
            panic!("expected map outcome");
        };
        assert_eq!(report.combined, 4);
        let total: usize = spills
            .iter()
            .map(|(_, p)| read_spill::<InvertedIndex>(p).unwrap().len())
            .sum();
        assert_eq!(total, 4);
    }

    #[test]
    fn corrupt_spill_fails_the_reduce() {
        let dir = tempfile::tempdir().unwrap();
        let env = env(dir.path(), true);
        fs::create_dir_all(&env.output).unwrap();
        let spill = dir.path().join("bad.jsonl");
        fs::write(&spill, "not json\n").unwrap();
        let err = run_reduce(&InvertedIndex::new(), &env, 0, &[spill]).unwrap_err();
        assert!(err.to_string().contains("corrupt spill record"));
    }

    #[test]
    fn pool_runs_tasks_and_survives_shutdown() {
        let dir = tempfile::tempdir().unwrap();
        let pool = WorkerPool::new(2, InvertedIndex::new(), env(dir.path(), true)).unwrap();
        let (done, results) = async_channel::unbounded();
        pool.run_task(Task::Map(split(&["d1\tx y"])), done.clone()).unwrap();
        drop(done);
        let outcome = results.recv_blocking().unwrap().unwrap();
        assert!(matches!(outcome, TaskOutcome::Mapped { split: 0, .. }));
        drop(pool);
    }
}

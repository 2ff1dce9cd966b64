use std::path::PathBuf;

use clap::{Parser, ValueEnum};

use crate::map_reduce_apps::AppKind;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum EngineKind {
    /// single pass, no pre-combine
    Seq,
    /// worker pool with spill files and per-partition reducers
    Parallel,
}

#[derive(Debug, Parser)]
#[command(name = "mrindex", about = "Inverted index and target bigram counts over docID<TAB>content corpora")]
pub struct Cli {
    /// Which job to run
    #[arg(value_enum)]
    pub app: AppKind,

    /// Input file, or directory of input files
    pub input: PathBuf,

    /// Output directory for part files
    pub output: PathBuf,

    #[arg(long, value_enum, default_value_t = EngineKind::Parallel)]
    pub engine: EngineKind,

    #[arg(long, default_value_t = 4, value_parser = clap::value_parser!(u16).range(1..))]
    pub workers: u16,

    #[arg(long, default_value_t = 2, value_parser = clap::value_parser!(u16).range(1..))]
    pub reducers: u16,

    /// Documents per map task
    #[arg(long, default_value_t = 10_000, value_parser = clap::value_parser!(u32).range(1..))]
    pub split_lines: u32,

    /// Skip the local pre-combine on the map side
    #[arg(long)]
    pub no_combine: bool,

    /// Target phrases for the bigram job, one per line
    #[arg(long)]
    pub phrases: Option<PathBuf>,

    /// Scratch directory for map spills (defaults to <OUTPUT>/_temporary)
    #[arg(long)]
    pub work_dir: Option<PathBuf>,

    /// -v info, -vv debug, -vvv trace
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,
}

/// Engine settings shared by both engines.
#[derive(Debug, Clone)]
pub struct JobConfig {
    pub input: PathBuf,
    pub output: PathBuf,
    pub work_dir: PathBuf,
    pub workers: usize,
    pub reducers: usize,
    pub split_lines: usize,
    pub combine: bool,
}

impl JobConfig {
    pub fn new(input: impl Into<PathBuf>, output: impl Into<PathBuf>) -> Self {
        let output = output.into();
        Self {
            input: input.into(),
            work_dir: output.join("_temporary"),
            output,
            workers: 4,
            reducers: 2,
            split_lines: 10_000,
            combine: true,
        }
    }

    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers.max(1);
        self
    }

    pub fn with_reducers(mut self, reducers: usize) -> Self {
        self.reducers = reducers.max(1);
        self
    }

    pub fn with_split_lines(mut self, split_lines: usize) -> Self {
        self.split_lines = split_lines.max(1);
        self
    }

    pub fn with_combine(mut self, combine: bool) -> Self {
        self.combine = combine;
        self
    }

    pub fn with_work_dir(mut self, work_dir: impl Into<PathBuf>) -> Self {
        self.work_dir = work_dir.into();
        self
    }
}

impl From<&Cli> for JobConfig {
    fn from(cli: &Cli) -> Self {
        let config = JobConfig::new(&cli.input, &cli.output)
            .with_workers(cli.workers as usize)
            .with_reducers(cli.reducers as usize)
            .with_split_lines(cli.split_lines as usize)
            .with_combine(!cli.no_combine);
        match &cli.work_dir {
            Some(dir) => config.with_work_dir(dir),
            None => config,
        }
    }
}

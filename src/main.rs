use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use tracing::{debug, info};

use mrindex::common::{JobReport, MapReduce, MapReduceApp};
use mrindex::config::{Cli, EngineKind, JobConfig};
use mrindex::logging::init_logging;
use mrindex::map_reduce_apps::{AppKind, BigramCount, InvertedIndex};
use mrindex::phrases::TargetPhraseSet;
use mrindex::{ParallelMapReduce, SequentialMapReduce};

async fn run_with<A: MapReduceApp>(
    engine: EngineKind,
    config: JobConfig,
    app: A,
) -> anyhow::Result<JobReport> {
    match engine {
        EngineKind::Seq => SequentialMapReduce::new(config, app).run().await,
        EngineKind::Parallel => ParallelMapReduce::new(config, app).run().await,
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let config = JobConfig::from(&cli);
    let report = match cli.app {
        AppKind::Index => run_with(cli.engine, config, InvertedIndex::new()).await,
        AppKind::Bigram => {
            let phrases = match &cli.phrases {
                Some(path) => TargetPhraseSet::from_file(path)
                    .with_context(|| format!("invalid phrase file {}", path.display()))?,
                None => TargetPhraseSet::default(),
            };
            info!("counting {} target phrases", phrases.len());
            let mut listed: Vec<_> = phrases.iter().collect();
            listed.sort();
            debug!("target phrases: {:?}", listed);
            run_with(cli.engine, config, BigramCount::new(Arc::new(phrases))).await
        }
    }
    .with_context(|| format!("{} job failed", cli.app.name()))?;

    info!(
        "{} documents ({} skipped), {} output keys in {} files",
        report.documents,
        report.skipped,
        report.output_keys,
        report.output_files.len()
    );
    Ok(())
}

mod coordinator;
mod worker_pool;

use crate::common::{JobReport, MapReduce, MapReduceApp};
use crate::config::JobConfig;
use async_trait::async_trait;
use coordinator::Coordinator;

pub struct ParallelMapReduce<A: MapReduceApp> {
    config: JobConfig,
    mr_app: A,
}

impl<A: MapReduceApp> ParallelMapReduce<A> {
    pub fn new(config: JobConfig, mr_app: A) -> Self {
        Self { config, mr_app }
    }
}

#[async_trait]
impl<A: MapReduceApp> MapReduce for ParallelMapReduce<A> {
    async fn run(self) -> anyhow::Result<JobReport> {
        let coord = Coordinator::new(self.config);
        let mr_app = self.mr_app;
        tokio::task::spawn_blocking(move || coord.start_pool(mr_app)).await?
    }
}

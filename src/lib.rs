pub mod aggregate;
pub mod common;
pub mod config;
pub mod errors;
pub mod logging;
pub mod map_reduce_apps;
pub mod map_reduce_seq;
pub mod mr_parallel;
pub mod normalize;
pub mod output;
pub mod phrases;
pub mod record;
mod util;

pub use common::{JobReport, MapReduce, MapReduceApp};
pub use map_reduce_seq::SequentialMapReduce;
pub use mr_parallel::ParallelMapReduce;

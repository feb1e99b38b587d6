use std::env;

pub const DEFAULT_WORKERS: usize = 5;
pub const DEFAULT_QUEUE_CAPACITY: usize = 100;

/// Sizing of the processing engine: how many workers drain the job queue
/// and how many jobs the queue admits before submitters block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineConfig {
    pub workers: usize,
    pub queue_capacity: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            workers: DEFAULT_WORKERS,
            queue_capacity: DEFAULT_QUEUE_CAPACITY,
        }
    }
}

impl EngineConfig {
    /// Reads `NUM_WORKERS` and `JOB_QUEUE_SIZE` from the environment,
    /// falling back to the defaults for missing, unparsable or zero values.
    pub fn from_env() -> Self {
        Self {
            workers: parse_size(env::var("NUM_WORKERS").ok(), DEFAULT_WORKERS),
            queue_capacity: parse_size(env::var("JOB_QUEUE_SIZE").ok(), DEFAULT_QUEUE_CAPACITY),
        }
    }
}

fn parse_size(raw: Option<String>, fallback: usize) -> usize {
    raw.and_then(|value| value.trim().parse().ok())
        .filter(|&size| size > 0)
        .unwrap_or(fallback)
}

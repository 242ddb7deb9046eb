use dotenvy::dotenv;
use std::{env, str::FromStr, time::Duration};

pub const DEFAULT_PROTECTED_COLLECTION: &str = "My List";

#[derive(Debug, Clone)]
pub struct Config {
    /// Name of the collection exempt from deletions and removals.
    pub protected_collection: String,
    /// Largest job still processed with `small_chunk_size`.
    pub chunk_threshold: usize,
    pub small_chunk_size: usize,
    pub large_chunk_size: usize,
    /// Pause between two chunks of the same job.
    pub chunk_delay: Duration,
    /// How long an executor owns a job without checkpointing.
    pub lease_ttl: Duration,
    /// Period of the scan for stalled jobs.
    pub recovery_interval: Duration,
    pub http_port: u16,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            protected_collection: DEFAULT_PROTECTED_COLLECTION.to_string(),
            chunk_threshold: 100,
            small_chunk_size: 1,
            large_chunk_size: 5,
            chunk_delay: Duration::from_millis(50),
            lease_ttl: Duration::from_secs(30),
            recovery_interval: Duration::from_secs(10),
            http_port: 8080,
        }
    }
}

impl Config {
    pub fn from_env() -> Self {
        dotenv().ok();
        let defaults = Self::default();

        let protected_collection = match env::var("ROSTER_PROTECTED_COLLECTION") {
            Ok(val) if !val.trim().is_empty() => val,
            _ => defaults.protected_collection,
        };

        Self {
            protected_collection,
            chunk_threshold: parse_var("ROSTER_CHUNK_THRESHOLD", defaults.chunk_threshold),
            small_chunk_size: parse_var("ROSTER_SMALL_CHUNK_SIZE", defaults.small_chunk_size)
                .max(1),
            large_chunk_size: parse_var("ROSTER_LARGE_CHUNK_SIZE", defaults.large_chunk_size)
                .max(1),
            chunk_delay: Duration::from_millis(parse_var(
                "ROSTER_CHUNK_DELAY_MS",
                defaults.chunk_delay.as_millis() as u64,
            )),
            lease_ttl: Duration::from_secs(
                parse_var("ROSTER_LEASE_SECS", defaults.lease_ttl.as_secs()).max(1),
            ),
            recovery_interval: Duration::from_secs(
                parse_var(
                    "ROSTER_RECOVERY_INTERVAL_SECS",
                    defaults.recovery_interval.as_secs(),
                )
                .max(1),
            ),
            http_port: parse_var("ROSTER_HTTP_PORT", defaults.http_port),
        }
    }
}

fn parse_var<T: FromStr>(name: &str, default: T) -> T {
    match env::var(name) {
        Ok(val) => val.trim().parse::<T>().unwrap_or(default),
        Err(_) => default,
    }
}

use crate::config::Config;

/// Decides how many ids an executor applies per durable unit.
///
/// Implementations must be deterministic in `total_count` and never return 0,
/// so a resumed job walks the same chunk boundaries.
pub trait ChunkPolicy: Send + Sync {
    fn chunk_size(&self, total_count: usize) -> usize;
}

/// Small jobs go one id at a time for dense progress and quick cancellation,
/// larger ones use a bigger fixed chunk.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ThresholdChunkPolicy {
    threshold: usize,
    small: usize,
    large: usize,
}

impl ThresholdChunkPolicy {
    pub fn new(threshold: usize, small: usize, large: usize) -> Self {
        Self {
            threshold,
            small: small.max(1),
            large: large.max(1),
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(
            config.chunk_threshold,
            config.small_chunk_size,
            config.large_chunk_size,
        )
    }
}

impl Default for ThresholdChunkPolicy {
    fn default() -> Self {
        Self::new(100, 1, 5)
    }
}

impl ChunkPolicy for ThresholdChunkPolicy {
    fn chunk_size(&self, total_count: usize) -> usize {
        if total_count <= self.threshold {
            self.small
        } else {
            self.large
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_threshold_boundaries() {
        let policy = ThresholdChunkPolicy::default();
        assert_eq!(policy.chunk_size(0), 1);
        assert_eq!(policy.chunk_size(1), 1);
        assert_eq!(policy.chunk_size(100), 1);
        assert_eq!(policy.chunk_size(101), 5);
        assert_eq!(policy.chunk_size(50_000), 5);
    }

    #[test]
    fn test_zero_sizes_are_clamped() {
        let policy = ThresholdChunkPolicy::new(10, 0, 0);
        assert_eq!(policy.chunk_size(3), 1);
        assert_eq!(policy.chunk_size(30), 1);
    }

    #[test]
    fn test_from_config() {
        let config = Config {
            chunk_threshold: 2,
            small_chunk_size: 2,
            large_chunk_size: 7,
            ..Config::default()
        };
        let policy = ThresholdChunkPolicy::from_config(&config);
        assert_eq!(policy.chunk_size(2), 2);
        assert_eq!(policy.chunk_size(3), 7);
    }
}

//! Metrics collection for worker operations

use rapport_protocol::{BatchResponse, Outcome};
use std::collections::BTreeMap;

/// Counters for one source (the action queue or one propagator)
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SourceCounts {
    /// Guarded writes committed
    pub applied: usize,
    /// Mutual requests resolved by the collision transaction
    pub collision_resolved: usize,
    /// Items whose guards did not hold
    pub no_op: usize,
    /// Items handed back for redelivery
    pub failed: usize,
    /// Items moved to the dead-letter table
    pub dead_lettered: usize,
}

/// Metrics collected by the workers, keyed by source name
#[derive(Debug, Clone, Default)]
pub struct WorkerMetrics {
    /// Counters per source
    pub sources: BTreeMap<String, SourceCounts>,

    /// Poll cycles that found work
    pub batch_count: usize,
}

impl WorkerMetrics {
    /// Create new empty metrics
    pub fn new() -> Self {
        Self::default()
    }

    fn entry(&mut self, source: &str) -> &mut SourceCounts {
        self.sources.entry(source.to_string()).or_default()
    }

    /// Record every item of a batch response
    pub fn record_batch(&mut self, source: &str, response: &BatchResponse) {
        self.batch_count += 1;
        let counts = self.entry(source);
        for (_, outcome) in &response.outcomes {
            match outcome {
                Outcome::Applied => counts.applied += 1,
                Outcome::CollisionResolved => counts.collision_resolved += 1,
                Outcome::NoOp => counts.no_op += 1,
            }
        }
        counts.failed += response.failures.len();
    }

    /// Record items moved to the dead-letter table
    pub fn record_dead_letters(&mut self, source: &str, count: usize) {
        self.entry(source).dead_lettered += count;
    }

    /// Counters for one source
    pub fn source(&self, source: &str) -> SourceCounts {
        self.sources.get(source).copied().unwrap_or_default()
    }

    /// Total failed items across all sources
    pub fn total_failed(&self) -> usize {
        self.sources.values().map(|c| c.failed).sum()
    }

    /// Total dead-lettered items across all sources
    pub fn total_dead_lettered(&self) -> usize {
        self.sources.values().map(|c| c.dead_lettered).sum()
    }

    /// Fold another worker's metrics into these
    pub fn merge(&mut self, other: &WorkerMetrics) {
        self.batch_count += other.batch_count;
        for (source, theirs) in &other.sources {
            let ours = self.entry(source);
            ours.applied += theirs.applied;
            ours.collision_resolved += theirs.collision_resolved;
            ours.no_op += theirs.no_op;
            ours.failed += theirs.failed;
            ours.dead_lettered += theirs.dead_lettered;
        }
    }

    /// Generate a summary report of metrics
    pub fn summary(&self) -> String {
        let mut lines = vec![
            "Worker Metrics Summary".to_string(),
            "======================".to_string(),
            format!("Batches: {}", self.batch_count),
        ];

        for (source, counts) in &self.sources {
            lines.push(format!(
                "  {}: {} applied, {} collisions, {} no-op, {} failed, {} dead-lettered",
                source,
                counts.applied,
                counts.collision_resolved,
                counts.no_op,
                counts.failed,
                counts.dead_lettered
            ));
        }

        lines.join("\n")
    }
}

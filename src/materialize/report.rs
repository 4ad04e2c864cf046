//! Replay bookkeeping and capacity comparisons.

use std::fmt;
use std::sync::Arc;

use serde::Serialize;
use tracing::info;

use super::{CacheResult, MaterializationCache, ServeOutcome};
use crate::attribute::{AttributeUniverse, GroupingKey};
use crate::catalog::CardinalityCatalog;
use crate::workload::{Workload, WorkloadStream};

/// One served request, as recorded by the accumulator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StepRecord {
    /// 1-based arrival position.
    pub step: usize,
    pub query: String,
    pub hit: bool,
    /// Grouping read to answer the query.
    pub source: String,
    pub cost: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub evicted: Option<String>,
    /// Running total after this step.
    pub cumulative_io: u64,
}

/// Observes serve outcomes and totals the charged I/O.
///
/// Purely observational; nothing here feeds back into cache decisions.
#[derive(Debug, Clone, Default)]
pub struct CostAccumulator {
    steps: Vec<StepRecord>,
    total_io: u64,
    hits: usize,
    evictions: usize,
}

impl CostAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(
        &mut self,
        universe: &AttributeUniverse,
        query: GroupingKey,
        outcome: &ServeOutcome,
    ) {
        self.total_io = self.total_io.saturating_add(outcome.cost);
        if outcome.hit {
            self.hits += 1;
        }
        if outcome.evicted.is_some() {
            self.evictions += 1;
        }
        self.steps.push(StepRecord {
            step: self.steps.len() + 1,
            query: universe.code(&query),
            hit: outcome.hit,
            source: universe.code(&outcome.source),
            cost: outcome.cost,
            evicted: outcome.evicted.map(|k| universe.code(&k)),
            cumulative_io: self.total_io,
        });
    }

    /// Feed every request of `stream` to `cache`, in order.
    ///
    /// Stops at the first failing request; the accumulator is then only
    /// good for discarding.
    pub fn replay<S: WorkloadStream>(
        &mut self,
        cache: &mut MaterializationCache,
        mut stream: S,
    ) -> CacheResult<()> {
        let catalog = Arc::clone(cache.catalog());
        while let Some(query) = stream.next_query() {
            let outcome = cache.serve(query)?;
            self.record(catalog.universe(), query, &outcome);
        }
        Ok(())
    }

    pub fn total_io(&self) -> u64 {
        self.total_io
    }

    pub fn hits(&self) -> usize {
        self.hits
    }

    pub fn misses(&self) -> usize {
        self.steps.len() - self.hits
    }

    pub fn evictions(&self) -> usize {
        self.evictions
    }

    pub fn steps(&self) -> &[StepRecord] {
        &self.steps
    }

    /// Close the replay against the cache it observed.
    pub fn finish(self, cache: &MaterializationCache) -> ReplayReport {
        debug_assert_eq!(self.total_io, cache.cumulative_io());
        ReplayReport {
            capacity: cache.capacity(),
            cumulative_io: cache.cumulative_io(),
            hits: self.hits,
            misses: self.misses(),
            evictions: self.evictions,
            materialized: cache.materialized_codes(),
            steps: self.steps,
        }
    }
}

/// Outcome of replaying one workload against one capacity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReplayReport {
    pub capacity: usize,
    pub cumulative_io: u64,
    pub hits: usize,
    pub misses: usize,
    pub evictions: usize,
    /// Final materialized set, in insertion order.
    pub materialized: Vec<String>,
    pub steps: Vec<StepRecord>,
}

impl ReplayReport {
    /// Replay a finite workload against a fresh cache.
    pub fn run(
        catalog: &Arc<CardinalityCatalog>,
        workload: &Workload,
        capacity: usize,
    ) -> CacheResult<Self> {
        let mut cache = MaterializationCache::new(Arc::clone(catalog), capacity)?;
        let mut accumulator = CostAccumulator::new();
        accumulator.replay(&mut cache, workload.stream())?;
        Ok(accumulator.finish(&cache))
    }

    /// Per-request breakdown, one line per step.
    pub fn steps_table(&self) -> String {
        self.steps
            .iter()
            .map(|s| {
                let decision = if s.hit {
                    format!("hit via {}", s.source)
                } else {
                    "miss".to_string()
                };
                let evicted = s
                    .evicted
                    .as_ref()
                    .map(|e| format!(", evicted {e}"))
                    .unwrap_or_default();
                format!(
                    "  #{:<3} {:<6} {:<12} cost {:>10}  io {:>12}{}",
                    s.step, s.query, decision, s.cost, s.cumulative_io, evicted
                )
            })
            .collect::<Vec<_>>()
            .join("\n")
    }
}

impl fmt::Display for ReplayReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "capacity = {}", self.capacity)?;
        writeln!(f, "  total io:     {}", self.cumulative_io)?;
        writeln!(f, "  hits/misses:  {}/{}", self.hits, self.misses)?;
        writeln!(f, "  evictions:    {}", self.evictions)?;
        if self.materialized.is_empty() {
            write!(f, "  materialized: (none)")
        } else {
            write!(f, "  materialized: {}", self.materialized.join(", "))
        }
    }
}

/// The same workload replayed against several capacities.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BatchReport {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub catalog_fingerprint: Option<String>,
    pub workload: Vec<String>,
    pub runs: Vec<ReplayReport>,
}

impl BatchReport {
    pub fn with_fingerprint(mut self, fingerprint: impl Into<String>) -> Self {
        self.catalog_fingerprint = Some(fingerprint.into());
        self
    }

    /// The run for a given capacity, if it was part of the batch.
    pub fn run(&self, capacity: usize) -> Option<&ReplayReport> {
        self.runs.iter().find(|r| r.capacity == capacity)
    }
}

impl fmt::Display for BatchReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "workload ({} queries): {}",
            self.workload.len(),
            self.workload.join(", ")
        )?;
        if let Some(fingerprint) = &self.catalog_fingerprint {
            write!(f, "\ncatalog: {fingerprint}")?;
        }
        for run in &self.runs {
            write!(f, "\n\n{run}")?;
        }
        Ok(())
    }
}

/// Replay `workload` against a fresh cache per capacity, in the given order.
///
/// Fails as a whole if any capacity is invalid or any request is unknown.
pub fn batch_report(
    catalog: &Arc<CardinalityCatalog>,
    workload: &Workload,
    capacities: &[usize],
) -> CacheResult<BatchReport> {
    let runs = capacities
        .iter()
        .map(|&capacity| {
            let report = ReplayReport::run(catalog, workload, capacity)?;
            info!(
                capacity,
                cumulative_io = report.cumulative_io,
                hits = report.hits,
                "replayed workload"
            );
            Ok(report)
        })
        .collect::<CacheResult<Vec<_>>>()?;

    Ok(BatchReport {
        catalog_fingerprint: None,
        workload: workload.codes(catalog.universe()),
        runs,
    })
}

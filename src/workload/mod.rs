//! Grouping-query workloads.
//!
//! The cache consumes requests through [`WorkloadStream`], one at a time and
//! in arrival order. Any iterator of keys is a stream; [`Workload`] is the
//! finite, replayable form used for batch comparisons.

use rand::seq::index;
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::attribute::{AttributeUniverse, GroupingKey, KeyError};

/// Errors raised while building workloads.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum WorkloadError {
    #[error(transparent)]
    Key(#[from] KeyError),

    #[error("cannot draw {requested} distinct queries from {available} groupings")]
    TooManyQueries { requested: usize, available: usize },

    #[error("no groupings to sample from")]
    NoCandidates,
}

pub type WorkloadResult<T> = Result<T, WorkloadError>;

/// Producer of grouping requests. `None` marks end of stream.
pub trait WorkloadStream {
    fn next_query(&mut self) -> Option<GroupingKey>;
}

impl<I: Iterator<Item = GroupingKey>> WorkloadStream for I {
    fn next_query(&mut self) -> Option<GroupingKey> {
        self.next()
    }
}

/// How a sampled workload picks its queries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Sampling {
    /// Without replacement; every query is a different grouping.
    #[default]
    Distinct,
    /// With replacement; groupings may repeat.
    Uniform,
}

/// A finite, ordered sequence of grouping requests.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Workload {
    queries: Vec<GroupingKey>,
}

impl Workload {
    pub fn new(queries: Vec<GroupingKey>) -> Self {
        Self { queries }
    }

    /// Parse canonical codes in arrival order.
    pub fn parse<'c, I>(universe: &AttributeUniverse, codes: I) -> WorkloadResult<Self>
    where
        I: IntoIterator<Item = &'c str>,
    {
        let queries = codes
            .into_iter()
            .map(|code| universe.parse(code))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { queries })
    }

    /// Parse a comma or whitespace separated list such as `"AB, A, C, A"`.
    pub fn parse_list(universe: &AttributeUniverse, list: &str) -> WorkloadResult<Self> {
        Self::parse(
            universe,
            list.split(|c: char| c == ',' || c.is_whitespace())
                .filter(|s| !s.is_empty()),
        )
    }

    /// Draw `count` queries from `candidates`.
    pub fn sample<R: Rng + ?Sized>(
        candidates: &[GroupingKey],
        count: usize,
        sampling: Sampling,
        rng: &mut R,
    ) -> WorkloadResult<Self> {
        if count == 0 {
            return Ok(Self::default());
        }
        if candidates.is_empty() {
            return Err(WorkloadError::NoCandidates);
        }

        let queries = match sampling {
            Sampling::Distinct => {
                if count > candidates.len() {
                    return Err(WorkloadError::TooManyQueries {
                        requested: count,
                        available: candidates.len(),
                    });
                }
                index::sample(rng, candidates.len(), count)
                    .into_iter()
                    .map(|i| candidates[i])
                    .collect()
            }
            Sampling::Uniform => (0..count)
                .map(|_| candidates[rng.random_range(0..candidates.len())])
                .collect(),
        };
        Ok(Self { queries })
    }

    pub fn len(&self) -> usize {
        self.queries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queries.is_empty()
    }

    pub fn queries(&self) -> &[GroupingKey] {
        &self.queries
    }

    /// A fresh stream over the workload, from its first request.
    pub fn stream(&self) -> impl WorkloadStream + '_ {
        self.queries.iter().copied()
    }

    /// Canonical codes in arrival order.
    pub fn codes(&self, universe: &AttributeUniverse) -> Vec<String> {
        self.queries.iter().map(|k| universe.code(k)).collect()
    }
}

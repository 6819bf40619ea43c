//! Randomized draw sequences.
//!
//! A `Sequence` is generated atomically per experiment and then consumed
//! incrementally by the scheduler (or flushed wholesale at instant speed).
//! Generation is a pure function of the dimensions, the pool size and the
//! random source, which keeps it deterministic under a seeded RNG.

use rand::Rng;

/// One trial: a fixed-length ordered list of draw indices into the active
/// variable pool.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Run {
    draws: Vec<usize>,
}

impl Run {
    /// Build a run from explicit draw indices.
    #[must_use]
    pub fn from_draws(draws: Vec<usize>) -> Self {
        Self { draws }
    }

    /// The draw indices, in draw order.
    #[must_use]
    pub fn draws(&self) -> &[usize] {
        &self.draws
    }

    /// Number of draws in this run.
    #[must_use]
    pub fn len(&self) -> usize {
        self.draws.len()
    }

    /// Whether the run holds no draws.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.draws.is_empty()
    }
}

/// The full ordered set of runs for one experiment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sequence {
    runs: Vec<Run>,
}

impl Sequence {
    /// Build a sequence from explicit runs.
    #[must_use]
    pub fn from_runs(runs: Vec<Run>) -> Self {
        Self { runs }
    }

    /// Generate `run_count` independent runs of `draw_count` uniform draws in
    /// `[0, pool_size)`, with replacement.
    ///
    /// # Panics
    ///
    /// Panics if `pool_size` is zero; the controller guards starts against an
    /// empty active pool.
    #[must_use]
    pub fn random<R: Rng + ?Sized>(
        draw_count: u32,
        run_count: u32,
        pool_size: usize,
        rng: &mut R,
    ) -> Self {
        assert!(pool_size > 0, "cannot draw from an empty variable pool");
        let runs = (0..run_count)
            .map(|_| {
                let draws = (0..draw_count).map(|_| rng.gen_range(0..pool_size)).collect();
                Run { draws }
            })
            .collect();
        Self { runs }
    }

    /// Number of runs.
    #[must_use]
    pub fn len(&self) -> usize {
        self.runs.len()
    }

    /// Whether the sequence holds no runs.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.runs.is_empty()
    }

    /// The run at `index`, or `None` past the end.
    #[must_use]
    pub fn run(&self, index: usize) -> Option<&Run> {
        self.runs.get(index)
    }

    /// All runs, in run order.
    #[must_use]
    pub fn runs(&self) -> &[Run] {
        &self.runs
    }
}

//! Search metrics for profiling conjecture rounds.
//!
//! With the `tracing` feature the engine counts what each round did;
//! without it every recording call is a no-op.
//!
//! # Usage
//!
//! ```rust,ignore
//! use conjgen::metrics::SearchMetrics;
//!
//! let metrics = SearchMetrics::new();
//! // ... run rounds ...
//! let report = metrics.report();
//! println!("{} candidates, {} conjectures", report.candidates, report.conjectures);
//! ```

#[cfg(feature = "tracing")]
use std::sync::atomic::{AtomicU64, Ordering};

/// Aggregate counters over all rounds.
///
/// Counters use relaxed ordering; the report taken after a round is exact.
#[cfg(feature = "tracing")]
pub struct SearchMetrics {
    /// Rounds that ran the full search
    pub rounds: AtomicU64,
    /// Theorem equalities indexed
    pub theorems: AtomicU64,
    /// Left-hand-side patterns registered
    pub patterns: AtomicU64,
    /// Right-hand-side terms enumerated
    pub rhs_terms: AtomicU64,
    /// Candidate pairs considered
    pub candidates: AtomicU64,
    /// Candidates refuted by a ground witness
    pub falsified: AtomicU64,
    /// Candidates with too little ground support
    pub unconfirmed: AtomicU64,
    /// Candidates dropped by the structural filters
    pub filtered: AtomicU64,
    /// Conjectures emitted
    pub conjectures: AtomicU64,
    /// Deepest right-hand side reached
    pub max_rhs_depth: AtomicU64,
}

#[cfg(feature = "tracing")]
impl SearchMetrics {
    pub fn new() -> Self {
        Self {
            rounds: AtomicU64::new(0),
            theorems: AtomicU64::new(0),
            patterns: AtomicU64::new(0),
            rhs_terms: AtomicU64::new(0),
            candidates: AtomicU64::new(0),
            falsified: AtomicU64::new(0),
            unconfirmed: AtomicU64::new(0),
            filtered: AtomicU64::new(0),
            conjectures: AtomicU64::new(0),
            max_rhs_depth: AtomicU64::new(0),
        }
    }

    #[inline]
    pub fn record_round(&self) {
        self.rounds.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn record_theorem(&self) {
        self.theorems.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn record_pattern(&self) {
        self.patterns.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn record_rhs_term(&self, depth: u64) {
        self.rhs_terms.fetch_add(1, Ordering::Relaxed);
        self.update_max_rhs_depth(depth);
    }

    #[inline]
    pub fn record_candidate(&self) {
        self.candidates.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn record_falsified(&self) {
        self.falsified.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn record_unconfirmed(&self) {
        self.unconfirmed.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn record_filtered(&self) {
        self.filtered.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn record_conjecture(&self) {
        self.conjectures.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn update_max_rhs_depth(&self, depth: u64) {
        let mut current = self.max_rhs_depth.load(Ordering::Relaxed);
        while depth > current {
            match self.max_rhs_depth.compare_exchange_weak(
                current,
                depth,
                Ordering::Relaxed,
                Ordering::Relaxed,
            ) {
                Ok(_) => break,
                Err(c) => current = c,
            }
        }
    }

    pub fn report(&self) -> MetricsReport {
        MetricsReport {
            rounds: self.rounds.load(Ordering::Relaxed),
            theorems: self.theorems.load(Ordering::Relaxed),
            patterns: self.patterns.load(Ordering::Relaxed),
            rhs_terms: self.rhs_terms.load(Ordering::Relaxed),
            candidates: self.candidates.load(Ordering::Relaxed),
            falsified: self.falsified.load(Ordering::Relaxed),
            unconfirmed: self.unconfirmed.load(Ordering::Relaxed),
            filtered: self.filtered.load(Ordering::Relaxed),
            conjectures: self.conjectures.load(Ordering::Relaxed),
            max_rhs_depth: self.max_rhs_depth.load(Ordering::Relaxed),
        }
    }

    pub fn reset(&self) {
        for counter in [
            &self.rounds,
            &self.theorems,
            &self.patterns,
            &self.rhs_terms,
            &self.candidates,
            &self.falsified,
            &self.unconfirmed,
            &self.filtered,
            &self.conjectures,
            &self.max_rhs_depth,
        ] {
            counter.store(0, Ordering::Relaxed);
        }
    }
}

#[cfg(feature = "tracing")]
impl Default for SearchMetrics {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(feature = "tracing")]
impl std::fmt::Debug for SearchMetrics {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("SearchMetrics").field(&self.report()).finish()
    }
}

/// Snapshot of the counters.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MetricsReport {
    pub rounds: u64,
    pub theorems: u64,
    pub patterns: u64,
    pub rhs_terms: u64,
    pub candidates: u64,
    pub falsified: u64,
    pub unconfirmed: u64,
    pub filtered: u64,
    pub conjectures: u64,
    pub max_rhs_depth: u64,
}

impl MetricsReport {
    /// Share of considered candidates that became conjectures.
    pub fn acceptance_rate(&self) -> f64 {
        if self.candidates == 0 {
            0.0
        } else {
            self.conjectures as f64 / self.candidates as f64
        }
    }

    /// Share of candidates that survived the ground-witness checks.
    pub fn survival_rate(&self) -> f64 {
        if self.candidates == 0 {
            1.0
        } else {
            let dropped = self.falsified + self.unconfirmed;
            self.candidates.saturating_sub(dropped) as f64 / self.candidates as f64
        }
    }
}

impl std::fmt::Display for MetricsReport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "=== Conjecture Search ===")?;
        writeln!(f, "Rounds:             {}", self.rounds)?;
        writeln!(f, "Theorems:           {}", self.theorems)?;
        writeln!(f, "Patterns:           {}", self.patterns)?;
        writeln!(
            f,
            "RHS terms:          {} (max depth {})",
            self.rhs_terms, self.max_rhs_depth
        )?;
        writeln!(
            f,
            "Candidates:         {} ({} falsified, {} unconfirmed, {} filtered)",
            self.candidates, self.falsified, self.unconfirmed, self.filtered
        )?;
        writeln!(
            f,
            "Conjectures:        {} ({:.1}% of candidates)",
            self.conjectures,
            self.acceptance_rate() * 100.0
        )?;
        Ok(())
    }
}

#[cfg(not(feature = "tracing"))]
#[derive(Debug)]
pub struct SearchMetrics;

#[cfg(not(feature = "tracing"))]
impl SearchMetrics {
    #[inline]
    pub fn new() -> Self {
        SearchMetrics
    }
    #[inline]
    pub fn record_round(&self) {}
    #[inline]
    pub fn record_theorem(&self) {}
    #[inline]
    pub fn record_pattern(&self) {}
    #[inline]
    pub fn record_rhs_term(&self, _depth: u64) {}
    #[inline]
    pub fn record_candidate(&self) {}
    #[inline]
    pub fn record_falsified(&self) {}
    #[inline]
    pub fn record_unconfirmed(&self) {}
    #[inline]
    pub fn record_filtered(&self) {}
    #[inline]
    pub fn record_conjecture(&self) {}
    #[inline]
    pub fn update_max_rhs_depth(&self, _depth: u64) {}
    #[inline]
    pub fn report(&self) -> MetricsReport {
        MetricsReport::default()
    }
    #[inline]
    pub fn reset(&self) {}
}

#[cfg(not(feature = "tracing"))]
impl Default for SearchMetrics {
    fn default() -> Self {
        Self::new()
    }
}

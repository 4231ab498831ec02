use crate::error::ConfigError;

/// Options fixed when the engine is built.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConjectureConfig {
    /// Distinct variables of a left-hand side must match distinct classes.
    pub require_distinct_variable_patterns: bool,
    /// Reject candidates refuted by a ground witness.
    pub filter_falsification: bool,
    /// Require at least one confirming ground witness.
    pub filter_confirmation: bool,
    /// Require each variable to be witnessed by as many distinct classes as
    /// it has occurrences.
    pub filter_confirmation_by_domain_coverage: bool,
    /// Only bind witness variables to classes with a ground term.
    pub filter_confirmation_ground_only: bool,
    /// Run on every Nth full-effort check.
    pub full_check_frequency: u32,
    pub max_conjectures_per_round: usize,
    /// Left-hand sides are enumerated at depths `1..=max_lhs_depth`.
    pub max_lhs_depth: u32,
    /// Right-hand sides are enumerated at depths `0..=max_rhs_depth`.
    pub max_rhs_depth: u32,
    /// Right-hand-side terms considered per round.
    pub max_rhs_candidates: usize,
    pub seed: u64,
}

impl Default for ConjectureConfig {
    fn default() -> Self {
        Self {
            require_distinct_variable_patterns: false,
            filter_falsification: true,
            filter_confirmation: true,
            filter_confirmation_by_domain_coverage: true,
            filter_confirmation_ground_only: true,
            full_check_frequency: 1,
            max_conjectures_per_round: 1,
            max_lhs_depth: 2,
            max_rhs_depth: 4,
            max_rhs_candidates: 100,
            seed: 0,
        }
    }
}

impl ConjectureConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.full_check_frequency == 0 {
            return Err(ConfigError::ZeroCheckFrequency);
        }
        if self.max_lhs_depth == 0 {
            return Err(ConfigError::ZeroLhsDepth);
        }
        if self.max_conjectures_per_round == 0 || self.max_rhs_candidates == 0 {
            return Err(ConfigError::EmptyRound);
        }
        Ok(())
    }

    /// Whether witness bindings are collected at all.
    pub fn uses_witnesses(&self) -> bool {
        self.filter_confirmation || self.filter_falsification
    }
}

#[cfg(test)]
#[path = "tests/config.rs"]
mod tests;

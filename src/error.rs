use crate::symbol::{FuncId, SortId};
use crate::term::TermId;

/// Errors from checked term construction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TermError {
    UnknownFunction(FuncId),
    UnknownTerm(TermId),
    ArityMismatch {
        func: FuncId,
        expected: usize,
        found: usize,
    },
    SortMismatch {
        func: FuncId,
        position: usize,
        expected: SortId,
        found: SortId,
    },
}

impl std::fmt::Display for TermError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TermError::UnknownFunction(func) => write!(f, "No signature declared for {:?}", func),
            TermError::UnknownTerm(term) => write!(f, "Unknown term id {:?}", term),
            TermError::ArityMismatch {
                func,
                expected,
                found,
            } => write!(
                f,
                "{:?} expects {} arguments, got {}",
                func, expected, found
            ),
            TermError::SortMismatch {
                func,
                position,
                expected,
                found,
            } => write!(
                f,
                "argument {} of {:?} has sort {:?}, expected {:?}",
                position, func, found, expected
            ),
        }
    }
}

impl std::error::Error for TermError {}

/// Errors from validating a [`crate::config::ConjectureConfig`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    ZeroCheckFrequency,
    ZeroLhsDepth,
    EmptyRound,
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::ZeroCheckFrequency => {
                write!(f, "full_check_frequency must be at least 1")
            }
            ConfigError::ZeroLhsDepth => write!(f, "max_lhs_depth must be at least 1"),
            ConfigError::EmptyRound => write!(
                f,
                "max_conjectures_per_round and max_rhs_candidates must be positive"
            ),
        }
    }
}

impl std::error::Error for ConfigError {}

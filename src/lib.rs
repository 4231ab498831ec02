pub mod config;
pub mod congruence;
pub mod engine;
pub mod enumerate;
pub mod error;
pub mod lattice;
pub mod lemma;
pub mod matching;
pub mod metrics;
pub mod model;
pub mod pattern;
pub mod subst;
pub mod subst_index;
pub mod symbol;
pub mod term;
pub mod theorem_index;
pub mod trace;
pub mod universal;

pub use config::ConjectureConfig;
pub use engine::{ConjectureEngine, Rejection, RoundReport};
pub use lemma::{Assertion, CaseSplit, Conjecture, Effort, ProofHost};

#[cfg(test)]
pub(crate) mod test_utils;

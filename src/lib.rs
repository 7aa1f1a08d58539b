//! Oracle-guided string repair.
//!
//! Given an input string and a black-box oracle program that accepts or
//! rejects byte strings, find a string within a bounded number of
//! single-character edits that the oracle accepts.
//!
//! # Architecture
//!
//! The input is compiled into a positional *covering grammar*: one rule per
//! byte, each offering the alternatives {match, delete, insert-before,
//! substitute}. A repair attempt is then a selection of non-match
//! productions plus at most a handful of replacement bytes; the
//! [`generate`] walk turns a selection into a concrete candidate, and the
//! [`SearchEngine`] enumerates selections in a fixed order until the oracle
//! accepts one.
//!
//! Oracles are subprocesses: either one spawn per candidate
//! ([`SubprocessOracle`]) or a single persistent helper speaking a
//! line-oriented protocol ([`ServerOracle`]). Every transport failure is a
//! reject for that candidate only; a run always terminates in either a
//! repaired string or a definite "no fix" within the edit bound.
//!
//! # Example
//!
//! ```no_run
//! use oracle_repair::{Alphabet, Grammar, RepairOutcome, SearchEngine, SearchLimits};
//! use oracle_repair::oracle::SubprocessOracle;
//!
//! let input = b"1924-o1-01";
//! let covering = Grammar::from_input(input).covering(false);
//! let engine = SearchEngine::new(&covering, Alphabet::default(), SearchLimits::default());
//!
//! let mut oracle = SubprocessOracle::new("/usr/local/bin/validate-date");
//! match engine.run(input, &mut oracle) {
//!     RepairOutcome::Repaired { output, edits } => {
//!         println!("repaired with {edits} edits: {}", String::from_utf8_lossy(&output));
//!     }
//!     RepairOutcome::NoFix { max_edits } => {
//!         println!("no fix within {max_edits} edits");
//!     }
//! }
//! ```

pub mod alphabet;
pub mod config;
pub mod generate;
pub mod grammar;
pub mod oracle;
pub mod search;

// Re-exports
pub use alphabet::Alphabet;
pub use config::{SearchLimits, GRAMMAR_ORACLE_TIMEOUT, REGEX_ORACLE_TIMEOUT};
pub use generate::{generate, EditApplication};
pub use grammar::{EditKind, EditRule, Grammar, Production, Symbol, START};
pub use oracle::{
    CachedOracle, Oracle, OracleError, OracleStats, ServerOracle, SubprocessOracle, Verdict,
};
pub use search::{RepairOutcome, SearchEngine};

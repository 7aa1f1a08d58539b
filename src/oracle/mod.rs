//! Oracle drivers: everything that decides whether a candidate is accepted.
//!
//! An oracle classifies a byte string as accept, reject, or incomplete. Two
//! drivers exist: [`SubprocessOracle`] spawns the oracle program once per
//! candidate, [`ServerOracle`] keeps a single helper process alive and talks
//! a line-oriented wire protocol to it. [`CachedOracle`] wraps either and
//! suppresses duplicate submissions.
//!
//! Transport failures (spawn, pipe, timeout) never abort a run; they degrade
//! to [`Verdict::Reject`] for the candidate at hand.

pub mod server;
pub mod subprocess;

pub use server::{ServerOracle, SERVER_CATEGORIES, SERVER_SPEC_PREFIX};
pub use subprocess::SubprocessOracle;

use std::collections::HashSet;
use std::fmt;
use std::path::PathBuf;
use std::process::ExitStatus;
use thiserror::Error;
use xxhash_rust::xxh3::xxh3_64;

/// An oracle's classification of one candidate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    /// The candidate parses/validates.
    Accept,
    /// The candidate is invalid (or the oracle failed to answer).
    Reject,
    /// The input ran out mid-production; a longer string might validate.
    Incomplete,
}

/// Monotonic call counters, reported once at process exit.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct OracleStats {
    pub calls: u64,
    pub accepted: u64,
    pub rejected: u64,
    pub incomplete: u64,
}

impl OracleStats {
    pub fn record(&mut self, verdict: Verdict) {
        self.calls += 1;
        match verdict {
            Verdict::Accept => self.accepted += 1,
            Verdict::Reject => self.rejected += 1,
            Verdict::Incomplete => self.incomplete += 1,
        }
    }
}

impl fmt::Display for OracleStats {
    /// The final statistics line. The exact spacing is part of the CLI
    /// contract; downstream tooling parses it.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "*** Number of required oracle runs: {} correct: {} incorrect: {} incomplete: {} ***",
            self.calls, self.accepted, self.rejected, self.incomplete
        )
    }
}

/// Construction-time oracle failures. Transport failures during a run are
/// not errors; they are rejects.
#[derive(Error, Debug)]
pub enum OracleError {
    #[error("Oracle executable not found or not executable: {0}")]
    NotExecutable(PathBuf),

    #[error("Unknown oracle server category: {0}")]
    UnknownCategory(String),

    #[error("Failed to spawn oracle server {program}: {source}")]
    SpawnFailed {
        program: PathBuf,
        source: std::io::Error,
    },

    #[error("Oracle server pipe missing: {0}")]
    MissingPipe(&'static str),
}

/// The seam every driver implements; the search engine only sees this.
pub trait Oracle {
    /// Classify one candidate. Must tally the result into [`stats`].
    ///
    /// [`stats`]: Oracle::stats
    fn check(&mut self, candidate: &[u8]) -> Verdict;

    fn stats(&self) -> &OracleStats;
}

impl<O: Oracle + ?Sized> Oracle for &mut O {
    fn check(&mut self, candidate: &[u8]) -> Verdict {
        (**self).check(candidate)
    }

    fn stats(&self) -> &OracleStats {
        (**self).stats()
    }
}

/// Duplicate suppression plus an optional total-call budget.
///
/// A repeated candidate answers `Reject` without reaching the inner driver
/// or its counters. The first accept terminates the search upstream, so a
/// previously accepted string is never re-asked; a previously incomplete
/// one downgrades to reject on repeat, which is harmless because incomplete
/// never terminates anything.
///
/// Candidates are remembered as 64-bit xxh3 content hashes rather than full
/// strings to keep long searches cheap.
pub struct CachedOracle<O> {
    inner: O,
    seen: HashSet<u64>,
    budget: Option<u64>,
}

impl<O: Oracle> CachedOracle<O> {
    pub fn new(inner: O) -> Self {
        Self::with_budget(inner, None)
    }

    /// A budget of `Some(n)` rejects every candidate after the n-th real
    /// oracle call without spawning anything further.
    pub fn with_budget(inner: O, budget: Option<u64>) -> Self {
        Self {
            inner,
            seen: HashSet::new(),
            budget,
        }
    }

    pub fn into_inner(self) -> O {
        self.inner
    }
}

impl<O: Oracle> Oracle for CachedOracle<O> {
    fn check(&mut self, candidate: &[u8]) -> Verdict {
        if !self.seen.insert(xxh3_64(candidate)) {
            return Verdict::Reject;
        }
        if let Some(budget) = self.budget {
            if self.inner.stats().calls >= budget {
                return Verdict::Reject;
            }
        }
        self.inner.check(candidate)
    }

    fn stats(&self) -> &OracleStats {
        self.inner.stats()
    }
}

/// Map an oracle process's exit status onto a verdict.
///
/// 0 accept, 1 reject, 255 incomplete; any other code, or death by signal,
/// is a reject.
pub(crate) fn classify_exit(status: ExitStatus) -> Verdict {
    match status.code() {
        Some(0) => Verdict::Accept,
        Some(255) => Verdict::Incomplete,
        _ => Verdict::Reject,
    }
}

/// Ignore SIGPIPE process-wide. Without this, a crashed server turns the
/// driver's next write into a fatal signal instead of an `EPIPE` error.
pub fn ignore_sigpipe() {
    unsafe {
        libc::signal(libc::SIGPIPE, libc::SIG_IGN);
    }
}

/// Control-escaped, length-capped rendering of a candidate for logging.
pub(crate) fn preview(bytes: &[u8]) -> String {
    const MAX: usize = 120;
    if bytes.is_empty() {
        return "<empty>".to_string();
    }
    let mut out = String::with_capacity(bytes.len().min(MAX));
    for &b in bytes.iter().take(MAX) {
        match b {
            b'\n' => out.push_str("\\n"),
            b'\t' => out.push_str("\\t"),
            0x20..=0x7E => out.push(b as char),
            _ => out.push_str(&format!("\\x{b:02X}")),
        }
    }
    if bytes.len() > MAX {
        out.push('…');
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::os::unix::process::ExitStatusExt;

    /// Scripted oracle for exercising the wrappers.
    struct ScriptedOracle {
        accept: Vec<u8>,
        stats: OracleStats,
    }

    impl ScriptedOracle {
        fn accepting(accept: &[u8]) -> Self {
            Self {
                accept: accept.to_vec(),
                stats: OracleStats::default(),
            }
        }
    }

    impl Oracle for ScriptedOracle {
        fn check(&mut self, candidate: &[u8]) -> Verdict {
            let verdict = if candidate == self.accept {
                Verdict::Accept
            } else {
                Verdict::Reject
            };
            self.stats.record(verdict);
            verdict
        }

        fn stats(&self) -> &OracleStats {
            &self.stats
        }
    }

    #[test]
    fn test_classify_exit_codes() {
        // Raw wait statuses: exit(n) is n << 8, a bare signal number is a kill.
        assert_eq!(classify_exit(ExitStatus::from_raw(0)), Verdict::Accept);
        assert_eq!(classify_exit(ExitStatus::from_raw(1 << 8)), Verdict::Reject);
        assert_eq!(
            classify_exit(ExitStatus::from_raw(255 << 8)),
            Verdict::Incomplete
        );
        assert_eq!(classify_exit(ExitStatus::from_raw(2 << 8)), Verdict::Reject);
        assert_eq!(classify_exit(ExitStatus::from_raw(127 << 8)), Verdict::Reject);
        assert_eq!(classify_exit(ExitStatus::from_raw(9)), Verdict::Reject);
    }

    #[test]
    fn test_stats_line_format() {
        let mut stats = OracleStats::default();
        stats.record(Verdict::Accept);
        stats.record(Verdict::Reject);
        stats.record(Verdict::Reject);
        stats.record(Verdict::Incomplete);
        assert_eq!(
            stats.to_string(),
            "*** Number of required oracle runs: 4 correct: 1 incorrect: 2 incomplete: 1 ***"
        );
    }

    #[test]
    fn test_cache_suppresses_repeats() {
        let mut cached = CachedOracle::new(ScriptedOracle::accepting(b"good"));

        assert_eq!(cached.check(b"bad"), Verdict::Reject);
        assert_eq!(cached.check(b"bad"), Verdict::Reject);
        // only the first submission reached the driver
        assert_eq!(cached.stats().calls, 1);

        assert_eq!(cached.check(b"good"), Verdict::Accept);
        assert_eq!(cached.stats().calls, 2);
        assert_eq!(cached.stats().accepted, 1);
    }

    #[test]
    fn test_budget_exhaustion_rejects() {
        let mut cached =
            CachedOracle::with_budget(ScriptedOracle::accepting(b"good"), Some(2));

        assert_eq!(cached.check(b"a"), Verdict::Reject);
        assert_eq!(cached.check(b"b"), Verdict::Reject);
        // budget spent; even the acceptable candidate is refused unqueried
        assert_eq!(cached.check(b"good"), Verdict::Reject);
        assert_eq!(cached.stats().calls, 2);
    }

    #[test]
    fn test_preview_escapes_and_caps() {
        assert_eq!(preview(b""), "<empty>");
        assert_eq!(preview(b"a\tb\nc\x01"), "a\\tb\\nc\\x01");

        let long = vec![b'x'; 200];
        let shown = preview(&long);
        assert!(shown.ends_with('…'));
        assert_eq!(shown.chars().filter(|&c| c == 'x').count(), 120);
    }
}

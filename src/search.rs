//! The edit search engine.
//!
//! Enumerates edit subsets of increasing size, assigns replacement
//! characters where an edit needs one, generates each candidate, and asks
//! the oracle. The first accepted candidate wins.
//!
//! Everything here is deterministic: edits are numbered by covering-grammar
//! order, subsets are enumerated lexicographically over those numbers, and
//! the alphabet iterates in fixed order. Given the same input, limits, and
//! oracle, two runs produce the same candidates in the same sequence.

use crate::alphabet::Alphabet;
use crate::config::SearchLimits;
use crate::generate::{generate, EditApplication};
use crate::grammar::{EditRule, Grammar};
use crate::oracle::{CachedOracle, Oracle, Verdict};
use tracing::debug;

/// Terminal state of a repair run.
#[derive(Debug, Clone, PartialEq, Eq)]
#[must_use = "RepairOutcome decides the process exit code"]
pub enum RepairOutcome {
    /// An accepted candidate, and the number of edits it took.
    Repaired { output: Vec<u8>, edits: usize },
    /// Nothing within the edit bound was accepted.
    NoFix { max_edits: usize },
}

pub struct SearchEngine<'g> {
    grammar: &'g Grammar,
    edits: Vec<EditRule>,
    alphabet: Alphabet,
    limits: SearchLimits,
}

impl<'g> SearchEngine<'g> {
    /// Build an engine over a covering grammar. Edit numbering is fixed
    /// here and never changes for the lifetime of the engine.
    pub fn new(covering: &'g Grammar, alphabet: Alphabet, limits: SearchLimits) -> Self {
        let edits = covering.edits();
        Self {
            grammar: covering,
            edits,
            alphabet,
            limits,
        }
    }

    pub fn edit_count(&self) -> usize {
        self.edits.len()
    }

    /// Run the full search for `input`.
    ///
    /// The engine wraps the caller's oracle in duplicate suppression for
    /// the duration of the run; counters accumulate in the caller's oracle.
    pub fn run<O: Oracle>(&self, input: &[u8], oracle: O) -> RepairOutcome {
        let mut oracle = CachedOracle::with_budget(oracle, self.limits.max_oracle_calls);

        // Zero-edit check: the input may already be acceptable.
        if oracle.check(input) == Verdict::Accept {
            return RepairOutcome::Repaired {
                output: input.to_vec(),
                edits: 0,
            };
        }

        for k in 1..=self.limits.max_edits {
            debug!(k, edits = self.edits.len(), "trying edit combinations");
            if let Some(output) = self.search_k(k, &mut oracle) {
                return RepairOutcome::Repaired { output, edits: k };
            }
        }

        RepairOutcome::NoFix {
            max_edits: self.limits.max_edits,
        }
    }

    fn search_k<O: Oracle>(&self, k: usize, oracle: &mut O) -> Option<Vec<u8>> {
        for combo in Combinations::new(self.edits.len(), k) {
            let need = combo
                .iter()
                .filter(|&&i| self.edits[i].kind.needs_char())
                .count();
            if need > self.limits.max_char_edits {
                continue;
            }

            let found = if need == 0 {
                self.try_candidate(&combo, &[], oracle)
            } else {
                let mut chars = Vec::with_capacity(need);
                self.assign_chars(&combo, need, &mut chars, oracle)
            };
            if found.is_some() {
                return found;
            }
        }
        None
    }

    /// Depth-first assignment of replacement bytes, one alphabet pass per
    /// char-needing edit in the selection.
    fn assign_chars<O: Oracle>(
        &self,
        combo: &[usize],
        need: usize,
        chars: &mut Vec<u8>,
        oracle: &mut O,
    ) -> Option<Vec<u8>> {
        if chars.len() == need {
            return self.try_candidate(combo, chars, oracle);
        }
        for b in self.alphabet.iter() {
            chars.push(b);
            if let Some(found) = self.assign_chars(combo, need, chars, oracle) {
                return Some(found);
            }
            chars.pop();
        }
        None
    }

    fn try_candidate<O: Oracle>(
        &self,
        combo: &[usize],
        chars: &[u8],
        oracle: &mut O,
    ) -> Option<Vec<u8>> {
        let mut bytes = chars.iter().copied();
        let mut apps: Vec<EditApplication> = combo
            .iter()
            .map(|&i| {
                let rule = &self.edits[i];
                if rule.kind.needs_char() {
                    let b = bytes
                        .next()
                        .expect("one replacement byte per char-needing edit");
                    EditApplication::with_byte(rule, b)
                } else {
                    EditApplication::new(rule)
                }
            })
            .collect();

        // A selection some edit of which never activates is malformed.
        let candidate = generate(self.grammar, &mut apps)?;

        match oracle.check(&candidate) {
            Verdict::Accept => Some(candidate),
            Verdict::Reject | Verdict::Incomplete => None,
        }
    }
}

/// Strictly-ascending k-element subsets of `0..n`, lexicographic.
struct Combinations {
    n: usize,
    k: usize,
    indices: Vec<usize>,
    started: bool,
    done: bool,
}

impl Combinations {
    fn new(n: usize, k: usize) -> Self {
        Self {
            n,
            k,
            indices: Vec::new(),
            started: false,
            done: k > n,
        }
    }
}

impl Iterator for Combinations {
    type Item = Vec<usize>;

    fn next(&mut self) -> Option<Vec<usize>> {
        if self.done {
            return None;
        }
        if !self.started {
            self.started = true;
            self.indices = (0..self.k).collect();
            return Some(self.indices.clone());
        }

        // Advance the rightmost index that still has headroom.
        let mut i = self.k;
        while i > 0 {
            i -= 1;
            if self.indices[i] < self.n - self.k + i {
                self.indices[i] += 1;
                for j in i + 1..self.k {
                    self.indices[j] = self.indices[j - 1] + 1;
                }
                return Some(self.indices.clone());
            }
        }
        self.done = true;
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::oracle::OracleStats;

    /// Accepts exactly one byte string; everything else rejects.
    struct ExactOracle {
        target: Vec<u8>,
        stats: OracleStats,
    }

    impl ExactOracle {
        fn new(target: &[u8]) -> Self {
            Self {
                target: target.to_vec(),
                stats: OracleStats::default(),
            }
        }
    }

    impl Oracle for ExactOracle {
        fn check(&mut self, candidate: &[u8]) -> Verdict {
            let verdict = if candidate == self.target {
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

    /// Accepts the target, reports proper prefixes as incomplete.
    struct PrefixOracle {
        target: Vec<u8>,
        stats: OracleStats,
    }

    impl Oracle for PrefixOracle {
        fn check(&mut self, candidate: &[u8]) -> Verdict {
            let verdict = if candidate == self.target {
                Verdict::Accept
            } else if self.target.starts_with(candidate) {
                Verdict::Incomplete
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

    fn engine<'g>(covering: &'g Grammar, limits: SearchLimits) -> SearchEngine<'g> {
        SearchEngine::new(covering, Alphabet::default(), limits)
    }

    fn repair(input: &[u8], target: &[u8], limits: SearchLimits) -> (RepairOutcome, OracleStats) {
        let covering = Grammar::from_input(input).covering(limits.tail_insertion);
        let engine = engine(&covering, limits);
        let mut oracle = ExactOracle::new(target);
        let outcome = engine.run(input, &mut oracle);
        (outcome, *oracle.stats())
    }

    #[test]
    fn test_combinations_order() {
        let all: Vec<Vec<usize>> = Combinations::new(4, 2).collect();
        assert_eq!(
            all,
            vec![
                vec![0, 1],
                vec![0, 2],
                vec![0, 3],
                vec![1, 2],
                vec![1, 3],
                vec![2, 3],
            ]
        );
        assert_eq!(Combinations::new(3, 3).collect::<Vec<_>>(), vec![vec![0, 1, 2]]);
        assert_eq!(Combinations::new(2, 3).count(), 0);
        assert_eq!(Combinations::new(5, 1).count(), 5);
    }

    #[test]
    fn test_zero_edit_accept() {
        let (outcome, stats) = repair(b"abc", b"abc", SearchLimits::default());
        assert_eq!(
            outcome,
            RepairOutcome::Repaired {
                output: b"abc".to_vec(),
                edits: 0
            }
        );
        assert_eq!(stats.calls, 1);
        assert_eq!(stats.accepted, 1);
    }

    #[test]
    fn test_substitute_repair() {
        let (outcome, _) = repair(b"abX", b"abc", SearchLimits::default());
        assert_eq!(
            outcome,
            RepairOutcome::Repaired {
                output: b"abc".to_vec(),
                edits: 1
            }
        );
    }

    #[test]
    fn test_delete_repair() {
        let (outcome, _) = repair(b"abcd", b"abc", SearchLimits::default());
        assert_eq!(
            outcome,
            RepairOutcome::Repaired {
                output: b"abc".to_vec(),
                edits: 1
            }
        );
    }

    #[test]
    fn test_insert_repair() {
        let (outcome, _) = repair(b"ac", b"abc", SearchLimits::default());
        assert_eq!(
            outcome,
            RepairOutcome::Repaired {
                output: b"abc".to_vec(),
                edits: 1
            }
        );
    }

    #[test]
    fn test_tail_insert_repair_needs_toggle() {
        let limits = SearchLimits {
            max_edits: 2,
            ..SearchLimits::default()
        };
        let (outcome, _) = repair(b"abc", b"abcd", limits.clone());
        assert_eq!(outcome, RepairOutcome::NoFix { max_edits: 2 });

        let limits = SearchLimits {
            tail_insertion: true,
            ..limits
        };
        let (outcome, _) = repair(b"abc", b"abcd", limits);
        assert_eq!(
            outcome,
            RepairOutcome::Repaired {
                output: b"abcd".to_vec(),
                edits: 1
            }
        );
    }

    #[test]
    fn test_multi_edit_repair() {
        let (outcome, _) = repair(b"axbxc", b"abc", SearchLimits::default());
        assert_eq!(
            outcome,
            RepairOutcome::Repaired {
                output: b"abc".to_vec(),
                edits: 2
            }
        );
    }

    #[test]
    fn test_no_fix_within_bound() {
        let limits = SearchLimits {
            max_edits: 1,
            ..SearchLimits::default()
        };
        let (outcome, stats) = repair(b"xyz", b"completely-different", limits);
        assert_eq!(outcome, RepairOutcome::NoFix { max_edits: 1 });
        assert!(stats.calls >= 1);
        assert_eq!(stats.accepted, 0);
        // 1 zero-edit call + at most (3 deletes + 6 char edits × 96 bytes),
        // minus duplicate suppression
        assert!(stats.calls <= 1 + 3 + 6 * 96);
    }

    #[test]
    fn test_first_match_follows_edit_order() {
        // Both single-deletion repairs are acceptable; the delete at <c0>
        // is enumerated first, so "b" must win.
        struct EitherOracle(OracleStats);
        impl Oracle for EitherOracle {
            fn check(&mut self, candidate: &[u8]) -> Verdict {
                let verdict = if candidate == b"a" || candidate == b"b" {
                    Verdict::Accept
                } else {
                    Verdict::Reject
                };
                self.0.record(verdict);
                verdict
            }
            fn stats(&self) -> &OracleStats {
                &self.0
            }
        }

        let covering = Grammar::from_input(b"ab").covering(false);
        let engine = engine(&covering, SearchLimits::default());
        let outcome = engine.run(b"ab", EitherOracle(OracleStats::default()));
        assert_eq!(
            outcome,
            RepairOutcome::Repaired {
                output: b"b".to_vec(),
                edits: 1
            }
        );
    }

    #[test]
    fn test_incomplete_does_not_terminate() {
        let covering = Grammar::from_input(b"abX").covering(false);
        let engine = engine(&covering, SearchLimits::default());
        let mut oracle = PrefixOracle {
            target: b"abc".to_vec(),
            stats: OracleStats::default(),
        };
        let outcome = engine.run(b"abX", &mut oracle);
        assert_eq!(
            outcome,
            RepairOutcome::Repaired {
                output: b"abc".to_vec(),
                edits: 1
            }
        );
        // the deletion candidate "ab" was reported incomplete on the way
        assert!(oracle.stats().incomplete >= 1);
    }

    #[test]
    fn test_determinism_across_runs() {
        let run = || {
            let covering = Grammar::from_input(b"1924-o1-01").covering(false);
            let engine = engine(&covering, SearchLimits::default());
            let mut oracle = ExactOracle::new(b"1924-01-01");
            match engine.run(b"1924-o1-01", &mut oracle) {
                RepairOutcome::Repaired { output, .. } => (output, oracle.stats().calls),
                RepairOutcome::NoFix { .. } => panic!("expected a repair"),
            }
        };
        let (out1, calls1) = run();
        let (out2, calls2) = run();
        assert_eq!(out1, b"1924-01-01");
        assert_eq!(out1, out2);
        assert_eq!(calls1, calls2);
    }

    #[test]
    fn test_char_edit_budget_prunes() {
        // Repair needs two substituted characters; with the default budget
        // of one char edit the search must fail.
        let limits = SearchLimits {
            max_edits: 2,
            ..SearchLimits::default()
        };
        let (outcome, _) = repair(b"aXcY", b"abcd", limits.clone());
        assert_eq!(outcome, RepairOutcome::NoFix { max_edits: 2 });

        let limits = SearchLimits {
            max_char_edits: 2,
            ..limits
        };
        let (outcome, _) = repair(b"aXcY", b"abcd", limits);
        assert_eq!(
            outcome,
            RepairOutcome::Repaired {
                output: b"abcd".to_vec(),
                edits: 2
            }
        );
    }
}

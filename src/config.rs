//! Environment-variable knobs.
//!
//! Every knob is read once at startup. Parsing is lenient: unset or
//! unparsable values fall back to the default, numeric values are clamped
//! into their documented range.

use std::env;
use std::ops::RangeInclusive;
use std::time::Duration;

/// Default bound on simultaneous edits per candidate.
pub const DEFAULT_MAX_EDITS: usize = 5;

/// Default bound on char-needing edits per selection. Raising it multiplies
/// the search by the alphabet size per additional slot.
pub const DEFAULT_MAX_CHAR_EDITS: usize = 1;

/// Per-call timeout for grammar-class oracles (full parsers).
pub const GRAMMAR_ORACLE_TIMEOUT: Duration = Duration::from_millis(6000);

/// Per-call timeout suited to regex-class oracles.
pub const REGEX_ORACLE_TIMEOUT: Duration = Duration::from_millis(200);

/// Bounds the search engine's exploration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchLimits {
    /// Largest edit-set size tried before giving up.
    pub max_edits: usize,
    /// Selections with more char-needing edits than this are pruned.
    pub max_char_edits: usize,
    /// Allow an insertion production at the sentinel (repairs that append).
    pub tail_insertion: bool,
    /// Hard cap on real oracle invocations; `None` means unlimited.
    pub max_oracle_calls: Option<u64>,
}

impl Default for SearchLimits {
    fn default() -> Self {
        Self {
            max_edits: DEFAULT_MAX_EDITS,
            max_char_edits: DEFAULT_MAX_CHAR_EDITS,
            tail_insertion: false,
            max_oracle_calls: None,
        }
    }
}

impl SearchLimits {
    pub fn from_env() -> Self {
        Self {
            max_edits: parse_clamped(
                env::var("REPAIR_MAX_EDITS").ok().as_deref(),
                DEFAULT_MAX_EDITS as u64,
                1..=10,
            ) as usize,
            max_char_edits: parse_clamped(
                env::var("REPAIR_MAX_CHAR_EDITS").ok().as_deref(),
                DEFAULT_MAX_CHAR_EDITS as u64,
                0..=10,
            ) as usize,
            tail_insertion: parse_flag(env::var("REPAIR_TAIL_INSERT").ok().as_deref()),
            max_oracle_calls: env::var("REPAIR_MAX_ORACLE_CALLS")
                .ok()
                .and_then(|v| v.trim().parse::<u64>().ok())
                .filter(|&v| v >= 1),
        }
    }
}

/// The per-oracle-call timeout, `REPAIR_VALIDATOR_TIMEOUT_MS`-overridable.
pub fn oracle_timeout() -> Duration {
    let ms = parse_clamped(
        env::var("REPAIR_VALIDATOR_TIMEOUT_MS").ok().as_deref(),
        GRAMMAR_ORACLE_TIMEOUT.as_millis() as u64,
        1..=60_000,
    );
    Duration::from_millis(ms)
}

fn parse_clamped(raw: Option<&str>, default: u64, range: RangeInclusive<u64>) -> u64 {
    match raw.and_then(|v| v.trim().parse::<u64>().ok()) {
        Some(v) => v.clamp(*range.start(), *range.end()),
        None => default,
    }
}

fn parse_flag(raw: Option<&str>) -> bool {
    matches!(
        raw.map(|v| v.trim().to_ascii_lowercase()).as_deref(),
        Some("1") | Some("true") | Some("yes")
    )
}

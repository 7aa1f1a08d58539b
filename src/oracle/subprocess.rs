//! Per-call subprocess mode: one oracle process per candidate.
//!
//! The candidate is written to a fresh temp file whose path becomes the
//! oracle's sole argument. The child's stdout and stderr go to the null
//! device; the driver polls for exit until the deadline, then kills and
//! reaps. The temp file is unlinked on every exit path by its drop guard.

use super::{classify_exit, preview, Oracle, OracleStats, Verdict};
use crate::config;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::time::{Duration, Instant};
use tempfile::NamedTempFile;
use tracing::{debug, warn};

const POLL_INTERVAL: Duration = Duration::from_millis(5);

pub struct SubprocessOracle {
    program: PathBuf,
    timeout: Duration,
    stats: OracleStats,
}

impl SubprocessOracle {
    /// Driver with the environment-configured timeout.
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self::with_timeout(program, config::oracle_timeout())
    }

    pub fn with_timeout(program: impl Into<PathBuf>, timeout: Duration) -> Self {
        Self {
            program: program.into(),
            timeout,
            stats: OracleStats::default(),
        }
    }

    pub fn program(&self) -> &Path {
        &self.program
    }

    fn run_once(&self, candidate: &[u8]) -> std::io::Result<Verdict> {
        let mut file = NamedTempFile::new()?;
        file.write_all(candidate)?;
        // The child must see the complete candidate the moment it starts.
        file.as_file().sync_all()?;

        let mut child = Command::new(&self.program)
            .arg(file.path())
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()?;

        let deadline = Instant::now() + self.timeout;
        loop {
            if let Some(status) = child.try_wait()? {
                return Ok(classify_exit(status));
            }
            if Instant::now() >= deadline {
                let _ = child.kill();
                let _ = child.wait();
                warn!(
                    program = %self.program.display(),
                    timeout_ms = self.timeout.as_millis() as u64,
                    "oracle call timed out"
                );
                return Ok(Verdict::Reject);
            }
            std::thread::sleep(POLL_INTERVAL);
        }
    }
}

impl Oracle for SubprocessOracle {
    fn check(&mut self, candidate: &[u8]) -> Verdict {
        let verdict = self.run_once(candidate).unwrap_or(Verdict::Reject);
        self.stats.record(verdict);
        debug!(
            call = self.stats.calls,
            ?verdict,
            candidate = %preview(candidate),
            "oracle call"
        );
        verdict
    }

    fn stats(&self) -> &OracleStats {
        &self.stats
    }
}

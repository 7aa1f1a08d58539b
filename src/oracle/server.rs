//! Persistent server mode: one helper process for the whole run.
//!
//! Selected by an oracle spec of the form `re2-server:<Category>`. The
//! driver talks a line-oriented protocol over the child's stdio:
//!
//! ```text
//! → DATA <n>\n<n raw bytes>\n
//! ← one reply line; `OK` accepts, anything else rejects
//! → QUIT\n            (shutdown; at most one goodbye line is read back)
//! ```
//!
//! Requests and replies are strictly serialized; the driver never pipelines.

use super::{preview, Oracle, OracleError, OracleStats, Verdict};
use std::env;
use std::io::{BufRead, BufReader, Write};
use std::path::PathBuf;
use std::process::{Child, ChildStdin, ChildStdout, Command, Stdio};
use tracing::{debug, warn};

/// Oracle specs with this prefix select server mode.
pub const SERVER_SPEC_PREFIX: &str = "re2-server:";

/// Categories the helper understands.
pub const SERVER_CATEGORIES: [&str; 7] =
    ["Date", "Time", "URL", "ISBN", "IPv4", "IPv6", "FilePath"];

pub struct ServerOracle {
    child: Child,
    stdin: Option<ChildStdin>,
    stdout: BufReader<ChildStdout>,
    stats: OracleStats,
}

impl ServerOracle {
    /// Extract the category from an oracle spec, if it names server mode.
    pub fn parse_spec(spec: &str) -> Option<&str> {
        spec.strip_prefix(SERVER_SPEC_PREFIX)
    }

    /// Spawn the helper for a category, resolving the executable from
    /// `REPAIR_RE2_SERVER` (default: `re2-server` on PATH).
    pub fn spawn(category: &str) -> Result<Self, OracleError> {
        let program = env::var_os("REPAIR_RE2_SERVER")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("re2-server"));
        Self::spawn_with_program(program, category)
    }

    fn spawn_with_program(
        program: PathBuf,
        category: &str,
    ) -> Result<Self, OracleError> {
        if !SERVER_CATEGORIES.contains(&category) {
            return Err(OracleError::UnknownCategory(category.to_string()));
        }

        let mut child = Command::new(&program)
            .arg(category)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .spawn()
            .map_err(|source| OracleError::SpawnFailed {
                program: program.clone(),
                source,
            })?;

        let stdin = child.stdin.take().ok_or(OracleError::MissingPipe("stdin"))?;
        let stdout = child
            .stdout
            .take()
            .ok_or(OracleError::MissingPipe("stdout"))?;

        Ok(Self {
            child,
            stdin: Some(stdin),
            stdout: BufReader::new(stdout),
            stats: OracleStats::default(),
        })
    }

    fn request(&mut self, candidate: &[u8]) -> std::io::Result<Verdict> {
        let Some(stdin) = self.stdin.as_mut() else {
            return Ok(Verdict::Reject);
        };

        stdin.write_all(format!("DATA {}\n", candidate.len()).as_bytes())?;
        stdin.write_all(candidate)?;
        stdin.write_all(b"\n")?;
        stdin.flush()?;

        let mut reply = String::new();
        if self.stdout.read_line(&mut reply)? == 0 {
            warn!("oracle server closed its pipe");
            return Ok(Verdict::Reject);
        }

        Ok(if reply.trim_end() == "OK" {
            Verdict::Accept
        } else {
            Verdict::Reject
        })
    }
}

impl Oracle for ServerOracle {
    fn check(&mut self, candidate: &[u8]) -> Verdict {
        let verdict = self.request(candidate).unwrap_or(Verdict::Reject);
        self.stats.record(verdict);
        debug!(
            call = self.stats.calls,
            ?verdict,
            candidate = %preview(candidate),
            "server oracle call"
        );
        verdict
    }

    fn stats(&self) -> &OracleStats {
        &self.stats
    }
}

impl Drop for ServerOracle {
    fn drop(&mut self) {
        if let Some(mut stdin) = self.stdin.take() {
            let _ = stdin.write_all(b"QUIT\n");
            let _ = stdin.flush();
            // dropping the handle closes the pipe; the server sees EOF even
            // if it never understood QUIT
        }
        let mut goodbye = String::new();
        let _ = self.stdout.read_line(&mut goodbye);
        let _ = self.child.wait();
    }
}

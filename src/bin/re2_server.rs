//! Persistent regex matcher for the repair driver.
//!
//! Speaks the driver's line-oriented protocol on stdio:
//!
//! ```text
//! DATA <n>\n<n raw bytes>\n   →  `OK` (full match) or `NO`
//! QUIT\n                      →  `BYE`, then exit 0
//! ```
//!
//! Payloads are trimmed of leading/trailing ASCII whitespace before
//! matching, the same normalization the standalone validators apply.
//! EOF on stdin is a clean shutdown.

use anyhow::{bail, Context, Result};
use regex::bytes::Regex;
use std::io::{self, BufRead, Read, Write};

const CATEGORIES: [(&str, &str); 7] = [
    ("Date", r"^\d{4}-\d{2}-\d{2}$"),
    ("Time", r"^\d{2}:\d{2}:\d{2}$"),
    (
        "URL",
        r"^https?://(www\.)?[-a-zA-Z0-9@:%._+~#=]{1,256}\.[a-zA-Z0-9()]{1,6}\b([-a-zA-Z0-9()@:%_+.~#?&/=]*)$",
    ),
    ("ISBN", r"^(?:\d[- ]?){9}[\dX]$"),
    ("IPv4", r"^(\d{1,3}\.){3}\d{1,3}$"),
    ("IPv6", r"^([0-9a-fA-F]{1,4}:){7}[0-9a-fA-F]{1,4}$"),
    (
        "FilePath",
        r#"^[a-zA-Z]:\\(?:[^\\/:*?"<>|\r\n]+\\)*[^\\/:*?"<>|\r\n]*$"#,
    ),
];

fn pattern_for(category: &str) -> Option<&'static str> {
    CATEGORIES
        .iter()
        .find(|(name, _)| *name == category)
        .map(|(_, pattern)| *pattern)
}

fn main() -> Result<()> {
    let mut args = std::env::args().skip(1);
    let category = args.next().context("usage: re2-server <Category>")?;

    let Some(pattern) = pattern_for(&category) else {
        bail!(
            "unknown category '{category}' (expected one of {})",
            CATEGORIES.map(|(name, _)| name).join(", ")
        );
    };
    let re = Regex::new(pattern).context("category pattern failed to compile")?;

    serve(&re, io::stdin().lock(), io::stdout().lock())
}

fn serve(re: &Regex, mut input: impl BufRead, mut output: impl Write) -> Result<()> {
    let mut line = String::new();
    loop {
        line.clear();
        if input.read_line(&mut line)? == 0 {
            return Ok(());
        }
        let request = line.trim_end_matches(['\r', '\n']);

        if request == "QUIT" {
            writeln!(output, "BYE")?;
            output.flush()?;
            return Ok(());
        }

        let Some(len) = request
            .strip_prefix("DATA ")
            .and_then(|n| n.trim().parse::<usize>().ok())
        else {
            writeln!(output, "ERR")?;
            output.flush()?;
            continue;
        };

        let mut payload = vec![0u8; len];
        input.read_exact(&mut payload)?;
        let mut newline = [0u8; 1];
        input.read_exact(&mut newline)?;

        let verdict = if re.is_match(payload.trim_ascii()) {
            "OK"
        } else {
            "NO"
        };
        writeln!(output, "{verdict}")?;
        output.flush()?;
    }
}

//! Candidate generation: expand the covering grammar under a set of edits.
//!
//! The walk produces bytes top-down from `<start>`. It carries the selected
//! edits as mutable applications and an `active` index naming the edit whose
//! right-hand side is currently being expanded. Activation is first-fit,
//! left-to-right: the first expanded rule whose name matches a pending edit
//! receives that edit. Everything else takes the first production of its
//! rule, which for position rules is the match branch.

use crate::grammar::{EditRule, Grammar, Symbol, START};

/// One selected edit, tracked across a single generation pass.
#[derive(Debug)]
pub struct EditApplication<'a> {
    rule: &'a EditRule,
    applied: bool,
    char_used: bool,
    byte: Option<u8>,
}

impl<'a> EditApplication<'a> {
    /// An application with no replacement byte (deletions).
    pub fn new(rule: &'a EditRule) -> Self {
        Self {
            rule,
            applied: false,
            char_used: false,
            byte: None,
        }
    }

    /// An application carrying the replacement byte for an insert or
    /// substitute edit.
    pub fn with_byte(rule: &'a EditRule, byte: u8) -> Self {
        Self {
            byte: Some(byte),
            ..Self::new(rule)
        }
    }

    pub fn rule(&self) -> &'a EditRule {
        self.rule
    }

    pub fn applied(&self) -> bool {
        self.applied
    }
}

/// Expand `<start>` under the covering grammar and the given applications.
///
/// Returns the candidate bytes, or `None` when some selected edit was never
/// reached during the walk (two edits on the same position, for instance).
/// Such selections are malformed and must be discarded by the caller.
pub fn generate(cov: &Grammar, apps: &mut [EditApplication]) -> Option<Vec<u8>> {
    let mut out = Vec::new();
    expand_rule(START, cov, apps, None, &mut out);

    if apps.iter().all(EditApplication::applied) {
        Some(out)
    } else {
        None
    }
}

fn walk(
    sym: &Symbol,
    cov: &Grammar,
    apps: &mut [EditApplication],
    active: Option<usize>,
    out: &mut Vec<u8>,
) {
    match sym {
        Symbol::Literal(b) => out.push(*b),
        Symbol::Sentinel | Symbol::Delete(_) => {}
        Symbol::Wildcard | Symbol::Substitute(_) => {
            // Emits the active edit's replacement byte exactly once.
            if let Some(i) = active {
                let app = &mut apps[i];
                if let Some(b) = app.byte {
                    if !app.char_used {
                        app.char_used = true;
                        out.push(b);
                    }
                }
            }
        }
        Symbol::Nonterminal(name) => expand_rule(name, cov, apps, active, out),
    }
}

fn expand_rule(
    name: &str,
    cov: &Grammar,
    apps: &mut [EditApplication],
    active: Option<usize>,
    out: &mut Vec<u8>,
) {
    if active.is_none() {
        // First-fit activation over the pending edits.
        if let Some(i) = apps
            .iter()
            .position(|a| !a.applied && a.rule.lhs == name)
        {
            apps[i].applied = true;
            let rule = apps[i].rule;
            for sym in &rule.rhs {
                walk(sym, cov, apps, Some(i), out);
            }
            return;
        }
    }

    // Default expansion: first production (the match branch for positions).
    let Some(productions) = cov.productions(name) else {
        return;
    };
    let Some(first) = productions.first() else {
        return;
    };
    for sym in first {
        walk(sym, cov, apps, active, out);
    }
}

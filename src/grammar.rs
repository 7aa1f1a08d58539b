//! Positional grammars derived from the input string.
//!
//! The base grammar gives every input byte its own rule (`<cK> → byte`) plus
//! a sentinel rule at the tail. The covering grammar rewrites each position
//! rule into the four alternatives {match, delete, insert-before, substitute},
//! so that any set of single-character edits corresponds to a choice of
//! non-match productions.
//!
//! Rules live in a `BTreeMap`, so iteration is lexicographic over the lhs
//! name. That order decides edit numbering, and therefore which repair the
//! search finds first: `<c10>` sorts before `<c2>`, matching the ordered-map
//! behavior the search was tuned against. Do not replace this with numeric
//! position order.

use std::collections::BTreeMap;
use std::fmt;

/// The root rule name.
pub const START: &str = "<start>";

/// Rule name for the byte slot at `index`.
pub fn slot_name(index: usize) -> String {
    format!("<c{index}>")
}

/// One grammar symbol, classified at construction time.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Symbol {
    /// A literal byte, emitted verbatim.
    Literal(u8),
    /// The end-of-input terminal; emits nothing.
    Sentinel,
    /// Insertion slot: emits the selection's replacement byte when its edit
    /// is active, nothing otherwise.
    Wildcard,
    /// Deletion marker for the byte it displaces; emits nothing.
    Delete(u8),
    /// Substitution marker for the byte it displaces; emits the replacement
    /// byte when its edit is active.
    Substitute(u8),
    /// Reference to another rule.
    Nonterminal(String),
}

impl fmt::Display for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Symbol::Literal(b) => write!(f, "{}", (*b as char).escape_default()),
            Symbol::Sentinel => write!(f, "$end"),
            Symbol::Wildcard => write!(f, "$."),
            Symbol::Delete(b) => write!(f, "$del[{}]", (*b as char).escape_default()),
            Symbol::Substitute(b) => write!(f, "$sub[{}]", (*b as char).escape_default()),
            Symbol::Nonterminal(name) => write!(f, "{name}"),
        }
    }
}

/// The right-hand side of one production. Empty means ε.
pub type Production = Vec<Symbol>;

/// An ordered rule map: lhs name → alternative productions.
///
/// Production order within a rule is meaningful; the first alternative of a
/// covering-grammar position rule is always the match branch.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Grammar {
    rules: BTreeMap<String, Vec<Production>>,
}

impl Grammar {
    fn add(&mut self, lhs: impl Into<String>, rhs: Production) {
        self.rules.entry(lhs.into()).or_default().push(rhs);
    }

    /// Build the base grammar for an input string.
    ///
    /// `<start>` derives the slot rules in input order, each slot derives its
    /// literal byte, and the slot one past the end derives the sentinel.
    pub fn from_input(input: &[u8]) -> Self {
        let mut g = Grammar::default();
        let mut start_rhs = Vec::with_capacity(input.len() + 1);

        for (i, &b) in input.iter().enumerate() {
            let nt = slot_name(i);
            start_rhs.push(Symbol::Nonterminal(nt.clone()));
            g.add(nt, vec![Symbol::Literal(b)]);
        }
        let tail = slot_name(input.len());
        g.add(tail.clone(), vec![Symbol::Sentinel]);
        start_rhs.push(Symbol::Nonterminal(tail));

        g.add(START, start_rhs);
        g
    }

    /// Derive the covering grammar.
    ///
    /// Each single-literal rule `<cK> → b` becomes, in this order:
    /// match `b`, delete, insert-before, substitute. The sentinel rule
    /// becomes ε, optionally followed by a bare insertion slot when
    /// `tail_insertion` is set (allowing repairs that append at the end).
    /// Everything else (the `<start>` sequence) is copied unchanged.
    pub fn covering(&self, tail_insertion: bool) -> Self {
        let mut cg = Grammar::default();

        for (lhs, productions) in &self.rules {
            for rhs in productions {
                match rhs.as_slice() {
                    [Symbol::Literal(b)] => {
                        cg.add(lhs.clone(), vec![Symbol::Literal(*b)]);
                        cg.add(lhs.clone(), vec![Symbol::Delete(*b)]);
                        cg.add(lhs.clone(), vec![Symbol::Wildcard, Symbol::Literal(*b)]);
                        cg.add(lhs.clone(), vec![Symbol::Substitute(*b)]);
                    }
                    [Symbol::Sentinel] => {
                        cg.add(lhs.clone(), Vec::new());
                        if tail_insertion {
                            cg.add(lhs.clone(), vec![Symbol::Wildcard]);
                        }
                    }
                    _ => cg.add(lhs.clone(), rhs.clone()),
                }
            }
        }
        cg
    }

    /// All alternatives for a rule, in declaration order.
    pub fn productions(&self, lhs: &str) -> Option<&[Production]> {
        self.rules.get(lhs).map(Vec::as_slice)
    }

    /// Rules in lexicographic lhs order.
    pub fn rules(&self) -> impl Iterator<Item = (&str, &[Production])> {
        self.rules.iter().map(|(k, v)| (k.as_str(), v.as_slice()))
    }

    pub fn rule_count(&self) -> usize {
        self.rules.len()
    }

    /// Collect every edit production of this covering grammar.
    ///
    /// Iteration order (lhs lexicographic, then production order, which puts
    /// delete before insert before substitute within a position) assigns the
    /// edit indices the search enumerates over.
    pub fn edits(&self) -> Vec<EditRule> {
        let mut edits = Vec::new();
        for (lhs, productions) in &self.rules {
            for rhs in productions {
                if let Some(kind) = EditKind::classify(rhs) {
                    edits.push(EditRule {
                        lhs: lhs.clone(),
                        rhs: rhs.clone(),
                        kind,
                    });
                }
            }
        }
        edits
    }
}

impl fmt::Display for Grammar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (lhs, productions) in &self.rules {
            write!(f, "{lhs} → ")?;
            for (i, rhs) in productions.iter().enumerate() {
                if i > 0 {
                    write!(f, " | ")?;
                }
                if rhs.is_empty() {
                    write!(f, "ε")?;
                } else {
                    for (j, sym) in rhs.iter().enumerate() {
                        if j > 0 {
                            write!(f, " ")?;
                        }
                        write!(f, "{sym}")?;
                    }
                }
            }
            writeln!(f)?;
        }
        Ok(())
    }
}

/// What a non-match production does to its position.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EditKind {
    Delete,
    Insert,
    Substitute,
}

impl EditKind {
    /// Classify a covering-grammar production; `None` for match branches,
    /// ε, and structural rules.
    pub fn classify(rhs: &[Symbol]) -> Option<EditKind> {
        match rhs {
            [Symbol::Delete(_)] => Some(EditKind::Delete),
            [Symbol::Wildcard, ..] => Some(EditKind::Insert),
            [Symbol::Substitute(_)] => Some(EditKind::Substitute),
            _ => None,
        }
    }

    /// Insertions and substitutions consume one replacement byte.
    pub fn needs_char(self) -> bool {
        matches!(self, EditKind::Insert | EditKind::Substitute)
    }
}

/// One selectable edit: a non-match production of a position rule.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EditRule {
    pub lhs: String,
    pub rhs: Production,
    pub kind: EditKind,
}

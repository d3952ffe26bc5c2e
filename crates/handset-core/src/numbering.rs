//! Human-readable document numbers: `INV-240131-142501-0042`.

use chrono::{DateTime, Utc};

/// Which document a number is for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentKind {
    Sale,
    Swap,
    Return,
}

impl DocumentKind {
    pub const fn prefix(&self) -> &'static str {
        match self {
            DocumentKind::Sale => "INV",
            DocumentKind::Swap => "SWP",
            DocumentKind::Return => "RET",
        }
    }
}

/// Formats `<PREFIX>-YYMMDD-HHMMSS-NNNN`; `suffix` is reduced modulo 10000.
pub fn document_number(kind: DocumentKind, at: DateTime<Utc>, suffix: u32) -> String {
    format!(
        "{}-{}-{:04}",
        kind.prefix(),
        at.format("%y%m%d-%H%M%S"),
        suffix % 10_000
    )
}

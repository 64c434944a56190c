//! Non-fatal lowering diagnostics
//!
//! Constructs the backend does not lower yet are collected here instead
//! of halting the pass, so one run reports the complete set of gaps
//! across all declarations.

use serde::{Deserialize, Serialize};

use crate::ast::Span;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum DiagnosticKind {
    /// A language construct this backend has no lowering for
    Unimplemented { feature: String },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Diagnostic {
    pub kind: DiagnosticKind,
    /// Source file of the declaration being lowered
    pub file: String,
    pub span: Span,
}

impl Diagnostic {
    pub fn unimplemented(feature: &str, file: &str, span: Span) -> Self {
        Diagnostic {
            kind: DiagnosticKind::Unimplemented {
                feature: feature.to_string(),
            },
            file: file.to_string(),
            span,
        }
    }

    pub fn message(&self) -> String {
        match &self.kind {
            DiagnosticKind::Unimplemented { feature } => {
                format!("not implemented in this backend: {feature}")
            }
        }
    }
}

/// Ordered collection of diagnostics for one emission run
#[derive(Debug, Clone, Default)]
pub struct Diagnostics {
    entries: Vec<Diagnostic>,
}

impl Diagnostics {
    pub fn new() -> Self {
        Diagnostics::default()
    }

    pub fn push(&mut self, d: Diagnostic) {
        self.entries.push(d);
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Diagnostic> {
        self.entries.iter()
    }

    pub fn into_vec(self) -> Vec<Diagnostic> {
        self.entries
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_push_and_len() {
        let mut ds = Diagnostics::new();
        assert!(ds.is_empty());
        ds.push(Diagnostic::unimplemented("VirtualInvoke", "m.arb", Span::implicit()));
        ds.push(Diagnostic::unimplemented("LetExpression", "m.arb", Span::implicit()));
        assert_eq!(ds.len(), 2);
    }

    #[test]
    fn test_message_names_the_feature() {
        let d = Diagnostic::unimplemented("ProjectFields", "m.arb", Span::implicit());
        assert!(d.message().contains("ProjectFields"));
    }
}

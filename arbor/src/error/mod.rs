//! Error types and reporting
//!
//! These are compiler-internal faults: they indicate an upstream bug or a
//! backend gap and never reach a user of the generated program. Faults in
//! the generated program itself exist only as emitted abort/report calls.

use thiserror::Error;

use crate::diag::Diagnostic;

/// Result type alias
pub type Result<T> = std::result::Result<T, EmitError>;

/// Fatal lowering error
#[derive(Debug, Error)]
pub enum EmitError {
    /// A declaration reference has no matching instantiation record (or a
    /// mismatched one) where the structure requires it. Upstream bug in
    /// the checker or the propagation pass; never recovered locally.
    #[error("inconsistent instantiation for {decl}: {detail}")]
    InconsistentInstantiation { decl: String, detail: String },

    #[error("IO error: {message}")]
    Io { message: String },

    #[error("malformed input: {message}")]
    Input { message: String },
}

impl EmitError {
    pub fn inconsistent(decl: impl Into<String>, detail: impl Into<String>) -> Self {
        Self::InconsistentInstantiation {
            decl: decl.into(),
            detail: detail.into(),
        }
    }

    pub fn io(message: impl Into<String>) -> Self {
        Self::Io {
            message: message.into(),
        }
    }

    pub fn input(message: impl Into<String>) -> Self {
        Self::Input {
            message: message.into(),
        }
    }
}

impl From<std::io::Error> for EmitError {
    fn from(e: std::io::Error) -> Self {
        EmitError::io(e.to_string())
    }
}

impl From<serde_json::Error> for EmitError {
    fn from(e: serde_json::Error) -> Self {
        EmitError::input(e.to_string())
    }
}

/// Report a diagnostic with ariadne against its source file
pub fn report_diagnostic(filename: &str, source: &str, diag: &Diagnostic) {
    use ariadne::{Color, Label, Report, ReportKind, Source};

    let span = diag.span;
    Report::build(ReportKind::Error, (filename, span.start..span.end))
        .with_message("lowering gap")
        .with_label(
            Label::new((filename, span.start..span.end))
                .with_message(diag.message())
                .with_color(Color::Red),
        )
        .finish()
        .eprint((filename, Source::from(source)))
        .ok();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_inconsistent_display() {
        let e = EmitError::inconsistent("Main::id", "generic declaration with no binds");
        let text = format!("{e}");
        assert!(text.contains("Main::id"));
        assert!(text.contains("no binds"));
    }

    #[test]
    fn test_io_conversion() {
        let ioe = std::io::Error::new(std::io::ErrorKind::NotFound, "gone");
        let e: EmitError = ioe.into();
        assert!(matches!(e, EmitError::Io { .. }));
    }
}

//! Diagnostic records and the counting reporter sink.

use std::fmt;

use crate::kind::DiagKind;

/// Byte range of a node in its source file.
///
/// Carried from the lexer through every IR node so diagnostics can point at
/// source. `Span::DUMMY` marks nodes injected during lowering that inherit
/// no position of their own.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Span {
    pub start: u32,
    pub end: u32,
}

impl Span {
    pub const DUMMY: Span = Span { start: 0, end: 0 };

    pub fn new(start: u32, end: u32) -> Self {
        Self { start, end }
    }
}

impl fmt::Display for Span {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}..{}", self.start, self.end)
    }
}

/// A single reported diagnostic.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    pub kind: DiagKind,
    pub span: Option<Span>,
    pub message: String,
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.span {
            Some(span) => write!(f, "error[{}] at {}: {}", self.kind, span, self.message),
            None => write!(f, "error[{}]: {}", self.kind, self.message),
        }
    }
}

/// Write-only diagnostic sink shared by every pass.
///
/// Each report increments the error counter; the driver checks the count
/// between passes and skips the rest of the pipeline when it is nonzero.
#[derive(Debug, Default)]
pub struct Reporter {
    diagnostics: Vec<Diagnostic>,
    errors: usize,
}

impl Reporter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Report a diagnostic anchored at a node's source span.
    pub fn error_node(&mut self, span: Span, kind: DiagKind, message: impl Into<String>) {
        self.errors += 1;
        self.diagnostics.push(Diagnostic {
            kind,
            span: Some(span),
            message: message.into(),
        });
    }

    /// Report a diagnostic with no node to anchor to.
    pub fn error(&mut self, kind: DiagKind, message: impl Into<String>) {
        self.errors += 1;
        self.diagnostics.push(Diagnostic {
            kind,
            span: None,
            message: message.into(),
        });
    }

    /// Number of errors reported so far.
    #[inline]
    pub fn error_count(&self) -> usize {
        self.errors
    }

    /// True if no errors have been reported.
    #[inline]
    pub fn is_clean(&self) -> bool {
        self.errors == 0
    }

    /// All diagnostics in report order.
    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }

    /// Kinds in report order, mainly for tests.
    pub fn kinds(&self) -> Vec<DiagKind> {
        self.diagnostics.iter().map(|d| d.kind).collect()
    }

    /// Render the final one-line summary.
    pub fn summary(&self) -> String {
        match self.errors {
            0 => "no errors".to_string(),
            1 => "1 error reported".to_string(),
            n => format!("{} errors reported", n),
        }
    }
}

impl fmt::Display for Reporter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for diag in &self.diagnostics {
            writeln!(f, "{}", diag)?;
        }
        write!(f, "{}", self.summary())
    }
}

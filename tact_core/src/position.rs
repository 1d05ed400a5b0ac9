//! Source positions, the offset-to-line index, and accumulated diagnostics.

use serde::Serialize;
use std::cell::{Ref, RefCell};
use std::sync::Arc;

/// Half-open byte range `[start, end)` in the linearized source text.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize)]
pub struct Position {
    /// First byte of the range.
    pub start: u32,
    /// One past the last byte of the range.
    pub end: u32,
}

impl Position {
    /// Creates a position covering `[start, end)`.
    pub fn new(start: u32, end: u32) -> Self {
        Position { start, end }
    }
}

/// One registered entry of the position index: from the linear offset
/// `start` onwards, text belongs to `line` of the file at `path`, whose
/// first byte sits at linear offset `offset`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceLine {
    /// Linear offset where this entry's coverage begins.
    pub start: u32,
    /// Linear offset of the first byte of the line, to recover columns.
    pub offset: u32,
    /// One-based line number.
    pub line: u32,
    /// Path of the source file.
    pub path: Arc<str>,
}

/// Index mapping linear source offsets back to (path, line) for error
/// reporting.
///
/// Entries are registered hierarchically (document, then element, then
/// attribute), so several entries may cover the same offset. [`find`]
/// resolves to the most specific (latest-registered) covering entry,
/// [`find_first`] to the earliest-registered one.
///
/// [`find`]: PositionIndex::find
/// [`find_first`]: PositionIndex::find_first
#[derive(Debug, Clone, Default)]
pub struct PositionIndex {
    lines: Vec<SourceLine>,
}

impl PositionIndex {
    /// Registers a new entry. Registration order is preserved.
    pub fn add(&mut self, start: u32, offset: u32, line: u32, path: Arc<str>) {
        self.lines.push(SourceLine {
            start,
            offset,
            line,
            path,
        });
    }

    /// The most specific entry covering `position`.
    pub fn find(&self, position: u32) -> Option<&SourceLine> {
        self.lines.iter().rev().find(|l| l.start <= position)
    }

    /// The earliest-registered entry covering `position`.
    pub fn find_first(&self, position: u32) -> Option<&SourceLine> {
        self.lines.iter().find(|l| l.start <= position)
    }

    /// All registered entries, in registration order.
    pub fn lines(&self) -> &[SourceLine] {
        &self.lines
    }
}

/// An error or warning bound to the source position of the offending
/// construct.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Diagnostic {
    /// Position of the offending construct.
    pub position: Position,
    /// Human-readable description of the problem.
    pub message: String,
    /// Offending sub-expression text, when available.
    pub context: String,
}

/// Error and warning side channel of a document.
///
/// Diagnostics are not part of the document's logical value: they may be
/// appended on otherwise read-only passes, so interior mutability is scoped
/// to this subobject and nothing else. Appending is not synchronized;
/// concurrent readers must not record diagnostics.
#[derive(Debug, Default)]
pub struct Diagnostics {
    errors: RefCell<Vec<Diagnostic>>,
    warnings: RefCell<Vec<Diagnostic>>,
}

impl Diagnostics {
    /// Records an error. Never aborts the pass that reports it.
    pub fn error(&self, position: Position, message: impl Into<String>, context: impl Into<String>) {
        self.errors.borrow_mut().push(Diagnostic {
            position,
            message: message.into(),
            context: context.into(),
        });
    }

    /// Records a warning.
    pub fn warning(
        &self,
        position: Position,
        message: impl Into<String>,
        context: impl Into<String>,
    ) {
        self.warnings.borrow_mut().push(Diagnostic {
            position,
            message: message.into(),
            context: context.into(),
        });
    }

    /// True if any error has been recorded.
    pub fn has_errors(&self) -> bool {
        !self.errors.borrow().is_empty()
    }

    /// True if any warning has been recorded.
    pub fn has_warnings(&self) -> bool {
        !self.warnings.borrow().is_empty()
    }

    /// The recorded errors, in recording order.
    pub fn errors(&self) -> Ref<'_, [Diagnostic]> {
        Ref::map(self.errors.borrow(), Vec::as_slice)
    }

    /// The recorded warnings, in recording order.
    pub fn warnings(&self) -> Ref<'_, [Diagnostic]> {
        Ref::map(self.warnings.borrow(), Vec::as_slice)
    }

    /// Discards all recorded errors.
    pub fn clear_errors(&self) {
        self.errors.borrow_mut().clear();
    }

    /// Discards all recorded warnings.
    pub fn clear_warnings(&self) {
        self.warnings.borrow_mut().clear();
    }
}

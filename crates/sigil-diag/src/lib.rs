//! Error reporting primitives for sigil.
//!
//! This crate defines the single user-facing error type and the low-level
//! text utilities the banner renderer builds on: caret underlines, centred
//! position labels, and spelled-out argument counts.
//!
//! Banners themselves are assembled in `sigil-infer::report`, which has
//! access to solver state; this crate stays a leaf.

use std::fmt;

// ---------------------------------------------------------------------------
// Error taxonomy
// ---------------------------------------------------------------------------

/// What went wrong. Every failure surfaces as a `TypeError`; the kind
/// distinguishes the message shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Structural membership failed for a value.
    InvalidValue,
    /// A variable-bound value failed a declared type-class predicate.
    ClassConstraintViolation,
    /// No environment type is consistent with all observed uses of a variable.
    VarConstraintViolation,
    /// Too many arguments at a call site, or a wrapped callback applied to
    /// the wrong number of arguments.
    WrongArity,
    /// More than nine parameters at definition time.
    ArityRange,
    /// A type could not be constructed (for example duplicate record fields).
    MalformedType,
}

impl ErrorKind {
    /// The first line of a rendered banner.
    pub fn headline(self) -> &'static str {
        match self {
            ErrorKind::InvalidValue => "Invalid value",
            ErrorKind::ClassConstraintViolation => "Type-class constraint violation",
            ErrorKind::VarConstraintViolation => "Type-variable constraint violation",
            ErrorKind::WrongArity => "Function applied to the wrong number of arguments",
            ErrorKind::ArityRange => "Too many parameters",
            ErrorKind::MalformedType => "Malformed type",
        }
    }
}

/// The error raised by every checking failure.
///
/// The message is the complete rendered banner; `Display` prints it as-is so
/// the multi-line output is stable enough to snapshot.
#[derive(Debug, Clone, thiserror::Error)]
#[error("{message}")]
pub struct TypeError {
    pub kind: ErrorKind,
    pub message: String,
}

impl TypeError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

// ---------------------------------------------------------------------------
// Banner text utilities
// ---------------------------------------------------------------------------

/// A highlighted region of a rendered signature line, in character columns.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Mark {
    pub start: usize,
    pub end: usize,
    /// Position number shown on the label line; `None` underlines without
    /// numbering (used for constraint context).
    pub label: Option<usize>,
}

impl Mark {
    pub fn numbered(start: usize, end: usize, label: usize) -> Self {
        Self {
            start,
            end,
            label: Some(label),
        }
    }

    pub fn plain(start: usize, end: usize) -> Self {
        Self {
            start,
            end,
            label: None,
        }
    }
}

/// Build the caret line for a set of marks: `^` under every marked column,
/// spaces elsewhere. Marks must not overlap.
pub fn caret_line(marks: &[Mark]) -> String {
    let mut line = String::new();
    let mut sorted: Vec<Mark> = marks.to_vec();
    sorted.sort_by_key(|m| m.start);
    for mark in sorted {
        debug_assert!(mark.start >= line.chars().count());
        pad_to(&mut line, mark.start);
        for _ in mark.start..mark.end {
            line.push('^');
        }
    }
    line
}

/// Build the label line: each numbered mark gets its number centred over the
/// width of the marked region. Unnumbered marks contribute nothing.
pub fn label_line(marks: &[Mark]) -> String {
    let mut line = String::new();
    let mut sorted: Vec<Mark> = marks.iter().copied().filter(|m| m.label.is_some()).collect();
    sorted.sort_by_key(|m| m.start);
    for mark in sorted {
        let label = mark.label.expect("filtered to numbered marks").to_string();
        let width = mark.end - mark.start;
        let offset = mark.start + (width.saturating_sub(label.chars().count())) / 2;
        pad_to(&mut line, offset);
        line.push_str(&label);
    }
    line
}

/// Whether any mark carries a position number (the label line is omitted
/// from banners when none does).
pub fn has_labels(marks: &[Mark]) -> bool {
    marks.iter().any(|m| m.label.is_some())
}

fn pad_to(line: &mut String, column: usize) {
    let len = line.chars().count();
    for _ in len..column {
        line.push(' ');
    }
}

/// Quote a name or type the way banners do: ‘name’.
pub fn q(s: impl fmt::Display) -> String {
    format!("\u{2018}{s}\u{2019}")
}

/// Spell out an argument count: "zero arguments", "one argument", ...
/// Counts above nine fall back to digits.
pub fn count_args(n: usize) -> String {
    const WORDS: [&str; 10] = [
        "zero", "one", "two", "three", "four", "five", "six", "seven", "eight", "nine",
    ];
    let count = match WORDS.get(n) {
        Some(word) => (*word).to_string(),
        None => n.to_string(),
    };
    let noun = if n == 1 { "argument" } else { "arguments" };
    format!("{count} {noun}")
}

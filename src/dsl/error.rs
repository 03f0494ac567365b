//! Error types for the DSL compiler.

use std::fmt;

use thiserror::Error;

use crate::schema::BlockType;

/// A location in DSL source text. `line` and `col` are 1-based; `col`
/// counts characters, `offset` counts bytes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct Position {
    pub offset: usize,
    pub line: usize,
    pub col: usize,
}

impl Position {
    pub fn new(offset: usize, line: usize, col: usize) -> Self {
        Self { offset, line, col }
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.line, self.col)
    }
}

/// Where a semantic error was found: in source text, or at a schema path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Location {
    Source(Position),
    Path(String),
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Location::Source(pos) => write!(f, "{pos}"),
            Location::Path(path) => f.write_str(path),
        }
    }
}

/// An error that occurred while compiling, parsing or importing.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CompileError {
    #[error("[{position}] lex error: {message}")]
    Lex { message: String, position: Position },

    #[error("[{position}] parse error: expected {expected}, found {found}")]
    Parse {
        expected: String,
        found: String,
        position: Position,
    },

    #[error("[{position}] unknown type code '{code}'")]
    UnknownType { code: String, position: Position },

    #[error("[{location}] undeclared signal '{name}'")]
    UndeclaredSignal { name: String, location: Location },

    #[error("[{location}] layer {id} is never defined")]
    UnknownLayer { id: u32, location: Location },

    #[error("[{position}] layer {id} is defined more than once")]
    DuplicateLayer { id: u32, position: Position },

    #[error("[{path}] unsupported schema: {message}")]
    UnsupportedSchema { path: String, message: String },
}

/// Coarse classification of a [`CompileError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    Lex,
    Parse,
    UnknownType,
    UndeclaredSignal,
    UnknownLayer,
    DuplicateLayer,
    UnsupportedSchema,
}

impl ErrorKind {
    /// Grammar violations: the text could not be read at all.
    pub fn is_syntax(self) -> bool {
        matches!(self, ErrorKind::Lex | ErrorKind::Parse)
    }

    /// Well-formed input that refers to things that do not exist or cannot
    /// be expressed.
    pub fn is_semantic(self) -> bool {
        !self.is_syntax()
    }
}

impl CompileError {
    pub fn lex(message: impl Into<String>, position: Position) -> Self {
        CompileError::Lex {
            message: message.into(),
            position,
        }
    }

    pub fn parse(expected: impl Into<String>, found: impl Into<String>, position: Position) -> Self {
        CompileError::Parse {
            expected: expected.into(),
            found: found.into(),
            position,
        }
    }

    pub fn unsupported(path: impl Into<String>, message: impl Into<String>) -> Self {
        CompileError::UnsupportedSchema {
            path: path.into(),
            message: message.into(),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            CompileError::Lex { .. } => ErrorKind::Lex,
            CompileError::Parse { .. } => ErrorKind::Parse,
            CompileError::UnknownType { .. } => ErrorKind::UnknownType,
            CompileError::UndeclaredSignal { .. } => ErrorKind::UndeclaredSignal,
            CompileError::UnknownLayer { .. } => ErrorKind::UnknownLayer,
            CompileError::DuplicateLayer { .. } => ErrorKind::DuplicateLayer,
            CompileError::UnsupportedSchema { .. } => ErrorKind::UnsupportedSchema,
        }
    }

    /// Source position, when the error came from DSL text.
    pub fn position(&self) -> Option<Position> {
        match self {
            CompileError::Lex { position, .. }
            | CompileError::Parse { position, .. }
            | CompileError::UnknownType { position, .. }
            | CompileError::DuplicateLayer { position, .. } => Some(*position),
            CompileError::UndeclaredSignal { location, .. }
            | CompileError::UnknownLayer { location, .. } => match location {
                Location::Source(pos) => Some(*pos),
                Location::Path(_) => None,
            },
            CompileError::UnsupportedSchema { .. } => None,
        }
    }

    fn help(&self) -> Option<String> {
        match self {
            CompileError::UnknownType { code, .. } => {
                let close = suggest_codes(code);
                if close.is_empty() {
                    let known: Vec<&str> = BlockType::KNOWN.iter().filter_map(BlockType::code).collect();
                    Some(format!("known codes: {}", known.join(" ")))
                } else {
                    Some(format!("did you mean {}?", close.join(", ")))
                }
            }
            CompileError::UndeclaredSignal { name, .. } => {
                Some(format!("declare it with '@{name}' at the start of the program"))
            }
            CompileError::UnknownLayer { id, .. } => {
                Some(format!("add a layer line such as '/{id} Md [...]'"))
            }
            CompileError::DuplicateLayer { .. } => Some("each layer id may be defined once".into()),
            _ => None,
        }
    }

    /// Render the error with the offending source line and a caret.
    ///
    /// ```text
    /// [1:4] unknown type code 'Zz'
    ///   |
    /// 1 | Cn Zz :a
    ///   |    ^
    ///   = help: known codes: ...
    /// ```
    pub fn render(&self, source: &str) -> String {
        let mut out = self.to_string();
        if let Some(pos) = self.position() {
            if let Some(line) = source.lines().nth(pos.line.saturating_sub(1)) {
                let gutter = pos.line.to_string();
                let pad = " ".repeat(gutter.len());
                let caret = " ".repeat(pos.col.saturating_sub(1));
                out.push_str(&format!("\n{pad} |\n{gutter} | {line}\n{pad} | {caret}^"));
            }
        }
        if let Some(help) = self.help() {
            out.push_str(&format!("\n  = help: {help}"));
        }
        out
    }
}

/// Known type codes close to `code`, closest first, at most three.
///
/// Close means within two edits, and fewer edits than the code has
/// letters, so a two-letter code must keep one of its letters.
pub fn suggest_codes(code: &str) -> Vec<&'static str> {
    let mut chars = code.chars();
    let normalized: String = match chars.next() {
        Some(first) => first.to_uppercase().chain(chars.flat_map(char::to_lowercase)).collect(),
        None => return Vec::new(),
    };
    let limit = 2.min(normalized.chars().count().saturating_sub(1));

    let mut close: Vec<(usize, &'static str)> = BlockType::KNOWN
        .iter()
        .filter_map(BlockType::code)
        .map(|known| (edit_distance(&normalized, known), known))
        .filter(|(distance, _)| *distance <= limit)
        .collect();
    close.sort_by_key(|(distance, _)| *distance);
    close.into_iter().take(3).map(|(_, known)| known).collect()
}

/// Levenshtein distance over characters.
fn edit_distance(a: &str, b: &str) -> usize {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    let mut prev: Vec<usize> = (0..=b.len()).collect();
    let mut row = vec![0; b.len() + 1];
    for (i, ca) in a.iter().enumerate() {
        row[0] = i + 1;
        for (j, cb) in b.iter().enumerate() {
            let cost = usize::from(ca != cb);
            row[j + 1] = (prev[j + 1] + 1).min(row[j] + 1).min(prev[j] + cost);
        }
        std::mem::swap(&mut prev, &mut row);
    }
    prev[b.len()]
}

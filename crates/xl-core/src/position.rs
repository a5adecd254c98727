//! Global source positions.
//!
//! Every scanned file claims a contiguous range of a single offset space, so
//! a node position is one `u32` regardless of which file it came from.
//! Resolution back to file, line and column happens only when a message is
//! displayed.

use crate::tree::{NOWHERE, Position};

struct FileRange {
    start: u32,
    name: String,
    /// Byte offset of each line start, for line/column resolution.
    line_starts: Vec<u32>,
    source: String,
}

/// Resolved location of a [`Position`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SourceLocation<'a> {
    pub file: &'a str,
    /// 1-based.
    pub line: u32,
    /// 1-based, in bytes from the line start.
    pub column: u32,
    pub source_line: &'a str,
}

impl std::fmt::Display for SourceLocation<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}:{}", self.file, self.line, self.column)
    }
}

/// Table mapping opaque positions back to source locations.
#[derive(Default)]
pub struct Positions {
    files: Vec<FileRange>,
    current: u32,
}

impl Positions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a file's source text; returns the base offset its positions
    /// start at.
    pub fn open_file(&mut self, name: impl Into<String>, source: impl Into<String>) -> u32 {
        let source = source.into();
        let start = self.current;
        let mut line_starts = vec![0];
        for (offset, byte) in source.bytes().enumerate() {
            if byte == b'\n' {
                line_starts.push(offset as u32 + 1);
            }
        }
        self.current = start.saturating_add(source.len() as u32).saturating_add(1);
        self.files.push(FileRange {
            start,
            name: name.into(),
            line_starts,
            source,
        });
        start
    }

    /// Resolve a position to its file, line and column.
    pub fn resolve(&self, pos: Position) -> Option<SourceLocation<'_>> {
        if pos == NOWHERE {
            return None;
        }
        let file = self
            .files
            .iter()
            .rev()
            .find(|f| pos >= f.start && (pos - f.start) as usize <= f.source.len())?;
        let offset = pos - file.start;
        let line_index = match file.line_starts.binary_search(&offset) {
            Ok(exact) => exact,
            Err(insertion) => insertion - 1,
        };
        let line_start = file.line_starts[line_index];
        let line_end = file
            .line_starts
            .get(line_index + 1)
            .map(|next| next.saturating_sub(1) as usize)
            .unwrap_or(file.source.len());
        Some(SourceLocation {
            file: &file.name,
            line: line_index as u32 + 1,
            column: offset - line_start + 1,
            source_line: &file.source[line_start as usize..line_end],
        })
    }

    /// The source text registered for the file containing `pos`.
    pub fn source_of(&self, pos: Position) -> Option<(&str, &str)> {
        if pos == NOWHERE {
            return None;
        }
        self.files
            .iter()
            .rev()
            .find(|f| pos >= f.start && (pos - f.start) as usize <= f.source.len())
            .map(|f| (f.name.as_str(), f.source.as_str()))
    }
}

//! Source location tracking

/// Index of a source file inside a [`Forest`](crate::frontend::ast::Forest)
pub type FileId = usize;

/// A span represents a range in the source code
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Span {
    /// Start byte offset
    pub start: usize,
    /// End byte offset (exclusive)
    pub end: usize,
    /// File ID
    pub file_id: FileId,
    /// 1-based line of `start`
    pub line: u32,
    /// 1-based column of `start`
    pub column: u32,
}

impl Span {
    /// Create a new span
    pub fn new(start: usize, end: usize, file_id: FileId, line: u32, column: u32) -> Self {
        Self { start, end, file_id, line, column }
    }

    /// Create a dummy span (for testing)
    pub fn dummy() -> Self {
        Self { start: 0, end: 0, file_id: 0, line: 1, column: 1 }
    }

    /// Merge two spans, keeping the position of whichever starts first
    pub fn merge(&self, other: &Span) -> Span {
        let first = if other.start < self.start { other } else { self };
        Span {
            start: self.start.min(other.start),
            end: self.end.max(other.end),
            file_id: self.file_id,
            line: first.line,
            column: first.column,
        }
    }

    /// Get the length of the span
    pub fn len(&self) -> usize {
        self.end - self.start
    }

    /// Check if the span is empty
    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }
}

impl Default for Span {
    fn default() -> Self {
        Self::dummy()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn merge_keeps_earliest_position() {
        let a = Span::new(10, 14, 0, 2, 3);
        let b = Span::new(2, 5, 0, 1, 3);
        let merged = a.merge(&b);
        assert_eq!((merged.start, merged.end), (2, 14));
        assert_eq!((merged.line, merged.column), (1, 3));
        assert_eq!(merged.len(), 12);
    }
}

use std::fmt;

/// Tracks where a token sits, both in the token stream and in the source text.
/// Lines and columns are zero-based; `Display` renders them one-based.
#[derive(Debug, PartialEq, Eq, PartialOrd, Ord, Clone, Copy, Default)]
pub struct Position {
    pub index: usize,
    pub line_no: usize,
    pub column_no: usize,
}

impl Position {
    pub fn new(index: usize, line_no: usize, column_no: usize) -> Self {
        Position {
            index,
            line_no,
            column_no,
        }
    }

    /// Position one token past this one, `width` columns further along the line.
    pub fn next_after(&self, width: usize) -> Self {
        Position {
            index: self.index + 1,
            line_no: self.line_no,
            column_no: self.column_no + width,
        }
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "Token {} [{}:{}]",
            self.index + 1,
            self.line_no + 1,
            self.column_no + 1
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ::more_asserts::*;

    #[test]
    fn test_ordering() {
        let first = Position::new(0, 0, 0);
        let second = first.next_after(3);
        assert_lt!(first, second);
        assert_eq!(second, Position::new(1, 0, 3));
    }

    #[test]
    fn test_display_is_one_based() {
        assert_eq!(Position::new(4, 2, 7).to_string(), "Token 5 [3:8]");
    }
}

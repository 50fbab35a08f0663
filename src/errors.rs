use crate::frontend::Position;

use std::fmt;
use thiserror::Error;

#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum ErrorKind {
    InvalidSyntax,
    Type,
    Runtime,
    IndexOutOfBounds,
    Internal,
    Unknown,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let name = match self {
            ErrorKind::InvalidSyntax => "Invalid Syntax",
            ErrorKind::Type => "Type",
            ErrorKind::Runtime => "Runtime",
            ErrorKind::IndexOutOfBounds => "Index Out Of Bounds",
            ErrorKind::Internal => "Internal",
            ErrorKind::Unknown => "Unknown",
        };
        write!(f, "{}", name)
    }
}

/// One entry of the call-context chain captured when an error is raised.
#[derive(Debug, PartialEq, Eq, Clone)]
pub struct TraceFrame {
    pub display_name: String,
    pub file_name: String,
}

impl fmt::Display for TraceFrame {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "in {} ({})", self.display_name, self.file_name)
    }
}

/// Error produced by any stage of the pipeline. The first one raised wins.
#[derive(Debug, PartialEq, Clone, Error)]
#[error("{kind} Error: {message}")]
pub struct LangError {
    pub kind: ErrorKind,
    pub message: String,
    pub position: Option<Position>,
    pub trace: Vec<TraceFrame>,
}

pub type LangResult<T> = Result<T, LangError>;

impl LangError {
    pub fn new<S: Into<String>>(kind: ErrorKind, message: S, position: Position) -> Self {
        LangError {
            kind,
            message: message.into(),
            position: Some(position),
            trace: vec![],
        }
    }

    pub fn unpositioned<S: Into<String>>(kind: ErrorKind, message: S) -> Self {
        LangError {
            kind,
            message: message.into(),
            position: None,
            trace: vec![],
        }
    }

    pub fn syntax<S: Into<String>>(message: S, position: Position) -> Self {
        Self::new(ErrorKind::InvalidSyntax, message, position)
    }

    pub fn runtime<S: Into<String>>(message: S, position: Position) -> Self {
        Self::new(ErrorKind::Runtime, message, position)
    }

    pub fn type_error<S: Into<String>>(message: S, position: Position) -> Self {
        Self::new(ErrorKind::Type, message, position)
    }

    pub fn out_of_bounds<S: Into<String>>(message: S, position: Position) -> Self {
        Self::new(ErrorKind::IndexOutOfBounds, message, position)
    }

    pub fn internal<S: Into<String>>(message: S, position: Position) -> Self {
        Self::new(ErrorKind::Internal, message, position)
    }

    /// Attaches a trace unless one was already captured closer to the error site.
    pub fn with_trace(mut self, trace: Vec<TraceFrame>) -> Self {
        if self.trace.is_empty() {
            self.trace = trace;
        }
        self
    }

    /// Positions an error raised by code that had no token at hand.
    pub fn or_at(mut self, position: Position) -> Self {
        self.position.get_or_insert(position);
        self
    }

    /// Full report: the one-line message, the position and the context chain leaf to root.
    pub fn render(&self) -> String {
        let mut out = self.to_string();
        match &self.position {
            Some(position) => out.push_str(&format!("\n    at {}", position)),
            None => out.push_str("\n    at <unknown>"),
        }
        for frame in self.trace.iter() {
            out.push_str(&format!("\n\t{}", frame));
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render() {
        let error = LangError::runtime("Can't divide by 0", Position::new(6, 0, 12)).with_trace(vec![
            TraceFrame {
                display_name: "<fn divide>".to_owned(),
                file_name: "main.basp".to_owned(),
            },
            TraceFrame {
                display_name: "<Global>".to_owned(),
                file_name: "main.basp".to_owned(),
            },
        ]);

        assert_eq!(error.to_string(), "Runtime Error: Can't divide by 0");
        assert_eq!(
            error.render(),
            "Runtime Error: Can't divide by 0\n    at Token 7 [1:13]\n\tin <fn divide> (main.basp)\n\tin <Global> (main.basp)"
        );
    }

    #[test]
    fn test_innermost_trace_wins() {
        let inner = vec![TraceFrame {
            display_name: "<fn f>".to_owned(),
            file_name: "a.basp".to_owned(),
        }];
        let error = LangError::unpositioned(ErrorKind::Type, "bad")
            .with_trace(inner.clone())
            .with_trace(vec![]);
        assert_eq!(error.trace, inner);
        assert!(error.render().contains("at <unknown>"));
    }

    #[test]
    fn test_kind_names() {
        assert_eq!(ErrorKind::InvalidSyntax.to_string(), "Invalid Syntax");
        assert_eq!(ErrorKind::IndexOutOfBounds.to_string(), "Index Out Of Bounds");
    }
}

use std::fmt;
use std::path::{Path, PathBuf};

use serde::Serialize;
use thiserror::Error;

use crate::ast::SourceSpan;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ErrorKind {
    Syntax,
    Semantic,
    Runtime,
}

impl ErrorKind {
    pub fn label(self) -> &'static str {
        match self {
            ErrorKind::Syntax => "erro de sintaxe",
            ErrorKind::Semantic => "erro semântico",
            ErrorKind::Runtime => "erro de execução",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// The single error type handed to the driver. Analysis is fail-fast, so a
/// compilation run produces at most one of these.
#[derive(Debug, Clone, Error, Serialize)]
#[error("{}:{line}: {kind}: {message}", .path.display())]
pub struct CompileError {
    pub kind: ErrorKind,
    pub path: PathBuf,
    pub line: usize,
    pub column: usize,
    pub message: String,
}

impl CompileError {
    pub fn new<S: Into<String>>(kind: ErrorKind, path: &Path, span: SourceSpan, message: S) -> Self {
        Self {
            kind,
            path: path.to_path_buf(),
            line: span.line,
            column: span.column,
            message: message.into(),
        }
    }

    pub fn syntax<S: Into<String>>(path: &Path, line: usize, column: usize, message: S) -> Self {
        Self::new(
            ErrorKind::Syntax,
            path,
            SourceSpan::single_point(line, column),
            message,
        )
    }

    pub fn semantic<S: Into<String>>(path: &Path, span: SourceSpan, message: S) -> Self {
        Self::new(ErrorKind::Semantic, path, span, message)
    }

    /// Renders the error followed by the offending source line and a caret.
    pub fn render(&self, source_line: Option<&str>) -> String {
        let mut out = format!("{}: {}\n", self.kind, self.message);
        out.push_str(&format!("     --> {}:{}:{}\n", self.path.display(), self.line, self.column));
        if let Some(raw_line) = source_line {
            let display_line = raw_line.replace('\t', "    ");
            out.push_str(&format!("      {}\n", display_line));

            let mut caret_line = String::from("      ");
            for (index, ch) in raw_line.chars().enumerate() {
                if index + 1 >= self.column {
                    break;
                }
                match ch {
                    '\t' => caret_line.push_str("    "),
                    _ => caret_line.push(' '),
                }
            }
            caret_line.push('^');
            out.push_str(&caret_line);
            out.push('\n');
        }
        out
    }
}

pub type CompileResult<T> = Result<T, CompileError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn render_points_at_column() {
        let error = CompileError::semantic(
            Path::new("main.lume"),
            SourceSpan::single_point(3, 5),
            "identificador 'x' não declarado",
        );
        let rendered = error.render(Some("var x = y"));
        assert!(rendered.contains("main.lume:3:5"));
        assert!(rendered.contains("var x = y"));
        assert!(rendered.ends_with("          ^\n"), "{rendered}");
    }

    #[test]
    fn display_carries_path_and_line() {
        let error = CompileError::syntax(Path::new("a.lume"), 7, 1, "token inesperado");
        assert_eq!(error.to_string(), "a.lume:7: erro de sintaxe: token inesperado");
    }
}

//! Materialized stack frames, the public view of a captured stack.

use std::fmt;
use std::sync::Arc;

/// One frame of a public stack trace.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct StackFrame {
    /// Declaring class or module path.
    pub class_name: Arc<str>,
    /// Method or function name.
    pub method_name: Arc<str>,
    /// Source file, when known.
    pub file: Option<Arc<str>>,
    /// Source line, when known.
    pub line: Option<u32>,
}

impl StackFrame {
    /// Creates a frame without source information.
    #[must_use]
    pub fn new(class_name: &str, method_name: &str) -> Self {
        StackFrame {
            class_name: class_name.into(),
            method_name: method_name.into(),
            file: None,
            line: None,
        }
    }

    /// Attaches a source location.
    #[must_use]
    pub fn at(mut self, file: &str, line: u32) -> Self {
        self.file = Some(file.into());
        self.line = Some(line);
        self
    }
}

impl fmt::Display for StackFrame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}::{}", self.class_name, self.method_name)?;
        match (&self.file, self.line) {
            (Some(file), Some(line)) => write!(f, " at {file}:{line}"),
            (Some(file), None) => write!(f, " at {file}"),
            _ => Ok(()),
        }
    }
}

use std::error::Error as StdError;
use std::fmt;
use std::path::PathBuf;

use tracing_error::{SpanTrace, SpanTraceStatus};

/* 📖 # Why a custom error type and not use anyhow/eyre/thiserror etc?

- Better control over error handling
- No dependencies to compile and integrate
- More transparency into error handling logic

The portal distinguishes exactly one recoverable failure (missing content, see
`is_not_found`), everything else is propagated to the HTTP layer as a 500.
 */

/// Error variants that can occur in docportal operations.
#[derive(Debug)]
pub enum ErrorKind {
    /// File system operation failed
    FileError {
        path: PathBuf,
        source: std::io::Error,
    },

    /// A requested resource (document, page, asset) does not exist
    NotFound { what: String },

    /// Multiple errors occurred during batch operations
    Multiple {
        errors: Vec<PortalError>,
        count: usize,
    },

    /// Catch-all for other errors with a message
    Message { message: String },
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ErrorKind::FileError { path, source } => {
                write!(f, "File error at {}: {}", path.display(), source)
            }
            ErrorKind::NotFound { what } => write!(f, "Not found: {}", what),
            ErrorKind::Multiple { errors, count } => match errors.first() {
                Some(first) => write!(f, "Multiple errors occurred ({} total): {}", count, first),
                None => write!(f, "Multiple errors occurred ({} total)", count),
            },
            ErrorKind::Message { message } => write!(f, "{}", message),
        }
    }
}

/* 📖 # Why separate ErrorKind and PortalError?
ErrorKind holds the structural variant (file path, missing resource name),
PortalError wraps it with a context stack, an optional cause and the span trace
captured at construction. Callers can match on `kind()` while propagation sites
attach context cheaply.
*/

/// Error type wrapping an [`ErrorKind`] with context, cause and span trace.
pub struct PortalError {
    kind: ErrorKind,
    context: Vec<String>,
    cause: Option<Box<PortalError>>,
    span_trace: SpanTrace,
}

impl PortalError {
    /// Creates a new error from an ErrorKind, capturing the current span trace.
    pub fn new(kind: ErrorKind) -> Self {
        Self {
            kind,
            context: vec![],
            cause: None,
            span_trace: SpanTrace::capture(),
        }
    }

    /// Creates a message error.
    pub fn message(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Message {
            message: message.into(),
        })
    }

    /// Creates a not-found error for the named resource.
    pub fn not_found(what: impl Into<String>) -> Self {
        Self::new(ErrorKind::NotFound { what: what.into() })
    }

    /// Creates a file error for the given path.
    pub fn file(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::new(ErrorKind::FileError {
            path: path.into(),
            source,
        })
    }

    /// Attaches context to an error.
    pub fn context(mut self, context: impl Into<String>) -> Self {
        self.context.push(context.into());
        self
    }

    /// Attaches context using lazy evaluation.
    pub fn with_context<F>(mut self, f: F) -> Self
    where
        F: FnOnce() -> String,
    {
        self.context.push(f());
        self
    }

    /// Records the error that caused this one.
    pub fn caused_by(mut self, cause: PortalError) -> Self {
        self.cause = Some(Box::new(cause));
        self
    }

    /// Returns a reference to the underlying ErrorKind.
    pub fn kind(&self) -> &ErrorKind {
        &self.kind
    }

    /// Returns the attached context, oldest first.
    pub fn get_context(&self) -> &[String] {
        &self.context
    }

    /// Returns the span trace captured when the error was created.
    pub fn span_trace(&self) -> &SpanTrace {
        &self.span_trace
    }

    /// Returns true if this error (or its cause) denotes missing content.
    ///
    /// Both explicit `NotFound` errors and file errors with an
    /// `io::ErrorKind::NotFound` source qualify.
    pub fn is_not_found(&self) -> bool {
        let own = match &self.kind {
            ErrorKind::NotFound { .. } => true,
            ErrorKind::FileError { source, .. } => source.kind() == std::io::ErrorKind::NotFound,
            _ => false,
        };
        own || self.cause.as_ref().is_some_and(|cause| cause.is_not_found())
    }

    /// Returns the innermost error in the chain.
    pub fn root_cause(&self) -> &(dyn StdError + 'static) {
        let mut current: &(dyn StdError + 'static) = self;
        while let Some(next) = current.source() {
            current = next;
        }
        current
    }

    fn fmt_tree(&self, f: &mut fmt::Formatter<'_>, indent: &str) -> fmt::Result {
        writeln!(f, "{}", self.kind)?;
        let total = self.context.len() + usize::from(self.cause.is_some());
        for (i, ctx) in self.context.iter().enumerate() {
            let branch = if i + 1 == total { "└─" } else { "├─" };
            writeln!(f, "{}{} {}", indent, branch, ctx)?;
        }
        if let Some(cause) = &self.cause {
            write!(f, "{}└─ cause: ", indent)?;
            cause.fmt_tree(f, &format!("{}   ", indent))?;
        }
        Ok(())
    }
}

impl From<ErrorKind> for PortalError {
    fn from(kind: ErrorKind) -> Self {
        Self::new(kind)
    }
}

impl StdError for PortalError {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        if let Some(cause) = &self.cause {
            return Some(cause.as_ref());
        }
        match &self.kind {
            ErrorKind::FileError { source, .. } => Some(source),
            ErrorKind::Multiple { errors, .. } => errors.first().and_then(|e| e.source()),
            ErrorKind::NotFound { .. } | ErrorKind::Message { .. } => None,
        }
    }
}

impl fmt::Display for PortalError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for ctx in &self.context {
            write!(f, "{}: ", ctx)?;
        }
        write!(f, "{}", self.kind)
    }
}

/* 📖 # Why a tree-shaped Debug output?
Errors end up in logs and on stderr of the CLI. Printing the message, each
context frame and the cause chain as a tree keeps deep propagation readable,
and the span trace shows which instrumented operation was running.
*/
impl fmt::Debug for PortalError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.fmt_tree(f, "")?;
        if self.span_trace.status() == SpanTraceStatus::CAPTURED {
            writeln!(f, "Trace: {}", self.span_trace)?;
        }
        Ok(())
    }
}

/// Standard result type for docportal operations.
///
/// The error is boxed to keep the `Ok` path small.
pub type PortalResult<T> = std::result::Result<T, Box<PortalError>>;

/// Extension trait for attaching context to Results.
pub trait ResultExt<T> {
    /// Attaches context to an error, consuming and re-wrapping it.
    fn context(self, context: impl Into<String>) -> PortalResult<T>;

    /// Attaches context using lazy evaluation.
    fn with_context<F>(self, f: F) -> PortalResult<T>
    where
        F: FnOnce() -> String;
}

impl<T> ResultExt<T> for PortalResult<T> {
    fn context(self, context: impl Into<String>) -> PortalResult<T> {
        self.map_err(|err| Box::new(err.context(context)))
    }

    fn with_context<F>(self, f: F) -> PortalResult<T>
    where
        F: FnOnce() -> String,
    {
        self.map_err(|err| Box::new(err.with_context(f)))
    }
}

/// Creates a boxed message error from a format string.
#[macro_export]
macro_rules! err {
    ($($arg:tt)*) => {
        Box::new($crate::PortalError::message(format!($($arg)*)))
    };
}

/// Returns early with a boxed message error.
#[macro_export]
macro_rules! bail {
    ($($arg:tt)*) => {
        return Err($crate::err!($($arg)*))
    };
}

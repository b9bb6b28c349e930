//! Portable error model.
//!
//! Every backend reports failures in its own vocabulary; the rest of the
//! crate only ever sees an [`ErrorKind`] plus the native code/message that
//! produced it, bundled with the query that was running at the time.

use std::fmt;

use thiserror::Error;

use crate::value::SqlValue;

/// Portable error taxonomy shared by every backend.
///
/// The display strings match the classic wording users grep their logs for,
/// so they are kept stable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Error)]
#[non_exhaustive]
pub enum ErrorKind {
    #[error("unknown error")]
    Unknown,

    #[error("syntax error")]
    Syntax,

    #[error("constraint violation")]
    Constraint,

    #[error("null value violates not-null constraint")]
    ConstraintNotNull,

    #[error("not found")]
    NotFound,

    #[error("already exists")]
    AlreadyExists,

    #[error("not supported")]
    Unsupported,

    #[error("mismatch")]
    Mismatch,

    #[error("invalid")]
    Invalid,

    #[error("DB backend not capable")]
    NotCapable,

    #[error("truncated")]
    Truncated,

    #[error("invalid number")]
    InvalidNumber,

    #[error("invalid date or time")]
    InvalidDate,

    #[error("division by zero")]
    DivisionByZero,

    #[error("no database selected")]
    NoDatabaseSelected,

    #[error("can not create")]
    CannotCreate,

    #[error("can not drop")]
    CannotDrop,

    #[error("no such table")]
    NoSuchTable,

    #[error("no such field")]
    NoSuchField,

    #[error("insufficient data supplied")]
    NeedMoreData,

    #[error("not locked")]
    NotLocked,

    #[error("value count on row")]
    ValueCountOnRow,

    #[error("invalid DSN")]
    InvalidDsn,

    #[error("connect failed")]
    ConnectFailed,

    #[error("extension not found")]
    ExtensionNotFound,

    #[error("insufficient permissions")]
    AccessViolation,

    #[error("no such database")]
    NoSuchDatabase,
}

/// A portable database error.
///
/// Immutable once constructed.  Carries enough context to diagnose the
/// failure without access to the connection: the portable kind, the native
/// code and message as reported by the engine, and the last query text and
/// bound parameters.
#[derive(Debug, Clone, PartialEq)]
pub struct DbError {
    pub kind: ErrorKind,
    pub native_code: Option<i64>,
    pub native_message: Option<String>,
    pub last_query: Option<String>,
    pub last_parameters: Vec<SqlValue>,
}

impl DbError {
    /// Create a bare error with no native or query context.
    pub fn new(kind: ErrorKind) -> Self {
        Self {
            kind,
            native_code: None,
            native_message: None,
            last_query: None,
            last_parameters: Vec::new(),
        }
    }

    /// Attach the native error code reported by the backend.
    pub fn with_native_code(mut self, code: i64) -> Self {
        self.native_code = Some(code);
        self
    }

    /// Attach the native error message reported by the backend.
    pub fn with_native_message(mut self, message: impl Into<String>) -> Self {
        self.native_message = Some(message.into());
        self
    }

    /// Attach the query that was being executed.
    pub fn with_query(mut self, query: impl Into<String>) -> Self {
        self.last_query = Some(query.into());
        self
    }

    /// Attach the parameters bound to the failing execution.
    pub fn with_parameters(mut self, params: Vec<SqlValue>) -> Self {
        self.last_parameters = params;
        self
    }
}

impl fmt::Display for DbError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "DB error: {}", self.kind)?;
        if let Some(query) = &self.last_query {
            write!(f, " [query: {query}]")?;
        }
        match (&self.native_code, &self.native_message) {
            (Some(code), Some(msg)) => write!(f, " [nativecode={code} {}]", msg.trim()),
            (Some(code), None) => write!(f, " [nativecode={code}]"),
            (None, Some(msg)) => write!(f, " [nativemsg={}]", msg.trim()),
            (None, None) => Ok(()),
        }
    }
}

impl std::error::Error for DbError {}

impl From<ErrorKind> for DbError {
    fn from(kind: ErrorKind) -> Self {
        DbError::new(kind)
    }
}

/// Result type alias for all fallible operations in this crate.
pub type DbResult<T> = Result<T, DbError>;

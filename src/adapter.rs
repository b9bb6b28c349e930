//! The seam between the portable engine and a native client library.
//!
//! Everything engine-specific that is not expressible as static dialect
//! data goes through [`NativeAdapter`].  Adapters stay dumb: they run SQL
//! text, hand back rows as text, and report failures in their native
//! vocabulary.  Classification, normalization, and emulation all happen
//! above this trait.

use crate::backend::Backend;
use crate::dsn::ConnectInfo;
use crate::introspect::RawColumnMeta;

/// An error as reported by the native client, before classification.
#[derive(Debug, Clone, PartialEq)]
pub struct NativeError {
    pub code: Option<i64>,
    pub message: String,
}

impl NativeError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            code: None,
            message: message.into(),
        }
    }

    pub fn with_code(mut self, code: i64) -> Self {
        self.code = Some(code);
        self
    }
}

/// A native result set: an adapter-scoped id plus the column names in
/// result order.
#[derive(Debug, Clone, PartialEq)]
pub struct RawResult {
    pub id: u64,
    pub columns: Vec<String>,
}

/// Outcome of running one statement natively.
#[derive(Debug, Clone, PartialEq)]
pub enum RawOutcome {
    /// The statement produced a result set.
    Rows(RawResult),
    /// The statement ran to completion without producing rows.
    Done,
}

/// What to describe in a table-info call.
#[derive(Debug, Clone, PartialEq)]
pub enum MetaSource {
    /// A named table.
    Table(String),
    /// An open native result set.
    Result(u64),
}

/// Low-level driver interface implemented once per native client library.
///
/// All row data travels as `Option<String>`; typed decoding is the
/// caller's business.  Methods returning [`NativeError`] must not panic on
/// engine failures.
pub trait NativeAdapter: Sized {
    /// Open a native connection.
    fn connect(info: &ConnectInfo) -> Result<Self, NativeError>;

    /// Which engine this adapter drives.
    fn backend(&self) -> Backend;

    /// Run one SQL statement.
    fn raw_execute(&mut self, sql: &str) -> Result<RawOutcome, NativeError>;

    /// Fetch one row from an open result set.
    ///
    /// `rownum` requests an absolute row for engines with seekable
    /// results; sequential engines may ignore it.  `Ok(None)` is
    /// end-of-data.
    fn raw_fetch(
        &mut self,
        id: u64,
        rownum: Option<usize>,
    ) -> Result<Option<Vec<Option<String>>>, NativeError>;

    /// Release a native result set.  Freeing an unknown id is a no-op.
    fn raw_free(&mut self, id: u64);

    /// Native row count for an open result set, where the engine tracks
    /// one.
    fn raw_num_rows(&mut self, id: u64) -> Option<usize>;

    /// Rows affected by the last manipulation statement.
    fn raw_affected_rows(&mut self) -> u64;

    /// Engine-assigned id of the last inserted row, where the engine has
    /// the concept.
    fn raw_last_insert_id(&mut self) -> Option<i64>;

    /// Connection-aware string escaping, when the native client offers one
    /// better than the dialect's static rule.
    fn raw_escape(&mut self, _s: &str) -> Option<String> {
        None
    }

    /// Describe the columns of a table or open result set.
    fn raw_table_meta(&mut self, source: &MetaSource) -> Result<Vec<RawColumnMeta>, NativeError>;

    /// Close the native connection.
    fn disconnect(&mut self);
}

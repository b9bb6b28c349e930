//! Result cursors.
//!
//! A [`ResultCursor`] borrows its connection for its whole life, so a
//! result can never outlive the connection that produced it, and all
//! portability normalization funnels through one place on the way out.

use crate::adapter::NativeAdapter;
use crate::backend::{LimitStrategy, NumRowsStrategy};
use crate::engine::Connection;
use crate::error::{DbResult, ErrorKind};
use crate::portability::{self, Portability};

/// How fetched rows are shaped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FetchMode {
    /// Values in result order; rows carry no column names.
    #[default]
    Ordered,
    /// Rows carry normalized column names alongside the values.
    Assoc,
}

/// One fetched row.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Row {
    /// Column names, present in [`FetchMode::Assoc`] only.
    pub columns: Vec<String>,
    pub values: Vec<Option<String>>,
}

impl Row {
    /// Value of the named column, if the row carries names.
    pub fn get(&self, name: &str) -> Option<&Option<String>> {
        self.columns
            .iter()
            .position(|c| c == name)
            .map(|i| &self.values[i])
    }
}

/// Requested row window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LimitWindow {
    pub from: usize,
    pub count: usize,
}

/// An open result set.
///
/// Rows come out normalized per the connection's portability flags.  The
/// native result is released on [`free`](Self::free), on drop, or at
/// end-of-data when the `autofree` option is on.
#[derive(Debug)]
pub struct ResultCursor<'a, A: NativeAdapter> {
    conn: &'a mut Connection<A>,
    id: u64,
    columns: Vec<String>,
    /// The query as issued by the caller, before any limit rewrite.
    query: String,
    limit: Option<LimitWindow>,
    /// Absolute position of the next row to fetch.
    row_counter: usize,
    skipped_leading: bool,
    num_rows_cache: Option<usize>,
    freed: bool,
}

impl<'a, A: NativeAdapter> ResultCursor<'a, A> {
    pub(crate) fn new(
        conn: &'a mut Connection<A>,
        id: u64,
        mut columns: Vec<String>,
        query: String,
        limit: Option<LimitWindow>,
    ) -> Self {
        portability::normalize_names(&mut columns, conn.portability());
        let row_counter = limit.map_or(0, |w| w.from);
        Self {
            conn,
            id,
            columns,
            query,
            limit,
            row_counter,
            skipped_leading: false,
            num_rows_cache: None,
            freed: false,
        }
    }

    /// Normalized column names in result order.
    pub fn column_names(&self) -> &[String] {
        &self.columns
    }

    pub fn num_cols(&self) -> usize {
        self.columns.len()
    }

    /// Fetch the next row's values, honoring the limit window.
    ///
    /// `Ok(None)` is end-of-data.  After the cursor is freed every fetch
    /// is end-of-data.
    pub fn fetch_values(&mut self) -> DbResult<Option<Vec<Option<String>>>> {
        if self.freed {
            return Ok(None);
        }

        let mut rownum = None;
        if let Some(window) = self.limit {
            if self.row_counter >= window.from + window.count {
                self.end_of_data()?;
                return Ok(None);
            }
            match self.conn.capabilities().limit {
                LimitStrategy::Alter => {}
                LimitStrategy::EmulateSeek => rownum = Some(self.row_counter),
                LimitStrategy::SkipRows => {
                    if !self.skipped_leading {
                        for _ in 0..window.from {
                            if self.raw_fetch_one(None)?.is_none() {
                                self.end_of_data()?;
                                return Ok(None);
                            }
                        }
                        self.skipped_leading = true;
                    }
                }
            }
        }

        match self.raw_fetch_one(rownum)? {
            None => {
                self.end_of_data()?;
                Ok(None)
            }
            Some(mut values) => {
                self.row_counter += 1;
                portability::normalize_values(&mut values, self.conn.portability());
                Ok(Some(values))
            }
        }
    }

    /// Fetch the next row shaped per the connection's fetch mode.
    pub fn fetch_row(&mut self) -> DbResult<Option<Row>> {
        let mode = self.conn.fetch_mode();
        Ok(self.fetch_values()?.map(|values| Row {
            columns: match mode {
                FetchMode::Ordered => Vec::new(),
                FetchMode::Assoc => self.columns.clone(),
            },
            values,
        }))
    }

    /// Number of rows in the result.
    ///
    /// Uses the native count when the engine tracks one.  Otherwise the
    /// count is emulated (a re-run or a COUNT(*) wrapper, per the backend)
    /// but only when the `NUMROWS` portability flag asks for it; without
    /// the flag the call reports [`ErrorKind::NotCapable`].  Computed once
    /// and cached.
    pub fn num_rows(&mut self) -> DbResult<usize> {
        if let Some(n) = self.num_rows_cache {
            return Ok(n);
        }
        let native = self.conn.native_num_rows(self.id);
        let mut n = match native {
            Some(n) => n,
            None => {
                if !self.conn.portability().contains(Portability::NUMROWS) {
                    return Err(self.error(ErrorKind::NotCapable));
                }
                match self.conn.capabilities().numrows {
                    NumRowsStrategy::Emulate | NumRowsStrategy::Native => {
                        self.conn.count_rows_by_rerun(&self.query)?
                    }
                    NumRowsStrategy::Subquery => {
                        self.conn.count_rows_by_subquery(&self.query)?
                    }
                }
            }
        };
        // Emulated counts see the whole result; clamp to the window.
        if native.is_none() {
            if let Some(window) = self.limit {
                n = n.saturating_sub(window.from).min(window.count);
            }
        }
        self.num_rows_cache = Some(n);
        Ok(n)
    }

    /// Release the native result.  Safe to call more than once.
    pub fn free(&mut self) -> DbResult<()> {
        if !self.freed {
            self.conn.free_native(self.id);
            self.freed = true;
        }
        Ok(())
    }

    fn end_of_data(&mut self) -> DbResult<()> {
        if self.conn.autofree() {
            self.free()?;
        }
        Ok(())
    }

    fn raw_fetch_one(
        &mut self,
        rownum: Option<usize>,
    ) -> DbResult<Option<Vec<Option<String>>>> {
        self.conn.native_fetch(self.id, rownum)
    }

    fn error(&self, kind: ErrorKind) -> crate::error::DbError {
        self.conn.error(kind)
    }
}

impl<A: NativeAdapter> Drop for ResultCursor<'_, A> {
    fn drop(&mut self) {
        if !self.freed {
            self.conn.free_native(self.id);
        }
    }
}

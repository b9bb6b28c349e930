//! The portable connection and query facade.
//!
//! [`Connection`] owns a native adapter plus everything portable that
//! wraps it: the dialect tables, the error classifier, the prepared
//! statement arena, options, and transaction state.  All SQL execution
//! funnels through [`Connection::query`], which applies statement
//! emulation, query modification, and transaction bookkeeping in one
//! place.

use std::collections::HashMap;

use regex::Regex;
use tracing::debug;

use crate::adapter::{MetaSource, NativeAdapter, NativeError, RawOutcome, RawResult};
use crate::backend::{Backend, Capabilities, LimitStrategy};
use crate::dsn::ConnectInfo;
use crate::errmap::ErrorMap;
use crate::error::{DbError, DbResult, ErrorKind};
use crate::introspect::{self, TableInfo, TableInfoMode};
use crate::options::{OptionValue, Options};
use crate::portability::Portability;
use crate::result::{FetchMode, LimitWindow, ResultCursor, Row};
use crate::stmt::{self, ParamKind, PreparedStatement, StmtArena, StmtHandle};
use crate::value::SqlValue;

/// Outcome of running one statement through the facade.
#[derive(Debug)]
pub enum QueryOutcome<'a, A: NativeAdapter> {
    /// A manipulation or DDL statement; carries the affected row count.
    Done(u64),
    /// A statement that produced rows.
    Rows(ResultCursor<'a, A>),
}

/// Column selector for [`Connection::get_col`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ColumnId {
    Index(usize),
    Name(String),
}

impl From<usize> for ColumnId {
    fn from(i: usize) -> Self {
        ColumnId::Index(i)
    }
}

impl From<&str> for ColumnId {
    fn from(name: &str) -> Self {
        ColumnId::Name(name.to_string())
    }
}

/// One entry of a [`Connection::get_assoc`] map.
#[derive(Debug, Clone, PartialEq)]
pub enum AssocValue {
    /// Two-column result: the second column.
    Scalar(Option<String>),
    /// Wider (or forced-array) result: the remaining columns.
    Row(Vec<Option<String>>),
    /// Grouped two-column result: every second-column value for the key.
    ScalarGroup(Vec<Option<String>>),
    /// Grouped wide result: every remaining-columns row for the key.
    RowGroup(Vec<Vec<Option<String>>>),
}

/// Statement shape built by [`Connection::auto_prepare`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AutoQueryMode {
    Insert,
    Update,
}

enum RawRun {
    Rows(RawResult),
    Done(u64),
}

/// A portable connection over one native adapter.
#[derive(Debug)]
pub struct Connection<A: NativeAdapter> {
    adapter: A,
    backend: Backend,
    caps: Capabilities,
    options: Options,
    fetch_mode: FetchMode,
    stmts: StmtArena,
    errmap: ErrorMap,
    manip_re: Regex,
    delete_all_re: Regex,
    last_query: Option<String>,
    last_parameters: Vec<SqlValue>,
    auto_commit: bool,
    transaction_opcount: u64,
}

fn build_regex(pattern: &str) -> DbResult<Regex> {
    Regex::new(pattern).map_err(|e| {
        DbError::new(ErrorKind::Invalid).with_native_message(format!("bad pattern: {e}"))
    })
}

impl<A: NativeAdapter> Connection<A> {
    /// Open a connection from parsed parameters.
    pub fn connect(info: &ConnectInfo, options: Options) -> DbResult<Self> {
        if options.ssl && !info.backend.capabilities().ssl {
            return Err(DbError::new(ErrorKind::NotCapable)
                .with_native_message("engine has no SSL support"));
        }
        let errmap = ErrorMap::for_backend(info.backend)?;
        let adapter = A::connect(info).map_err(|e| {
            let mut err = DbError::new(ErrorKind::ConnectFailed);
            err.native_code = e.code;
            err.native_message = Some(e.message);
            err
        })?;
        let conn = Self::with_adapter_inner(adapter, options, errmap)?;
        if conn.backend != info.backend {
            return Err(DbError::new(ErrorKind::Mismatch)
                .with_native_message("adapter engine does not match DSN"));
        }
        Ok(conn)
    }

    /// Open a connection from a DSN string.
    pub fn connect_dsn(dsn: &str, options: Options) -> DbResult<Self> {
        let info = ConnectInfo::from_dsn(dsn)?;
        Self::connect(&info, options)
    }

    /// Wrap an already-connected adapter.
    pub fn with_adapter(adapter: A, options: Options) -> DbResult<Self> {
        let errmap = ErrorMap::for_backend(adapter.backend())?;
        Self::with_adapter_inner(adapter, options, errmap)
    }

    fn with_adapter_inner(adapter: A, options: Options, errmap: ErrorMap) -> DbResult<Self> {
        let backend = adapter.backend();
        let manip_re = build_regex(
            r#"(?i)^\s*"?(INSERT|UPDATE|DELETE|REPLACE|CREATE|DROP|LOAD DATA|SELECT\s+.*\s+INTO|COPY|ALTER|GRANT|REVOKE|LOCK|UNLOCK)\s+"#,
        )?;
        let delete_all_re = build_regex(r"(?i)^\s*DELETE\s+FROM\s+(\S+)\s*$")?;
        Ok(Self {
            adapter,
            backend,
            caps: backend.capabilities(),
            options,
            fetch_mode: FetchMode::default(),
            stmts: StmtArena::default(),
            errmap,
            manip_re,
            delete_all_re,
            last_query: None,
            last_parameters: Vec::new(),
            auto_commit: true,
            transaction_opcount: 0,
        })
    }

    // ---- accessors ----------------------------------------------------------

    pub fn backend(&self) -> Backend {
        self.backend
    }

    pub fn capabilities(&self) -> Capabilities {
        self.caps
    }

    pub fn last_query(&self) -> Option<&str> {
        self.last_query.as_deref()
    }

    pub fn last_parameters(&self) -> &[SqlValue] {
        &self.last_parameters
    }

    pub fn adapter(&self) -> &A {
        &self.adapter
    }

    pub fn adapter_mut(&mut self) -> &mut A {
        &mut self.adapter
    }

    pub fn set_fetch_mode(&mut self, mode: FetchMode) {
        self.fetch_mode = mode;
    }

    pub(crate) fn fetch_mode(&self) -> FetchMode {
        self.fetch_mode
    }

    pub(crate) fn portability(&self) -> Portability {
        self.options.portability
    }

    pub(crate) fn autofree(&self) -> bool {
        self.options.autofree
    }

    pub fn set_option(&mut self, name: &str, value: OptionValue) -> DbResult<()> {
        self.options.set(name, value)
    }

    pub fn get_option(&self, name: &str) -> DbResult<OptionValue> {
        self.options.get(name)
    }

    pub(crate) fn options(&self) -> &Options {
        &self.options
    }

    // ---- quoting ------------------------------------------------------------

    pub fn quote_identifier(&self, name: &str) -> String {
        self.backend.quote_identifier(name)
    }

    /// Escape a string for inclusion inside single quotes, preferring the
    /// native client's routine where the adapter offers one.
    pub fn escape_simple(&mut self, s: &str) -> String {
        match self.adapter.raw_escape(s) {
            Some(escaped) => escaped,
            None => self.backend.escape(s),
        }
    }

    /// Render a value as a safe SQL literal.
    pub fn quote_smart(&mut self, value: &SqlValue) -> String {
        match value {
            SqlValue::Str(s) => format!("'{}'", self.escape_simple(s)),
            other => self.backend.quote_smart(other),
        }
    }

    // ---- errors -------------------------------------------------------------

    /// Build a portable error carrying the last query context.
    pub(crate) fn error(&self, kind: ErrorKind) -> DbError {
        let mut err = DbError::new(kind);
        err.last_query = self.last_query.clone();
        err.last_parameters = self.last_parameters.clone();
        err
    }

    /// Classify a native failure and attach query context.
    pub(crate) fn map_native(&self, e: NativeError) -> DbError {
        let kind = self
            .errmap
            .classify(e.code, &e.message, self.options.portability);
        let mut err = self.error(kind);
        err.native_code = e.code;
        err.native_message = Some(e.message);
        err
    }

    // ---- statement emulation ------------------------------------------------

    /// Tokenize a statement template and store it for later execution.
    pub fn prepare(&mut self, template: &str) -> StmtHandle {
        self.stmts.insert(stmt::tokenize(template))
    }

    /// Release a prepared statement.  Stale handles report
    /// [`ErrorKind::NotFound`].
    pub fn free_prepared(&mut self, handle: StmtHandle) -> DbResult<()> {
        self.stmts.remove(handle)
    }

    /// Render a prepared statement into executable SQL.
    pub fn render_statement(
        &mut self,
        handle: StmtHandle,
        params: &[SqlValue],
    ) -> DbResult<String> {
        let stmt = self.stmts.get(handle)?.clone();
        self.render_tokens(&stmt, params)
    }

    fn render_tokens(&mut self, stmt: &PreparedStatement, params: &[SqlValue]) -> DbResult<String> {
        if params.len() != stmt.param_count() {
            return Err(DbError::new(ErrorKind::Mismatch)
                .with_query(stmt.template.clone())
                .with_native_message(format!(
                    "statement takes {} parameters, {} given",
                    stmt.param_count(),
                    params.len()
                )));
        }
        let mut sql = String::with_capacity(stmt.template.len());
        for (i, fragment) in stmt.fragments.iter().enumerate() {
            sql.push_str(fragment);
            if i < stmt.kinds.len() {
                let value = &params[i];
                match stmt.kinds[i] {
                    ParamKind::Scalar => sql.push_str(&self.quote_smart(value)),
                    ParamKind::Raw => sql.push_str(&value.raw_text()),
                    ParamKind::File => {
                        let path = match value {
                            SqlValue::Str(p) => p,
                            _ => {
                                return Err(DbError::new(ErrorKind::Invalid)
                                    .with_native_message("file placeholder needs a path"));
                            }
                        };
                        let contents = std::fs::read_to_string(path).map_err(|e| {
                            DbError::new(ErrorKind::AccessViolation)
                                .with_native_message(format!("{path}: {e}"))
                        })?;
                        sql.push_str(&self.quote_smart(&SqlValue::Str(contents)));
                    }
                }
            }
        }
        Ok(sql)
    }

    /// Execute a prepared statement.
    pub fn execute(
        &mut self,
        handle: StmtHandle,
        params: &[SqlValue],
    ) -> DbResult<QueryOutcome<'_, A>> {
        let stmt = self.stmts.get(handle)?.clone();
        let sql = self.render_tokens(&stmt, params)?;
        self.last_parameters = params.to_vec();
        self.query_rendered(sql, None)
    }

    /// Execute a prepared statement once per parameter row, discarding any
    /// results.  Stops at the first failure.
    pub fn execute_multiple(
        &mut self,
        handle: StmtHandle,
        rows: &[Vec<SqlValue>],
    ) -> DbResult<()> {
        for params in rows {
            match self.execute(handle, params)? {
                QueryOutcome::Done(_) => {}
                QueryOutcome::Rows(mut cur) => cur.free()?,
            }
        }
        Ok(())
    }

    // ---- query facade -------------------------------------------------------

    /// Run a statement, emulating placeholders when `params` is non-empty.
    pub fn query(&mut self, sql: &str, params: &[SqlValue]) -> DbResult<QueryOutcome<'_, A>> {
        let rendered = self.render_inline(sql, params)?;
        self.query_rendered(rendered, None)
    }

    /// Run a statement returning only the window [`from`, `from + count`).
    pub fn limit_query(
        &mut self,
        sql: &str,
        from: usize,
        count: usize,
        params: &[SqlValue],
    ) -> DbResult<QueryOutcome<'_, A>> {
        let rendered = self.render_inline(sql, params)?;
        self.query_rendered(rendered, Some(LimitWindow { from, count }))
    }

    /// Run a manipulation statement and report the affected row count.
    /// A statement that unexpectedly produces rows is freed and counts as
    /// zero.
    pub fn run(&mut self, sql: &str, params: &[SqlValue]) -> DbResult<u64> {
        let rendered = self.render_inline(sql, params)?;
        match self.run_internal(&rendered, None)? {
            RawRun::Done(n) => Ok(n),
            RawRun::Rows(raw) => {
                self.adapter.raw_free(raw.id);
                Ok(0)
            }
        }
    }

    fn render_inline(&mut self, sql: &str, params: &[SqlValue]) -> DbResult<String> {
        if params.is_empty() {
            self.last_parameters.clear();
            return Ok(sql.to_string());
        }
        let stmt = stmt::tokenize(sql);
        let rendered = self.render_tokens(&stmt, params)?;
        self.last_parameters = params.to_vec();
        Ok(rendered)
    }

    fn query_rendered(
        &mut self,
        sql: String,
        window: Option<LimitWindow>,
    ) -> DbResult<QueryOutcome<'_, A>> {
        match self.run_internal(&sql, window)? {
            RawRun::Done(n) => Ok(QueryOutcome::Done(n)),
            RawRun::Rows(raw) => Ok(QueryOutcome::Rows(ResultCursor::new(
                self,
                raw.id,
                raw.columns,
                sql,
                window,
            ))),
        }
    }

    fn run_internal(&mut self, sql: &str, window: Option<LimitWindow>) -> DbResult<RawRun> {
        self.last_query = Some(sql.to_string());
        let is_manip = self.is_manip(sql);
        let mut executable = self.modify_query(sql);
        if let Some(w) = window {
            if self.caps.limit == LimitStrategy::Alter {
                if let Some(rewritten) =
                    self.backend.modify_limit(&executable, w.from, w.count, is_manip)
                {
                    executable = rewritten;
                }
            }
        }

        if is_manip
            && self.caps.transactions
            && !self.auto_commit
            && self.transaction_opcount == 0
        {
            let begin = self.backend.begin_sql();
            self.adapter
                .raw_execute(begin)
                .map_err(|e| self.map_native(e))?;
        }

        debug!(backend = %self.backend, sql = %executable, "executing");
        let outcome = self
            .adapter
            .raw_execute(&executable)
            .map_err(|e| self.map_native(e))?;

        if is_manip && self.caps.transactions && !self.auto_commit {
            self.transaction_opcount += 1;
        }

        match outcome {
            RawOutcome::Rows(raw) => Ok(RawRun::Rows(raw)),
            RawOutcome::Done => {
                let affected = if is_manip {
                    self.adapter.raw_affected_rows()
                } else {
                    0
                };
                Ok(RawRun::Done(affected))
            }
        }
    }

    /// Whether `sql` is a data or schema manipulation statement.
    pub fn is_manip(&self, sql: &str) -> bool {
        self.manip_re.is_match(sql)
    }

    /// Backend-specific query rewrites applied before execution.
    ///
    /// With the `DELETE_COUNT` flag, engines that report zero affected
    /// rows for an unconditional DELETE get a `WHERE 1=1` appended so the
    /// count comes out right.
    fn modify_query(&self, sql: &str) -> String {
        if self.caps.delete_count_rewrite
            && self.options.portability.contains(Portability::DELETE_COUNT)
        {
            if let Some(caps) = self.delete_all_re.captures(sql) {
                return format!("DELETE FROM {} WHERE 1=1", &caps[1]);
            }
        }
        sql.to_string()
    }

    // ---- fetch helpers ------------------------------------------------------

    /// First column of the first row.  A result with no rows reports
    /// [`ErrorKind::NotFound`]; a statement with no result set reports
    /// [`ErrorKind::Invalid`].
    pub fn get_one(&mut self, sql: &str, params: &[SqlValue]) -> DbResult<Option<String>> {
        let fetched = match self.query(sql, params)? {
            QueryOutcome::Done(_) => Err(ErrorKind::Invalid),
            QueryOutcome::Rows(mut cur) => {
                let values = cur.fetch_values()?;
                cur.free()?;
                Ok(values)
            }
        };
        match fetched {
            Err(kind) => Err(self.error(kind)),
            Ok(None) => Err(self.error(ErrorKind::NotFound)),
            Ok(Some(values)) => match values.into_iter().next() {
                Some(v) => Ok(v),
                None => Err(self.error(ErrorKind::NoSuchField)),
            },
        }
    }

    /// The first row, or `None` when the result is empty.
    pub fn get_row(&mut self, sql: &str, params: &[SqlValue]) -> DbResult<Option<Row>> {
        let fetched = match self.query(sql, params)? {
            QueryOutcome::Done(_) => Err(ErrorKind::Invalid),
            QueryOutcome::Rows(mut cur) => {
                let row = cur.fetch_row()?;
                cur.free()?;
                Ok(row)
            }
        };
        match fetched {
            Err(kind) => Err(self.error(kind)),
            Ok(row) => Ok(row),
        }
    }

    /// One column of every row.
    pub fn get_col(
        &mut self,
        sql: &str,
        col: impl Into<ColumnId>,
        params: &[SqlValue],
    ) -> DbResult<Vec<Option<String>>> {
        let col = col.into();
        let fetched = match self.query(sql, params)? {
            QueryOutcome::Done(_) => Err(ErrorKind::Invalid),
            QueryOutcome::Rows(mut cur) => {
                let index = match &col {
                    ColumnId::Index(i) => {
                        if *i < cur.num_cols() {
                            Some(*i)
                        } else {
                            None
                        }
                    }
                    ColumnId::Name(name) => {
                        cur.column_names().iter().position(|c| c == name)
                    }
                };
                match index {
                    None => {
                        cur.free()?;
                        Err(ErrorKind::NoSuchField)
                    }
                    Some(index) => {
                        let mut out = Vec::new();
                        while let Some(mut values) = cur.fetch_values()? {
                            out.push(values.swap_remove(index));
                        }
                        cur.free()?;
                        Ok(out)
                    }
                }
            }
        };
        match fetched {
            Err(kind) => Err(self.error(kind)),
            Ok(out) => Ok(out),
        }
    }

    /// Every row, shaped per the connection's fetch mode.
    pub fn get_all(&mut self, sql: &str, params: &[SqlValue]) -> DbResult<Vec<Row>> {
        let fetched = match self.query(sql, params)? {
            QueryOutcome::Done(_) => Err(ErrorKind::Invalid),
            QueryOutcome::Rows(mut cur) => {
                let mut out = Vec::new();
                while let Some(row) = cur.fetch_row()? {
                    out.push(row);
                }
                cur.free()?;
                Ok(out)
            }
        };
        match fetched {
            Err(kind) => Err(self.error(kind)),
            Ok(out) => Ok(out),
        }
    }

    /// Every row, transposed: one vector per column.
    pub fn get_all_flipped(
        &mut self,
        sql: &str,
        params: &[SqlValue],
    ) -> DbResult<Vec<Vec<Option<String>>>> {
        let fetched = match self.query(sql, params)? {
            QueryOutcome::Done(_) => Err(ErrorKind::Invalid),
            QueryOutcome::Rows(mut cur) => {
                let mut out: Vec<Vec<Option<String>>> = vec![Vec::new(); cur.num_cols()];
                while let Some(values) = cur.fetch_values()? {
                    for (column, value) in out.iter_mut().zip(values) {
                        column.push(value);
                    }
                }
                cur.free()?;
                Ok(out)
            }
        };
        match fetched {
            Err(kind) => Err(self.error(kind)),
            Ok(out) => Ok(out),
        }
    }

    /// Rows keyed by their first column.
    ///
    /// Two-column results map to scalars unless `force_array` is set;
    /// wider results map to the remaining columns.  With `group`, values
    /// for a repeated key accumulate instead of the last one winning.
    /// Results with fewer than two columns report [`ErrorKind::Truncated`].
    pub fn get_assoc(
        &mut self,
        sql: &str,
        params: &[SqlValue],
        force_array: bool,
        group: bool,
    ) -> DbResult<HashMap<String, AssocValue>> {
        let fetched = match self.query(sql, params)? {
            QueryOutcome::Done(_) => Err(ErrorKind::Invalid),
            QueryOutcome::Rows(mut cur) => {
                if cur.num_cols() < 2 {
                    cur.free()?;
                    Err(ErrorKind::Truncated)
                } else {
                    let wide = force_array || cur.num_cols() > 2;
                    let mut out: HashMap<String, AssocValue> = HashMap::new();
                    while let Some(mut values) = cur.fetch_values()? {
                        let rest = values.split_off(1);
                        let key = values
                            .into_iter()
                            .next()
                            .flatten()
                            .unwrap_or_default();
                        insert_assoc(&mut out, key, rest, wide, group);
                    }
                    cur.free()?;
                    Ok(out)
                }
            }
        };
        match fetched {
            Err(kind) => Err(self.error(kind)),
            Ok(out) => Ok(out),
        }
    }

    // ---- auto queries -------------------------------------------------------

    /// Build the SQL for a column-driven INSERT or UPDATE.
    pub fn build_manip_sql(
        &self,
        table: &str,
        fields: &[&str],
        mode: AutoQueryMode,
        where_clause: Option<&str>,
    ) -> DbResult<String> {
        if fields.is_empty() {
            return Err(DbError::new(ErrorKind::NeedMoreData)
                .with_native_message("no fields for auto query"));
        }
        let sql = match mode {
            AutoQueryMode::Insert => {
                let placeholders = vec!["?"; fields.len()].join(", ");
                format!(
                    "INSERT INTO {table} ({}) VALUES ({placeholders})",
                    fields.join(", ")
                )
            }
            AutoQueryMode::Update => {
                let sets = fields
                    .iter()
                    .map(|f| format!("{f} = ?"))
                    .collect::<Vec<_>>()
                    .join(", ");
                let mut sql = format!("UPDATE {table} SET {sets}");
                if let Some(clause) = where_clause {
                    if !clause.is_empty() {
                        sql.push_str(" WHERE ");
                        sql.push_str(clause);
                    }
                }
                sql
            }
        };
        Ok(sql)
    }

    /// Prepare a column-driven INSERT or UPDATE.
    pub fn auto_prepare(
        &mut self,
        table: &str,
        fields: &[&str],
        mode: AutoQueryMode,
        where_clause: Option<&str>,
    ) -> DbResult<StmtHandle> {
        let sql = self.build_manip_sql(table, fields, mode, where_clause)?;
        Ok(self.prepare(&sql))
    }

    /// Build, run, and free a column-driven INSERT or UPDATE.
    pub fn auto_execute(
        &mut self,
        table: &str,
        fields: &[&str],
        values: &[SqlValue],
        mode: AutoQueryMode,
        where_clause: Option<&str>,
    ) -> DbResult<u64> {
        let handle = self.auto_prepare(table, fields, mode, where_clause)?;
        let outcome = match self.execute(handle, values) {
            Ok(QueryOutcome::Done(n)) => Ok(n),
            Ok(QueryOutcome::Rows(mut cur)) => {
                cur.free()?;
                Ok(0)
            }
            Err(e) => Err(e),
        };
        self.free_prepared(handle)?;
        outcome
    }

    // ---- transactions -------------------------------------------------------

    /// Toggle auto-commit.  Turning it back on commits any pending work.
    pub fn set_auto_commit(&mut self, on: bool) -> DbResult<()> {
        if !self.caps.transactions {
            return Err(self.error(ErrorKind::NotCapable));
        }
        if on && self.transaction_opcount > 0 {
            self.commit()?;
        }
        self.auto_commit = on;
        Ok(())
    }

    pub fn auto_commit(&self) -> bool {
        self.auto_commit
    }

    /// Commit the open transaction, if any work is pending.
    pub fn commit(&mut self) -> DbResult<()> {
        self.finish_transaction(true)
    }

    /// Roll back the open transaction, if any work is pending.
    pub fn rollback(&mut self) -> DbResult<()> {
        self.finish_transaction(false)
    }

    fn finish_transaction(&mut self, commit: bool) -> DbResult<()> {
        if !self.caps.transactions {
            return Err(self.error(ErrorKind::NotCapable));
        }
        if self.transaction_opcount > 0 {
            let sql = if commit {
                self.backend.commit_sql()
            } else {
                self.backend.rollback_sql()
            };
            self.adapter
                .raw_execute(sql)
                .map_err(|e| self.map_native(e))?;
            self.transaction_opcount = 0;
        }
        Ok(())
    }

    // ---- introspection ------------------------------------------------------

    /// Describe the columns of a table or open result set.
    pub fn table_info(&mut self, source: &MetaSource, mode: TableInfoMode) -> DbResult<TableInfo> {
        let raw = self
            .adapter
            .raw_table_meta(source)
            .map_err(|e| self.map_native(e))?;
        Ok(introspect::build_table_info(
            raw,
            mode,
            self.options.portability,
        ))
    }

    /// List catalog objects of `kind` (e.g. `"tables"`, `"views"`,
    /// `"databases"`).  Engines without the listing report
    /// [`ErrorKind::NotCapable`].
    pub fn get_list_of(&mut self, kind: &str) -> DbResult<Vec<String>> {
        let sql = match self.backend.special_query(kind) {
            Some(sql) => sql,
            None => {
                return Err(self
                    .error(ErrorKind::NotCapable)
                    .with_native_message(format!("no {kind} listing for this engine")));
            }
        };
        let col = self.get_col(&sql, 0usize, &[])?;
        Ok(col.into_iter().flatten().collect())
    }

    // ---- teardown -----------------------------------------------------------

    /// Close the native connection, rolling back any pending work first.
    pub fn disconnect(mut self) -> DbResult<()> {
        if self.transaction_opcount > 0 {
            self.rollback()?;
        }
        self.adapter.disconnect();
        Ok(())
    }

    // ---- cursor plumbing ----------------------------------------------------

    pub(crate) fn native_fetch(
        &mut self,
        id: u64,
        rownum: Option<usize>,
    ) -> DbResult<Option<Vec<Option<String>>>> {
        self.adapter
            .raw_fetch(id, rownum)
            .map_err(|e| self.map_native(e))
    }

    pub(crate) fn native_num_rows(&mut self, id: u64) -> Option<usize> {
        self.adapter.raw_num_rows(id)
    }

    pub(crate) fn free_native(&mut self, id: u64) {
        self.adapter.raw_free(id);
    }

    /// Row-count emulation: re-run the query and count what comes back.
    pub(crate) fn count_rows_by_rerun(&mut self, sql: &str) -> DbResult<usize> {
        match self
            .adapter
            .raw_execute(sql)
            .map_err(|e| self.map_native(e))?
        {
            RawOutcome::Done => Err(self.error(ErrorKind::NotCapable)),
            RawOutcome::Rows(raw) => {
                let mut n = 0;
                loop {
                    match self.adapter.raw_fetch(raw.id, None) {
                        Ok(Some(_)) => n += 1,
                        Ok(None) => break,
                        Err(e) => {
                            self.adapter.raw_free(raw.id);
                            return Err(self.map_native(e));
                        }
                    }
                }
                self.adapter.raw_free(raw.id);
                Ok(n)
            }
        }
    }

    /// Row-count emulation: wrap the query in a COUNT(*) subselect.
    pub(crate) fn count_rows_by_subquery(&mut self, sql: &str) -> DbResult<usize> {
        let count_sql = format!("SELECT COUNT(*) FROM ({sql}) dbport_count");
        match self
            .adapter
            .raw_execute(&count_sql)
            .map_err(|e| self.map_native(e))?
        {
            RawOutcome::Done => Err(self.error(ErrorKind::NotCapable)),
            RawOutcome::Rows(raw) => {
                let row = self.adapter.raw_fetch(raw.id, None);
                self.adapter.raw_free(raw.id);
                let row = row.map_err(|e| self.map_native(e))?;
                row.and_then(|values| values.into_iter().next().flatten())
                    .and_then(|v| v.parse::<usize>().ok())
                    .ok_or_else(|| self.error(ErrorKind::NotCapable))
            }
        }
    }
}

fn insert_assoc(
    out: &mut HashMap<String, AssocValue>,
    key: String,
    mut rest: Vec<Option<String>>,
    wide: bool,
    group: bool,
) {
    if wide {
        if group {
            match out.entry(key).or_insert_with(|| AssocValue::RowGroup(Vec::new())) {
                AssocValue::RowGroup(rows) => rows.push(rest),
                other => *other = AssocValue::RowGroup(vec![rest]),
            }
        } else {
            out.insert(key, AssocValue::Row(rest));
        }
    } else {
        let value = rest.pop().unwrap_or(None);
        if group {
            match out
                .entry(key)
                .or_insert_with(|| AssocValue::ScalarGroup(Vec::new()))
            {
                AssocValue::ScalarGroup(values) => values.push(value),
                other => *other = AssocValue::ScalarGroup(vec![value]),
            }
        } else {
            out.insert(key, AssocValue::Scalar(value));
        }
    }
}

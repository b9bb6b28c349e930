//! Scripted in-memory adapter for exercising the portable engine.
#![allow(dead_code)]

use std::collections::HashMap;

use dbport::adapter::{MetaSource, NativeAdapter, NativeError, RawOutcome, RawResult};
use dbport::dsn::ConnectInfo;
use dbport::introspect::RawColumnMeta;
use dbport::Backend;

/// Scripted reply for one SQL prefix.
#[derive(Debug, Clone)]
pub enum Reply {
    Rows {
        columns: Vec<&'static str>,
        rows: Vec<Vec<Option<&'static str>>>,
    },
    Done {
        affected: u64,
    },
    Error {
        code: Option<i64>,
        message: &'static str,
    },
}

#[derive(Debug)]
struct Rule {
    prefix: String,
    reply: Reply,
    once: bool,
}

#[derive(Debug)]
struct OpenResult {
    rows: Vec<Vec<Option<String>>>,
    pos: usize,
}

/// Adapter that answers queries from scripted prefix rules and logs every
/// statement it is handed.
#[derive(Debug)]
pub struct MockAdapter {
    backend: Backend,
    rules: Vec<Rule>,
    open: HashMap<u64, OpenResult>,
    next_id: u64,
    affected: u64,
    /// Values handed out by `raw_last_insert_id`, in order.
    pub insert_ids: Vec<i64>,
    /// Whether the engine reports native result row counts.
    pub native_num_rows: bool,
    /// Columns reported by `raw_table_meta`.
    pub table_meta: Vec<RawColumnMeta>,
    /// Every statement passed to `raw_execute`, in order.
    pub log: Vec<String>,
    pub disconnected: bool,
}

impl MockAdapter {
    pub fn new(backend: Backend) -> Self {
        Self {
            backend,
            rules: Vec::new(),
            open: HashMap::new(),
            next_id: 1,
            affected: 0,
            insert_ids: Vec::new(),
            native_num_rows: true,
            table_meta: Vec::new(),
            log: Vec::new(),
            disconnected: false,
        }
    }

    /// Always answer statements starting with `prefix` with `reply`.
    pub fn on(mut self, prefix: &str, reply: Reply) -> Self {
        self.rules.push(Rule {
            prefix: prefix.to_string(),
            reply,
            once: false,
        });
        self
    }

    /// Answer the first statement starting with `prefix` with `reply`,
    /// then fall through to later rules.
    pub fn on_once(mut self, prefix: &str, reply: Reply) -> Self {
        self.rules.push(Rule {
            prefix: prefix.to_string(),
            reply,
            once: true,
        });
        self
    }

    pub fn with_insert_ids(mut self, ids: &[i64]) -> Self {
        self.insert_ids = ids.to_vec();
        self
    }

    pub fn without_native_num_rows(mut self) -> Self {
        self.native_num_rows = false;
        self
    }
}

/// Shorthand for a rows reply.
pub fn rows(columns: &[&'static str], data: &[&[Option<&'static str>]]) -> Reply {
    Reply::Rows {
        columns: columns.to_vec(),
        rows: data.iter().map(|r| r.to_vec()).collect(),
    }
}

pub fn done(affected: u64) -> Reply {
    Reply::Done { affected }
}

pub fn native_error(code: Option<i64>, message: &'static str) -> Reply {
    Reply::Error { code, message }
}

impl NativeAdapter for MockAdapter {
    fn connect(info: &ConnectInfo) -> Result<Self, NativeError> {
        Ok(MockAdapter::new(info.backend))
    }

    fn backend(&self) -> Backend {
        self.backend
    }

    fn raw_execute(&mut self, sql: &str) -> Result<RawOutcome, NativeError> {
        self.log.push(sql.to_string());
        let index = self
            .rules
            .iter()
            .position(|rule| sql.starts_with(&rule.prefix));
        let Some(index) = index else {
            return Err(NativeError::new(format!("unscripted query: {sql}")));
        };
        let reply = self.rules[index].reply.clone();
        if self.rules[index].once {
            self.rules.remove(index);
        }
        match reply {
            Reply::Done { affected } => {
                self.affected = affected;
                Ok(RawOutcome::Done)
            }
            Reply::Error { code, message } => {
                let mut err = NativeError::new(message);
                err.code = code;
                Err(err)
            }
            Reply::Rows { columns, rows } => {
                let id = self.next_id;
                self.next_id += 1;
                self.open.insert(
                    id,
                    OpenResult {
                        rows: rows
                            .into_iter()
                            .map(|r| {
                                r.into_iter().map(|v| v.map(str::to_string)).collect()
                            })
                            .collect(),
                        pos: 0,
                    },
                );
                Ok(RawOutcome::Rows(RawResult {
                    id,
                    columns: columns.into_iter().map(str::to_string).collect(),
                }))
            }
        }
    }

    fn raw_fetch(
        &mut self,
        id: u64,
        rownum: Option<usize>,
    ) -> Result<Option<Vec<Option<String>>>, NativeError> {
        let result = self
            .open
            .get_mut(&id)
            .ok_or_else(|| NativeError::new("fetch from freed result"))?;
        match rownum {
            Some(n) => Ok(result.rows.get(n).cloned()),
            None => {
                let row = result.rows.get(result.pos).cloned();
                if row.is_some() {
                    result.pos += 1;
                }
                Ok(row)
            }
        }
    }

    fn raw_free(&mut self, id: u64) {
        self.open.remove(&id);
    }

    fn raw_num_rows(&mut self, id: u64) -> Option<usize> {
        if !self.native_num_rows {
            return None;
        }
        self.open.get(&id).map(|r| r.rows.len())
    }

    fn raw_affected_rows(&mut self) -> u64 {
        self.affected
    }

    fn raw_last_insert_id(&mut self) -> Option<i64> {
        if self.insert_ids.is_empty() {
            None
        } else {
            Some(self.insert_ids.remove(0))
        }
    }

    fn raw_table_meta(&mut self, _source: &MetaSource) -> Result<Vec<RawColumnMeta>, NativeError> {
        Ok(self.table_meta.clone())
    }

    fn disconnect(&mut self) {
        self.disconnected = true;
    }
}

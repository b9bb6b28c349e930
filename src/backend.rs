//! Backend identifiers, capability descriptors, and SQL dialect tables.
//!
//! All per-engine variation lives here as data: which features are native
//! versus emulated, how identifiers and literals are quoted, how a row
//! window is spelled, and the SQL templates for sequences, transactions,
//! and catalog listings.  The engine itself stays generic.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{DbError, ErrorKind};
use crate::value::SqlValue;

/// Supported database engines.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Backend {
    MySql,
    Postgres,
    Oracle,
    SqlServer,
    Sqlite,
    Informix,
    Interbase,
    Dbase,
    Msql,
    Odbc,
    FrontBase,
}

/// How a row window (`from`, `count`) is applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LimitStrategy {
    /// Rewrite the query text with the dialect's limit clause.
    Alter,
    /// Fetch rows by absolute number starting at `from`.
    EmulateSeek,
    /// Fetch and discard the first `from` rows.
    SkipRows,
}

/// How a result's row count is obtained.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NumRowsStrategy {
    /// The native engine reports row counts.
    Native,
    /// Re-run the query and count the fetched rows.
    Emulate,
    /// Wrap the query in `SELECT COUNT(*) FROM (...)`.
    Subquery,
}

/// Whether sequences are a native object or a side table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SequenceStrategy {
    Native,
    Emulated,
}

/// Static per-backend description of native versus emulated features.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Capabilities {
    pub limit: LimitStrategy,
    pub numrows: NumRowsStrategy,
    pub prepare: bool,
    pub transactions: bool,
    pub ssl: bool,
    pub pconnect: bool,
    /// The native engine can fetch a row by absolute number.
    pub absolute_fetch: bool,
    /// Unconditional DELETEs report zero affected rows unless rewritten.
    pub delete_count_rewrite: bool,
    pub sequences: SequenceStrategy,
}

impl Backend {
    /// The capability descriptor for this engine.
    pub fn capabilities(self) -> Capabilities {
        use Backend::*;
        use LimitStrategy::*;
        use NumRowsStrategy::*;
        match self {
            MySql => Capabilities {
                limit: Alter,
                numrows: Native,
                prepare: false,
                transactions: true,
                ssl: true,
                pconnect: true,
                absolute_fetch: true,
                delete_count_rewrite: true,
                sequences: SequenceStrategy::Emulated,
            },
            Postgres => Capabilities {
                limit: Alter,
                numrows: Native,
                prepare: false,
                transactions: true,
                ssl: true,
                pconnect: true,
                absolute_fetch: true,
                delete_count_rewrite: false,
                sequences: SequenceStrategy::Native,
            },
            Oracle => Capabilities {
                limit: Alter,
                numrows: Subquery,
                prepare: true,
                transactions: true,
                ssl: false,
                pconnect: true,
                absolute_fetch: false,
                delete_count_rewrite: false,
                sequences: SequenceStrategy::Native,
            },
            SqlServer => Capabilities {
                limit: EmulateSeek,
                numrows: Native,
                prepare: false,
                transactions: true,
                ssl: false,
                pconnect: true,
                absolute_fetch: true,
                delete_count_rewrite: false,
                sequences: SequenceStrategy::Emulated,
            },
            Sqlite => Capabilities {
                limit: Alter,
                numrows: Native,
                prepare: false,
                transactions: true,
                ssl: false,
                pconnect: true,
                absolute_fetch: false,
                delete_count_rewrite: true,
                sequences: SequenceStrategy::Emulated,
            },
            Informix => Capabilities {
                limit: SkipRows,
                numrows: Emulate,
                prepare: false,
                transactions: true,
                ssl: false,
                pconnect: true,
                absolute_fetch: false,
                delete_count_rewrite: false,
                sequences: SequenceStrategy::Emulated,
            },
            Interbase => Capabilities {
                limit: Alter,
                numrows: Emulate,
                prepare: true,
                transactions: true,
                ssl: false,
                pconnect: true,
                absolute_fetch: false,
                delete_count_rewrite: false,
                sequences: SequenceStrategy::Native,
            },
            Dbase => Capabilities {
                limit: EmulateSeek,
                numrows: Native,
                prepare: false,
                transactions: false,
                ssl: false,
                pconnect: false,
                absolute_fetch: true,
                delete_count_rewrite: false,
                sequences: SequenceStrategy::Emulated,
            },
            Msql => Capabilities {
                limit: EmulateSeek,
                numrows: Native,
                prepare: false,
                transactions: false,
                ssl: false,
                pconnect: true,
                absolute_fetch: true,
                delete_count_rewrite: false,
                sequences: SequenceStrategy::Emulated,
            },
            Odbc => Capabilities {
                limit: SkipRows,
                numrows: Emulate,
                prepare: true,
                transactions: true,
                ssl: false,
                pconnect: true,
                absolute_fetch: false,
                delete_count_rewrite: false,
                sequences: SequenceStrategy::Emulated,
            },
            FrontBase => Capabilities {
                limit: Alter,
                numrows: Native,
                prepare: false,
                transactions: true,
                ssl: false,
                pconnect: true,
                absolute_fetch: true,
                delete_count_rewrite: true,
                sequences: SequenceStrategy::Emulated,
            },
        }
    }

    /// Quote an identifier per this dialect's delimiters.
    pub fn quote_identifier(self, name: &str) -> String {
        match self {
            Backend::MySql => format!("`{}`", name.replace('`', "``")),
            Backend::SqlServer | Backend::Odbc => {
                format!("[{}]", name.replace(']', "]]"))
            }
            _ => format!("\"{}\"", name.replace('"', "\"\"")),
        }
    }

    /// Escape a string for inclusion inside single quotes.
    pub fn escape(self, s: &str) -> String {
        match self {
            // Backslash is an escape character in these engines.
            Backend::MySql | Backend::Postgres => {
                s.replace('\\', "\\\\").replace('\'', "''")
            }
            _ => s.replace('\'', "''"),
        }
    }

    /// The literal spelling of a boolean in this dialect.
    pub fn bool_literal(self, value: bool) -> &'static str {
        match self {
            Backend::Postgres | Backend::FrontBase => {
                if value { "TRUE" } else { "FALSE" }
            }
            Backend::Dbase => {
                if value { "'T'" } else { "'F'" }
            }
            _ => {
                if value { "1" } else { "0" }
            }
        }
    }

    /// Render a parameter as a safe SQL literal.
    pub fn quote_smart(self, value: &SqlValue) -> String {
        match value {
            SqlValue::Null => "NULL".to_string(),
            SqlValue::Bool(b) => self.bool_literal(*b).to_string(),
            SqlValue::Int(n) => n.to_string(),
            SqlValue::Float(n) => n.to_string(),
            SqlValue::Str(s) => format!("'{}'", self.escape(s)),
        }
    }

    /// Rewrite `query` to select the window [`from`, `from + count`).
    ///
    /// Only meaningful for [`LimitStrategy::Alter`] backends; others return
    /// `None` and the window is applied at fetch time.
    pub fn modify_limit(self, query: &str, from: usize, count: usize, is_manip: bool) -> Option<String> {
        match self {
            Backend::MySql => Some(if is_manip {
                format!("{query} LIMIT {count}")
            } else {
                format!("{query} LIMIT {from}, {count}")
            }),
            Backend::Postgres | Backend::Sqlite => {
                Some(format!("{query} LIMIT {count} OFFSET {from}"))
            }
            Backend::Oracle => Some(format!(
                "SELECT * FROM (SELECT a.*, ROWNUM dbport_rownum FROM ({query}) a \
                 WHERE ROWNUM <= {}) WHERE dbport_rownum > {from}",
                from + count
            )),
            Backend::Interbase => {
                let rest = query.trim_start();
                let lowered = rest.to_lowercase();
                lowered.strip_prefix("select").map(|_| {
                    format!("SELECT FIRST {count} SKIP {from}{}", &rest["select".len()..])
                })
            }
            Backend::FrontBase => {
                let rest = query.trim_start();
                let lowered = rest.to_lowercase();
                lowered.strip_prefix("select").map(|_| {
                    format!("SELECT TOP({from}, {count}){}", &rest["select".len()..])
                })
            }
            _ => None,
        }
    }

    /// SQL emitted before the first manipulation statement of a transaction.
    pub fn begin_sql(self) -> &'static str {
        match self {
            Backend::SqlServer => "BEGIN TRANSACTION",
            _ => "BEGIN",
        }
    }

    pub fn commit_sql(self) -> &'static str {
        "COMMIT"
    }

    pub fn rollback_sql(self) -> &'static str {
        "ROLLBACK"
    }

    // ---- sequence templates -------------------------------------------------

    /// Query returning the next value of a native sequence.
    pub fn seq_next_sql(self, name: &str) -> Option<String> {
        match self {
            Backend::Postgres => Some(format!("SELECT NEXTVAL('{name}')")),
            Backend::Oracle => Some(format!("SELECT {name}.nextval FROM dual")),
            Backend::Interbase => Some(format!("SELECT GEN_ID({name}, 1) FROM RDB$DATABASE")),
            _ => None,
        }
    }

    /// Atomic increment statement for an emulated sequence table.  The new
    /// value must be readable through the engine's last-inserted-id call.
    pub fn seq_increment_sql(self, table: &str) -> String {
        match self {
            Backend::MySql => format!("UPDATE {table} SET id = LAST_INSERT_ID(id + 1)"),
            Backend::Sqlite => format!("INSERT INTO {table} (id) VALUES (NULL)"),
            Backend::SqlServer => format!("INSERT INTO {table} (vapor) VALUES (0)"),
            _ => format!("INSERT INTO {table} (id) VALUES (NULL)"),
        }
    }

    /// Statement seeding an empty emulated sequence table, where the
    /// increment statement needs an existing row.
    pub fn seq_seed_sql(self, table: &str) -> Option<String> {
        match self {
            Backend::MySql => Some(format!("INSERT INTO {table} (id) VALUES (0)")),
            _ => None,
        }
    }

    /// DDL creating the sequence object or its backing table.
    pub fn seq_create_sql(self, name: &str) -> String {
        match self {
            Backend::Postgres => format!("CREATE SEQUENCE {name}"),
            Backend::Oracle => format!("CREATE SEQUENCE {name}"),
            Backend::Interbase => format!("CREATE GENERATOR {name}"),
            Backend::MySql => format!(
                "CREATE TABLE {name} (id INTEGER UNSIGNED AUTO_INCREMENT NOT NULL, PRIMARY KEY(id))"
            ),
            Backend::Sqlite => {
                format!("CREATE TABLE {name} (id INTEGER PRIMARY KEY AUTOINCREMENT NOT NULL)")
            }
            Backend::SqlServer => format!(
                "CREATE TABLE {name} (id INT IDENTITY(1,1) NOT NULL PRIMARY KEY, vapor INT NULL)"
            ),
            _ => format!("CREATE TABLE {name} (id INTEGER NOT NULL)"),
        }
    }

    /// DDL dropping the sequence object or its backing table.
    pub fn seq_drop_sql(self, name: &str) -> String {
        match self {
            Backend::Postgres | Backend::Oracle => format!("DROP SEQUENCE {name}"),
            Backend::Interbase => format!("DROP GENERATOR {name}"),
            _ => format!("DROP TABLE {name}"),
        }
    }

    /// Lock/unlock statements bracketing a sequence repair, where the
    /// engine offers one.
    pub fn seq_lock_sql(self, table: &str) -> Option<(String, String)> {
        match self {
            Backend::MySql => Some((
                format!("LOCK TABLES {table} WRITE"),
                "UNLOCK TABLES".to_string(),
            )),
            _ => None,
        }
    }

    // ---- catalog listings ---------------------------------------------------

    /// Query template listing catalog objects of `kind`
    /// (tables/views/users/databases/functions), where supported.
    pub fn special_query(self, kind: &str) -> Option<String> {
        let sql = match (self, kind) {
            (Backend::Postgres, "tables") => {
                "SELECT c.relname AS \"Name\" FROM pg_class c \
                 WHERE c.relkind = 'r' \
                 AND NOT EXISTS (SELECT 1 FROM pg_views WHERE viewname = c.relname) \
                 AND c.relname !~ '^(pg_|sql_)'"
            }
            (Backend::Postgres, "views") => {
                "SELECT viewname FROM pg_views \
                 WHERE schemaname NOT IN ('information_schema', 'pg_catalog')"
            }
            (Backend::Postgres, "users") => "SELECT usename FROM pg_user",
            (Backend::Postgres, "databases") => "SELECT datname FROM pg_database",
            (Backend::Postgres, "functions") => {
                "SELECT proname FROM pg_proc WHERE proowner <> 1"
            }
            (Backend::MySql, "tables") => "SHOW TABLES",
            (Backend::MySql, "databases") => "SHOW DATABASES",
            (Backend::MySql, "users") => "SELECT DISTINCT User FROM mysql.user",
            (Backend::Sqlite, "tables") => {
                "SELECT name FROM sqlite_master WHERE type='table' ORDER BY name"
            }
            (Backend::Sqlite, "views") => {
                "SELECT name FROM sqlite_master WHERE type='view' ORDER BY name"
            }
            (Backend::SqlServer, "tables") => {
                "SELECT name FROM sysobjects WHERE type = 'U' ORDER BY name"
            }
            (Backend::SqlServer, "views") => {
                "SELECT name FROM sysobjects WHERE type = 'V' ORDER BY name"
            }
            (Backend::SqlServer, "databases") => "SELECT name FROM master..sysdatabases",
            (Backend::Oracle, "tables") => "SELECT table_name FROM user_tables",
            (Backend::Interbase, "tables") => {
                "SELECT DISTINCT RDB$RELATION_NAME FROM RDB$RELATION_FIELDS \
                 WHERE RDB$SYSTEM_FLAG = 0"
            }
            (Backend::Informix, "tables") => {
                "SELECT tabname FROM systables WHERE tabid >= 100"
            }
            (Backend::Msql, "tables") => "SHOW TABLES",
            (Backend::FrontBase, "tables") => {
                "SELECT \"table_name\" FROM information_schema.tables"
            }
            _ => return None,
        };
        Some(sql.to_string())
    }
}

impl fmt::Display for Backend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Backend::MySql => "mysql",
            Backend::Postgres => "pgsql",
            Backend::Oracle => "oci8",
            Backend::SqlServer => "mssql",
            Backend::Sqlite => "sqlite",
            Backend::Informix => "ifx",
            Backend::Interbase => "ibase",
            Backend::Dbase => "dbase",
            Backend::Msql => "msql",
            Backend::Odbc => "odbc",
            Backend::FrontBase => "fbsql",
        };
        f.write_str(name)
    }
}

impl FromStr for Backend {
    type Err = DbError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "mysql" | "mysqli" => Ok(Backend::MySql),
            "pgsql" | "postgres" | "postgresql" => Ok(Backend::Postgres),
            "oci8" | "oracle" => Ok(Backend::Oracle),
            "mssql" | "sqlsrv" => Ok(Backend::SqlServer),
            "sqlite" => Ok(Backend::Sqlite),
            "ifx" | "informix" => Ok(Backend::Informix),
            "ibase" | "interbase" | "firebird" => Ok(Backend::Interbase),
            "dbase" => Ok(Backend::Dbase),
            "msql" => Ok(Backend::Msql),
            "odbc" => Ok(Backend::Odbc),
            "fbsql" | "frontbase" => Ok(Backend::FrontBase),
            other => Err(DbError::new(ErrorKind::InvalidDsn)
                .with_native_message(format!("unknown engine: {other}"))),
        }
    }
}

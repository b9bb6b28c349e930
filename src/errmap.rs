//! Native error classification tables.
//!
//! Each backend carries a mapping from its native error surface (numeric
//! codes or message patterns) to the portable [`ErrorKind`] taxonomy.  The
//! first matching rule wins; anything unmatched stays [`ErrorKind::Unknown`]
//! with the native context preserved.

use regex::Regex;

use crate::backend::Backend;
use crate::error::{DbError, DbResult, ErrorKind};
use crate::portability::Portability;

/// One classification rule.
#[derive(Debug, Clone)]
pub enum Matcher {
    /// Match the native numeric error code exactly.
    Code(i64),
    /// Match the native error message against a pattern.
    Pattern(Regex),
}

/// Ordered classification table for one backend.
#[derive(Debug, Clone)]
pub struct ErrorMap {
    backend: Backend,
    rules: Vec<(Matcher, ErrorKind)>,
}

fn code_rules(table: &[(i64, ErrorKind)]) -> Vec<(Matcher, ErrorKind)> {
    table
        .iter()
        .map(|&(code, kind)| (Matcher::Code(code), kind))
        .collect()
}

fn pattern_rules(table: &[(&str, ErrorKind)]) -> DbResult<Vec<(Matcher, ErrorKind)>> {
    table
        .iter()
        .map(|&(pattern, kind)| {
            let re = Regex::new(pattern).map_err(|e| {
                DbError::new(ErrorKind::Invalid)
                    .with_native_message(format!("bad error pattern {pattern:?}: {e}"))
            })?;
            Ok((Matcher::Pattern(re), kind))
        })
        .collect()
}

impl ErrorMap {
    /// Build the classification table for `backend`.
    pub fn for_backend(backend: Backend) -> DbResult<ErrorMap> {
        use ErrorKind::*;
        let rules = match backend {
            Backend::MySql => code_rules(&[
                (1004, CannotCreate),
                (1005, CannotCreate),
                (1006, CannotCreate),
                (1007, AlreadyExists),
                (1008, CannotDrop),
                (1022, AlreadyExists),
                (1044, AccessViolation),
                (1046, NoDatabaseSelected),
                (1048, ConstraintNotNull),
                (1049, NoSuchDatabase),
                (1050, AlreadyExists),
                (1051, NoSuchTable),
                (1054, NoSuchField),
                (1061, AlreadyExists),
                (1062, AlreadyExists),
                (1064, Syntax),
                (1091, NotFound),
                (1100, NotLocked),
                (1136, ValueCountOnRow),
                (1142, AccessViolation),
                (1146, NoSuchTable),
                (1216, Constraint),
                (1217, Constraint),
            ]),
            Backend::Oracle => code_rules(&[
                (1, Constraint),
                (900, Syntax),
                (904, NoSuchField),
                (913, ValueCountOnRow),
                (921, Syntax),
                (923, Syntax),
                (942, NoSuchTable),
                (955, AlreadyExists),
                (1400, ConstraintNotNull),
                (1401, Invalid),
                (1407, ConstraintNotNull),
                (1418, NotFound),
                (1476, DivisionByZero),
                (1722, InvalidNumber),
                (2289, NoSuchTable),
                (2291, Constraint),
                (2292, Constraint),
                (2449, Constraint),
            ]),
            Backend::Postgres => pattern_rules(&[
                (r"(relation|sequence|table).*does not exist|class .* not found", NoSuchTable),
                (r"index .* does not exist", NotFound),
                (r"column .* does not exist", NoSuchField),
                (r"relation .* already exists", AlreadyExists),
                (r"(divide|division) by zero", DivisionByZero),
                (r"pg_atoi: error in .*: can't parse ", InvalidNumber),
                (r"invalid input syntax for( type)? (integer|numeric)", InvalidNumber),
                (r"value .* is out of range for type \w*int", InvalidNumber),
                (r"integer out of range", InvalidNumber),
                (r"value too long for type character", Invalid),
                (r"attribute .* not found|relation .* does not have attribute", NoSuchField),
                (r"column .* specified in USING clause does not exist in (left|right) table", NoSuchField),
                (r"parser: parse error at or near", Syntax),
                (r"syntax error at", Syntax),
                (r"column reference .* is ambiguous", Syntax),
                (r"permission denied", AccessViolation),
                (r"violates not-null constraint", ConstraintNotNull),
                (r"violates [\w ]+ constraint", Constraint),
                (r"referential integrity violation", Constraint),
                (r"more expressions than target columns", ValueCountOnRow),
            ])?,
            Backend::Sqlite => pattern_rules(&[
                (r"no such table:|no such index:", NoSuchTable),
                (r"no such column:", NoSuchField),
                (r"table .* already exists|index .* already exists", AlreadyExists),
                (r"near .*: syntax error", Syntax),
                (r"is not unique|UNIQUE constraint failed", Constraint),
                (r"may not be NULL|NOT NULL constraint failed", ConstraintNotNull),
                (r"(\d+) values for (\d+) columns", ValueCountOnRow),
                (r"unable to open database", ConnectFailed),
                (r"attempt to write a readonly database", AccessViolation),
            ])?,
            Backend::SqlServer => code_rules(&[
                (102, Syntax),
                (110, ValueCountOnRow),
                (155, NoSuchField),
                (156, Syntax),
                (170, Syntax),
                (207, NoSuchField),
                (208, NoSuchTable),
                (245, InvalidNumber),
                (515, ConstraintNotNull),
                (547, Constraint),
                (1913, AlreadyExists),
                (2627, Constraint),
                (2714, AlreadyExists),
                (3701, NoSuchTable),
                (8134, DivisionByZero),
            ]),
            Backend::Interbase => code_rules(&[
                (-104, Syntax),
                (-150, AccessViolation),
                (-151, AccessViolation),
                (-155, NoSuchTable),
                (-157, NoSuchField),
                (-158, ValueCountOnRow),
                (-170, Mismatch),
                (-204, Invalid),
                (-205, NoSuchField),
                (-206, NoSuchField),
                (-208, Invalid),
                (-219, NoSuchTable),
                (-297, Constraint),
                (-530, Constraint),
                (-607, CannotDrop),
                (-803, Constraint),
                (-804, ValueCountOnRow),
                (-904, ConnectFailed),
                (-922, NoSuchDatabase),
                (-923, ConnectFailed),
                (-924, ConnectFailed),
            ]),
            Backend::Informix => code_rules(&[
                (-201, Syntax),
                (-206, NoSuchTable),
                (-217, NoSuchField),
                (-236, ValueCountOnRow),
                (-239, Constraint),
                (-253, Syntax),
                (-292, ConstraintNotNull),
                (-310, AlreadyExists),
                (-316, AlreadyExists),
                (-319, NotFound),
                (-329, NoDatabaseSelected),
                (-346, Constraint),
                (-386, ConstraintNotNull),
                (-391, ConstraintNotNull),
                (-554, Syntax),
                (-691, Constraint),
                (-692, Constraint),
                (-703, ConstraintNotNull),
                (-1204, InvalidDate),
                (-1205, InvalidDate),
                (-1206, InvalidDate),
                (-1209, InvalidDate),
                (-1210, InvalidDate),
                (-1212, InvalidDate),
                (-1213, InvalidNumber),
            ]),
            Backend::Msql => pattern_rules(&[
                (r"Access to database denied", AccessViolation),
                (r"Bad index name", CannotCreate),
                (r"Bad order field", Syntax),
                (r"Bad type for comparison", Syntax),
                (r"Can't perform LIKE on", Syntax),
                (r"Can't use TEXT fields in LIKE comparison", Syntax),
                (r"Couldn't create temporary table", CannotCreate),
                (r"Error creating table file", CannotCreate),
                (r"Field .* cannot be null$", ConstraintNotNull),
                (r"Index (field|condition) .* cannot be null$", Syntax),
                (r"Invalid date format", InvalidDate),
                (r"Invalid time format", InvalidDate),
                (r"Literal value for .* is wrong type$", InvalidNumber),
                (r"No Database Selected", NoDatabaseSelected),
                (r"No value specified for field", ValueCountOnRow),
                (r"Non unique value for unique index", Constraint),
                (r"Out of memory for temporary table", CannotCreate),
                (r"Permission denied", AccessViolation),
                (r"Reference to un-selected table", Syntax),
                (r"syntax error", Syntax),
                (r"Table .* exists$", AlreadyExists),
                (r"Unknown database", NoSuchDatabase),
                (r"Unknown field", NoSuchField),
                (r"Unknown (index|system variable)", NotFound),
                (r"Unknown table", NoSuchTable),
                (r"Unqualified field", Syntax),
            ])?,
            // ODBC reports five-character SQLSTATEs, not driver codes;
            // they arrive embedded in the message text.
            Backend::Odbc => pattern_rules(&[
                (r"\b01004\b", Truncated),
                (r"\b07001\b", Mismatch),
                (r"\b21S01\b", ValueCountOnRow),
                (r"\b21S02\b", Mismatch),
                (r"\b22001\b", Invalid),
                (r"\b22003\b", InvalidNumber),
                (r"\b22005\b", InvalidNumber),
                (r"\b22008\b", InvalidDate),
                (r"\b22012\b", DivisionByZero),
                (r"\b23502\b", ConstraintNotNull),
                (r"\b2350[345]\b", Constraint),
                (r"\b23000\b", Constraint),
                (r"\b24000\b", Invalid),
                (r"\b34000\b", Invalid),
                (r"\b37000\b", Syntax),
                (r"\b42000\b", Syntax),
                (r"\bIM001\b", NotCapable),
                (r"\bS0000\b", NoSuchTable),
                (r"\bS0001\b", AlreadyExists),
                (r"\bS0002\b", NoSuchTable),
                (r"\bS0011\b", AlreadyExists),
                (r"\bS0012\b", NotFound),
                (r"\bS0021\b", AlreadyExists),
                (r"\bS0022\b", NoSuchField),
                (r"\bS1009\b", Invalid),
            ])?,
            Backend::Dbase => code_rules(&[]),
            Backend::FrontBase => code_rules(&[
                (22, Syntax),
                (85, AlreadyExists),
                (108, Syntax),
                (116, NoSuchTable),
                (124, NoSuchField),
                (215, ConstraintNotNull),
                (217, InvalidNumber),
                (226, NoSuchField),
                (231, Invalid),
                (239, Truncated),
                (361, Constraint),
                (362, Constraint),
                (1666, ConnectFailed),
            ]),
        };
        Ok(ErrorMap { backend, rules })
    }

    /// Classify a native error into the portable taxonomy.
    ///
    /// When the `ERRORS` portability flag is on, kinds that a backend
    /// reports more loosely than its peers are tightened to the common
    /// meaning.
    pub fn classify(
        &self,
        code: Option<i64>,
        message: &str,
        portability: Portability,
    ) -> ErrorKind {
        let mut kind = self.lookup(code, message);
        if portability.contains(Portability::ERRORS) {
            kind = match (self.backend, kind) {
                // 1022/1062 are constraint violations, not DDL name clashes.
                (Backend::MySql, ErrorKind::AlreadyExists)
                    if matches!(code, Some(1022) | Some(1062)) =>
                {
                    ErrorKind::Constraint
                }
                (Backend::Odbc, ErrorKind::Mismatch) => ErrorKind::NoSuchField,
                (_, kind) => kind,
            };
        }
        kind
    }

    fn lookup(&self, code: Option<i64>, message: &str) -> ErrorKind {
        for (matcher, kind) in &self.rules {
            let hit = match matcher {
                Matcher::Code(c) => code == Some(*c),
                Matcher::Pattern(re) => re.is_match(message),
            };
            if hit {
                return *kind;
            }
        }
        ErrorKind::Unknown
    }
}

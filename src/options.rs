//! Run-time connection options.
//!
//! Options are stored in a typed struct but are also reachable through the
//! string-keyed [`Options::set`]/[`Options::get`] interface so callers can
//! drive them from configuration.  Unknown option names are an error, never
//! a silent no-op.

use serde::{Deserialize, Serialize};

use crate::error::{DbError, DbResult, ErrorKind};
use crate::portability::Portability;

/// A dynamically-typed option value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum OptionValue {
    Int(i64),
    Bool(bool),
    Str(String),
}

impl From<i64> for OptionValue {
    fn from(v: i64) -> Self {
        OptionValue::Int(v)
    }
}

impl From<bool> for OptionValue {
    fn from(v: bool) -> Self {
        OptionValue::Bool(v)
    }
}

impl From<&str> for OptionValue {
    fn from(v: &str) -> Self {
        OptionValue::Str(v.to_string())
    }
}

impl From<Portability> for OptionValue {
    fn from(v: Portability) -> Self {
        OptionValue::Int(v.bits() as i64)
    }
}

/// The recognized connection options and their defaults.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Options {
    /// Prefetch size for buffered results.
    pub result_buffering: i64,
    /// Request a persistent native connection.
    pub persistent: bool,
    /// Request an SSL-encrypted native connection.
    pub ssl: bool,
    /// Debug level, recorded for diagnostics.
    pub debug: i64,
    /// Format string (one `%s`) mapping logical to physical sequence names.
    pub seqname_format: String,
    /// Free result cursors automatically at end-of-data.
    pub autofree: bool,
    /// Active portability normalization flags.
    pub portability: Portability,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            result_buffering: 500,
            persistent: false,
            ssl: false,
            debug: 0,
            seqname_format: "%s_seq".to_string(),
            autofree: false,
            portability: Portability::NONE,
        }
    }
}

impl Options {
    /// Set an option by name.
    ///
    /// The value must match the option's type; `portability` accepts an
    /// integer bitmask.  Unknown names report [`ErrorKind::Unknown`].
    pub fn set(&mut self, name: &str, value: OptionValue) -> DbResult<()> {
        match (name, value) {
            ("result_buffering", OptionValue::Int(n)) => self.result_buffering = n,
            ("persistent", OptionValue::Bool(b)) => self.persistent = b,
            ("ssl", OptionValue::Bool(b)) => self.ssl = b,
            ("debug", OptionValue::Int(n)) => self.debug = n,
            ("seqname_format", OptionValue::Str(s)) => {
                if s.matches("%s").count() != 1 {
                    return Err(DbError::new(ErrorKind::Invalid)
                        .with_native_message("seqname_format must contain exactly one %s"));
                }
                self.seqname_format = s;
            }
            ("autofree", OptionValue::Bool(b)) => self.autofree = b,
            ("portability", OptionValue::Int(n)) => {
                self.portability = Portability::from_bits(n as u32);
            }
            (
                "result_buffering" | "persistent" | "ssl" | "debug" | "seqname_format"
                | "autofree" | "portability",
                _,
            ) => {
                return Err(DbError::new(ErrorKind::Invalid)
                    .with_native_message(format!("wrong value type for option {name}")));
            }
            _ => {
                return Err(DbError::new(ErrorKind::Unknown)
                    .with_native_message(format!("unknown option {name}")));
            }
        }
        Ok(())
    }

    /// Get an option by name.  Unknown names report [`ErrorKind::Unknown`].
    pub fn get(&self, name: &str) -> DbResult<OptionValue> {
        match name {
            "result_buffering" => Ok(OptionValue::Int(self.result_buffering)),
            "persistent" => Ok(OptionValue::Bool(self.persistent)),
            "ssl" => Ok(OptionValue::Bool(self.ssl)),
            "debug" => Ok(OptionValue::Int(self.debug)),
            "seqname_format" => Ok(OptionValue::Str(self.seqname_format.clone())),
            "autofree" => Ok(OptionValue::Bool(self.autofree)),
            "portability" => Ok(OptionValue::Int(self.portability.bits() as i64)),
            _ => Err(DbError::new(ErrorKind::Unknown)
                .with_native_message(format!("unknown option {name}"))),
        }
    }
}

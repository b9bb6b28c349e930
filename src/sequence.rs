//! Sequence emulation.
//!
//! Engines with native sequences (or generators) use them directly; the
//! rest get a one-column backing table whose auto-increment id plays the
//! part.  Either way callers see the same three operations: next id,
//! create, drop.

use tracing::debug;

use crate::adapter::NativeAdapter;
use crate::backend::SequenceStrategy;
use crate::engine::Connection;
use crate::error::{DbResult, ErrorKind};

fn sanitize(name: &str) -> String {
    name.chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '_' || c == '.' {
                c
            } else {
                '_'
            }
        })
        .collect()
}

impl<A: NativeAdapter> Connection<A> {
    /// Physical name of a logical sequence, per the `seqname_format`
    /// option.  Characters outside `[a-zA-Z0-9_.]` are replaced.
    pub fn sequence_name(&self, name: &str) -> String {
        self.options()
            .seqname_format
            .replacen("%s", &sanitize(name), 1)
    }

    /// Next value of the sequence.
    ///
    /// With `ondemand`, a missing sequence is created (and the call
    /// retried) instead of failing.
    pub fn next_id(&mut self, name: &str, ondemand: bool) -> DbResult<i64> {
        let seqname = self.sequence_name(name);
        match self.capabilities().sequences {
            SequenceStrategy::Native => self.next_id_native(name, &seqname, ondemand),
            SequenceStrategy::Emulated => self.next_id_emulated(name, &seqname, ondemand),
        }
    }

    /// Create the sequence (or its backing table).
    pub fn create_sequence(&mut self, name: &str) -> DbResult<()> {
        let seqname = self.sequence_name(name);
        debug!(backend = %self.backend(), sequence = %seqname, "creating sequence");
        let sql = self.backend().seq_create_sql(&seqname);
        self.run(&sql, &[])?;
        // Emulations that increment by UPDATE need a starting row.
        if let Some(seed) = self.backend().seq_seed_sql(&seqname) {
            self.run(&seed, &[])?;
        }
        Ok(())
    }

    /// Drop the sequence (or its backing table).
    pub fn drop_sequence(&mut self, name: &str) -> DbResult<()> {
        let seqname = self.sequence_name(name);
        debug!(backend = %self.backend(), sequence = %seqname, "dropping sequence");
        let sql = self.backend().seq_drop_sql(&seqname);
        self.run(&sql, &[])?;
        Ok(())
    }

    fn next_id_native(&mut self, name: &str, seqname: &str, ondemand: bool) -> DbResult<i64> {
        let sql = match self.backend().seq_next_sql(seqname) {
            Some(sql) => sql,
            None => return Err(self.error(ErrorKind::NotCapable)),
        };
        let mut created = false;
        loop {
            match self.get_one(&sql, &[]) {
                Ok(value) => return self.parse_sequence_value(value),
                Err(e)
                    if ondemand
                        && !created
                        && matches!(e.kind, ErrorKind::NoSuchTable | ErrorKind::NotFound) =>
                {
                    created = true;
                    self.create_sequence(name)?;
                }
                Err(e) => return Err(e),
            }
        }
    }

    fn next_id_emulated(&mut self, name: &str, seqname: &str, ondemand: bool) -> DbResult<i64> {
        let mut created = false;
        let mut seeded = false;
        loop {
            let sql = self.backend().seq_increment_sql(seqname);
            match self.run(&sql, &[]) {
                Ok(affected) => {
                    let id = if affected == 0 {
                        None
                    } else {
                        self.adapter_mut().raw_last_insert_id()
                    };
                    match id {
                        Some(id) if id != 0 => return Ok(id),
                        // Zero affected rows or a zero id both mean the
                        // starting row is gone; restore it once and retry.
                        _ if !seeded => {
                            if let Some(seed) = self.backend().seq_seed_sql(seqname) {
                                seeded = true;
                                self.seed_locked(seqname, &seed)?;
                                continue;
                            }
                            return Err(self.error(ErrorKind::NotCapable));
                        }
                        _ => return Err(self.error(ErrorKind::NotCapable)),
                    }
                }
                Err(e) if ondemand && !created && e.kind == ErrorKind::NoSuchTable => {
                    created = true;
                    self.create_sequence(name)?;
                }
                Err(e) => return Err(e),
            }
        }
    }

    /// Run the seed statement under a table lock where the engine has
    /// one, releasing the lock even when the seed fails.
    fn seed_locked(&mut self, seqname: &str, seed: &str) -> DbResult<()> {
        match self.backend().seq_lock_sql(seqname) {
            Some((lock, unlock)) => {
                self.run(&lock, &[])?;
                let seeded = self.run(seed, &[]);
                let unlocked = self.run(&unlock, &[]);
                seeded?;
                unlocked?;
                Ok(())
            }
            None => {
                self.run(seed, &[])?;
                Ok(())
            }
        }
    }

    fn parse_sequence_value(&self, value: Option<String>) -> DbResult<i64> {
        value
            .and_then(|v| v.parse::<i64>().ok())
            .ok_or_else(|| self.error(ErrorKind::Invalid))
    }
}

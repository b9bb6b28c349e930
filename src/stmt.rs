//! Prepared statement templates and their storage.
//!
//! Templates use three placeholder sigils: `?` binds a quoted value, `!`
//! splices the value in raw, and `&` reads the value as a file name whose
//! contents are bound quoted.  A backslash before a sigil makes it a
//! literal character (the backslash is dropped); backslashes anywhere
//! else pass through untouched.  Sigils are recognized everywhere, string
//! literals included, so a literal `?` inside quotes must be escaped too.

use crate::error::{DbError, DbResult, ErrorKind};

/// How one placeholder consumes its parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamKind {
    /// `?` quote the value per the dialect.
    Scalar,
    /// `!` splice the value verbatim.
    Raw,
    /// `&` treat the value as a file path and bind the file contents.
    File,
}

/// A tokenized statement template.
///
/// `fragments` always has exactly one more entry than `kinds`; rendering
/// interleaves them.
#[derive(Debug, Clone, PartialEq)]
pub struct PreparedStatement {
    pub fragments: Vec<String>,
    pub kinds: Vec<ParamKind>,
    pub template: String,
}

impl PreparedStatement {
    pub fn param_count(&self) -> usize {
        self.kinds.len()
    }
}

/// Split `template` into literal fragments and placeholder kinds.
pub fn tokenize(template: &str) -> PreparedStatement {
    let mut fragments = Vec::new();
    let mut kinds = Vec::new();
    let mut current = String::new();
    let mut chars = template.chars();
    while let Some(c) = chars.next() {
        match c {
            '\\' => match chars.next() {
                Some(next @ ('?' | '!' | '&')) => current.push(next),
                Some(next) => {
                    current.push('\\');
                    current.push(next);
                }
                None => current.push('\\'),
            },
            '?' | '!' | '&' => {
                fragments.push(std::mem::take(&mut current));
                kinds.push(match c {
                    '?' => ParamKind::Scalar,
                    '!' => ParamKind::Raw,
                    _ => ParamKind::File,
                });
            }
            _ => current.push(c),
        }
    }
    fragments.push(current);
    PreparedStatement {
        fragments,
        kinds,
        template: template.to_string(),
    }
}

/// Opaque handle to a statement held in a [`StmtArena`].
///
/// Handles are generational: freeing a slot bumps its generation, so a
/// stale handle can never address a recycled statement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct StmtHandle {
    index: u32,
    generation: u32,
}

#[derive(Debug, Default)]
struct Slot {
    generation: u32,
    stmt: Option<PreparedStatement>,
}

/// Slab of prepared statements owned by a connection.
#[derive(Debug, Default)]
pub struct StmtArena {
    slots: Vec<Slot>,
    free: Vec<u32>,
}

impl StmtArena {
    pub fn insert(&mut self, stmt: PreparedStatement) -> StmtHandle {
        if let Some(index) = self.free.pop() {
            let slot = &mut self.slots[index as usize];
            slot.stmt = Some(stmt);
            StmtHandle {
                index,
                generation: slot.generation,
            }
        } else {
            let index = self.slots.len() as u32;
            self.slots.push(Slot {
                generation: 0,
                stmt: Some(stmt),
            });
            StmtHandle {
                index,
                generation: 0,
            }
        }
    }

    pub fn get(&self, handle: StmtHandle) -> DbResult<&PreparedStatement> {
        self.slots
            .get(handle.index as usize)
            .filter(|slot| slot.generation == handle.generation)
            .and_then(|slot| slot.stmt.as_ref())
            .ok_or_else(|| {
                DbError::new(ErrorKind::NotFound)
                    .with_native_message("no such prepared statement")
            })
    }

    /// Free a statement.  Stale or double frees report [`ErrorKind::NotFound`].
    pub fn remove(&mut self, handle: StmtHandle) -> DbResult<()> {
        let slot = self
            .slots
            .get_mut(handle.index as usize)
            .filter(|slot| slot.generation == handle.generation && slot.stmt.is_some())
            .ok_or_else(|| {
                DbError::new(ErrorKind::NotFound)
                    .with_native_message("no such prepared statement")
            })?;
        slot.stmt = None;
        slot.generation = slot.generation.wrapping_add(1);
        self.free.push(handle.index);
        Ok(())
    }
}

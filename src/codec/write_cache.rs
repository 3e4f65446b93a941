use crate::codec::varint::calculate_var_byte_length;
use crate::core::error::{Error, ErrorKind, Result};

/// Handle to a reserved, not yet known content length.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LengthSlot(usize);

/// Lengths and contexts gathered during the measure pass, replayed in the
/// same order during the write pass.
///
/// Both passes walk the value tree identically, so entries are consumed
/// strictly in the order they were produced. The cursors make that order
/// explicit: the write pass can only ever take the next entry.
#[derive(Debug)]
pub struct WriteCache<C> {
    lengths: Vec<Option<u32>>,
    contexts: Vec<C>,
    length_cursor: usize,
    context_cursor: usize,
}

impl<C> WriteCache<C> {
    pub fn new() -> Self {
        WriteCache {
            lengths: Vec::new(),
            contexts: Vec::new(),
            length_cursor: 0,
            context_cursor: 0,
        }
    }

    /// Reserve the next length. Call before measuring the content it covers.
    pub fn reserve_length(&mut self) -> LengthSlot {
        self.lengths.push(None);
        LengthSlot(self.lengths.len() - 1)
    }

    /// Fill a reserved slot; returns the byte size of its varint prefix.
    pub fn resolve_length(&mut self, slot: LengthSlot, length: usize) -> Result<usize> {
        let length = u32::try_from(length).map_err(|_| {
            Error::new(ErrorKind::InvalidInput, format!("content length {} exceeds u32", length))
        })?;
        let Some(entry) = self.lengths.get_mut(slot.0) else {
            return Err(Error::new(
                ErrorKind::InvalidState,
                format!("length slot {} was never reserved", slot.0),
            ));
        };
        if let Some(existing) = entry {
            return Err(Error::new(
                ErrorKind::InvalidState,
                format!("length slot {} already resolved to {}", slot.0, existing),
            ));
        }
        *entry = Some(length);
        Ok(calculate_var_byte_length(length as u64))
    }

    pub fn push_context(&mut self, context: C) {
        self.contexts.push(context);
    }

    pub fn next_length(&mut self) -> Result<u32> {
        let index = self.length_cursor;
        match self.lengths.get(index) {
            Some(Some(length)) => {
                self.length_cursor += 1;
                Ok(*length)
            }
            Some(None) => Err(Error::new(
                ErrorKind::InvalidState,
                format!("length slot {} read before it was resolved", index),
            )),
            None => Err(Error::new(
                ErrorKind::InvalidState,
                format!("write pass asked for length {} but only {} were measured", index, self.lengths.len()),
            )),
        }
    }

    pub fn next_context(&mut self) -> Result<&C> {
        let index = self.context_cursor;
        let context = self.contexts.get(index).ok_or_else(|| {
            Error::new(
                ErrorKind::InvalidState,
                format!("write pass asked for context {} but only {} were stored", index, self.contexts.len()),
            )
        })?;
        self.context_cursor += 1;
        Ok(context)
    }

    /// True once the write pass consumed everything the measure pass produced.
    pub fn is_drained(&self) -> bool {
        self.length_cursor == self.lengths.len() && self.context_cursor == self.contexts.len()
    }
}

impl<C> Default for WriteCache<C> {
    fn default() -> Self {
        Self::new()
    }
}

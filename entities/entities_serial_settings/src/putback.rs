//! Putback Module
//!
//! Single-slot pushback cell for an unbuffered device. A serial device cannot
//! rewind past bytes it has delivered, so "peek" is emulated by reading one
//! byte and parking it here until the caller consumes it.

/// Pushback cell state
///
/// Transitions:
/// - `Empty` --store/push--> `Pending`
/// - `Pending` --take--> `Empty`
/// - `Pending` --push--> rejected, stays `Pending`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Putback {
    #[default]
    Empty,
    Pending(u8),
}

impl Putback {
    /// True while a byte is waiting to be consumed
    pub fn is_pending(&self) -> bool {
        matches!(self, Putback::Pending(_))
    }

    /// Pending byte, without consuming it
    pub fn peek(&self) -> Option<u8> {
        match *self {
            Putback::Pending(byte) => Some(byte),
            Putback::Empty => None,
        }
    }

    /// Consume the pending byte, leaving the cell empty
    pub fn take(&mut self) -> Option<u8> {
        std::mem::take(self).peek()
    }

    /// Park a byte just read from the device
    ///
    /// Only called when the cell is known to be empty; the byte came off the
    /// wire and must not be lost.
    pub fn store(&mut self, byte: u8) {
        debug_assert!(!self.is_pending(), "pushback cell already occupied");
        *self = Putback::Pending(byte);
    }

    /// Push a caller-supplied byte back
    ///
    /// # Returns
    ///
    /// `Some(byte)` if the cell was empty and now holds `byte`, `None` if a
    /// byte is already pending (the pending byte is left untouched).
    pub fn push(&mut self, byte: u8) -> Option<u8> {
        match self {
            Putback::Pending(_) => None,
            Putback::Empty => {
                *self = Putback::Pending(byte);
                Some(byte)
            }
        }
    }

    /// Pending byte as a one-element slice, empty if nothing is pending
    pub fn as_slice(&self) -> &[u8] {
        match self {
            Putback::Pending(byte) => std::slice::from_ref(byte),
            Putback::Empty => &[],
        }
    }

    pub fn clear(&mut self) {
        *self = Putback::Empty;
    }
}

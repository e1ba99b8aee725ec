//! Error types for the `simconnect-models` crate.
//!
//! Every fallible codec operation and every `WireMessage` decode in this
//! crate returns a variant of [`ModelError`].

/// Errors produced while encoding or decoding host records.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ModelError {
    /// A read asked for more bytes than the buffer still holds.
    #[error("read of {requested} bytes out of range: {remaining} bytes remaining")]
    OutOfRange {
        /// Number of bytes the read needed.
        requested: usize,
        /// Number of bytes left after the cursor.
        remaining: usize,
    },

    /// A fixed-length string was requested with a length the host does not define.
    #[error("invalid fixed string length {length}: must be one of 8, 32, 64, 128, 256 or 260")]
    InvalidStringLength {
        /// The rejected length.
        length: usize,
    },

    /// A message header carried an id this crate does not know.
    #[error("unknown message id {id}")]
    UnknownMessageId {
        /// The raw id from the header.
        id: u32,
    },

    /// A typed decode was attempted on a message of another kind.
    #[error("expected message {expected}, got id {actual}")]
    UnexpectedMessage {
        /// The message kind the caller asked for.
        expected: String,
        /// The raw id found in the header.
        actual: u32,
    },

    /// The buffer is shorter than the message it claims to hold.
    #[error("truncated {message} message: expected {expected} bytes, got {actual}")]
    Truncated {
        /// The message kind being decoded.
        message: String,
        /// Size announced by the header or required by the layout.
        expected: usize,
        /// Bytes actually present.
        actual: usize,
    },

    /// A value could not be converted to the requested representation.
    #[error("invalid value \"{value}\": {reason}")]
    InvalidValue {
        /// The offending value, rendered as text.
        value: String,
        /// Human-readable explanation.
        reason: String,
    },
}

//! SDK error types.
//!
//! [`SdkError`] is the single error type returned by every fallible
//! operation in the SDK. Every outbound host call returns a
//! [`HostResult`], so builder chains short-circuit with `?` on the first
//! failure.

use simconnect_models::ModelError;

/// Error type for all SDK operations.
#[derive(Debug, thiserror::Error)]
pub enum SdkError {
    /// Invalid or missing configuration (bad INI section, bad env value).
    #[error("configuration error: {0}")]
    Config(String),

    /// An event id that was never handed out by the event registry.
    #[error("unknown event id {0}")]
    UnknownEventId(u32),

    /// A caller broke an API precondition.
    #[error("failed assertion: {0}")]
    FailedAssertion(String),

    /// The host (or the transport standing in for it) rejected a call.
    #[error("host call failed (hr {hr:#010x}): {message}")]
    Transport {
        /// Status code reported by the host.
        hr: i32,
        /// What was being attempted.
        message: String,
    },

    /// A host call was attempted on a closed connection.
    #[error("connection is not open")]
    NotOpen,

    /// Encoding or decoding a host record failed.
    #[error("data error: {0}")]
    Model(#[from] ModelError),

    /// Generic I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A stored file did not parse or could not be written as JSON.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl SdkError {
    /// Generic failure status, as used by transports without a better code.
    pub const E_FAIL: i32 = 0x8000_4005_u32 as i32;

    /// A transport failure with the generic status.
    pub fn transport(message: impl Into<String>) -> Self {
        Self::Transport {
            hr: Self::E_FAIL,
            message: message.into(),
        }
    }
}

/// Result of an outbound host call.
pub type HostResult<T> = Result<T, SdkError>;

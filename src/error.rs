//! Error taxonomy.
//!
//! Every layer gets its own enum so callers can tell "the socket is gone" from
//! "no pad is bound right now". None of these are fatal: the device layer
//! folds transport and session failures into [`DeviceError::NotFound`] or into
//! an empty read.

use std::io;

use thiserror::Error;

/// Socket-level failure.
#[derive(Debug, Error)]
pub enum TransportError {
    /// Creating, configuring or binding the socket failed.
    #[error("socket setup failed at `{stage}`: {source}")]
    Setup {
        stage: &'static str,
        #[source]
        source: io::Error,
    },

    /// The transport has not been opened (or was closed).
    #[error("transport is not open")]
    NotOpen,

    /// Nothing arrived within the receive timeout.
    #[error("receive timed out")]
    Timeout,

    /// Any other send/receive failure.
    #[error("socket I/O failed: {0}")]
    Io(#[from] io::Error),
}

impl TransportError {
    /// `true` for conditions that just mean "no data right now".
    pub fn is_timeout(&self) -> bool {
        matches!(self, TransportError::Timeout)
    }
}

/// A datagram that could not be decoded.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum DecodeError {
    #[error("unexpected response code {found} (wanted {expected})")]
    UnexpectedCode { expected: u8, found: u8 },

    #[error("unexpected state report sub-type {0}")]
    UnexpectedSubtype(u8),

    #[error("name length {len} does not fit in a {max}-byte payload")]
    NameLength { len: i32, max: usize },

    #[error("datagram truncated")]
    Truncated,
}

/// Outcome of a discovery/control exchange with the companion server.
#[derive(Debug, Error)]
pub enum SessionError {
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// The server answered with a different request code.
    #[error("protocol mismatch: expected response {expected}, got {found}")]
    ProtocolMismatch { expected: u8, found: u8 },

    /// The response was well-framed but its fields are out of bounds.
    #[error("malformed response: {0}")]
    Malformed(DecodeError),

    /// The server has no pad to hand out.
    #[error("no gamepad available")]
    NoDevice,

    /// A pad exists but is driven through the other transport type.
    #[error("gamepad {id} is bound to an incompatible transport (flags {flags:#04x})")]
    IncompatibleTransport { id: u32, flags: u8 },
}

impl SessionError {
    /// Conditions a consumer should see as "device not found".
    pub fn is_device_missing(&self) -> bool {
        matches!(
            self,
            SessionError::NoDevice | SessionError::IncompatibleTransport { .. }
        )
    }
}

impl From<DecodeError> for SessionError {
    fn from(err: DecodeError) -> Self {
        match err {
            DecodeError::UnexpectedCode { expected, found } => {
                SessionError::ProtocolMismatch { expected, found }
            }
            other => SessionError::Malformed(other),
        }
    }
}

/// Errors surfaced through the [`Device`](crate::device::Device) contract.
#[derive(Debug, Error)]
pub enum DeviceError {
    /// No usable gamepad (none bound, incompatible transport, or the server is unreachable).
    #[error("device not found")]
    NotFound,

    /// `read` called outside the acquired state.
    #[error("device is not acquired")]
    NotAcquired,

    /// The device was closed and can no longer be used.
    #[error("device is closed")]
    Closed,

    /// The requested property is not implemented by this device.
    #[error("property not supported")]
    Unsupported,

    /// Object lookup by id/offset failed.
    #[error("object not found")]
    ObjectNotFound,
}

impl From<SessionError> for DeviceError {
    fn from(_: SessionError) -> Self {
        DeviceError::NotFound
    }
}

impl From<TransportError> for DeviceError {
    fn from(_: TransportError) -> Self {
        DeviceError::NotFound
    }
}

/// Loading or saving a [`BridgeConfig`](crate::config::BridgeConfig).
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("config I/O failed: {0}")]
    Io(#[from] io::Error),

    #[error("TOML parse error: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("TOML serialize error: {0}")]
    Serialize(#[from] toml::ser::Error),
}

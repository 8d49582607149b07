//! Error types for rig control
//!
//! [`ParseError`] and [`EncodeError`] are codec-level failures. [`RigError`] is
//! what every session operation returns; codec errors fold into
//! [`RigError::Protocol`].

use thiserror::Error;

/// Errors that can occur while parsing a reply frame
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ParseError {
    /// Reply is shorter than the format requires
    #[error("incomplete data: need {needed} more bytes")]
    Incomplete { needed: usize },

    /// Invalid frame structure
    #[error("invalid frame: {0}")]
    InvalidFrame(String),

    /// Reply does not start with the expected tag
    #[error("unexpected reply tag: expected {expected:02X?}, got {actual:02X?}")]
    UnexpectedTag { expected: Vec<u8>, actual: Vec<u8> },

    /// Reply length is wrong for the command
    #[error("unexpected reply length: expected {expected}, got {actual}")]
    UnexpectedLength { expected: usize, actual: usize },

    /// Invalid BCD encoding
    #[error("invalid BCD digit: 0x{0:02X}")]
    InvalidBcd(u8),

    /// Invalid ASCII decimal field
    #[error("invalid decimal field: {0}")]
    InvalidDecimal(String),

    /// Invalid frequency value
    #[error("invalid frequency: {0}")]
    InvalidFrequency(String),

    /// Mode code the protocol does not define
    #[error("invalid mode: {0}")]
    InvalidMode(String),
}

/// Errors that can occur while building a command frame
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum EncodeError {
    /// Value does not fit the field width
    #[error("value {value} does not fit in {width} {unit}")]
    Overflow {
        value: u64,
        width: usize,
        unit: &'static str,
    },

    /// Value cannot be represented by the protocol at all
    #[error("unsupported value: {0}")]
    Unsupported(String),
}

/// Broad classification of a [`RigError`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Timeout or I/O failure on the port
    Transport,
    /// Malformed, mistagged or rejected reply
    Protocol,
    /// Operation or VFO not supported by the model
    Capability,
    /// Argument outside the model's declared bounds
    ValueRange,
    /// Session, configuration or internal failure
    Resource,
}

/// Errors returned by rig session operations
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RigError {
    /// Malformed argument
    #[error("invalid parameter: {0}")]
    InvalidParam(String),

    /// Invalid configuration token or value
    #[error("invalid configuration: {0}")]
    Config(String),

    /// Backend declares the operation but has no implementation
    #[error("function not implemented: {0}")]
    NotImplemented(String),

    /// No reply within the port timeout
    #[error("communication timed out")]
    Timeout,

    /// Port-level I/O failure
    #[error("IO error: {0}")]
    Io(String),

    /// Internal error (poisoned lock, broken invariant)
    #[error("internal error: {0}")]
    Internal(String),

    /// Reply failed validation
    #[error("protocol error: {0}")]
    Protocol(String),

    /// Device answered with a rejection
    #[error("command rejected by the rig: {0}")]
    Rejected(String),

    /// Model does not provide the operation
    #[error("feature not available: {0}")]
    NotAvailable(String),

    /// Model cannot address the requested VFO
    #[error("VFO not targetable: {0}")]
    NotTargetable(String),

    /// Argument outside the model's declared bounds
    #[error("argument out of domain: {0}")]
    OutOfRange(String),

    /// Session has no open port
    #[error("rig is not open")]
    NotOpen,
}

impl RigError {
    /// Stable numeric code, printed by the command line front end
    pub fn code(&self) -> i32 {
        match self {
            Self::InvalidParam(_) => 1,
            Self::Config(_) => 2,
            Self::NotImplemented(_) => 4,
            Self::Timeout => 5,
            Self::Io(_) => 6,
            Self::Internal(_) => 7,
            Self::Protocol(_) => 8,
            Self::Rejected(_) => 9,
            Self::NotAvailable(_) => 11,
            Self::NotTargetable(_) => 12,
            Self::OutOfRange(_) => 17,
            Self::NotOpen => 1,
        }
    }

    /// Classifies the error
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Timeout | Self::Io(_) => ErrorKind::Transport,
            Self::Protocol(_) | Self::Rejected(_) => ErrorKind::Protocol,
            Self::NotImplemented(_) | Self::NotAvailable(_) | Self::NotTargetable(_) => {
                ErrorKind::Capability
            }
            Self::InvalidParam(_) | Self::OutOfRange(_) => ErrorKind::ValueRange,
            Self::Config(_) | Self::Internal(_) | Self::NotOpen => ErrorKind::Resource,
        }
    }

    /// Whether the transaction engine may retry after this error
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Timeout | Self::Protocol(_))
    }
}

impl From<ParseError> for RigError {
    fn from(e: ParseError) -> Self {
        Self::Protocol(e.to_string())
    }
}

impl From<EncodeError> for RigError {
    fn from(e: EncodeError) -> Self {
        Self::OutOfRange(e.to_string())
    }
}

impl From<std::io::Error> for RigError {
    fn from(e: std::io::Error) -> Self {
        match e.kind() {
            std::io::ErrorKind::TimedOut | std::io::ErrorKind::WouldBlock => Self::Timeout,
            _ => Self::Io(e.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_codes_are_stable() {
        assert_eq!(RigError::InvalidParam(String::new()).code(), 1);
        assert_eq!(RigError::Timeout.code(), 5);
        assert_eq!(RigError::Protocol(String::new()).code(), 8);
        assert_eq!(RigError::NotAvailable(String::new()).code(), 11);
        assert_eq!(RigError::NotTargetable(String::new()).code(), 12);
        assert_eq!(RigError::OutOfRange(String::new()).code(), 17);
    }

    #[test]
    fn test_only_timeout_and_protocol_retry() {
        assert!(RigError::Timeout.is_retryable());
        assert!(RigError::Protocol("bad tag".into()).is_retryable());
        assert!(!RigError::Io("gone".into()).is_retryable());
        assert!(!RigError::Rejected("?;".into()).is_retryable());
    }

    #[test]
    fn test_parse_error_is_protocol() {
        let e: RigError = ParseError::InvalidBcd(0xAB).into();
        assert_eq!(e.kind(), ErrorKind::Protocol);
        assert!(e.to_string().contains("0xAB"));
    }

    #[test]
    fn test_io_timeout_maps_to_timeout() {
        let e: RigError = std::io::Error::new(std::io::ErrorKind::TimedOut, "t").into();
        assert_eq!(e, RigError::Timeout);
        let e: RigError = std::io::Error::new(std::io::ErrorKind::BrokenPipe, "p").into();
        assert_eq!(e.kind(), ErrorKind::Transport);
    }
}

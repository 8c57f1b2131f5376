//! WebSocket close codes
//!
//! RFC 6455 status codes seen on close frames, and which of them count as an
//! ordinary disconnect.

/// WebSocket close status codes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u16)]
pub enum CloseCode {
    /// Normal closure
    Normal = 1000,
    /// Endpoint is going away (page navigation, server shutdown)
    GoingAway = 1001,
    /// Protocol error
    ProtocolError = 1002,
    /// Received a data type it cannot accept
    Unsupported = 1003,
    /// Close frame carried no status code
    NoStatus = 1005,
    /// Connection dropped without a close frame
    Abnormal = 1006,
    /// Payload inconsistent with the message type
    InvalidPayload = 1007,
    /// Policy violation
    PolicyViolation = 1008,
    /// Message too big to process
    TooBig = 1009,
    /// Server hit an unexpected condition
    InternalError = 1011,
}

impl CloseCode {
    /// Create a `CloseCode` from a raw u16 value
    #[must_use]
    pub fn from_u16(value: u16) -> Option<Self> {
        match value {
            1000 => Some(Self::Normal),
            1001 => Some(Self::GoingAway),
            1002 => Some(Self::ProtocolError),
            1003 => Some(Self::Unsupported),
            1005 => Some(Self::NoStatus),
            1006 => Some(Self::Abnormal),
            1007 => Some(Self::InvalidPayload),
            1008 => Some(Self::PolicyViolation),
            1009 => Some(Self::TooBig),
            1011 => Some(Self::InternalError),
            _ => None,
        }
    }

    /// Get the raw u16 value
    #[must_use]
    pub const fn as_u16(self) -> u16 {
        self as u16
    }

    /// Whether a peer closing with this code is an ordinary disconnect
    /// rather than something worth an error log
    #[must_use]
    pub const fn is_expected(self) -> bool {
        matches!(
            self,
            Self::Normal | Self::GoingAway | Self::NoStatus | Self::Abnormal
        )
    }

    /// Classify a raw code; unknown codes are never expected
    #[must_use]
    pub fn is_expected_code(code: u16) -> bool {
        Self::from_u16(code).is_some_and(Self::is_expected)
    }
}

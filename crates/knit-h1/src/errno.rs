//! Tokenizer error codes
//!
//! Codes and messages match llhttp's `HPE_*` taxonomy.

/// Error code reported by the tokenizer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Errno {
    Ok = 0,
    Internal = 1,
    Strict = 2,
    LfExpected = 3,
    UnexpectedContentLength = 4,
    ClosedConnection = 5,
    InvalidMethod = 6,
    InvalidUrl = 7,
    InvalidConstant = 8,
    InvalidVersion = 9,
    InvalidHeaderToken = 10,
    InvalidContentLength = 11,
    InvalidChunkSize = 12,
    InvalidStatus = 13,
    InvalidEofState = 14,
    InvalidTransferEncoding = 15,
    Paused = 21,
    PausedUpgrade = 22,
    PausedH2Upgrade = 23,
    User = 24,
}

impl Errno {
    pub const ALL: [Errno; 20] = [
        Errno::Ok,
        Errno::Internal,
        Errno::Strict,
        Errno::LfExpected,
        Errno::UnexpectedContentLength,
        Errno::ClosedConnection,
        Errno::InvalidMethod,
        Errno::InvalidUrl,
        Errno::InvalidConstant,
        Errno::InvalidVersion,
        Errno::InvalidHeaderToken,
        Errno::InvalidContentLength,
        Errno::InvalidChunkSize,
        Errno::InvalidStatus,
        Errno::InvalidEofState,
        Errno::InvalidTransferEncoding,
        Errno::Paused,
        Errno::PausedUpgrade,
        Errno::PausedH2Upgrade,
        Errno::User,
    ];

    /// Look up a code
    pub fn from_code(code: u8) -> Option<Self> {
        Self::ALL.iter().copied().find(|e| *e as u8 == code)
    }

    /// Numeric code
    pub fn code(&self) -> u8 {
        *self as u8
    }

    /// Constant name, e.g. `HPE_INVALID_METHOD`
    pub fn name(&self) -> &'static str {
        match self {
            Errno::Ok => "HPE_OK",
            Errno::Internal => "HPE_INTERNAL",
            Errno::Strict => "HPE_STRICT",
            Errno::LfExpected => "HPE_LF_EXPECTED",
            Errno::UnexpectedContentLength => "HPE_UNEXPECTED_CONTENT_LENGTH",
            Errno::ClosedConnection => "HPE_CLOSED_CONNECTION",
            Errno::InvalidMethod => "HPE_INVALID_METHOD",
            Errno::InvalidUrl => "HPE_INVALID_URL",
            Errno::InvalidConstant => "HPE_INVALID_CONSTANT",
            Errno::InvalidVersion => "HPE_INVALID_VERSION",
            Errno::InvalidHeaderToken => "HPE_INVALID_HEADER_TOKEN",
            Errno::InvalidContentLength => "HPE_INVALID_CONTENT_LENGTH",
            Errno::InvalidChunkSize => "HPE_INVALID_CHUNK_SIZE",
            Errno::InvalidStatus => "HPE_INVALID_STATUS",
            Errno::InvalidEofState => "HPE_INVALID_EOF_STATE",
            Errno::InvalidTransferEncoding => "HPE_INVALID_TRANSFER_ENCODING",
            Errno::Paused => "HPE_PAUSED",
            Errno::PausedUpgrade => "HPE_PAUSED_UPGRADE",
            Errno::PausedH2Upgrade => "HPE_PAUSED_H2_UPGRADE",
            Errno::User => "HPE_USER",
        }
    }

    /// Human-readable description of the code
    pub fn message(&self) -> &'static str {
        match self {
            Errno::Ok => "Success",
            Errno::Internal => "Internal parser error",
            Errno::Strict => "Strict mode assertion failed",
            Errno::LfExpected => "Expected LF after CR",
            Errno::UnexpectedContentLength => "Unexpected content-length header",
            Errno::ClosedConnection => "Connection closed before message completed",
            Errno::InvalidMethod => "Invalid HTTP method",
            Errno::InvalidUrl => "Invalid URL",
            Errno::InvalidConstant => "Invalid constant string",
            Errno::InvalidVersion => "Invalid HTTP version",
            Errno::InvalidHeaderToken => "Invalid header token",
            Errno::InvalidContentLength => "Invalid content-length value",
            Errno::InvalidChunkSize => "Invalid chunk size",
            Errno::InvalidStatus => "Invalid status",
            Errno::InvalidEofState => "Invalid EOF state",
            Errno::InvalidTransferEncoding => "Invalid transfer-encoding",
            Errno::Paused => "Parser is paused",
            Errno::PausedUpgrade => "Parser is paused on upgrade",
            Errno::PausedH2Upgrade => "Parser is paused on H2 upgrade",
            Errno::User => "User callback error",
        }
    }

    /// Pause codes are not failures of the input
    pub fn is_pause(&self) -> bool {
        matches!(self, Errno::Paused | Errno::PausedUpgrade | Errno::PausedH2Upgrade)
    }
}

impl std::fmt::Display for Errno {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message())
    }
}

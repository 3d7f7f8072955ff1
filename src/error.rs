//! Error types.

use trust_dns_proto::error::ProtoError;
use trust_dns_proto::op::ResponseCode;
use trust_dns_proto::serialize::binary::DecodeError;

/// Error enumerates the ways processing an SRP update (or configuring the
/// server) can fail. Each update-processing variant maps onto a DNS response
/// code via [`Error::response_code`].
#[derive(thiserror::Error, Debug)]
pub enum Error {
    /// The message is not wire-well-formed: short buffer, bad OPT size,
    /// truncated record, wrong signature length.
    #[error("malformed DNS message")]
    Parse,

    /// The message parsed but violates SRP semantics: missing KEY, record
    /// class not matching the zone, an SRV without a service description.
    #[error("invalid SRP update")]
    Failed,

    /// Wrong zone, SIG(0) verification failure, or a key mismatch against a
    /// previously seen key for the same name.
    #[error("update failed security check")]
    Security,

    /// A host or service instance name is already registered under a
    /// different key.
    #[error("name is registered to another key")]
    Duplicated,

    /// A configured bound was exceeded (hosts, services, addresses, TXT
    /// length).
    #[error("out of resources")]
    NoBufs,

    /// Configuration was attempted while the server is not disabled.
    #[error("server must be disabled to change configuration")]
    InvalidState,

    /// Malformed configuration value.
    #[error("invalid configuration: {0}")]
    InvalidArgs(String),

    /// The update handler did not reply before the per-request timeout.
    #[error("service update handler timed out")]
    ResponseTimeout,

    /// The message is not for us (not a DNS UPDATE, or not ours on a shared
    /// socket); it is dropped without a response.
    #[error("message dropped")]
    Drop,

    /// A generic IO error (socket setup, settings store).
    #[error("an IO error occurred")]
    Io(#[from] std::io::Error),

    /// Invalid JSON while loading configuration or persisted state.
    #[error("invalid JSON")]
    InvalidJson(#[from] serde_json::Error),
}

impl From<ProtoError> for Error {
    fn from(_: ProtoError) -> Self {
        Error::Parse
    }
}

impl From<DecodeError> for Error {
    fn from(_: DecodeError) -> Self {
        Error::Parse
    }
}

impl Error {
    /// The RCODE sent to a direct client when an update fails with this
    /// error. Success responses never pass through here.
    pub fn response_code(&self) -> ResponseCode {
        match self {
            Error::NoBufs => ResponseCode::ServFail,
            Error::Parse => ResponseCode::FormErr,
            Error::Duplicated => ResponseCode::YXDomain,
            _ => ResponseCode::Refused,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rcode_mapping() {
        assert_eq!(Error::Parse.response_code(), ResponseCode::FormErr);
        assert_eq!(Error::NoBufs.response_code(), ResponseCode::ServFail);
        assert_eq!(Error::Duplicated.response_code(), ResponseCode::YXDomain);
        assert_eq!(Error::Failed.response_code(), ResponseCode::Refused);
        assert_eq!(Error::Security.response_code(), ResponseCode::Refused);
        assert_eq!(Error::ResponseTimeout.response_code(), ResponseCode::Refused);
    }
}

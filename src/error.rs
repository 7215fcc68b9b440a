use std::{error, fmt, io, result};

use picky_asn1_der::Asn1DerError;
use picky_krb::crypto::KerberosCryptoError;

pub type Result<T> = result::Result<T, Error>;

/// Failure classes of the KDC exchange.
///
/// `Kdc` is the only authoritative kind: it carries the protocol error
/// code of a well-formed KRB-ERROR issued by the KDC itself. Everything
/// else is diagnosed on the client side.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Address resolution, connect, send or receive failed.
    Transport,
    /// A socket deadline expired.
    Timeout,
    /// The KDC answered with a KRB-ERROR; the payload is the protocol error code.
    Kdc(u32),
    /// ASN.1 structure or application tag mismatch.
    Decode,
    /// Key derivation, keytab lookup, decryption or checksum failure.
    Crypto,
    /// A reply predicate of RFC 4120 3.1.5 / RFC 6806 11 did not hold.
    Validation,
    /// No KDC configured for the realm, or an empty response.
    Config,
}

/// Holds the [`ErrorKind`] and a description of the error.
#[derive(Debug, Clone)]
pub struct Error {
    pub error_type: ErrorKind,
    pub description: String,
}

impl Error {
    pub fn new(error_type: ErrorKind, description: impl Into<String>) -> Self {
        Self {
            error_type,
            description: description.into(),
        }
    }
}

impl error::Error for Error {}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}: {}", self.error_type, self.description)
    }
}

impl From<io::Error> for Error {
    fn from(err: io::Error) -> Self {
        let kind = match err.kind() {
            io::ErrorKind::TimedOut | io::ErrorKind::WouldBlock => ErrorKind::Timeout,
            _ => ErrorKind::Transport,
        };
        Self::new(kind, format!("IO error: {:?}", err))
    }
}

impl From<Asn1DerError> for Error {
    fn from(err: Asn1DerError) -> Self {
        Self::new(ErrorKind::Decode, format!("ASN.1 DER error: {:?}", err))
    }
}

impl From<KerberosCryptoError> for Error {
    fn from(err: KerberosCryptoError) -> Self {
        Self::new(ErrorKind::Crypto, format!("crypto error: {:?}", err))
    }
}

use picky_krb::messages::KrbError;

use crate::{Error, ErrorKind};

/// Attempts to classify reply bytes as a KRB-ERROR.
///
/// The KDC may answer any request with a KRB-ERROR in place of the
/// expected reply; `None` means the bytes are something else.
pub fn check_krb_error(data: &[u8]) -> Option<KrbError> {
    picky_asn1_der::from_bytes(data).ok()
}

pub(crate) fn error_code(error: &KrbError) -> u32 {
    error.0.error_code.0
}

impl From<KrbError> for Error {
    fn from(error: KrbError) -> Self {
        let code = error_code(&error);
        let description = match error.0.e_text.0.as_ref() {
            Some(e_text) => format!("KDC returned error code {}: {}", code, e_text.0.as_utf8()),
            None => format!("KDC returned error code {}", code),
        };
        Error::new(ErrorKind::Kdc(code), description)
    }
}

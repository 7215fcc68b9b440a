use std::fmt;

use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::{Error, ErrorKind, Result};

/// Wrapper that scrubs the inner value on drop and never reveals it
/// through `Debug`/`Display`.
#[derive(Zeroize, ZeroizeOnDrop, Eq, PartialEq, Default, Clone)]
pub struct Secret<T: Zeroize>(T);

impl<T: Zeroize> Secret<T> {
    pub fn new(inner: T) -> Self {
        Self(inner)
    }
}

impl<T: Zeroize> fmt::Debug for Secret<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Secret")
    }
}

impl<T: Zeroize> fmt::Display for Secret<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "(secret)")
    }
}

impl<T: Zeroize> AsRef<T> for Secret<T> {
    fn as_ref(&self) -> &T {
        &self.0
    }
}

impl<T: Zeroize> From<T> for Secret<T> {
    fn from(inner: T) -> Self {
        Self(inner)
    }
}

/// One long-term key of a service or user principal.
#[derive(Debug, Clone)]
pub struct KeytabEntry {
    /// Principal name components, e.g. `["alice"]` or `["HTTP", "web.example.com"]`.
    pub principal: Vec<String>,
    pub realm: String,
    pub kvno: u32,
    pub etype: u32,
    pub key: Secret<Vec<u8>>,
}

/// In-memory table of long-term keys keyed by `(principal, realm, kvno, etype)`.
///
/// Reading the on-disk keytab format is the keytab reader's job; this
/// type only provides the lookup the reply decryption needs.
#[derive(Debug, Clone, Default)]
pub struct Keytab {
    entries: Vec<KeytabEntry>,
}

impl Keytab {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_entry(&mut self, entry: KeytabEntry) {
        self.entries.push(entry);
    }

    /// Looks up the key for a principal.
    ///
    /// When the reply names a kvno the match is exact; otherwise the
    /// highest kvno wins.
    pub fn get_encryption_key(
        &self,
        name_parts: &[String],
        realm: &str,
        kvno: Option<u32>,
        etype: u32,
    ) -> Result<Vec<u8>> {
        let candidates = self
            .entries
            .iter()
            .filter(|entry| entry.principal == name_parts && entry.realm == realm && entry.etype == etype);

        let entry = match kvno {
            Some(kvno) => candidates.filter(|entry| entry.kvno == kvno).last(),
            None => candidates.max_by_key(|entry| entry.kvno),
        };

        entry.map(|entry| entry.key.as_ref().clone()).ok_or_else(|| {
            Error::new(
                ErrorKind::Crypto,
                format!(
                    "no key in keytab for {}@{} (kvno {:?}, etype {})",
                    name_parts.join("/"),
                    realm,
                    kvno,
                    etype
                ),
            )
        })
    }
}

/// Client secrets used to decrypt the AS-REP encrypted part.
#[derive(Debug, Clone, Default)]
pub struct Credentials {
    password: Option<Secret<String>>,
    keytab: Option<Keytab>,
}

impl Credentials {
    pub fn with_password(password: impl Into<String>) -> Self {
        Self {
            password: Some(Secret::new(password.into())),
            keytab: None,
        }
    }

    pub fn with_keytab(keytab: Keytab) -> Self {
        Self {
            password: None,
            keytab: Some(keytab),
        }
    }

    pub fn has_password(&self) -> bool {
        self.password.is_some()
    }

    pub fn has_keytab(&self) -> bool {
        self.keytab.is_some()
    }

    pub fn password(&self) -> Option<&str> {
        self.password.as_ref().map(|password| password.as_ref().as_str())
    }

    pub fn keytab(&self) -> Option<&Keytab> {
        self.keytab.as_ref()
    }
}

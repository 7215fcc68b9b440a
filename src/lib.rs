//! Client-side Kerberos v5 KDC exchange.
//!
//! This crate drives one exchange with a Key Distribution Center to
//! completion: it ships the request bytes over UDP or TCP with the
//! fallback rules of RFC 4120 7.2, then parses, decrypts and validates
//! the AS-REP / TGS-REP the KDC returns (RFC 4120 3.1.5 / 5.4.2,
//! RFC 6806 11). Building the outbound AS-REQ / TGS-REQ is out of
//! scope; the [picky-krb](https://docs.rs/picky-krb) message types are
//! used at the boundary.
//!
//! ```no_run
//! use krb_client::{AsRep, Config, Credentials, KdcTransport};
//!
//! # fn main() -> krb_client::Result<()> {
//! let config = Config::from_krb5_conf(
//!     r#"
//! [libdefaults]
//!     default_realm = EXAMPLE.COM
//! [realms]
//!     EXAMPLE.COM = {
//!         kdc = kdc.example.com:88
//!     }
//! "#,
//! )?;
//! let credentials = Credentials::with_password("password");
//!
//! # let as_req_bytes: Vec<u8> = Vec::new();
//! let reply = KdcTransport::new(&config).send_to_kdc(&as_req_bytes)?;
//! let mut as_rep = AsRep::unmarshal(&reply)?;
//! let reply_key = as_rep.decrypt_enc_part(&credentials)?;
//! # let _ = reply_key;
//! # Ok(())
//! # }
//! ```

mod constants;

pub mod config;
pub mod credentials;
pub mod error;
pub mod messages;
pub mod transport;

pub use config::{Config, RealmConfig};
pub use credentials::{Credentials, Keytab, KeytabEntry, Secret};
pub use error::{Error, ErrorKind, Result};
pub use messages::{check_krb_error, AsRep, TgsRep};
pub use transport::KdcTransport;

pub mod kdc_rep;
pub mod krb_error;
pub(crate) mod preauth;
mod validate;

#[cfg(test)]
pub(crate) mod test_data;

use picky_asn1::wrapper::IntegerAsn1;

pub use kdc_rep::{AsRep, TgsRep};
pub use krb_error::check_krb_error;

/// Numeric value of a DER integer, sign-padding octets included.
pub(crate) fn int_value(integer: &IntegerAsn1) -> u32 {
    integer
        .0
        .iter()
        .fold(0u32, |acc, &byte| acc.wrapping_shl(8) | u32::from(byte))
}

use picky_krb::data_types::{HostAddress, KerberosFlags, KerberosStringAsn1, PrincipalName};
use time::{Duration, OffsetDateTime};

/// The name-string components of a principal.
pub(crate) fn principal_name_parts(principal: &PrincipalName) -> &[KerberosStringAsn1] {
    &principal.name_string.0 .0
}

/// RFC 4120 3.1.5 name equality: same name-type and element-wise equal
/// name-string sequences. An empty name-string on either side fails.
pub(crate) fn principal_names_match(requested: &PrincipalName, received: &PrincipalName) -> bool {
    if requested.name_type.0 != received.name_type.0 {
        return false;
    }
    let requested_parts = principal_name_parts(requested);
    let received_parts = principal_name_parts(received);
    !requested_parts.is_empty() && !received_parts.is_empty() && requested_parts == received_parts
}

/// Printable form of a principal name for failure messages.
pub(crate) fn name_string(principal: &PrincipalName) -> String {
    principal_name_parts(principal)
        .iter()
        .map(|part| part.to_string())
        .collect::<Vec<_>>()
        .join("/")
}

/// Order-insensitive host address comparison. Kerberos addresses are
/// distinct by construction, so multiset equality reduces to equal
/// lengths plus membership of every requested address.
pub(crate) fn host_addresses_equal(requested: &[HostAddress], received: &[HostAddress]) -> bool {
    requested.len() == received.len() && requested.iter().all(|address| received.contains(address))
}

/// Symmetric skew check in UTC: both directions of the difference are
/// bounded by the configured tolerance.
pub(crate) fn within_clock_skew(at: OffsetDateTime, now: OffsetDateTime, clockskew: Duration) -> bool {
    now - at <= clockskew && at - now <= clockskew
}

pub(crate) fn is_ticket_flag_set(flags: &KerberosFlags, flag: usize) -> bool {
    flags.0.is_set(flag)
}

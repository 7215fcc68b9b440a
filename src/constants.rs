//= [PreAuthentication Data Types](https://datatracker.ietf.org/doc/html/rfc4120#section-7.5.2) =//
pub mod pa_types {
    pub const PA_PW_SALT: u32 = 3;
    pub const PA_ETYPE_INFO: u32 = 11;
    pub const PA_ETYPE_INFO2: u32 = 19;

    //= [RFC 6113](https://datatracker.ietf.org/doc/html/rfc6113#section-7) =//
    pub const PA_FX_FAST: u32 = 136;
    //= [RFC 6806](https://datatracker.ietf.org/doc/html/rfc6806#section-11) =//
    pub const PA_REQ_ENC_PA_REP: u32 = 149;
}

pub mod key_usages {
    /// [RFC 6806 11](https://datatracker.ietf.org/doc/html/rfc6806#section-11):
    /// checksum over the AS-REQ carried in PA-REQ-ENC-PA-REP.
    pub const KEY_USAGE_AS_REQ: i32 = 56;
}

//= [Ticket Flags](https://datatracker.ietf.org/doc/html/rfc4120#section-5.3) =//
pub mod ticket_flags {
    /// [RFC 6806 11](https://datatracker.ietf.org/doc/html/rfc6806#section-11)
    pub const ENC_PA_REP: usize = 15;
}

//! Fixture builders shared by the unit tests.

use picky_asn1::bit_string::BitString;
use picky_asn1::date::GeneralizedTime;
use picky_asn1::restricted_string::Ia5String;
use picky_asn1::wrapper::{
    Asn1SequenceOf, ExplicitContextTag0, ExplicitContextTag1, ExplicitContextTag2, ExplicitContextTag3,
    ExplicitContextTag4, ExplicitContextTag5, ExplicitContextTag6, ExplicitContextTag7, ExplicitContextTag8,
    ExplicitContextTag9, ExplicitContextTag10, IntegerAsn1, OctetStringAsn1, Optional,
};
use picky_krb::constants::key_usages::{AS_REP_ENC, TGS_REP_ENC_SESSION_KEY};
use picky_krb::crypto::CipherSuite;
use picky_krb::data_types::{
    EncryptedData, EncryptionKey, EtypeInfo2, EtypeInfo2Entry, HostAddress, KerberosFlags, KerberosStringAsn1,
    KerberosTime, LastReqInner, PaData, PrincipalName, Ticket, TicketInner,
};
use picky_krb::messages::{
    AsRep as RawAsRep, AsReq, EncAsRepPart, EncKdcRepPart, EncTgsRepPart, KdcRep, KdcReq, KdcReqBody, KrbError,
    KrbErrorInner, TgsRep as RawTgsRep, TgsReq,
};
use time::{Duration, OffsetDateTime};

use crate::constants::pa_types::PA_ETYPE_INFO2;

pub(crate) const REALM: &str = "EXAMPLE.COM";
pub(crate) const CLIENT: &str = "alice";
pub(crate) const PASSWORD: &str = "correct horse battery staple";
pub(crate) const SALT: &str = "EXAMPLE.COMalice";
pub(crate) const AES256_ETYPE: u32 = 18;

pub(crate) fn uint(value: u32) -> IntegerAsn1 {
    let bytes = value.to_be_bytes();
    let first = bytes.iter().position(|&byte| byte != 0).unwrap_or(3);
    let mut encoded = bytes[first..].to_vec();
    if encoded[0] & 0x80 != 0 {
        encoded.insert(0, 0);
    }
    IntegerAsn1::from(encoded)
}

pub(crate) fn kerberos_string(value: &str) -> KerberosStringAsn1 {
    KerberosStringAsn1::from(Ia5String::from_string(value.to_owned()).unwrap())
}

pub(crate) fn principal(name_type: u32, parts: &[&str]) -> PrincipalName {
    PrincipalName {
        name_type: ExplicitContextTag0::from(uint(name_type)),
        name_string: ExplicitContextTag1::from(Asn1SequenceOf::from(
            parts.iter().map(|part| kerberos_string(part)).collect::<Vec<_>>(),
        )),
    }
}

pub(crate) fn ktime(at: OffsetDateTime) -> KerberosTime {
    KerberosTime::from(GeneralizedTime::from(at))
}

pub(crate) fn host_address(address: &[u8]) -> HostAddress {
    HostAddress {
        addr_type: ExplicitContextTag0::from(uint(2)),
        address: ExplicitContextTag1::from(OctetStringAsn1::from(address.to_vec())),
    }
}

pub(crate) fn pa_data(pa_type: u32, value: Vec<u8>) -> PaData {
    PaData {
        padata_type: ExplicitContextTag1::from(uint(pa_type)),
        padata_data: ExplicitContextTag2::from(OctetStringAsn1::from(value)),
    }
}

pub(crate) fn krb_error(code: u32) -> KrbError {
    KrbError::from(KrbErrorInner {
        pvno: ExplicitContextTag0::from(uint(5)),
        msg_type: ExplicitContextTag1::from(uint(30)),
        ctime: Optional::from(None),
        cusec: Optional::from(None),
        stime: ExplicitContextTag4::from(ktime(OffsetDateTime::now_utc())),
        susec: ExplicitContextTag5::from(uint(1)),
        error_code: ExplicitContextTag6::from(code),
        crealm: Optional::from(None),
        cname: Optional::from(None),
        realm: ExplicitContextTag9::from(kerberos_string(REALM)),
        sname: ExplicitContextTag10::from(principal(2, &["krbtgt", REALM])),
        e_text: Optional::from(None),
        e_data: Optional::from(None),
    })
}

pub(crate) fn krb_error_bytes(code: u32) -> Vec<u8> {
    picky_asn1_der::to_vec(&krb_error(code)).unwrap()
}

pub(crate) fn client_key() -> Vec<u8> {
    CipherSuite::Aes256CtsHmacSha196
        .cipher()
        .generate_key_from_password(PASSWORD.as_bytes(), SALT.as_bytes())
        .unwrap()
}

pub(crate) fn etype_info2_padata(salt: &str) -> PaData {
    let entries = EtypeInfo2::from(vec![EtypeInfo2Entry {
        etype: ExplicitContextTag0::from(uint(AES256_ETYPE)),
        salt: Optional::from(Some(ExplicitContextTag1::from(kerberos_string(salt)))),
        s2kparams: Optional::from(None),
    }]);
    pa_data(PA_ETYPE_INFO2, picky_asn1_der::to_vec(&entries).unwrap())
}

fn kdc_req_body(nonce: &IntegerAsn1, sname: PrincipalName, addresses: Option<Vec<HostAddress>>) -> KdcReqBody {
    let now = OffsetDateTime::now_utc();
    KdcReqBody {
        kdc_options: ExplicitContextTag0::from(KerberosFlags::from(BitString::with_bytes(vec![0, 0, 0, 0x10]))),
        cname: Optional::from(Some(ExplicitContextTag1::from(principal(1, &[CLIENT])))),
        realm: ExplicitContextTag2::from(kerberos_string(REALM)),
        sname: Optional::from(Some(ExplicitContextTag3::from(sname))),
        from: Optional::from(None),
        till: ExplicitContextTag5::from(ktime(now + Duration::hours(8))),
        rtime: Optional::from(None),
        nonce: ExplicitContextTag7::from(nonce.clone()),
        etype: ExplicitContextTag8::from(Asn1SequenceOf::from(vec![uint(AES256_ETYPE)])),
        addresses: Optional::from(addresses.map(|addresses| ExplicitContextTag9::from(Asn1SequenceOf::from(addresses)))),
        enc_authorization_data: Optional::from(None),
        additional_tickets: Optional::from(None),
    }
}

pub(crate) fn as_req(nonce: &IntegerAsn1, padata: Option<Vec<PaData>>, addresses: Option<Vec<HostAddress>>) -> AsReq {
    AsReq::from(KdcReq {
        pvno: ExplicitContextTag1::from(uint(5)),
        msg_type: ExplicitContextTag2::from(uint(10)),
        padata: Optional::from(padata.map(|padata| ExplicitContextTag3::from(Asn1SequenceOf::from(padata)))),
        req_body: ExplicitContextTag4::from(kdc_req_body(nonce, principal(2, &["krbtgt", REALM]), addresses)),
    })
}

pub(crate) fn tgs_req(nonce: &IntegerAsn1, service: &[&str], addresses: Option<Vec<HostAddress>>) -> TgsReq {
    TgsReq::from(KdcReq {
        pvno: ExplicitContextTag1::from(uint(5)),
        msg_type: ExplicitContextTag2::from(uint(12)),
        padata: Optional::from(None),
        req_body: ExplicitContextTag4::from(kdc_req_body(nonce, principal(2, service), addresses)),
    })
}

/// Plaintext reply body that validates against the matching request
/// fixtures: same nonce, krbtgt service, times centered on now.
pub(crate) fn enc_kdc_rep_part(nonce: &IntegerAsn1, session_key: &[u8]) -> EncKdcRepPart {
    let now = OffsetDateTime::now_utc();
    EncKdcRepPart {
        key: ExplicitContextTag0::from(EncryptionKey {
            key_type: ExplicitContextTag0::from(uint(AES256_ETYPE)),
            key_value: ExplicitContextTag1::from(OctetStringAsn1::from(session_key.to_vec())),
        }),
        last_req: ExplicitContextTag1::from(Asn1SequenceOf::from(vec![LastReqInner {
            lr_type: ExplicitContextTag0::from(uint(0)),
            lr_value: ExplicitContextTag1::from(ktime(now)),
        }])),
        nonce: ExplicitContextTag2::from(nonce.clone()),
        key_expiration: Optional::from(None),
        flags: ExplicitContextTag4::from(KerberosFlags::from(BitString::with_bytes(vec![0, 0, 0, 0]))),
        auth_time: ExplicitContextTag5::from(ktime(now)),
        start_time: Optional::from(Some(ExplicitContextTag6::from(ktime(now)))),
        end_time: ExplicitContextTag7::from(ktime(now + Duration::hours(8))),
        renew_till: Optional::from(None),
        srealm: ExplicitContextTag9::from(kerberos_string(REALM)),
        sname: ExplicitContextTag10::from(principal(2, &["krbtgt", REALM])),
        caadr: Optional::from(None),
        encrypted_pa_data: Optional::from(None),
    }
}

pub(crate) fn ticket(sname: PrincipalName) -> Ticket {
    Ticket::from(TicketInner {
        tkt_vno: ExplicitContextTag0::from(uint(5)),
        realm: ExplicitContextTag1::from(kerberos_string(REALM)),
        sname: ExplicitContextTag2::from(sname),
        enc_part: ExplicitContextTag3::from(EncryptedData {
            etype: ExplicitContextTag0::from(uint(AES256_ETYPE)),
            kvno: Optional::from(Some(ExplicitContextTag1::from(uint(1)))),
            cipher: ExplicitContextTag2::from(OctetStringAsn1::from(vec![0x55; 48])),
        }),
    })
}

pub(crate) fn encrypt_enc_part(plaintext: &[u8], key: &[u8], usage: i32) -> Vec<u8> {
    CipherSuite::Aes256CtsHmacSha196
        .cipher()
        .encrypt(key, usage, plaintext)
        .unwrap()
}

pub(crate) fn as_rep_envelope(cipher: Vec<u8>, kvno: Option<u32>, padata: Option<Vec<PaData>>) -> RawAsRep {
    RawAsRep::from(KdcRep {
        pvno: ExplicitContextTag0::from(uint(5)),
        msg_type: ExplicitContextTag1::from(uint(11)),
        padata: Optional::from(padata.map(|padata| ExplicitContextTag2::from(Asn1SequenceOf::from(padata)))),
        crealm: ExplicitContextTag3::from(kerberos_string(REALM)),
        cname: ExplicitContextTag4::from(principal(1, &[CLIENT])),
        ticket: ExplicitContextTag5::from(ticket(principal(2, &["krbtgt", REALM]))),
        enc_part: ExplicitContextTag6::from(EncryptedData {
            etype: ExplicitContextTag0::from(uint(AES256_ETYPE)),
            kvno: Optional::from(kvno.map(|kvno| ExplicitContextTag1::from(uint(kvno)))),
            cipher: ExplicitContextTag2::from(OctetStringAsn1::from(cipher)),
        }),
    })
}

/// Complete AS-REP sealed under the given reply key, with the inner
/// part encoded under application tag 25.
pub(crate) fn as_rep(enc_part: &EncKdcRepPart, reply_key: &[u8], padata: Option<Vec<PaData>>) -> RawAsRep {
    let plaintext = picky_asn1_der::to_vec(&EncAsRepPart::from(enc_part.clone())).unwrap();
    as_rep_envelope(encrypt_enc_part(&plaintext, reply_key, AS_REP_ENC), None, padata)
}

/// Complete TGS-REP sealed under the TGT session key, inner part under
/// application tag 26.
pub(crate) fn tgs_rep(enc_part: &EncKdcRepPart, session_key: &[u8], ticket_sname: PrincipalName) -> RawTgsRep {
    let plaintext = picky_asn1_der::to_vec(&EncTgsRepPart::from(enc_part.clone())).unwrap();
    RawTgsRep::from(KdcRep {
        pvno: ExplicitContextTag0::from(uint(5)),
        msg_type: ExplicitContextTag1::from(uint(13)),
        padata: Optional::from(None),
        crealm: ExplicitContextTag3::from(kerberos_string(REALM)),
        cname: ExplicitContextTag4::from(principal(1, &[CLIENT])),
        ticket: ExplicitContextTag5::from(ticket(ticket_sname)),
        enc_part: ExplicitContextTag6::from(EncryptedData {
            etype: ExplicitContextTag0::from(uint(AES256_ETYPE)),
            kvno: Optional::from(None),
            cipher: ExplicitContextTag2::from(OctetStringAsn1::from(encrypt_enc_part(
                &plaintext,
                session_key,
                TGS_REP_ENC_SESSION_KEY,
            ))),
        }),
    })
}

use std::fmt;

use picky_krb::constants::key_usages::{AS_REP_ENC, TGS_REP_ENC_SESSION_KEY};
use picky_krb::constants::types::{AS_REP_MSG_TYPE, TGS_REP_MSG_TYPE};
use picky_krb::crypto::{ChecksumSuite, CipherSuite};
use picky_krb::data_types::{Checksum, KrbResult, PaData, PrincipalName, ResultExt};
use picky_krb::messages::{
    AsRep as RawAsRep, AsReq, EncAsRepPart, EncKdcRepPart, EncTgsRepPart, KdcRep, KdcReqBody, TgsRep as RawTgsRep,
    TgsReq,
};
use time::OffsetDateTime;
use tracing::{debug, trace};

use crate::constants::key_usages::KEY_USAGE_AS_REQ;
use crate::constants::pa_types::{PA_FX_FAST, PA_REQ_ENC_PA_REP};
use crate::constants::ticket_flags::ENC_PA_REP;
use crate::credentials::Credentials;
use crate::messages::{int_value, preauth, validate};
use crate::{Config, Error, ErrorKind, Result};

/// RFC 4120 5.4.2 KRB_AS_REP with its decrypted part, once obtained.
#[derive(Debug, Clone)]
pub struct AsRep {
    pub kdc_rep: KdcRep,
    pub decrypted_enc_part: Option<EncKdcRepPart>,
}

/// RFC 4120 5.4.2 KRB_TGS_REP with its decrypted part, once obtained.
#[derive(Debug, Clone)]
pub struct TgsRep {
    pub kdc_rep: KdcRep,
    pub decrypted_enc_part: Option<EncKdcRepPart>,
}

impl AsRep {
    /// Decodes an AS-REP (application tag 11).
    ///
    /// Bytes carrying a KRB-ERROR instead of the reply surface as the
    /// typed KDC failure in preference to a decode error.
    pub fn unmarshal(data: &[u8]) -> Result<Self> {
        trace!(len = data.len(), "decoding AS-REP");
        let mut deserializer = picky_asn1_der::Deserializer::new_from_bytes(data);
        let reply: KrbResult<RawAsRep> = KrbResult::deserialize(&mut deserializer)?;
        let kdc_rep = reply.map_err(Error::from)?.0;

        check_msg_type(&kdc_rep, AS_REP_MSG_TYPE, "an AS-REP")?;
        Ok(Self {
            kdc_rep,
            decrypted_enc_part: None,
        })
    }

    /// Decrypts `enc-part` with a key obtained from the credentials and
    /// decodes the embedded EncKDCRepPart. Returns the reply key, which
    /// also keys the RFC 6806 negotiation checksum.
    pub fn decrypt_enc_part(&mut self, credentials: &Credentials) -> Result<Vec<u8>> {
        let reply_key = preauth::resolve_reply_key(credentials, &self.kdc_rep)?;
        let enc_part = &self.kdc_rep.enc_part.0;
        debug!(etype = int_value(&enc_part.etype.0), "decrypting AS-REP enc-part");

        let cipher = CipherSuite::try_from(enc_part.etype.0 .0.as_slice())?.cipher();
        let plaintext = cipher.decrypt(&reply_key, AS_REP_ENC, &enc_part.cipher.0 .0)?;
        self.decrypted_enc_part = Some(decode_enc_kdc_rep_part(&plaintext)?);
        Ok(reply_key)
    }

    /// RFC 4120 3.1.5 validation of the reply against the request that
    /// elicited it, including the RFC 6806 11 FAST negotiation check.
    /// Decrypts `enc-part` as a side effect.
    pub fn is_valid(&mut self, config: &Config, credentials: &Credentials, as_req: &AsReq) -> Result<()> {
        let req_body = &as_req.0.req_body.0;
        validate_client_identity(&self.kdc_rep, req_body)?;

        let reply_key = self.decrypt_enc_part(credentials)?;
        let enc_part = self
            .decrypted_enc_part
            .as_ref()
            .ok_or_else(|| Error::new(ErrorKind::Decode, "encrypted part missing after decryption"))?;

        if enc_part.nonce.0 != req_body.nonce.0 {
            return Err(Error::new(
                ErrorKind::Validation,
                "possible replay attack: nonce in reply does not match request",
            ));
        }
        validate_service_identity(enc_part, req_body)?;
        validate_addresses(req_body, enc_part)?;

        let auth_time = reply_time(enc_part.auth_time.0 .0.clone())?;
        if !validate::within_clock_skew(auth_time, OffsetDateTime::now_utc(), config.clockskew) {
            return Err(clock_skew_failure(config));
        }

        verify_enc_pa_rep(as_req, enc_part, &reply_key)
    }
}

impl TgsRep {
    /// Decodes a TGS-REP (application tag 13); KRB-ERROR bytes surface
    /// as the typed KDC failure.
    pub fn unmarshal(data: &[u8]) -> Result<Self> {
        trace!(len = data.len(), "decoding TGS-REP");
        let mut deserializer = picky_asn1_der::Deserializer::new_from_bytes(data);
        let reply: KrbResult<RawTgsRep> = KrbResult::deserialize(&mut deserializer)?;
        let kdc_rep = reply.map_err(Error::from)?.0;

        check_msg_type(&kdc_rep, TGS_REP_MSG_TYPE, "a TGS-REP")?;
        Ok(Self {
            kdc_rep,
            decrypted_enc_part: None,
        })
    }

    /// Decrypts `enc-part` with the TGT session key already held by the
    /// client.
    pub fn decrypt_enc_part(&mut self, session_key: &[u8]) -> Result<()> {
        let enc_part = &self.kdc_rep.enc_part.0;
        debug!(etype = int_value(&enc_part.etype.0), "decrypting TGS-REP enc-part");

        let cipher = CipherSuite::try_from(enc_part.etype.0 .0.as_slice())?.cipher();
        let plaintext = cipher.decrypt(session_key, TGS_REP_ENC_SESSION_KEY, &enc_part.cipher.0 .0)?;
        self.decrypted_enc_part = Some(decode_enc_kdc_rep_part(&plaintext)?);
        Ok(())
    }

    /// RFC 4120 3.1.5 validation against the originating TGS-REQ. The
    /// caller decrypts first; an undecrypted reply never validates.
    pub fn is_valid(&self, config: &Config, tgs_req: &TgsReq) -> Result<()> {
        let enc_part = self
            .decrypted_enc_part
            .as_ref()
            .ok_or_else(|| Error::new(ErrorKind::Validation, "encrypted part has not been decrypted"))?;
        let req_body = &tgs_req.0.req_body.0;
        validate_client_identity(&self.kdc_rep, req_body)?;

        if enc_part.nonce.0 != req_body.nonce.0 {
            return Err(Error::new(
                ErrorKind::Validation,
                "possible replay attack: nonce in reply does not match request",
            ));
        }

        let req_sname = required_sname(req_body)?;
        let ticket_sname = &self.kdc_rep.ticket.0 .0.sname.0;
        if !validate::principal_names_match(req_sname, ticket_sname) {
            return Err(name_mismatch("SName in reply ticket", req_sname, ticket_sname));
        }
        validate_service_identity(enc_part, req_body)?;
        validate_addresses(req_body, enc_part)?;

        // start-time within tolerance, else fall back to auth-time
        let now = OffsetDateTime::now_utc();
        let start_time_ok = match enc_part.start_time.0.as_ref() {
            Some(start_time) => validate::within_clock_skew(reply_time(start_time.0 .0.clone())?, now, config.clockskew),
            None => false,
        };
        if !start_time_ok {
            let auth_time = reply_time(enc_part.auth_time.0 .0.clone())?;
            if !validate::within_clock_skew(auth_time, now, config.clockskew) {
                return Err(clock_skew_failure(config));
            }
        }

        Ok(())
    }
}

fn check_msg_type(kdc_rep: &KdcRep, expected: u8, reply_kind: &str) -> Result<()> {
    let msg_type = int_value(&kdc_rep.msg_type.0);
    if msg_type != u32::from(expected) {
        return Err(Error::new(
            ErrorKind::Decode,
            format!("message type {} does not indicate {}", msg_type, reply_kind),
        ));
    }
    Ok(())
}

/// RFC 4120 compatibility note: some KDCs send an EncTGSRepPart
/// (application tag 26) regardless of the reply type, so the tag 25
/// decode falls back to tag 26.
fn decode_enc_kdc_rep_part(plaintext: &[u8]) -> Result<EncKdcRepPart> {
    match picky_asn1_der::from_bytes::<EncAsRepPart>(plaintext) {
        Ok(enc_part) => Ok(enc_part.0),
        Err(_) => Ok(picky_asn1_der::from_bytes::<EncTgsRepPart>(plaintext)?.0),
    }
}

fn validate_client_identity(kdc_rep: &KdcRep, req_body: &KdcReqBody) -> Result<()> {
    let req_cname = req_body
        .cname
        .0
        .as_ref()
        .map(|cname| &cname.0)
        .ok_or_else(|| Error::new(ErrorKind::Validation, "request carries no client name"))?;
    if !validate::principal_names_match(req_cname, &kdc_rep.cname.0) {
        return Err(name_mismatch("CName in reply", req_cname, &kdc_rep.cname.0));
    }
    if kdc_rep.crealm.0 != req_body.realm.0 {
        return Err(Error::new(
            ErrorKind::Validation,
            format!(
                "CRealm in reply does not match request: requested {}, received {}",
                req_body.realm.0.as_utf8(), kdc_rep.crealm.0.as_utf8()
            ),
        ));
    }
    Ok(())
}

fn validate_service_identity(enc_part: &EncKdcRepPart, req_body: &KdcReqBody) -> Result<()> {
    let req_sname = required_sname(req_body)?;
    if !validate::principal_names_match(req_sname, &enc_part.sname.0) {
        return Err(name_mismatch("SName in reply", req_sname, &enc_part.sname.0));
    }
    if enc_part.srealm.0 != req_body.realm.0 {
        return Err(Error::new(
            ErrorKind::Validation,
            format!(
                "SRealm in reply does not match request: requested {}, received {}",
                req_body.realm.0.as_utf8(), enc_part.srealm.0.as_utf8()
            ),
        ));
    }
    Ok(())
}

fn required_sname(req_body: &KdcReqBody) -> Result<&PrincipalName> {
    req_body
        .sname
        .0
        .as_ref()
        .map(|sname| &sname.0)
        .ok_or_else(|| Error::new(ErrorKind::Validation, "request carries no server name"))
}

fn validate_addresses(req_body: &KdcReqBody, enc_part: &EncKdcRepPart) -> Result<()> {
    let requested = req_body
        .addresses
        .0
        .as_ref()
        .map(|addresses| addresses.0 .0.as_slice())
        .unwrap_or_default();
    if requested.is_empty() {
        return Ok(());
    }
    let received = enc_part
        .caadr
        .0
        .as_ref()
        .map(|addresses| addresses.0 .0.as_slice())
        .unwrap_or_default();
    if !validate::host_addresses_equal(requested, received) {
        return Err(Error::new(
            ErrorKind::Validation,
            "addresses in the reply do not match those in the request",
        ));
    }
    Ok(())
}

/// RFC 6806 11: when the request advertised PA-REQ-ENC-PA-REP and the
/// reply set the enc-pa-rep flag, the encrypted PA-Data must bind the
/// reply to the exact request bytes via a checksum under the reply key.
fn verify_enc_pa_rep(as_req: &AsReq, enc_part: &EncKdcRepPart, reply_key: &[u8]) -> Result<()> {
    let requested = padata_contains(as_req.0.padata.0.as_ref().map(|padata| &padata.0 .0), PA_REQ_ENC_PA_REP);
    let announced = validate::is_ticket_flag_set(&enc_part.flags.0, ENC_PA_REP);
    if !requested || !announced {
        return Ok(());
    }

    let enc_padata = enc_part
        .encrypted_pa_data
        .0
        .as_ref()
        .map(|padata| &padata.0 .0)
        .ok_or_else(|| fast_failure("encrypted PA-Data is missing"))?;
    if enc_padata.len() < 2 || !padata_contains(Some(enc_padata), PA_FX_FAST) {
        return Err(fast_failure("PA-FX-FAST entry is missing"));
    }

    let request_bytes = picky_asn1_der::to_vec(as_req)?;
    for pa_data in enc_padata
        .iter()
        .filter(|pa_data| int_value(&pa_data.padata_type.0) == PA_REQ_ENC_PA_REP)
    {
        let proof: Checksum = picky_asn1_der::from_bytes(&pa_data.padata_data.0 .0)
            .map_err(|err| fast_failure(format_args!("could not decode PA-REQ-ENC-PA-REP: {:?}", err)))?;
        let hasher = ChecksumSuite::try_from(int_value(&proof.cksumtype.0) as usize)
            .map_err(fast_failure)?
            .hasher();
        let expected = hasher.checksum(reply_key, KEY_USAGE_AS_REQ, &request_bytes)?;
        if expected != proof.checksum.0 .0 {
            return Err(fast_failure("checksum over the request is invalid"));
        }
    }
    Ok(())
}

fn padata_contains(padata: Option<&Vec<PaData>>, pa_type: u32) -> bool {
    padata
        .map(|entries| entries.iter().any(|pa_data| int_value(&pa_data.padata_type.0) == pa_type))
        .unwrap_or(false)
}

fn fast_failure(reason: impl fmt::Display) -> Error {
    Error::new(
        ErrorKind::Validation,
        format!("KDC did not respond appropriately to FAST negotiation: {}", reason),
    )
}

fn reply_time(time: picky_asn1::date::GeneralizedTime) -> Result<OffsetDateTime> {
    OffsetDateTime::try_from(time)
        .map_err(|err| Error::new(ErrorKind::Decode, format!("invalid timestamp in reply: {:?}", err)))
}

fn clock_skew_failure(config: &Config) -> Error {
    Error::new(
        ErrorKind::Validation,
        format!(
            "clock skew with KDC too large: greater than {} seconds",
            config.clockskew.whole_seconds()
        ),
    )
}

fn name_mismatch(what: &str, requested: &PrincipalName, received: &PrincipalName) -> Error {
    Error::new(
        ErrorKind::Validation,
        format!(
            "{} does not match request: requested {}, received {}",
            what,
            validate::name_string(requested),
            validate::name_string(received)
        ),
    )
}

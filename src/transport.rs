use std::io::{Read, Write};
use std::net::{TcpStream, ToSocketAddrs, UdpSocket};
use std::time::{Duration, Instant};

use byteorder::{BigEndian, ReadBytesExt, WriteBytesExt};
use picky_krb::constants::error_codes::KRB_ERR_RESPONSE_TOO_BIG;
use rand::rngs::OsRng;
use rand::Rng;
use tracing::{debug, instrument, warn};

use crate::config::Config;
use crate::messages::krb_error::{check_krb_error, error_code};
use crate::{Error, ErrorKind, Result};

/// Absolute deadline for one exchange, covering connect, send and
/// receive together.
const KDC_TIMEOUT: Duration = Duration::from_secs(5);
/// RFC 4120 7.2.2: UDP replies larger than this are truncated by the
/// KDC, which answers KRB_ERR_RESPONSE_TOO_BIG to force TCP.
const MAX_UDP_REPLY: usize = 4096;
/// Upper bound accepted for a framed TCP reply.
const MAX_TCP_REPLY: u32 = 8 * 1024 * 1024;

/// Picks an index into the KDC list of the realm.
pub type KdcSelector = fn(usize) -> usize;

/// Delivers request bytes to a KDC of the default realm.
///
/// Protocol choice follows `udp_preference_limit`: 1 forces TCP,
/// requests up to the limit go over UDP first with TCP fallback, and
/// larger requests go over TCP first with UDP fallback. The two paths
/// are tried sequentially, never raced: the KDC treats each delivery
/// as an independent request.
pub struct KdcTransport<'a> {
    config: &'a Config,
    selector: KdcSelector,
}

impl<'a> KdcTransport<'a> {
    pub fn new(config: &'a Config) -> Self {
        Self {
            config,
            selector: pick_at_random,
        }
    }

    /// Replaces the KDC picker. The selector receives the list length
    /// and returns the index to contact; tests use this to pin choices.
    pub fn with_selector(config: &'a Config, selector: KdcSelector) -> Self {
        Self { config, selector }
    }

    #[instrument(level = "debug", skip(self, data))]
    pub fn send_to_kdc(&self, data: &[u8]) -> Result<Vec<u8>> {
        let kdcs = self.config.kdcs_for_default_realm();
        if kdcs.is_empty() {
            return Err(Error::new(
                ErrorKind::Config,
                format!(
                    "no KDC defined in configuration for realm {}",
                    self.config.default_realm
                ),
            ));
        }
        let kdc = if kdcs.len() > 1 {
            &kdcs[(self.selector)(kdcs.len()) % kdcs.len()]
        } else {
            &kdcs[0]
        };
        debug!(%kdc, len = data.len(), "sending request to KDC");

        let reply = if self.config.udp_preference_limit == 1 {
            send_tcp(kdc, data).map_err(|err| {
                Error::new(
                    err.error_type,
                    format!("failed to communicate with KDC {} over TCP: {}", kdc, err.description),
                )
            })?
        } else if data.len() <= self.config.udp_preference_limit {
            udp_with_tcp_fallback(kdc, data)?
        } else {
            tcp_with_udp_fallback(kdc, data)?
        };

        if reply.is_empty() {
            return Err(Error::new(
                ErrorKind::Config,
                format!("no response data from KDC {}", kdc),
            ));
        }
        if let Some(krb_error) = check_krb_error(&reply) {
            return Err(Error::from(krb_error));
        }
        Ok(reply)
    }
}

fn udp_with_tcp_fallback(kdc: &str, data: &[u8]) -> Result<Vec<u8>> {
    match send_udp(kdc, data) {
        Ok(reply) => {
            // RESPONSE_TOO_BIG is the only in-band signal the KDC can
            // use to force a transport upgrade
            if let Some(krb_error) = check_krb_error(&reply) {
                if error_code(&krb_error) == KRB_ERR_RESPONSE_TOO_BIG as u32 {
                    debug!(%kdc, "KDC reported RESPONSE_TOO_BIG, retrying over TCP");
                    return send_tcp(kdc, data).map_err(|err| {
                        Error::new(
                            err.error_type,
                            format!(
                                "response from KDC {} too big for UDP and the TCP retry failed: {}",
                                kdc, err.description
                            ),
                        )
                    });
                }
            }
            Ok(reply)
        }
        Err(udp_err) => {
            warn!(%kdc, error = %udp_err, "UDP delivery failed, falling back to TCP");
            send_tcp(kdc, data).map_err(|tcp_err| {
                Error::new(
                    tcp_err.error_type,
                    format!(
                        "failed to communicate with KDC {} over UDP ({}) and TCP ({})",
                        kdc, udp_err.description, tcp_err.description
                    ),
                )
            })
        }
    }
}

fn tcp_with_udp_fallback(kdc: &str, data: &[u8]) -> Result<Vec<u8>> {
    match send_tcp(kdc, data) {
        Ok(reply) => Ok(reply),
        Err(tcp_err) => {
            warn!(%kdc, error = %tcp_err, "TCP delivery failed, falling back to UDP");
            send_udp(kdc, data).map_err(|udp_err| {
                Error::new(
                    udp_err.error_type,
                    format!(
                        "failed to communicate with KDC {} over TCP ({}) and UDP ({})",
                        kdc, tcp_err.description, udp_err.description
                    ),
                )
            })
        }
    }
}

/// Time left until `deadline`; the exchange fails with `Timeout` once
/// it has passed.
fn time_left(deadline: Instant) -> Result<Duration> {
    let left = deadline.saturating_duration_since(Instant::now());
    if left.is_zero() {
        return Err(Error::new(ErrorKind::Timeout, "KDC exchange deadline expired"));
    }
    Ok(left)
}

fn send_udp(kdc: &str, data: &[u8]) -> Result<Vec<u8>> {
    let deadline = Instant::now() + KDC_TIMEOUT;
    let socket = UdpSocket::bind("0.0.0.0:0")?;
    socket.connect(kdc)?;

    socket.set_write_timeout(Some(time_left(deadline)?))?;
    socket.send(data)?;

    socket.set_read_timeout(Some(time_left(deadline)?))?;
    let mut reply = vec![0; MAX_UDP_REPLY];
    let received = socket.recv(&mut reply)?;
    reply.truncate(received);
    Ok(reply)
}

fn send_tcp(kdc: &str, data: &[u8]) -> Result<Vec<u8>> {
    let deadline = Instant::now() + KDC_TIMEOUT;
    let address = kdc
        .to_socket_addrs()?
        .next()
        .ok_or_else(|| Error::new(ErrorKind::Transport, format!("could not resolve KDC address {}", kdc)))?;
    let mut stream = TcpStream::connect_timeout(&address, time_left(deadline)?)?;

    // RFC 4120 7.2.2: each request and reply is preceded by its length
    // as 4 octets in network byte order; the high bit is reserved and
    // must be zero
    let request_len = u32::try_from(data.len())
        .ok()
        .filter(|len| len & 0x8000_0000 == 0)
        .ok_or_else(|| Error::new(ErrorKind::Transport, "request too large for the TCP length prefix"))?;
    stream.set_write_timeout(Some(time_left(deadline)?))?;
    stream.write_u32::<BigEndian>(request_len)?;
    stream.write_all(data)?;

    stream.set_read_timeout(Some(time_left(deadline)?))?;
    let reply_len = stream.read_u32::<BigEndian>()?;
    if reply_len & 0x8000_0000 != 0 {
        return Err(Error::new(
            ErrorKind::Decode,
            "reserved high bit set in the reply length prefix",
        ));
    }
    if reply_len > MAX_TCP_REPLY {
        return Err(Error::new(
            ErrorKind::Decode,
            format!("reply length {} exceeds the supported maximum", reply_len),
        ));
    }
    let mut reply = vec![0; reply_len as usize];
    stream.set_read_timeout(Some(time_left(deadline)?))?;
    stream.read_exact(&mut reply)?;
    Ok(reply)
}

fn pick_at_random(len: usize) -> usize {
    OsRng.gen_range(0..len)
}

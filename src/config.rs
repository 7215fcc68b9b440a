use std::collections::HashMap;

use time::Duration;

use crate::{Error, ErrorKind, Result};

/// MIT libdefaults value: datagrams up to this size go over UDP first.
const DEFAULT_UDP_PREFERENCE_LIMIT: usize = 1465;
const DEFAULT_CLOCKSKEW_SECONDS: i64 = 300;
const DEFAULT_KDC_PORT: &str = "88";

/// Per-realm settings consumed by the transport.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RealmConfig {
    /// KDC addresses as "host:port", in configuration order.
    pub kdc: Vec<String>,
}

/// Effective client configuration.
///
/// Mirrors the `[libdefaults]` and `[realms]` settings of krb5.conf
/// that the exchange engine consumes. `udp_preference_limit == 1`
/// forces TCP for every request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub default_realm: String,
    pub realms: HashMap<String, RealmConfig>,
    pub udp_preference_limit: usize,
    pub clockskew: Duration,
}

impl Config {
    pub fn new(default_realm: impl Into<String>) -> Self {
        Self {
            default_realm: default_realm.into(),
            realms: HashMap::new(),
            udp_preference_limit: DEFAULT_UDP_PREFERENCE_LIMIT,
            clockskew: Duration::seconds(DEFAULT_CLOCKSKEW_SECONDS),
        }
    }

    /// Registers the KDC list for a realm, replacing any previous list.
    pub fn with_realm(mut self, realm: impl Into<String>, kdcs: impl IntoIterator<Item = String>) -> Self {
        self.realms.insert(
            realm.into(),
            RealmConfig {
                kdc: kdcs.into_iter().map(normalize_kdc_address).collect(),
            },
        );
        self
    }

    /// KDC list configured for the default realm.
    pub fn kdcs_for_default_realm(&self) -> &[String] {
        self.realms
            .get(&self.default_realm)
            .map(|realm| realm.kdc.as_slice())
            .unwrap_or_default()
    }

    /// Parses krb5.conf text into an effective configuration.
    ///
    /// Understands the `[libdefaults]` keys `default_realm`,
    /// `udp_preference_limit` and `clockskew` (seconds), and
    /// `[realms]` groups of the form `REALM = { kdc = host:port }`.
    /// Unknown sections and keys are ignored. Lines starting with `#`
    /// or `;` are comments.
    pub fn from_krb5_conf(data: &str) -> Result<Self> {
        let mut config = Config::new("");
        let mut section = String::new();
        let mut current_realm: Option<String> = None;

        for raw_line in data.lines() {
            let line = raw_line.trim();
            if line.is_empty() || line.starts_with('#') || line.starts_with(';') {
                continue;
            }

            if line.starts_with('[') && line.ends_with(']') {
                if current_realm.is_some() {
                    return Err(Error::new(ErrorKind::Config, "unterminated realm group in krb5.conf"));
                }
                section = line[1..line.len() - 1].to_ascii_lowercase();
                continue;
            }

            match section.as_str() {
                "libdefaults" => {
                    let Some((key, value)) = split_key_value(line) else {
                        continue;
                    };
                    match key.to_ascii_lowercase().as_str() {
                        "default_realm" => config.default_realm = value.to_owned(),
                        "udp_preference_limit" => {
                            config.udp_preference_limit = value.parse().map_err(|_| {
                                Error::new(ErrorKind::Config, format!("invalid udp_preference_limit: {}", value))
                            })?;
                        }
                        "clockskew" => {
                            let seconds: i64 = value
                                .parse()
                                .map_err(|_| Error::new(ErrorKind::Config, format!("invalid clockskew: {}", value)))?;
                            config.clockskew = Duration::seconds(seconds);
                        }
                        _ => {}
                    }
                }
                "realms" => {
                    if line == "}" {
                        current_realm = None;
                    } else if let Some(realm) = &current_realm {
                        if let Some((key, value)) = split_key_value(line) {
                            if key.eq_ignore_ascii_case("kdc") {
                                config
                                    .realms
                                    .entry(realm.clone())
                                    .or_default()
                                    .kdc
                                    .push(normalize_kdc_address(value.to_owned()));
                            }
                        }
                    } else if let Some((realm, rest)) = split_key_value(line) {
                        if rest != "{" {
                            return Err(Error::new(
                                ErrorKind::Config,
                                format!("expected '{{' after realm {} in krb5.conf", realm),
                            ));
                        }
                        config.realms.entry(realm.to_owned()).or_default();
                        current_realm = Some(realm.to_owned());
                    }
                }
                _ => {}
            }
        }

        if current_realm.is_some() {
            return Err(Error::new(ErrorKind::Config, "unterminated realm group in krb5.conf"));
        }

        Ok(config)
    }
}

fn split_key_value(line: &str) -> Option<(&str, &str)> {
    let (key, value) = line.split_once('=')?;
    Some((key.trim(), value.trim()))
}

fn normalize_kdc_address(kdc: String) -> String {
    if kdc.contains(':') {
        kdc
    } else {
        format!("{}:{}", kdc, DEFAULT_KDC_PORT)
    }
}
